//! Order-preserving string encoding of key pieces.
//!
//! Storage keys are plain strings compared bytewise, so every key piece is
//! mapped to a string whose lexicographic order equals the natural order of
//! the source values. Strings pass through, binary becomes hex, and numbers
//! get a sign/biased-exponent/digits encoding built on [`Decimal`].

use md5::{Digest, Md5};

use dynamint_model::attribute_value::AttributeValue;
use dynamint_model::decimal::Decimal;

/// Salt prepended to every hash-prefix digest.
const HASH_PREFIX_SALT: &[u8] = b"Outliers";

/// Encode one key piece as an order-preserving string.
#[must_use]
pub fn to_lexi_str(value: &AttributeValue) -> String {
    match value {
        AttributeValue::S(s) => s.clone(),
        AttributeValue::B(b) => hex::encode(b),
        AttributeValue::N(n) => {
            number_to_lexi(&Decimal::parse(n).unwrap_or_else(|_| Decimal::zero()))
        }
        // Key pieces are validated to be scalar before they reach the codec.
        _ => String::new(),
    }
}

/// Encode a decimal as `<sign digit><2-hex biased exponent><digits>`.
///
/// The sign digit is `'0'` for negatives and `'1'` otherwise, so negatives
/// sort first. The biased exponent is `125 - e` for negatives (larger
/// magnitude sorts earlier) and `130 + e` for positives; zero uses exponent
/// `0`. Negative coefficients are complemented (`10 - d.dd…` with the dot
/// dropped) so that within an exponent bucket bigger negatives still sort
/// first.
#[must_use]
pub fn number_to_lexi(num: &Decimal) -> String {
    if num.is_zero() {
        return "1000".to_string();
    }
    let e = num.exponent();
    if num.is_negative() {
        let biased = 125 - e;
        let digits = num.digits();
        let mut out = format!("0{biased:02x}");
        let last = digits.len() - 1;
        for (i, d) in digits.iter().enumerate() {
            // The coefficient never has a trailing zero, so the complement's
            // final digit is 10 - d with no carry.
            let c = if i == last { 10 - d } else { 9 - d };
            out.push(char::from(b'0' + c));
        }
        out
    } else {
        let biased = 130 + e;
        let mut out = format!("1{biased:02x}");
        for d in num.digits() {
            out.push(char::from(b'0' + d));
        }
        out
    }
}

/// The 6-hex-char partition prefix of a storage key.
///
/// MD5 over the salt, the hash key piece, and the range key piece (empty
/// when absent), truncated to the first three digest bytes.
#[must_use]
pub fn hash_prefix(hash: &AttributeValue, range: Option<&AttributeValue>) -> String {
    let mut hasher = Md5::new();
    hasher.update(HASH_PREFIX_SALT);
    hasher.update(key_piece_bytes(hash));
    if let Some(range) = range {
        hasher.update(key_piece_bytes(range));
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..3])
}

fn key_piece_bytes(value: &AttributeValue) -> Vec<u8> {
    match value {
        AttributeValue::S(s) => s.as_bytes().to_vec(),
        AttributeValue::B(b) => b.to_vec(),
        AttributeValue::N(n) => {
            number_to_bytes(&Decimal::parse(n).unwrap_or_else(|_| Decimal::zero()))
        }
        _ => Vec::new(),
    }
}

/// Variable-length byte encoding of a decimal, used only as digest input.
///
/// Zero is the single byte `0x80`. Otherwise a header byte carries the
/// half-exponent offset by `0x40`, followed by the coefficient digits packed
/// two per byte in base 100 plus one, with the final digit byte incremented.
/// Negative values negate the header, complement each digit byte against
/// 101, and append a `0x66` terminator.
#[must_use]
pub fn number_to_bytes(num: &Decimal) -> Vec<u8> {
    if num.is_zero() {
        return vec![0x80];
    }

    let e1 = num.exponent() + 1;
    let pad = e1.rem_euclid(2);
    let half = (e1 + pad) / 2;

    let mut digits: Vec<u8> = Vec::with_capacity(num.digits().len() + 1);
    if pad == 1 {
        digits.push(0);
    }
    digits.extend_from_slice(num.digits());

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let header = (0x40 + half) as u8;
    let mut out = vec![header];
    for pair in digits.chunks(2) {
        let hi = pair[0] * 10;
        let lo = pair.get(1).copied().unwrap_or(0);
        out.push(hi + lo + 1);
    }
    if let Some(last) = out.last_mut() {
        *last += 1;
    }

    if num.is_negative() {
        out[0] = 0u8.wrapping_sub(out[0]);
        for b in &mut out[1..] {
            *b = 101 - *b;
        }
        out.push(0x66);
    }
    out
}
