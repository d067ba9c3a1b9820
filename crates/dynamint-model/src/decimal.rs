//! Exact decimal numbers.
//!
//! `N` attribute values keep their source string on the wire, but every
//! comparison, ordering, encoding, and arithmetic operation goes through
//! this normalized form. No floating point is involved anywhere: `"1.0"`,
//! `"1.00"` and `"1"` are the same number, and 38-digit values compare
//! exactly.

use std::cmp::Ordering;

/// Service limit on significant digits in a number.
pub const MAX_SIGNIFICANT_DIGITS: usize = 38;

/// Largest allowed power-of-ten magnitude (exponent of the leading digit).
pub const MAX_MAGNITUDE: i32 = 125;

/// Smallest allowed power-of-ten magnitude.
pub const MIN_MAGNITUDE: i32 = -130;

/// Errors produced when parsing a number string.
///
/// The `Display` text of each variant is the exact client-visible message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecimalError {
    /// The string is not a syntactically valid decimal number.
    #[error("The parameter cannot be converted to a numeric value: {0}")]
    NotNumeric(String),
    /// More than 38 significant digits.
    #[error("Attempting to store more than 38 significant digits in a Number")]
    TooManyDigits,
    /// Magnitude above 10^125.
    #[error(
        "Number overflow. Attempting to store a number with magnitude larger than supported range"
    )]
    Overflow,
    /// Magnitude below 10^-130.
    #[error(
        "Number underflow. Attempting to store a number with magnitude smaller than supported range"
    )]
    Underflow,
}

/// A normalized decimal: sign, significant digits, and the power of ten of
/// the leading digit.
///
/// `123.4` is `(+, [1,2,3,4], exp 2)`; `0.05` is `(+, [5], exp -2)`; zero is
/// `(0, [], exp 0)`. The digit vector never has leading or trailing zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    sign: i8,
    digits: Vec<u8>,
    exp: i32,
}

impl Decimal {
    /// The zero value.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            sign: 0,
            digits: Vec::new(),
            exp: 0,
        }
    }

    /// Parse a wire-format number string, enforcing the service's digit and
    /// magnitude limits.
    pub fn parse(s: &str) -> Result<Self, DecimalError> {
        let invalid = || DecimalError::NotNumeric(s.to_string());
        let mut chars = s.as_bytes();

        let mut sign: i8 = 1;
        match chars.first() {
            Some(b'-') => {
                sign = -1;
                chars = &chars[1..];
            }
            Some(b'+') => chars = &chars[1..],
            _ => {}
        }

        // Split off an optional exponent part.
        let (mantissa, exp_part) = match chars.iter().position(|c| *c == b'e' || *c == b'E') {
            Some(i) => (&chars[..i], Some(&chars[i + 1..])),
            None => (chars, None),
        };

        let mut extra_exp: i64 = 0;
        if let Some(exp_str) = exp_part {
            let (exp_sign, exp_digits) = match exp_str.first() {
                Some(b'-') => (-1i64, &exp_str[1..]),
                Some(b'+') => (1, &exp_str[1..]),
                _ => (1, exp_str),
            };
            if exp_digits.is_empty() || !exp_digits.iter().all(u8::is_ascii_digit) {
                return Err(invalid());
            }
            // Cap well above the magnitude limits; larger values fail those
            // checks below without overflowing i64 math.
            for d in exp_digits {
                extra_exp = (extra_exp * 10 + i64::from(d - b'0')).min(10_000);
            }
            extra_exp *= exp_sign;
        }

        let (int_part, frac_part) = match mantissa.iter().position(|c| *c == b'.') {
            Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
            None => (mantissa, &b""[..]),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.iter().all(u8::is_ascii_digit) || !frac_part.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }

        // Weight of the digit at position i of int++frac is
        // (int.len() - 1 - i) + extra_exp.
        let all: Vec<u8> = int_part
            .iter()
            .chain(frac_part.iter())
            .map(|c| c - b'0')
            .collect();
        let Some(first_sig) = all.iter().position(|d| *d != 0) else {
            return Ok(Self::zero());
        };
        let last_sig = all.iter().rposition(|d| *d != 0).unwrap_or(first_sig);

        let digits: Vec<u8> = all[first_sig..=last_sig].to_vec();
        if digits.len() > MAX_SIGNIFICANT_DIGITS {
            return Err(DecimalError::TooManyDigits);
        }

        let exp64 = i64::try_from(int_part.len()).unwrap_or(0) - 1
            - i64::try_from(first_sig).unwrap_or(0)
            + extra_exp;
        if exp64 > i64::from(MAX_MAGNITUDE) {
            return Err(DecimalError::Overflow);
        }
        if exp64 < i64::from(MIN_MAGNITUDE) {
            return Err(DecimalError::Underflow);
        }

        #[allow(clippy::cast_possible_truncation)]
        Ok(Self {
            sign,
            digits,
            exp: exp64 as i32,
        })
    }

    /// `-1`, `0`, or `1`.
    #[must_use]
    pub fn sign(&self) -> i8 {
        self.sign
    }

    /// True if the value is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.sign == 0
    }

    /// True if the value is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.sign < 0
    }

    /// The significant digits, most significant first. Empty for zero.
    #[must_use]
    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    /// Power of ten of the leading digit. Zero for the zero value.
    #[must_use]
    pub fn exponent(&self) -> i32 {
        self.exp
    }

    /// The negation of this value.
    #[must_use]
    pub fn neg(&self) -> Self {
        Self {
            sign: -self.sign,
            digits: self.digits.clone(),
            exp: self.exp,
        }
    }

    /// Exact sum of two decimals.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        if self.sign == other.sign {
            let (digits, exp) = add_magnitudes(&self.digits, self.exp, &other.digits, other.exp);
            return normalized(self.sign, digits, exp);
        }
        match cmp_magnitudes(&self.digits, self.exp, &other.digits, other.exp) {
            Ordering::Equal => Self::zero(),
            Ordering::Greater => {
                let (digits, exp) =
                    sub_magnitudes(&self.digits, self.exp, &other.digits, other.exp);
                normalized(self.sign, digits, exp)
            }
            Ordering::Less => {
                let (digits, exp) =
                    sub_magnitudes(&other.digits, other.exp, &self.digits, self.exp);
                normalized(other.sign, digits, exp)
            }
        }
    }

    /// Exact difference of two decimals.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// Normalized textual form in plain (non-exponent) notation.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut out = String::new();
        if self.sign < 0 {
            out.push('-');
        }
        if self.exp >= 0 {
            #[allow(clippy::cast_sign_loss)]
            let int_len = self.exp as usize + 1;
            for i in 0..int_len.max(self.digits.len()) {
                if i == int_len {
                    out.push('.');
                }
                out.push(char::from(b'0' + self.digits.get(i).copied().unwrap_or(0)));
            }
        } else {
            out.push_str("0.");
            for _ in self.exp..-1 {
                out.push('0');
            }
            for d in &self.digits {
                out.push(char::from(b'0' + d));
            }
        }
        out
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.sign.cmp(&other.sign) {
            Ordering::Equal => {}
            ord => return ord,
        }
        let mag = cmp_magnitudes(&self.digits, self.exp, &other.digits, other.exp);
        if self.sign < 0 { mag.reverse() } else { mag }
    }
}

fn normalized(sign: i8, digits: Vec<u8>, exp: i32) -> Decimal {
    let Some(first) = digits.iter().position(|d| *d != 0) else {
        return Decimal::zero();
    };
    let last = digits.iter().rposition(|d| *d != 0).unwrap_or(first);
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    Decimal {
        sign,
        digits: digits[first..=last].to_vec(),
        exp: exp - first as i32,
    }
}

fn cmp_magnitudes(a: &[u8], a_exp: i32, b: &[u8], b_exp: i32) -> Ordering {
    match a_exp.cmp(&b_exp) {
        Ordering::Equal => {}
        ord => return ord,
    }
    let len = a.len().max(b.len());
    for i in 0..len {
        let da = a.get(i).copied().unwrap_or(0);
        let db = b.get(i).copied().unwrap_or(0);
        match da.cmp(&db) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    Ordering::Equal
}

/// Digit of `d` (digits/exponent form) at power-of-ten weight `w`.
fn digit_at(digits: &[u8], exp: i32, w: i32) -> u8 {
    let idx = exp - w;
    if idx < 0 {
        return 0;
    }
    #[allow(clippy::cast_sign_loss)]
    digits.get(idx as usize).copied().unwrap_or(0)
}

fn low_weight(digits: &[u8], exp: i32) -> i32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let len = digits.len() as i32;
    exp - (len - 1)
}

fn add_magnitudes(a: &[u8], a_exp: i32, b: &[u8], b_exp: i32) -> (Vec<u8>, i32) {
    let lo = low_weight(a, a_exp).min(low_weight(b, b_exp));
    let hi = a_exp.max(b_exp);
    let mut out = Vec::new();
    let mut carry = 0u8;
    let mut w = lo;
    while w <= hi {
        let sum = digit_at(a, a_exp, w) + digit_at(b, b_exp, w) + carry;
        out.push(sum % 10);
        carry = sum / 10;
        w += 1;
    }
    let mut exp = hi;
    if carry > 0 {
        out.push(carry);
        exp += 1;
    }
    out.reverse();
    (out, exp)
}

/// `a - b` where the magnitude of `a` is known to be >= that of `b`.
fn sub_magnitudes(a: &[u8], a_exp: i32, b: &[u8], b_exp: i32) -> (Vec<u8>, i32) {
    let lo = low_weight(a, a_exp).min(low_weight(b, b_exp));
    let hi = a_exp.max(b_exp);
    let mut out = Vec::new();
    let mut borrow = 0i8;
    let mut w = lo;
    while w <= hi {
        #[allow(clippy::cast_possible_wrap)]
        let mut diff = digit_at(a, a_exp, w) as i8 - digit_at(b, b_exp, w) as i8 - borrow;
        if diff < 0 {
            diff += 10;
            borrow = 1;
        } else {
            borrow = 0;
        }
        #[allow(clippy::cast_sign_loss)]
        out.push(diff as u8);
        w += 1;
    }
    out.reverse();
    (out, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::parse(s).unwrap()
    }

    #[test]
    fn test_should_treat_trailing_zeros_as_equal() {
        assert_eq!(dec("1"), dec("1.0"));
        assert_eq!(dec("1"), dec("1.00"));
        assert_eq!(dec("0.5"), dec("0.50"));
        assert_eq!(dec("-3.1400"), dec("-3.14"));
    }

    #[test]
    fn test_should_normalize_all_zero_forms() {
        assert_eq!(dec("0"), Decimal::zero());
        assert_eq!(dec("0.000"), Decimal::zero());
        assert_eq!(dec("-0"), Decimal::zero());
        assert_eq!(dec("0e10"), Decimal::zero());
    }

    #[test]
    fn test_should_order_exactly() {
        assert!(dec("2") > dec("1.999999999999999999999999999999"));
        assert!(dec("-2") < dec("-1.5"));
        assert!(dec("-0.01") < dec("0"));
        assert!(dec("10") > dec("9.9"));
        assert!(dec("0.1") < dec("0.2"));
        assert!(dec("1e10") > dec("9999999999"));
    }

    #[test]
    fn test_should_order_38_digit_values_without_rounding() {
        // Adjacent values that are identical as f64.
        let a = dec("99999999999999999999999999999999999998");
        let b = dec("99999999999999999999999999999999999999");
        assert!(a < b);
    }

    #[test]
    fn test_should_parse_exponent_notation() {
        assert_eq!(dec("1.5e2"), dec("150"));
        assert_eq!(dec("25E-3"), dec("0.025"));
        assert_eq!(dec("1e0"), dec("1"));
    }

    #[test]
    fn test_should_reject_non_numeric_strings() {
        for bad in ["", "abc", "1.2.3", "1e", "--5", " 1", "1 ", "+", "."] {
            assert!(
                matches!(Decimal::parse(bad), Err(DecimalError::NotNumeric(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_should_enforce_significant_digit_limit() {
        let ok = "9".repeat(38);
        assert!(Decimal::parse(&ok).is_ok());
        let too_many = "9".repeat(39);
        assert_eq!(Decimal::parse(&too_many), Err(DecimalError::TooManyDigits));
        // Trailing zeros are not significant: 39 characters, 36 digits.
        let padded = format!("{}000", "9".repeat(36));
        assert!(Decimal::parse(&padded).is_ok());
    }

    #[test]
    fn test_should_enforce_magnitude_limits() {
        assert!(Decimal::parse("1e125").is_ok());
        assert_eq!(Decimal::parse("1e126"), Err(DecimalError::Overflow));
        assert!(Decimal::parse("1e-130").is_ok());
        assert_eq!(Decimal::parse("1e-131"), Err(DecimalError::Underflow));
    }

    #[test]
    fn test_should_add_exactly() {
        assert_eq!(dec("0.1").add(&dec("0.2")), dec("0.3"));
        assert_eq!(dec("1").add(&dec("-1")), Decimal::zero());
        assert_eq!(dec("9.99").add(&dec("0.01")), dec("10"));
        assert_eq!(dec("-5").add(&dec("3")), dec("-2"));
        assert_eq!(dec("100").sub(&dec("0.001")), dec("99.999"));
    }

    #[test]
    fn test_should_render_canonical_plain_notation() {
        assert_eq!(dec("1.50").to_canonical_string(), "1.5");
        assert_eq!(dec("-0.050").to_canonical_string(), "-0.05");
        assert_eq!(dec("1e3").to_canonical_string(), "1000");
        assert_eq!(Decimal::zero().to_canonical_string(), "0");
    }
}
