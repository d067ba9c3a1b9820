//! The attribute value union and its comparison semantics.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::decimal::Decimal;

/// A DynamoDB attribute value.
///
/// On the wire each value is a single-key JSON object whose key is the type
/// tag, e.g. `{"S": "hello"}` or `{"N": "3.14"}`. Binary payloads are
/// base64-encoded strings.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Number value, kept as its source string.
    N(String),
    /// Binary value (raw bytes; base64 on the wire).
    B(Bytes),
    /// String set.
    Ss(Vec<String>),
    /// Number set.
    Ns(Vec<String>),
    /// Binary set.
    Bs(Vec<Bytes>),
    /// Boolean value.
    Bool(bool),
    /// Null value. The payload is the wire-format boolean (always `true`).
    Null(bool),
    /// List of attribute values.
    L(Vec<AttributeValue>),
    /// Map of attribute name to attribute value.
    M(HashMap<String, AttributeValue>),
}

/// Failure of an ordering comparison (`lt`/`le`/`gt`/`ge`).
///
/// Equality never fails; ordering fails on operand *types*, not on type
/// mismatches between the two sides (those just compare as false).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComparisonError {
    /// Sets, lists, and maps have no ordering.
    #[error("unsupported comparison for type {0}")]
    Unsupported(&'static str),
    /// NULL values have no ordering.
    #[error("cannot compare NULL values")]
    NullOperand,
}

impl AttributeValue {
    /// The wire type tag for this value.
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }

    /// Returns the string payload if this is an `S` value.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number string if this is an `N` value.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the bytes if this is a `B` value.
    #[must_use]
    pub fn as_b(&self) -> Option<&Bytes> {
        match self {
            Self::B(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the boolean payload if this is a `BOOL` value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the elements if this is an `L` value.
    #[must_use]
    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::L(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the entries if this is an `M` value.
    #[must_use]
    pub fn as_m(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }

    /// True for the `NULL` value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// True for the three set types.
    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Ss(_) | Self::Ns(_) | Self::Bs(_))
    }

    /// True for any type without an ordering: sets, lists, and maps.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.is_set() || matches!(self, Self::L(_) | Self::M(_))
    }

    // ------------------------------------------------------------------
    // Comparison operators
    // ------------------------------------------------------------------

    /// Wire-semantics equality.
    ///
    /// Numbers compare as exact decimals (`"1.0"` equals `"1"`), sets and
    /// lists compare positionally, and map equality only checks that every
    /// key of `self` is present and equal in `other` — extra keys in
    /// `other` are ignored. Any two `NULL` values are equal. Cross-type
    /// comparisons are false, never an error.
    #[must_use]
    pub fn cmp_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::S(a), Self::S(b)) => a == b,
            (Self::N(a), Self::N(b)) => num_eq(a, b),
            (Self::B(a), Self::B(b)) => a == b,
            (Self::Ss(a), Self::Ss(b)) => a == b,
            (Self::Ns(a), Self::Ns(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| num_eq(x, y))
            }
            (Self::Bs(a), Self::Bs(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null(_), Self::Null(_)) => true,
            (Self::L(a), Self::L(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.cmp_eq(y))
            }
            (Self::M(a), Self::M(b)) => a
                .iter()
                .all(|(k, v)| b.get(k).is_some_and(|w| v.cmp_eq(w))),
            _ => false,
        }
    }

    /// Negation of [`cmp_eq`](Self::cmp_eq).
    #[must_use]
    pub fn cmp_ne(&self, other: &Self) -> bool {
        !self.cmp_eq(other)
    }

    /// Wire-semantics strict less-than.
    ///
    /// Defined for `S` (lexicographic), `N` (exact decimal), `B` (unsigned
    /// byte order), and `BOOL` (`false < true`). Comparing two `NULL`
    /// values is an error, as is comparing two sets/lists/maps. Every
    /// other type mismatch is `Ok(false)`, never an error.
    pub fn cmp_lt(&self, other: &Self) -> Result<bool, ComparisonError> {
        self.ordered(other, false)
    }

    /// Wire-semantics strict greater-than. Same domain as
    /// [`cmp_lt`](Self::cmp_lt).
    pub fn cmp_gt(&self, other: &Self) -> Result<bool, ComparisonError> {
        self.ordered(other, true)
    }

    /// `!gt`. Cross-type operands therefore compare as `Ok(true)`.
    pub fn cmp_le(&self, other: &Self) -> Result<bool, ComparisonError> {
        Ok(!self.cmp_gt(other)?)
    }

    /// `!lt`. Cross-type operands therefore compare as `Ok(true)`.
    pub fn cmp_ge(&self, other: &Self) -> Result<bool, ComparisonError> {
        Ok(!self.cmp_lt(other)?)
    }

    fn ordered(&self, other: &Self, gt: bool) -> Result<bool, ComparisonError> {
        if self.is_null() && other.is_null() {
            return Err(ComparisonError::NullOperand);
        }
        if self.is_collection() && other.is_collection() {
            return Err(ComparisonError::Unsupported(self.type_descriptor()));
        }
        let ord = match (self, other) {
            (Self::S(a), Self::S(b)) => a.cmp(b),
            (Self::N(a), Self::N(b)) => num_dec(a).cmp(&num_dec(b)),
            (Self::B(a), Self::B(b)) => a.as_ref().cmp(b.as_ref()),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            _ => return Ok(false),
        };
        Ok(if gt { ord.is_gt() } else { ord.is_lt() })
    }
}

fn num_dec(s: &str) -> Decimal {
    // Number strings are validated before they reach a comparison; an
    // unparseable one compares as zero rather than panicking.
    Decimal::parse(s).unwrap_or_else(|_| Decimal::zero())
}

fn num_eq(a: &str, b: &str) -> bool {
    match (Decimal::parse(a), Decimal::parse(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

// ----------------------------------------------------------------------
// Serde
// ----------------------------------------------------------------------

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::S(s) => map.serialize_entry("S", s)?,
            Self::N(n) => map.serialize_entry("N", n)?,
            Self::B(b) => map.serialize_entry("B", &BASE64.encode(b))?,
            Self::Ss(set) => map.serialize_entry("SS", set)?,
            Self::Ns(set) => map.serialize_entry("NS", set)?,
            Self::Bs(set) => {
                let encoded: Vec<String> = set.iter().map(|b| BASE64.encode(b)).collect();
                map.serialize_entry("BS", &encoded)?;
            }
            Self::Bool(b) => map.serialize_entry("BOOL", b)?,
            Self::Null(_) => map.serialize_entry("NULL", &true)?,
            Self::L(list) => map.serialize_entry("L", list)?,
            Self::M(entries) => map.serialize_entry("M", entries)?,
        }
        map.end()
    }
}

struct AttributeValueVisitor;

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with exactly one attribute type key")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        use serde::de::Error;

        let Some(tag) = access.next_key::<String>()? else {
            return Err(A::Error::custom("attribute value must not be empty"));
        };
        let value = match tag.as_str() {
            "S" => AttributeValue::S(access.next_value()?),
            "N" => AttributeValue::N(access.next_value()?),
            "B" => {
                let encoded: String = access.next_value()?;
                let decoded = BASE64
                    .decode(&encoded)
                    .map_err(|e| A::Error::custom(format!("invalid base64: {e}")))?;
                AttributeValue::B(Bytes::from(decoded))
            }
            "SS" => AttributeValue::Ss(access.next_value()?),
            "NS" => AttributeValue::Ns(access.next_value()?),
            "BS" => {
                let encoded: Vec<String> = access.next_value()?;
                let mut set = Vec::with_capacity(encoded.len());
                for e in encoded {
                    let decoded = BASE64
                        .decode(&e)
                        .map_err(|e| A::Error::custom(format!("invalid base64: {e}")))?;
                    set.push(Bytes::from(decoded));
                }
                AttributeValue::Bs(set)
            }
            "BOOL" => AttributeValue::Bool(access.next_value()?),
            "NULL" => AttributeValue::Null(access.next_value()?),
            "L" => AttributeValue::L(access.next_value()?),
            "M" => AttributeValue::M(access.next_value()?),
            other => {
                return Err(A::Error::custom(format!(
                    "unknown attribute value type: {other}"
                )));
            }
        };
        if access.next_key::<String>()?.is_some() {
            return Err(A::Error::custom(
                "attribute value must have exactly one type key",
            ));
        }
        Ok(value)
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeValueVisitor)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{{S: {s}}}"),
            Self::N(n) => write!(f, "{{N: {n}}}"),
            Self::B(b) => write!(f, "{{B: {}}}", BASE64.encode(b)),
            Self::Ss(set) => write!(f, "{{SS: [{}]}}", set.join(", ")),
            Self::Ns(set) => write!(f, "{{NS: [{}]}}", set.join(", ")),
            Self::Bs(set) => {
                let encoded: Vec<String> = set.iter().map(|b| BASE64.encode(b)).collect();
                write!(f, "{{BS: [{}]}}", encoded.join(", "))
            }
            Self::Bool(b) => write!(f, "{{BOOL: {b}}}"),
            Self::Null(_) => write!(f, "{{NULL: true}}"),
            Self::L(list) => {
                let parts: Vec<String> = list.iter().map(ToString::to_string).collect();
                write!(f, "{{L: [{}]}}", parts.join(", "))
            }
            Self::M(entries) => {
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                let parts: Vec<String> =
                    keys.iter().map(|k| format!("{k}={}", entries[*k])).collect();
                write!(f, "{{M: {{{}}}}}", parts.join(", "))
            }
        }
    }
}
