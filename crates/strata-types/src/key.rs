use std::fmt;

use crate::value::{Scalar, Value};

/// A map key: either a positional index or a name.
///
/// Names that spell a canonical decimal integer (`"0"`, `"42"`, `"-7"`, but
/// not `"007"` or `"+1"`) are stored as [`Key::Index`]. This keeps `"1"` and
/// `1` addressing the same slot, which matters once a diff has been through a
/// JSON round trip where every object key becomes a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Index(i64),
    Name(String),
}

impl Key {
    /// Build a key from a name, normalizing canonical integers to indices.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        match parse_canonical_index(&name) {
            Some(index) => Key::Index(index),
            None => Key::Name(name),
        }
    }

    /// The index, if this is a positional key.
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(_) => None,
        }
    }

    /// The key as a value (`Int` for indices, `String` for names).
    pub fn to_value(&self) -> Value {
        match self {
            Key::Index(i) => Value::from(*i),
            Key::Name(name) => Value::from(name.as_str()),
        }
    }

    /// Derive a key from a scalar value.
    ///
    /// Returns `None` for null and non-scalar values, which cannot identify a
    /// collection entry. Integral floats within `i64` range collapse onto the
    /// matching index; booleans and other floats become names.
    pub fn from_value(value: &Value) -> Option<Self> {
        let Value::Scalar(scalar) = value else {
            return None;
        };
        Some(match scalar {
            Scalar::Bool(b) => Key::Name(b.to_string()),
            Scalar::Int(i) => Key::Index(*i),
            Scalar::Float(f) if is_index_float(*f) => Key::Index(*f as i64),
            Scalar::Float(f) => Key::Name(f.to_string()),
            Scalar::String(s) => Key::named(s.as_str()),
        })
    }
}

fn is_index_float(f: f64) -> bool {
    // 2^63 itself is out of range, so the upper bound is exclusive.
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn parse_canonical_index(s: &str) -> Option<i64> {
    if s == "0" {
        return Some(0);
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::named(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::named(name)
    }
}

impl From<i64> for Key {
    fn from(index: i64) -> Self {
        Key::Index(index)
    }
}

impl From<i32> for Key {
    fn from(index: i32) -> Self {
        Key::Index(i64::from(index))
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index as i64)
    }
}
