use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;

use crate::key::Key;
use crate::record::Record;

/// Insertion-ordered map of keyed values.
///
/// Iteration order is observable (diffs list changed keys in the order they
/// were discovered) but equality is order-independent.
pub type ValueMap = IndexMap<Key, Value>;

/// A scalar leaf.
///
/// Equality is strict: values of different variants are never equal, so
/// `Int(1) != Float(1.0)` and `Int(1) != String("1")`. Floats compare by bit
/// pattern, which keeps equality reflexive for NaN.
#[derive(Clone, Debug)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::String(a), Scalar::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// The value graph that diffs are computed over.
///
/// A diff is itself a `Value` whose shape mirrors the compared structure but
/// only contains changed leaves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Value {
    #[default]
    Null,
    Scalar(Scalar),
    Sequence(Vec<Value>),
    Map(ValueMap),
    Record(Record),
}

impl Value {
    /// An empty map.
    pub fn map() -> Self {
        Value::Map(ValueMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for sequences and maps.
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Sequence(_) | Value::Map(_))
    }

    /// Returns `true` for a sequence or map with no entries.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::Sequence(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Scalar(Scalar::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Look up a named member of a map or an initialized field of a record.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(&Key::from(name)),
            Value::Record(record) => record.get(name),
            _ => None,
        }
    }

    /// Look up an entry by key, treating a sequence as an index-keyed map.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        match (self, key) {
            (Value::Map(map), _) => map.get(key),
            (Value::Sequence(items), Key::Index(i)) => {
                usize::try_from(*i).ok().and_then(|i| items.get(i))
            }
            _ => None,
        }
    }

    /// View this value as a keyed map.
    ///
    /// Maps are borrowed as-is, sequences become maps keyed by position, and
    /// every other value is an empty map.
    pub fn keyed_view(&self) -> Cow<'_, ValueMap> {
        match self {
            Value::Map(map) => Cow::Borrowed(map),
            Value::Sequence(items) => Cow::Owned(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (Key::from(i), v.clone()))
                    .collect(),
            ),
            _ => Cow::Owned(ValueMap::new()),
        }
    }

    /// Entries of a map or sequence in iteration order, keyed the same way as
    /// [`Self::keyed_view`]. Other values have no entries.
    pub fn entries(&self) -> Vec<(Key, &Value)> {
        match self {
            Value::Map(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Key::from(i), v))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Scalar(Scalar::Bool(_)) => "bool",
            Value::Scalar(Scalar::Int(_)) => "int",
            Value::Scalar(Scalar::Float(_)) => "float",
            Value::Scalar(Scalar::String(_)) => "string",
            Value::Sequence(_) => "sequence",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }
}

/// Returns `true` when the keys of `map` are exactly `0..len` in order.
pub fn is_list_shaped(map: &ValueMap) -> bool {
    map.keys()
        .enumerate()
        .all(|(i, key)| key.as_index() == Some(i as i64))
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Scalar(Scalar::Int(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Scalar(Scalar::Int(i64::from(i)))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Scalar(Scalar::Int(i64::from(i)))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::String(s.to_owned()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::String(s))
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
