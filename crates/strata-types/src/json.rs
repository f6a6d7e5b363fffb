//! Bridge between [`Value`] and `serde`.
//!
//! Values serialize to the JSON data model: maps and records become objects
//! (records keep only their initialized fields), keys become strings. On the
//! way back every object is a [`Value::Map`]; turning a map into a record is
//! the job of a record factory, not of deserialization.

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::TypeError;
use crate::key::Key;
use crate::value::{Scalar, Value, ValueMap};

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::from(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::from(i),
                None => Value::from(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => Value::Map(
                object
                    .into_iter()
                    .map(|(k, v)| (Key::from(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Convert to a `serde_json::Value`.
    ///
    /// Non-finite floats have no JSON representation and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Scalar(Scalar::Bool(b)) => serde_json::Value::Bool(*b),
            Value::Scalar(Scalar::Int(i)) => serde_json::Value::from(*i),
            Value::Scalar(Scalar::Float(x)) => serde_json::Number::from_f64(*x)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Scalar(Scalar::String(s)) => serde_json::Value::String(s.clone()),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect(),
            ),
            Value::Record(record) => serde_json::Value::Object(
                record
                    .fields()
                    .filter_map(|f| Some((f.name().to_owned(), f.value?.to_json())))
                    .collect(),
            ),
        }
    }

    /// Parse a JSON document into a value.
    pub fn from_json_str(s: &str) -> Result<Self, TypeError> {
        serde_json::from_str::<serde_json::Value>(s)
            .map(Value::from)
            .map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Convert any serializable type into a value, through its JSON form.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, TypeError> {
        serde_json::to_value(value)
            .map(Value::from)
            .map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Key::Index(i) => serializer.serialize_i64(*i),
            Key::Name(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Key::from(s)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Key::Index)
                .ok_or_else(|| de::Error::custom("map key index out of range")),
            other => Err(de::Error::custom(format!("invalid map key: {other}"))),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Value::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            Value::Scalar(Scalar::Float(x)) => serializer.serialize_f64(*x),
            Value::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
            Value::Sequence(items) => serializer.collect_seq(items),
            Value::Map(map) => serialize_map(map, serializer),
            Value::Record(record) => {
                let mut out = serializer.serialize_map(None)?;
                for field in record.fields() {
                    if let Some(value) = field.value {
                        out.serialize_entry(field.name(), value)?;
                    }
                }
                out.end()
            }
        }
    }
}

fn serialize_map<S: Serializer>(map: &ValueMap, serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (key, value) in map {
        out.serialize_entry(key, value)?;
    }
    out.end()
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
