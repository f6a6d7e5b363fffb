//! Flattening of values into plain data for equality checks.

use strata_types::{Value, ValueMap};

/// Turns a value graph into plain data: records become maps.
///
/// The resolvers compare normalized forms, so whatever a normalizer drops
/// can never produce a diff.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, value: &Value) -> Value;

    /// Normalized form with map keys sorted at every level, for comparisons
    /// where insertion order must not matter.
    fn canonical(&self, value: &Value) -> Value {
        sort_keys(self.normalize(value))
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Map(map) => {
            let mut entries: Vec<_> = map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Map(entries.into_iter().collect())
        }
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Default normalizer: records become maps of their initialized,
/// non-ignorable fields, recursively.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValueNormalizer;

impl Normalizer for ValueNormalizer {
    fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Record(record) => Value::Map(
                record
                    .fields()
                    .filter(|f| !f.is_ignorable())
                    .filter_map(|f| Some((f.name().into(), self.normalize(f.value?))))
                    .collect::<ValueMap>(),
            ),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.normalize(v)))
                    .collect(),
            ),
            Value::Sequence(items) => {
                Value::Sequence(items.iter().map(|v| self.normalize(v)).collect())
            }
            other => other.clone(),
        }
    }
}
