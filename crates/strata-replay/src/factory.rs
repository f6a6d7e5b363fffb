//! Record construction: turning a folded field map back into a typed value.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use strata_types::{is_list_shaped, FieldKind, Key, Record, RecordSchema, Scalar, Value, ValueMap};
use tracing::trace;

use crate::error::ReplayError;

/// Builds the restored value of a target type from its flat field map.
pub trait RecordFactory: Send + Sync {
    type Output;

    fn construct(&self, target_type: &str, fields: ValueMap) -> Result<Self::Output, ReplayError>;
}

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// Record schemas by type name.
///
/// Builds [`Record`]s, checking every field against its [`FieldKind`] and
/// recursing into nested records and collections.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<RecordSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its type name, replacing any previous one.
    pub fn register(&mut self, schema: impl Into<Arc<RecordSchema>>) -> Arc<RecordSchema> {
        let schema = schema.into();
        self.schemas
            .insert(schema.type_name().to_owned(), Arc::clone(&schema));
        schema
    }

    /// Builder form of [`Self::register`].
    pub fn with(mut self, schema: impl Into<Arc<RecordSchema>>) -> Self {
        self.register(schema);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<RecordSchema>> {
        self.schemas.get(type_name)
    }

    pub fn build(&self, type_name: &str, fields: &ValueMap) -> Result<Record, ReplayError> {
        let schema = self
            .get(type_name)
            .ok_or_else(|| ReplayError::UnknownType(type_name.to_owned()))?;
        let mut record = Record::new(Arc::clone(schema));

        for spec in schema.fields() {
            let value = match fields.get(&Key::from(spec.name.as_str())) {
                Some(value) => {
                    let check = FieldCheck {
                        registry: self,
                        type_name,
                        field: &spec.name,
                    };
                    check.convert(&spec.kind, value)?
                }
                None if spec.kind.is_optional() => Value::Null,
                // Ignorable fields are not tracked, so they may be absent.
                None if spec.ignorable => continue,
                None => {
                    return Err(ReplayError::MissingField {
                        type_name: type_name.to_owned(),
                        field: spec.name.clone(),
                    })
                }
            };
            record
                .set(&spec.name, value)
                .map_err(|e| ReplayError::Deserialize(e.to_string()))?;
        }

        for key in fields.keys() {
            if schema.field_spec(&key.to_string()).is_none() {
                trace!(type_name, field = %key, "ignoring unknown field");
            }
        }

        Ok(record)
    }
}

impl RecordFactory for SchemaRegistry {
    type Output = Record;

    fn construct(&self, target_type: &str, fields: ValueMap) -> Result<Record, ReplayError> {
        self.build(target_type, &fields)
    }
}

/// Checks one field's value against its declared kind.
struct FieldCheck<'a> {
    registry: &'a SchemaRegistry,
    type_name: &'a str,
    field: &'a str,
}

impl FieldCheck<'_> {
    fn convert(&self, kind: &FieldKind, value: &Value) -> Result<Value, ReplayError> {
        match (kind, value) {
            (FieldKind::Any, _) => Ok(value.clone()),
            (FieldKind::Optional(_), Value::Null) => Ok(Value::Null),
            (FieldKind::Optional(inner), _) => self.convert(inner, value),

            (FieldKind::Bool, Value::Scalar(Scalar::Bool(_)))
            | (FieldKind::Int, Value::Scalar(Scalar::Int(_)))
            | (FieldKind::Float, Value::Scalar(Scalar::Float(_)))
            | (FieldKind::Number, Value::Scalar(Scalar::Int(_) | Scalar::Float(_)))
            | (FieldKind::String, Value::Scalar(Scalar::String(_)))
            | (FieldKind::Sequence, Value::Sequence(_))
            | (FieldKind::Map, Value::Map(_)) => Ok(value.clone()),

            (FieldKind::Float, Value::Scalar(Scalar::Int(i))) => Ok(Value::from(*i as f64)),
            (FieldKind::Sequence, Value::Map(map)) if is_list_shaped(map) => {
                Ok(Value::Sequence(map.values().cloned().collect()))
            }

            (FieldKind::Record(name), Value::Record(record)) if record.type_name() == name => {
                Ok(value.clone())
            }
            (FieldKind::Record(name), Value::Map(fields)) => {
                self.registry.build(name, fields).map(Value::Record)
            }

            (FieldKind::CollectionOf(inner), Value::Sequence(items)) => items
                .iter()
                .map(|item| self.convert(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            (FieldKind::CollectionOf(inner), Value::Map(map)) => map
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.convert(inner, item)?)))
                .collect::<Result<ValueMap, ReplayError>>()
                .map(Value::Map),

            _ => Err(ReplayError::TypeMismatch {
                type_name: self.type_name.to_owned(),
                field: self.field.to_owned(),
                expected: kind.to_string(),
                actual: value.kind_name().to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// TypedFactory
// ---------------------------------------------------------------------------

/// Builds a Rust type through its `Deserialize` impl.
pub struct TypedFactory<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedFactory<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedFactory")
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> RecordFactory for TypedFactory<T> {
    type Output = T;

    fn construct(&self, target_type: &str, fields: ValueMap) -> Result<T, ReplayError> {
        serde_json::from_value(Value::Map(fields).to_json())
            .map_err(|e| ReplayError::Deserialize(format!("{target_type}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use strata_types::FieldSpec;

    use super::*;

    fn fields<V: Into<Value>>(entries: impl IntoIterator<Item = (&'static str, V)>) -> ValueMap {
        entries
            .into_iter()
            .map(|(k, v)| (Key::from(k), v.into()))
            .collect()
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with(
                RecordSchema::new("Line")
                    .field(FieldSpec::new("sku", FieldKind::String))
                    .field(FieldSpec::new("qty", FieldKind::Int))
                    .field(FieldSpec::new("price", FieldKind::Float))
                    .field(FieldSpec::new("note", FieldKind::String.optional())),
            )
            .with(
                RecordSchema::new("Order")
                    .field(FieldSpec::new("id", FieldKind::String))
                    .field(FieldSpec::new("cached", FieldKind::Any).ignorable())
                    .field(
                        FieldSpec::new("lines", FieldKind::collection_of(FieldKind::record("Line")))
                            .keyed_by("sku"),
                    ),
            )
    }

    fn line(sku: &str, qty: i64) -> Value {
        Value::Map(fields([
            ("sku", Value::from(sku)),
            ("qty", Value::from(qty)),
            ("price", Value::from(2)),
        ]))
    }

    #[test]
    fn builds_nested_records() {
        let order = registry()
            .build(
                "Order",
                &fields([
                    ("id", Value::from("o-1")),
                    ("lines", Value::Sequence(vec![line("111", 2), line("222", 1)])),
                ]),
            )
            .unwrap();

        assert_eq!(order.type_name(), "Order");
        assert!(!order.is_initialized("cached"));
        let lines = order.get("lines").and_then(Value::as_sequence).unwrap();
        let first = lines[0].as_record().unwrap();
        assert_eq!(first.type_name(), "Line");
        assert_eq!(first.get("qty"), Some(&Value::from(2)));
        assert_eq!(first.get("price"), Some(&Value::from(2.0)));
        assert_eq!(first.get("note"), Some(&Value::Null));
    }

    #[test]
    fn keyed_collections_keep_their_keys() {
        let mut keyed = ValueMap::new();
        keyed.insert(Key::from("a"), line("111", 2));
        let order = registry()
            .build(
                "Order",
                &fields([("id", Value::from("o-1")), ("lines", Value::Map(keyed))]),
            )
            .unwrap();
        let lines = order.get("lines").and_then(Value::as_map).unwrap();
        assert!(lines[&Key::from("a")].as_record().is_some());
    }

    #[test]
    fn missing_field_is_reported() {
        let err = registry()
            .build("Line", &fields([("sku", Value::from("111"))]))
            .unwrap_err();
        assert_eq!(
            err,
            ReplayError::MissingField {
                type_name: "Line".into(),
                field: "qty".into()
            }
        );
    }

    #[test]
    fn mistyped_nested_field_names_the_nested_type() {
        let bad_line = Value::Map(fields([
            ("sku", Value::from("111")),
            ("qty", Value::from("two")),
            ("price", Value::from(1.5)),
        ]));
        let err = registry()
            .build(
                "Order",
                &fields([("id", Value::from("o-1")), ("lines", Value::Sequence(vec![bad_line]))]),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ReplayError::TypeMismatch {
                type_name: "Line".into(),
                field: "qty".into(),
                expected: "int".into(),
                actual: "string".into(),
            }
        );
    }

    #[test]
    fn unknown_type_is_reported() {
        let err = registry().construct("Invoice", ValueMap::new()).unwrap_err();
        assert_eq!(err, ReplayError::UnknownType("Invoice".into()));
    }

    #[test]
    fn typed_factory_deserializes() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Line {
            sku: String,
            qty: i64,
        }

        let factory = TypedFactory::<Line>::new();
        let line = factory
            .construct("Line", fields([("sku", Value::from("111")), ("qty", Value::from(3))]))
            .unwrap();
        assert_eq!(
            line,
            Line {
                sku: "111".into(),
                qty: 3
            }
        );

        let err = factory.construct("Line", fields([("sku", 1)])).unwrap_err();
        assert!(matches!(err, ReplayError::Deserialize(ref msg) if msg.starts_with("Line: ")));
    }
}
