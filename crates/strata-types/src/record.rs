use std::fmt;
use std::sync::Arc;

use crate::error::TypeError;
use crate::value::Value;

/// Declared shape of a record field, checked when a record is rebuilt from a
/// flat field map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Any value is accepted as-is.
    Any,
    Bool,
    Int,
    /// A float; integers are widened on construction.
    Float,
    /// An int or a float.
    Number,
    String,
    Sequence,
    Map,
    /// A nested record of the named type.
    Record(String),
    /// A sequence or map whose every element has the inner kind.
    CollectionOf(Box<FieldKind>),
    /// The inner kind, or null. Missing optional fields default to null.
    Optional(Box<FieldKind>),
}

impl FieldKind {
    pub fn record(type_name: impl Into<String>) -> Self {
        FieldKind::Record(type_name.into())
    }

    pub fn collection_of(element: FieldKind) -> Self {
        FieldKind::CollectionOf(Box::new(element))
    }

    pub fn optional(self) -> Self {
        FieldKind::Optional(Box::new(self))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, FieldKind::Optional(_))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Any => f.write_str("any"),
            FieldKind::Bool => f.write_str("bool"),
            FieldKind::Int => f.write_str("int"),
            FieldKind::Float => f.write_str("float"),
            FieldKind::Number => f.write_str("number"),
            FieldKind::String => f.write_str("string"),
            FieldKind::Sequence => f.write_str("sequence"),
            FieldKind::Map => f.write_str("map"),
            FieldKind::Record(name) => write!(f, "record<{name}>"),
            FieldKind::CollectionOf(inner) => write!(f, "collection<{inner}>"),
            FieldKind::Optional(inner) => write!(f, "optional<{inner}>"),
        }
    }
}

/// Marks a field as a keyed collection.
///
/// The field's path is diffed with map semantics. With a `key_field`, items
/// are matched across snapshots by the value of that field instead of by
/// position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionHint {
    pub key_field: Option<String>,
}

/// One row of a record type's field-descriptor table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Ignorable fields are excluded from equality checks and never appear
    /// in a diff.
    pub ignorable: bool,
    pub collection: Option<CollectionHint>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ignorable: false,
            collection: None,
        }
    }

    /// Exclude this field from comparison and diff output.
    pub fn ignorable(mut self) -> Self {
        self.ignorable = true;
        self
    }

    /// Diff this field with map semantics, matching items by position or key.
    pub fn collection(mut self) -> Self {
        self.collection = Some(CollectionHint::default());
        self
    }

    /// Diff this field with map semantics, matching items by `key_field`.
    pub fn keyed_by(mut self, key_field: impl Into<String>) -> Self {
        self.collection = Some(CollectionHint {
            key_field: Some(key_field.into()),
        });
        self
    }

    pub fn key_field(&self) -> Option<&str> {
        self.collection.as_ref()?.key_field.as_deref()
    }
}

/// Field-descriptor table of a record type.
///
/// Field order is significant: diffs list changed fields in schema order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSchema {
    type_name: String,
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field to the table.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// An instance of a record type.
///
/// Every field of the schema has a slot; a `None` slot is uninitialized.
/// Records with uninitialized non-ignorable fields cannot be diffed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    slots: Vec<Option<Value>>,
}

impl Record {
    /// Create a record with every field uninitialized.
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let slots = vec![None; schema.fields.len()];
        Self { schema, slots }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn type_name(&self) -> &str {
        &self.schema.type_name
    }

    /// Initialize (or overwrite) a field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), TypeError> {
        let index = self
            .schema
            .position(name)
            .ok_or_else(|| TypeError::UnknownField {
                type_name: self.schema.type_name.clone(),
                field: name.to_owned(),
            })?;
        self.slots[index] = Some(value.into());
        Ok(())
    }

    /// Builder form of [`Self::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, TypeError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Return a field to the uninitialized state.
    pub fn unset(&mut self, name: &str) {
        if let Some(index) = self.schema.position(name) {
            self.slots[index] = None;
        }
    }

    /// The value of an initialized field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let index = self.schema.position(name)?;
        self.slots[index].as_ref()
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every field of the schema, in schema order, with its current value.
    pub fn fields(&self) -> impl Iterator<Item = FieldView<'_>> {
        self.schema
            .fields
            .iter()
            .zip(&self.slots)
            .map(|(spec, slot)| FieldView {
                spec,
                value: slot.as_ref(),
            })
    }
}

/// A field descriptor paired with the field's current value.
#[derive(Clone, Copy, Debug)]
pub struct FieldView<'a> {
    pub spec: &'a FieldSpec,
    pub value: Option<&'a Value>,
}

impl<'a> FieldView<'a> {
    pub fn name(&self) -> &'a str {
        &self.spec.name
    }

    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_ignorable(&self) -> bool {
        self.spec.ignorable
    }

    pub fn collection_key_field(&self) -> Option<&'a str> {
        self.spec.key_field()
    }
}

/// Exposes an embedder's type to the diff engine as a [`Record`].
pub trait ToRecord {
    fn to_record(&self) -> Record;
}
