//! Foundation types for Strata.
//!
//! Every other Strata crate depends on `strata-types`. It defines the value
//! graph that diffs are computed over, the field tables that describe record
//! types, and the bridge to `serde_json`.
//!
//! # Key Types
//!
//! - [`Value`] -- Tagged union of null, scalar, sequence, map and record
//! - [`Scalar`] -- Strictly compared bool / int / float / string
//! - [`Key`] -- Map key, either a positional index or a name
//! - [`ValueMap`] -- Insertion-ordered map used for keyed collections and diffs
//! - [`RecordSchema`] / [`FieldSpec`] -- Static field-descriptor table of a record type
//! - [`Record`] -- An instance of a record type, with per-field initialization state

pub mod error;
pub mod json;
pub mod key;
pub mod record;
pub mod value;

pub use error::TypeError;
pub use key::Key;
pub use record::{CollectionHint, FieldKind, FieldSpec, FieldView, Record, RecordSchema, ToRecord};
pub use value::{is_list_shaped, Scalar, Value, ValueMap};

/// Sentinel written into a diff in place of a removed map entry.
pub const DEFAULT_DELETE_MARKER: &str = "__DELETED__";

/// Companion field attached to a keyed-collection entry whose merge base
/// lives under a different key than the entry itself.
pub const ORIGINAL_KEY_FIELD: &str = "_originalKey";
