use strata_types::{Value, DEFAULT_DELETE_MARKER};

/// Settings for a merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeContext {
    /// A change equal to this value removes its key from the state. Must
    /// match the marker the diff was produced with.
    pub delete_marker: Value,
}

impl Default for MergeContext {
    fn default() -> Self {
        Self {
            delete_marker: Value::from(DEFAULT_DELETE_MARKER),
        }
    }
}

impl MergeContext {
    pub fn new(delete_marker: impl Into<Value>) -> Self {
        Self {
            delete_marker: delete_marker.into(),
        }
    }
}
