use serde::{Deserialize, Serialize};
use strata_types::Value;

/// The ordered change sets of one object, plus the type to rebuild it as.
///
/// The first change is usually a full snapshot; later ones are diffs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    target_type: String,
    changes: Vec<Value>,
}

impl ObjectDefinition {
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            changes: Vec::new(),
        }
    }

    pub fn from_changes(target_type: impl Into<String>, changes: Vec<Value>) -> Self {
        Self {
            target_type: target_type.into(),
            changes,
        }
    }

    /// Append a change set.
    pub fn add_changes(mut self, change: impl Into<Value>) -> Self {
        self.push(change);
        self
    }

    pub fn push(&mut self, change: impl Into<Value>) {
        self.changes.push(change.into());
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn changes(&self) -> &[Value] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
