//! Error types for the diff crate.

/// Errors that can occur during diff operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// The compared pair is structurally identical.
    ///
    /// Inside the resolver chain this is a [`crate::Resolution::Unchanged`]
    /// outcome; it only becomes an error at the top-level entry point.
    #[error("no difference detected at `{path}`")]
    NoDifference { path: String },

    /// A record field required for comparison was left uninitialized.
    #[error("record field `{field}` at `{path}` is not initialized")]
    InvalidObject { path: String, field: String },

    /// Same-type enforcement was requested but the operands differ.
    #[error("expected values of the same type at `{path}`, got {expected} and {actual}")]
    InvalidComparison {
        path: String,
        expected: String,
        actual: String,
    },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DiffError {
    /// Returns `true` for the "nothing changed" signal.
    pub fn is_no_difference(&self) -> bool {
        matches!(self, Self::NoDifference { .. })
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
