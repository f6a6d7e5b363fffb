/// Errors produced while replaying changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("change #{index} is a {kind}, expected a map")]
    InvalidChange { index: usize, kind: String },

    #[error("no schema registered for type `{0}`")]
    UnknownType(String),

    #[error("`{type_name}.{field}` is missing")]
    MissingField { type_name: String, field: String },

    #[error("`{type_name}.{field}` expected {expected}, got {actual}")]
    TypeMismatch {
        type_name: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("no changes recorded for {target_type} `{id}`")]
    StreamNotFound { target_type: String, id: String },

    #[error("change log error: {0}")]
    Storage(String),
}
