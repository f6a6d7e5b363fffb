use thiserror::Error;

/// Errors produced by value and record operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("record type `{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
