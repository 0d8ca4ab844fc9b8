//! Error types for the quarry-schema crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid {kind} identifier in schema: {value:?}")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Schema lists structural {kind} {value:?}, which extraction may not use")]
    Reserved { kind: &'static str, value: String },

    #[error("Schema defines no node labels")]
    EmptyNodeLabels,

    #[error("Failed to parse schema file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Snapshot integrity check failed: stored hash does not match content")]
    IntegrityViolation,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
