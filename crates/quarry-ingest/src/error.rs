//! Error types for the quarry-ingest crate.
//!
//! These are run-level errors. Failures scoped to one document, chunk or
//! extracted item are recorded as outcomes instead (see [`crate::outcome`]).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("Allow-list unavailable: {0}")]
    AllowList(#[from] quarry_schema::SchemaError),

    #[error("Run not permitted: {0}")]
    Gate(#[from] crate::gate::GateError),

    #[error("Graph error: {0}")]
    Graph(#[from] quarry_graph::GraphError),

    #[error("Audit error: {0}")]
    Audit(#[from] quarry_audit::AuditError),

    #[error("Invalid include pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
