//! Process-level authorization checked before a run starts.

use serde::{Deserialize, Serialize};

/// Whether this process may write to the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    ReadOnly,
    #[default]
    Write,
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("process is in read-only mode; ingestion requires write access")]
    ReadOnly,

    #[error("run denied: {0}")]
    Denied(String),
}

/// Decides whether an ingestion run may proceed at all.
pub trait RunGate: Send + Sync {
    fn check(&self) -> Result<(), GateError>;
}

/// Gate driven by the configured [`AccessMode`].
#[derive(Debug, Clone, Copy)]
pub struct ModeGate {
    mode: AccessMode,
}

impl ModeGate {
    pub fn new(mode: AccessMode) -> Self {
        Self { mode }
    }
}

impl RunGate for ModeGate {
    fn check(&self) -> Result<(), GateError> {
        match self.mode {
            AccessMode::Write => Ok(()),
            AccessMode::ReadOnly => Err(GateError::ReadOnly),
        }
    }
}
