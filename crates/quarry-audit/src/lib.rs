//! quarry-audit: Tamper-evident record of ingestion decisions.
//!
//! Every decision point of an ingestion run is captured as an [`AuditEvent`].
//! Events are append-only. Each one is content-hashed with BLAKE3 and carries
//! the hash of its predecessor, so a run's stream forms a chain in which any
//! edit, deletion or reordering is detectable.

pub mod hash;
pub mod recorder;
pub mod sink;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use recorder::AuditRecorder;
pub use sink::{read_run, verify_chain, AuditError, AuditSink, JsonlAuditSink, MemoryAuditSink};

/// Unique identifier for an ingestion run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable entry in a run's audit stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub id: Uuid,
    /// Run this event belongs to.
    pub run_id: RunId,
    /// Position in the run's stream, starting at 0.
    pub sequence: u64,
    /// Stable event name (e.g. "chunk_written").
    pub event: String,
    pub timestamp: DateTime<Utc>,
    /// Structured details: document/chunk/item ids, error text.
    pub payload: serde_json::Value,
    /// Hash of the previous event, or [`hash::GENESIS_HASH`] for the first.
    pub prev_hash: String,
    /// BLAKE3 content hash (hex) of every other field.
    pub content_hash: String,
}

impl AuditEvent {
    /// Build and hash the next event in a chain.
    pub fn chained(
        run_id: RunId,
        sequence: u64,
        event: &str,
        payload: serde_json::Value,
        prev_hash: &str,
    ) -> Result<Self, AuditError> {
        let mut entry = Self {
            id: Uuid::new_v4(),
            run_id,
            sequence,
            event: event.to_string(),
            timestamp: Utc::now(),
            payload,
            prev_hash: prev_hash.to_string(),
            content_hash: String::new(),
        };
        entry.content_hash = entry.compute_hash()?;
        Ok(entry)
    }

    /// Compute the BLAKE3 hash of the event's content.
    /// The hash covers all fields except `content_hash` itself.
    pub fn compute_hash(&self) -> Result<String, AuditError> {
        hash::compute_event_hash(self)
    }

    /// Verify that the stored content_hash matches a freshly computed hash.
    pub fn verify_integrity(&self) -> bool {
        self.compute_hash()
            .map(|hash| hash == self.content_hash)
            .unwrap_or(false)
    }
}
