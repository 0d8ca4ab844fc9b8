//! BLAKE3 content hashing for tamper evidence.
//!
//! Computes a deterministic hash of all event fields (excluding the
//! content_hash itself) so that any modification is detectable.

use serde::Serialize;

use crate::{AuditError, AuditEvent, RunId};

/// `prev_hash` of the first event in every run.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Hashable representation of an AuditEvent (excludes content_hash).
#[derive(Serialize)]
struct HashableEvent<'a> {
    id: &'a uuid::Uuid,
    run_id: &'a RunId,
    sequence: u64,
    event: &'a str,
    timestamp: &'a chrono::DateTime<chrono::Utc>,
    payload: &'a serde_json::Value,
    prev_hash: &'a str,
}

/// Serializes all fields except `content_hash` to JSON, then hashes the bytes
/// with BLAKE3. Returns the hex-encoded hash.
pub fn compute_event_hash(event: &AuditEvent) -> Result<String, AuditError> {
    let hashable = HashableEvent {
        id: &event.id,
        run_id: &event.run_id,
        sequence: event.sequence,
        event: &event.event,
        timestamp: &event.timestamp,
        payload: &event.payload,
        prev_hash: &event.prev_hash,
    };

    let json = serde_json::to_vec(&hashable)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}
