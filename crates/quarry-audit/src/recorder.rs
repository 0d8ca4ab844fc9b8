//! Run-scoped audit recorder.
//!
//! ```no_run
//! # use quarry_audit::{AuditRecorder, MemoryAuditSink, RunId};
//! let sink = MemoryAuditSink::new();
//! let recorder = AuditRecorder::new(RunId::new(), Box::new(sink.clone()));
//! recorder.record("run_started", serde_json::json!({"sources": 3}));
//! assert_eq!(sink.names(), vec!["run_started".to_string()]);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::hash::GENESIS_HASH;
use crate::{AuditError, AuditEvent, AuditSink, RunId};

struct ChainState {
    next_sequence: u64,
    prev_hash: String,
}

/// Appends chained events for one run to a sink.
///
/// Recording never fails: a sink error is logged and counted, and the chain
/// only advances past events that were actually persisted.
pub struct AuditRecorder {
    run_id: RunId,
    sink: Box<dyn AuditSink>,
    state: Mutex<ChainState>,
    failures: AtomicU64,
}

impl AuditRecorder {
    pub fn new(run_id: RunId, sink: Box<dyn AuditSink>) -> Self {
        Self {
            run_id,
            sink,
            state: Mutex::new(ChainState {
                next_sequence: 0,
                prev_hash: GENESIS_HASH.to_string(),
            }),
            failures: AtomicU64::new(0),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Append one event.
    pub fn record(&self, event: &str, payload: serde_json::Value) {
        if let Err(e) = self.try_record(event, payload) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                run_id = %self.run_id,
                event,
                error = %e,
                "Failed to record audit event"
            );
        }
    }

    /// Number of events that could not be recorded.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn try_record(&self, event: &str, payload: serde_json::Value) -> Result<(), AuditError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AuditError::Unavailable("recorder state poisoned".to_string()))?;

        let entry = AuditEvent::chained(
            self.run_id,
            state.next_sequence,
            event,
            payload,
            &state.prev_hash,
        )?;
        self.sink.append(&entry)?;

        state.next_sequence += 1;
        state.prev_hash = entry.content_hash;
        Ok(())
    }
}
