//! Audit storage: the sink trait plus JSONL file and in-memory implementations.
//!
//! The file sink writes one JSON object per line, one file per run,
//! organized by date:
//! ```text
//! {root}/
//!   2024/
//!     01/
//!       15/
//!         {run_id}.jsonl
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::hash::GENESIS_HASH;
use crate::{AuditEvent, RunId};

/// Errors that can occur during audit storage and verification.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Integrity check failed for event {sequence}: stored hash does not match content")]
    IntegrityViolation { sequence: u64 },

    #[error("Audit chain broken at event {sequence}: {reason}")]
    ChainBroken { sequence: u64, reason: String },

    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for audit persistence backends. Entries are only ever appended.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Append-only JSONL file sink; one file per run.
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    /// Open (or create) the stream for `run_id` under `root`.
    pub fn open(
        root: impl AsRef<Path>,
        run_id: RunId,
        started_at: DateTime<Utc>,
    ) -> Result<Self, AuditError> {
        let dir = root
            .as_ref()
            .join(started_at.format("%Y/%m/%d").to_string());
        fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.jsonl", run_id.0));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        tracing::debug!(run_id = %run_id, path = %path.display(), "Audit stream opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| AuditError::Unavailable("audit file lock poisoned".to_string()))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// In-memory sink. Clones share the same buffer, so a test can keep one
/// handle while the recorder owns another.
#[derive(Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Names of recorded events, in order.
    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event).collect()
    }

    /// Recorded events with the given name.
    pub fn named(&self, event: &str) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event == event)
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<(), AuditError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Unavailable("memory sink set to fail".to_string()));
        }
        self.events
            .lock()
            .map_err(|_| AuditError::Unavailable("memory sink lock poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Read every event from a JSONL audit stream.
pub fn read_run(path: &Path) -> Result<Vec<AuditEvent>, AuditError> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}

/// Check that `events` form one unbroken, untampered chain.
pub fn verify_chain(events: &[AuditEvent]) -> Result<(), AuditError> {
    let mut prev_hash = GENESIS_HASH;
    let run_id = events.first().map(|e| e.run_id);

    for (expected, event) in (0u64..).zip(events) {
        if Some(event.run_id) != run_id {
            return Err(AuditError::ChainBroken {
                sequence: event.sequence,
                reason: format!("event belongs to run {}", event.run_id),
            });
        }
        if event.sequence != expected {
            return Err(AuditError::ChainBroken {
                sequence: event.sequence,
                reason: format!("expected sequence {expected}"),
            });
        }
        if event.prev_hash != prev_hash {
            return Err(AuditError::ChainBroken {
                sequence: event.sequence,
                reason: "previous hash does not match".to_string(),
            });
        }
        if !event.verify_integrity() {
            return Err(AuditError::IntegrityViolation {
                sequence: event.sequence,
            });
        }
        prev_hash = event.content_hash.as_str();
    }
    Ok(())
}
