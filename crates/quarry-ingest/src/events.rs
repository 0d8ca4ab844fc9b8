//! Audit event vocabulary of an ingestion run.

use serde::Serialize;
use serde_json::Value;

use quarry_core::ThreatCheck;

/// One decision point of a run. Serializes as `{"event": name, "payload": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        sources: usize,
    },
    AllowListLoaded {
        labels: usize,
        relationship_types: usize,
    },
    DocumentSkipped {
        source: String,
        reason: String,
    },
    DocumentWritten {
        document_id: String,
        source: String,
        properties: usize,
    },
    DocumentWriteFailed {
        document_id: String,
        error: String,
    },
    ChunkWritten {
        document_id: String,
        chunk_id: String,
    },
    ChunkWriteFailed {
        document_id: String,
        chunk_id: String,
        error: String,
    },
    ChunkFlagged {
        document_id: String,
        chunk_id: String,
        checks: Vec<ThreatCheck>,
        extraction_skipped: bool,
    },
    EmbeddingRecorded {
        chunk_id: String,
        dimensions: usize,
    },
    EmbeddingFailed {
        chunk_id: String,
        error: String,
    },
    ExtractionSucceeded {
        chunk_id: String,
        nodes: usize,
        relationships: usize,
    },
    ExtractionFailed {
        chunk_id: String,
        error: String,
    },
    LabelFallback {
        chunk_id: String,
        node_id: String,
        candidate: String,
        label: String,
    },
    NodeWritten {
        chunk_id: String,
        node_id: String,
        label: String,
        /// Heuristic checks the raw id tripped without being rejected.
        checks: Vec<ThreatCheck>,
    },
    NodeRejected {
        chunk_id: String,
        node_id: String,
        reason: String,
    },
    NodeWriteFailed {
        chunk_id: String,
        node_id: String,
        error: String,
    },
    RelationshipWritten {
        chunk_id: String,
        source_id: String,
        target_id: String,
        relationship_type: String,
    },
    RelationshipRejected {
        chunk_id: String,
        source_id: String,
        target_id: String,
        relationship_type: String,
        reason: String,
    },
    RelationshipWriteFailed {
        chunk_id: String,
        source_id: String,
        target_id: String,
        relationship_type: String,
        error: String,
    },
    RunCompleted {
        written: usize,
        skipped: usize,
        failed: usize,
    },
    RunAborted {
        reason: String,
    },
}

impl PipelineEvent {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::RunStarted { .. } => "run_started",
            PipelineEvent::AllowListLoaded { .. } => "allow_list_loaded",
            PipelineEvent::DocumentSkipped { .. } => "document_skipped",
            PipelineEvent::DocumentWritten { .. } => "document_written",
            PipelineEvent::DocumentWriteFailed { .. } => "document_write_failed",
            PipelineEvent::ChunkWritten { .. } => "chunk_written",
            PipelineEvent::ChunkWriteFailed { .. } => "chunk_write_failed",
            PipelineEvent::ChunkFlagged { .. } => "chunk_flagged",
            PipelineEvent::EmbeddingRecorded { .. } => "embedding_recorded",
            PipelineEvent::EmbeddingFailed { .. } => "embedding_failed",
            PipelineEvent::ExtractionSucceeded { .. } => "extraction_succeeded",
            PipelineEvent::ExtractionFailed { .. } => "extraction_failed",
            PipelineEvent::LabelFallback { .. } => "label_fallback",
            PipelineEvent::NodeWritten { .. } => "node_written",
            PipelineEvent::NodeRejected { .. } => "node_rejected",
            PipelineEvent::NodeWriteFailed { .. } => "node_write_failed",
            PipelineEvent::RelationshipWritten { .. } => "relationship_written",
            PipelineEvent::RelationshipRejected { .. } => "relationship_rejected",
            PipelineEvent::RelationshipWriteFailed { .. } => "relationship_write_failed",
            PipelineEvent::RunCompleted { .. } => "run_completed",
            PipelineEvent::RunAborted { .. } => "run_aborted",
        }
    }

    /// The event's fields as a JSON object.
    pub fn payload(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("payload").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    /// Whether the event reports a contained failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PipelineEvent::DocumentWriteFailed { .. }
                | PipelineEvent::ChunkWriteFailed { .. }
                | PipelineEvent::EmbeddingFailed { .. }
                | PipelineEvent::ExtractionFailed { .. }
                | PipelineEvent::NodeWriteFailed { .. }
                | PipelineEvent::RelationshipWriteFailed { .. }
        )
    }
}
