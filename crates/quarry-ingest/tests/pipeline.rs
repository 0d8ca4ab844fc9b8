//! End-to-end pipeline runs against in-memory collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use quarry_audit::{verify_chain, AuditRecorder, MemoryAuditSink, RunId};
use quarry_graph::{MemoryGraphStore, StatementKind};
use quarry_ingest::chunker::Chunker;
use quarry_ingest::embedding::{EmbeddingError, EmbeddingProvider};
use quarry_ingest::error::IngestError;
use quarry_ingest::extraction::{ExtractionClient, ExtractionError};
use quarry_ingest::gate::{AccessMode, ModeGate};
use quarry_ingest::{ItemKind, ItemOutcome, Pipeline, PipelineOptions, Source};
use quarry_schema::{AllowList, AllowListService, SchemaError};

// ── Collaborators ─────────────────────────────────────────────────

struct StaticAllowLists(Option<Arc<AllowList>>);

#[async_trait]
impl AllowListService for StaticAllowLists {
    async fn load(&self, _force: bool) -> quarry_schema::error::Result<Arc<AllowList>> {
        match &self.0 {
            Some(list) => Ok(list.clone()),
            None => Err(SchemaError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "schema.toml",
            ))),
        }
    }
}

/// Replies by the first marker found in the prompt; empty graph otherwise.
#[derive(Default)]
struct ScriptedExtractor {
    replies: Vec<(&'static str, Result<String, String>)>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    fn reply(mut self, marker: &'static str, raw: serde_json::Value) -> Self {
        self.replies.push((marker, Ok(raw.to_string())));
        self
    }

    fn reply_raw(mut self, marker: &'static str, raw: &str) -> Self {
        self.replies.push((marker, Ok(raw.to_string())));
        self
    }

    fn fail(mut self, marker: &'static str, error: &str) -> Self {
        self.replies.push((marker, Err(error.to_string())));
        self
    }
}

#[async_trait]
impl ExtractionClient for ScriptedExtractor {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = prompt.rsplit("Text:\n").next().unwrap_or_default();
        match self.replies.iter().find(|(marker, _)| text.contains(marker)) {
            Some((_, Ok(raw))) => Ok(raw.clone()),
            Some((_, Err(e))) => Err(ExtractionError::Transport(e.clone())),
            None => Ok(r#"{"nodes": [], "relationships": []}"#.to_string()),
        }
    }
}

struct MarkerEmbedder {
    fail_on: &'static str,
}

#[async_trait]
impl EmbeddingProvider for MarkerEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.contains(self.fail_on)) {
            return Err(EmbeddingError::Transport("connection reset".to_string()));
        }
        Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
    }
}

fn allow_list() -> Arc<AllowList> {
    Arc::new(
        AllowList::new(
            ["Person", "Organization"],
            ["FOUNDED", "WORKS_AT"],
            [("Document".to_string(), vec!["title".to_string()])],
        )
        .unwrap(),
    )
}

/// Four-token windows with one token of overlap.
fn small_windows() -> PipelineOptions {
    PipelineOptions {
        chunker: Chunker::new(4, 1).unwrap(),
        ..Default::default()
    }
}

fn inline(origin: &str, text: &str) -> Source {
    Source::Inline {
        origin: origin.to_string(),
        text: text.to_string(),
    }
}

/// Ten tokens: chunks are a0-a3, a3-a6, a6-a9.
const TEN_TOKENS: &str = "a0 a1 a2 a3 a4 a5 a6 a7 a8 a9";

struct Harness {
    store: Arc<MemoryGraphStore>,
    sink: MemoryAuditSink,
    extractor: Arc<ScriptedExtractor>,
}

impl Harness {
    fn new(store: MemoryGraphStore, extractor: ScriptedExtractor) -> Self {
        Self {
            store: Arc::new(store),
            sink: MemoryAuditSink::new(),
            extractor: Arc::new(extractor),
        }
    }

    fn pipeline(&self, mode: AccessMode, allow_list: Option<Arc<AllowList>>) -> Pipeline {
        Pipeline::new(
            self.store.clone(),
            self.extractor.clone(),
            Arc::new(StaticAllowLists(allow_list)),
            Box::new(ModeGate::new(mode)),
            AuditRecorder::new(RunId::new(), Box::new(self.sink.clone())),
        )
        .with_options(small_windows())
    }

    fn writer(&self) -> Pipeline {
        self.pipeline(AccessMode::Write, Some(allow_list()))
    }

    fn event_names(&self) -> Vec<String> {
        self.sink.names()
    }
}

// ── Document handling ─────────────────────────────────────────────

#[tokio::test]
async fn document_without_id_is_skipped_and_next_document_processed() {
    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    let report = h
        .writer()
        .run(vec![
            inline("no-id.md", "---\ntitle: Orphan\n---\norphan body words"),
            inline("doc-2.md", "---\nid: doc-2\n---\nhello world"),
        ])
        .await
        .unwrap();

    assert_eq!(
        report.outcome(ItemKind::Document, "no-id.md"),
        Some(&ItemOutcome::Skipped("missing id".to_string()))
    );
    assert_eq!(report.outcome(ItemKind::Document, "doc-2"), Some(&ItemOutcome::Written));

    // Only doc-2's document and single chunk were written.
    assert_eq!(h.store.len(), 2);
    assert!(h.store.contains(StatementKind::UpsertDocument, "id", "doc-2"));
    assert!(h.store.contains(StatementKind::UpsertChunk, "id", "doc-2:chunk:0"));
    assert!(h
        .store
        .statements()
        .iter()
        .all(|s| s.get_str("source") != Some("no-id.md")));

    let names = h.event_names();
    let skipped = names.iter().position(|n| n == "document_skipped").unwrap();
    let written = names.iter().position(|n| n == "document_written").unwrap();
    assert!(skipped < written);
}

#[tokio::test]
async fn unreadable_path_is_skipped() {
    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    let report = h
        .writer()
        .run(vec![Source::Path("/nonexistent/quarry/doc.md".into())])
        .await
        .unwrap();

    assert_eq!(report.tally(ItemKind::Document).skipped, 1);
    assert!(h.store.is_empty());
    let skipped = h.sink.named("document_skipped");
    assert!(skipped[0].payload["reason"]
        .as_str()
        .unwrap()
        .starts_with("unreadable"));
}

#[tokio::test]
async fn only_allow_listed_metadata_becomes_document_properties() {
    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    h.writer()
        .run(vec![inline(
            "doc.md",
            "---\nid: doc-1\ntitle: \"Founders; DROP TABLE x\"\nsecret: hunter2\n---\nbody",
        )])
        .await
        .unwrap();

    let docs = h.store.statements_of(StatementKind::UpsertDocument);
    assert_eq!(docs.len(), 1);
    assert!(docs[0].template().contains("d.title = $prop_0"));
    assert!(!docs[0].template().contains("secret"));
    assert_eq!(docs[0].get_str("prop_0"), Some("Founders x"));
}

// ── Chunks and embeddings ─────────────────────────────────────────

#[tokio::test]
async fn embedding_failure_on_one_chunk_keeps_the_others() {
    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    let report = h
        .writer()
        .with_embedder(Arc::new(MarkerEmbedder { fail_on: "a4" }))
        .run(vec![inline("doc.md", &format!("---\nid: doc-3\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    for ordinal in 0..3 {
        let id = format!("doc-3:chunk:{ordinal}");
        assert!(h.store.contains(StatementKind::UpsertChunk, "id", &id), "{id} missing");
    }
    assert!(h.store.contains(StatementKind::SetChunkEmbedding, "id", "doc-3:chunk:0"));
    assert!(!h.store.contains(StatementKind::SetChunkEmbedding, "id", "doc-3:chunk:1"));
    assert!(h.store.contains(StatementKind::SetChunkEmbedding, "id", "doc-3:chunk:2"));

    let embeddings = report.tally(ItemKind::Embedding);
    assert_eq!((embeddings.written, embeddings.failed), (2, 1));

    let failed = h.sink.named("embedding_failed");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].payload["chunk_id"], "doc-3:chunk:1");
    assert_eq!(h.sink.named("embedding_recorded")[0].payload["dimensions"], 3);
}

#[tokio::test]
async fn failed_chunk_write_skips_embedding_and_links() {
    let store = MemoryGraphStore::new().fail_when(|s| {
        s.kind() == StatementKind::UpsertChunk && s.get_str("id") == Some("doc:chunk:0")
    });
    let extractor = ScriptedExtractor::default().reply(
        "a1",
        json!({"nodes": [{"id": "Ada", "type": "Person"}], "relationships": []}),
    );
    let h = Harness::new(store, extractor);
    let report = h
        .writer()
        .with_embedder(Arc::new(MarkerEmbedder { fail_on: "never" }))
        .run(vec![inline("doc.md", &format!("---\nid: doc\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    assert!(matches!(
        report.outcome(ItemKind::Chunk, "doc:chunk:0"),
        Some(ItemOutcome::Failed(_))
    ));
    assert!(report.outcome(ItemKind::Embedding, "doc:chunk:0").is_none());
    assert!(!h.store.contains(StatementKind::SetChunkEmbedding, "id", "doc:chunk:0"));

    // The entity is still written, without a MENTIONS link to the missing chunk.
    let entities = h.store.statements_of(StatementKind::UpsertEntity);
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].get_str("id"), Some("Ada"));
    assert!(entities[0].get("chunk_id").is_none());

    // Later chunks are unaffected.
    assert!(h.store.contains(StatementKind::SetChunkEmbedding, "id", "doc:chunk:1"));
    assert_eq!(h.sink.named("chunk_write_failed").len(), 1);
}

#[tokio::test]
async fn slow_store_writes_time_out_per_item() {
    let h = Harness::new(
        MemoryGraphStore::new().with_latency(Duration::from_millis(200)),
        ScriptedExtractor::default(),
    );
    let pipeline = h.writer().with_options(PipelineOptions {
        write_timeout: Duration::from_millis(5),
        ..small_windows()
    });
    let report = pipeline
        .run(vec![inline("doc.md", "---\nid: slow\n---\none two three")])
        .await
        .unwrap();

    assert!(matches!(
        report.outcome(ItemKind::Document, "slow"),
        Some(ItemOutcome::Failed(e)) if e.contains("timed out")
    ));
    assert_eq!(report.tally(ItemKind::Chunk).failed, 1);
    assert!(h.store.is_empty());
    assert_eq!(h.event_names().last().map(String::as_str), Some("run_completed"));
}

// ── Extraction and validation ─────────────────────────────────────

#[tokio::test]
async fn unknown_relationship_type_is_rejected_and_remaining_chunks_processed() {
    let extractor = ScriptedExtractor::default().reply(
        "a1",
        json!({
            "nodes": [
                {"id": "Alice", "type": "Person"},
                {"id": "Acme", "type": "Organization"}
            ],
            "relationships": [
                {"source_id": "Alice", "target_id": "Acme", "relationship_type": "UNKNOWN_REL",
                 "source_label": "Person", "target_label": "Organization"},
                {"source_id": "Alice", "target_id": "Acme", "relationship_type": "FOUNDED",
                 "source_label": "Person", "target_label": "Organization"}
            ]
        }),
    );
    let h = Harness::new(MemoryGraphStore::new(), extractor);
    let report = h
        .writer()
        .run(vec![inline("doc.md", &format!("---\nid: doc-4\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    let rels = h.store.statements_of(StatementKind::MergeRelationship);
    assert_eq!(rels.len(), 1);
    assert!(rels[0].template().contains("[r:FOUNDED]"));
    assert!(h
        .store
        .statements()
        .iter()
        .all(|s| !s.template().contains("UNKNOWN_REL")));

    let rejected = h.sink.named("relationship_rejected");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].payload["relationship_type"], "UNKNOWN_REL");

    assert_eq!(report.tally(ItemKind::Relationship).skipped, 1);
    assert_eq!(report.tally(ItemKind::Relationship).written, 1);
    assert_eq!(report.tally(ItemKind::Chunk).written, 3);
    assert_eq!(h.sink.named("extraction_succeeded").len(), 3);
}

#[tokio::test]
async fn unknown_label_falls_back_to_entity() {
    let extractor = ScriptedExtractor::default().reply(
        "a1",
        json!({"nodes": [{"id": "Nautilus", "type": "Spaceship"}], "relationships": []}),
    );
    let h = Harness::new(MemoryGraphStore::new(), extractor);
    let report = h
        .writer()
        .run(vec![inline("doc.md", &format!("---\nid: doc-5\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    let entities = h.store.statements_of(StatementKind::UpsertEntity);
    assert_eq!(entities.len(), 1);
    assert!(entities[0].template().starts_with("MERGE (n:Entity {id: $id})"));
    assert_eq!(entities[0].get_str("chunk_id"), Some("doc-5:chunk:0"));

    let fallback = h.sink.named("label_fallback");
    assert_eq!(fallback[0].payload["candidate"], "Spaceship");
    assert_eq!(fallback[0].payload["label"], "Entity");
    assert_eq!(report.label_fallbacks, 1);
}

#[tokio::test]
async fn unsafe_node_ids_are_rejected_individually() {
    let extractor = ScriptedExtractor::default().reply(
        "a1",
        json!({
            "nodes": [
                {"id": "; --", "type": "Person"},
                {"id": "x' OR '1'='1", "type": "Person"},
                {"id": "Grace  Hopper", "type": "Person"}
            ],
            "relationships": []
        }),
    );
    let h = Harness::new(MemoryGraphStore::new(), extractor);
    let report = h
        .writer()
        .run(vec![inline("doc.md", &format!("---\nid: doc-6\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    let entities = h.store.statements_of(StatementKind::UpsertEntity);
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].get_str("id"), Some("Grace Hopper"));
    assert_eq!(h.sink.named("node_rejected").len(), 2);
    assert_eq!(report.tally(ItemKind::Node).skipped, 2);
}

fn alice_and_acme(relationships: serde_json::Value) -> ScriptedExtractor {
    ScriptedExtractor::default().reply(
        "a1",
        json!({
            "nodes": [
                {"id": "Alice", "type": "Person"},
                {"id": "Acme", "type": "Organization"}
            ],
            "relationships": relationships
        }),
    )
}

#[tokio::test]
async fn node_write_failure_is_contained_to_the_node() {
    let store = MemoryGraphStore::new()
        .fail_when(|s| s.kind() == StatementKind::UpsertEntity && s.get_str("id") == Some("Alice"));
    let extractor = alice_and_acme(json!([
        {"source_id": "Alice", "target_id": "Acme", "relationship_type": "FOUNDED",
         "source_label": "Person", "target_label": "Organization"}
    ]));
    let h = Harness::new(store, extractor);
    let report = h
        .writer()
        .run(vec![inline("doc.md", &format!("---\nid: doc-13\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    assert!(matches!(
        report.outcome(ItemKind::Node, "Alice"),
        Some(ItemOutcome::Failed(e)) if e.contains("rejected")
    ));
    assert_eq!(report.outcome(ItemKind::Node, "Acme"), Some(&ItemOutcome::Written));
    assert!(h.store.has_node("Organization", "Acme"));

    let failed = h.sink.named("node_write_failed");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].payload["node_id"], "Alice");
    assert_eq!(failed[0].payload["chunk_id"], "doc-13:chunk:0");

    // The relationship cannot attach to the missing node.
    assert!(h.store.statements_of(StatementKind::MergeRelationship).is_empty());
    let rejected = h.sink.named("relationship_rejected");
    assert_eq!(rejected[0].payload["reason"], "endpoint not found");
    assert_eq!(report.tally(ItemKind::Chunk).written, 3);
}

#[tokio::test]
async fn relationship_write_failure_is_contained_to_the_relationship() {
    let store = MemoryGraphStore::new().fail_when(|s| {
        s.kind() == StatementKind::MergeRelationship && s.template().contains("[r:FOUNDED]")
    });
    let extractor = alice_and_acme(json!([
        {"source_id": "Alice", "target_id": "Acme", "relationship_type": "FOUNDED",
         "source_label": "Person", "target_label": "Organization"},
        {"source_id": "Alice", "target_id": "Acme", "relationship_type": "WORKS_AT",
         "source_label": "Person", "target_label": "Organization"}
    ]));
    let h = Harness::new(store, extractor);
    let report = h
        .writer()
        .run(vec![inline("doc.md", &format!("---\nid: doc-14\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    let rels = report.tally(ItemKind::Relationship);
    assert_eq!((rels.written, rels.failed), (1, 1));
    assert!(matches!(
        report.outcome(ItemKind::Relationship, "Alice-FOUNDED->Acme"),
        Some(ItemOutcome::Failed(_))
    ));
    assert_eq!(
        report.outcome(ItemKind::Relationship, "Alice-WORKS_AT->Acme"),
        Some(&ItemOutcome::Written)
    );

    let failed = h.sink.named("relationship_write_failed");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].payload["relationship_type"], "FOUNDED");
    assert_eq!(failed[0].payload["source_id"], "Alice");
    assert_eq!(failed[0].payload["target_id"], "Acme");
    assert_eq!(h.sink.named("relationship_written").len(), 1);
    assert_eq!(h.sink.named("node_written").len(), 2);
}

#[tokio::test]
async fn relationship_with_unmatched_endpoint_label_is_not_reported_written() {
    let extractor = ScriptedExtractor::default().reply(
        "a1",
        json!({
            "nodes": [{"id": "Alice", "type": "Person"}],
            "relationships": [
                {"source_id": "Alice", "target_id": "Alice", "relationship_type": "WORKS_AT",
                 "source_label": "Organization", "target_label": "Person"}
            ]
        }),
    );
    let h = Harness::new(MemoryGraphStore::new(), extractor);
    let report = h
        .writer()
        .run(vec![inline("doc.md", &format!("---\nid: doc-15\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    let rels = report.tally(ItemKind::Relationship);
    assert_eq!((rels.written, rels.skipped), (0, 1));
    assert!(h.sink.named("relationship_written").is_empty());
    assert_eq!(
        h.sink.named("relationship_rejected")[0].payload["reason"],
        "endpoint not found"
    );
}

#[tokio::test]
async fn names_containing_keywords_are_kept() {
    let extractor = ScriptedExtractor::default().reply(
        "hired",
        json!({
            "nodes": [
                {"id": "Dropbox", "type": "Organization"},
                {"id": "Truncated Octahedron", "type": "Shape"}
            ],
            "relationships": []
        }),
    );
    let h = Harness::new(MemoryGraphStore::new(), extractor);
    let report = h
        .writer()
        .run(vec![inline("doc.md", "---\nid: drop-notes\n---\nDropbox hired Ada")])
        .await
        .unwrap();

    assert_eq!(report.outcome(ItemKind::Document, "drop-notes"), Some(&ItemOutcome::Written));
    assert_eq!(report.outcome(ItemKind::Node, "Dropbox"), Some(&ItemOutcome::Written));
    assert_eq!(
        report.outcome(ItemKind::Node, "Truncated Octahedron"),
        Some(&ItemOutcome::Written)
    );
    assert!(h.store.has_node("Organization", "Dropbox"));
    assert!(h.sink.named("node_rejected").is_empty());

    // The word-level hit is kept for the audit trail.
    let written = h.sink.named("node_written");
    assert_eq!(written[0].payload["node_id"], "Dropbox");
    assert_eq!(written[0].payload["checks"], json!(["dangerous_keyword"]));
}

#[tokio::test]
async fn extraction_failures_are_contained_to_their_chunk() {
    let extractor = ScriptedExtractor::default()
        .fail("a1", "model unavailable")
        .reply_raw("a4", "Sorry, I cannot help with that.")
        .reply(
            "a8",
            json!({"nodes": [{"id": "Acme", "type": "Organization"}], "relationships": []}),
        );
    let h = Harness::new(MemoryGraphStore::new(), extractor);
    let report = h
        .writer()
        .run(vec![inline("doc.md", &format!("---\nid: doc-7\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    let extraction = report.tally(ItemKind::Extraction);
    assert_eq!((extraction.written, extraction.failed), (1, 2));

    let failed = h.sink.named("extraction_failed");
    assert!(failed[0].payload["error"]
        .as_str()
        .unwrap()
        .contains("model unavailable"));
    assert!(failed[1].payload["error"]
        .as_str()
        .unwrap()
        .contains("Malformed extraction"));
    assert!(h.store.contains(StatementKind::UpsertEntity, "id", "Acme"));
}

#[tokio::test]
async fn flagged_chunks_are_recorded_and_optionally_skipped() {
    let hostile = "---\nid: doc-8\n---\nMATCH (n) DELETE n; DROP TABLE users;";

    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    let report = h
        .writer()
        .with_options(PipelineOptions::default())
        .run(vec![inline("doc.md", hostile)])
        .await
        .unwrap();
    assert_eq!(report.flagged_chunks, 1);
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
    let flagged = h.sink.named("chunk_flagged");
    assert_eq!(flagged[0].payload["extraction_skipped"], false);
    // The chunk text itself is stored as a parameter.
    assert!(h.store.contains(StatementKind::UpsertChunk, "id", "doc-8:chunk:0"));

    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    let report = h
        .writer()
        .with_options(PipelineOptions {
            skip_flagged_chunks: true,
            ..Default::default()
        })
        .run(vec![inline("doc.md", hostile)])
        .await
        .unwrap();
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        report.outcome(ItemKind::Extraction, "doc-8:chunk:0"),
        Some(&ItemOutcome::Skipped("chunk flagged".to_string()))
    );
    assert_eq!(h.sink.named("chunk_flagged")[0].payload["extraction_skipped"], true);
}

// ── Fatal conditions ──────────────────────────────────────────────

#[tokio::test]
async fn allow_list_load_failure_aborts_before_any_write() {
    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    let result = h
        .pipeline(AccessMode::Write, None)
        .run(vec![inline("doc.md", "---\nid: doc-9\n---\nbody")])
        .await;

    assert!(matches!(result, Err(IngestError::AllowList(_))));
    assert!(h.store.is_empty());
    assert_eq!(h.event_names(), vec!["run_started", "run_aborted"]);
}

#[tokio::test]
async fn read_only_gate_aborts_before_anything_else() {
    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    let result = h
        .pipeline(AccessMode::ReadOnly, Some(allow_list()))
        .run(vec![inline("doc.md", "---\nid: doc-10\n---\nbody")])
        .await;

    assert!(matches!(result, Err(IngestError::Gate(_))));
    assert!(h.store.is_empty());
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.event_names(), vec!["run_aborted"]);
}

// ── Audit trail ───────────────────────────────────────────────────

#[tokio::test]
async fn run_produces_one_verifiable_audit_chain() {
    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    h.writer()
        .run(vec![inline("doc.md", &format!("---\nid: doc-11\n---\n{TEN_TOKENS}"))])
        .await
        .unwrap();

    let events = h.sink.events();
    verify_chain(&events).unwrap();
    assert_eq!(events.first().map(|e| e.event.as_str()), Some("run_started"));
    assert_eq!(events[1].event, "allow_list_loaded");
    assert_eq!(events.last().map(|e| e.event.as_str()), Some("run_completed"));
    assert_eq!(h.sink.named("chunk_written").len(), 3);
}

#[tokio::test]
async fn audit_sink_failure_does_not_stop_the_run() {
    let h = Harness::new(MemoryGraphStore::new(), ScriptedExtractor::default());
    h.sink.set_failing(true);
    let report = h
        .writer()
        .run(vec![inline("doc.md", "---\nid: doc-12\n---\nhello world")])
        .await
        .unwrap();

    assert!(report.audit_failures > 0);
    assert!(h.sink.events().is_empty());
    assert!(h.store.contains(StatementKind::UpsertChunk, "id", "doc-12:chunk:0"));
}
