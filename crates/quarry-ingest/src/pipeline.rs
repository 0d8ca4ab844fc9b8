//! Ingestion run orchestration.
//!
//! A run processes sources strictly in order: documents in discovery order,
//! chunks in body order, extracted items in model output order. Only a denied
//! gate or an unavailable allow-list stops a run; every other failure is
//! contained to the item it happened to, recorded, and processing continues.

use std::sync::Arc;
use std::time::Duration;

use quarry_audit::{AuditRecorder, RunId};
use quarry_core::{
    assess, is_injection_shaped, sanitize, sanitize_value, Chunk, Document, ExtractedNode,
    ExtractedRelationship, ThreatCheck,
};
use quarry_graph::{mutations, write_within, Endpoint, GraphError, GraphStore, Statement};
use quarry_schema::{
    validate_label, validate_property, validate_relationship_type, AllowList, AllowListService,
    Label, LabelDecision, DOCUMENT_LABEL,
};

use crate::chunker::Chunker;
use crate::config::IngestConfig;
use crate::discover::Source;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::events::PipelineEvent;
use crate::extraction::{build_prompt, excerpt, validate_extraction, ExtractionClient};
use crate::frontmatter;
use crate::gate::RunGate;
use crate::outcome::{ItemKind, ItemOutcome, RunReport};

/// Tunables of a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunker: Chunker,
    pub max_excerpt_chars: usize,
    pub write_timeout: Duration,
    pub skip_flagged_chunks: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunker: Chunker::default(),
            max_excerpt_chars: 2000,
            write_timeout: Duration::from_secs(10),
            skip_flagged_chunks: false,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Ok(Self {
            chunker: config.chunker()?,
            max_excerpt_chars: config.max_excerpt_chars,
            write_timeout: Duration::from_secs(config.write_timeout_secs),
            skip_flagged_chunks: config.skip_flagged_chunks,
        })
    }
}

/// One ingestion run's collaborators.
///
/// [`Pipeline::run`] consumes the pipeline, so its store handle is released
/// when the run ends.
pub struct Pipeline {
    store: Arc<dyn GraphStore>,
    extractor: Arc<dyn ExtractionClient>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    allow_lists: Arc<dyn AllowListService>,
    gate: Box<dyn RunGate>,
    recorder: AuditRecorder,
    options: PipelineOptions,
}

/// A chunk as seen by its extracted items.
struct ChunkContext<'a> {
    chunk_id: &'a str,
    /// Set only if the chunk itself was written.
    link: Option<&'a str>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn GraphStore>,
        extractor: Arc<dyn ExtractionClient>,
        allow_lists: Arc<dyn AllowListService>,
        gate: Box<dyn RunGate>,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            store,
            extractor,
            embedder: None,
            allow_lists,
            gate,
            recorder,
            options: PipelineOptions::default(),
        }
    }

    /// Request an embedding for every written chunk.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run_id(&self) -> RunId {
        self.recorder.run_id()
    }

    /// Ingest `sources` in order.
    ///
    /// Returns an error only if the gate denies the run or the allow-list
    /// cannot be loaded; in both cases nothing is written.
    pub async fn run(self, sources: Vec<Source>) -> Result<RunReport> {
        let mut report = RunReport::new(self.run_id());

        if let Err(e) = self.gate.check() {
            tracing::error!(run_id = %self.run_id(), error = %e, "Run denied by gate");
            self.emit(PipelineEvent::RunAborted {
                reason: e.to_string(),
            });
            return Err(e.into());
        }

        tracing::info!(run_id = %self.run_id(), sources = sources.len(), "Ingestion run started");
        self.emit(PipelineEvent::RunStarted {
            sources: sources.len(),
        });

        let allow_list = match self.allow_lists.load(true).await {
            Ok(allow_list) => allow_list,
            Err(e) => {
                tracing::error!(run_id = %self.run_id(), error = %e, "Allow-list load failed");
                self.emit(PipelineEvent::RunAborted {
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };
        self.emit(PipelineEvent::AllowListLoaded {
            labels: allow_list.node_labels().count(),
            relationship_types: allow_list.relationship_types().count(),
        });

        for source in &sources {
            self.process_source(source, &allow_list, &mut report).await;
        }

        let total = report.total();
        self.emit(PipelineEvent::RunCompleted {
            written: total.written,
            skipped: total.skipped,
            failed: total.failed,
        });
        report.audit_failures = self.recorder.failures();

        tracing::info!(
            run_id = %self.run_id(),
            written = total.written,
            skipped = total.skipped,
            failed = total.failed,
            label_fallbacks = report.label_fallbacks,
            flagged_chunks = report.flagged_chunks,
            audit_failures = report.audit_failures,
            "Ingestion run completed"
        );
        Ok(report)
    }

    // ── Documents ────────────────────────────────────────────────

    async fn process_source(
        &self,
        source: &Source,
        allow_list: &AllowList,
        report: &mut RunReport,
    ) {
        let origin = source.origin();
        let text = match source {
            Source::Path(path) => match tokio::fs::read_to_string(path).await {
                Ok(text) => text,
                Err(e) => {
                    self.skip_document(&origin, format!("unreadable: {e}"), report);
                    return;
                }
            },
            Source::Inline { text, .. } => text.clone(),
        };

        let (metadata, body) = frontmatter::parse(&text);
        let Some(raw_id) = frontmatter::document_id(&metadata) else {
            self.skip_document(&origin, "missing id".to_string(), report);
            return;
        };
        let document_id = match checked_id(&raw_id) {
            Ok(id) => id,
            Err(reason) => {
                self.skip_document(&origin, reason.to_string(), report);
                return;
            }
        };
        let document = Document {
            id: document_id,
            source: origin,
            metadata,
            body,
        };
        self.write_document(&document, allow_list, report).await;

        for (ordinal, text) in self.options.chunker.chunks(&document.body).enumerate() {
            let mut chunk = Chunk::new(&document.id, ordinal, text);
            self.process_chunk(&mut chunk, allow_list, report).await;
        }
    }

    async fn write_document(
        &self,
        document: &Document,
        allow_list: &AllowList,
        report: &mut RunReport,
    ) {
        let Document {
            id: document_id,
            source: origin,
            ..
        } = document;
        let properties: Vec<_> = document
            .metadata
            .iter()
            .filter(|(key, _)| key.as_str() != "id")
            .filter_map(|(key, value)| {
                validate_property(DOCUMENT_LABEL, key, allow_list)
                    .map(|key| (key, sanitize_value(value)))
            })
            .collect();

        let statement = mutations::upsert_document(document_id, origin, &properties);
        match self.write(&statement).await {
            Ok(()) => {
                tracing::info!(document_id = %document_id, source = %origin, "Document written");
                self.emit(PipelineEvent::DocumentWritten {
                    document_id: document_id.clone(),
                    source: origin.clone(),
                    properties: properties.len(),
                });
                report.push(ItemKind::Document, document_id, ItemOutcome::Written);
            }
            Err(e) => {
                self.emit(PipelineEvent::DocumentWriteFailed {
                    document_id: document_id.clone(),
                    error: e.to_string(),
                });
                report.push(ItemKind::Document, document_id, ItemOutcome::Failed(e.to_string()));
            }
        }
    }

    fn skip_document(&self, origin: &str, reason: String, report: &mut RunReport) {
        tracing::info!(source = %origin, reason = %reason, "Document skipped");
        self.emit(PipelineEvent::DocumentSkipped {
            source: origin.to_string(),
            reason: reason.clone(),
        });
        report.push(ItemKind::Document, origin, ItemOutcome::Skipped(reason));
    }

    // ── Chunks ───────────────────────────────────────────────────

    async fn process_chunk(
        &self,
        chunk: &mut Chunk,
        allow_list: &AllowList,
        report: &mut RunReport,
    ) {
        let written = match self.write(&mutations::upsert_chunk(chunk)).await {
            Ok(()) => {
                self.emit(PipelineEvent::ChunkWritten {
                    document_id: chunk.document_id.clone(),
                    chunk_id: chunk.id.clone(),
                });
                report.push(ItemKind::Chunk, &chunk.id, ItemOutcome::Written);
                true
            }
            Err(e) => {
                self.emit(PipelineEvent::ChunkWriteFailed {
                    document_id: chunk.document_id.clone(),
                    chunk_id: chunk.id.clone(),
                    error: e.to_string(),
                });
                report.push(ItemKind::Chunk, &chunk.id, ItemOutcome::Failed(e.to_string()));
                false
            }
        };

        let threat = assess(&chunk.text);
        let skip_extraction = threat.is_malicious() && self.options.skip_flagged_chunks;
        if threat.is_malicious() {
            report.flagged_chunks += 1;
            self.emit(PipelineEvent::ChunkFlagged {
                document_id: chunk.document_id.clone(),
                chunk_id: chunk.id.clone(),
                checks: threat.checks,
                extraction_skipped: skip_extraction,
            });
        }

        if written {
            if let Some(embedder) = &self.embedder {
                self.embed_chunk(embedder.as_ref(), chunk, report).await;
            }
        }

        if skip_extraction {
            report.push(
                ItemKind::Extraction,
                &chunk.id,
                ItemOutcome::Skipped("chunk flagged".to_string()),
            );
            return;
        }

        let prompt = build_prompt(excerpt(&chunk.text, self.options.max_excerpt_chars), allow_list);
        let extracted = match self.extractor.complete(&prompt).await {
            Ok(raw) => validate_extraction(&raw),
            Err(e) => Err(e),
        };
        let graph = match extracted {
            Ok(graph) => {
                self.emit(PipelineEvent::ExtractionSucceeded {
                    chunk_id: chunk.id.clone(),
                    nodes: graph.nodes.len(),
                    relationships: graph.relationships.len(),
                });
                report.push(ItemKind::Extraction, &chunk.id, ItemOutcome::Written);
                graph
            }
            Err(e) => {
                self.emit(PipelineEvent::ExtractionFailed {
                    chunk_id: chunk.id.clone(),
                    error: e.to_string(),
                });
                report.push(ItemKind::Extraction, &chunk.id, ItemOutcome::Failed(e.to_string()));
                return;
            }
        };

        let ctx = ChunkContext {
            chunk_id: &chunk.id,
            link: written.then_some(chunk.id.as_str()),
        };
        for node in &graph.nodes {
            self.write_node(&ctx, node, allow_list, report).await;
        }
        for rel in &graph.relationships {
            self.write_relationship(&ctx, rel, allow_list, report).await;
        }
    }

    async fn embed_chunk(
        &self,
        embedder: &dyn EmbeddingProvider,
        chunk: &mut Chunk,
        report: &mut RunReport,
    ) {
        let result = match embedder.embed(std::slice::from_ref(&chunk.text)).await {
            Ok(vectors) => match vectors.into_iter().next() {
                Some(vector) if !vector.is_empty() => {
                    let statement = mutations::set_chunk_embedding(&chunk.id, &vector);
                    match self.write(&statement).await {
                        Ok(()) => Ok(vector),
                        Err(e) => Err(e.to_string()),
                    }
                }
                _ => Err("empty embedding".to_string()),
            },
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(vector) => {
                let dimensions = vector.len();
                chunk.attach_embedding(vector);
                self.emit(PipelineEvent::EmbeddingRecorded {
                    chunk_id: chunk.id.clone(),
                    dimensions,
                });
                report.push(ItemKind::Embedding, &chunk.id, ItemOutcome::Written);
            }
            Err(error) => {
                self.emit(PipelineEvent::EmbeddingFailed {
                    chunk_id: chunk.id.clone(),
                    error: error.clone(),
                });
                report.push(ItemKind::Embedding, &chunk.id, ItemOutcome::Failed(error));
            }
        }
    }

    // ── Extracted items ──────────────────────────────────────────

    async fn write_node(
        &self,
        ctx: &ChunkContext<'_>,
        node: &ExtractedNode,
        allow_list: &AllowList,
        report: &mut RunReport,
    ) {
        let node_id = match checked_id(&node.id) {
            Ok(id) => id,
            Err(reason) => {
                self.emit(PipelineEvent::NodeRejected {
                    chunk_id: ctx.chunk_id.to_string(),
                    node_id: node.id.clone(),
                    reason: reason.to_string(),
                });
                report.push(ItemKind::Node, &node.id, ItemOutcome::Skipped(reason.to_string()));
                return;
            }
        };
        let checks: Vec<ThreatCheck> = assess(&node.id).checks;

        let label = self.resolve_label(ctx, &node_id, &node.node_type, allow_list, report);
        let statement = mutations::upsert_entity(&label, &node_id, ctx.link);
        match self.write(&statement).await {
            Ok(()) => {
                self.emit(PipelineEvent::NodeWritten {
                    chunk_id: ctx.chunk_id.to_string(),
                    node_id: node_id.clone(),
                    label: label.to_string(),
                    checks,
                });
                report.push(ItemKind::Node, node_id, ItemOutcome::Written);
            }
            Err(e) => {
                self.emit(PipelineEvent::NodeWriteFailed {
                    chunk_id: ctx.chunk_id.to_string(),
                    node_id: node_id.clone(),
                    error: e.to_string(),
                });
                report.push(ItemKind::Node, node_id, ItemOutcome::Failed(e.to_string()));
            }
        }
    }

    async fn write_relationship(
        &self,
        ctx: &ChunkContext<'_>,
        rel: &ExtractedRelationship,
        allow_list: &AllowList,
        report: &mut RunReport,
    ) {
        let item_id = format!("{}-{}->{}", rel.source_id, rel.relationship_type, rel.target_id);
        let reject = |reason: String, report: &mut RunReport| {
            self.emit(PipelineEvent::RelationshipRejected {
                chunk_id: ctx.chunk_id.to_string(),
                source_id: rel.source_id.clone(),
                target_id: rel.target_id.clone(),
                relationship_type: rel.relationship_type.clone(),
                reason: reason.clone(),
            });
            report.push(ItemKind::Relationship, &item_id, ItemOutcome::Skipped(reason));
        };

        let endpoints = (checked_id(&rel.source_id), checked_id(&rel.target_id));
        let (source_id, target_id) = match endpoints {
            (Ok(source_id), Ok(target_id)) => (source_id, target_id),
            (Err(reason), _) | (_, Err(reason)) => {
                reject(format!("endpoint {reason}"), report);
                return;
            }
        };

        let relationship_type =
            match validate_relationship_type(&rel.relationship_type, allow_list) {
                Ok(relationship_type) => relationship_type,
                Err(e) => {
                    reject(e.to_string(), report);
                    return;
                }
            };

        let source_label =
            self.resolve_label(ctx, &source_id, &rel.source_label, allow_list, report);
        let target_label =
            self.resolve_label(ctx, &target_id, &rel.target_label, allow_list, report);

        let statement = mutations::merge_relationship(
            Endpoint {
                label: &source_label,
                id: &source_id,
            },
            &relationship_type,
            Endpoint {
                label: &target_label,
                id: &target_id,
            },
            ctx.chunk_id,
        );
        match self.write(&statement).await {
            Ok(()) => {
                self.emit(PipelineEvent::RelationshipWritten {
                    chunk_id: ctx.chunk_id.to_string(),
                    source_id,
                    target_id,
                    relationship_type: relationship_type.to_string(),
                });
                report.push(ItemKind::Relationship, &item_id, ItemOutcome::Written);
            }
            Err(GraphError::Unmatched(_)) => {
                reject("endpoint not found".to_string(), report);
            }
            Err(e) => {
                self.emit(PipelineEvent::RelationshipWriteFailed {
                    chunk_id: ctx.chunk_id.to_string(),
                    source_id,
                    target_id,
                    relationship_type: relationship_type.to_string(),
                    error: e.to_string(),
                });
                report.push(ItemKind::Relationship, &item_id, ItemOutcome::Failed(e.to_string()));
            }
        }
    }

    fn resolve_label(
        &self,
        ctx: &ChunkContext<'_>,
        node_id: &str,
        candidate: &str,
        allow_list: &AllowList,
        report: &mut RunReport,
    ) -> Label {
        let decision = validate_label(candidate, allow_list);
        if let LabelDecision::Fallback { candidate, label } = &decision {
            report.label_fallbacks += 1;
            self.emit(PipelineEvent::LabelFallback {
                chunk_id: ctx.chunk_id.to_string(),
                node_id: node_id.to_string(),
                candidate: candidate.clone(),
                label: label.to_string(),
            });
        }
        decision.into_label()
    }

    // ── Plumbing ─────────────────────────────────────────────────

    async fn write(&self, statement: &Statement) -> std::result::Result<(), GraphError> {
        write_within(self.store.as_ref(), statement, self.options.write_timeout).await
    }

    fn emit(&self, event: PipelineEvent) {
        let name = event.name();
        let payload = event.payload();
        if event.is_failure() {
            tracing::warn!(
                run_id = %self.run_id(),
                event = name,
                %payload,
                "Item failed; continuing"
            );
        } else {
            tracing::debug!(run_id = %self.run_id(), event = name, %payload, "Pipeline event");
        }
        self.recorder.record(name, payload);
    }
}

/// Sanitized form of a document or extracted id.
///
/// Only structural injection syntax rejects an id; word-level hits are left to
/// the audit trail, since names like "Dropbox" are legitimate entities.
fn checked_id(raw: &str) -> std::result::Result<String, &'static str> {
    if is_injection_shaped(raw) {
        return Err("unsafe id");
    }
    let id = sanitize(raw);
    if id.is_empty() {
        return Err("empty id");
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_id_keeps_plain_names() {
        assert_eq!(checked_id("  Ada   Lovelace "), Ok("Ada Lovelace".to_string()));
        assert_eq!(checked_id("Dropbox"), Ok("Dropbox".to_string()));
        assert_eq!(checked_id("Airdrop Inc"), Ok("Airdrop Inc".to_string()));
        assert_eq!(
            checked_id("Truncated Octahedron"),
            Ok("Truncated Octahedron".to_string())
        );
    }

    #[test]
    fn checked_id_rejects_empty_and_hostile_ids() {
        assert_eq!(checked_id("   "), Err("empty id"));
        assert_eq!(checked_id("MATCH"), Err("empty id"));
        assert_eq!(checked_id("x' OR '1'='1"), Err("unsafe id"));
        assert_eq!(checked_id("<script>x</script>"), Err("unsafe id"));
    }
}
