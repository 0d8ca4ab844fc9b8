//! Core domain types for document ingestion.
//!
//! A source file becomes a [`Document`], its body is split into [`Chunk`]s,
//! and the extraction step turns each chunk into an [`ExtractedGraph`].

use serde::{Deserialize, Serialize};

/// Ordered metadata mapping parsed from a document's frontmatter.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ── Documents ─────────────────────────────────────────────────────

/// One parsed source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Frontmatter `id`, sanitized.
    pub id: String,
    /// Where the document came from (path or caller-supplied origin).
    pub source: String,
    pub metadata: Metadata,
    pub body: String,
}

// ── Chunks ────────────────────────────────────────────────────────

/// A bounded, contiguous slice of a document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub ordinal: usize,
    pub text: String,
    embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(document_id: &str, ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            id: Self::id_for(document_id, ordinal),
            document_id: document_id.to_string(),
            ordinal,
            text: text.into(),
            embedding: None,
        }
    }

    /// Deterministic chunk id: the document id plus the chunk ordinal.
    ///
    /// The ordinal is always the last `:`-separated segment, so two distinct
    /// `(document_id, ordinal)` pairs never produce the same id.
    pub fn id_for(document_id: &str, ordinal: usize) -> String {
        format!("{document_id}:chunk:{ordinal}")
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    /// Attach an embedding. Returns `false` (and keeps the existing vector) if
    /// one was already attached.
    pub fn attach_embedding(&mut self, embedding: Vec<f32>) -> bool {
        if self.embedding.is_some() {
            return false;
        }
        self.embedding = Some(embedding);
        true
    }
}

// ── Extraction output ─────────────────────────────────────────────
//
// Unknown fields are an error: a reply with extra keys does not have the
// shape that was asked for.

/// An entity proposed by the extraction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

/// A relationship proposed by the extraction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedRelationship {
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: String,
    pub source_label: String,
    pub target_label: String,
}

/// Everything extracted from one chunk, in model output order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedGraph {
    pub nodes: Vec<ExtractedNode>,
    pub relationships: Vec<ExtractedRelationship>,
}

impl ExtractedGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_derived_from_document_and_ordinal() {
        let a = Chunk::new("doc-1", 0, "alpha");
        let b = Chunk::new("doc-1", 1, "beta");
        assert_eq!(a.id, "doc-1:chunk:0");
        assert_eq!(b.id, Chunk::id_for("doc-1", 1));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn embedding_can_only_be_attached_once() {
        let mut chunk = Chunk::new("doc", 0, "text");
        assert!(chunk.embedding().is_none());
        assert!(chunk.attach_embedding(vec![0.1, 0.2]));
        assert!(!chunk.attach_embedding(vec![9.9]));
        assert_eq!(chunk.embedding(), Some(&[0.1, 0.2][..]));
    }

    #[test]
    fn extracted_node_uses_type_field_name() {
        let node: ExtractedNode =
            serde_json::from_str(r#"{"id": "Ada Lovelace", "type": "Person"}"#).unwrap();
        assert_eq!(node.node_type, "Person");
    }

    #[test]
    fn extra_fields_are_rejected() {
        let node = serde_json::from_str::<ExtractedNode>(
            r#"{"id": "Ada Lovelace", "type": "Person", "confidence": 0.9}"#,
        );
        assert!(node.is_err());

        let graph = serde_json::from_str::<ExtractedGraph>(
            r#"{"nodes": [], "relationships": [], "notes": "none"}"#,
        );
        assert!(graph.is_err());
    }
}
