//! Write statements for the knowledge graph.
//!
//! All mutations use MERGE (upsert) semantics so re-ingesting a document is
//! idempotent. Nodes are identified by `id` within their label. The only
//! identifiers interpolated into a template are the structural ones from
//! [`quarry_schema::reserved`], [`Label`], [`RelationshipType`] and
//! [`PropertyKey`]; everything else is a parameter.

use chrono::Utc;

use quarry_core::Chunk;
use quarry_schema::{
    Label, PropertyKey, RelationshipType, CHUNK_LABEL, DOCUMENT_LABEL, MENTIONS, PART_OF,
};

use crate::statement::{Statement, StatementKind, MATCHED_COLUMN};

/// Upsert a Document node with its allow-listed frontmatter properties.
pub fn upsert_document(
    document_id: &str,
    source: &str,
    properties: &[(PropertyKey, String)],
) -> Statement {
    let assignments: String = properties
        .iter()
        .enumerate()
        .map(|(i, (key, _))| format!(", d.{key} = $prop_{i}"))
        .collect();

    let template = format!(
        "MERGE (d:{DOCUMENT_LABEL} {{id: $id}})
         ON CREATE SET d.first_seen = $now
         SET d.source = $source, d.last_seen = $now{assignments}"
    );

    properties.iter().enumerate().fold(
        Statement::new(StatementKind::UpsertDocument, template)
            .creating(DOCUMENT_LABEL, document_id)
            .param("id", document_id)
            .param("source", source)
            .param("now", Utc::now().to_rfc3339()),
        |stmt, (i, (_, value))| stmt.param(&format!("prop_{i}"), value.as_str()),
    )
}

/// Upsert a Chunk node and link it to its document with `PART_OF`.
pub fn upsert_chunk(chunk: &Chunk) -> Statement {
    let template = format!(
        "MERGE (d:{DOCUMENT_LABEL} {{id: $document_id}})
         MERGE (c:{CHUNK_LABEL} {{id: $id}})
         ON CREATE SET c.first_seen = $now
         SET c.text = $text, c.ordinal = $ordinal,
             c.document_id = $document_id, c.last_seen = $now
         MERGE (c)-[:{PART_OF}]->(d)"
    );

    Statement::new(StatementKind::UpsertChunk, template)
        .creating(DOCUMENT_LABEL, &chunk.document_id)
        .creating(CHUNK_LABEL, &chunk.id)
        .param("id", chunk.id.as_str())
        .param("document_id", chunk.document_id.as_str())
        .param("text", chunk.text.as_str())
        .param("ordinal", chunk.ordinal as i64)
        .param("now", Utc::now().to_rfc3339())
}

/// Attach an embedding vector to an existing chunk.
pub fn set_chunk_embedding(chunk_id: &str, embedding: &[f32]) -> Statement {
    let template = format!(
        "MATCH (c:{CHUNK_LABEL} {{id: $id}})
         SET c.embedding = $embedding, c.embedding_dim = $dim
         RETURN count(c) AS {MATCHED_COLUMN}"
    );

    Statement::new(StatementKind::SetChunkEmbedding, template)
        .requiring(CHUNK_LABEL, chunk_id)
        .param("id", chunk_id)
        .param(
            "embedding",
            embedding.iter().map(|v| f64::from(*v)).collect::<Vec<f64>>(),
        )
        .param("dim", embedding.len() as i64)
}

/// Upsert an extracted entity. When `chunk_id` is given the entity is linked
/// from that chunk with `MENTIONS`; the entity is written even if the chunk
/// does not exist.
pub fn upsert_entity(label: &Label, id: &str, chunk_id: Option<&str>) -> Statement {
    let mut template = format!(
        "MERGE (n:{label} {{id: $id}})
         ON CREATE SET n.first_seen = $now
         SET n.last_seen = $now"
    );
    if chunk_id.is_some() {
        template.push_str(&format!(
            "
         WITH n
         MATCH (c:{CHUNK_LABEL} {{id: $chunk_id}})
         MERGE (c)-[:{MENTIONS}]->(n)"
        ));
    }

    let stmt = Statement::new(StatementKind::UpsertEntity, template)
        .creating(label.as_str(), id)
        .param("id", id)
        .param("now", Utc::now().to_rfc3339());
    match chunk_id {
        Some(chunk_id) => stmt.param("chunk_id", chunk_id),
        None => stmt,
    }
}

/// Both endpoints of a relationship, by validated label and id.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub label: &'a Label,
    pub id: &'a str,
}

/// Merge a typed relationship between two existing entities. Returns zero
/// rows in [`MATCHED_COLUMN`] when either endpoint is missing.
pub fn merge_relationship(
    source: Endpoint<'_>,
    relationship_type: &RelationshipType,
    target: Endpoint<'_>,
    chunk_id: &str,
) -> Statement {
    let template = format!(
        "MATCH (a:{source_label} {{id: $source_id}})
         MATCH (b:{target_label} {{id: $target_id}})
         MERGE (a)-[r:{relationship_type}]->(b)
         ON CREATE SET r.first_seen = $now
         SET r.last_seen = $now, r.chunk_id = $chunk_id
         RETURN count(r) AS {MATCHED_COLUMN}",
        source_label = source.label,
        target_label = target.label,
    );

    Statement::new(StatementKind::MergeRelationship, template)
        .requiring(source.label.as_str(), source.id)
        .requiring(target.label.as_str(), target.id)
        .param("source_id", source.id)
        .param("target_id", target.id)
        .param("chunk_id", chunk_id)
        .param("now", Utc::now().to_rfc3339())
}
