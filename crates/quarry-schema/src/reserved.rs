//! Structural identifiers the pipeline writes on its own behalf.
//!
//! These never come from extraction, so they are not part of any
//! [`AllowList`](crate::AllowList); a schema that lists one as an extraction
//! label or relationship type is rejected at load time. Property lists keyed
//! on [`DOCUMENT_LABEL`] stay allowed: they select which frontmatter fields are
//! copied onto document nodes.

/// Label of one ingested source document.
pub const DOCUMENT_LABEL: &str = "Document";

/// Label of one chunk of a document body.
pub const CHUNK_LABEL: &str = "Chunk";

/// Chunk to its document.
pub const PART_OF: &str = "PART_OF";

/// Chunk to an entity extracted from it.
pub const MENTIONS: &str = "MENTIONS";

pub const RESERVED_LABELS: &[&str] = &[DOCUMENT_LABEL, CHUNK_LABEL];

pub const RESERVED_RELATIONSHIP_TYPES: &[&str] = &[PART_OF, MENTIONS];

pub fn is_reserved_label(value: &str) -> bool {
    RESERVED_LABELS.contains(&value)
}

pub fn is_reserved_relationship_type(value: &str) -> bool {
    RESERVED_RELATIONSHIP_TYPES.contains(&value)
}
