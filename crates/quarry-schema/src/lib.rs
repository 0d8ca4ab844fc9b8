//! quarry-schema: The allow-list that gates every graph write.
//!
//! Extracted labels and relationship types are checked here before they may
//! appear in a query template. The allow-list is force-reloaded at the start
//! of each run and every forced reload leaves a hashed snapshot behind.

pub mod allowlist;
pub mod error;
pub mod reserved;
pub mod service;
pub mod snapshot;
pub mod validator;

pub use allowlist::{is_safe_identifier, AllowList, SchemaDefinition};
pub use error::SchemaError;
pub use reserved::{CHUNK_LABEL, DOCUMENT_LABEL, MENTIONS, PART_OF};
pub use service::{AllowListService, FileAllowListService};
pub use snapshot::AllowListSnapshot;
pub use validator::{
    validate_label, validate_property, validate_relationship_type, Label, LabelDecision,
    PropertyKey, RelationshipType, UnknownRelationshipType, FALLBACK_LABEL,
};
