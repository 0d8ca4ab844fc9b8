//! quarry-core: Shared types and text screening for the Quarry ingestion pipeline.
//!
//! This crate provides the foundational pieces used across all Quarry components:
//! - Document, chunk and extraction-output types
//! - The text sanitizer applied to untrusted strings
//! - The threat heuristic that flags probable injection payloads

pub mod sanitize;
pub mod threat;
pub mod types;

pub use sanitize::{sanitize, sanitize_value};
pub use threat::{
    assess, is_injection_shaped, is_probably_malicious, is_probably_malicious_value, ThreatCheck,
    ThreatReport,
};
pub use types::{Chunk, Document, ExtractedGraph, ExtractedNode, ExtractedRelationship, Metadata};
