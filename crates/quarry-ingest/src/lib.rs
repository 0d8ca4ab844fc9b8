//! quarry-ingest: Document ingestion for the Quarry knowledge graph.
//!
//! Splits documents into chunks, extracts entities and relationships with a
//! generative model, validates everything against the schema allow-list and
//! writes the result to Neo4j, recording a tamper-evident audit trail for
//! every run.

pub mod chunker;
pub mod config;
pub mod discover;
pub mod embedding;
pub mod error;
pub mod events;
pub mod extraction;
pub mod frontmatter;
pub mod gate;
pub mod outcome;
pub mod pipeline;

pub use discover::Source;
pub use outcome::{ItemKind, ItemOutcome, RunReport};
pub use pipeline::{Pipeline, PipelineOptions};
