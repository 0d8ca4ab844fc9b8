//! quarry-graph: Neo4j client for the document knowledge graph.
//!
//! This crate is the single mutation point for the graph. Writes are built as
//! parameterised [`Statement`]s whose templates only ever embed allow-listed
//! identifiers, and executed through the [`GraphStore`] trait.

pub mod client;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod statement;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::MemoryGraphStore;
pub use mutations::Endpoint;
pub use statement::{NodeRef, ParamValue, Statement, StatementKind, MATCHED_COLUMN};
pub use store::{write_within, GraphStore};
