//! Configuration for the quarry ingestion pipeline.
//!
//! Loaded from `quarry.toml` or `QUARRY__` environment variables
//! (e.g. `QUARRY__INGEST__CHUNK_SIZE=256`, `QUARRY__NEO4J__URI=...`).

use std::path::PathBuf;

use serde::Deserialize;

use quarry_graph::GraphConfig;

use crate::chunker::{Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{IngestError, Result};
use crate::gate::AccessMode;

/// Top-level configuration, one field per `quarry.toml` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuarryConfig {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub neo4j: Neo4jConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl QuarryConfig {
    /// Load `{file_prefix}.toml` (optional) overlaid with `QUARRY__` env vars.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("QUARRY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| IngestError::Config(e.to_string()))?;

        cfg.try_deserialize()
            .map_err(|e| IngestError::Config(e.to_string()))
    }
}

/// `[ingest]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Tokens per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Tokens shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Characters of chunk text sent to the extraction model.
    #[serde(default = "default_max_excerpt_chars")]
    pub max_excerpt_chars: usize,

    /// Per-write timeout against the graph store.
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,

    /// Request an embedding for every written chunk.
    #[serde(default)]
    pub embeddings_enabled: bool,

    /// Skip extraction for chunks the threat heuristic flags.
    #[serde(default)]
    pub skip_flagged_chunks: bool,

    /// Process access mode checked before any run.
    #[serde(default)]
    pub mode: AccessMode,

    /// Directory for per-run audit streams.
    #[serde(default = "default_audit_dir")]
    pub audit_dir: PathBuf,

    /// Directory for allow-list snapshots.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// TOML schema file defining the allow-list.
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,

    /// Glob used when a directory is given as input.
    #[serde(default = "default_include")]
    pub include: String,
}

impl IngestConfig {
    pub fn chunker(&self) -> Result<Chunker> {
        Chunker::new(self.chunk_size, self.chunk_overlap)
    }
}

/// `[neo4j]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jConfig {
    #[serde(default = "default_neo4j_uri")]
    pub uri: String,
    #[serde(default = "default_neo4j_user")]
    pub user: String,
    #[serde(default = "default_neo4j_password")]
    pub password: String,
}

impl Neo4jConfig {
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            uri: self.uri.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            ..Default::default()
        }
    }
}

/// `[extraction]` section: an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_extraction_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
}

/// `[embedding]` section: an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_max_excerpt_chars() -> usize {
    2000
}

fn default_write_timeout_secs() -> u64 {
    10
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from("./audit")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("./snapshots")
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("./schema.toml")
}

fn default_include() -> String {
    "**/*.md".to_string()
}

fn default_neo4j_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

fn default_neo4j_password() -> String {
    "quarry-dev".to_string()
}

fn default_llm_endpoint() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_extraction_model() -> String {
    "llama3.1".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_extraction_timeout() -> u64 {
    120
}

fn default_embedding_timeout() -> u64 {
    30
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_excerpt_chars: default_max_excerpt_chars(),
            write_timeout_secs: default_write_timeout_secs(),
            embeddings_enabled: false,
            skip_flagged_chunks: false,
            mode: AccessMode::default(),
            audit_dir: default_audit_dir(),
            snapshot_dir: default_snapshot_dir(),
            schema_path: default_schema_path(),
            include: default_include(),
        }
    }
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: default_neo4j_uri(),
            user: default_neo4j_user(),
            password: default_neo4j_password(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_extraction_model(),
            api_key: None,
            timeout_secs: default_extraction_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_embedding_model(),
            api_key: None,
            timeout_secs: default_embedding_timeout(),
        }
    }
}
