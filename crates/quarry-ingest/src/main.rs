//! CLI entry point for the quarry ingestion pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use quarry_audit::{
    read_run, verify_chain, AuditRecorder, AuditSink, JsonlAuditSink, MemoryAuditSink, RunId,
};
use quarry_graph::{GraphClient, GraphStore, MemoryGraphStore, StatementKind};
use quarry_schema::snapshot::LATEST_SNAPSHOT;
use quarry_schema::{AllowListService, AllowListSnapshot, FileAllowListService};

use quarry_ingest::config::QuarryConfig;
use quarry_ingest::discover::discover;
use quarry_ingest::embedding::HttpEmbeddingProvider;
use quarry_ingest::extraction::HttpExtractionClient;
use quarry_ingest::gate::{AccessMode, ModeGate};
use quarry_ingest::{Pipeline, PipelineOptions};

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Ingest documents into the Quarry knowledge graph")]
struct Cli {
    /// Config file prefix (default: quarry).
    #[arg(short, long, default_value = "quarry", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a file, or every matching file under a directory.
    Ingest {
        path: PathBuf,

        /// Validate and extract without writing to Neo4j.
        #[arg(long)]
        dry_run: bool,
    },
    /// Reload the schema allow-list and persist a snapshot.
    Schema,
    /// Verify the hash chain of a run's audit stream.
    VerifyAudit { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let config = QuarryConfig::load(&cli.config)?;

    match cli.command {
        Command::Ingest { path, dry_run } => ingest(&config, &path, dry_run).await,
        Command::Schema => schema(&config).await,
        Command::VerifyAudit { file } => verify_audit(&file),
    }
}

async fn ingest(config: &QuarryConfig, path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let options = PipelineOptions::from_config(&config.ingest)?;
    let sources = discover(path, &config.ingest.include)?;

    let memory = Arc::new(MemoryGraphStore::new());
    let store: Arc<dyn GraphStore> = if dry_run {
        memory.clone()
    } else {
        Arc::new(GraphClient::connect(&config.neo4j.graph_config()).await?)
    };

    // Dry runs never reach the graph, so the access mode does not apply.
    let mode = if dry_run {
        AccessMode::Write
    } else {
        config.ingest.mode
    };

    let run_id = RunId::new();
    let recorder = AuditRecorder::new(run_id, audit_sink(&config.ingest.audit_dir, run_id));
    let allow_lists = FileAllowListService::new(&config.ingest.schema_path)
        .with_snapshot_dir(&config.ingest.snapshot_dir);

    let mut pipeline = Pipeline::new(
        store,
        Arc::new(HttpExtractionClient::new(&config.extraction)?),
        Arc::new(allow_lists),
        Box::new(ModeGate::new(mode)),
        recorder,
    )
    .with_options(options);
    if config.ingest.embeddings_enabled {
        let embedder = HttpEmbeddingProvider::new(&config.embedding)?;
        pipeline = pipeline.with_embedder(Arc::new(embedder));
    }

    let report = pipeline.run(sources).await?;

    if dry_run {
        tracing::info!(
            documents = memory.statements_of(StatementKind::UpsertDocument).len(),
            chunks = memory.statements_of(StatementKind::UpsertChunk).len(),
            entities = memory.statements_of(StatementKind::UpsertEntity).len(),
            relationships = memory.statements_of(StatementKind::MergeRelationship).len(),
            "Dry run: statements that would have been written"
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// The run's JSONL stream, or an in-memory sink if the audit directory is
/// unusable.
fn audit_sink(dir: &Path, run_id: RunId) -> Box<dyn AuditSink> {
    match JsonlAuditSink::open(dir, run_id, chrono::Utc::now()) {
        Ok(sink) => {
            tracing::info!(path = %sink.path().display(), "Recording audit trail");
            Box::new(sink)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                dir = %dir.display(),
                "Failed to open audit stream; audit kept in memory only"
            );
            Box::new(MemoryAuditSink::new())
        }
    }
}

async fn schema(config: &QuarryConfig) -> anyhow::Result<()> {
    let service = FileAllowListService::new(&config.ingest.schema_path)
        .with_snapshot_dir(&config.ingest.snapshot_dir);
    service.load(true).await?;

    let snapshot = AllowListSnapshot::read_from(&config.ingest.snapshot_dir.join(LATEST_SNAPSHOT))?;
    tracing::info!(
        schema = %service.schema_path().display(),
        hash = %snapshot.content_hash,
        "Allow-list reloaded"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn verify_audit(file: &Path) -> anyhow::Result<()> {
    let events = read_run(file)?;
    verify_chain(&events)?;
    tracing::info!(file = %file.display(), events = events.len(), "Audit chain verified");
    println!("ok: {} events verified", events.len());
    Ok(())
}
