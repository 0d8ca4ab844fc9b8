//! Schema allow-list service: loads the allow-list and persists a snapshot on
//! every forced reload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::allowlist::{AllowList, SchemaDefinition};
use crate::error::{Result, SchemaError};
use crate::snapshot::AllowListSnapshot;

/// Source of the allow-list used to validate a run.
#[async_trait]
pub trait AllowListService: Send + Sync {
    /// Load the allow-list. `force` bypasses any cached copy and re-reads the
    /// underlying source.
    async fn load(&self, force: bool) -> Result<Arc<AllowList>>;
}

/// Allow-list service backed by a TOML schema file:
///
/// ```toml
/// node_labels = ["Person", "Organization"]
/// relationship_types = ["FOUNDED", "WORKS_AT"]
///
/// [properties]
/// Document = ["title", "author"]
/// ```
pub struct FileAllowListService {
    schema_path: PathBuf,
    snapshot_dir: Option<PathBuf>,
    cached: Mutex<Option<Arc<AllowList>>>,
}

impl FileAllowListService {
    pub fn new(schema_path: impl Into<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.into(),
            snapshot_dir: None,
            cached: Mutex::new(None),
        }
    }

    /// Persist a snapshot under `dir` on every forced reload.
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    async fn read_schema(&self) -> Result<AllowList> {
        let raw = tokio::fs::read_to_string(&self.schema_path).await?;
        let definition: SchemaDefinition =
            toml::from_str(&raw).map_err(|e| SchemaError::Parse {
                path: self.schema_path.display().to_string(),
                message: e.to_string(),
            })?;
        AllowList::try_from(definition)
    }

    fn cached(&self) -> Option<Arc<AllowList>> {
        self.cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store_cache(&self, allow_list: Arc<AllowList>) {
        *self
            .cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(allow_list);
    }
}

#[async_trait]
impl AllowListService for FileAllowListService {
    async fn load(&self, force: bool) -> Result<Arc<AllowList>> {
        if !force {
            if let Some(cached) = self.cached() {
                return Ok(cached);
            }
        }

        let allow_list = Arc::new(self.read_schema().await?);

        if force {
            if let Some(dir) = &self.snapshot_dir {
                let source = self.schema_path.display().to_string();
                let snapshot = AllowListSnapshot::capture(&source, &allow_list)?;
                let path = snapshot.write_to(dir)?;
                tracing::info!(
                    path = %path.display(),
                    hash = %snapshot.content_hash,
                    "Allow-list snapshot persisted"
                );
            }
        }

        tracing::info!(
            schema = %self.schema_path.display(),
            labels = allow_list.node_labels().count(),
            relationship_types = allow_list.relationship_types().count(),
            force,
            "Allow-list loaded"
        );

        self.store_cache(allow_list.clone());
        Ok(allow_list)
    }
}
