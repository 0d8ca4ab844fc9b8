//! Canonical allow-list snapshot artifacts.
//!
//! Each forced reload persists the allow-list it produced, together with a
//! BLAKE3 hash of the snapshot content, so the validation basis of any run
//! can be inspected and checked for tampering afterwards.
//!
//! ```text
//! {root}/
//!   2024/01/15/allowlist-093012.481-3f9a0c1b22de.json
//!   latest.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::allowlist::AllowList;
use crate::error::{Result, SchemaError};

/// File name of the most recent snapshot under the snapshot root.
pub const LATEST_SNAPSHOT: &str = "latest.json";

/// One persisted allow-list snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowListSnapshot {
    /// Where the allow-list was loaded from.
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub allow_list: AllowList,
    /// BLAKE3 hash (hex) of every other field.
    pub content_hash: String,
}

/// Hashable view of a snapshot (excludes content_hash).
#[derive(Serialize)]
struct HashableSnapshot<'a> {
    source: &'a str,
    loaded_at: &'a DateTime<Utc>,
    allow_list: &'a AllowList,
}

impl AllowListSnapshot {
    /// Capture a snapshot of `allow_list` as loaded now from `source`.
    pub fn capture(source: &str, allow_list: &AllowList) -> Result<Self> {
        let loaded_at = Utc::now();
        let content_hash = hash_parts(source, &loaded_at, allow_list)?;
        Ok(Self {
            source: source.to_string(),
            loaded_at,
            allow_list: allow_list.clone(),
            content_hash,
        })
    }

    pub fn compute_hash(&self) -> Result<String> {
        hash_parts(&self.source, &self.loaded_at, &self.allow_list)
    }

    pub fn verify_integrity(&self) -> bool {
        self.compute_hash()
            .map(|hash| hash == self.content_hash)
            .unwrap_or(false)
    }

    /// Persist under `root`, and refresh `root/latest.json`.
    /// Returns the path of the dated snapshot file.
    pub fn write_to(&self, root: &Path) -> Result<PathBuf> {
        let dir = root.join(self.loaded_at.format("%Y/%m/%d").to_string());
        fs::create_dir_all(&dir)?;

        let short_hash = &self.content_hash[..12.min(self.content_hash.len())];
        let path = dir.join(format!(
            "allowlist-{}-{short_hash}.json",
            self.loaded_at.format("%H%M%S%.3f")
        ));

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, &json)?;
        fs::write(root.join(LATEST_SNAPSHOT), &json)?;

        tracing::debug!(
            path = %path.display(),
            hash = %self.content_hash,
            "Allow-list snapshot saved"
        );
        Ok(path)
    }

    /// Read a snapshot back, verifying its hash.
    pub fn read_from(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&json)?;
        if !snapshot.verify_integrity() {
            return Err(SchemaError::IntegrityViolation);
        }
        Ok(snapshot)
    }
}

fn hash_parts(source: &str, loaded_at: &DateTime<Utc>, allow_list: &AllowList) -> Result<String> {
    let hashable = HashableSnapshot {
        source,
        loaded_at,
        allow_list,
    };
    let json = serde_json::to_vec(&hashable)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}
