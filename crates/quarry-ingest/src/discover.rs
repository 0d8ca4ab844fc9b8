//! Input discovery.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// One input to an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file read at processing time.
    Path(PathBuf),
    /// Text supplied directly, with a caller-chosen origin label.
    Inline { origin: String, text: String },
}

impl Source {
    pub fn origin(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Inline { origin, .. } => origin.clone(),
        }
    }
}

/// Files under `root` matching `include`, sorted by path. A file `root` is
/// returned as the only source.
pub fn discover(root: &Path, include: &str) -> Result<Vec<Source>> {
    if root.is_file() {
        return Ok(vec![Source::Path(root.to_path_buf())]);
    }

    let pattern = root.join(include);
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable path during discovery"),
        }
    }
    paths.sort();

    tracing::info!(root = %root.display(), include, found = paths.len(), "Sources discovered");
    Ok(paths.into_iter().map(Source::Path).collect())
}
