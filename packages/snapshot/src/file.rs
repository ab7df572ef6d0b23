//! Fallback snapshot source: a JSON file on local disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{SnapshotError, SnapshotSource, ensure_object};

/// Reads the most recently persisted snapshot from a file.
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    path: PathBuf,
    name: String,
}

impl FileSnapshotSource {
    /// Creates a source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<serde_json::Value, SnapshotError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let payload = serde_json::from_str(&contents)?;
        ensure_object(payload)
    }
}
