//! JSON snapshot files.
//!
//! Every save rewrites the whole file: the JSON is written to a `.tmp`
//! sibling and renamed over the target, so a crash mid-write leaves the
//! previous snapshot intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, starting empty when the file is missing or unreadable.
    pub async fn load_or_default<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load().await {
            Ok(Some(value)) => {
                info!(path = %self.path.display(), "Loaded snapshot");
                value
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No snapshot found, starting empty");
                T::default()
            }
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to load snapshot, starting empty"
                );
                T::default()
            }
        }
    }

    /// Load the snapshot. `Ok(None)` means the file does not exist.
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_slice(&raw)?;
        Ok(Some(value))
    }

    /// Write `value` as the new snapshot.
    pub async fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_vec(value)?;
        let tmp = self.tmp_path();

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::Snapshot(format!(
                "rename {} to {}: {}",
                tmp.display(),
                self.path.display(),
                e
            )));
        }

        debug!(path = %self.path.display(), bytes = json.len(), "Wrote snapshot");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
