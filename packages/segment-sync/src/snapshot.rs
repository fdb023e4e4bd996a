//! File-backed snapshot storage.
//!
//! The snapshot is a pretty-printed JSON document:
//!
//! ```text
//! {
//!   "members": ["01HA...", "01HB..."],
//!   "last_updated": "2025-01-15T10:00:00Z"
//! }
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the target, so
//! readers never observe a half-written snapshot.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::StoreError;
use crate::traits::SnapshotStore;
use crate::types::Snapshot;

pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
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

    async fn write_error(&self, source: std::io::Error) -> StoreError {
        // Best effort; the temp file may not exist
        let _ = fs::remove_file(self.tmp_path()).await;
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Snapshot {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.path.display(),
                    "No snapshot found, starting from an empty membership set"
                );
                return Snapshot::default();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Snapshot unreadable, treating as empty"
                );
                return Snapshot::default();
            }
        };

        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                tracing::debug!(
                    path = %self.path.display(),
                    members = snapshot.members.len(),
                    last_updated = ?snapshot.last_updated,
                    "Loaded snapshot"
                );
                snapshot
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Snapshot is not valid JSON, treating as empty"
                );
                Snapshot::default()
            }
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp_path = self.tmp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent).await {
                return Err(self.write_error(e).await);
            }
        }
        if let Err(e) = fs::write(&tmp_path, json).await {
            return Err(self.write_error(e).await);
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            return Err(self.write_error(e).await);
        }

        tracing::debug!(
            path = %self.path.display(),
            members = snapshot.members.len(),
            "Snapshot saved"
        );
        Ok(())
    }
}
