//! Optional JSON snapshot persistence.
//!
//! The whole in-memory state is written to one file after every mutation and
//! read back at startup.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use factory_core::{Agent, DevinTask, Prd};

/// Snapshot persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the server stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub prds: Vec<Prd>,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub devin_tasks: Vec<DevinTask>,
}

/// File-backed snapshot store.
///
/// Writers must be serialized by the caller.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. A missing file is an empty snapshot.
    pub async fn load(&self) -> Result<Snapshot, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the snapshot through a temp file and rename.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let content = serde_json::to_vec_pretty(snapshot).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await.map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factory_core::PrdFields;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("factory.json"));
        let snapshot = store.load().await.unwrap();
        assert!(snapshot.prds.is_empty());
        assert!(snapshot.agents.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested").join("factory.json"));
        let prd = Prd::new(PrdFields::new("Ticket Bot", "Sorts tickets")).unwrap();
        let snapshot = Snapshot {
            prds: vec![prd.clone()],
            ..Default::default()
        };

        store.save(&snapshot).await.unwrap();
        assert!(!store.path().with_extension("json.tmp").exists());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.prds, vec![prd]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factory.json");
        std::fs::write(&path, "not json").unwrap();
        let err = SnapshotStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Format { .. }));
    }
}
