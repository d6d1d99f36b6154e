// src/store.rs

//! Snapshot persistence.
//!
//! The snapshot lives in a single pretty-printed JSON file,
//! `{ "news": [...] }`, overwritten wholesale on each successful save.
//! Writes go through a temp file and a rename, so the caller observes
//! either the old snapshot or the new one, never a partial write.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::{Snapshot, StorageConfig};

/// Environment override for the state directory. Set this in deployments
/// where the working directory is not writable (restricted sandboxes).
pub const STATE_DIR_ENV: &str = "SDE_WATCH_STATE_DIR";

/// File-backed snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    state_dir: PathBuf,
    file_name: String,
}

impl SnapshotStore {
    /// Create a store from the storage configuration.
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            state_dir: PathBuf::from(&config.state_dir),
            file_name: config.state_file.clone(),
        }
    }

    /// Resolve the effective state file path.
    ///
    /// Resolved once per call: the environment override wins over the
    /// configured directory, so a redeploy into a sandbox needs no config
    /// edit.
    pub fn resolve_path(&self) -> PathBuf {
        match std::env::var(STATE_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => Path::new(&dir).join(&self.file_name),
            _ => self.state_dir.join(&self.file_name),
        }
    }

    /// Load the last saved snapshot.
    ///
    /// A missing, unreadable, or corrupt state file degrades to an empty
    /// snapshot with a log line; it never raises.
    pub async fn load(&self) -> Snapshot {
        let path = self.resolve_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No snapshot at {:?} yet, starting empty", path);
                return Snapshot::default();
            }
            Err(e) => {
                log::error!("Failed to read snapshot {:?}: {}", path, e);
                return Snapshot::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Corrupt snapshot {:?}: {}. Treating as empty.", path, e);
                Snapshot::default()
            }
        }
    }

    /// Persist the snapshot, replacing the previous one atomically.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let path = self.resolve_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        log::info!("Snapshot saved to {:?} ({} items)", path, snapshot.len());
        Ok(())
    }
}
