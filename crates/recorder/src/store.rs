//! Snapshot storage

use crate::StoreError;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Write-once storage for evidence snapshots
pub trait SnapshotStore: Send + Sync {
    /// Store `bytes` under `key`; existing keys are never overwritten
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// One JPEG file per snapshot under an output directory
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    dir: PathBuf,
    prefix: String,
}

impl FsSnapshotStore {
    /// Create the store, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("Snapshot directory: {}", dir.display());
        Ok(Self {
            dir,
            prefix: prefix.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a key is written to
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}.jpg", self.prefix, key))
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        write_new(&path, key, |file| {
            file.write_all(bytes)?;
            file.sync_all()
        })?;

        debug!("Wrote snapshot {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Create `path` exclusively and fill it; a failed write leaves no file behind
fn write_new<F>(path: &Path, key: &str, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(key.to_string()),
            _ => StoreError::Io(e),
        })?;

    if let Err(e) = write(&mut file) {
        drop(file);
        if let Err(rm) = std::fs::remove_file(path) {
            warn!("Could not remove partial snapshot {}: {}", path.display(), rm);
        }
        return Err(StoreError::Io(e));
    }
    Ok(())
}

/// In-memory store (for testing)
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.snapshots
            .lock()
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.snapshots.lock().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock error: {}", e)))?;

        if snapshots.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        snapshots.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
