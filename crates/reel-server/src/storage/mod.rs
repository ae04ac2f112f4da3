//! Chunk storage
//!
//! Uploaded CSV files land in a shared directory and are addressed by bare
//! file name. The HTTP process checks that a file exists; the worker that
//! imports it deletes it afterwards.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid file name '{0}': must be a bare file name")]
    InvalidName(String),

    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.chunk_root.clone())
    }

    /// Map a bare file name to its location under the root
    ///
    /// Names containing a path separator or a NUL byte are rejected, as are
    /// `.` and `..` themselves, so a submission can never reach outside the
    /// chunk directory. Dots inside a name (`ml..v2.csv`) are fine.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    pub async fn exists(&self, path: &Path) -> Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a consumed file. Returns `false` when it was already gone.
    pub async fn remove(&self, path: &Path) -> Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed source file");
                Ok(true)
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
