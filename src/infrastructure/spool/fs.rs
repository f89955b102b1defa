//! Filesystem artifact spool
//!
//! Artifacts live under the XDG data dir until the backend acknowledges
//! them. Files surviving a process restart are the reconciliation queue.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::{ArtifactSpool, AudioArtifact, SpoolError};

/// Artifact spool on the local filesystem
pub struct FsArtifactSpool {
    dir: PathBuf,
}

impl FsArtifactSpool {
    /// Create a spool in the default XDG data location
    pub fn new() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("zone-recorder")
            .join("spool");
        Self { dir }
    }

    /// Create with custom directory
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn file_for(&self, key: &str) -> PathBuf {
        // Keys are built from zone ids and timestamps; keep the file name
        // safe regardless
        let safe: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.flac"))
    }

    /// List retained artifact files, oldest first
    pub async fn pending(&self) -> Result<Vec<PathBuf>, SpoolError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SpoolError::RetainFailed(e.to_string())),
        };
        let mut files = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "flac") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl Default for FsArtifactSpool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactSpool for FsArtifactSpool {
    async fn retain(&self, key: &str, artifact: &AudioArtifact) -> Result<(), SpoolError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SpoolError::RetainFailed(e.to_string()))?;
        fs::write(self.file_for(key), &artifact.data)
            .await
            .map_err(|e| SpoolError::RetainFailed(e.to_string()))?;
        Ok(())
    }

    async fn release(&self, key: &str) -> Result<(), SpoolError> {
        let path = self.file_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SpoolError::ReleaseFailed(e.to_string())),
        }
    }
}
