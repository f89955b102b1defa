//! Artifact spool port interface
//!
//! Captured audio is retained locally until the backend confirms
//! persistence, then released. Sessions that exhaust their backend
//! retries keep their spooled artifact for manual reconciliation.

use async_trait::async_trait;
use thiserror::Error;

use super::capture::AudioArtifact;

/// Spool errors
#[derive(Debug, Clone, Error)]
pub enum SpoolError {
    #[error("Failed to retain artifact: {0}")]
    RetainFailed(String),

    #[error("Failed to release artifact: {0}")]
    ReleaseFailed(String),
}

/// Port for local artifact retention
#[async_trait]
pub trait ArtifactSpool: Send + Sync {
    /// Retain an artifact under the given key, surviving process restarts
    async fn retain(&self, key: &str, artifact: &AudioArtifact) -> Result<(), SpoolError>;

    /// Release a retained artifact once the backend has acknowledged it
    async fn release(&self, key: &str) -> Result<(), SpoolError>;
}
