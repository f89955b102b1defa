//! In-memory artifact spool for simulation and tests

use std::sync::Mutex;

use async_trait::async_trait;

use crate::application::ports::{ArtifactSpool, AudioArtifact, SpoolError};

/// Spool that keeps retained keys in memory
#[derive(Default)]
pub struct MemorySpool {
    retained: Mutex<Vec<String>>,
}

impl MemorySpool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently retained
    pub fn retained(&self) -> Vec<String> {
        self.retained.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ArtifactSpool for MemorySpool {
    async fn retain(&self, key: &str, _artifact: &AudioArtifact) -> Result<(), SpoolError> {
        self.retained
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(key.to_string());
        Ok(())
    }

    async fn release(&self, key: &str) -> Result<(), SpoolError> {
        self.retained
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|k| k != key);
        Ok(())
    }
}
