//! In-memory session backend
//!
//! Used by simulation mode and by integration tests: records every call
//! without any network dependency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::application::ports::{AudioArtifact, BackendError, SessionBackend, TelemetryEvent};
use crate::domain::geo::Coordinate;
use crate::domain::session::{ArtifactRef, SessionId, TerminationReason};
use crate::domain::zone::ZoneId;

/// A recorded session creation
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub id: SessionId,
    pub zone_id: ZoneId,
    pub location: Coordinate,
}

/// A recorded session update
#[derive(Debug, Clone)]
pub struct UpdatedSession {
    pub id: SessionId,
    pub ended_at_ms: u64,
    pub reason: TerminationReason,
    pub artifact: Option<ArtifactRef>,
}

/// Session backend that keeps everything in memory
#[derive(Default)]
pub struct MemoryBackend {
    next_id: AtomicU64,
    created: Mutex<Vec<CreatedSession>>,
    updated: Mutex<Vec<UpdatedSession>>,
    artifacts: Mutex<Vec<usize>>,
    telemetry: Mutex<Vec<TelemetryEvent>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<CreatedSession> {
        self.created.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn updated(&self) -> Vec<UpdatedSession> {
        self.updated.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn telemetry(&self) -> Vec<TelemetryEvent> {
        self.telemetry.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Sizes of stored artifacts, in bytes
    pub fn artifact_sizes(&self) -> Vec<usize> {
        self.artifacts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn create_session(
        &self,
        zone_id: &ZoneId,
        location: &Coordinate,
    ) -> Result<SessionId, BackendError> {
        let id = SessionId::new(format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CreatedSession {
                id: id.clone(),
                zone_id: zone_id.clone(),
                location: *location,
            });
        Ok(id)
    }

    async fn update_session(
        &self,
        id: &SessionId,
        ended_at_ms: u64,
        reason: TerminationReason,
        artifact: Option<&ArtifactRef>,
    ) -> Result<(), BackendError> {
        self.updated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(UpdatedSession {
                id: id.clone(),
                ended_at_ms,
                reason,
                artifact: artifact.cloned(),
            });
        Ok(())
    }

    async fn store_artifact(&self, artifact: &AudioArtifact) -> Result<ArtifactRef, BackendError> {
        let mut artifacts = self.artifacts.lock().unwrap_or_else(|e| e.into_inner());
        artifacts.push(artifact.size_bytes());
        Ok(ArtifactRef::new(format!("mem-artifact-{}", artifacts.len())))
    }

    fn post_telemetry(&self, event: TelemetryEvent) {
        self.telemetry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

/// Shared handle so callers can inspect the backend after the engine has
/// taken ownership of a clone
#[async_trait]
impl SessionBackend for std::sync::Arc<MemoryBackend> {
    async fn create_session(
        &self,
        zone_id: &ZoneId,
        location: &Coordinate,
    ) -> Result<SessionId, BackendError> {
        self.as_ref().create_session(zone_id, location).await
    }

    async fn update_session(
        &self,
        id: &SessionId,
        ended_at_ms: u64,
        reason: TerminationReason,
        artifact: Option<&ArtifactRef>,
    ) -> Result<(), BackendError> {
        self.as_ref()
            .update_session(id, ended_at_ms, reason, artifact)
            .await
    }

    async fn store_artifact(&self, artifact: &AudioArtifact) -> Result<ArtifactRef, BackendError> {
        self.as_ref().store_artifact(artifact).await
    }

    fn post_telemetry(&self, event: TelemetryEvent) {
        self.as_ref().post_telemetry(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_lifecycle_calls() {
        let backend = MemoryBackend::new();
        let location = Coordinate::new(0.0, 0.0, 5.0, 1_000).unwrap();

        let id = backend
            .create_session(&ZoneId::new("a"), &location)
            .await
            .unwrap();
        backend
            .update_session(&id, 2_000, TerminationReason::ExitedZone, None)
            .await
            .unwrap();

        assert_eq!(backend.created().len(), 1);
        assert_eq!(backend.updated().len(), 1);
        assert_eq!(backend.updated()[0].id, id);
    }

    #[tokio::test]
    async fn assigns_distinct_ids() {
        let backend = MemoryBackend::new();
        let location = Coordinate::new(0.0, 0.0, 5.0, 1_000).unwrap();
        let a = backend
            .create_session(&ZoneId::new("a"), &location)
            .await
            .unwrap();
        let b = backend
            .create_session(&ZoneId::new("b"), &location)
            .await
            .unwrap();
        assert_ne!(a, b);
    }
}
