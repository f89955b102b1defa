//! Session backend port interface

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::capture::AudioArtifact;
use crate::domain::geo::Coordinate;
use crate::domain::session::{ArtifactRef, SessionId, TerminationReason};
use crate::domain::zone::ZoneId;

/// Backend errors
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Failed to parse backend response: {0}")]
    ParseError(String),
}

/// Best-effort observability event.
/// Posted fire-and-forget; losing one is acceptable, blocking the
/// pipeline is not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Transition {
        from: String,
        to: String,
        zone_id: Option<String>,
        at_ms: u64,
    },
    SampleDiscarded {
        reason: String,
        at_ms: u64,
    },
    RetryAttempt {
        operation: String,
        attempt: u32,
    },
    SessionUnreconciled {
        zone_id: String,
        started_at_ms: u64,
    },
}

/// Port for the service that persists recording-session lifecycle events.
///
/// `create_session` always precedes `update_session` for the same id.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Register a new session; the backend assigns the id
    async fn create_session(
        &self,
        zone_id: &ZoneId,
        location: &Coordinate,
    ) -> Result<SessionId, BackendError>;

    /// Close a previously created session
    async fn update_session(
        &self,
        id: &SessionId,
        ended_at_ms: u64,
        reason: TerminationReason,
        artifact: Option<&ArtifactRef>,
    ) -> Result<(), BackendError>;

    /// Persist a finished audio artifact, returning its reference
    async fn store_artifact(&self, artifact: &AudioArtifact) -> Result<ArtifactRef, BackendError>;

    /// Fire-and-forget telemetry; must never block the caller
    fn post_telemetry(&self, event: TelemetryEvent);
}
