//! Recording session entity

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::zone::ZoneId;

/// Session identifier assigned by the backend on creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a stored audio artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(pub String);

impl ArtifactRef {
    pub fn new(r: impl Into<String>) -> Self {
        Self(r.into())
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    ExitedZone,
    ManualStop,
    Error,
}

impl TerminationReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExitedZone => "exited_zone",
            Self::ManualStop => "manual_stop",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when closing a session that is already closed
#[derive(Debug, Clone, Error)]
#[error("Session already closed with reason {reason}")]
pub struct AlreadyClosed {
    pub reason: TerminationReason,
}

/// One continuous recording episode, bounded by zone entry and zone exit
/// (or manual/error termination).
///
/// The backend id is `None` until registration succeeds; a session that
/// exhausts its registration retries is finalized locally without one.
/// Closing is a one-way operation enforced by `close`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSession {
    pub id: Option<SessionId>,
    pub zone_id: ZoneId,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub reason: Option<TerminationReason>,
    pub artifact: Option<ArtifactRef>,
}

impl RecordingSession {
    /// Open a new session for the given zone
    pub fn open(zone_id: ZoneId, started_at_ms: u64) -> Self {
        Self {
            id: None,
            zone_id,
            started_at_ms,
            ended_at_ms: None,
            reason: None,
            artifact: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at_ms.is_none()
    }

    /// Close the session exactly once
    pub fn close(
        &mut self,
        ended_at_ms: u64,
        reason: TerminationReason,
    ) -> Result<(), AlreadyClosed> {
        if let Some(existing) = self.reason {
            return Err(AlreadyClosed { reason: existing });
        }
        self.ended_at_ms = Some(ended_at_ms);
        self.reason = Some(reason);
        Ok(())
    }
}
