//! Recording controller use case
//!
//! Owns the single-open-session invariant and drives the capture device
//! and session backend in response to state machine transitions.

use std::time::Duration;

use thiserror::Error;

use crate::domain::config::{AudioQualityTier, EngineConfig};
use crate::domain::geo::Coordinate;
use crate::domain::session::{RecordingSession, TerminationReason};
use crate::domain::zone::Zone;

use super::ports::{
    ArtifactSpool, AudioCapture, AudioCue, AudioCueType, CaptureError, CaptureHandle,
    NotificationKind, Notifier, SessionBackend, TelemetryEvent,
};

/// Errors from the recording controller
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Invariant guard: a start request arrived while a session is open
    #[error("A recording session is already open")]
    AlreadyRecording,

    /// There is no open session to stop
    #[error("No recording session is open")]
    NoOpenSession,

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// Session registration retries exhausted; the recording was finalized
    /// locally as an error and the artifact retained
    #[error("Session registration failed after retries")]
    RegistrationFailed,
}

/// Bounded exponential backoff for backend calls
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay before the next try after `attempt` failures (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms << attempt.saturating_sub(1).min(8))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
        }
    }
}

/// Controller preferences, refreshed from config at each decision point
#[derive(Debug, Clone, Copy)]
struct ControllerPrefs {
    audio_quality: AudioQualityTier,
    notify_sound: bool,
}

/// An in-flight recording
struct ActiveRecording {
    session: RecordingSession,
    handle: CaptureHandle,
    zone: Zone,
}

/// Recording controller.
///
/// At most one recording session is open at any time; a start request
/// against an open session is rejected and logged as an inconsistency.
/// Captured audio is never discarded: artifacts are spooled locally before
/// any backend call and released only after the backend acknowledges.
pub struct RecordingController<A, B, N, Q, S>
where
    A: AudioCapture,
    B: SessionBackend,
    N: Notifier,
    Q: AudioCue,
    S: ArtifactSpool,
{
    capture: A,
    backend: B,
    notifier: N,
    cue: Q,
    spool: S,
    retry: RetryPolicy,
    prefs: ControllerPrefs,
    active: Option<ActiveRecording>,
    unreconciled: Vec<RecordingSession>,
}

impl<A, B, N, Q, S> RecordingController<A, B, N, Q, S>
where
    A: AudioCapture,
    B: SessionBackend,
    N: Notifier,
    Q: AudioCue,
    S: ArtifactSpool,
{
    pub fn new(capture: A, backend: B, notifier: N, cue: Q, spool: S, retry: RetryPolicy) -> Self {
        Self {
            capture,
            backend,
            notifier,
            cue,
            spool,
            retry,
            prefs: ControllerPrefs {
                audio_quality: AudioQualityTier::default(),
                notify_sound: true,
            },
            active: None,
            unreconciled: Vec::new(),
        }
    }

    /// Pick up config values that affect future recordings.
    /// An open session is never interrupted by a config change.
    pub fn apply_config(&mut self, config: &EngineConfig) {
        self.prefs = ControllerPrefs {
            audio_quality: config.audio_quality_or_default(),
            notify_sound: config.notify_sound_or_default(),
        };
    }

    pub fn has_open_session(&self) -> bool {
        self.active.is_some()
    }

    pub fn open_session(&self) -> Option<&RecordingSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Sessions finalized locally that still await backend reconciliation
    pub fn unreconciled(&self) -> &[RecordingSession] {
        &self.unreconciled
    }

    /// Elapsed capture time for the open session, in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.capture.elapsed_ms()
    }

    /// Best-effort notification through the controller's sink
    pub async fn notify(&self, kind: NotificationKind, message: &str) {
        let _ = self.notifier.notify(kind, message).await;
    }

    /// Best-effort telemetry through the controller's backend
    pub fn post_telemetry(&self, event: TelemetryEvent) {
        self.backend.post_telemetry(event);
    }

    #[cfg(test)]
    pub(crate) fn backend_ref(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub(crate) fn capture_ref(&self) -> &A {
        &self.capture
    }

    /// React to the state machine locking a zone: claim the microphone and
    /// register a session.
    ///
    /// Any error means no session is open afterwards; the caller releases
    /// the lock so the next qualifying sample can retry the entry.
    pub async fn on_zone_locked(
        &mut self,
        zone: &Zone,
        location: &Coordinate,
    ) -> Result<(), ControllerError> {
        if self.active.is_some() {
            let _ = self
                .notifier
                .notify(
                    NotificationKind::Error,
                    "Inconsistency: zone entry while a session is already open",
                )
                .await;
            return Err(ControllerError::AlreadyRecording);
        }

        let handle = match self.capture.start(self.prefs.audio_quality).await {
            Ok(h) => h,
            Err(e) => {
                let _ = self
                    .notifier
                    .notify(
                        NotificationKind::Error,
                        &format!("Could not start recording: {e}"),
                    )
                    .await;
                return Err(e.into());
            }
        };

        let mut session = RecordingSession::open(zone.id.clone(), now_ms());

        match self.create_with_retry(zone, location).await {
            Some(id) => {
                session.id = Some(id);
                self.active = Some(ActiveRecording {
                    session,
                    handle,
                    zone: zone.clone(),
                });

                let _ = self
                    .notifier
                    .notify(
                        NotificationKind::Info,
                        &format!("Recording started in {}", zone.name),
                    )
                    .await;
                if self.prefs.notify_sound {
                    let _ = self.cue.play(AudioCueType::ZoneEntered).await;
                }
                Ok(())
            }
            None => {
                // Registration exhausted: keep the audio, close out locally
                self.abandon_unregistered(session, handle).await;
                Err(ControllerError::RegistrationFailed)
            }
        }
    }

    /// React to the state machine leaving the locked zone (or a manual
    /// stop / disable): stop capture, persist the artifact, close the
    /// session. Runs to completion or to retry exhaustion; either way the
    /// session is closed when this returns.
    pub async fn on_zone_exited(
        &mut self,
        reason: TerminationReason,
    ) -> Result<RecordingSession, ControllerError> {
        let Some(active) = self.active.take() else {
            return Err(ControllerError::NoOpenSession);
        };
        let ActiveRecording {
            mut session,
            handle,
            zone,
        } = active;

        let artifact = match self.capture.stop(handle).await {
            Ok(a) => Some(a),
            Err(e) => {
                let _ = self
                    .notifier
                    .notify(
                        NotificationKind::Error,
                        &format!("Failed to stop capture: {e}"),
                    )
                    .await;
                None
            }
        };

        let _ = session.close(now_ms(), if artifact.is_some() { reason } else { TerminationReason::Error });

        let spool_key = spool_key(&session);
        if let Some(artifact) = &artifact {
            if let Err(e) = self.spool.retain(&spool_key, artifact).await {
                let _ = self
                    .notifier
                    .notify(
                        NotificationKind::Error,
                        &format!("Could not retain artifact locally: {e}"),
                    )
                    .await;
            }
        }

        let artifact_ref = match &artifact {
            Some(a) => self.store_artifact_with_retry(a).await,
            None => None,
        };
        session.artifact = artifact_ref.clone();

        let uploaded_fine = artifact.is_none() || artifact_ref.is_some();
        let updated = uploaded_fine && self.update_with_retry(&session).await;

        if updated {
            if artifact.is_some() {
                let _ = self.spool.release(&spool_key).await;
            }
            let closed_as = session.reason.unwrap_or(reason);
            let _ = self
                .notifier
                .notify(
                    NotificationKind::Success,
                    &format!("Recording in {} saved ({})", zone.name, closed_as),
                )
                .await;
            if self.prefs.notify_sound {
                let _ = self.cue.play(AudioCueType::ZoneExited).await;
            }
        } else {
            // Backend never confirmed; the spooled artifact stays on disk
            // and the session queues for manual reconciliation
            self.backend.post_telemetry(TelemetryEvent::SessionUnreconciled {
                zone_id: session.zone_id.to_string(),
                started_at_ms: session.started_at_ms,
            });
            self.unreconciled.push(session.clone());
            let _ = self
                .notifier
                .notify(
                    NotificationKind::Error,
                    &format!(
                        "Recording in {} kept locally; backend did not confirm",
                        zone.name
                    ),
                )
                .await;
            if self.prefs.notify_sound {
                let _ = self.cue.play(AudioCueType::Failure).await;
            }
        }

        Ok(session)
    }

    /// Close out a session whose registration never succeeded
    async fn abandon_unregistered(&mut self, mut session: RecordingSession, handle: CaptureHandle) {
        let artifact = self.capture.stop(handle).await.ok();
        let _ = session.close(now_ms(), TerminationReason::Error);

        if let Some(artifact) = &artifact {
            let _ = self.spool.retain(&spool_key(&session), artifact).await;
        }
        self.backend.post_telemetry(TelemetryEvent::SessionUnreconciled {
            zone_id: session.zone_id.to_string(),
            started_at_ms: session.started_at_ms,
        });
        self.unreconciled.push(session);

        let _ = self
            .notifier
            .notify(
                NotificationKind::Error,
                "Session could not be registered; recording kept locally",
            )
            .await;
        if self.prefs.notify_sound {
            let _ = self.cue.play(AudioCueType::Failure).await;
        }
    }

    async fn create_with_retry(
        &self,
        zone: &Zone,
        location: &Coordinate,
    ) -> Option<crate::domain::session::SessionId> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.backend.create_session(&zone.id, location).await {
                Ok(id) => return Some(id),
                Err(_) if attempt < self.retry.max_attempts => {
                    self.backend.post_telemetry(TelemetryEvent::RetryAttempt {
                        operation: "create_session".to_string(),
                        attempt,
                    });
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                }
                Err(_) => return None,
            }
        }
    }

    async fn store_artifact_with_retry(
        &self,
        artifact: &super::ports::AudioArtifact,
    ) -> Option<crate::domain::session::ArtifactRef> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.backend.store_artifact(artifact).await {
                Ok(r) => return Some(r),
                Err(_) if attempt < self.retry.max_attempts => {
                    self.backend.post_telemetry(TelemetryEvent::RetryAttempt {
                        operation: "store_artifact".to_string(),
                        attempt,
                    });
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                }
                Err(_) => return None,
            }
        }
    }

    async fn update_with_retry(&self, session: &RecordingSession) -> bool {
        let Some(id) = &session.id else {
            return false;
        };
        let (Some(ended_at), Some(reason)) = (session.ended_at_ms, session.reason) else {
            return false;
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .backend
                .update_session(id, ended_at, reason, session.artifact.as_ref())
                .await
            {
                Ok(()) => return true,
                Err(_) if attempt < self.retry.max_attempts => {
                    self.backend.post_telemetry(TelemetryEvent::RetryAttempt {
                        operation: "update_session".to_string(),
                        attempt,
                    });
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                }
                Err(_) => return false,
            }
        }
    }
}

fn spool_key(session: &RecordingSession) -> String {
    format!("{}-{}", session.zone_id, session.started_at_ms)
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
