//! Engine facade
//!
//! Wires location samples into the ranking pipeline and state machine,
//! and reacts to transitions through the recording controller. All inputs
//! (samples, location errors, zone refreshes, confirmation decisions,
//! manual stops, lifecycle and config changes) arrive serialized on one
//! event queue, so transitions apply atomically relative to event
//! processing and overlapping samples are impossible by construction.

use std::sync::{Arc, Mutex as StdMutex};

use serde::Serialize;

use crate::domain::config::EngineConfig;
use crate::domain::engine::{EngineState, ProximityMachine, Transition};
use crate::domain::geo::Coordinate;
use crate::domain::session::TerminationReason;
use crate::domain::zone::{rank, Zone, ZoneDistance};

use super::controller::{ControllerError, RecordingController, RetryPolicy};
use super::ports::{
    ArtifactSpool, AudioCapture, AudioCue, LocationError, NotificationKind, Notifier,
    SessionBackend, TelemetryEvent,
};

/// Resolution of a pending zone-entry confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmDecision {
    Accept,
    Decline,
}

/// Everything the engine reacts to, in arrival order
#[derive(Debug)]
pub enum EngineEvent {
    /// A new position sample from the location stream
    Sample(Coordinate),
    /// The location stream failed to produce a sample
    LocationFailed(LocationError),
    /// A fresh zone set from the directory
    ZonesRefreshed(Vec<Zone>),
    /// The operator resolved a pending confirmation
    Confirmation(ConfirmDecision),
    /// External stop request for the open recording
    ManualStop,
    Enable,
    Disable,
    ConfigUpdated(EngineConfig),
    Shutdown,
}

/// One zone as seen from the current position
#[derive(Debug, Clone, Serialize)]
pub struct NearbyZone {
    pub id: String,
    pub name: String,
    pub distance_m: f64,
    pub inside_radius: bool,
}

impl From<&ZoneDistance> for NearbyZone {
    fn from(zd: &ZoneDistance) -> Self {
        Self {
            id: zd.zone.id.to_string(),
            name: zd.zone.name.clone(),
            distance_m: zd.distance_m,
            inside_radius: zd.inside_radius,
        }
    }
}

/// Read-only snapshot for the host UI / control socket
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub enabled: bool,
    /// True after a fatal permission failure; cleared on re-enable
    pub no_permission: bool,
    #[serde(flatten)]
    pub state: EngineState,
    pub nearest: Vec<NearbyZone>,
    pub last_sample_at_ms: Option<u64>,
    /// Elapsed recording time while locked
    pub locked_elapsed_ms: Option<u64>,
    /// Sessions finalized locally that still await reconciliation
    pub unreconciled: usize,
    pub last_error: Option<String>,
}

impl StatusSnapshot {
    fn initial(enabled: bool) -> Self {
        Self {
            enabled,
            no_permission: false,
            state: EngineState::Idle,
            nearest: Vec::new(),
            last_sample_at_ms: None,
            locked_elapsed_ms: None,
            unreconciled: 0,
            last_error: None,
        }
    }
}

/// The proximity-triggered recording engine.
///
/// Single logical owner of one `ProximityMachine` and one
/// `RecordingController`; consume events with `handle_event` from exactly
/// one task.
pub struct Engine<A, B, N, Q, S>
where
    A: AudioCapture,
    B: SessionBackend,
    N: Notifier,
    Q: AudioCue,
    S: ArtifactSpool,
{
    machine: ProximityMachine,
    controller: RecordingController<A, B, N, Q, S>,
    config: EngineConfig,
    zones: Vec<Zone>,
    enabled: bool,
    no_permission: bool,
    last_sample: Option<Coordinate>,
    last_ranked: Vec<ZoneDistance>,
    last_evaluated_at_ms: Option<u64>,
    last_error: Option<String>,
    status: Arc<StdMutex<StatusSnapshot>>,
}

impl<A, B, N, Q, S> Engine<A, B, N, Q, S>
where
    A: AudioCapture,
    B: SessionBackend,
    N: Notifier,
    Q: AudioCue,
    S: ArtifactSpool,
{
    pub fn new(capture: A, backend: B, notifier: N, cue: Q, spool: S, config: EngineConfig) -> Self {
        Self::with_retry(capture, backend, notifier, cue, spool, config, RetryPolicy::default())
    }

    pub fn with_retry(
        capture: A,
        backend: B,
        notifier: N,
        cue: Q,
        spool: S,
        config: EngineConfig,
        retry: RetryPolicy,
    ) -> Self {
        let mut controller = RecordingController::new(capture, backend, notifier, cue, spool, retry);
        controller.apply_config(&config);
        let enabled = config.enabled_or_default();
        Self {
            machine: ProximityMachine::new(config.exit_margin_or_default()),
            controller,
            config,
            zones: Vec::new(),
            enabled,
            no_permission: false,
            last_sample: None,
            last_ranked: Vec::new(),
            last_evaluated_at_ms: None,
            last_error: None,
            status: Arc::new(StdMutex::new(StatusSnapshot::initial(enabled))),
        }
    }

    /// Shared status cell, for the control socket server
    pub fn status_handle(&self) -> Arc<StdMutex<StatusSnapshot>> {
        Arc::clone(&self.status)
    }

    /// Read-only snapshot of the engine for display
    pub fn current_status(&self) -> StatusSnapshot {
        StatusSnapshot {
            enabled: self.enabled,
            no_permission: self.no_permission,
            state: self.machine.state().clone(),
            nearest: self.last_ranked.iter().map(NearbyZone::from).collect(),
            last_sample_at_ms: self.last_sample.map(|s| s.captured_at_ms),
            locked_elapsed_ms: match self.machine.state() {
                EngineState::LockedInZone(_) => Some(self.controller.elapsed_ms()),
                _ => None,
            },
            unreconciled: self.controller.unreconciled().len(),
            last_error: self.last_error.clone(),
        }
    }

    pub fn state(&self) -> &EngineState {
        self.machine.state()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Process one event. Returns false when the engine should shut down.
    pub async fn handle_event(&mut self, event: EngineEvent) -> bool {
        let keep_running = match event {
            EngineEvent::Sample(sample) => {
                self.handle_sample(sample).await;
                true
            }
            EngineEvent::LocationFailed(err) => {
                self.handle_location_error(err).await;
                true
            }
            EngineEvent::ZonesRefreshed(zones) => {
                self.zones = zones;
                true
            }
            EngineEvent::Confirmation(decision) => {
                self.handle_confirmation(decision).await;
                true
            }
            EngineEvent::ManualStop => {
                self.handle_manual_stop().await;
                true
            }
            EngineEvent::Enable => {
                self.enable().await;
                true
            }
            EngineEvent::Disable => {
                self.disable().await;
                true
            }
            EngineEvent::ConfigUpdated(config) => {
                self.apply_config(config);
                true
            }
            EngineEvent::Shutdown => {
                // Never leave a session open behind a dying process
                if self.controller.has_open_session() {
                    self.handle_manual_stop().await;
                }
                false
            }
        };
        self.publish_status();
        keep_running
    }

    async fn handle_sample(&mut self, sample: Coordinate) {
        let ranked = rank(&sample, &self.zones);
        // Display state updates on every sample, throttled or not
        self.last_sample = Some(sample);
        self.last_ranked = ranked.clone();

        if !self.enabled || self.no_permission {
            return;
        }

        // Coalesce bursts: within one sample interval only the latest
        // sample is evaluated, and it already superseded the others above
        let interval_ms = self.config.sample_interval_secs_or_default() * 1_000;
        if let Some(last) = self.last_evaluated_at_ms {
            if sample.captured_at_ms.saturating_sub(last) < interval_ms {
                return;
            }
        }
        self.last_evaluated_at_ms = Some(sample.captured_at_ms);

        let before = self.machine.state().clone();
        let transition = self
            .machine
            .observe(&sample, &ranked, self.config.mode_or_default());
        self.apply_transition(transition, &sample).await;
        let after = self.machine.state().clone();
        if before != after {
            self.controller.post_telemetry(TelemetryEvent::Transition {
                from: before.as_str().to_string(),
                to: after.as_str().to_string(),
                zone_id: locked_zone_id(&after),
                at_ms: sample.captured_at_ms,
            });
        }
    }

    async fn apply_transition(&mut self, transition: Transition, sample: &Coordinate) {
        match transition {
            Transition::NoChange => {}
            Transition::Inconclusive => {
                self.controller.post_telemetry(TelemetryEvent::SampleDiscarded {
                    reason: "accuracy_exceeds_radius".to_string(),
                    at_ms: sample.captured_at_ms,
                });
            }
            Transition::ConfirmationRequested { zone } => {
                self.controller
                    .notify(
                        NotificationKind::Info,
                        &format!("Entered {}; confirm to start recording", zone.name),
                    )
                    .await;
            }
            Transition::ConfirmationAbandoned { .. } => {
                self.controller
                    .notify(NotificationKind::Info, "Left the zone before confirming")
                    .await;
            }
            Transition::EnteredZone { zone } => {
                self.start_recording(&zone, sample).await;
            }
            Transition::ExitedZone { .. } => {
                self.finish_recording(TerminationReason::ExitedZone).await;
            }
        }
    }

    /// Start capture + session for a freshly locked zone. On any failure
    /// the lock is released so the entry can retry on a later sample.
    async fn start_recording(&mut self, zone: &Zone, location: &Coordinate) {
        match self.controller.on_zone_locked(zone, location).await {
            Ok(()) => {
                self.last_error = None;
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                let _ = self.machine.abort_lock();
            }
        }
    }

    /// Wind down the open session; the machine stays in finalizing until
    /// the controller has run to completion or retry exhaustion.
    async fn finish_recording(&mut self, reason: TerminationReason) {
        match self.controller.on_zone_exited(reason).await {
            Ok(_) => {}
            Err(e @ ControllerError::NoOpenSession) => {
                // Nothing was recording; note the inconsistency and move on
                self.last_error = Some(e.to_string());
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
            }
        }
        let _ = self.machine.finalized();
    }

    async fn handle_location_error(&mut self, err: LocationError) {
        match err {
            LocationError::PermissionDenied => {
                // The only fatal failure: halt until re-enabled
                self.last_error = Some(err.to_string());
                self.controller
                    .notify(
                        NotificationKind::Error,
                        "Location permission denied; recording engine halted",
                    )
                    .await;
                self.disable().await;
                self.no_permission = true;
            }
            LocationError::PositionUnavailable(_) | LocationError::Timeout => {
                // Transient: keep the last-known location, keep sampling
                self.last_error = Some(err.to_string());
            }
        }
    }

    async fn handle_confirmation(&mut self, decision: ConfirmDecision) {
        if !matches!(self.machine.state(), EngineState::ConfirmationPending(_)) {
            return;
        }
        match decision {
            ConfirmDecision::Accept => match self.machine.confirm_accept() {
                Ok(zone) => {
                    let location = self
                        .last_sample
                        .unwrap_or(zone.center);
                    self.start_recording(&zone, &location).await;
                }
                Err(e) => self.last_error = Some(e.to_string()),
            },
            ConfirmDecision::Decline => {
                if self.machine.confirm_decline().is_ok() {
                    self.controller
                        .notify(NotificationKind::Info, "Recording declined")
                        .await;
                }
            }
        }
    }

    async fn handle_manual_stop(&mut self) {
        match self.machine.manual_exit() {
            Ok(_) => self.finish_recording(TerminationReason::ManualStop).await,
            Err(_) => {
                self.controller
                    .notify(NotificationKind::Info, "No recording to stop")
                    .await;
            }
        }
    }

    /// Disable the engine. Idempotent: a second call is a no-op.
    /// An open session is finalized through the same exit path as a zone
    /// exit, with reason `manual_stop`.
    async fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        match self.machine.state().clone() {
            EngineState::LockedInZone(_) => {
                if self.machine.manual_exit().is_ok() {
                    self.finish_recording(TerminationReason::ManualStop).await;
                }
            }
            EngineState::ConfirmationPending(_) => {
                let _ = self.machine.confirm_decline();
            }
            _ => {}
        }
        self.machine.reset();
        self.enabled = false;
        self.last_evaluated_at_ms = None;
        self.controller
            .notify(NotificationKind::Info, "Recording engine disabled")
            .await;
    }

    /// Enable the engine. Always starts from idle: a stale lock from
    /// before a disable can never resurrect.
    async fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.machine.reset();
        self.enabled = true;
        self.no_permission = false;
        self.last_error = None;
        self.last_evaluated_at_ms = None;
        self.controller
            .notify(NotificationKind::Info, "Recording engine enabled")
            .await;
    }

    /// Replace the configuration. Takes effect at future decision points;
    /// an open session is never interrupted.
    fn apply_config(&mut self, config: EngineConfig) {
        self.machine.set_exit_margin(config.exit_margin_or_default());
        self.controller.apply_config(&config);
        self.config = config;
    }

    fn publish_status(&self) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = self.current_status();
        }
    }
}

fn locked_zone_id(state: &EngineState) -> Option<String> {
    match state {
        EngineState::LockedInZone(id)
        | EngineState::ConfirmationPending(id)
        | EngineState::Finalizing(id) => Some(id.to_string()),
        EngineState::Idle => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        AudioArtifact, AudioCue, AudioCueError, AudioCueType, BackendError, CaptureError,
        CaptureHandle, NotificationError, SpoolError,
    };
    use crate::domain::config::AudioQualityTier;
    use crate::domain::session::{ArtifactRef, SessionId};
    use crate::domain::zone::ZoneId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    const LAT_DEGREE_M: f64 = 111_194.93;

    struct StubCapture {
        capturing: AtomicBool,
    }

    #[async_trait]
    impl crate::application::ports::AudioCapture for StubCapture {
        async fn start(&self, _quality: AudioQualityTier) -> Result<CaptureHandle, CaptureError> {
            self.capturing.store(true, Ordering::SeqCst);
            Ok(CaptureHandle(1))
        }

        async fn stop(&self, _handle: CaptureHandle) -> Result<AudioArtifact, CaptureError> {
            self.capturing.store(false, Ordering::SeqCst);
            Ok(AudioArtifact {
                data: vec![1, 2, 3],
                sample_rate: 16_000,
                duration_ms: 250,
            })
        }

        async fn cancel(&self, _handle: CaptureHandle) -> Result<(), CaptureError> {
            self.capturing.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_capturing(&self) -> bool {
            self.capturing.load(Ordering::SeqCst)
        }

        fn elapsed_ms(&self) -> u64 {
            0
        }
    }

    #[derive(Default)]
    struct StubBackend {
        created: AtomicU32,
        updated: Mutex<Vec<TerminationReason>>,
    }

    #[async_trait]
    impl SessionBackend for StubBackend {
        async fn create_session(
            &self,
            _zone_id: &ZoneId,
            _location: &Coordinate,
        ) -> Result<SessionId, BackendError> {
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            Ok(SessionId::new(format!("s-{n}")))
        }

        async fn update_session(
            &self,
            _id: &SessionId,
            _ended_at_ms: u64,
            reason: TerminationReason,
            _artifact: Option<&ArtifactRef>,
        ) -> Result<(), BackendError> {
            self.updated.lock().unwrap().push(reason);
            Ok(())
        }

        async fn store_artifact(
            &self,
            _artifact: &AudioArtifact,
        ) -> Result<ArtifactRef, BackendError> {
            Ok(ArtifactRef::new("a-1"))
        }

        fn post_telemetry(&self, _event: TelemetryEvent) {}
    }

    #[derive(Default)]
    struct StubNotifier;

    #[async_trait]
    impl Notifier for StubNotifier {
        async fn notify(
            &self,
            _kind: NotificationKind,
            _message: &str,
        ) -> Result<(), NotificationError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubCue;

    #[async_trait]
    impl AudioCue for StubCue {
        async fn play(&self, _cue_type: AudioCueType) -> Result<(), AudioCueError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubSpool;

    #[async_trait]
    impl ArtifactSpool for StubSpool {
        async fn retain(&self, _key: &str, _artifact: &AudioArtifact) -> Result<(), SpoolError> {
            Ok(())
        }

        async fn release(&self, _key: &str) -> Result<(), SpoolError> {
            Ok(())
        }
    }

    type TestEngine = Engine<StubCapture, StubBackend, StubNotifier, StubCue, StubSpool>;

    fn engine(config: EngineConfig) -> TestEngine {
        Engine::new(
            StubCapture {
                capturing: AtomicBool::new(false),
            },
            StubBackend::default(),
            StubNotifier,
            StubCue,
            StubSpool,
            config,
        )
    }

    fn automatic_config() -> EngineConfig {
        EngineConfig {
            mode: Some("automatic".to_string()),
            sample_interval_secs: Some(1),
            ..Default::default()
        }
    }

    fn zone(id: &str, radius_m: f64) -> Zone {
        Zone {
            id: ZoneId::new(id),
            name: format!("zone {id}"),
            kind: "lot".to_string(),
            center: Coordinate::fixed(0.0, 0.0).unwrap(),
            radius_m,
            active: true,
        }
    }

    fn sample(meters_north: f64, at_ms: u64) -> EngineEvent {
        EngineEvent::Sample(
            Coordinate::new(meters_north / LAT_DEGREE_M, 0.0, 5.0, at_ms).unwrap(),
        )
    }

    #[tokio::test]
    async fn sample_with_no_zones_is_harmless() {
        let mut e = engine(automatic_config());
        assert!(e.handle_event(sample(10.0, 1_000)).await);
        assert_eq!(*e.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn entry_and_exit_cycle() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;

        e.handle_event(sample(10.0, 1_000)).await;
        assert_eq!(*e.state(), EngineState::LockedInZone(ZoneId::new("a")));
        assert!(e.controller.has_open_session());

        // 65 m out is beyond radius 50 + margin 10
        e.handle_event(sample(65.0, 3_000)).await;
        assert_eq!(*e.state(), EngineState::Idle);
        assert!(!e.controller.has_open_session());
        assert_eq!(
            *e.controller.backend_ref().updated.lock().unwrap(),
            vec![TerminationReason::ExitedZone]
        );
    }

    #[tokio::test]
    async fn sample_bursts_are_coalesced() {
        let mut e = engine(EngineConfig {
            sample_interval_secs: Some(5),
            ..automatic_config()
        });
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;

        // First sample at t=1s is evaluated and locks the zone
        e.handle_event(sample(10.0, 1_000)).await;
        assert_eq!(*e.state(), EngineState::LockedInZone(ZoneId::new("a")));

        // A burst of exit-distance samples within the interval is not
        // evaluated...
        e.handle_event(sample(100.0, 2_000)).await;
        e.handle_event(sample(100.0, 3_000)).await;
        assert_eq!(*e.state(), EngineState::LockedInZone(ZoneId::new("a")));

        // ...but the next one past the interval is
        e.handle_event(sample(100.0, 6_500)).await;
        assert_eq!(*e.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn throttled_samples_still_update_status() {
        let mut e = engine(EngineConfig {
            sample_interval_secs: Some(60),
            ..automatic_config()
        });
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(sample(200.0, 1_000)).await;
        e.handle_event(sample(210.0, 1_500)).await;

        let status = e.current_status();
        assert_eq!(status.last_sample_at_ms, Some(1_500));
        assert_eq!(status.nearest.len(), 1);
    }

    #[tokio::test]
    async fn confirm_first_accept_starts_recording() {
        let mut e = engine(EngineConfig {
            mode: Some("confirm_first".to_string()),
            ..automatic_config()
        });
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;

        e.handle_event(sample(10.0, 1_000)).await;
        assert_eq!(
            *e.state(),
            EngineState::ConfirmationPending(ZoneId::new("a"))
        );
        assert!(!e.controller.has_open_session());

        e.handle_event(EngineEvent::Confirmation(ConfirmDecision::Accept))
            .await;
        assert_eq!(*e.state(), EngineState::LockedInZone(ZoneId::new("a")));
        assert!(e.controller.has_open_session());
    }

    #[tokio::test]
    async fn confirm_first_decline_creates_nothing() {
        let mut e = engine(EngineConfig {
            mode: Some("confirm_first".to_string()),
            ..automatic_config()
        });
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(sample(10.0, 1_000)).await;

        e.handle_event(EngineEvent::Confirmation(ConfirmDecision::Decline))
            .await;
        assert_eq!(*e.state(), EngineState::Idle);
        assert!(!e.controller.has_open_session());
        assert_eq!(e.controller.backend_ref().created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stray_confirmation_is_ignored() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::Confirmation(ConfirmDecision::Accept))
            .await;
        assert_eq!(*e.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn manual_stop_finalizes_with_manual_reason() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(sample(10.0, 1_000)).await;

        e.handle_event(EngineEvent::ManualStop).await;
        assert_eq!(*e.state(), EngineState::Idle);
        assert_eq!(
            *e.controller.backend_ref().updated.lock().unwrap(),
            vec![TerminationReason::ManualStop]
        );
    }

    #[tokio::test]
    async fn disable_finalizes_open_session() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(sample(10.0, 1_000)).await;
        assert!(e.controller.has_open_session());

        e.handle_event(EngineEvent::Disable).await;
        assert!(!e.is_enabled());
        assert!(!e.controller.has_open_session());
        assert_eq!(
            *e.controller.backend_ref().updated.lock().unwrap(),
            vec![TerminationReason::ManualStop]
        );
    }

    #[tokio::test]
    async fn disable_is_idempotent() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::Disable).await;
        let first = e.current_status();
        e.handle_event(EngineEvent::Disable).await;
        let second = e.current_status();

        assert!(!first.enabled && !second.enabled);
        assert_eq!(first.state, second.state);
    }

    #[tokio::test]
    async fn disabled_engine_ignores_samples() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(EngineEvent::Disable).await;

        e.handle_event(sample(10.0, 1_000)).await;
        assert_eq!(*e.state(), EngineState::Idle);
        assert!(!e.controller.has_open_session());
    }

    #[tokio::test]
    async fn reenable_starts_from_idle() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(sample(10.0, 1_000)).await;
        e.handle_event(EngineEvent::Disable).await;
        e.handle_event(EngineEvent::Enable).await;

        assert!(e.is_enabled());
        assert_eq!(*e.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn permission_denied_halts_engine() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(EngineEvent::LocationFailed(LocationError::PermissionDenied))
            .await;

        let status = e.current_status();
        assert!(!status.enabled);
        assert!(status.no_permission);

        // Samples no longer trigger anything
        e.handle_event(sample(10.0, 5_000)).await;
        assert_eq!(*e.state(), EngineState::Idle);

        // Re-enable clears the permission latch
        e.handle_event(EngineEvent::Enable).await;
        assert!(!e.current_status().no_permission);
    }

    #[tokio::test]
    async fn transient_location_errors_keep_sampling() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(EngineEvent::LocationFailed(LocationError::Timeout))
            .await;
        assert!(e.is_enabled());

        e.handle_event(sample(10.0, 1_000)).await;
        assert_eq!(*e.state(), EngineState::LockedInZone(ZoneId::new("a")));
    }

    #[tokio::test]
    async fn shutdown_finalizes_open_session() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(sample(10.0, 1_000)).await;

        let keep_running = e.handle_event(EngineEvent::Shutdown).await;
        assert!(!keep_running);
        assert!(!e.controller.has_open_session());
    }

    #[tokio::test]
    async fn config_update_applies_to_future_decisions() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(sample(10.0, 1_000)).await;
        assert!(e.controller.has_open_session());

        // Widen the exit margin mid-session; the open session survives
        let mut config = automatic_config();
        config.exit_margin_m = Some(40.0);
        e.handle_event(EngineEvent::ConfigUpdated(config)).await;
        assert!(e.controller.has_open_session());

        // 65 m would have exited under the old 10 m margin, not under 40 m
        e.handle_event(sample(65.0, 3_000)).await;
        assert_eq!(*e.state(), EngineState::LockedInZone(ZoneId::new("a")));

        e.handle_event(sample(95.0, 5_000)).await;
        assert_eq!(*e.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn status_reflects_locked_state() {
        let mut e = engine(automatic_config());
        e.handle_event(EngineEvent::ZonesRefreshed(vec![zone("a", 50.0)]))
            .await;
        e.handle_event(sample(10.0, 1_000)).await;

        let status = e.current_status();
        assert_eq!(status.state, EngineState::LockedInZone(ZoneId::new("a")));
        assert!(status.locked_elapsed_ms.is_some());
        assert!(status.nearest[0].inside_radius);

        // The shared handle sees the same snapshot
        let shared = e.status_handle();
        let guard = shared.lock().unwrap();
        assert_eq!(guard.state, status.state);
    }
}
