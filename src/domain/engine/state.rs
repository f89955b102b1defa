//! Proximity state machine
//!
//! Turns ranked zone distances into enter/exit decisions with hysteresis.
//! The state is mutated only through `observe` and the explicit resolution
//! methods below; there is no external writer.
//!
//! State machine:
//!   IDLE -> LOCKED_IN_ZONE (nearest zone entered, automatic mode)
//!   IDLE -> CONFIRMATION_PENDING (nearest zone entered, confirm-first mode)
//!   CONFIRMATION_PENDING -> LOCKED_IN_ZONE (confirm_accept)
//!   CONFIRMATION_PENDING -> IDLE (confirm_decline, or drift back outside)
//!   LOCKED_IN_ZONE -> FINALIZING (exit margin crossed, or manual_exit)
//!   LOCKED_IN_ZONE -> IDLE (abort_lock, capture never started)
//!   FINALIZING -> IDLE (finalized)

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::config::OperatingMode;
use crate::domain::geo::{distance_m, Coordinate};
use crate::domain::zone::{Zone, ZoneDistance, ZoneId};

/// Current mode of the engine's state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "zone", rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    ConfirmationPending(ZoneId),
    LockedInZone(ZoneId),
    Finalizing(ZoneId),
}

impl EngineState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ConfirmationPending(_) => "confirmation_pending",
            Self::LockedInZone(_) => "locked_in_zone",
            Self::Finalizing(_) => "finalizing",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ConfirmationPending(z) => write!(f, "confirmation_pending({z})"),
            Self::LockedInZone(z) => write!(f, "locked_in_zone({z})"),
            Self::Finalizing(z) => write!(f, "finalizing({z})"),
        }
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: EngineState,
    pub action: String,
}

/// Outcome of feeding one ranked-zone update to the machine
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Nothing to do
    NoChange,
    /// Sample accuracy exceeded the relevant zone radius; ignored for
    /// transition purposes but worth logging
    Inconclusive,
    /// Entered the nearest zone in confirm-first mode; awaiting a decision
    ConfirmationRequested { zone: Zone },
    /// Entered the nearest zone in automatic mode; recording should start
    EnteredZone { zone: Zone },
    /// Drifted back outside the pending zone before a decision arrived
    ConfirmationAbandoned { zone: ZoneId },
    /// Crossed the exit margin of the locked zone; recording should stop
    ExitedZone { zone: Zone },
}

/// Default extra distance beyond a zone's radius the operator must cross
/// before an exit is recognized, suppressing boundary jitter
pub const DEFAULT_EXIT_MARGIN_M: f64 = 10.0;

/// The proximity state machine.
///
/// While locked, the machine anchors to a clone of the zone taken at entry
/// and evaluates exit geometry against it alone; a closer second zone can
/// never preempt an in-progress recording. The anchor is refreshed whenever
/// the zone reappears in a ranked update, so radius changes from the
/// directory take effect mid-session without abandoning the recording.
#[derive(Debug)]
pub struct ProximityMachine {
    state: EngineState,
    anchor: Option<Zone>,
    exit_margin_m: f64,
}

impl ProximityMachine {
    pub fn new(exit_margin_m: f64) -> Self {
        Self {
            state: EngineState::Idle,
            anchor: None,
            exit_margin_m,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Adjust the exit margin for future exit decisions
    pub fn set_exit_margin(&mut self, exit_margin_m: f64) {
        self.exit_margin_m = exit_margin_m;
    }

    pub fn is_idle(&self) -> bool {
        self.state == EngineState::Idle
    }

    /// Evaluate one ranked-zone update against the current state.
    ///
    /// `ranked` must come from `zone::rank` for the same sample. The machine
    /// never starts or stops capture itself; callers act on the returned
    /// transition and report resolutions back via the methods below.
    pub fn observe(
        &mut self,
        sample: &Coordinate,
        ranked: &[ZoneDistance],
        mode: OperatingMode,
    ) -> Transition {
        match self.state.clone() {
            EngineState::Idle => self.observe_idle(sample, ranked, mode),
            EngineState::ConfirmationPending(id) => self.observe_pending(sample, ranked, &id),
            EngineState::LockedInZone(id) => self.observe_locked(sample, ranked, &id),
            // Exit is being wound down; nothing to evaluate until resolved
            EngineState::Finalizing(_) => Transition::NoChange,
        }
    }

    fn observe_idle(
        &mut self,
        sample: &Coordinate,
        ranked: &[ZoneDistance],
        mode: OperatingMode,
    ) -> Transition {
        let Some(nearest) = ranked.first() else {
            return Transition::NoChange;
        };
        if !nearest.inside_radius {
            return Transition::NoChange;
        }
        // The sample claims an entry, but its error circle dwarfs the zone:
        // inconclusive, wait for a better fix
        if sample.accuracy_m > nearest.zone.radius_m {
            return Transition::Inconclusive;
        }

        let zone = nearest.zone.clone();
        self.anchor = Some(zone.clone());
        match mode {
            OperatingMode::Automatic => {
                self.state = EngineState::LockedInZone(zone.id.clone());
                Transition::EnteredZone { zone }
            }
            OperatingMode::ConfirmFirst => {
                self.state = EngineState::ConfirmationPending(zone.id.clone());
                Transition::ConfirmationRequested { zone }
            }
        }
    }

    fn observe_pending(
        &mut self,
        sample: &Coordinate,
        ranked: &[ZoneDistance],
        id: &ZoneId,
    ) -> Transition {
        self.refresh_anchor(ranked);
        let Some(anchor) = &self.anchor else {
            // Anchor is set on every entry into this state
            return Transition::NoChange;
        };
        if sample.accuracy_m > anchor.radius_m {
            return Transition::Inconclusive;
        }
        // No exit margin here: the margin guards an active recording, not an
        // unanswered prompt
        if distance_m(sample, &anchor.center) > anchor.radius_m {
            self.state = EngineState::Idle;
            self.anchor = None;
            return Transition::ConfirmationAbandoned { zone: id.clone() };
        }
        Transition::NoChange
    }

    fn observe_locked(
        &mut self,
        sample: &Coordinate,
        ranked: &[ZoneDistance],
        id: &ZoneId,
    ) -> Transition {
        self.refresh_anchor(ranked);
        let Some(anchor) = self.anchor.clone() else {
            return Transition::NoChange;
        };
        if sample.accuracy_m > anchor.radius_m {
            return Transition::Inconclusive;
        }
        // Zone locking: only the distance to the anchored zone matters;
        // every other zone in `ranked` is irrelevant until we return to idle
        if distance_m(sample, &anchor.center) > anchor.radius_m + self.exit_margin_m {
            self.state = EngineState::Finalizing(id.clone());
            return Transition::ExitedZone { zone: anchor };
        }
        Transition::NoChange
    }

    /// Pick up directory-side changes to the anchored zone (e.g. radius)
    fn refresh_anchor(&mut self, ranked: &[ZoneDistance]) {
        if let Some(anchor) = &self.anchor {
            if let Some(fresh) = ranked.iter().find(|zd| zd.zone.id == anchor.id) {
                self.anchor = Some(fresh.zone.clone());
            }
        }
    }

    /// Resolve a pending confirmation with an accept decision.
    /// Returns the zone to start recording in.
    pub fn confirm_accept(&mut self) -> Result<Zone, InvalidStateTransition> {
        match (&self.state, &self.anchor) {
            (EngineState::ConfirmationPending(id), Some(anchor)) => {
                let zone = anchor.clone();
                self.state = EngineState::LockedInZone(id.clone());
                Ok(zone)
            }
            _ => Err(self.invalid("accept confirmation")),
        }
    }

    /// Resolve a pending confirmation with a decline decision
    pub fn confirm_decline(&mut self) -> Result<ZoneId, InvalidStateTransition> {
        match &self.state {
            EngineState::ConfirmationPending(id) => {
                let id = id.clone();
                self.state = EngineState::Idle;
                self.anchor = None;
                Ok(id)
            }
            _ => Err(self.invalid("decline confirmation")),
        }
    }

    /// Begin finalizing from an external stop request
    pub fn manual_exit(&mut self) -> Result<Zone, InvalidStateTransition> {
        match (&self.state, &self.anchor) {
            (EngineState::LockedInZone(id), Some(anchor)) => {
                let zone = anchor.clone();
                self.state = EngineState::Finalizing(id.clone());
                Ok(zone)
            }
            _ => Err(self.invalid("stop manually")),
        }
    }

    /// Undo a lock whose capture never started (device unavailable).
    /// The entry event is not consumed: the next qualifying sample can
    /// trigger the same zone again.
    pub fn abort_lock(&mut self) -> Result<(), InvalidStateTransition> {
        match &self.state {
            EngineState::LockedInZone(_) => {
                self.state = EngineState::Idle;
                self.anchor = None;
                Ok(())
            }
            _ => Err(self.invalid("abort lock")),
        }
    }

    /// Confirm that the session close completed; returns to idle.
    /// The machine never drops back to idle with an unclosed session:
    /// callers invoke this only after the controller has finished winding
    /// down (successfully or by local error finalization).
    pub fn finalized(&mut self) -> Result<(), InvalidStateTransition> {
        match &self.state {
            EngineState::Finalizing(_) => {
                self.state = EngineState::Idle;
                self.anchor = None;
                Ok(())
            }
            _ => Err(self.invalid("complete finalization")),
        }
    }

    /// Unconditional reset to idle, used on re-enable so a stale lock from
    /// before a disable can never resurrect
    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
        self.anchor = None;
    }

    fn invalid(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state.clone(),
            action: action.to_string(),
        }
    }
}

impl Default for ProximityMachine {
    fn default() -> Self {
        Self::new(DEFAULT_EXIT_MARGIN_M)
    }
}
