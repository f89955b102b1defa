//! Proximity state machine

mod state;

pub use state::{
    EngineState, InvalidStateTransition, ProximityMachine, Transition, DEFAULT_EXIT_MARGIN_M,
};
