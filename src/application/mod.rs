//! Application layer - Use cases and port interfaces
//!
//! Contains the core business operations and trait definitions
//! for external system interactions.

pub mod controller;
pub mod engine;
pub mod ports;

// Re-export use cases
pub use controller::{ControllerError, RecordingController, RetryPolicy};
pub use engine::{ConfirmDecision, Engine, EngineEvent, NearbyZone, StatusSnapshot};
