//! ZoneRecorder - proximity-triggered audio recording daemon
//!
//! This crate turns raw, noisy, periodic location samples into reliable
//! start/stop decisions for an audio capture session: while a field
//! operator is inside a registered proximity zone, the microphone records;
//! when they leave, the session is closed and persisted.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Geodesy, zone ranking, the proximity state machine,
//!   sessions, configuration
//! - **Application**: The recording controller and engine facade, plus
//!   port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, gpsd, HTTP
//!   backend, notifications, spool, etc.)
//! - **CLI**: Command-line interface, control socket, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
