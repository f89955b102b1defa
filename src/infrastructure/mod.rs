//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like cpal, gpsd, and the session
//! backend API.

pub mod audio_cue;
pub mod backend;
pub mod capture;
pub mod config;
pub mod location;
pub mod notification;
pub mod spool;
pub mod zones;

// Re-export adapters
pub use audio_cue::{NoopAudioCue, RodioAudioCue};
pub use backend::{HttpSessionBackend, MemoryBackend};
pub use capture::{CpalCapture, NullCapture};
pub use config::XdgConfigStore;
pub use location::{GpsdLocationStream, ReplayLocationStream};
pub use notification::{ConsoleNotifier, NotifyRustNotifier};
pub use spool::{FsArtifactSpool, MemorySpool};
pub use zones::HttpZoneDirectory;
