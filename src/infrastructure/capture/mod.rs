//! Audio capture adapters

pub mod cpal_capture;
pub mod flac;
pub mod null;

pub use cpal_capture::CpalCapture;
pub use null::NullCapture;
