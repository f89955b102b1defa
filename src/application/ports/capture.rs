//! Audio capture port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::config::AudioQualityTier;

/// Capture errors
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// The microphone cannot be claimed (missing, or already in use)
    #[error("Audio capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Failed to stop capture: {0}")]
    StopFailed(String),

    #[error("No capture in progress")]
    NotCapturing,
}

/// Opaque handle to one in-flight capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureHandle(pub u64);

/// A finished audio recording plus basic quality metadata
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    /// Encoded FLAC bytes
    pub data: Vec<u8>,
    /// Sample rate of the encoded audio
    pub sample_rate: u32,
    /// Recording length in milliseconds
    pub duration_ms: u64,
}

impl AudioArtifact {
    pub const fn mime_type(&self) -> &'static str {
        "audio/flac"
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size_bytes();
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}

/// Port for the exclusive audio capture device.
///
/// Acquisition is single-flight: a second `start` while a capture is live
/// fails with `DeviceUnavailable`.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Claim the device and begin capturing at the given quality tier
    async fn start(&self, quality: AudioQualityTier) -> Result<CaptureHandle, CaptureError>;

    /// Stop the capture and return the finished artifact
    async fn stop(&self, handle: CaptureHandle) -> Result<AudioArtifact, CaptureError>;

    /// Discard the capture without producing an artifact
    async fn cancel(&self, handle: CaptureHandle) -> Result<(), CaptureError>;

    /// Check if currently capturing
    fn is_capturing(&self) -> bool;

    /// Get elapsed capture time in milliseconds
    fn elapsed_ms(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(len: usize) -> AudioArtifact {
        AudioArtifact {
            data: vec![0u8; len],
            sample_rate: 16_000,
            duration_ms: 1_000,
        }
    }

    #[test]
    fn human_readable_size_bytes() {
        assert_eq!(artifact(500).human_readable_size(), "500 B");
    }

    #[test]
    fn human_readable_size_kb() {
        assert_eq!(artifact(2048).human_readable_size(), "2.0 KB");
    }

    #[test]
    fn human_readable_size_mb() {
        assert_eq!(artifact(2 * 1024 * 1024).human_readable_size(), "2.0 MB");
    }

    #[test]
    fn mime_type_is_flac() {
        assert_eq!(artifact(1).mime_type(), "audio/flac");
    }
}
