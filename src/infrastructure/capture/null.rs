//! No-op capture adapter for simulation

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::application::ports::{AudioArtifact, AudioCapture, CaptureError, CaptureHandle};
use crate::domain::config::AudioQualityTier;

/// Capture adapter that records nothing.
///
/// Used by simulation mode, where the pipeline should run end to end
/// without claiming a real microphone. Produces a short silent artifact
/// so downstream artifact handling is still exercised.
pub struct NullCapture {
    capturing: AtomicBool,
    started_at_ms: AtomicU64,
    sample_rate: AtomicU64,
    next_handle: AtomicU64,
}

impl NullCapture {
    pub fn new() -> Self {
        Self {
            capturing: AtomicBool::new(false),
            started_at_ms: AtomicU64::new(0),
            sample_rate: AtomicU64::new(0),
            next_handle: AtomicU64::new(1),
        }
    }
}

impl Default for NullCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioCapture for NullCapture {
    async fn start(&self, quality: AudioQualityTier) -> Result<CaptureHandle, CaptureError> {
        if self.capturing.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable(
                "capture already in progress".to_string(),
            ));
        }
        self.started_at_ms.store(now_ms(), Ordering::SeqCst);
        self.sample_rate
            .store(quality.sample_rate() as u64, Ordering::SeqCst);
        Ok(CaptureHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }

    async fn stop(&self, _handle: CaptureHandle) -> Result<AudioArtifact, CaptureError> {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::NotCapturing);
        }
        Ok(AudioArtifact {
            data: vec![0u8; 16],
            sample_rate: self.sample_rate.load(Ordering::SeqCst) as u32,
            duration_ms: self.elapsed_ms(),
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
        if self.is_capturing() {
            now_ms().saturating_sub(self.started_at_ms.load(Ordering::SeqCst))
        } else {
            0
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
