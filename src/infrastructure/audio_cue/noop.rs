//! No-op audio cue adapter

use async_trait::async_trait;

use crate::application::ports::{AudioCue, AudioCueError, AudioCueType};

/// Audio cue that plays nothing, for simulation and headless hosts
pub struct NoopAudioCue;

impl NoopAudioCue {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoopAudioCue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioCue for NoopAudioCue {
    async fn play(&self, _cue_type: AudioCueType) -> Result<(), AudioCueError> {
        Ok(())
    }
}
