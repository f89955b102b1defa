//! Cross-platform audio capture using cpal
//!
//! Captures mono audio from the default input device, resamples to the
//! quality tier's target rate, and encodes the artifact as FLAC.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use rubato::{FftFixedIn, Resampler};
use tokio::time::Duration as TokioDuration;

use super::flac::encode_to_flac;
use crate::application::ports::{AudioArtifact, AudioCapture, CaptureError, CaptureHandle};
use crate::domain::config::AudioQualityTier;

/// Audio capture adapter using cpal.
///
/// The stream is managed on a dedicated thread because cpal::Stream is not
/// Send. The microphone is exclusive: `start` while a capture is live fails
/// with `DeviceUnavailable`.
pub struct CpalCapture {
    /// Recorded audio samples (mono, i16, at device sample rate)
    audio_buffer: Arc<StdMutex<Vec<i16>>>,
    /// Device sample rate (may differ from the target rate)
    device_sample_rate: Arc<AtomicU32>,
    /// Target rate of the capture in flight
    target_sample_rate: Arc<AtomicU32>,
    /// Capture state
    is_capturing: Arc<AtomicBool>,
    /// Capture start time (millis since epoch for atomic access)
    start_time_ms: Arc<AtomicU64>,
    /// Elapsed time in milliseconds
    elapsed_ms: Arc<AtomicU64>,
    /// Handle of the capture in flight
    current_handle: AtomicU64,
    /// Monotonic handle source
    next_handle: AtomicU64,
}

impl CpalCapture {
    pub fn new() -> Self {
        Self {
            audio_buffer: Arc::new(StdMutex::new(Vec::new())),
            device_sample_rate: Arc::new(AtomicU32::new(0)),
            target_sample_rate: Arc::new(AtomicU32::new(0)),
            is_capturing: Arc::new(AtomicBool::new(false)),
            start_time_ms: Arc::new(AtomicU64::new(0)),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            current_handle: AtomicU64::new(0),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Get the default input device
    fn get_input_device() -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        host.default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no input device".into()))
    }

    /// Get a suitable input configuration for the target rate
    fn get_input_config(
        device: &cpal::Device,
        target_rate: u32,
    ) -> Result<(StreamConfig, SampleFormat), CaptureError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| CaptureError::StartFailed(format!("Failed to get configs: {}", e)))?;

        // Try to find a config that supports our target sample rate
        // Prefer mono, but accept stereo (we'll mix down)
        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;

        for config in supported_configs {
            // Only consider i16 or f32 formats
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }

            let includes_target = config.min_sample_rate().0 <= target_rate
                && config.max_sample_rate().0 >= target_rate;

            let is_better = match &best_config {
                None => true,
                Some(current) => {
                    // Prefer mono over stereo
                    let fewer_channels = config.channels() < current.channels();
                    // Prefer configs that include our target rate
                    let better_rate =
                        includes_target && current.min_sample_rate().0 > target_rate;
                    fewer_channels || better_rate
                }
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let config_range = best_config
            .ok_or_else(|| CaptureError::StartFailed("No suitable config found".into()))?;

        // Use target sample rate if supported, otherwise use the minimum
        let sample_rate = if config_range.min_sample_rate().0 <= target_rate
            && config_range.max_sample_rate().0 >= target_rate
        {
            SampleRate(target_rate)
        } else {
            config_range.min_sample_rate()
        };

        let sample_format = config_range.sample_format();
        let config = StreamConfig {
            channels: config_range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok((config, sample_format))
    }

    /// Resample audio from the device rate to the target rate if needed
    fn resample(samples: &[i16], source_rate: u32, target_rate: u32) -> Result<Vec<i16>, CaptureError> {
        if source_rate == target_rate {
            return Ok(samples.to_vec());
        }

        // Convert i16 to f32 for resampling
        let samples_f32: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();

        // Calculate output length
        let ratio = target_rate as f64 / source_rate as f64;
        let output_len = (samples_f32.len() as f64 * ratio).ceil() as usize;

        // Use rubato for high-quality resampling
        let mut resampler = FftFixedIn::<f32>::new(
            source_rate as usize,
            target_rate as usize,
            1024, // Chunk size
            2,    // Sub-chunks
            1,    // Mono
        )
        .map_err(|e| CaptureError::StopFailed(format!("Resampler init failed: {}", e)))?;

        let mut output = Vec::with_capacity(output_len);
        let mut input_pos = 0;

        while input_pos < samples_f32.len() {
            let frames_needed = resampler.input_frames_next();
            let end_pos = (input_pos + frames_needed).min(samples_f32.len());
            let chunk: Vec<Vec<f32>> = vec![samples_f32[input_pos..end_pos].to_vec()];

            // Pad if we don't have enough samples
            let chunk = if chunk[0].len() < frames_needed {
                let mut padded = chunk[0].clone();
                padded.resize(frames_needed, 0.0);
                vec![padded]
            } else {
                chunk
            };

            let resampled = resampler
                .process(&chunk, None)
                .map_err(|e| CaptureError::StopFailed(format!("Resampling failed: {}", e)))?;

            output.extend(resampled[0].iter().map(|&s| (s * 32767.0) as i16));
            input_pos = end_pos;
        }

        // Trim to expected output length
        output.truncate(output_len);

        Ok(output)
    }

    /// Mix stereo to mono
    fn stereo_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels == 1 {
            return samples.to_vec();
        }

        samples
            .chunks(channels as usize)
            .map(|chunk| {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    }

    /// Encode PCM samples to the FLAC artifact
    fn encode_artifact(
        samples: &[i16],
        device_rate: u32,
        target_rate: u32,
        duration_ms: u64,
    ) -> Result<AudioArtifact, CaptureError> {
        let resampled = Self::resample(samples, device_rate, target_rate)?;

        let data = encode_to_flac(&resampled, target_rate)
            .map_err(|e| CaptureError::StopFailed(format!("Encoding failed: {}", e)))?;

        if data.is_empty() {
            return Err(CaptureError::StopFailed("Encoded audio is empty".into()));
        }

        Ok(AudioArtifact {
            data,
            sample_rate: target_rate,
            duration_ms,
        })
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioCapture for CpalCapture {
    async fn start(&self, quality: AudioQualityTier) -> Result<CaptureHandle, CaptureError> {
        if self.is_capturing.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable(
                "capture already in progress".to_string(),
            ));
        }

        let target_rate = quality.sample_rate();
        self.target_sample_rate.store(target_rate, Ordering::SeqCst);

        // Clear buffer
        {
            let mut buffer = self.audio_buffer.lock().unwrap();
            buffer.clear();
        }

        // Mark as capturing
        self.is_capturing.store(true, Ordering::SeqCst);
        self.elapsed_ms.store(0, Ordering::SeqCst);
        self.start_time_ms.store(now_ms(), Ordering::SeqCst);

        // Clone Arcs for the background capture thread
        let audio_buffer = Arc::clone(&self.audio_buffer);
        let device_sample_rate = Arc::clone(&self.device_sample_rate);
        let is_capturing = Arc::clone(&self.is_capturing);
        let elapsed_ms = Arc::clone(&self.elapsed_ms);
        let start_time_ms = Arc::clone(&self.start_time_ms);

        // Run the stream on its own thread (cpal::Stream is not Send)
        std::thread::spawn(move || {
            let device = match CpalCapture::get_input_device() {
                Ok(d) => d,
                Err(_) => {
                    is_capturing.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let (config, sample_format) =
                match CpalCapture::get_input_config(&device, target_rate) {
                    Ok(c) => c,
                    Err(_) => {
                        is_capturing.store(false, Ordering::SeqCst);
                        return;
                    }
                };

            let sample_rate = config.sample_rate.0;
            let channels = config.channels;
            device_sample_rate.store(sample_rate, Ordering::SeqCst);

            let audio_buffer_clone = Arc::clone(&audio_buffer);
            let is_capturing_clone = Arc::clone(&is_capturing);

            let stream_result = match sample_format {
                SampleFormat::I16 => device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        if is_capturing_clone.load(Ordering::SeqCst) {
                            let mono = CpalCapture::stereo_to_mono(data, channels);
                            if let Ok(mut buffer) = audio_buffer_clone.lock() {
                                buffer.extend_from_slice(&mono);
                            }
                        }
                    },
                    |err| eprintln!("Audio stream error: {}", err),
                    None,
                ),

                SampleFormat::F32 => {
                    let audio_buffer_clone = Arc::clone(&audio_buffer);
                    let is_capturing_clone = Arc::clone(&is_capturing);

                    device.build_input_stream(
                        &config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            if is_capturing_clone.load(Ordering::SeqCst) {
                                let i16_data: Vec<i16> =
                                    data.iter().map(|&s| (s * 32767.0) as i16).collect();
                                let mono = CpalCapture::stereo_to_mono(&i16_data, channels);
                                if let Ok(mut buffer) = audio_buffer_clone.lock() {
                                    buffer.extend_from_slice(&mono);
                                }
                            }
                        },
                        |err| eprintln!("Audio stream error: {}", err),
                        None,
                    )
                }

                _ => {
                    is_capturing.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let stream = match stream_result {
                Ok(s) => s,
                Err(_) => {
                    is_capturing.store(false, Ordering::SeqCst);
                    return;
                }
            };

            if stream.play().is_err() {
                is_capturing.store(false, Ordering::SeqCst);
                return;
            }

            // Keep capturing until stopped
            while is_capturing.load(Ordering::SeqCst) {
                let start = start_time_ms.load(Ordering::SeqCst);
                elapsed_ms.store(now_ms().saturating_sub(start), Ordering::SeqCst);

                std::thread::sleep(std::time::Duration::from_millis(100));
            }

            drop(stream);
        });

        // Give the thread a moment to claim the device
        tokio::time::sleep(TokioDuration::from_millis(50)).await;

        if !self.is_capturing.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable(
                "failed to open input device".to_string(),
            ));
        }

        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.current_handle.store(handle, Ordering::SeqCst);
        Ok(CaptureHandle(handle))
    }

    async fn stop(&self, handle: CaptureHandle) -> Result<AudioArtifact, CaptureError> {
        if !self.is_capturing.load(Ordering::SeqCst)
            || handle.0 != self.current_handle.load(Ordering::SeqCst)
        {
            return Err(CaptureError::NotCapturing);
        }

        // Stop capturing
        self.is_capturing.store(false, Ordering::SeqCst);

        // Give the thread a moment to clean up
        tokio::time::sleep(TokioDuration::from_millis(100)).await;

        let device_rate = self.device_sample_rate.load(Ordering::SeqCst);
        if device_rate == 0 {
            return Err(CaptureError::StopFailed("Sample rate not set".into()));
        }
        let target_rate = self.target_sample_rate.load(Ordering::SeqCst);
        let duration_ms = self.elapsed_ms.load(Ordering::SeqCst);

        // Get the recorded samples
        let samples = {
            let mut buffer = self.audio_buffer.lock().unwrap();
            std::mem::take(&mut *buffer)
        };

        if samples.is_empty() {
            return Err(CaptureError::StopFailed("No audio data captured".to_string()));
        }

        // Encode in a blocking task (CPU-intensive work)
        let encoded = tokio::task::spawn_blocking(move || {
            Self::encode_artifact(&samples, device_rate, target_rate, duration_ms)
        })
        .await
        .map_err(|e| CaptureError::StopFailed(format!("Encode task error: {}", e)))??;

        Ok(encoded)
    }

    async fn cancel(&self, handle: CaptureHandle) -> Result<(), CaptureError> {
        if handle.0 != self.current_handle.load(Ordering::SeqCst) {
            return Err(CaptureError::NotCapturing);
        }

        // Stop capturing
        self.is_capturing.store(false, Ordering::SeqCst);

        // Give the thread a moment to clean up
        tokio::time::sleep(TokioDuration::from_millis(100)).await;

        // Clear buffer
        {
            let mut buffer = self.audio_buffer.lock().unwrap();
            buffer.clear();
        }

        self.elapsed_ms.store(0, Ordering::SeqCst);

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
