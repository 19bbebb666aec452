//! Hardware audio output using cpal

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error};

use super::{
    AudioCallback, AudioDevice, AudioError, AudioFormat, AudioRingBuffer, CallbackStats,
    CallbackStatsSnapshot,
};

/// Default output device driven by the ring buffer callback
pub struct CpalDevice {
    /// The cpal stream (kept alive for the duration)
    stream: Option<cpal::Stream>,
    format: AudioFormat,
    ring: Arc<AudioRingBuffer>,
    stats: Arc<CallbackStats>,
    /// Set by the stream's error callback
    failed: Arc<AtomicBool>,
}

impl CpalDevice {
    /// Open the default output device at `format` and start pulling from `ring`
    ///
    /// # Errors
    ///
    /// Returns an error if there is no output device, its sample format is not
    /// supported, or the stream cannot be built or started.
    pub fn open(format: AudioFormat, ring: Arc<AudioRingBuffer>) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Stream(format!("failed to get default output config: {e}")))?;

        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let mut callback = AudioCallback::new(Arc::clone(&ring));
        let stats = callback.stats();
        let failed = Arc::new(AtomicBool::new(false));
        let error_flag = Arc::clone(&failed);
        let on_error = move |err: cpal::StreamError| {
            error!("Audio stream error: {}", err);
            error_flag.store(true, Ordering::Release);
        };

        // Build the stream based on sample format
        let stream = match supported.sample_format() {
            cpal::SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| callback.fill_i16(data),
                on_error,
                None,
            ),
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| callback.fill_f32(data),
                on_error,
                None,
            ),
            cpal::SampleFormat::U16 => device.build_output_stream(
                &config,
                move |data: &mut [u16], _: &cpal::OutputCallbackInfo| callback.fill_u16(data),
                on_error,
                None,
            ),
            other => {
                return Err(AudioError::UnsupportedFormat(format!(
                    "device sample format {other:?}"
                )));
            }
        }
        .map_err(|e| AudioError::Stream(format!("failed to build audio stream: {e}")))?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(format!("failed to play audio stream: {e}")))?;

        debug!("Audio stream started at {}Hz", format.sample_rate);

        Ok(Self {
            stream: Some(stream),
            format,
            ring,
            stats,
            failed,
        })
    }
}

impl AudioDevice for CpalDevice {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn play_position(&self) -> Result<u64, AudioError> {
        if self.failed.load(Ordering::Acquire) {
            return Err(AudioError::Query("audio stream reported an error".into()));
        }
        Ok(self.ring.play_position())
    }

    fn stats(&self) -> CallbackStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        // Dropping the stream stops the callback
        if let Some(stream) = self.stream.take() {
            drop(stream);
            debug!("Audio stream stopped");
        }
    }
}
