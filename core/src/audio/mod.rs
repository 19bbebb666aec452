//! Audio output through a shared ring buffer
//!
//! The main loop synthesizes sound ahead of playback and the platform audio
//! thread drains it. Both sides share one [`AudioRingBuffer`] and synchronize
//! only through its cursors.
//!
//! # Architecture
//!
//! ```text
//! Main Thread                                       Audio Thread
//!     │                                                  │
//! [Game Tick]                                            │
//!     │                                                  │
//! [SoundOutputFeeder]                                    │
//!     │ query play position ◄───────(atomic)──────── [AudioCallback]
//!     │ get_sound_samples()                              │
//!     │ write + commit ─────────────(ring)─────────────► [read]
//! ```

mod callback;
#[cfg(feature = "cpal")]
mod cpal_device;
mod device;
mod feeder;
mod metrics;
mod ring_buffer;
mod sound_output;

pub use callback::{AudioCallback, CallbackStats, CallbackStatsSnapshot};
#[cfg(feature = "cpal")]
pub use cpal_device::CpalDevice;
pub use device::{AudioDevice, AudioSystem, SimulatedDevice};
pub use feeder::{AudioMarker, FeedOutcome, MAX_MARKERS, SoundOutputFeeder};
pub use metrics::FeederMetrics;
pub use ring_buffer::AudioRingBuffer;
pub use sound_output::{SoundOutput, WritePlan, plan_write};

/// Default output sample rate (48 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Output is always interleaved stereo
pub const CHANNELS: u16 = 2;

/// Width of one channel sample in bytes (signed 16-bit)
pub const SAMPLE_WIDTH: usize = std::mem::size_of::<i16>();

/// Negotiated output format
///
/// Samples are always signed 16-bit; only the rate and channel count vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample frames per second
    pub sample_rate: u32,
    /// Interleaved channels per sample frame
    pub channels: u16,
}

impl AudioFormat {
    /// Stereo 16-bit at the given rate
    pub fn stereo(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: CHANNELS,
        }
    }

    /// Bytes in one sample frame (all channels)
    pub fn bytes_per_sample(&self) -> usize {
        self.channels as usize * SAMPLE_WIDTH
    }

    /// Bytes of audio played per second
    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.bytes_per_sample()
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::stereo(DEFAULT_SAMPLE_RATE)
    }
}

/// Audio subsystem errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AudioError {
    /// No output device present
    #[error("no audio output device available")]
    NoDevice,

    /// Device or buffer format cannot be used
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Building or starting the output stream failed
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Reading the hardware play position failed
    #[error("failed to query play position: {0}")]
    Query(String),
}
