//! Platform audio devices and the audio system that owns them
//!
//! A device pulls from the ring buffer through an [`AudioCallback`] on its own
//! thread and reports how far playback has progressed. [`AudioSystem`] ties a
//! device to the ring and the feeder and owns the teardown order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use super::{
    AudioCallback, AudioError, AudioFormat, AudioRingBuffer, CallbackStats,
    CallbackStatsSnapshot, FeedOutcome, SoundOutput, SoundOutputFeeder,
};
use crate::game::SoundOutputBuffer;

/// Trait for platform audio outputs
///
/// Not `Send`: hardware streams are tied to the thread that opened them.
pub trait AudioDevice {
    /// Format the device was opened with
    fn format(&self) -> AudioFormat;

    /// Absolute number of bytes the device has pulled from the ring
    fn play_position(&self) -> Result<u64, AudioError>;

    /// Counters recorded by the device's callback
    fn stats(&self) -> CallbackStatsSnapshot;
}

/// Ring buffer, feeder and device for one output stream
///
/// Dropping the system stops the device before the ring is released, so no
/// callback can run against a buffer that is going away.
pub struct AudioSystem {
    device: Option<Box<dyn AudioDevice>>,
    ring: Arc<AudioRingBuffer>,
    feeder: SoundOutputFeeder,
}

impl AudioSystem {
    /// Allocate the ring for `output`, prime it and open a device on it
    ///
    /// The ring starts with `safety_bytes` of silence queued, so a device that
    /// pulls as soon as it opens does not force a resync on the first feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the ring cannot be allocated, the device fails to
    /// open, or the device's format differs from `output`.
    pub fn new<F>(output: SoundOutput, open_device: F) -> Result<Self, AudioError>
    where
        F: FnOnce(Arc<AudioRingBuffer>) -> Result<Box<dyn AudioDevice>, AudioError>,
    {
        let ring = Arc::new(AudioRingBuffer::new(output.capacity_bytes)?);
        let mut feeder = SoundOutputFeeder::new(output);
        feeder.prime(&ring);
        let output = feeder.output();
        let device = open_device(Arc::clone(&ring))?;

        let format = device.format();
        if format.sample_rate != output.samples_per_second || format.channels != output.channels {
            return Err(AudioError::UnsupportedFormat(format!(
                "device opened at {} Hz/{} ch, expected {} Hz/{} ch",
                format.sample_rate, format.channels, output.samples_per_second, output.channels
            )));
        }

        debug!(
            "Audio system ready: {} byte ring, {} safety bytes",
            output.capacity_bytes, output.safety_bytes
        );

        Ok(Self {
            device: Some(device),
            ring,
            feeder,
        })
    }

    /// Run one producer cycle against the device
    pub fn feed<F>(&mut self, get_sound_samples: F) -> FeedOutcome
    where
        F: FnMut(&mut SoundOutputBuffer<'_>) -> usize,
    {
        match &self.device {
            Some(device) => self
                .feeder
                .feed(device.as_ref(), &self.ring, get_sound_samples),
            None => FeedOutcome::Skipped,
        }
    }

    /// Shared ring buffer
    pub fn ring(&self) -> &Arc<AudioRingBuffer> {
        &self.ring
    }

    /// Producer state and metrics
    pub fn feeder(&self) -> &SoundOutputFeeder {
        &self.feeder
    }

    /// Callback counters (zero once the device is closed)
    pub fn callback_stats(&self) -> CallbackStatsSnapshot {
        self.device
            .as_ref()
            .map(|device| device.stats())
            .unwrap_or_default()
    }

    /// Stop the device; later feed cycles are skipped
    pub fn close(&mut self) {
        if let Some(device) = self.device.take() {
            drop(device);
            debug!("Audio device closed");
        }
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        // Device first: guarantees no further callback invocations
        self.close();
    }
}

/// Software stand-in for an audio device
///
/// A named thread invokes the callback every `period_frames` sample frames of
/// wall-clock time, the same cadence a pull-model device would.
pub struct SimulatedDevice {
    format: AudioFormat,
    ring: Arc<AudioRingBuffer>,
    stats: Arc<CallbackStats>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedDevice {
    /// Start pulling from `ring`
    ///
    /// # Errors
    ///
    /// Returns an error if the period is empty or larger than the ring, or if
    /// the thread cannot be spawned.
    pub fn start(
        format: AudioFormat,
        ring: Arc<AudioRingBuffer>,
        period_frames: usize,
    ) -> Result<Self, AudioError> {
        let period_bytes = period_frames.checked_mul(format.bytes_per_sample());
        let fits = period_bytes.is_some_and(|bytes| bytes <= ring.capacity());
        if period_frames == 0 || !fits || format.sample_rate == 0 {
            return Err(AudioError::UnsupportedFormat(format!(
                "period of {period_frames} frames does not fit a {} byte ring",
                ring.capacity()
            )));
        }

        let mut callback = AudioCallback::new(Arc::clone(&ring));
        let stats = callback.stats();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let period = Duration::from_secs_f64(period_frames as f64 / format.sample_rate as f64);
        let channels = format.channels as usize;

        let handle = thread::Builder::new()
            .name("audio-sim".into())
            .spawn(move || {
                let mut buffer = vec![0i16; period_frames * channels];
                let mut next = Instant::now();
                while thread_running.load(Ordering::Acquire) {
                    callback.fill_i16(&mut buffer);

                    next += period;
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    } else {
                        next = now;
                    }
                }
            })
            .map_err(|e| AudioError::Stream(format!("failed to spawn audio thread: {e}")))?;

        debug!(
            "Simulated audio device started at {}Hz, {} frame period",
            format.sample_rate, period_frames
        );

        Ok(Self {
            format,
            ring,
            stats,
            running,
            handle: Some(handle),
        })
    }
}

impl AudioDevice for SimulatedDevice {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn play_position(&self) -> Result<u64, AudioError> {
        let alive = self
            .handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false);
        if !alive {
            return Err(AudioError::Query("simulated audio thread stopped".into()));
        }
        Ok(self.ring.play_position())
    }

    fn stats(&self) -> CallbackStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        debug!("Simulated audio device stopped");
    }
}
