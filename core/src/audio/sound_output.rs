//! Producer-side sound output state and write planning

use super::{AudioError, AudioFormat};

/// Producer-side bookkeeping for the sound stream
///
/// Owned by the feeder on the main thread; never shared with the callback.
#[derive(Debug, Clone)]
pub struct SoundOutput {
    /// Sample frames per second
    pub samples_per_second: u32,
    /// Interleaved channels
    pub channels: u16,
    /// Bytes in one sample frame (channels × sample width)
    pub bytes_per_sample: usize,
    /// Sample frames produced since the stream started
    pub running_sample_index: u64,
    /// How far ahead of the hardware play position the producer stays
    pub safety_bytes: usize,
    /// Size of the ring buffer being fed
    pub capacity_bytes: usize,
}

impl SoundOutput {
    /// Derive the safety margin from the game tick rate
    ///
    /// `latency_frames` is the margin expressed in game frames: at 48 kHz and
    /// 30 Hz a value of 2.0 keeps 3200 sample frames queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate, tick rate or margin is zero, or if the
    /// margin is not finite or does not fit inside the ring buffer.
    pub fn new(
        format: AudioFormat,
        capacity_bytes: usize,
        tick_rate: u32,
        latency_frames: f32,
    ) -> Result<Self, AudioError> {
        if tick_rate == 0 {
            return Err(AudioError::UnsupportedFormat(
                "tick rate must be greater than 0".into(),
            ));
        }
        let samples_per_frame = format.sample_rate as f64 / tick_rate as f64;
        let safety_samples = (samples_per_frame * latency_frames.max(0.0) as f64).round();
        let fits = safety_samples.is_finite() && safety_samples <= capacity_bytes as f64;
        let safety_bytes = fits
            .then(|| (safety_samples as usize).checked_mul(format.bytes_per_sample()))
            .flatten();
        let Some(safety_bytes) = safety_bytes else {
            return Err(AudioError::UnsupportedFormat(format!(
                "safety margin of {latency_frames} frames does not fit a {capacity_bytes} byte ring"
            )));
        };
        Self::with_safety_bytes(format, capacity_bytes, safety_bytes)
    }

    /// Use an explicit safety margin (aligned down to whole sample frames)
    ///
    /// # Errors
    ///
    /// Same validation as [`SoundOutput::new`].
    pub fn with_safety_bytes(
        format: AudioFormat,
        capacity_bytes: usize,
        safety_bytes: usize,
    ) -> Result<Self, AudioError> {
        if format.sample_rate == 0 || format.channels == 0 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{} Hz with {} channels",
                format.sample_rate, format.channels
            )));
        }

        let bytes_per_sample = format.bytes_per_sample();
        let safety_bytes = safety_bytes - safety_bytes % bytes_per_sample;
        if safety_bytes == 0 {
            return Err(AudioError::UnsupportedFormat(
                "safety margin must cover at least one sample frame".into(),
            ));
        }
        if safety_bytes >= capacity_bytes {
            return Err(AudioError::UnsupportedFormat(format!(
                "safety margin of {safety_bytes} bytes does not fit a {capacity_bytes} byte ring"
            )));
        }

        Ok(Self {
            samples_per_second: format.sample_rate,
            channels: format.channels,
            bytes_per_sample,
            running_sample_index: 0,
            safety_bytes,
            capacity_bytes,
        })
    }

    /// Output format this stream was created for
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.samples_per_second,
            channels: self.channels,
        }
    }

    /// Absolute byte position the producer writes next
    pub fn logical_write_position(&self) -> u64 {
        self.running_sample_index * self.bytes_per_sample as u64
    }

    /// Ring offset the producer writes next
    pub fn write_offset(&self) -> usize {
        (self.logical_write_position() % self.capacity_bytes as u64) as usize
    }

    /// Jump the logical write position to `position` (aligned down to a frame)
    pub fn resync(&mut self, position: u64) {
        self.running_sample_index = position / self.bytes_per_sample as u64;
    }

    /// Account for `frames` sample frames written
    pub fn advance(&mut self, frames: usize) {
        self.running_sample_index += frames as u64;
    }
}

/// What the feeder should do this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePlan {
    /// Ring offset the write starts at
    pub offset: usize,
    /// Bytes to synthesize and write (whole sample frames)
    pub bytes_to_write: usize,
    /// Absolute position playback should be covered up to
    pub target: u64,
    /// Set when playback lapped the producer: new logical write position
    pub resync_to: Option<u64>,
}

/// Plan one producer cycle
///
/// Target is `hardware_play_position + safety_bytes`. If the hardware already
/// played past the logical write position, the producer resynchronizes to the
/// target and writes nothing instead of trying to catch up.
pub fn plan_write(
    hardware_play_position: u64,
    logical_write_position: u64,
    safety_bytes: usize,
    capacity_bytes: usize,
    bytes_per_sample: usize,
) -> WritePlan {
    let frame = bytes_per_sample as u64;
    let target = hardware_play_position + safety_bytes as u64;
    let target = target - target % frame;
    let capacity = capacity_bytes as u64;

    if hardware_play_position > logical_write_position {
        return WritePlan {
            offset: (target % capacity) as usize,
            bytes_to_write: 0,
            target,
            resync_to: Some(target),
        };
    }

    let bytes_to_write = target.saturating_sub(logical_write_position);
    let bytes_to_write = bytes_to_write - bytes_to_write % frame;

    WritePlan {
        offset: (logical_write_position % capacity) as usize,
        bytes_to_write: bytes_to_write as usize,
        target,
        resync_to: None,
    }
}
