//! Producer side: keeps the ring buffer filled ahead of playback
//!
//! Called once per main-loop iteration. Reads the hardware play position,
//! asks the game layer for exactly enough sound to stay `safety_bytes` ahead,
//! and writes it at the logical write position.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use super::metrics::FeederMetrics;
use super::sound_output::{WritePlan, plan_write};
use super::{AudioDevice, AudioRingBuffer, SAMPLE_WIDTH, SoundOutput};
use crate::game::SoundOutputBuffer;

/// Number of recent cursor snapshots kept for the sync display
pub const MAX_MARKERS: usize = 30;

/// Cursor snapshot taken at one feed cycle (ring offsets)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioMarker {
    /// Hardware play cursor when the cycle started
    pub play_offset: usize,
    /// Where the producer started writing
    pub write_offset: usize,
    /// Where the producer aimed to end
    pub target_offset: usize,
}

/// Result of one feed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// New audio was written
    Wrote {
        /// Bytes written into the ring
        bytes: usize,
        /// Sample frames the game reported filling
        frames_filled: usize,
    },
    /// Producer is already far enough ahead
    Idle,
    /// Playback lapped the producer; logical write position jumped forward
    Resynced {
        /// New absolute write position
        position: u64,
    },
    /// The device could not be queried; nothing happened this cycle
    Skipped,
}

/// Per-frame producer for the audio ring buffer
pub struct SoundOutputFeeder {
    output: SoundOutput,
    /// Pre-allocated synthesis buffer (one ring's worth of samples)
    scratch: Vec<i16>,
    metrics: FeederMetrics,
    markers: VecDeque<AudioMarker>,
}

impl SoundOutputFeeder {
    pub fn new(output: SoundOutput) -> Self {
        let scratch = vec![0; output.capacity_bytes / SAMPLE_WIDTH];
        Self {
            output,
            scratch,
            metrics: FeederMetrics::new(),
            markers: VecDeque::with_capacity(MAX_MARKERS),
        }
    }

    /// Producer-side stream state
    pub fn output(&self) -> &SoundOutput {
        &self.output
    }

    /// Mutable stream state (used to seed positions)
    pub fn output_mut(&mut self) -> &mut SoundOutput {
        &mut self.output
    }

    /// Running statistics
    pub fn metrics(&self) -> &FeederMetrics {
        &self.metrics
    }

    /// Recent cursor snapshots, oldest first
    pub fn markers(&self) -> &VecDeque<AudioMarker> {
        &self.markers
    }

    /// Queue `safety_bytes` of silence ahead of a stream that has not started
    ///
    /// Must run before the device opens on `ring`. The device's first pulls
    /// then consume silence instead of lapping the producer.
    pub fn prime(&mut self, ring: &AudioRingBuffer) {
        let start = self.output.logical_write_position();
        let silence = &mut self.scratch[..self.output.safety_bytes / SAMPLE_WIDTH];
        silence.fill(0);
        ring.write(ring.offset(start), bytemuck::cast_slice(&*silence));

        self.output.advance(self.output.safety_bytes / self.output.bytes_per_sample);
        ring.commit_write(self.output.logical_write_position());
    }

    /// Run one producer cycle
    ///
    /// `get_sound_samples` receives a zeroed buffer sized to the frames needed
    /// and returns how many frames it filled. Frames it leaves untouched play
    /// as silence.
    pub fn feed<F>(
        &mut self,
        device: &dyn AudioDevice,
        ring: &AudioRingBuffer,
        mut get_sound_samples: F,
    ) -> FeedOutcome
    where
        F: FnMut(&mut SoundOutputBuffer<'_>) -> usize,
    {
        self.metrics.cycles += 1;
        self.metrics.maybe_log(self.output.format().bytes_per_second());

        let hardware = match device.play_position() {
            Ok(position) => position,
            Err(e) => {
                warn!("Skipping sound output this frame: {}", e);
                self.metrics.skipped_cycles += 1;
                return FeedOutcome::Skipped;
            }
        };

        let logical = self.output.logical_write_position();
        let plan = plan_write(
            hardware,
            logical,
            self.output.safety_bytes,
            self.output.capacity_bytes,
            self.output.bytes_per_sample,
        );
        self.record_marker(hardware, &plan);

        if let Some(position) = plan.resync_to {
            warn!(
                "Audio underrun: playback at {} passed write position {}, resyncing to {}",
                hardware, logical, position
            );
            // The skipped span is published by the next commit; silence it so
            // audio from the previous revolution is never replayed
            let gap = &mut self.scratch[..self.output.safety_bytes / SAMPLE_WIDTH];
            gap.fill(0);
            ring.write(ring.offset(hardware), bytemuck::cast_slice(&*gap));

            self.output.resync(position);
            self.metrics.resyncs += 1;
            return FeedOutcome::Resynced { position };
        }

        if plan.bytes_to_write == 0 {
            return FeedOutcome::Idle;
        }

        debug_assert!(
            plan.bytes_to_write <= ring.capacity(),
            "feed of {} bytes exceeds ring capacity {}",
            plan.bytes_to_write,
            ring.capacity()
        );

        let frames = plan.bytes_to_write / self.output.bytes_per_sample;
        let sample_count = frames * self.output.channels as usize;
        let samples = &mut self.scratch[..sample_count];
        samples.fill(0);

        let mut buffer = SoundOutputBuffer {
            samples,
            sample_count: frames,
            samples_per_second: self.output.samples_per_second,
        };
        let frames_filled = get_sound_samples(&mut buffer).min(frames);
        if frames_filled < frames {
            self.metrics.partial_fills += 1;
            debug!(
                "Game filled {} of {} sound frames, padding with silence",
                frames_filled, frames
            );
        }

        ring.write(plan.offset, bytemuck::cast_slice(&self.scratch[..sample_count]));
        self.output.advance(frames);
        let end = self.output.logical_write_position();
        ring.commit_write(end);

        self.metrics.bytes_written += plan.bytes_to_write as u64;
        self.metrics.record_latency(end.saturating_sub(hardware) as usize);

        trace!(
            "Fed {} bytes at offset {} (play={}, target={})",
            plan.bytes_to_write,
            plan.offset,
            hardware,
            plan.target
        );

        FeedOutcome::Wrote {
            bytes: plan.bytes_to_write,
            frames_filled,
        }
    }

    fn record_marker(&mut self, hardware: u64, plan: &WritePlan) {
        let capacity = self.output.capacity_bytes as u64;
        if self.markers.len() == MAX_MARKERS {
            self.markers.pop_front();
        }
        self.markers.push_back(AudioMarker {
            play_offset: (hardware % capacity) as usize,
            write_offset: plan.offset,
            target_offset: (plan.target % capacity) as usize,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;
    use crate::test_utils::ManualDevice;

    fn feeder(capacity: usize, safety: usize) -> SoundOutputFeeder {
        let output =
            SoundOutput::with_safety_bytes(AudioFormat::stereo(48_000), capacity, safety).unwrap();
        SoundOutputFeeder::new(output)
    }

    fn fill_with(value: i16) -> impl FnMut(&mut SoundOutputBuffer<'_>) -> usize {
        move |buffer| {
            buffer.samples.fill(value);
            buffer.sample_count
        }
    }

    #[test]
    fn test_feed_writes_up_to_target() {
        let ring = AudioRingBuffer::new(8192).unwrap();
        let device = ManualDevice::new(4000);
        let mut feeder = feeder(8192, 2000);
        feeder.output_mut().resync(5500);
        ring.reset(5500);

        let outcome = feeder.feed(&device, &ring, fill_with(0x1234));

        assert_eq!(
            outcome,
            FeedOutcome::Wrote {
                bytes: 500,
                frames_filled: 125
            }
        );
        assert_eq!(feeder.output().logical_write_position(), 6000);
        assert_eq!(ring.write_position(), 6000);

        let mut out = vec![0i16; 250];
        ring.read(bytemuck::cast_slice_mut(&mut out));
        assert!(out.iter().all(|&s| s == 0x1234));
    }

    #[test]
    fn test_underrun_resyncs_without_writing() {
        let ring = AudioRingBuffer::new(8192).unwrap();
        let device = ManualDevice::new(5800);
        let mut feeder = feeder(8192, 2000);
        feeder.output_mut().resync(5500);

        let mut called = false;
        let outcome = feeder.feed(&device, &ring, |_| {
            called = true;
            0
        });

        assert_eq!(outcome, FeedOutcome::Resynced { position: 7800 });
        assert!(!called);
        assert_eq!(feeder.output().logical_write_position(), 7800);
        assert_eq!(ring.write_position(), 0);
        assert_eq!(feeder.metrics().resyncs, 1);
    }

    #[test]
    fn test_resync_silences_skipped_span() {
        let ring = AudioRingBuffer::new(8192).unwrap();
        ring.write(0, &[0x55; 8192]);
        let device = ManualDevice::new(5800);
        let mut feeder = feeder(8192, 2000);
        feeder.output_mut().resync(5500);
        ring.reset(5800);

        feeder.feed(&device, &ring, fill_with(1));
        device.set_position(6000);
        let outcome = feeder.feed(&device, &ring, fill_with(3));
        assert_eq!(
            outcome,
            FeedOutcome::Wrote {
                bytes: 200,
                frames_filled: 50
            }
        );

        // [5800, 7800) was skipped and reads back as silence, then the new data
        let mut out = vec![0u8; 2200];
        assert_eq!(ring.read(&mut out), 0);
        assert!(out[..2000].iter().all(|&b| b == 0));
        assert!(
            out[2000..]
                .chunks_exact(2)
                .all(|c| i16::from_ne_bytes([c[0], c[1]]) == 3)
        );
    }

    #[test]
    fn test_query_failure_skips_cycle() {
        let ring = AudioRingBuffer::new(8192).unwrap();
        let device = ManualDevice::new(0);
        device.fail_next_query();
        let mut feeder = feeder(8192, 2000);

        let mut called = false;
        let outcome = feeder.feed(&device, &ring, |_| {
            called = true;
            0
        });

        assert_eq!(outcome, FeedOutcome::Skipped);
        assert!(!called);
        assert_eq!(feeder.metrics().skipped_cycles, 1);

        // Recovers on the next cycle
        let outcome = feeder.feed(&device, &ring, fill_with(1));
        assert!(matches!(outcome, FeedOutcome::Wrote { bytes: 2000, .. }));
    }

    #[test]
    fn test_partial_fill_is_padded_with_silence() {
        let ring = AudioRingBuffer::new(8192).unwrap();
        let device = ManualDevice::new(0);
        let mut feeder = feeder(8192, 400);

        let outcome = feeder.feed(&device, &ring, |buffer| {
            let half = buffer.sample_count / 2;
            buffer.samples[..half * 2].fill(-7);
            half
        });

        assert_eq!(
            outcome,
            FeedOutcome::Wrote {
                bytes: 400,
                frames_filled: 50
            }
        );
        assert_eq!(feeder.metrics().partial_fills, 1);

        let mut out = vec![0i16; 200];
        ring.read(bytemuck::cast_slice_mut(&mut out));
        assert!(out[..100].iter().all(|&s| s == -7));
        assert!(out[100..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_producer_ahead_is_idle() {
        let ring = AudioRingBuffer::new(8192).unwrap();
        let device = ManualDevice::new(0);
        let mut feeder = feeder(8192, 2000);

        feeder.feed(&device, &ring, fill_with(1));
        let outcome = feeder.feed(&device, &ring, fill_with(1));

        assert_eq!(outcome, FeedOutcome::Idle);
        assert_eq!(feeder.metrics().bytes_written, 2000);
    }

    #[test]
    fn test_markers_are_capped() {
        let ring = AudioRingBuffer::new(8192).unwrap();
        let device = ManualDevice::new(0);
        let mut feeder = feeder(8192, 2000);

        for step in 0..(MAX_MARKERS as u64 + 5) {
            device.set_position(step * 100);
            feeder.feed(&device, &ring, fill_with(0));
        }

        assert_eq!(feeder.markers().len(), MAX_MARKERS);
        let last = feeder.markers().back().unwrap();
        assert_eq!(last.play_offset, (MAX_MARKERS + 4) * 100);
    }
}
