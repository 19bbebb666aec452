//! Consumer side: the audio thread's pull callback
//!
//! Runs on the platform audio thread. It must not block, allocate, or call
//! into the game; it only drains the ring buffer into the device's buffer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::AudioRingBuffer;

/// Samples converted per pass for non-i16 device formats
const SCRATCH_SAMPLES: usize = 4096;

/// Lock-free counters written by the audio thread
#[derive(Debug, Default)]
pub struct CallbackStats {
    callbacks: AtomicU64,
    bytes: AtomicU64,
    starved_callbacks: AtomicU64,
    starved_bytes: AtomicU64,
}

/// Point-in-time copy of [`CallbackStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackStatsSnapshot {
    /// Ring drains (one per i16 callback, one per pass for converted formats)
    pub callbacks: u64,
    /// Bytes handed to the device
    pub bytes: u64,
    /// Callbacks that ran past the published data
    pub starved_callbacks: u64,
    /// Bytes handed out that were never published
    pub starved_bytes: u64,
}

impl CallbackStats {
    fn record(&self, bytes: usize, starved: usize) {
        // Ordering: Relaxed (statistics only)
        self.callbacks.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        if starved > 0 {
            self.starved_callbacks.fetch_add(1, Ordering::Relaxed);
            self.starved_bytes.fetch_add(starved as u64, Ordering::Relaxed);
        }
    }

    /// Read all counters
    pub fn snapshot(&self) -> CallbackStatsSnapshot {
        CallbackStatsSnapshot {
            callbacks: self.callbacks.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            starved_callbacks: self.starved_callbacks.load(Ordering::Relaxed),
            starved_bytes: self.starved_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Pull-model data source registered with the audio device
///
/// Owns a handle to the shared ring and a pre-allocated conversion buffer so
/// that no call allocates.
pub struct AudioCallback {
    ring: Arc<AudioRingBuffer>,
    stats: Arc<CallbackStats>,
    scratch: Box<[i16]>,
}

impl AudioCallback {
    pub fn new(ring: Arc<AudioRingBuffer>) -> Self {
        // Each conversion pass must stay within one ring revolution
        let scratch_len = SCRATCH_SAMPLES.min(ring.capacity() / 2).max(1);
        Self {
            ring,
            stats: Arc::new(CallbackStats::default()),
            scratch: vec![0; scratch_len].into_boxed_slice(),
        }
    }

    /// Shared handle to this callback's counters
    pub fn stats(&self) -> Arc<CallbackStats> {
        Arc::clone(&self.stats)
    }

    /// Copy `dest.len()` bytes from the play cursor into `dest`
    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        drain(&self.ring, &self.stats, dest);
    }

    /// Device format: interleaved signed 16-bit
    pub fn fill_i16(&mut self, dest: &mut [i16]) {
        drain(&self.ring, &self.stats, bytemuck::cast_slice_mut(dest));
    }

    /// Device format: interleaved 32-bit float
    pub fn fill_f32(&mut self, dest: &mut [f32]) {
        for chunk in dest.chunks_mut(self.scratch.len()) {
            let scratch = &mut self.scratch[..chunk.len()];
            drain(&self.ring, &self.stats, bytemuck::cast_slice_mut(scratch));
            for (out, &sample) in chunk.iter_mut().zip(scratch.iter()) {
                *out = sample as f32 / 32768.0;
            }
        }
    }

    /// Device format: interleaved unsigned 16-bit (0x8000 is silence)
    pub fn fill_u16(&mut self, dest: &mut [u16]) {
        for chunk in dest.chunks_mut(self.scratch.len()) {
            let scratch = &mut self.scratch[..chunk.len()];
            drain(&self.ring, &self.stats, bytemuck::cast_slice_mut(scratch));
            for (out, &sample) in chunk.iter_mut().zip(scratch.iter()) {
                *out = (sample as i32 + 32768) as u16;
            }
        }
    }
}

fn drain(ring: &AudioRingBuffer, stats: &CallbackStats, dest: &mut [u8]) {
    let starved = ring.read(dest);
    stats.record(dest.len(), starved);
}
