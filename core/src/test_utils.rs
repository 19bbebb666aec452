//! Shared test utilities for integration and unit tests

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::audio::{AudioDevice, AudioError, AudioFormat, CallbackStatsSnapshot};
use crate::backbuffer::OffscreenBuffer;
use crate::game::{GameLayer, GameMemory, SoundOutputBuffer, ThreadContext};
use crate::input::GameInput;

// ============================================================================
// Test Audio Device
// ============================================================================

/// Audio device whose play position is set by the test
pub struct ManualDevice {
    format: AudioFormat,
    position: AtomicU64,
    fail_next: AtomicBool,
}

impl ManualDevice {
    /// Stereo 48 kHz device reporting `position`
    pub fn new(position: u64) -> Self {
        Self::with_format(AudioFormat::stereo(48_000), position)
    }

    pub fn with_format(format: AudioFormat, position: u64) -> Self {
        Self {
            format,
            position: AtomicU64::new(position),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
    }

    /// Make the next position query return an error
    pub fn fail_next_query(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }
}

impl AudioDevice for ManualDevice {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn play_position(&self) -> Result<u64, AudioError> {
        if self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(AudioError::Query("injected failure".into()));
        }
        Ok(self.position.load(Ordering::Relaxed))
    }

    fn stats(&self) -> CallbackStatsSnapshot {
        CallbackStatsSnapshot::default()
    }
}

// ============================================================================
// Test Game Layer
// ============================================================================

/// Value [`CountingGame`] writes into every sample
pub const COUNTING_GAME_SAMPLE: i16 = 0x0101;

/// Game layer that counts calls in permanent storage
///
/// Byte 0 counts updates, byte 1 counts sound requests (both wrapping).
/// Updates also paint the backbuffer with the update count.
#[derive(Debug, Default)]
pub struct CountingGame;

impl GameLayer for CountingGame {
    fn update_and_render(
        &mut self,
        _thread: &ThreadContext,
        memory: &mut GameMemory,
        _input: &GameInput,
        buffer: &mut OffscreenBuffer,
    ) {
        memory.is_initialized = true;
        memory.permanent_storage[0] = memory.permanent_storage[0].wrapping_add(1);
        buffer.clear(memory.permanent_storage[0] as u32);
    }

    fn get_sound_samples(
        &mut self,
        _thread: &ThreadContext,
        memory: &mut GameMemory,
        sound: &mut SoundOutputBuffer<'_>,
    ) -> usize {
        memory.permanent_storage[1] = memory.permanent_storage[1].wrapping_add(1);
        sound.samples.fill(COUNTING_GAME_SAMPLE);
        sound.sample_count
    }
}
