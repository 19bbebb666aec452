//! Integration tests for the handmade core
//!
//! Tests the ring buffer under a real producer/consumer thread pair, the
//! feeder racing a pull callback, and the runtime driving a simulated device.

#[cfg(test)]
mod audio_stress_tests;

#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;

    use crate::audio::{
        AudioDevice, AudioError, AudioFormat, AudioRingBuffer, CallbackStatsSnapshot,
    };

    /// Device reporting the ring's own play position, for tests that drive
    /// the consumer by hand
    pub struct RingDevice {
        pub ring: Arc<AudioRingBuffer>,
    }

    impl AudioDevice for RingDevice {
        fn format(&self) -> AudioFormat {
            AudioFormat::stereo(48_000)
        }

        fn play_position(&self) -> Result<u64, AudioError> {
            Ok(self.ring.play_position())
        }

        fn stats(&self) -> CallbackStatsSnapshot {
            CallbackStatsSnapshot::default()
        }
    }

    /// Frame whose right channel is the bitwise complement of its left
    pub fn tagged_frame(tag: u16) -> [i16; 2] {
        let left = tag as i16;
        [left, !left]
    }
}
