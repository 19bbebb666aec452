//! Demo game layer: scrolling gradient and a sine tone
//!
//! All state lives in permanent storage, so it survives a game reload.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use tracing::warn;

use handmade_core::{
    GameInput, GameLayer, GameMemory, OffscreenBuffer, SoundOutputBuffer, ThreadContext,
};

/// Peak sample amplitude
const TONE_VOLUME: f32 = 3000.0;

/// Lowest and highest tone the controls can reach
const MIN_TONE_HZ: u32 = 64;
const MAX_TONE_HZ: u32 = 2048;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
struct DemoState {
    blue_offset: i32,
    green_offset: i32,
    tone_hz: u32,
    t_sine: f32,
}

impl DemoState {
    const SIZE: usize = std::mem::size_of::<Self>();

    /// `None` when permanent storage is too small to hold the state
    fn load(memory: &GameMemory) -> Option<Self> {
        let bytes = memory.permanent_storage.get(..Self::SIZE)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    fn store(&self, memory: &mut GameMemory) -> bool {
        match memory.permanent_storage.get_mut(..Self::SIZE) {
            Some(bytes) => {
                bytes.copy_from_slice(bytemuck::bytes_of(self));
                true
            }
            None => false,
        }
    }
}

/// Gradient plus sine tone, steered by controller 0
///
/// Left/right scroll the gradient, up/down change the pitch, and the bottom
/// action button nudges the green channel.
#[derive(Debug)]
pub struct SineWaveGame {
    initial_tone_hz: u32,
    reported_small_memory: bool,
}

impl SineWaveGame {
    pub fn new(tone_hz: u32) -> Self {
        Self {
            initial_tone_hz: tone_hz.clamp(MIN_TONE_HZ, MAX_TONE_HZ),
            reported_small_memory: false,
        }
    }

    /// Persistent state, or `None` if game memory cannot hold it
    fn state(&mut self, memory: &mut GameMemory) -> Option<DemoState> {
        if !memory.is_initialized {
            let state = DemoState {
                tone_hz: self.initial_tone_hz,
                ..Default::default()
            };
            if !state.store(memory) {
                if !self.reported_small_memory {
                    warn!(
                        "Permanent storage of {} bytes cannot hold demo state",
                        memory.permanent_storage.len()
                    );
                    self.reported_small_memory = true;
                }
                return None;
            }
            memory.is_initialized = true;
        }
        DemoState::load(memory)
    }
}

impl GameLayer for SineWaveGame {
    fn update_and_render(
        &mut self,
        _thread: &ThreadContext,
        memory: &mut GameMemory,
        input: &GameInput,
        buffer: &mut OffscreenBuffer,
    ) {
        let Some(mut state) = self.state(memory) else {
            buffer.clear(0);
            return;
        };

        let keyboard = &input.controllers[0];
        if keyboard.move_left.ended_down {
            state.blue_offset -= 1;
        }
        if keyboard.move_right.ended_down {
            state.blue_offset += 1;
        }
        if keyboard.move_up.ended_down {
            state.tone_hz = (state.tone_hz + 8).min(MAX_TONE_HZ);
        }
        if keyboard.move_down.ended_down {
            state.tone_hz = state.tone_hz.saturating_sub(8).max(MIN_TONE_HZ);
        }
        if keyboard.action_down.was_pressed() {
            state.green_offset += 1;
        }

        render_weird_gradient(buffer, state.blue_offset, state.green_offset);
        state.store(memory);
    }

    fn get_sound_samples(
        &mut self,
        _thread: &ThreadContext,
        memory: &mut GameMemory,
        sound: &mut SoundOutputBuffer<'_>,
    ) -> usize {
        // Scratch arrives zeroed, so reporting no frames plays silence
        let Some(mut state) = self.state(memory) else {
            return 0;
        };
        let wave_period = sound.samples_per_second as f32 / state.tone_hz as f32;
        let step = TAU / wave_period;

        for frame in sound.samples.chunks_exact_mut(2).take(sound.sample_count) {
            let value = (state.t_sine.sin() * TONE_VOLUME) as i16;
            frame[0] = value;
            frame[1] = value;

            state.t_sine += step;
            if state.t_sine > TAU {
                state.t_sine -= TAU;
            }
        }

        state.store(memory);
        sound.sample_count
    }
}

fn render_weird_gradient(buffer: &mut OffscreenBuffer, blue_offset: i32, green_offset: i32) {
    for (y, row) in buffer.rows_mut().enumerate() {
        for (x, pixel) in row.iter_mut().enumerate() {
            let blue = (x as i32).wrapping_add(blue_offset) as u8;
            let green = (y as i32).wrapping_add(green_offset) as u8;
            *pixel = ((green as u32) << 8) | blue as u32;
        }
    }
}
