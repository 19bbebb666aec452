//! Handmade Core - platform host for a handmade-style game layer
//!
//! This crate provides the platform side of the program: the lock-free audio
//! ring buffer shared with the audio thread, the per-frame sound producer that
//! keeps it filled, and the fixed timestep loop that drives the game layer.
//!
//! # Architecture
//!
//! - [`AudioRingBuffer`] - Byte ring with atomic play/write positions
//! - [`SoundOutputFeeder`] - Main-thread producer asking the game for sound
//! - [`AudioCallback`] - Audio-thread consumer draining the ring
//! - [`GameLayer`] - Trait implemented by the game, swapped through [`GameSlot`]
//! - [`Runtime`] - Game loop orchestration with fixed timestep updates

pub mod audio;
pub mod backbuffer;
pub mod config;
pub mod debug;
pub mod game;
pub mod input;
#[cfg(test)]
mod integration;
pub mod runtime;
#[cfg(test)]
pub mod test_utils;

// Re-export audio types
#[cfg(feature = "cpal")]
pub use audio::CpalDevice;
pub use audio::{
    AudioCallback, AudioDevice, AudioError, AudioFormat, AudioMarker, AudioRingBuffer,
    AudioSystem, FeedOutcome, SimulatedDevice, SoundOutput, SoundOutputFeeder,
};

// Re-export game layer types
pub use backbuffer::OffscreenBuffer;
pub use game::{
    GAME_API_VERSION, GameError, GameLayer, GameMemory, GameSlot, SoundOutputBuffer,
    ThreadContext,
};
pub use input::{ButtonState, ControllerInput, GameInput, MAX_CONTROLLERS};

pub use config::{Config, ConfigError, RuntimeSettings};
pub use runtime::{FrameReport, Runtime};
