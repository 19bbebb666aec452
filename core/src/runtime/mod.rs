//! Game loop orchestration
//!
//! Manages the main loop with fixed timestep updates, one sound output cycle
//! per rendered frame, and the host-owned state the game layer works on.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::audio::{AudioSystem, FeedOutcome};
use crate::backbuffer::OffscreenBuffer;
use crate::config::{Config, RuntimeSettings};
use crate::debug::draw_sync_display;
use crate::game::{GameError, GameLayer, GameMemory, GameSlot, ThreadContext};
use crate::input::GameInput;

mod game_loop;


pub use game_loop::{FrameClock, execute_frame, execute_frame_at};

/// What happened during one call to [`Runtime::frame`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Game ticks executed
    pub ticks: u32,
    /// Interpolation factor between the last two ticks
    pub alpha: f32,
    /// Sound output cycle result, `None` without an audio system
    pub feed: Option<FeedOutcome>,
}

/// Main runtime driving the game layer
///
/// Owns everything the game layer is lent each call, so reloading the game
/// keeps memory, backbuffer and audio intact.
pub struct Runtime {
    settings: RuntimeSettings,
    game: GameSlot,
    memory: GameMemory,
    input: GameInput,
    backbuffer: OffscreenBuffer,
    audio: Option<AudioSystem>,
    thread: ThreadContext,
    clock: FrameClock,
    sync_display: bool,
}

impl Runtime {
    /// Create a runtime without audio
    pub fn new(
        settings: RuntimeSettings,
        game: GameSlot,
        memory: GameMemory,
        backbuffer: OffscreenBuffer,
    ) -> Self {
        Self {
            settings,
            game,
            memory,
            input: GameInput::default(),
            backbuffer,
            audio: None,
            thread: ThreadContext::default(),
            clock: FrameClock::default(),
            sync_display: false,
        }
    }

    /// Create a runtime sized from `config` running `game`
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or `game` is built against
    /// another interface version.
    pub fn from_config(config: &Config, game: Box<dyn GameLayer>) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let slot = GameSlot::new(game).context("Failed to load game layer")?;
        let memory = GameMemory::new(
            config.memory.permanent_bytes(),
            config.memory.transient_bytes(),
        );
        let backbuffer = OffscreenBuffer::new(config.video.width, config.video.height);
        Ok(Self::new(config.runtime.clone(), slot, memory, backbuffer))
    }

    /// Set the tick rate
    pub fn set_tick_rate(&mut self, tick_rate: u32) {
        self.settings.tick_rate = tick_rate;
    }

    /// Get the current tick rate
    pub fn tick_rate(&self) -> u32 {
        self.settings.tick_rate
    }

    /// Get the tick duration (time per tick, inverse of tick rate)
    pub fn tick_duration(&self) -> Duration {
        self.settings.tick_duration()
    }

    /// Attach the audio system fed once per frame
    pub fn set_audio(&mut self, audio: AudioSystem) {
        self.audio = Some(audio);
    }

    /// Detach and return the audio system
    pub fn take_audio(&mut self) -> Option<AudioSystem> {
        self.audio.take()
    }

    /// Get a reference to the audio system
    pub fn audio(&self) -> Option<&AudioSystem> {
        self.audio.as_ref()
    }

    /// Draw feeder cursor markers over each rendered frame
    pub fn set_sync_display(&mut self, enabled: bool) {
        self.sync_display = enabled;
    }

    /// Swap the game layer, keeping all host-owned state
    ///
    /// # Errors
    ///
    /// Returns an error if `game` is built against another interface version;
    /// the current game keeps running.
    pub fn reload_game(&mut self, game: Box<dyn GameLayer>) -> Result<(), GameError> {
        self.game.reload(game).map(drop)
    }

    /// Number of successful game reloads
    pub fn game_generation(&self) -> u32 {
        self.game.generation()
    }

    /// Input for the next frame
    ///
    /// Record button changes here before calling [`Runtime::frame`].
    pub fn input_mut(&mut self) -> &mut GameInput {
        &mut self.input
    }

    /// Backbuffer as rendered by the last tick
    pub fn backbuffer(&self) -> &OffscreenBuffer {
        &self.backbuffer
    }

    /// Game memory
    pub fn memory(&self) -> &GameMemory {
        &self.memory
    }

    /// Run a single frame (may include multiple ticks)
    pub fn frame(&mut self) -> FrameReport {
        self.frame_with_time_scale(1.0)
    }

    /// Run a frame with a time scale modifier.
    ///
    /// Time scale affects how fast game time passes:
    /// - 1.0 = normal speed
    /// - 0.5 = half speed (slow motion)
    /// - 2.0 = double speed (fast forward)
    pub fn frame_with_time_scale(&mut self, time_scale: f32) -> FrameReport {
        let tick_duration = self.tick_duration();
        let Self {
            settings,
            game,
            memory,
            input,
            backbuffer,
            thread,
            clock,
            ..
        } = self;

        input.dt_for_frame = tick_duration.as_secs_f32();
        let (ticks, alpha) =
            game_loop::execute_frame(settings, tick_duration, clock, time_scale, || {
                game.game_mut()
                    .update_and_render(thread, memory, input, backbuffer);
                // Transitions are reported to the first tick only
                input.begin_frame();
            });

        let feed = self.feed_audio();
        FrameReport { ticks, alpha, feed }
    }

    /// Run one sound output cycle against the attached audio system
    fn feed_audio(&mut self) -> Option<FeedOutcome> {
        let Self {
            game,
            memory,
            thread,
            audio,
            backbuffer,
            sync_display,
            ..
        } = self;
        let audio = audio.as_mut()?;

        let outcome = audio.feed(|sound| {
            game.game_mut().get_sound_samples(thread, memory, sound)
        });

        if *sync_display {
            let feeder = audio.feeder();
            draw_sync_display(
                backbuffer,
                feeder.markers(),
                feeder.output().capacity_bytes,
            );
        }

        Some(outcome)
    }
}
