//! Game layer trait and the state the host hands to it
//!
//! The game layer is the swappable part of the program. The host owns every
//! piece of long-lived state (memory, backbuffer, audio) and lends it to the
//! game for the duration of each call, so swapping implementations never
//! invalidates that state.

use tracing::{info, warn};

use crate::backbuffer::OffscreenBuffer;
use crate::input::GameInput;

/// Interface version the host expects from game layers
pub const GAME_API_VERSION: u32 = 1;

/// Per-call context identifying the calling thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadContext {
    /// Host-assigned index of the calling thread (0 = main loop)
    pub index: usize,
}

/// Memory block owned by the host and lent to the game each call
///
/// Game state that must survive a reload lives here rather than in the
/// game layer object.
#[derive(Debug, Clone)]
pub struct GameMemory {
    /// Set by the game once it has laid out its permanent storage
    pub is_initialized: bool,
    /// State that persists across frames and reloads
    pub permanent_storage: Vec<u8>,
    /// Scratch space the game may reuse freely
    pub transient_storage: Vec<u8>,
}

impl GameMemory {
    /// Allocate zeroed storage blocks
    pub fn new(permanent_size: usize, transient_size: usize) -> Self {
        Self {
            is_initialized: false,
            permanent_storage: vec![0; permanent_size],
            transient_storage: vec![0; transient_size],
        }
    }
}

/// Sound request passed to [`GameLayer::get_sound_samples`]
#[derive(Debug)]
pub struct SoundOutputBuffer<'a> {
    /// Interleaved stereo samples, `sample_count * 2` long, pre-zeroed
    pub samples: &'a mut [i16],
    /// Sample frames requested
    pub sample_count: usize,
    /// Output rate the samples will be played at
    pub samples_per_second: u32,
}

/// Trait implemented by the game
///
/// Both operations are called from the main loop thread only.
pub trait GameLayer: Send {
    /// Interface version this implementation was built against
    fn api_version(&self) -> u32 {
        GAME_API_VERSION
    }

    /// Advance the simulation one tick and draw into `buffer`
    fn update_and_render(
        &mut self,
        thread: &ThreadContext,
        memory: &mut GameMemory,
        input: &GameInput,
        buffer: &mut OffscreenBuffer,
    );

    /// Fill `sound.samples` with `sound.sample_count` frames
    ///
    /// Returns the number of frames actually produced. Frames not produced
    /// play as silence.
    fn get_sound_samples(
        &mut self,
        thread: &ThreadContext,
        memory: &mut GameMemory,
        sound: &mut SoundOutputBuffer<'_>,
    ) -> usize;
}

/// Game layer that draws nothing and stays silent
///
/// Stands in while no game is loaded.
#[derive(Debug, Default)]
pub struct NullGame;

impl GameLayer for NullGame {
    fn update_and_render(
        &mut self,
        _thread: &ThreadContext,
        _memory: &mut GameMemory,
        _input: &GameInput,
        _buffer: &mut OffscreenBuffer,
    ) {
    }

    fn get_sound_samples(
        &mut self,
        _thread: &ThreadContext,
        _memory: &mut GameMemory,
        sound: &mut SoundOutputBuffer<'_>,
    ) -> usize {
        // Buffer arrives zeroed
        sound.sample_count
    }
}

/// Errors from loading a game layer
#[derive(Debug, Clone, thiserror::Error)]
pub enum GameError {
    /// Implementation was built against another interface version
    #[error("game layer API version {found} does not match host version {expected}")]
    VersionMismatch {
        /// Host interface version
        expected: u32,
        /// Version reported by the game layer
        found: u32,
    },
}

/// Holder for the current game layer implementation
///
/// Reloading swaps the implementation; everything the host lends to the game
/// is untouched.
pub struct GameSlot {
    game: Box<dyn GameLayer>,
    generation: u32,
}

impl GameSlot {
    /// Slot holding `game` as generation 0
    ///
    /// # Errors
    ///
    /// Returns an error if `game` reports another interface version.
    pub fn new(game: Box<dyn GameLayer>) -> Result<Self, GameError> {
        check_version(game.as_ref())?;
        Ok(Self { game, generation: 0 })
    }

    /// Slot holding [`NullGame`]
    pub fn empty() -> Self {
        Self {
            game: Box::new(NullGame),
            generation: 0,
        }
    }

    /// Swap in a new implementation, returning the previous one
    ///
    /// # Errors
    ///
    /// Returns an error and keeps the current implementation if `game`
    /// reports another interface version.
    pub fn reload(&mut self, game: Box<dyn GameLayer>) -> Result<Box<dyn GameLayer>, GameError> {
        if let Err(e) = check_version(game.as_ref()) {
            warn!("Rejected game reload: {}", e);
            return Err(e);
        }
        self.generation += 1;
        info!("Game layer reloaded (generation {})", self.generation);
        Ok(std::mem::replace(&mut self.game, game))
    }

    /// Number of successful reloads
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Current implementation
    pub fn game_mut(&mut self) -> &mut dyn GameLayer {
        self.game.as_mut()
    }
}

fn check_version(game: &dyn GameLayer) -> Result<(), GameError> {
    let found = game.api_version();
    if found != GAME_API_VERSION {
        return Err(GameError::VersionMismatch {
            expected: GAME_API_VERSION,
            found,
        });
    }
    Ok(())
}
