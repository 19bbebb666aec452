//! Configuration management (config.toml)
//!
//! Handles loading, saving, and providing defaults for host settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::{AudioFormat, SoundOutput};

/// Smallest permanent storage the host hands to a game layer
pub const MIN_PERMANENT_MB: usize = 1;

const MIB: usize = 1024 * 1024;

/// Errors from loading, saving, or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Host configuration.
///
/// Contains all user-configurable settings organized into sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Sound output settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Backbuffer settings
    #[serde(default)]
    pub video: VideoConfig,
    /// Main loop timing
    #[serde(default)]
    pub runtime: RuntimeSettings,
    /// Game memory sizes
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Audio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output sample rate in Hz (default: 48000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Ring buffer length in milliseconds (default: 1000)
    #[serde(default = "default_buffer_ms")]
    pub buffer_ms: u32,
    /// How far ahead of playback to write, in game frames (default: 2.0)
    #[serde(default = "default_latency_frames")]
    pub latency_frames: f32,
    /// Simulated device period in sample frames (default: 480)
    #[serde(default = "default_period_frames")]
    pub period_frames: usize,
}

/// Backbuffer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Backbuffer width in pixels (default: 960)
    #[serde(default = "default_width")]
    pub width: usize,
    /// Backbuffer height in pixels (default: 540)
    #[serde(default = "default_height")]
    pub height: usize,
}

/// Main loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Game update rate in Hz (default: 30)
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Largest frame delta fed to the accumulator (default: 100)
    #[serde(default = "default_max_delta_ms")]
    pub max_delta_ms: u64,
    /// Tick time above which a warning is logged; 0 means one full tick
    #[serde(default)]
    pub cpu_budget_us: u64,
}

/// Game memory configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Permanent storage in MiB (default: 64)
    #[serde(default = "default_permanent_mb")]
    pub permanent_mb: usize,
    /// Transient storage in MiB (default: 256)
    #[serde(default = "default_transient_mb")]
    pub transient_mb: usize,
}

fn default_sample_rate() -> u32 {
    crate::audio::DEFAULT_SAMPLE_RATE
}
fn default_buffer_ms() -> u32 {
    1000
}
fn default_latency_frames() -> f32 {
    2.0
}
fn default_period_frames() -> usize {
    480
}

fn default_width() -> usize {
    960
}
fn default_height() -> usize {
    540
}

fn default_tick_rate() -> u32 {
    30
}
fn default_max_delta_ms() -> u64 {
    100
}

fn default_permanent_mb() -> usize {
    64
}
fn default_transient_mb() -> usize {
    256
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_ms: default_buffer_ms(),
            latency_frames: default_latency_frames(),
            period_frames: default_period_frames(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            max_delta_ms: default_max_delta_ms(),
            cpu_budget_us: 0,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            permanent_mb: default_permanent_mb(),
            transient_mb: default_transient_mb(),
        }
    }
}

impl AudioConfig {
    /// Stereo output format at the configured rate
    pub fn format(&self) -> AudioFormat {
        AudioFormat::stereo(self.sample_rate)
    }

    /// Ring capacity in bytes, a whole number of sample frames
    pub fn capacity_bytes(&self) -> usize {
        let format = self.format();
        let frames = self.sample_rate as u64 * self.buffer_ms as u64 / 1000;
        frames as usize * format.bytes_per_sample()
    }

    /// Producer state for this configuration at `tick_rate`
    ///
    /// # Errors
    ///
    /// Returns an error if the safety margin does not fit the ring.
    pub fn sound_output(&self, tick_rate: u32) -> Result<SoundOutput, ConfigError> {
        SoundOutput::new(
            self.format(),
            self.capacity_bytes(),
            tick_rate,
            self.latency_frames,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

impl RuntimeSettings {
    /// Time per game tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Largest frame delta fed to the accumulator (prevents spiral of death)
    pub fn max_delta(&self) -> Duration {
        Duration::from_millis(self.max_delta_ms)
    }

    /// Tick time above which a warning is logged
    pub fn cpu_budget(&self) -> Duration {
        if self.cpu_budget_us == 0 {
            self.tick_duration()
        } else {
            Duration::from_micros(self.cpu_budget_us)
        }
    }
}

impl MemoryConfig {
    pub fn permanent_bytes(&self) -> usize {
        self.permanent_mb.saturating_mul(MIB)
    }

    pub fn transient_bytes(&self) -> usize {
        self.transient_mb.saturating_mul(MIB)
    }
}

impl Config {
    /// Check values that would break the main loop or the audio path
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::Invalid("audio.sample_rate must be non-zero".into()));
        }
        if self.audio.capacity_bytes() == 0 {
            return Err(ConfigError::Invalid("audio.buffer_ms is too small".into()));
        }
        if !self.audio.latency_frames.is_finite() || self.audio.latency_frames <= 0.0 {
            return Err(ConfigError::Invalid(
                "audio.latency_frames must be positive and finite".into(),
            ));
        }
        if self.audio.period_frames == 0 {
            return Err(ConfigError::Invalid(
                "audio.period_frames must be non-zero".into(),
            ));
        }
        let period_bytes = self
            .audio
            .period_frames
            .checked_mul(self.audio.format().bytes_per_sample());
        if period_bytes.is_none_or(|bytes| bytes > self.audio.capacity_bytes()) {
            return Err(ConfigError::Invalid(
                "audio.period_frames does not fit the ring buffer".into(),
            ));
        }
        if self.runtime.tick_rate == 0 {
            return Err(ConfigError::Invalid("runtime.tick_rate must be non-zero".into()));
        }
        if self.video.width == 0 || self.video.height == 0 {
            return Err(ConfigError::Invalid(
                "video dimensions must be non-zero".into(),
            ));
        }
        if self.memory.permanent_mb < MIN_PERMANENT_MB {
            return Err(ConfigError::Invalid(format!(
                "memory.permanent_mb must be at least {MIN_PERMANENT_MB}"
            )));
        }
        if self.memory.permanent_mb.checked_mul(MIB).is_none()
            || self.memory.transient_mb.checked_mul(MIB).is_none()
        {
            return Err(ConfigError::Invalid("memory size overflows".into()));
        }
        self.audio.sound_output(self.runtime.tick_rate)?;
        Ok(())
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Handmade\config`
/// On macOS: `~/Library/Application Support/org.handmade.Handmade`
/// On Linux: `~/.config/handmade`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "handmade", "Handmade")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path of `config.toml` in the platform configuration directory
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the configuration from the platform configuration directory.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_from(&path).unwrap_or_else(|e| {
            tracing::warn!("Using default config: {}", e);
            Config::default()
        }),
        _ => Config::default(),
    }
}

/// Loads the configuration from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Saves the configuration to `path`.
///
/// Creates the parent directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.audio.buffer_ms, 1000);
        assert_eq!(config.runtime.tick_rate, 30);
        assert_eq!(config.video.width, 960);
        assert_eq!(config.memory.permanent_mb, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_ring_holds_one_second() {
        let audio = AudioConfig::default();
        assert_eq!(audio.capacity_bytes(), 48_000 * 4);
    }

    #[test]
    fn test_cpu_budget_defaults_to_one_tick() {
        let runtime = RuntimeSettings::default();
        assert_eq!(runtime.tick_duration(), Duration::from_secs_f64(1.0 / 30.0));
        assert_eq!(runtime.cpu_budget(), runtime.tick_duration());
        assert_eq!(runtime.max_delta(), Duration::from_millis(100));

        let custom = RuntimeSettings {
            cpu_budget_us: 5000,
            ..Default::default()
        };
        assert_eq!(custom.cpu_budget(), Duration::from_micros(5000));
    }

    // =============================================================
    // TOML serialization tests
    // =============================================================

    #[test]
    fn test_config_deserialize_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_deserialize_partial_audio() {
        let toml_str = r#"
[audio]
sample_rate = 44100
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.audio.buffer_ms, 1000); // default
        assert_eq!(config.runtime.tick_rate, 30); // default
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.audio.buffer_ms = 500;
        config.runtime.tick_rate = 60;
        config.memory.transient_mb = 1;

        save_to(&config, &path).unwrap();
        let loaded = load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(load_from(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[audio\nsample_rate = ").unwrap();
        assert!(matches!(load_from(&bad), Err(ConfigError::Parse { .. })));
    }

    // =============================================================
    // Validation tests
    // =============================================================

    #[test]
    fn test_validate_rejects_zero_rates() {
        let mut config = Config::default();
        config.audio.sample_rate = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.runtime.tick_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_margin_larger_than_ring() {
        let mut config = Config::default();
        // 10ms ring cannot hold two 30Hz frames of audio
        config.audio.buffer_ms = 10;
        config.audio.period_frames = 48;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_period() {
        let mut config = Config::default();
        config.audio.period_frames = 48_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unbounded_latency() {
        let config: Config = toml::from_str("[audio]\nlatency_frames = inf").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config: Config = toml::from_str("[audio]\nlatency_frames = nan").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.audio.latency_frames = 1e30;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_overflowing_period() {
        let config: Config =
            toml::from_str("[audio]\nperiod_frames = 9000000000000000000").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_requires_permanent_storage() {
        let mut config = Config::default();
        config.memory.permanent_mb = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.memory.permanent_mb = usize::MAX / 2;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert_eq!(config.memory.permanent_bytes(), usize::MAX);
    }
}
