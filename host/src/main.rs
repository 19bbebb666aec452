//! Handmade - game host
//!
//! Runs the demo game layer at a fixed tick rate and keeps its sound output
//! fed through the shared ring buffer for a fixed number of seconds.
//!
//! # Usage
//!
//! ```bash
//! handmade
//! handmade --seconds 10 --tone 440
//! handmade --config path/to/config.toml --sync-display
//! RUST_LOG=handmade_core=debug handmade
//! ```

mod demo;

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use handmade_core::audio::{AudioDevice, AudioSystem, FeedOutcome, SimulatedDevice, SoundOutput};
use handmade_core::config::{self, Config};
use handmade_core::runtime::Runtime;

use demo::SineWaveGame;

#[derive(Parser)]
#[command(name = "handmade")]
#[command(
    author,
    version,
    about = "Handmade-style game host with ring-buffered sound output"
)]
struct Args {
    /// Seconds to run before exiting
    #[arg(long, default_value = "3")]
    seconds: f32,

    /// Config file (defaults to config.toml in the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured output sample rate
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Demo tone frequency in Hz
    #[arg(long, default_value = "256")]
    tone: u32,

    /// Play through the default output device (requires the `cpal` feature)
    #[arg(long)]
    cpal: bool,

    /// Draw audio cursor markers over the backbuffer
    #[arg(long)]
    sync_display: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => config::load(),
    };
    if let Some(rate) = args.sample_rate {
        config.audio.sample_rate = rate;
    }

    let mut runtime = Runtime::from_config(&config, Box::new(SineWaveGame::new(args.tone)))?;
    runtime.set_audio(open_audio(&config, args.cpal)?);
    runtime.set_sync_display(args.sync_display);

    info!(
        "Running for {:.1}s at {} Hz, sound at {} Hz",
        args.seconds, config.runtime.tick_rate, config.audio.sample_rate
    );

    let run_for = Duration::from_secs_f32(args.seconds.max(0.0));
    let frame_target = runtime.tick_duration();
    let start = Instant::now();
    let mut frames = 0u64;
    let mut ticks = 0u64;
    let mut resyncs = 0u64;

    while start.elapsed() < run_for {
        let frame_start = Instant::now();

        let report = runtime.frame();
        frames += 1;
        ticks += report.ticks as u64;
        if let Some(FeedOutcome::Resynced { .. }) = report.feed {
            resyncs += 1;
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_target {
            thread::sleep(frame_target - elapsed);
        }
    }

    if let Some(audio) = runtime.audio() {
        let metrics = audio.feeder().metrics();
        let stats = audio.callback_stats();
        info!(
            "Sound: {} bytes written, {} resyncs, {} skipped cycles, {} partial fills",
            metrics.bytes_written, metrics.resyncs, metrics.skipped_cycles, metrics.partial_fills
        );
        info!(
            "Device: {} callbacks, {} bytes, {} starved callbacks ({} bytes)",
            stats.callbacks, stats.bytes, stats.starved_callbacks, stats.starved_bytes
        );
    }
    info!(
        "Done: {} frames, {} ticks, {} resyncs in {:.2}s",
        frames,
        ticks,
        resyncs,
        start.elapsed().as_secs_f32()
    );

    Ok(())
}

/// Open the sound output described by `config`
fn open_audio(config: &Config, use_hardware: bool) -> Result<AudioSystem> {
    let output = config
        .audio
        .sound_output(config.runtime.tick_rate)
        .context("Invalid sound output settings")?;

    if use_hardware {
        return open_hardware(output);
    }

    let format = config.audio.format();
    let period = config.audio.period_frames;
    AudioSystem::new(output, |ring| {
        Ok(Box::new(SimulatedDevice::start(format, ring, period)?) as Box<dyn AudioDevice>)
    })
    .context("Failed to start simulated audio device")
}

#[cfg(feature = "cpal")]
fn open_hardware(output: SoundOutput) -> Result<AudioSystem> {
    use handmade_core::audio::{AudioFormat, CpalDevice};

    let format = AudioFormat::stereo(output.samples_per_second);
    AudioSystem::new(output, |ring| {
        Ok(Box::new(CpalDevice::open(format, ring)?) as Box<dyn AudioDevice>)
    })
    .context("Failed to open audio output device")
}

#[cfg(not(feature = "cpal"))]
fn open_hardware(_output: SoundOutput) -> Result<AudioSystem> {
    anyhow::bail!("handmade was built without the `cpal` feature; rebuild with --features cpal")
}
