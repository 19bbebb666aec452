//! Game loop execution with fixed timestep

use std::time::{Duration, Instant};

use crate::config::RuntimeSettings;

/// Timing state carried between frames
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    pub accumulator: Duration,
    pub last_update: Option<Instant>,
}

/// Execute a single frame with optional time scaling
///
/// This implements a fixed timestep game loop with variable render rate.
/// `tick` runs once per whole tick in the accumulator. Returns the number of
/// ticks executed and interpolation factor for rendering.
pub fn execute_frame<F>(
    settings: &RuntimeSettings,
    tick_duration: Duration,
    clock: &mut FrameClock,
    time_scale: f32,
    tick: F,
) -> (u32, f32)
where
    F: FnMut(),
{
    execute_frame_at(Instant::now(), settings, tick_duration, clock, time_scale, tick)
}

/// [`execute_frame`] with an explicit current time
pub fn execute_frame_at<F>(
    now: Instant,
    settings: &RuntimeSettings,
    tick_duration: Duration,
    clock: &mut FrameClock,
    time_scale: f32,
    mut tick: F,
) -> (u32, f32)
where
    F: FnMut(),
{
    // Calculate delta time
    let delta = match clock.last_update {
        Some(last) => now.saturating_duration_since(last).min(settings.max_delta()),
        None => tick_duration,
    };
    clock.last_update = Some(now);

    // Apply time scale to delta before accumulating; unscaled time stays exact
    clock.accumulator += if time_scale == 1.0 {
        delta
    } else {
        delta.mul_f64(time_scale.max(0.0) as f64)
    };

    let cpu_budget = settings.cpu_budget();
    let mut ticks = 0u32;
    while clock.accumulator >= tick_duration {
        let tick_start = Instant::now();

        tick();

        clock.accumulator -= tick_duration;
        ticks += 1;

        // Check CPU budget
        let tick_time = tick_start.elapsed();
        if tick_time > cpu_budget {
            tracing::warn!("Tick took {:?}, exceeds budget of {:?}", tick_time, cpu_budget);
        }
    }

    // Calculate interpolation factor for rendering
    let alpha = clock.accumulator.as_secs_f32() / tick_duration.as_secs_f32();

    (ticks, alpha)
}
