//! Real-time pacing and frame-skip tuning.

use std::time::{Duration, Instant};

/// Below this share of real time the auto frame-skip renders fewer frames.
const SLOW_PERCENT: f64 = 90.0;
/// Above this share it renders more again.
const FAST_PERCENT: f64 = 98.0;

/// How often the performance figure is recomputed.
pub const MEASURE_INTERVAL: Duration = Duration::from_secs(1);

/// Keeps emulated time in step with the wall clock.
#[derive(Debug, Clone)]
pub struct Pacer {
    clock_hz: u32,
    origin: Instant,
    origin_cycles: u64,
}

impl Pacer {
    pub fn new(clock_hz: u32, now: Instant, cycles: u64) -> Self {
        Self {
            clock_hz,
            origin: now,
            origin_cycles: cycles,
        }
    }

    /// Forget the past, e.g. after a pause or a turbo phase, so the pacer
    /// does not try to catch up.
    pub fn rebase(&mut self, now: Instant, cycles: u64) {
        self.origin = now;
        self.origin_cycles = cycles;
    }

    /// Emulated time elapsed since the origin.
    pub fn emulated(&self, cycles: u64) -> Duration {
        let elapsed = cycles.saturating_sub(self.origin_cycles);
        Duration::from_secs_f64(elapsed as f64 / self.clock_hz as f64)
    }

    /// How long to sleep so wall time catches up with emulated time.
    pub fn ahead_by(&self, now: Instant, cycles: u64) -> Duration {
        self.emulated(cycles)
            .saturating_sub(now.saturating_duration_since(self.origin))
    }
}

/// Achieved speed as a percentage of the nominal clock.
#[derive(Debug, Clone)]
pub struct PerformanceMeter {
    clock_hz: u32,
    since: Instant,
    since_cycles: u64,
    percent: f64,
}

impl PerformanceMeter {
    pub fn new(clock_hz: u32, now: Instant, cycles: u64) -> Self {
        Self {
            clock_hz,
            since: now,
            since_cycles: cycles,
            percent: 100.0,
        }
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Returns a fresh figure once per [`MEASURE_INTERVAL`].
    pub fn sample(&mut self, now: Instant, cycles: u64) -> Option<f64> {
        let wall = now.saturating_duration_since(self.since);
        if wall < MEASURE_INTERVAL {
            return None;
        }
        let done = cycles.saturating_sub(self.since_cycles) as f64;
        self.percent = done * 100.0 / (self.clock_hz as f64 * wall.as_secs_f64());
        self.since = now;
        self.since_cycles = cycles;
        Some(self.percent)
    }

    pub fn restart(&mut self, now: Instant, cycles: u64) {
        self.since = now;
        self.since_cycles = cycles;
    }
}

/// Next frame-skip value for an auto setting capped at `max`.
pub fn adjust_frame_skip(current: u8, max: u8, percent: f64) -> u8 {
    let max = max.max(1);
    if percent < SLOW_PERCENT && current < max {
        current + 1
    } else if percent > FAST_PERCENT && current > 1 {
        current - 1
    } else {
        current.clamp(1, max)
    }
}
