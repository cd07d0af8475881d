//! Time utilities for the simulation clock

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 20; // 20 ticks per simulated second
pub const FRAME_TPS: u32 = 20; // frames per wall-clock second
pub const FRAME_DURATION_MICROS: u64 = 1_000_000 / FRAME_TPS as u64;

/// Default number of ticks run per frame while fast-forward is engaged
pub const DEFAULT_FAST_FORWARD_TICKS: u32 = 10;

/// Fixed delta time for one simulation tick (in seconds)
pub fn tick_delta() -> f64 {
    1.0 / SIMULATION_TPS as f64
}

/// Frame interval for the session runner
pub fn frame_duration() -> Duration {
    Duration::from_micros(FRAME_DURATION_MICROS)
}

/// Fixed-step simulation clock.
///
/// Fast-forward never changes the tick size: it only changes how many ticks
/// are run per rendered frame, so N frames at 10x are tick-for-tick identical
/// to 10N frames at 1x.
#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    fast_forward_ticks: u32,
    fast_forward: bool,
}

impl SimClock {
    pub fn new(fast_forward_ticks: u32) -> Self {
        Self {
            tick: 0,
            fast_forward_ticks: fast_forward_ticks.max(1),
            fast_forward: false,
        }
    }

    /// Ticks completed since the session started
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds elapsed
    pub fn elapsed_secs(&self) -> f64 {
        self.tick as f64 * tick_delta()
    }

    /// Advance by one tick, returns the new tick number
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn is_fast_forward(&self) -> bool {
        self.fast_forward
    }

    pub fn set_fast_forward(&mut self, enabled: bool) {
        self.fast_forward = enabled;
    }

    pub fn toggle_fast_forward(&mut self) -> bool {
        self.fast_forward = !self.fast_forward;
        self.fast_forward
    }

    /// Number of ticks the runner executes for the next frame
    pub fn ticks_per_frame(&self) -> u32 {
        if self.fast_forward {
            self.fast_forward_ticks
        } else {
            1
        }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(DEFAULT_FAST_FORWARD_TICKS)
    }
}
