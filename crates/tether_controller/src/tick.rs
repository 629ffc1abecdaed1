//! # Controller Tick Loop
//!
//! Fixed-timestep loop for the controller side.
//!
//! ## Design
//!
//! The controller's clock only paces polling. Anything that must be exact
//! (blank duration, animation timeout) is measured in engine frames, so a
//! late tick here costs latency, never correctness.

use std::time::{Duration, Instant};

use tether_shared::REFRESH_RATE_HZ;

/// Ticks of backlog dropped at once after a stall.
const MAX_BACKLOG_TICKS: u32 = 5;

/// Fixed-timestep tick loop.
#[derive(Debug)]
pub struct TickLoop {
    tick_duration: Duration,
    last_tick: Instant,
    accumulator: Duration,
    tick_count: u64,
    stats: TickStats,
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickStats {
    /// Minimum tick duration observed.
    pub min_tick_us: u64,
    /// Maximum tick duration observed.
    pub max_tick_us: u64,
    /// Average tick duration (rolling).
    pub avg_tick_us: u64,
    /// Ticks that overran their budget.
    pub late_ticks: u64,
    /// Backlog ticks dropped after stalls.
    pub skipped_ticks: u64,
    /// Total ticks measured.
    pub total_ticks: u64,
}

impl TickStats {
    fn fresh(tick_duration: Duration) -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: tick_duration.as_micros() as u64,
            late_ticks: 0,
            skipped_ticks: 0,
            total_ticks: 0,
        }
    }

    /// Late ticks as a percentage of all ticks.
    #[must_use]
    pub fn late_percent(&self) -> f64 {
        self.late_ticks as f64 / self.total_ticks.max(1) as f64 * 100.0
    }
}

impl TickLoop {
    /// Creates a loop at `tick_rate` Hz (0 is treated as 1).
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_duration = Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)));
        Self {
            tick_duration,
            last_tick: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            stats: TickStats::fresh(tick_duration),
        }
    }

    /// Returns true if a tick is due. Call until it returns false.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_tick);
        self.last_tick = now;

        // After a long stall, run a few catch-up ticks and drop the rest.
        let backlog = self.tick_duration * MAX_BACKLOG_TICKS;
        if self.accumulator > backlog {
            let dropped = (self.accumulator - backlog).as_micros() / self.tick_duration.as_micros().max(1);
            tracing::warn!("Controller stalled, dropping {} ticks of backlog", dropped);
            self.stats.skipped_ticks += dropped as u64;
            self.accumulator = backlog;
        }

        self.accumulator >= self.tick_duration
    }

    /// Marks the start of a tick and returns its start time.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        self.tick_count += 1;
        Instant::now()
    }

    /// Marks the end of a tick and records its duration.
    pub fn end_tick(&mut self, start: Instant) {
        let duration = start.elapsed();
        let duration_us = duration.as_micros() as u64;

        self.stats.total_ticks += 1;
        self.stats.min_tick_us = self.stats.min_tick_us.min(duration_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(duration_us);
        self.stats.avg_tick_us = (self.stats.avg_tick_us * 15 + duration_us) / 16;

        if duration > self.tick_duration {
            self.stats.late_ticks += 1;
            tracing::debug!("Late tick {}: {} us", self.tick_count, duration_us);
        }
    }

    /// Sleeps until the next tick is due, spinning for the last half
    /// millisecond.
    pub fn wait_for_next_tick(&self) {
        let elapsed = self.last_tick.elapsed();
        if elapsed < self.tick_duration {
            let remaining = self.tick_duration - elapsed;
            if remaining > Duration::from_micros(1000) {
                std::thread::sleep(remaining - Duration::from_micros(500));
            }
            while self.last_tick.elapsed() < self.tick_duration {
                std::hint::spin_loop();
            }
        }
    }

    /// Ticks executed.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Clears statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::fresh(self.tick_duration);
    }
}

impl Default for TickLoop {
    fn default() -> Self {
        Self::new(REFRESH_RATE_HZ)
    }
}
