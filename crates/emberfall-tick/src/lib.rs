//! Fixed-cadence ticker for the Emberfall combat scheduler.
//!
//! The scheduler does not process a round per tick. It polls: every tick
//! it asks each active session whether its round timer has elapsed. The
//! ticker therefore only has to fire at a steady interval no longer than
//! a round, report when it fell behind, and keep an eye on how long the
//! work between ticks takes.
//!
//! # Integration
//!
//! ```ignore
//! let mut ticker = Ticker::new(TickConfig::with_interval(Duration::from_millis(250)));
//! loop {
//!     tokio::select! {
//!         _ = &mut shutdown => break,
//!         _info = ticker.wait_for_tick() => {
//!             scheduler.tick_at(now_ms).await;
//!             ticker.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the ticker wakes up later than scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one from now.
    #[default]
    Skip,
    /// Keep the original cadence: the next tick fires at its planned time,
    /// which may be immediately.
    Drop,
}

/// Configuration for a [`Ticker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Time between ticks. Default 500 ms.
    pub interval: Duration,
    /// Overrun handling.
    pub policy: TickPolicy,
    /// Fraction (0.0–1.0) of the interval after which a tick's work is
    /// reported as approaching its budget.
    pub budget_warn_threshold: f64,
    /// Collect per-tick timing into [`TickMetrics`].
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    /// Shortest interval the ticker accepts.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`Ticker::new`].
    ///
    /// - `interval` raised to [`Self::MIN_INTERVAL`].
    /// - `budget_warn_threshold` clamped to `0.0..=1.0`.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "tick interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`Ticker::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// The tick fired more than 10% of an interval late.
    pub overrun: bool,
    /// Whole intervals that passed without a tick.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Timing of the work done between [`Ticker::wait_for_tick`] and
/// [`Ticker::record_tick_end`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Exponential moving average (α = 0.1).
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Last tick's work as a fraction of the interval.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Fires at a fixed interval on the tokio clock.
pub struct Ticker {
    config: TickConfig,
    tick_count: u64,
    next_tick: TokioInstant,
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl Ticker {
    /// Creates a ticker whose first tick is one interval from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_millis() as u64,
            policy = ?config.policy,
            "ticker created"
        );
        Self {
            next_tick: TokioInstant::now() + config.interval,
            config,
            tick_count: 0,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Sleeps until the next tick is due.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = self.next_tick;
        let interval = self.config.interval;

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > interval / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / interval.as_nanos()) as u64
        } else {
            0
        };

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if ticks_skipped > 0 {
                    warn!(
                        tick = self.tick_count,
                        skipped = ticks_skipped,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "ticker overrun, skipping ahead"
                    );
                }
                now + interval
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "ticker overrun, keeping original cadence"
                    );
                }
                next + interval
            }
        };

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the work for the current tick.
    ///
    /// Without this call no budget warnings fire. Calling it twice, or
    /// before any tick, does nothing.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / self.config.interval.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= 1.0 {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "tick work exceeded the tick interval"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick work approaching the tick interval"
            );
        }

        if self.config.metrics_enabled {
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + elapsed.as_secs_f64() * alpha);
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
