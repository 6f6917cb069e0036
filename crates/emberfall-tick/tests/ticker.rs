//! Integration tests for the fixed-cadence ticker.
//!
//! Uses paused tokio time so `sleep_until` resolves as soon as the runtime
//! is idle, and `tokio::time::advance` to simulate late wake-ups.

use std::time::Duration;

use emberfall_tick::{TickConfig, TickPolicy, Ticker};

fn config_100ms() -> TickConfig {
    TickConfig::with_interval(Duration::from_millis(100))
}

/// The paused clock lands on timer deadlines at millisecond granularity.
fn assert_elapsed_ms(start: tokio::time::Instant, ms: u64) {
    let elapsed = start.elapsed();
    let expected = Duration::from_millis(ms);
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(2),
        "elapsed {elapsed:?}, expected ~{expected:?}"
    );
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.interval, Duration::from_millis(500));
    assert_eq!(cfg.policy, TickPolicy::Skip);
    assert!(cfg.metrics_enabled);
}

#[test]
fn test_validated_clamps_tiny_interval() {
    let cfg = TickConfig::with_interval(Duration::ZERO).validated();
    assert_eq!(cfg.interval, TickConfig::MIN_INTERVAL);
}

#[test]
fn test_validated_clamps_threshold() {
    let cfg = TickConfig {
        budget_warn_threshold: 4.0,
        ..config_100ms()
    }
    .validated();
    assert_eq!(cfg.budget_warn_threshold, 1.0);
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_ticks_fire_in_order() {
    let mut t = Ticker::new(config_100ms());
    assert_eq!(t.tick_count(), 0);

    for expected in 1..=5 {
        let info = t.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert!(!info.overrun);
        assert_eq!(info.ticks_skipped, 0);
    }
    assert_eq!(t.tick_count(), 5);
    assert_eq!(t.metrics().total_ticks, 5);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_one_interval_apart() {
    let start = tokio::time::Instant::now();
    let mut t = Ticker::new(config_100ms());

    t.wait_for_tick().await;
    assert_elapsed_ms(start, 100);
    t.wait_for_tick().await;
    assert_elapsed_ms(start, 200);
}

#[tokio::test(start_paused = true)]
async fn test_nothing_fires_before_interval() {
    let mut t = Ticker::new(config_100ms());
    let result = tokio::time::timeout(Duration::from_millis(50), t.wait_for_tick()).await;
    assert!(result.is_err());
}

// =========================================================================
// Overruns
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_skip_policy_reports_skipped_ticks() {
    let mut t = Ticker::new(config_100ms());
    t.wait_for_tick().await;

    // Work blocks the loop for 3.5 intervals.
    tokio::time::advance(Duration::from_millis(350)).await;

    let info = t.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 2);
    assert_eq!(t.metrics().total_overruns, 1);
    assert_eq!(t.metrics().total_skipped, 2);
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_reschedules_from_now() {
    let start = tokio::time::Instant::now();
    let mut t = Ticker::new(config_100ms());
    t.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(350)).await;
    t.wait_for_tick().await; // fires late, at 450ms

    t.wait_for_tick().await;
    assert_elapsed_ms(start, 550);
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_keeps_cadence() {
    let start = tokio::time::Instant::now();
    let mut t = Ticker::new(TickConfig {
        policy: TickPolicy::Drop,
        ..config_100ms()
    });
    t.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(150)).await;

    let info = t.wait_for_tick().await; // planned for 200ms, fires at 250ms
    assert!(info.overrun);
    t.wait_for_tick().await; // planned for 300ms
    assert_elapsed_ms(start, 300);
}

// =========================================================================
// Metrics
// =========================================================================

#[test]
fn test_initial_metrics_are_zero() {
    let t = Ticker::new(config_100ms());
    let m = t.metrics();
    assert_eq!(m.total_ticks, 0);
    assert_eq!(m.avg_tick_time, Duration::ZERO);
    assert_eq!(m.max_tick_time, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_tick_is_noop() {
    let mut t = Ticker::new(config_100ms());
    t.record_tick_end();
    assert_eq!(t.metrics().budget_utilization, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_tracks_wall_clock_work() {
    let mut t = Ticker::new(config_100ms());
    t.wait_for_tick().await;
    // record_tick_end measures std::time, which paused tokio time can't fake.
    std::thread::sleep(Duration::from_micros(200));
    t.record_tick_end();

    assert!(t.metrics().max_tick_time > Duration::ZERO);
    let util = t.metrics().budget_utilization;
    assert!(util > 0.0 && util < 1.0, "utilization {util}");
}

#[tokio::test(start_paused = true)]
async fn test_metrics_disabled_skips_timing() {
    let mut t = Ticker::new(TickConfig {
        metrics_enabled: false,
        ..config_100ms()
    });
    t.wait_for_tick().await;
    std::thread::sleep(Duration::from_micros(200));
    t.record_tick_end();

    assert_eq!(t.metrics().avg_tick_time, Duration::ZERO);
    assert_eq!(t.metrics().max_tick_time, Duration::ZERO);
}

// =========================================================================
// select! loop (mirrors the scheduler's run loop)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_pattern() {
    let mut t = Ticker::new(config_100ms());
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        tx.send(()).await.ok();
    });

    let mut fired = 0u64;
    loop {
        tokio::select! {
            Some(()) = rx.recv() => break,
            info = t.wait_for_tick() => {
                fired += 1;
                t.record_tick_end();
                assert_eq!(info.tick, fired);
            }
        }
    }
    assert_eq!(fired, 3);
}
