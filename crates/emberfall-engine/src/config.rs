//! Engine configuration.

use std::time::Duration;

use emberfall_combat::RoundConfig;
use emberfall_tick::TickConfig;
use serde::{Deserialize, Serialize};

/// Settings for a [`CombatScheduler`](crate::CombatScheduler).
///
/// Deserializes from partial JSON: missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock length of a round. Default 3 s.
    pub round_duration: Duration,

    /// Rounds after which a fight ends in a timeout. Default 50.
    pub max_combat_rounds: u32,

    /// Scheduler tick cadence. Must not exceed `round_duration`.
    pub tick: TickConfig,

    /// Seed for reproducible fights. Each session mixes in its own id.
    /// `None` seeds every session from OS entropy.
    pub rng_seed: Option<u64>,

    /// Capacity of each session actor's command channel.
    pub command_channel_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            round_duration: Duration::from_millis(3_000),
            max_combat_rounds: 50,
            tick: TickConfig::default(),
            rng_seed: None,
            command_channel_size: 64,
        }
    }
}

impl EngineConfig {
    pub const MIN_ROUND_DURATION: Duration = Duration::from_millis(100);

    /// Clamps out-of-range values, warning about each one:
    ///
    /// - `round_duration` raised to [`Self::MIN_ROUND_DURATION`]
    /// - `max_combat_rounds` and `command_channel_size` raised to 1
    /// - `tick.interval` lowered to `round_duration`
    pub fn validated(mut self) -> Self {
        if self.round_duration < Self::MIN_ROUND_DURATION {
            tracing::warn!(
                round_ms = self.round_duration.as_millis() as u64,
                min_ms = Self::MIN_ROUND_DURATION.as_millis() as u64,
                "round duration below minimum, clamping"
            );
            self.round_duration = Self::MIN_ROUND_DURATION;
        }
        if self.max_combat_rounds == 0 {
            tracing::warn!("max_combat_rounds is 0, using 1");
            self.max_combat_rounds = 1;
        }
        if self.command_channel_size == 0 {
            tracing::warn!("command_channel_size is 0, using 1");
            self.command_channel_size = 1;
        }
        self.tick = self.tick.validated();
        if self.tick.interval > self.round_duration {
            tracing::warn!(
                tick_ms = self.tick.interval.as_millis() as u64,
                round_ms = self.round_duration.as_millis() as u64,
                "tick interval longer than a round, clamping"
            );
            self.tick.interval = self.round_duration;
        }
        self
    }

    pub fn round_duration_ms(&self) -> u64 {
        u64::try_from(self.round_duration.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn round_config(&self) -> RoundConfig {
        RoundConfig {
            max_combat_rounds: self.max_combat_rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.round_duration_ms(), 3_000);
        assert_eq!(cfg.max_combat_rounds, 50);
        assert_eq!(cfg.tick.interval, Duration::from_millis(500));
        assert!(cfg.rng_seed.is_none());
    }

    #[test]
    fn test_tick_interval_clamped_to_round() {
        let mut cfg = EngineConfig {
            round_duration: Duration::from_millis(200),
            ..EngineConfig::default()
        };
        cfg.tick.interval = Duration::from_secs(1);
        let cfg = cfg.validated();
        assert_eq!(cfg.tick.interval, Duration::from_millis(200));
    }

    #[test]
    fn test_zero_values_clamped() {
        let cfg = EngineConfig {
            round_duration: Duration::ZERO,
            max_combat_rounds: 0,
            command_channel_size: 0,
            ..EngineConfig::default()
        }
        .validated();
        assert_eq!(cfg.round_duration, EngineConfig::MIN_ROUND_DURATION);
        assert_eq!(cfg.max_combat_rounds, 1);
        assert_eq!(cfg.command_channel_size, 1);
        assert!(cfg.tick.interval <= cfg.round_duration);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{ "max_combat_rounds": 10, "rng_seed": 42 }"#).unwrap();
        assert_eq!(cfg.max_combat_rounds, 10);
        assert_eq!(cfg.rng_seed, Some(42));
        assert_eq!(cfg.round_duration, Duration::from_millis(3_000));
    }
}
