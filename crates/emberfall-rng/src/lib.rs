//! Combat randomness for Emberfall.
//!
//! Pure functions: every roll takes the generator as `&mut R` where
//! `R: rand::Rng`. There is no global generator, so two sessions
//! processed on different workers never contend for one, and a test can
//! hand in a seeded [`rand::rngs::StdRng`] to get the same fight twice.
//!
//! - [`hit_chance`] / [`crit_chance`] turn stats into percentages.
//! - [`roll_to_hit`] draws one [`HitResult`].
//! - [`damage`], [`roll_attack`], [`roll_healing`] apply the variance model.
//! - [`DiceFormula`], [`roll_dice_string`] and friends handle `XdY+Z`.

mod dice;
mod error;
mod roll;

pub use dice::{
    DiceFormula, DiceRoll, average_dice_roll, d4, d6, d8, d10, d12, d20, d100, roll_dice,
    roll_dice_string, try_roll_dice_string, MAX_DICE,
};
pub use error::DiceError;
pub use roll::{
    AttackParams, AttackRoll, HitResult, crit_chance, damage, hit_chance, roll_attack,
    roll_attack_with_dice, roll_healing, roll_to_hit,
};

/// Hit chance before accuracy, evasion and level difference, in percent.
pub const BASE_HIT_CHANCE: i32 = 75;
/// Lowest hit chance any matchup can produce.
pub const MIN_HIT_CHANCE: i32 = 5;
/// Highest hit chance any matchup can produce. Rolls above it never land.
pub const MAX_HIT_CHANCE: i32 = 95;
/// Hit chance gained per level the attacker has over the defender.
pub const LEVEL_HIT_BONUS: i32 = 2;

/// Critical chance before bonuses, in percent.
pub const BASE_CRIT_CHANCE: i32 = 5;
pub const MIN_CRIT_CHANCE: i32 = 1;
pub const MAX_CRIT_CHANCE: i32 = 50;

/// Width of the band just above the hit chance that yields a glancing blow.
pub const GLANCING_BAND: i32 = 10;

/// Damage and healing are scaled by a uniform factor in `1 ± VARIANCE`.
pub const VARIANCE: f64 = 0.25;
pub const CRITICAL_MULTIPLIER: f64 = 2.0;
pub const GLANCING_MULTIPLIER: f64 = 0.5;
