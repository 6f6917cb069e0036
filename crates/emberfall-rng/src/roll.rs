//! Hit, critical, damage and healing rolls.

use rand::Rng;

use crate::{
    BASE_CRIT_CHANCE, BASE_HIT_CHANCE, CRITICAL_MULTIPLIER, GLANCING_BAND, GLANCING_MULTIPLIER,
    LEVEL_HIT_BONUS, MAX_CRIT_CHANCE, MAX_HIT_CHANCE, MIN_CRIT_CHANCE, MIN_HIT_CHANCE, VARIANCE,
    dice::try_roll_dice_string,
};

/// Outcome tier of a single attack roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitResult {
    Miss,
    Glancing,
    Hit,
    Critical,
}

impl HitResult {
    pub fn is_miss(self) -> bool {
        matches!(self, Self::Miss)
    }
}

/// Chance to hit in percent, clamped to `5..=95`.
///
/// `75 + accuracy − evasion + 2·(attacker_level − defender_level)`.
/// Callers without levels pass `1, 1`.
pub fn hit_chance(accuracy: i32, evasion: i32, attacker_level: i32, defender_level: i32) -> i32 {
    let level_delta = attacker_level.saturating_sub(defender_level);
    BASE_HIT_CHANCE
        .saturating_add(accuracy)
        .saturating_sub(evasion)
        .saturating_add(LEVEL_HIT_BONUS.saturating_mul(level_delta))
        .clamp(MIN_HIT_CHANCE, MAX_HIT_CHANCE)
}

/// Chance of a critical in percent, clamped to `1..=50`.
pub fn crit_chance(crit_bonus: i32) -> i32 {
    BASE_CRIT_CHANCE
        .saturating_add(crit_bonus)
        .clamp(MIN_CRIT_CHANCE, MAX_CRIT_CHANCE)
}

/// Draws a hit roll and a crit roll, both uniform in `1..=100`.
///
/// A hit roll at or under `hit_chance` lands, and is critical when the crit
/// roll is at or under `crit_chance`. A hit roll in the band just above the
/// hit chance is a glancing blow. The band never reaches past
/// [`MAX_HIT_CHANCE`], so the top of the range always misses.
pub fn roll_to_hit<R: Rng + ?Sized>(rng: &mut R, hit_chance: i32, crit_chance: i32) -> HitResult {
    let hit_roll: i32 = rng.random_range(1..=100);
    let crit_roll: i32 = rng.random_range(1..=100);

    if hit_roll <= hit_chance {
        if crit_roll <= crit_chance {
            HitResult::Critical
        } else {
            HitResult::Hit
        }
    } else if hit_roll <= hit_chance.saturating_add(GLANCING_BAND).min(MAX_HIT_CHANCE) {
        HitResult::Glancing
    } else {
        HitResult::Miss
    }
}

/// Scales `amount` by a uniform factor in `[1 − VARIANCE, 1 + VARIANCE]`.
fn vary<R: Rng + ?Sized>(rng: &mut R, amount: f64) -> i32 {
    let factor = rng.random_range((1.0 - VARIANCE)..=(1.0 + VARIANCE));
    (amount * factor).round() as i32
}

/// Damage dealt by a hit of the given tier. Zero on a miss, at least 1
/// otherwise.
pub fn damage<R: Rng + ?Sized>(rng: &mut R, base: i32, hit: HitResult) -> i32 {
    let base = f64::from(base.max(0));
    match hit {
        HitResult::Miss => 0,
        HitResult::Hit => vary(rng, base).max(1),
        HitResult::Critical => vary(rng, base * CRITICAL_MULTIPLIER).max(1),
        HitResult::Glancing => vary(rng, base * GLANCING_MULTIPLIER).max(1),
    }
}

/// Inputs to [`roll_attack`]. `Default` gives an unmodified level 1
/// matchup with no base damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackParams {
    pub base_damage: i32,
    pub accuracy: i32,
    pub evasion: i32,
    pub attacker_level: i32,
    pub defender_level: i32,
    pub crit_bonus: i32,
}

impl Default for AttackParams {
    fn default() -> Self {
        Self {
            base_damage: 0,
            accuracy: 0,
            evasion: 0,
            attacker_level: 1,
            defender_level: 1,
            crit_bonus: 0,
        }
    }
}

/// Full result of an attack roll, including the inputs that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    pub hit: HitResult,
    pub damage: i32,
    pub was_critical: bool,
    pub was_glancing: bool,
    pub hit_chance: i32,
    pub crit_chance: i32,
    /// The amount the damage tiers were computed from. For dice attacks
    /// this is the dice total, not the flat base.
    pub base_damage: i32,
}

fn attack_roll(hit: HitResult, damage: i32, hit_chance: i32, crit_chance: i32, base: i32) -> AttackRoll {
    AttackRoll {
        hit,
        damage,
        was_critical: hit == HitResult::Critical,
        was_glancing: hit == HitResult::Glancing,
        hit_chance,
        crit_chance,
        base_damage: base,
    }
}

/// Rolls to hit and then rolls damage for the resulting tier.
pub fn roll_attack<R: Rng + ?Sized>(rng: &mut R, params: &AttackParams) -> AttackRoll {
    let hc = hit_chance(
        params.accuracy,
        params.evasion,
        params.attacker_level,
        params.defender_level,
    );
    let cc = crit_chance(params.crit_bonus);
    let hit = roll_to_hit(rng, hc, cc);
    let dmg = damage(rng, params.base_damage, hit);
    attack_roll(hit, dmg, hc, cc, params.base_damage)
}

/// Like [`roll_attack`], but when `damage_dice` parses, the dice are rolled
/// for the amount instead of using `params.base_damage`. A critical doubles
/// the dice result and a glancing blow halves it. An absent or malformed
/// formula falls back to the flat path.
pub fn roll_attack_with_dice<R: Rng + ?Sized>(
    rng: &mut R,
    damage_dice: Option<&str>,
    params: &AttackParams,
) -> AttackRoll {
    let hc = hit_chance(
        params.accuracy,
        params.evasion,
        params.attacker_level,
        params.defender_level,
    );
    let cc = crit_chance(params.crit_bonus);
    let hit = roll_to_hit(rng, hc, cc);

    let Some(roll) = try_roll_dice_string(rng, damage_dice) else {
        let dmg = damage(rng, params.base_damage, hit);
        return attack_roll(hit, dmg, hc, cc, params.base_damage);
    };

    let amount = roll.total;
    let dmg = match hit {
        HitResult::Miss => 0,
        HitResult::Hit => amount,
        HitResult::Critical => amount.saturating_mul(2),
        HitResult::Glancing => (amount / 2).max(1),
    };
    attack_roll(hit, dmg, hc, cc, amount)
}

/// Rolls a heal of `base`. Returns `(amount, was_critical)`.
///
/// A zero (or negative) base heals nothing and skips the crit roll
/// entirely, so it consumes no randomness.
pub fn roll_healing<R: Rng + ?Sized>(rng: &mut R, base: i32, crit_bonus: i32) -> (i32, bool) {
    if base <= 0 {
        return (0, false);
    }
    let critical = rng.random_range(1..=100) <= crit_chance(crit_bonus);
    let amount = if critical {
        f64::from(base) * CRITICAL_MULTIPLIER
    } else {
        f64::from(base)
    };
    (vary(rng, amount).max(1), critical)
}
