//! Combatants: players and creatures with resource pools.

use std::collections::BTreeMap;

use emberfall_protocol::{AbilityId, CombatantId, CombatantKind, CombatantSnapshot};
use serde::{Deserialize, Serialize};

use crate::ability::{Ability, BASIC_ATTACK_ID};
use crate::effects::{StatusEffect, StatusEffects, StatusKind, TickReport};

/// The stat block a combatant is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantStats {
    pub max_hp: i32,
    pub max_mana: i32,
    pub max_stamina: i32,
    pub initiative: i32,
    pub accuracy: i32,
    pub evasion: i32,
    pub crit_bonus: i32,
    pub base_damage: i32,
    pub level: i32,
}

impl Default for CombatantStats {
    fn default() -> Self {
        Self {
            max_hp: 10,
            max_mana: 0,
            max_stamina: 0,
            initiative: 0,
            accuracy: 0,
            evasion: 0,
            crit_bonus: 0,
            base_damage: 1,
            level: 1,
        }
    }
}

/// A change in a combatant's life state caused by an hp change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeChange {
    Unchanged,
    /// A player dropped to 0 hp or below but is above the death threshold.
    Downed,
    /// A downed player was healed back above 0.
    Revived,
    Died,
}

/// A participant in a combat session.
///
/// Hit points only move through [`take_damage`](Self::take_damage),
/// [`heal`](Self::heal) and [`tick_effects`](Self::tick_effects), which
/// keep `is_downed`/`is_alive` consistent with `hp`:
///
/// - creatures die the moment `hp <= 0`
/// - players are downed at `0 >= hp > death_threshold` and die at
///   `hp <= death_threshold`; hp never goes below the threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub kind: CombatantKind,
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub initiative: i32,
    pub accuracy: i32,
    pub evasion: i32,
    pub crit_bonus: i32,
    pub base_damage: i32,
    pub level: i32,
    /// Always `<= 0`. Zero for creatures.
    pub death_threshold: i32,
    pub is_downed: bool,
    pub is_alive: bool,
    pub ability_ids: Vec<AbilityId>,
    /// Rounds left per ability. Entries are removed at zero, never stored.
    #[serde(default)]
    pub cooldowns: BTreeMap<AbilityId, u32>,
    #[serde(default)]
    pub status_effects: StatusEffects,
}

impl Combatant {
    fn from_stats(id: CombatantId, kind: CombatantKind, name: String, stats: CombatantStats) -> Self {
        let max_hp = stats.max_hp.max(1);
        Self {
            id,
            kind,
            name,
            hp: max_hp,
            max_hp,
            mana: stats.max_mana.max(0),
            max_mana: stats.max_mana.max(0),
            stamina: stats.max_stamina.max(0),
            max_stamina: stats.max_stamina.max(0),
            initiative: stats.initiative,
            accuracy: stats.accuracy,
            evasion: stats.evasion,
            crit_bonus: stats.crit_bonus,
            base_damage: stats.base_damage,
            level: stats.level,
            death_threshold: 0,
            is_downed: false,
            is_alive: true,
            ability_ids: Vec::new(),
            cooldowns: BTreeMap::new(),
            status_effects: StatusEffects::new(),
        }
    }

    /// A player at full pools. The death threshold is `-constitution`.
    pub fn player(id: CombatantId, name: impl Into<String>, stats: CombatantStats, constitution: i32) -> Self {
        let mut c = Self::from_stats(id, CombatantKind::Player, name.into(), stats);
        c.death_threshold = constitution.max(0).saturating_neg();
        c
    }

    pub fn creature(id: CombatantId, name: impl Into<String>, stats: CombatantStats) -> Self {
        Self::from_stats(id, CombatantKind::Creature, name.into(), stats)
    }

    pub fn with_abilities<I, A>(mut self, abilities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AbilityId>,
    {
        self.ability_ids.extend(abilities.into_iter().map(Into::into));
        self
    }

    pub fn is_player(&self) -> bool {
        self.kind == CombatantKind::Player
    }

    pub fn is_creature(&self) -> bool {
        self.kind == CombatantKind::Creature
    }

    /// Alive, not downed and not stunned.
    pub fn can_act(&self) -> bool {
        self.is_alive && !self.is_downed && !self.status_effects.has(StatusKind::Stun)
    }

    /// `basic_attack` is known to everyone.
    pub fn knows(&self, ability: &AbilityId) -> bool {
        ability.as_str() == BASIC_ATTACK_ID || self.ability_ids.contains(ability)
    }

    /// The lowest hp this combatant can reach.
    pub fn hp_floor(&self) -> i32 {
        match self.kind {
            CombatantKind::Player => self.death_threshold,
            CombatantKind::Creature => 0,
        }
    }

    /// Subtracts `amount` (ignored when ≤ 0) without going below
    /// [`hp_floor`](Self::hp_floor).
    pub fn take_damage(&mut self, amount: i32) -> LifeChange {
        if !self.is_alive || amount <= 0 {
            return LifeChange::Unchanged;
        }
        self.hp = self.hp.saturating_sub(amount).max(self.hp_floor());
        self.refresh_life()
    }

    /// Adds `amount` up to `max_hp`. Returns the hp actually restored.
    /// The dead cannot be healed.
    pub fn heal(&mut self, amount: i32) -> (i32, LifeChange) {
        if !self.is_alive || amount <= 0 {
            return (0, LifeChange::Unchanged);
        }
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount).min(self.max_hp).max(before);
        (self.hp - before, self.refresh_life())
    }

    fn refresh_life(&mut self) -> LifeChange {
        if !self.is_alive {
            return LifeChange::Unchanged;
        }
        let was_downed = self.is_downed;
        if self.hp <= self.hp_floor() {
            self.is_alive = false;
            self.is_downed = false;
            self.status_effects.clear();
            return LifeChange::Died;
        }
        // Only players can get here with hp <= 0.
        self.is_downed = self.hp <= 0;
        match (was_downed, self.is_downed) {
            (false, true) => LifeChange::Downed,
            (true, false) => LifeChange::Revived,
            _ => LifeChange::Unchanged,
        }
    }

    pub fn apply_effect(&mut self, effect: StatusEffect) {
        if self.is_alive {
            self.status_effects.apply(effect);
        }
    }

    pub fn has_effect(&self, kind: StatusKind) -> bool {
        self.status_effects.has(kind)
    }

    /// Runs one status-effect tick. The dead are skipped.
    pub fn tick_effects(&mut self) -> (TickReport, LifeChange) {
        if !self.is_alive {
            return (TickReport::default(), LifeChange::Unchanged);
        }
        let report = self.status_effects.tick(&mut self.hp, self.max_hp);
        (report, self.refresh_life())
    }

    /// Initiative used for turn order; slowed combatants count half.
    pub fn effective_initiative(&self) -> i32 {
        if self.status_effects.has(StatusKind::Slow) {
            self.initiative.div_euclid(2)
        } else {
            self.initiative
        }
    }

    /// Net buff minus debuff on outgoing damage.
    pub fn damage_modifier(&self) -> i32 {
        self.status_effects
            .total(StatusKind::Buff)
            .saturating_sub(self.status_effects.total(StatusKind::Debuff))
    }

    pub fn cooldown(&self, ability: &AbilityId) -> Option<u32> {
        self.cooldowns.get(ability).copied()
    }

    pub fn start_cooldown(&mut self, ability: &AbilityId, rounds: u32) {
        if rounds > 0 {
            self.cooldowns.insert(ability.clone(), rounds);
        }
    }

    /// Decrements every cooldown, dropping the ones that reach zero.
    pub fn tick_cooldowns(&mut self) {
        self.cooldowns.retain(|_, rounds| {
            *rounds = rounds.saturating_sub(1);
            *rounds > 0
        });
    }

    pub fn can_afford(&self, ability: &Ability) -> bool {
        self.mana >= ability.mana_cost && self.stamina >= ability.stamina_cost
    }

    /// Deducts the ability's costs. Returns `false`, touching nothing, if
    /// either pool is short.
    pub fn spend(&mut self, ability: &Ability) -> bool {
        if !self.can_afford(ability) {
            return false;
        }
        self.mana -= ability.mana_cost.max(0);
        self.stamina -= ability.stamina_cost.max(0);
        true
    }

    pub fn snapshot(&self) -> CombatantSnapshot {
        CombatantSnapshot {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            hp: self.hp,
            max_hp: self.max_hp,
            mana: self.mana,
            max_mana: self.max_mana,
            stamina: self.stamina,
            max_stamina: self.max_stamina,
            initiative: self.initiative,
            is_downed: self.is_downed,
            is_alive: self.is_alive,
            status_effects: self.status_effects.names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero(constitution: i32) -> Combatant {
        Combatant::player(
            CombatantId(1),
            "Aria",
            CombatantStats {
                max_hp: 30,
                ..CombatantStats::default()
            },
            constitution,
        )
    }

    fn wolf() -> Combatant {
        Combatant::creature(
            CombatantId(2),
            "Wolf",
            CombatantStats {
                max_hp: 20,
                ..CombatantStats::default()
            },
        )
    }

    #[test]
    fn test_player_is_downed_between_zero_and_threshold() {
        let mut p = hero(10);
        assert_eq!(p.death_threshold, -10);

        assert_eq!(p.take_damage(30), LifeChange::Downed);
        assert_eq!(p.hp, 0);
        assert!(p.is_downed);
        assert!(p.is_alive);

        assert_eq!(p.take_damage(9), LifeChange::Unchanged);
        assert_eq!(p.hp, -9);
        assert!(p.is_alive);
    }

    #[test]
    fn test_player_dies_at_threshold_and_hp_is_floored() {
        let mut p = hero(10);
        assert_eq!(p.take_damage(10_000), LifeChange::Died);
        assert_eq!(p.hp, -10);
        assert!(!p.is_alive);
        assert!(!p.is_downed);

        p.take_damage(50);
        assert_eq!(p.hp, -10);
    }

    #[test]
    fn test_player_without_constitution_dies_at_zero() {
        let mut p = hero(0);
        assert_eq!(p.take_damage(30), LifeChange::Died);
        assert_eq!(p.hp, 0);
    }

    #[test]
    fn test_creature_dies_at_zero() {
        let mut w = wolf();
        assert_eq!(w.take_damage(19), LifeChange::Unchanged);
        assert_eq!(w.take_damage(5), LifeChange::Died);
        assert_eq!(w.hp, 0);
        assert!(!w.is_alive);
    }

    #[test]
    fn test_heal_revives_downed_player_and_caps() {
        let mut p = hero(10);
        p.take_damage(35);
        assert!(p.is_downed);

        let (healed, change) = p.heal(100);
        assert_eq!(change, LifeChange::Revived);
        assert_eq!(healed, 35);
        assert_eq!(p.hp, 30);
        assert!(!p.is_downed);
    }

    #[test]
    fn test_dead_cannot_be_healed() {
        let mut w = wolf();
        w.take_damage(100);
        assert_eq!(w.heal(10), (0, LifeChange::Unchanged));
        assert_eq!(w.hp, 0);
    }

    #[test]
    fn test_death_clears_effects() {
        let mut w = wolf();
        w.apply_effect(StatusEffect {
            name: "poison".into(),
            kind: StatusKind::Dot,
            value: 3,
            remaining_rounds: 3,
            source_id: CombatantId(1),
        });
        w.take_damage(100);
        assert!(w.status_effects.is_empty());
    }

    #[test]
    fn test_cooldowns_are_removed_not_zeroed() {
        let mut p = hero(5);
        let id = AbilityId::from("fireball");
        p.start_cooldown(&id, 2);
        assert_eq!(p.cooldown(&id), Some(2));
        p.tick_cooldowns();
        assert_eq!(p.cooldown(&id), Some(1));
        p.tick_cooldowns();
        assert_eq!(p.cooldown(&id), None);
        assert!(p.cooldowns.is_empty());
    }

    #[test]
    fn test_slow_halves_initiative() {
        let mut w = Combatant::creature(
            CombatantId(3),
            "Slime",
            CombatantStats {
                initiative: 9,
                ..CombatantStats::default()
            },
        );
        assert_eq!(w.effective_initiative(), 9);
        w.apply_effect(StatusEffect {
            name: "frost".into(),
            kind: StatusKind::Slow,
            value: 0,
            remaining_rounds: 2,
            source_id: CombatantId(1),
        });
        assert_eq!(w.effective_initiative(), 4);
    }

    #[test]
    fn test_everyone_knows_basic_attack() {
        let p = hero(1).with_abilities(["fireball"]);
        assert!(p.knows(&AbilityId::from(BASIC_ATTACK_ID)));
        assert!(p.knows(&AbilityId::from("fireball")));
        assert!(!p.knows(&AbilityId::from("smite")));
    }
}
