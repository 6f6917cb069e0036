//! Ability data as authored in the catalog.

use std::collections::BTreeSet;

use emberfall_protocol::AbilityId;
use serde::{Deserialize, Serialize};

use crate::effects::StatusKind;

/// Id of the attack every combatant knows without learning it.
pub const BASIC_ATTACK_ID: &str = "basic_attack";

/// Duration given to status effects of abilities that leave
/// `duration_rounds` at 0.
pub const DEFAULT_EFFECT_DURATION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityType {
    #[default]
    Attack,
    Spell,
    Skill,
    Utility,
}

/// Who an ability lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[serde(rename = "self")]
    SelfOnly,
    #[default]
    SingleEnemy,
    SingleAlly,
    /// Every living opponent of the actor.
    Area,
    /// Every living ally of the actor, the actor included.
    AllAllies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownType {
    None,
    #[default]
    Rounds,
}

/// How damage and healing amounts are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageModel {
    /// Deterministic: damage `base + initiative/2`, healing
    /// `base + initiative/4`.
    #[default]
    Formula,
    /// Hit/crit/glancing rolls with variance, dice when present.
    Rolled,
}

/// The closed set of effect tokens an ability may carry.
///
/// Unknown tokens fail deserialization, so a loaded catalog never holds
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Damage,
    Heal,
    Hot,
    Dot,
    Buff,
    Debuff,
    Stun,
    Root,
    Slow,
}

impl EffectKind {
    /// The status effect this token leaves behind, if any.
    pub fn status_kind(self) -> Option<StatusKind> {
        match self {
            Self::Damage | Self::Heal => None,
            Self::Hot => Some(StatusKind::Hot),
            Self::Dot => Some(StatusKind::Dot),
            Self::Buff => Some(StatusKind::Buff),
            Self::Debuff => Some(StatusKind::Debuff),
            Self::Stun => Some(StatusKind::Stun),
            Self::Root => Some(StatusKind::Root),
            Self::Slow => Some(StatusKind::Slow),
        }
    }
}

/// An ability. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub ability_type: AbilityType,
    #[serde(default)]
    pub target_type: TargetType,
    #[serde(default)]
    pub range: u32,
    #[serde(default)]
    pub cooldown_type: CooldownType,
    #[serde(default)]
    pub cooldown_rounds: u32,
    #[serde(default)]
    pub base_damage: i32,
    /// `XdY+Z`, used by the rolled model.
    #[serde(default)]
    pub damage_dice: Option<String>,
    #[serde(default)]
    pub duration_rounds: u32,
    /// Per-tick magnitude of applied status effects.
    #[serde(default)]
    pub effect_value: Option<i32>,
    #[serde(default)]
    pub mana_cost: i32,
    #[serde(default)]
    pub stamina_cost: i32,
    #[serde(default)]
    pub effects: BTreeSet<EffectKind>,
    #[serde(default)]
    pub damage_model: DamageModel,
}

impl Ability {
    /// A bare single-target attack with no cost, cooldown or effects.
    pub fn new(id: impl Into<String>, base_damage: i32) -> Self {
        Self {
            id: AbilityId::new(id),
            class_id: None,
            ability_type: AbilityType::Attack,
            target_type: TargetType::SingleEnemy,
            range: 0,
            cooldown_type: CooldownType::Rounds,
            cooldown_rounds: 0,
            base_damage,
            damage_dice: None,
            duration_rounds: 0,
            effect_value: None,
            mana_cost: 0,
            stamina_cost: 0,
            effects: BTreeSet::from([EffectKind::Damage]),
            damage_model: DamageModel::Formula,
        }
    }

    /// The built-in attack, scaled to the attacker's `base_damage`.
    pub fn basic_attack(base_damage: i32) -> Self {
        Self::new(BASIC_ATTACK_ID, base_damage)
    }

    pub fn is_basic_attack(&self) -> bool {
        self.id.as_str() == BASIC_ATTACK_ID
    }

    /// Healing abilities restore hp instead of dealing damage.
    pub fn is_healing(&self) -> bool {
        self.effects.contains(&EffectKind::Heal) || self.effects.contains(&EffectKind::Hot)
    }

    pub fn is_self_targeted(&self) -> bool {
        self.target_type == TargetType::SelfOnly
    }

    /// Rounds of cooldown to start after use, if any.
    pub fn cooldown(&self) -> Option<u32> {
        match self.cooldown_type {
            CooldownType::Rounds if self.cooldown_rounds > 0 => Some(self.cooldown_rounds),
            _ => None,
        }
    }

    /// Status effect kinds this ability applies, in a stable order.
    pub fn status_kinds(&self) -> impl Iterator<Item = StatusKind> + '_ {
        self.effects.iter().filter_map(|e| e.status_kind())
    }

    pub fn effect_duration(&self) -> u32 {
        if self.duration_rounds == 0 {
            DEFAULT_EFFECT_DURATION
        } else {
            self.duration_rounds
        }
    }

    pub fn effect_magnitude(&self) -> i32 {
        self.effect_value.unwrap_or(self.base_damage)
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = EffectKind>) -> Self {
        self.effects = effects.into_iter().collect();
        self
    }

    pub fn with_target(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    pub fn with_cooldown(mut self, rounds: u32) -> Self {
        self.cooldown_type = CooldownType::Rounds;
        self.cooldown_rounds = rounds;
        self
    }

    pub fn with_costs(mut self, mana: i32, stamina: i32) -> Self {
        self.mana_cost = mana;
        self.stamina_cost = stamina;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_fills_defaults() {
        let a: Ability = serde_json::from_str(r#"{ "id": "slash", "base_damage": 6 }"#).unwrap();
        assert_eq!(a.target_type, TargetType::SingleEnemy);
        assert_eq!(a.damage_model, DamageModel::Formula);
        assert_eq!(a.cooldown(), None);
        assert!(a.effects.is_empty());
        assert_eq!(a.effect_magnitude(), 6);
        assert_eq!(a.effect_duration(), DEFAULT_EFFECT_DURATION);
    }

    #[test]
    fn test_self_target_token() {
        let a: Ability =
            serde_json::from_str(r#"{ "id": "meditate", "target_type": "self", "effects": ["hot"] }"#)
                .unwrap();
        assert!(a.is_self_targeted());
        assert!(a.is_healing());
    }

    #[test]
    fn test_unknown_effect_token_is_rejected() {
        let res: Result<Ability, _> =
            serde_json::from_str(r#"{ "id": "weird", "effects": ["damage", "petrify"] }"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_cooldown_type_none_disables_cooldown() {
        let mut a = Ability::new("jab", 2).with_cooldown(4);
        assert_eq!(a.cooldown(), Some(4));
        a.cooldown_type = CooldownType::None;
        assert_eq!(a.cooldown(), None);
    }

    #[test]
    fn test_status_kinds_skip_instant_effects() {
        let a = Ability::new("venom_strike", 4).with_effects([
            EffectKind::Damage,
            EffectKind::Dot,
            EffectKind::Slow,
        ]);
        let kinds: Vec<_> = a.status_kinds().collect();
        assert_eq!(kinds, vec![StatusKind::Dot, StatusKind::Slow]);
        assert!(!a.is_healing());
    }
}
