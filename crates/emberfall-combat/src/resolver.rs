//! Turns one action into an [`ActionResult`] and applies it to a roster.
//!
//! Resolution and application are split so the round processor can hand
//! the resolver immutable borrows of actor and target, then apply the
//! result to the whole roster mutably.

use emberfall_protocol::CombatantId;
use emberfall_rng::{AttackParams, HitResult, roll_attack_with_dice, roll_healing};
use rand::Rng;

use crate::{
    Ability, ActionResult, CombatAction, Combatant, DamageModel, LifeChange, StatusEffect, TargetType,
};

/// Computes the damage, healing and effects of `ability` used by `actor`.
///
/// Nothing is mutated. `target` is the combatant named by the action, if
/// any; `roster` is the whole session, used by area abilities to find out
/// whether anyone is there to hit.
pub fn execute_ability<R: Rng + ?Sized>(
    action: &CombatAction,
    actor: &Combatant,
    ability: &Ability,
    target: Option<&Combatant>,
    roster: &[Combatant],
    rng: &mut R,
) -> ActionResult {
    let needs_target = matches!(
        ability.target_type,
        TargetType::SingleEnemy | TargetType::SingleAlly
    );
    if needs_target && target.is_none() {
        return ActionResult::failed(
            action.action_id,
            format!("{} has no target for {}", actor.name, ability.id),
        );
    }

    let healing_ability = ability.is_healing();
    let target_present = match ability.target_type {
        TargetType::Area => roster.iter().any(|c| c.is_alive && c.kind != actor.kind),
        _ => target.is_some_and(|t| t.is_alive),
    };

    let mut tier = None;
    let damage = if !healing_ability && ability.base_damage > 0 && target_present {
        match ability.damage_model {
            DamageModel::Formula => ability
                .base_damage
                .saturating_add(actor.initiative.div_euclid(2))
                .max(1),
            DamageModel::Rolled => {
                let (evasion, defender_level) = target.map_or((0, actor.level), |t| (t.evasion, t.level));
                let roll = roll_attack_with_dice(
                    rng,
                    ability.damage_dice.as_deref(),
                    &AttackParams {
                        base_damage: ability.base_damage,
                        accuracy: actor.accuracy,
                        evasion,
                        attacker_level: actor.level,
                        defender_level,
                        crit_bonus: actor.crit_bonus,
                    },
                );
                tier = Some(roll.hit);
                roll.damage
            }
        }
    } else {
        0
    };
    let damage = if damage > 0 {
        damage.saturating_add(actor.damage_modifier()).max(1)
    } else {
        0
    };

    let healing = if healing_ability {
        match ability.damage_model {
            DamageModel::Formula if ability.base_damage > 0 => ability
                .base_damage
                .saturating_add(actor.initiative.div_euclid(4))
                .max(0),
            DamageModel::Formula => 0,
            DamageModel::Rolled => roll_healing(rng, ability.base_damage, actor.crit_bonus).0,
        }
    } else {
        0
    };

    let missed = tier.is_some_and(HitResult::is_miss);
    let applied_effects = if missed {
        Vec::new()
    } else {
        ability
            .status_kinds()
            .map(|kind| StatusEffect {
                name: ability.id.to_string(),
                kind,
                value: ability.effect_magnitude(),
                remaining_rounds: ability.effect_duration(),
                source_id: actor.id,
            })
            .collect()
    };

    let target_name = match ability.target_type {
        TargetType::Area => "every foe",
        TargetType::AllAllies => "every ally",
        _ => target.map_or(actor.name.as_str(), |t| t.name.as_str()),
    };
    let message = if missed {
        format!("{}'s {} misses {}", actor.name, ability.id, target_name)
    } else if damage > 0 {
        let suffix = match tier {
            Some(HitResult::Critical) => " (critical)",
            Some(HitResult::Glancing) => " (glancing)",
            _ => "",
        };
        format!(
            "{} hits {} with {} for {}{}",
            actor.name, target_name, ability.id, damage, suffix
        )
    } else if healing > 0 {
        format!("{}'s {} restores {} hp", actor.name, ability.id, healing)
    } else {
        format!("{} uses {}", actor.name, ability.id)
    };

    tracing::trace!(
        action_id = action.action_id,
        actor = %actor.id,
        ability = %ability.id,
        damage,
        healing,
        effects = applied_effects.len(),
        "ability resolved"
    );

    ActionResult {
        action_id: action.action_id,
        success: !missed,
        damage,
        healing,
        applied_effects,
        message,
    }
}

/// Applies `result` to `roster` and starts the ability's cooldown on the
/// actor. Returns every life-state change it caused.
///
/// - damage lands on the target, or on every living opponent for `area`
/// - healing lands on the actor when the ability is self-targeted or the
///   action names no target, on every living ally for `all_allies`, and
///   on the target otherwise
/// - effects land on the actor for self-targeted abilities, fan out like
///   damage or healing for `area`/`all_allies`, and go to the target
///   otherwise
pub fn apply_result(
    roster: &mut [Combatant],
    action: &CombatAction,
    ability: &Ability,
    result: &ActionResult,
) -> Vec<(CombatantId, LifeChange)> {
    let mut changes = Vec::new();
    let Some(actor) = roster.iter().position(|c| c.id == action.combatant_id) else {
        return changes;
    };
    let actor_kind = roster[actor].kind;
    let target = action
        .target_id
        .and_then(|id| roster.iter().position(|c| c.id == id));
    let living = |same_side: bool| -> Vec<usize> {
        roster
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_alive && (c.kind == actor_kind) == same_side)
            .map(|(i, _)| i)
            .collect()
    };
    let opponents = living(false);
    let allies = living(true);

    let damaged: Vec<usize> = match ability.target_type {
        TargetType::Area => opponents.clone(),
        _ => target.into_iter().collect(),
    };
    let healed: Vec<usize> = match ability.target_type {
        TargetType::AllAllies => allies.clone(),
        TargetType::SelfOnly => vec![actor],
        _ => vec![target.unwrap_or(actor)],
    };
    let affected: Vec<usize> = match ability.target_type {
        TargetType::SelfOnly => vec![actor],
        TargetType::AllAllies => allies,
        TargetType::Area => opponents,
        _ => target.into_iter().collect(),
    };

    if result.damage > 0 {
        for &i in &damaged {
            let change = roster[i].take_damage(result.damage);
            if change != LifeChange::Unchanged {
                changes.push((roster[i].id, change));
            }
        }
    }
    if result.healing > 0 {
        for &i in &healed {
            let (_, change) = roster[i].heal(result.healing);
            if change != LifeChange::Unchanged {
                changes.push((roster[i].id, change));
            }
        }
    }
    for &i in &affected {
        for effect in &result.applied_effects {
            roster[i].apply_effect(effect.clone());
        }
    }

    if let Some(rounds) = ability.cooldown() {
        roster[actor].start_cooldown(&ability.id, rounds);
    }

    changes
}
