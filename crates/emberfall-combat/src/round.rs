//! The round processor.

use std::cmp::Reverse;

use emberfall_protocol::{ActionReport, CombatantId, EndReason};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    AbilityCatalog, ActionResult, BASIC_ATTACK_ID, CombatAction, CombatError, CombatSession, LifeChange,
    ability_for, apply_result, evaluate_end, execute_ability,
};

/// Round limits, taken from the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    pub max_combat_rounds: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            max_combat_rounds: 50,
        }
    }
}

/// An action together with what it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    pub action: CombatAction,
    pub result: ActionResult,
}

/// Everything that happened in one processed round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    /// The number of the round that was processed (the session has moved
    /// on to the next one).
    pub round_number: u32,
    /// In execution order. Actions of combatants that were dead by their
    /// turn are absent.
    pub resolved: Vec<ResolvedAction>,
    pub downed: Vec<CombatantId>,
    pub revived: Vec<CombatantId>,
    /// Players whose hp reached their death threshold.
    pub player_deaths: Vec<CombatantId>,
    pub creature_deaths: Vec<CombatantId>,
    pub end_reason: Option<EndReason>,
}

impl RoundOutcome {
    pub fn reports(&self) -> Vec<ActionReport> {
        self.resolved
            .iter()
            .map(|r| r.result.report(&r.action))
            .collect()
    }

    fn record(&mut self, session: &CombatSession, id: CombatantId, change: LifeChange) {
        let is_player = session.combatant(id).is_some_and(|c| c.is_player());
        match change {
            LifeChange::Unchanged => {}
            LifeChange::Downed => self.downed.push(id),
            LifeChange::Revived => self.revived.push(id),
            LifeChange::Died if is_player => self.player_deaths.push(id),
            LifeChange::Died => self.creature_deaths.push(id),
        }
    }
}

/// Processes one round of an active session.
///
/// 1. Living creatures without a queued action get a basic attack on a
///    random living player.
/// 2. Queued and synthesized actions run in descending initiative, ties
///    in queue order. Dead actors are skipped; downed or stunned actors
///    lose their turn.
/// 3. Status effects tick on everyone, then cooldowns count down.
/// 4. The round counter advances, the next round opens at `now_ms` and
///    the queue is cleared.
/// 5. End conditions are evaluated and the session ends if one holds.
///
/// # Errors
/// [`CombatError::NotActive`] unless the session is active. Nothing in a
/// round itself fails: bad actions turn into no-ops.
pub fn process_round<R: Rng + ?Sized>(
    session: &mut CombatSession,
    catalog: &dyn AbilityCatalog,
    config: &RoundConfig,
    now_ms: u64,
    rng: &mut R,
) -> Result<RoundOutcome, CombatError> {
    if !session.state.is_active() {
        return Err(CombatError::NotActive(session.id));
    }
    let mut outcome = RoundOutcome {
        round_number: session.current_round,
        ..RoundOutcome::default()
    };

    let mut actions = std::mem::take(&mut session.pending_actions);
    synthesize_creature_attacks(session, &mut actions, rng);

    // Stable sort: equal initiative keeps queue order.
    actions.sort_by_key(|a| {
        Reverse(
            session
                .combatant(a.combatant_id)
                .map_or(i32::MIN, |c| c.effective_initiative()),
        )
    });

    for action in actions {
        let Some(actor) = session.combatant(action.combatant_id) else {
            tracing::warn!(session_id = %session.id, combatant_id = %action.combatant_id, "action from unknown combatant dropped");
            continue;
        };
        if !actor.is_alive {
            tracing::trace!(session_id = %session.id, combatant_id = %actor.id, "actor dead, skipping");
            continue;
        }
        if !actor.can_act() {
            let message = format!("{} cannot act", actor.name);
            outcome.resolved.push(ResolvedAction {
                result: ActionResult::failed(action.action_id, message),
                action,
            });
            continue;
        }
        let Some(ability) = ability_for(catalog, actor, &action.ability_id) else {
            tracing::warn!(
                session_id = %session.id,
                combatant_id = %actor.id,
                ability = %action.ability_id,
                "unknown ability, action dropped"
            );
            continue;
        };
        if !actor.can_afford(&ability) {
            let message = format!("{} lacks the resources for {}", actor.name, ability.id);
            outcome.resolved.push(ResolvedAction {
                result: ActionResult::failed(action.action_id, message),
                action,
            });
            continue;
        }

        let target = action.target_id.and_then(|t| session.combatant(t));
        let result = if action.target_id.is_some() && !target.is_some_and(|t| t.is_alive) {
            ActionResult::failed(
                action.action_id,
                format!("{}'s target is gone", actor.name),
            )
        } else {
            execute_ability(&action, actor, &ability, target, &session.combatants, rng)
        };

        if let Some(actor) = session.combatant_mut(action.combatant_id) {
            actor.spend(&ability);
        }
        for (id, change) in apply_result(&mut session.combatants, &action, &ability, &result) {
            outcome.record(session, id, change);
        }
        outcome.resolved.push(ResolvedAction { action, result });
    }

    let mut changes = Vec::new();
    for combatant in &mut session.combatants {
        let (_, change) = combatant.tick_effects();
        changes.push((combatant.id, change));
        combatant.tick_cooldowns();
    }
    for (id, change) in changes {
        outcome.record(session, id, change);
    }

    session.current_round += 1;
    session.round_start_ms = now_ms;
    session.pending_actions.clear();

    if let Some(reason) = evaluate_end(session, config.max_combat_rounds) {
        session.end(reason)?;
        outcome.end_reason = Some(reason);
    }

    tracing::debug!(
        session_id = %session.id,
        round = outcome.round_number,
        actions = outcome.resolved.len(),
        ended = outcome.end_reason.is_some(),
        "round processed"
    );
    Ok(outcome)
}

fn synthesize_creature_attacks<R: Rng + ?Sized>(
    session: &mut CombatSession,
    actions: &mut Vec<CombatAction>,
    rng: &mut R,
) {
    let living_players: Vec<CombatantId> = session
        .players()
        .filter(|p| p.is_alive)
        .map(|p| p.id)
        .collect();
    if living_players.is_empty() {
        return;
    }
    let idle: Vec<CombatantId> = session
        .creatures()
        .filter(|c| c.is_alive && !actions.iter().any(|a| a.combatant_id == c.id))
        .map(|c| c.id)
        .collect();

    for creature in idle {
        let target = living_players[rng.random_range(0..living_players.len())];
        let mut action = CombatAction::new(creature, BASIC_ATTACK_ID, Some(target));
        action.action_id = session.next_action_id();
        actions.push(action);
    }
}
