//! Queued actions and their resolved results.

use emberfall_protocol::{AbilityId, ActionReport, CombatantId};
use serde::{Deserialize, Serialize};

use crate::StatusEffect;

/// One combatant's intent for the coming round.
///
/// `action_id` is assigned by the session when the action is queued; any
/// value set by the caller is overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatAction {
    #[serde(default)]
    pub action_id: u64,
    pub combatant_id: CombatantId,
    pub ability_id: AbilityId,
    #[serde(default)]
    pub target_id: Option<CombatantId>,
}

impl CombatAction {
    pub fn new(combatant_id: CombatantId, ability_id: impl Into<AbilityId>, target_id: Option<CombatantId>) -> Self {
        Self {
            action_id: 0,
            combatant_id,
            ability_id: ability_id.into(),
            target_id,
        }
    }
}

/// What resolving one action produced, before it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: u64,
    pub success: bool,
    pub damage: i32,
    pub healing: i32,
    pub applied_effects: Vec<StatusEffect>,
    pub message: String,
}

impl ActionResult {
    /// A result that changes nothing.
    pub fn failed(action_id: u64, message: impl Into<String>) -> Self {
        Self {
            action_id,
            success: false,
            damage: 0,
            healing: 0,
            applied_effects: Vec::new(),
            message: message.into(),
        }
    }

    pub fn report(&self, action: &CombatAction) -> ActionReport {
        ActionReport {
            action_id: self.action_id,
            actor_id: action.combatant_id,
            ability_id: action.ability_id.clone(),
            target_id: action.target_id,
            success: self.success,
            damage: self.damage,
            healing: self.healing,
            effects: self.applied_effects.iter().map(|e| e.kind.to_string()).collect(),
            message: self.message.clone(),
        }
    }
}
