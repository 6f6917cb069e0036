//! Error types for the combat layer.

use emberfall_protocol::{AbilityId, CombatantId, SessionId};
use emberfall_rng::DiceError;

use crate::SessionState;

/// Why an operation on a session was rejected.
///
/// Submission errors are returned to whoever submitted the action; none of
/// them ever stop a round from being processed.
#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    /// The session already reached an end condition.
    #[error("session {0} has ended")]
    SessionEnded(SessionId),

    /// Rounds can only be processed while the session is active.
    #[error("session {0} is not active")]
    NotActive(SessionId),

    #[error("combatant {0} is not in session {1}")]
    CombatantNotFound(CombatantId, SessionId),

    /// A combatant belongs to at most one session at a time.
    #[error("combatant {0} is already in session {1}")]
    AlreadyInSession(CombatantId, SessionId),

    /// Dead or downed combatants cannot queue actions.
    #[error("combatant {0} cannot act")]
    Incapacitated(CombatantId),

    #[error("combatant {combatant} does not know ability {ability}")]
    AbilityNotKnown {
        combatant: CombatantId,
        ability: AbilityId,
    },

    /// The ability id is not in the catalog.
    #[error("unknown ability {0}")]
    UnknownAbility(AbilityId),

    #[error("ability {ability} is on cooldown for {rounds} more round(s)")]
    OnCooldown { ability: AbilityId, rounds: u32 },

    #[error("not enough mana: need {needed}, have {available}")]
    InsufficientMana { needed: i32, available: i32 },

    #[error("not enough stamina: need {needed}, have {available}")]
    InsufficientStamina { needed: i32, available: i32 },

    #[error("target {0} is not in this session")]
    TargetNotFound(CombatantId),

    /// Session state only moves forward: Waiting → Active → Ended.
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

/// Why an ability catalog could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Malformed JSON, or an effect token outside the known set.
    #[error("catalog parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("ability {ability} has an invalid damage formula")]
    InvalidDice {
        ability: AbilityId,
        #[source]
        source: DiceError,
    },

    #[error("ability {0} is defined twice")]
    Duplicate(AbilityId),

    #[error("ability {ability} is invalid: {reason}")]
    Invalid { ability: AbilityId, reason: String },
}
