//! Outbound events: what the engine tells the outside world.
//!
//! The engine emits these as plain values onto a gateway. Whether they end
//! up on a WebSocket, an SSE stream or a polling endpoint is decided by
//! whoever implements the gateway; nothing here depends on a transport.

use serde::{Deserialize, Serialize};

use crate::{AbilityId, CombatantId, CombatantKind, EndReason, SessionId};

/// A point-in-time view of one combatant, as shown to clients.
///
/// Deliberately flat: clients render it directly and should not need to
/// understand the engine's internal model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
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
    pub is_downed: bool,
    pub is_alive: bool,
    /// Names of the status effects currently active, in application order.
    #[serde(default)]
    pub status_effects: Vec<String>,
}

/// One resolved action inside a round, as it goes into the combat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub action_id: u64,
    pub actor_id: CombatantId,
    pub ability_id: AbilityId,
    pub target_id: Option<CombatantId>,
    pub success: bool,
    pub damage: i32,
    pub healing: i32,
    /// Kinds of the status effects this action applied, e.g. `"dot"`.
    #[serde(default)]
    pub effects: Vec<String>,
    pub message: String,
}

/// Messages the engine publishes to its broadcast gateway.
///
/// `#[serde(tag = "type")]` gives internally tagged JSON, which is the
/// easiest shape for a JavaScript client to switch on:
///
/// ```text
/// { "type": "RoundStart", "session_id": 1, "round_number": 3, ... }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CombatEvent {
    /// A round is open for actions. Sent when a session activates (round 0)
    /// and after every processed round. After the round that ended the
    /// fight it carries the final combatant state and is followed by
    /// `CombatEnded`; that round never opens.
    RoundStart {
        session_id: SessionId,
        round_number: u32,
        round_duration_ms: u64,
        combatants: Vec<CombatantSnapshot>,
    },

    /// The log of a round that was just processed, in execution order.
    RoundResolved {
        session_id: SessionId,
        round_number: u32,
        actions: Vec<ActionReport>,
    },

    /// The session reached an end condition.
    CombatEnded {
        session_id: SessionId,
        reason: EndReason,
        victors: Vec<CombatantId>,
        defeated: Vec<CombatantId>,
    },
}

impl CombatEvent {
    /// The session this event belongs to.
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::RoundStart { session_id, .. }
            | Self::RoundResolved { session_id, .. }
            | Self::CombatEnded { session_id, .. } => *session_id,
        }
    }
}
