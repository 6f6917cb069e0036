//! Identity types and small enums shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Unique identifier of a combat session.
///
/// `#[serde(transparent)]` keeps the wire form a bare number: `SessionId(7)`
/// serializes as `7`, not `{ "0": 7 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Identifier of a player or creature taking part in combat.
///
/// Players and creatures share one id space; the session layer above
/// the engine is responsible for handing out non-colliding ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(pub u64);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A location in the world. Sessions are keyed by where the fight happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub u64);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L-{}", self.0)
    }
}

/// Catalog key of an ability, e.g. `"fireball"`.
///
/// Unlike the numeric ids this one is a string: ability ids are authored
/// content, not allocated at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(pub String);

impl AbilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbilityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// CombatantKind
// ---------------------------------------------------------------------------

/// Which side of the fight a combatant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombatantKind {
    Player,
    Creature,
}

impl fmt::Display for CombatantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "PLAYER"),
            Self::Creature => write!(f, "CREATURE"),
        }
    }
}

// ---------------------------------------------------------------------------
// EndReason
// ---------------------------------------------------------------------------

/// Why a session ended. Only ever set on a session in the `Ended` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    /// No player is left standing (or none ever joined).
    AllPlayersDefeated,
    /// Every creature that joined is dead.
    AllEnemiesDefeated,
    /// The round cap was reached, or there was never anything to fight.
    Timeout,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllPlayersDefeated => write!(f, "ALL_PLAYERS_DEFEATED"),
            Self::AllEnemiesDefeated => write!(f, "ALL_ENEMIES_DEFEATED"),
            Self::Timeout => write!(f, "TIMEOUT"),
        }
    }
}
