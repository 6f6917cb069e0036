//! Error types for the engine layer.

use emberfall_combat::CombatError;
use emberfall_protocol::{CombatantId, LocationId, ProtocolError, SessionId};

/// Errors that can occur while storing or loading session snapshots.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// `create` was called for a session that is already stored.
    #[error("session {0} is already stored")]
    AlreadyExists(SessionId),

    /// The snapshot could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] ProtocolError),

    /// The storage backend failed.
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Errors returned by scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No active session has this id. Ended sessions are dropped from the
    /// active set, so submitting to one lands here too.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The combatant is not in any active session.
    #[error("combatant {0} is not in combat")]
    NotInCombat(CombatantId),

    /// A combatant belongs to at most one session at a time.
    #[error("combatant {combatant} is already in session {session}")]
    AlreadyInCombat {
        combatant: CombatantId,
        session: SessionId,
    },

    /// The same combatant appears twice in one batch.
    #[error("combatant {0} listed twice")]
    DuplicateCombatant(CombatantId),

    /// A fight is already running at this location.
    #[error("location {0} already has session {1}")]
    LocationBusy(LocationId, SessionId),

    /// The session rejected the request.
    #[error(transparent)]
    Combat(#[from] CombatError),

    /// The session actor's command channel is full or closed.
    #[error("session {0} is unavailable")]
    Unavailable(SessionId),
}
