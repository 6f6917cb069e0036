//! Unified error type for the Emberfall engine.

use emberfall_combat::{CatalogError, CombatError};
use emberfall_engine::{EngineError, RepositoryError};
use emberfall_protocol::ProtocolError;
use emberfall_rng::DiceError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `emberfall` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates a `From` impl, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum EmberfallError {
    /// Encoding or decoding an event or snapshot failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Dice(#[from] DiceError),

    /// A combat rule rejected the request (cooldown, resources, target...).
    #[error(transparent)]
    Combat(#[from] CombatError),

    /// The ability catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A scheduler operation failed (no such session, already fighting...).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine configuration could not be parsed.
    #[error("invalid engine configuration: {0}")]
    Config(#[source] serde_json::Error),

    /// The scheduler loop panicked or was cancelled.
    #[error("engine loop failed: {0}")]
    Loop(#[from] tokio::task::JoinError),
}
