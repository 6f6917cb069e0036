//! # Emberfall
//!
//! Persistent turn-based combat for MUD-style games.
//!
//! Players and creatures meet in a combat session bound to a location.
//! Each round lasts a fixed wall-clock time; actions queued during the
//! round resolve together in initiative order when it ends. Sessions are
//! stored after every change, so a fight survives a restart.
//!
//! This crate re-exports the layers and wires them together:
//!
//! - `emberfall-protocol`: ids, outbound [`CombatEvent`](prelude::CombatEvent)s, codecs
//! - `emberfall-rng`: hit, crit, damage and dice rolls
//! - `emberfall-combat`: the rules, pure and synchronous
//! - `emberfall-engine`: the scheduler and per-session actors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use emberfall::prelude::*;
//! use tokio::sync::mpsc;
//!
//! # async fn fight() -> Result<(), EmberfallError> {
//! let (events, mut events_rx) = mpsc::unbounded_channel::<CombatEvent>();
//! let (deaths, _deaths_rx) = mpsc::unbounded_channel::<PlayerDeath>();
//! let engine = EngineBuilder::new().build(InMemorySessionRepository::new(), events, deaths);
//!
//! let hero = Combatant::player(CombatantId(1), "Hero", CombatantStats::default(), 10);
//! let rat = Combatant::creature(CombatantId(2), "Rat", CombatantStats::default());
//! engine.scheduler().engage(LocationId(1), [hero, rat]).await?;
//! engine
//!     .scheduler()
//!     .submit_action(CombatAction::new(CombatantId(1), "basic_attack", Some(CombatantId(2))))
//!     .await?;
//!
//! while let Some(event) = events_rx.recv().await {
//!     if matches!(event, CombatEvent::CombatEnded { .. }) {
//!         break;
//!     }
//! }
//! engine.shutdown().await
//! # }
//! ```

mod builder;
mod error;

pub use builder::{Engine, EngineBuilder};
pub use error::EmberfallError;

pub use emberfall_combat as combat;
pub use emberfall_engine as engine;
pub use emberfall_protocol as protocol;
pub use emberfall_rng as rng;
pub use emberfall_tick as tick;

/// The types most callers need.
pub mod prelude {
    pub use crate::{EmberfallError, Engine, EngineBuilder};
    pub use emberfall_combat::{
        Ability, AbilityCatalog, AbilityType, CombatAction, CombatSession, Combatant,
        CombatantStats, EffectKind, InMemoryCatalog, SessionState, TargetType,
    };
    pub use emberfall_engine::{
        BroadcastGateway, CombatScheduler, DeathHandler, EngineConfig, InMemorySessionRepository,
        PlayerDeath, SessionRepository,
    };
    pub use emberfall_protocol::{
        AbilityId, Codec, CombatEvent, CombatantId, EndReason, JsonCodec, LocationId, SessionId,
    };
    pub use emberfall_tick::TickConfig;
}
