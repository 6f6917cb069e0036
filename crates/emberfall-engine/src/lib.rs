//! Scheduling and I/O around the combat rules.
//!
//! Every combat session runs in its own Tokio task (actor model): it owns
//! its [`CombatSession`](emberfall_combat::CombatSession) and its random
//! generator, and nothing else ever touches them. The [`CombatScheduler`]
//! keeps the active-session set, routes joins and submitted actions to the
//! right actor, and ticks every actor at a fixed cadence.
//!
//! # Key types
//!
//! - [`CombatScheduler`]: active sessions, location/combatant indexes, tick loop
//! - [`SessionHandle`]: send commands to a running session actor
//! - [`EngineConfig`]: round duration, round cap, tick cadence, seeding
//! - [`SessionRepository`] / [`BroadcastGateway`] / [`DeathHandler`]:
//!   the collaborators the engine is injected with

#![allow(async_fn_in_trait)]

mod config;
mod death;
mod error;
mod gateway;
mod repository;
mod scheduler;
mod session_actor;

pub use config::EngineConfig;
pub use death::{DeathHandler, PlayerDeath};
pub use error::{EngineError, RepositoryError};
pub use gateway::BroadcastGateway;
pub use repository::{InMemorySessionRepository, SessionRepository};
pub use scheduler::CombatScheduler;
pub use session_actor::SessionHandle;
