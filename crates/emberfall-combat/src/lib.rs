//! The combat rules of Emberfall.
//!
//! Everything here is synchronous and free of I/O: a [`CombatSession`] is a
//! plain value, and [`process_round`] advances it by exactly one round given
//! an ability catalog, the current time and a random generator. The engine
//! crate wraps this in actors and timers; tests drive it directly.
//!
//! # Key types
//!
//! - [`Combatant`]: a player or creature with pools, cooldowns, effects
//! - [`Ability`] / [`AbilityCatalog`]: read-only ability data
//! - [`StatusEffects`]: timed dot/hot/buff/debuff/stun/root/slow
//! - [`execute_ability`] / [`apply_result`]: the action resolver
//! - [`CombatSession`] / [`SessionState`]: lifecycle and action queue
//! - [`process_round`]: one full round, end conditions included

mod ability;
mod action;
mod catalog;
mod combatant;
mod effects;
mod end;
mod error;
mod resolver;
mod round;
mod session;

pub use ability::{
    Ability, AbilityType, BASIC_ATTACK_ID, CooldownType, DEFAULT_EFFECT_DURATION, DamageModel,
    EffectKind, TargetType,
};
pub use action::{ActionResult, CombatAction};
pub use catalog::{AbilityCatalog, InMemoryCatalog, ability_for};
pub use combatant::{Combatant, CombatantStats, LifeChange};
pub use effects::{StatusEffect, StatusEffects, StatusKind, TickReport};
pub use end::{evaluate_end, standings};
pub use error::{CatalogError, CombatError};
pub use resolver::{apply_result, execute_ability};
pub use round::{ResolvedAction, RoundConfig, RoundOutcome, process_round};
pub use session::{CombatSession, SessionState};

pub use emberfall_protocol::{AbilityId, CombatantId, CombatantKind, EndReason, LocationId, SessionId};
