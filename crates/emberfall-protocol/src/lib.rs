//! Shared vocabulary of the Emberfall combat engine.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Identity** ([`SessionId`], [`CombatantId`], [`LocationId`],
//!   [`AbilityId`]): newtypes so ids of different things never mix.
//! - **Events** ([`CombatEvent`]): the plain messages the engine emits
//!   towards whatever transport sits above it (WebSocket, SSE, polling).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events and session
//!   snapshots become bytes.
//!
//! It knows nothing about rounds, dice, or timers.
//!
//! ```text
//! Engine (scheduler, actors) → Protocol (CombatEvent) → transport (not here)
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ActionReport, CombatEvent, CombatantSnapshot};
pub use types::{AbilityId, CombatantId, CombatantKind, EndReason, LocationId, SessionId};
