//! The death handler: what happens to a player who dies in combat.

use emberfall_protocol::{CombatantId, LocationId, SessionId};
use tokio::sync::mpsc;

/// A player reached their death threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDeath {
    pub session_id: SessionId,
    /// Where the fight took place, and where the inventory drops.
    pub location_id: LocationId,
    pub player_id: CombatantId,
    pub name: String,
}

/// Carries out the consequences of a player's death: drop inventory at
/// the location, zero gold, teleport home, heal to full.
///
/// Called on a spawned task, never inside round processing, so a slow
/// handler cannot stall the session.
pub trait DeathHandler: Send + Sync + 'static {
    fn on_player_death(&self, death: PlayerDeath) -> impl std::future::Future<Output = ()> + Send;
}

/// Forwards deaths to a consumer task.
impl DeathHandler for mpsc::UnboundedSender<PlayerDeath> {
    async fn on_player_death(&self, death: PlayerDeath) {
        if self.send(death).is_err() {
            tracing::warn!("death receiver dropped");
        }
    }
}
