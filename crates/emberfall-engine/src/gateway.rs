//! The broadcast gateway: where combat events go.

use emberfall_protocol::CombatEvent;
use tokio::sync::{broadcast, mpsc};

/// Receives every event the engine emits.
///
/// Fire-and-forget: `publish` must not block, and a slow consumer must
/// never hold up round processing. Implementations that talk to the
/// network should queue and return.
pub trait BroadcastGateway: Send + Sync + 'static {
    fn publish(&self, event: CombatEvent);
}

/// Hands events to a single consumer task.
impl BroadcastGateway for mpsc::UnboundedSender<CombatEvent> {
    fn publish(&self, event: CombatEvent) {
        if self.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}

/// Fans events out to any number of subscribers. Lagging subscribers
/// lose the oldest events.
impl BroadcastGateway for broadcast::Sender<CombatEvent> {
    fn publish(&self, event: CombatEvent) {
        // Err only means nobody is subscribed right now.
        let _ = self.send(event);
    }
}
