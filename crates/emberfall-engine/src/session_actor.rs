//! Session actor: an isolated Tokio task that owns one combat session.
//!
//! All mutation of a session happens inside its actor, one command at a
//! time, so a round is never interleaved with a join or a submission.
//! The outside world talks to it through a [`SessionHandle`].

use std::sync::Arc;

use emberfall_combat::{
    AbilityCatalog, CombatAction, CombatError, CombatSession, Combatant, RoundOutcome, process_round,
    standings,
};
use emberfall_protocol::{CombatEvent, LocationId, SessionId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::{
    BroadcastGateway, DeathHandler, EngineConfig, EngineError, PlayerDeath, SessionRepository,
};

/// Collaborators shared by the scheduler and every actor.
pub(crate) struct Services<R, G, D> {
    pub(crate) catalog: Arc<dyn AbilityCatalog>,
    pub(crate) repository: R,
    pub(crate) gateway: G,
    pub(crate) death: D,
    pub(crate) config: EngineConfig,
}

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    /// A scheduler tick. Runs a round if the round timer has elapsed.
    Tick { now_ms: u64 },

    /// Adds a batch of combatants, all or none.
    Join {
        combatants: Vec<Combatant>,
        now_ms: u64,
        reply: oneshot::Sender<Result<bool, CombatError>>,
    },

    Submit {
        action: CombatAction,
        reply: oneshot::Sender<Result<u64, CombatError>>,
    },

    /// A copy of the current session state.
    Snapshot {
        reply: oneshot::Sender<CombatSession>,
    },

    Shutdown,
}

/// Handle to a running session actor.
///
/// Cheap to clone: it is just an `mpsc::Sender` wrapper.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    location_id: LocationId,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    /// Adds combatants, all or none. Returns `true` if this activated
    /// the session.
    pub async fn join(&self, combatants: Vec<Combatant>, now_ms: u64) -> Result<bool, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Join {
            combatants,
            now_ms,
            reply,
        })
        .await?;
        let activated = rx.await.map_err(|_| self.unavailable())??;
        Ok(activated)
    }

    /// Queues an action. Returns the assigned action id.
    pub async fn submit(&self, action: CombatAction) -> Result<u64, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Submit { action, reply }).await?;
        let action_id = rx.await.map_err(|_| self.unavailable())??;
        Ok(action_id)
    }

    pub async fn snapshot(&self) -> Result<CombatSession, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Delivers a tick without waiting. Returns `false` if the actor's
    /// queue is full or the actor is gone; the tick is then lost, and the
    /// next one catches up because rounds run off the elapsed time.
    pub fn tick(&self, now_ms: u64) -> bool {
        self.sender
            .try_send(SessionCommand::Tick { now_ms })
            .is_ok()
    }

    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), EngineError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> EngineError {
        EngineError::Unavailable(self.session_id)
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor<R, G, D> {
    session: CombatSession,
    services: Arc<Services<R, G, D>>,
    rng: StdRng,
    /// The stored snapshot is behind the in-memory session.
    dirty: bool,
    receiver: mpsc::Receiver<SessionCommand>,
    /// Tells the scheduler this session ended and was stored.
    ended: mpsc::UnboundedSender<SessionId>,
}

impl<R, G, D> SessionActor<R, G, D>
where
    R: SessionRepository,
    G: BroadcastGateway,
    D: DeathHandler,
{
    async fn run(mut self) {
        tracing::info!(session_id = %self.session.id, location_id = %self.session.location_id, "session actor started");
        self.commit().await;

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                SessionCommand::Tick { now_ms } => {
                    self.handle_tick(now_ms).await;
                    if self.session.state.is_ended() && !self.dirty {
                        let _ = self.ended.send(self.session.id);
                        break;
                    }
                }
                SessionCommand::Join {
                    combatants,
                    now_ms,
                    reply,
                } => {
                    let result = self.handle_join(combatants, now_ms).await;
                    let _ = reply.send(result);
                }
                SessionCommand::Submit { action, reply } => {
                    let result = self
                        .session
                        .queue_action(action, self.services.catalog.as_ref());
                    if result.is_ok() {
                        self.dirty = true;
                    }
                    let _ = reply.send(result);
                }
                SessionCommand::Snapshot { reply } => {
                    let _ = reply.send(self.session.clone());
                }
                SessionCommand::Shutdown => {
                    tracing::info!(session_id = %self.session.id, "session shutting down");
                    if self.dirty {
                        self.commit().await;
                    }
                    break;
                }
            }
        }

        tracing::info!(session_id = %self.session.id, "session actor stopped");
    }

    async fn handle_join(&mut self, combatants: Vec<Combatant>, now_ms: u64) -> Result<bool, CombatError> {
        let activated = self.session.add_combatants(combatants, now_ms)?;
        self.dirty = true;
        if activated {
            self.publish_round_start();
        }
        self.commit().await;
        Ok(activated)
    }

    async fn handle_tick(&mut self, now_ms: u64) {
        // A failed commit is retried, as a full snapshot, before anything
        // else happens to the session.
        if self.dirty && !self.commit().await {
            return;
        }
        let round_ms = self.services.config.round_duration_ms();
        if !self.session.round_elapsed(now_ms, round_ms) {
            return;
        }

        let round_config = self.services.config.round_config();
        let outcome = match process_round(
            &mut self.session,
            self.services.catalog.as_ref(),
            &round_config,
            now_ms,
            &mut self.rng,
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(session_id = %self.session.id, error = %e, "round not processed");
                return;
            }
        };
        self.dirty = true;

        self.publish_outcome(&outcome);
        self.commit().await;
    }

    fn publish_outcome(&self, outcome: &RoundOutcome) {
        let gateway = &self.services.gateway;
        gateway.publish(CombatEvent::RoundResolved {
            session_id: self.session.id,
            round_number: outcome.round_number,
            actions: outcome.reports(),
        });

        for &player_id in &outcome.player_deaths {
            let name = self
                .session
                .combatant(player_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            tracing::info!(session_id = %self.session.id, %player_id, "player died");
            let death = PlayerDeath {
                session_id: self.session.id,
                location_id: self.session.location_id,
                player_id,
                name,
            };
            let services = Arc::clone(&self.services);
            tokio::spawn(async move {
                services.death.on_player_death(death).await;
            });
        }

        // The snapshot goes out even after the final round, so clients
        // see the state the fight ended in.
        self.publish_round_start();

        if let Some(reason) = outcome.end_reason {
            let (victors, defeated) = standings(&self.session);
            gateway.publish(CombatEvent::CombatEnded {
                session_id: self.session.id,
                reason,
                victors,
                defeated,
            });
        }
    }

    fn publish_round_start(&self) {
        self.services.gateway.publish(CombatEvent::RoundStart {
            session_id: self.session.id,
            round_number: self.session.current_round,
            round_duration_ms: self.services.config.round_duration_ms(),
            combatants: self.session.snapshots(),
        });
    }

    /// Writes the full session. Returns whether the repository now holds
    /// the current state.
    async fn commit(&mut self) -> bool {
        let repository = &self.services.repository;
        let result = match repository.update(&self.session).await {
            Ok(true) => Ok(()),
            Ok(false) => repository.create(&self.session).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                tracing::error!(
                    session_id = %self.session.id,
                    round = self.session.current_round,
                    error = %e,
                    "session commit failed"
                );
                self.dirty = true;
                false
            }
        }
    }
}

/// Spawns a new session actor task and returns a handle to it.
pub(crate) fn spawn_session<R, G, D>(
    session_id: SessionId,
    location_id: LocationId,
    services: Arc<Services<R, G, D>>,
    ended: mpsc::UnboundedSender<SessionId>,
) -> SessionHandle
where
    R: SessionRepository,
    G: BroadcastGateway,
    D: DeathHandler,
{
    let (tx, rx) = mpsc::channel(services.config.command_channel_size);
    let rng = match services.config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(session_id.0)),
        None => StdRng::from_os_rng(),
    };

    let actor = SessionActor {
        session: CombatSession::new(session_id, location_id),
        services,
        rng,
        dirty: true,
        receiver: rx,
        ended,
    };
    tokio::spawn(actor.run());

    SessionHandle {
        session_id,
        location_id,
        sender: tx,
    }
}
