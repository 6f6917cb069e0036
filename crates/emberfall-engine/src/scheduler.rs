//! Combat scheduler: the active-session set and the tick loop.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use emberfall_combat::{AbilityCatalog, CombatAction, CombatSession, Combatant};
use emberfall_protocol::{CombatantId, LocationId, SessionId};
use emberfall_tick::Ticker;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use crate::session_actor::{Services, spawn_session};
use crate::{
    BroadcastGateway, DeathHandler, EngineConfig, EngineError, SessionHandle, SessionRepository,
};

/// Routing tables. Only sessions that have not ended are in here.
#[derive(Default)]
struct ActiveSessions {
    sessions: HashMap<SessionId, SessionHandle>,
    /// At most one running fight per location.
    by_location: HashMap<LocationId, SessionId>,
    /// A combatant is in at most one session at a time.
    by_combatant: HashMap<CombatantId, SessionId>,
}

impl ActiveSessions {
    fn remove(&mut self, session_id: SessionId) -> Option<SessionHandle> {
        let handle = self.sessions.remove(&session_id)?;
        self.by_location.retain(|_, sid| *sid != session_id);
        self.by_combatant.retain(|_, sid| *sid != session_id);
        Some(handle)
    }
}

/// Owns the active sessions and drives them.
///
/// This is the entry point for everything combat: starting fights,
/// joining them, submitting actions and ticking. All methods take `&self`,
/// so a scheduler is usually shared as `Arc<CombatScheduler<..>>` between
/// the tick loop and whatever serves players.
pub struct CombatScheduler<R, G, D> {
    services: Arc<Services<R, G, D>>,
    active: Mutex<ActiveSessions>,
    next_session_id: AtomicU64,
    ended_tx: mpsc::UnboundedSender<SessionId>,
    ended_rx: Mutex<mpsc::UnboundedReceiver<SessionId>>,
    epoch: Instant,
}

impl<R, G, D> CombatScheduler<R, G, D>
where
    R: SessionRepository,
    G: BroadcastGateway,
    D: DeathHandler,
{
    /// Creates a scheduler with no sessions. `config` is validated here.
    pub fn new(
        catalog: Arc<dyn AbilityCatalog>,
        repository: R,
        gateway: G,
        death: D,
        config: EngineConfig,
    ) -> Self {
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();
        Self {
            services: Arc::new(Services {
                catalog,
                repository,
                gateway,
                death,
                config: config.validated(),
            }),
            active: Mutex::new(ActiveSessions::default()),
            next_session_id: AtomicU64::new(1),
            ended_tx,
            ended_rx: Mutex::new(ended_rx),
            epoch: Instant::now(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.services.config
    }

    pub fn repository(&self) -> &R {
        &self.services.repository
    }

    /// Milliseconds since the scheduler was created, on the Tokio clock.
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Starts a new, empty session at `location`.
    ///
    /// # Errors
    /// [`EngineError::LocationBusy`] if a fight is already running there.
    pub async fn create_session(&self, location: LocationId) -> Result<SessionId, EngineError> {
        self.reap_ended().await;
        let mut active = self.active.lock().await;
        self.create_locked(&mut active, location)
    }

    fn create_locked(&self, active: &mut ActiveSessions, location: LocationId) -> Result<SessionId, EngineError> {
        if let Some(existing) = active.by_location.get(&location) {
            return Err(EngineError::LocationBusy(location, *existing));
        }
        let session_id = SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed));
        let handle = spawn_session(
            session_id,
            location,
            Arc::clone(&self.services),
            self.ended_tx.clone(),
        );
        active.sessions.insert(session_id, handle);
        active.by_location.insert(location, session_id);
        tracing::info!(%session_id, location_id = %location, "session created");
        Ok(session_id)
    }

    /// Adds a combatant to a session. Returns `true` if this started the
    /// fight.
    ///
    /// # Errors
    /// - [`EngineError::AlreadyInCombat`] if the combatant is in any session
    /// - [`EngineError::SessionNotFound`] if the session is not active
    /// - whatever the session itself rejects
    pub async fn join(&self, session_id: SessionId, combatant: Combatant) -> Result<bool, EngineError> {
        let ids = [combatant.id];
        let handle = {
            let mut active = self.active.lock().await;
            Self::reserve(&mut active, session_id, &ids)?
        };
        self.admit(handle, vec![combatant], false).await
    }

    /// Puts `combatants` into the fight at `location`, starting one if
    /// none is running there. Returns the session id.
    ///
    /// Nobody joins unless everybody can. The batch is checked against the
    /// combatant index and for duplicates up front, and the session adds
    /// it in one step; on any failure the index is rolled back.
    pub async fn engage(
        &self,
        location: LocationId,
        combatants: impl IntoIterator<Item = Combatant>,
    ) -> Result<SessionId, EngineError> {
        let combatants: Vec<Combatant> = combatants.into_iter().collect();
        let ids: Vec<CombatantId> = combatants.iter().map(|c| c.id).collect();
        self.reap_ended().await;

        let (handle, created) = {
            let mut active = self.active.lock().await;
            Self::check_free(&active, &ids)?;
            let existing = active.by_location.get(&location).copied();
            let (session_id, created) = match existing {
                Some(existing) => (existing, false),
                None => (self.create_locked(&mut active, location)?, true),
            };
            (Self::reserve(&mut active, session_id, &ids)?, created)
        };
        let session_id = handle.session_id();
        self.admit(handle, combatants, created).await?;
        Ok(session_id)
    }

    fn check_free(active: &ActiveSessions, ids: &[CombatantId]) -> Result<(), EngineError> {
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(EngineError::DuplicateCombatant(*id));
            }
            if let Some(current) = active.by_combatant.get(id) {
                return Err(EngineError::AlreadyInCombat {
                    combatant: *id,
                    session: *current,
                });
            }
        }
        Ok(())
    }

    /// Claims index entries for `ids` so no concurrent call can place
    /// them elsewhere while the actor is asked.
    fn reserve(
        active: &mut ActiveSessions,
        session_id: SessionId,
        ids: &[CombatantId],
    ) -> Result<SessionHandle, EngineError> {
        Self::check_free(active, ids)?;
        let handle = active
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(EngineError::SessionNotFound(session_id))?;
        for id in ids {
            active.by_combatant.insert(*id, session_id);
        }
        Ok(handle)
    }

    /// Hands reserved combatants to the actor without holding the
    /// scheduler lock. Undoes the reservation, and drops a session this
    /// call created if nobody else claimed it, when the actor refuses.
    async fn admit(
        &self,
        handle: SessionHandle,
        combatants: Vec<Combatant>,
        created: bool,
    ) -> Result<bool, EngineError> {
        let session_id = handle.session_id();
        let ids: Vec<CombatantId> = combatants.iter().map(|c| c.id).collect();
        let err = match handle.join(combatants, self.now_ms()).await {
            Ok(activated) => return Ok(activated),
            Err(e) => e,
        };

        let abandoned = {
            let mut active = self.active.lock().await;
            for id in &ids {
                if active.by_combatant.get(id) == Some(&session_id) {
                    active.by_combatant.remove(id);
                }
            }
            let claimed = active.by_combatant.values().any(|sid| *sid == session_id);
            if created && !claimed {
                active.remove(session_id)
            } else {
                None
            }
        };
        if let Some(abandoned) = abandoned {
            let _ = abandoned.shutdown().await;
        }
        tracing::warn!(%session_id, error = %err, "join rejected");
        Err(err)
    }

    /// Routes `action` to the session its combatant is in.
    ///
    /// # Errors
    /// - [`EngineError::NotInCombat`] if the combatant is in no active
    ///   session (this includes sessions that have ended)
    /// - [`EngineError::Combat`] if the session rejects the action
    pub async fn submit_action(&self, action: CombatAction) -> Result<u64, EngineError> {
        let handle = {
            let active = self.active.lock().await;
            let session_id = active
                .by_combatant
                .get(&action.combatant_id)
                .ok_or(EngineError::NotInCombat(action.combatant_id))?;
            active
                .sessions
                .get(session_id)
                .cloned()
                .ok_or(EngineError::SessionNotFound(*session_id))?
        };
        handle.submit(action).await
    }

    /// A snapshot of an active session.
    pub async fn session(&self, session_id: SessionId) -> Result<CombatSession, EngineError> {
        let handle = self
            .active
            .lock()
            .await
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(EngineError::SessionNotFound(session_id))?;
        handle.snapshot().await
    }

    pub async fn session_of(&self, combatant: CombatantId) -> Option<SessionId> {
        self.active.lock().await.by_combatant.get(&combatant).copied()
    }

    pub async fn session_at(&self, location: LocationId) -> Option<SessionId> {
        self.active.lock().await.by_location.get(&location).copied()
    }

    pub async fn session_count(&self) -> usize {
        self.active.lock().await.sessions.len()
    }

    /// Drops every session whose actor reported it ended and stored.
    /// Returns how many were dropped.
    pub async fn reap_ended(&self) -> usize {
        let mut ended = Vec::new();
        {
            let mut rx = self.ended_rx.lock().await;
            while let Ok(session_id) = rx.try_recv() {
                ended.push(session_id);
            }
        }
        if ended.is_empty() {
            return 0;
        }
        let mut active = self.active.lock().await;
        let mut reaped = 0;
        for session_id in ended {
            if active.remove(session_id).is_some() {
                tracing::info!(%session_id, "session retired");
                reaped += 1;
            }
        }
        reaped
    }

    /// One scheduler tick at engine time `now_ms`.
    ///
    /// Ended sessions are dropped first; every remaining actor then gets
    /// a non-blocking tick and decides for itself whether a round is due.
    /// A busy actor never delays the others.
    pub async fn tick_at(&self, now_ms: u64) {
        self.reap_ended().await;
        let active = self.active.lock().await;
        for handle in active.sessions.values() {
            if !handle.tick(now_ms) {
                tracing::warn!(session_id = %handle.session_id(), "session busy, tick dropped");
            }
        }
    }

    pub async fn tick(&self) {
        self.tick_at(self.now_ms()).await;
    }

    /// Stops every session actor. Dirty sessions are stored first.
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = {
            let mut active = self.active.lock().await;
            active.by_location.clear();
            active.by_combatant.clear();
            active.sessions.drain().map(|(_, h)| h).collect()
        };
        for handle in handles {
            let _ = handle.shutdown().await;
        }
        tracing::info!("scheduler shut down");
    }

    /// Runs the tick loop until `shutdown` resolves, then shuts down all
    /// sessions.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()> + Send) {
        let mut ticker = Ticker::new(self.services.config.tick.clone());
        tracing::info!(
            tick_ms = ticker.interval().as_millis() as u64,
            round_ms = self.services.config.round_duration_ms(),
            "combat scheduler running"
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _info = ticker.wait_for_tick() => {
                    self.tick().await;
                    ticker.record_tick_end();
                }
            }
        }

        self.shutdown().await;
    }
}
