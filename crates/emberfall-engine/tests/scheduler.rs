//! Scheduler and session actor behavior on a paused Tokio clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use emberfall_combat::{
    Ability, CombatAction, CombatSession, Combatant, CombatantStats, InMemoryCatalog, SessionState,
};
use emberfall_engine::{
    CombatScheduler, EngineConfig, EngineError, InMemorySessionRepository, PlayerDeath,
    RepositoryError, SessionRepository,
};
use emberfall_protocol::{CombatEvent, CombatantId, EndReason, LocationId, SessionId};
use emberfall_tick::TickConfig;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::time::timeout;

const PLAYER: CombatantId = CombatantId(1);
const CREATURE: CombatantId = CombatantId(10);
const ROUND_MS: u64 = 3_000;

type Events = mpsc::UnboundedReceiver<CombatEvent>;
type Deaths = mpsc::UnboundedReceiver<PlayerDeath>;
type Scheduler<R> =
    CombatScheduler<R, mpsc::UnboundedSender<CombatEvent>, mpsc::UnboundedSender<PlayerDeath>>;

// =========================================================================
// Fixtures
// =========================================================================

fn config() -> EngineConfig {
    EngineConfig {
        round_duration: Duration::from_millis(ROUND_MS),
        tick: TickConfig::with_interval(Duration::from_millis(250)),
        rng_seed: Some(42),
        ..EngineConfig::default()
    }
}

fn catalog() -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::from_abilities([Ability::new("smash", 6)]).unwrap())
}

fn player(max_hp: i32, base_damage: i32) -> Combatant {
    Combatant::player(
        PLAYER,
        "Aria",
        CombatantStats {
            max_hp,
            initiative: 10,
            base_damage,
            ..CombatantStats::default()
        },
        0,
    )
    .with_abilities(["smash"])
}

fn creature(hp: i32, base_damage: i32) -> Combatant {
    Combatant::creature(
        CREATURE,
        "Rat",
        CombatantStats {
            max_hp: hp,
            initiative: 5,
            base_damage,
            ..CombatantStats::default()
        },
    )
}

fn scheduler_with<R: SessionRepository>(repository: R) -> (Scheduler<R>, Events, Deaths) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (deaths_tx, deaths_rx) = mpsc::unbounded_channel();
    let scheduler = CombatScheduler::new(catalog(), repository, events_tx, deaths_tx, config());
    (scheduler, events_rx, deaths_rx)
}

fn scheduler() -> (Scheduler<Arc<InMemorySessionRepository>>, Events, Deaths) {
    scheduler_with(Arc::new(InMemorySessionRepository::new()))
}

fn attack(ability: &str) -> CombatAction {
    CombatAction::new(PLAYER, ability, Some(CREATURE))
}

/// Polls until the scheduler has retired a session.
async fn reap<R: SessionRepository>(scheduler: &Scheduler<R>) {
    for _ in 0..100 {
        if scheduler.reap_ended().await > 0 {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("session was never retired");
}

fn hp_of(session: &CombatSession, id: CombatantId) -> i32 {
    session.combatant(id).unwrap().hp
}

/// Fails every write while `failing` is set.
struct FlakyRepository {
    inner: InMemorySessionRepository,
    failing: AtomicBool,
}

impl SessionRepository for FlakyRepository {
    async fn create(&self, session: &CombatSession) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("disk full".into()));
        }
        self.inner.create(session).await
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<CombatSession>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn update(&self, session: &CombatSession) -> Result<bool, RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("disk full".into()));
        }
        self.inner.update(session).await
    }
}

/// Holds every write for one session until the gate opens.
struct GatedRepository {
    inner: InMemorySessionRepository,
    gated: SessionId,
    gate: Semaphore,
}

impl GatedRepository {
    async fn wait(&self, id: SessionId) {
        if id == self.gated {
            let _permit = self.gate.acquire().await;
        }
    }

    fn open(&self) {
        self.gate.add_permits(1);
    }
}

impl SessionRepository for GatedRepository {
    async fn create(&self, session: &CombatSession) -> Result<(), RepositoryError> {
        self.wait(session.id).await;
        self.inner.create(session).await
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<CombatSession>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn update(&self, session: &CombatSession) -> Result<bool, RepositoryError> {
        self.wait(session.id).await;
        self.inner.update(session).await
    }
}

// =========================================================================
// Sessions and routing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_engage_activates_and_announces_round_zero() {
    let (scheduler, mut events, _deaths) = scheduler();
    let sid = scheduler
        .engage(LocationId(5), [player(50, 8), creature(20, 1)])
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        CombatEvent::RoundStart {
            session_id,
            round_number,
            round_duration_ms,
            combatants,
        } => {
            assert_eq!(session_id, sid);
            assert_eq!(round_number, 0);
            assert_eq!(round_duration_ms, ROUND_MS);
            assert_eq!(combatants.len(), 2);
        }
        other => panic!("expected RoundStart, got {other:?}"),
    }

    assert_eq!(scheduler.session_at(LocationId(5)).await, Some(sid));
    assert_eq!(scheduler.session_of(PLAYER).await, Some(sid));
    assert_eq!(scheduler.session_of(CREATURE).await, Some(sid));
    assert_eq!(scheduler.session(sid).await.unwrap().state, SessionState::Active);

    let stored = scheduler.repository().find_by_id(sid).await.unwrap().unwrap();
    assert_eq!(stored.combatants.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_submitted_action_resolves_on_the_round_tick() {
    let (scheduler, mut events, _deaths) = scheduler();
    let sid = scheduler
        .engage(LocationId(1), [player(50, 8), creature(20, 1)])
        .await
        .unwrap();
    let _ = events.recv().await;

    let action_id = scheduler.submit_action(attack("basic_attack")).await.unwrap();
    scheduler.tick_at(ROUND_MS).await;

    match events.recv().await.unwrap() {
        CombatEvent::RoundResolved {
            session_id,
            round_number,
            actions,
        } => {
            assert_eq!(session_id, sid);
            assert_eq!(round_number, 0);
            // The player first, then the creature's automatic attack.
            assert_eq!(actions.len(), 2);
            assert_eq!(actions[0].action_id, action_id);
            assert_eq!(actions[0].damage, 8 + 10 / 2);
            assert_eq!(actions[1].actor_id, CREATURE);
        }
        other => panic!("expected RoundResolved, got {other:?}"),
    }
    match events.recv().await.unwrap() {
        CombatEvent::RoundStart {
            round_number,
            combatants,
            ..
        } => {
            assert_eq!(round_number, 1);
            let rat = combatants.iter().find(|c| c.id == CREATURE).unwrap();
            assert_eq!(rat.hp, 7);
        }
        other => panic!("expected RoundStart, got {other:?}"),
    }

    let stored = scheduler.repository().find_by_id(sid).await.unwrap().unwrap();
    assert_eq!(stored.current_round, 1);
    assert_eq!(hp_of(&stored, CREATURE), 7);
}

#[tokio::test(start_paused = true)]
async fn test_no_round_before_the_timer_elapses() {
    let (scheduler, _events, _deaths) = scheduler();
    let sid = scheduler
        .engage(LocationId(1), [player(50, 8), creature(20, 1)])
        .await
        .unwrap();

    scheduler.tick_at(ROUND_MS - 1).await;
    assert_eq!(scheduler.session(sid).await.unwrap().current_round, 0);

    scheduler.tick_at(ROUND_MS).await;
    assert_eq!(scheduler.session(sid).await.unwrap().current_round, 1);
}

#[tokio::test(start_paused = true)]
async fn test_waiting_session_never_runs_rounds() {
    let (scheduler, mut events, _deaths) = scheduler();
    let sid = scheduler.create_session(LocationId(2)).await.unwrap();
    let activated = scheduler.join(sid, player(50, 8)).await.unwrap();
    assert!(!activated);

    scheduler.tick_at(10 * ROUND_MS).await;
    let session = scheduler.session(sid).await.unwrap();
    assert_eq!(session.state, SessionState::Waiting);
    assert_eq!(session.current_round, 0);
    assert!(events.try_recv().is_err());

    assert!(scheduler.join(sid, creature(20, 1)).await.unwrap());
    assert!(matches!(
        events.recv().await,
        Some(CombatEvent::RoundStart { round_number: 0, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_one_fight_per_combatant_and_location() {
    let (scheduler, _events, _deaths) = scheduler();
    let sid = scheduler
        .engage(LocationId(1), [player(50, 8), creature(20, 1)])
        .await
        .unwrap();

    let err = scheduler.engage(LocationId(2), [player(50, 8)]).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::AlreadyInCombat { combatant: PLAYER, session } if session == sid
    ));
    // Rejected up front: nothing was started at the second location.
    assert_eq!(scheduler.session_at(LocationId(2)).await, None);

    let err = scheduler.create_session(LocationId(1)).await.unwrap_err();
    assert!(matches!(err, EngineError::LocationBusy(LocationId(1), s) if s == sid));

    let err = scheduler.join(SessionId(999), creature(20, 1)).await;
    assert!(matches!(err, Err(EngineError::AlreadyInCombat { .. })));
    let stranger = Combatant::creature(CombatantId(77), "Bat", CombatantStats::default());
    let err = scheduler.join(SessionId(999), stranger).await;
    assert!(matches!(err, Err(EngineError::SessionNotFound(SessionId(999)))));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_batch_leaves_nobody_indexed() {
    let (scheduler, _events, _deaths) = scheduler();
    let err = scheduler
        .engage(LocationId(1), [player(50, 8), creature(20, 1), player(50, 8)])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateCombatant(PLAYER)));
    assert_eq!(scheduler.session_of(PLAYER).await, None);
    assert_eq!(scheduler.session_of(CREATURE).await, None);
    assert_eq!(scheduler.session_at(LocationId(1)).await, None);

    // The same fighters can still start a fight afterwards.
    let sid = scheduler
        .engage(LocationId(1), [player(50, 8), creature(20, 1)])
        .await
        .unwrap();
    assert_eq!(scheduler.session_of(PLAYER).await, Some(sid));
}

#[tokio::test(start_paused = true)]
async fn test_slow_write_in_one_session_does_not_stall_others() {
    let repository = Arc::new(GatedRepository {
        inner: InMemorySessionRepository::new(),
        gated: SessionId(2),
        gate: Semaphore::new(0),
    });
    let (scheduler, _events, _deaths) = scheduler_with(Arc::clone(&repository));
    let scheduler = Arc::new(scheduler);

    let first = scheduler
        .engage(LocationId(1), [player(50, 8), creature(20, 1)])
        .await
        .unwrap();
    let second = scheduler.create_session(LocationId(2)).await.unwrap();
    assert_eq!(second, SessionId(2));

    let stuck = {
        let scheduler = Arc::clone(&scheduler);
        let bat = Combatant::creature(CombatantId(20), "Bat", CombatantStats::default());
        tokio::spawn(async move { scheduler.join(second, bat).await })
    };
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!stuck.is_finished());

    let submitted = timeout(Duration::from_secs(5), scheduler.submit_action(attack("basic_attack"))).await;
    assert!(matches!(submitted, Ok(Ok(_))));
    assert!(timeout(Duration::from_secs(5), scheduler.tick_at(ROUND_MS)).await.is_ok());
    let snapshot = timeout(Duration::from_secs(5), scheduler.session(first)).await;
    assert_eq!(snapshot.unwrap().unwrap().current_round, 1);

    repository.open();
    assert!(!stuck.await.unwrap().unwrap());
    assert_eq!(scheduler.session_of(CombatantId(20)).await, Some(second));
}

#[tokio::test(start_paused = true)]
async fn test_submit_outside_combat_is_rejected() {
    let (scheduler, _events, _deaths) = scheduler();
    let err = scheduler.submit_action(attack("basic_attack")).await.unwrap_err();
    assert!(matches!(err, EngineError::NotInCombat(PLAYER)));
}

#[tokio::test(start_paused = true)]
async fn test_session_rejections_pass_through() {
    let (scheduler, _events, _deaths) = scheduler();
    scheduler
        .engage(LocationId(1), [player(50, 8), creature(20, 1)])
        .await
        .unwrap();

    let err = scheduler.submit_action(attack("fireball")).await.unwrap_err();
    assert!(matches!(err, EngineError::Combat(_)), "got {err}");
}

// =========================================================================
// Ending
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_ended_session_is_stored_and_retired() {
    let (scheduler, mut events, _deaths) = scheduler();
    let sid = scheduler
        .engage(LocationId(1), [player(50, 30), creature(20, 1)])
        .await
        .unwrap();
    scheduler.submit_action(attack("basic_attack")).await.unwrap();
    scheduler.tick_at(ROUND_MS).await;

    let mut snapshots = Vec::new();
    let ended = loop {
        match events.recv().await.unwrap() {
            CombatEvent::RoundStart {
                round_number,
                combatants,
                ..
            } => snapshots.push((round_number, combatants)),
            CombatEvent::CombatEnded {
                reason,
                victors,
                defeated,
                ..
            } => break (reason, victors, defeated),
            CombatEvent::RoundResolved { .. } => {}
        }
    };
    assert_eq!(ended, (EndReason::AllEnemiesDefeated, vec![PLAYER], vec![CREATURE]));

    // The final state is broadcast before the fight is declared over.
    let (round, last) = snapshots.last().unwrap();
    assert_eq!(*round, 1);
    let rat = last.iter().find(|c| c.id == CREATURE).unwrap();
    assert_eq!(rat.hp, 0);
    assert!(!rat.is_alive);

    reap(&scheduler).await;
    assert_eq!(scheduler.session_count().await, 0);
    assert_eq!(scheduler.session_of(PLAYER).await, None);
    let err = scheduler.submit_action(attack("basic_attack")).await.unwrap_err();
    assert!(matches!(err, EngineError::NotInCombat(PLAYER)));

    let stored = scheduler.repository().find_by_id(sid).await.unwrap().unwrap();
    assert_eq!(stored.state, SessionState::Ended);
    assert_eq!(stored.end_reason, Some(EndReason::AllEnemiesDefeated));

    // The location is free again.
    let next = scheduler.create_session(LocationId(1)).await.unwrap();
    assert_ne!(next, sid);
}

#[tokio::test(start_paused = true)]
async fn test_player_death_reaches_the_death_handler() {
    let (scheduler, mut events, mut deaths) = scheduler();
    let sid = scheduler
        .engage(LocationId(4), [player(5, 1), creature(20, 50)])
        .await
        .unwrap();
    scheduler.tick_at(ROUND_MS).await;

    let death = deaths.recv().await.unwrap();
    assert_eq!(
        death,
        PlayerDeath {
            session_id: sid,
            location_id: LocationId(4),
            player_id: PLAYER,
            name: "Aria".into(),
        }
    );

    let reason = loop {
        if let CombatEvent::CombatEnded { reason, .. } = events.recv().await.unwrap() {
            break reason;
        }
    };
    assert_eq!(reason, EndReason::AllPlayersDefeated);
}

// =========================================================================
// Persistence failures
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_commit_is_retried_before_the_next_round() {
    let repository = Arc::new(FlakyRepository {
        inner: InMemorySessionRepository::new(),
        failing: AtomicBool::new(false),
    });
    let (scheduler, mut events, _deaths) = scheduler_with(Arc::clone(&repository));
    let sid = scheduler
        .engage(LocationId(1), [player(50, 8), creature(20, 1)])
        .await
        .unwrap();
    let _ = events.recv().await;

    repository.failing.store(true, Ordering::SeqCst);
    scheduler.submit_action(attack("basic_attack")).await.unwrap();
    scheduler.tick_at(ROUND_MS).await;
    // The queued action could not be stored, so the round waits.
    assert_eq!(scheduler.session(sid).await.unwrap().current_round, 0);
    assert!(events.try_recv().is_err());

    repository.failing.store(false, Ordering::SeqCst);
    scheduler.tick_at(ROUND_MS).await;
    assert!(matches!(
        events.recv().await,
        Some(CombatEvent::RoundResolved { round_number: 0, .. })
    ));
    assert_eq!(scheduler.session(sid).await.unwrap().current_round, 1);
    let stored = repository.find_by_id(sid).await.unwrap().unwrap();
    assert_eq!(stored.current_round, 1);
}

// =========================================================================
// Tick loop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_run_drives_rounds_until_shutdown() {
    let (scheduler, mut events, _deaths) = scheduler();
    let scheduler = Arc::new(scheduler);
    let sid = scheduler
        .engage(LocationId(1), [player(500, 1), creature(500, 1)])
        .await
        .unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(Arc::clone(&scheduler).run(async {
        let _ = stop_rx.await;
    }));

    let mut resolved = 0;
    while resolved < 2 {
        if let CombatEvent::RoundResolved { .. } = events.recv().await.unwrap() {
            resolved += 1;
        }
    }
    assert!(scheduler.now_ms() >= 2 * ROUND_MS);

    stop_tx.send(()).unwrap();
    task.await.unwrap();
    assert_eq!(scheduler.session_count().await, 0);

    let stored = scheduler.repository().find_by_id(sid).await.unwrap().unwrap();
    assert!(stored.current_round >= 2);
}
