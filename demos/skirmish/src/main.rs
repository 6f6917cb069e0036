//! One player against one creature, logging every event until the fight
//! ends. Pass a number to change the seed: `cargo run -p skirmish -- 11`.

use std::sync::Arc;
use std::time::Duration;

use emberfall::prelude::*;
use tokio::sync::mpsc;

const PLAYER: CombatantId = CombatantId(1);
const CREATURE: CombatantId = CombatantId(100);

const CATALOG: &str = r#"[
    {
        "id": "cleave",
        "base_damage": 7,
        "cooldown_rounds": 3,
        "stamina_cost": 10
    },
    {
        "id": "venom_strike",
        "base_damage": 2,
        "effects": ["damage", "dot"],
        "effect_value": 3,
        "duration_rounds": 3,
        "stamina_cost": 5,
        "cooldown_rounds": 4
    },
    {
        "id": "second_wind",
        "base_damage": 8,
        "target_type": "self",
        "effects": ["heal"],
        "mana_cost": 10,
        "cooldown_rounds": 5
    }
]"#;

// ---------------------------------------------------------------------------
// Combatants
// ---------------------------------------------------------------------------

fn hero() -> Combatant {
    Combatant::player(
        PLAYER,
        "Brenna",
        CombatantStats {
            max_hp: 45,
            max_mana: 20,
            max_stamina: 40,
            initiative: 8,
            accuracy: 5,
            evasion: 3,
            base_damage: 4,
            level: 3,
            ..CombatantStats::default()
        },
        12,
    )
    .with_abilities(["cleave", "venom_strike", "second_wind"])
}

fn ogre() -> Combatant {
    Combatant::creature(
        CREATURE,
        "Cave Ogre",
        CombatantStats {
            max_hp: 70,
            initiative: 3,
            base_damage: 5,
            level: 4,
            ..CombatantStats::default()
        },
    )
}

/// The first ability the hero can use right now, in order of preference.
fn choose(hero: &Combatant, catalog: &InMemoryCatalog) -> &'static str {
    let wounded = hero.hp * 2 < hero.max_hp;
    let preference: &[&'static str] = if wounded {
        &["second_wind", "cleave", "venom_strike"]
    } else {
        &["venom_strike", "cleave"]
    };
    preference
        .iter()
        .copied()
        .find(|id| {
            let id = AbilityId::from(*id);
            hero.cooldown(&id).is_none()
                && catalog
                    .find_by_id(&id)
                    .is_some_and(|ability| hero.can_afford(&ability))
        })
        .unwrap_or("basic_attack")
}

fn target_of(ability: &str) -> CombatantId {
    if ability == "second_wind" { PLAYER } else { CREATURE }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,emberfall_combat=debug".into()),
        )
        .with_target(false)
        .init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(7);

    let catalog = Arc::new(InMemoryCatalog::from_json(CATALOG)?);
    let repository = Arc::new(InMemorySessionRepository::new());
    let (events, mut events_rx) = mpsc::unbounded_channel::<CombatEvent>();
    let (deaths, mut deaths_rx) = mpsc::unbounded_channel::<PlayerDeath>();

    tokio::spawn(async move {
        while let Some(death) = deaths_rx.recv().await {
            tracing::warn!(
                player = %death.name,
                location = %death.location_id,
                "player died: inventory dropped, gold lost, sent home"
            );
        }
    });

    let engine = EngineBuilder::new()
        .config(EngineConfig {
            round_duration: Duration::from_millis(600),
            tick: TickConfig::with_interval(Duration::from_millis(100)),
            rng_seed: Some(seed),
            ..EngineConfig::default()
        })
        .catalog(Arc::clone(&catalog) as Arc<dyn AbilityCatalog>)
        .build(Arc::clone(&repository), events, deaths);
    let scheduler = Arc::clone(engine.scheduler());

    let session_id = scheduler
        .engage(LocationId(42), [hero(), ogre()])
        .await?;
    tracing::info!(%session_id, seed, "skirmish started");

    let codec = JsonCodec;
    while let Some(event) = events_rx.recv().await {
        let line = codec.encode(&event)?;
        println!("{}", String::from_utf8_lossy(&line));

        match event {
            CombatEvent::RoundStart { combatants, .. } => {
                // The final snapshot arrives just before CombatEnded.
                if combatants.iter().any(|c| !c.is_alive) {
                    continue;
                }
                let Ok(session) = scheduler.session(session_id).await else {
                    continue;
                };
                let Some(me) = session.combatant(PLAYER) else {
                    break;
                };
                if !me.can_act() {
                    tracing::info!("hero cannot act this round");
                    continue;
                }
                let ability = choose(me, &catalog);
                let action = CombatAction::new(PLAYER, ability, Some(target_of(ability)));
                if let Err(e) = scheduler.submit_action(action).await {
                    tracing::warn!(error = %e, ability, "action rejected");
                }
            }
            CombatEvent::RoundResolved { .. } => {}
            CombatEvent::CombatEnded { reason, .. } => {
                tracing::info!(%reason, "skirmish over");
                break;
            }
        }
    }

    engine.shutdown().await?;

    if let Some(stored) = repository.find_by_id(session_id).await? {
        tracing::info!(
            rounds = stored.current_round,
            state = %stored.state,
            "final snapshot stored"
        );
    }
    Ok(())
}
