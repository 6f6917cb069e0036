//! `EngineBuilder` and the running [`Engine`].
//!
//! This is the entry point for running combat. It wires the catalog and
//! the three collaborators into a [`CombatScheduler`] and spawns its tick
//! loop.

use std::sync::Arc;

use emberfall_combat::{AbilityCatalog, InMemoryCatalog};
use emberfall_engine::{
    BroadcastGateway, CombatScheduler, DeathHandler, EngineConfig, SessionRepository,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::EmberfallError;

/// Builder for configuring and starting an [`Engine`].
///
/// # Example
///
/// ```rust,no_run
/// use emberfall::prelude::*;
/// use tokio::sync::mpsc;
///
/// # async fn start() -> Result<(), EmberfallError> {
/// let (events, _events_rx) = mpsc::unbounded_channel::<CombatEvent>();
/// let (deaths, _deaths_rx) = mpsc::unbounded_channel::<PlayerDeath>();
///
/// let engine = EngineBuilder::new()
///     .config_json(r#"{ "max_combat_rounds": 20 }"#)?
///     .catalog_json(r#"[{ "id": "smash", "base_damage": 6 }]"#)?
///     .build(InMemorySessionRepository::new(), events, deaths);
///
/// engine.shutdown().await
/// # }
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
    catalog: Option<Arc<dyn AbilityCatalog>>,
}

impl EngineBuilder {
    /// Creates a builder with the default configuration and no catalog.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            catalog: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses the configuration from JSON. Missing fields keep their
    /// defaults.
    pub fn config_json(mut self, json: &str) -> Result<Self, EmberfallError> {
        self.config = serde_json::from_str(json).map_err(EmberfallError::Config)?;
        Ok(self)
    }

    /// Uses a catalog the caller may keep sharing.
    pub fn catalog(mut self, catalog: Arc<dyn AbilityCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Loads an [`InMemoryCatalog`] from a JSON list of abilities.
    pub fn catalog_json(self, json: &str) -> Result<Self, EmberfallError> {
        Ok(self.catalog(Arc::new(InMemoryCatalog::from_json(json)?)))
    }

    /// Builds the scheduler and spawns its tick loop.
    ///
    /// Without a catalog only `basic_attack` is available. Must be called
    /// from inside a Tokio runtime.
    pub fn build<R, G, D>(self, repository: R, gateway: G, death: D) -> Engine<R, G, D>
    where
        R: SessionRepository,
        G: BroadcastGateway,
        D: DeathHandler,
    {
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(InMemoryCatalog::new()));
        let scheduler = Arc::new(CombatScheduler::new(
            catalog,
            repository,
            gateway,
            death,
            self.config,
        ));

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(Arc::clone(&scheduler).run(async move {
            let _ = stopped.await;
        }));
        tracing::info!("emberfall engine started");

        Engine {
            scheduler,
            stop,
            task,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running engine: a scheduler plus the task ticking it.
///
/// Use [`scheduler()`](Self::scheduler) to start fights and submit
/// actions, and [`shutdown()`](Self::shutdown) to stop.
pub struct Engine<R, G, D> {
    scheduler: Arc<CombatScheduler<R, G, D>>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl<R, G, D> Engine<R, G, D>
where
    R: SessionRepository,
    G: BroadcastGateway,
    D: DeathHandler,
{
    pub fn scheduler(&self) -> &Arc<CombatScheduler<R, G, D>> {
        &self.scheduler
    }

    /// Stops the tick loop and waits for every session to be stored
    /// and stopped.
    pub async fn shutdown(self) -> Result<(), EmberfallError> {
        // Err means the loop is already gone; the join below reports why.
        let _ = self.stop.send(());
        self.task.await?;
        tracing::info!("emberfall engine stopped");
        Ok(())
    }
}
