//! Wires settings, connectivity, catalog, chat session and history into one client.
//!
//! Hosts that can await (the CLI) call the async methods. Hosts that run network calls on
//! worker threads (the desktop) take [`Controller::backend`], run the call there, and feed
//! the result back through the matching `apply_*` / `finish_send` method.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::api::{ApiError, ChatBackend, HistoryEntry, ModelCatalog, NexusClient};
use crate::catalog::{CatalogCache, ModelKind, ModelSelection};
use crate::config::{self, Config};
use crate::connectivity::{ConnectivityMonitor, ConnectivityState};
use crate::error::FetchFailure;
use crate::history::HistoryRetriever;
use crate::session::{ChatOutcome, ChatSession, PendingChat};
use crate::settings::Settings;

/// Counts backend replacements. Results produced against an older backend are dropped.
pub type Generation = u64;

/// Builds a backend for a server URL. Called at start and whenever the URL changes.
pub type BackendFactory = Arc<dyn Fn(&str) -> Arc<dyn ChatBackend> + Send + Sync>;

/// Result of a status check: the probe outcome, plus a notice if the follow-up
/// model fetch failed.
#[derive(Debug)]
pub struct StatusReport {
    pub state: ConnectivityState,
    pub catalog_notice: Option<FetchFailure>,
}

pub struct Controller {
    config: Config,
    settings: Settings,
    factory: BackendFactory,
    backend: Arc<dyn ChatBackend>,
    generation: Generation,
    monitor: ConnectivityMonitor,
    catalog: CatalogCache,
    session: ChatSession,
    history: HistoryRetriever,
}

/// Factory producing [`NexusClient`]s with the configured timeouts.
pub fn http_backend_factory(config: &Config) -> BackendFactory {
    let api = config.api.clone();
    Arc::new(move |url: &str| Arc::new(NexusClient::from_config(url, &api)) as Arc<dyn ChatBackend>)
}

impl Controller {
    /// Controller over the settings file named by `config` (relative to `config_path`), talking HTTP.
    pub fn open(config: Config, config_path: &Path) -> Self {
        let settings_path = config::resolve_settings_path(&config, config_path);
        log::debug!("settings file: {}", settings_path.display());
        let settings = Settings::open_file(settings_path);
        let factory = http_backend_factory(&config);
        Self::with_factory(config, settings, factory)
    }

    pub fn with_factory(config: Config, settings: Settings, factory: BackendFactory) -> Self {
        let url = settings.api_url(&config::resolve_default_api_url(&config));
        let backend = factory(&url);
        let monitor = ConnectivityMonitor::new(config.api.health_timeout());
        Self {
            config,
            settings,
            factory,
            backend,
            generation: 0,
            monitor,
            catalog: CatalogCache::new(),
            session: ChatSession::new(),
            history: HistoryRetriever::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Shared handle to the current backend, for running a call off the UI thread.
    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.backend)
    }

    /// Generation of the current backend. Tag work started off-thread with it and pass it
    /// back to the matching `apply_*` method.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    fn is_stale(&self, generation: Generation, what: &str) -> bool {
        if generation == self.generation {
            return false;
        }
        log::debug!(
            "dropping {} result from replaced server (generation {}, current {})",
            what,
            generation,
            self.generation
        );
        true
    }

    pub fn api_url(&self) -> &str {
        self.backend.base_url()
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.monitor.state()
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn catalog(&self) -> &ModelCatalog {
        self.catalog.current()
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    /// Start-of-day sequence: probe the server, then load the model catalog if it is up.
    pub async fn startup(&mut self) -> StatusReport {
        log::info!("using server {}", self.api_url());
        self.check_status().await
    }

    /// Probe; when connected, refresh the catalog. Never fails.
    pub async fn check_status(&mut self) -> StatusReport {
        let backend = self.backend();
        let state = self.monitor.probe(backend.as_ref()).await;
        let catalog_notice = if state.is_connected() {
            self.catalog.refresh(backend.as_ref()).await.err()
        } else {
            None
        };
        StatusReport {
            state,
            catalog_notice,
        }
    }

    /// Record a probe run elsewhere. Returns true when the catalog should be refreshed next.
    /// A result from an older generation changes nothing.
    pub fn apply_probe(&mut self, generation: Generation, state: ConnectivityState) -> bool {
        if self.is_stale(generation, "probe") {
            return false;
        }
        self.monitor.record(state).is_connected()
    }

    pub async fn refresh_models(&mut self) -> Result<&ModelCatalog, FetchFailure> {
        let backend = self.backend();
        self.catalog.refresh(backend.as_ref()).await
    }

    pub fn apply_models(
        &mut self,
        generation: Generation,
        result: Result<ModelCatalog, ApiError>,
    ) -> Option<FetchFailure> {
        if self.is_stale(generation, "model catalog") {
            return None;
        }
        self.catalog.apply(result).err()
    }

    pub async fn refresh_history(&mut self) -> Result<&[HistoryEntry], FetchFailure> {
        let backend = self.backend();
        self.history.refresh(backend.as_ref()).await
    }

    pub fn apply_history(
        &mut self,
        generation: Generation,
        result: Result<Vec<HistoryEntry>, ApiError>,
    ) -> Option<FetchFailure> {
        if self.is_stale(generation, "history") {
            return None;
        }
        self.history.apply(result).err()
    }

    pub fn model_selection(&self) -> ModelSelection {
        self.settings.model_selection()
    }

    pub fn set_model_selection(&mut self, selection: &ModelSelection) -> Result<()> {
        self.settings.set_model_selection(selection)
    }

    /// Flip one model in the persisted selection; returns true if it is now selected.
    pub fn toggle_model(&mut self, kind: ModelKind, id: &str) -> Result<bool> {
        let mut selection = self.settings.model_selection();
        let selected = selection.toggle(kind, id);
        self.settings.set_model_selection(&selection)?;
        Ok(selected)
    }

    /// Persist a new server URL and switch to it. Connectivity drops to `Disconnected`
    /// until the next health check, and results still in flight for the old server are ignored.
    pub fn set_api_url(&mut self, url: &str) -> Result<()> {
        self.settings.set_api_url(url)?;
        let url = self
            .settings
            .api_url(&config::resolve_default_api_url(&self.config));
        self.backend = (self.factory)(&url);
        self.generation += 1;
        self.monitor.reset();
        log::info!("server set to {}", url);
        Ok(())
    }

    fn prepare(&self, pending: PendingChat, selection: &ModelSelection) -> PendingChat {
        if self.catalog.has_snapshot() {
            let missing = selection.missing_from(self.catalog.current());
            if !missing.is_empty() {
                log::warn!("selected models not offered by the server: {:?}", missing);
            }
        }
        pending.with_synthesizer(self.settings.synthesizer_model())
    }

    /// First half of a send: append the user message and build the request. None if it was a no-op.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingChat> {
        let selection = self.settings.model_selection();
        let pending = self.session.begin(text, self.monitor.state(), &selection)?;
        Some(self.prepare(pending, &selection))
    }

    /// [`begin_send`](Self::begin_send) using the session's input buffer.
    pub fn begin_send_input(&mut self) -> Option<PendingChat> {
        let selection = self.settings.model_selection();
        let pending = self
            .session
            .begin_from_input(self.monitor.state(), &selection)?;
        Some(self.prepare(pending, &selection))
    }

    /// Second half of a send.
    pub fn finish_send(&mut self, outcome: ChatOutcome) -> bool {
        self.session.complete(outcome)
    }

    /// Full send against the current backend. Returns false if the send was a no-op.
    pub async fn send(&mut self, text: &str) -> bool {
        let Some(pending) = self.begin_send(text) else {
            return false;
        };
        let backend = self.backend();
        let outcome = pending.run(backend.as_ref()).await;
        self.finish_send(outcome)
    }

    pub fn reset_session(&mut self) -> bool {
        self.session.reset()
    }
}
