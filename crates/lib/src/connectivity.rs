//! Point-in-time server reachability check against `GET /health`.
//!
//! Fail-closed: the state is `Disconnected` until a probe sees `status == "online"`,
//! and every failure path (transport, HTTP status, bad body, other status, timeout)
//! lands back on `Disconnected`. Probes run on demand only; there is no poller.

use std::time::{Duration, Instant};

use crate::api::ChatBackend;
use crate::error::ConnectivityFailure;

/// Probe bound used when no config is supplied.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectivityState {
    Connected,
    #[default]
    Disconnected,
}

impl ConnectivityState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectivityState::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectivityState::Connected => "Connected",
            ConnectivityState::Disconnected => "Disconnected",
        }
    }
}

/// Run one health probe with a hard bound. Never fails: errors are logged and read as `Disconnected`.
pub async fn check(backend: &dyn ChatBackend, timeout: Duration) -> ConnectivityState {
    match try_check(backend, timeout).await {
        Ok(()) => {
            log::debug!("server {} is online", backend.base_url());
            ConnectivityState::Connected
        }
        Err(e) => {
            log::warn!("server {} unreachable: {}", backend.base_url(), e);
            ConnectivityState::Disconnected
        }
    }
}

async fn try_check(backend: &dyn ChatBackend, timeout: Duration) -> Result<(), ConnectivityFailure> {
    let health = tokio::time::timeout(timeout, backend.health())
        .await
        .map_err(|_| ConnectivityFailure::Timeout(timeout))??;
    if health.is_online() {
        Ok(())
    } else {
        Err(ConnectivityFailure::NotOnline(health.status))
    }
}

/// Holds the outcome of the most recent probe.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: ConnectivityState,
    timeout: Duration,
    last_probe: Option<Instant>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl ConnectivityMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: ConnectivityState::Disconnected,
            timeout,
            last_probe: None,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// When the last probe result was recorded.
    pub fn last_probe(&self) -> Option<Instant> {
        self.last_probe
    }

    pub async fn probe(&mut self, backend: &dyn ChatBackend) -> ConnectivityState {
        let state = check(backend, self.timeout).await;
        self.record(state)
    }

    /// Record a probe outcome produced elsewhere.
    pub fn record(&mut self, state: ConnectivityState) -> ConnectivityState {
        if state != self.state {
            log::info!("connectivity: {}", state.label());
        }
        self.state = state;
        self.last_probe = Some(Instant::now());
        state
    }

    /// Forget the last result (e.g. the server URL changed); back to `Disconnected`.
    pub fn reset(&mut self) {
        self.state = ConnectivityState::Disconnected;
        self.last_probe = None;
    }
}
