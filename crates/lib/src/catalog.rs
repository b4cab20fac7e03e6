//! Model catalog (what the server offers) and model selection (what the user picked).
//!
//! The catalog is a whole snapshot, replaced on each successful fetch. A failed fetch
//! keeps the previous snapshot and is reported as a [`FetchFailure`] notice.

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ChatBackend, ModelCatalog};
use crate::error::{FetchFailure, Resource};

/// Online model selected when nothing has been stored yet, so the first request names a model.
pub const DEFAULT_ONLINE_MODEL: &str = "Free Web (g4f)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Online,
    Offline,
}

/// Model ids sent with each chat request. Each list has set semantics (no duplicates)
/// but keeps insertion order for the wire. An id in both lists is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub online: Vec<String>,
    pub offline: Vec<String>,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            online: vec![DEFAULT_ONLINE_MODEL.to_string()],
            offline: Vec::new(),
        }
    }
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

impl ModelSelection {
    pub fn new(online: Vec<String>, offline: Vec<String>) -> Self {
        Self {
            online: dedup(online),
            offline: dedup(offline),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    fn list(&self, kind: ModelKind) -> &Vec<String> {
        match kind {
            ModelKind::Online => &self.online,
            ModelKind::Offline => &self.offline,
        }
    }

    fn list_mut(&mut self, kind: ModelKind) -> &mut Vec<String> {
        match kind {
            ModelKind::Online => &mut self.online,
            ModelKind::Offline => &mut self.offline,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty() && self.offline.is_empty()
    }

    pub fn is_selected(&self, kind: ModelKind, id: &str) -> bool {
        self.list(kind).iter().any(|m| m == id)
    }

    /// Flip membership of `id`; returns true if it is now selected.
    pub fn toggle(&mut self, kind: ModelKind, id: &str) -> bool {
        let list = self.list_mut(kind);
        if let Some(pos) = list.iter().position(|m| m == id) {
            list.remove(pos);
            false
        } else {
            list.push(id.to_string());
            true
        }
    }

    /// Selected ids the catalog does not list. Informational: the server decides what to do with them.
    pub fn missing_from<'a>(&'a self, catalog: &ModelCatalog) -> Vec<&'a str> {
        self.online
            .iter()
            .filter(|m| !catalog.online.iter().any(|c| c == *m))
            .chain(
                self.offline
                    .iter()
                    .filter(|m| !catalog.offline.iter().any(|c| c == *m)),
            )
            .map(String::as_str)
            .collect()
    }
}

/// Holds the last successfully fetched [`ModelCatalog`].
#[derive(Debug, Default)]
pub struct CatalogCache {
    snapshot: ModelCatalog,
    fetched: bool,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; empty until the first successful fetch.
    pub fn current(&self) -> &ModelCatalog {
        &self.snapshot
    }

    pub fn has_snapshot(&self) -> bool {
        self.fetched
    }

    /// Fetch `/models` and apply the result.
    pub async fn refresh(&mut self, backend: &dyn ChatBackend) -> Result<&ModelCatalog, FetchFailure> {
        let result = backend.models().await;
        self.apply(result)
    }

    /// Apply a fetch result produced elsewhere (e.g. a worker thread). Failure keeps the old snapshot.
    pub fn apply(
        &mut self,
        result: Result<ModelCatalog, ApiError>,
    ) -> Result<&ModelCatalog, FetchFailure> {
        match result {
            Ok(catalog) => {
                log::info!(
                    "model catalog: {} online, {} offline",
                    catalog.online.len(),
                    catalog.offline.len()
                );
                self.snapshot = catalog;
                self.fetched = true;
                Ok(&self.snapshot)
            }
            Err(e) => {
                let failure = FetchFailure::new(Resource::Models, e);
                log::warn!("{}; keeping previous catalog", failure);
                Err(failure)
            }
        }
    }
}
