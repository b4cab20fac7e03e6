//! Server-side query/answer log, fetched on demand. Independent of the live chat transcript.

use crate::api::{ApiError, ChatBackend, HistoryEntry};
use crate::error::{FetchFailure, Resource};

/// Holds at most one history snapshot, in server order. A failed refresh keeps it.
#[derive(Debug, Default)]
pub struct HistoryRetriever {
    snapshot: Option<Vec<HistoryEntry>>,
}

impl HistoryRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries of the held snapshot; empty before the first successful fetch.
    pub fn entries(&self) -> &[HistoryEntry] {
        self.snapshot.as_deref().unwrap_or(&[])
    }

    pub fn snapshot(&self) -> Option<&[HistoryEntry]> {
        self.snapshot.as_deref()
    }

    pub async fn refresh(
        &mut self,
        backend: &dyn ChatBackend,
    ) -> Result<&[HistoryEntry], FetchFailure> {
        let result = backend.history().await;
        self.apply(result)
    }

    pub fn apply(
        &mut self,
        result: Result<Vec<HistoryEntry>, ApiError>,
    ) -> Result<&[HistoryEntry], FetchFailure> {
        match result {
            Ok(entries) => {
                log::debug!("history: {} entries", entries.len());
                Ok(self.snapshot.insert(entries).as_slice())
            }
            Err(e) => {
                let failure = FetchFailure::new(Resource::History, e);
                log::warn!("{}; keeping previous history", failure);
                Err(failure)
            }
        }
    }
}
