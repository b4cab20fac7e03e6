//! Failure kinds of the client core.
//!
//! None of these end the session: connectivity failures collapse into
//! `Disconnected`, fetch failures keep the last snapshot, and chat failures
//! become an error entry in the transcript.

use std::fmt;
use std::time::Duration;

use crate::api::ApiError;

/// Why a health probe did not prove the server online. Logged, never returned to callers.
#[derive(Debug, thiserror::Error)]
pub enum ConnectivityFailure {
    #[error("health probe failed: {0}")]
    Transport(#[from] ApiError),
    #[error("server status is {0:?}, not \"online\"")]
    NotOnline(String),
    #[error("health probe timed out after {0:?}")]
    Timeout(Duration),
}

/// Which snapshot a failed fetch was refreshing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Models,
    History,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Models => f.write_str("models"),
            Resource::History => f.write_str("history"),
        }
    }
}

/// A model catalog or history refresh failed; the previous snapshot is still held.
#[derive(Debug, thiserror::Error)]
#[error("failed to fetch {resource}: {source}")]
pub struct FetchFailure {
    pub resource: Resource,
    #[source]
    pub source: ApiError,
}

impl FetchFailure {
    pub fn new(resource: Resource, source: ApiError) -> Self {
        Self { resource, source }
    }
}

/// A chat request produced no usable answer. Its display text is what the transcript shows.
#[derive(Debug, thiserror::Error)]
#[error("Failed to get response from server: {0}")]
pub struct ChatRequestFailure(#[from] pub ApiError);
