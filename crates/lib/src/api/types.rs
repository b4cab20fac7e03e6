use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `GET /health` body. Anything other than `status == "online"` counts as down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl HealthResponse {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

/// `GET /models` body: model ids the server can route to, in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub online: Vec<String>,
    #[serde(default)]
    pub offline: Vec<String>,
}

impl ModelCatalog {
    pub fn is_empty(&self) -> bool {
        self.online.is_empty() && self.offline.is_empty()
    }

    /// True if the id is listed in either the online or offline list.
    pub fn contains(&self, model: &str) -> bool {
        self.online.iter().any(|m| m == model) || self.offline.iter().any(|m| m == model)
    }
}

/// `POST /chat` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub online_models: Vec<String>,
    pub offline_models: Vec<String>,
    pub use_memory: bool,
    /// Model the server should use to merge individual answers; server default when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesizer_model: Option<String>,
}

/// `POST /chat` success body. `final_answer` is required; a body without it is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub final_answer: String,
    /// Per-model answers keyed by provider label.
    #[serde(default)]
    pub individual_responses: BTreeMap<String, String>,
}

/// One stored query/answer pair from `GET /history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub query: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub timestamp: String,
    /// Entry kind as recorded by the server's memory store (e.g. "chat").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl HistoryEntry {
    /// Parse the server timestamp (RFC 3339, or ISO 8601 without offset). None if empty or unparseable.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }

    /// Timestamp for display: `YYYY-MM-DD HH:MM` when parseable, otherwise the raw string.
    pub fn display_timestamp(&self) -> String {
        self.parsed_timestamp()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| self.timestamp.clone())
    }
}

/// `GET /history` envelope. The server answers 200 with `error` when its memory store is unavailable.
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
    #[serde(default)]
    pub error: Option<String>,
}
