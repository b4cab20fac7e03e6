//! Nexus API client (http://localhost:8000 by default).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::{
    ChatRequest, ChatResponse, HealthResponse, HistoryEntry, HistoryResponse, ModelCatalog,
};
use crate::config::{normalize_url, ApiConfig, DEFAULT_API_URL};

const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("nexus request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("nexus api error: {status} {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("server reported: {0}")]
    Server(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// The four backend calls the client core depends on. Implemented over HTTP by
/// [`NexusClient`]; tests substitute scripted backends.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Server root this backend talks to (for logs and display).
    fn base_url(&self) -> &str;

    /// GET /health.
    async fn health(&self) -> Result<HealthResponse, ApiError>;

    /// GET /models.
    async fn models(&self) -> Result<ModelCatalog, ApiError>;

    /// POST /chat.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError>;

    /// GET /history, in server order.
    async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError>;
}

/// Client for the Nexus HTTP API.
#[derive(Clone)]
pub struct NexusClient {
    base_url: String,
    client: reqwest::Client,
    health_timeout: Duration,
    request_timeout: Duration,
}

impl NexusClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| normalize_url(&u))
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Client for `base_url` with the timeouts from config.
    pub fn from_config(base_url: impl Into<String>, api: &ApiConfig) -> Self {
        Self::new(Some(base_url.into())).with_timeouts(api.health_timeout(), api.request_timeout())
    }

    pub fn with_timeouts(mut self, health: Duration, request: Duration) -> Self {
        self.health_timeout = health;
        self.request_timeout = request;
        self
    }

    pub fn health_timeout(&self) -> Duration {
        self.health_timeout
    }

    fn map_send_error(e: reqwest::Error, timeout: Duration) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Request(e)
        }
    }

    /// Check status, read the body as text, and decode it. Decode failures are `InvalidResponse`.
    async fn decode<T: DeserializeOwned>(
        res: reqwest::Response,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;
        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);
        let res = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;
        Self::decode(res, timeout).await
    }
}

#[async_trait]
impl ChatBackend for NexusClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.get_json("/health", self.health_timeout).await
    }

    async fn models(&self) -> Result<ModelCatalog, ApiError> {
        self.get_json("/models", self.request_timeout).await
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        let url = format!("{}/chat", self.base_url);
        log::debug!(
            "POST {} (online={:?}, offline={:?})",
            url,
            request.online_models,
            request.offline_models
        );
        let res = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, self.request_timeout))?;
        Self::decode(res, self.request_timeout).await
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let data: HistoryResponse = self.get_json("/history", self.request_timeout).await?;
        if let Some(err) = data.error {
            return Err(ApiError::Server(err));
        }
        data.history
            .ok_or_else(|| ApiError::InvalidResponse("missing `history` field".to_string()))
    }
}
