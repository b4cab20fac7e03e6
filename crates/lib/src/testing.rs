//! Scripted [`ChatBackend`] for unit tests: each call pops the next queued result.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{
    ApiError, ChatBackend, ChatRequest, ChatResponse, HealthResponse, HistoryEntry, ModelCatalog,
};

#[derive(Default)]
pub(crate) struct FakeBackend {
    health: Mutex<VecDeque<Result<HealthResponse, ApiError>>>,
    health_delay: Mutex<Duration>,
    models: Mutex<VecDeque<Result<ModelCatalog, ApiError>>>,
    chat: Mutex<VecDeque<Result<ChatResponse, ApiError>>>,
    history: Mutex<VecDeque<Result<Vec<HistoryEntry>, ApiError>>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
}

/// The error a dead server produces.
pub(crate) fn server_down() -> ApiError {
    ApiError::Status {
        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        body: "down".to_string(),
    }
}

pub(crate) fn answer(text: &str) -> ChatResponse {
    ChatResponse {
        final_answer: text.to_string(),
        individual_responses: Default::default(),
    }
}

pub(crate) fn entry(id: &str, query: &str, answer: &str) -> HistoryEntry {
    HistoryEntry {
        id: id.to_string(),
        query: query.to_string(),
        answer: answer.to_string(),
        timestamp: String::new(),
        kind: None,
    }
}

fn pop<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>) -> Result<T, ApiError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(ApiError::Server("no scripted response".to_string())))
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn online() -> Self {
        let b = Self::new();
        b.push_health("online");
        b
    }

    pub fn push_health(&self, status: &str) -> &Self {
        self.health.lock().unwrap().push_back(Ok(HealthResponse {
            status: status.to_string(),
            service: None,
        }));
        self
    }

    pub fn push_health_err(&self, err: ApiError) -> &Self {
        self.health.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn set_health_delay(&self, delay: Duration) -> &Self {
        *self.health_delay.lock().unwrap() = delay;
        self
    }

    pub fn push_models(&self, result: Result<ModelCatalog, ApiError>) -> &Self {
        self.models.lock().unwrap().push_back(result);
        self
    }

    pub fn push_chat(&self, result: Result<ChatResponse, ApiError>) -> &Self {
        self.chat.lock().unwrap().push_back(result);
        self
    }

    pub fn push_history(&self, result: Result<Vec<HistoryEntry>, ApiError>) -> &Self {
        self.history.lock().unwrap().push_back(result);
        self
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    fn base_url(&self) -> &str {
        "http://fake"
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let delay = *self.health_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        pop(&self.health)
    }

    async fn models(&self) -> Result<ModelCatalog, ApiError> {
        pop(&self.models)
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        self.chat_requests.lock().unwrap().push(request);
        pop(&self.chat)
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        pop(&self.history)
    }
}
