//! Nexus backend API: wire types, the [`ChatBackend`] seam, and the reqwest client.
//!
//! Endpoints consumed: `GET /health`, `GET /models`, `POST /chat`, `GET /history`.

mod client;
mod types;

pub use client::{ApiError, ChatBackend, NexusClient};
pub use types::{ChatRequest, ChatResponse, HealthResponse, HistoryEntry, ModelCatalog};
