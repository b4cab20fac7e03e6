//! Chat session: the ordered transcript plus the single in-flight request.
//!
//! A send is split in two so a host can show the user message before the server answers:
//! [`ChatSession::begin`] appends the user message and marks the session in flight, then the
//! returned [`PendingChat`] runs against a backend (here or on another thread), and
//! [`ChatSession::complete`] appends the answer or an error entry and clears the flag.
//! The user message is never rolled back.

use serde::{Deserialize, Serialize};

use crate::api::{ChatBackend, ChatRequest};
use crate::catalog::ModelSelection;
use crate::connectivity::ConnectivityState;
use crate::error::ChatRequestFailure;

/// Identifies one send; completions carrying any other id are dropped.
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Error,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Error => "error",
        }
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Error,
            content: content.into(),
        }
    }
}

/// A chat request that has been recorded in the transcript but not yet answered.
#[derive(Debug, Clone)]
pub struct PendingChat {
    pub id: RequestId,
    pub request: ChatRequest,
}

impl PendingChat {
    pub fn with_synthesizer(mut self, model: Option<String>) -> Self {
        self.request.synthesizer_model = model;
        self
    }

    /// Issue the request. Any failure, including a body without `final_answer`, becomes the outcome.
    pub async fn run(self, backend: &dyn ChatBackend) -> ChatOutcome {
        let result = backend
            .chat(self.request)
            .await
            .map(|r| r.final_answer)
            .map_err(ChatRequestFailure::from);
        ChatOutcome {
            id: self.id,
            result,
        }
    }
}

/// How a [`PendingChat`] ended.
#[derive(Debug)]
pub struct ChatOutcome {
    pub id: RequestId,
    pub result: Result<String, ChatRequestFailure>,
}

/// Transcript, input buffer and in-flight marker for one conversation.
#[derive(Debug, Default)]
pub struct ChatSession {
    transcript: Vec<Message>,
    input: String,
    in_flight: Option<RequestId>,
    next_id: RequestId,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Editable input buffer for hosts with a text box.
    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight_id(&self) -> Option<RequestId> {
        self.in_flight
    }

    /// True when a send would be accepted right now.
    pub fn can_send(&self, connectivity: ConnectivityState) -> bool {
        connectivity.is_connected() && !self.is_in_flight()
    }

    /// Start a send. No-op (returns None) when `text` is blank, the server is not connected,
    /// or a request is already in flight. Otherwise appends the user message, clears the input
    /// buffer, marks the session in flight, and returns the request to run.
    pub fn begin(
        &mut self,
        text: &str,
        connectivity: ConnectivityState,
        selection: &ModelSelection,
    ) -> Option<PendingChat> {
        if text.trim().is_empty() {
            return None;
        }
        if !connectivity.is_connected() {
            log::debug!("send ignored: server not connected");
            return None;
        }
        if let Some(id) = self.in_flight {
            log::debug!("send ignored: request {} still in flight", id);
            return None;
        }

        self.next_id += 1;
        let id = self.next_id;
        self.transcript.push(Message::user(text));
        self.input.clear();
        self.in_flight = Some(id);

        Some(PendingChat {
            id,
            request: ChatRequest {
                query: text.to_string(),
                online_models: selection.online.clone(),
                offline_models: selection.offline.clone(),
                use_memory: true,
                synthesizer_model: None,
            },
        })
    }

    /// [`begin`](Self::begin) with the current input buffer as the text.
    pub fn begin_from_input(
        &mut self,
        connectivity: ConnectivityState,
        selection: &ModelSelection,
    ) -> Option<PendingChat> {
        let text = self.input.clone();
        self.begin(&text, connectivity, selection)
    }

    /// Finish the in-flight request. Returns false (and changes nothing) if `outcome` is not
    /// for the request currently in flight.
    pub fn complete(&mut self, outcome: ChatOutcome) -> bool {
        if self.in_flight != Some(outcome.id) {
            log::debug!(
                "dropping stale chat outcome {} (in flight: {:?})",
                outcome.id,
                self.in_flight
            );
            return false;
        }
        let message = match outcome.result {
            Ok(answer) => Message::assistant(answer),
            Err(e) => {
                log::warn!("chat request {} failed: {}", outcome.id, e);
                Message::error(e.to_string())
            }
        };
        self.transcript.push(message);
        self.in_flight = None;
        true
    }

    /// Begin, run, and complete in one call. Returns false if the send was a no-op.
    pub async fn send(
        &mut self,
        text: &str,
        connectivity: ConnectivityState,
        selection: &ModelSelection,
        backend: &dyn ChatBackend,
    ) -> bool {
        let Some(pending) = self.begin(text, connectivity, selection) else {
            return false;
        };
        let outcome = pending.run(backend).await;
        self.complete(outcome)
    }

    /// Clear the transcript. Refused while a request is in flight.
    pub fn reset(&mut self) -> bool {
        if self.is_in_flight() {
            return false;
        }
        self.transcript.clear();
        self.input.clear();
        true
    }
}
