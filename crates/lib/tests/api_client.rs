//! Integration test: serve a mock of the Nexus API on a free port and drive the client
//! and controller over real HTTP. The server task is left running when the test ends.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lib::api::{ApiError, ChatBackend, NexusClient};
use lib::catalog::{ModelKind, ModelSelection};
use lib::config::Config;
use lib::connectivity::ConnectivityState;
use lib::controller::{http_backend_factory, Controller};
use lib::session::{Message, Role};
use lib::settings::Settings;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("nexus-api-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

struct Mock {
    chat_status: StatusCode,
    chat_reply: Value,
    history_reply: Value,
    chat_bodies: Mutex<Vec<Value>>,
}

impl Mock {
    fn new() -> Self {
        Self {
            chat_status: StatusCode::OK,
            chat_reply: json!({
                "final_answer": "hi there",
                "individual_responses": {"Free Web (g4f)": "hi there"}
            }),
            history_reply: json!({"history": [
                {"id": "2", "query": "second", "answer": "b", "timestamp": "2024-05-01T10:00:00", "type": "chat"},
                {"id": "1", "query": "first", "answer": "a", "timestamp": "2024-04-30T09:00:00", "type": "chat"}
            ]}),
            chat_bodies: Mutex::new(Vec::new()),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({"status": "online", "service": "AI Nexus"}))
}

async fn models() -> Json<Value> {
    Json(json!({
        "online": ["Free Web (g4f)", "ChatGPT (OpenAI)"],
        "offline": ["llama3.2:latest"]
    }))
}

async fn chat(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    mock.chat_bodies.lock().unwrap().push(body);
    (mock.chat_status, Json(mock.chat_reply.clone()))
}

async fn history(State(mock): State<Arc<Mock>>) -> Json<Value> {
    Json(mock.history_reply.clone())
}

/// Start the mock and wait until it accepts connections. Returns its base URL.
async fn serve(mock: Arc<Mock>) -> String {
    let port = free_port();
    let app = Router::new()
        .route("/health", get(health))
        .route("/models", get(models))
        .route("/chat", post(chat))
        .route("/history", get(history))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("bind mock server");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = NexusClient::new(Some(base.clone()));
    for _ in 0..100 {
        if client.health().await.is_ok() {
            return base;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("mock server at {} did not come up within 5s", base);
}

#[tokio::test]
async fn client_speaks_the_wire_format() {
    let mock = Arc::new(Mock::new());
    let base = serve(Arc::clone(&mock)).await;
    let client = NexusClient::new(Some(format!("{}/", base)));

    assert!(client.health().await.unwrap().is_online());
    let catalog = client.models().await.unwrap();
    assert_eq!(catalog.online, vec!["Free Web (g4f)", "ChatGPT (OpenAI)"]);
    assert_eq!(catalog.offline, vec!["llama3.2:latest"]);

    let history = client.history().await.unwrap();
    let ids: Vec<&str> = history.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
    assert_eq!(history[0].kind.as_deref(), Some("chat"));
    assert_eq!(history[0].display_timestamp(), "2024-05-01 10:00");
}

#[tokio::test]
async fn history_error_field_is_a_failure() {
    let mut mock = Mock::new();
    mock.history_reply = json!({"error": "Memory module not available"});
    let base = serve(Arc::new(mock)).await;

    let err = NexusClient::new(Some(base)).history().await.unwrap_err();
    assert!(matches!(err, ApiError::Server(ref m) if m == "Memory module not available"));
}

#[tokio::test]
async fn chat_server_error_becomes_transcript_error() {
    let mut mock = Mock::new();
    mock.chat_status = StatusCode::INTERNAL_SERVER_ERROR;
    mock.chat_reply = json!({"detail": "all providers failed"});
    let base = serve(Arc::new(mock)).await;

    let client = NexusClient::new(Some(base.clone()));
    let request = lib::api::ChatRequest {
        query: "hello".to_string(),
        online_models: vec!["Free Web (g4f)".to_string()],
        offline_models: Vec::new(),
        use_memory: true,
        synthesizer_model: None,
    };
    let err = client.chat(request).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status, .. } if status.as_u16() == 500));

    let settings = Settings::in_memory();
    settings.set_api_url(&base).unwrap();
    let config = Config::default();
    let factory = http_backend_factory(&config);
    let mut c = Controller::with_factory(config, settings, factory);
    assert_eq!(c.startup().await.state, ConnectivityState::Connected);
    assert!(c.send("hello").await);
    let roles: Vec<Role> = c.session().transcript().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Error]);
    assert!(!c.session().is_in_flight());
}

#[tokio::test]
async fn chat_without_final_answer_is_malformed() {
    let mut mock = Mock::new();
    mock.chat_reply = json!({"answer": "wrong field"});
    let base = serve(Arc::new(mock)).await;

    let settings = Settings::in_memory();
    settings.set_api_url(&base).unwrap();
    let config = Config::default();
    let factory = http_backend_factory(&config);
    let mut c = Controller::with_factory(config, settings, factory);
    c.startup().await;
    assert!(c.send("hello").await);
    assert_eq!(c.session().transcript()[1].role, Role::Error);
}

#[tokio::test]
async fn controller_round_trip_with_persisted_settings() {
    let mock = Arc::new(Mock::new());
    let base = serve(Arc::clone(&mock)).await;
    let dir = temp_dir();
    let settings_path = dir.join("settings.json");

    {
        let settings = Settings::open_file(&settings_path);
        settings.set_api_url(&base).unwrap();
        let config = Config::default();
        let factory = http_backend_factory(&config);
        let mut c = Controller::with_factory(config, settings, factory);
        let report = c.startup().await;
        assert_eq!(report.state, ConnectivityState::Connected);
        assert!(report.catalog_notice.is_none());
        assert!(c.toggle_model(ModelKind::Offline, "llama3.2:latest").unwrap());

        assert!(c.send("hello").await);
        assert_eq!(
            c.session().transcript(),
            &[Message::user("hello"), Message::assistant("hi there")]
        );
        let history = c.refresh_history().await.unwrap();
        assert_eq!(history.len(), 2);
    }

    let body = mock.chat_bodies.lock().unwrap()[0].clone();
    assert_eq!(body["query"], "hello");
    assert_eq!(body["online_models"], json!(["Free Web (g4f)"]));
    assert_eq!(body["offline_models"], json!(["llama3.2:latest"]));
    assert_eq!(body["use_memory"], true);
    assert!(body.get("synthesizer_model").is_none());

    let reopened = Settings::open_file(&settings_path);
    assert_eq!(reopened.api_url("http://localhost:8000"), base);
    assert_eq!(
        reopened.model_selection(),
        ModelSelection::new(
            vec!["Free Web (g4f)".to_string()],
            vec!["llama3.2:latest".to_string()]
        )
    );
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn unreachable_server_blocks_sending() {
    let settings = Settings::in_memory();
    settings
        .set_api_url(&format!("http://127.0.0.1:{}", free_port()))
        .unwrap();
    let config = Config::default();
    let factory = http_backend_factory(&config);
    let mut c = Controller::with_factory(config, settings, factory);

    let report = c.startup().await;
    assert_eq!(report.state, ConnectivityState::Disconnected);
    assert!(c.catalog().is_empty());
    assert!(!c.send("hello").await);
    assert!(c.session().transcript().is_empty());
}
