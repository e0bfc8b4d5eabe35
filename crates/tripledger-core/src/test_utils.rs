//! Test utilities for tripledger-core
//!
//! `MockUpstream` is a local axum server standing in for every external
//! collaborator: the OpenAI-compatible chat endpoint, the document extraction
//! endpoint with its token endpoint, and a static host for template workbooks.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

#[derive(Default)]
struct MockState {
    chat_replies: Mutex<VecDeque<(u16, String)>>,
    document: Mutex<Value>,
    templates: Mutex<HashMap<String, Vec<u8>>>,
    token_requests: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
}

/// Mock upstream server for tests
pub struct MockUpstream {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockUpstream {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .route("/document/process", post(handle_document))
            .route("/oauth/token", post(handle_token))
            .route("/templates/:name", get(handle_template))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL (for the OpenAI-compatible backend)
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn document_url(&self) -> String {
        format!("{}/document/process", self.url())
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.url())
    }

    pub fn template_url(&self, name: &str) -> String {
        format!("{}/templates/{}", self.url(), name)
    }

    /// Queue a chat completion reply; non-2xx statuses return `content` as the error body
    pub fn push_chat_reply(&self, status: u16, content: &str) {
        self.state
            .chat_replies
            .lock()
            .unwrap()
            .push_back((status, content.to_string()));
    }

    /// Document returned by the extraction endpoint (`text` + `entities`)
    pub fn set_document(&self, document: Value) {
        *self.state.document.lock().unwrap() = document;
    }

    pub fn set_template(&self, name: &str, bytes: Vec<u8>) {
        self.state
            .templates
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes);
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    /// Authorization header of the latest extraction request
    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_models() -> Json<Value> {
    Json(json!({"object": "list", "data": [{"id": "test-model", "object": "model"}]}))
}

async fn handle_chat(State(state): State<Arc<MockState>>) -> Response {
    let (status, content) = state
        .chat_replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, "{}".to_string()));

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !status.is_success() {
        return (status, content).into_response();
    }

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

async fn handle_document(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Json<Value> {
    *state.last_authorization.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let document = state.document.lock().unwrap().clone();
    Json(json!({ "document": document }))
}

async fn handle_token(State(state): State<Arc<MockState>>) -> Json<Value> {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({"access_token": "mock-token", "token_type": "Bearer", "expires_in": 3600}))
}

async fn handle_template(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
) -> Response {
    match state.templates.lock().unwrap().get(&name) {
        Some(bytes) => (
            [(
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            )],
            bytes.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
