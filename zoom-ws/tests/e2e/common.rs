//! Shared mock servers for e2e tests: a `wiremock` OAuth endpoint and an axum WebSocket
//! endpoint that plays a fixed list of frames and records what the client sent.
//! Run with `RUST_LOG=zoom_ws=debug cargo test -p zoom-ws -- --nocapture` to see logs.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{RawQuery, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCOUNT_ID: &str = "acc-1";
pub const CLIENT_ID: &str = "client-1";
pub const CLIENT_SECRET: &str = "secret-1";

/// `{"content":"{\"event\":\"<event>\"}"}`
pub fn event_frame(event: &str) -> String {
    let inner = serde_json::json!({ "event": event }).to_string();
    serde_json::json!({ "module": "message", "content": inner }).to_string()
}

/// OAuth mock answering every `POST /oauth/token` with `status` and `body`.
/// Returns the server (keep it alive) and the base URL to configure.
pub async fn mock_oauth(status: u16, body: &str) -> (MockServer, String) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    let base = format!("{}/oauth/", server.uri());
    (server, base)
}

#[derive(Clone, Default)]
pub struct StreamLog {
    /// Raw query string of every upgrade request.
    pub queries: Arc<Mutex<Vec<Option<String>>>>,
    /// Text frames received from the client.
    pub received: Arc<Mutex<Vec<String>>>,
}

impl StreamLog {
    pub fn queries(&self) -> Vec<Option<String>> {
        self.queries.lock().unwrap().clone()
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct StreamState {
    frames: Arc<Vec<String>>,
    hold_open: Duration,
    log: StreamLog,
}

/// Mock streaming endpoint on `127.0.0.1:0` at path `/ws`.
///
/// Per connection: sends `frames`, keeps reading client frames for `hold_open`, then sends
/// a close frame and waits for the client's close reply.
pub struct MockStream {
    pub base_url: String,
    pub log: StreamLog,
    handle: JoinHandle<()>,
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_stream(frames: Vec<String>, hold_open: Duration) -> MockStream {
    let log = StreamLog::default();
    let state = StreamState {
        frames: Arc::new(frames),
        hold_open,
        log: log.clone(),
    };
    let app = Router::new().route("/ws", get(upgrade)).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockStream {
        base_url: format!("ws://{}/ws?subscriptionId=sub-1", addr),
        log,
        handle,
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    RawQuery(query): RawQuery,
    State(state): State<StreamState>,
) -> Response {
    state.log.queries.lock().unwrap().push(query);
    ws.on_upgrade(move |socket| play(socket, state))
}

async fn play(mut socket: WebSocket, state: StreamState) {
    for frame in state.frames.iter() {
        if socket.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }

    let deadline = tokio::time::sleep(state.hold_open);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(t))) => state.log.received.lock().unwrap().push(t),
                Some(Ok(_)) => {}
                _ => return,
            },
        }
    }

    if socket.send(Message::Close(None)).await.is_err() {
        return;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(t) = msg {
            state.log.received.lock().unwrap().push(t);
        }
    }
}
