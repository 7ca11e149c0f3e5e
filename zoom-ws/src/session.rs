//! Session lifecycle: token exchange, connect, keepalive, receive loop, close.
//!
//! ```text
//! Session::open  ── TokenExchanger::exchange ──> connector::connect ──> split
//! run_to_end     ── start_keepalive (task) ─┐
//!                ── Dispatcher::run (this task) ── end ──> cancel keepalive ──> close
//! ```
//!
//! One `Session` owns one connection. The read half belongs to the receive loop, the
//! write half is shared with the keepalive task through [`SharedSink`]. Dropping a
//! session cancels its keepalive task.

use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::connector::{self, ConnectError, WsStream, DEFAULT_CONNECT_TIMEOUT};
use crate::dispatch::{Dispatcher, SessionEnd};
use crate::keepalive::{Keepalive, KeepaliveExit, HEARTBEAT_INTERVAL};
use crate::oauth::{
    AccessToken, AuthError, Credentials, TokenExchanger, DEFAULT_OAUTH_URL,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::outbound::{FrameSink, SharedSink};

/// Upper bound for sending the close frame when a session ends.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Startup failures. All of them are fatal for the session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("get access token: {0}")]
    Auth(#[from] AuthError),
    #[error("connect websocket: {0}")]
    Connect(#[from] ConnectError),
}

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub credentials: Credentials,
    /// Streaming base URL, already carrying its own query string.
    pub stream_url: String,
    pub oauth_url: String,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    /// Bounds the whole token request, response body included.
    pub request_timeout: Duration,
    pub close_timeout: Duration,
}

impl SessionConfig {
    pub fn new(credentials: Credentials, stream_url: impl Into<String>) -> Self {
        Self {
            credentials,
            stream_url: stream_url.into(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    pub fn with_oauth_url(mut self, oauth_url: impl Into<String>) -> Self {
        self.oauth_url = oauth_url.into();
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

/// Outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub end: SessionEnd,
    /// `None` when the keepalive task never ran or panicked.
    pub keepalive: Option<KeepaliveExit>,
}

pub struct Session {
    credentials: Credentials,
    token: AccessToken,
    sink: SharedSink,
    reader: Option<SplitStream<WsStream>>,
    keepalive: Option<JoinHandle<KeepaliveExit>>,
    heartbeat_interval: Duration,
    close_timeout: Duration,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("token", &self.token)
            .field("receive_started", &self.reader.is_none())
            .field("keepalive_started", &self.keepalive.is_some())
            .finish()
    }
}

impl Session {
    /// Exchanges credentials for a token and opens the streaming connection.
    pub async fn open(config: &SessionConfig) -> Result<Self, SessionError> {
        let exchanger = TokenExchanger::with_base_url(config.oauth_url.clone())
            .with_timeout(config.request_timeout);
        let token = exchanger.exchange(&config.credentials).await?;
        info!("access token obtained");

        let ws = connector::connect(
            &config.stream_url,
            token.as_str(),
            config.connect_timeout,
        )
        .await?;
        let (sink, reader) = ws.split();

        let cancel = CancellationToken::new();
        Ok(Self {
            credentials: config.credentials.clone(),
            token,
            sink: SharedSink::new(sink),
            reader: Some(reader),
            keepalive: None,
            heartbeat_interval: config.heartbeat_interval,
            close_timeout: config.close_timeout,
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.token
    }

    /// Spawns the keepalive task. Calling it again is a no-op.
    pub fn start_keepalive(&mut self) {
        if self.keepalive.is_some() {
            debug!("keepalive already running");
            return;
        }
        let keepalive = Keepalive::new(self.heartbeat_interval);
        let handle = keepalive.spawn(self.sink.clone(), self.cancel.child_token());
        self.keepalive = Some(handle);
    }

    /// Runs the receive loop on the current task. When it ends the keepalive task is
    /// cancelled. A second call returns [`SessionEnd::Closed`] immediately.
    pub async fn run(&mut self, dispatcher: &Dispatcher) -> SessionEnd {
        let Some(reader) = self.reader.take() else {
            warn!("receive loop already ran for this session");
            return SessionEnd::Closed;
        };
        let end = dispatcher.run(reader).await;
        self.cancel.cancel();
        end
    }

    /// Stops keepalive and sends a close frame, waiting at most the configured close
    /// timeout for it. Returns how the keepalive task ended.
    pub async fn close(mut self) -> Option<KeepaliveExit> {
        self.cancel.cancel();
        let exit = match self.keepalive.take() {
            Some(handle) => match handle.await {
                Ok(exit) => Some(exit),
                Err(e) => {
                    warn!(error = %e, "keepalive task failed");
                    None
                }
            },
            None => None,
        };
        close_sink(&self.sink, self.close_timeout).await;
        info!(heartbeats = exit.as_ref().map(KeepaliveExit::sent), "session closed");
        exit
    }

    /// Keepalive + receive loop + close, in that order.
    pub async fn run_to_end(mut self, dispatcher: &Dispatcher) -> SessionReport {
        self.start_keepalive();
        let end = self.run(dispatcher).await;
        let keepalive = self.close().await;
        SessionReport { end, keepalive }
    }
}

/// Sends the close frame unless `limit` elapses first. Failures are only logged.
async fn close_sink<S>(sink: &S, limit: Duration)
where
    S: FrameSink + ?Sized,
{
    match tokio::time::timeout(limit, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "close frame not sent"),
        Err(_) => warn!(timeout = ?limit, "close frame not flushed in time, dropping connection"),
    }
}

/// Opens a session for `config` and runs it to the end inside a `session` span.
pub async fn run_session(
    config: &SessionConfig,
    dispatcher: &Dispatcher,
) -> Result<SessionReport, SessionError> {
    let span = info_span!("session", account = %config.credentials.account_id());
    async {
        let session = Session::open(config).await?;
        Ok::<_, SessionError>(session.run_to_end(dispatcher).await)
    }
    .instrument(span)
    .await
}
