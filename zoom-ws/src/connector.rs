//! Opens the streaming WebSocket: base URL plus `&access_token=<token>`, standard handshake.

use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::info;

/// Upper bound for the TCP + TLS + upgrade handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client side of an open streaming connection.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
    #[error("websocket connect timed out after {0:?}")]
    Timeout(Duration),
}

/// Appends the token to a base URL that already carries its own query string.
///
/// `stream_url("wss://example/ws?x=1", "T") == "wss://example/ws?x=1&access_token=T"`
pub fn stream_url(base_url: &str, token: &str) -> String {
    format!("{}&access_token={}", base_url, token)
}

/// Connects to `base_url` authenticated with `token`. Ownership of the stream goes to the
/// caller, who closes it when the session ends.
pub async fn connect(
    base_url: &str,
    token: &str,
    timeout: Duration,
) -> Result<WsStream, ConnectError> {
    let url = stream_url(base_url, token);
    let (ws, response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| ConnectError::Timeout(timeout))?
        .map_err(|e| ConnectError::Handshake(e.to_string()))?;
    info!(url = %base_url, status = %response.status(), "connected to websocket");
    Ok(ws)
}
