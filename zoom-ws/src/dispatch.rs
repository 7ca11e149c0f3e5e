//! Receive loop: read a frame, decode the envelope, call the handler registered for its
//! event name.
//!
//! Per frame: `AWAITING_FRAME -> DECODING_OUTER -> DECODING_INNER -> DISPATCHING` and
//! back. Decode problems skip the frame; only a read error or the end of the stream
//! leaves the loop. Handlers run synchronously, so the next frame is read only after the
//! handler returns.

use futures_util::{Stream, StreamExt};
use std::collections::HashMap;
use std::fmt;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use crate::envelope::{self, Envelope, EnvelopeError};

/// Event emitted when a user is added to the account.
pub const USER_CREATED: &str = "user.created";

/// Callback for one event name.
pub trait EventHandler: Send + Sync {
    fn handle(&self, envelope: &Envelope);
}

impl<F> EventHandler for F
where
    F: Fn(&Envelope) + Send + Sync,
{
    fn handle(&self, envelope: &Envelope) {
        self(envelope)
    }
}

/// Result of feeding one text frame to [`Dispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran for this event.
    Handled(String),
    /// Decoded, but no handler is registered for the event.
    Unhandled(String),
    Skipped(EnvelopeError),
}

/// How the receive loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the connection (close frame or end of stream).
    Closed,
    /// Reading failed; the connection is considered lost.
    ReadError(String),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Closed => write!(f, "connection closed by peer"),
            SessionEnd::ReadError(e) => write!(f, "read error: {}", e),
        }
    }
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Box<dyn EventHandler>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        events.sort_unstable();
        f.debug_struct("Dispatcher").field("events", &events).finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event`, replacing any previous one.
    pub fn on(mut self, event: impl Into<String>, handler: impl EventHandler + 'static) -> Self {
        self.register(event, handler);
        self
    }

    pub fn register(&mut self, event: impl Into<String>, handler: impl EventHandler + 'static) {
        self.handlers.insert(event.into(), Box::new(handler));
    }

    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Decodes one text frame and runs the matching handler, if any.
    pub fn dispatch(&self, text: &str) -> DispatchOutcome {
        debug!(frame = %text, "received message");
        let envelope = match envelope::decode(text) {
            Ok(env) => env,
            Err(e) => {
                match &e {
                    EnvelopeError::Outer(_) => warn!(error = %e, "skipping malformed frame"),
                    _ => debug!(error = %e, "skipping frame"),
                }
                return DispatchOutcome::Skipped(e);
            }
        };

        info!(event = %envelope.event, "event received");
        if let Ok(pretty) = serde_json::to_string_pretty(&envelope.content) {
            debug!("received content:\n{}", pretty);
        }

        match self.handlers.get(&envelope.event) {
            Some(handler) => {
                handler.handle(&envelope);
                DispatchOutcome::Handled(envelope.event)
            }
            None => DispatchOutcome::Unhandled(envelope.event),
        }
    }

    /// Runs the receive loop until the stream ends or yields an error.
    pub async fn run<S>(&self, mut stream: S) -> SessionEnd
    where
        S: Stream<Item = Result<Message, WsError>> + Unpin,
    {
        while let Some(next) = stream.next().await {
            let msg = match next {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "error reading message");
                    return SessionEnd::ReadError(e.to_string());
                }
            };
            match msg {
                Message::Text(text) => {
                    self.dispatch(&text);
                }
                Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        self.dispatch(text);
                    }
                    Err(e) => debug!(error = %e, "skipping non UTF-8 binary frame"),
                },
                Message::Close(frame) => {
                    info!(?frame, "close frame received");
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        info!("websocket connection closed");
        SessionEnd::Closed
    }
}
