//! Write side of a session.
//!
//! The receive loop owns the read half exclusively; every writer (keepalive, close) goes
//! through [`SharedSink`], whose mutex serializes frames on the write half.

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::connector::WsStream;

/// Write side of a connection: text frames, then one close frame.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), WsError>;

    /// Sends a close frame and flushes. Errors mean the peer is already gone.
    async fn close(&self) -> Result<(), WsError>;
}

/// Cloneable, mutex-guarded write half of a [`WsStream`].
#[derive(Clone)]
pub struct SharedSink {
    inner: Arc<Mutex<SplitSink<WsStream, Message>>>,
}

impl SharedSink {
    pub fn new(sink: SplitSink<WsStream, Message>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }
}

#[async_trait]
impl FrameSink for SharedSink {
    async fn send_text(&self, text: &str) -> Result<(), WsError> {
        self.inner
            .lock()
            .await
            .send(Message::Text(text.to_string()))
            .await
    }

    async fn close(&self) -> Result<(), WsError> {
        self.inner.lock().await.close().await
    }
}
