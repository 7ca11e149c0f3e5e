//! Periodic `heartbeat` frames on their own task.
//!
//! The first frame goes out one full interval after start. The task ends when its
//! [`CancellationToken`] fires or when a write fails; on failure it only logs and stops,
//! the connection is left to the receive loop.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};

use crate::outbound::FrameSink;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Literal text of every keepalive frame.
pub const HEARTBEAT_FRAME: &str = "heartbeat";

/// Why the keepalive task ended, and how many heartbeats it sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepaliveExit {
    Cancelled { sent: u64 },
    WriteFailed { sent: u64, error: String },
}

impl KeepaliveExit {
    pub fn sent(&self) -> u64 {
        match self {
            KeepaliveExit::Cancelled { sent } | KeepaliveExit::WriteFailed { sent, .. } => *sent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Keepalive {
    interval: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self::new(HEARTBEAT_INTERVAL)
    }
}

impl Keepalive {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fire-and-forget: runs [`Keepalive::run`] on a new tokio task, inside the caller's span.
    pub fn spawn<S>(self, sink: S, cancel: CancellationToken) -> JoinHandle<KeepaliveExit>
    where
        S: FrameSink + 'static,
    {
        tokio::spawn(async move { self.run(&sink, cancel).await }.in_current_span())
    }

    pub async fn run<S>(&self, sink: &S, cancel: CancellationToken) -> KeepaliveExit
    where
        S: FrameSink + ?Sized,
    {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sent = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                r = sink.send_text(HEARTBEAT_FRAME) => r,
            };
            if let Err(e) = result {
                warn!(sent, error = %e, "failed to send heartbeat, stopping keepalive");
                return KeepaliveExit::WriteFailed {
                    sent,
                    error: e.to_string(),
                };
            }
            sent += 1;
            debug!(sent, "heartbeat sent");
        }

        debug!(sent, "keepalive cancelled");
        KeepaliveExit::Cancelled { sent }
    }
}
