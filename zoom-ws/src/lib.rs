//! Client for Zoom WebSocket event subscriptions.
//!
//! A session goes through four steps:
//!
//! 1. [`TokenExchanger::exchange`]: OAuth account-credentials request, one access token.
//! 2. [`connector::connect`]: WebSocket handshake on `<url>&access_token=<token>`.
//! 3. [`Keepalive`]: a `heartbeat` text frame every 30 seconds on its own task.
//! 4. [`Dispatcher::run`]: decode each frame's nested envelope and call the handler
//!    registered for its event name (e.g. [`USER_CREATED`]).
//!
//! [`Session`] ties them together; [`run_session`] is the one-call entry point.
//!
//! **Public API**: [`run_session`], [`Session`], [`SessionConfig`], [`Dispatcher`],
//! [`EventHandler`], [`Credentials`].

pub mod connector;
mod dispatch;
pub mod envelope;
mod keepalive;
mod oauth;
mod outbound;
mod session;

pub use connector::{stream_url, ConnectError, WsStream, DEFAULT_CONNECT_TIMEOUT};
pub use dispatch::{DispatchOutcome, Dispatcher, EventHandler, SessionEnd, USER_CREATED};
pub use envelope::{Envelope, EnvelopeError};
pub use keepalive::{Keepalive, KeepaliveExit, HEARTBEAT_FRAME, HEARTBEAT_INTERVAL};
pub use oauth::{
    basic_credential, parse_token_response, AccessToken, AuthError, Credentials, TokenExchanger,
    DEFAULT_OAUTH_URL, DEFAULT_REQUEST_TIMEOUT,
};
pub use outbound::{FrameSink, SharedSink};
pub use session::{
    run_session, Session, SessionConfig, SessionError, SessionReport, DEFAULT_CLOSE_TIMEOUT,
};
