//! zoom-ws binary: authenticate, connect and dispatch Zoom WebSocket events until the
//! connection ends.
//!
//! Configuration comes from the environment, `.env.local` / `.env` in the current
//! directory, or `~/.config/zoom-ws/config.toml` (see the `config` crate):
//! `accountId`, `clientId`, `clientSecret`, `url`, optional `oauthUrl`. No flags.
//!
//! Exit code 0 when the connection ends, 1 when startup fails.

mod handlers;
mod log_format;
mod logging;

use config::{ConfigError, Settings};
use std::fmt::Display;
use std::process::ExitCode;
use zoom_ws::{run_session, Credentials, Dispatcher, SessionConfig, USER_CREATED};

const APP_NAME: &str = "zoom-ws";

fn session_config(settings: &Settings) -> SessionConfig {
    let credentials = Credentials::new(
        settings.account_id.clone(),
        settings.client_id.clone(),
        settings.client_secret.clone(),
    );
    let config = SessionConfig::new(credentials, settings.stream_url.clone());
    match &settings.oauth_url {
        Some(url) => config.with_oauth_url(url.clone()),
        None => config,
    }
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new().on(USER_CREATED, handlers::user_created)
}

/// Reports a startup failure on stderr and in the log.
fn fatal(err: &dyn Display) -> ExitCode {
    tracing::error!(error = %err, "startup failed");
    eprintln!("error: {}", err);
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = config::load_and_apply(APP_NAME, None) {
        eprintln!("error: {}", ConfigError::from(e));
        return ExitCode::FAILURE;
    }
    let _log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: init logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => return fatal(&e),
    };
    tracing::debug!(?settings, "configuration loaded");

    match run_session(&session_config(&settings), &dispatcher()).await {
        Ok(report) => {
            tracing::info!(end = %report.end, "websocket session ended");
            ExitCode::SUCCESS
        }
        Err(e) => fatal(&e),
    }
}
