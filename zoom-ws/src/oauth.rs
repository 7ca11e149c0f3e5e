//! OAuth account-credentials exchange: one POST, one access token, no retry.
//!
//! Request shape:
//! `POST {base}token?grant_type=account_credentials&account_id=<id>` with
//! `Authorization: Basic base64(client_id:client_secret)`.

use base64::prelude::*;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// OAuth base used when no override is configured.
pub const DEFAULT_OAUTH_URL: &str = "https://zoom.us/oauth/";

/// Upper bound for the whole token request, response body included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const GRANT_TYPE: &str = "account_credentials";

#[derive(Error, Debug)]
pub enum AuthError {
    /// The HTTP call could not be made, or the server answered with a non-success status.
    #[error("token request failed: {0}")]
    Request(String),
    /// The response body is not JSON.
    #[error("token response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    /// The body is JSON but carries no string `access_token`.
    #[error("token response: {0}")]
    Protocol(String),
}

/// Account and client credentials, fixed at construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    account_id: String,
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(
        account_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Value of the `Authorization` header: `Basic base64(client_id:client_secret)`.
    pub fn basic_authorization(&self) -> String {
        format!(
            "Basic {}",
            basic_credential(&self.client_id, &self.client_secret)
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Standard padded base64 of `client_id:client_secret`.
pub fn basic_credential(client_id: &str, client_secret: &str) -> String {
    BASE64_STANDARD.encode(format!("{}:{}", client_id, client_secret))
}

/// Bearer token for one session. Never refreshed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(<{} bytes>)", self.0.len())
    }
}

/// Extracts the string `access_token` from a token endpoint body.
pub fn parse_token_response(body: &str) -> Result<AccessToken, AuthError> {
    let value: Value = serde_json::from_str(body)?;
    let obj = value
        .as_object()
        .ok_or_else(|| AuthError::Protocol("expected a JSON object".to_string()))?;
    match obj.get("access_token") {
        Some(Value::String(token)) => Ok(AccessToken(token.clone())),
        Some(_) => Err(AuthError::Protocol(
            "access_token is not a string".to_string(),
        )),
        None => Err(AuthError::Protocol("access_token not found".to_string())),
    }
}

/// Performs the token request against an OAuth base URL.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl Default for TokenExchanger {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_OAUTH_URL)
    }
}

impl TokenExchanger {
    pub fn new() -> Self {
        Self::default()
    }

    /// `base_url` is used as a prefix, so it should end with `/` (e.g. `https://zoom.us/oauth/`).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn token_url(&self) -> String {
        format!("{}token", self.base_url)
    }

    pub async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        debug!(account = %credentials.account_id(), url = %self.token_url(), "requesting access token");
        let res = self
            .client
            .post(self.token_url())
            .query(&[
                ("grant_type", GRANT_TYPE),
                ("account_id", credentials.account_id()),
            ])
            .header(AUTHORIZATION, credentials.basic_authorization())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::Request(format!(
                "OAuth endpoint returned {}: {}",
                status, body
            )));
        }
        parse_token_response(&body)
    }
}
