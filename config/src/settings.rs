//! Required process settings: account, client credentials and the streaming URL.

use std::fmt;
use thiserror::Error;

use crate::LoadError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("load configuration: {0}")]
    Load(#[from] LoadError),
}

/// Accepted names for one setting: the camelCase name first, then the upper-case alias.
struct Key {
    name: &'static str,
    alias: &'static str,
}

const ACCOUNT_ID: Key = Key { name: "accountId", alias: "ACCOUNT_ID" };
const CLIENT_ID: Key = Key { name: "clientId", alias: "CLIENT_ID" };
const CLIENT_SECRET: Key = Key { name: "clientSecret", alias: "CLIENT_SECRET" };
const STREAM_URL: Key = Key { name: "url", alias: "WS_URL" };
const OAUTH_URL: Key = Key { name: "oauthUrl", alias: "OAUTH_URL" };

impl Key {
    /// First non-empty value under either name.
    fn read(&self, lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
        [self.name, self.alias]
            .into_iter()
            .filter_map(|k| lookup(k))
            .find(|v| !v.trim().is_empty())
    }
}

/// Settings for one streaming session.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Streaming endpoint base URL, including its own query string.
    pub stream_url: String,
    /// Overrides the OAuth base URL when set.
    pub oauth_url: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("account_id", &self.account_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("stream_url", &self.stream_url)
            .field("oauth_url", &self.oauth_url)
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Every missing required key is reported at once,
    /// by its camelCase name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut required = |key: &Key| {
            let value = key.read(&lookup);
            if value.is_none() {
                missing.push(key.name);
            }
            value.unwrap_or_default()
        };
        let account_id = required(&ACCOUNT_ID);
        let client_id = required(&CLIENT_ID);
        let client_secret = required(&CLIENT_SECRET);
        let stream_url = required(&STREAM_URL);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        Ok(Self {
            account_id,
            client_id,
            client_secret,
            stream_url,
            oauth_url: OAUTH_URL.read(&lookup),
        })
    }
}
