//! Configuration for zoom-ws.
//!
//! Two steps:
//! 1. [`load_and_apply`] fills the process environment from project `.env.local` / `.env`
//!    and the XDG `config.toml`, with priority
//!    **existing env > .env.local > .env > XDG**.
//! 2. [`Settings::from_env`] reads the required account, client and streaming values.

mod dotenv;
mod settings;
mod xdg_toml;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

pub use settings::{ConfigError, Settings};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read dotenv file: {0}")]
    Dotenv(#[from] ::dotenv::Error),
}

/// Picks the value for every key that is not already present according to `is_set`:
/// dotenv value first, then XDG value.
fn resolve_missing(
    dotenv_map: &HashMap<String, String>,
    xdg_map: &HashMap<String, String>,
    is_set: impl Fn(&str) -> bool,
) -> Vec<(String, String)> {
    let mut keys: HashSet<&String> = xdg_map.keys().collect();
    keys.extend(dotenv_map.keys());

    let mut out: Vec<(String, String)> = keys
        .into_iter()
        .filter(|key| !is_set(key))
        .filter_map(|key| {
            dotenv_map
                .get(key)
                .or_else(|| xdg_map.get(key))
                .map(|v| (key.clone(), v.clone()))
        })
        .collect();
    out.sort();
    out
}

/// Loads `$XDG_CONFIG_HOME/<app_name>/config.toml` and the project dotenv files, then sets
/// environment variables only for keys that are **not** already set.
///
/// * `app_name`: e.g. `"zoom-ws"`, used for the XDG path.
/// * `override_dir`: if `Some`, look for `.env.local` / `.env` in this directory instead of
///   the current directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = dotenv::load_env_map(override_dir)?;

    for (key, value) in resolve_missing(&dotenv_map, &xdg_map, |k| std::env::var_os(k).is_some()) {
        std::env::set_var(key, value);
    }
    Ok(())
}
