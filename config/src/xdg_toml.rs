//! Load the `[env]` table from `$XDG_CONFIG_HOME/<app>/config.toml`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::LoadError;

/// `$XDG_CONFIG_HOME` when set, otherwise the platform config directory.
fn config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, String>,
}

/// Reads `<config_home>/<app_name>/config.toml`. Missing file or missing `[env]` section
/// returns an empty map.
pub fn load_env_map_from(
    config_home: &Path,
    app_name: &str,
) -> Result<HashMap<String, String>, LoadError> {
    let path = config_home.join(app_name).join("config.toml");
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let config: ConfigFile = toml::from_str(&content)?;
    Ok(config.env)
}

/// Returns env key-value pairs from the `[env]` section of the app's XDG config file.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    match config_home() {
        Some(home) => load_env_map_from(&home, app_name),
        None => Ok(HashMap::new()),
    }
}
