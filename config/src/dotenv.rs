//! Read `.env.local` and `.env` into one key-value map (no overwrite of existing env here;
//! applied in lib).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Dotenv files looked up in the config directory, highest priority first.
pub const DOTENV_FILES: [&str; 2] = [".env.local", ".env"];

/// Directory holding the dotenv files: `override_dir` if given, else current directory.
fn dotenv_dir(override_dir: Option<&Path>) -> Option<PathBuf> {
    override_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
}

/// Parses a single dotenv file with the `dotenv` crate. Missing file returns an empty map.
fn read_file(path: &Path) -> Result<HashMap<String, String>, dotenv::Error> {
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let mut out = HashMap::new();
    for item in dotenv::from_path_iter(path)? {
        let (key, value) = item?;
        out.insert(key, value);
    }
    Ok(out)
}

/// Loads `.env` then `.env.local` from `override_dir` or the current directory, so keys in
/// `.env.local` win. Missing files contribute nothing.
pub fn load_env_map(override_dir: Option<&Path>) -> Result<HashMap<String, String>, dotenv::Error> {
    let Some(dir) = dotenv_dir(override_dir) else {
        return Ok(HashMap::new());
    };
    let mut merged = HashMap::new();
    for name in DOTENV_FILES.iter().rev() {
        merged.extend(read_file(&dir.join(name))?);
    }
    Ok(merged)
}
