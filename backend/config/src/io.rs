//! Locating and reading the optional YAML config file.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Explicit config file path.
pub const HERMES_CONFIG: &str = "HERMES_CONFIG";
/// Directory holding `config.yaml`.
pub const HERMES_CONFIG_DIR: &str = "HERMES_CONFIG_DIR";

/// Resolve the Hermes config directory.
/// Priority: `HERMES_CONFIG_DIR` > `~/.hermes/` > `./.hermes`.
pub fn config_dir(env: &HashMap<String, String>) -> PathBuf {
    if let Some(dir) = env.get(HERMES_CONFIG_DIR).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".hermes"))
        .unwrap_or_else(|| PathBuf::from(".hermes"))
}

/// Resolve the config file path. `HERMES_CONFIG` wins over the directory lookup.
pub fn config_file_path(env: &HashMap<String, String>) -> PathBuf {
    match env.get(HERMES_CONFIG).filter(|p| !p.is_empty()) {
        Some(path) => PathBuf::from(path),
        None => config_dir(env).join(CONFIG_FILE_NAME),
    }
}

/// Read the config file as an untyped value tree.
///
/// A missing file is not an error: the process can run entirely from
/// environment variables, so an empty object is returned instead.
pub async fn load_raw(path: &Path) -> Result<Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let value: Value = if raw.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config YAML at: {}", path.display()))?
    };

    Ok(value)
}
