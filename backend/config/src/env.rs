//! Environment handling for the config pipeline.
//!
//! Two passes run against the same variable map:
//! - `${VAR_NAME}` references inside YAML string values are substituted
//!   (uppercase `[A-Z_][A-Z0-9_]*` names only, `$${VAR}` escapes to a literal).
//! - Well-known variables such as `TELEGRAM_TOKEN` override the typed config.

use anyhow::{bail, Result};
use hermes_core::{CompletionMode, MessageFormat};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::schema::HermesConfig;

pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ASSISTANT_ID: &str = "ASSISTANT_ID";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const PORT: &str = "PORT";
pub const HERMES_BIND: &str = "HERMES_BIND";
pub const HERMES_COMPLETION_MODE: &str = "HERMES_COMPLETION_MODE";
pub const HERMES_MODEL: &str = "HERMES_MODEL";
pub const HERMES_PARSE_MODE: &str = "HERMES_PARSE_MODE";
pub const HERMES_INSTRUCTIONS: &str = "HERMES_INSTRUCTIONS";
pub const HERMES_LOG_LEVEL: &str = "HERMES_LOG_LEVEL";
pub const HERMES_LOG_DIR: &str = "HERMES_LOG_DIR";
pub const HERMES_LOG_JSON: &str = "HERMES_LOG_JSON";

/// `$${NAME}` or `${NAME}`; group 1 is the escape marker.
static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex is valid")
});

#[derive(Debug, thiserror::Error)]
#[error("missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Snapshot of the process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Substitute `${VAR}` references across a config value tree.
///
/// Only string leaves are touched. A reference to an unset or empty variable
/// is an error naming the variable and the config path it appeared at.
pub fn resolve_env_vars(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    Ok(match value {
        Value::String(s) => Value::String(substitute_string(s, env, path)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key.clone(), substitute_value(child, env, &child_path)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing: Option<String> = None;
    let replaced = REFERENCE.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    if let Some(var_name) = missing {
        bail!(MissingEnvVarError {
            var_name,
            config_path: path.to_string(),
        });
    }
    Ok(replaced.into_owned())
}

/// Apply well-known environment variables on top of the file config.
///
/// Empty values are treated as unset. Values that fail to parse are
/// returned as errors rather than silently ignored.
pub fn apply_env_overrides(
    mut config: HermesConfig,
    env: &HashMap<String, String>,
) -> Result<HermesConfig> {
    let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(v) = get(TELEGRAM_TOKEN) {
        config.telegram.bot_token = Some(v.to_string());
    }
    if let Some(v) = get(OPENAI_API_KEY) {
        config.completion.api_key = Some(v.to_string());
    }
    if let Some(v) = get(ASSISTANT_ID) {
        config.completion.assistant_id = Some(v.to_string());
    }
    if let Some(v) = get(OPENAI_BASE_URL) {
        config.completion.base_url = v.to_string();
    }
    if let Some(v) = get(HERMES_COMPLETION_MODE) {
        config.completion.mode = v
            .parse::<CompletionMode>()
            .map_err(|e| anyhow::anyhow!("{HERMES_COMPLETION_MODE}: {e}"))?;
    }
    if let Some(v) = get(HERMES_PARSE_MODE) {
        config.telegram.parse_mode = v
            .parse::<MessageFormat>()
            .map_err(|e| anyhow::anyhow!("{HERMES_PARSE_MODE}: {e}"))?;
    }
    if let Some(v) = get(HERMES_MODEL) {
        config.completion.model = v.to_string();
    }
    if let Some(v) = env.get(HERMES_INSTRUCTIONS).filter(|v| !v.trim().is_empty()) {
        config.prompt.instructions = v.clone();
    }
    if let Some(v) = get(PORT) {
        config.gateway.port = v
            .parse()
            .map_err(|_| anyhow::anyhow!("{PORT}: '{v}' is not a valid port"))?;
    }
    if let Some(v) = get(HERMES_BIND) {
        config.gateway.bind = v.to_string();
    }
    if let Some(v) = get(HERMES_LOG_LEVEL) {
        config.logging.level = v.to_string();
    }
    if let Some(v) = get(HERMES_LOG_DIR) {
        config.logging.dir = Some(PathBuf::from(v));
    }
    if let Some(v) = get(HERMES_LOG_JSON) {
        config.logging.json = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
    }

    Ok(config)
}
