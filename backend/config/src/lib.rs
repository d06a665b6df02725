//! `hermes-config`: runtime configuration for the Hermes relay.
//!
//! Load order, later wins:
//! 1. built-in defaults
//! 2. YAML file (`HERMES_CONFIG` or `~/.hermes/config.yaml`), with `${VAR}` substitution
//! 3. well-known environment variables (`TELEGRAM_TOKEN`, `OPENAI_API_KEY`, ...)
//!
//! The result is validated before it is returned; a process that cannot
//! work never starts. Warnings travel back with the config so the caller
//! can report them once its logger is up.

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{apply_env_overrides, process_env, resolve_env_vars, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw};
pub use redact::{redact, redacted_config};
pub use schema::{
    CompletionConfig, FollowUpConfig, GatewayConfig, HermesConfig, LoggingConfig, PromptConfig,
    ReplyConfig, SessionConfig, TelegramConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A validated config plus what the loader noticed along the way.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: HermesConfig,
    /// File the config was read from, `None` when it did not exist.
    pub source: Option<PathBuf>,
    pub warnings: Vec<ConfigValidationError>,
}

impl LoadedConfig {
    /// Emit the load summary and every warning through `tracing`.
    pub fn log(&self) {
        match &self.source {
            Some(path) => tracing::info!(path = %path.display(), "loaded config file"),
            None => tracing::info!("no config file; using defaults and environment"),
        }
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "config warning");
        }
    }
}

/// Load the config from the process environment and the default file location.
pub async fn load() -> Result<LoadedConfig> {
    let env = process_env();
    let path = config_file_path(&env);
    load_from(&path, &env).await
}

/// Load, substitute, override and validate.
pub async fn load_from(path: &Path, env: &HashMap<String, String>) -> Result<LoadedConfig> {
    let source = tokio::fs::try_exists(path)
        .await
        .unwrap_or(false)
        .then(|| path.to_path_buf());
    let raw = load_raw(path).await?;
    let config = prepare(raw, env)?;
    let report = validate(&config);
    if !report.is_valid() {
        bail!("invalid configuration:\n{}", report.summary());
    }
    Ok(LoadedConfig {
        config,
        source,
        warnings: report.warnings,
    })
}

/// Build the typed config without validating it.
pub fn prepare(raw: Value, env: &HashMap<String, String>) -> Result<HermesConfig> {
    let value = resolve_env_vars(&raw, env).context("failed to resolve env vars in config")?;
    let config: HermesConfig =
        serde_json::from_value(value).context("config file does not match the expected schema")?;
    apply_env_overrides(config, env)
}
