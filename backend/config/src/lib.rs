//! `cmdforge-config`: static settings for the command engine.
//!
//! Provides:
//! - Typed config schema (logging, dispatch, message overrides)
//! - YAML loading (a missing or empty file means defaults)
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with field paths

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw, CONFIG_DIR_ENV};
pub use schema::{CommanderConfig, DispatchConfig, LoggingConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load, substitute env vars, apply defaults and validate.
///
/// This is the main entry point for loading a config at runtime. Warnings are
/// logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<CommanderConfig> {
    let raw = load_raw(path).await?;
    prepare(raw, &std::env::vars().collect())
}

fn prepare(raw: Option<Value>, env: &HashMap<String, String>) -> Result<CommanderConfig> {
    let config: CommanderConfig = match raw {
        Some(value) => {
            let value = resolve_env_vars_with(&value, env)
                .context("Failed to resolve env vars in config")?;
            serde_json::from_value(value).context("Failed to deserialize config after processing")?
        }
        None => CommanderConfig::default(),
    };

    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.first() {
        bail!("{first} ({} error(s) total)", report.errors.len());
    }

    Ok(config)
}
