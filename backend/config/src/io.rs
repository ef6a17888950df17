//! Config file location and reading.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Environment variable that overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "CMDFORGE_CONFIG_DIR";

/// Resolve the config directory.
/// Priority: `CMDFORGE_CONFIG_DIR` env > `~/.cmdforge/` > `./.cmdforge/`
pub fn config_dir() -> PathBuf {
    resolve_config_dir(std::env::var(CONFIG_DIR_ENV).ok(), dirs::home_dir())
}

fn resolve_config_dir(env_override: Option<String>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env_override.filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    match home {
        Some(home) => home.join(".cmdforge"),
        None => PathBuf::from(".cmdforge"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as an untyped tree, ready for env substitution.
///
/// Returns `Ok(None)` if the file doesn't exist (first run).
pub async fn load_raw(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if raw.trim().is_empty() {
        debug!(path = %path.display(), "Config file is empty; using defaults");
        return Ok(None);
    }

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(match value {
        Value::Null => None,
        other => Some(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DispatchConfig;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cmdforge-config-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn env_override_wins() {
        let dir = resolve_config_dir(Some("/etc/cmdforge".into()), Some(PathBuf::from("/home/a")));
        assert_eq!(dir, PathBuf::from("/etc/cmdforge"));
        let dir = resolve_config_dir(Some("  ".into()), Some(PathBuf::from("/home/a")));
        assert_eq!(dir, PathBuf::from("/home/a/.cmdforge"));
        assert_eq!(resolve_config_dir(None, None), PathBuf::from(".cmdforge"));
    }

    #[tokio::test]
    async fn missing_and_empty_files_give_defaults() {
        let dir = scratch_dir("missing");
        let path = config_file_path(&dir);
        assert!(load_raw(&path).await.unwrap().is_none());

        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "").unwrap();
        assert!(load_raw(&path).await.unwrap().is_none());
        std::fs::write(&path, "~\n").unwrap();
        assert!(load_raw(&path).await.unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn loads_yaml_as_untyped_tree() {
        let dir = scratch_dir("load");
        std::fs::create_dir_all(&dir).unwrap();
        let path = config_file_path(&dir);
        std::fs::write(&path, "dispatch:\n  workerThreads: 2\nmessages:\n  command.error: Oops\n").unwrap();

        let value = load_raw(&path).await.unwrap().unwrap();
        assert_eq!(value["dispatch"]["workerThreads"], 2);
        assert_eq!(value["messages"]["command.error"], "Oops");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn parse_error_names_the_file() {
        let dir = scratch_dir("broken");
        std::fs::create_dir_all(&dir).unwrap();
        let path = config_file_path(&dir);
        std::fs::write(&path, "dispatch: [unclosed").unwrap();
        let err = format!("{:#}", load_raw(&path).await.unwrap_err());
        assert!(err.contains("config.yaml"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
