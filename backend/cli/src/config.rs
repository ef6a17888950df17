use std::path::PathBuf;

use cmdforge_commands::{MessageCatalog, SuggestionSettings};
use cmdforge_config::defaults::{
    DEFAULT_LOG_LEVEL, DEFAULT_PLACEHOLDER_PREFIX, DEFAULT_PLACEHOLDER_SUFFIX,
    DEFAULT_SUGGESTION_LIMIT, DEFAULT_WORKER_THREADS,
};
use cmdforge_config::CommanderConfig;

/// Host runtime settings derived from a prepared `CommanderConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub log_json: bool,
    pub worker_threads: usize,
    pub suggestions: SuggestionSettings,
    pub messages: MessageCatalog,
}

impl From<&CommanderConfig> for Config {
    fn from(config: &CommanderConfig) -> Self {
        let logging = config.logging.clone().unwrap_or_default();
        let dispatch = config.dispatch.clone().unwrap_or_default();
        Self {
            log_level: logging.level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_dir: logging.dir,
            log_json: logging.json.unwrap_or(false),
            worker_threads: dispatch.worker_threads.unwrap_or(DEFAULT_WORKER_THREADS),
            suggestions: SuggestionSettings {
                limit: dispatch.suggestion_limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT),
                placeholder_prefix: dispatch
                    .placeholder_prefix
                    .unwrap_or_else(|| DEFAULT_PLACEHOLDER_PREFIX.to_string()),
                placeholder_suffix: dispatch
                    .placeholder_suffix
                    .unwrap_or_else(|| DEFAULT_PLACEHOLDER_SUFFIX.to_string()),
            },
            messages: MessageCatalog::with_overrides(config.messages.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdforge_config::{apply_all_defaults, DispatchConfig};

    #[test]
    fn maps_defaults() {
        let config = Config::from(&apply_all_defaults(CommanderConfig::default()));
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.suggestions, SuggestionSettings::default());
        assert_eq!(config.log_level, "info");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn maps_overrides() {
        let mut raw = CommanderConfig {
            dispatch: Some(DispatchConfig {
                suggestion_limit: Some(5),
                placeholder_prefix: Some("[".into()),
                placeholder_suffix: Some("]".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        raw.messages
            .insert("command.no-permission".into(), "Nope.".into());

        let config = Config::from(&raw);
        assert_eq!(config.suggestions.limit, 5);
        assert_eq!(config.suggestions.placeholder_prefix, "[");
        assert_eq!(config.messages.format("command.no-permission", &[]), "Nope.");
        assert_eq!(
            config.messages.format("command.unknown", &[("command", "x".into())]),
            "Unknown command: x"
        );
    }
}
