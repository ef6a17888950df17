//! Config defaults: fills every unset field after loading.

use crate::schema::{CommanderConfig, DispatchConfig, LoggingConfig};

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_WORKER_THREADS: usize = 4;

pub const DEFAULT_SUGGESTION_LIMIT: usize = 20;

pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "<";

pub const DEFAULT_PLACEHOLDER_SUFFIX: &str = ">";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: CommanderConfig) -> CommanderConfig {
    let config = apply_logging_defaults(config);
    apply_dispatch_defaults(config)
}

fn apply_logging_defaults(mut config: CommanderConfig) -> CommanderConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.json.is_none() {
        logging.json = Some(false);
    }
    config
}

fn apply_dispatch_defaults(mut config: CommanderConfig) -> CommanderConfig {
    let dispatch = config.dispatch.get_or_insert_with(DispatchConfig::default);
    dispatch.worker_threads.get_or_insert(DEFAULT_WORKER_THREADS);
    dispatch.suggestion_limit.get_or_insert(DEFAULT_SUGGESTION_LIMIT);
    dispatch
        .placeholder_prefix
        .get_or_insert_with(|| DEFAULT_PLACEHOLDER_PREFIX.to_string());
    dispatch
        .placeholder_suffix
        .get_or_insert_with(|| DEFAULT_PLACEHOLDER_SUFFIX.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_dispatch_defaults() {
        let cfg = apply_all_defaults(CommanderConfig::default());
        let dispatch = cfg.dispatch.unwrap();
        assert_eq!(dispatch.worker_threads, Some(DEFAULT_WORKER_THREADS));
        assert_eq!(dispatch.suggestion_limit, Some(20));
        assert_eq!(dispatch.placeholder_prefix.as_deref(), Some("<"));
        assert_eq!(dispatch.placeholder_suffix.as_deref(), Some(">"));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn does_not_override_user_values() {
        let cfg = CommanderConfig {
            dispatch: Some(DispatchConfig {
                worker_threads: Some(2),
                placeholder_prefix: Some("[".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let dispatch = apply_all_defaults(cfg).dispatch.unwrap();
        assert_eq!(dispatch.worker_threads, Some(2));
        assert_eq!(dispatch.placeholder_prefix.as_deref(), Some("["));
        assert_eq!(dispatch.suggestion_limit, Some(DEFAULT_SUGGESTION_LIMIT));
    }
}
