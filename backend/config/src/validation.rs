//! Config validation with field paths in every message.

use crate::schema::CommanderConfig;
use thiserror::Error;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Every error and warning found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &CommanderConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_logging(config, &mut report);
    validate_dispatch(config, &mut report);
    validate_messages(config, &mut report);
    report
}

fn validate_logging(config: &CommanderConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            report.warn(
                "logging.level",
                format!("Unknown level '{level}'; expected one of {}", LOG_LEVELS.join(", ")),
            );
        }
    }
}

fn validate_dispatch(config: &CommanderConfig, report: &mut ValidationReport) {
    let Some(dispatch) = &config.dispatch else { return };
    if dispatch.worker_threads == Some(0) {
        report.error("dispatch.workerThreads", "workerThreads must be >= 1");
    }
    if dispatch.suggestion_limit == Some(0) {
        report.error("dispatch.suggestionLimit", "suggestionLimit must be >= 1");
    }
    if dispatch.placeholder_prefix.as_deref() == Some("") {
        report.error("dispatch.placeholderPrefix", "placeholderPrefix cannot be empty");
    }
    if dispatch.placeholder_suffix.as_deref() == Some("") {
        report.error("dispatch.placeholderSuffix", "placeholderSuffix cannot be empty");
    }
}

fn validate_messages(config: &CommanderConfig, report: &mut ValidationReport) {
    for (key, template) in &config.messages {
        if key.trim().is_empty() {
            report.error("messages", "Message key cannot be empty");
        } else if template.is_empty() {
            report.warn(format!("messages.{key}"), "Empty template; the message will be blank");
        }
    }
}
