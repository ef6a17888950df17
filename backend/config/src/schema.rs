//! cmdforge configuration schema.
//!
//! Every field is optional in the file; `defaults::apply_all_defaults` fills
//! the gaps after loading.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommanderConfig {
    /// Console and file logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Worker pool and completion settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchConfig>,

    /// Message catalog overrides, keyed by message key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// trace | debug | info | warn | error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for the rolling NDJSON log. No file logging when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// JSON console output instead of plain text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Threads in the pool that runs asynchronous routes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,

    /// Most completion candidates returned for one argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion_limit: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_suffix: Option<String>,
}
