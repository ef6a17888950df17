//! Dispatch Event Logger
//!
//! Structured dispatch milestones (registration, denial, rejection, failure,
//! completion) emitted on the `command_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    Registered {
        handler: String,
        description: Option<String>,
    },
    Denied {
        invoker: String,
        permission: String,
    },
    Rejected {
        invoker: String,
        reason: String,
    },
    Failed {
        invoker: String,
        error: String,
    },
    Completed {
        invoker: String,
        run_async: bool,
        elapsed_ms: u64,
    },
}

impl DispatchEvent {
    fn is_problem(&self) -> bool {
        matches!(self, DispatchEvent::Denied { .. } | DispatchEvent::Failed { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub route: String,
    pub timestamp: DateTime<Utc>,
    pub event: DispatchEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Record a dispatch event for `route` (rendered as `/root path`).
    pub fn log_event(route: &str, event: DispatchEvent) {
        let problem = event.is_problem();
        let entry = EventLogEntry {
            route: route.to_string(),
            timestamp: Utc::now(),
            event,
        };
        let payload = serde_json::to_string(&entry).unwrap_or_else(|_| format!("{entry:?}"));

        if problem {
            warn!(target: "command_events", route = %entry.route, event = %payload, "Dispatch event");
        } else {
            info!(target: "command_events", route = %entry.route, event = %payload, "Dispatch event");
        }
    }
}
