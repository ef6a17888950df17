//! Logging for cmdforge.
//!
//! Subscriber setup (console plus rolling NDJSON file) and structured dispatch events.

pub mod event_logger;
pub mod logger;

pub use event_logger::{DispatchEvent, EventLogEntry, EventLogger};
pub use logger::{LOG_FILE_NAME, init_logger};
