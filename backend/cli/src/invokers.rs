//! Invokers for the demo host: the console and named players.

use std::any::Any;
use std::collections::HashSet;

use cmdforge_core::Invoker;
use parking_lot::Mutex;

use crate::terminal_output::{paint, CYAN, GREEN};

/// Everything sent to an invoker, optionally echoed to stdout.
struct Transcript {
    echo: bool,
    lines: Mutex<Vec<String>>,
}

impl Transcript {
    fn new(echo: bool) -> Self {
        Self { echo, lines: Mutex::new(Vec::new()) }
    }

    fn push(&self, prefix: &str, text: &str) {
        if self.echo {
            println!("{prefix} {text}");
        }
        self.lines.lock().push(text.to_string());
    }
}

/// The operator at the terminal. Holds every permission.
pub struct ConsoleSender {
    transcript: Transcript,
}

impl ConsoleSender {
    pub fn new() -> Self {
        Self { transcript: Transcript::new(true) }
    }

    /// Records messages without printing them.
    pub fn quiet() -> Self {
        Self { transcript: Transcript::new(false) }
    }

    pub fn messages(&self) -> Vec<String> {
        self.transcript.lines.lock().clone()
    }
}

impl Invoker for ConsoleSender {
    fn name(&self) -> &str {
        "CONSOLE"
    }

    fn has_permission(&self, _permission: &str) -> bool {
        true
    }

    fn send_message(&self, text: &str) {
        self.transcript.push(&paint(CYAN, "[console]"), text);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Default for ConsoleSender {
    fn default() -> Self {
        Self::new()
    }
}

/// A named player with an explicit permission set.
pub struct PlayerSender {
    name: String,
    permissions: HashSet<String>,
    transcript: Transcript,
}

impl PlayerSender {
    pub fn new<I, S>(name: &str, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            permissions: permissions.into_iter().map(Into::into).collect(),
            transcript: Transcript::new(true),
        }
    }

    pub fn quiet(mut self) -> Self {
        self.transcript.echo = false;
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.transcript.lines.lock().clone()
    }
}

impl Invoker for PlayerSender {
    fn name(&self) -> &str {
        &self.name
    }

    /// `*` grants everything.
    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains("*") || self.permissions.contains(permission)
    }

    fn send_message(&self, text: &str) {
        self.transcript.push(&paint(GREEN, &format!("[to {}]", self.name)), text);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
