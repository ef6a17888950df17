//! The demo host: owns the command manager and turns input lines into
//! dispatches and completions.

use std::sync::Arc;

use cmdforge_commands::{CommandManager, Execution, ResolverRegistry};
use cmdforge_core::{ConfigError, Identity, InMemoryDirectory, Invoker, MainThreadHandle};
use tokio::runtime::Handle;
use tracing::debug;

use crate::config::Config;
use crate::handlers::{EcoAdmin, EcoCommands, Ledger};
use crate::terminal_output::{paint, render_table, DIM};

const ONLINE_PLAYERS: &[&str] = &["alice", "bob", "carol"];
const OFFLINE_PLAYERS: &[&str] = &["dave"];

pub struct Session {
    manager: CommandManager,
}

impl Session {
    pub fn new(config: &Config, main: MainThreadHandle, workers: Option<Handle>) -> Result<Self, ConfigError> {
        let directory = Arc::new(InMemoryDirectory::new());
        for name in ONLINE_PLAYERS {
            directory.join(name);
        }
        for name in OFFLINE_PLAYERS {
            directory.remember(Identity::new(*name));
        }

        let ledger = Arc::new(Ledger::default());
        let mut builder = CommandManager::builder(ResolverRegistry::with_builtins(directory), main)
            .suggestions(config.suggestions.clone())
            .messages(Arc::new(config.messages.clone()));
        if let Some(workers) = workers {
            builder = builder.workers(workers);
        }
        builder.register(EcoCommands::new(ledger.clone()))?;
        builder.register(EcoAdmin::new(ledger))?;

        Ok(Self { manager: builder.build() })
    }

    /// Dispatch one input line. The first token is the root label; a leading
    /// `/` is optional. Unknown input has already been reported to the
    /// invoker when this returns `None`.
    pub fn handle_line(&self, invoker: Arc<dyn Invoker>, line: &str) -> Option<Execution> {
        let tokens = tokenize(line);
        let (root, rest) = tokens.split_first()?;
        let root = root.trim_start_matches('/');
        debug!(invoker = invoker.name(), root, "Dispatching input line");
        self.manager.dispatch(invoker, root, rest).ok()
    }

    /// Completions for the last word of `line`. Trailing whitespace starts a
    /// new, empty word.
    pub fn complete(&self, invoker: &dyn Invoker, line: &str) -> Vec<String> {
        let mut tokens = tokenize(line);
        if tokens.is_empty() || line.ends_with(char::is_whitespace) {
            tokens.push("");
        }
        match tokens.split_first() {
            Some((root, [])) => {
                let prefix = root.trim_start_matches('/').to_lowercase();
                self.manager
                    .roots()
                    .into_iter()
                    .filter(|label| label.starts_with(&prefix))
                    .map(str::to_string)
                    .collect()
            }
            Some((root, rest)) => self.manager.complete(invoker, root.trim_start_matches('/'), rest),
            None => Vec::new(),
        }
    }

    /// Table of every registered route.
    pub fn describe_tree(&self) -> String {
        let mut rows = Vec::new();
        for root in self.manager.roots() {
            let Some(tree) = self.manager.tree(root) else { continue };
            for binding in tree.routes() {
                rows.push(vec![
                    cmdforge_commands::route_label(root, binding),
                    binding.permission.clone().unwrap_or_else(|| "-".to_string()),
                    if binding.run_async { "async".to_string() } else { "sync".to_string() },
                    paint(DIM, binding.description.as_deref().unwrap_or("")),
                ]);
            }
        }
        render_table(&["Route", "Permission", "Mode", "Description"], &rows)
    }
}

fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}
