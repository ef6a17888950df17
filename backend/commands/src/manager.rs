//! Command manager: registers handlers into dispatch trees and routes
//! host input to the executor.

use std::sync::Arc;

use cmdforge_core::{ConfigError, DispatchError, Invoker, MainThreadHandle};
use cmdforge_logging::{DispatchEvent, EventLogger};
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::dispatch::{DispatchExecutor, Execution, Responder};
use crate::handlers::CommandHandler;
use crate::messages::{MessageCatalog, MessageRenderer};
use crate::registry::ResolverRegistry;
use crate::suggest::SuggestionSettings;
use crate::tree::{CommandTree, TreeBuilder, route_label};
use crate::types::RouteBinding;

pub struct CommandManagerBuilder {
    resolvers: Arc<ResolverRegistry>,
    main: MainThreadHandle,
    settings: SuggestionSettings,
    messages: Arc<dyn MessageRenderer>,
    workers: Option<Handle>,
    trees: Option<TreeBuilder>,
}

impl CommandManagerBuilder {
    /// Freezes `resolvers`. Host resolvers must already be registered.
    pub fn new(resolvers: ResolverRegistry, main: MainThreadHandle) -> Self {
        Self {
            resolvers: Arc::new(resolvers),
            main,
            settings: SuggestionSettings::default(),
            messages: Arc::new(MessageCatalog::new()),
            workers: None,
            trees: None,
        }
    }

    /// Must be set before the first `register`.
    pub fn suggestions(mut self, settings: SuggestionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn messages(mut self, messages: Arc<dyn MessageRenderer>) -> Self {
        self.messages = messages;
        self
    }

    /// Runtime whose blocking pool runs asynchronous routes.
    pub fn workers(mut self, workers: Handle) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Bind every route of `handler` under each of its root labels. Returns
    /// the number of routes. On error nothing from this handler is kept.
    pub fn register<H: CommandHandler>(&mut self, handler: H) -> Result<usize, ConfigError> {
        let handler = Arc::new(handler);
        let name = handler.name().to_string();
        let labels = root_labels(&name, handler.roots())?;

        let class_permission = handler.permission().map(str::to_string);
        let bindings = handler
            .routes()
            .into_iter()
            .map(|spec| RouteBinding::bind(&handler, spec, class_permission.as_deref()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        if bindings.is_empty() {
            debug!(handler = %name, "Handler declares no routes; skipping");
            return Ok(0);
        }

        let settings = &self.settings;
        let resolvers = &self.resolvers;
        self.trees
            .get_or_insert_with(|| TreeBuilder::new(Arc::clone(resolvers), settings.clone()))
            .insert_all(&labels, &bindings)?;

        for label in &labels {
            for binding in &bindings {
                EventLogger::log_event(
                    &route_label(label, binding),
                    DispatchEvent::Registered {
                        handler: name.clone(),
                        description: binding.description.clone(),
                    },
                );
            }
        }
        info!(handler = %name, routes = bindings.len(), roots = ?labels, "Registered command handler");
        Ok(bindings.len())
    }

    pub fn build(self) -> CommandManager {
        let responder = Responder::new(self.main, self.messages);
        let mut executor = DispatchExecutor::new(Arc::clone(&self.resolvers), responder);
        if let Some(workers) = self.workers {
            executor = executor.with_workers(workers);
        }
        CommandManager {
            resolvers: self.resolvers,
            trees: self.trees.map(TreeBuilder::build).unwrap_or_default(),
            executor,
        }
    }
}

fn root_labels(handler: &str, roots: &[&str]) -> Result<Vec<String>, ConfigError> {
    if roots.is_empty() {
        return Err(ConfigError::NoRootLabel { handler: handler.to_string() });
    }
    let mut labels: Vec<String> = Vec::with_capacity(roots.len());
    for root in roots {
        let label = root.trim().to_lowercase();
        if label.is_empty() || label.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidRootLabel {
                handler: handler.to_string(),
                label: root.to_string(),
            });
        }
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    Ok(labels)
}

pub struct CommandManager {
    resolvers: Arc<ResolverRegistry>,
    trees: Vec<CommandTree>,
    executor: DispatchExecutor,
}

impl CommandManager {
    pub fn builder(resolvers: ResolverRegistry, main: MainThreadHandle) -> CommandManagerBuilder {
        CommandManagerBuilder::new(resolvers, main)
    }

    /// Registered root labels, in registration order.
    pub fn roots(&self) -> Vec<&str> {
        self.trees.iter().map(CommandTree::label).collect()
    }

    pub fn tree(&self, root: &str) -> Option<&CommandTree> {
        let root = root.to_lowercase();
        self.trees.iter().find(|t| t.label() == root)
    }

    pub fn resolvers(&self) -> &Arc<ResolverRegistry> {
        &self.resolvers
    }

    pub fn executor(&self) -> &DispatchExecutor {
        &self.executor
    }

    /// Match `tokens` under `root` and execute the route. Input that matches
    /// no route is reported to the invoker and returned as an error.
    pub fn dispatch<S: AsRef<str>>(
        &self,
        invoker: Arc<dyn Invoker>,
        root: &str,
        tokens: &[S],
    ) -> Result<Execution, DispatchError> {
        let Some(found) = self.tree(root).and_then(|tree| tree.find(tokens)) else {
            let line = std::iter::once(root)
                .chain(tokens.iter().map(|t| t.as_ref()))
                .collect::<Vec<_>>()
                .join(" ");
            debug!(invoker = invoker.name(), line = %line, "No route matched");
            let err = DispatchError::UnknownCommand(line);
            self.executor.responder().send_key(&invoker, err.message_key(), &err.placeholders());
            return Err(err);
        };
        Ok(self.executor.execute(&found.label(), found.binding, invoker, &found.captures))
    }

    /// Completions for the last token of `tokens` under `root`.
    pub fn complete<S: AsRef<str>>(&self, invoker: &dyn Invoker, root: &str, tokens: &[S]) -> Vec<String> {
        self.tree(root)
            .map(|tree| tree.complete(tokens, invoker))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Mutex;

    use super::*;
    use crate::dispatch::{DispatchStatus, Invocation};
    use crate::handlers::RouteSpec;
    use crate::testing::TestInvoker;
    use cmdforge_core::{Identity, InMemoryDirectory, MainThread};

    const INTERNAL_ERROR: &str = "An internal error occurred while running this command.";

    #[derive(Default)]
    struct Eco {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Eco {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn balance(&self, inv: &mut Invocation) -> anyhow::Result<()> {
            let player = inv.arguments().get::<String>("player").cloned();
            self.record(format!("balance {}", player.unwrap_or_default()));
            inv.reply("Balance: 10");
            Ok(())
        }

        fn balance_of(&self, inv: &mut Invocation) -> anyhow::Result<()> {
            let player = inv.arg::<Identity>("player")?;
            self.record(format!("balance_of {}", player.name));
            Ok(())
        }

        fn give(&self, inv: &mut Invocation) -> anyhow::Result<()> {
            let player = inv.arg::<Identity>("player")?.name.clone();
            let amount = *inv.arg::<i64>("amount")?;
            self.record(format!("give {player} {amount} by {}", inv.invoker().name()));
            inv.reply(format!("Gave {amount} to {player}"));
            Ok(())
        }

        fn fail(&self, _inv: &mut Invocation) -> anyhow::Result<()> {
            anyhow::bail!("ledger unavailable")
        }

        fn boom(&self, _inv: &mut Invocation) -> anyhow::Result<()> {
            panic!("ledger corrupted")
        }

        fn console(&self, inv: &mut Invocation) -> anyhow::Result<()> {
            let console = inv.sender::<Console>()?;
            self.record(format!("console {}", console.name()));
            Ok(())
        }
    }

    impl CommandHandler for Eco {
        fn roots(&self) -> &[&str] {
            &["Eco", "money"]
        }

        fn routes(&self) -> Vec<RouteSpec<Self>> {
            vec![
                RouteSpec::new("balance", Eco::balance).optional::<Identity>("player", "self"),
                RouteSpec::new("balance <player>", Eco::balance_of).arg::<Identity>("player"),
                RouteSpec::new("give <player> <amount>", Eco::give)
                    .sender::<dyn Invoker>()
                    .arg::<Identity>("player")
                    .arg::<i64>("amount")
                    .permission("eco.give")
                    .run_async(),
                RouteSpec::new("fail", Eco::fail).run_async(),
                RouteSpec::new("boom", Eco::boom),
                RouteSpec::new("console", Eco::console).sender::<Console>(),
            ]
        }
    }

    struct Console;

    impl Invoker for Console {
        fn name(&self) -> &str {
            "CONSOLE"
        }
        fn has_permission(&self, _permission: &str) -> bool {
            true
        }
        fn send_message(&self, _text: &str) {}
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Admin;

    impl Admin {
        fn reset(&self, _inv: &mut Invocation) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl CommandHandler for Admin {
        fn roots(&self) -> &[&str] {
            &["eco"]
        }

        fn permission(&self) -> Option<&str> {
            Some("eco.admin")
        }

        fn routes(&self) -> Vec<RouteSpec<Self>> {
            vec![RouteSpec::new("reset <player>", Admin::reset).arg::<Identity>("player")]
        }
    }

    struct Fixture {
        main: MainThread,
        manager: CommandManager,
        calls: Arc<Mutex<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        let main = MainThread::bind_current();
        let directory = Arc::new(InMemoryDirectory::new());
        directory.join("Alice");
        directory.join("Bob");

        let eco = Eco::default();
        let calls = eco.calls.clone();
        let mut builder = CommandManager::builder(ResolverRegistry::with_builtins(directory), main.handle());
        assert_eq!(builder.register(eco).unwrap(), 6);
        assert_eq!(builder.register(Admin).unwrap(), 1);
        Fixture { main, manager: builder.build(), calls }
    }

    fn admin() -> Arc<TestInvoker> {
        Arc::new(TestInvoker::new("admin").grant("eco.give").grant("eco.admin"))
    }

    impl Fixture {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_give_runs_on_worker_with_typed_arguments() {
        let mut fx = fixture();
        let invoker = admin();

        let execution = fx.manager.dispatch(invoker.clone(), "eco", &["give", "Alice", "5"]).unwrap();
        assert_eq!(execution.code(), 1);
        assert_eq!(execution.finished().await, DispatchStatus::Accepted);
        assert_eq!(fx.calls(), vec!["give Alice 5 by admin"]);

        // The reply was queued by the worker and only lands once pumped.
        assert!(invoker.messages().is_empty());
        assert_eq!(fx.main.pump(), 1);
        assert_eq!(invoker.messages(), vec!["Gave 5 to Alice"]);
    }

    #[tokio::test]
    async fn test_async_failure_sends_generic_error() {
        let mut fx = fixture();
        let invoker = admin();

        let execution = fx.manager.dispatch(invoker.clone(), "eco", &["fail"]).unwrap();
        assert_eq!(execution.finished().await, DispatchStatus::Accepted);
        fx.main.pump();
        assert_eq!(invoker.messages(), vec![INTERNAL_ERROR]);
    }

    #[test]
    fn test_optional_default_falls_back_to_raw_text() {
        let fx = fixture();
        let invoker = admin();

        let execution = fx.manager.dispatch(invoker.clone(), "ECO", &["balance"]).unwrap();
        assert_eq!(execution.code(), 1);
        assert!(!execution.is_pending());
        assert_eq!(fx.calls(), vec!["balance self"]);
        // Sync route on the designated thread replies inline.
        assert_eq!(invoker.messages(), vec!["Balance: 10"]);

        fx.manager.dispatch(invoker, "eco", &["balance", "Bob"]).unwrap();
        assert_eq!(fx.calls()[1], "balance_of Bob");
    }

    #[test]
    fn test_permission_denied() {
        let fx = fixture();
        let guest = Arc::new(TestInvoker::new("guest"));

        let execution = fx.manager.dispatch(guest.clone(), "eco", &["give", "Alice", "5"]).unwrap();
        assert_eq!(execution.status, DispatchStatus::Denied);
        assert_eq!(execution.code(), 0);
        assert!(fx.calls().is_empty());
        assert_eq!(guest.messages(), vec!["You don't have permission."]);

        let execution = fx.manager.dispatch(guest.clone(), "eco", &["reset", "Alice"]).unwrap();
        assert_eq!(execution.status, DispatchStatus::Denied);
    }

    #[test]
    fn test_invalid_argument_is_reported_and_handler_skipped() {
        let fx = fixture();
        let invoker = admin();

        let execution = fx.manager.dispatch(invoker.clone(), "eco", &["give", "Alice", "five"]).unwrap();
        assert_eq!(execution.status, DispatchStatus::Accepted);
        fx.manager.dispatch(invoker.clone(), "eco", &["give", "Nobody", "5"]).unwrap();

        assert!(fx.calls().is_empty());
        assert_eq!(invoker.messages(), vec!["Invalid amount: five", "Invalid player: Nobody"]);
    }

    #[test]
    fn test_missing_required_argument() {
        let fx = fixture();
        let invoker = admin();
        let tree = fx.manager.tree("eco").unwrap();
        let mut found = tree.find(&["give", "Alice", "5"]).unwrap();
        found.captures.remove("amount");

        let execution = fx.manager.executor().execute(&found.label(), found.binding, invoker.clone(), &found.captures);
        assert_eq!(execution.status, DispatchStatus::Accepted);
        assert!(fx.calls().is_empty());
        assert_eq!(invoker.messages(), vec!["Missing required argument: amount"]);
    }

    #[test]
    fn test_sender_type_is_checked() {
        let fx = fixture();
        let invoker = admin();
        fx.manager.dispatch(invoker.clone(), "eco", &["console"]).unwrap();
        assert!(fx.calls().is_empty());
        assert_eq!(invoker.messages(), vec!["This command can only be run by Console."]);

        fx.manager.dispatch(Arc::new(Console), "eco", &["console"]).unwrap();
        assert_eq!(fx.calls(), vec!["console CONSOLE"]);
    }

    #[test]
    fn test_panic_is_contained() {
        let fx = fixture();
        let invoker = admin();
        let execution = fx.manager.dispatch(invoker.clone(), "eco", &["boom"]).unwrap();
        assert_eq!(execution.code(), 1);
        assert_eq!(invoker.messages(), vec![INTERNAL_ERROR]);
    }

    #[test]
    fn test_unknown_command() {
        let fx = fixture();
        let invoker = admin();
        let err = fx.manager.dispatch(invoker.clone(), "eco", &["nope"]).unwrap_err();
        assert_eq!(err, DispatchError::UnknownCommand("eco nope".into()));
        assert!(fx.manager.dispatch(invoker.clone(), "shop", &["x"]).is_err());
        assert_eq!(invoker.messages(), vec!["Unknown command: eco nope", "Unknown command: shop x"]);
    }

    #[test]
    fn test_handlers_merge_under_shared_root() {
        let fx = fixture();
        assert_eq!(fx.manager.roots(), vec!["eco", "money"]);
        let eco = fx.manager.tree("eco").unwrap().paths();
        assert!(eco.contains(&"reset <player>".to_string()));
        assert!(eco.contains(&"give <player> <amount>".to_string()));
        assert!(!fx.manager.tree("money").unwrap().paths().contains(&"reset <player>".to_string()));
    }

    #[test]
    fn test_complete() {
        let fx = fixture();
        let invoker = admin();
        assert_eq!(fx.manager.complete(invoker.as_ref(), "eco", &["b"]), vec!["balance", "boom"]);
        assert_eq!(fx.manager.complete(invoker.as_ref(), "eco", &["balance", ""]), vec!["Alice", "Bob"]);
        assert!(fx.manager.complete(invoker.as_ref(), "shop", &[""]).is_empty());
    }

    struct Broken;

    impl Broken {
        fn noop(&self, _inv: &mut Invocation) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl CommandHandler for Broken {
        fn roots(&self) -> &[&str] {
            &["eco"]
        }

        fn routes(&self) -> Vec<RouteSpec<Self>> {
            vec![RouteSpec::new("pay", Broken::noop), RouteSpec::new("balance", Broken::noop)]
        }
    }

    struct Rootless(&'static [&'static str]);

    impl CommandHandler for Rootless {
        fn roots(&self) -> &[&str] {
            self.0
        }

        fn routes(&self) -> Vec<RouteSpec<Self>> {
            Vec::new()
        }
    }

    #[test]
    fn test_failed_registration_leaves_trees_untouched() {
        let main = MainThread::bind_current();
        let registry = ResolverRegistry::with_builtins(Arc::new(InMemoryDirectory::new()));
        let mut builder = CommandManager::builder(registry, main.handle());
        builder.register(Eco::default()).unwrap();

        assert!(matches!(builder.register(Broken), Err(ConfigError::DuplicatePath { .. })));
        assert!(matches!(builder.register(Rootless(&[])), Err(ConfigError::NoRootLabel { .. })));
        assert!(matches!(
            builder.register(Rootless(&["two words"])),
            Err(ConfigError::InvalidRootLabel { label, .. }) if label == "two words"
        ));

        let manager = builder.build();
        assert!(manager.tree("eco").unwrap().find(&["pay"]).is_none());
    }

    #[test]
    fn test_handler_without_routes_adds_no_root() {
        let main = MainThread::bind_current();
        let registry = ResolverRegistry::with_builtins(Arc::new(InMemoryDirectory::new()));
        let mut builder = CommandManager::builder(registry, main.handle());
        builder.register(Eco::default()).unwrap();

        assert_eq!(builder.register(Rootless(&["shop"])).unwrap(), 0);
        assert_eq!(builder.register(Rootless(&["eco"])).unwrap(), 0);

        let manager = builder.build();
        assert!(manager.tree("shop").is_none());
        assert!(!manager.roots().contains(&"shop"));
        assert_eq!(manager.tree("eco").unwrap().routes().len(), 6);
    }
}
