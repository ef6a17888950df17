/// Command dispatch: run a matched route for an invoker.
///
/// Per invocation: permission gate, argument extraction, thread placement,
/// invocation. Every reply goes through the designated-thread queue, so
/// worker threads never touch the host's send API directly.
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use cmdforge_core::{DispatchError, Invoker, MainThreadHandle, ResolveError};
use cmdforge_logging::{DispatchEvent, EventLogger};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::messages::MessageRenderer;
use crate::registry::{ArgValue, ResolverRegistry};
use crate::types::{Param, ParamRole, RouteBinding, ValueType};

/// Raw argument tokens captured by the host's matcher, keyed by argument name.
pub type Captures = HashMap<String, String>;

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Renders messages and delivers them on the designated thread.
#[derive(Clone)]
pub struct Responder {
    main: MainThreadHandle,
    messages: Arc<dyn MessageRenderer>,
}

impl Responder {
    pub fn new(main: MainThreadHandle, messages: Arc<dyn MessageRenderer>) -> Self {
        Self { main, messages }
    }

    pub fn send(&self, invoker: &Arc<dyn Invoker>, text: impl Into<String>) {
        let invoker = Arc::clone(invoker);
        let text = text.into();
        self.main.run_on_main(move || invoker.send_message(&text));
    }

    pub fn send_key(&self, invoker: &Arc<dyn Invoker>, key: &str, values: &[(&str, String)]) {
        self.send(invoker, self.messages.render(key, values));
    }
}

// ---------------------------------------------------------------------------
// Bound arguments
// ---------------------------------------------------------------------------

enum BoundValue {
    Sender,
    Value(ArgValue),
}

/// Resolved handler arguments, in declaration order.
#[derive(Default)]
pub struct Arguments {
    values: Vec<(String, BoundValue)>,
}

impl Arguments {
    fn push_sender(&mut self) {
        self.values.push((String::new(), BoundValue::Sender));
    }

    fn push(&mut self, name: &str, value: ArgValue) {
        self.values.push((name.to_string(), BoundValue::Value(value)));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of the non-sender arguments.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter_map(|(name, value)| match value {
            BoundValue::Value(_) => Some(name.as_str()),
            BoundValue::Sender => None,
        })
    }

    fn value(&self, name: &str) -> Option<&ArgValue> {
        self.values.iter().find_map(|(n, value)| match value {
            BoundValue::Value(v) if n == name => Some(v),
            _ => None,
        })
    }

    /// The value bound to `name`, if it holds a `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.value(name)?.downcast_ref::<T>()
    }

    /// True if `name` is bound and holds a `T`.
    pub fn is<T: Any>(&self, name: &str) -> bool {
        self.get::<T>(name).is_some()
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Everything a route method receives when it runs.
pub struct Invocation {
    route: String,
    invoker: Arc<dyn Invoker>,
    args: Arguments,
    responder: Responder,
}

impl Invocation {
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn invoker(&self) -> &Arc<dyn Invoker> {
        &self.invoker
    }

    /// The injected sender as its concrete type.
    pub fn sender<T: Invoker>(&self) -> Result<&T> {
        self.invoker
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| anyhow!("sender is not a {}", type_name::<T>()))
    }

    pub fn arguments(&self) -> &Arguments {
        &self.args
    }

    /// Typed argument by name. Fails if the argument is not bound or holds a
    /// different type (for example raw text because no resolver exists).
    pub fn arg<T: Any>(&self, name: &str) -> Result<&T> {
        let value = self
            .args
            .value(name)
            .ok_or_else(|| anyhow!("argument `{name}` is not bound"))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| anyhow!("argument `{name}` is not a {}", type_name::<T>()))
    }

    /// Send text to the invoker from any thread.
    pub fn reply(&self, text: impl Into<String>) {
        self.responder.send(&self.invoker, text);
    }

    /// Send a catalog message to the invoker from any thread.
    pub fn reply_key(&self, key: &str, values: &[(&str, String)]) {
        self.responder.send_key(&self.invoker, key, values);
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    Accepted,
    /// Rejected at the permission gate.
    Denied,
}

impl DispatchStatus {
    /// Status code for the host's command framework.
    pub fn code(self) -> i32 {
        match self {
            DispatchStatus::Accepted => 1,
            DispatchStatus::Denied => 0,
        }
    }
}

/// Result of one dispatch. Asynchronous routes carry the worker task.
#[derive(Debug)]
pub struct Execution {
    pub status: DispatchStatus,
    pending: Option<JoinHandle<()>>,
}

impl Execution {
    fn done(status: DispatchStatus) -> Self {
        Self { status, pending: None }
    }

    pub fn code(&self) -> i32 {
        self.status.code()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the worker task, if any. Handler failures never surface
    /// here; they have already been reported and logged.
    pub async fn finished(self) -> DispatchStatus {
        if let Some(handle) = self.pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }
        self.status
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct DispatchExecutor {
    resolvers: Arc<ResolverRegistry>,
    responder: Responder,
    workers: Option<Handle>,
}

impl DispatchExecutor {
    pub fn new(resolvers: Arc<ResolverRegistry>, responder: Responder) -> Self {
        Self { resolvers, responder, workers: None }
    }

    /// Runtime whose blocking pool runs asynchronous routes. Without one,
    /// the runtime current at dispatch time is used.
    pub fn with_workers(mut self, workers: Handle) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    /// Run `binding` for `invoker` with the host-captured argument tokens.
    /// `route` is the display label used in logs and events.
    pub fn execute(
        &self,
        route: &str,
        binding: &Arc<RouteBinding>,
        invoker: Arc<dyn Invoker>,
        captures: &Captures,
    ) -> Execution {
        if let Some(permission) = &binding.permission {
            if !invoker.has_permission(permission) {
                debug!(route, invoker = invoker.name(), permission = %permission, "Permission denied");
                EventLogger::log_event(
                    route,
                    DispatchEvent::Denied {
                        invoker: invoker.name().to_string(),
                        permission: permission.clone(),
                    },
                );
                self.responder.send_key(&invoker, "command.no-permission", &[]);
                return Execution::done(DispatchStatus::Denied);
            }
        }

        let args = match self.extract(binding, &invoker, captures) {
            Ok(args) => args,
            Err(e) => {
                debug!(route, invoker = invoker.name(), error = %e, "Invocation rejected");
                EventLogger::log_event(
                    route,
                    DispatchEvent::Rejected {
                        invoker: invoker.name().to_string(),
                        reason: e.to_string(),
                    },
                );
                self.responder.send_key(&invoker, e.message_key(), &e.placeholders());
                return Execution::done(DispatchStatus::Accepted);
            }
        };

        let invocation = Invocation {
            route: route.to_string(),
            invoker,
            args,
            responder: self.responder.clone(),
        };
        let binding = Arc::clone(binding);

        if !binding.run_async {
            invoke(&binding, invocation);
            return Execution::done(DispatchStatus::Accepted);
        }

        match self.workers.clone().or_else(|| Handle::try_current().ok()) {
            Some(workers) => {
                let pending = workers.spawn_blocking(move || invoke(&binding, invocation));
                Execution { status: DispatchStatus::Accepted, pending: Some(pending) }
            }
            None => {
                warn!(route, "No worker runtime available; running asynchronous route inline");
                invoke(&binding, invocation);
                Execution::done(DispatchStatus::Accepted)
            }
        }
    }

    /// Bind every declared parameter, in order, before any handler code runs.
    fn extract(
        &self,
        binding: &RouteBinding,
        invoker: &Arc<dyn Invoker>,
        captures: &Captures,
    ) -> Result<Arguments, DispatchError> {
        let mut args = Arguments::default();
        for param in &binding.params {
            match &param.role {
                ParamRole::Sender => {
                    if !sender_matches(param.value_type, invoker.as_ref()) {
                        return Err(DispatchError::SenderMismatch {
                            expected: param.value_type.short_name().to_string(),
                        });
                    }
                    args.push_sender();
                }
                ParamRole::Required => {
                    let token = captured(binding, param, captures)
                        .ok_or_else(|| DispatchError::MissingArgument(param.name.clone()))?;
                    let value = self.resolve(param, token, invoker.as_ref()).map_err(|_| {
                        DispatchError::InvalidArgument {
                            name: param.name.clone(),
                            token: token.to_string(),
                        }
                    })?;
                    args.push(&param.name, value);
                }
                ParamRole::Optional { default } => {
                    let value = captured(binding, param, captures)
                        .and_then(|token| self.resolve(param, token, invoker.as_ref()).ok())
                        .unwrap_or_else(|| self.default_value(param, default, invoker.as_ref()));
                    args.push(&param.name, value);
                }
            }
        }
        Ok(args)
    }

    /// Resolve through the registry; types without a resolver keep the raw
    /// token as a `String`.
    fn resolve(&self, param: &Param, token: &str, invoker: &dyn Invoker) -> Result<ArgValue, ResolveError> {
        match self.resolvers.resolve(param.value_type, token, invoker) {
            Err(ResolveError::NoResolver(_)) => Ok(Box::new(token.to_string())),
            other => other,
        }
    }

    fn default_value(&self, param: &Param, default: &str, invoker: &dyn Invoker) -> ArgValue {
        self.resolve(param, default, invoker).unwrap_or_else(|_| {
            debug!(argument = %param.name, default, "Default did not resolve; passing raw text");
            Box::new(default.to_string())
        })
    }
}

fn captured<'a>(binding: &RouteBinding, param: &Param, captures: &'a Captures) -> Option<&'a str> {
    if !binding.captures(&param.name) {
        return None;
    }
    captures.get(&param.name).map(String::as_str)
}

fn sender_matches(expected: ValueType, invoker: &dyn Invoker) -> bool {
    expected == ValueType::of::<dyn Invoker>() || Any::type_id(invoker.as_any()) == expected.id()
}

/// Call the handler, containing both returned errors and panics.
fn invoke(binding: &RouteBinding, mut invocation: Invocation) {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| binding.call(&mut invocation)));

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{e:?}")),
        Err(payload) => Some(panic_message(payload.as_ref())),
    };

    let invoker = invocation.invoker.name().to_string();
    match failure {
        None => EventLogger::log_event(
            &invocation.route,
            DispatchEvent::Completed {
                invoker,
                run_async: binding.run_async,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        ),
        Some(detail) => {
            error!(
                route = %invocation.route,
                handler = %binding.handler,
                invoker = %invoker,
                error = %detail,
                "Command handler failed"
            );
            EventLogger::log_event(&invocation.route, DispatchEvent::Failed { invoker, error: detail });
            invocation.reply_key("command.error", &[]);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("panic: {text}")
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("panic: {text}")
    } else {
        "panic with non-string payload".to_string()
    }
}
