/// Handler capability and route declarations.
///
/// A handler exposes its routes as data: a pattern, parameter markers, an
/// optional permission, and the method to call. The manager turns each
/// declaration into a `RouteBinding` at registration time.
use std::any::type_name;

use crate::dispatch::Invocation;
use crate::types::ValueType;

/// Method invoked when a route fires.
pub type RouteFn<H> = fn(&H, &mut Invocation) -> anyhow::Result<()>;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

pub trait CommandHandler: Send + Sync + Sized + 'static {
    /// Human-readable name for logging.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Top-level words this handler's routes are registered under.
    fn roots(&self) -> &[&str];

    /// Handler-wide permission, used by routes that do not set their own.
    fn permission(&self) -> Option<&str> {
        None
    }

    fn routes(&self) -> Vec<RouteSpec<Self>>;
}

// ---------------------------------------------------------------------------
// Parameter declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamMarker {
    Sender,
    Arg(String),
    OptionalArg { name: String, default: String },
}

/// A declared method parameter. `marker` is `None` only for a parameter that
/// was declared without a role, which registration rejects.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub value_type: ValueType,
    pub marker: Option<ParamMarker>,
}

impl ParamSpec {
    /// Receives the invoker. Use `dyn Invoker` to accept any invoker type.
    pub fn sender<T: ?Sized + 'static>() -> Self {
        Self { value_type: ValueType::of::<T>(), marker: Some(ParamMarker::Sender) }
    }

    pub fn arg<T: 'static>(name: impl Into<String>) -> Self {
        Self { value_type: ValueType::of::<T>(), marker: Some(ParamMarker::Arg(name.into())) }
    }

    pub fn optional<T: 'static>(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            value_type: ValueType::of::<T>(),
            marker: Some(ParamMarker::OptionalArg { name: name.into(), default: default.into() }),
        }
    }

    pub fn unmarked<T: 'static>() -> Self {
        Self { value_type: ValueType::of::<T>(), marker: None }
    }
}

// ---------------------------------------------------------------------------
// Route declarations
// ---------------------------------------------------------------------------

pub struct RouteSpec<H> {
    /// Space-separated path; `<name>` marks an argument. Empty for the root route.
    pub pattern: String,
    pub params: Vec<ParamSpec>,
    pub permission: Option<String>,
    pub description: Option<String>,
    pub run_async: bool,
    pub action: RouteFn<H>,
}

impl<H> RouteSpec<H> {
    pub fn new(pattern: impl Into<String>, action: RouteFn<H>) -> Self {
        Self {
            pattern: pattern.into(),
            params: Vec::new(),
            permission: None,
            description: None,
            run_async: false,
            action,
        }
    }

    pub fn sender<T: ?Sized + 'static>(self) -> Self {
        self.param(ParamSpec::sender::<T>())
    }

    pub fn arg<T: 'static>(self, name: impl Into<String>) -> Self {
        self.param(ParamSpec::arg::<T>(name))
    }

    pub fn optional<T: 'static>(self, name: impl Into<String>, default: impl Into<String>) -> Self {
        self.param(ParamSpec::optional::<T>(name, default))
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Run the handler body on a worker thread.
    pub fn run_async(mut self) -> Self {
        self.run_async = true;
        self
    }
}
