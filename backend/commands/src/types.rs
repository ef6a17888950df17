/// Route descriptor model: path segments, bound parameters, and the
/// immutable `RouteBinding` produced for every declared route.
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use cmdforge_core::ConfigError;

use crate::dispatch::Invocation;
use crate::handlers::{CommandHandler, ParamMarker, RouteSpec};

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Type tag used to key resolvers and check sender injection.
#[derive(Clone, Copy)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path component of the type name (`Identity` for
    /// `cmdforge_core::identity::Identity`).
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// One token of a route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub literal: bool,
    /// Lower-cased text for literals, argument name otherwise.
    pub token: String,
}

impl Segment {
    pub fn literal(text: &str) -> Self {
        Self { literal: true, token: text.to_lowercase() }
    }

    pub fn argument(name: &str) -> Self {
        Self { literal: false, token: name.to_string() }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.literal {
            f.write_str(&self.token)
        } else {
            write!(f, "<{}>", self.token)
        }
    }
}

/// Split a route pattern into segments. `<name>` tokens become arguments,
/// everything else is a case-folded literal. An empty pattern is the root route.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, ConfigError> {
    pattern
        .split_whitespace()
        .map(|part| {
            if part.len() >= 2 && part.starts_with('<') && part.ends_with('>') {
                let name = &part[1..part.len() - 1];
                if name.is_empty() {
                    return Err(ConfigError::EmptyArgumentName { route: pattern.trim().to_string() });
                }
                Ok(Segment::argument(name))
            } else {
                Ok(Segment::literal(part))
            }
        })
        .collect()
}

/// Render segments back into a normalized pattern.
pub fn render_path(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamRole {
    /// Receives the invoker; never consumes a path segment.
    Sender,
    Required,
    /// Raw default text, resolved at dispatch time when a resolver exists.
    Optional { default: String },
}

/// A validated handler parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub role: ParamRole,
    pub value_type: ValueType,
    /// Empty for the sender.
    pub name: String,
}

impl Param {
    pub fn is_sender(&self) -> bool {
        self.role == ParamRole::Sender
    }
}

// ---------------------------------------------------------------------------
// Route binding
// ---------------------------------------------------------------------------

/// Type-erased route callable. Captures the owning handler instance.
pub type RouteAction = Arc<dyn Fn(&mut Invocation) -> anyhow::Result<()> + Send + Sync>;

/// One registered route. Built once at registration time, immutable after.
pub struct RouteBinding {
    pub handler: String,
    pub path: Vec<Segment>,
    pub params: Vec<Param>,
    /// Method-level permission, falling back to the handler-level one.
    pub permission: Option<String>,
    pub run_async: bool,
    pub description: Option<String>,
    action: RouteAction,
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("handler", &self.handler)
            .field("path", &self.pattern())
            .field("params", &self.params)
            .field("permission", &self.permission)
            .field("run_async", &self.run_async)
            .finish()
    }
}

impl RouteBinding {
    /// Convert one route declaration into a cross-validated binding.
    pub fn bind<H: CommandHandler>(
        handler: &Arc<H>,
        spec: RouteSpec<H>,
        class_permission: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let route = spec.pattern.trim().to_string();
        let path = parse_pattern(&route)?;

        let mut params: Vec<Param> = Vec::with_capacity(spec.params.len());
        for (index, param) in spec.params.into_iter().enumerate() {
            let Some(marker) = param.marker else {
                return Err(ConfigError::UnmarkedParameter { route, index });
            };
            let (role, name) = match marker {
                ParamMarker::Sender => {
                    if params.iter().any(Param::is_sender) {
                        return Err(ConfigError::MultipleSenders { route });
                    }
                    (ParamRole::Sender, String::new())
                }
                ParamMarker::Arg(name) => (ParamRole::Required, name),
                ParamMarker::OptionalArg { name, default } => (ParamRole::Optional { default }, name),
            };
            if !name.is_empty() && params.iter().any(|p| p.name == name) {
                return Err(ConfigError::DuplicateParameter { route, name });
            }
            params.push(Param { role, value_type: param.value_type, name });
        }

        let mut seen: Vec<&str> = Vec::new();
        for segment in path.iter().filter(|s| !s.literal) {
            if seen.contains(&segment.token.as_str()) {
                return Err(ConfigError::DuplicateParameter { route, name: segment.token.clone() });
            }
            seen.push(&segment.token);
            if !params.iter().any(|p| !p.is_sender() && p.name == segment.token) {
                return Err(ConfigError::UnknownArgument { route, name: segment.token.clone() });
            }
        }
        if let Some(unbound) = params
            .iter()
            .find(|p| p.role == ParamRole::Required && !seen.contains(&p.name.as_str()))
        {
            return Err(ConfigError::UnboundParameter { route, name: unbound.name.clone() });
        }

        let owner = Arc::clone(handler);
        let call = spec.action;
        let action: RouteAction = Arc::new(move |inv: &mut Invocation| call(owner.as_ref(), inv));

        Ok(Self {
            handler: handler.name().to_string(),
            path,
            params,
            permission: spec.permission.or_else(|| class_permission.map(str::to_string)),
            run_async: spec.run_async,
            description: spec.description,
            action,
        })
    }

    /// Normalized route pattern, e.g. `give <player> <amount>`.
    pub fn pattern(&self) -> String {
        render_path(&self.path)
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| !p.is_sender() && p.name == name)
    }

    /// True if some argument segment captures `name`.
    pub fn captures(&self, name: &str) -> bool {
        self.path.iter().any(|s| !s.literal && s.token == name)
    }

    pub(crate) fn call(&self, inv: &mut Invocation) -> anyhow::Result<()> {
        (self.action)(inv)
    }
}
