use thiserror::Error;

/// Registration-time failures. Any of these aborts registration of the
/// handler that produced it; nothing from that handler reaches the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("route `{route}`: parameter #{index} has no sender/arg/optional marker")]
    UnmarkedParameter { route: String, index: usize },

    #[error("route `{route}`: argument segment <{name}> has no matching parameter")]
    UnknownArgument { route: String, name: String },

    #[error("route `{route}`: required parameter `{name}` is not bound to any path segment")]
    UnboundParameter { route: String, name: String },

    #[error("route `{route}`: `{name}` is declared more than once")]
    DuplicateParameter { route: String, name: String },

    #[error("route `{route}`: empty argument name `<>`")]
    EmptyArgumentName { route: String },

    #[error("route `{route}`: more than one sender parameter")]
    MultipleSenders { route: String },

    #[error("/{root} {path}: path is already bound to another route")]
    DuplicatePath { root: String, path: String },

    #[error("/{root} {path}: argument <{incoming}> conflicts with existing argument <{existing}>")]
    AmbiguousArgument {
        root: String,
        path: String,
        existing: String,
        incoming: String,
    },

    #[error("handler `{handler}` declares no root label")]
    NoRootLabel { handler: String },

    #[error("handler `{handler}`: invalid root label `{label}`")]
    InvalidRootLabel { handler: String, label: String },
}

/// Dispatch-time failures that are reported back to the invoker.
/// The handler is never called when one of these occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("invalid {name}: {token}")]
    InvalidArgument { name: String, token: String },

    #[error("sender must be {expected}")]
    SenderMismatch { expected: String },

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl DispatchError {
    /// Message-catalog key used to render this error for the invoker.
    pub fn message_key(&self) -> &'static str {
        match self {
            DispatchError::MissingArgument(_) => "command.missing-argument",
            DispatchError::InvalidArgument { .. } => "command.invalid-argument",
            DispatchError::SenderMismatch { .. } => "command.sender-mismatch",
            DispatchError::UnknownCommand(_) => "command.unknown",
        }
    }

    /// Placeholder values for the rendered message.
    pub fn placeholders(&self) -> Vec<(&'static str, String)> {
        match self {
            DispatchError::MissingArgument(name) => vec![("argument", name.clone())],
            DispatchError::InvalidArgument { name, token } => {
                vec![("argument", name.clone()), ("value", token.clone())]
            }
            DispatchError::SenderMismatch { expected } => vec![("expected", expected.clone())],
            DispatchError::UnknownCommand(command) => vec![("command", command.clone())],
        }
    }
}

/// Outcome of a registry lookup that did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no resolver registered for {0}")]
    NoResolver(&'static str),

    #[error("`{token}` is not a valid {type_name}")]
    Rejected {
        type_name: &'static str,
        token: String,
    },
}
