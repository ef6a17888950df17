pub mod dispatch;
pub mod handlers;
pub mod manager;
pub mod messages;
pub mod registry;
pub mod resolvers;
pub mod suggest;
pub mod tree;
pub mod types;

pub use dispatch::{
    Arguments, Captures, DispatchExecutor, DispatchStatus, Execution, Invocation, Responder,
};
pub use handlers::{CommandHandler, ParamMarker, ParamSpec, RouteFn, RouteSpec};
pub use manager::{CommandManager, CommandManagerBuilder};
pub use messages::{MessageCatalog, MessageRenderer};
pub use registry::{ArgValue, Resolver, ResolverRegistry};
pub use resolvers::{
    DecimalResolver, IdentityResolver, IntegerResolver, IntegerValue, TextResolver, sanitize,
};
pub use suggest::{SuggestionSettings, SuggestionSource};
pub use tree::{ArgumentSlot, CommandTree, DispatchNode, NodeKind, RouteMatch, TreeBuilder, route_label};
pub use types::{Param, ParamRole, RouteAction, RouteBinding, Segment, ValueType, parse_pattern, render_path};
