pub mod error;
pub mod identity;
pub mod invoker;
pub mod main_thread;

pub use error::{ConfigError, DispatchError, ResolveError};
pub use identity::{Identity, IdentityDirectory, InMemoryDirectory};
pub use invoker::{invoker_as, invoker_is, Invoker};
pub use main_thread::{MainTask, MainThread, MainThreadHandle};
