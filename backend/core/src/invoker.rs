use std::any::Any;

/// The actor issuing a command.
///
/// Implementations wrap whatever the host uses to represent a user or a
/// console session. `send_message` is a host-visible side effect and must
/// only be called on the designated thread; the dispatch executor takes care
/// of that by routing every reply through [`crate::MainThreadHandle`].
pub trait Invoker: Any + Send + Sync {
    /// Display name, used in logs and for `self`-style lookups.
    fn name(&self) -> &str;

    fn has_permission(&self, permission: &str) -> bool;

    fn send_message(&self, text: &str);

    /// Concrete-type view used for sender injection.
    fn as_any(&self) -> &dyn Any;
}

/// Returns true if the invoker's concrete type is `T`.
pub fn invoker_is<T: Invoker>(invoker: &dyn Invoker) -> bool {
    invoker.as_any().is::<T>()
}

/// Downcast an invoker to its concrete type.
pub fn invoker_as<T: Invoker>(invoker: &dyn Invoker) -> Option<&T> {
    invoker.as_any().downcast_ref::<T>()
}
