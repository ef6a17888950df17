/// Resolver registry: value type → resolver used for argument parsing and
/// completion.
///
/// Registration is "insert if absent". The first resolver registered for a
/// type wins, so host resolvers must be added before the built-ins to
/// shadow them. The registry is frozen (shared behind an `Arc`) before any
/// dispatch happens and is read-only afterwards.
use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use cmdforge_core::{IdentityDirectory, Invoker, ResolveError};
use tracing::{debug, warn};

use crate::resolvers::{DecimalResolver, IdentityResolver, IntegerResolver, TextResolver};
use crate::types::ValueType;

/// A resolved argument value.
pub type ArgValue = Box<dyn Any + Send + Sync>;

// ---------------------------------------------------------------------------
// Resolver trait
// ---------------------------------------------------------------------------

/// Parses a token into `Value` and offers completions for that type.
pub trait Resolver: Send + Sync + 'static {
    type Value: Any + Send + Sync;

    /// `Ok(None)` means the token is not a valid `Value`. Errors are treated
    /// the same way.
    fn resolve(&self, token: &str, invoker: &dyn Invoker) -> anyhow::Result<Option<Self::Value>>;

    fn suggest(&self, _prefix: &str, _invoker: &dyn Invoker) -> Vec<String> {
        Vec::new()
    }
}

trait ErasedResolver: Send + Sync {
    fn resolve_erased(&self, token: &str, invoker: &dyn Invoker) -> anyhow::Result<Option<ArgValue>>;
    fn suggest_erased(&self, prefix: &str, invoker: &dyn Invoker) -> Vec<String>;
}

struct Typed<R>(R);

impl<R: Resolver> ErasedResolver for Typed<R> {
    fn resolve_erased(&self, token: &str, invoker: &dyn Invoker) -> anyhow::Result<Option<ArgValue>> {
        Ok(self.0.resolve(token, invoker)?.map(|v| Box::new(v) as ArgValue))
    }

    fn suggest_erased(&self, prefix: &str, invoker: &dyn Invoker) -> Vec<String> {
        self.0.suggest(prefix, invoker)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<ValueType, Arc<dyn ErasedResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the built-in resolvers.
    pub fn with_builtins(directory: Arc<dyn IdentityDirectory>) -> Self {
        let mut registry = Self::new();
        registry.register_builtins(directory);
        registry
    }

    /// Register `resolver` for `R::Value` unless that type already has one.
    /// Returns false if an earlier registration shadows it.
    pub fn register<R: Resolver>(&mut self, resolver: R) -> bool {
        let value_type = ValueType::of::<R::Value>();
        match self.resolvers.entry(value_type) {
            Entry::Occupied(_) => {
                debug!(value_type = value_type.name(), "Resolver already registered; keeping the first");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Typed(resolver)));
                true
            }
        }
    }

    /// Add text, integer (`i32`, `i64`), decimal and identity resolvers where
    /// the host has not supplied its own. Returns how many were added.
    pub fn register_builtins(&mut self, directory: Arc<dyn IdentityDirectory>) -> usize {
        [
            self.register(TextResolver),
            self.register(IntegerResolver::<i32>::new()),
            self.register(IntegerResolver::<i64>::new()),
            self.register(DecimalResolver),
            self.register(IdentityResolver::new(directory)),
        ]
        .into_iter()
        .filter(|added| *added)
        .count()
    }

    pub fn contains(&self, value_type: ValueType) -> bool {
        self.resolvers.contains_key(&value_type)
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Parse `token` as `value_type`. `NoResolver` and `Rejected` are distinct
    /// so callers can fall back to raw text only when no resolver exists.
    pub fn resolve(
        &self,
        value_type: ValueType,
        token: &str,
        invoker: &dyn Invoker,
    ) -> Result<ArgValue, ResolveError> {
        let resolver = self
            .resolvers
            .get(&value_type)
            .ok_or(ResolveError::NoResolver(value_type.name()))?;

        let rejected = || ResolveError::Rejected {
            type_name: value_type.short_name(),
            token: token.to_string(),
        };
        match panic::catch_unwind(AssertUnwindSafe(|| resolver.resolve_erased(token, invoker))) {
            Ok(Ok(Some(value))) => Ok(value),
            Ok(Ok(None)) => Err(rejected()),
            Ok(Err(e)) => {
                debug!(value_type = value_type.name(), token, error = %e, "Resolver failed");
                Err(rejected())
            }
            Err(_) => {
                warn!(value_type = value_type.name(), token, "Resolver panicked");
                Err(rejected())
            }
        }
    }

    /// Completion candidates for `value_type`, filtered by case-insensitive
    /// prefix, in resolver order. Unregistered types yield nothing.
    pub fn suggest(&self, value_type: ValueType, prefix: &str, invoker: &dyn Invoker) -> Vec<String> {
        let Some(resolver) = self.resolvers.get(&value_type) else {
            return Vec::new();
        };
        let needle = prefix.to_lowercase();
        let candidates = match panic::catch_unwind(AssertUnwindSafe(|| resolver.suggest_erased(prefix, invoker))) {
            Ok(candidates) => candidates,
            Err(_) => {
                warn!(value_type = value_type.name(), prefix, "Resolver panicked while suggesting");
                return Vec::new();
            }
        };
        candidates
            .into_iter()
            .filter(|candidate| candidate.to_lowercase().starts_with(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestInvoker;
    use cmdforge_core::{Identity, InMemoryDirectory};

    struct ShoutingText;

    impl Resolver for ShoutingText {
        type Value = String;

        fn resolve(&self, token: &str, _invoker: &dyn Invoker) -> anyhow::Result<Option<String>> {
            Ok(Some(token.to_uppercase()))
        }
    }

    struct Exploding;

    impl Resolver for Exploding {
        type Value = u8;

        fn resolve(&self, _token: &str, _invoker: &dyn Invoker) -> anyhow::Result<Option<u8>> {
            anyhow::bail!("resolver backend unavailable")
        }

        fn suggest(&self, _prefix: &str, _invoker: &dyn Invoker) -> Vec<String> {
            vec!["Alpha".into(), "beta".into(), "ALBUM".into()]
        }
    }

    struct Panicking;

    impl Resolver for Panicking {
        type Value = u32;

        fn resolve(&self, _token: &str, _invoker: &dyn Invoker) -> anyhow::Result<Option<u32>> {
            panic!("resolver bug")
        }

        fn suggest(&self, _prefix: &str, _invoker: &dyn Invoker) -> Vec<String> {
            panic!("resolver bug")
        }
    }

    fn directory() -> Arc<dyn IdentityDirectory> {
        Arc::new(InMemoryDirectory::new())
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = ResolverRegistry::new();
        assert!(registry.register(ShoutingText));
        assert_eq!(registry.register_builtins(directory()), 4);
        assert!(!registry.register(TextResolver));

        let invoker = TestInvoker::new("alice");
        let value = registry.resolve(ValueType::of::<String>(), "hi", &invoker).unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("HI"));
    }

    #[test]
    fn test_builtins_cover_core_types() {
        let registry = ResolverRegistry::with_builtins(directory());
        assert_eq!(registry.len(), 5);
        for ty in [
            ValueType::of::<String>(),
            ValueType::of::<i32>(),
            ValueType::of::<i64>(),
            ValueType::of::<bigdecimal::BigDecimal>(),
            ValueType::of::<Identity>(),
        ] {
            assert!(registry.contains(ty), "missing {ty:?}");
        }
    }

    #[test]
    fn test_no_resolver_is_distinct_from_rejected() {
        let registry = ResolverRegistry::with_builtins(directory());
        let invoker = TestInvoker::new("alice");

        let missing = registry.resolve(ValueType::of::<u16>(), "5", &invoker).unwrap_err();
        assert!(matches!(missing, ResolveError::NoResolver(_)));

        let rejected = registry.resolve(ValueType::of::<i64>(), "five", &invoker).unwrap_err();
        assert_eq!(rejected, ResolveError::Rejected { type_name: "i64", token: "five".into() });
    }

    #[test]
    fn test_resolver_error_is_rejection() {
        let mut registry = ResolverRegistry::new();
        registry.register(Exploding);
        let invoker = TestInvoker::new("alice");
        assert!(matches!(
            registry.resolve(ValueType::of::<u8>(), "1", &invoker),
            Err(ResolveError::Rejected { .. })
        ));
    }

    #[test]
    fn test_suggest_filters_case_insensitively() {
        let mut registry = ResolverRegistry::new();
        registry.register(Exploding);
        let invoker = TestInvoker::new("alice");
        assert_eq!(registry.suggest(ValueType::of::<u8>(), "al", &invoker), vec!["Alpha", "ALBUM"]);
        assert!(registry.suggest(ValueType::of::<u16>(), "", &invoker).is_empty());
    }

    #[test]
    fn test_resolver_panic_is_contained() {
        let mut registry = ResolverRegistry::new();
        registry.register(Panicking);
        let invoker = TestInvoker::new("alice");
        assert_eq!(
            registry.resolve(ValueType::of::<u32>(), "1", &invoker).unwrap_err(),
            ResolveError::Rejected { type_name: "u32", token: "1".into() }
        );
        assert!(registry.suggest(ValueType::of::<u32>(), "", &invoker).is_empty());
    }
}
