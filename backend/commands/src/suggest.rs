//! Per-argument completion sources.
//!
//! Each argument node owns a [`SuggestionSource`] that asks the resolver
//! bound to the argument's type for candidates. When there are none, it
//! returns the argument name wrapped in placeholder markers (`<player>`) so
//! the invoker can see what is expected.

use std::sync::Arc;

use cmdforge_core::Invoker;

use crate::registry::ResolverRegistry;
use crate::types::ValueType;

/// How suggestions are capped and how placeholders are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionSettings {
    pub limit: usize,
    pub placeholder_prefix: String,
    pub placeholder_suffix: String,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            limit: 20,
            placeholder_prefix: "<".into(),
            placeholder_suffix: ">".into(),
        }
    }
}

#[derive(Clone)]
pub struct SuggestionSource {
    argument: String,
    value_type: ValueType,
    resolvers: Arc<ResolverRegistry>,
    settings: Arc<SuggestionSettings>,
}

impl SuggestionSource {
    pub fn new(
        argument: impl Into<String>,
        value_type: ValueType,
        resolvers: Arc<ResolverRegistry>,
        settings: Arc<SuggestionSettings>,
    ) -> Self {
        Self { argument: argument.into(), value_type, resolvers, settings }
    }

    pub fn placeholder(&self) -> String {
        format!(
            "{}{}{}",
            self.settings.placeholder_prefix, self.argument, self.settings.placeholder_suffix
        )
    }

    /// Candidates for the partial token, or the placeholder when there are none.
    pub fn suggest(&self, partial: &str, invoker: &dyn Invoker) -> Vec<String> {
        let mut candidates = self.resolvers.suggest(self.value_type, partial, invoker);
        candidates.truncate(self.settings.limit);
        if candidates.is_empty() {
            vec![self.placeholder()]
        } else {
            candidates
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestInvoker;
    use cmdforge_core::{Identity, InMemoryDirectory};

    fn registry(directory: Arc<InMemoryDirectory>) -> Arc<ResolverRegistry> {
        Arc::new(ResolverRegistry::with_builtins(directory))
    }

    #[test]
    fn test_resolver_candidates() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.join("Alice");
        directory.join("Bob");
        let source = SuggestionSource::new(
            "player",
            ValueType::of::<Identity>(),
            registry(directory),
            Arc::new(SuggestionSettings::default()),
        );
        assert_eq!(source.suggest("a", &TestInvoker::new("x")), vec!["Alice"]);
    }

    #[test]
    fn test_placeholder_fallback() {
        let source = SuggestionSource::new(
            "amount",
            ValueType::of::<i64>(),
            registry(Arc::new(InMemoryDirectory::new())),
            Arc::new(SuggestionSettings::default()),
        );
        assert_eq!(source.suggest("", &TestInvoker::new("x")), vec!["<amount>"]);

        let nobody_matches = SuggestionSource::new(
            "player",
            ValueType::of::<Identity>(),
            registry(Arc::new(InMemoryDirectory::new())),
            Arc::new(SuggestionSettings {
                placeholder_prefix: "[".into(),
                placeholder_suffix: "]".into(),
                ..SuggestionSettings::default()
            }),
        );
        assert_eq!(nobody_matches.suggest("zz", &TestInvoker::new("x")), vec!["[player]"]);
    }

    #[test]
    fn test_limit_applies() {
        let directory = Arc::new(InMemoryDirectory::new());
        for name in ["a1", "a2", "a3"] {
            directory.join(name);
        }
        let source = SuggestionSource::new(
            "player",
            ValueType::of::<Identity>(),
            registry(directory),
            Arc::new(SuggestionSettings { limit: 2, ..SuggestionSettings::default() }),
        );
        assert_eq!(source.suggest("a", &TestInvoker::new("x")), vec!["a1", "a2"]);
    }
}
