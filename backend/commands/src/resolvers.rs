//! Built-in resolvers: text, integers, decimals, and identity lookup.

use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use cmdforge_core::{Identity, IdentityDirectory, Invoker};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::registry::Resolver;

/// Most identity suggestions returned per request.
pub const IDENTITY_SUGGESTION_LIMIT: usize = 20;

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static DISALLOWED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{Alphabetic}\d\s_]").unwrap());
static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Strip `<tag>` markup, drop everything but letters, digits, whitespace and
/// underscores, then trim and collapse whitespace runs to one space.
pub fn sanitize(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let without_markup = MARKUP_RE.replace_all(input, "");
    let clean = DISALLOWED_RE.replace_all(&without_markup, "");
    WHITESPACE_RUN_RE.replace_all(clean.trim(), " ").into_owned()
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

pub struct TextResolver;

impl Resolver for TextResolver {
    type Value = String;

    fn resolve(&self, token: &str, _invoker: &dyn Invoker) -> anyhow::Result<Option<String>> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(sanitize(token)))
    }
}

// ---------------------------------------------------------------------------
// Integers
// ---------------------------------------------------------------------------

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
}

/// Integer widths with a built-in resolver.
pub trait IntegerValue: sealed::Sealed + FromStr + Send + Sync + 'static {}

impl IntegerValue for i32 {}
impl IntegerValue for i64 {}

/// Strict base-10 parse. No surrounding whitespace, no separators.
pub struct IntegerResolver<T>(PhantomData<fn() -> T>);

impl<T> IntegerResolver<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for IntegerResolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IntegerValue> Resolver for IntegerResolver<T> {
    type Value = T;

    fn resolve(&self, token: &str, _invoker: &dyn Invoker) -> anyhow::Result<Option<T>> {
        Ok(token.parse::<T>().ok())
    }
}

// ---------------------------------------------------------------------------
// Decimal
// ---------------------------------------------------------------------------

/// Arbitrary-precision decimal.
pub struct DecimalResolver;

impl Resolver for DecimalResolver {
    type Value = BigDecimal;

    fn resolve(&self, token: &str, _invoker: &dyn Invoker) -> anyhow::Result<Option<BigDecimal>> {
        if token.is_empty() || token.trim() != token {
            return Ok(None);
        }
        Ok(BigDecimal::from_str(token).ok())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Resolves a cached identity by exact name; suggests online names.
pub struct IdentityResolver {
    directory: Arc<dyn IdentityDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }
}

impl Resolver for IdentityResolver {
    type Value = Identity;

    fn resolve(&self, token: &str, _invoker: &dyn Invoker) -> anyhow::Result<Option<Identity>> {
        Ok(self.directory.cached(token))
    }

    fn suggest(&self, prefix: &str, _invoker: &dyn Invoker) -> Vec<String> {
        let needle = prefix.to_lowercase();
        self.directory
            .online()
            .into_iter()
            .filter(|name| name.to_lowercase().starts_with(&needle))
            .take(IDENTITY_SUGGESTION_LIMIT)
            .collect()
    }
}
