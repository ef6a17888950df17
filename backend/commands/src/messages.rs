//! User-facing message templates.
//!
//! Templates use `{name}` placeholders. Values come from, lowest priority
//! first: global `placeholder.<name>` entries, `<ns>.placeholder.<name>`
//! entries for keys in namespace `<ns>`, and the caller's values. `{{` and
//! `}}` render literal braces. Unknown keys render as the key itself.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-zA-Z0-9_.]+)\}").unwrap());

const LEFT_BRACE: &str = "\u{0}_LBR_";
const RIGHT_BRACE: &str = "\u{0}_RBR_";
const MAX_EXPANSION_DEPTH: usize = 8;
const PLACEHOLDER_KEY: &str = "placeholder.";

/// Renders a message key with placeholder values.
pub trait MessageRenderer: Send + Sync {
    fn render(&self, key: &str, values: &[(&str, String)]) -> String;
}

const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    ("command.no-permission", "You don't have permission."),
    ("command.missing-argument", "Missing required argument: {argument}"),
    ("command.invalid-argument", "Invalid {argument}: {value}"),
    ("command.sender-mismatch", "This command can only be run by {expected}."),
    ("command.error", "An internal error occurred while running this command."),
    ("command.unknown", "Unknown command: {command}"),
];

#[derive(Debug, Clone)]
pub struct MessageCatalog {
    templates: HashMap<String, String>,
    global: HashMap<String, String>,
    namespaced: HashMap<String, HashMap<String, String>>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCatalog {
    /// Catalog with the built-in dispatch messages.
    pub fn new() -> Self {
        Self::with_overrides(std::iter::empty::<(String, String)>())
    }

    /// Built-in messages, replaced or extended by `overrides`.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut templates: HashMap<String, String> = DEFAULT_MESSAGES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        templates.extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));

        let mut catalog = Self {
            templates,
            global: HashMap::new(),
            namespaced: HashMap::new(),
        };
        catalog.rebuild_placeholders();
        catalog
    }

    pub fn template(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    fn rebuild_placeholders(&mut self) {
        let mut global = HashMap::new();
        let mut namespaced: HashMap<String, HashMap<String, String>> = HashMap::new();

        for (key, value) in &self.templates {
            if let Some(name) = key.strip_prefix(PLACEHOLDER_KEY) {
                global.insert(name.to_string(), value.clone());
            } else if let Some((ns, rest)) = key.split_once('.') {
                if let Some(name) = rest.strip_prefix(PLACEHOLDER_KEY) {
                    namespaced
                        .entry(ns.to_string())
                        .or_default()
                        .insert(name.to_string(), value.clone());
                }
            }
        }

        // Placeholder values may reference each other.
        let global: HashMap<String, String> = global
            .iter()
            .map(|(k, v)| (k.clone(), expand(v, &global, MAX_EXPANSION_DEPTH)))
            .collect();
        let namespaced = namespaced
            .into_iter()
            .map(|(ns, own)| {
                let mut visible = global.clone();
                visible.extend(own.clone());
                let expanded = own
                    .into_iter()
                    .map(|(k, v)| (k, expand(&v, &visible, MAX_EXPANSION_DEPTH)))
                    .collect();
                (ns, expanded)
            })
            .collect();

        self.global = global;
        self.namespaced = namespaced;
    }

    pub fn format(&self, key: &str, values: &[(&str, String)]) -> String {
        let pattern = self
            .template(key)
            .unwrap_or(key)
            .replace("{{", LEFT_BRACE)
            .replace("}}", RIGHT_BRACE);

        let mut resolved = self.global.clone();
        if let Some(ns) = key.split_once('.').map(|(ns, _)| ns) {
            if let Some(own) = self.namespaced.get(ns) {
                resolved.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        resolved.extend(values.iter().map(|(k, v)| (k.to_string(), v.clone())));

        expand(&pattern, &resolved, MAX_EXPANSION_DEPTH)
            .replace(LEFT_BRACE, "{")
            .replace(RIGHT_BRACE, "}")
    }
}

impl MessageRenderer for MessageCatalog {
    fn render(&self, key: &str, values: &[(&str, String)]) -> String {
        self.format(key, values)
    }
}

/// Replace known `{name}` placeholders, re-expanding while anything changed.
fn expand(input: &str, values: &HashMap<String, String>, depth: usize) -> String {
    let mut current = input.to_string();
    for _ in 0..depth {
        if !current.contains('{') {
            break;
        }
        let mut changed = false;
        let next = PLACEHOLDER_RE
            .replace_all(&current, |caps: &Captures<'_>| match values.get(&caps[1]) {
                Some(value) => {
                    changed = true;
                    value.clone()
                }
                None => caps[0].to_string(),
            })
            .into_owned();
        current = next;
        if !changed {
            break;
        }
    }
    current
}
