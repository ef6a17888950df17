//! Dispatch trees.
//!
//! One tree per root label. Routes that share a path prefix share the
//! prefix nodes. A node holds any number of literal children and at most one
//! argument child. Trees are built during registration and never mutated
//! afterwards.

use std::sync::Arc;

use cmdforge_core::{ConfigError, Invoker};

use crate::dispatch::Captures;
use crate::registry::ResolverRegistry;
use crate::suggest::{SuggestionSettings, SuggestionSource};
use crate::types::{RouteBinding, ValueType, render_path};

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Captured-slot metadata for an argument node.
#[derive(Clone)]
pub struct ArgumentSlot {
    pub name: String,
    pub value_type: ValueType,
    pub suggestions: SuggestionSource,
}

#[derive(Clone)]
pub enum NodeKind {
    Root(String),
    Literal(String),
    Argument(ArgumentSlot),
}

#[derive(Clone)]
pub struct DispatchNode {
    kind: NodeKind,
    guard: Option<String>,
    terminal: Option<Arc<RouteBinding>>,
    literals: Vec<DispatchNode>,
    argument: Option<Box<DispatchNode>>,
}

impl DispatchNode {
    fn new(kind: NodeKind) -> Self {
        Self { kind, guard: None, terminal: None, literals: Vec::new(), argument: None }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Permission checked before the terminal fires.
    pub fn guard(&self) -> Option<&str> {
        self.guard.as_deref()
    }

    pub fn terminal(&self) -> Option<&Arc<RouteBinding>> {
        self.terminal.as_ref()
    }

    pub fn literal_children(&self) -> &[DispatchNode] {
        &self.literals
    }

    pub fn argument_child(&self) -> Option<&DispatchNode> {
        self.argument.as_deref()
    }

    fn literal_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Literal(text) => Some(text),
            _ => None,
        }
    }

    fn slot(&self) -> Option<&ArgumentSlot> {
        match &self.kind {
            NodeKind::Argument(slot) => Some(slot),
            _ => None,
        }
    }

    fn children(&self) -> impl Iterator<Item = &DispatchNode> {
        self.literals.iter().chain(self.argument.as_deref())
    }

    fn literal_child_mut(&mut self, text: &str) -> &mut DispatchNode {
        let index = match self.literals.iter().position(|c| c.literal_text() == Some(text)) {
            Some(index) => index,
            None => {
                self.literals.push(DispatchNode::new(NodeKind::Literal(text.to_string())));
                self.literals.len() - 1
            }
        };
        &mut self.literals[index]
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A host match: the terminal binding plus the captured argument tokens.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub root: &'a str,
    pub binding: &'a Arc<RouteBinding>,
    pub captures: Captures,
}

impl RouteMatch<'_> {
    /// Display label, e.g. `/eco give <player> <amount>`.
    pub fn label(&self) -> String {
        route_label(self.root, self.binding)
    }
}

pub fn route_label(root: &str, binding: &RouteBinding) -> String {
    let pattern = binding.pattern();
    if pattern.is_empty() {
        format!("/{root}")
    } else {
        format!("/{root} {pattern}")
    }
}

#[derive(Clone)]
pub struct CommandTree {
    label: String,
    root: DispatchNode,
    /// Terminal bindings in insertion order.
    routes: Vec<Arc<RouteBinding>>,
    settings: Arc<SuggestionSettings>,
}

impl CommandTree {
    fn new(label: &str, settings: Arc<SuggestionSettings>) -> Self {
        Self {
            label: label.to_string(),
            root: DispatchNode::new(NodeKind::Root(label.to_string())),
            routes: Vec::new(),
            settings,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn root(&self) -> &DispatchNode {
        &self.root
    }

    /// Walk the binding's segments, reusing existing nodes, and attach the
    /// binding as the terminal of the last one.
    fn insert(&mut self, binding: Arc<RouteBinding>, resolvers: &Arc<ResolverRegistry>) -> Result<(), ConfigError> {
        let mut node = &mut self.root;
        for (depth, segment) in binding.path.iter().enumerate() {
            if segment.literal {
                node = node.literal_child_mut(&segment.token);
                continue;
            }

            let Some(param) = binding.param(&segment.token) else {
                return Err(ConfigError::UnknownArgument {
                    route: binding.pattern(),
                    name: segment.token.clone(),
                });
            };
            if let Some(existing) = node.argument.as_deref().and_then(DispatchNode::slot) {
                if existing.name != segment.token || existing.value_type != param.value_type {
                    return Err(ConfigError::AmbiguousArgument {
                        root: self.label.clone(),
                        path: render_path(&binding.path[..=depth]),
                        existing: existing.name.clone(),
                        incoming: segment.token.clone(),
                    });
                }
            }
            let slot = || ArgumentSlot {
                name: segment.token.clone(),
                value_type: param.value_type,
                suggestions: SuggestionSource::new(
                    segment.token.clone(),
                    param.value_type,
                    Arc::clone(resolvers),
                    Arc::clone(&self.settings),
                ),
            };
            node = node
                .argument
                .get_or_insert_with(|| Box::new(DispatchNode::new(NodeKind::Argument(slot()))))
                .as_mut();
        }

        if node.terminal.is_some() {
            return Err(ConfigError::DuplicatePath {
                root: self.label.clone(),
                path: binding.pattern(),
            });
        }
        node.guard = binding.permission.clone();
        node.terminal = Some(Arc::clone(&binding));
        self.routes.push(binding);
        Ok(())
    }

    /// Reference matcher: literals compare case-insensitively and are tried
    /// before the argument child; dead ends backtrack.
    pub fn find<S: AsRef<str>>(&self, tokens: &[S]) -> Option<RouteMatch<'_>> {
        let mut captures = Captures::new();
        let node = walk(&self.root, tokens, &mut captures)?;
        let binding = node.terminal.as_ref()?;
        Some(RouteMatch { root: &self.label, binding, captures })
    }

    /// Completions for the last (partial) token, given the complete tokens
    /// before it. Literal children come first, then argument suggestions.
    pub fn complete<S: AsRef<str>>(&self, tokens: &[S], invoker: &dyn Invoker) -> Vec<String> {
        let (partial, before) = match tokens.split_last() {
            Some((last, before)) => (last.as_ref(), before),
            None => ("", &[][..]),
        };
        let needle = partial.to_lowercase();

        let mut reached = Vec::new();
        reach(&self.root, before, &mut reached);

        let mut out: Vec<String> = Vec::new();
        for node in reached {
            for child in &node.literals {
                let Some(text) = child.literal_text() else { continue };
                if text.starts_with(&needle) && permitted(child, invoker) && !out.iter().any(|o| o == text) {
                    out.push(text.to_string());
                }
            }
            let argument = node.argument.as_deref().filter(|child| permitted(child, invoker));
            if let Some(slot) = argument.and_then(DispatchNode::slot) {
                for candidate in slot.suggestions.suggest(partial, invoker) {
                    if !out.contains(&candidate) {
                        out.push(candidate);
                    }
                }
            }
        }
        out.truncate(self.settings.limit);
        out
    }

    pub fn node_count(&self) -> usize {
        fn count(node: &DispatchNode) -> usize {
            1 + node.children().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    /// Nodes at `depth`, with the root at depth 0.
    pub fn nodes_at_depth(&self, depth: usize) -> usize {
        fn count(node: &DispatchNode, depth: usize) -> usize {
            if depth == 0 {
                return 1;
            }
            node.children().map(|c| count(c, depth - 1)).sum()
        }
        count(&self.root, depth)
    }

    /// Every terminal binding, in insertion order.
    pub fn routes(&self) -> Vec<&Arc<RouteBinding>> {
        self.routes.iter().collect()
    }

    /// Rendered path of every terminal, in `routes` order. The root route
    /// renders as an empty string.
    pub fn paths(&self) -> Vec<String> {
        self.routes().into_iter().map(|binding| binding.pattern()).collect()
    }
}

fn walk<'a, S: AsRef<str>>(
    node: &'a DispatchNode,
    tokens: &[S],
    captures: &mut Captures,
) -> Option<&'a DispatchNode> {
    let Some((head, rest)) = tokens.split_first() else {
        return node.terminal.as_ref().map(|_| node);
    };
    let head = head.as_ref();
    let lowered = head.to_lowercase();

    if let Some(child) = node.literals.iter().find(|c| c.literal_text() == Some(lowered.as_str())) {
        if let Some(found) = walk(child, rest, captures) {
            return Some(found);
        }
    }
    if let Some(child) = node.argument.as_deref() {
        if let Some(slot) = child.slot() {
            let previous = captures.insert(slot.name.clone(), head.to_string());
            if let Some(found) = walk(child, rest, captures) {
                return Some(found);
            }
            match previous {
                Some(value) => captures.insert(slot.name.clone(), value),
                None => captures.remove(&slot.name),
            };
        }
    }
    None
}

/// True if the invoker may run at least one route at or below `node`.
fn permitted(node: &DispatchNode, invoker: &dyn Invoker) -> bool {
    let runnable = node.terminal.is_some()
        && node.guard.as_deref().is_none_or(|p| invoker.has_permission(p));
    runnable || node.children().any(|child| permitted(child, invoker))
}

fn reach<'a, S: AsRef<str>>(node: &'a DispatchNode, tokens: &[S], out: &mut Vec<&'a DispatchNode>) {
    let Some((head, rest)) = tokens.split_first() else {
        out.push(node);
        return;
    };
    let lowered = head.as_ref().to_lowercase();
    if let Some(child) = node.literals.iter().find(|c| c.literal_text() == Some(lowered.as_str())) {
        reach(child, rest, out);
    }
    if let Some(child) = node.argument.as_deref() {
        reach(child, rest, out);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Groups bindings by root label and merges them into one tree per label.
pub struct TreeBuilder {
    resolvers: Arc<ResolverRegistry>,
    settings: Arc<SuggestionSettings>,
    trees: Vec<CommandTree>,
}

impl TreeBuilder {
    pub fn new(resolvers: Arc<ResolverRegistry>, settings: SuggestionSettings) -> Self {
        Self { resolvers, settings: Arc::new(settings), trees: Vec::new() }
    }

    pub fn tree(&self, label: &str) -> Option<&CommandTree> {
        self.trees.iter().find(|t| t.label == label)
    }

    /// Insert one binding under `label`.
    pub fn insert(&mut self, label: &str, binding: Arc<RouteBinding>) -> Result<(), ConfigError> {
        self.insert_all(&[label], &[binding])
    }

    /// Insert every binding under every label. All or nothing: on error no
    /// tree is changed.
    ///
    /// Each call stages a clone of every tree it touches, so registering N
    /// handlers under one root costs O(N x tree size) rather than a single
    /// pass. Registration happens once at startup.
    pub fn insert_all<L: AsRef<str>>(
        &mut self,
        labels: &[L],
        bindings: &[Arc<RouteBinding>],
    ) -> Result<(), ConfigError> {
        let mut staged: Vec<CommandTree> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            let mut tree = staged
                .iter()
                .position(|t| t.label == label)
                .map(|i| staged.remove(i))
                .or_else(|| self.tree(label).cloned())
                .unwrap_or_else(|| CommandTree::new(label, Arc::clone(&self.settings)));
            for binding in bindings {
                tree.insert(Arc::clone(binding), &self.resolvers)?;
            }
            staged.push(tree);
        }

        for tree in staged {
            match self.trees.iter_mut().find(|t| t.label == tree.label) {
                Some(slot) => *slot = tree,
                None => self.trees.push(tree),
            }
        }
        Ok(())
    }

    pub fn build(self) -> Vec<CommandTree> {
        self.trees
    }
}
