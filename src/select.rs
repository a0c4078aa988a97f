//! Selectors: declarative patterns that pick nodes out of a tree.
//!
//! Matching is purely structural. A selector names a target (a member, a
//! type, the root or a node predicate) and optionally restricts where that
//! target may occur with [`Scope`]s and an exact depth.
//!
//! ```rust
//! use fixturegen::select::{Scope, Selector};
//!
//! let street = Selector::field("Address", "street").within(Scope::field("Person", "home"));
//! let text = Selector::all("String").or(Selector::all("char")).except(street.clone());
//! assert_eq!(street.to_string(), "field(Address.street).within(scope(Person.home))");
//! assert_eq!(text.to_string(), "all(String), all(char).except(field(Address.street).within(scope(Person.home)))");
//! ```

use crate::error::FixtureError;
use crate::nodes::{Node, NodeId, NodeTree};
use fixture_core::{SelectorDef, TypeRef};
use std::fmt;
use std::sync::Arc;

/// Predicate over a node, used by [`Selector::matching`].
pub type NodePredicate = Arc<dyn Fn(&Node) -> bool + Send + Sync>;

#[derive(Clone)]
enum Target {
    Field { owner: String, name: String },
    Type(String),
    Root,
    Predicate { description: String, predicate: NodePredicate },
}

/// An enclosing position that a selected node must be nested inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Type(String),
    Field { owner: String, name: String },
}

impl Scope {
    /// Nested anywhere inside a node of this type.
    pub fn ty(pattern: impl Into<String>) -> Self {
        Self::Type(pattern.into())
    }

    /// Nested anywhere inside this member.
    pub fn field(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Field {
            owner: owner.into(),
            name: name.into(),
        }
    }

    fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Type(pattern) => type_matches(pattern, node.ty()),
            Self::Field { owner, name } => member_matches(node, owner, name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(pattern) => write!(f, "scope({pattern})"),
            Self::Field { owner, name } => write!(f, "scope({owner}.{name})"),
        }
    }
}

/// A single node pattern.
#[derive(Clone)]
pub struct Selector {
    target: Target,
    scopes: Vec<Scope>,
    depth: Option<usize>,
}

impl Selector {
    fn new(target: Target) -> Self {
        Self {
            target,
            scopes: Vec::new(),
            depth: None,
        }
    }

    /// The member `name` declared by type `owner`.
    pub fn field(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Target::Field {
            owner: owner.into(),
            name: name.into(),
        })
    }

    /// Every node of a type.
    ///
    /// A bare name such as `Vec` or `Pair` matches any parameterization;
    /// a full descriptor such as `Pair<String, i32>` matches only that one.
    pub fn all(pattern: impl Into<String>) -> Self {
        Self::new(Target::Type(pattern.into()))
    }

    /// The root node.
    pub fn root() -> Self {
        Self::new(Target::Root)
    }

    /// Nodes accepted by a predicate. `description` is used in diagnostics.
    pub fn matching<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        Self::new(Target::Predicate {
            description: description.into(),
            predicate: Arc::new(predicate),
        })
    }

    /// Restrict to nodes nested inside `scope`.
    ///
    /// Repeated calls nest: each scope must appear inside the previous one.
    pub fn within(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    /// Restrict to nodes at exactly this depth.
    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Union with another selector.
    pub fn or(self, other: impl Into<SelectorGroup>) -> SelectorGroup {
        SelectorGroup::from(self).or(other)
    }

    /// Scoped selectors take precedence over unscoped ones.
    pub fn is_scoped(&self) -> bool {
        !self.scopes.is_empty() || self.depth.is_some()
    }

    pub fn matches(&self, tree: &NodeTree, id: NodeId) -> bool {
        let node = tree.get(id);
        let target = match &self.target {
            Target::Field { owner, name } => member_matches(node, owner, name),
            Target::Type(pattern) => type_matches(pattern, node.ty()),
            Target::Root => node.is_root(),
            Target::Predicate { predicate, .. } => predicate(node),
        };
        target
            && self.depth.map_or(true, |depth| node.depth() == depth)
            && self.scopes_match(tree, id)
    }

    fn scopes_match(&self, tree: &NodeTree, id: NodeId) -> bool {
        if self.scopes.is_empty() {
            return true;
        }
        let lineage = tree.lineage(id);
        let mut pending = self.scopes.iter().peekable();
        for ancestor in &lineage[..lineage.len() - 1] {
            if let Some(scope) = pending.peek() {
                if scope.matches(tree.get(*ancestor)) {
                    pending.next();
                }
            }
        }
        pending.peek().is_none()
    }

    /// Build a selector from its model-file form.
    pub fn from_def(def: &SelectorDef) -> Result<Self, FixtureError> {
        let mut selector = match (&def.field, &def.ty, def.root) {
            (Some(field), None, false) => {
                let (owner, name) = split_field(field)?;
                Self::field(owner, name)
            }
            (None, Some(ty), false) => Self::all(ty.clone()),
            (None, None, true) => Self::root(),
            _ => {
                return Err(FixtureError::InvalidModel(
                    "selector needs exactly one of 'field', 'type' or 'root'".to_string(),
                ))
            }
        };
        for scope in &def.within {
            selector = selector.within(match (&scope.field, &scope.ty) {
                (Some(field), None) => {
                    let (owner, name) = split_field(field)?;
                    Scope::field(owner, name)
                }
                (None, Some(ty)) => Scope::ty(ty.clone()),
                _ => {
                    return Err(FixtureError::InvalidModel(
                        "scope needs exactly one of 'field' or 'type'".to_string(),
                    ))
                }
            });
        }
        if let Some(depth) = def.depth {
            selector = selector.at_depth(depth);
        }
        Ok(selector)
    }
}

fn split_field(field: &str) -> Result<(&str, &str), FixtureError> {
    field
        .rsplit_once('.')
        .filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
        .ok_or_else(|| {
            FixtureError::InvalidModel(format!("field selector '{field}' is not 'Owner.member'"))
        })
}

fn member_matches(node: &Node, owner: &str, name: &str) -> bool {
    node.member()
        .is_some_and(|member| member.owner == owner && member.name == name)
}

fn type_matches(pattern: &str, ty: &TypeRef) -> bool {
    if pattern.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return ty.raw_name() == pattern;
    }
    let canonical = ty.to_string();
    pattern
        .chars()
        .filter(|c| !c.is_whitespace())
        .eq(canonical.chars().filter(|c| !c.is_whitespace()))
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Field { owner, name } => write!(f, "field({owner}.{name})")?,
            Target::Type(pattern) => write!(f, "all({pattern})")?,
            Target::Root => f.write_str("root()")?,
            Target::Predicate { description, .. } => write!(f, "matching({description})")?,
        }
        for scope in &self.scopes {
            write!(f, ".within({scope})")?;
        }
        if let Some(depth) = self.depth {
            write!(f, ".at_depth({depth})")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({self})")
    }
}

/// A union of selectors minus an exclusion set.
#[derive(Clone, Debug)]
pub struct SelectorGroup {
    include: Vec<Selector>,
    exclude: Vec<Selector>,
}

impl SelectorGroup {
    /// Add the selectors of `other` to this group.
    pub fn or(mut self, other: impl Into<SelectorGroup>) -> Self {
        let other = other.into();
        self.include.extend(other.include);
        self.exclude.extend(other.exclude);
        self
    }

    /// Exclude nodes matched by `other`.
    pub fn except(mut self, other: impl Into<SelectorGroup>) -> Self {
        self.exclude.extend(other.into().include);
        self
    }

    /// Selectors whose union this group matches.
    pub fn selectors(&self) -> &[Selector] {
        &self.include
    }

    pub fn matches(&self, tree: &NodeTree, id: NodeId) -> bool {
        self.specificity(tree, id).is_some()
    }

    /// `Some(scoped)` when this group matches the node, where `scoped` tells
    /// whether a scoped selector was among those that matched.
    pub fn specificity(&self, tree: &NodeTree, id: NodeId) -> Option<bool> {
        if self.exclude.iter().any(|s| s.matches(tree, id)) {
            return None;
        }
        self.include
            .iter()
            .filter(|s| s.matches(tree, id))
            .map(Selector::is_scoped)
            .reduce(|a, b| a || b)
    }

    /// Every node this group matches, in tree order.
    pub fn matched(&self, tree: &NodeTree) -> Vec<NodeId> {
        tree.iter()
            .map(Node::id)
            .filter(|id| self.matches(tree, *id))
            .collect()
    }
}

impl From<Selector> for SelectorGroup {
    fn from(selector: Selector) -> Self {
        Self {
            include: vec![selector],
            exclude: Vec::new(),
        }
    }
}

impl fmt::Display for SelectorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.include.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        for selector in &self.exclude {
            write!(f, ".except({selector})")?;
        }
        Ok(())
    }
}

/// Selectors among `groups` that match no node of `tree`, in declaration order.
pub fn unmatched<'g>(
    tree: &NodeTree,
    groups: impl IntoIterator<Item = &'g SelectorGroup>,
) -> Vec<String> {
    let mut missing = Vec::new();
    for group in groups {
        for selector in group.selectors() {
            if !tree.iter().any(|node| selector.matches(tree, node.id())) {
                missing.push(selector.to_string());
            }
        }
    }
    missing
}
