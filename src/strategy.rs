//! Generator resolution.
//!
//! Every node gets its value from exactly one strategy: an assignment that
//! fires for it, else the last matching user binding (scoped bindings win
//! over unscoped ones), else the default for its [`NodeKind`].

use crate::nodes::{Node, NodeId, NodeKind, NodeTree};
use crate::select::SelectorGroup;
use fixture_core::{GeneratorSpec, Settings, TypeCatalog, TypeRef, TypeShape, Value};
use fixture_generator::{GeneratorError, GeneratorRegistry};
use rand::rngs::StdRng;
use rand::Rng;
use std::fmt;
use std::sync::Arc;

/// User-supplied value function.
pub type Supplier = Arc<dyn Fn(&mut StdRng) -> Value + Send + Sync>;

/// A value-producing strategy bound to nodes by a selector.
#[derive(Clone)]
pub enum Generator {
    /// Always this value
    Value(Value),
    /// A declarative generator
    Spec(GeneratorSpec),
    /// One of these values, uniformly
    OneOf(Vec<Value>),
    /// A caller-supplied function
    Supplier(Supplier),
    /// No value; the node's default runs with this collection size range
    Size { min: usize, max: usize },
}

impl Generator {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn one_of<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::OneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn supply<F>(supplier: F) -> Self
    where
        F: Fn(&mut StdRng) -> Value + Send + Sync + 'static,
    {
        Self::Supplier(Arc::new(supplier))
    }

    /// Size hint for sequences and mappings.
    pub fn size(min: usize, max: usize) -> Self {
        Self::Size { min, max }
    }

    /// Run this strategy. `index` is the node's position in its collection.
    pub fn generate(
        &self,
        rng: &mut StdRng,
        registry: &GeneratorRegistry,
        index: u64,
    ) -> Result<GenerationResult, GeneratorError> {
        let result = match self {
            Self::Value(value) => GenerationResult::fixed(value.clone()),
            Self::Spec(spec) => GenerationResult::value(registry.generate_spec(spec, rng, index)?),
            Self::OneOf(values) => {
                if values.is_empty() {
                    return Err(GeneratorError::EmptyPool);
                }
                GenerationResult::value(values[rng.random_range(0..values.len())].clone())
            }
            Self::Supplier(supplier) => GenerationResult::value(supplier(rng)),
            Self::Size { min, max } => GenerationResult::hints(Hints {
                size: Some((*min, *max)),
                skip_null: false,
            }),
        };
        Ok(result)
    }
}

impl From<GeneratorSpec> for Generator {
    fn from(spec: GeneratorSpec) -> Self {
        Self::Spec(spec)
    }
}

impl From<Value> for Generator {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Spec(spec) => f.debug_tuple("Spec").field(spec).finish(),
            Self::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Self::Supplier(_) => f.write_str("Supplier(..)"),
            Self::Size { min, max } => f
                .debug_struct("Size")
                .field("min", min)
                .field("max", max)
                .finish(),
        }
    }
}

/// Out-of-band instructions for the population engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hints {
    /// Collection size range replacing the configured one
    pub size: Option<(usize, usize)>,
    /// Never substitute null for this value
    pub skip_null: bool,
}

/// Outcome of a strategy: a finished value, or hints for the default strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResult {
    pub value: Option<Value>,
    pub hints: Hints,
}

impl GenerationResult {
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            hints: Hints::default(),
        }
    }

    /// A caller-fixed value; null substitution does not apply.
    pub fn fixed(value: Value) -> Self {
        Self {
            value: Some(value),
            hints: Hints {
                size: None,
                skip_null: true,
            },
        }
    }

    pub fn hints(hints: Hints) -> Self {
        Self { value: None, hints }
    }
}

/// User bindings resolved per node.
#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    generators: Vec<Option<Generator>>,
    nullable: Vec<bool>,
}

impl StrategyTable {
    pub fn build(
        tree: &NodeTree,
        bindings: &[(SelectorGroup, Generator)],
        nullable: &[SelectorGroup],
    ) -> Self {
        let mut generators = Vec::with_capacity(tree.len());
        let mut nullable_nodes = Vec::with_capacity(tree.len());
        for node in tree.iter() {
            let id = node.id();
            let mut best: Option<(bool, &Generator)> = None;
            for (group, generator) in bindings {
                if let Some(scoped) = group.specificity(tree, id) {
                    if best.map_or(true, |(best_scoped, _)| scoped >= best_scoped) {
                        best = Some((scoped, generator));
                    }
                }
            }
            generators.push(best.map(|(_, generator)| generator.clone()));
            nullable_nodes.push(nullable.iter().any(|group| group.matches(tree, id)));
        }
        Self {
            generators,
            nullable: nullable_nodes,
        }
    }

    /// The user binding that applies to a node, if any.
    pub fn generator(&self, id: NodeId) -> Option<&Generator> {
        self.generators.get(id.index()).and_then(Option::as_ref)
    }

    pub fn is_nullable(&self, id: NodeId) -> bool {
        self.nullable.get(id.index()).copied().unwrap_or(false)
    }
}

/// Default value for a [`NodeKind::Leaf`] node.
///
/// Returns `None` when no generator exists for the node's type.
pub fn default_leaf(
    node: &Node,
    catalog: &TypeCatalog,
    registry: &GeneratorRegistry,
    rng: &mut StdRng,
    settings: &Settings,
) -> Option<Value> {
    match node.ty() {
        TypeRef::Leaf(leaf) => Some(registry.generate_leaf(*leaf, rng, settings)),
        TypeRef::Named { name, .. } => {
            if let Some(value) = registry.generate_named(name, rng) {
                return Some(value);
            }
            match catalog.get(name).map(|def| &def.shape) {
                Some(TypeShape::Enum { variants }) if !variants.is_empty() => {
                    let variant = &variants[rng.random_range(0..variants.len())];
                    Some(Value::String(variant.clone()))
                }
                Some(TypeShape::Record { .. }) => Some(Value::Object(Default::default())),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Terminal value for a [`NodeKind::Cyclic`] node: an empty container of the
/// same shape, or null.
pub fn cyclic_terminal(ty: &TypeRef) -> Value {
    match ty {
        TypeRef::Seq { .. } => Value::Array(Vec::new()),
        TypeRef::Map { .. } => Value::Map(Vec::new()),
        _ => Value::Null,
    }
}

/// Whether the node can only ever produce an empty container.
pub(crate) fn is_terminal(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::Cyclic | NodeKind::Ignored)
}
