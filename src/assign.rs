//! Conditional assignments between nodes.
//!
//! ```rust
//! use fixturegen::assign::Assign;
//! use fixturegen::select::Selector;
//!
//! let rule = Assign::given(Selector::field("Order", "status"))
//!     .is("CLOSED")
//!     .set(Selector::field("Order", "note"), "archived")
//!     .else_set(Selector::field("Order", "note"), "open");
//! assert_eq!(rule.to_string(), "given(field(Order.status))");
//! ```
//!
//! Rules are linked through the nodes they touch: a rule whose origin is
//! another rule's target runs after it. The [`AssignmentPlan`] orders rules
//! and the members of every compound accordingly, and rejects cycles before
//! any value is generated.

use crate::error::FixtureError;
use crate::nodes::{NodeId, NodeKind, NodeTree};
use crate::select::{Selector, SelectorGroup};
use crate::strategy::{GenerationResult, Generator};
use fixture_core::{AssignDef, AssignTargetDef, Value};
use fixture_generator::generators::static_value::yaml_to_value;
use fixture_generator::{GeneratorError, GeneratorRegistry};
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type Derivation = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Test applied to the origin's generated value.
#[derive(Clone)]
pub enum Condition {
    Always,
    Equals(Value),
    In(Vec<Value>),
    Satisfies(ValuePredicate),
}

impl Condition {
    pub fn test(&self, value: &Value) -> bool {
        match self {
            Self::Always => true,
            Self::Equals(expected) => values_equal(expected, value),
            Self::In(candidates) => candidates.iter().any(|c| values_equal(c, value)),
            Self::Satisfies(predicate) => predicate(value),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_), Value::UInt(_)) | (Value::UInt(_), Value::Int(_)) => {
            a.as_i64().is_some() && a.as_i64() == b.as_i64()
        }
        _ => a == b,
    }
}

/// What an assignment writes into a target node.
#[derive(Clone)]
pub enum AssignAction {
    Literal(Value),
    Generate(Generator),
    /// A function of the origin's value
    Derive(Derivation),
}

#[derive(Clone)]
pub struct AssignTarget {
    pub selector: SelectorGroup,
    pub action: AssignAction,
}

/// Which side of a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Then,
    Else,
}

/// A conditional assignment rule.
#[derive(Clone)]
pub struct Assignment {
    origin: SelectorGroup,
    condition: Condition,
    then: Vec<AssignTarget>,
    otherwise: Vec<AssignTarget>,
}

/// Entry point of the assignment DSL.
pub struct Assign;

impl Assign {
    /// Start a conditional rule on the value of `origin`.
    pub fn given(origin: impl Into<SelectorGroup>) -> Given {
        Given {
            origin: origin.into(),
        }
    }

    /// Start an unconditional copy of `origin`'s value.
    pub fn value_of(origin: impl Into<SelectorGroup>) -> ValueOf {
        ValueOf {
            origin: origin.into(),
        }
    }
}

pub struct Given {
    origin: SelectorGroup,
}

impl Given {
    pub fn is(self, value: impl Into<Value>) -> Assignment {
        Assignment::new(self.origin, Condition::Equals(value.into()))
    }

    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Assignment {
        Assignment::new(
            self.origin,
            Condition::In(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn satisfies<F>(self, predicate: F) -> Assignment
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Assignment::new(self.origin, Condition::Satisfies(Arc::new(predicate)))
    }

    /// Fire every time the origin is generated.
    pub fn always(self) -> Assignment {
        Assignment::new(self.origin, Condition::Always)
    }
}

pub struct ValueOf {
    origin: SelectorGroup,
}

impl ValueOf {
    /// Copy the origin's value into `target`.
    pub fn to(self, target: impl Into<SelectorGroup>) -> Assignment {
        Assignment::new(self.origin, Condition::Always).push(
            Branch::Then,
            target,
            AssignAction::Derive(Arc::new(Value::clone)),
        )
    }
}

impl Assignment {
    fn new(origin: SelectorGroup, condition: Condition) -> Self {
        Self {
            origin,
            condition,
            then: Vec::new(),
            otherwise: Vec::new(),
        }
    }

    fn push(
        mut self,
        branch: Branch,
        target: impl Into<SelectorGroup>,
        action: AssignAction,
    ) -> Self {
        let target = AssignTarget {
            selector: target.into(),
            action,
        };
        match branch {
            Branch::Then => self.then.push(target),
            Branch::Else => self.otherwise.push(target),
        }
        self
    }

    pub fn set(self, target: impl Into<SelectorGroup>, value: impl Into<Value>) -> Self {
        self.push(Branch::Then, target, AssignAction::Literal(value.into()))
    }

    pub fn generate(self, target: impl Into<SelectorGroup>, generator: impl Into<Generator>) -> Self {
        self.push(Branch::Then, target, AssignAction::Generate(generator.into()))
    }

    pub fn else_set(self, target: impl Into<SelectorGroup>, value: impl Into<Value>) -> Self {
        self.push(Branch::Else, target, AssignAction::Literal(value.into()))
    }

    pub fn else_generate(
        self,
        target: impl Into<SelectorGroup>,
        generator: impl Into<Generator>,
    ) -> Self {
        self.push(Branch::Else, target, AssignAction::Generate(generator.into()))
    }

    /// Transform the origin's value before writing it to the last target.
    pub fn as_<F>(mut self, derive: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        if let Some(target) = self.then.last_mut() {
            target.action = AssignAction::Derive(Arc::new(derive));
        }
        self
    }

    pub fn origin(&self) -> &SelectorGroup {
        &self.origin
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Targets of one branch.
    pub fn targets(&self, branch: Branch) -> &[AssignTarget] {
        match branch {
            Branch::Then => &self.then,
            Branch::Else => &self.otherwise,
        }
    }

    /// Every selector this rule uses, origin first.
    pub fn selectors(&self) -> impl Iterator<Item = &SelectorGroup> {
        std::iter::once(&self.origin)
            .chain(self.then.iter().map(|t| &t.selector))
            .chain(self.otherwise.iter().map(|t| &t.selector))
    }

    /// The branch that applies for an origin value.
    pub fn branch(&self, origin_value: &Value) -> Branch {
        if self.condition.test(origin_value) {
            Branch::Then
        } else {
            Branch::Else
        }
    }

    /// Produce the value for one target.
    pub fn apply(
        &self,
        branch: Branch,
        target: usize,
        origin_value: &Value,
        rng: &mut StdRng,
        registry: &GeneratorRegistry,
        index: u64,
    ) -> Result<Option<GenerationResult>, GeneratorError> {
        let Some(target) = self.targets(branch).get(target) else {
            return Ok(None);
        };
        let result = match &target.action {
            AssignAction::Literal(value) => GenerationResult::fixed(value.clone()),
            AssignAction::Generate(generator) => generator.generate(rng, registry, index)?,
            AssignAction::Derive(derive) => GenerationResult::fixed(derive(origin_value)),
        };
        Ok(Some(result))
    }

    /// Build a rule from its model-file form.
    pub fn from_def(def: &AssignDef) -> Result<Self, FixtureError> {
        let origin = Selector::from_def(&def.given)?;
        let condition = match (&def.is, def.is_in.is_empty()) {
            (Some(value), true) => Condition::Equals(yaml_to_value(value)),
            (None, false) => Condition::In(def.is_in.iter().map(yaml_to_value).collect()),
            (None, true) => Condition::Always,
            (Some(_), false) => {
                return Err(FixtureError::InvalidModel(
                    "assignment cannot have both 'is' and 'is_in'".to_string(),
                ))
            }
        };
        let copy = matches!(condition, Condition::Always);
        let mut rule = Self::new(origin.into(), condition);
        for (branch, targets) in [(Branch::Then, &def.set), (Branch::Else, &def.else_set)] {
            for target in targets {
                let action = target_action(target, copy && branch == Branch::Then)?;
                rule = rule.push(branch, Selector::from_def(&target.select)?, action);
            }
        }
        Ok(rule)
    }
}

fn target_action(def: &AssignTargetDef, copy: bool) -> Result<AssignAction, FixtureError> {
    match (&def.value, &def.generator) {
        (Some(value), None) => Ok(AssignAction::Literal(yaml_to_value(value))),
        (None, Some(spec)) => Ok(AssignAction::Generate(spec.clone().into())),
        (None, None) if copy => Ok(AssignAction::Derive(Arc::new(Value::clone))),
        _ => Err(FixtureError::InvalidModel(
            "assignment target needs exactly one of 'value' or 'generator'".to_string(),
        )),
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "given({})", self.origin)
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assignment")
            .field("origin", &self.origin)
            .field("then", &self.then.len())
            .field("otherwise", &self.otherwise.len())
            .finish()
    }
}

/// One target slot of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRef {
    pub rule: usize,
    pub branch: Branch,
    pub target: usize,
}

/// Evaluation order for a set of rules over one node tree.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPlan {
    order: Vec<usize>,
    sources: Vec<HashSet<NodeId>>,
    source_nodes: HashSet<NodeId>,
    by_target: HashMap<NodeId, Vec<TargetRef>>,
    child_deps: HashMap<NodeId, Vec<NodeId>>,
}

impl AssignmentPlan {
    pub fn build(tree: &NodeTree, rules: &[Assignment]) -> Result<Self, FixtureError> {
        let sources: Vec<HashSet<NodeId>> = rules
            .iter()
            .map(|rule| rule.origin.matched(tree).into_iter().collect())
            .collect();

        let mut targets: Vec<Vec<(NodeId, TargetRef)>> = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            let mut matched = Vec::new();
            for branch in [Branch::Then, Branch::Else] {
                for (slot, target) in rule.targets(branch).iter().enumerate() {
                    for id in target.selector.matched(tree) {
                        if sources[index].iter().any(|s| related(tree, *s, id)) {
                            return Err(FixtureError::CircularAssignment {
                                chain: vec![
                                    rule.origin.to_string(),
                                    target.selector.to_string(),
                                    rule.origin.to_string(),
                                ],
                            });
                        }
                        let target = TargetRef {
                            rule: index,
                            branch,
                            target: slot,
                        };
                        matched.push((id, target));
                    }
                }
            }
            targets.push(matched);
        }

        // r1 -> r2 when r1 writes a node r2 reads
        let feeds = |r1: usize, r2: usize| {
            r1 != r2
                && targets[r1]
                    .iter()
                    .any(|(t, _)| sources[r2].iter().any(|s| related(tree, *t, *s)))
        };
        let order = stable_order(rules.len(), feeds).map_err(|cycle| {
            FixtureError::CircularAssignment {
                chain: cycle.iter().map(|r| rules[*r].origin.to_string()).collect(),
            }
        })?;

        let mut rank = vec![0; rules.len()];
        for (position, rule) in order.iter().enumerate() {
            rank[*rule] = position;
        }
        let mut by_target: HashMap<NodeId, Vec<TargetRef>> = HashMap::new();
        for (id, target) in targets.iter().flatten() {
            by_target.entry(*id).or_default().push(*target);
        }
        for refs in by_target.values_mut() {
            refs.sort_by_key(|r| rank[r.rule]);
        }

        let (child_deps, edge_rules) = sibling_dependencies(tree, rules, &sources, &targets)?;
        check_siblings(tree, rules, &child_deps, &edge_rules)?;

        debug!(
            "Planned {} assignment rule(s), order {:?}, {} ordered member(s)",
            rules.len(),
            order,
            child_deps.len()
        );

        let source_nodes = sources.iter().flatten().copied().collect();
        Ok(Self {
            order,
            sources,
            source_nodes,
            by_target,
            child_deps,
        })
    }

    /// Rule indices in evaluation order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Whether any rule reads this node's value.
    pub fn is_source(&self, id: NodeId) -> bool {
        self.source_nodes.contains(&id)
    }

    /// Nodes a rule reads.
    pub fn sources(&self, rule: usize) -> Option<&HashSet<NodeId>> {
        self.sources.get(rule)
    }

    /// Rule targets writing this node, in evaluation order.
    pub fn targets(&self, id: NodeId) -> &[TargetRef] {
        self.by_target.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Siblings that must be generated before this compound member.
    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        self.child_deps.get(&id).map_or(&[], Vec::as_slice)
    }
}

type EdgeRules = HashMap<(NodeId, NodeId), usize>;

/// For every source/target pair, order the two members of their lowest
/// common compound ancestor.
fn sibling_dependencies(
    tree: &NodeTree,
    rules: &[Assignment],
    sources: &[HashSet<NodeId>],
    targets: &[Vec<(NodeId, TargetRef)>],
) -> Result<(HashMap<NodeId, Vec<NodeId>>, EdgeRules), FixtureError> {
    let mut deps: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut edge_rules = EdgeRules::new();

    for (rule, rule_targets) in targets.iter().enumerate() {
        let mut rule_sources: Vec<NodeId> = sources[rule].iter().copied().collect();
        rule_sources.sort();
        for source in rule_sources {
            for (target, target_ref) in rule_targets {
                let from = tree.lineage(source);
                let to = tree.lineage(*target);
                let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
                // Containment was rejected earlier, so both lineages continue past the ancestor
                let (Some(lca), Some(before), Some(after)) =
                    (common.checked_sub(1).map(|i| from[i]), from.get(common), to.get(common))
                else {
                    continue;
                };
                match tree.get(lca).kind() {
                    NodeKind::Compound => {
                        let entry = deps.entry(*after).or_default();
                        if !entry.contains(before) {
                            entry.push(*before);
                        }
                        edge_rules.entry((*before, *after)).or_insert(rule);
                    }
                    NodeKind::Mapping if tree.get(lca).children().first() == Some(after) => {
                        let target = &rules[rule].targets(target_ref.branch)[target_ref.target];
                        return Err(FixtureError::CircularAssignment {
                            chain: vec![
                                rules[rule].origin.to_string(),
                                target.selector.to_string(),
                            ],
                        });
                    }
                    _ => {}
                }
            }
        }
    }
    Ok((deps, edge_rules))
}

fn check_siblings(
    tree: &NodeTree,
    rules: &[Assignment],
    deps: &HashMap<NodeId, Vec<NodeId>>,
    edge_rules: &EdgeRules,
) -> Result<(), FixtureError> {
    let mut parents: Vec<NodeId> = deps
        .keys()
        .filter_map(|child| tree.get(*child).parent())
        .collect();
    parents.sort();
    parents.dedup();

    for parent in parents {
        let children = tree.get(parent).children();
        let depends = |i: usize, j: usize| {
            deps.get(&children[j])
                .is_some_and(|before| before.contains(&children[i]))
        };
        if let Err(cycle) = stable_order(children.len(), depends) {
            let chain = cycle
                .windows(2)
                .filter_map(|pair| edge_rules.get(&(children[pair[0]], children[pair[1]])))
                .map(|rule| rules[*rule].origin.to_string())
                .collect::<Vec<_>>();
            let mut chain = chain;
            if let Some(first) = chain.first().cloned() {
                chain.push(first);
            }
            return Err(FixtureError::CircularAssignment { chain });
        }
    }
    Ok(())
}

fn related(tree: &NodeTree, a: NodeId, b: NodeId) -> bool {
    a == b || tree.is_ancestor(a, b) || tree.is_ancestor(b, a)
}

/// Topological order of `0..n` where `edge(a, b)` puts `a` before `b`.
///
/// Ties are broken by index, so independent items keep declaration order.
/// On failure returns one cycle, closed by repeating its first item.
pub(crate) fn stable_order(
    n: usize,
    edge: impl Fn(usize, usize) -> bool,
) -> Result<Vec<usize>, Vec<usize>> {
    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    while order.len() < n {
        let ready = (0..n).find(|&b| !placed[b] && (0..n).all(|a| placed[a] || !edge(a, b)));
        match ready {
            Some(next) => {
                placed[next] = true;
                order.push(next);
            }
            None => return Err(find_cycle(n, &placed, &edge)),
        }
    }
    Ok(order)
}

fn find_cycle(n: usize, placed: &[bool], edge: &impl Fn(usize, usize) -> bool) -> Vec<usize> {
    let Some(start) = (0..n).find(|&i| !placed[i]) else {
        return Vec::new();
    };
    // Every unplaced item has an unplaced predecessor; walk backwards until one repeats
    let mut walk = vec![start];
    let mut current = start;
    for _ in 0..=n {
        let Some(pred) = (0..n).find(|&p| !placed[p] && edge(p, current)) else {
            break;
        };
        if let Some(pos) = walk.iter().position(|&item| item == pred) {
            let mut cycle = walk[pos..].to_vec();
            cycle.reverse();
            cycle.push(cycle[0]);
            return cycle;
        }
        walk.push(pred);
        current = pred;
    }
    walk
}
