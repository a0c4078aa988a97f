//! Population engine.
//!
//! Walks a node tree and produces one [`Value`] per call. Compound members
//! move through [`NodeState`]s: a member whose assignment origin lives in a
//! sibling that is not yet generated stays `Blocked` until it is.
//!
//! Values read by assignment rules are recorded in frames. A frame is opened
//! for every compound instance, collection element and map entry, and its
//! records merge into the enclosing frame when it closes, so a rule reads
//! the nearest generated instance of its origin.

use crate::assign::{Assignment, AssignmentPlan};
use crate::error::FixtureError;
use crate::nodes::{NodeId, NodeKind, NodeTree};
use crate::setters::Setters;
use crate::strategy::{cyclic_terminal, default_leaf, is_terminal, GenerationResult, Hints, StrategyTable};
use fixture_core::values::contains_key;
use fixture_core::{
    AssignmentType, Fields, KeyExhaustion, OnSetterError, SeqKind, Settings, TypeCatalog, TypeRef,
    Value,
};
use fixture_generator::GeneratorRegistry;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Generation state of a compound member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    /// Waiting for a sibling that an assignment reads
    Blocked,
    Generating,
    Done,
}

/// Everything the engine reads. Shared, never mutated.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub tree: &'a NodeTree,
    pub catalog: &'a TypeCatalog,
    pub settings: &'a Settings,
    pub registry: &'a GeneratorRegistry,
    pub strategies: &'a StrategyTable,
    pub plan: &'a AssignmentPlan,
    pub rules: &'a [Assignment],
    pub setters: &'a Setters,
}

type Frame = HashMap<NodeId, (u64, Value)>;

/// Populates values for one node tree from one random stream.
pub struct Engine<'a> {
    ctx: Context<'a>,
    rng: StdRng,
    frames: Vec<Frame>,
    seq: u64,
}

impl<'a> Engine<'a> {
    pub fn new(ctx: Context<'a>, rng: StdRng) -> Self {
        Self {
            ctx,
            rng,
            frames: Vec::new(),
            seq: 0,
        }
    }

    /// Generate one root value. `index` is the root's position in a list.
    pub fn populate(&mut self, index: u64) -> Result<Value, FixtureError> {
        self.frames.clear();
        self.frames.push(Frame::new());
        let value = self.generate(self.ctx.tree.root_id(), index);
        self.frames.clear();
        value
    }

    fn generate(&mut self, id: NodeId, index: u64) -> Result<Value, FixtureError> {
        let ctx = self.ctx;
        let node = ctx.tree.get(id);
        if node.kind() == NodeKind::Ignored {
            return Ok(Value::Null);
        }

        let resolved = match self.assigned(id, index)? {
            Some(result) => Some(result),
            None => match ctx.strategies.generator(id) {
                Some(generator) => Some(
                    generator
                        .generate(&mut self.rng, ctx.registry, index)
                        .map_err(|source| FixtureError::Generator {
                            path: ctx.tree.path(id),
                            source,
                        })?,
                ),
                None => None,
            },
        };

        let mut hints = Hints::default();
        if let Some(result) = resolved {
            match result.value {
                Some(value) => return Ok(self.finish(id, value)),
                None => hints = result.hints,
            }
        }

        let nullable = ctx.strategies.is_nullable(id)
            || (node.kind() == NodeKind::Leaf && ctx.registry.is_nullable(node.ty().raw_name()));
        if !hints.skip_null && nullable && self.rng.random_bool(ctx.settings.null_probability) {
            return Ok(self.finish(id, Value::Null));
        }

        let value = match node.kind() {
            NodeKind::Ignored => Value::Null,
            NodeKind::Cyclic => cyclic_terminal(node.ty()),
            NodeKind::Leaf => default_leaf(node, ctx.catalog, ctx.registry, &mut self.rng, ctx.settings)
                .ok_or_else(|| FixtureError::UnsupportedType {
                    type_name: node.ty().to_string(),
                    path: ctx.tree.path(id),
                })?,
            NodeKind::Compound => self.generate_compound(id, index)?,
            NodeKind::Sequence => self.generate_sequence(id, hints)?,
            NodeKind::Mapping => self.generate_mapping(id, hints)?,
            NodeKind::Wrapper => self.generate_wrapper(id, index)?,
        };
        Ok(self.finish(id, value))
    }

    /// The result of the last rule, in plan order, that fires for this node.
    fn assigned(&mut self, id: NodeId, index: u64) -> Result<Option<GenerationResult>, FixtureError> {
        let ctx = self.ctx;
        for target in ctx.plan.targets(id).iter().rev() {
            let Some(origin) = self.origin_value(target.rule) else {
                continue;
            };
            let rule = &ctx.rules[target.rule];
            if rule.branch(&origin) != target.branch {
                continue;
            }
            let result = rule
                .apply(target.branch, target.target, &origin, &mut self.rng, ctx.registry, index)
                .map_err(|source| FixtureError::Generator {
                    path: ctx.tree.path(id),
                    source,
                })?;
            if result.is_some() {
                trace!("{} assigned by {}", ctx.tree.path(id), rule);
                return Ok(result);
            }
        }
        Ok(None)
    }

    /// Latest recorded value of a rule's origin, searching the nearest frame first.
    fn origin_value(&self, rule: usize) -> Option<Value> {
        let sources = self.ctx.plan.sources(rule)?;
        self.frames.iter().rev().find_map(|frame| {
            frame
                .iter()
                .filter(|(id, _)| sources.contains(*id))
                .max_by_key(|(_, (seq, _))| *seq)
                .map(|(_, (_, value))| value.clone())
        })
    }

    fn finish(&mut self, id: NodeId, value: Value) -> Value {
        if self.ctx.plan.is_source(id) {
            self.seq += 1;
            if let Some(frame) = self.frames.last_mut() {
                frame.insert(id, (self.seq, value.clone()));
            }
        }
        trace!("{} -> {:?}", self.ctx.tree.path(id), NodeState::Done);
        value
    }

    fn close_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            if let Some(parent) = self.frames.last_mut() {
                parent.extend(frame);
            }
        }
    }

    /// Generate a node inside its own frame.
    fn scoped(&mut self, id: NodeId, index: u64) -> Result<Value, FixtureError> {
        self.frames.push(Frame::new());
        let value = self.generate(id, index);
        self.close_frame();
        value
    }

    fn generate_compound(&mut self, id: NodeId, index: u64) -> Result<Value, FixtureError> {
        let ctx = self.ctx;
        let children = ctx.tree.get(id).children();
        let mut fields = Fields::with_capacity(children.len());
        for child in children {
            if let Some(member) = ctx.tree.get(*child).member() {
                fields.insert(member.name.clone(), Value::Null);
            }
        }

        self.frames.push(Frame::new());
        let populated = self.populate_members(children, &mut fields, index);
        self.close_frame();
        populated?;
        Ok(Value::Object(fields))
    }

    fn populate_members(
        &mut self,
        children: &[NodeId],
        fields: &mut Fields,
        index: u64,
    ) -> Result<(), FixtureError> {
        let ctx = self.ctx;
        let mut states = vec![NodeState::Pending; children.len()];
        while let Some(i) = self.next_ready(children, &mut states) {
            let child = children[i];
            states[i] = NodeState::Generating;
            trace!("{} -> {:?}", ctx.tree.path(child), states[i]);
            if ctx.tree.get(child).kind() != NodeKind::Ignored {
                let value = self.generate(child, index)?;
                self.write_member(fields, child, value)?;
            }
            states[i] = NodeState::Done;
        }

        let blocked: Vec<String> = children
            .iter()
            .zip(&states)
            .filter(|(_, state)| **state != NodeState::Done)
            .map(|(child, _)| ctx.tree.path(*child))
            .collect();
        if !blocked.is_empty() {
            return Err(FixtureError::CircularAssignment { chain: blocked });
        }
        Ok(())
    }

    /// First member whose sibling dependencies are all done.
    fn next_ready(&self, children: &[NodeId], states: &mut [NodeState]) -> Option<usize> {
        let ctx = self.ctx;
        for i in 0..children.len() {
            if !matches!(states[i], NodeState::Pending | NodeState::Blocked) {
                continue;
            }
            let ready = ctx.plan.dependencies(children[i]).iter().all(|dep| {
                children
                    .iter()
                    .position(|c| c == dep)
                    .map_or(true, |j| states[j] == NodeState::Done)
            });
            if ready {
                return Some(i);
            }
            if states[i] == NodeState::Pending {
                states[i] = NodeState::Blocked;
                trace!("{} -> {:?}", ctx.tree.path(children[i]), states[i]);
            }
        }
        None
    }

    fn write_member(&mut self, fields: &mut Fields, child: NodeId, value: Value) -> Result<(), FixtureError> {
        let ctx = self.ctx;
        let Some(member) = ctx.tree.get(child).member() else {
            return Ok(());
        };
        let setter = match (ctx.settings.assignment_type, &member.setter) {
            (AssignmentType::Method, Some(setter)) => setter,
            _ => {
                fields.insert(member.name.clone(), value);
                return Ok(());
            }
        };

        let outcome = match ctx.setters.get(&member.owner, setter) {
            Some(function) => function(&mut *fields, value.clone()),
            None => Err(format!("no setter registered for {}::{}", member.owner, setter)),
        };
        let Err(message) = outcome else {
            return Ok(());
        };

        match ctx.settings.on_setter_error {
            OnSetterError::AssignField => {
                debug!("Setter {} failed ({}); assigning field {}", setter, message, member.name);
                fields.insert(member.name.clone(), value);
                Ok(())
            }
            OnSetterError::Ignore => {
                debug!("Setter {} failed ({}); leaving {} unset", setter, message, member.name);
                Ok(())
            }
            OnSetterError::Fail => Err(FixtureError::SetterInvocation {
                path: ctx.tree.path(child),
                setter: setter.clone(),
                message,
            }),
        }
    }

    fn draw_size(&mut self, id: NodeId, hints: Hints) -> Result<usize, FixtureError> {
        let settings = self.ctx.settings;
        let (min, max) = hints
            .size
            .unwrap_or((settings.collection_min_size, settings.collection_max_size));
        let max = max.max(min);
        if max > settings.collection_max_limit {
            return Err(FixtureError::CollectionTooLarge {
                path: self.ctx.tree.path(id),
                size: max,
                limit: settings.collection_max_limit,
            });
        }
        Ok(self.rng.random_range(min..=max))
    }

    /// Apply the exhaustion policy once no distinct key could be drawn.
    fn key_exhausted(&self, id: NodeId) -> Result<(), FixtureError> {
        let retries = self.ctx.settings.map_key_retries;
        match self.ctx.settings.map_key_exhaustion {
            KeyExhaustion::Drop => {
                warn!(
                    "No distinct key at {} after {} retries; dropping entry",
                    self.ctx.tree.path(id),
                    retries
                );
                Ok(())
            }
            KeyExhaustion::Fail => Err(FixtureError::KeySpaceExhausted {
                path: self.ctx.tree.path(id),
                retries,
            }),
        }
    }

    fn generate_sequence(&mut self, id: NodeId, hints: Hints) -> Result<Value, FixtureError> {
        let ctx = self.ctx;
        let node = ctx.tree.get(id);
        let Some(&element) = node.children().first() else {
            return Ok(Value::Array(Vec::new()));
        };
        if is_terminal(ctx.tree.get(element).kind()) {
            return Ok(Value::Array(Vec::new()));
        }

        let size = self.draw_size(id, hints)?;
        let distinct = matches!(
            node.ty(),
            TypeRef::Seq {
                kind: SeqKind::Set,
                ..
            }
        );
        let mut items = Vec::with_capacity(size);
        for index in 0..size as u64 {
            let mut attempts = 0;
            loop {
                let item = self.scoped(element, index)?;
                if !distinct || !items.contains(&item) {
                    items.push(item);
                    break;
                }
                if attempts >= ctx.settings.map_key_retries {
                    self.key_exhausted(id)?;
                    break;
                }
                attempts += 1;
            }
        }
        Ok(Value::Array(items))
    }

    fn generate_mapping(&mut self, id: NodeId, hints: Hints) -> Result<Value, FixtureError> {
        let ctx = self.ctx;
        let children = ctx.tree.get(id).children();
        let (Some(&key), Some(&value)) = (children.first(), children.get(1)) else {
            return Ok(Value::Map(Vec::new()));
        };
        if is_terminal(ctx.tree.get(key).kind()) {
            return Ok(Value::Map(Vec::new()));
        }

        let size = self.draw_size(id, hints)?;
        let mut entries: Vec<(Value, Value)> = Vec::with_capacity(size);
        for index in 0..size as u64 {
            let mut attempts = 0;
            loop {
                self.frames.push(Frame::new());
                let entry = self.generate_entry(key, value, index, &entries);
                self.close_frame();
                match entry? {
                    Some(entry) => {
                        entries.push(entry);
                        break;
                    }
                    None if attempts >= ctx.settings.map_key_retries => {
                        self.key_exhausted(id)?;
                        break;
                    }
                    None => attempts += 1,
                }
            }
        }
        Ok(Value::Map(entries))
    }

    /// One entry, or `None` when the drawn key is already present.
    fn generate_entry(
        &mut self,
        key: NodeId,
        value: NodeId,
        index: u64,
        entries: &[(Value, Value)],
    ) -> Result<Option<(Value, Value)>, FixtureError> {
        let key = self.generate(key, index)?;
        if contains_key(entries, &key) {
            return Ok(None);
        }
        let value = self.generate(value, index)?;
        Ok(Some((key, value)))
    }

    fn generate_wrapper(&mut self, id: NodeId, index: u64) -> Result<Value, FixtureError> {
        let ctx = self.ctx;
        let Some(&inner) = ctx.tree.get(id).children().first() else {
            return Ok(Value::Null);
        };
        if is_terminal(ctx.tree.get(inner).kind()) {
            return Ok(Value::Null);
        }
        if ctx.settings.wrapper_nullable && self.rng.random_bool(ctx.settings.null_probability) {
            return Ok(Value::Null);
        }
        self.generate(inner, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::Assign;
    use crate::nodes::NodeBuilder;
    use crate::select::{Selector, SelectorGroup};
    use crate::strategy::Generator;
    use rand::SeedableRng;

    const TYPES: &str = r#"
types:
  - name: Root
    shape:
      type: record
      fields:
        - name: late
          type: String
        - name: early
          type: String
        - name: items
          type: Vec<i32>
"#;

    fn run(
        root: &str,
        bindings: Vec<(SelectorGroup, Generator)>,
        rules: Vec<Assignment>,
        settings: Settings,
    ) -> Result<Value, FixtureError> {
        let catalog = TypeCatalog::from_yaml(TYPES).unwrap();
        let tree = NodeBuilder::new(&catalog, &settings)
            .build(&TypeRef::parse(root).unwrap())
            .unwrap();
        let strategies = StrategyTable::build(&tree, &bindings, &[]);
        let plan = AssignmentPlan::build(&tree, &rules)?;
        let registry = GeneratorRegistry::new();
        let setters = Setters::new();
        let ctx = Context {
            tree: &tree,
            catalog: &catalog,
            settings: &settings,
            registry: &registry,
            strategies: &strategies,
            plan: &plan,
            rules: &rules,
            setters: &setters,
        };
        Engine::new(ctx, StdRng::seed_from_u64(42)).populate(0)
    }

    #[test]
    fn test_blocked_member_waits_for_origin() {
        let rules = vec![Assign::value_of(Selector::field("Root", "early"))
            .to(Selector::field("Root", "late"))];
        let value = run("Root", Vec::new(), rules, Settings::default()).unwrap();
        let fields = value.as_object().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["late", "early", "items"]);
        assert_eq!(fields["late"], fields["early"]);
    }

    #[test]
    fn test_size_hint_controls_sequence() {
        let bindings: Vec<(SelectorGroup, Generator)> = vec![(
            Selector::field("Root", "items").into(),
            Generator::size(3, 3),
        )];
        let value = run("Root", bindings, Vec::new(), Settings::default()).unwrap();
        assert_eq!(value.get("items").unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_collection_range() {
        let settings = Settings {
            collection_min_size: 0,
            collection_max_size: 0,
            ..Settings::default()
        };
        let value = run("Map<String, Vec<i32>>", Vec::new(), Vec::new(), settings).unwrap();
        assert_eq!(value, Value::Map(Vec::new()));
    }

    #[test]
    fn test_wrapper_nullable() {
        let settings = Settings {
            wrapper_nullable: true,
            null_probability: 1.0,
            ..Settings::default()
        };
        let value = run("Option<i32>", Vec::new(), Vec::new(), settings).unwrap();
        assert_eq!(value, Value::Null);

        let value = run("Option<i32>", Vec::new(), Vec::new(), Settings::default()).unwrap();
        assert!(matches!(value, Value::Int(_)));
    }

    #[test]
    fn test_same_seed_same_value() {
        let first = run("Root", Vec::new(), Vec::new(), Settings::default()).unwrap();
        let second = run("Root", Vec::new(), Vec::new(), Settings::default()).unwrap();
        assert_eq!(first, second);
    }
}
