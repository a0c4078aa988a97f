//! The `Fixture` builder: declare overrides, then create values.

use crate::assign::{Assignment, AssignmentPlan};
use crate::engine::{Context, Engine};
use crate::error::FixtureError;
use crate::nodes::{NodeBuilder, NodeTree};
use crate::select::{unmatched, Selector, SelectorGroup};
use crate::setters::Setters;
use crate::strategy::{Generator, StrategyTable};
use fixture_core::{Fields, FixtureModel, Settings, TypeCatalog, TypeRef, Value};
use fixture_generator::generators::static_value::yaml_to_value;
use fixture_generator::GeneratorRegistry;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Generates values of one root type.
///
/// A fixture only borrows its catalog; each `create*` call builds its own
/// node tree, plan and random stream, so one fixture can be used from
/// several threads at once.
#[derive(Clone)]
pub struct Fixture<'a> {
    catalog: &'a TypeCatalog,
    root: TypeRef,
    settings: Settings,
    registry: Arc<GeneratorRegistry>,
    bindings: Vec<(SelectorGroup, Generator)>,
    ignored: Vec<SelectorGroup>,
    nullable: Vec<SelectorGroup>,
    assignments: Vec<Assignment>,
    setters: Setters,
}

impl<'a> Fixture<'a> {
    /// Fixture for a root written as a type descriptor, e.g. `Pair<String, i32>`.
    pub fn of(catalog: &'a TypeCatalog, root: &str) -> Result<Self, FixtureError> {
        Ok(Self::new(catalog, TypeRef::parse(root)?))
    }

    pub fn new(catalog: &'a TypeCatalog, root: TypeRef) -> Self {
        Self {
            catalog,
            root,
            settings: Settings::default(),
            registry: Arc::new(GeneratorRegistry::new()),
            bindings: Vec::new(),
            ignored: Vec::new(),
            nullable: Vec::new(),
            assignments: Vec::new(),
            setters: Setters::new(),
        }
    }

    /// Build a fixture from a model file. `catalog` must hold the model's types.
    pub fn from_model(catalog: &'a TypeCatalog, model: &FixtureModel) -> Result<Self, FixtureError> {
        let mut fixture = Self::new(catalog, model.root.clone()).with_settings(model.settings.clone());
        for def in &model.overrides {
            let selector = SelectorGroup::from(Selector::from_def(&def.select)?);
            let generator = match (&def.value, &def.generator, def.size) {
                (Some(value), None, None) => Some(Generator::Value(yaml_to_value(value))),
                (None, Some(spec), None) => Some(Generator::Spec(spec.clone())),
                (None, None, Some(size)) => Some(Generator::size(size.min, size.max)),
                (None, None, None) => None,
                _ => {
                    return Err(FixtureError::InvalidModel(format!(
                        "override for {selector} sets more than one of 'value', 'generator' and 'size'"
                    )))
                }
            };
            if generator.is_none() && !def.ignore && !def.nullable {
                return Err(FixtureError::InvalidModel(format!(
                    "override for {selector} has no effect"
                )));
            }
            if def.ignore {
                fixture = fixture.ignore(selector.clone());
            }
            if def.nullable {
                fixture = fixture.with_nullable(selector.clone());
            }
            if let Some(generator) = generator {
                fixture = fixture.generate(selector, generator);
            }
        }
        for def in &model.assign {
            fixture = fixture.assign(Assignment::from_def(def)?);
        }
        Ok(fixture)
    }

    /// Use a fixed value for matched nodes.
    pub fn set(self, selector: impl Into<SelectorGroup>, value: impl Into<Value>) -> Self {
        self.generate(selector, Generator::Value(value.into()))
    }

    /// Produce matched values with a function of the random stream.
    pub fn supply<F>(self, selector: impl Into<SelectorGroup>, supplier: F) -> Self
    where
        F: Fn(&mut StdRng) -> Value + Send + Sync + 'static,
    {
        self.generate(selector, Generator::supply(supplier))
    }

    /// Bind a generator to matched nodes. Later bindings win over earlier ones.
    pub fn generate(mut self, selector: impl Into<SelectorGroup>, generator: impl Into<Generator>) -> Self {
        self.bindings.push((selector.into(), generator.into()));
        self
    }

    /// Leave matched nodes unpopulated.
    pub fn ignore(mut self, selector: impl Into<SelectorGroup>) -> Self {
        self.ignored.push(selector.into());
        self
    }

    /// Allow matched nodes to be generated as null.
    pub fn with_nullable(mut self, selector: impl Into<SelectorGroup>) -> Self {
        self.nullable.push(selector.into());
        self
    }

    pub fn assign(mut self, rule: Assignment) -> Self {
        self.assignments.push(rule);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Set one setting by key, e.g. `("collection.max.size", "3")`.
    pub fn with_setting(mut self, key: &str, value: &str) -> Result<Self, FixtureError> {
        self.settings.apply(key, value)?;
        Ok(self)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.settings.seed = Some(seed);
        self
    }

    /// Report unmatched selectors as warnings instead of failing.
    pub fn lenient(mut self) -> Self {
        self.settings.strict = false;
        self
    }

    pub fn with_registry(mut self, registry: Arc<GeneratorRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Register the setter used for members declaring `setter` when the
    /// assignment type is `method`.
    pub fn with_setter<F>(mut self, owner: &str, setter: &str, function: F) -> Self
    where
        F: Fn(&mut Fields, Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.setters.register(owner, setter, function);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn root(&self) -> &TypeRef {
        &self.root
    }

    /// Build the node tree without generating anything.
    pub fn tree(&self) -> Result<NodeTree, FixtureError> {
        NodeBuilder::new(self.catalog, &self.settings)
            .with_ignored(&self.ignored)
            .build(&self.root)
    }

    pub fn create(&self) -> Result<Value, FixtureError> {
        self.run(|engine| engine.populate(0))
    }

    /// Generate `count` roots from one tree and one random stream.
    pub fn create_list(&self, count: usize) -> Result<Vec<Value>, FixtureError> {
        self.run(|engine| (0..count as u64).map(|index| engine.populate(index)).collect())
    }

    /// Generate a value and deserialize it into `T`.
    pub fn create_as<T: DeserializeOwned>(&self) -> Result<T, FixtureError> {
        let value = self.create()?;
        Ok(serde_json::from_value(value.to_json())?)
    }

    fn run<T>(
        &self,
        generate: impl FnOnce(&mut Engine<'_>) -> Result<T, FixtureError>,
    ) -> Result<T, FixtureError> {
        self.settings.validate()?;
        let tree = self.tree()?;
        self.check_selectors(&tree)?;
        let strategies = StrategyTable::build(&tree, &self.bindings, &self.nullable);
        let plan = AssignmentPlan::build(&tree, &self.assignments)?;

        let seed = self.settings.seed.unwrap_or_else(rand::random);
        debug!("Generating {} with seed {}", self.root, seed);

        let ctx = Context {
            tree: &tree,
            catalog: self.catalog,
            settings: &self.settings,
            registry: &self.registry,
            strategies: &strategies,
            plan: &plan,
            rules: &self.assignments,
            setters: &self.setters,
        };
        let mut engine = Engine::new(ctx, StdRng::seed_from_u64(seed));
        generate(&mut engine)
    }

    fn check_selectors(&self, tree: &NodeTree) -> Result<(), FixtureError> {
        let groups = self
            .bindings
            .iter()
            .map(|(group, _)| group)
            .chain(&self.ignored)
            .chain(&self.nullable)
            .chain(self.assignments.iter().flat_map(|rule| rule.selectors()));
        let missing = unmatched(tree, groups);
        if missing.is_empty() {
            return Ok(());
        }
        if self.settings.strict {
            return Err(FixtureError::UnmatchedSelector { selectors: missing });
        }
        warn!("Selectors matched no nodes: {}", missing.join(", "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::Assign;
    use crate::nodes::NodeKind;
    use fixture_core::GeneratorSpec;
    use serde::Deserialize;

    const TYPES: &str = r#"
types:
  - name: Person
    shape:
      type: record
      fields:
        - name: name
          type: String
        - name: age
          type: u8
        - name: tags
          type: Vec<String>
        - name: nickname
          type: Option<String>
"#;

    #[derive(Debug, Deserialize)]
    struct Person {
        name: String,
        age: u8,
        tags: Vec<String>,
        nickname: Option<String>,
    }

    fn catalog() -> TypeCatalog {
        TypeCatalog::from_yaml(TYPES).unwrap()
    }

    #[test]
    fn test_create_populates_every_member() {
        let catalog = catalog();
        let person = Fixture::of(&catalog, "Person").unwrap().with_seed(42).create().unwrap();
        let fields = person.as_object().unwrap();
        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["name", "age", "tags", "nickname"]
        );
        assert!(fields["name"].as_str().is_some());
        let tags = fields["tags"].as_array().unwrap();
        assert!((2..=6).contains(&tags.len()));
        assert!(fields["nickname"].as_str().is_some());
    }

    #[test]
    fn test_same_seed_same_value() {
        let catalog = catalog();
        let fixture = Fixture::of(&catalog, "Person").unwrap().with_seed(42);
        assert_eq!(fixture.create().unwrap(), fixture.create().unwrap());
        assert_eq!(fixture.create_list(3).unwrap().len(), 3);
    }

    #[test]
    fn test_create_as() {
        let catalog = catalog();
        let person: Person = Fixture::of(&catalog, "Person")
            .unwrap()
            .set(Selector::field("Person", "name"), "Ada")
            .generate(
                Selector::field("Person", "age"),
                GeneratorSpec::IntRange { min: 30, max: 40 },
            )
            .generate(Selector::field("Person", "tags"), Generator::size(1, 1))
            .with_seed(42)
            .create_as()
            .unwrap();
        assert_eq!(person.name, "Ada");
        assert!((30..=40).contains(&person.age));
        assert_eq!(person.tags.len(), 1);
        assert!(person.nickname.is_some());
    }

    #[test]
    fn test_with_setting() {
        let catalog = catalog();
        let fixture = Fixture::of(&catalog, "Person")
            .unwrap()
            .with_setting("collection.max.size", "2")
            .unwrap();
        assert_eq!(fixture.settings().collection_max_size, 2);
        assert!(Fixture::of(&catalog, "Person")
            .unwrap()
            .with_setting("no.such.key", "1")
            .is_err());
    }

    #[test]
    fn test_tree_honours_ignore() {
        let catalog = catalog();
        let tree = Fixture::of(&catalog, "Person")
            .unwrap()
            .ignore(Selector::field("Person", "tags"))
            .tree()
            .unwrap();
        assert_eq!(
            tree.find_field("Person", "tags").unwrap().kind(),
            NodeKind::Ignored
        );
    }

    #[test]
    fn test_from_model() {
        let model = FixtureModel::from_yaml(
            r#"
root: Vec<Person>
settings:
  collection_min_size: 4
  collection_max_size: 4
  seed: 7
types:
  - name: Person
    shape:
      type: record
      fields:
        - name: name
          type: String
        - name: status
          type: String
        - name: note
          type: String
overrides:
  - select: { field: Person.status }
    generator: { type: one_of, values: [OPEN, CLOSED] }
  - select: { field: Person.name }
    value: fixed
assign:
  - given: { field: Person.status }
    is: CLOSED
    set:
      - select: { field: Person.note }
        value: archived
"#,
        )
        .unwrap();
        let catalog = model.catalog().unwrap();
        let people = Fixture::from_model(&catalog, &model).unwrap().create().unwrap();
        let people = people.as_array().unwrap();
        assert_eq!(people.len(), 4);
        for person in people {
            assert_eq!(person.get("name"), Some(&Value::from("fixed")));
            if person.get("status") == Some(&Value::from("CLOSED")) {
                assert_eq!(person.get("note"), Some(&Value::from("archived")));
            }
        }
    }

    #[test]
    fn test_assign_rule_in_builder() {
        let catalog = catalog();
        let person = Fixture::of(&catalog, "Person")
            .unwrap()
            .set(Selector::field("Person", "name"), "Ada")
            .assign(
                Assign::value_of(Selector::field("Person", "name"))
                    .to(Selector::field("Person", "nickname")),
            )
            .with_seed(42)
            .create()
            .unwrap();
        assert_eq!(person.get("nickname"), Some(&Value::from("Ada")));
    }
}
