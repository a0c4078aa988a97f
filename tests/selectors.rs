//! Selector scoping, precedence and strict-mode reporting.

use fixture_core::{GeneratorSpec, TypeCatalog, Value};
use fixturegen::{Fixture, FixtureError, Generator, Scope, Selector, SelectorGroup};

const TYPES: &str = r#"
types:
  - name: Person
    shape:
      type: record
      fields:
        - name: name
          type: String
        - name: home
          type: Address
        - name: work
          type: Address
        - name: aliases
          type: Vec<String>
  - name: Address
    shape:
      type: record
      fields:
        - name: city
          type: String
        - name: zip
          type: String
"#;

fn catalog() -> TypeCatalog {
    TypeCatalog::from_yaml(TYPES).unwrap()
}

fn city(person: &Value, member: &str) -> Value {
    person.get(member).unwrap().get("city").unwrap().clone()
}

#[test]
fn test_disjoint_scopes_are_independent() {
    let catalog = catalog();
    let person = Fixture::of(&catalog, "Person")
        .unwrap()
        .set(
            Selector::field("Address", "city").within(Scope::field("Person", "home")),
            "Lyon",
        )
        .set(
            Selector::field("Address", "city").within(Scope::field("Person", "work")),
            "Paris",
        )
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(city(&person, "home"), Value::from("Lyon"));
    assert_eq!(city(&person, "work"), Value::from("Paris"));
}

#[test]
fn test_overlapping_scopes_last_declared_wins() {
    let catalog = catalog();
    let person = Fixture::of(&catalog, "Person")
        .unwrap()
        .set(
            Selector::field("Address", "city").within(Scope::ty("Person")),
            "first",
        )
        .set(
            Selector::field("Address", "city").within(Scope::field("Person", "home")),
            "second",
        )
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(city(&person, "home"), Value::from("second"));
    assert_eq!(city(&person, "work"), Value::from("first"));
}

#[test]
fn test_unscoped_declared_later_still_loses_to_scoped() {
    let catalog = catalog();
    let person = Fixture::of(&catalog, "Person")
        .unwrap()
        .set(
            Selector::field("Address", "city").within(Scope::field("Person", "home")),
            "scoped",
        )
        .set(Selector::field("Address", "city"), "plain")
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(city(&person, "home"), Value::from("scoped"));
    assert_eq!(city(&person, "work"), Value::from("plain"));
}

#[test]
fn test_unscoped_last_declared_wins() {
    let catalog = catalog();
    let person = Fixture::of(&catalog, "Person")
        .unwrap()
        .set(Selector::all("String"), "any")
        .set(Selector::field("Person", "name"), "Ada")
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(person.get("name"), Some(&Value::from("Ada")));
    assert_eq!(city(&person, "work"), Value::from("any"));
    let aliases = person.get("aliases").unwrap().as_array().unwrap();
    assert!(aliases.iter().all(|alias| alias == &Value::from("any")));
}

#[test]
fn test_union_and_exclusion() {
    let catalog = catalog();
    let person = Fixture::of(&catalog, "Person")
        .unwrap()
        .set(
            SelectorGroup::from(Selector::all("String")).except(Selector::field("Address", "zip")),
            "x",
        )
        .with_seed(42)
        .create()
        .unwrap();
    let home = person.get("home").unwrap();
    assert_eq!(home.get("city"), Some(&Value::from("x")));
    assert_ne!(home.get("zip"), Some(&Value::from("x")));

    let person = Fixture::of(&catalog, "Person")
        .unwrap()
        .set(
            Selector::field("Person", "name").or(Selector::field("Address", "zip")),
            "y",
        )
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(person.get("name"), Some(&Value::from("y")));
    assert_eq!(person.get("work").unwrap().get("zip"), Some(&Value::from("y")));
}

#[test]
fn test_depth_and_predicate_selectors() {
    let catalog = catalog();
    let person = Fixture::of(&catalog, "Person")
        .unwrap()
        .set(Selector::all("String").at_depth(1), "top")
        .set(
            Selector::matching("zip codes", |node| {
                node.member().is_some_and(|member| member.name == "zip")
            }),
            "00000",
        )
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(person.get("name"), Some(&Value::from("top")));
    assert_ne!(city(&person, "home"), Value::from("top"));
    assert_eq!(person.get("home").unwrap().get("zip"), Some(&Value::from("00000")));
}

#[test]
fn test_root_selector() {
    let catalog = catalog();
    let names = Fixture::of(&catalog, "Vec<String>")
        .unwrap()
        .generate(Selector::root(), Generator::size(4, 4))
        .generate(Selector::all("String"), GeneratorSpec::Pattern {
            pattern: "name-{index}".to_string(),
        })
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(
        names,
        Value::from(vec!["name-0", "name-1", "name-2", "name-3"])
    );
}

#[test]
fn test_strict_mode_rejects_unmatched_selector() {
    let catalog = catalog();
    let result = Fixture::of(&catalog, "Person")
        .unwrap()
        .set(Selector::all("Invoice"), "never")
        .create();
    match result {
        Err(FixtureError::UnmatchedSelector { selectors }) => {
            assert_eq!(selectors, vec!["all(Invoice)".to_string()]);
        }
        other => panic!("expected unmatched selector error, got {other:?}"),
    }
}

#[test]
fn test_lenient_mode_ignores_unmatched_selector() {
    let catalog = catalog();
    let person = Fixture::of(&catalog, "Person")
        .unwrap()
        .set(Selector::all("Invoice"), "never")
        .lenient()
        .with_seed(42)
        .create()
        .unwrap();
    assert!(person.get("name").unwrap().as_str().is_some());
}

#[test]
fn test_nullable_selector() {
    let catalog = catalog();
    let person = Fixture::of(&catalog, "Person")
        .unwrap()
        .with_nullable(Selector::field("Person", "name"))
        .with_setting("null.probability", "1.0")
        .unwrap()
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(person.get("name"), Some(&Value::Null));
    assert!(person.get("home").unwrap().get("city").unwrap().as_str().is_some());
}
