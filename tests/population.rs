//! Collection sizing, map key uniqueness, setters, plugins and model files.

use fixture_core::{FixtureModel, KeyExhaustion, Settings, TypeCatalog, Value};
use fixture_generator::GeneratorRegistry;
use fixturegen::{Fixture, FixtureError, Generator, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

const TYPES: &str = r#"
types:
  - name: Inventory
    shape:
      type: record
      fields:
        - name: stock
          type: Map<String, i32>
        - name: flags
          type: Map<bool, String>
        - name: codes
          type: Set<u8>
  - name: Account
    shape:
      type: record
      fields:
        - name: owner
          type: String
        - name: balance
          type: i64
          setter: set_balance
  - name: Link
    shape:
      type: record
      fields:
        - name: url
          type: Url
        - name: color
          type: Color
  - name: Url
    shape:
      type: opaque
  - name: Color
    shape:
      type: enum
      variants: [Red, Green, Blue]
"#;

fn catalog() -> TypeCatalog {
    TypeCatalog::from_yaml(TYPES).unwrap()
}

fn entries(value: &Value) -> &Vec<(Value, Value)> {
    value.as_map().unwrap()
}

#[test]
fn test_map_has_exactly_n_distinct_keys() {
    let catalog = catalog();
    let inventories = Fixture::of(&catalog, "Inventory")
        .unwrap()
        .generate(Selector::field("Inventory", "stock"), Generator::size(8, 8))
        .with_seed(42)
        .create_list(20)
        .unwrap();
    for inventory in &inventories {
        let stock = entries(inventory.get("stock").unwrap());
        assert_eq!(stock.len(), 8);
        let keys: HashSet<String> = stock.iter().map(|(key, _)| key.to_string()).collect();
        assert_eq!(keys.len(), 8);
    }
}

#[test]
fn test_exhausted_key_space_drops_entries() {
    let catalog = catalog();
    let inventory = Fixture::of(&catalog, "Inventory")
        .unwrap()
        .generate(Selector::field("Inventory", "flags"), Generator::size(5, 5))
        .with_seed(42)
        .create()
        .unwrap();
    let flags = entries(inventory.get("flags").unwrap());
    assert!(flags.len() <= 2);
    assert!(!flags.is_empty());
    if flags.len() == 2 {
        assert_ne!(flags[0].0, flags[1].0);
    }
}

#[test]
fn test_exhausted_key_space_can_fail() {
    let catalog = catalog();
    let settings = Settings {
        map_key_exhaustion: KeyExhaustion::Fail,
        map_key_retries: 3,
        ..Settings::default()
    };
    let result = Fixture::of(&catalog, "Inventory")
        .unwrap()
        .with_settings(settings)
        .generate(Selector::field("Inventory", "flags"), Generator::size(5, 5))
        .with_seed(42)
        .create();
    assert!(matches!(
        result,
        Err(FixtureError::KeySpaceExhausted { retries: 3, .. })
    ));
}

#[test]
fn test_set_elements_are_distinct() {
    let catalog = catalog();
    let inventory = Fixture::of(&catalog, "Inventory")
        .unwrap()
        .with_setting("integer.min", "1")
        .unwrap()
        .with_setting("integer.max", "50")
        .unwrap()
        .generate(Selector::field("Inventory", "codes"), Generator::size(10, 10))
        .with_seed(42)
        .create()
        .unwrap();
    let codes = inventory.get("codes").unwrap().as_array().unwrap();
    assert_eq!(codes.len(), 10);
    let distinct: HashSet<u64> = codes.iter().filter_map(Value::as_u64).collect();
    assert_eq!(distinct.len(), 10);
}

#[test]
fn test_collection_limit() {
    let catalog = catalog();
    let result = Fixture::of(&catalog, "Vec<i32>")
        .unwrap()
        .with_setting("collection.max.limit", "100")
        .unwrap()
        .generate(Selector::root(), Generator::size(10, 1000))
        .create();
    assert!(matches!(
        result,
        Err(FixtureError::CollectionTooLarge { size: 1000, limit: 100, .. })
    ));
}

fn double_balance(fields: &mut fixture_core::Fields, value: Value) -> Result<(), String> {
    let amount = value.as_i64().ok_or("balance must be an integer")?;
    fields.insert("balance".to_string(), Value::Int(amount * 2));
    Ok(())
}

fn method_settings(on_error: &str) -> Settings {
    let mut settings = Settings::default();
    settings.apply("assignment.type", "method").unwrap();
    settings.apply("on.setter.error", on_error).unwrap();
    settings
}

#[test]
fn test_setter_is_called_in_method_mode() {
    let catalog = catalog();
    let account = Fixture::of(&catalog, "Account")
        .unwrap()
        .with_settings(method_settings("fail"))
        .set(Selector::field("Account", "balance"), 21i64)
        .with_setter("Account", "set_balance", double_balance)
        .create()
        .unwrap();
    assert_eq!(account.get("balance"), Some(&Value::Int(42)));
}

#[test]
fn test_field_mode_bypasses_setter() {
    let catalog = catalog();
    let account = Fixture::of(&catalog, "Account")
        .unwrap()
        .set(Selector::field("Account", "balance"), 21i64)
        .with_setter("Account", "set_balance", double_balance)
        .create()
        .unwrap();
    assert_eq!(account.get("balance"), Some(&Value::Int(21)));
}

#[test]
fn test_setter_failure_policies() {
    let catalog = catalog();
    let failing = |_: &mut fixture_core::Fields, _: Value| -> Result<(), String> {
        Err("rejected".to_string())
    };
    let fixture = |on_error: &str| {
        Fixture::of(&catalog, "Account")
            .unwrap()
            .with_settings(method_settings(on_error))
            .set(Selector::field("Account", "balance"), 7i64)
            .with_setter("Account", "set_balance", failing)
    };

    let account = fixture("assign_field").create().unwrap();
    assert_eq!(account.get("balance"), Some(&Value::Int(7)));

    let account = fixture("ignore").create().unwrap();
    assert_eq!(account.get("balance"), Some(&Value::Null));

    match fixture("fail").create() {
        Err(FixtureError::SetterInvocation { setter, message, .. }) => {
            assert_eq!(setter, "set_balance");
            assert_eq!(message, "rejected");
        }
        other => panic!("expected setter error, got {other:?}"),
    }
}

#[test]
fn test_missing_setter_falls_back_to_field() {
    let catalog = catalog();
    let account = Fixture::of(&catalog, "Account")
        .unwrap()
        .with_settings(method_settings("assign_field"))
        .set(Selector::field("Account", "balance"), 3i64)
        .create()
        .unwrap();
    assert_eq!(account.get("balance"), Some(&Value::Int(3)));
}

#[test]
fn test_opaque_type_needs_plugin() {
    let catalog = catalog();
    let result = Fixture::of(&catalog, "Link").unwrap().create();
    match result {
        Err(FixtureError::UnsupportedType { type_name, path }) => {
            assert_eq!(type_name, "Url");
            assert_eq!(path, "Link.url");
        }
        other => panic!("expected unsupported type, got {other:?}"),
    }

    let registry = GeneratorRegistry::new().with("Url", |_: &mut rand::rngs::StdRng| {
        Value::from("https://example.com")
    });
    let link = Fixture::of(&catalog, "Link")
        .unwrap()
        .with_registry(Arc::new(registry))
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(link.get("url"), Some(&Value::from("https://example.com")));
    let color = link.get("color").unwrap().as_str().unwrap();
    assert!(["Red", "Green", "Blue"].contains(&color));
}

#[test]
fn test_supplier_uses_seeded_stream() {
    use rand::Rng;

    let catalog = catalog();
    let fixture = Fixture::of(&catalog, "Vec<i64>")
        .unwrap()
        .supply(Selector::all("i64"), |rng| Value::Int(rng.random_range(-5..=5)))
        .with_seed(42);
    let first = fixture.create().unwrap();
    assert_eq!(first, fixture.create().unwrap());
    for item in first.as_array().unwrap() {
        assert!((-5..=5).contains(&item.as_i64().unwrap()));
    }
}

#[derive(Debug, Deserialize)]
struct Account {
    owner: String,
    balance: i64,
}

#[test]
fn test_create_as_typed_struct() {
    let catalog = catalog();
    let account: Account = Fixture::of(&catalog, "Account")
        .unwrap()
        .set(Selector::field("Account", "owner"), "Grace")
        .with_seed(42)
        .create_as()
        .unwrap();
    assert_eq!(account.owner, "Grace");
    assert!((1..=10_000).contains(&account.balance));
}

#[test]
fn test_model_file_round_trip() {
    use std::io::Write;

    let yaml = r#"
root: Map<String, Order>
settings:
  collection_min_size: 3
  collection_max_size: 3
  seed: 42
types:
  - name: Order
    shape:
      type: record
      fields:
        - name: id
          type: Uuid
        - name: status
          type: String
        - name: note
          type: Option<String>
overrides:
  - select: { field: Order.status }
    generator: { type: one_of, values: [OPEN, CLOSED] }
  - select: { field: Order.note }
    ignore: true
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let model = FixtureModel::from_file(file.path()).unwrap();
    let catalog = model.catalog().unwrap();
    let orders = Fixture::from_model(&catalog, &model).unwrap().create().unwrap();
    let orders = entries(&orders);
    assert_eq!(orders.len(), 3);
    for (_, order) in orders {
        assert!(matches!(order.get("id"), Some(Value::Uuid(_))));
        let status = order.get("status").unwrap().as_str().unwrap();
        assert!(status == "OPEN" || status == "CLOSED");
        assert_eq!(order.get("note"), Some(&Value::Null));
    }
}

#[test]
fn test_model_rejects_conflicting_override() {
    let model = FixtureModel::from_yaml(
        r#"
root: Vec<i32>
overrides:
  - select: { root: true }
    value: [1]
    size: { min: 1, max: 1 }
"#,
    )
    .unwrap();
    let catalog = model.catalog().unwrap();
    assert!(matches!(
        Fixture::from_model(&catalog, &model),
        Err(FixtureError::InvalidModel(_))
    ));
}

#[test]
fn test_unsampleable_float_range_is_an_error() {
    let catalog = catalog();
    let settings = Settings {
        float_min: -1e308,
        float_max: 1e308,
        ..Settings::default()
    };
    let result = Fixture::of(&catalog, "Vec<f64>")
        .unwrap()
        .with_settings(settings)
        .create();
    assert!(matches!(result, Err(FixtureError::Settings(_))));

    let fixture = Fixture::of(&catalog, "f64").unwrap();
    assert!(fixture.clone().with_setting("float.min", "-inf").is_err());
    assert!(fixture
        .with_setting("float.min", "-1e308")
        .unwrap()
        .with_setting("float.max", "1e308")
        .is_err());
}

struct OptionalUrl;

impl fixture_generator::LeafGenerator for OptionalUrl {
    fn produce(&self, _rng: &mut rand::rngs::StdRng) -> Value {
        Value::from("https://example.com")
    }

    fn nullable(&self) -> bool {
        true
    }
}

#[test]
fn test_nullable_plugin_honours_null_probability() {
    let catalog = catalog();
    let registry = Arc::new(GeneratorRegistry::new().with("Url", OptionalUrl));

    let link = Fixture::of(&catalog, "Link")
        .unwrap()
        .with_registry(registry.clone())
        .with_setting("null.probability", "1.0")
        .unwrap()
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(link.get("url"), Some(&Value::Null));
    assert!(link.get("color").unwrap().as_str().is_some());

    let link = Fixture::of(&catalog, "Link")
        .unwrap()
        .with_registry(registry)
        .with_setting("null.probability", "0.0")
        .unwrap()
        .with_seed(42)
        .create()
        .unwrap();
    assert_eq!(link.get("url"), Some(&Value::from("https://example.com")));
}
