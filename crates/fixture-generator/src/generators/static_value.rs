//! Static value generator and YAML to Value conversion.

use fixture_core::{Fields, Value};
use serde_yaml::Value as YamlValue;

/// Convert a YAML value to a Value.
///
/// Mappings with string keys become objects; any other mapping becomes a
/// key-value `Map`.
pub fn yaml_to_value(yaml: &YamlValue) -> Value {
    match yaml {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(*b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        YamlValue::String(s) => Value::String(s.clone()),
        YamlValue::Sequence(arr) => Value::Array(arr.iter().map(yaml_to_value).collect()),
        YamlValue::Mapping(map) => {
            if map.keys().all(|k| k.is_string()) {
                let fields: Fields = map
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), yaml_to_value(v))))
                    .collect();
                Value::Object(fields)
            } else {
                Value::Map(
                    map.iter()
                        .map(|(k, v)| (yaml_to_value(k), yaml_to_value(v)))
                        .collect(),
                )
            }
        }
        YamlValue::Tagged(tagged) => yaml_to_value(&tagged.value),
    }
}
