//! Setter functions used when members are written by method.

use fixture_core::{Fields, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Writes a value into an object under construction.
///
/// An `Err` carries the failure message and is handled according to the
/// `on.setter.error` policy.
pub type SetterFn = Arc<dyn Fn(&mut Fields, Value) -> Result<(), String> + Send + Sync>;

/// Setters keyed by `(owner type, setter name)`.
#[derive(Clone, Default)]
pub struct Setters {
    table: HashMap<(String, String), SetterFn>,
}

impl Setters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, owner: impl Into<String>, setter: impl Into<String>, function: F)
    where
        F: Fn(&mut Fields, Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.table
            .insert((owner.into(), setter.into()), Arc::new(function));
    }

    pub fn get(&self, owner: &str, setter: &str) -> Option<&SetterFn> {
        self.table.get(&(owner.to_string(), setter.to_string()))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl fmt::Debug for Setters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .table
            .keys()
            .map(|(owner, setter)| format!("{owner}::{setter}"))
            .collect();
        names.sort();
        f.debug_struct("Setters").field("table", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_invoke() {
        let mut setters = Setters::new();
        setters.register("Person", "set_name", |fields: &mut Fields, value: Value| {
            let name = value.as_str().ok_or("name must be a string")?.to_uppercase();
            fields.insert("name".to_string(), Value::String(name));
            Ok(())
        });
        assert_eq!(setters.len(), 1);

        let setter = setters.get("Person", "set_name").unwrap();
        let mut fields = Fields::new();
        setter(&mut fields, Value::from("ada")).unwrap();
        assert_eq!(fields["name"], Value::from("ADA"));
        assert_eq!(
            setter(&mut fields, Value::Int(1)),
            Err("name must be a string".to_string())
        );
        assert!(setters.get("Person", "set_age").is_none());
    }
}
