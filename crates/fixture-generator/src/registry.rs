//! Leaf generator registry.
//!
//! Every leaf node is produced through a `GeneratorRegistry`. The built-in
//! leaves (`bool`, integers, floats, `String`, `Uuid`, dates) are always
//! available; plug-ins registered by type name add generators for opaque
//! user types or replace a built-in.

use crate::generators::{generate_value, numeric, temporal, text, uuid};
use fixture_core::{GeneratorSpec, LeafType, Settings, Value};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Error type for generator operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneratorError {
    /// Range bounds are reversed
    #[error("Invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: String, max: String },

    /// Timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Boolean weight outside `[0, 1]`
    #[error("Invalid weight {0}: must be between 0.0 and 1.0")]
    InvalidWeight(f64),

    /// `one_of` with nothing to choose from
    #[error("Cannot pick from an empty pool")]
    EmptyPool,
}

/// A generator for one leaf type.
///
/// Closures of the form `Fn(&mut StdRng) -> Value` implement this trait.
pub trait LeafGenerator: Send + Sync {
    /// Produce one value.
    fn produce(&self, rng: &mut StdRng) -> Value;

    /// Whether this generator may produce null on its own.
    fn nullable(&self) -> bool {
        false
    }
}

impl<F> LeafGenerator for F
where
    F: Fn(&mut StdRng) -> Value + Send + Sync,
{
    fn produce(&self, rng: &mut StdRng) -> Value {
        self(rng)
    }
}

/// Registry of leaf generators keyed by type name.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    plugins: HashMap<String, Arc<dyn LeafGenerator>>,
}

impl GeneratorRegistry {
    /// Create a registry holding only the built-in leaves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator for a type name, replacing any earlier one.
    pub fn register<G>(&mut self, type_name: impl Into<String>, generator: G)
    where
        G: LeafGenerator + 'static,
    {
        let type_name = type_name.into();
        if LeafType::from_name(&type_name).is_some() {
            debug!("Overriding built-in generator for {}", type_name);
        }
        self.plugins.insert(type_name, Arc::new(generator));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<G>(mut self, type_name: impl Into<String>, generator: G) -> Self
    where
        G: LeafGenerator + 'static,
    {
        self.register(type_name, generator);
        self
    }

    /// Check whether a plug-in is registered for a type name.
    pub fn contains(&self, type_name: &str) -> bool {
        self.plugins.contains_key(type_name)
    }

    /// Whether the plug-in registered for a type name declares itself nullable.
    pub fn is_nullable(&self, type_name: &str) -> bool {
        self.plugins.get(type_name).is_some_and(|g| g.nullable())
    }

    /// Run the plug-in registered for a type name, if any.
    pub fn generate_named(&self, type_name: &str, rng: &mut StdRng) -> Option<Value> {
        self.plugins.get(type_name).map(|g| g.produce(rng))
    }

    /// Generate a built-in leaf, honouring any plug-in registered under its name.
    pub fn generate_leaf(&self, leaf: LeafType, rng: &mut StdRng, settings: &Settings) -> Value {
        if let Some(value) = self.generate_named(leaf.name(), rng) {
            return value;
        }

        match leaf {
            LeafType::Bool => Value::Bool(rng.random_bool(0.5)),
            LeafType::Char => text::generate_char(rng),
            LeafType::F32 | LeafType::F64 => {
                numeric::generate_float(rng, leaf, settings.float_min, settings.float_max)
            }
            LeafType::String => text::generate_text(
                rng,
                settings.string_min_length,
                settings.string_max_length,
            ),
            LeafType::Uuid => uuid::generate_uuid_v4(rng),
            LeafType::Date => temporal::generate_date(rng),
            LeafType::Time => temporal::generate_time(rng),
            LeafType::DateTime => temporal::generate_datetime(rng),
            integer => {
                numeric::generate_integer(rng, integer, settings.integer_min, settings.integer_max)
            }
        }
    }

    /// Run a declarative generator.
    pub fn generate_spec(
        &self,
        spec: &GeneratorSpec,
        rng: &mut StdRng,
        index: u64,
    ) -> Result<Value, GeneratorError> {
        generate_value(spec, rng, index)
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("GeneratorRegistry")
            .field("plugins", &names)
            .finish()
    }
}
