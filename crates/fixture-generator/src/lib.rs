//! Leaf value generators for fixturegen.
//!
//! This crate produces the values at the leaves of a fixture: numbers,
//! strings, UUIDs, dates and whatever plug-ins a caller registers. All
//! generation goes through a caller-supplied `StdRng`, so a fixed seed
//! reproduces every value.
//!
//! # Architecture
//!
//! ```text
//! LeafType / GeneratorSpec
//!        │
//!        ▼
//! ┌────────────────────┐
//! │ GeneratorRegistry  │
//! │                    │
//! │  - plug-ins by name│
//! │  - built-in leaves │
//! └─────────┬──────────┘
//!           │
//!           ▼
//!         Value
//! ```
//!
//! # Example
//!
//! ```rust
//! use fixture_core::{LeafType, Settings, Value};
//! use fixture_generator::GeneratorRegistry;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let registry = GeneratorRegistry::new()
//!     .with("Url", |_: &mut StdRng| Value::from("https://example.com"));
//! let mut rng = StdRng::seed_from_u64(42);
//!
//! let age = registry.generate_leaf(LeafType::I32, &mut rng, &Settings::default());
//! assert!(age.as_i64().is_some());
//! assert_eq!(
//!     registry.generate_named("Url", &mut rng),
//!     Some(Value::from("https://example.com"))
//! );
//! ```
//!
//! # Generators
//!
//! The following declarative generator types are supported:
//!
//! - `uuid_v4` - Random UUID v4
//! - `sequential` - Sequential integers
//! - `pattern` - Pattern strings with placeholders (`{index}`, `{uuid}`, `{rand:N}`)
//! - `int_range` - Random integers in a range
//! - `float_range` - Random floats in a range
//! - `text` - Random uppercase strings
//! - `timestamp_range` - Random timestamps in a date range
//! - `weighted_bool` - Boolean with configurable true probability
//! - `one_of` - Random selection from a list
//! - `static` - Static value
//! - `null` - Null value

pub mod generators;
pub mod registry;

// Re-exports for convenience
pub use generators::generate_value;
pub use registry::{GeneratorError, GeneratorRegistry, LeafGenerator};
