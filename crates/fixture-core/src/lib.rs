//! Core types for the fixturegen framework.
//!
//! This crate provides the foundational types used across fixture
//! generation, including:
//!
//! - [`TypeRef`] - Reified type descriptors (leaves, containers, generic user types)
//! - [`TypeCatalog`] - User type definitions, loaded from YAML or built in code
//! - [`Value`] - Generated in-memory instances
//! - [`Settings`] - Immutable generation settings with recognized [`Keys`]
//! - [`FixtureModel`] - Complete fixture definitions loaded from YAML
//!
//! # Architecture
//!
//! ```text
//! fixture-core (this crate)
//!    │
//!    ├─── fixture-generator   (leaf value generators, depends on fixture-core)
//!    │
//!    └─── fixturegen          (node tree, selectors, assignment, population)
//! ```
//!
//! # Example
//!
//! ```rust
//! use fixture_core::{TypeCatalog, TypeRef};
//!
//! let catalog = TypeCatalog::from_yaml(r#"
//! types:
//!   - name: Pair
//!     params: [L, R]
//!     shape:
//!       type: record
//!       fields:
//!         - name: left
//!           type: L
//!         - name: right
//!           type: R
//! "#).unwrap();
//!
//! let root = TypeRef::parse("Pair<String, Vec<i32>>").unwrap();
//! assert_eq!(root.raw_name(), "Pair");
//! assert!(catalog.contains("Pair"));
//! ```

pub mod catalog;
pub mod schema;
pub mod settings;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use catalog::{CatalogError, FieldDef, TypeCatalog, TypeDef, TypeShape};
pub use schema::{
    AssignDef, AssignTargetDef, FixtureModel, GeneratorSpec, OverrideDef, SchemaError,
    SelectorDef, SizeDef,
};
pub use settings::{AssignmentType, KeyExhaustion, Keys, OnSetterError, Settings, SettingsError};
pub use types::{LeafType, SeqKind, TypeBindings, TypeError, TypeRef};
pub use values::{Fields, Value};
