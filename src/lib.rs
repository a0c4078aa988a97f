//! fixturegen
//!
//! Populates instances of arbitrary, possibly generic and self-referential
//! types with random data for tests.
//!
//! A fixture runs in four stages:
//!
//! - [`resolve`] binds generic parameters and wildcards to concrete types
//! - [`nodes`] expands the root type into a tree, cutting recursive branches
//! - [`select`], [`strategy`] and [`assign`] decide what each node produces
//! - [`engine`] walks the tree and builds the value
//!
//! # Example
//!
//! ```rust
//! use fixturegen::{Assign, Fixture, Selector};
//! use fixture_core::{TypeCatalog, Value};
//!
//! let catalog = TypeCatalog::from_yaml(r#"
//! types:
//!   - name: Order
//!     shape:
//!       type: record
//!       fields:
//!         - name: status
//!           type: String
//!         - name: note
//!           type: String
//! "#).unwrap();
//!
//! let order = Fixture::of(&catalog, "Order").unwrap()
//!     .generate(Selector::field("Order", "status"), fixturegen::Generator::one_of(["OPEN", "CLOSED"]))
//!     .assign(
//!         Assign::given(Selector::field("Order", "status"))
//!             .is("CLOSED")
//!             .set(Selector::field("Order", "note"), "archived"),
//!     )
//!     .with_seed(42)
//!     .create()
//!     .unwrap();
//!
//! if order.get("status") == Some(&Value::from("CLOSED")) {
//!     assert_eq!(order.get("note"), Some(&Value::from("archived")));
//! }
//! ```

pub mod assign;
pub mod cli;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod nodes;
pub mod resolve;
pub mod select;
pub mod setters;
pub mod strategy;

pub use assign::{Assign, AssignmentPlan, Assignment, Condition};
pub use error::FixtureError;
pub use fixture::Fixture;
pub use nodes::{Node, NodeId, NodeKind, NodeTree};
pub use select::{Scope, Selector, SelectorGroup};
pub use strategy::{GenerationResult, Generator};

pub use fixture_core;
pub use fixture_generator;
