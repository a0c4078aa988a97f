//! Declarative fixture models loaded from YAML.
//!
//! A `FixtureModel` bundles everything needed for one fixture: the type
//! definitions, the root type, settings, generator overrides and assignment
//! rules. It is what the `fixturegen` binary consumes.
//!
//! ```yaml
//! root: Vec<Order>
//! settings:
//!   collection_min_size: 3
//!   collection_max_size: 3
//! types:
//!   - name: Order
//!     shape:
//!       type: record
//!       fields:
//!         - name: status
//!           type: String
//!         - name: note
//!           type: String
//! overrides:
//!   - select: { field: Order.status }
//!     generator:
//!       type: one_of
//!       values: [OPEN, CLOSED]
//! assign:
//!   - given: { field: Order.status }
//!     is: CLOSED
//!     set:
//!       - select: { field: Order.note }
//!         value: archived
//! ```

use crate::catalog::{CatalogError, TypeCatalog, TypeDef};
use crate::settings::Settings;
use crate::types::TypeRef;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Error type for model operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading model file
    #[error("Failed to read model file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Type definitions are invalid
    #[error("Invalid type definitions: {0}")]
    Catalog(#[from] CatalogError),

    /// Settings are invalid
    #[error("Invalid settings: {0}")]
    Settings(#[from] crate::settings::SettingsError),
}

/// Declarative value generator configuration.
///
/// This enum defines the built-in value generators that can be bound to a
/// node from YAML or code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorSpec {
    /// Generate UUIDs (v4) from the seeded random source
    UuidV4,

    /// Generate sequential integers from the instance index
    Sequential {
        /// Starting value
        #[serde(default)]
        start: i64,
    },

    /// Generate strings from a pattern with placeholders
    Pattern {
        /// Pattern string (supports {index}, {uuid}, {rand:N})
        pattern: String,
    },

    /// Generate random integers in a range
    IntRange {
        /// Minimum value (inclusive)
        min: i64,
        /// Maximum value (inclusive)
        max: i64,
    },

    /// Generate random floats in a range
    FloatRange {
        /// Minimum value (inclusive)
        min: f64,
        /// Maximum value (inclusive)
        max: f64,
    },

    /// Generate random uppercase strings with a length in a range
    Text {
        /// Minimum length (inclusive)
        #[serde(default)]
        min_length: usize,
        /// Maximum length (inclusive)
        max_length: usize,
    },

    /// Generate timestamps in a range
    TimestampRange {
        /// Start timestamp (ISO 8601 or YYYY-MM-DD)
        start: String,
        /// End timestamp (ISO 8601 or YYYY-MM-DD)
        end: String,
    },

    /// Generate weighted boolean values
    WeightedBool {
        /// Weight for true value (0.0 to 1.0)
        true_weight: f64,
    },

    /// Generate random selection from a pool of values
    OneOf {
        /// Pool of values to select from
        values: Vec<serde_yaml::Value>,
    },

    /// Generate a static value
    Static {
        /// The static value to use
        value: serde_yaml::Value,
    },

    /// Generate null values
    Null,
}

/// Selector written in a model file.
///
/// Exactly one of `field`, `type` or `root` identifies the target; `within`
/// and `depth` restrict where it applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectorDef {
    /// `Owner.member`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Type descriptor or raw type name
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    /// Select the root node
    #[serde(default)]
    pub root: bool,

    /// Enclosing scopes, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub within: Vec<SelectorDef>,

    /// Exact node depth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

/// Collection size override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDef {
    pub min: usize,
    pub max: usize,
}

/// A generator override for the nodes matched by `select`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideDef {
    pub select: SelectorDef,

    /// Fixed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_yaml::Value>,

    /// Declarative generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorSpec>,

    /// Collection size range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeDef>,

    /// Leave matched nodes unpopulated
    #[serde(default)]
    pub ignore: bool,

    /// Allow matched nodes to be null
    #[serde(default)]
    pub nullable: bool,
}

/// One target of an assignment rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignTargetDef {
    pub select: SelectorDef,

    /// Fixed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_yaml::Value>,

    /// Declarative generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorSpec>,
}

/// Conditional assignment: when `given` matches the condition, set targets.
///
/// With neither `is` nor `is_in`, the rule fires unconditionally once the
/// source has been generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignDef {
    pub given: SelectorDef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub is_in: Vec<serde_yaml::Value>,

    #[serde(default)]
    pub set: Vec<AssignTargetDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub else_set: Vec<AssignTargetDef>,
}

/// Complete fixture model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureModel {
    /// Root type descriptor
    pub root: TypeRef,

    /// Type definitions
    #[serde(default)]
    pub types: Vec<TypeDef>,

    /// Generation settings
    #[serde(default)]
    pub settings: Settings,

    /// Generator overrides, in declaration order
    #[serde(default)]
    pub overrides: Vec<OverrideDef>,

    /// Assignment rules, in declaration order
    #[serde(default)]
    pub assign: Vec<AssignDef>,
}

impl FixtureModel {
    /// Load model from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse model from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let model: FixtureModel = serde_yaml::from_str(yaml)?;
        model.settings.validate()?;
        Ok(model)
    }

    /// Build the type catalog for this model.
    pub fn catalog(&self) -> Result<TypeCatalog, SchemaError> {
        Ok(TypeCatalog::new(self.types.clone())?)
    }
}
