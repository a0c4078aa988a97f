//! Error type for fixture generation.

use fixture_core::{CatalogError, SchemaError, SettingsError, TypeError};
use fixture_generator::GeneratorError;

/// Error type for fixture operations.
///
/// Every variant is fatal for the `create()` call that raised it; no
/// partially populated value is ever returned alongside an error.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// A generic parameter or wildcard could not be bound to a concrete type
    #[error("Cannot resolve type '{type_name}': {reason}")]
    TypeResolution { type_name: String, reason: String },

    /// No generator exists for a leaf type
    #[error("No generator for type '{type_name}' at {path}")]
    UnsupportedType { type_name: String, path: String },

    /// Assignment rules depend on each other in a cycle
    #[error("Circular assignment: {}", .chain.join(" -> "))]
    CircularAssignment { chain: Vec<String> },

    /// Selectors that matched no node in strict mode
    #[error("Selectors matched no nodes: {}", .selectors.join(", "))]
    UnmatchedSelector { selectors: Vec<String> },

    /// A setter failed and the setter policy is `fail`
    #[error("Setter '{setter}' failed at {path}: {message}")]
    SetterInvocation {
        path: String,
        setter: String,
        message: String,
    },

    /// The node tree is deeper than `max.depth`
    #[error("Node tree exceeds max depth {max_depth} at {path}")]
    DepthExceeded { max_depth: usize, path: String },

    /// A configured collection size is larger than `collection.max.limit`
    #[error("Collection size {size} at {path} exceeds limit {limit}")]
    CollectionTooLarge {
        path: String,
        size: usize,
        limit: usize,
    },

    /// No distinct key could be drawn and the exhaustion policy is `fail`
    #[error("No distinct key at {path} after {retries} retries")]
    KeySpaceExhausted { path: String, retries: usize },

    /// Type definitions are invalid
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A type descriptor could not be parsed
    #[error("Type error: {0}")]
    Type(#[from] TypeError),

    /// Settings are invalid
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// A fixture model could not be loaded
    #[error("Model error: {0}")]
    Schema(#[from] SchemaError),

    /// A declarative generator failed
    #[error("Generator error at {path}: {source}")]
    Generator {
        path: String,
        #[source]
        source: GeneratorError,
    },

    /// A fixture model entry is malformed
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// A generated value did not fit the requested Rust type
    #[error("Failed to decode generated value: {0}")]
    Decode(#[from] serde_json::Error),
}
