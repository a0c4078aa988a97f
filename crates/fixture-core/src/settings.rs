//! Generation settings.
//!
//! `Settings` is an immutable configuration context: it is built once, then
//! passed by reference through every generation call. Each field has a
//! recognized string key (see [`Keys`]) so settings can also be applied from
//! command-line `key=value` pairs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Error reading settings file
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Key is not recognized
    #[error("Unknown setting key: {0}")]
    UnknownKey(String),

    /// Value could not be parsed for the key
    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },

    /// Settings are inconsistent
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Recognized setting keys.
pub struct Keys;

impl Keys {
    pub const COLLECTION_MIN_SIZE: &'static str = "collection.min.size";
    pub const COLLECTION_MAX_SIZE: &'static str = "collection.max.size";
    pub const COLLECTION_MAX_LIMIT: &'static str = "collection.max.limit";
    pub const MAP_KEY_RETRIES: &'static str = "map.key.retries";
    pub const MAP_KEY_EXHAUSTION: &'static str = "map.key.exhaustion";
    pub const MAX_DEPTH: &'static str = "max.depth";
    pub const WRAPPER_NULLABLE: &'static str = "wrapper.nullable";
    pub const NULL_PROBABILITY: &'static str = "null.probability";
    pub const INTEGER_MIN: &'static str = "integer.min";
    pub const INTEGER_MAX: &'static str = "integer.max";
    pub const FLOAT_MIN: &'static str = "float.min";
    pub const FLOAT_MAX: &'static str = "float.max";
    pub const STRING_MIN_LENGTH: &'static str = "string.min.length";
    pub const STRING_MAX_LENGTH: &'static str = "string.max.length";
    pub const ASSIGNMENT_TYPE: &'static str = "assignment.type";
    pub const ON_SETTER_ERROR: &'static str = "on.setter.error";
    pub const STRICT: &'static str = "strict";
    pub const SEED: &'static str = "seed";

    /// All recognized keys.
    pub const ALL: &'static [&'static str] = &[
        Self::COLLECTION_MIN_SIZE,
        Self::COLLECTION_MAX_SIZE,
        Self::COLLECTION_MAX_LIMIT,
        Self::MAP_KEY_RETRIES,
        Self::MAP_KEY_EXHAUSTION,
        Self::MAX_DEPTH,
        Self::WRAPPER_NULLABLE,
        Self::NULL_PROBABILITY,
        Self::INTEGER_MIN,
        Self::INTEGER_MAX,
        Self::FLOAT_MIN,
        Self::FLOAT_MAX,
        Self::STRING_MIN_LENGTH,
        Self::STRING_MAX_LENGTH,
        Self::ASSIGNMENT_TYPE,
        Self::ON_SETTER_ERROR,
        Self::STRICT,
        Self::SEED,
    ];
}

/// How generated member values are written into their object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    /// Write the field directly
    #[default]
    Field,
    /// Call the member's declared setter, if any
    Method,
}

/// What to do when a setter fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnSetterError {
    /// Fall back to writing the field directly
    #[default]
    AssignField,
    /// Abort generation with an error
    Fail,
    /// Leave the field as it is and continue
    Ignore,
}

/// What to do when a unique map key cannot be drawn within the retry bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyExhaustion {
    /// Skip the entry; the mapping ends up smaller than requested
    #[default]
    Drop,
    /// Abort generation with an error
    Fail,
}

macro_rules! parse_enum {
    ($key:expr, $value:expr, { $($text:literal => $variant:expr),+ $(,)? }) => {
        match $value {
            $($text => Ok($variant),)+
            _ => Err(SettingsError::InvalidValue {
                key: $key.to_string(),
                value: $value.to_string(),
            }),
        }
    };
}

/// Generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum sequence/mapping size
    pub collection_min_size: usize,
    /// Maximum sequence/mapping size
    pub collection_max_size: usize,
    /// Hard limit on any configured collection size
    pub collection_max_limit: usize,
    /// Re-draws of a colliding map key before giving up on the entry
    pub map_key_retries: usize,
    /// Policy once `map_key_retries` is exhausted
    pub map_key_exhaustion: KeyExhaustion,
    /// Maximum node-tree depth
    pub max_depth: usize,
    /// Whether `Option`/wrapper nodes may be generated as null
    pub wrapper_nullable: bool,
    /// Probability of null for nullable nodes
    pub null_probability: f64,
    /// Integer leaf range (clamped to the leaf type)
    pub integer_min: i64,
    pub integer_max: i64,
    /// Float leaf range
    pub float_min: f64,
    pub float_max: f64,
    /// String leaf length range
    pub string_min_length: usize,
    pub string_max_length: usize,
    /// Member write strategy
    pub assignment_type: AssignmentType,
    /// Setter failure policy
    pub on_setter_error: OnSetterError,
    /// Fail when a selector matches nothing
    pub strict: bool,
    /// Fixed random seed
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection_min_size: 2,
            collection_max_size: 6,
            collection_max_limit: 10_000,
            map_key_retries: 10,
            map_key_exhaustion: KeyExhaustion::Drop,
            max_depth: 64,
            wrapper_nullable: false,
            null_probability: 0.2,
            integer_min: 1,
            integer_max: 10_000,
            float_min: 1.0,
            float_max: 10_000.0,
            string_min_length: 3,
            string_max_length: 10,
            assignment_type: AssignmentType::Field,
            on_setter_error: OnSetterError::AssignField,
            strict: true,
            seed: None,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML string. Missing fields keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply a single `key=value` setting.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let value = value.trim();
        match key {
            Keys::COLLECTION_MIN_SIZE => self.collection_min_size = parse(key, value)?,
            Keys::COLLECTION_MAX_SIZE => self.collection_max_size = parse(key, value)?,
            Keys::COLLECTION_MAX_LIMIT => self.collection_max_limit = parse(key, value)?,
            Keys::MAP_KEY_RETRIES => self.map_key_retries = parse(key, value)?,
            Keys::MAP_KEY_EXHAUSTION => {
                self.map_key_exhaustion = parse_enum!(key, value, {
                    "drop" => KeyExhaustion::Drop,
                    "fail" => KeyExhaustion::Fail,
                })?
            }
            Keys::MAX_DEPTH => self.max_depth = parse(key, value)?,
            Keys::WRAPPER_NULLABLE => self.wrapper_nullable = parse(key, value)?,
            Keys::NULL_PROBABILITY => self.null_probability = parse(key, value)?,
            Keys::INTEGER_MIN => self.integer_min = parse(key, value)?,
            Keys::INTEGER_MAX => self.integer_max = parse(key, value)?,
            Keys::FLOAT_MIN => self.float_min = parse(key, value)?,
            Keys::FLOAT_MAX => self.float_max = parse(key, value)?,
            Keys::STRING_MIN_LENGTH => self.string_min_length = parse(key, value)?,
            Keys::STRING_MAX_LENGTH => self.string_max_length = parse(key, value)?,
            Keys::ASSIGNMENT_TYPE => {
                self.assignment_type = parse_enum!(key, value, {
                    "field" => AssignmentType::Field,
                    "method" => AssignmentType::Method,
                })?
            }
            Keys::ON_SETTER_ERROR => {
                self.on_setter_error = parse_enum!(key, value, {
                    "assign_field" => OnSetterError::AssignField,
                    "fail" => OnSetterError::Fail,
                    "ignore" => OnSetterError::Ignore,
                })?
            }
            Keys::STRICT => self.strict = parse(key, value)?,
            Keys::SEED => self.seed = Some(parse(key, value)?),
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        self.validate()
    }

    /// Builder-style `apply`.
    pub fn with(mut self, key: &str, value: &str) -> Result<Self, SettingsError> {
        self.apply(key, value)?;
        Ok(self)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.collection_min_size > self.collection_max_size {
            return Err(SettingsError::Invalid(format!(
                "collection min size {} exceeds max size {}",
                self.collection_min_size, self.collection_max_size
            )));
        }
        if self.integer_min > self.integer_max {
            return Err(SettingsError::Invalid(format!(
                "integer min {} exceeds max {}",
                self.integer_min, self.integer_max
            )));
        }
        if !self.float_min.is_finite() || !self.float_max.is_finite() {
            return Err(SettingsError::Invalid(format!(
                "float bounds {}..{} must be finite",
                self.float_min, self.float_max
            )));
        }
        if self.float_min > self.float_max {
            return Err(SettingsError::Invalid(format!(
                "float min {} exceeds max {}",
                self.float_min, self.float_max
            )));
        }
        // The sampler needs the span itself to be representable.
        if !(self.float_max - self.float_min).is_finite() {
            return Err(SettingsError::Invalid(format!(
                "float range {}..{} is too wide",
                self.float_min, self.float_max
            )));
        }
        if self.string_min_length > self.string_max_length {
            return Err(SettingsError::Invalid(format!(
                "string min length {} exceeds max length {}",
                self.string_min_length, self.string_max_length
            )));
        }
        if !(0.0..=1.0).contains(&self.null_probability) {
            return Err(SettingsError::Invalid(format!(
                "null probability {} is outside [0, 1]",
                self.null_probability
            )));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value.parse().map_err(|_| SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
