//! Individual value generators for different data types.
//!
//! This module provides the generation logic for each leaf type and for the
//! declarative generators a model file can bind to a node.

pub mod numeric;
pub mod pattern;
pub mod static_value;
pub mod temporal;
pub mod text;
pub mod uuid;

use crate::GeneratorError;
use fixture_core::{GeneratorSpec, Value};
use rand::Rng;

/// Generate a value based on a declarative generator.
///
/// `index` is the position of the value among its siblings; `sequential`
/// and `pattern` generators read it.
pub fn generate_value<R: Rng>(
    spec: &GeneratorSpec,
    rng: &mut R,
    index: u64,
) -> Result<Value, GeneratorError> {
    let value = match spec {
        GeneratorSpec::UuidV4 => uuid::generate_uuid_v4(rng),

        GeneratorSpec::Sequential { start } => Value::Int(start.wrapping_add(index as i64)),

        GeneratorSpec::Pattern { pattern } => pattern::generate_pattern(pattern, rng, index),

        GeneratorSpec::IntRange { min, max } => numeric::generate_int_range(rng, *min, *max)?,

        GeneratorSpec::FloatRange { min, max } => numeric::generate_float_range(rng, *min, *max)?,

        GeneratorSpec::Text {
            min_length,
            max_length,
        } => {
            if min_length > max_length {
                return Err(GeneratorError::InvalidRange {
                    min: min_length.to_string(),
                    max: max_length.to_string(),
                });
            }
            text::generate_text(rng, *min_length, *max_length)
        }

        GeneratorSpec::TimestampRange { start, end } => {
            temporal::generate_timestamp_range(rng, start, end)?
        }

        GeneratorSpec::WeightedBool { true_weight } => {
            if !(0.0..=1.0).contains(true_weight) {
                return Err(GeneratorError::InvalidWeight(*true_weight));
            }
            Value::Bool(rng.random_bool(*true_weight))
        }

        GeneratorSpec::OneOf { values } => {
            if values.is_empty() {
                return Err(GeneratorError::EmptyPool);
            }
            let idx = rng.random_range(0..values.len());
            static_value::yaml_to_value(&values[idx])
        }

        GeneratorSpec::Static { value } => static_value::yaml_to_value(value),

        GeneratorSpec::Null => Value::Null,
    };
    Ok(value)
}
