//! Numeric value generators.

use crate::GeneratorError;
use fixture_core::{LeafType, Value};
use rand::Rng;

/// Generate a random integer in the given range (inclusive).
pub fn generate_int_range<R: Rng>(rng: &mut R, min: i64, max: i64) -> Result<Value, GeneratorError> {
    if min > max {
        return Err(GeneratorError::InvalidRange {
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(Value::Int(rng.random_range(min..=max)))
}

/// Generate a random float in the given range (inclusive).
pub fn generate_float_range<R: Rng>(
    rng: &mut R,
    min: f64,
    max: f64,
) -> Result<Value, GeneratorError> {
    if !(min <= max) || !min.is_finite() || !max.is_finite() {
        return Err(GeneratorError::InvalidRange {
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(Value::Float(rng.random_range(min..=max)))
}

/// Bounds of an integer leaf type as `i128`, so every type fits.
fn type_bounds(leaf: LeafType) -> (i128, i128) {
    match leaf {
        LeafType::I8 => (i8::MIN.into(), i8::MAX.into()),
        LeafType::I16 => (i16::MIN.into(), i16::MAX.into()),
        LeafType::I32 => (i32::MIN.into(), i32::MAX.into()),
        LeafType::U8 => (0, u8::MAX.into()),
        LeafType::U16 => (0, u16::MAX.into()),
        LeafType::U32 => (0, u32::MAX.into()),
        LeafType::U64 => (0, u64::MAX.into()),
        _ => (i64::MIN.into(), i64::MAX.into()),
    }
}

/// Generate an integer for a leaf type, with the configured range clamped to
/// what the type can hold.
pub fn generate_integer<R: Rng>(rng: &mut R, leaf: LeafType, min: i64, max: i64) -> Value {
    let (type_min, type_max) = type_bounds(leaf);
    let lo = i128::from(min).clamp(type_min, type_max);
    let hi = i128::from(max).clamp(type_min, type_max).max(lo);

    match leaf {
        LeafType::U8 | LeafType::U16 | LeafType::U32 | LeafType::U64 => {
            // lo and hi are non-negative after clamping
            let lo = u64::try_from(lo).unwrap_or(0);
            let hi = u64::try_from(hi).unwrap_or(lo);
            Value::UInt(rng.random_range(lo..=hi))
        }
        _ => {
            let lo = i64::try_from(lo).unwrap_or(i64::MIN);
            let hi = i64::try_from(hi).unwrap_or(i64::MAX);
            Value::Int(rng.random_range(lo..=hi))
        }
    }
}

/// Generate a float for a leaf type.
pub fn generate_float<R: Rng>(rng: &mut R, leaf: LeafType, min: f64, max: f64) -> Value {
    let value = rng.random_range(min..=max);
    match leaf {
        LeafType::F32 => Value::Float(f64::from(value as f32)),
        _ => Value::Float(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_int_range() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let value = generate_int_range(&mut rng, 10, 20).unwrap();
            if let Value::Int(v) = value {
                assert!((10..=20).contains(&v));
            } else {
                panic!("Expected Int value");
            }
        }
    }

    #[test]
    fn test_generate_int_range_invalid() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(matches!(
            generate_int_range(&mut rng, 5, 1),
            Err(GeneratorError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_generate_float_range() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let value = generate_float_range(&mut rng, 0.0, 100.0).unwrap();
            if let Value::Float(v) = value {
                assert!((0.0..=100.0).contains(&v));
            } else {
                panic!("Expected Float value");
            }
        }
        assert!(generate_float_range(&mut rng, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_generate_integer_clamps_to_type() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            match generate_integer(&mut rng, LeafType::I8, 1, 10_000) {
                Value::Int(v) => assert!((1..=127).contains(&v)),
                other => panic!("Expected Int value, got {other:?}"),
            }
            match generate_integer(&mut rng, LeafType::U8, -50, 10) {
                Value::UInt(v) => assert!(v <= 10),
                other => panic!("Expected UInt value, got {other:?}"),
            }
        }
    }
}
