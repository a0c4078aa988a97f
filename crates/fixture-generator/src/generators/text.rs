//! String and character generators.

use fixture_core::Value;
use rand::Rng;

/// Generate a random uppercase ASCII letter.
pub fn generate_char<R: Rng>(rng: &mut R) -> Value {
    Value::Char(random_letter(rng))
}

/// Generate a random uppercase string with a length in `[min_length, max_length]`.
pub fn generate_text<R: Rng>(rng: &mut R, min_length: usize, max_length: usize) -> Value {
    let length = rng.random_range(min_length..=max_length.max(min_length));
    Value::String((0..length).map(|_| random_letter(rng)).collect())
}

fn random_letter<R: Rng>(rng: &mut R) -> char {
    char::from(rng.random_range(b'A'..=b'Z'))
}
