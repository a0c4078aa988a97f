//! Temporal value generators.

use crate::GeneratorError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fixture_core::Value;
use rand::Rng;

/// Earliest generated timestamp (1970-01-01T00:00:00Z).
const MIN_TIMESTAMP: i64 = 0;
/// Latest generated timestamp (2070-12-31T23:59:59Z).
const MAX_TIMESTAMP: i64 = 3_187_295_999;
const SECONDS_PER_DAY: i64 = 86_400;

/// Generate a random timestamp in the given range.
///
/// The start and end should be ISO 8601 formatted timestamps or plain dates.
pub fn generate_timestamp_range<R: Rng>(
    rng: &mut R,
    start: &str,
    end: &str,
) -> Result<Value, GeneratorError> {
    let start_dt = parse_timestamp(start)
        .ok_or_else(|| GeneratorError::InvalidTimestamp(start.to_string()))?;
    let end_dt =
        parse_timestamp(end).ok_or_else(|| GeneratorError::InvalidTimestamp(end.to_string()))?;

    let (start_ts, end_ts) = (start_dt.timestamp(), end_dt.timestamp());
    if start_ts > end_ts {
        return Err(GeneratorError::InvalidRange {
            min: start.to_string(),
            max: end.to_string(),
        });
    }
    Ok(random_datetime(rng, start_ts, end_ts))
}

/// Generate a random UTC timestamp between 1970 and 2070.
pub fn generate_datetime<R: Rng>(rng: &mut R) -> Value {
    random_datetime(rng, MIN_TIMESTAMP, MAX_TIMESTAMP)
}

/// Generate a random date between 1970 and 2070.
pub fn generate_date<R: Rng>(rng: &mut R) -> Value {
    let days = rng.random_range(0..=MAX_TIMESTAMP / SECONDS_PER_DAY);
    let date = NaiveDate::default() + chrono::Duration::days(days);
    Value::Date(date)
}

/// Generate a random time of day with second precision.
pub fn generate_time<R: Rng>(rng: &mut R) -> Value {
    let secs = rng.random_range(0..86_400u32);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or_default();
    Value::Time(time)
}

fn random_datetime<R: Rng>(rng: &mut R, start_ts: i64, end_ts: i64) -> Value {
    let random_ts = rng.random_range(start_ts..=end_ts);
    let dt = DateTime::from_timestamp(random_ts, 0).unwrap_or_default();
    Value::DateTime(dt)
}

/// Parse a timestamp string in various formats.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC 3339 / ISO 8601
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Try common date-only format
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_timestamp_range() {
        let mut rng = StdRng::seed_from_u64(42);

        let value =
            generate_timestamp_range(&mut rng, "2020-01-01T00:00:00Z", "2024-12-31T23:59:59Z")
                .unwrap();

        if let Value::DateTime(dt) = value {
            assert!(dt.year() >= 2020 && dt.year() <= 2024);
        } else {
            panic!("Expected DateTime value");
        }
    }

    #[test]
    fn test_generate_timestamp_with_dates_only() {
        let mut rng = StdRng::seed_from_u64(42);

        let value = generate_timestamp_range(&mut rng, "2020-01-01", "2024-12-31").unwrap();

        if let Value::DateTime(dt) = value {
            assert!(dt.year() >= 2020 && dt.year() <= 2024);
        } else {
            panic!("Expected DateTime value");
        }
    }

    #[test]
    fn test_invalid_timestamps() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(matches!(
            generate_timestamp_range(&mut rng, "yesterday", "2024-12-31"),
            Err(GeneratorError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            generate_timestamp_range(&mut rng, "2024-12-31", "2020-01-01"),
            Err(GeneratorError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_generate_date_and_time() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            match generate_date(&mut rng) {
                Value::Date(d) => assert!((1970..=2070).contains(&d.year())),
                other => panic!("Expected Date value, got {other:?}"),
            }
            assert!(matches!(generate_time(&mut rng), Value::Time(_)));
        }
    }

    #[test]
    fn test_deterministic_generation() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        assert_eq!(generate_datetime(&mut rng1), generate_datetime(&mut rng2));
    }
}
