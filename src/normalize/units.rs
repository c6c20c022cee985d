use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

const FEET_TO_METERS: f64 = 0.3048;

/// Feet to meters, rounded to one decimal place
pub fn feet_to_meters(feet: f64) -> f64 {
    (feet * FEET_TO_METERS * 10.0).round() / 10.0
}

/// `YYYYMMDDHHMMSS` to `YYYY-MM-DDTHH:MM:SSZ`. Anything else yields `None`.
pub fn format_compact_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() != 14 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let field = |range: std::ops::Range<usize>| raw[range].parse::<u32>().ok();

    let year = raw[0..4].parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)?;
    let datetime = date.and_hms_opt(field(8..10)?, field(10..12)?, field(12..14)?)?;
    Some(datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Parse a coordinate component; blank, non-numeric or non-finite is `None`
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coordinate from a JSON value that may be a number or a numeric string
pub fn coordinate_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_coordinate(s),
        _ => None,
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Lenient expiry date coercion. Month-first slashed dates are tried before
/// day-first ones; a date without a time means midnight.
pub fn parse_expiry(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feet_to_meters_rounds_to_one_decimal() {
        assert_eq!(feet_to_meters(100.0), 30.5);
        assert_eq!(feet_to_meters(0.0), 0.0);
        assert_eq!(feet_to_meters(165.0), 50.3);
    }

    #[test]
    fn test_compact_timestamp() {
        assert_eq!(
            format_compact_timestamp("20240115103000").as_deref(),
            Some("2024-01-15T10:30:00Z")
        );
        assert_eq!(format_compact_timestamp("notadate"), None);
        assert_eq!(format_compact_timestamp(""), None);
        assert_eq!(format_compact_timestamp("20241315103000"), None);
        assert_eq!(format_compact_timestamp("2024011510300"), None);
    }

    #[test]
    fn test_coordinates() {
        assert_eq!(parse_coordinate(" -33.86 "), Some(-33.86));
        assert_eq!(parse_coordinate(""), None);
        assert_eq!(parse_coordinate("NaN"), None);
        assert_eq!(parse_coordinate("east"), None);
        assert_eq!(coordinate_from_json(&json!(151.2)), Some(151.2));
        assert_eq!(coordinate_from_json(&json!("151.2")), Some(151.2));
        assert_eq!(coordinate_from_json(&json!(null)), None);
        assert_eq!(coordinate_from_json(&json!([1.0])), None);
    }

    #[test]
    fn test_parse_expiry_formats() {
        let midnight = |y, m, d| {
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        assert_eq!(parse_expiry("2024-03-01"), Some(midnight(2024, 3, 1)));
        assert_eq!(parse_expiry("03/01/2024"), Some(midnight(2024, 3, 1)));
        assert_eq!(parse_expiry("25/12/2024"), Some(midnight(2024, 12, 25)));
        assert_eq!(
            parse_expiry("2024-03-01 17:30:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(17, 30, 0)
        );
        assert!(parse_expiry("2024-03-01T17:30:00+10:00").is_some());
        assert_eq!(parse_expiry("TBC"), None);
        assert_eq!(parse_expiry("  "), None);
    }
}
