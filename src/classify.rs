use crate::error::{JobError, Result};
use crate::normalize::parse_expiry;
use chrono::NaiveDateTime;

pub const EXPIRY_COLUMN: &str = "expiry_date";

/// Records split by whether their expiry is still in the future
#[derive(Debug)]
pub struct Partition<T> {
    pub active: Vec<T>,
    pub inactive: Vec<T>,
}

/// Active iff the expiry parses and is strictly after `now`.
/// Missing or unparseable expiries count as inactive.
pub fn is_active(expiry: Option<&str>, now: NaiveDateTime) -> bool {
    expiry
        .and_then(parse_expiry)
        .map(|expires| expires > now)
        .unwrap_or(false)
}

pub fn classify_activity<T, F>(records: Vec<T>, now: NaiveDateTime, expiry_of: F) -> Partition<T>
where
    F: Fn(&T) -> Option<&str>,
{
    let (active, inactive) = records
        .into_iter()
        .partition(|record| is_active(expiry_of(record), now));
    Partition { active, inactive }
}

/// Classification cannot run at all without the expiry column, so its
/// absence from the header is fatal rather than a per-record null.
pub fn require_expiry_column(columns: &[String]) -> Result<()> {
    if columns.iter().any(|c| c == EXPIRY_COLUMN) {
        Ok(())
    } else {
        Err(JobError::MissingColumn(EXPIRY_COLUMN.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_past_and_future_expiry() {
        let now = fixed_now();
        assert!(is_active(Some("2025-06-02"), now));
        assert!(!is_active(Some("2025-05-31"), now));
        // strictly after
        assert!(!is_active(Some("2025-06-01 12:00:00"), now));
        assert!(!is_active(Some("notadate"), now));
        assert!(!is_active(None, now));
    }

    #[test]
    fn test_partition_routes_records() {
        let records = vec![
            ("a", Some("2030-01-01")),
            ("b", Some("2020-01-01")),
            ("c", Some("garbage")),
            ("d", None),
        ];
        let split = classify_activity(records, fixed_now(), |r| r.1);
        let active: Vec<_> = split.active.iter().map(|r| r.0).collect();
        let inactive: Vec<_> = split.inactive.iter().map(|r| r.0).collect();
        assert_eq!(active, vec!["a"]);
        assert_eq!(inactive, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_missing_expiry_column_is_fatal() {
        let ok = vec!["html".to_string(), "expiry_date".to_string()];
        assert!(require_expiry_column(&ok).is_ok());

        let missing = vec!["html".to_string(), "latitude".to_string()];
        match require_expiry_column(&missing) {
            Err(JobError::MissingColumn(col)) => assert_eq!(col, "expiry_date"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }
}
