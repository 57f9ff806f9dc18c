//! Shared utility functions

use chrono::{DateTime, SecondsFormat, Utc};

/// Parse a datetime string (RFC3339 format) or return current time
///
/// This helper is used throughout the database layer to handle datetime parsing
/// with a fallback to the current time if parsing fails.
pub fn parse_datetime_or_now(s: &str) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a nullable datetime column. Unparseable values read as absent.
pub fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        chrono::DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Format a timestamp for storage.
///
/// Every stored timestamp uses the same fixed-width UTC form so that range
/// filters can compare the TEXT columns lexicographically.
pub fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Canonical form of an email address used as the identity key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_parse_datetime_or_now() {
        let valid_time = "2024-01-01T12:00:00Z";
        let parsed = parse_datetime_or_now(valid_time);
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");

        // Invalid time should return current time (just check it doesn't panic)
        let now_before = Utc::now();
        let parsed = parse_datetime_or_now("invalid");
        let now_after = Utc::now();
        assert!(parsed >= now_before && parsed <= now_after);
    }

    #[test]
    fn test_parse_optional_datetime() {
        assert!(parse_optional_datetime(None).is_none());
        assert!(parse_optional_datetime(Some("garbage".to_string())).is_none());
        let parsed = parse_optional_datetime(Some("2024-03-05T08:30:00Z".to_string())).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 5, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_timestamp_orders_lexicographically() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = base + Duration::milliseconds(1500);
        assert_eq!(timestamp(base), "2024-01-01T00:00:00.000000Z");
        assert!(timestamp(base) < timestamp(later));
        assert_eq!(parse_datetime_or_now(&timestamp(later)), later);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }
}
