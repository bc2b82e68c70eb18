//! Row decoding helpers

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// Read a timestamp column stored as RFC3339 text
///
/// A value that does not parse decodes as the current time.
pub fn timestamp_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Ok(parse_timestamp(&raw))
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.with_timezone(&Utc),
        Err(_) => Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_normalize_to_utc() {
        let parsed = parse_timestamp("2025-03-09T08:30:00+02:00");
        assert_eq!(parsed.to_rfc3339(), "2025-03-09T06:30:00+00:00");
    }

    #[test]
    fn test_garbage_falls_back_to_now() {
        let before = Utc::now();
        let parsed = parse_timestamp("yesterday-ish");
        assert!(parsed >= before && parsed <= Utc::now());
    }

    #[tokio::test]
    async fn test_timestamp_column() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let row = sqlx::query("SELECT '2024-01-01T12:00:00Z' AS created_at")
            .fetch_one(&pool)
            .await
            .unwrap();

        let created = timestamp_column(&row, "created_at").unwrap();
        assert_eq!(created.to_rfc3339(), "2024-01-01T12:00:00+00:00");
        assert!(timestamp_column(&row, "missing").is_err());
    }
}
