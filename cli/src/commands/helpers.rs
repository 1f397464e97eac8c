use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use moneywise_core::models::SyncStatus;

/// Parse a date argument: YYYY-MM-DD or today/yesterday/tomorrow.
/// Named days resolve to the current instant shifted by whole days; an
/// explicit date lands at local noon so it stays on the intended calendar
/// day across timezones.
pub(crate) fn parse_date(date_str: Option<String>) -> Result<DateTime<Utc>> {
    match date_str {
        None => Ok(Utc::now()),
        Some(s) => match s.as_str() {
            "today" => Ok(Utc::now()),
            "yesterday" => Ok(Utc::now() - Duration::days(1)),
            "tomorrow" => Ok(Utc::now() + Duration::days(1)),
            _ => {
                let date = NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                    format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
                })?;
                let noon = date
                    .and_hms_opt(12, 0, 0)
                    .context("Invalid time of day")?;
                Ok(Local
                    .from_local_datetime(&noon)
                    .single()
                    .map_or_else(|| Utc.from_utc_datetime(&noon), |dt| dt.with_timezone(&Utc)))
            }
        },
    }
}

pub(crate) fn parse_amount(s: &str) -> Result<f64> {
    let value: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid amount: '{s}'"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("Amount must be a non-negative number");
    }
    Ok(value)
}

pub(crate) fn format_money(amount: f64, currency: &str) -> String {
    format!("{currency} {amount:.2}")
}

pub(crate) fn format_date(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

pub(crate) fn sync_marker(sync: SyncStatus) -> &'static str {
    match sync {
        SyncStatus::Confirmed => "",
        SyncStatus::Pending => " (pending)",
        SyncStatus::Failed => " (unsynced)",
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_date_none_is_now() {
        let before = Utc::now();
        let parsed = parse_date(None).unwrap();
        assert!(parsed >= before);
        assert!(parsed <= Utc::now());
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = parse_date(Some("today".to_string())).unwrap();
        let yesterday = parse_date(Some("yesterday".to_string())).unwrap();
        // Both resolve against "now", so the gap is a hair under a day.
        assert!((today - yesterday).num_minutes() >= 23 * 60 + 59);
        assert!((today - yesterday).num_minutes() <= 24 * 60);
    }

    #[test]
    fn test_parse_date_iso() {
        let parsed = parse_date(Some("2026-01-15".to_string())).unwrap();
        let local = parsed.with_timezone(&Local);
        assert_eq!(local.year(), 2026);
        assert_eq!(local.month(), 1);
        assert_eq!(local.day(), 15);
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
        assert!(parse_date(Some("2026-13-01".to_string())).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert!((parse_amount("200").unwrap() - 200.0).abs() < f64::EPSILON);
        assert!((parse_amount("200.50").unwrap() - 200.5).abs() < f64::EPSILON);
        assert!((parse_amount(" 0 ").unwrap()).abs() < f64::EPSILON);
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("-5").is_err());
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(1234.5, "USD"), "USD 1234.50");
        assert_eq!(format_money(0.0, "IDR"), "IDR 0.00");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("日清カップヌードル", 8), "日清カップ...");
    }

    #[test]
    fn test_sync_marker() {
        assert_eq!(sync_marker(SyncStatus::Confirmed), "");
        assert_eq!(sync_marker(SyncStatus::Failed), " (unsynced)");
    }
}
