use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

fn to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()
}

/// Calendar day (UTC) of a unix timestamp, e.g. `2026-10-18`.
pub fn day_key(ts: i64) -> String {
    to_datetime(ts).format(DAY_FORMAT).to_string()
}

/// ISO week of a unix timestamp, e.g. `2026-W42`.
pub fn week_key(ts: i64) -> String {
    let week = to_datetime(ts).iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT).ok()
}

/// Whether `day` is the calendar day right after `previous`.
pub fn is_next_day(previous: &str, day: &str) -> bool {
    match (parse_day(previous), parse_day(day)) {
        (Some(prev), Some(current)) => prev + Duration::days(1) == current,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2026-10-18T12:00:00Z, a Sunday
    const SUNDAY: i64 = 1_792_324_800;

    #[test]
    fn formats_days_and_weeks() {
        assert_eq!(day_key(SUNDAY), "2026-10-18");
        assert_eq!(week_key(SUNDAY), "2026-W42");
        // Monday starts a new ISO week
        assert_eq!(week_key(SUNDAY + 86_400), "2026-W43");
    }

    #[test]
    fn detects_consecutive_days() {
        assert!(is_next_day("2026-10-17", "2026-10-18"));
        assert!(is_next_day("2026-12-31", "2027-01-01"));
        assert!(!is_next_day("2026-10-16", "2026-10-18"));
        assert!(!is_next_day("garbage", "2026-10-18"));
    }
}
