//! Date/time rendering shared by the chat endpoints.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// `YYYY-MM-DD` part of a message timestamp.
pub fn date_part(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// `HH:MM:SS` part of a message timestamp.
pub fn time_part(ts: &DateTime<Utc>) -> String {
    ts.format("%H:%M:%S").to_string()
}

/// Short label for a conversation list: `HH:MM` today, `Ayer` yesterday,
/// `dd/mm/YYYY` otherwise.
pub fn relative_label(ts: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let day = ts.date_naive();
    let today = now.date_naive();
    if day == today {
        ts.format("%H:%M").to_string()
    } else if Some(day) == today.checked_sub_signed(Duration::days(1)) {
        "Ayer".to_string()
    } else {
        ts.format("%d/%m/%Y").to_string()
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_ymd(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().unwrap()
    }

    #[test]
    fn label_today_shows_clock() {
        let now = at(2025, 5, 10, 18, 0);
        assert_eq!(relative_label(&at(2025, 5, 10, 9, 7), &now), "09:07");
    }

    #[test]
    fn label_yesterday() {
        let now = at(2025, 5, 10, 0, 5);
        assert_eq!(relative_label(&at(2025, 5, 9, 23, 59), &now), "Ayer");
    }

    #[test]
    fn label_older_uses_full_date() {
        let now = at(2025, 5, 10, 12, 0);
        assert_eq!(relative_label(&at(2025, 3, 1, 12, 0), &now), "01/03/2025");
    }

    #[test]
    fn parse_ymd_rejects_garbage() {
        assert!(parse_ymd("2025-02-30").is_none());
        assert!(parse_ymd("10/05/2025").is_none());
        assert_eq!(parse_ymd(" 2025-05-10 ").map(|d| d.to_string()), Some("2025-05-10".to_string()));
    }

    #[test]
    fn splits_timestamp() {
        let ts = at(2025, 1, 2, 3, 4);
        assert_eq!(date_part(&ts), "2025-01-02");
        assert_eq!(time_part(&ts), "03:04:00");
    }
}
