use chrono::{NaiveDateTime, Utc};

/// Format the store writes timestamps in; fractional seconds are optional
const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Older stamps are shown as a calendar date
const RELATIVE_LIMIT_DAYS: i64 = 7;

pub fn parse_db_time(db_time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(db_time, DB_TIME_FORMAT).ok()
}

/// Human-readable form of a stored timestamp, or the raw value if it cannot be parsed
pub fn parse_and_format_time(db_time: &str) -> String {
    match parse_db_time(db_time) {
        Some(stamp) => humanize_since(stamp, Utc::now().naive_utc()),
        None => db_time.to_string(),
    }
}

/// Describe `stamp` relative to `now`: "just now", "N min ago", "N h ago",
/// "N days ago", then "15 January 2025 12:00" past a week
pub fn humanize_since(stamp: NaiveDateTime, now: NaiveDateTime) -> String {
    let elapsed = now.signed_duration_since(stamp);
    match elapsed.num_seconds() {
        // Clock skew between writer and reader shows as "just now"
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{} min ago", s / 60),
        s if s < 86_400 => format!("{} h ago", s / 3600),
        _ if elapsed.num_days() < RELATIVE_LIMIT_DAYS => match elapsed.num_days() {
            1 => "yesterday".to_string(),
            days => format!("{} days ago", days),
        },
        _ => stamp.format("%-d %B %Y %H:%M").to_string(),
    }
}

/// Shorten `text` to `max` characters, marking the cut with an ellipsis
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(raw: &str) -> NaiveDateTime {
        parse_db_time(raw).unwrap()
    }

    #[test]
    fn reads_comment_and_post_stamps_with_millis() {
        let created = stamp("2025-03-08 09:15:42.317");
        assert_eq!(created.format("%H:%M:%S%.3f").to_string(), "09:15:42.317");
        assert!(parse_db_time("2025-03-08 09:15:42").is_some());
        assert!(parse_db_time("08.03.2025").is_none());
    }

    #[test]
    fn recent_stamps_are_relative() {
        let now = stamp("2025-03-08 12:00:00.000");
        assert_eq!(humanize_since(stamp("2025-03-08 11:59:30.500"), now), "just now");
        assert_eq!(humanize_since(stamp("2025-03-08 11:45:00.000"), now), "15 min ago");
        assert_eq!(humanize_since(stamp("2025-03-08 09:00:00.999"), now), "2 h ago");
        assert_eq!(humanize_since(stamp("2025-03-07 10:00:00.000"), now), "yesterday");
        assert_eq!(humanize_since(stamp("2025-03-04 12:00:00.000"), now), "4 days ago");
    }

    #[test]
    fn future_stamp_reads_as_just_now() {
        let now = stamp("2025-03-08 12:00:00.000");
        assert_eq!(humanize_since(stamp("2025-03-08 12:00:05.000"), now), "just now");
    }

    #[test]
    fn old_stamps_show_the_date() {
        let now = stamp("2025-03-08 12:00:00.000");
        assert_eq!(
            humanize_since(stamp("2025-01-15 18:05:11.042"), now),
            "15 January 2025 18:05"
        );
    }

    #[test]
    fn unparseable_stamp_is_shown_raw() {
        assert_eq!(parse_and_format_time("not-a-date"), "not-a-date");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("Привет, мир", 6), "Привет…");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
