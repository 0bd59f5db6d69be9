//! Shared utilities

use chrono::{DateTime, Local, Utc};
use normo_api::ConversationListItem;
use normo_session::state::parse_timestamp;
use std::path::PathBuf;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Title of a catalog entry: its first message, shortened
pub fn conversation_title(item: &ConversationListItem) -> String {
    let first = item.first_message.trim();
    if first.is_empty() {
        "New Conversation".to_string()
    } else {
        truncate_chars(first, 50)
    }
}

/// Abbreviated conversation id for status lines
pub fn short_id(id: &str) -> String {
    truncate_chars(id, 8)
}

/// Format a catalog timestamp relative to `now`: time of day within the last
/// day, weekday within the last week, month and day otherwise.
pub fn format_catalog_date(value: &str, now: DateTime<Utc>) -> String {
    if value.trim().is_empty() {
        return "Unknown".to_string();
    }
    let Some(date) = parse_timestamp(value) else {
        return "Invalid Date".to_string();
    };

    let age = now.signed_duration_since(date);
    let local = date.with_timezone(&Local);
    if age.num_hours() < 24 {
        local.format("%H:%M").to_string()
    } else if age.num_hours() < 24 * 7 {
        local.format("%a").to_string()
    } else {
        local.format("%b %-d").to_string()
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn item(first_message: &str) -> ConversationListItem {
        ConversationListItem {
            conversation_id: "c1".into(),
            user_id: None,
            created_at: String::new(),
            updated_at: String::new(),
            message_count: 0,
            first_message: first_message.into(),
        }
    }

    #[test]
    fn test_truncate_chars_unicode() {
        assert_eq!(truncate_chars("Größe", 3), "Grö...");
        assert_eq!(truncate_chars("kurz", 10), "kurz");
    }

    #[test]
    fn test_conversation_title() {
        assert_eq!(conversation_title(&item("")), "New Conversation");
        assert_eq!(conversation_title(&item("Abstand?")), "Abstand?");
        let long = "a".repeat(60);
        assert_eq!(conversation_title(&item(&long)), format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567...");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_catalog_date_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        let fmt = |d: DateTime<Utc>| format_catalog_date(&d.to_rfc3339(), now);

        let recent = now - Duration::hours(2);
        assert_eq!(fmt(recent), recent.with_timezone(&Local).format("%H:%M").to_string());

        let this_week = now - Duration::days(3);
        assert_eq!(fmt(this_week), this_week.with_timezone(&Local).format("%a").to_string());

        let older = now - Duration::days(30);
        assert_eq!(fmt(older), older.with_timezone(&Local).format("%b %-d").to_string());
    }

    #[test]
    fn test_catalog_date_invalid() {
        let now = Utc::now();
        assert_eq!(format_catalog_date("", now), "Unknown");
        assert_eq!(format_catalog_date("not a date", now), "Invalid Date");
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/session.json"), PathBuf::from("/tmp/session.json"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/normo"), home.join("normo"));
        }
    }
}
