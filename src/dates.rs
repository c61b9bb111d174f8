//! Due-date input parsing and display helpers.

use chrono::{Datelike, Duration, Local, NaiveDate, Utc};

use crate::error::ValidationError;

/// The local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Wall-clock milliseconds, the seed for new ids.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse human-readable due date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday".."sunday" (and three-letter forms), optionally with "next"/"this"
/// - "end of week"/"eow", "end of month"/"eom"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD"
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let weekday = today.weekday().num_days_from_monday() as i64;
            return Some(today + Duration::days(6 - weekday));
        }
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            return NaiveDate::from_ymd_opt(year, month, 1).map(|d| d - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        if let Some((idx, unit)) = rest.char_indices().last() {
            if let Ok(n) = rest[..idx].trim().parse::<i64>() {
                let offset = match unit {
                    'd' => Duration::try_days(n),
                    'w' => Duration::try_weeks(n),
                    // Approximate: 30 days per month
                    'm' => n.checked_mul(30).and_then(Duration::try_days),
                    _ => None,
                };
                if let Some(offset) = offset {
                    return today.checked_add_signed(offset);
                }
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let (next_week, day_name) = match s.strip_prefix("next ") {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix("this ").unwrap_or(&s)),
    };
    if let Some(&(_, target)) = weekdays.iter().find(|(name, _)| *name == day_name) {
        let current = today.weekday().num_days_from_monday() as i64;
        let ahead = (target + 7 - current) % 7;
        let ahead = if next_week { ahead + 7 } else { ahead };
        return Some(today + Duration::days(ahead));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Resolve the form's due field. Empty input yields `None` so callers pick the default.
pub fn resolve_due(input: &str, today: NaiveDate) -> Result<Option<NaiveDate>, ValidationError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    parse_due_input(input, today)
        .map(Some)
        .ok_or_else(|| ValidationError::InvalidDate(input.trim().to_string()))
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    let delta = (due - today).num_days();
    match delta {
        0 => "today".into(),
        1 => "tomorrow".into(),
        d if d > 1 => format!("in {d}d"),
        d => format!("{}d late", -d),
    }
}
