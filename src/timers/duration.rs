//! Duration detection and phrasing for step text

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// `<number> <unit>` where the unit is a minute, hour or second keyword
static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s*(minutes?|mins?|hours?|hrs?|seconds?|secs?)\b").unwrap()
});

/// Find the first duration mentioned in a step's text
///
/// "Simmer for 10 minutes" yields ten minutes. The unit is taken from the
/// keyword that follows the number; anything unrecognised counts as minutes.
/// Zero amounts are ignored.
pub fn detect_duration(text: &str) -> Option<Duration> {
    let captures = DURATION_PATTERN.captures(text)?;
    let amount: u64 = captures.get(1)?.as_str().parse().ok()?;
    if amount == 0 {
        return None;
    }

    let unit = captures
        .get(2)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();
    let seconds = if unit.starts_with('h') {
        amount.saturating_mul(3600)
    } else if unit.starts_with('s') {
        amount
    } else {
        amount.saturating_mul(60)
    };

    Some(Duration::from_secs(seconds))
}

fn plural(amount: u64, unit: &str) -> String {
    if amount == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", amount, unit)
    }
}

/// Spoken form of a duration, e.g. "1 hour and 30 minutes"
pub fn describe_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let parts: Vec<String> = [(hours, "hour"), (minutes, "minute"), (seconds, "second")]
        .into_iter()
        .filter(|(amount, _)| *amount > 0)
        .map(|(amount, unit)| plural(amount, unit))
        .collect();

    match parts.len() {
        0 => "0 seconds".to_string(),
        1 => parts[0].clone(),
        n => format!("{} and {}", parts[..n - 1].join(", "), parts[n - 1]),
    }
}

/// Short clock form, e.g. "09:58" or "1:02:03"
pub fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
