use chrono::{Days, NaiveDate};

/// Formats whole seconds as `hh:mm:ss`. Hours are not wrapped at 24.
pub fn format_hms(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// Formats a signed amount of seconds, marking negative values with a leading `-`.
pub fn format_signed_hms(seconds: i64) -> String {
    if seconds < 0 {
        format!("-{}", format_hms(seconds.unsigned_abs()))
    } else {
        format_hms(seconds.unsigned_abs())
    }
}

/// Returns the calendar day before `date`.
pub fn previous_day(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(1))
}

/// Converts decimal minutes into whole seconds, rounding to the nearest second.
pub fn minutes_to_seconds(minutes: f64) -> u64 {
    if minutes.is_finite() && minutes > 0. {
        (minutes * 60.).round() as u64
    } else {
        0
    }
}

pub fn seconds_to_minutes(seconds: u64) -> f64 {
    seconds as f64 / 60.
}
