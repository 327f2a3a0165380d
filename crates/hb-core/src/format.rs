//! Rendering of minute quantities for display.

/// Formats minutes as signed `HH:MM`.
#[must_use]
pub fn format_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let abs = minutes.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}

/// Formats a balance as `±Dd HH:MM`, where one "day" is the daily
/// required-minutes unit rather than 24 hours.
///
/// Below one day the rendering degrades to `±HH:MM`, below one hour to
/// `±MMm`. Zero is unsigned (`00m`).
#[must_use]
pub fn format_balance(minutes: i64, daily_required_minutes: u32) -> String {
    if daily_required_minutes == 0 {
        return "0d 00:00".to_string();
    }

    let sign = if minutes < 0 { "-" } else { "" };
    let abs = minutes.unsigned_abs();
    let daily = u64::from(daily_required_minutes);

    let days = abs / daily;
    let remainder = abs % daily;
    let hours = remainder / 60;
    let mins = remainder % 60;

    if days > 0 {
        if remainder > 0 {
            format!("{sign}{days}d {hours:02}:{mins:02}")
        } else {
            format!("{sign}{days}d")
        }
    } else if hours > 0 {
        format!("{sign}{hours:02}:{mins:02}")
    } else {
        format!("{sign}{mins:02}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn minutes_render_as_hours_and_minutes() {
        assert_snapshot!(format_minutes(125), @"02:05");
        assert_snapshot!(format_minutes(-45), @"-00:45");
        assert_snapshot!(format_minutes(0), @"00:00");
    }

    #[test]
    fn balance_of_one_quota_plus_two_hours() {
        // One full daily quota (480) plus two hours reads as one day.
        assert_snapshot!(format_balance(600, 480), @"1d 02:00");
    }

    #[test]
    fn balance_of_exact_quota_multiples() {
        assert_eq!(format_balance(480, 480), "1d");
        assert_eq!(format_balance(-960, 480), "-2d");
    }

    #[test]
    fn balance_below_one_day_uses_clock_form() {
        assert_eq!(format_balance(150, 480), "02:30");
        assert_eq!(format_balance(-479, 480), "-07:59");
    }

    #[test]
    fn balance_below_one_hour_uses_minute_form() {
        assert_eq!(format_balance(59, 480), "59m");
        assert_eq!(format_balance(-3, 480), "-03m");
    }

    #[test]
    fn zero_balance_is_unsigned() {
        assert_eq!(format_balance(0, 480), "00m");
    }

    #[test]
    fn day_unit_follows_the_requirement() {
        // With a six-hour requirement, 390 minutes is one day and a half hour.
        assert_eq!(format_balance(390, 360), "1d 00:30");
    }

    #[test]
    fn zero_requirement_guard() {
        assert_eq!(format_balance(123, 0), "0d 00:00");
    }
}
