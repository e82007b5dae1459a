use chrono::{Datelike, NaiveDate};

/// Format a Philippine mobile number for display.
/// Normalizes 09XXXXXXXXX and +639XXXXXXXXX to `0917 123 4567`.
pub fn format_phone(phone: &str) -> String {
    // Extract just the digits
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        11 if digits.starts_with("09") => format!(
            "{} {} {}",
            &digits[0..4],
            &digits[4..7],
            &digits[7..11]
        ),
        12 if digits.starts_with("639") => format!(
            "0{} {} {}",
            &digits[2..5],
            &digits[5..8],
            &digits[8..12]
        ),
        _ => phone.to_string(), // Return original if can't format
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None or blank
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Format a date for display (`Mar 15, 1948`)
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Format minutes as `2h 05m` / `45m`
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }
}

/// Format a 0-100 score with one decimal place
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Case-insensitive substring check
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("09171234567"), "0917 123 4567");
        assert_eq!(format_phone("+639171234567"), "0917 123 4567");
        assert_eq!(format_phone("0917-123-4567"), "0917 123 4567");
        assert_eq!(format_phone("123"), "123"); // Too short, return as-is
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Dasmariñas", 6), "Das...");
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let birth = NaiveDate::from_ymd_opt(1964, 2, 29).unwrap();
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()), 59);
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()), 60);
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()), 61);
    }

    #[test]
    fn test_format_minutes_and_percent() {
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(125), "2h 05m");
        assert_eq!(format_minutes(-3), "0m");
        assert_eq!(format_percent(83.333), "83.3%");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(&None, "-"), "-");
        assert_eq!(format_optional(&Some("  ".to_string()), "-"), "-");
        assert_eq!(format_optional(&Some("Lolo".to_string()), "-"), "Lolo");
    }
}
