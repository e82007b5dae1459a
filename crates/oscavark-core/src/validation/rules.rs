//! Field-level checks shared by the form schemas.

use chrono::NaiveDate;

/// Minimum age for registration as a senior citizen.
pub const SENIOR_MIN_AGE: i32 = 60;

pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Length in characters of the trimmed value within `min..=max`.
pub fn len_between(s: &str, min: usize, max: usize) -> bool {
    let len = s.trim().chars().count();
    (min..=max).contains(&len)
}

/// Loose address check: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// At least `min_len` characters with both a letter and a digit.
pub fn is_strong_password(password: &str, min_len: usize) -> bool {
    password.chars().count() >= min_len
        && password.chars().any(|c| c.is_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Normalize a Philippine mobile number to `09XXXXXXXXX`.
/// Accepts `09XXXXXXXXX` and `+639XXXXXXXXX` with optional spaces or
/// dashes. The country code needs its `+`.
pub fn normalize_ph_mobile(input: &str) -> Option<String> {
    let compact: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let international = compact.starts_with('+');
    let national = if international && digits.len() == 12 && digits.starts_with("639") {
        format!("0{}", &digits[2..])
    } else if !international && digits.len() == 11 && digits.starts_with("09") {
        digits.to_string()
    } else {
        return None;
    };
    Some(national)
}

/// Parse an ISO calendar date (`YYYY-MM-DD`).
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}
