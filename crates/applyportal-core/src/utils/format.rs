/// Normalize a phone number to its canonical stored form.
/// Keeps the digits, turns a leading "00" or "+" into "+", and drops
/// spaces, dashes, dots and parentheses.
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return trimmed.to_string(); // Nothing to normalize
    }

    if trimmed.starts_with('+') {
        format!("+{}", digits)
    } else if let Some(rest) = digits.strip_prefix("00") {
        format!("+{}", rest)
    } else {
        digits
    }
}

/// Strip the time component from a date string.
/// "2001-04-12T00:00:00.000Z" and "2001-04-12 08:30" both become "2001-04-12".
pub fn strip_time(date: &str) -> String {
    let trimmed = date.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    match trimmed.find(['T', ' ']) {
        Some(idx) if idx >= 8 => trimmed[..idx].to_string(),
        _ => trimmed.to_string(),
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

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    let day = strip_time(date);
    match chrono::NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
        Ok(d) => d.format("%b %d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+234 803-123-4567"), "+2348031234567");
        assert_eq!(normalize_phone("00234 (803) 123 4567"), "+2348031234567");
        assert_eq!(normalize_phone("0803.123.4567"), "08031234567");
        assert_eq!(normalize_phone("  "), "");
        assert_eq!(normalize_phone("n/a"), "n/a"); // No digits, return as-is
    }

    #[test]
    fn test_strip_time() {
        assert_eq!(strip_time("2001-04-12T00:00:00.000Z"), "2001-04-12");
        assert_eq!(strip_time("2001-04-12T23:30:00+01:00"), "2001-04-12");
        assert_eq!(strip_time("2001-04-12 08:30"), "2001-04-12");
        assert_eq!(strip_time("2001-04-12"), "2001-04-12");
        assert_eq!(strip_time("April 2001"), "April 2001");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-01-05T00:00:00Z"), "Jan 05, 2024");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(&Some("x".to_string()), "-"), "x");
        assert_eq!(format_optional(&Some(" ".to_string()), "-"), "-");
        assert_eq!(format_optional(&None, "-"), "-");
    }
}
