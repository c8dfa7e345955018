fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format hours to one decimal with thousands separators: 1,234.5
pub fn hours(val: f64) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.1}", val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "0"));
    let sign = if negative && fixed != "0.0" { "-" } else { "" };
    format!("{sign}{}.{dec_part}", group_thousands(int_part))
}

/// Format a count with thousands separators: 12,345
pub fn number(val: usize) -> String {
    group_thousands(&val.to_string())
}

pub fn pct(val: f64) -> String {
    format!("{val:.1}%")
}

/// Shorten to `max` characters, ending with an ellipsis when cut.
pub fn truncate(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max || max == 0 {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 1).collect();
        format!("{truncated}\u{2026}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_formatting() {
        assert_eq!(hours(1234.56), "1,234.6");
        assert_eq!(hours(-500.0), "-500.0");
        assert_eq!(hours(0.0), "0.0");
        assert_eq!(hours(-0.01), "0.0");
        assert_eq!(hours(1000000.0), "1,000,000.0");
        assert_eq!(hours(7.5), "7.5");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(number(0), "0");
        assert_eq!(number(999), "999");
        assert_eq!(number(12345), "12,345");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer note", 6), "a lon\u{2026}");
    }
}
