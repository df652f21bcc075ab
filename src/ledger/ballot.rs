//! Extraction of the sample number from free-form message text.

use std::sync::LazyLock;

use regex::Regex;

/// A run of Unicode decimal digits (`\d` is Unicode-aware in `regex`).
#[allow(clippy::expect_used)]
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit run pattern is valid"));

/// A single Unicode decimal digit.
#[allow(clippy::expect_used)]
static DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d$").expect("digit pattern is valid"));

/// Returns the first run of decimal digits in `text` as a number.
///
/// Any Unicode decimal digit counts, so fullwidth `５` or Arabic-Indic `٣`
/// read the same as `5` and `3`. Runs too long for `u64` saturate, so they
/// are reported as out of range rather than as missing. Returns `None` if
/// the text has no digits.
#[must_use]
pub fn parse_sample_number(text: &str) -> Option<u64> {
    let run = DIGIT_RUN.find(text)?;
    let value = run.as_str().chars().fold(0u64, |acc, digit| {
        acc.saturating_mul(10).saturating_add(digit_value(digit))
    });
    Some(value)
}

fn is_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DIGIT.is_match(c.encode_utf8(&mut buf))
}

/// Numeric value of a decimal digit.
///
/// Unicode lays every script's digits out as contiguous runs of ten,
/// zero first, so the value is the offset from the start of the run.
fn digit_value(c: char) -> u64 {
    if let Some(d) = c.to_digit(10) {
        return u64::from(d);
    }

    let mut start = u32::from(c);
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32)
        && is_digit(prev)
    {
        start -= 1;
    }

    u64::from((u32::from(c) - start) % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_number() {
        assert_eq!(parse_sample_number("5"), Some(5));
        assert_eq!(parse_sample_number("  42 "), Some(42));
    }

    #[test]
    fn test_number_inside_text() {
        assert_eq!(parse_sample_number("Мёд 3"), Some(3));
        assert_eq!(parse_sample_number("sample #17, please"), Some(17));
    }

    #[test]
    fn test_first_number_wins() {
        assert_eq!(parse_sample_number("12 and 34"), Some(12));
    }

    #[test]
    fn test_no_digits() {
        assert_eq!(parse_sample_number("abc"), None);
        assert_eq!(parse_sample_number(""), None);
        assert_eq!(parse_sample_number("мёд"), None);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(parse_sample_number("007"), Some(7));
        assert_eq!(parse_sample_number("0"), Some(0));
    }

    #[test]
    fn test_huge_number_saturates() {
        assert_eq!(
            parse_sample_number("999999999999999999999999"),
            Some(u64::MAX)
        );
    }

    #[test]
    fn test_fullwidth_digits() {
        assert_eq!(parse_sample_number("Мёд ５"), Some(5));
        assert_eq!(parse_sample_number("４２"), Some(42));
        assert_eq!(parse_sample_number("６０"), Some(60));
    }

    #[test]
    fn test_arabic_indic_digits() {
        assert_eq!(parse_sample_number("٣"), Some(3));
        assert_eq!(parse_sample_number("٠٩"), Some(9));
        assert_eq!(parse_sample_number("۱۲"), Some(12));
    }

    #[test]
    fn test_mixed_scripts_in_one_run() {
        assert_eq!(parse_sample_number("1٢"), Some(12));
    }
}
