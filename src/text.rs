//! Small text helpers for filename normalization and display.

/// Normalize whitespace in a string.
///
/// Trims leading and trailing whitespace, collapses runs of a repeated
/// whitespace character to a single occurrence, and maps underscores to
/// spaces.
///
/// # Example
///
/// ```
/// use dupescan::text::cleanup_spaces;
///
/// assert_eq!(cleanup_spaces("  my_holiday  photos "), "my holiday photos");
/// ```
#[must_use]
pub fn cleanup_spaces(input: &str) -> String {
    let trimmed = input.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut previous: Option<char> = None;

    for c in trimmed.chars() {
        if c.is_whitespace() && previous == Some(c) {
            continue;
        }
        previous = Some(c);
        out.push(if c == '_' { ' ' } else { c });
    }
    out
}

/// Whether `input` is a number in the Arabic (decimal) numbering system.
#[must_use]
pub fn is_arabic_numerals(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_digit())
}

/// Whether `input` is a number in the Roman numbering system.
///
/// Case-insensitive; only membership of the numeral alphabet is checked,
/// not well-formedness.
#[must_use]
pub fn is_roman_numerals(input: &str) -> bool {
    !input.is_empty()
        && input
            .chars()
            .all(|c| matches!(c.to_ascii_uppercase(), 'I' | 'V' | 'X' | 'L' | 'C' | 'D' | 'M'))
}

fn numeral_value(c: char) -> i64 {
    match c {
        'I' => 1,
        'V' => 5,
        'X' => 10,
        'L' => 50,
        'C' => 100,
        'D' => 500,
        'M' => 1000,
        _ => 0,
    }
}

/// Parse a decimal or Roman-numeral string into an integer.
///
/// Decimal strings pass through unchanged; Roman numerals are evaluated
/// with the usual subtractive rule (`IV` is 4, `MCMXC` is 1990). Returns
/// `None` for anything else.
///
/// # Example
///
/// ```
/// use dupescan::text::roman_to_int;
///
/// assert_eq!(roman_to_int("42"), Some(42));
/// assert_eq!(roman_to_int("xiv"), Some(14));
/// assert_eq!(roman_to_int("pizza"), None);
/// ```
#[must_use]
pub fn roman_to_int(input: &str) -> Option<i64> {
    if input.is_empty() {
        return None;
    }

    if is_arabic_numerals(input) {
        return input.parse().ok();
    }
    if !is_roman_numerals(input) {
        return None;
    }

    let values: Vec<i64> = input
        .chars()
        .map(|c| numeral_value(c.to_ascii_uppercase()))
        .collect();

    let mut total = 0;
    for (i, value) in values.iter().enumerate() {
        let next = values.get(i + 1).copied().unwrap_or(0);
        if next <= *value {
            total += value;
        } else {
            total -= value;
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_trims_and_collapses() {
        assert_eq!(cleanup_spaces("  hello   world  "), "hello world");
        assert_eq!(cleanup_spaces(""), "");
        assert_eq!(cleanup_spaces("   "), "");
    }

    #[test]
    fn test_cleanup_maps_underscores() {
        assert_eq!(cleanup_spaces("summer_trip_2019"), "summer trip 2019");
    }

    #[test]
    fn test_cleanup_mixed_whitespace_kept() {
        // Only runs of the same character collapse.
        assert_eq!(cleanup_spaces("a \t b"), "a \t b");
    }

    #[test]
    fn test_arabic_detection() {
        assert!(is_arabic_numerals("0123"));
        assert!(!is_arabic_numerals(""));
        assert!(!is_arabic_numerals("12a"));
        assert!(!is_arabic_numerals("-3"));
    }

    #[test]
    fn test_roman_detection() {
        assert!(is_roman_numerals("XIV"));
        assert!(is_roman_numerals("mcmxc"));
        assert!(!is_roman_numerals(""));
        assert!(!is_roman_numerals("XIVa"));
    }

    #[test]
    fn test_roman_values() {
        assert_eq!(roman_to_int("I"), Some(1));
        assert_eq!(roman_to_int("IV"), Some(4));
        assert_eq!(roman_to_int("IX"), Some(9));
        assert_eq!(roman_to_int("XIV"), Some(14));
        assert_eq!(roman_to_int("MCMXC"), Some(1990));
        assert_eq!(roman_to_int("MMXXVI"), Some(2026));
    }

    #[test]
    fn test_roman_case_insensitive() {
        assert_eq!(roman_to_int("xiv"), roman_to_int("XIV"));
    }

    #[test]
    fn test_decimal_passthrough() {
        assert_eq!(roman_to_int("123"), Some(123));
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(roman_to_int(""), None);
        assert_eq!(roman_to_int("hello"), None);
    }
}
