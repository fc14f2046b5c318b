//! Human-readable magnitude formatting (`1.20k`, `3.45m`, ...).
//!
//! Formatted strings are for display only. Anything that orders or sums
//! values must use the underlying number, never the string.

/// Suffix thresholds, largest first.
const SUFFIXES: [(f64, &str); 4] = [(1e12, "t"), (1e9, "b"), (1e6, "m"), (1e3, "k")];

/// Format a non-negative magnitude with two decimals and a size suffix.
///
/// Negative values are formatted by absolute value with a leading `-`.
/// Non-finite values format as `0.00`.
pub fn format_magnitude(value: f64) -> String {
    if !value.is_finite() {
        return "0.00".to_string();
    }
    if value < 0.0 {
        return format!("-{}", format_magnitude(-value));
    }
    for (scale, suffix) in SUFFIXES {
        if value >= scale {
            return format!("{:.2}{}", value / scale, suffix);
        }
    }
    format!("{:.2}", value)
}

/// Inverse of [`format_magnitude`], accurate to the two displayed decimals.
pub fn parse_magnitude(s: &str) -> Option<f64> {
    let s = s.trim();
    let (digits, scale) = match s.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => {
            let scale = SUFFIXES
                .iter()
                .find(|(_, suffix)| suffix.eq_ignore_ascii_case(&s[idx..]))
                .map(|(scale, _)| *scale)?;
            (&s[..idx], scale)
        }
        _ => (s, 1.0),
    };
    let value: f64 = digits.parse().ok()?;
    value.is_finite().then_some(value * scale)
}

/// Share of `part` in `total` as a percentage with two decimals.
///
/// A zero total yields `0.00`.
pub fn format_percent(part: f64, total: f64) -> String {
    if total <= 0.0 || !total.is_finite() {
        return "0.00".to_string();
    }
    format!("{:.2}", part / total * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_pick_suffix() {
        assert_eq!(format_magnitude(0.0), "0.00");
        assert_eq!(format_magnitude(950.0), "950.00");
        assert_eq!(format_magnitude(1_000.0), "1.00k");
        assert_eq!(format_magnitude(1_200.0), "1.20k");
        assert_eq!(format_magnitude(999_000.0), "999.00k");
        assert_eq!(format_magnitude(2_500_000.0), "2.50m");
        assert_eq!(format_magnitude(7_000_000_000.0), "7.00b");
        assert_eq!(format_magnitude(1.5e12), "1.50t");
    }

    #[test]
    fn negative_and_non_finite() {
        assert_eq!(format_magnitude(-1_200.0), "-1.20k");
        assert_eq!(format_magnitude(f64::NAN), "0.00");
        assert_eq!(format_magnitude(f64::INFINITY), "0.00");
    }

    #[test]
    fn parse_inverts_format() {
        assert_eq!(parse_magnitude("950.00"), Some(950.0));
        assert_eq!(parse_magnitude("1.20k"), Some(1_200.0));
        assert_eq!(parse_magnitude("2.50m"), Some(2_500_000.0));
        assert_eq!(parse_magnitude("1.50t"), Some(1.5e12));
        assert_eq!(parse_magnitude("-1.20k"), Some(-1_200.0));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_magnitude(""), None);
        assert_eq!(parse_magnitude("abc"), None);
        assert_eq!(parse_magnitude("1.2x"), None);
    }

    #[test]
    fn percent_guards_zero_total() {
        assert_eq!(format_percent(5.0, 0.0), "0.00");
        assert_eq!(format_percent(1.0, 4.0), "25.00");
        assert_eq!(format_percent(1.0, 3.0), "33.33");
    }
}
