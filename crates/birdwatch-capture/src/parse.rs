//! Abbreviated engagement-count parsing.

/// Parses a human-readable engagement count ("1.2K", "3M", "42") into an
/// integer.
///
/// The rendered timeline abbreviates counts above a thousand; the suffix is
/// case-insensitive and the numeric prefix may carry a fraction, which is
/// truncated after scaling. Unparsable input means the page layout changed
/// under us; that degrades to 0 so one odd counter never sinks the rest of
/// the item.
#[must_use]
pub fn parse_metric_count(text: &str) -> i64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0;
    }

    #[allow(clippy::cast_possible_truncation)]
    if let Some(prefix) = trimmed.strip_suffix(['K', 'k']) {
        return prefix
            .trim()
            .parse::<f64>()
            .map_or(0, |value| (value * 1_000.0) as i64);
    }

    #[allow(clippy::cast_possible_truncation)]
    if let Some(prefix) = trimmed.strip_suffix(['M', 'm']) {
        return prefix
            .trim()
            .parse::<f64>()
            .map_or(0, |value| (value * 1_000_000.0) as i64);
    }

    trimmed.parse::<i64>().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::parse_metric_count;

    #[test]
    fn plain_integer() {
        assert_eq!(parse_metric_count("37"), 37);
    }

    #[test]
    fn thousands_suffix() {
        assert_eq!(parse_metric_count("1.5K"), 1500);
        assert_eq!(parse_metric_count("2K"), 2000);
    }

    #[test]
    fn millions_suffix() {
        assert_eq!(parse_metric_count("2M"), 2_000_000);
        assert_eq!(parse_metric_count("1.1M"), 1_100_000);
    }

    #[test]
    fn lowercase_suffixes() {
        assert_eq!(parse_metric_count("1.2k"), 1200);
        assert_eq!(parse_metric_count("3m"), 3_000_000);
    }

    #[test]
    fn fractional_scaling_truncates() {
        assert_eq!(parse_metric_count("1.2345K"), 1234);
    }

    #[test]
    fn empty_and_whitespace_default_to_zero() {
        assert_eq!(parse_metric_count(""), 0);
        assert_eq!(parse_metric_count("   "), 0);
    }

    #[test]
    fn surrounding_whitespace_is_stripped() {
        assert_eq!(parse_metric_count(" 42 "), 42);
        assert_eq!(parse_metric_count(" 3.5K "), 3500);
    }

    #[test]
    fn garbage_defaults_to_zero() {
        assert_eq!(parse_metric_count("—"), 0);
        assert_eq!(parse_metric_count("lots"), 0);
        assert_eq!(parse_metric_count("12x"), 0);
    }
}
