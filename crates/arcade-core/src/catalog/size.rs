//! Human-readable size parsing ("1.2 GB", "850 MB", "734003200").

/// Parse a manifest size string into bytes.
///
/// Units are binary multiples and case-insensitive; a bare number is bytes.
/// Returns `None` for anything that does not look like a size.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn parse_size(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number = number.replace(',', "");
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" | "bytes" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1 << 40,
        _ => return None,
    };

    Some((value * multiplier as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_bytes() {
        assert_eq!(parse_size("734003200"), Some(734_003_200));
        assert_eq!(parse_size("1,024"), Some(1024));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_size("850 MB"), Some(850 * 1024 * 1024));
        assert_eq!(parse_size("2GB"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_size("1.5 kb"), Some(1536));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("huge"), None);
        assert_eq!(parse_size("12 parsecs"), None);
    }
}
