//! Parsing of human-readable byte sizes such as `256m`.

use crate::{UtilsError, UtilsResult};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Parses a size made of digits and an optional `k`, `m` or `g` suffix (binary units).
pub fn parse_byte_size(value: &str) -> UtilsResult<u64> {
    let lower = value.trim().to_ascii_lowercase();
    let (digits, multiplier) = match lower.chars().last() {
        Some('k') => (&lower[..lower.len() - 1], 1024),
        Some('m') => (&lower[..lower.len() - 1], 1024 * 1024),
        Some('g') => (&lower[..lower.len() - 1], 1024 * 1024 * 1024),
        _ => (lower.as_str(), 1),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UtilsError::InvalidSize(value.to_string()));
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| UtilsError::InvalidSize(value.to_string()))
}

/// Formats a byte count the way the container engine expects it, e.g. `268435456b`.
pub fn format_byte_size(bytes: u64) -> String {
    format!("{}b", bytes)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(parse_byte_size("256m").unwrap(), 256 * 1024 * 1024);
        assert_eq!(parse_byte_size("1G").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_byte_size("512k").unwrap(), 512 * 1024);
        assert_eq!(parse_byte_size("4096").unwrap(), 4096);

        assert!(parse_byte_size("").is_err());
        assert!(parse_byte_size("m").is_err());
        assert!(parse_byte_size("12mb").is_err());
        assert!(parse_byte_size("-1m").is_err());
    }
}
