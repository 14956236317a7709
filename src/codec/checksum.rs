//! CRC32 checksums for collection trailers
//!
//! Uses CRC32 (IEEE polynomial) via crc32fast.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Formats a checksum as `crc32:XXXXXXXX` (lowercase hex, zero-padded).
pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

/// Parses a `crc32:XXXXXXXX` string back to u32.
pub fn parse_checksum(formatted: &str) -> Option<u32> {
    let hex = formatted.strip_prefix("crc32:")?;
    if hex.len() != 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"id: \"123456789\"\nbalance: 10000\n";
        assert_eq!(compute_checksum(data), compute_checksum(data));
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut data = b"balance: 10000".to_vec();
        let original = compute_checksum(&data);
        data[10] ^= 0x01;
        assert_ne!(compute_checksum(&data), original);
    }

    #[test]
    fn test_format_and_parse() {
        assert_eq!(format_checksum(0xDEADBEEF), "crc32:deadbeef");
        assert_eq!(format_checksum(0x1), "crc32:00000001");
        assert_eq!(parse_checksum("crc32:deadbeef"), Some(0xDEADBEEF));
        assert_eq!(parse_checksum("crc32:dead"), None);
        assert_eq!(parse_checksum("md5:deadbeef"), None);
        assert_eq!(parse_checksum("crc32:zzzzzzzz"), None);
    }
}
