// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};

/// Short, log friendly rendering of a byte blob such as a proof or ciphertext.
pub fn hex_summary(data: &[u8]) -> String {
    truncate(hex::encode(data))
}

/// Remove a leading `0x`/`0X` if present.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode hex with or without a `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(strip_hex_prefix(s)).with_context(|| format!("invalid hex string '{s}'"))
}

pub fn encode_hex_prefixed(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

const SUMMARY_THRESHOLD: usize = 100;
const SUMMARY_KEEP: usize = 25;

/// Keep the head and tail of long hex strings.
fn truncate(s: String) -> String {
    if s.len() <= SUMMARY_THRESHOLD {
        format!("0x{s}")
    } else {
        let start = &s[..SUMMARY_KEEP];
        let end = &s[s.len() - SUMMARY_KEEP..];
        format!("<bytes({}):0x{}..{}>", s.len(), start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hex_prefix() {
        assert_eq!(strip_hex_prefix("0xabcd"), "abcd");
        assert_eq!(strip_hex_prefix("0XABCD"), "ABCD");
        assert_eq!(strip_hex_prefix("abcd"), "abcd");
        assert_eq!(strip_hex_prefix(""), "");
    }

    #[test]
    fn test_decode_hex() -> Result<()> {
        assert_eq!(decode_hex("0x0102")?, vec![1, 2]);
        assert_eq!(decode_hex("0102")?, vec![1, 2]);
        assert!(decode_hex("0xzz").is_err());
        Ok(())
    }

    #[test]
    fn test_hex_summary_truncates_large_blobs() {
        assert_eq!(hex_summary(&[0xab; 4]), "0xabababab");
        let summary = hex_summary(&[0u8; 200]);
        assert!(summary.starts_with("<bytes(400):0x"));
    }
}
