//! Spool/filament identifiers as stored on a tag
//!
//! Two layouts are in use:
//! - Raw memory blocks: block 45 holds the filament id, block 46 the spool id,
//!   each as a big-endian integer over a 4-byte read.
//! - NDEF Text record: `SPOOL:<spool>\nFILAMENT:<filament>\n`, written by
//!   [`crate::WriteRequestChannel`].

use serde::{Deserialize, Serialize};

/// Block holding the filament id
pub const FILAMENT_BLOCK: u8 = 45;

/// Block holding the spool id
pub const SPOOL_BLOCK: u8 = 46;

/// Bytes requested per block read
pub const BLOCK_READ_LEN: u8 = 4;

const SPOOL_KEY: &str = "SPOOL";
const FILAMENT_KEY: &str = "FILAMENT";

/// Identifiers read from a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagIdentifiers {
    pub spool_id: u64,
    pub filament_id: u64,
}

impl TagIdentifiers {
    pub fn new(spool_id: u64, filament_id: u64) -> Self {
        Self {
            spool_id,
            filament_id,
        }
    }

    /// Text record body written to tags
    pub fn record_text(&self) -> String {
        format!(
            "{}:{}\n{}:{}\n",
            SPOOL_KEY, self.spool_id, FILAMENT_KEY, self.filament_id
        )
    }

    /// Parse a `SPOOL:`/`FILAMENT:` text record
    ///
    /// Unknown lines are ignored. Returns `None` if either key is missing or
    /// its value is not an unsigned integer.
    pub fn parse_record_text(text: &str) -> Option<Self> {
        let mut spool = None;
        let mut filament = None;

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                SPOOL_KEY => spool = value.parse().ok(),
                FILAMENT_KEY => filament = value.parse().ok(),
                _ => {}
            }
        }

        Some(Self::new(spool?, filament?))
    }
}

/// Decode raw block bytes as one big-endian unsigned integer
///
/// Empty input or a value wider than 64 bits decodes to 0.
pub fn decode_block_id(raw: &[u8]) -> u64 {
    if raw.is_empty() {
        return 0;
    }
    raw.iter()
        .try_fold(0u64, |acc, &b| acc.checked_mul(256)?.checked_add(u64::from(b)))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_block_id_big_endian() {
        assert_eq!(decode_block_id(&[0x00, 0x00, 0x00, 0x07]), 7);
        assert_eq!(decode_block_id(&[0x00, 0x00, 0x01, 0x00]), 256);
        assert_eq!(decode_block_id(&[0x12, 0x34, 0x56, 0x78]), 0x1234_5678);
    }

    #[test]
    fn test_decode_block_id_is_deterministic() {
        let raw = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(decode_block_id(&raw), decode_block_id(&raw));
    }

    #[test]
    fn test_decode_block_id_malformed() {
        assert_eq!(decode_block_id(&[]), 0);
        // 9 bytes with a non-zero leading byte does not fit in u64
        assert_eq!(decode_block_id(&[1, 0, 0, 0, 0, 0, 0, 0, 0]), 0);
    }

    #[test]
    fn test_decode_block_id_leading_zeros_beyond_u64() {
        assert_eq!(decode_block_id(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 9]), 9);
    }

    #[test]
    fn test_record_text_format() {
        let ids = TagIdentifiers::new(12, 34);
        assert_eq!(ids.record_text(), "SPOOL:12\nFILAMENT:34\n");
    }

    #[test]
    fn test_parse_record_text() {
        let ids = TagIdentifiers::parse_record_text("SPOOL:12\nFILAMENT:34\n");
        assert_eq!(ids, Some(TagIdentifiers::new(12, 34)));

        // Order and extra lines don't matter
        let ids = TagIdentifiers::parse_record_text("VENDOR:x\nFILAMENT: 5\nSPOOL: 9");
        assert_eq!(ids, Some(TagIdentifiers::new(9, 5)));
    }

    #[test]
    fn test_parse_record_text_missing_key() {
        assert_eq!(TagIdentifiers::parse_record_text("SPOOL:12\n"), None);
        assert_eq!(TagIdentifiers::parse_record_text("SPOOL:x\nFILAMENT:1"), None);
        assert_eq!(TagIdentifiers::parse_record_text(""), None);
    }
}
