//! Data record frame flags.
//!
//! The DRF carries a 16-bit flag word. Only two bits are defined: whether the
//! trailing checksum is meaningful, and whether the record was played back
//! from a recording rather than produced live.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// DRF flag word (16 bits)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RecordFlags: u16 {
        /// Trailing checksum is valid and must be verified
        const CHECKSUM_VALID = 0b0000_0000_0000_0001;

        /// Record comes from recorded data, not a live sonar
        const RECORDED = 0b1000_0000_0000_0000;
    }
}

impl RecordFlags {
    /// Create flags from the raw wire value
    ///
    /// Infallible: every `u16` is accepted and reserved bits are retained, so
    /// re-encoding a parsed header reproduces its flag word exactly.
    #[must_use]
    pub const fn from_word(word: u16) -> Self {
        Self::from_bits_retain(word)
    }

    /// Convert to the raw wire value
    #[must_use]
    pub const fn to_word(self) -> u16 {
        self.bits()
    }

    /// True if the frame's checksum must be verified.
    #[must_use]
    pub const fn checksum_valid(self) -> bool {
        self.contains(Self::CHECKSUM_VALID)
    }
}

impl Default for RecordFlags {
    fn default() -> Self {
        Self::CHECKSUM_VALID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_basic() {
        let flags = RecordFlags::CHECKSUM_VALID | RecordFlags::RECORDED;
        assert!(flags.checksum_valid());
        assert!(flags.contains(RecordFlags::RECORDED));
        assert!(!RecordFlags::RECORDED.checksum_valid());
    }

    #[test]
    fn reserved_bits_survive_round_trip() {
        let parsed = RecordFlags::from_word(0x0F01);
        assert!(parsed.checksum_valid());
        assert_eq!(parsed.to_word(), 0x0F01);
    }

    #[test]
    fn default_marks_checksum_valid() {
        assert_eq!(RecordFlags::default().to_word(), 1);
    }

    #[test]
    fn flags_empty() {
        assert_eq!(RecordFlags::empty().to_word(), 0);
    }
}
