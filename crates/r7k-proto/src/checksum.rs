//! Sum-of-bytes integrity check.
//!
//! Every data record frame ends with a `u32` holding the wrapping sum of all
//! bytes from the first byte of the DRF header through the last byte of the
//! record data. The same function serves both directions: builders append it,
//! parsers recompute and compare it.

/// Size of the trailing checksum field.
pub const CHECKSUM_SIZE: usize = 4;

/// Computes the checksum of `bytes`.
#[must_use]
pub fn compute(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |sum, &b| sum.wrapping_add(u32::from(b)))
}

/// Returns true if `stored` matches the checksum of `bytes`.
#[must_use]
pub fn verify(bytes: &[u8], stored: u32) -> bool {
    compute(bytes) == stored
}
