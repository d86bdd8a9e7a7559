//! Error types for the 7k wire format.
//!
//! All errors are structured, testable, and provide actionable information.

use thiserror::Error;

/// Protocol-level errors that can occur during frame parsing and validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    // Frame parsing errors
    /// Buffer is shorter than the structure being read from it
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum size in bytes
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// Network frame protocol version is not supported
    #[error("unsupported network frame version: {0}")]
    UnsupportedNetworkVersion(u16),

    /// Data record frame protocol version is not supported
    #[error("unsupported data record frame version: {0}")]
    UnsupportedRecordVersion(u16),

    /// Data record frame does not start with the sync pattern
    #[error("invalid sync pattern: {0:#010x} (expected 0x0000ffff)")]
    InvalidSyncPattern(u32),

    /// Network frame announces zero packets
    #[error("network frame announces no packets")]
    NoPackets,

    /// Network frame total size cannot hold a data record frame header
    #[error("network frame total size too small: {0} bytes")]
    TotalSizeTooSmall(u32),

    /// Data record frame size cannot hold header and checksum
    #[error("record size too small: {0} bytes")]
    RecordSizeTooSmall(u32),

    /// Frame is truncated (header claims more data than available)
    #[error("frame truncated: header claims {expected} bytes, but only {actual} available")]
    FrameTruncated {
        /// Size claimed by the header
        expected: usize,
        /// Actual bytes available
        actual: usize,
    },

    /// Trailing checksum does not match the recomputed sum
    #[error("checksum mismatch: frame carries {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the frame trailer
        stored: u32,
        /// Checksum recomputed over header and data
        computed: u32,
    },

    /// Payload exceeds what a single record can describe
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    // Validation errors
    /// Record type is not the one the decoder expects
    #[error("unexpected record type: {0}")]
    UnexpectedRecordType(u32),

    /// Remote-control body does not match its declared layout
    #[error("malformed {record} payload: {reason}")]
    MalformedPayload {
        /// Record the payload belongs to
        record: &'static str,
        /// What was wrong with it
        reason: &'static str,
    },

    /// Subscribe request names no record types
    #[error("subscribe request names no record types")]
    EmptySubscription,

    /// Unknown device mnemonic
    #[error("unknown device: {0}")]
    UnknownDevice(String),
}

/// Convenient Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
