//! Stream parser with corruption resynchronization.
//!
//! [`parse`] walks a raw byte slice received from a 7k center, copies every
//! valid data record frame into a [`FrameContainer`] and reports what it did
//! in a [`ParseStatus`].
//!
//! # Candidates
//!
//! At each position the parser reads a 36-byte NF header followed by a
//! 64-byte DRF header. The position is **header-valid** when both headers
//! pass their plausibility checks (versions, packet count, sizes, sync
//! pattern). A header-valid position is accepted when its record is large
//! enough to hold a checksum and the checksum matches (or is not claimed).
//!
//! # Resynchronization
//!
//! The stream has no escape sequences, so a corrupted position is left one
//! byte at a time until the next header-valid position. Every skipped byte
//! counts toward `sync_bytes`; each contiguous skipped span counts once
//! toward `resync_count`. When several header-valid positions overlap, the
//! first one wins.
//!
//! # Stopping
//!
//! - Fewer than 100 bytes remain: the rest is `unread_bytes`
//! - A header-valid record runs past the end of `src`: the bytes from its NF
//!   start are `unread_bytes`, to be parsed again once more data arrives
//! - The container is full: status [`ParseOutcome::OutOfSpace`]

use std::fmt;

use r7k_proto::{DataRecord, DataRecordFrameHeader, NetworkFrameHeader, ProtocolError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::container::FrameContainer;

/// Smallest window the parser inspects: NF header plus DRF header
pub const MIN_CANDIDATE_SIZE: usize = NetworkFrameHeader::SIZE + DataRecordFrameHeader::SIZE;

/// How a parse call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseOutcome {
    /// Source consumed as far as possible
    #[default]
    Ok,
    /// Container filled up; flush or grow it before the next call
    OutOfSpace,
}

impl fmt::Display for ParseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::OutOfSpace => write!(f, "out-of-space"),
        }
    }
}

/// Statistics of one (or, accumulated, several) parse calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseStatus {
    /// Bytes offered to the parser
    pub src_bytes: usize,
    /// Bytes skipped while resynchronizing
    pub sync_bytes: usize,
    /// Bytes left at the end of the source
    pub unread_bytes: usize,
    /// Frames stored in the container
    pub parsed_records: usize,
    /// Sum of the stored frame sizes
    pub parsed_bytes: usize,
    /// Number of contiguous corrupted spans
    pub resync_count: usize,
    /// How the call ended
    pub status: ParseOutcome,
}

impl ParseStatus {
    /// Add the counters of `other` to these; the outcome becomes `other`'s.
    pub fn accumulate(&mut self, other: &ParseStatus) {
        self.src_bytes += other.src_bytes;
        self.sync_bytes += other.sync_bytes;
        self.unread_bytes += other.unread_bytes;
        self.parsed_records += other.parsed_records;
        self.parsed_bytes += other.parsed_bytes;
        self.resync_count += other.resync_count;
        self.status = other.status;
    }

    /// Bytes consumed from the front of the source
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.src_bytes - self.unread_bytes
    }
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[src_bytes      {:>10}]", self.src_bytes)?;
        writeln!(f, "[sync_bytes     {:>10}]", self.sync_bytes)?;
        writeln!(f, "[unread_bytes   {:>10}]", self.unread_bytes)?;
        writeln!(f, "[parsed_records {:>10}]", self.parsed_records)?;
        writeln!(f, "[parsed_bytes   {:>10}]", self.parsed_bytes)?;
        writeln!(f, "[resync_count   {:>10}]", self.resync_count)?;
        write!(f, "[status         {:>10}]", self.status.to_string())
    }
}

enum Candidate<'a> {
    Record(DataRecord<'a>),
    Truncated { needed: usize },
    Invalid,
}

fn candidate(window: &[u8]) -> Candidate<'_> {
    if NetworkFrameHeader::from_bytes(window).is_err() {
        return Candidate::Invalid;
    }

    match DataRecord::parse(&window[NetworkFrameHeader::SIZE..]) {
        Ok(record) => Candidate::Record(record),
        Err(ProtocolError::FrameTruncated { expected, .. }) => {
            Candidate::Truncated { needed: NetworkFrameHeader::SIZE + expected }
        },
        Err(_) => Candidate::Invalid,
    }
}

/// Parse `src` into `container`.
///
/// Never fails: corruption is skipped and counted, a short tail is left
/// unread, and a full container ends the call with
/// [`ParseOutcome::OutOfSpace`].
pub fn parse(src: &[u8], container: &mut FrameContainer) -> ParseStatus {
    let mut status = ParseStatus { src_bytes: src.len(), ..ParseStatus::default() };
    let mut pos = 0;
    let mut span_start: Option<usize> = None;

    while src.len() - pos >= MIN_CANDIDATE_SIZE {
        match candidate(&src[pos..]) {
            Candidate::Record(record) => {
                if let Some(start) = span_start.take() {
                    debug!(offset = start, skipped = pos - start, "resynchronized");
                }

                if let Err(err) = container.add(record.as_bytes()) {
                    warn!(offset = pos, error = %err, "container full, stopping parse");
                    status.status = ParseOutcome::OutOfSpace;
                    break;
                }

                pos += NetworkFrameHeader::SIZE + record.len();
                status.parsed_records += 1;
                status.parsed_bytes += record.len();
            },
            Candidate::Truncated { needed } => {
                debug!(offset = pos, needed, available = src.len() - pos, "truncated frame at end of input");
                break;
            },
            Candidate::Invalid => {
                if span_start.is_none() {
                    span_start = Some(pos);
                    status.resync_count += 1;
                }
                status.sync_bytes += 1;
                pos += 1;
            },
        }
    }

    if let Some(start) = span_start {
        debug!(offset = start, skipped = pos - start, "input ended while resynchronizing");
    }

    status.unread_bytes = src.len() - pos;
    status
}
