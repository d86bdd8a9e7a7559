//! Error types for the r7k core.
//!
//! This module provides strongly-typed errors for different layers:
//! - Container errors (capacity, bounds)
//! - Transport errors (timeouts, closed peer, I/O failures)
//! - Subscription errors (state transitions) and failures (request outcome)
//! - Reader errors (everything a streaming client can surface)
//!
//! Parse-time corruption is not an error: the stream parser recovers by
//! resynchronizing and reports what it skipped in its status.

use std::{fmt, io, time::Duration};

use thiserror::Error;

use crate::{reader::ReaderState, subscription::SubscriptionState};

/// Errors from [`crate::FrameContainer`] operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerError {
    /// Frame does not fit in the remaining capacity
    #[error("out of space: frame needs {needed} bytes, {available} available")]
    OutOfSpace {
        /// Size of the rejected frame
        needed: usize,
        /// Remaining capacity at the time of the call
        available: usize,
    },

    /// Offset or range lies outside the allowed bounds
    #[error("out of range: {len} bytes at offset {offset} exceed limit {limit}")]
    OutOfRange {
        /// Requested offset
        offset: usize,
        /// Requested length
        len: usize,
        /// Bound the request was checked against
        limit: usize,
    },

    /// Resize to a smaller capacity was requested
    #[error("cannot shrink container from {current} to {requested} bytes")]
    ShrinkUnsupported {
        /// Current capacity
        current: usize,
        /// Requested capacity
        requested: usize,
    },
}

/// Errors from a [`crate::ByteTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No data arrived within the allotted time
    Timeout {
        /// How long we waited
        elapsed: Duration,
    },

    /// Peer closed the connection
    Closed,

    /// Underlying I/O failure
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { elapsed } => write!(f, "transport timeout after {:?}", elapsed),
            Self::Closed => write!(f, "transport closed by peer"),
            Self::Io(msg) => write!(f, "transport I/O error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Only timeouts qualify. A closed or failed socket stays broken.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                TransportError::Timeout { elapsed: Duration::ZERO }
            },
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => TransportError::Closed,
            _ => TransportError::Io(err.to_string()),
        }
    }
}

/// Convert TransportError to io::Error at async I/O boundaries.
impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Timeout { .. } => io::ErrorKind::TimedOut,
            TransportError::Closed => io::ErrorKind::UnexpectedEof,
            TransportError::Io(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err.to_string())
    }
}

/// Misuse of the subscription state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Invalid state transition attempted
    InvalidState {
        /// Current state when error occurred
        state: SubscriptionState,
        /// Operation that was attempted
        operation: String,
    },

    /// Request could not be encoded
    Protocol(String),
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { state, operation } => {
                write!(f, "invalid state transition: cannot {} from {:?}", operation, state)
            },
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for SubscriptionError {}

impl From<r7k_proto::ProtocolError> for SubscriptionError {
    fn from(err: r7k_proto::ProtocolError) -> Self {
        SubscriptionError::Protocol(err.to_string())
    }
}

/// Why a remote-control request ended in the `Failed` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionFailure {
    /// No reply arrived before the deadline
    Timeout {
        /// Time since the request was sent, on the environment clock, and at
        /// least as long as the transport's own wait
        elapsed: Duration,
    },

    /// Sending the request or receiving the reply failed
    Transport(TransportError),

    /// Device rejected the request
    Nak {
        /// Device-specific reason code
        error_code: u32,
    },

    /// Reply frame failed validation
    InvalidReply(String),

    /// Reply was a valid frame but not an ACK/NAK for this request
    UnexpectedRecord {
        /// Record type of the reply
        record_type_id: u32,
    },
}

impl fmt::Display for SubscriptionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { elapsed } => write!(f, "no reply after {:?}", elapsed),
            Self::Transport(err) => write!(f, "{}", err),
            Self::Nak { error_code } => write!(f, "request rejected with error code {}", error_code),
            Self::InvalidReply(msg) => write!(f, "invalid reply: {}", msg),
            Self::UnexpectedRecord { record_type_id } => {
                write!(f, "unexpected reply record type {}", record_type_id)
            },
        }
    }
}

impl std::error::Error for SubscriptionFailure {}

impl SubscriptionFailure {
    /// Returns true if repeating the request may succeed.
    ///
    /// A NAK is a definite answer from the device and is never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            SubscriptionFailure::Timeout { .. } => true,
            SubscriptionFailure::Transport(err) => err.is_transient(),
            SubscriptionFailure::Nak { .. }
            | SubscriptionFailure::InvalidReply(_)
            | SubscriptionFailure::UnexpectedRecord { .. } => false,
        }
    }
}

impl From<TransportError> for SubscriptionFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout { elapsed } => SubscriptionFailure::Timeout { elapsed },
            other => SubscriptionFailure::Transport(other),
        }
    }
}

/// Errors surfaced by [`crate::Reader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// Operation not allowed in the current reader state
    InvalidState {
        /// Current state
        state: ReaderState,
        /// Operation that was attempted
        operation: String,
    },

    /// Remote-control request failed
    Subscription(SubscriptionFailure),

    /// Transport failed outside a request
    Transport(TransportError),

    /// Container rejected an operation
    Container(ContainerError),

    /// Protocol error while building a request
    Protocol(String),
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { state, operation } => {
                write!(f, "invalid reader state: cannot {} while {:?}", operation, state)
            },
            Self::Subscription(err) => write!(f, "subscription failed: {}", err),
            Self::Transport(err) => write!(f, "{}", err),
            Self::Container(err) => write!(f, "container error: {}", err),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for ReaderError {}

impl ReaderError {
    /// Returns true if this error is transient and may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ReaderError::Subscription(err) => err.is_transient(),
            ReaderError::Transport(err) => err.is_transient(),
            ReaderError::InvalidState { .. }
            | ReaderError::Container(_)
            | ReaderError::Protocol(_) => false,
        }
    }
}

impl From<TransportError> for ReaderError {
    fn from(err: TransportError) -> Self {
        ReaderError::Transport(err)
    }
}

impl From<SubscriptionFailure> for ReaderError {
    fn from(err: SubscriptionFailure) -> Self {
        ReaderError::Subscription(err)
    }
}

impl From<ContainerError> for ReaderError {
    fn from(err: ContainerError) -> Self {
        ReaderError::Container(err)
    }
}

impl From<SubscriptionError> for ReaderError {
    fn from(err: SubscriptionError) -> Self {
        ReaderError::Protocol(err.to_string())
    }
}

impl From<r7k_proto::ProtocolError> for ReaderError {
    fn from(err: r7k_proto::ProtocolError) -> Self {
        ReaderError::Protocol(err.to_string())
    }
}

impl From<io::Error> for ReaderError {
    fn from(err: io::Error) -> Self {
        ReaderError::Transport(err.into())
    }
}

/// Convert ReaderError to io::Error for callers living in async I/O code.
impl From<ReaderError> for io::Error {
    fn from(err: ReaderError) -> Self {
        let kind = match &err {
            ReaderError::Transport(TransportError::Timeout { .. })
            | ReaderError::Subscription(SubscriptionFailure::Timeout { .. }) => {
                io::ErrorKind::TimedOut
            },
            ReaderError::Transport(TransportError::Closed) => io::ErrorKind::UnexpectedEof,
            ReaderError::InvalidState { .. }
            | ReaderError::Subscription(_)
            | ReaderError::Protocol(_) => io::ErrorKind::InvalidData,
            ReaderError::Transport(_) | ReaderError::Container(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_transient() {
        let timeout = TransportError::Timeout { elapsed: Duration::from_secs(5) };
        assert!(timeout.is_transient());
        assert!(SubscriptionFailure::from(timeout.clone()).is_transient());
        assert!(ReaderError::from(timeout).is_transient());
    }

    #[test]
    fn rejections_are_fatal() {
        assert!(!TransportError::Closed.is_transient());
        assert!(!SubscriptionFailure::Nak { error_code: 3 }.is_transient());
        assert!(!SubscriptionFailure::UnexpectedRecord { record_type_id: 7006 }.is_transient());
        assert!(!SubscriptionFailure::Transport(TransportError::Closed).is_transient());
        assert!(
            !ReaderError::Container(ContainerError::OutOfSpace { needed: 10, available: 4 })
                .is_transient()
        );
    }

    #[test]
    fn io_errors_map_to_transport_errors() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(TransportError::from(eof), TransportError::Closed);

        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert!(TransportError::from(timed_out).is_transient());

        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(TransportError::from(refused), TransportError::Io(_)));
    }

    #[test]
    fn io_boundary_preserves_kind() {
        let err: io::Error = TransportError::Timeout { elapsed: Duration::ZERO }.into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        let err: io::Error = ReaderError::Subscription(SubscriptionFailure::Nak { error_code: 1 }).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("error code 1"));
    }

    #[test]
    fn container_error_messages() {
        let err = ContainerError::OutOfRange { offset: 10, len: 4, limit: 12 };
        assert_eq!(err.to_string(), "out of range: 4 bytes at offset 10 exceed limit 12");
    }
}
