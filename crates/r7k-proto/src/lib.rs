//! # r7k Protocol: Wire Format
//!
//! This crate implements the binary framing of the Reson 7k data interface:
//! the records a 7k center streams to subscribers and the remote-control
//! requests used to manage subscriptions.
//!
//! ## Protocol Design
//!
//! Every transmission unit is one network frame carrying one data record:
//! - **NetworkFrameHeader**: 36 bytes of packet bookkeeping (sizes, tx id,
//!   addressing)
//! - **DataRecordFrameHeader**: 64 bytes describing the record (sync pattern,
//!   size, time stamp, record type, device, flags)
//! - **Record data**: opaque, interpreted by record type
//! - **Checksum**: 4-byte wrapping sum of the DRF header and data
//!
//! The stream has no escape sequences. A reader recovers from corruption by
//! scanning for a position where the fixed header fields are plausible; the
//! predicates live on the header types so every layer applies the same rules.
//!
//! ## Implementation Notes
//!
//! - **Zero-Copy Parsing**: Headers are cast from received bytes with
//!   [`zerocopy`](https://docs.rs/zerocopy). Every bit pattern is a valid
//!   header value; plausibility is checked explicitly afterwards.
//!
//! - **Host Byte Order**: Multi-byte fields use the host's native order, as
//!   7k devices do. See [`header`] for the consequences.
//!
//! - **No I/O**: Building and decoding are pure. Time stamps are the only
//!   ambient input, and every builder has a variant taking an explicit time.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checksum;
pub mod device;
pub mod errors;
pub mod flags;
pub mod frame;
pub mod header;
pub mod message;
pub mod payloads;
pub mod record_types;
pub mod time;

pub use device::Device;
pub use errors::{ProtocolError, Result};
pub use flags::RecordFlags;
pub use frame::{DataRecord, Frame};
pub use header::{DataRecordFrameHeader, NetworkFrameHeader};
pub use message::{ControlMessage, MessageBuilder};
pub use payloads::{Ack, ControlReply, ControlRequest, Nak, RemoteControl, TrackingNumber};
pub use record_types::{RecordType, RemoteControlId};
pub use time::Time7k;
