//! r7k core logic
//!
//! This crate contains everything between raw bytes and parsed records: the
//! frame container, the resynchronizing stream parser, the remote-control
//! state machine and the streaming reader. It opens no sockets itself.
//!
//! # Architecture: "The Hollow Shell"
//!
//! Protocol logic is strictly separated from transport concerns:
//!
//! ```text
//!      ┌────────────────────────────┐
//!      │ r7k-core                   │
//!      │ - Stream parser            │
//!      │ - Frame container          │
//!      │ - Subscription state       │
//!      └────────────────────────────┘
//!         ↓                      ↓
//! ┌────────────────┐  ┌────────────────┐
//! │ r7k-harness    │  │ r7k-stream     │
//! │ (Turmoil)      │  │ (Tokio TCP)    │
//! │ - Virtual time │  │ - Real network │
//! │ - Emulated 7k  │  │ - System clock │
//! │ - Noise inject │  │ - CLI          │
//! └────────────────┘  └────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - No I/O in Core: bytes arrive through [`ByteTransport`], time through
//!   [`Environment`]
//! - Never fail on bad input: corruption is skipped and counted in
//!   [`ParseStatus`]
//! - Single owner: a [`FrameContainer`] is not synchronized; hand it between
//!   producer and consumer instead of sharing it
//!
//! # Modules
//!
//! - [`container`]: Frame buffer, index and cursors
//! - [`parser`]: Stream parser with resynchronization
//! - [`subscription`]: Remote-control request/reply state machine
//! - [`reader`]: Streaming client
//! - [`env`]: Environment abstraction (time)
//! - [`transport`]: Transport abstraction (byte streams)
//! - [`error`]: Error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod container;
pub mod env;
pub mod error;
pub mod parser;
pub mod reader;
pub mod subscription;
pub mod transport;

pub use container::{FrameContainer, FrameView};
pub use env::{Environment, SystemEnv};
pub use error::{ContainerError, ReaderError, SubscriptionError, SubscriptionFailure, TransportError};
pub use parser::{ParseOutcome, ParseStatus, parse};
pub use reader::{Reader, ReaderConfig, ReaderState};
pub use subscription::{
    Subscription, SubscriptionAction, SubscriptionConfig, SubscriptionOutcome, SubscriptionState,
};
pub use transport::{ByteTransport, StreamTransport};
