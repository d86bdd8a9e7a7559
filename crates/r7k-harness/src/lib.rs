//! Deterministic simulation harness for 7k telemetry testing.
//!
//! This crate provides Turmoil-based implementations of the `Environment`
//! and `ByteTransport` abstractions, plus an emulated 7k center, enabling
//! deterministic, reproducible testing of subscriptions and stream parsing
//! under virtual time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod sim_center;
mod sim_env;
mod sim_transport;

pub use sim_center::{CenterStats, ControlResponse, SimCenter, SimCenterConfig};
pub use sim_env::SimEnv;
pub use sim_transport::{SimStream, SimTransport};
