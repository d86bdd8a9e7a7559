//! Streaming client for a 7k center.
//!
//! [`Reader`] ties the pieces together: it owns a transport, a message
//! builder and a frame container; it subscribes to record types, pulls raw
//! bytes off the connection and feeds them through the stream parser.
//!
//! # Lifecycle
//!
//! ```text
//! ┌───────────┐  subscribe (ACK)  ┌────────────┐
//! │ Connected │──────────────────>│ Subscribed │
//! └───────────┘<──────────────────└────────────┘
//!       │        failure/unsubscribe      │
//!       │ peer closed                     │ peer closed
//!       ↓                                 ↓
//!  ┌────────┐                        ┌────────┐
//!  │ Closed │                        │ Closed │
//!  └────────┘                        └────────┘
//! ```
//!
//! Bytes that end in the middle of a frame are kept and parsed together with
//! the next read, so frames split across TCP segments are not lost.

use std::time::{Duration, Instant};

use r7k_proto::{Device, MessageBuilder, RemoteControl};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    container::{FrameContainer, FrameView},
    env::Environment,
    error::{ReaderError, SubscriptionFailure, TransportError},
    parser::{self, ParseOutcome, ParseStatus},
    subscription::{self, SubscriptionConfig, SubscriptionOutcome},
    transport::ByteTransport,
};

/// Reader state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReaderState {
    /// Connection open, no active subscription
    Connected,
    /// Subscription acknowledged; records are streaming
    Subscribed,
    /// Peer closed the connection
    Closed,
}

/// Reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Frame container capacity in bytes
    pub capacity: usize,
    /// Record types to subscribe to
    pub subscriptions: Vec<u32>,
    /// Device addressed by control requests
    pub device: Device,
    /// Reply wait for remote-control requests
    pub subscribe_timeout: Duration,
    /// Wait for data on each read
    pub poll_timeout: Duration,
    /// Bytes requested per read
    pub read_chunk: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            capacity: 256 * 1024,
            subscriptions: Vec::new(),
            device: Device::default(),
            subscribe_timeout: Duration::from_secs(5),
            poll_timeout: Duration::from_millis(350),
            read_chunk: 16 * 1024,
        }
    }
}

impl ReaderConfig {
    /// Set the container capacity
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the subscribed record types
    #[must_use]
    pub fn with_subscriptions(mut self, subscriptions: impl Into<Vec<u32>>) -> Self {
        self.subscriptions = subscriptions.into();
        self
    }

    /// Set the target device
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Set the remote-control reply timeout
    #[must_use]
    pub fn with_subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }

    /// Set the per-read timeout
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the read size
    #[must_use]
    pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk;
        self
    }
}

/// Subscribing client over one connection.
pub struct Reader<T, E> {
    transport: T,
    env: E,
    config: ReaderConfig,
    builder: MessageBuilder,
    container: FrameContainer,
    state: ReaderState,
    /// Unparsed bytes carried to the next read
    pending: Vec<u8>,
    chunk: Vec<u8>,
    stats: ParseStatus,
}

impl<T, E> Reader<T, E>
where
    T: ByteTransport,
    E: Environment<Instant = Instant>,
{
    /// Create a reader over an open connection
    pub fn new(transport: T, env: E, config: ReaderConfig) -> Self {
        Self {
            builder: MessageBuilder::new(config.device),
            container: FrameContainer::with_capacity(config.capacity),
            chunk: vec![0; config.read_chunk],
            pending: Vec::new(),
            state: ReaderState::Connected,
            stats: ParseStatus::default(),
            transport,
            env,
            config,
        }
    }

    /// Get current state
    #[must_use]
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Cumulative parse statistics
    #[must_use]
    pub fn stats(&self) -> &ParseStatus {
        &self.stats
    }

    /// Frames parsed so far
    #[must_use]
    pub fn container(&self) -> &FrameContainer {
        &self.container
    }

    /// Mutable access for enumeration, reads and resizing
    pub fn container_mut(&mut self) -> &mut FrameContainer {
        &mut self.container
    }

    /// Restart enumeration of the parsed frames
    pub fn enumerate_first(&mut self) -> Option<FrameView<'_>> {
        self.container.enumerate_first()
    }

    /// Next parsed frame
    pub fn enumerate_next(&mut self) -> Option<FrameView<'_>> {
        self.container.enumerate_next()
    }

    /// Copy parsed bytes sequentially from the container
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        self.container.read(dest)
    }

    /// True if subscribed and `record_type` is one of the subscriptions
    #[must_use]
    pub fn is_subscribed(&self, record_type: u32) -> bool {
        self.state == ReaderState::Subscribed && self.config.subscriptions.contains(&record_type)
    }

    /// Subscribe to the configured record types.
    ///
    /// On failure the reader returns to `Connected` (or `Closed` if the peer
    /// went away) and the failure is returned.
    pub async fn subscribe(&mut self) -> Result<(), ReaderError> {
        let command = RemoteControl::Subscribe { record_types: self.config.subscriptions.clone() };
        self.control("subscribe", command).await?;

        self.transition(ReaderState::Subscribed);
        Ok(())
    }

    /// Cancel the subscription
    pub async fn unsubscribe(&mut self) -> Result<(), ReaderError> {
        self.control("unsubscribe", RemoteControl::Unsubscribe).await?;

        self.transition(ReaderState::Connected);
        Ok(())
    }

    /// Ask the device for one record of `record_type`
    pub async fn request_record(&mut self, record_type: u32) -> Result<(), ReaderError> {
        self.control("request_record", RemoteControl::RequestRecord { record_type }).await
    }

    /// Read raw bytes from the connection, bypassing the parser.
    pub async fn poll(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, ReaderError> {
        self.ensure_open("poll")?;
        self.recv(buf, timeout).await
    }

    /// Read one chunk and parse it into the container.
    ///
    /// Returns the status of this call; [`Reader::stats`] accumulates all
    /// calls. A read timeout is returned as a transient error.
    ///
    /// On [`ParseOutcome::OutOfSpace`] the unparsed input is kept; flush the
    /// container through [`Reader::container_mut`] and call again. Otherwise
    /// a backlog larger than the container is dropped as unsyncable.
    pub async fn read_frames(&mut self) -> Result<ParseStatus, ReaderError> {
        self.ensure_open("read_frames")?;

        let mut chunk = std::mem::take(&mut self.chunk);
        let received = self.recv(&mut chunk, self.config.poll_timeout).await;
        if let Ok(n) = received {
            self.pending.extend_from_slice(&chunk[..n]);
        }
        self.chunk = chunk;
        received?;

        let status = parser::parse(&self.pending, &mut self.container);
        self.pending.drain(..status.consumed());
        self.stats.accumulate(&status);

        if status.status != ParseOutcome::OutOfSpace
            && self.pending.len() > self.container.capacity()
        {
            warn!(
                discarded = self.pending.len(),
                capacity = self.container.capacity(),
                "unparsed backlog exceeds container, discarding"
            );
            self.stats.sync_bytes += self.pending.len();
            self.pending.clear();
        }

        Ok(status)
    }

    /// Empty the container and forget any carried partial frame
    pub fn purge(&mut self) {
        debug!(frames = self.container.frame_count(), carried = self.pending.len(), "purging");
        self.container.flush();
        self.pending.clear();
    }

    /// Read and discard input until a read times out or `max_reads` reads
    /// have been made. Returns the number of bytes discarded.
    pub async fn drain(&mut self, timeout: Duration, max_reads: usize) -> Result<usize, ReaderError> {
        self.ensure_open("drain")?;

        let mut chunk = std::mem::take(&mut self.chunk);
        let mut discarded = 0;
        let mut result = Ok(());

        for _ in 0..max_reads {
            match self.recv(&mut chunk, timeout).await {
                Ok(n) => discarded += n,
                Err(ReaderError::Transport(TransportError::Timeout { .. })) => break,
                Err(err) => {
                    result = Err(err);
                    break;
                },
            }
        }
        self.chunk = chunk;
        self.pending.clear();

        debug!(discarded, "drained input");
        result.map(|()| discarded)
    }

    async fn control(
        &mut self,
        operation: &str,
        command: RemoteControl,
    ) -> Result<(), ReaderError> {
        self.ensure_open(operation)?;

        let config = SubscriptionConfig { timeout: self.config.subscribe_timeout };
        let outcome =
            subscription::request(&mut self.transport, &self.env, &mut self.builder, command, config)
                .await?;

        match outcome {
            SubscriptionOutcome::Acked(_) => Ok(()),
            SubscriptionOutcome::Failed(failure) => {
                let next = match &failure {
                    SubscriptionFailure::Transport(TransportError::Closed) => ReaderState::Closed,
                    _ => ReaderState::Connected,
                };
                self.transition(next);
                Err(ReaderError::Subscription(failure))
            },
        }
    }

    async fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, ReaderError> {
        match self.transport.recv(buf, timeout).await {
            Ok(n) => Ok(n),
            Err(TransportError::Closed) => {
                self.transition(ReaderState::Closed);
                Err(ReaderError::Transport(TransportError::Closed))
            },
            Err(err) => Err(err.into()),
        }
    }

    fn ensure_open(&self, operation: &str) -> Result<(), ReaderError> {
        if self.state == ReaderState::Closed {
            return Err(ReaderError::InvalidState {
                state: self.state,
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: ReaderState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "reader state changed");
            self.state = next;
        }
    }
}
