//! Remote-control request/reply state machine.
//!
//! Subscribing, unsubscribing and requesting single records all follow the
//! same exchange: send one 7500 record, wait for exactly one reply, and
//! interpret it as ACK (7501) or NAK (7502).
//!
//! # Architecture: Action-Based State Machine
//!
//! [`Subscription`] holds no transport and no clock. Its methods take the
//! current time and return [`SubscriptionAction`]s for a driver to execute.
//! [`request`] is the async driver used by the reader.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  start   ┌──────┐  ACK   ┌───────┐
//! │ Idle │─────────>│ Sent │───────>│ Acked │
//! └──────┘          └──────┘        └───────┘
//!                       │
//!                       │ NAK / timeout / transport error / bad reply
//!                       ↓
//!                   ┌────────┐
//!                   │ Failed │
//!                   └────────┘
//! ```
//!
//! There are no retries. A caller wanting another attempt starts a new
//! `Subscription`; [`SubscriptionFailure::is_transient`] tells whether that
//! is worth doing.

use std::time::{Duration, Instant};

use r7k_proto::{
    Ack, ControlReply, DataRecordFrameHeader, Frame, MessageBuilder, NetworkFrameHeader,
    ProtocolError, RemoteControl, Time7k, TrackingNumber,
};
use tracing::{debug, info, warn};

use crate::{
    env::Environment,
    error::{SubscriptionError, SubscriptionFailure, TransportError},
    parser::MIN_CANDIDATE_SIZE,
    transport::ByteTransport,
};

/// Actions returned by the subscription state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionAction {
    /// Write these bytes to the transport
    Send(Vec<u8>),

    /// The exchange finished
    Complete(SubscriptionOutcome),
}

/// Final result of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// Device acknowledged the request
    Acked(Ack),
    /// Request failed
    Failed(SubscriptionFailure),
}

/// Subscription state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Nothing sent yet
    Idle,
    /// Request sent, waiting for the reply
    Sent,
    /// Reply was an ACK
    Acked,
    /// Reply was a NAK, or no usable reply arrived
    Failed,
}

/// Subscription configuration
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// How long to wait for the reply
    pub timeout: Duration,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(5) }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: u32,
    tracking_number: TrackingNumber,
    sent_at: Instant,
}

/// One remote-control exchange.
#[derive(Debug, Clone)]
pub struct Subscription {
    state: SubscriptionState,
    config: SubscriptionConfig,
    pending: Option<Pending>,
    outcome: Option<SubscriptionOutcome>,
}

impl Subscription {
    /// Create an exchange in [`SubscriptionState::Idle`]
    pub fn new(config: SubscriptionConfig) -> Self {
        Self { state: SubscriptionState::Idle, config, pending: None, outcome: None }
    }

    /// Get current state
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Final outcome, once `Acked` or `Failed`
    #[must_use]
    pub fn outcome(&self) -> Option<&SubscriptionOutcome> {
        self.outcome.as_ref()
    }

    /// When the reply wait expires (while `Sent`)
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.sent_at + self.config.timeout)
    }

    /// Time left before the deadline, zero once it has passed
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline().map_or(Duration::ZERO, |deadline| deadline.saturating_duration_since(now))
    }

    /// Build the request and move to `Sent`.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless `Idle`; `Protocol` if the request cannot be
    /// encoded.
    pub fn start(
        &mut self,
        builder: &mut MessageBuilder,
        command: RemoteControl,
        time: Time7k,
        now: Instant,
    ) -> Result<Vec<SubscriptionAction>, SubscriptionError> {
        if self.state != SubscriptionState::Idle {
            return Err(SubscriptionError::InvalidState {
                state: self.state,
                operation: "start".to_string(),
            });
        }

        let remcon_id = command.id();
        let message = builder.remote_control(command, time)?;

        debug!(
            ?remcon_id,
            ticket = message.ticket,
            tx_id = message.tx_id,
            bytes = message.bytes.len(),
            "sending remote control request"
        );

        self.state = SubscriptionState::Sent;
        self.pending = Some(Pending {
            ticket: message.ticket,
            tracking_number: message.tracking_number,
            sent_at: now,
        });

        Ok(vec![SubscriptionAction::Send(message.bytes)])
    }

    /// Process the reply frame.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless `Sent`.
    pub fn handle_frame(
        &mut self,
        frame: &Frame,
        _now: Instant,
    ) -> Result<Vec<SubscriptionAction>, SubscriptionError> {
        let pending = self.expect_sent("handle_frame")?;
        let record_type_id = frame.drf.record_type_id();

        let outcome = match ControlReply::from_record(record_type_id, &frame.data) {
            Ok(ControlReply::Ack(ack)) if ack.ticket == pending.ticket => {
                info!(ticket = ack.ticket, "remote control request acknowledged");
                SubscriptionOutcome::Acked(ack)
            },
            Ok(ControlReply::Nak(nak)) if nak.ticket == pending.ticket => {
                warn!(ticket = nak.ticket, error_code = nak.error_code, "remote control request rejected");
                SubscriptionOutcome::Failed(SubscriptionFailure::Nak { error_code: nak.error_code })
            },
            Ok(reply) => {
                warn!(expected = pending.ticket, received = reply.ticket(), "reply ticket mismatch");
                SubscriptionOutcome::Failed(SubscriptionFailure::InvalidReply(format!(
                    "reply for ticket {} while waiting for {}",
                    reply.ticket(),
                    pending.ticket
                )))
            },
            Err(ProtocolError::UnexpectedRecordType(record_type_id)) => {
                warn!(record_type_id, "unexpected record in place of reply");
                SubscriptionOutcome::Failed(SubscriptionFailure::UnexpectedRecord { record_type_id })
            },
            Err(err) => {
                warn!(error = %err, "malformed reply");
                SubscriptionOutcome::Failed(SubscriptionFailure::InvalidReply(err.to_string()))
            },
        };

        Ok(self.finish(outcome))
    }

    /// Fail because the reply could not be decoded
    pub fn handle_invalid_reply(
        &mut self,
        err: &ProtocolError,
    ) -> Result<Vec<SubscriptionAction>, SubscriptionError> {
        self.expect_sent("handle_invalid_reply")?;
        warn!(error = %err, "invalid reply frame");
        Ok(self.finish(SubscriptionOutcome::Failed(SubscriptionFailure::InvalidReply(
            err.to_string(),
        ))))
    }

    /// Fail because the transport failed.
    ///
    /// A transport timeout becomes [`SubscriptionFailure::Timeout`]. Its
    /// `elapsed` is measured on the `now` clock but is never shorter than the
    /// wait the transport reported, since the two clocks may differ.
    pub fn handle_transport_error(
        &mut self,
        err: TransportError,
        now: Instant,
    ) -> Result<Vec<SubscriptionAction>, SubscriptionError> {
        if let TransportError::Timeout { elapsed } = err {
            return self.fail_timeout(now, elapsed);
        }

        self.expect_sent("handle_transport_error")?;
        warn!(error = %err, "transport failed during remote control request");
        Ok(self.finish(SubscriptionOutcome::Failed(SubscriptionFailure::Transport(err))))
    }

    /// Fail with a timeout
    pub fn handle_timeout(
        &mut self,
        now: Instant,
    ) -> Result<Vec<SubscriptionAction>, SubscriptionError> {
        self.fail_timeout(now, Duration::ZERO)
    }

    fn fail_timeout(
        &mut self,
        now: Instant,
        waited: Duration,
    ) -> Result<Vec<SubscriptionAction>, SubscriptionError> {
        let pending = self.expect_sent("handle_timeout")?;
        let elapsed = now.saturating_duration_since(pending.sent_at).max(waited);

        warn!(ticket = pending.ticket, ?elapsed, "no reply to remote control request");
        Ok(self.finish(SubscriptionOutcome::Failed(SubscriptionFailure::Timeout { elapsed })))
    }

    /// Check the deadline; fails with a timeout once it has passed
    pub fn tick(&mut self, now: Instant) -> Vec<SubscriptionAction> {
        match self.deadline() {
            Some(deadline) if self.state == SubscriptionState::Sent && now >= deadline => {
                self.handle_timeout(now).unwrap_or_default()
            },
            _ => Vec::new(),
        }
    }

    fn expect_sent(&self, operation: &str) -> Result<Pending, SubscriptionError> {
        match (self.state, self.pending) {
            (SubscriptionState::Sent, Some(pending)) => Ok(pending),
            _ => Err(SubscriptionError::InvalidState {
                state: self.state,
                operation: operation.to_string(),
            }),
        }
    }

    fn finish(&mut self, outcome: SubscriptionOutcome) -> Vec<SubscriptionAction> {
        self.state = match outcome {
            SubscriptionOutcome::Acked(_) => SubscriptionState::Acked,
            SubscriptionOutcome::Failed(_) => SubscriptionState::Failed,
        };
        self.outcome = Some(outcome.clone());
        vec![SubscriptionAction::Complete(outcome)]
    }
}

/// Run one remote-control exchange over `transport`.
///
/// Returns the outcome; `Err` only for misuse or an unencodable request.
pub async fn request<T, E>(
    transport: &mut T,
    env: &E,
    builder: &mut MessageBuilder,
    command: RemoteControl,
    config: SubscriptionConfig,
) -> Result<SubscriptionOutcome, SubscriptionError>
where
    T: ByteTransport + ?Sized,
    E: Environment<Instant = Instant>,
{
    let mut subscription = Subscription::new(config);
    let time = Time7k::from_datetime(&env.wall_clock());

    let mut actions = subscription.start(builder, command, time, env.now())?;

    loop {
        for action in std::mem::take(&mut actions) {
            match action {
                SubscriptionAction::Send(bytes) => {
                    if let Err(err) = transport.send(&bytes).await {
                        actions.extend(subscription.handle_transport_error(err, env.now())?);
                    }
                },
                SubscriptionAction::Complete(outcome) => return Ok(outcome),
            }
        }

        if !actions.is_empty() {
            continue;
        }

        let remaining = subscription.remaining(env.now());
        actions = match recv_frame(transport, remaining).await {
            Ok(Ok(frame)) => subscription.handle_frame(&frame, env.now())?,
            Ok(Err(err)) => subscription.handle_invalid_reply(&err)?,
            Err(err) => subscription.handle_transport_error(err, env.now())?,
        };
    }
}

/// Subscribe to `record_types`; see [`request`].
pub async fn subscribe<T, E>(
    transport: &mut T,
    env: &E,
    builder: &mut MessageBuilder,
    record_types: &[u32],
    config: SubscriptionConfig,
) -> Result<SubscriptionOutcome, SubscriptionError>
where
    T: ByteTransport + ?Sized,
    E: Environment<Instant = Instant>,
{
    let command = RemoteControl::Subscribe { record_types: record_types.to_vec() };
    request(transport, env, builder, command, config).await
}

/// Receive exactly one frame within `timeout`.
///
/// The header and body reads share the deadline, so a reply that stalls
/// part way cannot extend the wait.
async fn recv_frame<T>(
    transport: &mut T,
    timeout: Duration,
) -> Result<Result<Frame, ProtocolError>, TransportError>
where
    T: ByteTransport + ?Sized,
{
    if timeout.is_zero() {
        return Err(TransportError::Timeout { elapsed: timeout });
    }

    tokio::time::timeout(timeout, read_reply(transport, timeout))
        .await
        .map_err(|_| TransportError::Timeout { elapsed: timeout })?
}

/// Headers first, then the rest of the record
async fn read_reply<T>(
    transport: &mut T,
    timeout: Duration,
) -> Result<Result<Frame, ProtocolError>, TransportError>
where
    T: ByteTransport + ?Sized,
{
    let mut bytes = vec![0u8; MIN_CANDIDATE_SIZE];
    transport.recv_exact(&mut bytes, timeout).await?;

    let record_size = match check_headers(&bytes) {
        Ok(size) => size,
        Err(err) => return Ok(Err(err)),
    };

    bytes.resize(NetworkFrameHeader::SIZE + record_size, 0);
    transport.recv_exact(&mut bytes[MIN_CANDIDATE_SIZE..], timeout).await?;

    Ok(Frame::decode(&bytes))
}

fn check_headers(bytes: &[u8]) -> Result<usize, ProtocolError> {
    NetworkFrameHeader::from_bytes(bytes)?;
    let drf = DataRecordFrameHeader::from_bytes(&bytes[NetworkFrameHeader::SIZE..])?;

    let size = drf.size() as usize;
    let max = DataRecordFrameHeader::MIN_RECORD_SIZE + Frame::MAX_DATA_SIZE;
    if size < DataRecordFrameHeader::MIN_RECORD_SIZE {
        return Err(ProtocolError::RecordSizeTooSmall(drf.size()));
    }
    if size > max {
        return Err(ProtocolError::PayloadTooLarge { size, max });
    }
    Ok(size)
}
