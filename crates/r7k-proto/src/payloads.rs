//! Remote-control record bodies.
//!
//! Control traffic travels in ordinary frames. A request is a
//! [`RecordType::RemoteControl`] (7500) record whose data starts with a
//! 24-byte remote-control header followed by a command-specific body. The
//! device answers with a 7501 (ACK) or 7502 (NAK) record echoing the ticket
//! and tracking number of the request.
//!
//! ```text
//! 7500: ┌──────────┬────────┬─────────────────┬──────────────┐
//!       │remcon_id │ ticket │ tracking (16 B) │ body         │
//!       └──────────┴────────┴─────────────────┴──────────────┘
//! 7501: ticket, tracking
//! 7502: ticket, tracking, error_code
//! ```
//!
//! All integers use host byte order, like the frame headers.

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::{
    RecordType, RemoteControlId,
    errors::{ProtocolError, Result},
};

/// 128-bit request tracking number.
///
/// Stored as 16 bytes and incremented as a little-endian integer, so byte 0
/// changes fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrackingNumber(pub [u8; 16]);

impl TrackingNumber {
    /// Size on the wire
    pub const SIZE: usize = 16;

    /// Add one, carrying into higher bytes and wrapping at 2^128.
    pub fn increment(&mut self) {
        for byte in &mut self.0 {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                break;
            }
        }
    }

    fn read(src: &mut impl Buf) -> Self {
        let mut raw = [0u8; Self::SIZE];
        src.copy_to_slice(&mut raw);
        Self(raw)
    }
}

/// A remote-control command and its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteControl {
    /// Subscribe to the listed record types
    Subscribe {
        /// Record type IDs to stream
        record_types: Vec<u32>,
    },
    /// Cancel all subscriptions
    Unsubscribe,
    /// Ask for a single record of the given type
    RequestRecord {
        /// Record type ID to send once
        record_type: u32,
    },
}

impl RemoteControl {
    /// Remote-control ID written into the header
    #[must_use]
    pub fn id(&self) -> RemoteControlId {
        match self {
            Self::Subscribe { .. } => RemoteControlId::Subscribe,
            Self::Unsubscribe => RemoteControlId::Unsubscribe,
            Self::RequestRecord { .. } => RemoteControlId::RequestRecord,
        }
    }

    /// Size of the body that follows the remote-control header
    #[must_use]
    pub fn body_len(&self) -> usize {
        match self {
            Self::Subscribe { record_types } => 4 + 4 * record_types.len(),
            Self::Unsubscribe => 0,
            Self::RequestRecord { .. } => 4,
        }
    }

    fn encode_body(&self, dst: &mut impl BufMut) {
        match self {
            Self::Subscribe { record_types } => {
                #[allow(clippy::cast_possible_truncation)]
                let count = record_types.len() as u32;
                dst.put_u32_ne(count);
                for id in record_types {
                    dst.put_u32_ne(*id);
                }
            },
            Self::Unsubscribe => {},
            Self::RequestRecord { record_type } => dst.put_u32_ne(*record_type),
        }
    }

    fn decode_body(id: RemoteControlId, body: &mut impl Buf) -> Result<Self> {
        match id {
            RemoteControlId::Subscribe => {
                let count = take_u32(body, "subscribe", "missing record count")? as usize;
                if body.remaining() / 4 < count {
                    return Err(malformed("subscribe", "record count exceeds body"));
                }
                let record_types = (0..count).map(|_| body.get_u32_ne()).collect();
                Ok(Self::Subscribe { record_types })
            },
            RemoteControlId::Unsubscribe => Ok(Self::Unsubscribe),
            RemoteControlId::RequestRecord => {
                let record_type = take_u32(body, "request record", "missing record type")?;
                Ok(Self::RequestRecord { record_type })
            },
        }
    }
}

/// Record data of a 7500 remote-control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Ticket echoed by the reply
    pub ticket: u32,
    /// Tracking number echoed by the reply
    pub tracking_number: TrackingNumber,
    /// Command and body
    pub command: RemoteControl,
}

impl ControlRequest {
    /// Size of the remote-control header preceding every body
    pub const HEADER_SIZE: usize = 24;

    /// Encoded size of this request
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.command.body_len()
    }

    /// Write header and body
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_ne(self.command.id().to_u32());
        dst.put_u32_ne(self.ticket);
        dst.put_slice(&self.tracking_number.0);
        self.command.encode_body(dst);
    }

    /// Encode into a freshly allocated buffer
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.encoded_len());
        self.encode(&mut data);
        data
    }

    /// Parse the record data of a 7500 record
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MalformedPayload`] on a short header, an unknown
    /// remote-control ID or a body that does not match its command.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.remaining() < Self::HEADER_SIZE {
            return Err(malformed("remote control", "header truncated"));
        }
        let remcon_id = data.get_u32_ne();
        let ticket = data.get_u32_ne();
        let tracking_number = TrackingNumber::read(&mut data);

        let id = RemoteControlId::from_u32(remcon_id)
            .ok_or_else(|| malformed("remote control", "unknown remote control id"))?;
        let command = RemoteControl::decode_body(id, &mut data)?;

        Ok(Self { ticket, tracking_number, command })
    }
}

/// Positive acknowledgement (record 7501)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Ticket of the acknowledged request
    pub ticket: u32,
    /// Tracking number of the acknowledged request
    pub tracking_number: TrackingNumber,
}

impl Ack {
    /// Encoded size
    pub const SIZE: usize = 20;

    /// Write the ACK body
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_ne(self.ticket);
        dst.put_slice(&self.tracking_number.0);
    }

    /// Parse an ACK body
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.remaining() < Self::SIZE {
            return Err(malformed("ack", "body truncated"));
        }
        let ticket = data.get_u32_ne();
        let tracking_number = TrackingNumber::read(&mut data);
        Ok(Self { ticket, tracking_number })
    }
}

/// Negative acknowledgement (record 7502)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nak {
    /// Ticket of the rejected request
    pub ticket: u32,
    /// Tracking number of the rejected request
    pub tracking_number: TrackingNumber,
    /// Device-specific reason code
    pub error_code: u32,
}

impl Nak {
    /// Encoded size
    pub const SIZE: usize = 24;

    /// Write the NAK body
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_ne(self.ticket);
        dst.put_slice(&self.tracking_number.0);
        dst.put_u32_ne(self.error_code);
    }

    /// Parse a NAK body
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.remaining() < Self::SIZE {
            return Err(malformed("nak", "body truncated"));
        }
        let ticket = data.get_u32_ne();
        let tracking_number = TrackingNumber::read(&mut data);
        let error_code = data.get_u32_ne();
        Ok(Self { ticket, tracking_number, error_code })
    }
}

/// Reply to a remote-control request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlReply {
    /// Request accepted
    Ack(Ack),
    /// Request rejected
    Nak(Nak),
}

impl ControlReply {
    /// Interpret a record as a control reply
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnexpectedRecordType`] if the record is neither an
    /// ACK nor a NAK, or a malformed-payload error from the body.
    pub fn from_record(record_type_id: u32, data: &[u8]) -> Result<Self> {
        match RecordType::from_u32(record_type_id) {
            Some(RecordType::RemoteControlAck) => Ack::decode(data).map(Self::Ack),
            Some(RecordType::RemoteControlNak) => Nak::decode(data).map(Self::Nak),
            _ => Err(ProtocolError::UnexpectedRecordType(record_type_id)),
        }
    }

    /// Record type this reply travels in
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Ack(_) => RecordType::RemoteControlAck,
            Self::Nak(_) => RecordType::RemoteControlNak,
        }
    }

    /// Ticket echoed from the request
    #[must_use]
    pub fn ticket(&self) -> u32 {
        match self {
            Self::Ack(ack) => ack.ticket,
            Self::Nak(nak) => nak.ticket,
        }
    }

    /// Encode the reply body
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Nak::SIZE);
        match self {
            Self::Ack(ack) => ack.encode(&mut data),
            Self::Nak(nak) => nak.encode(&mut data),
        }
        data
    }
}

fn take_u32(src: &mut impl Buf, record: &'static str, reason: &'static str) -> Result<u32> {
    if src.remaining() < 4 {
        return Err(malformed(record, reason));
    }
    Ok(src.get_u32_ne())
}

fn malformed(record: &'static str, reason: &'static str) -> ProtocolError {
    ProtocolError::MalformedPayload { record, reason }
}
