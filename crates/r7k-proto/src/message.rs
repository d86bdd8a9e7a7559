//! Outbound message assembly.
//!
//! [`MessageBuilder`] turns a record type and its data into the contiguous
//! `NF + DRF + data + checksum` buffer written to the transport. It owns the
//! per-connection counters: the NF transmission ID and the ticket and
//! tracking number carried by remote-control requests.

use crate::{
    ControlRequest, DataRecordFrameHeader, Device, Frame, NetworkFrameHeader, ProtocolError,
    RecordType, RemoteControl, TrackingNumber, errors::Result, time::Time7k,
};

/// Encoded remote-control request plus the identifiers a reply must echo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    /// NF transmission ID used for this message
    pub tx_id: u16,
    /// Ticket carried in the remote-control header
    pub ticket: u32,
    /// Tracking number carried in the remote-control header
    pub tracking_number: TrackingNumber,
    /// Wire bytes, ready to send
    pub bytes: Vec<u8>,
}

/// Builds outbound frames addressed to one device.
///
/// Counters:
/// - `tx_id` is pre-incremented, so the first message uses 1; wraps at
///   `u16::MAX`
/// - `ticket` and `tracking_number` are post-incremented from zero, once per
///   remote-control request
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    device: Device,
    tx_id: u16,
    ticket: u32,
    tracking_number: TrackingNumber,
}

impl MessageBuilder {
    /// Create a builder targeting `device`
    #[must_use]
    pub fn new(device: Device) -> Self {
        Self { device, tx_id: 0, ticket: 0, tracking_number: TrackingNumber::default() }
    }

    /// Target device
    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Advance and return the transmission ID
    pub fn next_tx_id(&mut self) -> u16 {
        self.tx_id = self.tx_id.wrapping_add(1);
        self.tx_id
    }

    /// Build a message stamped with the current UTC time
    pub fn build(&self, record_type_id: u32, payload: &[u8], tx_id: u16) -> Result<Vec<u8>> {
        self.build_at(record_type_id, payload, tx_id, Time7k::now())
    }

    /// Build a message with an explicit time stamp
    pub fn build_at(
        &self,
        record_type_id: u32,
        payload: &[u8],
        tx_id: u16,
        time: Time7k,
    ) -> Result<Vec<u8>> {
        self.frame(record_type_id, payload, tx_id, time).to_vec()
    }

    /// Assemble the frame without encoding it
    #[must_use]
    pub fn frame(&self, record_type_id: u32, payload: &[u8], tx_id: u16, time: Time7k) -> Frame {
        let mut nf = NetworkFrameHeader::new();
        nf.set_tx_id(tx_id);

        let mut drf = DataRecordFrameHeader::new(record_type_id);
        drf.set_timestamp(time);
        drf.set_device(self.device.device_id(), self.device.sys_enumerator());

        Frame::new(nf, drf, payload.to_vec())
    }

    /// Build a 7500 remote-control request, consuming a ticket, a tracking
    /// number and a transmission ID.
    ///
    /// A subscribe naming no record types is rejected before any counter
    /// advances.
    pub fn remote_control(&mut self, command: RemoteControl, time: Time7k) -> Result<ControlMessage> {
        if matches!(&command, RemoteControl::Subscribe { record_types } if record_types.is_empty()) {
            return Err(ProtocolError::EmptySubscription);
        }

        let ticket = self.ticket;
        self.ticket = self.ticket.wrapping_add(1);
        let tracking_number = self.tracking_number;
        self.tracking_number.increment();
        let tx_id = self.next_tx_id();

        let request = ControlRequest { ticket, tracking_number, command };
        let bytes =
            self.build_at(RecordType::RemoteControl.to_u32(), &request.to_vec(), tx_id, time)?;

        Ok(ControlMessage { tx_id, ticket, tracking_number, bytes })
    }

    /// Subscribe request for `record_types`
    pub fn subscribe(&mut self, record_types: &[u32], time: Time7k) -> Result<ControlMessage> {
        self.remote_control(RemoteControl::Subscribe { record_types: record_types.to_vec() }, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControlReply, RecordFlags, checksum};

    const TIME: Time7k = Time7k { year: 2024, day: 32, seconds: 1.5, hours: 2, minutes: 3 };

    fn dump(bytes: &[u8]) -> String {
        let (nf, rest) = bytes.split_at(NetworkFrameHeader::SIZE);
        let (drf, rest) = rest.split_at(DataRecordFrameHeader::SIZE);
        let (data, checksum) = rest.split_at(rest.len() - 4);
        format!(
            "nf       {}\ndrf      {}\ndrf+32   {}\ndata     {}\nchecksum {}",
            hex::encode(nf),
            hex::encode(&drf[..32]),
            hex::encode(&drf[32..]),
            hex::encode(data),
            hex::encode(checksum),
        )
    }

    #[test]
    fn first_tx_id_is_one_and_wraps() {
        let mut builder = MessageBuilder::new(Device::default());
        assert_eq!(builder.next_tx_id(), 1);
        assert_eq!(builder.next_tx_id(), 2);

        builder.tx_id = u16::MAX;
        assert_eq!(builder.next_tx_id(), 0);
    }

    #[test]
    fn built_message_sizes_and_checksum() {
        let builder = MessageBuilder::new(Device::T50);
        let payload = [0x11u8; 10];
        let bytes = builder.build(7006, &payload, 9).expect("should build");

        let frame = Frame::decode(&bytes).expect("valid frame");
        assert_eq!(bytes.len(), 36 + 64 + 10 + 4);
        assert_eq!(frame.drf.size(), 78);
        assert_eq!(frame.nf.total_size(), 78);
        assert_eq!(frame.nf.packet_size(), 114);
        assert_eq!(frame.nf.tx_id(), 9);
        assert_eq!(frame.drf.device_id(), 14000);
        assert!(frame.drf.flags().contains(RecordFlags::CHECKSUM_VALID));
        assert_eq!(frame.data.as_ref(), &payload);

        let stored = u32::from_ne_bytes([bytes[110], bytes[111], bytes[112], bytes[113]]);
        assert!(checksum::verify(&bytes[36..110], stored));
    }

    #[test]
    fn build_stamps_current_time() {
        let builder = MessageBuilder::new(Device::default());
        let bytes = builder.build(1003, &[], 1).expect("should build");
        let frame = Frame::decode(&bytes).expect("valid frame");

        let stamped = frame.drf.timestamp().to_datetime().expect("valid time");
        let age = chrono::Utc::now() - stamped;
        assert!(age.num_seconds().abs() < 5);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn message_wire_format() {
        let builder = MessageBuilder::new(Device::Reson7125High);
        let bytes = builder.build_at(1003, &[0xAA, 0xBB], 1, TIME).expect("should build");

        insta::assert_snapshot!(dump(&bytes), @r"
        nf       0500240001000000010001006a0000004600000000000000000000000000000000000000
        drf      05004000ffff0000460000000000000000000000e80720000000c03f02030100
        drf+32   eb030000581b0000000001000000000001000000000000000000000000000000
        data     aabb
        checksum 65070000
        ");
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn subscribe_wire_format() {
        let mut builder = MessageBuilder::new(Device::Reson7125Low);
        let message = builder.subscribe(&[1003, 7000], TIME).expect("should build");

        assert_eq!((message.tx_id, message.ticket), (1, 0));
        insta::assert_snapshot!(dump(&message.bytes), @r"
        nf       0500240001000000010001008c0000006800000000000000000000000000000000000000
        drf      05004000ffff0000680000000000000000000000e80720000000c03f02030100
        drf+32   4c1d0000581b0000000000000000000001000000000000000000000000000000
        data     1b040000000000000000000000000000000000000000000002000000eb030000581b0000
        checksum 1e070000
        ");
    }

    #[test]
    fn remote_control_counters_advance() {
        let mut builder = MessageBuilder::new(Device::default());
        let first = builder.subscribe(&[7000], TIME).expect("should build");
        let second = builder.remote_control(RemoteControl::Unsubscribe, TIME).expect("build");

        assert_eq!((first.tx_id, first.ticket), (1, 0));
        assert_eq!((second.tx_id, second.ticket), (2, 1));
        assert_eq!(first.tracking_number, TrackingNumber::default());
        assert_eq!(second.tracking_number.0[0], 1);

        let frame = Frame::decode(&second.bytes).expect("valid frame");
        let request = ControlRequest::decode(&frame.data).expect("valid request");
        assert_eq!(request.command, RemoteControl::Unsubscribe);
        assert_eq!(request.ticket, 1);
        assert!(ControlReply::from_record(frame.drf.record_type_id(), &frame.data).is_err());
    }

    #[test]
    fn empty_subscribe_is_rejected() {
        let mut builder = MessageBuilder::new(Device::default());

        let empty = builder.subscribe(&[], TIME).map(|message| message.ticket);
        assert_eq!(empty, Err(ProtocolError::EmptySubscription));
        let next = builder.subscribe(&[7000], TIME).expect("should build");
        assert_eq!((next.tx_id, next.ticket), (1, 0));
    }
}
