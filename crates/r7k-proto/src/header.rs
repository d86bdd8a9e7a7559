//! Network frame and data record frame headers with zero-copy parsing.
//!
//! A record on the wire is a 36-byte network frame (NF) header followed by a
//! self-describing data record frame (DRF): a 64-byte header, the record
//! data, and a 4-byte checksum.
//!
//! ```text
//! ┌────────────┬─────────────┬──────────────────┬──────────┐
//! │ NF (36 B)  │ DRF (64 B)  │ data (size - 68) │ checksum │
//! └────────────┴─────────────┴──────────────────┴──────────┘
//!              |<------------- drf.size --------------->|
//! ```
//!
//! # Byte Order
//!
//! Integers are read and written in host byte order. 7k devices emit their
//! native (little-endian) order and never byte-swap, so a big-endian host
//! cannot talk to them. This matches deployed behavior and is deliberately
//! left as-is: swapping here would break compatibility with existing
//! producers on matching hosts.

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::{
    RecordFlags, RecordType,
    checksum::CHECKSUM_SIZE,
    errors::{ProtocolError, Result},
    time::Time7k,
};

/// Protocol version shared by the NF and DRF headers
pub const PROTOCOL_VERSION: u16 = 5;

/// Fixed 36-byte network frame header.
///
/// Wraps exactly one DRF for transmission. `total_size` counts the DRF bytes
/// that follow (header, data and checksum); `packet_size` additionally counts
/// this header.
///
/// Fields are stored as raw byte arrays so every 36-byte pattern is a valid
/// value and casting untrusted input cannot fail.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct NetworkFrameHeader {
    protocol_version: [u8; 2], // 0
    header_offset: [u8; 2],    // 2
    total_packets: [u8; 4],    // 4
    total_records: [u8; 2],    // 8
    tx_id: [u8; 2],            // 10
    packet_size: [u8; 4],      // 12
    total_size: [u8; 4],       // 16
    seq_number: [u8; 4],       // 20
    dest_dev_id: [u8; 4],      // 24
    dest_enumerator: [u8; 2],  // 28
    src_enumerator: [u8; 2],   // 30
    src_dev_id: [u8; 4],       // 32
}

impl NetworkFrameHeader {
    /// Size of the serialized header (36 bytes)
    pub const SIZE: usize = 36;

    /// Supported protocol version
    pub const VERSION: u16 = PROTOCOL_VERSION;

    /// Create a header for a single-packet, single-record frame.
    ///
    /// Sizes are zero until the frame is assembled; see
    /// [`crate::Frame::new`].
    #[must_use]
    pub fn new() -> Self {
        let mut header = Self::new_zeroed();
        header.protocol_version = Self::VERSION.to_ne_bytes();
        header.header_offset = (Self::SIZE as u16).to_ne_bytes();
        header.total_packets = 1u32.to_ne_bytes();
        header.total_records = 1u16.to_ne_bytes();
        header
    }

    /// View the first 36 bytes of `bytes` as a header without validating it.
    pub fn view(bytes: &[u8]) -> Result<&Self> {
        Ok(Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0)
    }

    /// Parse a header from network bytes (zero-copy)
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if:
    /// - Buffer is too short (< 36 bytes)
    /// - Protocol version is unsupported
    /// - The frame announces no packets
    /// - `total_size` cannot hold a DRF header
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::view(bytes)?;
        header.validate()?;
        Ok(header)
    }

    /// Check the plausibility constraints on this header.
    ///
    /// Cheapest checks first: version, then packet count, then size.
    pub fn validate(&self) -> Result<()> {
        if self.protocol_version() != Self::VERSION {
            return Err(ProtocolError::UnsupportedNetworkVersion(self.protocol_version()));
        }
        if self.total_packets() == 0 {
            return Err(ProtocolError::NoPackets);
        }
        if (self.total_size() as usize) < DataRecordFrameHeader::SIZE {
            return Err(ProtocolError::TotalSizeTooSmall(self.total_size()));
        }
        Ok(())
    }

    /// Serialize header to bytes (zero-copy)
    #[must_use]
    #[allow(clippy::wrong_self_convention)]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Protocol version
    #[must_use]
    pub fn protocol_version(&self) -> u16 {
        u16::from_ne_bytes(self.protocol_version)
    }

    /// Offset from the start of this header to the DRF
    #[must_use]
    pub fn header_offset(&self) -> u16 {
        u16::from_ne_bytes(self.header_offset)
    }

    /// Number of packets in this transmission
    #[must_use]
    pub fn total_packets(&self) -> u32 {
        u32::from_ne_bytes(self.total_packets)
    }

    /// Number of records in this transmission
    #[must_use]
    pub fn total_records(&self) -> u16 {
        u16::from_ne_bytes(self.total_records)
    }

    /// Transmission ID
    #[must_use]
    pub fn tx_id(&self) -> u16 {
        u16::from_ne_bytes(self.tx_id)
    }

    /// Size of this packet including the NF header
    #[must_use]
    pub fn packet_size(&self) -> u32 {
        u32::from_ne_bytes(self.packet_size)
    }

    /// Size of the DRF payload following this header
    #[must_use]
    pub fn total_size(&self) -> u32 {
        u32::from_ne_bytes(self.total_size)
    }

    /// Packet sequence number within the transmission
    #[must_use]
    pub fn seq_number(&self) -> u32 {
        u32::from_ne_bytes(self.seq_number)
    }

    /// Destination device ID
    #[must_use]
    pub fn dest_dev_id(&self) -> u32 {
        u32::from_ne_bytes(self.dest_dev_id)
    }

    /// Destination enumerator
    #[must_use]
    pub fn dest_enumerator(&self) -> u16 {
        u16::from_ne_bytes(self.dest_enumerator)
    }

    /// Source enumerator
    #[must_use]
    pub fn src_enumerator(&self) -> u16 {
        u16::from_ne_bytes(self.src_enumerator)
    }

    /// Source device ID
    #[must_use]
    pub fn src_dev_id(&self) -> u32 {
        u32::from_ne_bytes(self.src_dev_id)
    }

    /// Set the protocol version
    pub fn set_protocol_version(&mut self, version: u16) {
        self.protocol_version = version.to_ne_bytes();
    }

    /// Set the total packet count
    pub fn set_total_packets(&mut self, total_packets: u32) {
        self.total_packets = total_packets.to_ne_bytes();
    }

    /// Set the transmission ID
    pub fn set_tx_id(&mut self, tx_id: u16) {
        self.tx_id = tx_id.to_ne_bytes();
    }

    /// Set the packet size (NF header included)
    pub fn set_packet_size(&mut self, packet_size: u32) {
        self.packet_size = packet_size.to_ne_bytes();
    }

    /// Set the DRF payload size
    pub fn set_total_size(&mut self, total_size: u32) {
        self.total_size = total_size.to_ne_bytes();
    }

    /// Set the packet sequence number
    pub fn set_seq_number(&mut self, seq_number: u32) {
        self.seq_number = seq_number.to_ne_bytes();
    }

    /// Set the destination device ID and enumerator
    pub fn set_destination(&mut self, dev_id: u32, enumerator: u16) {
        self.dest_dev_id = dev_id.to_ne_bytes();
        self.dest_enumerator = enumerator.to_ne_bytes();
    }

    /// Set the source device ID and enumerator
    pub fn set_source(&mut self, dev_id: u32, enumerator: u16) {
        self.src_dev_id = dev_id.to_ne_bytes();
        self.src_enumerator = enumerator.to_ne_bytes();
    }
}

impl Default for NetworkFrameHeader {
    fn default() -> Self {
        Self::new()
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for NetworkFrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkFrameHeader")
            .field("protocol_version", &self.protocol_version())
            .field("header_offset", &self.header_offset())
            .field("total_packets", &self.total_packets())
            .field("total_records", &self.total_records())
            .field("tx_id", &self.tx_id())
            .field("packet_size", &self.packet_size())
            .field("total_size", &self.total_size())
            .field("seq_number", &self.seq_number())
            .field("dest_dev_id", &self.dest_dev_id())
            .field("dest_enumerator", &self.dest_enumerator())
            .field("src_enumerator", &self.src_enumerator())
            .field("src_dev_id", &self.src_dev_id())
            .finish()
    }
}

// Manual PartialEq implementation (can't derive due to packed repr)
impl PartialEq for NetworkFrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for NetworkFrameHeader {}

/// Fixed 64-byte data record frame header.
///
/// `size` covers the whole record: this header, the record-type data and the
/// trailing checksum. The sync pattern and protocol version identify a
/// plausible record start inside an unframed byte stream.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DataRecordFrameHeader {
    protocol_version: [u8; 2], // 0
    header_offset: [u8; 2],    // 2
    sync_pattern: [u8; 4],     // 4
    size: [u8; 4],             // 8
    opt_data_offset: [u8; 4],  // 12
    opt_data_id: [u8; 4],      // 16

    // 7k time (10 bytes: 20-29)
    year: [u8; 2],    // 20
    day: [u8; 2],     // 22
    seconds: [u8; 4], // 24 (f32)
    hours: u8,        // 28
    minutes: u8,      // 29

    record_version: [u8; 2],  // 30
    record_type_id: [u8; 4],  // 32
    device_id: [u8; 4],       // 36
    reserved0: [u8; 2],       // 40
    sys_enumerator: [u8; 2],  // 42
    reserved1: [u8; 4],       // 44
    flags: [u8; 2],           // 48
    reserved2: [u8; 2],       // 50
    reserved3: [u8; 4],       // 52
    total_frag_recs: [u8; 4], // 56
    frag_number: [u8; 4],     // 60
}

impl DataRecordFrameHeader {
    /// Size of the serialized header (64 bytes)
    pub const SIZE: usize = 64;

    /// Supported protocol version
    pub const VERSION: u16 = PROTOCOL_VERSION;

    /// Sync pattern marking a record start
    pub const SYNC_PATTERN: u32 = 0x0000_FFFF;

    /// Record format version written by builders
    pub const RECORD_VERSION: u16 = 1;

    /// Smallest complete record: header plus checksum, no data
    pub const MIN_RECORD_SIZE: usize = Self::SIZE + CHECKSUM_SIZE;

    /// Create a header for `record_type_id` with builder defaults.
    ///
    /// The checksum-valid flag is set; `size` and the time stamp are left
    /// for the caller.
    #[must_use]
    pub fn new(record_type_id: u32) -> Self {
        let mut header = Self::new_zeroed();
        header.protocol_version = Self::VERSION.to_ne_bytes();
        header.header_offset = (Self::SIZE as u16).to_ne_bytes();
        header.sync_pattern = Self::SYNC_PATTERN.to_ne_bytes();
        header.record_version = Self::RECORD_VERSION.to_ne_bytes();
        header.record_type_id = record_type_id.to_ne_bytes();
        header.flags = RecordFlags::CHECKSUM_VALID.to_word().to_ne_bytes();
        header
    }

    /// View the first 64 bytes of `bytes` as a header without validating it.
    pub fn view(bytes: &[u8]) -> Result<&Self> {
        Ok(Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0)
    }

    /// Parse a header from record bytes (zero-copy)
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if:
    /// - Buffer is too short (< 64 bytes)
    /// - Protocol version is unsupported
    /// - Sync pattern is wrong
    /// - `size` does not exceed the header size
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::view(bytes)?;
        header.validate()?;
        Ok(header)
    }

    /// Check the plausibility constraints on this header.
    ///
    /// Passing does not guarantee `size` leaves room for the checksum; frame
    /// decoders enforce [`Self::MIN_RECORD_SIZE`] separately.
    pub fn validate(&self) -> Result<()> {
        if self.protocol_version() != Self::VERSION {
            return Err(ProtocolError::UnsupportedRecordVersion(self.protocol_version()));
        }
        if self.sync_pattern() != Self::SYNC_PATTERN {
            return Err(ProtocolError::InvalidSyncPattern(self.sync_pattern()));
        }
        if self.size() as usize <= Self::SIZE {
            return Err(ProtocolError::RecordSizeTooSmall(self.size()));
        }
        Ok(())
    }

    /// Serialize header to bytes (zero-copy)
    #[must_use]
    #[allow(clippy::wrong_self_convention)]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Protocol version
    #[must_use]
    pub fn protocol_version(&self) -> u16 {
        u16::from_ne_bytes(self.protocol_version)
    }

    /// Offset from the start of this header to the record data
    #[must_use]
    pub fn header_offset(&self) -> u16 {
        u16::from_ne_bytes(self.header_offset)
    }

    /// Sync pattern
    #[must_use]
    pub fn sync_pattern(&self) -> u32 {
        u32::from_ne_bytes(self.sync_pattern)
    }

    /// Total record size: header, data and checksum
    #[must_use]
    pub fn size(&self) -> u32 {
        u32::from_ne_bytes(self.size)
    }

    /// Number of record data bytes between header and checksum
    #[must_use]
    pub fn data_len(&self) -> usize {
        (self.size() as usize).saturating_sub(Self::MIN_RECORD_SIZE)
    }

    /// Offset of optional data from the record start (0 if none)
    #[must_use]
    pub fn opt_data_offset(&self) -> u32 {
        u32::from_ne_bytes(self.opt_data_offset)
    }

    /// Identifier of the optional data
    #[must_use]
    pub fn opt_data_id(&self) -> u32 {
        u32::from_ne_bytes(self.opt_data_id)
    }

    /// Record time stamp
    #[must_use]
    pub fn timestamp(&self) -> Time7k {
        Time7k {
            year: u16::from_ne_bytes(self.year),
            day: u16::from_ne_bytes(self.day),
            seconds: f32::from_ne_bytes(self.seconds),
            hours: self.hours,
            minutes: self.minutes,
        }
    }

    /// Record format version
    #[must_use]
    pub fn record_version(&self) -> u16 {
        u16::from_ne_bytes(self.record_version)
    }

    /// Raw record type ID
    #[must_use]
    pub fn record_type_id(&self) -> u32 {
        u32::from_ne_bytes(self.record_type_id)
    }

    /// Record type as an enum (if known)
    #[must_use]
    pub fn record_type(&self) -> Option<RecordType> {
        RecordType::from_u32(self.record_type_id())
    }

    /// Originating or target device ID
    #[must_use]
    pub fn device_id(&self) -> u32 {
        u32::from_ne_bytes(self.device_id)
    }

    /// System enumerator
    #[must_use]
    pub fn sys_enumerator(&self) -> u16 {
        u16::from_ne_bytes(self.sys_enumerator)
    }

    /// Record flags
    #[must_use]
    pub fn flags(&self) -> RecordFlags {
        RecordFlags::from_word(u16::from_ne_bytes(self.flags))
    }

    /// Total fragments of a fragmented record (0 if not fragmented)
    #[must_use]
    pub fn total_frag_recs(&self) -> u32 {
        u32::from_ne_bytes(self.total_frag_recs)
    }

    /// Fragment number
    #[must_use]
    pub fn frag_number(&self) -> u32 {
        u32::from_ne_bytes(self.frag_number)
    }

    /// Set the protocol version
    pub fn set_protocol_version(&mut self, version: u16) {
        self.protocol_version = version.to_ne_bytes();
    }

    /// Set the total record size
    pub fn set_size(&mut self, size: u32) {
        self.size = size.to_ne_bytes();
    }

    /// Set the time stamp
    pub fn set_timestamp(&mut self, time: Time7k) {
        self.year = time.year.to_ne_bytes();
        self.day = time.day.to_ne_bytes();
        self.seconds = time.seconds.to_ne_bytes();
        self.hours = time.hours;
        self.minutes = time.minutes;
    }

    /// Set the record type ID
    pub fn set_record_type_id(&mut self, record_type_id: u32) {
        self.record_type_id = record_type_id.to_ne_bytes();
    }

    /// Set the device ID and system enumerator
    pub fn set_device(&mut self, device_id: u32, sys_enumerator: u16) {
        self.device_id = device_id.to_ne_bytes();
        self.sys_enumerator = sys_enumerator.to_ne_bytes();
    }

    /// Set the record flags
    pub fn set_flags(&mut self, flags: RecordFlags) {
        self.flags = flags.to_word().to_ne_bytes();
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for DataRecordFrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRecordFrameHeader")
            .field("protocol_version", &self.protocol_version())
            .field("sync_pattern", &format!("{:#010x}", self.sync_pattern()))
            .field("size", &self.size())
            .field("timestamp", &self.timestamp())
            .field("record_version", &self.record_version())
            .field("record_type_id", &self.record_type_id())
            .field("device_id", &self.device_id())
            .field("sys_enumerator", &self.sys_enumerator())
            .field("flags", &self.flags())
            .field("total_frag_recs", &self.total_frag_recs())
            .field("frag_number", &self.frag_number())
            .finish_non_exhaustive()
    }
}

// Manual PartialEq implementation (can't derive due to packed repr)
impl PartialEq for DataRecordFrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for DataRecordFrameHeader {}
