//! Complete records: NF header, DRF header, data and checksum.
//!
//! [`DataRecord`] is a borrowed, validated view of one DRF inside a larger
//! buffer (the form records take inside a frame container). [`Frame`] owns a
//! full transmission unit and is what builders encode and control replies
//! decode into.

use bytes::{BufMut, Bytes};

use crate::{
    DataRecordFrameHeader, NetworkFrameHeader,
    checksum::{self, CHECKSUM_SIZE},
    errors::{ProtocolError, Result},
};

/// Borrowed view of one data record frame (DRF header + data + checksum).
///
/// Constructed only through [`DataRecord::parse`], so the header is
/// plausible, the slice is exactly `size` bytes long, and the checksum
/// matches whenever the record claims one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRecord<'a> {
    header: &'a DataRecordFrameHeader,
    bytes: &'a [u8],
}

impl<'a> DataRecord<'a> {
    /// Parse a record from the start of `bytes`. Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// - Header errors from [`DataRecordFrameHeader::from_bytes`]
    /// - [`ProtocolError::RecordSizeTooSmall`] if `size` leaves no room for
    ///   the checksum
    /// - [`ProtocolError::FrameTruncated`] if `bytes` is shorter than `size`
    /// - [`ProtocolError::ChecksumMismatch`] if the checksum-valid flag is set
    ///   and the trailer disagrees with the recomputed sum
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let header = DataRecordFrameHeader::from_bytes(bytes)?;

        let size = header.size() as usize;
        if size < DataRecordFrameHeader::MIN_RECORD_SIZE {
            return Err(ProtocolError::RecordSizeTooSmall(header.size()));
        }
        if bytes.len() < size {
            return Err(ProtocolError::FrameTruncated { expected: size, actual: bytes.len() });
        }

        let record = Self { header, bytes: &bytes[..size] };
        if header.flags().checksum_valid() {
            let computed = checksum::compute(record.checksummed());
            if computed != record.checksum() {
                return Err(ProtocolError::ChecksumMismatch { stored: record.checksum(), computed });
            }
        }

        Ok(record)
    }

    /// DRF header
    #[must_use]
    pub fn header(&self) -> &'a DataRecordFrameHeader {
        self.header
    }

    /// Raw record type ID
    #[must_use]
    pub fn record_type_id(&self) -> u32 {
        self.header.record_type_id()
    }

    /// Record data between the header and the checksum
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        &self.bytes[DataRecordFrameHeader::SIZE..self.bytes.len() - CHECKSUM_SIZE]
    }

    /// Trailing checksum as stored
    #[must_use]
    pub fn checksum(&self) -> u32 {
        let mut trailer = [0u8; CHECKSUM_SIZE];
        trailer.copy_from_slice(&self.bytes[self.bytes.len() - CHECKSUM_SIZE..]);
        u32::from_ne_bytes(trailer)
    }

    /// The whole record, `size` bytes long
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Record size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: a record holds at least a header and a checksum
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn checksummed(&self) -> &'a [u8] {
        &self.bytes[..self.bytes.len() - CHECKSUM_SIZE]
    }
}

/// Owned transmission unit: one NF, one DRF, record data and checksum.
///
/// Layout on the wire:
/// `[NF: 36 bytes] + [DRF: 64 bytes] + [data] + [checksum: 4 bytes]`
///
/// # Invariants
///
/// - `drf.size() == 64 + data.len() + 4`
/// - `nf.total_size() == drf.size()` and `nf.packet_size() == 36 + drf.size()`
///
/// Both hold for frames built with [`Frame::new`] and are checked by
/// [`Frame::decode`] through the record size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Network frame header
    pub nf: NetworkFrameHeader,

    /// Data record frame header
    pub drf: DataRecordFrameHeader,

    /// Record data (already encoded for its record type)
    pub data: Bytes,
}

impl Frame {
    /// Largest record data a single frame will encode (64 MiB)
    pub const MAX_DATA_SIZE: usize = 64 * 1024 * 1024;

    /// Create a frame, deriving all size fields from `data`.
    #[must_use]
    pub fn new(
        mut nf: NetworkFrameHeader,
        mut drf: DataRecordFrameHeader,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();

        #[allow(clippy::cast_possible_truncation)]
        {
            let record_size = (DataRecordFrameHeader::MIN_RECORD_SIZE + data.len()) as u32;
            drf.set_size(record_size);
            nf.set_total_size(record_size);
            nf.set_packet_size(record_size.wrapping_add(NetworkFrameHeader::SIZE as u32));
        }

        Self { nf, drf, data }
    }

    /// Sum of the DRF header and data bytes
    #[must_use]
    pub fn checksum(&self) -> u32 {
        checksum::compute(&self.drf.to_bytes()).wrapping_add(checksum::compute(&self.data))
    }

    /// Total encoded size including the NF header
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        NetworkFrameHeader::SIZE + DataRecordFrameHeader::MIN_RECORD_SIZE + self.data.len()
    }

    /// Encode frame into buffer
    ///
    /// Writes: `[NF] + [DRF] + [data] + [checksum]`
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if the data exceeds
    /// [`Frame::MAX_DATA_SIZE`].
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.data.len() > Self::MAX_DATA_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.data.len(),
                max: Self::MAX_DATA_SIZE,
            });
        }

        dst.put_slice(&self.nf.to_bytes());
        dst.put_slice(&self.drf.to_bytes());
        dst.put_slice(&self.data);
        dst.put_slice(&self.checksum().to_ne_bytes());

        Ok(())
    }

    /// Encode into a freshly allocated buffer
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut wire = Vec::with_capacity(self.encoded_len());
        self.encode(&mut wire)?;
        Ok(wire)
    }

    /// Decode one frame from wire format
    ///
    /// Validates both headers and the checksum (when flagged). Trailing bytes
    /// after the checksum are ignored.
    ///
    /// # Errors
    ///
    /// Any header error, [`ProtocolError::FrameTruncated`] if the record
    /// extends past `bytes`, or [`ProtocolError::ChecksumMismatch`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let nf = NetworkFrameHeader::from_bytes(bytes)?;
        let record = DataRecord::parse(&bytes[NetworkFrameHeader::SIZE..])?;

        Ok(Self {
            nf: *nf,
            drf: *record.header(),
            data: Bytes::copy_from_slice(record.data()),
        })
    }
}
