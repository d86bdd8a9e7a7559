//! Growable frame container.
//!
//! A [`FrameContainer`] is one contiguous byte buffer holding accepted data
//! record frames back to back, plus an index of where each frame starts.
//! Three independent cursors walk it:
//!
//! - **write**: end of the stored bytes; frames are appended here
//! - **read**: sequential byte reads over the stored bytes
//! - **enumeration**: position in the index, one frame per step
//!
//! ```text
//! 0                  read            write             capacity
//! ├──────────┬───────┼──────┬─────────┼─────────────────┤
//! │ frame 0  │ frame 1      │ frame 2 │  free space     │
//! └──────────┴──────────────┴─────────┴─────────────────┘
//! index: [0, off1, off2]
//! ```
//!
//! The container is not synchronized. A producer fills it with
//! [`crate::parse`] and hands it over (or swaps in a flushed one) before a
//! consumer enumerates it.

use r7k_proto::{DataRecord, DataRecordFrameHeader};

use crate::error::ContainerError;

/// Index slots added whenever the frame index runs full
const INDEX_GROWTH: usize = 64;

/// Byte buffer, frame index and cursors for parsed records.
///
/// # Invariants
///
/// - `read <= write <= capacity`
/// - Index entries are in insertion order, contiguous and end at `write`
/// - Bytes past `write` are never returned by [`FrameContainer::read`] or a
///   [`FrameView`]
#[derive(Debug, Clone)]
pub struct FrameContainer {
    buf: Vec<u8>,
    write: usize,
    read: usize,
    index: Vec<IndexEntry>,
    cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexEntry {
    offset: usize,
    len: usize,
}

impl FrameContainer {
    /// Create an empty container with `capacity` zeroed bytes
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            write: 0,
            read: 0,
            index: Vec::with_capacity(INDEX_GROWTH),
            cursor: 0,
        }
    }

    /// Append one complete frame.
    ///
    /// Fails without modifying anything if the frame does not fit.
    pub fn add(&mut self, frame: &[u8]) -> Result<(), ContainerError> {
        if frame.len() > self.space() {
            return Err(ContainerError::OutOfSpace { needed: frame.len(), available: self.space() });
        }

        if self.index.len() == self.index.capacity() {
            self.index.reserve_exact(INDEX_GROWTH);
        }

        let offset = self.write;
        self.buf[offset..offset + frame.len()].copy_from_slice(frame);
        self.index.push(IndexEntry { offset, len: frame.len() });
        self.write += frame.len();

        Ok(())
    }

    /// Logically empty the container. Stored bytes are left in place.
    pub fn flush(&mut self) {
        self.write = 0;
        self.read = 0;
        self.cursor = 0;
        self.index.clear();
    }

    /// Empty the container and zero the whole buffer
    pub fn flush_zeroed(&mut self) {
        self.flush();
        self.buf.fill(0);
    }

    /// Move the read cursor to `offset` (at most the write offset)
    pub fn seek(&mut self, offset: usize) -> Result<(), ContainerError> {
        if offset > self.write {
            return Err(ContainerError::OutOfRange { offset, len: 0, limit: self.write });
        }
        self.read = offset;
        Ok(())
    }

    /// Current read cursor
    #[must_use]
    pub fn tell(&self) -> usize {
        self.read
    }

    /// Copy stored bytes from the read cursor into `dest` and advance it.
    ///
    /// Copies at most `dest.len()` bytes; returns 0 once all written data has
    /// been read.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        let count = dest.len().min(self.pending());
        dest[..count].copy_from_slice(&self.buf[self.read..self.read + count]);
        self.read += count;
        count
    }

    /// Total buffer size
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes stored (the write offset)
    #[must_use]
    pub fn length(&self) -> usize {
        self.write
    }

    /// Stored bytes not yet read
    #[must_use]
    pub fn pending(&self) -> usize {
        self.write - self.read
    }

    /// Bytes still available for frames
    #[must_use]
    pub fn space(&self) -> usize {
        self.buf.len() - self.write
    }

    /// Number of stored frames
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.index.len()
    }

    /// Grow the buffer to `new_capacity`, zero-filling the new space.
    ///
    /// Stored frames and all cursors are preserved. Shrinking is rejected.
    pub fn resize(&mut self, new_capacity: usize) -> Result<(), ContainerError> {
        if new_capacity < self.buf.len() {
            return Err(ContainerError::ShrinkUnsupported {
                current: self.buf.len(),
                requested: new_capacity,
            });
        }
        self.buf.resize(new_capacity, 0);
        Ok(())
    }

    /// Restart enumeration and return the first frame
    pub fn enumerate_first(&mut self) -> Option<FrameView<'_>> {
        self.cursor = 0;
        self.enumerate_next()
    }

    /// Return the next frame in insertion order
    pub fn enumerate_next(&mut self) -> Option<FrameView<'_>> {
        let entry = *self.index.get(self.cursor)?;
        self.cursor += 1;
        Some(self.view(entry))
    }

    /// Iterate over stored frames without touching the enumeration cursor
    pub fn frames(&self) -> impl Iterator<Item = FrameView<'_>> {
        self.index.iter().map(|entry| self.view(*entry))
    }

    /// Copy `dest.len()` bytes starting at `offset`, bounded by capacity
    pub fn copy_range(&self, offset: usize, dest: &mut [u8]) -> Result<(), ContainerError> {
        let capacity = self.buf.len();
        let out_of_range = ContainerError::OutOfRange { offset, len: dest.len(), limit: capacity };

        if offset >= capacity {
            return Err(out_of_range);
        }
        let end = offset.checked_add(dest.len()).ok_or(out_of_range)?;
        if end > capacity {
            return Err(out_of_range);
        }

        dest.copy_from_slice(&self.buf[offset..end]);
        Ok(())
    }

    /// Stored bytes, from offset 0 to the write offset
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.write]
    }

    fn view(&self, entry: IndexEntry) -> FrameView<'_> {
        FrameView { offset: entry.offset, bytes: &self.buf[entry.offset..entry.offset + entry.len] }
    }
}

/// Read-only view of one stored frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Offset of the frame within the container
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Frame size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a zero-length frame (never produced by the parser)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw frame bytes: DRF header, data and checksum
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// DRF header, if the frame is at least a header long
    #[must_use]
    pub fn header(&self) -> Option<&'a DataRecordFrameHeader> {
        DataRecordFrameHeader::view(self.bytes).ok()
    }

    /// Record type ID from the DRF header
    #[must_use]
    pub fn record_type_id(&self) -> Option<u32> {
        self.header().map(DataRecordFrameHeader::record_type_id)
    }

    /// Fully validated record view
    #[must_use]
    pub fn record(&self) -> Option<DataRecord<'a>> {
        DataRecord::parse(self.bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn filled(len: usize, byte: u8) -> Vec<u8> {
        vec![byte; len]
    }

    #[test]
    fn add_appends_and_indexes() {
        let mut container = FrameContainer::with_capacity(100);
        container.add(&filled(30, 1)).expect("fits");
        container.add(&filled(20, 2)).expect("fits");

        assert_eq!(container.length(), 50);
        assert_eq!(container.space(), 50);
        assert_eq!(container.frame_count(), 2);

        let first = container.enumerate_first().expect("first frame");
        assert_eq!((first.offset(), first.len()), (0, 30));
        let second = container.enumerate_next().expect("second frame");
        assert_eq!((second.offset(), second.len()), (30, 20));
        assert!(second.as_bytes().iter().all(|&b| b == 2));
        assert!(container.enumerate_next().is_none());

        let again = container.enumerate_first().expect("restart");
        assert_eq!(again.offset(), 0);
    }

    #[test]
    fn add_fails_atomically_when_full() {
        let mut container = FrameContainer::with_capacity(40);
        container.add(&filled(30, 1)).expect("fits");

        assert_eq!(
            container.add(&filled(11, 2)),
            Err(ContainerError::OutOfSpace { needed: 11, available: 10 })
        );
        assert_eq!(container.length(), 30);
        assert_eq!(container.frame_count(), 1);

        container.add(&filled(10, 3)).expect("exact fit");
        assert_eq!(container.space(), 0);
    }

    #[test]
    fn read_is_bounded_by_written_data() {
        let mut container = FrameContainer::with_capacity(64);
        container.add(&[1, 2, 3, 4, 5]).expect("fits");

        let mut dest = [0u8; 3];
        assert_eq!(container.read(&mut dest), 3);
        assert_eq!(dest, [1, 2, 3]);
        assert_eq!(container.tell(), 3);
        assert_eq!(container.pending(), 2);

        let mut dest = [0u8; 8];
        assert_eq!(container.read(&mut dest), 2);
        assert_eq!(&dest[..2], &[4, 5]);
        assert_eq!(container.read(&mut dest), 0);
    }

    #[test]
    fn seek_rejects_unwritten_offsets() {
        let mut container = FrameContainer::with_capacity(64);
        container.add(&[9; 8]).expect("fits");

        container.seek(8).expect("end of data is valid");
        container.seek(2).expect("inside data");
        assert_eq!(container.tell(), 2);
        assert_eq!(
            container.seek(9),
            Err(ContainerError::OutOfRange { offset: 9, len: 0, limit: 8 })
        );
        assert_eq!(container.tell(), 2);
    }

    #[test]
    fn resize_grows_and_preserves() {
        let mut container = FrameContainer::with_capacity(16);
        container.add(&[7; 10]).expect("fits");
        container.seek(4).expect("valid");

        container.resize(64).expect("grow");
        assert_eq!(container.capacity(), 64);
        assert_eq!(container.as_bytes(), &[7; 10]);
        assert_eq!(container.tell(), 4);

        let mut tail = [0xFFu8; 8];
        container.copy_range(56, &mut tail).expect("in range");
        assert_eq!(tail, [0; 8]);

        assert_eq!(
            container.resize(32),
            Err(ContainerError::ShrinkUnsupported { current: 64, requested: 32 })
        );
        assert_eq!(container.capacity(), 64);
    }

    #[test]
    fn copy_range_bounds() {
        let container = FrameContainer::with_capacity(32);
        let mut dest = [0u8; 8];

        container.copy_range(24, &mut dest).expect("ends at capacity");
        assert!(container.copy_range(25, &mut dest).is_err());
        assert!(container.copy_range(32, &mut []).is_err());
        assert!(container.copy_range(usize::MAX, &mut dest).is_err());
    }

    #[test]
    fn flush_keeps_capacity() {
        let mut container = FrameContainer::with_capacity(32);
        container.add(&[5; 16]).expect("fits");
        container.flush();

        assert_eq!(container.length(), 0);
        assert_eq!(container.frame_count(), 0);
        assert_eq!(container.capacity(), 32);
        assert!(container.enumerate_first().is_none());

        let mut probe = [0u8; 4];
        container.copy_range(0, &mut probe).expect("in range");
        assert_eq!(probe, [5; 4]);

        container.flush_zeroed();
        container.copy_range(0, &mut probe).expect("in range");
        assert_eq!(probe, [0; 4]);
    }

    #[test]
    fn index_grows_past_initial_slots() {
        let mut container = FrameContainer::with_capacity(INDEX_GROWTH * 3);
        for i in 0..INDEX_GROWTH * 3 {
            container.add(&[(i % 251) as u8]).expect("fits");
        }

        assert_eq!(container.frame_count(), INDEX_GROWTH * 3);
        assert_eq!(container.frames().last().map(|frame| frame.offset()), Some(INDEX_GROWTH * 3 - 1));
    }

    proptest! {
        #[test]
        fn cursors_stay_ordered(
            frames in prop::collection::vec(1usize..64, 0..32),
            capacity in 0usize..1024,
            seek in any::<usize>(),
        ) {
            let mut container = FrameContainer::with_capacity(capacity);
            let mut stored = 0;
            for len in frames {
                if container.add(&vec![0xAB; len]).is_ok() {
                    stored += len;
                }
                prop_assert!(container.length() <= container.capacity());
            }
            prop_assert_eq!(container.length(), stored);

            let _ = container.seek(seek % (capacity + 1));
            prop_assert!(container.tell() <= container.length());
            prop_assert_eq!(container.frames().map(|frame| frame.len()).sum::<usize>(), stored);
        }
    }
}
