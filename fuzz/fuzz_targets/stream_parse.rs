//! Random-input fuzzer for the stream parser.
//!
//! Feeds arbitrary bytes through `parse` with a fuzzer-chosen container
//! capacity. The parser must never panic, every byte must be accounted for,
//! and everything it stores must be a valid record.

#![no_main]

use libfuzzer_sys::fuzz_target;
use r7k_core::{FrameContainer, ParseOutcome, parse};
use r7k_proto::NetworkFrameHeader;

fuzz_target!(|data: &[u8]| {
    let Some((&[a, b], src)) = data.split_first_chunk::<2>() else {
        return;
    };
    let capacity = usize::from(u16::from_le_bytes([a, b]));

    let mut container = FrameContainer::with_capacity(capacity);
    let status = parse(src, &mut container);

    assert_eq!(status.src_bytes, src.len());
    let framed = status.parsed_bytes + status.parsed_records * NetworkFrameHeader::SIZE;
    assert!(framed + status.sync_bytes + status.unread_bytes <= src.len());
    assert_eq!(container.length(), status.parsed_bytes);
    assert_eq!(container.frame_count(), status.parsed_records);

    if status.status == ParseOutcome::Ok {
        assert_eq!(framed + status.sync_bytes + status.unread_bytes, src.len());
    }

    for frame in container.frames() {
        assert!(frame.record().is_some(), "stored frame at {} is invalid", frame.offset());
    }

    // Parsing the same input again yields the same result
    container.flush();
    assert_eq!(parse(src, &mut container), status);
});
