//! Exhaustive positive space fuzzer for Frame encoding/decoding
//!
//! Unlike random fuzzing (stream_parse.rs), this fuzzer EXHAUSTIVELY tests
//! all combinations of:
//! - All known record types
//! - All devices
//! - Edge-case time stamps
//! - Empty and small data sections
//!
//! Every encoding must decode back to the same frame and parse as exactly
//! one record.

#![no_main]

use libfuzzer_sys::fuzz_target;
use r7k_core::{FrameContainer, parse};
use r7k_proto::{DataRecordFrameHeader, Device, Frame, NetworkFrameHeader, RecordType, Time7k};

const ALL_RECORD_TYPES: &[RecordType] = &[
    RecordType::Position,
    RecordType::SonarSettings,
    RecordType::Configuration,
    RecordType::BeamGeometry,
    RecordType::Bathymetry,
    RecordType::RawDetection,
    RecordType::RemoteControl,
    RecordType::RemoteControlAck,
    RecordType::RemoteControlNak,
    RecordType::RemoteControlSonarSettings,
];

const ALL_DEVICES: &[Device] = &[Device::Reson7125Low, Device::Reson7125High, Device::T50];

const TIMES: &[Time7k] = &[
    Time7k { year: 0, day: 0, seconds: 0.0, hours: 0, minutes: 0 },
    Time7k { year: 1970, day: 1, seconds: 0.0, hours: 0, minutes: 0 },
    Time7k { year: 2024, day: 366, seconds: 59.999, hours: 23, minutes: 59 },
    Time7k { year: u16::MAX, day: u16::MAX, seconds: f32::MAX, hours: u8::MAX, minutes: u8::MAX },
];

// Data sizes to test
const DATA_SIZES: &[usize] = &[
    0,    // Empty: smallest legal record
    1,    // Single byte
    63,   // Just under a DRF header
    64,   // Exactly a DRF header
    255,  // One byte
    256,  // Two bytes
    4096, // 4KB
];

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let record_type = ALL_RECORD_TYPES[data[0] as usize % ALL_RECORD_TYPES.len()];
    let device = ALL_DEVICES[data[1] as usize % ALL_DEVICES.len()];
    let tx_id = u16::from(data[2]) << 8;

    for &time in TIMES {
        let mut drf = DataRecordFrameHeader::new(record_type.to_u32());
        drf.set_device(device.device_id(), device.sys_enumerator());
        drf.set_timestamp(time);

        let mut nf = NetworkFrameHeader::new();
        nf.set_tx_id(tx_id);

        for &data_size in DATA_SIZES {
            let body = if data_size <= data.len() - 3 {
                data[3..3 + data_size].to_vec()
            } else {
                vec![0u8; data_size]
            };

            let frame = Frame::new(nf, drf, body.clone());

            // INVARIANT 1: Encoding must succeed
            let mut buf = Vec::new();
            frame.encode(&mut buf).expect("encode should never fail for valid frame");

            // INVARIANT 2: Encoded size covers both headers, data and checksum
            assert_eq!(buf.len(), NetworkFrameHeader::SIZE + DataRecordFrameHeader::SIZE + body.len() + 4);

            // INVARIANT 3: Decoding must round-trip
            let decoded = Frame::decode(&buf).expect("decode should succeed for valid encoding");
            assert_eq!(decoded.drf.record_type(), Some(record_type));
            assert_eq!(decoded.drf.device_id(), device.device_id());
            assert_eq!(decoded.nf.tx_id(), tx_id);
            assert_eq!(decoded.data.as_ref(), body.as_slice());
            assert_eq!(decoded.checksum(), frame.checksum());

            // INVARIANT 4: The stream parser finds exactly this record
            let mut container = FrameContainer::with_capacity(buf.len());
            let status = parse(&buf, &mut container);
            assert_eq!(status.parsed_records, 1, "record type {record_type:?}, size {data_size}");
            assert_eq!(status.sync_bytes, 0);
            assert_eq!(container.as_bytes(), &buf[NetworkFrameHeader::SIZE..]);
        }
    }
});
