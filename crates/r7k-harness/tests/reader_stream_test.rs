//! Streaming subscribed records through the reader.
//!
//! These tests validate:
//! - Every valid record survives noise and corrupted records in the stream
//! - Skipped bytes are accounted exactly
//! - Frames split across reads are carried and completed
//! - The same seed yields the same parsed container

use std::sync::{Arc, Mutex};

use r7k_core::{Reader, ReaderConfig, ReaderError, ReaderState};
use r7k_harness::{SimCenter, SimCenterConfig, SimEnv, SimTransport};
use r7k_proto::{RecordType, Time7k};

const SETTINGS: u32 = RecordType::SonarSettings.to_u32();
const BATHYMETRY: u32 = RecordType::Bathymetry.to_u32();

fn noisy_center(seed: u64) -> SimCenterConfig {
    SimCenterConfig {
        frames: 40,
        max_data_len: 2048,
        max_noise: 48,
        corrupt_every: 7,
        seed,
        ..SimCenterConfig::default()
    }
}

/// Subscribe and read until the stream goes quiet
async fn read_until_idle(reader: &mut Reader<r7k_harness::SimStream, SimEnv>) -> Result<(), ReaderError> {
    reader.subscribe().await?;

    loop {
        match reader.read_frames().await {
            Ok(_) => {},
            Err(err) if err.is_transient() => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

#[test]
fn stream_with_noise_and_corruption() {
    let mut sim = turmoil::Builder::new().build();

    let center = SimCenter::new(noisy_center(42));
    let stats = center.stats();
    sim.host("center", move || {
        let center = center.clone();
        async move {
            center.serve("0.0.0.0:7000").await?;
            Ok(())
        }
    });

    let client_stats = Arc::clone(&stats);
    sim.client("client", async move {
        let stream = SimTransport::connect_to("center:7000").await?;
        let config = ReaderConfig::default()
            .with_subscriptions(vec![SETTINGS, BATHYMETRY])
            .with_read_chunk(1500);
        let mut reader = Reader::new(stream, SimEnv::new(), config);

        read_until_idle(&mut reader).await?;
        assert_eq!(reader.state(), ReaderState::Subscribed);

        // 40 records, every 7th corrupted
        assert_eq!(client_stats.frames_sent(), 35);
        assert!(client_stats.noise_bytes() > 0);

        let totals = *reader.stats();
        assert_eq!(totals.parsed_records, 35);
        assert_eq!(totals.sync_bytes, client_stats.garbage_bytes());
        assert!(totals.resync_count > 0);
        assert_eq!(reader.container().frame_count(), 35);

        for frame in reader.container().frames() {
            let record = frame.record().expect("container holds valid records");
            assert!(reader.is_subscribed(record.record_type_id()));

            let time: Time7k = record.header().timestamp();
            assert_eq!(time.year, 2024);
            assert_eq!(time.day, 1);
        }

        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn same_seed_same_container() {
    fn run(seed: u64) -> Vec<u8> {
        let mut sim = turmoil::Builder::new().build();
        let parsed = Arc::new(Mutex::new(Vec::new()));

        let center = SimCenter::new(noisy_center(seed));
        sim.host("center", move || {
            let center = center.clone();
            async move {
                center.serve("0.0.0.0:7000").await?;
                Ok(())
            }
        });

        let output = Arc::clone(&parsed);
        sim.client("client", async move {
            let stream = SimTransport::connect_to("center:7000").await?;
            let config = ReaderConfig::default().with_subscriptions(vec![SETTINGS]);
            let mut reader = Reader::new(stream, SimEnv::new(), config);

            read_until_idle(&mut reader).await?;

            output.lock().expect("not poisoned").extend_from_slice(reader.container().as_bytes());
            Ok(())
        });

        sim.run().expect("simulation failed");

        let bytes = parsed.lock().expect("not poisoned").clone();
        bytes
    }

    let first = run(7);
    assert!(!first.is_empty());
    assert_eq!(first, run(7));
    assert_ne!(first, run(8));
}
