//! Remote-control exchanges against the emulated center.
//!
//! These tests validate:
//! - Subscribe is acknowledged with the request's ticket
//! - A NAK surfaces the device error code and leaves the reader connected
//! - A silent center fails the request after the reply timeout
//! - Unsubscribe and single-record requests round-trip after a drain

use std::{sync::Arc, time::Duration};

use r7k_core::{
    Reader, ReaderConfig, ReaderError, ReaderState, SubscriptionConfig, SubscriptionFailure,
    SubscriptionOutcome, env::Environment, subscription,
};
use r7k_harness::{CenterStats, ControlResponse, SimCenter, SimCenterConfig, SimEnv, SimTransport};
use r7k_proto::{Device, MessageBuilder, RecordType};
use turmoil::Sim;

const SETTINGS: u32 = RecordType::SonarSettings.to_u32();
const BATHYMETRY: u32 = RecordType::Bathymetry.to_u32();

fn spawn_center(sim: &mut Sim<'_>, config: SimCenterConfig) -> Arc<CenterStats> {
    let center = SimCenter::new(config);
    let stats = center.stats();

    sim.host("center", move || {
        let center = center.clone();
        async move {
            center.serve("0.0.0.0:7000").await?;
            Ok(())
        }
    });

    stats
}

#[test]
fn subscribe_is_acknowledged() {
    let mut sim = turmoil::Builder::new().build();
    let stats = spawn_center(&mut sim, SimCenterConfig { frames: 0, ..SimCenterConfig::default() });

    sim.client("client", async {
        let env = SimEnv::new();
        let mut stream = SimTransport::connect_to("center:7000").await?;
        let mut builder = MessageBuilder::new(Device::Reson7125High);

        let outcome = subscription::subscribe(
            &mut stream,
            &env,
            &mut builder,
            &[SETTINGS, BATHYMETRY],
            SubscriptionConfig::default(),
        )
        .await?;

        match outcome {
            SubscriptionOutcome::Acked(ack) => assert_eq!(ack.ticket, 0),
            other => panic!("expected ACK, got {other:?}"),
        }

        Ok(())
    });

    sim.run().expect("simulation failed");
    assert_eq!(stats.requests(), 1);
}

#[test]
fn nak_reports_error_code() {
    let mut sim = turmoil::Builder::new().build();
    let config = SimCenterConfig {
        response: ControlResponse::Nak { error_code: 17 },
        ..SimCenterConfig::default()
    };
    spawn_center(&mut sim, config);

    sim.client("client", async {
        let stream = SimTransport::connect_to("center:7000").await?;
        let config = ReaderConfig::default().with_subscriptions(vec![SETTINGS]);
        let mut reader = Reader::new(stream, SimEnv::new(), config);

        let result = reader.subscribe().await;

        assert_eq!(
            result,
            Err(ReaderError::Subscription(SubscriptionFailure::Nak { error_code: 17 }))
        );
        assert_eq!(reader.state(), ReaderState::Connected);
        assert!(!reader.is_subscribed(SETTINGS));

        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn silent_center_times_out() {
    let mut sim = turmoil::Builder::new().build();
    let config = SimCenterConfig { response: ControlResponse::Silent, ..SimCenterConfig::default() };
    let stats = spawn_center(&mut sim, config);

    sim.client("client", async {
        let env = SimEnv::new();
        let mut stream = SimTransport::connect_to("center:7000").await?;
        let mut builder = MessageBuilder::new(Device::Reson7125High);

        let start = env.now();
        let outcome = subscription::subscribe(
            &mut stream,
            &env,
            &mut builder,
            &[SETTINGS],
            SubscriptionConfig::default(),
        )
        .await?;
        let waited = env.now() - start;

        match outcome {
            SubscriptionOutcome::Failed(SubscriptionFailure::Timeout { elapsed }) => {
                assert!(elapsed >= Duration::from_secs(5), "elapsed {elapsed:?}");
                assert!(elapsed < Duration::from_secs(6), "elapsed {elapsed:?}");
            },
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(waited >= Duration::from_secs(5));

        Ok(())
    });

    sim.run().expect("simulation failed");
    assert_eq!(stats.requests(), 1);
}

#[test]
fn unsubscribe_after_drain() {
    let mut sim = turmoil::Builder::new().build();
    let stats = spawn_center(&mut sim, SimCenterConfig { frames: 4, ..SimCenterConfig::default() });

    sim.client("client", async {
        let stream = SimTransport::connect_to("center:7000").await?;
        let config = ReaderConfig::default().with_subscriptions(vec![BATHYMETRY]);
        let mut reader = Reader::new(stream, SimEnv::new(), config);

        reader.subscribe().await?;
        assert_eq!(reader.state(), ReaderState::Subscribed);
        assert!(reader.is_subscribed(BATHYMETRY));

        let discarded = reader.drain(Duration::from_millis(350), 64).await?;
        assert!(discarded > 0);

        reader.unsubscribe().await?;
        assert_eq!(reader.state(), ReaderState::Connected);

        Ok(())
    });

    sim.run().expect("simulation failed");
    assert_eq!(stats.requests(), 2);
    assert_eq!(stats.frames_sent(), 4);
}

#[test]
fn request_single_record() {
    let mut sim = turmoil::Builder::new().build();
    spawn_center(&mut sim, SimCenterConfig::default());

    sim.client("client", async {
        let stream = SimTransport::connect_to("center:7000").await?;
        let mut reader = Reader::new(stream, SimEnv::new(), ReaderConfig::default());

        reader.request_record(SETTINGS).await?;
        assert_eq!(reader.state(), ReaderState::Connected);

        while reader.container().frame_count() == 0 {
            reader.read_frames().await?;
        }

        let frame = reader.enumerate_first().expect("one frame");
        assert_eq!(frame.record_type_id(), Some(SETTINGS));

        Ok(())
    });

    sim.run().expect("simulation failed");
}
