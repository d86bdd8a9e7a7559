//! Stream parsed data records from a 7k center.
//!
//! Connects over TCP, subscribes to the requested record types and logs each
//! read cycle's parse statistics (and optionally every parsed frame) until
//! the cycle limit is reached, the center disconnects, or Ctrl-C.

use std::{io, time::Duration};

use clap::Parser;
use r7k_core::{
    ParseStatus, Reader, ReaderConfig, ReaderError, ReaderState, StreamTransport, SystemEnv,
    TransportError,
};
use r7k_proto::{Device, RecordType};
use thiserror::Error;
use tokio::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type CenterReader = Reader<StreamTransport<OwnedReadHalf, OwnedWriteHalf>, SystemEnv>;

#[derive(Debug, Parser)]
#[command(name = "r7k-stream", version, about = "Subscribe to a 7k center and stream parsed records")]
struct Args {
    /// Host name or address of the 7k center
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// TCP port of the 7k center
    #[arg(long, default_value_t = 7000)]
    port: u16,

    /// Sonar to address: 7125_200, 7125_400 or T50
    #[arg(long, default_value_t = Device::Reson7125High)]
    device: Device,

    /// Record types to subscribe to, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [
        RecordType::SonarSettings.to_u32(),
        RecordType::Bathymetry.to_u32(),
    ])]
    records: Vec<u32>,

    /// Frame container capacity in bytes
    #[arg(long, default_value_t = 256 * 1024)]
    capacity: usize,

    /// Read cycles before unsubscribing; 0 runs until the center disconnects
    #[arg(long, default_value_t = 0)]
    cycles: usize,

    /// Read timeout per cycle, in milliseconds
    #[arg(long, default_value_t = 350)]
    timeout_ms: u64,

    /// Reply timeout for remote-control requests, in milliseconds
    #[arg(long, default_value_t = 5000)]
    subscribe_timeout_ms: u64,

    /// Log the header of every parsed frame
    #[arg(long)]
    frames: bool,
}

#[derive(Debug, Error)]
enum StreamError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[tokio::main]
async fn main() -> Result<(), StreamError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut reader = connect(&args).await?;

    reader.subscribe().await?;
    info!(records = ?args.records, device = %args.device, "subscribed");

    tokio::select! {
        result = stream(&mut reader, &args) => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    if reader.state() == ReaderState::Subscribed {
        let timeout = Duration::from_millis(args.timeout_ms);
        let result = match reader.drain(timeout, 64).await {
            Ok(_) => reader.unsubscribe().await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            warn!(error = %err, "unsubscribe failed");
        }
    }

    info!("totals\n{}", reader.stats());
    Ok(())
}

async fn connect(args: &Args) -> Result<CenterReader, StreamError> {
    let address = format!("{}:{}", args.host, args.port);
    let stream = TcpStream::connect(&address)
        .await
        .map_err(|source| StreamError::Connect { address: address.clone(), source })?;
    stream.set_nodelay(true).map_err(|source| StreamError::Connect { address: address.clone(), source })?;
    info!(%address, "connected");

    let (recv, send) = stream.into_split();
    let config = ReaderConfig::default()
        .with_capacity(args.capacity)
        .with_subscriptions(args.records.clone())
        .with_device(args.device)
        .with_poll_timeout(Duration::from_millis(args.timeout_ms))
        .with_subscribe_timeout(Duration::from_millis(args.subscribe_timeout_ms));

    Ok(Reader::new(StreamTransport::new(recv, send), SystemEnv, config))
}

async fn stream(reader: &mut CenterReader, args: &Args) -> Result<(), ReaderError> {
    let mut cycle = 0;

    while args.cycles == 0 || cycle < args.cycles {
        cycle += 1;

        match reader.read_frames().await {
            Ok(status) => {
                report(cycle, &status);
                if args.frames {
                    log_frames(reader);
                }
                reader.container_mut().flush();
            },
            Err(ReaderError::Transport(TransportError::Closed)) => {
                info!("center closed the connection");
                return Ok(());
            },
            Err(err) if err.is_transient() => debug!(cycle, error = %err, "no data"),
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

fn report(cycle: usize, status: &ParseStatus) {
    info!(
        cycle,
        records = status.parsed_records,
        parsed = status.parsed_bytes,
        skipped = status.sync_bytes,
        resyncs = status.resync_count,
        carried = status.unread_bytes,
        outcome = %status.status,
        "read cycle"
    );
}

fn log_frames(reader: &CenterReader) {
    for frame in reader.container().frames() {
        let Some(header) = frame.header() else {
            continue;
        };

        info!(
            offset = frame.offset(),
            record_type = header.record_type_id(),
            size = header.size(),
            device = header.device_id(),
            time = ?header.timestamp(),
            "frame"
        );
    }
}
