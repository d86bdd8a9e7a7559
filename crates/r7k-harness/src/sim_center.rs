//! Emulated 7k center for simulation tests.
//!
//! [`SimCenter`] accepts one client connection and answers remote-control
//! requests the way a 7k center does: ACK (or NAK) carrying the request's
//! ticket and tracking number, then a stream of data records of the
//! subscribed types. Noise bytes and corrupted records can be injected
//! between frames to exercise resynchronization.
//!
//! Everything the center generates comes from a seeded ChaCha RNG, so a
//! given configuration produces the same byte stream on every run.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use r7k_core::{ByteTransport, TransportError, env::Environment};
use r7k_proto::{
    Ack, ControlReply, ControlRequest, DataRecordFrameHeader, Device, Frame, MessageBuilder, Nak,
    NetworkFrameHeader, ProtocolError, RecordType, RemoteControl, Time7k,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::{SimEnv, SimTransport};

/// How the center answers remote-control requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResponse {
    /// Acknowledge and act on every request
    Ack,
    /// Reject every request with this error code
    Nak {
        /// Device error code carried in the NAK
        error_code: u32,
    },
    /// Never answer
    Silent,
}

/// Behaviour of a [`SimCenter`]
#[derive(Debug, Clone)]
pub struct SimCenterConfig {
    /// Answer to remote-control requests
    pub response: ControlResponse,
    /// Device stamped into generated records
    pub device: Device,
    /// Records streamed after a subscription is acknowledged
    pub frames: usize,
    /// Maximum data length of a generated record
    pub max_data_len: usize,
    /// Maximum noise bytes inserted before each record; 0 disables noise
    pub max_noise: usize,
    /// Corrupt the checksum of every n-th record; 0 disables corruption
    pub corrupt_every: usize,
    /// Virtual time between records
    pub frame_interval: Duration,
    /// Stop serving after this long without a request
    pub idle_timeout: Duration,
    /// RNG seed
    pub seed: u64,
}

impl Default for SimCenterConfig {
    fn default() -> Self {
        Self {
            response: ControlResponse::Ack,
            device: Device::default(),
            frames: 16,
            max_data_len: 512,
            max_noise: 0,
            corrupt_every: 0,
            frame_interval: Duration::from_millis(10),
            idle_timeout: Duration::from_secs(60),
            seed: 0,
        }
    }
}

/// Counters shared between the center and the test that runs it
#[derive(Debug, Default)]
pub struct CenterStats {
    requests: AtomicUsize,
    frames_sent: AtomicUsize,
    noise_bytes: AtomicUsize,
    corrupted_bytes: AtomicUsize,
}

impl CenterStats {
    /// Remote-control requests received
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Valid data records sent
    pub fn frames_sent(&self) -> usize {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Noise bytes sent between records
    pub fn noise_bytes(&self) -> usize {
        self.noise_bytes.load(Ordering::Relaxed)
    }

    /// Bytes of records sent with a bad checksum
    pub fn corrupted_bytes(&self) -> usize {
        self.corrupted_bytes.load(Ordering::Relaxed)
    }

    /// Bytes a parser must skip to recover every valid record
    pub fn garbage_bytes(&self) -> usize {
        self.noise_bytes() + self.corrupted_bytes()
    }
}

/// Emulated 7k center
#[derive(Debug, Clone)]
pub struct SimCenter {
    config: SimCenterConfig,
    stats: Arc<CenterStats>,
}

impl SimCenter {
    /// Create a center with `config`
    pub fn new(config: SimCenterConfig) -> Self {
        Self { config, stats: Arc::new(CenterStats::default()) }
    }

    /// Counters, readable while the simulation runs
    pub fn stats(&self) -> Arc<CenterStats> {
        Arc::clone(&self.stats)
    }

    /// Bind `address`, accept one client and serve it until it disconnects
    /// or goes idle.
    ///
    /// # Errors
    ///
    /// Returns error if binding or accepting fails, or the connection fails
    /// for a reason other than the client closing it.
    pub async fn serve(&self, address: &str) -> io::Result<()> {
        let listener = SimTransport::bind(address).await?;
        let mut stream = listener.accept().await?;
        info!(address, "client connected");

        self.session(&mut stream).await
    }

    /// Serve one connection until the client closes it or goes idle.
    ///
    /// # Errors
    ///
    /// Returns error on any other transport failure.
    pub async fn session<T: ByteTransport + ?Sized>(&self, transport: &mut T) -> io::Result<()> {
        match self.run(transport).await {
            Err(TransportError::Closed) => {
                info!("client disconnected");
                Ok(())
            },
            Err(TransportError::Timeout { .. }) => {
                info!("client idle, closing");
                Ok(())
            },
            result => result.map_err(io::Error::from),
        }
    }

    async fn run<T: ByteTransport + ?Sized>(&self, transport: &mut T) -> Result<(), TransportError> {
        let env = SimEnv::new();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut builder = MessageBuilder::new(self.config.device);

        loop {
            let frame = match read_frame(transport, self.config.idle_timeout).await? {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "dropping malformed frame");
                    continue;
                },
            };

            if frame.drf.record_type() != Some(RecordType::RemoteControl) {
                warn!(record_type = frame.drf.record_type_id(), "ignoring non-control record");
                continue;
            }
            let request = match ControlRequest::decode(&frame.data) {
                Ok(request) => request,
                Err(err) => {
                    warn!(error = %err, "dropping malformed request");
                    continue;
                },
            };
            self.stats.requests.fetch_add(1, Ordering::Relaxed);
            debug!(ticket = request.ticket, command = ?request.command.id(), "request");

            let reply = match self.config.response {
                ControlResponse::Silent => continue,
                ControlResponse::Ack => ControlReply::Ack(Ack {
                    ticket: request.ticket,
                    tracking_number: request.tracking_number,
                }),
                ControlResponse::Nak { error_code } => ControlReply::Nak(Nak {
                    ticket: request.ticket,
                    tracking_number: request.tracking_number,
                    error_code,
                }),
            };
            let time = Time7k::from_datetime(&env.wall_clock());
            let tx_id = builder.next_tx_id();
            let bytes = builder
                .build_at(reply.record_type().to_u32(), &reply.to_vec(), tx_id, time)
                .map_err(build_error)?;
            transport.send(&bytes).await?;

            if matches!(reply, ControlReply::Nak(_)) {
                continue;
            }

            match request.command {
                RemoteControl::Subscribe { record_types } => {
                    let count = self.config.frames;
                    self.stream(transport, &env, &mut builder, &mut rng, &record_types, count).await?;
                },
                RemoteControl::RequestRecord { record_type } => {
                    self.stream(transport, &env, &mut builder, &mut rng, &[record_type], 1).await?;
                },
                RemoteControl::Unsubscribe => {},
            }
        }
    }

    async fn stream<T: ByteTransport + ?Sized>(
        &self,
        transport: &mut T,
        env: &SimEnv,
        builder: &mut MessageBuilder,
        rng: &mut ChaCha8Rng,
        record_types: &[u32],
        count: usize,
    ) -> Result<(), TransportError> {
        if record_types.is_empty() {
            return Ok(());
        }

        for (n, &record_type) in record_types.iter().cycle().take(count).enumerate() {
            let mut bytes = Vec::new();

            let noise_len = rng.gen_range(0..=self.config.max_noise);
            // never zero, so noise cannot begin a header
            bytes.extend((0..noise_len).map(|_| rng.gen_range(1..=u8::MAX)));

            let data_len = rng.gen_range(0..=self.config.max_data_len);
            let data: Vec<u8> = (0..data_len).map(|_| rng.gen_range(1..=u8::MAX)).collect();
            let time = Time7k::from_datetime(&env.wall_clock());
            let tx_id = builder.next_tx_id();
            let mut frame = builder.build_at(record_type, &data, tx_id, time).map_err(build_error)?;

            let corrupt = self.config.corrupt_every > 0 && (n + 1) % self.config.corrupt_every == 0;
            if corrupt {
                if let Some(last) = frame.last_mut() {
                    *last ^= 0x01;
                }
                self.stats.corrupted_bytes.fetch_add(frame.len(), Ordering::Relaxed);
            } else {
                self.stats.frames_sent.fetch_add(1, Ordering::Relaxed);
            }
            self.stats.noise_bytes.fetch_add(noise_len, Ordering::Relaxed);

            bytes.extend_from_slice(&frame);
            transport.send(&bytes).await?;
            env.sleep(self.config.frame_interval).await;
        }

        debug!(count, "stream complete");
        Ok(())
    }
}

/// Read one whole frame; the inner result is the decode outcome
async fn read_frame<T: ByteTransport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
) -> Result<r7k_proto::Result<Frame>, TransportError> {
    let mut bytes = vec![0u8; NetworkFrameHeader::SIZE + DataRecordFrameHeader::SIZE];
    transport.recv_exact(&mut bytes, timeout).await?;

    let size = match DataRecordFrameHeader::from_bytes(&bytes[NetworkFrameHeader::SIZE..]) {
        Ok(drf) => drf.size() as usize,
        Err(err) => return Ok(Err(err)),
    };
    if size > DataRecordFrameHeader::SIZE + Frame::MAX_DATA_SIZE + 4 {
        return Ok(Err(ProtocolError::PayloadTooLarge {
            size,
            max: Frame::MAX_DATA_SIZE,
        }));
    }

    let start = bytes.len();
    bytes.resize(NetworkFrameHeader::SIZE + size.max(DataRecordFrameHeader::SIZE), 0);
    transport.recv_exact(&mut bytes[start..], timeout).await?;

    Ok(Frame::decode(&bytes))
}

fn build_error(err: ProtocolError) -> TransportError {
    TransportError::Io(format!("failed to build record: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_acks_without_noise() {
        let config = SimCenterConfig::default();
        assert_eq!(config.response, ControlResponse::Ack);
        assert_eq!(config.max_noise, 0);
        assert_eq!(config.corrupt_every, 0);
    }

    #[test]
    fn garbage_counts_noise_and_corruption() {
        let stats = CenterStats::default();
        stats.noise_bytes.store(10, Ordering::Relaxed);
        stats.corrupted_bytes.store(120, Ordering::Relaxed);

        assert_eq!(stats.garbage_bytes(), 130);
    }
}
