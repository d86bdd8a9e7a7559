//! Turmoil-based transport using TCP streams.

use std::io;

use r7k_core::StreamTransport;
use tokio::io::{ReadHalf, WriteHalf};
use turmoil::net::{TcpListener, TcpStream};

/// Connection to a simulated peer
pub type SimStream = StreamTransport<ReadHalf<TcpStream>, WriteHalf<TcpStream>>;

/// Simulation transport using Turmoil's deterministic TCP streams.
///
/// A 7k center speaks plain TCP, so the simulated link has the same stream
/// semantics as production: reliable, ordered bytes with no message
/// boundaries. Turmoil controls delivery timing and can inject partitions.
pub struct SimTransport {
    listener: TcpListener,
}

impl SimTransport {
    /// Binds to the specified address for accepting connections.
    ///
    /// # Errors
    ///
    /// Returns error if the address is already in use or malformed.
    pub async fn bind(address: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self { listener })
    }

    /// Accept the next connection.
    ///
    /// # Errors
    ///
    /// Returns error if the listener fails.
    pub async fn accept(&self) -> io::Result<SimStream> {
        let (stream, _addr) = self.listener.accept().await?;
        Ok(split(stream))
    }

    /// Connects to a remote address such as `"center:7000"`.
    ///
    /// # Errors
    ///
    /// Returns error if the remote host is unreachable or refuses the
    /// connection.
    pub async fn connect_to(address: &str) -> io::Result<SimStream> {
        let stream = TcpStream::connect(address).await?;
        Ok(split(stream))
    }
}

fn split(stream: TcpStream) -> SimStream {
    let (recv, send) = tokio::io::split(stream);
    StreamTransport::new(recv, send)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use r7k_core::{ByteTransport, TransportError};

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn sim_transport_echo() {
        let mut sim = turmoil::Builder::new().build();

        // Server: echo back whatever is received
        sim.host("server", || async {
            let transport = SimTransport::bind("0.0.0.0:7000").await?;
            let mut stream = transport.accept().await?;

            let mut buf = [0u8; 14];
            stream.recv_exact(&mut buf, TIMEOUT).await?;
            stream.send(&buf).await?;

            Ok(())
        });

        sim.client("client", async {
            let mut stream = SimTransport::connect_to("server:7000").await?;

            let message = b"Hello, center!";
            stream.send(message).await?;

            let mut buf = vec![0u8; message.len()];
            stream.recv_exact(&mut buf, TIMEOUT).await?;

            assert_eq!(&buf, message);

            Ok(())
        });

        sim.run().expect("simulation failed");
    }

    #[test]
    fn sim_transport_reports_close() {
        let mut sim = turmoil::Builder::new().build();

        sim.host("server", || async {
            let transport = SimTransport::bind("0.0.0.0:7000").await?;
            let stream = transport.accept().await?;
            drop(stream);

            Ok(())
        });

        sim.client("client", async {
            let mut stream = SimTransport::connect_to("server:7000").await?;

            let mut buf = [0u8; 4];
            let result = stream.recv(&mut buf, TIMEOUT).await;
            assert_eq!(result, Err(TransportError::Closed));

            Ok(())
        });

        sim.run().expect("simulation failed");
    }
}
