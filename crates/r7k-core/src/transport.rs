//! Transport abstraction for network I/O.
//!
//! The [`ByteTransport`] trait abstracts over a reliable, ordered,
//! bidirectional byte stream with read timeouts. A 7k center speaks plain
//! TCP, so the same reader and subscription logic runs over:
//!
//! - **Tokio TCP streams** (production, see `r7k-stream`)
//! - **Turmoil TCP streams** (deterministic simulation, see `r7k-harness`)
//!
//! [`StreamTransport`] adapts any pair of tokio `AsyncRead`/`AsyncWrite`
//! halves, which covers both.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransportError;

/// Reliable byte stream with bounded reads.
///
/// # Errors
///
/// - [`TransportError::Timeout`] if nothing arrived in time
/// - [`TransportError::Closed`] once the peer has closed the stream
/// - [`TransportError::Io`] for any other failure
#[async_trait]
pub trait ByteTransport: Send {
    /// Read whatever is available into `buf`, waiting at most `timeout`.
    ///
    /// Returns the number of bytes read, which is never zero for a non-empty
    /// `buf`.
    async fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// Write all of `bytes`.
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Fill `buf` completely, waiting at most `timeout` in total.
    async fn recv_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), TransportError> {
        let fill = async {
            let mut filled = 0;
            while filled < buf.len() {
                filled += self.recv(&mut buf[filled..], timeout).await?;
            }
            Ok::<(), TransportError>(())
        };

        tokio::time::timeout(timeout, fill)
            .await
            .map_err(|_| TransportError::Timeout { elapsed: timeout })?
    }
}

/// [`ByteTransport`] over tokio read/write halves.
#[derive(Debug)]
pub struct StreamTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap the two halves of a connection
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Give back the halves
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl<R, W> ByteTransport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        match tokio::time::timeout(timeout, self.reader.read(buf)).await {
            Err(_) => Err(TransportError::Timeout { elapsed: timeout }),
            Ok(Ok(0)) if !buf.is_empty() => Err(TransportError::Closed),
            Ok(Ok(n)) => Ok(n),
            Ok(Err(err)) => Err(err.into()),
        }
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn recv_times_out_on_silence() {
        let (client, _server) = tokio::io::duplex(64);
        let (reader, writer) = tokio::io::split(client);
        let mut transport = StreamTransport::new(reader, writer);

        let mut buf = [0u8; 8];
        let result = transport.recv(&mut buf, Duration::from_millis(350)).await;
        assert_eq!(result, Err(TransportError::Timeout { elapsed: Duration::from_millis(350) }));
    }

    #[tokio::test]
    async fn recv_reports_closed_peer() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let (reader, writer) = tokio::io::split(client);
        let mut transport = StreamTransport::new(reader, writer);

        let mut buf = [0u8; 8];
        let result = transport.recv(&mut buf, Duration::from_secs(1)).await;
        assert_eq!(result, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn recv_exact_collects_partial_writes() {
        let (client, server) = tokio::io::duplex(64);
        let (reader, writer) = tokio::io::split(client);
        let mut transport = StreamTransport::new(reader, writer);
        let (_server_reader, mut server_writer) = tokio::io::split(server);

        server_writer.write_all(b"abc").await.expect("write");
        server_writer.write_all(b"defg").await.expect("write");

        let mut buf = [0u8; 7];
        transport.recv_exact(&mut buf, Duration::from_secs(1)).await.expect("filled");
        assert_eq!(&buf, b"abcdefg");
    }

    #[tokio::test]
    async fn send_reaches_peer() {
        let (client, server) = tokio::io::duplex(64);
        let (reader, writer) = tokio::io::split(client);
        let mut transport = StreamTransport::new(reader, writer);
        let (mut server_reader, _server_writer) = tokio::io::split(server);

        transport.send(b"7k").await.expect("sent");

        let mut buf = [0u8; 2];
        server_reader.read_exact(&mut buf).await.expect("read");
        assert_eq!(&buf, b"7k");
    }
}
