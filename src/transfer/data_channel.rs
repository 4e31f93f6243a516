//! Module `data_channel`
//!
//! The outbound connection the server opens back to a client to carry one
//! response payload. A channel belongs to exactly one session and is never
//! reused; dropping it closes the socket on every exit path.

use log::{info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::error::{ConnectError, TransferError};

pub struct DataChannel {
    stream: TcpStream,
    peer: SocketAddr,
    bytes_sent: u64,
}

impl DataChannel {
    /// Connects to the first reachable endpoint, in resolution order.
    pub async fn open(endpoints: &[SocketAddr], timeout: Option<Duration>) -> Result<Self, ConnectError> {
        let mut last_error = ConnectError::NoEndpoint;

        for &addr in endpoints {
            match connect(addr, timeout).await {
                Ok(stream) => {
                    info!("Data connection opened to {}", addr);
                    return Ok(Self {
                        stream,
                        peer: addr,
                        bytes_sent: 0,
                    });
                }
                Err(e) => {
                    warn!("{}", e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Single write; may accept fewer bytes than offered.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<usize, TransferError> {
        let written = self.stream.write(bytes).await.map_err(TransferError::Write)?;
        self.bytes_sent += written as u64;
        Ok(written)
    }

    /// Writes `bytes` completely, advancing past partial writes.
    pub async fn send_all(&mut self, bytes: &[u8]) -> Result<(), TransferError> {
        let mut cursor = 0;
        while cursor < bytes.len() {
            let written = self.send(&bytes[cursor..]).await?;
            if written == 0 {
                return Err(TransferError::WriteZero);
            }
            cursor += written;
        }
        Ok(())
    }

    /// Flushes and shuts the connection down, returning the bytes sent.
    pub async fn close(mut self) -> Result<u64, TransferError> {
        self.stream.flush().await.map_err(TransferError::Write)?;
        if let Err(e) = self.stream.shutdown().await {
            warn!("Shutdown of data connection to {} failed: {}", self.peer, e);
        }
        info!(
            "Data connection to {} closed ({} bytes sent)",
            self.peer, self.bytes_sent
        );
        Ok(self.bytes_sent)
    }
}

async fn connect(addr: SocketAddr, timeout: Option<Duration>) -> Result<TcpStream, ConnectError> {
    let attempt = TcpStream::connect(addr);
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(result) => result.map_err(|e| ConnectError::Connect(addr, e)),
            Err(_) => Err(ConnectError::Timeout(addr)),
        },
        None => attempt.await.map_err(|e| ConnectError::Connect(addr, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn sends_everything_then_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).await.unwrap();
            received
        });

        let payload = vec![7u8; 64 * 1024];
        let mut channel = DataChannel::open(&[addr], None).await.unwrap();
        channel.send_all(&payload).await.unwrap();
        assert_eq!(channel.close().await.unwrap(), payload.len() as u64);

        assert_eq!(reader.await.unwrap(), payload);
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = DataChannel::open(&[addr], Some(Duration::from_secs(2))).await.err().unwrap();
        assert!(matches!(err, ConnectError::Connect(a, _) if a == addr));
    }

    #[tokio::test]
    async fn no_endpoints_is_reported() {
        let err = DataChannel::open(&[], None).await.err().unwrap();
        assert!(matches!(err, ConnectError::NoEndpoint));
    }
}
