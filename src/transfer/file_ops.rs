//! Module `file_ops`
//!
//! Writes listing and file payloads onto an open data channel, each
//! followed by its end-of-payload sentinel.

use log::{info, warn};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::TransferError;
use crate::protocol::{BUFFER_SIZE, Framing, Sentinel};
use crate::transfer::DataChannel;

/// Sends each entry as one frame, in order, then `EOD`.
///
/// Returns how many entries were actually framed and sent.
pub async fn send_listing(
    channel: &mut DataChannel,
    entries: &[String],
    framing: Framing,
) -> Result<usize, TransferError> {
    let mut sent = 0;
    for name in entries {
        match framing.encode_entry(name) {
            Some(frame) => {
                channel.send_all(&frame).await?;
                sent += 1;
            }
            None => warn!(
                "Not listing {:?}: name does not fit in a {}-byte frame",
                name, BUFFER_SIZE
            ),
        }
    }

    channel
        .send_all(&framing.encode_end(Sentinel::EndOfDirectory))
        .await?;
    Ok(sent)
}

/// Opens a file for sending.
pub async fn open_for_transfer(path: &Path) -> Result<File, TransferError> {
    File::open(path)
        .await
        .map_err(|e| TransferError::FileOpen(path.to_path_buf(), e))
}

/// Relays the file in chunks of at most `chunk_size` bytes, then `EOF`.
///
/// Returns the number of content bytes relayed.
pub async fn stream_file(
    channel: &mut DataChannel,
    file: &mut File,
    path: &Path,
    chunk_size: usize,
    framing: Framing,
) -> Result<u64, TransferError> {
    let mut buffer = vec![0u8; chunk_size];
    let mut total = 0u64;

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .map_err(|e| TransferError::FileRead(path.to_path_buf(), e))?;
        if n == 0 {
            break;
        }

        channel.send_all(&framing.encode_chunk(&buffer[..n])).await?;
        total += n as u64;
    }

    channel.send_all(&framing.encode_end(Sentinel::EndOfFile)).await?;
    info!("Relayed {} ({} bytes) to {}", path.display(), total, channel.peer_addr());
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn capture<F, Fut>(send: F) -> Vec<u8>
    where
        F: FnOnce(DataChannel) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reader = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).await.unwrap();
            received
        });

        let channel = DataChannel::open(&[addr], None).await.unwrap();
        send(channel).await;
        reader.await.unwrap()
    }

    #[tokio::test]
    async fn file_bytes_are_relayed_unaltered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let content: Vec<u8> = (0..=255u8).cycle().take(1234).collect();
        std::fs::write(&path, &content).unwrap();

        let sent_path = path.clone();
        let payload = capture(|mut channel| async move {
            let mut file = open_for_transfer(&sent_path).await.unwrap();
            let total = stream_file(&mut channel, &mut file, &sent_path, 100, Framing::Fixed)
                .await
                .unwrap();
            assert_eq!(total, 1234);
            channel.close().await.unwrap();
        })
        .await;

        assert_eq!(Framing::Fixed.decode_file(&payload).unwrap(), content);
    }

    #[tokio::test]
    async fn listing_skips_unframeable_names() {
        let entries = vec!["a.txt".to_string(), "x".repeat(150), "b.txt".to_string()];

        let payload = capture(|mut channel| async move {
            let sent = send_listing(&mut channel, &entries, Framing::Fixed).await.unwrap();
            assert_eq!(sent, 2);
            channel.close().await.unwrap();
        })
        .await;

        assert_eq!(payload.len(), 2 * BUFFER_SIZE + 3);
        assert_eq!(
            Framing::Fixed.decode_listing(&payload).unwrap(),
            vec!["a.txt".to_string(), "b.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_for_transfer(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, TransferError::FileOpen(..)));
    }
}
