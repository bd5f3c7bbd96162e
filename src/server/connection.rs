//! Client stream plumbing: outbound writer task and bounded line reads

use crate::error::ChatError;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};

/// Read half of a client stream, buffered for line reads
pub type BoxedReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Write half of a client stream, owned by the writer task
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How long a closing session may spend flushing queued output
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Read one line whose content is at most `max` bytes.
///
/// The `\n` or `\r\n` terminator does not count towards the limit.
/// Returns `Ok(None)` when the peer closed the stream before sending anything.
pub async fn read_bounded_line<R>(reader: &mut R, max: usize) -> Result<Option<String>, ChatError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer = Vec::new();
    let read = (&mut *reader)
        .take(max as u64 + 2)
        .read_until(b'\n', &mut buffer)
        .await?;

    if read == 0 {
        return Ok(None);
    }

    if content_len(&buffer) > max {
        return Err(ChatError::LineTooLong { max });
    }

    // Telnet clients interleave option bytes that are not valid UTF-8.
    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}

/// Length of a raw line without its `\n` or `\r\n` terminator
fn content_len(line: &[u8]) -> usize {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line).len()
}

/// Resolve once the session's closed flag is raised
pub async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

/// Write a chunk of text to the client
async fn write_chunk<W: AsyncWrite + Unpin + ?Sized>(writer: &mut W, chunk: &str) -> std::io::Result<()> {
    writer.write_all(chunk.as_bytes()).await?;
    writer.flush().await
}

/// Task to write outgoing text to the client.
///
/// Runs until the session closes or a write fails. A failed write raises
/// the closed flag so the session's owner and its room both observe it.
pub async fn session_writer_task(
    mut writer: BoxedWriter,
    mut outbox: mpsc::Receiver<String>,
    closed: Arc<watch::Sender<bool>>,
    endpoint: String,
) {
    let mut closed_rx = closed.subscribe();

    loop {
        let chunk = tokio::select! {
            biased;
            chunk = outbox.recv() => chunk,
            _ = wait_closed(&mut closed_rx) => None,
        };
        let Some(chunk) = chunk else { break };

        // A close only interrupts a write the client is not draining.
        let result = tokio::select! {
            biased;
            result = write_chunk(&mut writer, &chunk) => result,
            _ = wait_closed(&mut closed_rx) => break,
        };

        if let Err(e) = result {
            tracing::warn!("Failed to write to client {}: {}", endpoint, e);
            closed.send_replace(true);
            return;
        }
    }

    // Flush what was queued before the close (goodbye lines), then hang up.
    let drain = async {
        while let Ok(chunk) = outbox.try_recv() {
            write_chunk(&mut writer, &chunk).await?;
        }
        writer.shutdown().await
    };
    match tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, drain).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Error while closing client {}: {}", endpoint, e),
        Err(_) => tracing::debug!("Timed out flushing output to client {}", endpoint),
    }

    tracing::debug!("Client writer task finished: {}", endpoint);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_read_bounded_line() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = BufReader::new(server);

        client.write_all(b"hello\r\nworld").await.unwrap();
        drop(client);

        let first = read_bounded_line(&mut reader, 16).await.unwrap();
        assert_eq!(first.as_deref(), Some("hello\r\n"));
        let second = read_bounded_line(&mut reader, 16).await.unwrap();
        assert_eq!(second.as_deref(), Some("world"));
        assert!(read_bounded_line(&mut reader, 16).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_bounded_line_rejects_long_lines() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = BufReader::new(server);

        client.write_all(b"0123456789\n").await.unwrap();

        let result = read_bounded_line(&mut reader, 4).await;
        assert!(matches!(result, Err(ChatError::LineTooLong { max: 4 })));
    }

    #[test]
    fn test_content_len_ignores_terminator() {
        assert_eq!(content_len(b"abcd\n"), 4);
        assert_eq!(content_len(b"abcd\r\n"), 4);
        assert_eq!(content_len(b"abcd"), 4);
        assert_eq!(content_len(b"abcd\r"), 4);
        assert_eq!(content_len(b"\r\n"), 0);
    }
}
