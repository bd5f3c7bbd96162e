//! Helpers shared by the integration tests
#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

pub const TIMEOUT: Duration = Duration::from_secs(2);

/// Client end of a chat connection, reading text as it arrives
pub struct TestClient<S> {
    stream: S,
    buffer: String,
}

impl<S: AsyncRead + AsyncWrite + Unpin> TestClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: String::new(),
        }
    }

    /// Send one line
    pub async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Read until `needle` arrives; returns everything up to and including it
    pub async fn expect(&mut self, needle: &str) -> String {
        let result = timeout(TIMEOUT, async {
            loop {
                if let Some(pos) = self.buffer.find(needle) {
                    let end = pos + needle.len();
                    return Some(self.buffer.drain(..end).collect::<String>());
                }
                let mut chunk = [0u8; 1024];
                let n = self.stream.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    return None;
                }
                self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
            }
        })
        .await;

        match result {
            Ok(Some(text)) => text,
            Ok(None) => panic!("stream closed waiting for {:?}, got {:?}", needle, self.buffer),
            Err(_) => panic!("timed out waiting for {:?}, got {:?}", needle, self.buffer),
        }
    }

    /// Read until the server closes the stream; returns the remaining text
    pub async fn expect_closed(&mut self) -> String {
        let result = timeout(TIMEOUT, async {
            loop {
                let mut chunk = [0u8; 1024];
                let n = self.stream.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
            }
        })
        .await;

        assert!(result.is_ok(), "stream still open, got {:?}", self.buffer);
        std::mem::take(&mut self.buffer)
    }
}

/// Poll `check` until it holds or the timeout expires
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held: {}", what);
}
