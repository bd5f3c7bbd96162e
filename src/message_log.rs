//! Append-only chat message log
//!
//! Connection tasks never touch the log file. They hand records to a
//! bounded queue, and a single writer task appends them in arrival order.

use crate::error::ChatError;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Records buffered before new ones are dropped
const QUEUE_CAPACITY: usize = 1024;

/// One chat line posted to a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub room: String,
    pub line: String,
}

impl LogRecord {
    /// On-disk form: `room: line`
    pub fn to_entry(&self) -> String {
        format!("{}: {}\n", self.room, self.line)
    }
}

/// Handle to the message log writer
#[derive(Debug, Clone)]
pub struct MessageLog {
    sender: mpsc::Sender<LogRecord>,
}

impl MessageLog {
    /// Open (or create) the log file for appending and start its writer
    pub async fn open(path: &Path) -> Result<(Self, JoinHandle<()>)> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open message log file {}", path.display()))?;

        tracing::info!("Opened message log file {}", path.display());
        Ok(Self::from_writer(file))
    }

    /// Start a writer task over any async sink.
    ///
    /// The task ends once every handle has been dropped and the queue drained.
    pub fn from_writer<W>(writer: W) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(log_writer_task(writer, receiver));
        (Self { sender }, handle)
    }

    /// Queue a record without waiting
    pub fn record(&self, room: &str, line: &str) -> Result<(), ChatError> {
        let record = LogRecord {
            room: room.to_string(),
            line: line.to_string(),
        };

        self.sender.try_send(record).map_err(|e| match e {
            TrySendError::Full(_) => ChatError::LogSink("queue is full".to_string()),
            TrySendError::Closed(_) => ChatError::LogSink("writer has stopped".to_string()),
        })
    }
}

async fn log_writer_task<W>(mut writer: W, mut receiver: mpsc::Receiver<LogRecord>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(record) = receiver.recv().await {
        if let Err(e) = writer.write_all(record.to_entry().as_bytes()).await {
            tracing::warn!("Failed to write message log entry for room '{}': {}", record.room, e);
            continue;
        }
        if let Err(e) = writer.flush().await {
            tracing::warn!("Failed to flush message log: {}", e);
        }
    }

    tracing::debug!("Message log writer finished");
}
