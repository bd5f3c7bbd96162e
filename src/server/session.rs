//! Session - server-side state for one connected client

use super::connection::{read_bounded_line, session_writer_task, wait_closed, BoxedReader};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::protocol::{trim_line, MAX_LINE_LENGTH};
use crate::room::Room;
use std::io;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// Per-session resource limits
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    /// Longest line accepted from the client, in bytes, excluding its terminator
    pub max_line_length: usize,

    /// Outbound chunks queued before the client counts as stalled
    pub outbox_capacity: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_line_length: MAX_LINE_LENGTH,
            outbox_capacity: 256,
        }
    }
}

impl From<&ChatConfig> for SessionLimits {
    fn from(config: &ChatConfig) -> Self {
        Self {
            max_line_length: config.max_line_length,
            outbox_capacity: config.outbox_capacity,
        }
    }
}

/// A connected client.
///
/// Shared between the task driving the client's protocol and the room it
/// has joined. Output goes through a bounded queue drained by a dedicated
/// writer task, so a slow client never blocks whoever is writing to it.
pub struct Session {
    /// Unique session identifier
    id: Uuid,

    /// Peer address of the underlying transport
    endpoint: String,

    /// Display name, empty until the naming phase completes
    name: Mutex<String>,

    /// Room this session currently belongs to
    room: Mutex<Weak<Room>>,

    /// Queue feeding the writer task
    outbox: mpsc::Sender<String>,

    /// Raised once, by whichever side closes first
    closed: Arc<watch::Sender<bool>>,

    reader: tokio::sync::Mutex<BoxedReader>,

    max_line_length: usize,
}

impl Session {
    /// Wrap a client stream with default limits
    pub fn new<S>(stream: S, endpoint: impl Into<String>) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::with_limits(stream, endpoint, SessionLimits::default())
    }

    /// Wrap a client stream and spawn its writer task
    pub fn with_limits<S>(stream: S, endpoint: impl Into<String>, limits: SessionLimits) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let endpoint = endpoint.into();
        let (read_half, write_half) = tokio::io::split(stream);
        let (outbox, outbox_rx) = mpsc::channel(limits.outbox_capacity.max(1));
        let (closed, _) = watch::channel(false);
        let closed = Arc::new(closed);

        let reader: BoxedReader = Box::new(BufReader::new(read_half));
        tokio::spawn(session_writer_task(
            Box::new(write_half),
            outbox_rx,
            Arc::clone(&closed),
            endpoint.clone(),
        ));

        Arc::new(Self {
            id: Uuid::new_v4(),
            endpoint,
            name: Mutex::new(String::new()),
            room: Mutex::new(Weak::new()),
            outbox,
            closed,
            reader: tokio::sync::Mutex::new(reader),
            max_line_length: limits.max_line_length,
        })
    }

    /// Get session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the transport endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Current display name
    pub fn name(&self) -> String {
        self.name.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the display name, returning the previous one
    pub fn set_name(&self, name: impl Into<String>) -> String {
        let mut current = self.name.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, name.into())
    }

    /// Stable identifier for logging
    pub fn describe(&self) -> String {
        let name = self.name();
        if name.is_empty() {
            format!("<unnamed> ({})", self.endpoint)
        } else {
            format!("{:?} ({})", name, self.endpoint)
        }
    }

    /// Room this session is currently a member of
    pub fn current_room(&self) -> Option<Arc<Room>> {
        self.room.lock().unwrap_or_else(PoisonError::into_inner).upgrade()
    }

    pub(crate) fn set_room(&self, room: &Arc<Room>) {
        *self.room.lock().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(room);
    }

    /// Clear the room reference if it points at `room`
    pub(crate) fn clear_room_if(&self, room: &Room) -> bool {
        let mut current = self.room.lock().unwrap_or_else(PoisonError::into_inner);
        if std::ptr::eq(current.as_ptr(), room) {
            *current = Weak::new();
            true
        } else {
            false
        }
    }

    pub fn is_open(&self) -> bool {
        !*self.closed.borrow()
    }

    /// Write one line to the client, waiting for queue space
    pub async fn send_line(&self, text: &str) -> Result<(), ChatError> {
        self.enqueue(format!("{}\n", text)).await
    }

    /// Write one line without waiting.
    ///
    /// Fails when the client's queue is full, which room hubs treat as a
    /// dead client rather than stalling delivery to everyone else.
    pub fn try_send_line(&self, text: &str) -> Result<(), ChatError> {
        if !self.is_open() {
            return Err(ChatError::SessionClosed);
        }
        self.outbox
            .try_send(format!("{}\n", text))
            .map_err(|e| match e {
                TrySendError::Full(_) => ChatError::Transport(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "client is not keeping up with output",
                )),
                TrySendError::Closed(_) => ChatError::SessionClosed,
            })
    }

    /// Best-effort error line; failures are only logged
    pub async fn send_error(&self, text: &str) {
        if let Err(e) = self.send_line(text).await {
            tracing::debug!("Failed to send error to {}: {}", self.describe(), e);
        }
    }

    /// Write a prompt, then wait for the client's answer.
    ///
    /// The answer is trimmed; an empty line yields an empty string.
    pub async fn prompt_and_read(&self, prompt: &str) -> Result<String, ChatError> {
        self.enqueue(prompt.to_string()).await?;
        self.read_line().await
    }

    /// Wait for one line from the client
    pub async fn read_line(&self) -> Result<String, ChatError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return Err(ChatError::SessionClosed);
        }

        let mut reader = self.reader.lock().await;
        let line = tokio::select! {
            line = read_bounded_line(&mut *reader, self.max_line_length) => line?,
            _ = wait_closed(&mut closed) => return Err(ChatError::SessionClosed),
        };

        match line {
            Some(raw) => Ok(trim_line(&raw).to_string()),
            None => Err(ChatError::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "client closed the connection",
            ))),
        }
    }

    /// Close the session and leave its room.
    ///
    /// Idempotent and callable from any task; returns true only for the
    /// call that actually closed it. The writer task may have raised the
    /// flag already after a failed write, so room removal runs regardless.
    pub async fn close(&self) -> bool {
        let first = !self.closed.send_replace(true);

        if let Some(room) = self.current_room() {
            room.remove_member(self).await;
        }

        if first {
            tracing::info!("Session closed: {}", self.describe());
        }
        first
    }

    async fn enqueue(&self, chunk: String) -> Result<(), ChatError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return Err(ChatError::SessionClosed);
        }

        tokio::select! {
            sent = self.outbox.send(chunk) => sent.map_err(|_| ChatError::SessionClosed),
            _ = wait_closed(&mut closed) => Err(ChatError::SessionClosed),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("name", &self.name())
            .field("open", &self.is_open())
            .finish()
    }
}
