//! Rooms - named broadcast groups and their delivery hubs

mod directory;

pub use directory::RoomDirectory;

use crate::error::ChatError;
use crate::server::Session;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A chat room.
///
/// Owns its membership and a FIFO queue of outbound lines. Broadcasting only
/// enqueues; the hub task started by [`Room::spawn`] dequeues each line and
/// fans it out to whoever is a member at that moment.
pub struct Room {
    /// Room name (unique within the directory)
    name: String,

    /// Members by session ID
    members: Mutex<HashMap<Uuid, Arc<Session>>>,

    /// Producer side of the hub queue
    queue: mpsc::UnboundedSender<String>,

    /// Consumer side, taken by the hub when it starts
    inbox: std::sync::Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl Room {
    /// Create a room; its hub is not running until spawned
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let (queue, inbox) = mpsc::unbounded_channel();
        Arc::new(Self {
            name: name.into(),
            members: Mutex::new(HashMap::new()),
            queue,
            inbox: std::sync::Mutex::new(Some(inbox)),
        })
    }

    /// Get room name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a session, moving it out of any other room first.
    ///
    /// Fails if the session is closed, including when it closes while
    /// being added.
    pub async fn add_member(self: &Arc<Self>, session: &Arc<Session>) -> Result<(), ChatError> {
        if let Some(previous) = session.current_room() {
            if !Arc::ptr_eq(&previous, self) {
                previous.remove_member(session).await;
            }
        }

        {
            let mut members = self.members.lock().await;
            if !session.is_open() {
                return Err(ChatError::SessionClosed);
            }
            members
                .entry(session.id())
                .or_insert_with(|| Arc::clone(session));
            session.set_room(self);
        }

        // close() raises the flag before reading the room reference, so a
        // close racing with the insert above is caught by one side or the other.
        if !session.is_open() {
            self.remove_member(session).await;
            return Err(ChatError::SessionClosed);
        }

        tracing::info!("{} joined room '{}'", session.describe(), self.name);
        Ok(())
    }

    /// Remove a session; returns false if it was not a member
    pub async fn remove_member(&self, session: &Session) -> bool {
        let removed = {
            let mut members = self.members.lock().await;
            let removed = members.remove(&session.id()).is_some();
            session.clear_room_if(self);
            removed
        };

        if removed {
            tracing::info!("{} left room '{}'", session.describe(), self.name);
        }
        removed
    }

    /// Check if a session is a member
    pub async fn contains(&self, session: &Session) -> bool {
        self.members.lock().await.contains_key(&session.id())
    }

    /// Display names of all members, sorted
    pub async fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .members
            .lock()
            .await
            .values()
            .map(|member| member.name())
            .collect();
        names.sort();
        names
    }

    /// Get member count
    pub async fn member_count(&self) -> usize {
        self.members.lock().await.len()
    }

    /// Queue a line for every member; never waits on delivery
    pub fn broadcast(&self, text: impl Into<String>) {
        if self.queue.send(text.into()).is_err() {
            tracing::warn!("Room '{}' hub is not running, message dropped", self.name);
        }
    }

    /// Start the hub on the runtime
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }

    /// Hub loop: deliver queued lines in FIFO order.
    ///
    /// Runs for the life of the process. Only one hub may run per room.
    pub async fn run(self: Arc<Self>) {
        let inbox = self
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut inbox) = inbox else {
            tracing::warn!("Room '{}' hub is already running", self.name);
            return;
        };

        tracing::info!("Starting room '{}'", self.name);

        while let Some(text) = inbox.recv().await {
            self.deliver(&text).await;
        }

        tracing::info!("Room '{}' hub finished", self.name);
    }

    /// Fan one line out to the current members
    async fn deliver(&self, text: &str) {
        let members: Vec<Arc<Session>> = self.members.lock().await.values().cloned().collect();

        let mut failed = Vec::new();
        for member in members {
            if let Err(e) = member.try_send_line(text) {
                tracing::warn!(
                    "Failed to deliver to {} in room '{}': {}",
                    member.describe(),
                    self.name,
                    e
                );
                failed.push(member);
            }
        }

        for member in failed {
            member.close().await;
            self.remove_member(&member).await;
        }
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room").field("name", &self.name).finish()
    }
}
