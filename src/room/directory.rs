//! Room directory - the fixed, ordered set of rooms

use super::Room;
use crate::config::Config;
use crate::error::ChatError;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Rooms created at startup, addressed by their position.
///
/// Immutable after construction, so indices shown to one client stay valid
/// for every other client.
#[derive(Debug)]
pub struct RoomDirectory {
    rooms: Vec<Arc<Room>>,
}

impl RoomDirectory {
    /// Create one room per name, keeping the given order
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rooms: names.into_iter().map(|name| Room::new(name)).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rooms.iter().cloned())
    }

    /// Room names in index order
    pub fn list(&self) -> Vec<&str> {
        self.rooms.iter().map(|room| room.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// All rooms in index order
    pub fn rooms(&self) -> &[Arc<Room>] {
        &self.rooms
    }

    /// Room at `index`; anything outside `[0, len)` is an invalid selection
    pub fn select(&self, index: i64) -> Result<&Arc<Room>, ChatError> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.rooms.get(index))
            .ok_or_else(|| ChatError::InvalidSelection {
                input: index.to_string(),
            })
    }

    /// Parse a client's answer as an index and select that room
    pub fn select_input(&self, input: &str) -> Result<&Arc<Room>, ChatError> {
        let index: i64 = input
            .trim()
            .parse()
            .map_err(|_| ChatError::InvalidSelection {
                input: input.to_string(),
            })?;
        self.select(index)
    }

    /// Spawn the hub of every room
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.rooms.iter().map(Room::spawn).collect()
    }
}
