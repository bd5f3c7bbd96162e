//! Session coordinator - the per-connection protocol state machine
//!
//! A connection moves through `Naming -> RoomSelection -> Messaging` and
//! ends in `Terminated`. Leaving a room loops back to `RoomSelection`.
//! Each state has one handler, and [`SessionCoordinator::step`] runs exactly
//! one of them, so every transition can be driven on its own.

use super::commands::CommandTable;
use super::session::{Session, SessionLimits};
use crate::config::{ChatConfig, Config, TextConfig};
use crate::error::ChatError;
use crate::message_log::MessageLog;
use crate::protocol::{format_chat_line, format_room_list};
use crate::room::{Room, RoomDirectory};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// Protocol state of one connection
#[derive(Debug, Clone)]
pub enum State {
    /// Waiting for a display name
    Naming,
    /// Waiting for a room index
    RoomSelection,
    /// In a room, exchanging lines
    Messaging(Arc<Room>),
    /// Closed; no further transitions
    Terminated,
}

impl State {
    pub fn is_terminated(&self) -> bool {
        matches!(self, State::Terminated)
    }
}

/// Drives connections from accept to close
pub struct SessionCoordinator {
    directory: Arc<RoomDirectory>,
    commands: CommandTable,
    message_log: MessageLog,
    text: TextConfig,
    chat: ChatConfig,
}

impl SessionCoordinator {
    pub fn new(config: &Config, directory: Arc<RoomDirectory>, message_log: MessageLog) -> Self {
        Self {
            directory,
            commands: CommandTable::new(&config.commands),
            message_log,
            text: config.text.clone(),
            chat: config.chat.clone(),
        }
    }

    pub fn directory(&self) -> &Arc<RoomDirectory> {
        &self.directory
    }

    /// Serve one client stream until its session terminates
    pub async fn handle_connection<S>(&self, stream: S, endpoint: impl Into<String>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let session = Session::with_limits(stream, endpoint, SessionLimits::from(&self.chat));
        tracing::debug!("Client connected: {}", session.describe());
        self.drive(&session).await;
    }

    /// Run the state machine from `Naming` to `Terminated`
    pub async fn drive(&self, session: &Arc<Session>) {
        let mut state = State::Naming;
        while !state.is_terminated() {
            state = self.step(session, state).await;
        }
        session.close().await;
        tracing::debug!("Client handler finished: {}", session.describe());
    }

    /// Run the handler for `state` once and return the next state
    pub async fn step(&self, session: &Arc<Session>, state: State) -> State {
        match state {
            State::Naming => self.on_naming(session).await,
            State::RoomSelection => self.on_room_selection(session).await,
            State::Messaging(room) => self.on_messaging(session, room).await,
            State::Terminated => {
                session.close().await;
                State::Terminated
            }
        }
    }

    async fn on_naming(&self, session: &Arc<Session>) -> State {
        match session.prompt_and_read(&self.text.name_prompt).await {
            Ok(name) if !name.is_empty() => {
                session.set_name(name);
                tracing::info!("User {} connected", session.describe());
                State::RoomSelection
            }
            Ok(_) => {
                session.send_error(&self.text.missing_name).await;
                tracing::info!("User {} failed to enter a name", session.describe());
                State::Terminated
            }
            Err(e) => {
                log_read_failure(session, "name", &e);
                State::Terminated
            }
        }
    }

    async fn on_room_selection(&self, session: &Arc<Session>) -> State {
        let menu = format_room_list(&self.text.room_list_header, self.directory.list());
        if let Err(e) = session.send_line(&menu).await {
            tracing::info!("Failed to send room list to {}: {}", session.describe(), e);
            return State::Terminated;
        }

        let input = match session.prompt_and_read(&self.text.room_prompt).await {
            Ok(input) => input,
            Err(e) => {
                log_read_failure(session, "room", &e);
                return State::Terminated;
            }
        };

        if input.is_empty() {
            session.send_error(&self.text.missing_room).await;
            tracing::info!("User {} failed to choose a room", session.describe());
            return State::Terminated;
        }

        let room = match self.directory.select_input(&input) {
            Ok(room) => Arc::clone(room),
            Err(e) => {
                session.send_error(&self.text.invalid_room).await;
                tracing::info!("User {} selected an invalid room: {}", session.describe(), e);
                return State::Terminated;
            }
        };

        match room.add_member(session).await {
            Ok(()) => State::Messaging(room),
            Err(e) => {
                tracing::info!("Failed to add {} to room '{}': {}", session.describe(), room.name(), e);
                State::Terminated
            }
        }
    }

    async fn on_messaging(&self, session: &Arc<Session>, room: Arc<Room>) -> State {
        if !session.is_open() {
            return State::Terminated;
        }

        let line = match session.prompt_and_read(&self.text.message_prompt).await {
            Ok(line) => line,
            Err(e) => {
                log_read_failure(session, "message", &e);
                return State::Terminated;
            }
        };

        if let Some(command) = self.commands.lookup(&line) {
            tracing::debug!("User {} ran {:?}", session.describe(), command);
            return command.apply(session, &room, &self.text).await;
        }

        if line.is_empty() {
            return State::Messaging(room);
        }

        let message = format_chat_line(&self.chat.timestamp_format, &session.name(), &line);
        room.broadcast(message.clone());

        if let Err(e) = self.message_log.record(room.name(), &message) {
            tracing::warn!("Failed to log message from {}: {}", session.describe(), e);
        }

        tracing::debug!(
            "User {} sent message {:?} to room '{}'",
            session.describe(),
            line,
            room.name()
        );

        State::Messaging(room)
    }
}

/// Log a failed read from a client.
///
/// Transport failures are ordinary disconnects; anything else is unexpected.
pub(super) fn log_read_failure(session: &Session, what: &str, error: &ChatError) {
    if error.is_transport() {
        tracing::info!("Failed to read {} from {}: {}", what, session.describe(), error);
    } else {
        tracing::warn!("Unexpected error reading {} from {}: {}", what, session.describe(), error);
    }
}
