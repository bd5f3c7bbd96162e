//! Command handling for in-room control lines

use super::coordinator::{log_read_failure, State};
use super::session::Session;
use crate::config::{CommandsConfig, TextConfig};
use crate::protocol::format_rename_notice;
use crate::room::Room;
use std::collections::HashMap;
use std::sync::Arc;

/// Control actions available while in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Rename,
    LeaveRoom,
    Quit,
}

/// Maps exact command tokens to commands.
///
/// Matching is case-sensitive on the whole trimmed line, so chat text equal
/// to a token can never be sent as chat.
#[derive(Debug, Clone)]
pub struct CommandTable {
    commands: HashMap<String, Command>,
}

impl CommandTable {
    pub fn new(config: &CommandsConfig) -> Self {
        let commands = [
            (&config.help, Command::Help),
            (&config.rename, Command::Rename),
            (&config.leave, Command::LeaveRoom),
            (&config.quit, Command::Quit),
        ]
        .into_iter()
        .map(|(token, command)| (token.clone(), command))
        .collect();

        Self { commands }
    }

    /// Command for `line`, if it is exactly a known token
    pub fn lookup(&self, line: &str) -> Option<Command> {
        self.commands.get(line).copied()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new(&CommandsConfig::default())
    }
}

impl Command {
    /// Run the command for `session` in `room` and return the next state
    pub async fn apply(self, session: &Arc<Session>, room: &Arc<Room>, text: &TextConfig) -> State {
        match self {
            Command::Help => match session.send_line(&text.help).await {
                Ok(()) => State::Messaging(Arc::clone(room)),
                Err(e) => {
                    tracing::info!("Failed to send help to {}: {}", session.describe(), e);
                    State::Terminated
                }
            },
            Command::Rename => rename(session, room, text).await,
            Command::LeaveRoom => {
                room.remove_member(session).await;
                State::RoomSelection
            }
            Command::Quit => {
                // Queued before the close, so the writer flushes it on the way out.
                session.send_error(&text.goodbye).await;
                session.close().await;
                State::Terminated
            }
        }
    }
}

async fn rename(session: &Arc<Session>, room: &Arc<Room>, text: &TextConfig) -> State {
    let new_name = match session.prompt_and_read(&text.rename_prompt).await {
        Ok(name) => name,
        Err(e) => {
            log_read_failure(session, "new name", &e);
            return State::Terminated;
        }
    };

    if new_name.is_empty() {
        session.send_error(&text.unchanged_name).await;
        return State::Messaging(Arc::clone(room));
    }

    let old_name = session.set_name(new_name.clone());
    tracing::info!(
        "User {:?} ({}) changed name to {:?}",
        old_name,
        session.endpoint(),
        new_name
    );
    room.broadcast(format_rename_notice(&old_name, &new_name));

    State::Messaging(Arc::clone(room))
}
