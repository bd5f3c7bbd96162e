//! Configuration management

use anyhow::{bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    /// Room names, in the order they are offered to clients
    pub rooms: Vec<String>,

    pub log: LogConfig,
    pub chat: ChatConfig,
    pub commands: CommandsConfig,
    pub text: TextConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            rooms: vec!["General".to_string()],
            log: LogConfig::default(),
            chat: ChatConfig::default(),
            commands: CommandsConfig::default(),
            text: TextConfig::default(),
        }
    }
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub bind_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            bind_port: 2323,
        }
    }
}

/// Chat message log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// File every chat line is appended to
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("messages.log"),
        }
    }
}

/// Per-session limits and message formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// strftime format for the timestamp in front of each chat line
    pub timestamp_format: String,

    /// Longest line accepted from a client, in bytes, excluding its terminator
    pub max_line_length: usize,

    /// Lines queued for a client before it counts as stalled
    pub outbox_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            timestamp_format: "%-I:%M%p".to_string(),
            max_line_length: crate::protocol::MAX_LINE_LENGTH,
            outbox_capacity: 256,
        }
    }
}

/// Command tokens recognised in the messaging loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub help: String,
    pub rename: String,
    pub leave: String,
    pub quit: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            help: "/help".to_string(),
            rename: "/nick".to_string(),
            leave: "/leave".to_string(),
            quit: "/quit".to_string(),
        }
    }
}

impl CommandsConfig {
    fn tokens(&self) -> [&str; 4] {
        [&self.help, &self.rename, &self.leave, &self.quit]
    }
}

/// User-visible wording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub name_prompt: String,
    pub room_list_header: String,
    pub room_prompt: String,
    pub message_prompt: String,
    pub rename_prompt: String,
    pub help: String,
    pub goodbye: String,
    pub missing_name: String,
    pub missing_room: String,
    pub invalid_room: String,
    pub unchanged_name: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            name_prompt: "Name: ".to_string(),
            room_list_header: "Available rooms:".to_string(),
            room_prompt: "Enter the number of the room to join: ".to_string(),
            message_prompt: ">> ".to_string(),
            rename_prompt: "New name: ".to_string(),
            help: concat!(
                "Available commands:\n",
                "/help: show this help\n",
                "/nick: change your name\n",
                "/leave: leave the current room\n",
                "/quit: disconnect"
            )
            .to_string(),
            goodbye: "Bye!".to_string(),
            missing_name: "A name is required.".to_string(),
            missing_room: "A room is required.".to_string(),
            invalid_room: "That room does not exist.".to_string(),
            unchanged_name: "Name unchanged.".to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML or JSON file, chosen by extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config {}", path.display()))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rooms.is_empty() {
            bail!("At least one room must be configured");
        }

        let mut seen = HashSet::new();
        for room in &self.rooms {
            if room.trim().is_empty() {
                bail!("Room names must not be blank");
            }
            if !seen.insert(room.as_str()) {
                bail!("Duplicate room name '{}'", room);
            }
        }

        let tokens = self.commands.tokens();
        if tokens.iter().any(|token| token.trim().is_empty()) {
            bail!("Command tokens must not be blank");
        }
        let distinct: HashSet<_> = tokens.iter().collect();
        if distinct.len() != tokens.len() {
            bail!("Command tokens must be distinct");
        }

        if StrftimeItems::new(&self.chat.timestamp_format).any(|item| matches!(item, Item::Error)) {
            bail!("Invalid chat.timestamp_format '{}'", self.chat.timestamp_format);
        }
        if self.chat.max_line_length == 0 {
            bail!("chat.max_line_length must be greater than zero");
        }
        if self.chat.outbox_capacity == 0 {
            bail!("chat.outbox_capacity must be greater than zero");
        }

        Ok(())
    }

    /// Address the listener binds to, as `addr:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.bind_port)
    }
}
