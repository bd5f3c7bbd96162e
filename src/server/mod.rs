//! Server module - TCP listener, sessions and the per-connection protocol

mod commands;
mod connection;
mod coordinator;
mod listener;
mod session;

pub use commands::{Command, CommandTable};
pub use coordinator::{SessionCoordinator, State};
pub use listener::ChatServer;
pub use session::{Session, SessionLimits};
