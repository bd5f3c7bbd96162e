//! roomchat - a multi-room chat server for telnet-style clients
//!
//! This crate provides the core functionality for roomchat, including:
//! - Sessions wrapping each client's line-oriented stream
//! - Rooms that fan messages out to their members
//! - The per-connection protocol state machine and command table
//! - Configuration and the append-only message log
//!
//! # Architecture
//!
//! Each accepted connection runs in its own task, driven by the
//! `SessionCoordinator` through name entry, room selection and messaging.
//! Every room runs one hub task that delivers its queued lines in order.

pub mod config;
pub mod error;
pub mod message_log;
pub mod protocol;
pub mod room;
pub mod server;

pub use error::ChatError;
