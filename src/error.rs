//! Error types shared by sessions, rooms and the coordinator

use thiserror::Error;

/// Errors raised while serving a single connection
#[derive(Debug, Error)]
pub enum ChatError {
    /// Read or write failure on the client's stream
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The session was closed, locally or by the peer
    #[error("session closed")]
    SessionClosed,

    #[error("line exceeds {max} bytes")]
    LineTooLong { max: usize },

    /// Room index that is empty, non-numeric or out of range
    #[error("invalid room selection: {input:?}")]
    InvalidSelection { input: String },

    /// The chat message log could not accept a record
    #[error("message log unavailable: {0}")]
    LogSink(String),
}

impl ChatError {
    /// Whether this error ends the session it was raised on.
    ///
    /// Every stream-level failure is terminal; a full message log is not.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ChatError::Transport(_) | ChatError::SessionClosed | ChatError::LineTooLong { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(ChatError::from(io).is_transport());
        assert!(ChatError::SessionClosed.is_transport());
        assert!(ChatError::LineTooLong { max: 8 }.is_transport());
        assert!(!ChatError::InvalidSelection {
            input: "x".to_string()
        }
        .is_transport());
        assert!(!ChatError::LogSink("full".to_string()).is_transport());
    }
}
