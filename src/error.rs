// MIT License - Copyright (c) 2026 Peter Wright
// lircd client error taxonomy

use std::path::PathBuf;
use std::time::Duration;

/// All errors that can occur while talking to lircd.
#[derive(Debug, thiserror::Error)]
pub enum LircError {
    /// The socket could not be established at construction time.
    #[error("Failed to connect to lircd at {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Socket closed by lircd")]
    Disconnected,

    #[error("Timed out after {timeout:?} waiting for a reply packet")]
    Timeout { timeout: Duration },

    /// The reply block did not match the packet grammar. `lines` holds the
    /// offending packet split on newlines.
    #[error("Invalid reply packet: {details}: {lines:?}")]
    Parse { details: String, lines: Vec<String> },

    #[error("Configuration error: {details}")]
    Config { details: String },
}

impl LircError {
    /// Whether this error came from the channel itself (write, read, timeout
    /// or peer close) rather than from connection setup or packet parsing.
    pub fn is_socket_error(&self) -> bool {
        matches!(
            self,
            LircError::Io(_) | LircError::Disconnected | LircError::Timeout { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LircError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, LircError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_duration() {
        let err = LircError::Timeout {
            timeout: Duration::from_secs(5),
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 5s waiting for a reply packet"
        );
        assert!(err.is_timeout());
        assert!(err.is_socket_error());
    }

    #[test]
    fn test_error_classification() {
        assert!(LircError::Disconnected.is_socket_error());
        assert!(!LircError::Disconnected.is_timeout());

        let parse = LircError::Parse {
            details: "unexpected line".to_string(),
            lines: vec!["BEGIN".to_string()],
        };
        assert!(!parse.is_socket_error());

        let conn = LircError::Connection {
            path: PathBuf::from("/var/run/lirc/lircd"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!conn.is_socket_error());
        assert!(conn.to_string().contains("/var/run/lirc/lircd"));
    }
}
