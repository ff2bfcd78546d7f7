//! Error types for the session layer.

use lingoforge_transport::ConnectionId;

/// Errors that can occur while binding connections to players.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection was never registered or has already gone away.
    #[error("connection {0} is not registered")]
    NotRegistered(ConnectionId),
}
