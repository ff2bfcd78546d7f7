//! Unified error type for the Lingoforge server.

use lingoforge_protocol::ProtocolError;
use lingoforge_room::GameError;
use lingoforge_transport::TransportError;

/// Top-level error that wraps the layer errors a server can hit.
#[derive(Debug, thiserror::Error)]
pub enum LingoforgeError {
    /// Binding, accepting, or talking to a socket.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding an envelope.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room rejected a command.
    #[error(transparent)]
    Game(#[from] GameError),
}
