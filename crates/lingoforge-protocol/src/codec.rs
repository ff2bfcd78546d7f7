//! Codec trait and implementations for serializing/deserializing messages.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts protocol values to bytes and back.
///
/// The server is written against this trait so the wire format can change
/// without touching room or session code.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that speaks JSON, the format browsers send over WebSocket
/// text frames.
///
/// ```rust
/// use lingoforge_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let msg: ClientMessage = JsonCodec.decode(br#"{"type":"ping"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::Ping);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
