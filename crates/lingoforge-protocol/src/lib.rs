//! Wire protocol for Lingoforge.
//!
//! This crate defines everything that crosses the socket:
//!
//! - **Identity** ([`PlayerId`], [`RoomCode`], [`HostKey`]) and routing
//!   ([`Recipient`]).
//! - **Decks** ([`Deck`], [`Card`], [`Direction`]): read-only input supplied
//!   by whoever creates a session.
//! - **Snapshots** ([`GameSession`], [`GamePlayer`], [`RoundState`]): the
//!   authoritative state broadcast after every settled mutation.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`GameEvent`],
//!   [`PlayerAction`]): the `{ type, payload }` envelopes.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]).
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (GameSession)
//! ```

mod codec;
mod deck;
mod error;
mod event;
mod message;
mod model;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use deck::{Card, Deck, Direction};
pub use error::ProtocolError;
pub use event::{EndReason, GameEvent, PlayerAction, RoundResult, StealOutcome};
pub use message::{ClientMessage, ServerMessage};
pub use model::{
    EventTone, GameMode, GamePlayer, GameSession, GameSettings, GameStatus, RoundAnswer,
    RoundState,
};
pub use types::{ErrorCode, HostKey, PlayerId, Recipient, RoomCode};
