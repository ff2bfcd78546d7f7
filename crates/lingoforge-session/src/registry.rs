//! The connection registry: which socket speaks for which player.
//!
//! # Concurrency note
//!
//! Two concurrent maps are the only shared state: connections keyed by id,
//! and the per-room `player → connection` index used for fan-out. No method
//! holds a guard on one map while locking the other, so room actors and
//! connection handlers can call in from any task.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use lingoforge_protocol::{ErrorCode, PlayerId, RoomCode, ServerMessage};
use lingoforge_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::SessionError;

/// Outbound queue for one connection. The connection's writer task drains
/// it onto the socket.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// The `(room, player)` pair a connection currently represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub code: RoomCode,
    pub player_id: PlayerId,
}

struct ConnectionEntry {
    sender: Outbound,
    binding: Option<Binding>,
}

#[derive(Default)]
struct Inner {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    rooms: DashMap<RoomCode, HashMap<PlayerId, ConnectionId>>,
}

/// Maps live connections to players and fans messages out per room.
///
/// Cloning is cheap and every clone sees the same registry.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly accepted connection with no binding yet.
    pub fn register(&self, conn_id: ConnectionId, sender: Outbound) {
        self.inner.connections.insert(
            conn_id,
            ConnectionEntry {
                sender,
                binding: None,
            },
        );
    }

    /// Forgets a connection entirely. Idempotent: a second call returns
    /// `None`. Returns the binding the connection held, if any.
    pub fn unregister(&self, conn_id: ConnectionId) -> Option<Binding> {
        let (_, entry) = self.inner.connections.remove(&conn_id)?;
        let binding = entry.binding?;
        self.remove_from_room(&binding, conn_id);
        Some(binding)
    }

    /// Makes `conn_id` the connection for `player_id` in `code`.
    ///
    /// Any earlier binding of this connection is dropped first. If another
    /// connection was speaking for the same player it is unbound, sent a
    /// `session_displaced` error, and returned.
    pub fn bind(
        &self,
        conn_id: ConnectionId,
        code: RoomCode,
        player_id: PlayerId,
    ) -> Result<Option<ConnectionId>, SessionError> {
        let binding = Binding {
            code: code.clone(),
            player_id: player_id.clone(),
        };

        let previous = {
            let mut entry = self
                .inner
                .connections
                .get_mut(&conn_id)
                .ok_or(SessionError::NotRegistered(conn_id))?;
            entry.binding.replace(binding)
        };
        if let Some(previous) = previous {
            self.remove_from_room(&previous, conn_id);
        }

        let displaced = self
            .inner
            .rooms
            .entry(code.clone())
            .or_default()
            .insert(player_id.clone(), conn_id)
            .filter(|old| *old != conn_id);

        if let Some(old) = displaced {
            let sender = self.inner.connections.get_mut(&old).map(|mut entry| {
                entry.binding = None;
                entry.sender.clone()
            });
            if let Some(sender) = sender {
                let _ = sender.send(ServerMessage::error(
                    ErrorCode::SessionDisplaced,
                    "this player was joined from another connection",
                ));
            }
            tracing::info!(%code, %player_id, displaced = %old, conn_id = %conn_id, "player rebound to new connection");
        }

        Ok(displaced)
    }

    /// Clears the connection's binding without unregistering it.
    pub fn unbind(&self, conn_id: ConnectionId) -> Option<Binding> {
        let binding = self
            .inner
            .connections
            .get_mut(&conn_id)
            .and_then(|mut entry| entry.binding.take())?;
        self.remove_from_room(&binding, conn_id);
        Some(binding)
    }

    pub fn binding(&self, conn_id: ConnectionId) -> Option<Binding> {
        self.inner
            .connections
            .get(&conn_id)
            .and_then(|entry| entry.binding.clone())
    }

    pub fn connection_for(&self, code: &RoomCode, player_id: &PlayerId) -> Option<ConnectionId> {
        self.inner
            .rooms
            .get(code)
            .and_then(|players| players.get(player_id).copied())
    }

    /// Queues a message for one connection. Returns `false` if the
    /// connection is gone.
    pub fn send(&self, conn_id: ConnectionId, msg: ServerMessage) -> bool {
        let sender = match self.inner.connections.get(&conn_id) {
            Some(entry) => entry.sender.clone(),
            None => return false,
        };
        sender.send(msg).is_ok()
    }

    /// Sends a per-player message to every connection bound in `code`.
    /// Players for whom `build` returns `None` are skipped. Returns how
    /// many messages were queued.
    pub fn fan_out<F>(&self, code: &RoomCode, mut build: F) -> usize
    where
        F: FnMut(&PlayerId) -> Option<ServerMessage>,
    {
        let targets: Vec<(PlayerId, ConnectionId)> = match self.inner.rooms.get(code) {
            Some(players) => players.iter().map(|(p, c)| (p.clone(), *c)).collect(),
            None => return 0,
        };

        targets
            .into_iter()
            .filter_map(|(player_id, conn_id)| build(&player_id).map(|msg| (conn_id, msg)))
            .filter(|(conn_id, msg)| self.send(*conn_id, msg.clone()))
            .count()
    }

    /// Drops every binding into `code`, optionally telling each connection
    /// why. Used when a room is evicted. Returns the released connections.
    pub fn release_room(&self, code: &RoomCode, notice: Option<ServerMessage>) -> Vec<ConnectionId> {
        let Some((_, players)) = self.inner.rooms.remove(code) else {
            return Vec::new();
        };

        let mut released = Vec::with_capacity(players.len());
        for conn_id in players.into_values() {
            let sender = self.inner.connections.get_mut(&conn_id).and_then(|mut entry| {
                let bound_here = entry.binding.as_ref().is_some_and(|b| &b.code == code);
                if bound_here {
                    entry.binding = None;
                    Some(entry.sender.clone())
                } else {
                    None
                }
            });
            if let Some(sender) = sender {
                if let Some(msg) = &notice {
                    let _ = sender.send(msg.clone());
                }
                released.push(conn_id);
            }
        }
        tracing::debug!(%code, count = released.len(), "room bindings released");
        released
    }

    /// Number of connections bound into `code`.
    pub fn room_size(&self, code: &RoomCode) -> usize {
        self.inner.rooms.get(code).map_or(0, |players| players.len())
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.connections.is_empty()
    }

    fn remove_from_room(&self, binding: &Binding, conn_id: ConnectionId) {
        let emptied = match self.inner.rooms.get_mut(&binding.code) {
            Some(mut players) => {
                if players.get(&binding.player_id) == Some(&conn_id) {
                    players.remove(&binding.player_id);
                }
                players.is_empty()
            }
            None => false,
        };
        if emptied {
            self.inner
                .rooms
                .remove_if(&binding.code, |_, players| players.is_empty());
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
