//! Per-connection handler: registration, envelope routing, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler:
//!   1. Register an outbound queue in the connection registry and spawn a
//!      writer that drains it onto the socket.
//!   2. Loop: receive envelopes, decode, route to the session store or
//!      the bound room.
//!   3. On exit, unregister and tell the bound room the player dropped.
//!
//! Replies and broadcasts both go through the registry queue, so a
//! connection sees messages in the order its room produced them.

use std::sync::Arc;

use lingoforge_protocol::{ClientMessage, Codec, PlayerId, RoomCode, ServerMessage};
use lingoforge_room::{Control, GameError, JoinRequest, NewSession, RoomHandle};
use lingoforge_session::Binding;
use lingoforge_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::LingoforgeError;
use crate::server::ServerState;

/// Drop guard that unregisters the connection and reports the disconnect
/// to its room, even if the handler panics.
///
/// `Drop` is synchronous, so the room notification is a spawned task.
struct ConnectionGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let Some(binding) = self.state.registry.unregister(conn_id) else {
            return;
        };
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Ok(handle) = state.store.get(&binding.code) {
                let _ = handle.disconnect(binding.player_id, conn_id).await;
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), LingoforgeError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "connection opened");

    let (tx, rx) = mpsc::unbounded_channel();
    state.registry.register(conn_id, tx);
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };
    tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), rx));

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping malformed envelope");
                continue;
            }
        };

        if let Err(err) = dispatch(&state, conn_id, msg).await {
            tracing::debug!(%conn_id, error = %err, "request rejected");
            state
                .registry
                .send(conn_id, ServerMessage::error(err.code(), err.to_string()));
        }
    }

    let _ = conn.close().await;
    Ok(())
}

/// Drains the connection's outbound queue onto the socket. Ends when the
/// registry drops the sender or the socket stops accepting writes.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    let conn_id = conn.id();
    while let Some(msg) = rx.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = conn.send(bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Routes one decoded client message.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    msg: ClientMessage,
) -> Result<(), GameError> {
    match msg {
        ClientMessage::Ping => {
            state.registry.send(conn_id, ServerMessage::Pong);
        }

        ClientMessage::CreateSession {
            mode,
            settings,
            deck,
            host_name,
            user_id,
        } => {
            let created = state.store.create_session(NewSession {
                mode,
                settings,
                deck,
                host_name: host_name.clone(),
                user_id: user_id.clone(),
            })?;
            let previous = state.registry.binding(conn_id);
            let joined = created
                .handle
                .join(JoinRequest {
                    conn_id,
                    name: host_name,
                    user_id,
                    host_key: Some(created.host_key),
                    player_id: None,
                })
                .await?;
            leave_previous(state, conn_id, previous, created.handle.code(), &joined.player_id).await;
        }

        ClientMessage::JoinSession {
            code,
            name,
            user_id,
            host_key,
            player_id,
        } => {
            let handle = state.store.get(&code)?;
            let previous = state.registry.binding(conn_id);
            let joined = handle
                .join(JoinRequest {
                    conn_id,
                    name,
                    user_id,
                    host_key,
                    player_id,
                })
                .await?;
            tracing::debug!(%conn_id, %code, player_id = %joined.player_id, rebound = joined.rebound, "joined");
            leave_previous(state, conn_id, previous, handle.code(), &joined.player_id).await;
        }

        ClientMessage::StartGame { code, player_id } => {
            bound_room(state, conn_id, &code, &player_id)?
                .control(player_id, Control::Start)
                .await?;
        }
        ClientMessage::PauseGame { code, player_id } => {
            bound_room(state, conn_id, &code, &player_id)?
                .control(player_id, Control::Pause)
                .await?;
        }
        ClientMessage::ResumeGame { code, player_id } => {
            bound_room(state, conn_id, &code, &player_id)?
                .control(player_id, Control::Resume)
                .await?;
        }
        ClientMessage::EndGame { code, player_id } => {
            bound_room(state, conn_id, &code, &player_id)?
                .control(player_id, Control::End)
                .await?;
        }

        ClientMessage::SubmitAction {
            code,
            player_id,
            action,
        } => {
            bound_room(state, conn_id, &code, &player_id)?
                .submit(player_id, action)
                .await?;
        }

        ClientMessage::Clap {
            code,
            player_id,
            target_id,
        } => {
            bound_room(state, conn_id, &code, &player_id)?
                .clap(player_id, target_id)
                .await?;
        }

        ClientMessage::LeaveSession { code, player_id } => {
            bound_room(state, conn_id, &code, &player_id)?
                .leave(player_id, conn_id)
                .await?;
        }

        ClientMessage::ExportStandings { code } => {
            let handle = state.store.get(&code)?;
            let csv = handle.standings().await?;
            state.registry.send(
                conn_id,
                ServerMessage::Standings {
                    code: handle.code().clone(),
                    csv,
                },
            );
        }
    }
    Ok(())
}

/// Looks up the room and checks this connection really speaks for
/// `player_id` there.
fn bound_room<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    code: &RoomCode,
    player_id: &PlayerId,
) -> Result<RoomHandle, GameError> {
    let handle = state.store.get(code)?;
    let bound = state
        .registry
        .binding(conn_id)
        .is_some_and(|b| &b.code == code && &b.player_id == player_id);
    if !bound {
        tracing::warn!(%conn_id, %code, %player_id, "message for a player this connection is not bound to");
        return Err(GameError::InvalidAction(
            "this connection has not joined as that player".into(),
        ));
    }
    Ok(handle)
}

/// Tells the room this connection spoke for before a successful join that
/// its player left, so one connection never speaks for two players.
/// Nothing happens when the join rebound the same player.
async fn leave_previous<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    previous: Option<Binding>,
    code: &RoomCode,
    player_id: &PlayerId,
) {
    let Some(previous) = previous else {
        return;
    };
    if &previous.code == code && &previous.player_id == player_id {
        return;
    }
    if let Ok(handle) = state.store.get(&previous.code) {
        let _ = handle.leave(previous.player_id, conn_id).await;
    }
}
