//! Room commands and the handle used to send them.

use lingoforge_protocol::{GameSession, HostKey, PlayerAction, PlayerId, RoomCode};
use lingoforge_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::GameError;

/// Who is joining and how they prove an existing identity.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    /// The connection to bind. Must already be registered.
    pub conn_id: ConnectionId,
    pub name: String,
    pub user_id: Option<String>,
    /// Reclaims the creator's player.
    pub host_key: Option<HostKey>,
    /// Rebinds a disconnected player.
    pub player_id: Option<PlayerId>,
}

/// Result of a successful join. The joining connection has already been
/// sent `session_joined` by the time this is returned.
#[derive(Debug, Clone)]
pub struct Joined {
    pub player_id: PlayerId,
    /// Only present for the host.
    pub host_key: Option<HostKey>,
    /// `true` when an existing player was rebound rather than created.
    pub rebound: bool,
}

/// Host-only lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Pause,
    Resume,
    End,
}

/// Commands sent to a room actor through its mailbox.
///
/// The `oneshot::Sender` in most variants is the reply channel.
pub(crate) enum RoomCommand {
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<Result<Joined, GameError>>,
    },
    Control {
        player_id: PlayerId,
        control: Control,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Submit {
        player_id: PlayerId,
        action: PlayerAction,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Clap {
        player_id: PlayerId,
        target_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    /// Explicit `leave_session`.
    Leave {
        player_id: PlayerId,
        conn_id: ConnectionId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    /// The player's connection went away.
    Disconnect {
        player_id: PlayerId,
        conn_id: ConnectionId,
    },
    Snapshot {
        reply: oneshot::Sender<GameSession>,
    },
    Standings {
        reply: oneshot::Sender<String>,
    },
    /// Synthetic: the round deadline passed.
    RoundExpired,
    /// Synthetic: the duration cap passed.
    CapReached,
    /// Synthetic: the room sat idle or ended long enough to be dropped.
    Evict,
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone: it's a code plus an `mpsc::Sender`.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) fn new(code: RoomCode, sender: mpsc::Sender<RoomCommand>) -> Self {
        Self { code, sender }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// `false` once the actor has stopped.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Joins the room or rebinds an existing player to `request.conn_id`.
    pub async fn join(&self, request: JoinRequest) -> Result<Joined, GameError> {
        self.request(|reply| RoomCommand::Join { request, reply })
            .await?
    }

    /// Start, pause, resume, or end the game on behalf of `player_id`.
    pub async fn control(&self, player_id: PlayerId, control: Control) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::Control {
            player_id,
            control,
            reply,
        })
        .await?
    }

    pub async fn submit(&self, player_id: PlayerId, action: PlayerAction) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::Submit {
            player_id,
            action,
            reply,
        })
        .await?
    }

    pub async fn clap(&self, player_id: PlayerId, target_id: PlayerId) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::Clap {
            player_id,
            target_id,
            reply,
        })
        .await?
    }

    pub async fn leave(&self, player_id: PlayerId, conn_id: ConnectionId) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::Leave {
            player_id,
            conn_id,
            reply,
        })
        .await?
    }

    /// Reports a lost connection (fire-and-forget).
    pub async fn disconnect(&self, player_id: PlayerId, conn_id: ConnectionId) -> Result<(), GameError> {
        self.send(RoomCommand::Disconnect { player_id, conn_id })
            .await
    }

    /// The full, unredacted session.
    pub async fn snapshot(&self) -> Result<GameSession, GameError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Standings as CSV.
    pub async fn standings(&self) -> Result<String, GameError> {
        self.request(|reply| RoomCommand::Standings { reply }).await
    }

    /// Tells the room to stop without notifying anyone.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), GameError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| GameError::Unavailable(self.code.clone()))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(build(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| GameError::Unavailable(self.code.clone()))
    }
}
