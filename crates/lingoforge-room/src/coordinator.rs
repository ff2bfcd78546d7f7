//! The session coordinator: one actor task per room.
//!
//! The actor is the only code that ever touches its `GameSession`. Client
//! commands arrive through the bounded mailbox and timer expiries arrive as
//! synthetic commands in the same `select!`, so a room handles one thing
//! at a time, in arrival order.
//!
//! A successful command settles (win check, round timer) before anything
//! is broadcast. Viewers get the snapshot first, then the events.

use std::ops::ControlFlow;
use std::sync::{Arc, Weak};

use lingoforge_modes::{
    ActionContext, Events, ModeEngine, RandomSource, SeededRandom, engine_for, standings_csv,
};
use lingoforge_protocol::{
    EndReason, ErrorCode, GameEvent, GamePlayer, GameSession, GameStatus, HostKey, PlayerAction,
    PlayerId, Recipient, ServerMessage,
};
use lingoforge_session::{ConnectionRegistry, generate_player_id};
use lingoforge_timer::{Clock, RoundTimer};
use lingoforge_transport::ConnectionId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::room::RoomCommand;
use crate::store::{RoomMap, clean_name};
use crate::{Control, GameError, JoinRequest, Joined, RoomConfig, RoomHandle};

/// Starts a room actor for `session` and returns its handle.
pub(crate) fn spawn_room(
    session: GameSession,
    host_key: HostKey,
    config: Arc<RoomConfig>,
    registry: ConnectionRegistry,
    rooms: Weak<RoomMap>,
    clock: Clock,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.mailbox_size);
    let code = session.code.clone();
    let rng: Box<dyn RandomSource> = match config.rng_seed {
        Some(seed) => Box::new(SeededRandom::from_seed(seed)),
        None => Box::new(SeededRandom::from_os_rng()),
    };

    let actor = Coordinator {
        engine: engine_for(session.mode, &config.rules),
        creator_id: session.host_id.clone(),
        session,
        host_key,
        rng,
        registry,
        rooms,
        clock,
        config,
        receiver: rx,
        round_timer: RoundTimer::new("round"),
        cap_timer: RoundTimer::new("duration_cap"),
        evict_timer: RoundTimer::new("eviction"),
        eviction: None,
        auto_paused: false,
    };
    tokio::spawn(actor.run());

    RoomHandle::new(code, tx)
}

/// Why the eviction timer is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eviction {
    Idle,
    Ended,
}

/// How a join resolved to a player.
enum Identity {
    Existing(PlayerId),
    New(GamePlayer),
}

struct Coordinator {
    session: GameSession,
    engine: Box<dyn ModeEngine>,
    /// The player created with the room; the host key always maps here.
    creator_id: PlayerId,
    host_key: HostKey,
    rng: Box<dyn RandomSource>,
    registry: ConnectionRegistry,
    rooms: Weak<RoomMap>,
    clock: Clock,
    config: Arc<RoomConfig>,
    receiver: mpsc::Receiver<RoomCommand>,
    round_timer: RoundTimer,
    cap_timer: RoundTimer,
    evict_timer: RoundTimer,
    eviction: Option<Eviction>,
    /// Paused because the last connected player left, not by the host.
    auto_paused: bool,
}

impl Coordinator {
    async fn run(mut self) {
        info!(code = %self.session.code, mode = %self.session.mode, "room actor started");
        self.refresh_eviction();

        loop {
            let cmd = tokio::select! {
                biased;
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => break,
                },
                () = self.round_timer.expired() => RoomCommand::RoundExpired,
                () = self.cap_timer.expired() => RoomCommand::CapReached,
                () = self.evict_timer.expired() => RoomCommand::Evict,
            };
            if self.handle(cmd).is_break() {
                break;
            }
        }

        info!(code = %self.session.code, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) -> ControlFlow<()> {
        match cmd {
            RoomCommand::Join { request, reply } => {
                let result = self.handle_join(request);
                self.log_rejection("join", &result);
                let _ = reply.send(result);
            }
            RoomCommand::Control {
                player_id,
                control,
                reply,
            } => {
                let result = self.handle_control(&player_id, control);
                self.log_rejection("control", &result);
                let _ = reply.send(result);
            }
            RoomCommand::Submit {
                player_id,
                action,
                reply,
            } => {
                let result = self.handle_submit(&player_id, action);
                self.log_rejection("submit", &result);
                let _ = reply.send(result);
            }
            RoomCommand::Clap {
                player_id,
                target_id,
                reply,
            } => {
                let result = self.handle_clap(&player_id, &target_id);
                self.log_rejection("clap", &result);
                let _ = reply.send(result);
            }
            RoomCommand::Leave {
                player_id,
                conn_id,
                reply,
            } => {
                self.handle_leave(&player_id, conn_id);
                let _ = reply.send(Ok(()));
            }
            RoomCommand::Disconnect { player_id, conn_id } => {
                self.handle_disconnect(&player_id, conn_id);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.clone());
            }
            RoomCommand::Standings { reply } => {
                let _ = reply.send(standings_csv(self.engine.as_ref(), &self.session));
            }
            RoomCommand::RoundExpired => self.on_round_expired(),
            RoomCommand::CapReached => self.on_cap_reached(),
            RoomCommand::Evict => {
                self.evict();
                return ControlFlow::Break(());
            }
            RoomCommand::Shutdown => {
                info!(code = %self.session.code, "room shutting down");
                self.stop_timers();
                self.registry.release_room(&self.session.code, None);
                return ControlFlow::Break(());
            }
        }
        self.refresh_eviction();
        ControlFlow::Continue(())
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn log_rejection<T>(&self, command: &'static str, result: &Result<T, GameError>) {
        if let Err(err) = result {
            debug!(code = %self.session.code, command, %err, "command rejected");
        }
    }

    // -----------------------------------------------------------------
    // Joining
    // -----------------------------------------------------------------

    fn handle_join(&mut self, request: JoinRequest) -> Result<Joined, GameError> {
        if self.session.status == GameStatus::Ended {
            return Err(GameError::GameAlreadyEnded(self.session.code.clone()));
        }
        let now = self.now();
        let identity = self.resolve_identity(&request, now)?;
        let player_id = match &identity {
            Identity::Existing(id) => id.clone(),
            Identity::New(player) => player.id.clone(),
        };

        // Bind before touching the session so a vanished connection
        // leaves nothing behind.
        self.registry
            .bind(request.conn_id, self.session.code.clone(), player_id.clone())?;

        let rebound = match identity {
            Identity::New(mut player) => {
                player.connected = true;
                info!(code = %self.session.code, %player_id, name = %player.name, "player joined");
                self.session.players.push(player);
                false
            }
            Identity::Existing(_) => {
                if let Some(player) = self.session.player_mut(&player_id) {
                    player.connected = true;
                }
                info!(code = %self.session.code, %player_id, conn_id = %request.conn_id, "player rebound");
                true
            }
        };

        let mut events = Vec::new();
        if player_id == self.creator_id && !self.session.is_host(&player_id) {
            self.set_host(player_id.clone(), &mut events);
        } else {
            self.migrate_host_if_absent(&mut events);
        }
        if self.session.status == GameStatus::Paused && self.auto_paused {
            self.resume(now, &mut events);
        }
        if self.session.status == GameStatus::Playing {
            events.extend(self.engine.on_roster_change(&mut self.session, now));
        }
        self.settle(&mut events);

        let host_key = (player_id == self.creator_id).then(|| self.host_key.clone());
        self.registry.send(
            request.conn_id,
            ServerMessage::SessionJoined {
                code: self.session.code.clone(),
                player_id: player_id.clone(),
                host_key: host_key.clone(),
                session: self.session.view_for(&player_id),
            },
        );
        self.publish(events);

        Ok(Joined {
            player_id,
            host_key,
            rebound,
        })
    }

    /// Works out who the joiner is without changing anything.
    ///
    /// Order: host key, then stored player id, then linked account, then a
    /// brand new player.
    fn resolve_identity(&self, request: &JoinRequest, now: u64) -> Result<Identity, GameError> {
        if let Some(key) = &request.host_key {
            if *key == self.host_key {
                return Ok(Identity::Existing(self.creator_id.clone()));
            }
            warn!(code = %self.session.code, conn_id = %request.conn_id, "join with mismatched host key");
        }

        // A stored player id is proof enough and takes over from whatever
        // connection still holds it. A linked account only picks up a
        // player nobody is speaking for.
        let by_id = request
            .player_id
            .as_ref()
            .and_then(|id| self.session.player(id));
        if let Some(existing) = by_id {
            if existing.id == self.creator_id {
                return Err(GameError::NotHost);
            }
            return Ok(Identity::Existing(existing.id.clone()));
        }
        let by_account = request.user_id.as_deref().and_then(|uid| {
            self.session
                .players
                .iter()
                .find(|p| p.user_id.as_deref() == Some(uid))
        });
        if let Some(existing) = by_account {
            if existing.id == self.creator_id {
                return Err(GameError::NotHost);
            }
            if existing.connected {
                return Err(GameError::InvalidState(
                    "that account is already playing".into(),
                ));
            }
            return Ok(Identity::Existing(existing.id.clone()));
        }

        let settings = &self.session.settings;
        if self.session.status != GameStatus::Lobby && !settings.allow_late_join {
            return Err(GameError::InvalidState("the game has already started".into()));
        }
        if let Some(max) = settings.max_players {
            if self.session.players.len() >= max as usize {
                return Err(GameError::RoomFull(self.session.code.clone()));
            }
        }
        if settings.classroom_only && request.user_id.is_none() {
            return Err(GameError::InvalidRequest(
                "this game is limited to classroom members".into(),
            ));
        }

        let name = clean_name(&request.name, self.config.max_name_len)?;
        let mut player = GamePlayer::new(generate_player_id(), name, request.user_id.clone(), now);
        if self.session.status != GameStatus::Lobby {
            self.engine.admit_player(&self.session, &mut player, now);
        }
        Ok(Identity::New(player))
    }

    // -----------------------------------------------------------------
    // Host controls
    // -----------------------------------------------------------------

    fn handle_control(&mut self, player_id: &PlayerId, control: Control) -> Result<(), GameError> {
        if self.session.status == GameStatus::Ended {
            return Err(GameError::GameAlreadyEnded(self.session.code.clone()));
        }
        if !self.session.is_host(player_id) {
            return Err(GameError::NotHost);
        }

        let now = self.now();
        let status = self.session.status;
        let mut events = Vec::new();
        match control {
            Control::Start if status == GameStatus::Lobby => self.start(now, &mut events),
            Control::Pause if status.can_transition_to(GameStatus::Paused) => {
                self.pause(now, false, &mut events)
            }
            Control::Resume if status == GameStatus::Paused => self.resume(now, &mut events),
            Control::End if status.can_transition_to(GameStatus::Ended) => {
                self.end_game(EndReason::Host, now, &mut events)
            }
            _ => {
                return Err(GameError::InvalidState(format!(
                    "cannot {control:?} while {status}"
                )));
            }
        }

        self.settle(&mut events);
        self.publish(events);
        Ok(())
    }

    fn set_status(&mut self, next: GameStatus) {
        debug_assert!(
            self.session.status.can_transition_to(next),
            "illegal transition {} -> {next}",
            self.session.status
        );
        self.session.status = next;
    }

    fn start(&mut self, now: u64, events: &mut Events) {
        self.set_status(GameStatus::Playing);
        self.session.started_at = Some(now);
        self.engine.initialize(&mut self.session, now);

        if let Some(cap) = self.session.settings.duration_cap_secs {
            let ends_at = now + u64::from(cap) * 1000;
            self.session.ends_at = Some(ends_at);
            self.cap_timer.arm_at(self.clock.instant_at(ends_at));
        }

        info!(
            code = %self.session.code,
            players = self.session.players.len(),
            rules = %self.config.rules.summary(self.session.mode),
            "game started"
        );
        events.push((Recipient::All, GameEvent::GameStarted));
    }

    fn pause(&mut self, now: u64, automatic: bool, events: &mut Events) {
        self.set_status(GameStatus::Paused);
        self.session.paused_at = Some(now);
        self.auto_paused = automatic;
        self.round_timer.pause();
        self.cap_timer.pause();
        info!(code = %self.session.code, automatic, "game paused");
        events.push((Recipient::All, GameEvent::GamePaused { automatic }));
    }

    /// Resumes play, pushing every in-flight deadline and timestamp back
    /// by however long the game sat paused.
    fn resume(&mut self, now: u64, events: &mut Events) {
        let paused_for = now.saturating_sub(self.session.paused_at.unwrap_or(now));
        self.shift_timestamps(paused_for);
        self.set_status(GameStatus::Playing);
        self.session.paused_at = None;
        self.auto_paused = false;
        self.round_timer.resume();
        self.cap_timer.resume();
        info!(code = %self.session.code, paused_ms = paused_for, "game resumed");
        events.push((Recipient::All, GameEvent::GameResumed));
    }

    fn shift_timestamps(&mut self, by: u64) {
        if by == 0 {
            return;
        }
        if let Some(round) = &mut self.session.round {
            round.started_at += by;
            round.ends_at += by;
            for answer in round.answers.values_mut() {
                answer.submitted_at += by;
            }
        }
        if let Some(ends_at) = &mut self.session.ends_at {
            *ends_at += by;
        }
        for player in &mut self.session.players {
            if let Some(started) = &mut player.card_started_at {
                *started += by;
            }
        }
    }

    fn end_game(&mut self, reason: EndReason, now: u64, events: &mut Events) {
        self.set_status(GameStatus::Ended);
        self.session.ended_at = Some(now);
        self.session.paused_at = None;
        self.session.round = None;
        self.session.winner_id = self.engine.winner(&self.session);
        self.auto_paused = false;
        self.round_timer.cancel();
        self.cap_timer.cancel();

        info!(
            code = %self.session.code,
            ?reason,
            winner = ?self.session.winner_id,
            "game ended"
        );
        events.push((
            Recipient::All,
            GameEvent::GameEnded {
                winner_id: self.session.winner_id.clone(),
                reason,
            },
        ));
    }

    // -----------------------------------------------------------------
    // Gameplay
    // -----------------------------------------------------------------

    fn handle_submit(&mut self, player_id: &PlayerId, action: PlayerAction) -> Result<(), GameError> {
        match self.session.status {
            GameStatus::Ended => return Err(GameError::GameAlreadyEnded(self.session.code.clone())),
            GameStatus::Playing => {}
            other => return Err(GameError::InvalidState(format!("the game is {other}"))),
        }
        match self.session.player(player_id) {
            None => return Err(GameError::InvalidAction(format!("unknown player {player_id}"))),
            Some(p) if !p.connected => {
                return Err(GameError::InvalidAction("player is not connected".into()));
            }
            Some(_) => {}
        }

        // Engines may fail part-way; work on a copy and keep it only on
        // success.
        let mut draft = self.session.clone();
        let now = self.now();
        let mut ctx = ActionContext {
            now,
            rng: self.rng.as_mut(),
        };
        let mut events = self
            .engine
            .apply_action(&mut draft, player_id, action, &mut ctx)?;
        self.session = draft;

        self.settle(&mut events);
        self.publish(events);
        Ok(())
    }

    fn handle_clap(&mut self, player_id: &PlayerId, target_id: &PlayerId) -> Result<(), GameError> {
        if self.session.status == GameStatus::Ended {
            return Err(GameError::GameAlreadyEnded(self.session.code.clone()));
        }
        if player_id == target_id {
            return Err(GameError::InvalidAction("cannot clap for yourself".into()));
        }
        if self.session.player(player_id).is_none() {
            return Err(GameError::InvalidAction(format!("unknown player {player_id}")));
        }
        let target = self
            .session
            .player_mut(target_id)
            .ok_or_else(|| GameError::InvalidAction(format!("unknown player {target_id}")))?;
        target.claps += 1;
        let total = target.claps;

        let mut events = vec![(
            Recipient::All,
            GameEvent::Clap {
                from_id: player_id.clone(),
                target_id: target_id.clone(),
                total,
            },
        )];
        self.settle(&mut events);
        self.publish(events);
        Ok(())
    }

    fn on_round_expired(&mut self) {
        if self.session.status != GameStatus::Playing {
            return;
        }
        let now = self.now();
        let mut events = self.engine.on_round_expired(&mut self.session, now);
        self.settle(&mut events);
        self.publish(events);
    }

    fn on_cap_reached(&mut self) {
        if self.session.status != GameStatus::Playing {
            return;
        }
        let mut events = Vec::new();
        self.end_game(EndReason::DurationCap, self.now(), &mut events);
        self.settle(&mut events);
        self.publish(events);
    }

    // -----------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------

    /// The connection may already be bound elsewhere when it moved to
    /// another room, so only a binding into this room is cleared.
    fn handle_leave(&mut self, player_id: &PlayerId, conn_id: ConnectionId) {
        let bound_here = self
            .registry
            .binding(conn_id)
            .is_some_and(|b| b.code == self.session.code && &b.player_id == player_id);
        if bound_here {
            self.registry.unbind(conn_id);
        }
        self.handle_disconnect(player_id, conn_id);
    }

    fn handle_disconnect(&mut self, player_id: &PlayerId, conn_id: ConnectionId) {
        if let Some(current) = self.registry.connection_for(&self.session.code, player_id) {
            debug!(
                code = %self.session.code,
                %player_id,
                stale = %conn_id,
                current = %current,
                "ignoring disconnect of replaced connection"
            );
            return;
        }
        self.mark_disconnected(player_id);
    }

    fn mark_disconnected(&mut self, player_id: &PlayerId) {
        match self.session.player_mut(player_id) {
            Some(player) if player.connected => player.connected = false,
            _ => return,
        }
        info!(code = %self.session.code, %player_id, "player disconnected");

        let now = self.now();
        let mut events = Vec::new();
        if self.session.status != GameStatus::Ended {
            if self.session.is_host(player_id) {
                self.migrate_host_if_absent(&mut events);
            }
            if self.session.status == GameStatus::Playing {
                if self.session.connected_count() == 0 {
                    self.pause(now, true, &mut events);
                } else {
                    events.extend(self.engine.on_roster_change(&mut self.session, now));
                }
            }
        }
        self.settle(&mut events);
        self.publish(events);
    }

    /// Hands the host role to the earliest-joined connected player when the
    /// current host is offline. With nobody connected the role stays put.
    fn migrate_host_if_absent(&mut self, events: &mut Events) {
        let host_connected = self
            .session
            .player(&self.session.host_id)
            .is_some_and(|p| p.connected);
        if host_connected {
            return;
        }
        if let Some(next) = self.session.earliest_connected().map(|p| p.id.clone()) {
            self.set_host(next, events);
        }
    }

    fn set_host(&mut self, host_id: PlayerId, events: &mut Events) {
        info!(code = %self.session.code, from = %self.session.host_id, to = %host_id, "host migrated");
        self.session.host_id = host_id.clone();
        events.push((Recipient::All, GameEvent::HostChanged { host_id }));
    }

    // -----------------------------------------------------------------
    // Settling and broadcast
    // -----------------------------------------------------------------

    /// Applies consequences of a mutation: the mode's win condition and
    /// the round deadline.
    fn settle(&mut self, events: &mut Events) {
        if self.session.status == GameStatus::Playing && self.engine.check_win_condition(&self.session) {
            self.end_game(EndReason::WinCondition, self.now(), events);
        }
        match (self.session.status, &self.session.round) {
            (GameStatus::Playing, Some(round)) => {
                self.round_timer.arm_at(self.clock.instant_at(round.ends_at));
            }
            (GameStatus::Paused, Some(_)) => {}
            _ => self.round_timer.cancel(),
        }
    }

    /// Sends each bound connection its view of the session, then the events
    /// it is entitled to.
    fn publish(&self, events: Events) {
        let session = &self.session;
        self.registry.fan_out(&session.code, |viewer| {
            session
                .player(viewer)
                .map(|_| ServerMessage::SessionState(session.view_for(viewer)))
        });
        for (recipient, event) in events {
            self.registry.fan_out(&session.code, |viewer| {
                recipient.includes(viewer).then(|| ServerMessage::GameEvent {
                    event: event.clone(),
                })
            });
        }
    }

    // -----------------------------------------------------------------
    // Eviction
    // -----------------------------------------------------------------

    fn refresh_eviction(&mut self) {
        let due = if self.session.status == GameStatus::Ended {
            Some((Eviction::Ended, self.config.ended_grace))
        } else if self.session.connected_count() == 0 {
            Some((Eviction::Idle, self.config.idle_timeout))
        } else {
            None
        };

        match due {
            Some((kind, after)) => {
                if self.eviction != Some(kind) || !self.evict_timer.is_armed() {
                    self.evict_timer.arm(after);
                    self.eviction = Some(kind);
                    debug!(code = %self.session.code, ?kind, ?after, "eviction scheduled");
                }
            }
            None => {
                self.evict_timer.cancel();
                self.eviction = None;
            }
        }
    }

    fn evict(&mut self) {
        info!(code = %self.session.code, reason = ?self.eviction, "room evicted");
        self.stop_timers();
        if let Some(rooms) = self.rooms.upgrade() {
            rooms.remove(&self.session.code);
        }
        self.registry.release_room(
            &self.session.code,
            Some(ServerMessage::error(
                ErrorCode::RoomNotFound,
                "this game has closed",
            )),
        );
    }

    fn stop_timers(&mut self) {
        self.round_timer.cancel();
        self.cap_timer.cancel();
        self.evict_timer.cancel();
    }
}
