//! The session store: every live room, keyed by code.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lingoforge_protocol::{
    Deck, GameMode, GamePlayer, GameSession, GameSettings, HostKey, PlayerId, RoomCode,
};
use lingoforge_session::{ConnectionRegistry, generate_host_key, generate_player_id, generate_room_code};
use lingoforge_timer::Clock;

use crate::coordinator::spawn_room;
use crate::{GameError, RoomConfig, RoomHandle};

/// Collisions tolerated at one code length before trying a longer one.
const ATTEMPTS_PER_LENGTH: usize = 8;

pub(crate) type RoomMap = DashMap<RoomCode, RoomHandle>;

/// Everything needed to host a new game.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub mode: GameMode,
    pub settings: GameSettings,
    pub deck: Deck,
    pub host_name: String,
    pub user_id: Option<String>,
}

/// A freshly created room. The host player exists but is not connected
/// until someone joins with `host_key`.
#[derive(Clone)]
pub struct Created {
    pub code: RoomCode,
    pub host_id: PlayerId,
    pub host_key: HostKey,
    pub handle: RoomHandle,
}

/// Registry of active rooms.
///
/// Cloning is cheap and every clone sees the same rooms. Rooms remove
/// themselves when evicted.
#[derive(Clone)]
pub struct SessionStore {
    rooms: Arc<RoomMap>,
    registry: ConnectionRegistry,
    config: Arc<RoomConfig>,
    clock: Clock,
}

impl SessionStore {
    pub fn new(registry: ConnectionRegistry, config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            registry,
            config: Arc::new(config),
            clock: Clock::new(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room under a fresh code and starts its actor.
    ///
    /// Codes start at four characters and grow toward six when short
    /// codes keep colliding.
    pub fn create_session(&self, request: NewSession) -> Result<Created, GameError> {
        validate_settings(&request.settings)?;
        if request.deck.is_empty() {
            return Err(GameError::InvalidRequest("deck has no cards".into()));
        }
        let host_name = clean_name(&request.host_name, self.config.max_name_len)?;

        let lengths = RoomCode::MIN_LEN..=RoomCode::MAX_LEN;
        for attempt in 0..ATTEMPTS_PER_LENGTH * lengths.clone().count() {
            let len = RoomCode::MIN_LEN + attempt / ATTEMPTS_PER_LENGTH;
            let code = generate_room_code(len);

            let slot = match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => {
                    tracing::debug!(%code, attempt, "room code collision");
                    continue;
                }
                Entry::Vacant(slot) => slot,
            };

            let now = self.clock.now_ms();
            let host_id = generate_player_id();
            let host_key = generate_host_key();
            let host = GamePlayer::new(host_id.clone(), host_name, request.user_id, now);
            let session = GameSession::new(
                code.clone(),
                request.mode,
                request.settings,
                request.deck,
                host,
                now,
            );

            let handle = spawn_room(
                session,
                host_key.clone(),
                Arc::clone(&self.config),
                self.registry.clone(),
                Arc::downgrade(&self.rooms),
                self.clock,
            );
            slot.insert(handle.clone());

            tracing::info!(%code, mode = %request.mode, %host_id, "room created");
            return Ok(Created {
                code,
                host_id,
                host_key,
                handle,
            });
        }

        Err(GameError::InvalidState("no room codes available".into()))
    }

    /// Looks up a live room.
    pub fn get(&self, code: &RoomCode) -> Result<RoomHandle, GameError> {
        let handle = self
            .rooms
            .get(code)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GameError::RoomNotFound(code.clone()))?;
        if !handle.is_alive() {
            self.forget_if_dead(code);
            return Err(GameError::RoomNotFound(code.clone()));
        }
        Ok(handle)
    }

    /// Drops the entry for `code` only while it still holds a stopped room.
    /// The code may have been handed to a new room since it was read.
    fn forget_if_dead(&self, code: &RoomCode) -> bool {
        self.rooms
            .remove_if(code, |_, handle| !handle.is_alive())
            .is_some()
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Stops every room. Used on server shutdown.
    pub async fn shutdown_all(&self) {
        let handles: Vec<RoomHandle> = self.rooms.iter().map(|e| e.value().clone()).collect();
        self.rooms.clear();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }
}

/// Trims a display name and checks it's usable.
pub(crate) fn clean_name(name: &str, max_len: usize) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidRequest("name must not be blank".into()));
    }
    if name.chars().count() > max_len {
        return Err(GameError::InvalidRequest(format!(
            "name must be at most {max_len} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_settings(settings: &GameSettings) -> Result<(), GameError> {
    if !(1..=600).contains(&settings.seconds_per_question) {
        return Err(GameError::InvalidRequest(
            "secondsPerQuestion must be between 1 and 600".into(),
        ));
    }
    if settings.max_players == Some(0) {
        return Err(GameError::InvalidRequest("maxPlayers must be at least 1".into()));
    }
    if settings.duration_cap_secs == Some(0) {
        return Err(GameError::InvalidRequest(
            "durationCapSecs must be at least 1".into(),
        ));
    }
    Ok(())
}
