//! Room actor behavior driven through `SessionStore` and `RoomHandle`,
//! with fake connections registered straight into the registry.
//!
//! All tests run on a paused tokio clock so round deadlines, the duration
//! cap, and eviction fire deterministically.

use std::time::Duration;

use lingoforge_protocol::{
    Card, Deck, EndReason, ErrorCode, GameEvent, GameMode, GameSession, GameSettings, GameStatus,
    PlayerAction, PlayerId, ServerMessage,
};
use lingoforge_room::{
    Control, Created, GameError, JoinRequest, NewSession, RoomConfig, SessionStore,
};
use lingoforge_session::ConnectionRegistry;
use lingoforge_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::time::sleep;

// =========================================================================
// Helpers
// =========================================================================

struct Client {
    conn_id: ConnectionId,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Client {
    fn connect(store: &SessionStore, id: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = ConnectionId::new(id);
        store.registry().register(conn_id, tx);
        Self { conn_id, rx }
    }

    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn events(&mut self) -> Vec<GameEvent> {
        self.drain()
            .into_iter()
            .filter_map(|msg| match msg {
                ServerMessage::GameEvent { event } => Some(event),
                _ => None,
            })
            .collect()
    }

    fn last_state(&mut self) -> Option<GameSession> {
        self.drain().into_iter().rev().find_map(|msg| match msg {
            ServerMessage::SessionState(session) => Some(session),
            _ => None,
        })
    }
}

fn deck(cards: usize) -> Deck {
    Deck {
        id: "deck-1".into(),
        name: "Kitchen".into(),
        target_language: "es".into(),
        cards: (0..cards)
            .map(|i| Card {
                id: format!("card-{i}"),
                english: format!("spoon {i}"),
                translation: format!("cuchara {i}"),
            })
            .collect(),
    }
}

fn store_with(config: RoomConfig) -> SessionStore {
    SessionStore::new(ConnectionRegistry::new(), config.with_rng_seed(7))
}

fn store() -> SessionStore {
    store_with(RoomConfig::default())
}

fn join(conn_id: ConnectionId, name: &str) -> JoinRequest {
    JoinRequest {
        conn_id,
        name: name.into(),
        user_id: None,
        host_key: None,
        player_id: None,
    }
}

/// Creates a room and connects its host on connection 1.
async fn hosted(store: &SessionStore, mode: GameMode, settings: GameSettings) -> (Created, Client) {
    let created = store
        .create_session(NewSession {
            mode,
            settings,
            deck: deck(6),
            host_name: "Ms. Rivera".into(),
            user_id: None,
        })
        .unwrap();
    let host = Client::connect(store, 1);
    let joined = created
        .handle
        .join(JoinRequest {
            host_key: Some(created.host_key.clone()),
            ..join(host.conn_id, "Ms. Rivera")
        })
        .await
        .unwrap();
    assert_eq!(joined.player_id, created.host_id);
    (created, host)
}

async fn guest(created: &Created, store: &SessionStore, id: u64, name: &str) -> (PlayerId, Client) {
    let client = Client::connect(store, id);
    let joined = created.handle.join(join(client.conn_id, name)).await.unwrap();
    (joined.player_id, client)
}

fn answer(session: &GameSession, player: &PlayerId, correct: bool) -> PlayerAction {
    let p = session.player(player).unwrap();
    let card = session.current_card(p).unwrap();
    PlayerAction::Answer {
        card_id: card.id.clone(),
        response: if correct {
            card.translation.clone()
        } else {
            "no idea".into()
        },
    }
}

fn sprint_settings() -> GameSettings {
    GameSettings {
        seconds_per_question: 10,
        ..GameSettings::default()
    }
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_join_sends_session_joined_before_broadcast() {
    let store = store();
    let (created, mut host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;

    let msgs = host.drain();
    match &msgs[0] {
        ServerMessage::SessionJoined {
            player_id,
            host_key,
            session,
            ..
        } => {
            assert_eq!(player_id, &created.host_id);
            assert_eq!(host_key.as_ref(), Some(&created.host_key));
            assert!(session.player(player_id).unwrap().connected);
        }
        other => panic!("expected session_joined first, got {other:?}"),
    }
    assert!(matches!(msgs[1], ServerMessage::SessionState(_)));
}

#[tokio::test(start_paused = true)]
async fn test_guest_join_gets_no_host_key() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let mut client = Client::connect(&store, 2);

    let joined = created.handle.join(join(client.conn_id, " Ana ")).await.unwrap();

    assert!(joined.host_key.is_none());
    assert!(!joined.rebound);
    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.player(&joined.player_id).unwrap().name, "Ana");
    assert!(matches!(
        client.drain().first(),
        Some(ServerMessage::SessionJoined { host_key: None, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_join_full_room_rejected() {
    let store = store();
    let settings = GameSettings {
        max_players: Some(2),
        ..GameSettings::default()
    };
    let (created, _host) = hosted(&store, GameMode::WordHeist, settings).await;
    guest(&created, &store, 2, "Ana").await;

    let late = Client::connect(&store, 3);
    let err = created.handle.join(join(late.conn_id, "Ben")).await.unwrap_err();
    assert!(matches!(err, GameError::RoomFull(_)));
    assert_eq!(created.handle.snapshot().await.unwrap().players.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_classroom_only_requires_linked_account() {
    let store = store();
    let settings = GameSettings {
        classroom_only: true,
        ..GameSettings::default()
    };
    let (created, _host) = hosted(&store, GameMode::WordHeist, settings).await;
    let client = Client::connect(&store, 2);

    let err = created.handle.join(join(client.conn_id, "Ana")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidRequest);

    let joined = created
        .handle
        .join(JoinRequest {
            user_id: Some("student-9".into()),
            ..join(client.conn_id, "Ana")
        })
        .await
        .unwrap();
    assert!(!joined.rebound);
}

#[tokio::test(start_paused = true)]
async fn test_join_after_end_rejected() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    created.handle.control(created.host_id.clone(), Control::Start).await.unwrap();
    created.handle.control(created.host_id.clone(), Control::End).await.unwrap();

    let client = Client::connect(&store, 2);
    let err = created.handle.join(join(client.conn_id, "Ana")).await.unwrap_err();
    assert!(matches!(err, GameError::GameAlreadyEnded(_)));
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_by_player_id_displaces_old_connection() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let (ana, mut old) = guest(&created, &store, 2, "Ana").await;
    old.drain();

    let new = Client::connect(&store, 3);
    let joined = created
        .handle
        .join(JoinRequest {
            player_id: Some(ana.clone()),
            ..join(new.conn_id, "Ana")
        })
        .await
        .unwrap();

    assert!(joined.rebound);
    assert_eq!(joined.player_id, ana);
    assert!(old.drain().iter().any(|msg| matches!(
        msg,
        ServerMessage::Error {
            code: ErrorCode::SessionDisplaced,
            ..
        }
    )));
    assert_eq!(
        store.registry().connection_for(&created.code, &ana),
        Some(new.conn_id)
    );

    // The displaced socket closing later must not mark Ana offline.
    store.registry().unregister(old.conn_id);
    created.handle.disconnect(ana.clone(), old.conn_id).await.unwrap();
    let snapshot = created.handle.snapshot().await.unwrap();
    assert!(snapshot.player(&ana).unwrap().connected);
}

#[tokio::test(start_paused = true)]
async fn test_creator_id_without_host_key_rejected() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let imposter = Client::connect(&store, 2);

    let err = created
        .handle
        .join(JoinRequest {
            player_id: Some(created.host_id.clone()),
            ..join(imposter.conn_id, "Ms. Rivera")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotHost));
}

// =========================================================================
// Host controls
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_end_game_in_lobby_is_invalid_state() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let before = created.handle.snapshot().await.unwrap();

    let err = created
        .handle
        .control(created.host_id.clone(), Control::End)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidState);
    assert_eq!(created.handle.snapshot().await.unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn test_illegal_transitions_are_invalid_state() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let id = created.host_id.clone();

    for control in [Control::Pause, Control::Resume] {
        let err = created.handle.control(id.clone(), control).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    created.handle.control(id.clone(), Control::Start).await.unwrap();
    for control in [Control::Start, Control::Resume] {
        let err = created.handle.control(id.clone(), control).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    created.handle.control(id.clone(), Control::Pause).await.unwrap();
    let err = created.handle.control(id.clone(), Control::Pause).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
    created.handle.control(id.clone(), Control::End).await.unwrap();
    assert_eq!(
        created.handle.snapshot().await.unwrap().status,
        GameStatus::Ended
    );
}

#[tokio::test(start_paused = true)]
async fn test_only_host_controls_game() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let (ana, _client) = guest(&created, &store, 2, "Ana").await;

    let err = created.handle.control(ana, Control::Start).await.unwrap_err();
    assert!(matches!(err, GameError::NotHost));
    assert_eq!(
        created.handle.snapshot().await.unwrap().status,
        GameStatus::Lobby
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_pause_resume_end() {
    let store = store();
    let (created, mut host) = hosted(&store, GameMode::LightningLadder, GameSettings::default()).await;
    let id = created.host_id.clone();
    host.drain();

    created.handle.control(id.clone(), Control::Start).await.unwrap();
    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, GameStatus::Playing);
    assert!(snapshot.started_at.is_some());

    let err = created.handle.control(id.clone(), Control::Start).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    created.handle.control(id.clone(), Control::Pause).await.unwrap();
    created.handle.control(id.clone(), Control::Resume).await.unwrap();
    created.handle.control(id.clone(), Control::End).await.unwrap();

    let events = host.events();
    assert_eq!(events[0], GameEvent::GameStarted);
    assert_eq!(events[1], GameEvent::GamePaused { automatic: false });
    assert_eq!(events[2], GameEvent::GameResumed);
    assert!(matches!(
        events[3],
        GameEvent::GameEnded {
            reason: EndReason::Host,
            ..
        }
    ));

    let err = created.handle.control(id, Control::Pause).await.unwrap_err();
    assert!(matches!(err, GameError::GameAlreadyEnded(_)));
}

// =========================================================================
// Gameplay
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_heist_answer_then_bank() {
    let store = store();
    let (created, mut host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let id = created.host_id.clone();
    created.handle.control(id.clone(), Control::Start).await.unwrap();
    host.drain();

    let snapshot = created.handle.snapshot().await.unwrap();
    created.handle.submit(id.clone(), answer(&snapshot, &id, true)).await.unwrap();
    created.handle.submit(id.clone(), PlayerAction::Bank).await.unwrap();

    let events = host.events();
    assert!(events.iter().any(|e| matches!(e, GameEvent::KeyEarned { unbanked: 1, .. })));
    assert!(events.iter().any(|e| matches!(e, GameEvent::Banked { amount: 1, total: 1, .. })));

    let snapshot = created.handle.snapshot().await.unwrap();
    let me = snapshot.player(&id).unwrap();
    assert_eq!(me.banked_keys, 1);
    assert_eq!(me.current_index, 1);
    assert!(!me.pending_decision);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_action_leaves_state_and_replies_to_sender_only() {
    let store = store();
    let (created, mut host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let (ana, mut client) = guest(&created, &store, 2, "Ana").await;
    created.handle.control(created.host_id.clone(), Control::Start).await.unwrap();
    host.drain();
    client.drain();
    let before = created.handle.snapshot().await.unwrap();

    let err = created.handle.submit(ana, PlayerAction::Bank).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidAction);
    assert_eq!(created.handle.snapshot().await.unwrap(), before);
    assert!(host.drain().is_empty());
    assert!(client.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_submit_outside_play_rejected() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let id = created.host_id.clone();

    let err = created.handle.submit(id.clone(), PlayerAction::Bank).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    created.handle.control(id.clone(), Control::Start).await.unwrap();
    created.handle.control(id.clone(), Control::Pause).await.unwrap();
    let err = created.handle.submit(id, PlayerAction::Bank).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[tokio::test(start_paused = true)]
async fn test_last_event_only_visible_to_its_player() {
    let store = store();
    let (created, mut host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let (ana, mut client) = guest(&created, &store, 2, "Ana").await;
    created.handle.control(created.host_id.clone(), Control::Start).await.unwrap();

    let snapshot = created.handle.snapshot().await.unwrap();
    created.handle.submit(ana.clone(), answer(&snapshot, &ana, false)).await.unwrap();

    let ana_view = client.last_state().unwrap();
    assert!(ana_view.player(&ana).unwrap().last_event.is_some());
    let host_view = host.last_state().unwrap();
    assert!(host_view.player(&ana).unwrap().last_event.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_claps_apply_in_order() {
    let store = store();
    let (created, mut host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let (ana, _a) = guest(&created, &store, 2, "Ana").await;
    let (ben, _b) = guest(&created, &store, 3, "Ben").await;
    host.drain();

    let mut tasks = Vec::new();
    for from in [ana.clone(), ben.clone()] {
        let handle = created.handle.clone();
        let target = created.host_id.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..10 {
                handle.clap(from.clone(), target.clone()).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let totals: Vec<u32> = host
        .events()
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::Clap { total, .. } => Some(total),
            _ => None,
        })
        .collect();
    assert_eq!(totals, (1..=20).collect::<Vec<u32>>());
    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.player(&created.host_id).unwrap().claps, 20);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_submits_apply_in_order() {
    let store = store();
    let (created, mut host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let (ana, _a) = guest(&created, &store, 2, "Ana").await;
    let (ben, _b) = guest(&created, &store, 3, "Ben").await;
    created.handle.control(created.host_id.clone(), Control::Start).await.unwrap();
    host.drain();

    let mut tasks = Vec::new();
    for player in [ana.clone(), ben.clone()] {
        let handle = created.handle.clone();
        tasks.push(tokio::spawn(async move {
            for k in 0..8 {
                let answer = PlayerAction::Answer {
                    card_id: format!("card-{}", k % 6),
                    response: format!("cuchara {}", k % 6),
                };
                handle.submit(player.clone(), answer).await.unwrap();
                handle.submit(player.clone(), PlayerAction::Risk).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Every event follows the snapshot that already reflects it.
    let mut latest: Option<GameSession> = None;
    let mut risks: Vec<(PlayerId, u32)> = Vec::new();
    for msg in host.drain() {
        match msg {
            ServerMessage::SessionState(session) => latest = Some(session),
            ServerMessage::GameEvent {
                event: GameEvent::RiskTaken { player_id, at_risk },
            } => {
                let state = latest.as_ref().expect("state before event");
                assert_eq!(state.player(&player_id).unwrap().unbanked_keys, at_risk);
                risks.push((player_id, at_risk));
            }
            _ => {}
        }
    }
    for player in [&ana, &ben] {
        let seen: Vec<u32> = risks
            .iter()
            .filter(|(id, _)| id == player)
            .map(|(_, at_risk)| *at_risk)
            .collect();
        assert_eq!(seen, (1..=8).collect::<Vec<u32>>());
    }

    let snapshot = created.handle.snapshot().await.unwrap();
    for player in [&ana, &ben] {
        let p = snapshot.player(player).unwrap();
        assert_eq!(p.unbanked_keys, 8);
        assert_eq!(p.current_index, 8);
        assert_eq!(p.correct, 8);
    }
}

#[tokio::test(start_paused = true)]
async fn test_clap_for_self_rejected() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let id = created.host_id.clone();

    let err = created.handle.clap(id.clone(), id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidAction);
}

// =========================================================================
// Survival Sprint rounds
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sprint_round_expires_and_silent_player_loses_heart() {
    let store = store();
    let (created, mut host) = hosted(&store, GameMode::SurvivalSprint, sprint_settings()).await;
    let (ana, _a) = guest(&created, &store, 2, "Ana").await;
    let (ben, _b) = guest(&created, &store, 3, "Ben").await;
    let id = created.host_id.clone();
    created.handle.control(id.clone(), Control::Start).await.unwrap();

    let snapshot = created.handle.snapshot().await.unwrap();
    created.handle.submit(id.clone(), answer(&snapshot, &id, true)).await.unwrap();
    created.handle.submit(ana.clone(), answer(&snapshot, &ana, true)).await.unwrap();
    assert_eq!(
        created.handle.snapshot().await.unwrap().round.unwrap().index,
        0,
        "round stays open while Ben is still thinking"
    );
    host.drain();

    sleep(Duration::from_secs(10) + Duration::from_millis(50)).await;

    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.round.as_ref().unwrap().index, 1);
    assert_eq!(snapshot.player(&ben).unwrap().hearts, 2);
    assert_eq!(snapshot.player(&ben).unwrap().incorrect, 1);
    assert_eq!(snapshot.player(&ana).unwrap().hearts, 3);
    assert!(snapshot.player(&ana).unwrap().score > 0);
    assert!(
        host.events()
            .iter()
            .any(|e| matches!(e, GameEvent::RoundResolved { round: 0, .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_sprint_round_resolves_when_everyone_answers() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::SurvivalSprint, sprint_settings()).await;
    let (ana, _a) = guest(&created, &store, 2, "Ana").await;
    let id = created.host_id.clone();
    created.handle.control(id.clone(), Control::Start).await.unwrap();

    let snapshot = created.handle.snapshot().await.unwrap();
    created.handle.submit(id.clone(), answer(&snapshot, &id, true)).await.unwrap();
    created.handle.submit(ana.clone(), answer(&snapshot, &ana, false)).await.unwrap();

    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.round.as_ref().unwrap().index, 1);
    assert_eq!(snapshot.player(&ana).unwrap().hearts, 2);
    assert_eq!(snapshot.player(&id).unwrap().score, 100);
}

#[tokio::test(start_paused = true)]
async fn test_sprint_pause_suspends_round_deadline() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::SurvivalSprint, sprint_settings()).await;
    let (_ana, _a) = guest(&created, &store, 2, "Ana").await;
    let id = created.host_id.clone();
    created.handle.control(id.clone(), Control::Start).await.unwrap();
    let started = created.handle.snapshot().await.unwrap().round.unwrap();

    sleep(Duration::from_secs(4)).await;
    created.handle.control(id.clone(), Control::Pause).await.unwrap();
    sleep(Duration::from_secs(60)).await;
    created.handle.control(id.clone(), Control::Resume).await.unwrap();

    let round = created.handle.snapshot().await.unwrap().round.unwrap();
    assert_eq!(round.index, 0);
    assert_eq!(round.ends_at, started.ends_at + 60_000);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(created.handle.snapshot().await.unwrap().round.unwrap().index, 0);
    sleep(Duration::from_secs(2)).await;
    assert_eq!(created.handle.snapshot().await.unwrap().round.unwrap().index, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sprint_last_survivor_wins() {
    let store = store();
    let (created, mut host) = hosted(&store, GameMode::SurvivalSprint, sprint_settings()).await;
    let (ana, _a) = guest(&created, &store, 2, "Ana").await;
    let id = created.host_id.clone();
    created.handle.control(id.clone(), Control::Start).await.unwrap();

    for _ in 0..3 {
        let snapshot = created.handle.snapshot().await.unwrap();
        created.handle.submit(id.clone(), answer(&snapshot, &id, true)).await.unwrap();
        created.handle.submit(ana.clone(), answer(&snapshot, &ana, false)).await.unwrap();
    }

    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, GameStatus::Ended);
    assert_eq!(snapshot.winner_id.as_ref(), Some(&id));
    assert!(snapshot.round.is_none());
    assert!(host.events().iter().any(|e| matches!(
        e,
        GameEvent::GameEnded {
            reason: EndReason::WinCondition,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_sprint_late_joiner_starts_on_current_round() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::SurvivalSprint, sprint_settings()).await;
    let (ana, _a) = guest(&created, &store, 2, "Ana").await;
    let id = created.host_id.clone();
    created.handle.control(id.clone(), Control::Start).await.unwrap();
    let snapshot = created.handle.snapshot().await.unwrap();
    created.handle.submit(id.clone(), answer(&snapshot, &id, true)).await.unwrap();
    created.handle.submit(ana.clone(), answer(&snapshot, &ana, true)).await.unwrap();

    let (late, _c) = guest(&created, &store, 3, "Cy").await;

    let snapshot = created.handle.snapshot().await.unwrap();
    let player = snapshot.player(&late).unwrap();
    assert_eq!(player.current_index, 1);
    assert_eq!(player.hearts, 3);
}

// =========================================================================
// Presence and host migration
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_host_disconnect_migrates_to_earliest_connected() {
    let store = store();
    let (created, host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let (ana, mut a) = guest(&created, &store, 2, "Ana").await;
    let (_ben, _b) = guest(&created, &store, 3, "Ben").await;
    a.drain();

    store.registry().unregister(host.conn_id);
    created.handle.disconnect(created.host_id.clone(), host.conn_id).await.unwrap();

    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.host_id, ana);
    assert!(!snapshot.player(&created.host_id).unwrap().connected);
    assert!(a.events().contains(&GameEvent::HostChanged { host_id: ana.clone() }));

    created.handle.control(ana, Control::Start).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_everyone_leaving_pauses_and_host_key_reclaims() {
    let store = store();
    let (created, host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let (ana, a) = guest(&created, &store, 2, "Ana").await;
    created.handle.control(created.host_id.clone(), Control::Start).await.unwrap();

    store.registry().unregister(host.conn_id);
    created.handle.disconnect(created.host_id.clone(), host.conn_id).await.unwrap();
    created.handle.leave(ana.clone(), a.conn_id).await.unwrap();

    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, GameStatus::Paused);
    assert_eq!(snapshot.host_id, ana);
    assert_eq!(snapshot.connected_count(), 0);

    let mut back = Client::connect(&store, 9);
    let joined = created
        .handle
        .join(JoinRequest {
            host_key: Some(created.host_key.clone()),
            ..join(back.conn_id, "whatever")
        })
        .await
        .unwrap();

    assert_eq!(joined.player_id, created.host_id);
    assert!(joined.rebound);
    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.host_id, created.host_id);
    assert_eq!(snapshot.status, GameStatus::Playing);
    let events = back.events();
    assert!(events.contains(&GameEvent::HostChanged {
        host_id: created.host_id.clone()
    }));
    assert!(events.contains(&GameEvent::GameResumed));
}

#[tokio::test(start_paused = true)]
async fn test_host_paused_game_stays_paused_on_rejoin() {
    let store = store();
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let (ana, a) = guest(&created, &store, 2, "Ana").await;
    created.handle.control(created.host_id.clone(), Control::Start).await.unwrap();
    created.handle.control(created.host_id.clone(), Control::Pause).await.unwrap();

    created.handle.leave(ana.clone(), a.conn_id).await.unwrap();
    let again = Client::connect(&store, 5);
    created
        .handle
        .join(JoinRequest {
            player_id: Some(ana),
            ..join(again.conn_id, "Ana")
        })
        .await
        .unwrap();

    assert_eq!(
        created.handle.snapshot().await.unwrap().status,
        GameStatus::Paused
    );
}

// =========================================================================
// Timers: duration cap and eviction
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_duration_cap_excludes_paused_time() {
    let store = store();
    let settings = GameSettings {
        duration_cap_secs: Some(30),
        ..GameSettings::default()
    };
    let (created, mut host) = hosted(&store, GameMode::WordHeist, settings).await;
    let id = created.host_id.clone();
    created.handle.control(id.clone(), Control::Start).await.unwrap();

    sleep(Duration::from_secs(10)).await;
    created.handle.control(id.clone(), Control::Pause).await.unwrap();
    sleep(Duration::from_secs(120)).await;
    created.handle.control(id.clone(), Control::Resume).await.unwrap();

    sleep(Duration::from_secs(19)).await;
    assert_eq!(
        created.handle.snapshot().await.unwrap().status,
        GameStatus::Playing
    );
    host.drain();

    sleep(Duration::from_secs(2)).await;
    let snapshot = created.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, GameStatus::Ended);
    assert!(host.events().iter().any(|e| matches!(
        e,
        GameEvent::GameEnded {
            reason: EndReason::DurationCap,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_idle_room_is_evicted() {
    let store = store_with(RoomConfig::default().with_idle_timeout(Duration::from_secs(60)));
    let created = store
        .create_session(NewSession {
            mode: GameMode::WordHeist,
            settings: GameSettings::default(),
            deck: deck(3),
            host_name: "Ms. Rivera".into(),
            user_id: None,
        })
        .unwrap();
    assert!(store.contains(&created.code));

    sleep(Duration::from_secs(61)).await;

    assert!(!store.contains(&created.code));
    assert!(matches!(
        store.get(&created.code),
        Err(GameError::RoomNotFound(_))
    ));
    assert!(!created.handle.is_alive());
}

#[tokio::test(start_paused = true)]
async fn test_connected_room_is_not_evicted() {
    let store = store_with(RoomConfig::default().with_idle_timeout(Duration::from_secs(60)));
    let (created, _host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;

    sleep(Duration::from_secs(600)).await;

    assert!(store.get(&created.code).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_ended_room_evicted_after_grace_and_clients_told() {
    let store = store_with(RoomConfig::default().with_ended_grace(Duration::from_secs(30)));
    let (created, mut host) = hosted(&store, GameMode::WordHeist, GameSettings::default()).await;
    let id = created.host_id.clone();
    created.handle.control(id.clone(), Control::Start).await.unwrap();
    created.handle.control(id, Control::End).await.unwrap();

    let csv = created.handle.standings().await.unwrap();
    assert!(csv.starts_with("rank,name,"));
    host.drain();

    sleep(Duration::from_secs(31)).await;

    assert!(!store.contains(&created.code));
    assert!(host.drain().iter().any(|msg| matches!(
        msg,
        ServerMessage::Error {
            code: ErrorCode::RoomNotFound,
            ..
        }
    )));
    assert!(store.registry().binding(host.conn_id).is_none());
}
