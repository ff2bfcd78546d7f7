//! Session fixtures for engine unit tests.

use lingoforge_protocol::{
    Card, Deck, GameMode, GamePlayer, GameSession, GameSettings, PlayerId, RoomCode,
};

pub(crate) fn pid(s: &str) -> PlayerId {
    PlayerId::new(s)
}

/// A connected lobby with players `p0..pN` joined one millisecond apart
/// and `cards` cards where card `i` is `word i` / `palabra i`.
pub(crate) fn session(mode: GameMode, players: usize, cards: usize) -> GameSession {
    let deck = Deck {
        id: "deck".into(),
        name: "Test".into(),
        target_language: "es".into(),
        cards: (0..cards)
            .map(|i| Card {
                id: format!("c{i}"),
                english: format!("word {i}"),
                translation: format!("palabra {i}"),
            })
            .collect(),
    };
    let mut host = GamePlayer::new(pid("p0"), "P0", None, 0);
    host.connected = true;
    let mut session = GameSession::new(
        RoomCode::new("AB12"),
        mode,
        GameSettings::default(),
        deck,
        host,
        0,
    );
    for i in 1..players {
        let mut p = GamePlayer::new(pid(&format!("p{i}")), format!("P{i}"), None, i as u64);
        p.connected = true;
        session.players.push(p);
    }
    session
}

pub(crate) fn right(session: &GameSession, player: &str) -> lingoforge_protocol::PlayerAction {
    let p = session.player(&pid(player)).unwrap();
    let card = session.current_card(p).unwrap();
    lingoforge_protocol::PlayerAction::Answer {
        card_id: card.id.clone(),
        response: card.translation.clone(),
    }
}

pub(crate) fn wrong(session: &GameSession, player: &str) -> lingoforge_protocol::PlayerAction {
    let p = session.player(&pid(player)).unwrap();
    let card = session.current_card(p).unwrap();
    lingoforge_protocol::PlayerAction::Answer {
        card_id: card.id.clone(),
        response: "definitely wrong".into(),
    }
}
