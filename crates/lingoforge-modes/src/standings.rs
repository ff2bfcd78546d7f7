//! Final standings and CSV export.

use std::cmp::Ordering;
use std::fmt::Write as _;

use lingoforge_protocol::{GameSession, PlayerId};

use crate::ModeEngine;

/// One row of the standings table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// Competition rank: tied players share a rank and the next rank skips
    /// (1, 1, 3).
    pub rank: u32,
    pub player_id: PlayerId,
    pub name: String,
    pub primary: u32,
    pub secondary: u32,
    pub correct: u32,
    pub incorrect: u32,
}

/// Players ordered by the mode's win ordering. Ties keep join order.
pub fn standings(engine: &dyn ModeEngine, session: &GameSession) -> Vec<Standing> {
    let mut players: Vec<_> = session.players.iter().collect();
    players.sort_by(|a, b| engine.compare(a, b));

    let mut rows: Vec<Standing> = Vec::with_capacity(players.len());
    for (i, player) in players.iter().enumerate() {
        let rank = match (i, rows.last()) {
            (_, Some(prev)) if engine.compare(players[i - 1], player) == Ordering::Equal => {
                prev.rank
            }
            _ => i as u32 + 1,
        };
        let (primary, secondary) = engine.metrics(player);
        rows.push(Standing {
            rank,
            player_id: player.id.clone(),
            name: player.name.clone(),
            primary,
            secondary,
            correct: player.correct,
            incorrect: player.incorrect,
        });
    }
    rows
}

/// Standings as CSV with a header row:
/// `rank,name,<primary>,<secondary>,correct,incorrect`.
pub fn standings_csv(engine: &dyn ModeEngine, session: &GameSession) -> String {
    let (primary, secondary) = engine.metric_names();
    let mut out = format!("rank,name,{primary},{secondary},correct,incorrect\n");
    for row in standings(engine, session) {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            row.rank,
            csv_field(&row.name),
            row.primary,
            row.secondary,
            row.correct,
            row.incorrect
        );
    }
    out
}

/// Quotes a field when it contains a delimiter, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
