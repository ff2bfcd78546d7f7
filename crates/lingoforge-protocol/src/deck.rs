//! Deck input: the cards a session is played with.
//!
//! Decks are owned by an external catalogue. A session takes a snapshot
//! when it is created and never sees later edits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub english: String,
    pub translation: String,
}

impl Card {
    /// The side players must type.
    pub fn expected(&self, direction: Direction) -> &str {
        match direction {
            Direction::EnglishToTarget => &self.translation,
            Direction::TargetToEnglish => &self.english,
        }
    }
}

/// A frozen deck snapshot. Cloning shares the card list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: String,
    pub name: String,
    pub target_language: String,
    pub cards: Arc<[Card]>,
}

impl Deck {
    /// The card shown at sequence position `index`. The sequence wraps, so
    /// every index maps to a card as long as the deck isn't empty.
    pub fn card_at(&self, index: u32) -> Option<&Card> {
        let len = self.cards.len();
        if len == 0 {
            return None;
        }
        self.cards.get(index as usize % len)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Which way players translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Prompt in English, answer in the target language.
    #[default]
    EnglishToTarget,
    /// Prompt in the target language, answer in English.
    TargetToEnglish,
}
