//! Card and deck records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::scheduler::{MemoryState, Schedule};

/// Opaque card identifier. Ordered, so it doubles as the due-time tie-break.
pub type CardId = i64;

/// Opaque deck identifier.
pub type DeckId = i64;

/// A named collection of cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted flashcard with its memory state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub deck_id: DeckId,
    pub question: String,
    pub answer: String,
    /// Ease factor, never below [`crate::core::MIN_EASE`].
    pub ease: f64,
    /// Days until the next review.
    pub interval: u32,
    pub due: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// The part of the card the scheduler reads.
    pub fn memory_state(&self) -> MemoryState {
        MemoryState {
            ease: self.ease,
            interval: self.interval,
        }
    }

    /// The current schedule triple.
    pub fn schedule(&self) -> Schedule {
        Schedule {
            ease: self.ease,
            interval: self.interval,
            due: self.due,
        }
    }

    /// Whether the card may be presented at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

/// Insert payload for a card that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCard {
    pub question: String,
    pub answer: String,
    pub ease: f64,
    pub interval: u32,
    pub due: DateTime<Utc>,
}

impl NewCard {
    /// A fresh card at entry-level memory state, due immediately.
    pub fn fresh(
        question: impl Into<String>,
        answer: impl Into<String>,
        initial_ease: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            ease: initial_ease,
            interval: 0,
            due: now,
        }
    }

    /// Check the card invariants a store enforces on insert.
    ///
    /// Returns a human-readable reason when the card must be rejected.
    pub fn invalid_reason(&self) -> Option<&'static str> {
        if self.question.trim().is_empty() {
            return Some("question is empty");
        }
        if self.answer.trim().is_empty() {
            return Some("answer is empty");
        }
        if !self.ease.is_finite() || self.ease < crate::core::MIN_EASE {
            return Some("ease is below the minimum");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_card(due: DateTime<Utc>) -> Card {
        Card {
            id: 1,
            deck_id: 1,
            question: "What is 2+2?".to_string(),
            answer: "4".to_string(),
            ease: 2.5,
            interval: 3,
            due,
            created_at: due,
        }
    }

    #[test]
    fn test_is_due_boundary() {
        let now = Utc::now();
        assert!(sample_card(now).is_due(now));
        assert!(sample_card(now - Duration::seconds(1)).is_due(now));
        assert!(!sample_card(now + Duration::seconds(1)).is_due(now));
    }

    #[test]
    fn test_memory_state_and_schedule() {
        let now = Utc::now();
        let card = sample_card(now);
        assert_eq!(card.memory_state().ease, 2.5);
        assert_eq!(card.memory_state().interval, 3);
        assert_eq!(card.schedule().due, now);
    }

    #[test]
    fn test_fresh_card_defaults() {
        let now = Utc::now();
        let card = NewCard::fresh("Q", "A", 2.5, now);
        assert_eq!(card.interval, 0);
        assert_eq!(card.due, now);
        assert!(card.invalid_reason().is_none());
    }

    #[test]
    fn test_invalid_reason() {
        let now = Utc::now();
        assert_eq!(
            NewCard::fresh("  ", "A", 2.5, now).invalid_reason(),
            Some("question is empty")
        );
        assert_eq!(
            NewCard::fresh("Q", "\n", 2.5, now).invalid_reason(),
            Some("answer is empty")
        );
        assert_eq!(
            NewCard::fresh("Q", "A", 1.0, now).invalid_reason(),
            Some("ease is below the minimum")
        );
        assert_eq!(
            NewCard::fresh("Q", "A", f64::NAN, now).invalid_reason(),
            Some("ease is below the minimum")
        );
    }

    #[test]
    fn test_card_serializes_snake_case() {
        let card = sample_card(Utc::now());
        let json = serde_json::to_value(&card).unwrap();
        assert!(json.get("deck_id").is_some());
        assert!(json.get("created_at").is_some());
    }
}
