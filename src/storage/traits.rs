//! Card store trait.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Card, CardId, Deck, DeckId, NewCard, Schedule};
use crate::error::Result;

/// Outcome of a bulk insert. Partial success is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkInsertResult {
    /// Cards offered to the store.
    pub attempted: usize,
    /// Cards actually persisted.
    pub saved: usize,
    /// Ids of the persisted cards, in input order.
    pub saved_ids: Vec<CardId>,
}

/// Trait for card storage backends.
///
/// Stores are shared across commands and tests, so they must be `Send + Sync`.
/// Schedule updates are a single write per card: concurrent graders of the
/// same card race, and the last write wins.
pub trait CardStore: Send + Sync {
    /// Create a deck. Fails with `Validation` on an empty or duplicate name.
    fn create_deck(&self, name: &str, created_at: DateTime<Utc>) -> Result<Deck>;

    /// Retrieve a deck by id. Returns `Ok(None)` if it doesn't exist.
    fn get_deck(&self, id: DeckId) -> Result<Option<Deck>>;

    /// All decks, ordered by id.
    fn list_decks(&self) -> Result<Vec<Deck>>;

    /// Retrieve a card by id. Returns `Ok(None)` if it doesn't exist.
    fn get_card(&self, id: CardId) -> Result<Option<Card>>;

    /// The earliest-due card of a deck that is due at `now` and not excluded.
    ///
    /// Ties on the due time are broken by ascending id.
    fn find_due(
        &self,
        deck_id: DeckId,
        now: DateTime<Utc>,
        exclude_ids: &[CardId],
    ) -> Result<Option<Card>>;

    /// Number of cards in a deck due at `now`.
    fn count_due(&self, deck_id: DeckId, now: DateTime<Utc>) -> Result<u64>;

    /// Number of cards in a deck.
    fn count_cards(&self, deck_id: DeckId) -> Result<u64>;

    /// Overwrite a card's ease, interval and due time.
    ///
    /// Question and answer are not touched or re-validated. Returns the
    /// number of modified cards, 0 when the card does not exist.
    fn update_schedule_fields(&self, card_id: CardId, schedule: &Schedule) -> Result<usize>;

    /// Insert cards into a deck, skipping (and logging) cards that fail.
    ///
    /// Fails with `NotFound` when the deck does not exist.
    fn bulk_insert(
        &self,
        deck_id: DeckId,
        cards: &[NewCard],
        created_at: DateTime<Utc>,
    ) -> Result<BulkInsertResult>;

    /// Check if a deck exists.
    fn deck_exists(&self, id: DeckId) -> Result<bool> {
        Ok(self.get_deck(id)?.is_some())
    }
}

/// Blanket implementation of CardStore for Arc-wrapped stores.
///
/// This allows using `Arc<T>` where `T: CardStore` is expected,
/// which is useful for sharing stores between tests and commands.
impl<T: CardStore + ?Sized> CardStore for Arc<T> {
    fn create_deck(&self, name: &str, created_at: DateTime<Utc>) -> Result<Deck> {
        (**self).create_deck(name, created_at)
    }

    fn get_deck(&self, id: DeckId) -> Result<Option<Deck>> {
        (**self).get_deck(id)
    }

    fn list_decks(&self) -> Result<Vec<Deck>> {
        (**self).list_decks()
    }

    fn get_card(&self, id: CardId) -> Result<Option<Card>> {
        (**self).get_card(id)
    }

    fn find_due(
        &self,
        deck_id: DeckId,
        now: DateTime<Utc>,
        exclude_ids: &[CardId],
    ) -> Result<Option<Card>> {
        (**self).find_due(deck_id, now, exclude_ids)
    }

    fn count_due(&self, deck_id: DeckId, now: DateTime<Utc>) -> Result<u64> {
        (**self).count_due(deck_id, now)
    }

    fn count_cards(&self, deck_id: DeckId) -> Result<u64> {
        (**self).count_cards(deck_id)
    }

    fn update_schedule_fields(&self, card_id: CardId, schedule: &Schedule) -> Result<usize> {
        (**self).update_schedule_fields(card_id, schedule)
    }

    fn bulk_insert(
        &self,
        deck_id: DeckId,
        cards: &[NewCard],
        created_at: DateTime<Utc>,
    ) -> Result<BulkInsertResult> {
        (**self).bulk_insert(deck_id, cards, created_at)
    }
}

/// Contract tests every CardStore implementation must pass.
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::error::CardError;
    use chrono::Duration;

    pub fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn new_card(question: &str, due: DateTime<Utc>) -> NewCard {
        NewCard {
            question: question.to_string(),
            answer: format!("answer to {}", question),
            ease: 2.5,
            interval: 0,
            due,
        }
    }

    pub fn test_deck_lifecycle<S: CardStore>(store: &S) {
        let now = fixed_now();

        assert!(store.list_decks().unwrap().is_empty());

        let biology = store.create_deck("Biology", now).unwrap();
        let history = store.create_deck("  History  ", now).unwrap();
        assert_ne!(biology.id, history.id);
        assert_eq!(history.name, "History");

        let fetched = store.get_deck(biology.id).unwrap().unwrap();
        assert_eq!(fetched, biology);
        assert!(store.deck_exists(history.id).unwrap());
        assert!(store.get_deck(9_999).unwrap().is_none());
        assert!(!store.deck_exists(9_999).unwrap());

        let names: Vec<String> = store
            .list_decks()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Biology", "History"]);

        let err = store.create_deck("Biology", now).unwrap_err();
        assert_eq!(err.kind(), "validation");
        let err = store.create_deck("   ", now).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    pub fn test_bulk_insert_and_get<S: CardStore>(store: &S) {
        let now = fixed_now();
        let deck = store.create_deck("Chemistry", now).unwrap();

        let cards = vec![
            new_card("What is H2O?", now),
            new_card("What is NaCl?", now),
        ];
        let result = store.bulk_insert(deck.id, &cards, now).unwrap();

        assert_eq!(result.attempted, 2);
        assert_eq!(result.saved, 2);
        assert_eq!(result.saved_ids.len(), 2);
        assert!(result.saved_ids[0] < result.saved_ids[1]);

        let card = store.get_card(result.saved_ids[0]).unwrap().unwrap();
        assert_eq!(card.deck_id, deck.id);
        assert_eq!(card.question, "What is H2O?");
        assert_eq!(card.answer, "answer to What is H2O?");
        assert_eq!(card.ease, 2.5);
        assert_eq!(card.interval, 0);
        assert_eq!(card.due, now);
        assert_eq!(card.created_at, now);

        assert_eq!(store.count_cards(deck.id).unwrap(), 2);
        assert!(store.get_card(9_999).unwrap().is_none());
    }

    pub fn test_bulk_insert_skips_invalid<S: CardStore>(store: &S) {
        let now = fixed_now();
        let deck = store.create_deck("Physics", now).unwrap();

        let mut low_ease = new_card("Low ease", now);
        low_ease.ease = 1.0;
        let cards = vec![
            new_card("Valid one", now),
            new_card("   ", now),
            low_ease,
            new_card("Valid two", now),
        ];

        let result = store.bulk_insert(deck.id, &cards, now).unwrap();
        assert_eq!(result.attempted, 4);
        assert_eq!(result.saved, 2);

        let saved: Vec<String> = result
            .saved_ids
            .iter()
            .map(|id| store.get_card(*id).unwrap().unwrap().question)
            .collect();
        assert_eq!(saved, vec!["Valid one", "Valid two"]);
    }

    pub fn test_bulk_insert_unknown_deck<S: CardStore>(store: &S) {
        let now = fixed_now();
        let err = store
            .bulk_insert(404, &[new_card("Orphan", now)], now)
            .unwrap_err();
        assert!(matches!(err, CardError::NotFound { entity: "deck", id: 404 }));
    }

    pub fn test_find_due_ordering_and_exclusion<S: CardStore>(store: &S) {
        let now = fixed_now();
        let deck = store.create_deck("Geography", now).unwrap();
        let other = store.create_deck("Other", now).unwrap();

        let cards = vec![
            new_card("later", now - Duration::hours(1)),
            new_card("earliest", now - Duration::hours(2)),
            new_card("tied", now - Duration::hours(1)),
            new_card("exactly now", now),
            new_card("future", now + Duration::hours(1)),
        ];
        let ids = store.bulk_insert(deck.id, &cards, now).unwrap().saved_ids;
        store
            .bulk_insert(other.id, &[new_card("other deck", now - Duration::days(9))], now)
            .unwrap();

        let mut seen = Vec::new();
        while let Some(card) = store.find_due(deck.id, now, &seen).unwrap() {
            assert_eq!(card.deck_id, deck.id);
            assert!(card.due <= now);
            seen.push(card.id);
        }

        // earliest due first, ties broken by id, future card never surfaces
        assert_eq!(seen, vec![ids[1], ids[0], ids[2], ids[3]]);

        // read-only: repeating a query yields the same card
        let first = store.find_due(deck.id, now, &[]).unwrap().unwrap();
        let again = store.find_due(deck.id, now, &[]).unwrap().unwrap();
        assert_eq!(first.id, again.id);

        assert!(store.find_due(9_999, now, &[]).unwrap().is_none());
    }

    pub fn test_count_due<S: CardStore>(store: &S) {
        let now = fixed_now();
        let deck = store.create_deck("Music", now).unwrap();
        let cards = vec![
            new_card("due", now - Duration::minutes(5)),
            new_card("due now", now),
            new_card("not due", now + Duration::days(1)),
        ];
        store.bulk_insert(deck.id, &cards, now).unwrap();

        assert_eq!(store.count_due(deck.id, now).unwrap(), 2);
        assert_eq!(store.count_due(deck.id, now + Duration::days(2)).unwrap(), 3);
        assert_eq!(store.count_cards(deck.id).unwrap(), 3);
    }

    pub fn test_update_schedule_fields<S: CardStore>(store: &S) {
        let now = fixed_now();
        let deck = store.create_deck("Art", now).unwrap();
        let id = store
            .bulk_insert(deck.id, &[new_card("Who painted it?", now)], now)
            .unwrap()
            .saved_ids[0];

        let schedule = Schedule {
            ease: 2.65,
            interval: 4,
            due: now + Duration::days(4),
        };
        assert_eq!(store.update_schedule_fields(id, &schedule).unwrap(), 1);

        let card = store.get_card(id).unwrap().unwrap();
        assert_eq!(card.schedule(), schedule);
        assert_eq!(card.question, "Who painted it?");
        assert_eq!(card.created_at, now);

        assert_eq!(store.update_schedule_fields(9_999, &schedule).unwrap(), 0);
    }
}
