//! In-memory card storage.
//!
//! Thread-safe implementation of [`CardStore`] for tests and throwaway
//! sittings. Everything is lost when the store is dropped.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::core::{Card, CardId, Deck, DeckId, NewCard, Schedule};
use crate::error::{CardError, Result};
use crate::storage::{BulkInsertResult, CardStore};

#[derive(Debug, Default)]
struct Tables {
    decks: BTreeMap<DeckId, Deck>,
    cards: BTreeMap<CardId, Card>,
    last_deck_id: DeckId,
    last_card_id: CardId,
}

/// In-memory card store backed by `RwLock<BTreeMap>` tables.
///
/// Ids are assigned from 1 in insertion order, like SQLite rowids.
#[derive(Debug, Default)]
pub struct MemoryCardStore {
    tables: RwLock<Tables>,
}

impl MemoryCardStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of cards across all decks.
    pub fn len(&self) -> usize {
        self.read().map(|t| t.cards.len()).unwrap_or(0)
    }

    /// Check if the store holds no cards.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| CardError::persistence("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| CardError::persistence("memory store lock poisoned"))
    }
}

impl CardStore for MemoryCardStore {
    fn create_deck(&self, name: &str, created_at: DateTime<Utc>) -> Result<Deck> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CardError::validation("deck name is empty"));
        }

        let mut tables = self.write()?;
        if tables.decks.values().any(|d| d.name == name) {
            return Err(CardError::validation(format!(
                "deck '{}' already exists",
                name
            )));
        }

        tables.last_deck_id += 1;
        let deck = Deck {
            id: tables.last_deck_id,
            name: name.to_string(),
            created_at,
        };
        tables.decks.insert(deck.id, deck.clone());
        Ok(deck)
    }

    fn get_deck(&self, id: DeckId) -> Result<Option<Deck>> {
        Ok(self.read()?.decks.get(&id).cloned())
    }

    fn list_decks(&self) -> Result<Vec<Deck>> {
        Ok(self.read()?.decks.values().cloned().collect())
    }

    fn get_card(&self, id: CardId) -> Result<Option<Card>> {
        Ok(self.read()?.cards.get(&id).cloned())
    }

    fn find_due(
        &self,
        deck_id: DeckId,
        now: DateTime<Utc>,
        exclude_ids: &[CardId],
    ) -> Result<Option<Card>> {
        let tables = self.read()?;
        let card = tables
            .cards
            .values()
            .filter(|c| c.deck_id == deck_id && c.is_due(now) && !exclude_ids.contains(&c.id))
            .min_by_key(|c| (c.due, c.id))
            .cloned();
        Ok(card)
    }

    fn count_due(&self, deck_id: DeckId, now: DateTime<Utc>) -> Result<u64> {
        let tables = self.read()?;
        let count = tables
            .cards
            .values()
            .filter(|c| c.deck_id == deck_id && c.is_due(now))
            .count();
        Ok(count as u64)
    }

    fn count_cards(&self, deck_id: DeckId) -> Result<u64> {
        let tables = self.read()?;
        Ok(tables.cards.values().filter(|c| c.deck_id == deck_id).count() as u64)
    }

    fn update_schedule_fields(&self, card_id: CardId, schedule: &Schedule) -> Result<usize> {
        let mut tables = self.write()?;
        match tables.cards.get_mut(&card_id) {
            Some(card) => {
                card.ease = schedule.ease;
                card.interval = schedule.interval;
                card.due = schedule.due;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn bulk_insert(
        &self,
        deck_id: DeckId,
        cards: &[NewCard],
        created_at: DateTime<Utc>,
    ) -> Result<BulkInsertResult> {
        let mut tables = self.write()?;
        if !tables.decks.contains_key(&deck_id) {
            return Err(CardError::deck_not_found(deck_id));
        }

        let mut result = BulkInsertResult {
            attempted: cards.len(),
            ..BulkInsertResult::default()
        };

        for (index, new_card) in cards.iter().enumerate() {
            if let Some(reason) = new_card.invalid_reason() {
                tracing::warn!(index, reason, "skipping card on insert");
                continue;
            }

            tables.last_card_id += 1;
            let card = Card {
                id: tables.last_card_id,
                deck_id,
                question: new_card.question.clone(),
                answer: new_card.answer.clone(),
                ease: new_card.ease,
                interval: new_card.interval,
                due: new_card.due,
                created_at,
            };
            result.saved_ids.push(card.id);
            tables.cards.insert(card.id, card);
        }

        result.saved = result.saved_ids.len();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::{
        fixed_now, test_bulk_insert_and_get, test_bulk_insert_skips_invalid,
        test_bulk_insert_unknown_deck, test_count_due, test_deck_lifecycle,
        test_find_due_ordering_and_exclusion, test_update_schedule_fields,
    };
    use std::sync::Arc;

    #[test]
    fn test_memory_store_deck_lifecycle() {
        test_deck_lifecycle(&MemoryCardStore::new());
    }

    #[test]
    fn test_memory_store_bulk_insert_and_get() {
        test_bulk_insert_and_get(&MemoryCardStore::new());
    }

    #[test]
    fn test_memory_store_bulk_insert_skips_invalid() {
        test_bulk_insert_skips_invalid(&MemoryCardStore::new());
    }

    #[test]
    fn test_memory_store_bulk_insert_unknown_deck() {
        test_bulk_insert_unknown_deck(&MemoryCardStore::new());
    }

    #[test]
    fn test_memory_store_find_due() {
        test_find_due_ordering_and_exclusion(&MemoryCardStore::new());
    }

    #[test]
    fn test_memory_store_count_due() {
        test_count_due(&MemoryCardStore::new());
    }

    #[test]
    fn test_memory_store_update_schedule_fields() {
        test_update_schedule_fields(&MemoryCardStore::new());
    }

    #[test]
    fn test_arc_wrapped_store_passes_contract() {
        let store = Arc::new(MemoryCardStore::new());
        test_find_due_ordering_and_exclusion(&store);
    }

    #[test]
    fn test_len_and_is_empty() {
        let store = MemoryCardStore::new();
        assert!(store.is_empty());

        let now = fixed_now();
        let deck = store.create_deck("Deck", now).unwrap();
        store
            .bulk_insert(deck.id, &[NewCard::fresh("Q", "A", 2.5, now)], now)
            .unwrap();

        assert!(!store.is_empty());
        assert_eq!(store.len(), 1);
    }
}
