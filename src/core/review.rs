//! Due-card selection and grading.
//!
//! The queue is stateless: which cards a sitting has already shown lives in
//! a [`crate::core::ReviewSession`] owned by the caller, and is passed in as
//! an exclusion list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchedulingConfig;
use crate::core::card::{Card, CardId, DeckId};
use crate::core::grade::Grade;
use crate::core::scheduler::{compute_next, preview_intervals, Schedule};
use crate::error::{CardError, Result};
use crate::storage::CardStore;

/// Card totals for one deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSummary {
    pub deck_id: DeckId,
    pub total: u64,
    pub due_now: u64,
}

/// Review queue over a card store.
pub struct ReviewQueue<S: CardStore> {
    store: S,
    config: SchedulingConfig,
}

impl<S: CardStore> ReviewQueue<S> {
    pub fn new(store: S, config: SchedulingConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The next card to present: due at `now`, not excluded, earliest due
    /// first with ties broken by id. Read-only.
    pub fn next_due(
        &self,
        deck_id: DeckId,
        exclude_ids: &[CardId],
        now: DateTime<Utc>,
    ) -> Result<Option<Card>> {
        self.require_deck(deck_id)?;
        self.store.find_due(deck_id, now, exclude_ids)
    }

    /// Grade a card and persist its new schedule.
    ///
    /// Only ease, interval and due are written. Concurrent grades of the same
    /// card race; the last write wins.
    pub fn grade(&self, card_id: CardId, grade: Grade, now: DateTime<Utc>) -> Result<Schedule> {
        let card = self
            .store
            .get_card(card_id)?
            .ok_or_else(|| CardError::card_not_found(card_id))?;

        let next = compute_next(&card.memory_state(), grade, &self.config, now);

        // The card can vanish between the read and the write.
        if self.store.update_schedule_fields(card_id, &next)? == 0 {
            return Err(CardError::card_not_found(card_id));
        }

        tracing::debug!(
            card_id,
            %grade,
            ease = next.ease,
            interval = next.interval,
            "graded card"
        );
        Ok(next)
    }

    /// Number of cards in a deck due at `now`.
    pub fn due_count(&self, deck_id: DeckId, now: DateTime<Utc>) -> Result<u64> {
        self.require_deck(deck_id)?;
        self.store.count_due(deck_id, now)
    }

    /// Total and due card counts for a deck.
    pub fn deck_summary(&self, deck_id: DeckId, now: DateTime<Utc>) -> Result<DeckSummary> {
        self.require_deck(deck_id)?;
        Ok(DeckSummary {
            deck_id,
            total: self.store.count_cards(deck_id)?,
            due_now: self.store.count_due(deck_id, now)?,
        })
    }

    /// Interval each grade would give `card`, in `again, hard, good, easy` order.
    pub fn preview(&self, card: &Card) -> [u32; 4] {
        preview_intervals(&card.memory_state(), &self.config)
    }

    fn require_deck(&self, deck_id: DeckId) -> Result<()> {
        if self.store.deck_exists(deck_id)? {
            Ok(())
        } else {
            Err(CardError::deck_not_found(deck_id))
        }
    }
}
