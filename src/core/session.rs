//! Recently shown cards within one review sitting.

use std::collections::{HashSet, VecDeque};

use crate::core::card::CardId;

/// A bounded, ordered window of card ids shown during a sitting.
///
/// Lives in the process only; a restart starts a fresh sitting. When the
/// window is full the oldest id falls out and may be shown again.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    window: usize,
    order: VecDeque<CardId>,
    shown: HashSet<CardId>,
}

impl ReviewSession {
    /// Create a session remembering at most `window` ids (at least one).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            order: VecDeque::with_capacity(window),
            shown: HashSet::with_capacity(window),
        }
    }

    /// Record that a card was presented. Re-showing moves it to the newest slot.
    pub fn record_shown(&mut self, id: CardId) {
        if !self.shown.insert(id) {
            self.order.retain(|&existing| existing != id);
        }
        self.order.push_back(id);

        while self.order.len() > self.window {
            if let Some(oldest) = self.order.pop_front() {
                self.shown.remove(&oldest);
            }
        }
    }

    /// Ids to exclude from the next due-card query, oldest first.
    pub fn exclude_ids(&self) -> Vec<CardId> {
        self.order.iter().copied().collect()
    }

    /// Forget every shown card, so due cards may repeat.
    pub fn clear(&mut self) {
        self.order.clear();
        self.shown.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new(crate::config::ReviewConfig::default().recent_window)
    }
}
