//! Due command: how many cards of a deck are due now.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{to_json, ErrorReport};
use crate::core::{DeckId, DeckSummary, ReviewQueue};
use crate::storage::CardStore;

/// Options for the due command.
#[derive(Debug, Clone, Default)]
pub struct DueOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the due command.
#[derive(Debug, Clone, Serialize)]
pub struct DueOutput {
    pub success: bool,
    pub deck_id: DeckId,
    pub due_now: u64,
    pub total: u64,
    #[serde(flatten)]
    pub failure: Option<ErrorReport>,
}

impl From<DeckSummary> for DueOutput {
    fn from(summary: DeckSummary) -> Self {
        Self {
            success: true,
            deck_id: summary.deck_id,
            due_now: summary.due_now,
            total: summary.total,
            failure: None,
        }
    }
}

/// The due command implementation.
pub struct DueCommand<S: CardStore> {
    queue: ReviewQueue<S>,
}

impl<S: CardStore> DueCommand<S> {
    pub fn new(queue: ReviewQueue<S>) -> Self {
        Self { queue }
    }

    pub fn run(&self, deck_id: DeckId, now: DateTime<Utc>) -> DueOutput {
        match self.queue.deck_summary(deck_id, now) {
            Ok(summary) => summary.into(),
            Err(e) => DueOutput {
                success: false,
                deck_id,
                due_now: 0,
                total: 0,
                failure: Some(ErrorReport::from(&e)),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &DueOutput, options: &DueOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return to_json(output);
        }

        match &output.failure {
            Some(failure) => failure.to_human("Due"),
            None => format!(
                "Deck {}: {} due now, {} total.\n",
                output.deck_id, output.due_now, output.total
            ),
        }
    }
}
