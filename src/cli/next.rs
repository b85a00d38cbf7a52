//! Next command: show the next due card of a deck.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{grade_menu, grade_previews, to_json, ErrorReport, GradePreview};
use crate::core::{Card, CardId, DeckId, ReviewQueue};
use crate::storage::CardStore;

/// Options for the next command.
#[derive(Debug, Clone, Default)]
pub struct NextOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the next command.
#[derive(Debug, Clone, Serialize)]
pub struct NextOutput {
    pub success: bool,
    pub deck_id: DeckId,
    /// `None` when nothing is due.
    pub card: Option<Card>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub previews: Vec<GradePreview>,
    #[serde(flatten)]
    pub failure: Option<ErrorReport>,
}

/// The next command implementation.
pub struct NextCommand<S: CardStore> {
    queue: ReviewQueue<S>,
}

impl<S: CardStore> NextCommand<S> {
    pub fn new(queue: ReviewQueue<S>) -> Self {
        Self { queue }
    }

    pub fn run(&self, deck_id: DeckId, exclude_ids: &[CardId], now: DateTime<Utc>) -> NextOutput {
        match self.queue.next_due(deck_id, exclude_ids, now) {
            Ok(card) => NextOutput {
                success: true,
                deck_id,
                previews: card
                    .as_ref()
                    .map(|c| grade_previews(self.queue.preview(c)))
                    .unwrap_or_default(),
                card,
                failure: None,
            },
            Err(e) => NextOutput {
                success: false,
                deck_id,
                card: None,
                previews: Vec::new(),
                failure: Some(ErrorReport::from(&e)),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &NextOutput, options: &NextOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &NextOutput) -> String {
        if let Some(failure) = &output.failure {
            return failure.to_human("Next");
        }

        match &output.card {
            Some(card) => format!(
                "Card {}\nQ: {}\nA: {}\n{}\n",
                card.id,
                card.question,
                card.answer,
                grade_menu(&output.previews)
            ),
            None => format!("No cards due in deck {}.\n", output.deck_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulingConfig;
    use crate::core::NewCard;
    use crate::storage::traits::tests::fixed_now;
    use crate::storage::MemoryCardStore;

    fn command() -> (NextCommand<MemoryCardStore>, DeckId, Vec<CardId>) {
        let now = fixed_now();
        let store = MemoryCardStore::new();
        let deck = store.create_deck("Chemistry", now).unwrap();
        let ids = store
            .bulk_insert(
                deck.id,
                &[
                    NewCard::fresh("Symbol for gold?", "Au", 2.5, now),
                    NewCard::fresh("Symbol for iron?", "Fe", 2.5, now),
                ],
                now,
            )
            .unwrap()
            .saved_ids;
        let queue = ReviewQueue::new(store, SchedulingConfig::default());
        (NextCommand::new(queue), deck.id, ids)
    }

    #[test]
    fn test_next_returns_due_card_with_previews() {
        let (cmd, deck, ids) = command();

        let output = cmd.run(deck, &[], fixed_now());
        assert!(output.success);
        assert_eq!(output.card.as_ref().unwrap().id, ids[0]);
        assert_eq!(output.previews.len(), 4);

        let text = cmd.format_output(&output, &NextOptions::default());
        assert!(text.contains("Q: Symbol for gold?"));
        assert!(text.contains("A: Au"));
        assert!(text.contains("1) again (now)"));
    }

    #[test]
    fn test_next_honors_exclusions() {
        let (cmd, deck, ids) = command();

        let output = cmd.run(deck, &[ids[0]], fixed_now());
        assert_eq!(output.card.unwrap().id, ids[1]);

        let output = cmd.run(deck, &ids, fixed_now());
        assert!(output.success);
        assert!(output.card.is_none());
        assert_eq!(
            cmd.format_output(&output, &NextOptions::default()),
            format!("No cards due in deck {}.\n", deck)
        );
    }

    #[test]
    fn test_next_json_when_nothing_due() {
        let (cmd, deck, ids) = command();
        let options = NextOptions {
            json: true,
            ..Default::default()
        };

        let output = cmd.run(deck, &ids, fixed_now());
        let json: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&output, &options)).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["card"].is_null());
        assert!(json.get("previews").is_none());
    }

    #[test]
    fn test_next_unknown_deck() {
        let (cmd, _, _) = command();
        let output = cmd.run(99, &[], fixed_now());
        assert!(!output.success);
        assert_eq!(output.failure.unwrap().error_kind, "not_found");
    }
}
