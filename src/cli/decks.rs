//! Deck command: create and list decks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{to_json, ErrorReport};
use crate::core::{Deck, DeckId};
use crate::error::Result;
use crate::storage::CardStore;

/// Options for the deck command.
#[derive(Debug, Clone, Default)]
pub struct DeckOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// A deck with its card count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckEntry {
    pub id: DeckId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub cards: u64,
}

/// Output format for the deck command.
#[derive(Debug, Clone, Serialize)]
pub struct DeckOutput {
    pub success: bool,
    /// Created deck, or every deck for a listing.
    pub decks: Vec<DeckEntry>,
    #[serde(skip)]
    created: bool,
    #[serde(flatten)]
    pub failure: Option<ErrorReport>,
}

impl DeckOutput {
    fn created(deck: DeckEntry) -> Self {
        Self {
            success: true,
            decks: vec![deck],
            created: true,
            failure: None,
        }
    }

    fn listed(decks: Vec<DeckEntry>) -> Self {
        Self {
            success: true,
            decks,
            created: false,
            failure: None,
        }
    }

    pub fn failure(failure: ErrorReport) -> Self {
        Self {
            success: false,
            decks: Vec::new(),
            created: false,
            failure: Some(failure),
        }
    }
}

/// The deck command implementation.
pub struct DeckCommand<S: CardStore> {
    store: S,
}

impl<S: CardStore> DeckCommand<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a deck with the given name.
    pub fn create(&self, name: &str, now: DateTime<Utc>) -> DeckOutput {
        match self.store.create_deck(name, now) {
            Ok(deck) => DeckOutput::created(entry(deck, 0)),
            Err(e) => DeckOutput::failure(ErrorReport::from(&e)),
        }
    }

    /// List every deck in id order.
    pub fn list(&self) -> DeckOutput {
        match self.list_entries() {
            Ok(decks) => DeckOutput::listed(decks),
            Err(e) => DeckOutput::failure(ErrorReport::from(&e)),
        }
    }

    fn list_entries(&self) -> Result<Vec<DeckEntry>> {
        self.store
            .list_decks()?
            .into_iter()
            .map(|deck| {
                let cards = self.store.count_cards(deck.id)?;
                Ok(entry(deck, cards))
            })
            .collect()
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &DeckOutput, options: &DeckOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &DeckOutput) -> String {
        if let Some(failure) = &output.failure {
            return failure.to_human("Deck command");
        }

        if output.created {
            return match output.decks.first() {
                Some(deck) => format!("Created deck {} ({}).\n", deck.id, deck.name),
                None => String::new(),
            };
        }

        if output.decks.is_empty() {
            return "No decks yet. Create one with `cardforge deck create <name>`.\n".to_string();
        }

        let mut text = String::new();
        for deck in &output.decks {
            text.push_str(&format!(
                "{:>4}  {}  ({} card{})\n",
                deck.id,
                deck.name,
                deck.cards,
                if deck.cards == 1 { "" } else { "s" }
            ));
        }
        text
    }
}

fn entry(deck: Deck, cards: u64) -> DeckEntry {
    DeckEntry {
        id: deck.id,
        name: deck.name,
        created_at: deck.created_at,
        cards,
    }
}
