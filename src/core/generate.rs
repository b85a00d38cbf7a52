//! Card generation: one completion call, extraction, bulk insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, GenerationConfig, LlmConfig};
use crate::core::card::{CardId, DeckId, NewCard};
use crate::core::extract::{extract_with_stage, ExtractionStage};
use crate::error::{CardError, Result};
use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::storage::CardStore;

/// What a generation run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub deck_id: DeckId,
    /// Card count asked of the backend, after clamping.
    pub requested: u32,
    /// Cards recovered from the completion and offered to the store.
    pub attempted: usize,
    pub saved: usize,
    pub card_ids: Vec<CardId>,
    /// Extraction stage that recovered the cards.
    pub stage: ExtractionStage,
}

impl GenerationReport {
    /// Whether some extracted cards were not persisted.
    pub fn is_partial(&self) -> bool {
        self.saved < self.attempted
    }
}

/// Turns source text into persisted cards.
pub struct Generator<S: CardStore, L: LlmClient> {
    store: S,
    llm: L,
    llm_config: LlmConfig,
    generation: GenerationConfig,
    initial_ease: f64,
}

impl<S: CardStore, L: LlmClient> Generator<S, L> {
    pub fn new(store: S, llm: L, config: &Config) -> Self {
        Self {
            store,
            llm,
            llm_config: config.llm.clone(),
            generation: config.generation.clone(),
            initial_ease: config.scheduling.initial_ease,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Generate up to `count` cards from `source` into a deck.
    ///
    /// Input and deck are checked before the backend is called. A run where
    /// only some cards persist still succeeds; a run where none persist
    /// fails with `SaveZero`.
    pub fn generate(
        &self,
        deck_id: DeckId,
        source: &str,
        count: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<GenerationReport> {
        let source = source.trim();
        if source.is_empty() {
            return Err(CardError::validation("source text is empty"));
        }

        let chars = source.chars().count();
        if chars > self.generation.max_source_chars {
            return Err(CardError::validation(format!(
                "source text is {} characters, the limit is {}",
                chars, self.generation.max_source_chars
            )));
        }

        if !self.store.deck_exists(deck_id)? {
            return Err(CardError::deck_not_found(deck_id));
        }

        let requested = self.generation.clamp_count(count);
        let completion = self.llm.complete(&self.build_request(source, requested))?;

        let (cards, stage) = extract_with_stage(&completion.content, requested as usize)?;
        tracing::debug!(%stage, extracted = cards.len(), "extracted cards from completion");

        let new_cards: Vec<NewCard> = cards
            .into_iter()
            .map(|card| NewCard::fresh(card.question, card.answer, self.initial_ease, now))
            .collect();

        let result = self.store.bulk_insert(deck_id, &new_cards, now)?;
        if result.saved == 0 {
            return Err(CardError::SaveZero {
                attempted: result.attempted,
            });
        }

        let report = GenerationReport {
            deck_id,
            requested,
            attempted: result.attempted,
            saved: result.saved,
            card_ids: result.saved_ids,
            stage,
        };

        if report.is_partial() {
            tracing::warn!(
                deck_id,
                attempted = report.attempted,
                saved = report.saved,
                "only some generated cards were saved"
            );
        }
        tracing::info!(deck_id, saved = report.saved, %stage, "generated cards");

        Ok(report)
    }

    fn build_request(&self, source: &str, count: u32) -> CompletionRequest {
        CompletionRequest {
            model: self.llm_config.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt(count)),
                ChatMessage::user(user_prompt(source, count)),
            ],
            max_tokens: self.llm_config.max_tokens,
            temperature: self.llm_config.temperature,
        }
    }
}

fn system_prompt(count: u32) -> String {
    format!(
        "You are a flashcard generator. Reply with a compact JSON array only, \
         where every item is {{\"q\": \"...\", \"a\": \"...\"}}. \
         No prose, no explanations, no code fences. \
         At most {count} items. Keep answers short."
    )
}

fn user_prompt(source: &str, count: u32) -> String {
    format!("Create up to {count} question/answer flashcards from the text below.\nTEXT:\n{source}")
}
