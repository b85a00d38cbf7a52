//! Generate command: turn source text into cards in a deck.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{to_json, ErrorReport};
use crate::core::{CardId, DeckId, GenerationReport, Generator};
use crate::error::{CardError, Result};
use crate::llm::LlmClient;
use crate::storage::CardStore;
use crate::util::read_to_string_limited;

/// Where the source text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    Text(String),
    File(PathBuf),
}

impl SourceInput {
    /// Pick the source from CLI arguments; exactly one must be given.
    pub fn from_args(text: Option<String>, file: Option<PathBuf>) -> Result<Self> {
        match (text, file) {
            (Some(text), None) => Ok(Self::Text(text)),
            (None, Some(path)) => Ok(Self::File(path)),
            (Some(_), Some(_)) => Err(CardError::validation(
                "give either source text or --file, not both",
            )),
            (None, None) => Err(CardError::validation(
                "no source text: pass TEXT or --file PATH",
            )),
        }
    }

    fn read(&self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::File(path) => read_to_string_limited(path),
        }
    }
}

/// Options for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Cards to request; clamped to the configured bounds.
    pub count: Option<u32>,
}

/// Output format for the generate command.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOutput {
    pub success: bool,
    pub deck_id: DeckId,
    pub requested: u32,
    pub attempted: usize,
    pub saved: usize,
    pub card_ids: Vec<CardId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(flatten)]
    pub failure: Option<ErrorReport>,
}

impl GenerateOutput {
    pub fn success(report: GenerationReport) -> Self {
        Self {
            success: true,
            deck_id: report.deck_id,
            requested: report.requested,
            attempted: report.attempted,
            saved: report.saved,
            card_ids: report.card_ids,
            stage: Some(report.stage.to_string()),
            failure: None,
        }
    }

    pub fn failure(deck_id: DeckId, err: &CardError) -> Self {
        let attempted = match err {
            CardError::SaveZero { attempted } => *attempted,
            _ => 0,
        };
        Self {
            success: false,
            deck_id,
            requested: 0,
            attempted,
            saved: 0,
            card_ids: Vec::new(),
            stage: None,
            failure: Some(ErrorReport::from(err)),
        }
    }
}

/// The generate command implementation.
pub struct GenerateCommand<S: CardStore, L: LlmClient> {
    generator: Generator<S, L>,
}

impl<S: CardStore, L: LlmClient> GenerateCommand<S, L> {
    pub fn new(generator: Generator<S, L>) -> Self {
        Self { generator }
    }

    /// Read the source and generate cards into `deck_id`.
    pub fn run(
        &self,
        deck_id: DeckId,
        source: &SourceInput,
        options: &GenerateOptions,
        now: DateTime<Utc>,
    ) -> GenerateOutput {
        let result = source
            .read()
            .and_then(|text| self.generator.generate(deck_id, &text, options.count, now));

        match result {
            Ok(report) => GenerateOutput::success(report),
            Err(e) => GenerateOutput::failure(deck_id, &e),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &GenerateOutput, options: &GenerateOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &GenerateOutput) -> String {
        if let Some(failure) = &output.failure {
            return failure.to_human("Generation");
        }

        let mut text = format!(
            "Saved {} card{} to deck {}.\n",
            output.saved,
            if output.saved == 1 { "" } else { "s" },
            output.deck_id
        );
        if output.saved < output.attempted {
            text.push_str(&format!(
                "{} of {} extracted cards could not be saved.\n",
                output.attempted - output.saved,
                output.attempted
            ));
        }
        text
    }
}
