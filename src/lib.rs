//! cardforge - LLM-generated flashcards with spaced-repetition review
//!
//! cardforge asks a chat-completion backend to turn source text into
//! question/answer cards, recovers the cards from whatever text comes back,
//! and schedules their review with an ease/interval model.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod llm;
pub mod storage;
pub mod util;

pub use config::Config;
pub use core::{
    compute_next, extract, Card, CardId, Deck, DeckId, ExtractedCard, ExtractionStage,
    GenerationReport, Generator, Grade, NewCard, ReviewQueue, ReviewSession, Schedule,
};
pub use error::{CardError, Result};
pub use llm::{HttpLlmClient, LlmClient};
pub use storage::{CardStore, MemoryCardStore, SqliteCardStore};

// CLI commands
pub use cli::{
    DeckCommand, DueCommand, GenerateCommand, GradeCommand, NextCommand, StudyCommand,
};
