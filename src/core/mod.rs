//! Core types and logic for cardforge.
//!
//! Scheduling and extraction are pure functions. The review queue and the
//! generator do I/O only through the [`crate::storage::CardStore`] and
//! [`crate::llm::LlmClient`] traits.

pub mod card;
pub mod extract;
pub mod generate;
pub mod grade;
pub mod review;
pub mod scheduler;
pub mod session;

pub use card::{Card, CardId, Deck, DeckId, NewCard};
pub use extract::{extract, extract_with_stage, ExtractedCard, ExtractionStage};
pub use generate::{GenerationReport, Generator};
pub use grade::Grade;
pub use review::{DeckSummary, ReviewQueue};
pub use scheduler::{
    compute_next, format_interval, preview_intervals, MemoryState, Schedule, MAX_INTERVAL_DAYS,
    MIN_EASE,
};
pub use session::ReviewSession;
