//! Card and deck persistence.
//!
//! The [`CardStore`] trait is the only way the core touches persisted cards.
//! Two backends implement it: an in-memory store for tests and ephemeral use,
//! and a SQLite store for the CLI.

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryCardStore;
pub use sqlite::SqliteCardStore;
pub use traits::{BulkInsertResult, CardStore};
