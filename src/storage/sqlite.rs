//! SQLite card storage.
//!
//! One connection guarded by a mutex. Timestamps are stored as UTC epoch
//! milliseconds so due-time comparisons and ordering happen in SQL. The
//! table constraints mirror the card invariants, so a row that breaks them
//! is rejected by the database as well as by [`NewCard::invalid_reason`].

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::core::{Card, CardId, Deck, DeckId, NewCard, Schedule};
use crate::error::{CardError, Result};
use crate::storage::{BulkInsertResult, CardStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS decks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    deck_id INTEGER NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
    question TEXT NOT NULL CHECK (length(trim(question)) > 0),
    answer TEXT NOT NULL CHECK (length(trim(answer)) > 0),
    ease REAL NOT NULL DEFAULT 2.5 CHECK (ease >= 1.3),
    interval_days INTEGER NOT NULL DEFAULT 0 CHECK (interval_days >= 0),
    due INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_deck_due ON cards (deck_id, due, id);
";

const CARD_COLUMNS: &str = "id, deck_id, question, answer, ease, interval_days, due, created_at";

/// Card store backed by a SQLite database file.
#[derive(Debug)]
pub struct SqliteCardStore {
    conn: Mutex<Connection>,
}

impl SqliteCardStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CardError::storage(parent, e))?;
        }

        let conn = Connection::open(path)?;
        tracing::debug!("opened card database at {}", path.display());
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CardError::persistence("database connection lock poisoned"))
    }
}

fn from_millis(ms: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}

fn deck_from_row(row: &Row<'_>) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: from_millis(row.get(2)?, 2)?,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        ease: row.get(4)?,
        interval: row.get(5)?,
        due: from_millis(row.get(6)?, 6)?,
        created_at: from_millis(row.get(7)?, 7)?,
    })
}

fn deck_exists(conn: &Connection, id: DeckId) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM decks WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

impl CardStore for SqliteCardStore {
    fn create_deck(&self, name: &str, created_at: DateTime<Utc>) -> Result<Deck> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CardError::validation("deck name is empty"));
        }

        let conn = self.lock()?;
        let existing = conn
            .query_row("SELECT id FROM decks WHERE name = ?1", params![name], |row| {
                row.get::<_, DeckId>(0)
            })
            .optional()?;
        if existing.is_some() {
            return Err(CardError::validation(format!(
                "deck '{}' already exists",
                name
            )));
        }

        conn.execute(
            "INSERT INTO decks (name, created_at) VALUES (?1, ?2)",
            params![name, created_at.timestamp_millis()],
        )?;

        Ok(Deck {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    fn get_deck(&self, id: DeckId) -> Result<Option<Deck>> {
        let conn = self.lock()?;
        let deck = conn
            .query_row(
                "SELECT id, name, created_at FROM decks WHERE id = ?1",
                params![id],
                deck_from_row,
            )
            .optional()?;
        Ok(deck)
    }

    fn list_decks(&self) -> Result<Vec<Deck>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM decks ORDER BY id")?;
        let decks = stmt
            .query_map([], deck_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(decks)
    }

    fn get_card(&self, id: CardId) -> Result<Option<Card>> {
        let conn = self.lock()?;
        let card = conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
                params![id],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    fn find_due(
        &self,
        deck_id: DeckId,
        now: DateTime<Utc>,
        exclude_ids: &[CardId],
    ) -> Result<Option<Card>> {
        let exclusion = if exclude_ids.is_empty() {
            String::new()
        } else {
            let placeholders: Vec<String> =
                (0..exclude_ids.len()).map(|i| format!("?{}", i + 3)).collect();
            format!("AND id NOT IN ({})", placeholders.join(", "))
        };
        let sql = format!(
            "SELECT {} FROM cards WHERE deck_id = ?1 AND due <= ?2 {} \
             ORDER BY due ASC, id ASC LIMIT 1",
            CARD_COLUMNS, exclusion
        );

        let mut values: Vec<i64> = Vec::with_capacity(exclude_ids.len() + 2);
        values.push(deck_id);
        values.push(now.timestamp_millis());
        values.extend_from_slice(exclude_ids);

        let conn = self.lock()?;
        let card = conn
            .query_row(&sql, params_from_iter(values.iter()), card_from_row)
            .optional()?;
        tracing::debug!(deck_id, excluded = exclude_ids.len(), found = card.is_some(), "find_due");
        Ok(card)
    }

    fn count_due(&self, deck_id: DeckId, now: DateTime<Utc>) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE deck_id = ?1 AND due <= ?2",
            params![deck_id, now.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn count_cards(&self, deck_id: DeckId) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE deck_id = ?1",
            params![deck_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn update_schedule_fields(&self, card_id: CardId, schedule: &Schedule) -> Result<usize> {
        let conn = self.lock()?;
        let modified = conn.execute(
            "UPDATE cards SET ease = ?1, interval_days = ?2, due = ?3 WHERE id = ?4",
            params![
                schedule.ease,
                schedule.interval,
                schedule.due.timestamp_millis(),
                card_id
            ],
        )?;
        Ok(modified)
    }

    fn bulk_insert(
        &self,
        deck_id: DeckId,
        cards: &[NewCard],
        created_at: DateTime<Utc>,
    ) -> Result<BulkInsertResult> {
        let mut conn = self.lock()?;
        if !deck_exists(&conn, deck_id)? {
            return Err(CardError::deck_not_found(deck_id));
        }

        let mut result = BulkInsertResult {
            attempted: cards.len(),
            ..BulkInsertResult::default()
        };

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cards (deck_id, question, answer, ease, interval_days, due, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for (index, card) in cards.iter().enumerate() {
                if let Some(reason) = card.invalid_reason() {
                    tracing::warn!(index, reason, "skipping card on insert");
                    continue;
                }

                // A failed row does not abort the transaction.
                match stmt.execute(params![
                    deck_id,
                    card.question,
                    card.answer,
                    card.ease,
                    card.interval,
                    card.due.timestamp_millis(),
                    created_at.timestamp_millis()
                ]) {
                    Ok(_) => result.saved_ids.push(tx.last_insert_rowid()),
                    Err(e) => tracing::warn!(index, error = %e, "skipping card on insert"),
                }
            }
        }
        tx.commit()?;

        result.saved = result.saved_ids.len();
        Ok(result)
    }
}
