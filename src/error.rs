//! Unified error types for cardforge.
//!
//! Every failure the core can produce is a variant of [`CardError`]. Expected
//! negative outcomes (no due card, an extraction stage that does not match)
//! are modelled as `Option` or internal fallbacks and never reach this type;
//! anything that does reach it is terminal for the request.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cardforge operations.
#[derive(Error, Debug)]
pub enum CardError {
    /// Missing or malformed caller input.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A card or deck id that does not resolve.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The completion backend could not be reached or answered non-2xx.
    #[error("upstream error{}: {body}", http_status_suffix(.status))]
    Upstream { status: Option<u16>, body: String },

    /// No valid card objects could be recovered from completion text.
    ///
    /// `sample` is a bounded prefix of the raw text, never the full text.
    #[error("no flashcards could be parsed from the completion")]
    Parse { sample: String },

    /// A store read or write failed.
    #[error("persistence error: {message}")]
    Persistence { message: String },

    /// Extraction succeeded but not a single card was persisted.
    #[error("none of the {attempted} extracted card(s) could be saved")]
    SaveZero { attempted: usize },

    /// Filesystem errors (config files, source files, database directory).
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration loading or validation errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// JSON serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },
}

fn http_status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// A specialized Result type for cardforge operations.
pub type Result<T> = std::result::Result<T, CardError>;

impl CardError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error for a card.
    pub fn card_not_found(id: i64) -> Self {
        Self::NotFound { entity: "card", id }
    }

    /// Create a not-found error for a deck.
    pub fn deck_not_found(id: i64) -> Self {
        Self::NotFound { entity: "deck", id }
    }

    /// Create an upstream error.
    pub fn upstream(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Create a parse error carrying a diagnostic sample.
    pub fn parse(sample: impl Into<String>) -> Self {
        Self::Parse {
            sample: sample.into(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Stable snake_case label used in JSON command output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Upstream { .. } => "upstream",
            Self::Parse { .. } => "parse",
            Self::Persistence { .. } => "persistence",
            Self::SaveZero { .. } => "save_zero",
            Self::Storage { .. } => "storage",
            Self::Config { .. } => "config",
            Self::Serde { .. } => "serde",
        }
    }

    /// The diagnostic sample for parse failures.
    pub fn sample(&self) -> Option<&str> {
        match self {
            Self::Parse { sample } => Some(sample),
            _ => None,
        }
    }
}

impl From<io::Error> for CardError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for CardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for CardError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CardError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

/// Exit codes for the cardforge CLI.
pub mod exit_codes {
    /// The command completed successfully.
    pub const SUCCESS: i32 = 0;

    /// The command failed; details are printed to stdout or stderr.
    pub const FAILURE: i32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = CardError::validation("source text is empty");
        assert_eq!(err.to_string(), "validation error: source text is empty");
    }

    #[test]
    fn test_not_found_error_display() {
        assert_eq!(CardError::card_not_found(42).to_string(), "card not found: 42");
        assert_eq!(CardError::deck_not_found(7).to_string(), "deck not found: 7");
    }

    #[test]
    fn test_upstream_error_display_with_status() {
        let err = CardError::upstream(Some(502), "bad gateway");
        assert_eq!(err.to_string(), "upstream error (HTTP 502): bad gateway");
    }

    #[test]
    fn test_upstream_error_display_without_status() {
        let err = CardError::upstream(None, "connection refused");
        assert_eq!(err.to_string(), "upstream error: connection refused");
    }

    #[test]
    fn test_parse_error_keeps_sample_out_of_message() {
        let err = CardError::parse("I cannot help with that.");
        assert_eq!(
            err.to_string(),
            "no flashcards could be parsed from the completion"
        );
        assert_eq!(err.sample(), Some("I cannot help with that."));
    }

    #[test]
    fn test_save_zero_error_display() {
        let err = CardError::SaveZero { attempted: 3 };
        assert_eq!(
            err.to_string(),
            "none of the 3 extracted card(s) could be saved"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let err = CardError::storage(
            "/tmp/cards.sqlite3",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/cards.sqlite3"));
    }

    #[test]
    fn test_kind_labels() {
        let cases = vec![
            (CardError::validation("x"), "validation"),
            (CardError::card_not_found(1), "not_found"),
            (CardError::upstream(None, "x"), "upstream"),
            (CardError::parse("x"), "parse"),
            (CardError::persistence("x"), "persistence"),
            (CardError::SaveZero { attempted: 1 }, "save_zero"),
            (CardError::config("x"), "config"),
            (CardError::serde("x"), "serde"),
        ];

        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_sample_only_on_parse() {
        assert!(CardError::validation("x").sample().is_none());
        assert!(CardError::SaveZero { attempted: 2 }.sample().is_none());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: CardError = io_err.into();
        assert!(matches!(err, CardError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: CardError = json_err.into();
        assert!(matches!(err, CardError::Serde { .. }));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let err: CardError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, CardError::Persistence { .. }));
    }
}
