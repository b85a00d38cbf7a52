//! CLI commands for cardforge.
//!
//! Each command owns its dependencies, returns a serializable output value
//! and formats it as JSON, human-readable text, or nothing (`--quiet`).
//! - **Deck commands**: deck create, deck list
//! - **Authoring**: generate
//! - **Review**: next, grade, due, study

pub mod decks;
pub mod due;
pub mod generate;
pub mod grade;
pub mod next;
pub mod study;

pub use decks::DeckCommand;
pub use due::DueCommand;
pub use generate::GenerateCommand;
pub use grade::GradeCommand;
pub use next::NextCommand;
pub use study::StudyCommand;

use serde::Serialize;

use crate::core::{format_interval, Grade};
use crate::error::CardError;

/// Failure details carried by every command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub error: String,
    pub error_kind: &'static str,
    /// Raw-text prefix, present only for parse failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
}

impl From<&CardError> for ErrorReport {
    fn from(err: &CardError) -> Self {
        Self {
            error: err.to_string(),
            error_kind: err.kind(),
            sample: err.sample().map(str::to_string),
        }
    }
}

impl ErrorReport {
    /// Human-readable failure text, with the sample on its own lines.
    pub fn to_human(&self, action: &str) -> String {
        match &self.sample {
            Some(sample) => format!("{} failed: {}\nReceived:\n{}\n", action, self.error, sample),
            None => format!("{} failed: {}\n", action, self.error),
        }
    }
}

/// The interval one grade would schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradePreview {
    pub grade: Grade,
    pub interval_days: u32,
    pub label: String,
}

/// Pair each grade with its previewed interval, weakest grade first.
pub fn grade_previews(intervals: [u32; 4]) -> Vec<GradePreview> {
    Grade::ALL
        .iter()
        .zip(intervals)
        .map(|(&grade, days)| GradePreview {
            grade,
            interval_days: days,
            label: format_interval(days),
        })
        .collect()
}

/// One-line grade menu, e.g. `1) again (now)  2) hard (1d) ...`.
pub fn grade_menu(previews: &[GradePreview]) -> String {
    previews
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}) {} ({})", i + 1, p.grade, p.label))
        .collect::<Vec<_>>()
        .join("  ")
}

fn to_json<T: Serialize>(output: &T) -> String {
    serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_report_from_parse_error() {
        let report = ErrorReport::from(&CardError::parse("Sorry, no."));
        assert_eq!(report.error_kind, "parse");
        assert_eq!(report.sample.as_deref(), Some("Sorry, no."));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sample"], "Sorry, no.");
        assert!(report.to_human("Generation").contains("Received:\nSorry, no."));
    }

    #[test]
    fn test_error_report_omits_sample_otherwise() {
        let report = ErrorReport::from(&CardError::deck_not_found(3));
        assert_eq!(report.error, "deck not found: 3");
        assert_eq!(report.error_kind, "not_found");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("sample").is_none());
        assert_eq!(report.to_human("Due"), "Due failed: deck not found: 3\n");
    }

    #[test]
    fn test_grade_menu() {
        let previews = grade_previews([0, 1, 3, 8]);
        assert_eq!(previews[2].grade, Grade::Good);
        assert_eq!(previews[3].label, "1w");
        assert_eq!(
            grade_menu(&previews),
            "1) again (now)  2) hard (1d)  3) good (3d)  4) easy (1w)"
        );
    }
}
