//! Grade command: record a review outcome for one card.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{to_json, ErrorReport};
use crate::core::{format_interval, CardId, Grade, ReviewQueue, Schedule};
use crate::error::Result;
use crate::storage::CardStore;

/// Options for the grade command.
#[derive(Debug, Clone, Default)]
pub struct GradeOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the grade command.
#[derive(Debug, Clone, Serialize)]
pub struct GradeOutput {
    pub success: bool,
    pub card_id: CardId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(flatten)]
    pub failure: Option<ErrorReport>,
}

/// The grade command implementation.
pub struct GradeCommand<S: CardStore> {
    queue: ReviewQueue<S>,
}

impl<S: CardStore> GradeCommand<S> {
    pub fn new(queue: ReviewQueue<S>) -> Self {
        Self { queue }
    }

    /// Grade `card_id`. The grade is parsed case-insensitively.
    pub fn run(&self, card_id: CardId, grade: &str, now: DateTime<Utc>) -> GradeOutput {
        match self.grade(card_id, grade, now) {
            Ok((grade, schedule)) => GradeOutput {
                success: true,
                card_id,
                grade: Some(grade),
                schedule: Some(schedule),
                failure: None,
            },
            Err(e) => GradeOutput {
                success: false,
                card_id,
                grade: None,
                schedule: None,
                failure: Some(ErrorReport::from(&e)),
            },
        }
    }

    fn grade(&self, card_id: CardId, grade: &str, now: DateTime<Utc>) -> Result<(Grade, Schedule)> {
        let grade: Grade = grade.parse()?;
        let schedule = self.queue.grade(card_id, grade, now)?;
        Ok((grade, schedule))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &GradeOutput, options: &GradeOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &GradeOutput) -> String {
        if let Some(failure) = &output.failure {
            return failure.to_human("Grading");
        }

        match (&output.grade, &output.schedule) {
            (Some(grade), Some(schedule)) => format!(
                "Card {} graded {}: next review {} (due {}).\n",
                output.card_id,
                grade,
                match schedule.interval {
                    0 => "now".to_string(),
                    days => format!("in {}", format_interval(days)),
                },
                schedule.due.format("%Y-%m-%d %H:%M UTC")
            ),
            _ => String::new(),
        }
    }
}
