//! Study command: an interactive review sitting.
//!
//! Each due card is shown question first. Enter reveals the answer together
//! with the interval every grade would give, then a grade is read as `1-4`
//! or a grade word. `q` (or end of input) ends the sitting.
//!
//! Cards shown in the sitting are excluded from later picks through a
//! [`ReviewSession`]. With `--loop`, the session is cleared once every due
//! card has been shown, so cards graded `again` come back until they stick.

use std::io::{BufRead, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{grade_menu, grade_previews, to_json, ErrorReport};
use crate::core::{format_interval, Card, DeckId, Grade, ReviewQueue, ReviewSession};
use crate::error::Result;
use crate::storage::CardStore;

/// Options for the study command.
#[derive(Debug, Clone, Default)]
pub struct StudyOptions {
    /// Output the summary as JSON.
    pub json: bool,
    /// Suppress the summary.
    pub quiet: bool,
    /// Repeat due cards once all of them have been shown.
    pub repeat: bool,
}

/// How often each grade was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeCounts {
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl GradeCounts {
    fn record(&mut self, grade: Grade) {
        match grade {
            Grade::Again => self.again += 1,
            Grade::Hard => self.hard += 1,
            Grade::Good => self.good += 1,
            Grade::Easy => self.easy += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.again + self.hard + self.good + self.easy
    }
}

/// Summary of a sitting.
#[derive(Debug, Clone, Serialize)]
pub struct StudyOutput {
    pub success: bool,
    pub deck_id: DeckId,
    pub reviewed: u32,
    pub grades: GradeCounts,
    /// True when the sitting ended because nothing was left to show.
    pub exhausted: bool,
    #[serde(flatten)]
    pub failure: Option<ErrorReport>,
}

/// The study command implementation.
pub struct StudyCommand<S: CardStore> {
    queue: ReviewQueue<S>,
    session: ReviewSession,
    clock: Box<dyn Fn() -> DateTime<Utc>>,
}

impl<S: CardStore> StudyCommand<S> {
    /// Create a study command remembering up to `window` shown cards.
    pub fn new(queue: ReviewQueue<S>, window: usize) -> Self {
        Self {
            queue,
            session: ReviewSession::new(window),
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Run a sitting, prompting on `out` and reading answers from `input`.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        deck_id: DeckId,
        options: &StudyOptions,
        input: &mut R,
        out: &mut W,
    ) -> StudyOutput {
        let mut grades = GradeCounts::default();
        let result = self.sit(deck_id, options, input, out, &mut grades);

        let (exhausted, failure) = match result {
            Ok(exhausted) => (exhausted, None),
            Err(e) => (false, Some(ErrorReport::from(&e))),
        };
        StudyOutput {
            success: failure.is_none(),
            deck_id,
            reviewed: grades.total(),
            grades,
            exhausted,
            failure,
        }
    }

    /// Returns whether the due cards ran out, as opposed to the user quitting.
    fn sit<R: BufRead, W: Write>(
        &mut self,
        deck_id: DeckId,
        options: &StudyOptions,
        input: &mut R,
        out: &mut W,
        grades: &mut GradeCounts,
    ) -> Result<bool> {
        loop {
            let Some(card) = self.next_card(deck_id, options.repeat)? else {
                return Ok(true);
            };
            self.session.record_shown(card.id);

            writeln!(out, "\nQ: {}", card.question)?;
            write!(out, "[Enter] show answer, q to quit: ")?;
            out.flush()?;
            match read_line(input)? {
                Some(line) if !is_quit(&line) => {}
                _ => return Ok(false),
            }

            writeln!(out, "A: {}", card.answer)?;
            writeln!(out, "{}", grade_menu(&grade_previews(self.queue.preview(&card))))?;

            let grade = loop {
                write!(out, "Grade [1-4, q]: ")?;
                out.flush()?;
                let Some(line) = read_line(input)? else {
                    return Ok(false);
                };
                if is_quit(&line) {
                    return Ok(false);
                }
                match parse_grade_input(&line) {
                    Some(grade) => break grade,
                    None => writeln!(
                        out,
                        "Unrecognized grade {:?}; enter 1-4 or again/hard/good/easy.",
                        line.trim()
                    )?,
                }
            };

            let schedule = self.queue.grade(card.id, grade, (self.clock)())?;
            grades.record(grade);
            writeln!(out, "Next review: {}", format_interval(schedule.interval))?;
        }
    }

    fn next_card(&mut self, deck_id: DeckId, repeat: bool) -> Result<Option<Card>> {
        let now = (self.clock)();
        if let Some(card) = self.queue.next_due(deck_id, &self.session.exclude_ids(), now)? {
            return Ok(Some(card));
        }
        if repeat && !self.session.is_empty() {
            self.session.clear();
            return self.queue.next_due(deck_id, &[], now);
        }
        Ok(None)
    }

    /// Format the sitting summary based on options.
    pub fn format_output(&self, output: &StudyOutput, options: &StudyOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return to_json(output);
        }

        if let Some(failure) = &output.failure {
            return failure.to_human("Study");
        }

        if output.reviewed == 0 {
            return if output.exhausted {
                format!("No cards due in deck {}.\n", output.deck_id)
            } else {
                "No cards reviewed.\n".to_string()
            };
        }

        let g = &output.grades;
        let mut text = format!(
            "\nReviewed {} card{}: again {}, hard {}, good {}, easy {}.\n",
            output.reviewed,
            if output.reviewed == 1 { "" } else { "s" },
            g.again,
            g.hard,
            g.good,
            g.easy
        );
        if output.exhausted {
            text.push_str("No more cards due.\n");
        }
        text
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "q" | "quit")
}

fn parse_grade_input(line: &str) -> Option<Grade> {
    let line = line.trim();
    match line.parse::<u8>() {
        Ok(key) => Grade::from_key(key),
        Err(_) => line.parse().ok(),
    }
}
