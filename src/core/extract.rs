//! Recovery of question/answer pairs from free-form completion text.
//!
//! Completion backends are asked for a bare JSON array, but in practice they
//! wrap it in prose, fence it, use single or curly quotes, leave trailing
//! commas, nest it inside an object, or rename the keys. Extraction runs a
//! fixed sequence of stages, each a pure function over the text, and the
//! first stage that yields at least one valid card wins:
//!
//! 1. Direct parse of the whole text
//! 2. Parse of each fenced code block
//! 3. Parse of the sanitized text (quotes, fences, trailing commas repaired)
//! 4. Parse of a balanced `[...]` slice, trying each `[` in turn
//! 5. Per-object salvage of balanced `{...}` fragments
//!
//! Every parsed value goes through the same conversion: arrays are used
//! as-is, objects are searched breadth-first for their first array, and each
//! element is mapped through the question/answer key aliases.

use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CardError, Result};
use crate::util::truncate_chars;

/// Number of raw-text characters kept in a parse failure.
pub const SAMPLE_CHARS: usize = 500;

/// Keys accepted for the question side, in priority order.
pub const QUESTION_KEYS: &[&str] = &["q", "question", "front", "prompt", "term"];

/// Keys accepted for the answer side, in priority order.
pub const ANSWER_KEYS: &[&str] = &["a", "answer", "back", "definition", "explanation"];

/// Upper bound on failed `[` or `{` positions tried by the scanning stages.
pub const MAX_SCAN_ATTEMPTS: usize = 256;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)```").expect("valid fenced block regex")
});

static FENCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+\-]*").expect("valid fence marker regex"));

/// A question/answer pair recovered from completion text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCard {
    pub question: String,
    pub answer: String,
}

impl ExtractedCard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// The stage that recovered the cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    Direct,
    Fenced,
    Sanitized,
    BalancedSlice,
    Salvaged,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Direct => "direct",
            Self::Fenced => "fenced",
            Self::Sanitized => "sanitized",
            Self::BalancedSlice => "balanced_slice",
            Self::Salvaged => "salvaged",
        };
        f.write_str(label)
    }
}

type Stage = fn(&str) -> Option<Vec<ExtractedCard>>;

const STAGES: [(ExtractionStage, Stage); 5] = [
    (ExtractionStage::Direct, parse_direct),
    (ExtractionStage::Fenced, parse_fenced),
    (ExtractionStage::Sanitized, parse_sanitized),
    (ExtractionStage::BalancedSlice, parse_balanced_slice),
    (ExtractionStage::Salvaged, salvage_objects),
];

/// Extract at most `wanted` cards from `raw`, preserving their order.
///
/// The slice and salvage stages give up after [`MAX_SCAN_ATTEMPTS`] failed
/// start positions each, so text with more stray brackets than that before
/// the cards is not recovered by them.
///
/// Fails with [`CardError::Parse`] carrying the first [`SAMPLE_CHARS`]
/// characters of `raw` when no stage recovers a valid card.
pub fn extract(raw: &str, wanted: usize) -> Result<Vec<ExtractedCard>> {
    extract_with_stage(raw, wanted).map(|(cards, _)| cards)
}

/// Like [`extract`], also reporting which stage succeeded.
pub fn extract_with_stage(
    raw: &str,
    wanted: usize,
) -> Result<(Vec<ExtractedCard>, ExtractionStage)> {
    if !raw.trim().is_empty() {
        for (stage, run) in STAGES {
            if let Some(mut cards) = run(raw) {
                cards.truncate(wanted.max(1));
                return Ok((cards, stage));
            }
        }
    }

    Err(CardError::parse(truncate_chars(raw, SAMPLE_CHARS)))
}

// =============================================================================
// Stages
// =============================================================================

fn parse_direct(text: &str) -> Option<Vec<ExtractedCard>> {
    let value = serde_json::from_str::<Value>(text.trim()).ok()?;
    cards_from_value(&value)
}

fn parse_fenced(text: &str) -> Option<Vec<ExtractedCard>> {
    FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|inner| parse_direct(inner.as_str()))
}

fn parse_sanitized(text: &str) -> Option<Vec<ExtractedCard>> {
    parse_direct(&sanitize(text))
}

fn parse_balanced_slice(text: &str) -> Option<Vec<ExtractedCard>> {
    let text = FENCE_MARKER.replace_all(&normalize_curly_quotes(text), "").into_owned();

    text.match_indices('[')
        .take(MAX_SCAN_ATTEMPTS)
        .find_map(|(start, _)| {
            // Repair from the bracket on, so quotes in leading prose cannot
            // flip the string state.
            let repaired = repair_quotes_and_commas(&text[start..]);
            let end = balanced_end(&repaired, '[', ']')?;
            parse_direct(&repaired[..=end])
        })
}

/// Parse each balanced `{...}` fragment that forms a card on its own.
///
/// A fragment that parses as a card is skipped over whole, so braces inside
/// its strings are never rescanned. Any other `{` is retried one character
/// later, which reaches objects nested in a broken wrapper.
fn salvage_objects(text: &str) -> Option<Vec<ExtractedCard>> {
    let text = normalize_curly_quotes(text);
    let mut cards = Vec::new();
    let mut failures = 0;
    let mut from = 0;

    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        match salvage_at(&text[start..]) {
            Some((card, consumed)) => {
                cards.push(card);
                from = start + consumed;
            }
            None => {
                failures += 1;
                if failures >= MAX_SCAN_ATTEMPTS {
                    break;
                }
                from = start + 1;
            }
        }
    }

    (!cards.is_empty()).then_some(cards)
}

/// The card in the object opening `text`, and the bytes of `text` it spans.
fn salvage_at(text: &str) -> Option<(ExtractedCard, usize)> {
    let (repaired, marks) = repair_tracked(text);
    let end = balanced_end(&repaired, '{', '}')?;
    let value = serde_json::from_str::<Value>(&repaired[..=end]).ok()?;
    let card = card_from_value(&value)?;

    // The closing brace is the last input char written at or before `end`.
    let consumed = marks
        .iter()
        .rev()
        .find(|(_, written)| *written <= end)
        .map_or(1, |(read, _)| read + 1);
    Some((card, consumed))
}

// =============================================================================
// Value conversion
// =============================================================================

/// Convert a parsed JSON value into cards.
///
/// Arrays are used directly. Objects are unwrapped to their first array in
/// breadth-first order; an object with no array is tried as a single card.
fn cards_from_value(value: &Value) -> Option<Vec<ExtractedCard>> {
    let cards: Vec<ExtractedCard> = match value {
        Value::Array(items) => items.iter().filter_map(card_from_value).collect(),
        Value::Object(_) => match first_array(value) {
            Some(items) => items.iter().filter_map(card_from_value).collect(),
            None => card_from_value(value).into_iter().collect(),
        },
        _ => Vec::new(),
    };

    (!cards.is_empty()).then_some(cards)
}

fn first_array(root: &Value) -> Option<&Vec<Value>> {
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.push_back(root);

    while let Some(value) = queue.pop_front() {
        match value {
            Value::Array(items) => return Some(items),
            Value::Object(map) => queue.extend(map.values()),
            _ => {}
        }
    }

    None
}

fn card_from_value(value: &Value) -> Option<ExtractedCard> {
    let object = value.as_object()?;
    let question = aliased_text(object, QUESTION_KEYS)?;
    let answer = aliased_text(object, ANSWER_KEYS)?;

    if question.is_empty() || answer.is_empty() {
        return None;
    }

    Some(ExtractedCard { question, answer })
}

/// Trimmed text of the first alias present with a scalar value.
fn aliased_text(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        object
            .iter()
            .filter(|(key, _)| key.trim().eq_ignore_ascii_case(alias))
            .find_map(|(_, value)| scalar_text(value))
            .map(|text| text.trim().to_string())
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// Text repair
// =============================================================================

/// Full sanitization: curly quotes, fence markers, single quotes, trailing commas.
pub fn sanitize(text: &str) -> String {
    let straight = normalize_curly_quotes(text);
    let unfenced = FENCE_MARKER.replace_all(&straight, "");
    repair_quotes_and_commas(&unfenced)
}

fn normalize_curly_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            other => other,
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq)]
enum Scan {
    Code,
    Double,
    Single,
}

/// Rewrite single-quoted literals as JSON strings and drop trailing commas.
///
/// A `'` only opens a literal in value or key position (after `[`, `{`, `:`
/// or `,`) and only closes one before `:`, `,`, `}`, `]` or the end, so
/// apostrophes in prose and inside literals pass through untouched.
fn repair_quotes_and_commas(text: &str) -> String {
    repair_tracked(text).0
}

/// [`repair_quotes_and_commas`], also returning `(input byte, output byte)`
/// offsets for each char the scan reads.
fn repair_tracked(text: &str) -> (String, Vec<(usize, usize)>) {
    let (offsets, chars): (Vec<usize>, Vec<char>) = text.char_indices().unzip();
    let mut out = String::with_capacity(text.len());
    let mut marks = Vec::with_capacity(chars.len());
    let mut state = Scan::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        marks.push((offsets[i], out.len()));
        match state {
            Scan::Double => {
                out.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 1;
                    }
                } else if c == '"' {
                    state = Scan::Code;
                }
            }
            Scan::Single => match c {
                '\\' => match chars.get(i + 1) {
                    Some('\'') => {
                        out.push('\'');
                        i += 1;
                    }
                    Some(&next) => {
                        out.push('\\');
                        out.push(next);
                        i += 1;
                    }
                    None => out.push_str("\\\\"),
                },
                '\'' if closes_single(&chars, i) => {
                    out.push('"');
                    state = Scan::Code;
                }
                '"' => out.push_str("\\\""),
                _ => out.push(c),
            },
            Scan::Code => match c {
                '"' => {
                    out.push(c);
                    state = Scan::Double;
                }
                '\'' if opens_single(&out) => {
                    out.push('"');
                    state = Scan::Single;
                }
                ',' if matches!(next_significant(&chars, i + 1), Some('}' | ']')) => {}
                _ => out.push(c),
            },
        }
        i += 1;
    }

    (out, marks)
}

fn opens_single(out: &str) -> bool {
    matches!(
        out.trim_end().chars().last(),
        None | Some('[' | '{' | ':' | ',')
    )
}

fn closes_single(chars: &[char], i: usize) -> bool {
    matches!(
        next_significant(chars, i + 1),
        None | Some(':' | ',' | '}' | ']')
    )
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars
        .get(from..)?
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

/// Byte index of the `close` that matches the `open` at the start of `text`.
///
/// Brackets inside double-quoted strings are ignored.
fn balanced_end(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(idx);
            }
        }
    }

    None
}
