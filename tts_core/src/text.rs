//! Text preparation for per-request synthesis limits.
//!
//! Backends cap how much text one request may carry, so replies are cleaned
//! once and then split into chunks that each fit the cap. Splitting prefers
//! sentence boundaries, then clause boundaries, then plain word boundaries.
//! Every split point is a single space in the cleaned text, so joining the
//! chunks with `" "` gives the cleaned text back.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TtsError;

static ELLIPSIS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}").unwrap());
static BANG_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"!{2,}").unwrap());
static QUESTION_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?{2,}").unwrap());

/// Sentence terminator followed by the space that separates it from the next sentence.
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

const CONJUNCTIONS: &[&str] = &["and", "but", "or", "so", "yet", "for", "nor"];

/// One bounded piece of text, tagged with its position in the original reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

/// Normalize text before chunking.
///
/// Collapses all whitespace (newlines and tabs included) to single spaces,
/// swaps double quotes for single quotes and squashes runs of `.`, `!`, `?`.
pub fn clean_text(text: &str) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = cleaned.replace('"', "'");
    let cleaned = ELLIPSIS_RUN.replace_all(&cleaned, "...");
    let cleaned = BANG_RUN.replace_all(&cleaned, "!");
    let cleaned = QUESTION_RUN.replace_all(&cleaned, "?");
    cleaned.into_owned()
}

/// Clean `text` and split it into indexed chunks of at most `max_length` characters.
///
/// Fails with [`TtsError::EmptyInput`] when nothing is left after cleaning.
pub fn prepare_chunks(text: &str, max_length: usize) -> Result<Vec<TextChunk>, TtsError> {
    let cleaned = clean_text(text);
    if cleaned.trim().is_empty() {
        return Err(TtsError::EmptyInput);
    }

    Ok(split_text(&cleaned, max_length)
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk { index, text })
        .collect())
}

/// Split already-cleaned text into chunks of at most `max_length` characters.
///
/// Words longer than `max_length` are emitted on their own and never cut.
pub fn split_text(text: &str, max_length: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_length {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    for sentence in split_sentences(text) {
        if char_len(sentence) <= max_length {
            pieces.push(sentence.to_string());
        } else {
            pieces.extend(split_long_sentence(sentence, max_length));
        }
    }

    pack(pieces, max_length)
}

/// Break text after `.`, `!` or `?` when whitespace follows.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        // keep the terminator, drop the whitespace
        let end = m.start() + 1;
        sentences.push(&text[start..end]);
        start = m.end();
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences.into_iter().filter(|s| !s.trim().is_empty()).collect()
}

/// Split an over-long sentence into clauses, falling back to words for any
/// clause that still does not fit.
fn split_long_sentence(sentence: &str, max_length: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    for clause in split_clauses(sentence) {
        if char_len(&clause) <= max_length {
            pieces.push(clause);
        } else {
            pieces.extend(pack(
                clause.split_whitespace().map(str::to_string).collect(),
                max_length,
            ));
        }
    }
    pieces
}

/// Clause boundaries sit after a word ending in `,` or `;`, and before a
/// coordinating conjunction.
fn split_clauses(sentence: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in sentence.split_whitespace() {
        if !current.is_empty() && is_conjunction(word) {
            clauses.push(current.join(" "));
            current.clear();
        }
        current.push(word);
        if word.ends_with(',') || word.ends_with(';') {
            clauses.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        clauses.push(current.join(" "));
    }
    clauses
}

fn is_conjunction(word: &str) -> bool {
    CONJUNCTIONS.iter().any(|c| word.eq_ignore_ascii_case(c))
}

/// Greedily join pieces with single spaces while the result stays within `max_length`.
fn pack(pieces: Vec<String>, max_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if current.is_empty() {
            current.push_str(piece);
        } else if char_len(&current) + 1 + char_len(piece) <= max_length {
            current.push(' ');
            current.push_str(piece);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(piece);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}
