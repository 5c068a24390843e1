//! Pure text classification: headings, paragraphs, sentences, punctuation.
//!
//! Every function here is stateless and operates on borrowed text, so the
//! chunking control flow can be tested separately from boundary detection.

use std::sync::LazyLock;

use regex::Regex;

// Patterns are hardcoded literals exercised by the tests below.
#[expect(clippy::expect_used)]
static HEADING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+\S").expect("hardcoded regex pattern is valid"));

#[expect(clippy::expect_used)]
static PARAGRAPH_BREAK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n\s*").expect("hardcoded regex pattern is valid"));

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

const TERMINAL_PUNCTUATION: [char; 7] = ['.', '!', '?', '…', '。', '！', '？'];

/// Characters allowed to trail terminal punctuation (closing quotes, brackets, emphasis).
const TRAILING_CLOSERS: [char; 8] = ['"', '\'', '”', '’', ')', ']', '*', '_'];

/// Count characters (Unicode scalar values), the unit all chunk sizes use.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Whether a single line opens a markdown heading (`#` through `######`).
pub fn is_heading_line(line: &str) -> bool {
    HEADING_REGEX.is_match(line)
}

/// Whether the text contains at least one heading marker.
pub fn has_headings(text: &str) -> bool {
    HEADING_REGEX.is_match(text)
}

/// Split text into blank-line-delimited paragraphs, trimmed, empties dropped.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK_REGEX
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split text into sections that each begin at a heading line.
///
/// Text before the first heading becomes its own section. When the text has
/// fewer than two sections this falls back to [`split_paragraphs`].
pub fn split_sections(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = HEADING_REGEX
        .find_iter(text)
        .map(|m| m.start())
        .filter(|&start| start > 0)
        .collect();

    let sections: Vec<&str> = std::iter::once(0)
        .chain(starts.iter().copied())
        .zip(starts.iter().copied().chain(std::iter::once(text.len())))
        .filter_map(|(from, to)| text.get(from..to))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if sections.len() > 1 {
        sections
    } else {
        split_paragraphs(text)
    }
}

/// Split text into the semantic units the chunker packs.
///
/// Heading sections are preferred; a heading section longer than
/// `max_unit_chars` is broken into its paragraphs so one long section does
/// not become a single oversized unit when paragraph boundaries exist.
pub fn split_units(text: &str, max_unit_chars: usize) -> Vec<&str> {
    if !has_headings(text) {
        return split_paragraphs(text);
    }

    split_sections(text)
        .into_iter()
        .flat_map(|section| {
            if char_len(section) > max_unit_chars {
                split_paragraphs(section)
            } else {
                vec![section]
            }
        })
        .collect()
}

/// Split text into sentences at `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if !SENTENCE_TERMINATORS.contains(&ch) {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                if let Some(sentence) = text.get(start..next_idx).map(str::trim) {
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                }
                start = next_idx;
            }
        }
    }

    if let Some(rest) = text.get(start..).map(str::trim) {
        if !rest.is_empty() {
            sentences.push(rest);
        }
    }

    sentences
}

/// The last `count` sentences of `text`, joined by single spaces.
///
/// Returns `None` when `count` is zero or the text has no sentences.
pub fn trailing_sentences(text: &str, count: usize) -> Option<String> {
    if count == 0 {
        return None;
    }
    let sentences = split_sentences(text);
    let skip = sentences.len().saturating_sub(count);
    let tail = sentences
        .into_iter()
        .skip(skip)
        .collect::<Vec<_>>()
        .join(" ");
    (!tail.is_empty()).then_some(tail)
}

/// Whether the text ends in sentence-terminating punctuation, allowing
/// closing quotes, brackets and emphasis markers after it.
pub fn ends_with_terminal_punctuation(text: &str) -> bool {
    text.trim_end()
        .trim_end_matches(TRAILING_CLOSERS)
        .chars()
        .next_back()
        .is_some_and(|c| TERMINAL_PUNCTUATION.contains(&c))
}

/// Trim trailing whitespace and append a period unless the text already ends
/// in terminal punctuation. Empty text stays empty.
pub fn ensure_terminal_punctuation(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() || ends_with_terminal_punctuation(trimmed) {
        trimmed.to_string()
    } else {
        let stem = trimmed.trim_end_matches([',', ';', ':', '-', '–', '—']);
        format!("{stem}.")
    }
}
