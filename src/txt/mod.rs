//! Plain-text segmentation: heading heuristics over decoded lines.
//!
//! Plain text carries no structure at all, so chapters are recovered from
//! regular-expression heuristics (see [`crate::rules`]) after the encoding
//! has been guessed: filter leading boilerplate, split on main headings,
//! rebuild paragraphs, and fall back to fixed-size windows when the whole
//! file turns out to be one giant untitled chapter.

use std::path::Path;

use crate::chapter::{Chapter, FilterPolicy, default_blank_titles, filter_chapters};
use crate::encoding::TextDecoder;
use crate::error::{Error, Result};
use crate::rules::{LineMatch, RuleSet, txt_rules};
use crate::split::split_chapters;

/// Minimum chapter length; shorter chapters merge into their predecessor.
const MIN_CHAPTER_LENGTH: usize = 40;

/// Window size (chars) for splitting a single giant untitled chapter.
const FALLBACK_CHARS_PER_CHAPTER: usize = 3000;

/// A window boundary nudged to a sentence break is only accepted when it
/// lands at least this many chars past the window start.
const MIN_WINDOW_ADVANCE: usize = 200;

/// Title given to content that precedes the first detected heading.
const DEFAULT_TITLE: &str = "Prologue";

/// Segment a plain-text file on disk.
pub fn segment_path(path: &Path) -> Result<Vec<Chapter>> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::MissingResource(format!("{}: {e}", path.display())))?;
    segment_bytes(&bytes)
}

/// Segment raw plain-text bytes, guessing the encoding first.
pub fn segment_bytes(bytes: &[u8]) -> Result<Vec<Chapter>> {
    let lines = TextDecoder::default().read_lines(bytes)?;
    segment_lines(lines)
}

/// Segment already-decoded lines.
pub fn segment_lines(lines: Vec<String>) -> Result<Vec<Chapter>> {
    if lines.is_empty() {
        return Err(Error::EmptyInput);
    }
    let rules = txt_rules();

    // Non-breaking spaces confuse both the heading regexes and paragraph
    // merging; the ideographic space U+3000 stays, it signals indentation.
    let normalized: Vec<String> = lines
        .into_iter()
        .map(|line| line.replace('\u{00a0}', " "))
        .collect();

    let body = filter_header_noise(normalized, rules);
    let mut chapters = split_chapters(&body, rules, DEFAULT_TITLE);

    let giant_untitled = chapters.len() == 1
        && chapters[0].title == DEFAULT_TITLE
        && chapters[0].content.chars().count() > FALLBACK_CHARS_PER_CHAPTER;
    if giant_untitled && let Some(only) = chapters.pop() {
        chapters = fallback_split_by_length(&only.content);
    }

    let mut chapters = filter_chapters(chapters, MIN_CHAPTER_LENGTH, FilterPolicy::MergeIntoPrevious);
    default_blank_titles(&mut chapters);
    Ok(chapters)
}

/// Drop leading noise and blank lines. Scanning stops at the first line that
/// is neither, so explicit boilerplate is the only content ever discarded.
fn filter_header_noise(lines: Vec<String>, rules: &RuleSet) -> Vec<String> {
    let start = lines
        .iter()
        .position(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !matches!(rules.classify(trimmed), Some(LineMatch::Noise))
        })
        .unwrap_or(lines.len());
    lines[start..].to_vec()
}

/// Re-split one giant untitled body into fixed-size windows, nudging each
/// boundary back to the nearest sentence period or newline inside the window.
fn fallback_split_by_length(body: &str) -> Vec<Chapter> {
    let boundaries: Vec<usize> = body.char_indices().map(|(i, _)| i).collect();
    let total_chars = boundaries.len();
    let byte_at = |char_idx: usize| {
        if char_idx >= total_chars {
            body.len()
        } else {
            boundaries[char_idx]
        }
    };

    let mut chapters = Vec::new();
    let mut start = 0usize;
    let mut part = 1u32;

    while start < total_chars {
        let mut end = (start + FALLBACK_CHARS_PER_CHAPTER).min(total_chars);
        if end < total_chars {
            let window = &body[byte_at(start)..byte_at(end)];
            let newline = memchr::memrchr(b'\n', window.as_bytes());
            let period = window.rfind('。');
            if let Some(cut) = newline.into_iter().chain(period).max() {
                // Chars up to and including the break character.
                let advance = window[..cut].chars().count() + 1;
                if advance > MIN_WINDOW_ADVANCE {
                    end = start + advance;
                }
            }
        }
        let slice = body[byte_at(start)..byte_at(end)].trim();
        if !slice.is_empty() {
            chapters.push(Chapter::new(format!("Part {part}"), slice));
            part += 1;
        }
        start = end;
    }

    chapters
}
