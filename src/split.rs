//! Two-tier heading splitter and paragraph reconstruction.
//!
//! Shared by the plain-text segmenter and the PDF heading-regex fallback:
//! each consumes decoded lines and a [`RuleSet`], and produces raw chapters
//! (unfiltered, order unassigned) with reconstructed paragraphs.

use std::sync::LazyLock;

use regex::Regex;

use crate::chapter::Chapter;
use crate::rules::{LineMatch, RuleSet};

static EXCESS_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid pattern"));

/// Characters that end a sentence; a merged line after one of these needs no
/// separating space.
const TERMINAL_PUNCT: [char; 7] = ['。', '．', '.', '!', '?', '！', '？'];

/// Scan body lines and split them into chapters on main headings.
///
/// A main-heading line flushes the current buffer as a chapter titled by the
/// *previous* heading (`default_title` for content preceding the first one)
/// and is itself excluded from content. A section marker seen after at least
/// one main heading is embedded into the buffer as a sub-heading surrounded
/// by blank lines. Every other line is buffered verbatim.
pub fn split_chapters(lines: &[String], rules: &RuleSet, default_title: &str) -> Vec<Chapter> {
    let mut chapters = Vec::new();
    let mut current_title = default_title.to_string();
    let mut buffer: Vec<String> = Vec::new();
    let mut seen_main_heading = false;

    for raw in lines {
        match rules.classify(raw) {
            Some(LineMatch::MainHeading { title }) => {
                if !buffer.is_empty() {
                    chapters.push(Chapter::new(
                        current_title.clone(),
                        reconstruct_paragraphs(&buffer, rules),
                    ));
                    buffer.clear();
                }
                current_title = title;
                seen_main_heading = true;
            }
            Some(LineMatch::SectionMarker) if seen_main_heading => {
                if !buffer.is_empty() {
                    buffer.push(String::new());
                }
                buffer.push(raw.trim().to_string());
                buffer.push(String::new());
            }
            _ => buffer.push(raw.clone()),
        }
    }

    if !buffer.is_empty() || current_title != default_title {
        chapters.push(Chapter::new(
            current_title,
            reconstruct_paragraphs(&buffer, rules),
        ));
    }

    chapters
}

/// Rebuild paragraphs from raw chapter lines.
///
/// Blank line: paragraph break. Bare section marker: its own paragraph.
/// Indented line (double ideographic space, tab, or four spaces): new
/// paragraph with the indent stripped. Any other line merges into the
/// paragraph in progress, joined directly after terminal punctuation or an
/// ellipsis, otherwise with a single space.
pub fn reconstruct_paragraphs(lines: &[String], rules: &RuleSet) -> String {
    let mut out = String::new();
    let mut para = String::new();

    let flush = |out: &mut String, para: &mut String| {
        if !para.is_empty() {
            out.push_str(para.trim());
            out.push_str("\n\n");
            para.clear();
        }
    };

    for line in lines {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if !para.is_empty() {
                flush(&mut out, &mut para);
            } else if !out.is_empty() && !out.ends_with("\n\n") {
                out.push_str("\n\n");
            }
            continue;
        }

        if matches!(rules.classify(trimmed), Some(LineMatch::SectionMarker)) {
            flush(&mut out, &mut para);
            out.push_str(trimmed);
            out.push_str("\n\n");
            continue;
        }

        if line.starts_with("\u{3000}\u{3000}") || line.starts_with('\t') || line.starts_with("    ") {
            flush(&mut out, &mut para);
            out.push_str(trimmed);
            out.push_str("\n\n");
            continue;
        }

        if para.is_empty() {
            para.push_str(trimmed);
        } else if ends_sentence(&para) {
            para.push_str(trimmed);
        } else {
            para.push(' ');
            para.push_str(trimmed);
        }
    }

    if !para.is_empty() {
        out.push_str(para.trim());
    }

    EXCESS_BREAKS.replace_all(&out, "\n\n").trim().to_string()
}

fn ends_sentence(para: &str) -> bool {
    para.chars()
        .last()
        .is_some_and(|c| TERMINAL_PUNCT.contains(&c) || c == '…')
}
