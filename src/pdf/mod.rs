//! Portable-document segmentation.
//!
//! Strategy is chosen once per document: an outline (bookmark tree) with at
//! least one node drives page-range extraction; otherwise the page text is
//! split with the shared heading rules. Both paths finish with a drop-on-short
//! filter at 50 chars and a contiguous renumbering.

mod outline;

use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::chapter::{Chapter, FilterPolicy, default_blank_titles, filter_chapters};
use crate::error::{Error, Result};
use crate::rules::pdf_rules;
use crate::split::split_chapters;

pub use outline::{OutlineArena, OutlineNode, build_outline, chapters_from_outline};

/// Minimum chapter length; shorter chapters are dropped outright.
const MIN_CHAPTER_LENGTH: usize = 50;

const DEFAULT_TITLE: &str = "Prologue";

/// Segment a PDF file on disk.
pub fn segment_path(path: &Path) -> Result<Vec<Chapter>> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::MissingResource(format!("{}: {e}", path.display())))?;
    segment_bytes(&bytes)
}

/// Segment a PDF from raw bytes.
pub fn segment_bytes(bytes: &[u8]) -> Result<Vec<Chapter>> {
    let doc = Document::load_mem(bytes)?;
    segment_document(&doc)
}

/// Segment an already-loaded document.
pub fn segment_document(doc: &Document) -> Result<Vec<Chapter>> {
    let page_count = doc.get_pages().len() as u32;

    let arena = build_outline(doc);
    let chapters = if arena.is_empty() {
        debug!("no outline, splitting extracted page text on heading rules");
        split_page_text(doc, page_count)
    } else {
        debug!(nodes = arena.nodes.len(), "outline found, extracting by bookmark tree");
        chapters_from_outline(&arena, page_count, |start, end| {
            extract_page_range(doc, start, end)
        })
    };

    let mut chapters = filter_chapters(chapters, MIN_CHAPTER_LENGTH, FilterPolicy::Drop);
    default_blank_titles(&mut chapters);
    Ok(chapters)
}

/// Concatenated text of pages `start..=end` (1-based, inclusive). A page
/// that fails text extraction degrades to empty text rather than aborting.
fn extract_page_range(doc: &Document, start: u32, end: u32) -> String {
    let mut pages = Vec::new();
    for page in start..=end {
        match doc.extract_text(&[page]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!(page, error = %e, "page text extraction failed");
                pages.push(String::new());
            }
        }
    }
    pages.join("\n")
}

/// Heading-regex fallback: page-by-page text, newline-joined, split with the
/// document-oriented rule table.
fn split_page_text(doc: &Document, page_count: u32) -> Vec<Chapter> {
    let text = extract_page_range(doc, 1, page_count.max(1));
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    split_chapters(&lines, pdf_rules(), DEFAULT_TITLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::split_chapters as split;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fallback_splits_on_appendix_marker() {
        let body = "The main body of this document is long enough to survive the length filter easily.";
        let appendix = "Tables of measurements and other supplementary data, also long enough to keep around.";
        let input = lines(&["Chapter 1 Intro", body, "Appendix A", appendix]);
        let chapters = split(&input, pdf_rules(), DEFAULT_TITLE);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Chapter 1 Intro");
        assert_eq!(chapters[1].title, "Appendix A");
        // The marker line itself is excluded from the body.
        assert!(!chapters[1].content.contains("Appendix A"));
        assert_eq!(chapters[1].content, appendix);
    }

    #[test]
    fn fallback_splits_on_dotted_numbering() {
        let para = "Enough prose to pass the portable-document minimum chapter length of fifty chars.";
        let input = lines(&["1.1 Overview", para, "1.2 Details", para]);
        let chapters = split(&input, pdf_rules(), DEFAULT_TITLE);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "1.1 Overview");
        assert_eq!(chapters[1].title, "1.2 Details");
    }

    #[test]
    fn short_chapters_are_dropped_not_merged() {
        let long = "This chapter body is comfortably longer than the fifty character minimum threshold.";
        let chapters = vec![
            Chapter::new("Keep", long),
            Chapter::new("Drop", "tiny"),
            Chapter::new("Keep 2", long),
        ];
        let out = filter_chapters(chapters, MIN_CHAPTER_LENGTH, FilterPolicy::Drop);
        assert_eq!(out.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(), ["Keep", "Keep 2"]);
        assert_eq!(out.iter().map(|c| c.order).collect::<Vec<_>>(), [1, 2]);
    }
}
