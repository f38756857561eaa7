//! # chapterize
//!
//! A library for segmenting heterogeneous ebook files into a normalized,
//! ordered chapter list.
//!
//! Three source formats are supported, dispatched on file extension:
//!
//! - **EPUB**: the container's navigation tree and reading order drive the
//!   split; embedded image references are rewritten to a public path and the
//!   image resources exported alongside.
//! - **PDF**: the bookmark outline drives page-range extraction, with a
//!   heading-regex fallback over extracted page text when no outline exists.
//! - **Plain text**: encoding is guessed from a candidate list, then chapters
//!   are recovered with heading heuristics and paragraph reconstruction.
//!
//! All three finish with the shared [`chapter::filter_chapters`] pass, so the
//! returned list always carries a contiguous 1-based `order`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chapterize::{SegmentConfig, segment_file};
//! use std::path::Path;
//!
//! let config = SegmentConfig::default();
//! let chapters = segment_file(Path::new("book.epub"), "42", &config)?;
//! for chapter in &chapters {
//!     println!("{}. {}", chapter.order, chapter.title);
//! }
//! # Ok::<(), chapterize::Error>(())
//! ```

use std::path::{Path, PathBuf};

pub mod chapter;
pub mod encoding;
pub mod epub;
pub mod error;
pub mod pdf;
pub mod rules;
pub mod split;
pub mod txt;
pub(crate) mod util;

pub use chapter::{Chapter, FilterPolicy, filter_chapters};
pub use encoding::TextDecoder;
pub use epub::ExtractOptions;
pub use error::{Error, Result};

/// A supported source format, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    PlainText,
    Epub,
    Pdf,
}

impl SourceFormat {
    /// Detect the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::PlainText),
            "epub" => Some(Self::Epub),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Where exported resources go and how rewritten references reach them.
///
/// Only the EPUB path consumes this; TXT and PDF produce no side effects.
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Filesystem root for per-book resource export.
    pub static_root: PathBuf,
    /// Public URL base the static root is served under.
    pub public_base: String,
    /// Skip the first resolvable reading-order entry (assumed cover page).
    pub skip_first_spine: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("static/book"),
            public_base: "/static/book".to_string(),
            skip_first_spine: true,
        }
    }
}

impl SegmentConfig {
    /// Book-scoped EPUB extraction options: resources land under
    /// `{static_root}/{book_id}` and references point at
    /// `{public_base}/{book_id}`.
    pub fn epub_options(&self, book_id: &str) -> ExtractOptions {
        let mut opts = ExtractOptions::new(
            self.static_root.join(book_id),
            format!("{}/{book_id}", self.public_base),
        );
        opts.skip_first_spine = self.skip_first_spine;
        opts
    }
}

/// Segment one ebook file into an ordered chapter list, selecting the
/// segmenter by file extension.
///
/// `book_id` scopes exported resources and rewritten references; it does not
/// appear in the returned chapters.
pub fn segment_file(path: &Path, book_id: &str, config: &SegmentConfig) -> Result<Vec<Chapter>> {
    match SourceFormat::from_path(path) {
        Some(SourceFormat::PlainText) => txt::segment_path(path),
        Some(SourceFormat::Epub) => epub::extract_path(path, &config.epub_options(book_id)),
        Some(SourceFormat::Pdf) => pdf::segment_path(path),
        None => Err(Error::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("<none>")
                .to_string(),
        )),
    }
}
