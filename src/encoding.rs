//! Text encoding detection for plain-text input.
//!
//! The detector tries a fixed priority list of candidate encodings and
//! accepts the first one whose decoded output survives a cheap validation
//! heuristic over the opening lines. This is deliberately not statistical:
//! deterministic first-success-wins over a short candidate list is enough
//! for well-formed files, and a file that fails every candidate surfaces
//! [`Error::UnreadableEncoding`] rather than garbage.

use encoding_rs::{Encoding, GB18030, GBK, UTF_8};

use crate::error::{Error, Result};

/// How many decoded lines the validation heuristic inspects.
const VALIDATION_LINES: usize = 10;

/// Decodes raw bytes into lines of text using a prioritized candidate list.
#[derive(Debug, Clone, Copy)]
pub struct TextDecoder {
    candidates: &'static [&'static Encoding],
}

static DEFAULT_CANDIDATES: [&Encoding; 3] = [UTF_8, GB18030, GBK];

impl Default for TextDecoder {
    fn default() -> Self {
        Self {
            candidates: &DEFAULT_CANDIDATES,
        }
    }
}

impl TextDecoder {
    /// Build a decoder with a custom candidate list (mostly for tests).
    pub fn with_candidates(candidates: &'static [&'static Encoding]) -> Self {
        Self { candidates }
    }

    /// Decode `bytes` into lines with the first candidate that validates.
    ///
    /// A leading byte-order mark is stripped from the first line. Line
    /// terminators (`\n`, `\r\n`) are not included in the returned lines.
    pub fn read_lines(&self, bytes: &[u8]) -> Result<Vec<String>> {
        for encoding in self.candidates {
            let (decoded, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                continue;
            }
            let text = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);
            if looks_like_text(text) {
                return Ok(text.lines().map(str::to_string).collect());
            }
        }
        Err(Error::UnreadableEncoding)
    }
}

/// Validation heuristic: the first few lines of real text contain no
/// replacement characters, no `"??"` mis-decode artifact, and no control
/// characters besides CR/LF/TAB.
fn looks_like_text(text: &str) -> bool {
    for line in text.lines().take(VALIDATION_LINES) {
        if line.contains('\u{fffd}') || line.contains("??") {
            return false;
        }
        if line
            .chars()
            .any(|c| c.is_control() && c != '\r' && c != '\n' && c != '\t')
        {
            return false;
        }
    }
    true
}
