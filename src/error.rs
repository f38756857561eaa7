//! Error types for chapterize operations.

use thiserror::Error;

/// Errors that can occur while segmenting an ebook into chapters.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// No candidate text encoding produced readable text.
    #[error("no candidate encoding decodes this file; re-save as UTF-8 or GBK")]
    UnreadableEncoding,

    /// The input had no content to segment.
    #[error("input is empty")]
    EmptyInput,

    /// The source container or file could not be located or opened.
    #[error("missing resource: {0}")]
    MissingResource(String),

    #[error("invalid container: {0}")]
    InvalidContainer(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
