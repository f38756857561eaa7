//! Packaged-markup (EPUB) chapter extraction.

mod container;
mod extract;

pub use container::{EpubContainer, ManifestEntry, NavNode, NavTree, normalize_href};
pub use extract::{ExtractOptions, extract_from_reader, extract_path};
