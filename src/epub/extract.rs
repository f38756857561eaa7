//! Chapter extraction from a parsed EPUB container.
//!
//! Walks the spine in reading order, rewrites embedded image references to a
//! caller-configured public path, exports image resources to disk, and titles
//! each chapter from the navigation map with document-level fallbacks. Every
//! emitted spine entry becomes a chapter; structural chapters are trusted, so
//! no minimum-length filtering is applied here.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, warn};

use crate::chapter::Chapter;
use crate::epub::container::{EpubContainer, NavTree, normalize_href};
use crate::error::{Error, Result};
use crate::util::{base_name, decode_text, extract_xml_encoding, has_image_extension, local_name, resolve_entity};

/// Caller-supplied export configuration for one book.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory image resources are exported under (an `Images/`
    /// subdirectory is created inside it). Must exist or be creatable.
    pub output_dir: PathBuf,
    /// Public URL base rewritten image references point at, e.g.
    /// `/static/book/42`.
    pub web_base: String,
    /// Skip the first resolvable reading-order entry, assumed to be a
    /// non-chapter cover page. On by default; configurable because the
    /// assumption is not verified against the content.
    pub skip_first_spine: bool,
}

impl ExtractOptions {
    pub fn new(output_dir: impl Into<PathBuf>, web_base: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            web_base: web_base.into(),
            skip_first_spine: true,
        }
    }
}

/// Extract chapters from an EPUB file on disk.
///
/// Fails with [`Error::MissingResource`] if the file cannot be opened or is
/// not a readable ZIP container.
pub fn extract_path(path: &Path, opts: &ExtractOptions) -> Result<Vec<Chapter>> {
    let file = File::open(path)
        .map_err(|e| Error::MissingResource(format!("{}: {e}", path.display())))?;
    extract_from_reader(BufReader::new(file), opts)
}

/// Extract chapters from any `Read + Seek` source (e.g. an in-memory buffer).
pub fn extract_from_reader<R: Read + Seek>(reader: R, opts: &ExtractOptions) -> Result<Vec<Chapter>> {
    let mut container = EpubContainer::open(reader)?;

    export_images(&mut container, &opts.output_dir);
    let nav_map = build_nav_map(&container.nav);

    let mut chapters: Vec<Chapter> = Vec::new();
    let mut skip_pending = opts.skip_first_spine;
    let spine = container.spine.clone();

    for idref in &spine {
        let Some(href) = container.manifest.get(idref).map(|m| m.href.clone()) else {
            debug!(%idref, "spine entry has no manifest item, skipping");
            continue;
        };
        if skip_pending {
            skip_pending = false;
            continue;
        }

        let bytes = match container.read_resource(&href) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%href, error = %e, "spine resource unreadable, skipping");
                continue;
            }
        };

        let declared = extract_xml_encoding(&bytes).map(str::to_string);
        let markup = decode_text(&bytes, declared.as_deref()).into_owned();
        let doc = rewrite_document(&markup, &opts.web_base)?;

        let title = nav_map
            .get(&normalize_href(&href))
            .cloned()
            .or(doc.title)
            .or(doc.first_h1)
            .unwrap_or_else(|| base_name(&href).to_string());

        chapters.push(Chapter {
            title,
            content: doc.content,
            order: chapters.len() as u32 + 1,
        });
    }

    export_cover(&mut container, &opts.output_dir);
    debug!(chapters = chapters.len(), "EPUB extraction complete");
    Ok(chapters)
}

/// Flatten the navigation tree into `normalized href -> title`.
///
/// Explicit-stack preorder walk; the first entry recorded for a reference
/// wins, so duplicate navigation targets keep their outermost title.
fn build_nav_map(nav: &NavTree) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut stack: Vec<usize> = nav.roots.iter().rev().copied().collect();

    while let Some(idx) = stack.pop() {
        let node = &nav.nodes[idx];
        if let Some(href) = &node.href
            && !node.title.trim().is_empty()
        {
            map.entry(normalize_href(href))
                .or_insert_with(|| node.title.trim().to_string());
        }
        stack.extend(node.children.iter().rev());
    }

    map
}

/// Export every image resource in the container to `output_dir/Images/`.
/// Individual failures are logged and skipped; base-name collisions are
/// last-writer-wins.
fn export_images<R: Read + Seek>(container: &mut EpubContainer<R>, output_dir: &Path) {
    let images_dir = output_dir.join("Images");
    if let Err(e) = std::fs::create_dir_all(&images_dir) {
        warn!(dir = %images_dir.display(), error = %e, "cannot create image export dir");
        return;
    }

    let names: Vec<String> = container
        .entry_names()
        .iter()
        .filter(|name| has_image_extension(name))
        .cloned()
        .collect();

    let mut exported: HashSet<String> = HashSet::new();
    for name in names {
        let file_name = base_name(&name).to_string();
        if !exported.insert(file_name.clone()) {
            debug!(%file_name, "duplicate image base name, overwriting previous export");
        }
        let result = container
            .read_entry(&name)
            .and_then(|bytes| std::fs::write(images_dir.join(&file_name), bytes).map_err(Error::from));
        if let Err(e) = result {
            warn!(entry = %name, error = %e, "image export failed, skipping");
        }
    }
}

/// Export the designated cover image to `Images/cover.<ext>`.
fn export_cover<R: Read + Seek>(container: &mut EpubContainer<R>, output_dir: &Path) {
    let Some(href) = container.cover_href.clone() else {
        return;
    };
    let ext = Path::new(&href)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "jpg".to_string());

    let images_dir = output_dir.join("Images");
    let result = std::fs::create_dir_all(&images_dir)
        .map_err(Error::from)
        .and_then(|_| container.read_resource(&href))
        .and_then(|bytes| {
            std::fs::write(images_dir.join(format!("cover.{ext}")), bytes).map_err(Error::from)
        });
    if let Err(e) = result {
        warn!(%href, error = %e, "cover export failed");
    }
}

/// Result of one content-document pass: rewritten markup plus the title
/// candidates found along the way.
struct ScannedDocument {
    content: String,
    title: Option<String>,
    first_h1: Option<String>,
}

/// Stream a content document through quick-xml, rewriting image references
/// and collecting the `<title>` text and the first `<h1>` text.
fn rewrite_document(markup: &str, web_base: &str) -> Result<ScannedDocument> {
    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut title = String::new();
    let mut first_h1 = String::new();
    let mut in_title = false;
    let mut in_h1 = false;
    let mut h1_done = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                match local_name(e.name().as_ref()) {
                    b"title" => in_title = true,
                    b"h1" if !h1_done => in_h1 = true,
                    _ => {}
                }
                match rewrite_image_element(&e, web_base) {
                    Some(rewritten) => writer.write_event(Event::Start(rewritten))?,
                    None => writer.write_event(Event::Start(e))?,
                }
            }
            Ok(Event::Empty(e)) => match rewrite_image_element(&e, web_base) {
                Some(rewritten) => writer.write_event(Event::Empty(rewritten))?,
                None => writer.write_event(Event::Empty(e))?,
            },
            Ok(Event::End(e)) => {
                match local_name(e.name().as_ref()) {
                    b"title" => in_title = false,
                    b"h1" if in_h1 => {
                        in_h1 = false;
                        h1_done = true;
                    }
                    _ => {}
                }
                writer.write_event(Event::End(e))?;
            }
            Ok(Event::Text(e)) => {
                if in_title || in_h1 {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    if in_title {
                        title.push_str(&text);
                    }
                    if in_h1 {
                        first_h1.push_str(&text);
                    }
                }
                writer.write_event(Event::Text(e))?;
            }
            Ok(Event::GeneralRef(e)) => {
                if in_title || in_h1 {
                    let resolved = resolve_entity(&String::from_utf8_lossy(e.as_ref()));
                    if in_title {
                        title.push_str(resolved);
                    }
                    if in_h1 {
                        first_h1.push_str(resolved);
                    }
                }
                writer.write_event(Event::GeneralRef(e))?;
            }
            Ok(Event::Eof) => break,
            Ok(other) => writer.write_event(other)?,
            Err(e) => return Err(Error::Xml(e)),
        }
    }

    let content = String::from_utf8(writer.into_inner().into_inner())?;
    let non_blank = |s: String| {
        let t = s.trim().to_string();
        (!t.is_empty()).then_some(t)
    };
    Ok(ScannedDocument {
        content,
        title: non_blank(title),
        first_h1: non_blank(first_h1),
    })
}

/// Rebuild an `<img>`/`<image>` tag with its image reference rewritten to
/// the public path. Returns `None` when nothing changes, so untouched tags
/// keep their original bytes.
fn rewrite_image_element(e: &BytesStart<'_>, web_base: &str) -> Option<BytesStart<'static>> {
    let ref_attr: &[u8] = match local_name(e.name().as_ref()) {
        b"img" => b"src",
        b"image" => b"href",
        _ => return None,
    };

    let mut rebuilt = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    let mut changed = false;

    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == ref_attr {
            let value = String::from_utf8_lossy(&attr.value).into_owned();
            if let Some(new_value) = rewrite_image_ref(&value, web_base) {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                rebuilt.push_attribute((key.as_str(), new_value.as_str()));
                changed = true;
                continue;
            }
        }
        rebuilt.push_attribute(attr);
    }

    changed.then_some(rebuilt)
}

/// Rewrite a local image reference to `{web_base}/Images/<basename>`.
/// Remote (`http://`, `https://`) and inline `data:` references are left
/// untouched.
fn rewrite_image_ref(src: &str, web_base: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let lower = src.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:") {
        return None;
    }
    Some(format!("{web_base}/Images/{}", base_name(src)))
}
