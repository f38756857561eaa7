//! EPUB container parsing: ZIP access, `container.xml`, OPF, and NCX.
//!
//! The container is parsed once, up front, into plain data: a manifest map,
//! the spine id list, an arena-indexed navigation tree, and the cover href.
//! All XML is read with streaming `quick-xml`; the navigation tree is built
//! with an explicit stack so arbitrarily nested `navMap`s cannot overflow.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::util::{local_name, resolve_entity};

/// One manifest item: where a resource lives and what it claims to be.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub href: String,
    pub media_type: String,
}

/// Node of the navigation tree. Children are arena indices.
#[derive(Debug, Clone, Default)]
pub struct NavNode {
    pub title: String,
    pub href: Option<String>,
    pub children: Vec<usize>,
}

/// Arena-indexed navigation tree parsed from the NCX `navMap`.
#[derive(Debug, Clone, Default)]
pub struct NavTree {
    pub nodes: Vec<NavNode>,
    pub roots: Vec<usize>,
}

/// An opened EPUB with its structural metadata parsed.
pub struct EpubContainer<R: Read + Seek> {
    archive: ZipArchive<R>,
    opf_dir: String,
    /// Manifest id -> entry (hrefs are OPF-relative).
    pub manifest: HashMap<String, ManifestEntry>,
    /// Spine idrefs in reading order.
    pub spine: Vec<String>,
    pub nav: NavTree,
    /// OPF-relative href of the designated cover image, if any.
    pub cover_href: Option<String>,
    entry_names: Vec<String>,
}

impl<R: Read + Seek> EpubContainer<R> {
    /// Open and parse an EPUB from any `Read + Seek` source.
    pub fn open(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::MissingResource(format!("not a readable EPUB container: {e}")))?;
        let entry_names: Vec<String> = archive.file_names().map(str::to_string).collect();

        let opf_path = find_opf_path(&mut archive)?;
        let opf_dir = Path::new(&opf_path)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let opf_content = read_archive_string(&mut archive, &opf_path)?;
        let OpfData {
            manifest,
            spine,
            ncx_href,
            cover_href,
        } = parse_opf(&opf_content)?;

        let mut nav = NavTree::default();
        if let Some(ncx_href) = ncx_href {
            let ncx_path = resolve_path(&opf_dir, &ncx_href);
            if let Ok(ncx_content) = read_archive_string(&mut archive, &ncx_path) {
                nav = parse_ncx(&ncx_content)?;
            }
        }

        Ok(Self {
            archive,
            opf_dir,
            manifest,
            spine,
            nav,
            cover_href,
            entry_names,
        })
    }

    /// All entry paths inside the ZIP.
    pub fn entry_names(&self) -> &[String] {
        &self.entry_names
    }

    /// Read a raw ZIP entry by its archive path.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        read_archive_bytes(&mut self.archive, name)
    }

    /// Read a resource by its OPF-relative href.
    pub fn read_resource(&mut self, href: &str) -> Result<Vec<u8>> {
        let path = resolve_path(&self.opf_dir, href);
        read_archive_bytes(&mut self.archive, &path)
    }
}

/// Parsed OPF content.
struct OpfData {
    manifest: HashMap<String, ManifestEntry>,
    spine: Vec<String>,
    ncx_href: Option<String>,
    cover_href: Option<String>,
}

fn find_opf_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let container = read_archive_string(archive, "META-INF/container.xml")?;

    let mut reader = Reader::from_str(&container);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8(attr.value.to_vec())?);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::InvalidContainer(
        "no rootfile found in container.xml".into(),
    ))
}

fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    struct ManifestItem {
        href: String,
        media_type: String,
        properties: Option<String>,
    }

    let mut manifest_items: HashMap<String, ManifestItem> = HashMap::new();
    let mut spine: Vec<String> = Vec::new();
    let mut toc_id: Option<String> = None;
    let mut epub2_cover_id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"spine" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"toc" {
                                toc_id = Some(String::from_utf8(attr.value.to_vec())?);
                            }
                        }
                    }
                    b"item" => {
                        let mut id = String::new();
                        let mut href = String::new();
                        let mut media_type = String::new();
                        let mut properties: Option<String> = None;

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"id" => id = String::from_utf8(attr.value.to_vec())?,
                                b"href" => href = String::from_utf8(attr.value.to_vec())?,
                                b"media-type" => {
                                    media_type = String::from_utf8(attr.value.to_vec())?
                                }
                                b"properties" => {
                                    properties = Some(String::from_utf8(attr.value.to_vec())?)
                                }
                                _ => {}
                            }
                        }

                        if !id.is_empty() {
                            manifest_items.insert(
                                id,
                                ManifestItem {
                                    href,
                                    media_type,
                                    properties,
                                },
                            );
                        }
                    }
                    b"itemref" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"idref" {
                                spine.push(String::from_utf8(attr.value.to_vec())?);
                            }
                        }
                    }
                    b"meta" => {
                        let mut is_cover = false;
                        let mut cover_id = String::new();

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"name" if attr.value.as_ref() == b"cover" => is_cover = true,
                                b"content" => cover_id = String::from_utf8(attr.value.to_vec())?,
                                _ => {}
                            }
                        }

                        if is_cover && !cover_id.is_empty() {
                            epub2_cover_id = Some(cover_id);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    // Cover detection: EPUB3 "cover-image" property wins over the EPUB2
    // <meta name="cover"> fallback.
    let epub3_cover = manifest_items.values().find(|item| {
        item.properties
            .as_ref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == "cover-image"))
    });
    let cover_href = epub3_cover.map(|item| item.href.clone()).or_else(|| {
        epub2_cover_id
            .and_then(|id| manifest_items.get(&id))
            .map(|item| item.href.clone())
    });

    let ncx_href = toc_id
        .and_then(|id| manifest_items.get(&id))
        .map(|item| item.href.clone());

    let manifest = manifest_items
        .into_iter()
        .map(|(id, item)| {
            (
                id,
                ManifestEntry {
                    href: item.href,
                    media_type: item.media_type,
                },
            )
        })
        .collect();

    Ok(OpfData {
        manifest,
        spine,
        ncx_href,
        cover_href,
    })
}

/// Parse the NCX `navMap` into an arena. Open `navPoint`s form an explicit
/// stack of arena indices; nesting depth is bounded only by memory.
fn parse_ncx(content: &str) -> Result<NavTree> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut tree = NavTree::default();
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    let idx = tree.nodes.len();
                    tree.nodes.push(NavNode::default());
                    match open.last() {
                        Some(&parent) => tree.nodes[parent].children.push(idx),
                        None => tree.roots.push(idx),
                    }
                    open.push(idx);
                }
                b"text" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"content" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"src"
                            && let Some(&top) = open.last()
                        {
                            tree.nodes[top].href = Some(String::from_utf8(attr.value.to_vec())?);
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && let Some(&top) = open.last() {
                    tree.nodes[top]
                        .title
                        .push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && let Some(&top) = open.last() {
                    tree.nodes[top]
                        .title
                        .push_str(resolve_entity(&String::from_utf8_lossy(e.as_ref())));
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navPoint" => {
                    open.pop();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(tree)
}

fn read_archive_string<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let bytes = read_archive_bytes(archive, path)?;
    let bytes = strip_bom(&bytes);
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn read_archive_bytes<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    match archive.by_name(path) {
        Ok(mut file) => {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            return Ok(contents);
        }
        Err(zip::result::ZipError::FileNotFound) => {}
        Err(e) => return Err(e.into()),
    }

    // Fallback: try percent-decoded path (handles malformed EPUBs)
    let decoded = percent_encoding::percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| Error::InvalidContainer(format!("invalid UTF-8 in path: {path}")))?;

    let mut file = archive.by_name(&decoded)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Strip UTF-8 BOM (byte order mark) if present
fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

fn resolve_path(base: &str, href: &str) -> String {
    if base.is_empty() {
        href.to_string()
    } else {
        format!("{base}/{href}")
    }
}

/// Normalize a reference for lookup: strip query string and fragment,
/// percent-decode, and collapse `.`/`..` path segments. Navigation entries
/// and spine hrefs frequently encode the same target slightly differently;
/// both sides of every map lookup go through this.
pub fn normalize_href(href: &str) -> String {
    let href = href.replace('\\', "/");
    let end = href.find(['?', '#']).unwrap_or(href.len());
    let decoded = percent_encoding::percent_decode_str(&href[..end])
        .decode_utf8()
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| href[..end].to_string());

    let mut segments: Vec<&str> = Vec::new();
    for part in decoded.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_query_and_fragment() {
        assert_eq!(normalize_href("text/ch01.xhtml#sec2"), "text/ch01.xhtml");
        assert_eq!(normalize_href("ch01.xhtml?x=1"), "ch01.xhtml");
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(normalize_href("OEBPS/../text/./ch01.xhtml"), "text/ch01.xhtml");
        assert_eq!(normalize_href("./a/b/../c.xhtml"), "a/c.xhtml");
    }

    #[test]
    fn normalize_percent_decodes() {
        assert_eq!(normalize_href("text/ch%2001.xhtml"), "text/ch 01.xhtml");
    }

    #[test]
    fn normalize_handles_backslashes() {
        assert_eq!(normalize_href("text\\ch01.xhtml"), "text/ch01.xhtml");
    }

    #[test]
    fn ncx_parses_into_arena() {
        let ncx = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/">
  <navMap>
    <navPoint id="a" playOrder="1">
      <navLabel><text>Part I</text></navLabel>
      <content src="part1.xhtml"/>
      <navPoint id="a1" playOrder="2">
        <navLabel><text>Chapter 1</text></navLabel>
        <content src="ch01.xhtml"/>
      </navPoint>
    </navPoint>
    <navPoint id="b" playOrder="3">
      <navLabel><text>Part II</text></navLabel>
      <content src="part2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;
        let tree = parse_ncx(ncx).unwrap();
        assert_eq!(tree.roots.len(), 2);
        assert_eq!(tree.nodes.len(), 3);
        let part1 = &tree.nodes[tree.roots[0]];
        assert_eq!(part1.title, "Part I");
        assert_eq!(part1.href.as_deref(), Some("part1.xhtml"));
        assert_eq!(part1.children.len(), 1);
        assert_eq!(tree.nodes[part1.children[0]].title, "Chapter 1");
        let part2 = &tree.nodes[tree.roots[1]];
        assert_eq!(part2.title, "Part II");
        assert!(part2.children.is_empty());
    }

    #[test]
    fn ncx_title_resolves_entities() {
        let ncx = r#"<ncx><navMap><navPoint>
          <navLabel><text>Don&apos;t Stop</text></navLabel>
          <content src="ch.xhtml"/>
        </navPoint></navMap></ncx>"#;
        let tree = parse_ncx(ncx).unwrap();
        assert_eq!(tree.nodes[0].title, "Don't Stop");
    }
}
