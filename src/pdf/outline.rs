//! PDF outline (bookmark) tree: arena construction and chapter traversal.
//!
//! The outline is read out of the catalog's `/Outlines` dictionary chain
//! into an arena of indexed nodes, then traversed iteratively. Keeping the
//! traversal separate from `lopdf` makes the order-assignment and page-range
//! rules testable on synthetic trees.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::warn;

use crate::chapter::Chapter;

/// One bookmark node. Links are arena indices.
#[derive(Debug, Clone, Default)]
pub struct OutlineNode {
    pub title: String,
    /// Resolved 1-based start page. `None` when the destination is absent
    /// or not a direct page reference (e.g. an action or named destination).
    pub page: Option<u32>,
    pub first_child: Option<usize>,
    pub next_sibling: Option<usize>,
}

/// Arena-indexed outline tree.
#[derive(Debug, Clone, Default)]
pub struct OutlineArena {
    pub nodes: Vec<OutlineNode>,
    /// First top-level node, if the document has an outline at all.
    pub first: Option<usize>,
}

impl OutlineArena {
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }
}

enum Link {
    Root,
    FirstChildOf(usize),
    NextSiblingOf(usize),
}

/// Build the outline arena from a document. Returns an empty arena when the
/// catalog has no outline; malformed outline items become pageless nodes.
pub fn build_outline(doc: &Document) -> OutlineArena {
    let mut arena = OutlineArena::default();

    let Some(first_id) = outline_first_id(doc) else {
        return arena;
    };
    let page_numbers: HashMap<ObjectId, u32> =
        doc.get_pages().into_iter().map(|(num, id)| (id, num)).collect();

    // Iterative walk over the First/Next dictionary chain; `seen` guards
    // against reference cycles in corrupt files.
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut stack: Vec<(ObjectId, Link)> = vec![(first_id, Link::Root)];

    while let Some((id, link)) = stack.pop() {
        if !seen.insert(id) {
            warn!(?id, "outline reference cycle detected, stopping this branch");
            continue;
        }
        let Some(dict) = dict_at(doc, id) else {
            continue;
        };

        let idx = arena.nodes.len();
        arena.nodes.push(OutlineNode {
            title: outline_title(doc, dict),
            page: destination_page(doc, dict, &page_numbers),
            first_child: None,
            next_sibling: None,
        });
        match link {
            Link::Root => arena.first = Some(idx),
            Link::FirstChildOf(parent) => arena.nodes[parent].first_child = Some(idx),
            Link::NextSiblingOf(prev) => arena.nodes[prev].next_sibling = Some(idx),
        }

        if let Ok(next) = dict.get(b"Next").and_then(Object::as_reference) {
            stack.push((next, Link::NextSiblingOf(idx)));
        }
        if let Ok(child) = dict.get(b"First").and_then(Object::as_reference) {
            stack.push((child, Link::FirstChildOf(idx)));
        }
    }

    arena
}

/// Walk the arena and emit one chapter per node with a valid page
/// destination: visit the node, then its first child's subtree, then the
/// next sibling. The order counter advances positionally as chapters are
/// emitted, so sibling and child chapters interleave numerically rather
/// than reflecting visual nesting; the final renumbering pass keeps that
/// positional order.
pub fn chapters_from_outline(
    arena: &OutlineArena,
    page_count: u32,
    mut extract_range: impl FnMut(u32, u32) -> String,
) -> Vec<Chapter> {
    let mut chapters = Vec::new();
    let Some(first) = arena.first else {
        return chapters;
    };

    let mut stack: Vec<usize> = vec![first];
    while let Some(idx) = stack.pop() {
        let node = &arena.nodes[idx];

        // Siblings after children keeps node -> subtree -> sibling order.
        if let Some(next) = node.next_sibling {
            stack.push(next);
        }
        if let Some(child) = node.first_child {
            stack.push(child);
        }

        let Some(start) = node.page else {
            warn!(title = %node.title, "outline node has no page destination, skipping");
            continue;
        };
        let end = node
            .next_sibling
            .and_then(|sib| arena.nodes[sib].page)
            .map(|sibling_start| sibling_start.saturating_sub(1))
            .unwrap_or(page_count);

        let content = if end >= start {
            extract_range(start, end)
        } else {
            String::new()
        };
        chapters.push(Chapter {
            title: node.title.trim().to_string(),
            content,
            order: chapters.len() as u32 + 1,
        });
    }

    chapters
}

fn outline_first_id(doc: &Document) -> Option<ObjectId> {
    let catalog = doc.catalog().ok()?;
    let outlines = catalog.get(b"Outlines").ok()?;
    let outlines_id = outlines.as_reference().ok()?;
    let dict = dict_at(doc, outlines_id)?;
    dict.get(b"First").and_then(Object::as_reference).ok()
}

fn dict_at(doc: &Document, id: ObjectId) -> Option<&Dictionary> {
    doc.get_object(id).ok().and_then(|obj| obj.as_dict().ok())
}

fn outline_title(doc: &Document, dict: &Dictionary) -> String {
    let Ok(obj) = dict.get(b"Title") else {
        return String::new();
    };
    let obj = deref(doc, obj);
    match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => String::new(),
    }
}

/// Resolve a direct page destination: a `/Dest` array whose first element
/// references a page object. Named destinations and `/A` actions are not
/// direct page references and resolve to `None`.
fn destination_page(
    doc: &Document,
    dict: &Dictionary,
    page_numbers: &HashMap<ObjectId, u32>,
) -> Option<u32> {
    let dest = deref(doc, dict.get(b"Dest").ok()?);
    let array = match dest {
        Object::Array(items) => items,
        _ => return None,
    };
    let page_ref = array.first()?.as_reference().ok()?;
    page_numbers.get(&page_ref).copied()
}

fn deref<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    // Bounded to tolerate reference loops.
    for _ in 0..16 {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(inner) => obj = inner,
                Err(_) => break,
            },
            _ => break,
        }
    }
    obj
}

/// PDF text strings are UTF-16BE when they carry a BOM, otherwise treated
/// as UTF-8 with a Windows-1252 fallback for legacy producers.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let (decoded, _, _) = encoding_rs::UTF_16BE.decode(&bytes[2..]);
        return decoded.into_owned();
    }
    let (decoded, _, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return decoded.into_owned();
    }
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(title: &str, page: Option<u32>) -> OutlineNode {
        OutlineNode {
            title: title.into(),
            page,
            first_child: None,
            next_sibling: None,
        }
    }

    fn extract_tag(start: u32, end: u32) -> String {
        format!("[{start}-{end}]")
    }

    #[test]
    fn two_siblings_split_the_page_range() {
        // Siblings at pages 1 and 5 in an 8-page document.
        let mut a = node("A", Some(1));
        a.next_sibling = Some(1);
        let arena = OutlineArena {
            nodes: vec![a, node("B", Some(5))],
            first: Some(0),
        };
        let chapters = chapters_from_outline(&arena, 8, extract_tag);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].content, "[1-4]");
        assert_eq!(chapters[1].content, "[5-8]");
        assert_eq!(chapters[0].order, 1);
        assert_eq!(chapters[1].order, 2);
    }

    #[test]
    fn node_precedes_child_subtree_precedes_sibling() {
        // A(p1) { A1(p2) }, B(p5)
        let mut a = node("A", Some(1));
        a.first_child = Some(1);
        a.next_sibling = Some(2);
        let arena = OutlineArena {
            nodes: vec![a, node("A1", Some(2)), node("B", Some(5))],
            first: Some(0),
        };
        let chapters = chapters_from_outline(&arena, 8, extract_tag);
        let titles: Vec<_> = chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["A", "A1", "B"]);
        // A ends before its sibling B; A1 has no sibling so it runs to the
        // document's final page. Positional numbering, not hierarchical.
        assert_eq!(chapters[0].content, "[1-4]");
        assert_eq!(chapters[1].content, "[2-8]");
        assert_eq!(chapters[2].content, "[5-8]");
    }

    #[test]
    fn pageless_node_is_skipped_but_traversal_continues() {
        // A(p1) -> X(no dest) -> B(p5)
        let mut a = node("A", Some(1));
        a.next_sibling = Some(1);
        let mut x = node("X", None);
        x.next_sibling = Some(2);
        let arena = OutlineArena {
            nodes: vec![a, x, node("B", Some(5))],
            first: Some(0),
        };
        let chapters = chapters_from_outline(&arena, 8, extract_tag);
        let titles: Vec<_> = chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
        // X has no page, so A's end page falls back through X's missing
        // destination: the immediate sibling decides, and X has no page.
        assert_eq!(chapters[0].content, "[1-8]");
        assert_eq!(chapters[1].content, "[5-8]");
        // Orders stay contiguous despite the skip.
        assert_eq!(chapters.iter().map(|c| c.order).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn sibling_on_same_page_yields_empty_content() {
        // Next sibling starts on the same page: range would be [2,1].
        let mut a = node("A", Some(2));
        a.next_sibling = Some(1);
        let arena = OutlineArena {
            nodes: vec![a, node("B", Some(2))],
            first: Some(0),
        };
        let chapters = chapters_from_outline(&arena, 4, extract_tag);
        assert_eq!(chapters[0].content, "");
        assert_eq!(chapters[1].content, "[2-4]");
    }

    #[test]
    fn empty_arena_produces_no_chapters() {
        let arena = OutlineArena::default();
        assert!(chapters_from_outline(&arena, 10, extract_tag).is_empty());
    }

    #[test]
    fn utf16_titles_decode() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "第一章".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&bytes), "第一章");
        assert_eq!(decode_pdf_string(b"Chapter 1"), "Chapter 1");
    }
}
