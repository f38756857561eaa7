//! Chapter model and the shared length-filtering policy.
//!
//! Every segmenter ends with [`filter_chapters`]: undersized chapters are
//! either merged into their predecessor (TXT) or dropped outright (PDF), and
//! the survivors are renumbered to a contiguous 1-based order.

/// A single logical chapter: the unit of output for every source format.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Chapter {
    pub title: String,
    /// Markup (EPUB) or plain text (TXT, PDF).
    pub content: String,
    /// 1-based position in reading order. Contiguous after filtering.
    pub order: u32,
}

impl Chapter {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            order: 0,
        }
    }

    /// Trimmed content length in characters, the unit all minimum-length
    /// thresholds are expressed in.
    pub fn content_len(&self) -> usize {
        self.content.trim().chars().count()
    }
}

/// What to do with a chapter that falls under the minimum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    /// Append the short chapter's content into the previous surviving
    /// chapter (blank-line separated). The first chapter is exempt and is
    /// always kept, however short.
    MergeIntoPrevious,
    /// Drop short chapters outright.
    Drop,
}

/// Enforce a minimum content length and renumber contiguously from 1.
///
/// With `min_len == 0` this is a pure renumbering pass.
pub fn filter_chapters(chapters: Vec<Chapter>, min_len: usize, policy: FilterPolicy) -> Vec<Chapter> {
    let mut kept: Vec<Chapter> = Vec::with_capacity(chapters.len());

    for mut chapter in chapters {
        chapter.content = chapter.content.trim().to_string();
        if chapter.content_len() >= min_len
            || (kept.is_empty() && policy == FilterPolicy::MergeIntoPrevious)
        {
            kept.push(chapter);
            continue;
        }
        if policy == FilterPolicy::MergeIntoPrevious
            && !chapter.content.is_empty()
            && let Some(prev) = kept.last_mut()
        {
            prev.content.push_str("\n\n");
            prev.content.push_str(&chapter.content);
        }
    }

    for (i, chapter) in kept.iter_mut().enumerate() {
        chapter.order = (i + 1) as u32;
    }
    kept
}

/// Replace blank titles with `"Chapter {order}"`. Applied after renumbering
/// so the default reflects the final position.
pub fn default_blank_titles(chapters: &mut [Chapter]) {
    for chapter in chapters {
        if chapter.title.trim().is_empty() {
            chapter.title = format!("Chapter {}", chapter.order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(title: &str, content: &str) -> Chapter {
        Chapter::new(title, content)
    }

    #[test]
    fn merge_appends_short_chapter_to_previous() {
        let long = "x".repeat(80);
        let chapters = vec![chapter("A", &long), chapter("B", "too short")];
        let out = filter_chapters(chapters, 40, FilterPolicy::MergeIntoPrevious);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "A");
        assert!(out[0].content.ends_with("too short"));
        assert_eq!(out[0].order, 1);
    }

    #[test]
    fn first_chapter_is_exempt_from_merge() {
        let out = filter_chapters(vec![chapter("A", "tiny")], 40, FilterPolicy::MergeIntoPrevious);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].order, 1);
    }

    #[test]
    fn drop_policy_discards_short_chapters() {
        let long = "y".repeat(60);
        let chapters = vec![
            chapter("A", "tiny"),
            chapter("B", &long),
            chapter("C", ""),
            chapter("D", &long),
        ];
        let out = filter_chapters(chapters, 50, FilterPolicy::Drop);
        assert_eq!(out.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(), ["B", "D"]);
        assert_eq!(out.iter().map(|c| c.order).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn min_len_counts_chars_not_bytes() {
        // 40 CJK chars is 120 bytes but still meets a 40-char minimum.
        let cjk = "字".repeat(40);
        let out = filter_chapters(
            vec![chapter("A", &cjk), chapter("B", &cjk)],
            40,
            FilterPolicy::MergeIntoPrevious,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn blank_titles_default_to_chapter_order() {
        let long = "z".repeat(50);
        let mut out = filter_chapters(
            vec![chapter("", &long), chapter("  ", &long)],
            40,
            FilterPolicy::MergeIntoPrevious,
        );
        default_blank_titles(&mut out);
        assert_eq!(out[0].title, "Chapter 1");
        assert_eq!(out[1].title, "Chapter 2");
    }
}
