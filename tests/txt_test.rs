use chapterize::txt::{segment_bytes, segment_lines};

fn lines(input: &[&str]) -> Vec<String> {
    input.iter().map(|s| s.to_string()).collect()
}

#[test]
fn single_heading_single_body() {
    let chapters = segment_lines(lines(&[
        "Chapter One Beginnings",
        "Some short body text that is definitely more than forty characters long for sure.",
    ]))
    .expect("segmentation succeeds");

    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].title, "Chapter One Beginnings");
    assert_eq!(
        chapters[0].content,
        "Some short body text that is definitely more than forty characters long for sure."
    );
    assert_eq!(chapters[0].order, 1);
}

#[test]
fn short_second_chapter_merges_into_first() {
    let chapters = segment_lines(lines(&[
        "Chapter 1 Alpha",
        "This first chapter has a body that is comfortably over the forty character minimum.",
        "Chapter 2 Beta",
        "only ten!",
    ]))
    .expect("segmentation succeeds");

    // The second chapter's order is never assigned.
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].title, "Chapter 1 Alpha");
    assert!(chapters[0].content.ends_with("only ten!"));
    assert_eq!(chapters[0].order, 1);
}

#[test]
fn orders_are_contiguous_from_one() {
    let body = "A chapter body that is long enough to clear the minimum threshold on its own merit.";
    let chapters = segment_lines(lines(&[
        "Chapter 1 First",
        body,
        "Chapter 2 Second",
        body,
        "Chapter 3 Third",
        body,
    ]))
    .expect("segmentation succeeds");

    assert_eq!(
        chapters.iter().map(|c| c.order).collect::<Vec<_>>(),
        (1..=chapters.len() as u32).collect::<Vec<_>>()
    );
}

#[test]
fn all_chapters_meet_minimum_except_possibly_first() {
    let body = "Body content for a chapter, repeated until it is long enough to stand alone in the output.";
    let chapters = segment_lines(lines(&[
        "a short prologue line",
        "第一章 开端",
        body,
        "第二章 继续",
        body,
        "第三章 结束",
        "short",
    ]))
    .expect("segmentation succeeds");

    for chapter in chapters.iter().skip(1) {
        assert!(
            chapter.content.trim().chars().count() >= 40,
            "chapter {} too short: {:?}",
            chapter.order,
            chapter.content
        );
    }
}

#[test]
fn content_before_first_heading_becomes_prologue() {
    let chapters = segment_lines(lines(&[
        "An opening passage with no heading that still counts as real narrative content here.",
        "Chapter 1 Proper",
        "The first proper chapter body, long enough that the filter keeps it as its own entry.",
    ]))
    .expect("segmentation succeeds");

    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].title, "Prologue");
    assert_eq!(chapters[1].title, "Chapter 1 Proper");
}

#[test]
fn section_marker_stays_inside_chapter() {
    let chapters = segment_lines(lines(&[
        "第一章 出门",
        "他收拾好行李，天还没亮就出了门，街上一个人也没有，只有风。",
        "二",
        "走到城门口的时候，太阳才刚刚升起来，照在他的背上，暖洋洋的。",
    ]))
    .expect("segmentation succeeds");

    assert_eq!(chapters.len(), 1);
    assert!(chapters[0].content.contains("\n\n二\n\n"));
}

#[test]
fn same_text_in_all_encodings_yields_identical_chapters() {
    let source = "第一章 起点\n\
                  这是第一章的正文内容，写得足够长，确保可以顺利通过四十个字符的最小长度过滤条件而不被合并掉。\n\
                  第二章 终点\n\
                  这是第二章的正文内容，同样写得足够长，确保可以顺利通过最小长度过滤条件而不被合并进前一章。\n";

    let utf8 = segment_bytes(source.as_bytes()).expect("utf-8");
    let (gbk_bytes, _, _) = encoding_rs::GBK.encode(source);
    let gbk = segment_bytes(&gbk_bytes).expect("gbk");
    let (gb18030_bytes, _, _) = encoding_rs::GB18030.encode(source);
    let gb18030 = segment_bytes(&gb18030_bytes).expect("gb18030");

    assert_eq!(utf8, gbk);
    assert_eq!(utf8, gb18030);
    assert_eq!(utf8.len(), 2);
    assert_eq!(utf8[0].title, "第一章 起点");
}

#[test]
fn giant_untitled_body_falls_back_to_windows() {
    let sentence = "这一行是没有任何章节标题的长篇正文，只能按照固定长度切分成多个部分。";
    let mut body_lines = Vec::new();
    for _ in 0..200 {
        body_lines.push(sentence.to_string());
        body_lines.push(String::new());
    }
    let chapters = segment_lines(body_lines).expect("segmentation succeeds");

    assert!(chapters.len() >= 2, "expected windowed parts, got {}", chapters.len());
    assert_eq!(chapters[0].title, "Part 1");
    assert_eq!(chapters[1].title, "Part 2");
    assert_eq!(
        chapters.iter().map(|c| c.order).collect::<Vec<_>>(),
        (1..=chapters.len() as u32).collect::<Vec<_>>()
    );
}

#[test]
fn every_title_is_non_blank() {
    let body = "Normal chapter content that is long enough to survive filtering on its own, no merging.";
    let chapters = segment_lines(lines(&["Chapter 1", body, "Chapter 2", body]))
        .expect("segmentation succeeds");
    for chapter in &chapters {
        assert!(!chapter.title.trim().is_empty());
    }
}
