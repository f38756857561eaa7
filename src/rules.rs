//! Data-driven line classification rules.
//!
//! Heading detection in unstructured text is regex-driven, but the patterns
//! live in ordered rule tables rather than in control flow, so new numbering
//! schemes or locales are added by extending a table. Two tiers of structural
//! signal are recognized: a *main heading* starts a new chapter, a *section
//! marker* becomes an embedded sub-heading inside the current chapter.

use std::sync::LazyLock;

use regex::Regex;

/// What a matched rule means for the scanning loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleRole {
    /// Promotional/boilerplate line, dropped during front-matter filtering.
    Noise,
    /// Marker that body content starts here (e.g. a synopsis header).
    FrontMatter,
    /// Starts a new chapter. Capture group 1 is the chapter marker, optional
    /// group 2 a subtitle.
    MainHeading,
    /// A lone numeral-word line, kept as a sub-heading within the chapter.
    SectionMarker,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    role: RuleRole,
}

impl Rule {
    pub fn new(pattern: &str, role: RuleRole) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("valid rule pattern"),
            role,
        }
    }
}

/// Result of classifying one trimmed line against a rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatch {
    Noise,
    FrontMatter,
    /// Composed chapter title: `marker`, plus `" " + subtitle` when present.
    MainHeading { title: String },
    SectionMarker,
}

/// An ordered rule table; the first matching rule wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Classify a line. Noise rules match anywhere in the line; all other
    /// roles require their pattern to span the whole line.
    pub fn classify(&self, line: &str) -> Option<LineMatch> {
        let trimmed = line.trim();
        for rule in &self.rules {
            match rule.role {
                RuleRole::Noise => {
                    if rule.pattern.is_match(trimmed) {
                        return Some(LineMatch::Noise);
                    }
                }
                RuleRole::FrontMatter => {
                    if rule.pattern.is_match(trimmed) {
                        return Some(LineMatch::FrontMatter);
                    }
                }
                RuleRole::MainHeading => {
                    if let Some(caps) = rule.pattern.captures(trimmed) {
                        let marker = caps.get(1).map(|m| m.as_str().trim()).unwrap_or(trimmed);
                        let subtitle = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
                        let title = if subtitle.is_empty() {
                            marker.to_string()
                        } else {
                            format!("{marker} {subtitle}")
                        };
                        return Some(LineMatch::MainHeading { title });
                    }
                }
                RuleRole::SectionMarker => {
                    if rule.pattern.is_match(trimmed) {
                        return Some(LineMatch::SectionMarker);
                    }
                }
            }
        }
        None
    }
}

// CJK chapter marker: 第X章 with optional separator and subtitle.
const CJK_CHAPTER: &str =
    "^(第[零一二三四五六七八九十百千万0-9]{1,6}[章回节卷部集篇])[\\s\u{3000}\\-–—:：]*(.*)$";

// Western chapter marker: "Chapter 12" / "Chapter One", optional subtitle.
const WESTERN_CHAPTER: &str = r"(?i)^(chapter\s+(?:[0-9]+|[a-z]+))(?:[\s\-–—:：]+(.*))?$";

// Lone CJK numeral-word on its own line.
const CJK_SECTION: &str = "^[一二三四五六七八九十百千零]+$";

// Lone English numeral-word on its own line.
const WESTERN_SECTION: &str = r"(?i)^(?:one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)$";

static TXT_RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::new(vec![
        Rule::new("^【作品简介】", RuleRole::FrontMatter),
        Rule::new(
            "小说下载|www\\.|https?://|bbs\\.|整理|版权所有|ISBN|定价|作者：|出版社：",
            RuleRole::Noise,
        ),
        Rule::new(CJK_CHAPTER, RuleRole::MainHeading),
        Rule::new(WESTERN_CHAPTER, RuleRole::MainHeading),
        Rule::new(CJK_SECTION, RuleRole::SectionMarker),
        Rule::new(WESTERN_SECTION, RuleRole::SectionMarker),
    ])
});

static PDF_RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::new(vec![
        Rule::new(CJK_CHAPTER, RuleRole::MainHeading),
        Rule::new(WESTERN_CHAPTER, RuleRole::MainHeading),
        // Dotted multi-level numbering: "1.2.3 Section title".
        Rule::new(r"^((?:[0-9]+\.){1,3}[0-9]+)\s+(\S.*)$", RuleRole::MainHeading),
        // Appendix markers.
        Rule::new("^(附录[A-Z0-9].*)$", RuleRole::MainHeading),
        Rule::new(
            r"(?i)^(appendix\s+[a-z0-9]+)(?:[\s\-–—:：]+(.*))?$",
            RuleRole::MainHeading,
        ),
        Rule::new(CJK_SECTION, RuleRole::SectionMarker),
        Rule::new(WESTERN_SECTION, RuleRole::SectionMarker),
    ])
});

/// Rule table for plain-text novels.
pub fn txt_rules() -> &'static RuleSet {
    &TXT_RULES
}

/// Rule table for extracted PDF page text.
pub fn pdf_rules() -> &'static RuleSet {
    &PDF_RULES
}
