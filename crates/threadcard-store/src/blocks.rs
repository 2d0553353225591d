//! Structured record content: inline rich text and content blocks.
//!
//! Summaries come back from the summarizer as loosely formatted text. The
//! parser here turns it into headings, list items and paragraphs whose inline
//! `**bold**` and `_italic_` spans become annotated text runs.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

static INLINE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*.*?\*\*|_.*?_").expect("Invalid inline span regex"));

static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*(.*?):\*\*$").expect("Invalid heading regex"));

/// A run of text sharing the same annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub link: Option<String>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            link: None,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            italic: true,
            ..Self::plain(text)
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            link: Some(url.into()),
            ..Self::plain(text)
        }
    }

    fn to_wire(&self) -> Value {
        let mut text = json!({ "content": self.text });
        if let Some(url) = &self.link {
            text["link"] = json!({ "url": url });
        }
        json!({
            "type": "text",
            "text": text,
            "annotations": { "bold": self.bold, "italic": self.italic },
        })
    }
}

/// Wire form of a sequence of runs.
pub fn rich_text_wire(runs: &[TextRun]) -> Value {
    Value::Array(runs.iter().map(TextRun::to_wire).collect())
}

/// Split text on `**bold**` and `_italic_` spans, left to right.
///
/// Markers without a partner stay in the text as literals. Empty runs are dropped.
pub fn parse_rich_text(text: &str) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut push = |run: TextRun| {
        if !run.text.is_empty() {
            runs.push(run);
        }
    };

    let mut cursor = 0;
    for span in INLINE_SPAN.find_iter(text) {
        if span.start() > cursor {
            push(TextRun::plain(&text[cursor..span.start()]));
        }
        let matched = span.as_str();
        if matched.len() >= 4 && matched.starts_with("**") && matched.ends_with("**") {
            push(TextRun::bold(&matched[2..matched.len() - 2]));
        } else {
            push(TextRun::italic(&matched[1..matched.len() - 1]));
        }
        cursor = span.end();
    }
    if cursor < text.len() {
        push(TextRun::plain(&text[cursor..]));
    }
    runs
}

/// A block of record body content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Heading { level: u8, text: String },
    Paragraph(Vec<TextRun>),
    BulletedItem(Vec<TextRun>),
    Divider,
    Image { url: String },
}

impl ContentBlock {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        ContentBlock::Heading {
            level: level.clamp(1, 3),
            text: text.into(),
        }
    }

    /// Wire form understood by the store's block API.
    pub fn to_wire(&self) -> Value {
        match self {
            ContentBlock::Heading { level, text } => {
                let kind = format!("heading_{}", (*level).clamp(1, 3));
                let mut block = json!({ "object": "block", "type": kind });
                block[kind.as_str()] =
                    json!({ "rich_text": rich_text_wire(&[TextRun::plain(text.as_str())]) });
                block
            }
            ContentBlock::Paragraph(runs) => json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": rich_text_wire(runs) },
            }),
            ContentBlock::BulletedItem(runs) => json!({
                "object": "block",
                "type": "bulleted_list_item",
                "bulleted_list_item": { "rich_text": rich_text_wire(runs) },
            }),
            ContentBlock::Divider => json!({
                "object": "block",
                "type": "divider",
                "divider": {},
            }),
            ContentBlock::Image { url } => json!({
                "object": "block",
                "type": "image",
                "image": { "type": "external", "external": { "url": url } },
            }),
        }
    }
}

/// Parse summary text into content blocks, one block per non-blank line.
///
/// A whole line `**Heading:**` becomes a level 3 heading that keeps its colon;
/// lines starting with `* ` or `- ` become list items; anything else is a paragraph.
pub fn parse_summary_to_blocks(text: &str) -> Vec<ContentBlock> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if let Some(caps) = HEADING_LINE.captures(line) {
                let title = caps.get(1).map_or("", |m| m.as_str());
                ContentBlock::heading(3, format!("{}:", title))
            } else if let Some(item) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
                ContentBlock::BulletedItem(parse_rich_text(item))
            } else {
                ContentBlock::Paragraph(parse_rich_text(line))
            }
        })
        .collect()
}
