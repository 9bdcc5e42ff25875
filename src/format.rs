//! Chat message formatting.
//!
//! Tutor answers mix prose with fenced code blocks (```` ```lang ... ``` ````)
//! and inline code spans (`` `x` ``). This module splits a message into those
//! pieces and renders them as an HTML fragment in which every piece of literal
//! text is escaped. The terminal UI walks the same [`Segment`]s to draw
//! messages with styled spans instead of markup.

use once_cell::sync::Lazy;
use regex::Regex;

/// Language attached to a fenced block that carries no tag.
pub const DEFAULT_LANGUAGE: &str = "python";

// A tag only counts when it ends the opening line; "```code here```" is a
// block containing "code here", not a block tagged "code".
static FENCED_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:([^\s`]+)[ \t]*\r?\n)?(.*?)```").expect("fenced block pattern is valid")
});

static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("inline code pattern is valid"));

/// A fenced code block found in a message, with byte offsets into the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockSpan {
    pub start: usize,
    pub end: usize,
    pub language: String,
    /// Block body with surrounding whitespace trimmed.
    pub code: String,
}

/// A top-level piece of a message: prose or a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Prose(&'a str),
    Code(CodeBlockSpan),
}

/// A piece of prose: plain text or an inline code span (backticks removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inline<'a> {
    Text(&'a str),
    Code(&'a str),
}

/// Find every fenced code block, in order of appearance.
///
/// Each block ends at the nearest closing fence. An opening fence with no
/// closing fence is not a block.
pub fn code_block_spans(text: &str) -> Vec<CodeBlockSpan> {
    FENCED_BLOCK_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let language = caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or(DEFAULT_LANGUAGE)
                .to_string();
            let code = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();

            Some(CodeBlockSpan {
                start: whole.start(),
                end: whole.end(),
                language,
                code: code.to_string(),
            })
        })
        .collect()
}

/// Split a message into prose and code block segments.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;

    for span in code_block_spans(text) {
        if span.start > cursor {
            out.push(Segment::Prose(&text[cursor..span.start]));
        }
        cursor = span.end;
        out.push(Segment::Code(span));
    }

    if cursor < text.len() {
        out.push(Segment::Prose(&text[cursor..]));
    }

    out
}

/// Split prose into plain text and inline code spans.
pub fn inline_segments(prose: &str) -> Vec<Inline<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;

    for caps in INLINE_CODE_RE.captures_iter(prose) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            out.push(Inline::Text(&prose[cursor..whole.start()]));
        }
        out.push(Inline::Code(code.as_str()));
        cursor = whole.end();
    }

    if cursor < prose.len() {
        out.push(Inline::Text(&prose[cursor..]));
    }

    out
}

/// Render a message as a safe HTML fragment.
///
/// Accepts either a `&str` or an `Option<&str>`; absent and empty input both
/// produce an empty string.
pub fn format_message<'a>(text: impl Into<Option<&'a str>>) -> String {
    let Some(text) = text.into() else {
        return String::new();
    };

    let mut html = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Prose(prose) => html.push_str(&format_prose(prose)),
            Segment::Code(block) => {
                html.push_str("<pre class=\"code-block\"><code class=\"language-");
                html.push_str(&escape_html(&block.language));
                html.push_str("\">");
                html.push_str(&escape_html(&block.code));
                html.push_str("</code></pre>");
            }
        }
    }
    html
}

/// Render prose: inline code spans become `<code>` elements and newlines
/// become `<br>`.
pub fn format_prose(text: &str) -> String {
    let mut html = String::with_capacity(text.len());
    for piece in inline_segments(text) {
        match piece {
            Inline::Text(t) => html.push_str(&escape_html(t).replace('\n', "<br>")),
            Inline::Code(code) => {
                html.push_str("<code class=\"inline-code\">");
                html.push_str(&escape_html(code));
                html.push_str("</code>");
            }
        }
    }
    html
}

/// Escape the characters that are significant in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
