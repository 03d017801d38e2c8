//! Doc-comment reflow
//!
//! Re-wraps a located block's content to a target width while keeping its
//! tag structure: tags are never split, `<code>` bodies are never wrapped,
//! and short block elements can collapse onto one line.
//!
//! Tag pairing is not recursive: an element ends at the first matching
//! close tag, so same-named nested elements are not resolved.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::doc::block::{DocCommentBlock, DocCommentLocator};
use crate::doc::style::CommentStyle;
use crate::error::Result;

/// Width used when the configured width is 0
pub const DEFAULT_MAX_WIDTH: usize = 120;

/// Content never gets narrower than this, however deep the indentation
pub const MIN_CONTENT_WIDTH: usize = 20;

/// Indent applied to preformatted lines, both here and when rendering
pub const CODE_INDENT: &str = "    ";

/// Elements whose bodies are reproduced line by line
const PREFORMATTED_TAGS: [&str; 2] = ["code", "pre"];

/// Elements eligible for the single-line compact form
const BLOCK_TAGS: [&str; 11] = [
    "summary",
    "remarks",
    "returns",
    "value",
    "param",
    "typeparam",
    "exception",
    "example",
    "permission",
    "para",
    "seealso",
];

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Opening (or self-closing) tag
static OPEN_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z_][\w:.\-]*)(?:\s[^<>]*?)?\s*(/?)>").expect("Invalid OPEN_TAG_RE regex")
});

/// A wrap token: a complete tag or a run of non-space characters, glued
/// together when they touch
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:<[^<>]*>|[^ <]|<)+").expect("Invalid TOKEN_RE regex"));

static HSPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("Invalid HSPACE_RE regex"));

/// Options for reflowing doc comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflowOptions {
    /// Target line width including the comment prefix (0 = default)
    pub max_width: usize,
    /// Collapse short block elements onto one line
    pub use_compact_style: bool,
    /// Keep blank lines between paragraphs
    pub preserve_blank_lines: bool,
}

impl Default for ReflowOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            use_compact_style: true,
            preserve_blank_lines: true,
        }
    }
}

/// A piece of decomposed block content
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'a> {
    /// Loose text outside any element
    Text(&'a str),
    /// `<tag/>`, kept verbatim
    SelfClosing(&'a str),
    /// `<tag attrs>inner</tag>`
    Paired {
        name: &'a str,
        open: &'a str,
        inner: &'a str,
        close: &'a str,
    },
}

/// Prefixes and widths for one block's output lines
#[derive(Debug)]
struct Layout {
    prefix: String,
    blank: String,
    available: usize,
    options: ReflowOptions,
}

impl Layout {
    fn for_block(block: &DocCommentBlock, options: &ReflowOptions) -> Self {
        let style = &block.style;
        let indentation = block.indentation.as_str();

        let (prefix, blank) = if is_delimited_output(block) {
            match style.continuation.as_deref().map(str::trim_end) {
                Some(marker) if !marker.trim().is_empty() => (
                    format!("{indentation}{marker} "),
                    format!("{indentation}{marker}"),
                ),
                _ => (indentation.to_string(), String::new()),
            }
        } else {
            (
                format!("{indentation}{} ", style.single_line_prefix),
                format!("{indentation}{}", style.single_line_prefix),
            )
        };

        let max_width = if options.max_width == 0 {
            DEFAULT_MAX_WIDTH
        } else {
            options.max_width
        };
        let available = max_width
            .saturating_sub(prefix.width())
            .max(MIN_CONTENT_WIDTH);

        Self {
            prefix,
            blank,
            available,
            options: options.clone(),
        }
    }

    fn line(&self, content: &str) -> String {
        if content.is_empty() {
            self.blank.clone()
        } else {
            format!("{}{}", self.prefix, content)
        }
    }
}

fn is_delimited_output(block: &DocCommentBlock) -> bool {
    block.is_multi_line_form && block.style.has_multi_line()
}

/// Reflow one block, returning its replacement text
///
/// Returns `Ok(None)` when there is nothing to reflow: blank content, or
/// content with no elements. Fails only for an unusable comment style.
pub fn reflow_block(block: &DocCommentBlock, options: &ReflowOptions) -> Result<Option<String>> {
    block.style.validate()?;

    if block.raw_content.trim().is_empty() {
        return Ok(None);
    }

    let pieces = decompose(&block.raw_content, true);
    if !pieces.iter().any(|p| !matches!(p, Piece::Text(_))) {
        return Ok(None);
    }

    let layout = Layout::for_block(block, options);
    let mut lines = Vec::new();
    for piece in &pieces {
        emit_piece(piece, &layout, &mut lines);
    }

    let output = if is_delimited_output(block) {
        let style = &block.style;
        let start = style.multi_line_start.as_deref().unwrap_or_default();
        let end = style.multi_line_end.as_deref().unwrap_or_default();
        let mut all = Vec::with_capacity(lines.len() + 2);
        all.push(format!("{}{}", block.indentation, start));
        all.extend(lines);
        all.push(format!("{} {}", block.indentation, end));
        all.join(LINE_ENDING)
    } else {
        lines.join(LINE_ENDING)
    };

    Ok(Some(output))
}

/// Reflow every doc-comment block in a source text
pub fn reflow_text(text: &str, style: &CommentStyle, options: &ReflowOptions) -> Result<String> {
    let locator = DocCommentLocator::new(style.clone())?;
    let mut output = text.to_string();

    // Back to front so earlier spans stay valid
    for block in locator.find_all(text).iter().rev() {
        if let Some(replacement) = reflow_block(block, options)? {
            output.replace_range(block.span.clone(), &replacement);
        }
    }

    Ok(output)
}

fn emit_piece(piece: &Piece, layout: &Layout, lines: &mut Vec<String>) {
    match piece {
        Piece::SelfClosing(tag) => lines.push(layout.line(tag)),
        Piece::Text(text) => emit_paragraphs(text, layout, lines),
        Piece::Paired {
            name,
            open,
            inner,
            close,
        } => {
            if is_preformatted(name) {
                lines.push(layout.line(open));
                for code_line in preformatted_lines(inner) {
                    if code_line.is_empty() {
                        lines.push(layout.blank.clone());
                    } else {
                        lines.push(layout.line(&format!("{CODE_INDENT}{code_line}")));
                    }
                }
                lines.push(layout.line(close));
                return;
            }

            // Keep nested code blocks intact instead of wrapping them
            let nested = decompose(inner, false);
            if nested.iter().any(|p| !matches!(p, Piece::Text(_))) {
                lines.push(layout.line(open));
                for child in &nested {
                    emit_piece(child, layout, lines);
                }
                lines.push(layout.line(close));
                return;
            }

            let paragraphs = split_paragraphs(inner, layout.options.preserve_blank_lines);

            if layout.options.use_compact_style && is_block_tag(name) && paragraphs.len() <= 1 {
                let body = paragraphs.first().map(String::as_str).unwrap_or("");
                let compact = format!("{open}{body}{close}");
                if compact.width() <= layout.available && !body.is_empty() {
                    lines.push(layout.line(&compact));
                    return;
                }
            }

            lines.push(layout.line(open));
            emit_wrapped(&paragraphs, layout, lines);
            lines.push(layout.line(close));
        }
    }
}

fn emit_paragraphs(text: &str, layout: &Layout, lines: &mut Vec<String>) {
    let paragraphs = split_paragraphs(text, layout.options.preserve_blank_lines);
    emit_wrapped(&paragraphs, layout, lines);
}

fn emit_wrapped(paragraphs: &[String], layout: &Layout, lines: &mut Vec<String>) {
    for paragraph in paragraphs {
        if paragraph.is_empty() {
            lines.push(layout.blank.clone());
            continue;
        }
        for wrapped in wrap_paragraph(paragraph, layout.available) {
            lines.push(layout.line(&wrapped));
        }
    }
}

fn is_preformatted(name: &str) -> bool {
    PREFORMATTED_TAGS.contains(&name.to_lowercase().as_str())
}

fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.contains(&name.to_lowercase().as_str())
}

/// Split content into loose text, self-closing tags and paired elements
///
/// At the top level every tag starts an element. Nested (`top_level` false)
/// only block and preformatted tags do; inline tags stay in the text.
fn decompose(content: &str, top_level: bool) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while pos < content.len() {
        let Some(caps) = OPEN_TAG_RE.captures(&content[pos..]) else {
            break;
        };
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let start = pos + whole.start();
        let end = pos + whole.end();
        let name = &content[pos + name.start()..pos + name.end()];
        let self_closing = caps.get(2).is_some_and(|m| !m.as_str().is_empty());

        if !top_level && !is_preformatted(name) && !is_block_tag(name) {
            pos = end;
            continue;
        }

        if self_closing {
            push_text(&mut pieces, &content[text_start..start]);
            pieces.push(Piece::SelfClosing(&content[start..end]));
            text_start = end;
            pos = end;
            continue;
        }

        let close_tag = format!("</{name}>");
        match content[end..].find(&close_tag) {
            Some(offset) => {
                push_text(&mut pieces, &content[text_start..start]);
                let close_start = end + offset;
                let close_end = close_start + close_tag.len();
                pieces.push(Piece::Paired {
                    name,
                    open: &content[start..end],
                    inner: &content[end..close_start],
                    close: &content[close_start..close_end],
                });
                text_start = close_end;
                pos = close_end;
            }
            // Unclosed: the tag stays part of the surrounding text
            None => pos = end,
        }
    }

    push_text(&mut pieces, &content[text_start..]);
    pieces
}

fn push_text<'a>(pieces: &mut Vec<Piece<'a>>, text: &'a str) {
    if !text.trim().is_empty() {
        pieces.push(Piece::Text(text));
    }
}

/// Unify line endings, then collapse spaces/tabs and trim each line
fn normalize_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(|line| HSPACE_RE.replace_all(line, " ").trim().to_string())
        .collect()
}

/// Group normalized lines into paragraphs
///
/// With `preserve_blank_lines`, paragraphs are separated by an empty
/// marker entry; without it, blank separators are dropped and everything
/// joins into one paragraph.
fn split_paragraphs(text: &str, preserve_blank_lines: bool) -> Vec<String> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in normalize_lines(text) {
        if line.is_empty() {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    if !preserve_blank_lines {
        let joined = groups
            .into_iter()
            .map(|g| g.join(" "))
            .collect::<Vec<_>>()
            .join(" ");
        return if joined.is_empty() {
            Vec::new()
        } else {
            vec![joined]
        };
    }

    let mut paragraphs = Vec::new();
    for (i, group) in groups.into_iter().enumerate() {
        if i > 0 {
            paragraphs.push(String::new());
        }
        paragraphs.push(group.join(" "));
    }
    paragraphs
}

/// Lines of a preformatted body: outer blank lines dropped, common
/// indentation removed, interior blank lines kept as empty strings
fn preformatted_lines(inner: &str) -> Vec<String> {
    let normalized = inner.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').map(str::trim_end).collect();

    let Some(first) = lines.iter().position(|l| !l.is_empty()) else {
        return Vec::new();
    };
    let last = lines.iter().rposition(|l| !l.is_empty()).unwrap_or(first);
    let body = &lines[first..=last];

    let common = body
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    body.iter()
        .map(|l| if l.is_empty() { String::new() } else { l[common..].to_string() })
        .collect()
}

/// Tokenize a paragraph into tags and words
pub fn tokenize(paragraph: &str) -> Vec<&str> {
    TOKEN_RE.find_iter(paragraph).map(|m| m.as_str()).collect()
}

/// Greedy word wrap
///
/// Tokens are packed while `line + " " + token` fits in `width`; a token
/// wider than `width` gets a line of its own and is never split. Joining a
/// line's tokens with single spaces gives back the exact source substring.
pub fn wrap_paragraph(paragraph: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for token in tokenize(paragraph) {
        let token_width = token.width();
        if current.is_empty() {
            current.push_str(token);
            current_width = token_width;
        } else if current_width + 1 + token_width <= width {
            current.push(' ');
            current.push_str(token);
            current_width += 1 + token_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(token);
            current_width = token_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
