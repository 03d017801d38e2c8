//! Doc-comment block locator
//!
//! Finds contiguous documentation comments in source text, in either the
//! single-line form (`/// ...` on consecutive lines) or the delimited form
//! (`/** ... */`), and extracts their inner text with the comment syntax
//! stripped.
//!
//! Line numbers on blocks are 0-based; spans are byte ranges that stop
//! before the last line's line break, or right after the closing
//! delimiter when code follows it on the same line.

use serde::Serialize;
use std::ops::Range;

use crate::doc::style::CommentStyle;
use crate::error::Result;

/// A located documentation comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocCommentBlock {
    /// Byte range from the first line's start to the end of the comment,
    /// excluding the final line break
    pub span: Range<usize>,

    /// First line of the block (0-based, inclusive)
    pub start_line: usize,

    /// Last line of the block (0-based, inclusive)
    pub end_line: usize,

    /// Leading whitespace of the first line
    pub indentation: String,

    /// Inner text with comment syntax removed, lines joined with `\n`
    pub raw_content: String,

    pub style: CommentStyle,

    /// True for the delimited `/** ... */` form
    pub is_multi_line_form: bool,
}

impl DocCommentBlock {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// The block's original text within `text`
    pub fn source<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.span.clone())
    }
}

/// Line table over a text snapshot
#[derive(Debug)]
pub struct SourceLines<'a> {
    text: &'a str,
    /// (start, end) byte offsets; `end` excludes the line break
    spans: Vec<(usize, usize)>,
}

impl<'a> SourceLines<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut spans = Vec::new();
        let mut start = 0;

        for (pos, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                let end = if pos > start && text.as_bytes()[pos - 1] == b'\r' {
                    pos - 1
                } else {
                    pos
                };
                spans.push((start, end));
                start = pos + 1;
            }
        }
        spans.push((start, text.len()));

        Self { text, spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text of a line without its line break
    pub fn line(&self, idx: usize) -> &'a str {
        let (start, end) = self.spans[idx];
        &self.text[start..end]
    }

    pub fn line_start(&self, idx: usize) -> usize {
        self.spans[idx].0
    }

    pub fn line_end(&self, idx: usize) -> usize {
        self.spans[idx].1
    }

    /// Line containing a byte offset; `None` past the end of the text
    pub fn line_of(&self, offset: usize) -> Option<usize> {
        if offset > self.text.len() {
            return None;
        }
        let idx = self.spans.partition_point(|&(start, _)| start <= offset);
        Some(idx.saturating_sub(1))
    }
}

/// Locates doc-comment blocks for one comment style
#[derive(Debug, Clone)]
pub struct DocCommentLocator {
    style: CommentStyle,
}

impl DocCommentLocator {
    /// Fails with `InvalidArgument` for a style without a usable prefix
    pub fn new(style: CommentStyle) -> Result<Self> {
        style.validate()?;
        Ok(Self { style })
    }

    pub fn style(&self) -> &CommentStyle {
        &self.style
    }

    /// All blocks in the text, in order, non-overlapping
    pub fn find_all(&self, text: &str) -> Vec<DocCommentBlock> {
        if text.is_empty() {
            return Vec::new();
        }
        let src = SourceLines::new(text);
        self.scan_lines(&src, 0, src.len() - 1)
    }

    /// The block covering a byte offset, if any
    pub fn block_at(&self, text: &str, offset: usize) -> Option<DocCommentBlock> {
        if text.is_empty() {
            return None;
        }
        let src = SourceLines::new(text);
        let target = src.line_of(offset)?;

        let start = self.block_start(&src, target);
        self.scan_lines(&src, start, target)
            .into_iter()
            .find(|block| block.start_line <= target && target <= block.end_line)
    }

    /// All blocks intersecting a byte range, including one that begins
    /// above the range
    pub fn blocks_in_span(&self, text: &str, span: Range<usize>) -> Vec<DocCommentBlock> {
        if text.is_empty() || span.start > text.len() {
            return Vec::new();
        }
        let src = SourceLines::new(text);
        let Some(first) = src.line_of(span.start) else {
            return Vec::new();
        };
        let last = src
            .line_of(span.end.min(text.len()))
            .unwrap_or(src.len() - 1)
            .max(first);

        let start = self.block_start(&src, first);
        self.scan_lines(&src, start, last)
            .into_iter()
            .filter(|block| block.end_line >= first)
            .collect()
    }

    /// Could this line belong to a doc comment?
    pub fn is_comment_line(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        if trimmed.starts_with(self.style.single_line_prefix.as_str()) {
            return true;
        }
        if let (Some(start), Some(end)) = (&self.style.multi_line_start, &self.style.multi_line_end)
        {
            if trimmed.starts_with(start.as_str()) || trimmed.contains(end.as_str()) {
                return true;
            }
            if let Some(marker) = self.style.continuation_marker() {
                return trimmed.starts_with(marker);
            }
        }
        false
    }

    /// First line to scan from so that a block covering `line` is seen
    fn block_start(&self, src: &SourceLines, line: usize) -> usize {
        let start = self.walk_back(src, line);
        match self.open_delimiter_above(src, start) {
            Some(open) => open.min(start),
            None => start,
        }
    }

    fn walk_back(&self, src: &SourceLines, from: usize) -> usize {
        let mut start = from;
        while start > 0 && self.is_comment_line(src.line(start - 1)) {
            start -= 1;
        }
        start
    }

    /// Nearest line at or above `from` that opens a delimited comment,
    /// stopping at an earlier closing delimiter. Interior lines without a
    /// continuation marker are only reachable this way.
    fn open_delimiter_above(&self, src: &SourceLines, from: usize) -> Option<usize> {
        let (Some(start), Some(end)) = (&self.style.multi_line_start, &self.style.multi_line_end)
        else {
            return None;
        };

        for idx in (0..=from).rev() {
            let line = src.line(idx);
            if line.trim_start().starts_with(start.as_str()) {
                return Some(idx);
            }
            if idx < from && line.contains(end.as_str()) {
                return None;
            }
        }
        None
    }

    /// Extract blocks forward from `from` until a block starts past `until`
    fn scan_lines(&self, src: &SourceLines, from: usize, until: usize) -> Vec<DocCommentBlock> {
        let mut blocks = Vec::new();
        let mut idx = from;

        while idx < src.len() && idx <= until {
            match self.extract_at(src, idx) {
                Some(block) => {
                    idx = block.end_line + 1;
                    blocks.push(block);
                }
                None => idx += 1,
            }
        }

        blocks
    }

    /// Extract the block starting exactly at line `idx`
    fn extract_at(&self, src: &SourceLines, idx: usize) -> Option<DocCommentBlock> {
        let line = src.line(idx);
        let trimmed = line.trim_start();
        let indentation = &line[..line.len() - trimmed.len()];

        if let (Some(start), Some(end)) = (&self.style.multi_line_start, &self.style.multi_line_end)
        {
            if trimmed.starts_with(start.as_str()) {
                return self.extract_delimited(src, idx, indentation, start, end);
            }
        }

        let prefix = self.style.single_line_prefix.as_str();
        if !trimmed.starts_with(prefix) {
            return None;
        }

        let mut content = Vec::new();
        let mut last = idx;
        while last < src.len() {
            let Some(rest) = src.line(last).trim_start().strip_prefix(prefix) else {
                break;
            };
            content.push(strip_one_space(rest).trim_end());
            last += 1;
        }

        Some(DocCommentBlock {
            span: src.line_start(idx)..src.line_end(last - 1),
            start_line: idx,
            end_line: last - 1,
            indentation: indentation.to_string(),
            raw_content: content.join("\n"),
            style: self.style.clone(),
            is_multi_line_form: false,
        })
    }

    fn extract_delimited(
        &self,
        src: &SourceLines,
        idx: usize,
        indentation: &str,
        start: &str,
        end: &str,
    ) -> Option<DocCommentBlock> {
        let trimmed = src.line(idx).trim_start();
        let rest = &trimmed[start.len()..];

        // Start and end on one physical line. The delimiters may share
        // characters, as in an empty `/**/`.
        let search_from = start.len() - delimiter_overlap(start, end);
        if let Some(pos) = trimmed[search_from..].find(end).map(|p| p + search_from) {
            let inner = trimmed.get(start.len()..pos).unwrap_or("");
            let inner = strip_one_space(inner).trim_end().to_string();
            let close = src.line_start(idx) + indentation.len() + pos + end.len();
            return Some(self.make_block(src, idx, idx, close, indentation, inner));
        }

        let mut content = Vec::new();
        let first = strip_one_space(rest).trim_end();
        if !first.is_empty() {
            content.push(first.to_string());
        }

        for line_idx in idx + 1..src.len() {
            let line = src.line(line_idx);
            if let Some(pos) = line.find(end) {
                let before = self.strip_continuation(&line[..pos], indentation);
                if !before.trim().is_empty() {
                    content.push(before.trim_end().to_string());
                }
                let close = src.line_start(line_idx) + pos + end.len();
                return Some(self.make_block(
                    src,
                    idx,
                    line_idx,
                    close,
                    indentation,
                    content.join("\n"),
                ));
            }
            content.push(self.strip_continuation(line, indentation).trim_end().to_string());
        }

        // Unterminated comment
        None
    }

    /// Remove a leading continuation marker (and one space after it); lines
    /// without a marker lose only the block's indentation.
    fn strip_continuation<'a>(&self, line: &'a str, indentation: &str) -> &'a str {
        let trimmed = line.trim_start();
        if let Some(marker) = self.style.continuation_marker() {
            if let Some(rest) = trimmed.strip_prefix(marker) {
                return strip_one_space(rest);
            }
        }
        line.strip_prefix(indentation).unwrap_or(trimmed)
    }

    /// A delimited block whose span ends at byte `close`
    fn make_block(
        &self,
        src: &SourceLines,
        start_line: usize,
        end_line: usize,
        close: usize,
        indentation: &str,
        raw_content: String,
    ) -> DocCommentBlock {
        DocCommentBlock {
            span: src.line_start(start_line)..close,
            start_line,
            end_line,
            indentation: indentation.to_string(),
            raw_content,
            style: self.style.clone(),
            is_multi_line_form: true,
        }
    }
}

fn strip_one_space(s: &str) -> &str {
    s.strip_prefix(' ').unwrap_or(s)
}

/// Longest proper suffix of `start` that is also a prefix of `end`
fn delimiter_overlap(start: &str, end: &str) -> usize {
    (1..end.len().min(start.len()))
        .rev()
        .find(|&n| end.is_char_boundary(n) && start.ends_with(&end[..n]))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn locator() -> DocCommentLocator {
        DocCommentLocator::new(CommentStyle::c_like()).unwrap()
    }

    const SOURCE: &str = "\
class A
{
    /// <summary>
    /// Adds two numbers.
    ///     indented
    /// </summary>
    public int Add(int a, int b) => a + b;

    /**
     * <summary>Multi</summary>
     *   keep
     */
    void M() {}
    /** <summary>Inline</summary> */
}
";

    #[test]
    fn test_find_all() {
        let blocks = locator().find_all(SOURCE);
        assert_eq!(blocks.len(), 3);

        let first = &blocks[0];
        assert_eq!(first.start_line, 2);
        assert_eq!(first.end_line, 5);
        assert_eq!(first.indentation, "    ");
        assert!(!first.is_multi_line_form);
        assert_eq!(
            first.raw_content,
            "<summary>\nAdds two numbers.\n    indented\n</summary>"
        );

        let second = &blocks[1];
        assert!(second.is_multi_line_form);
        assert_eq!((second.start_line, second.end_line), (8, 11));
        assert_eq!(second.raw_content, "<summary>Multi</summary>\n  keep");

        let third = &blocks[2];
        assert_eq!((third.start_line, third.end_line), (13, 13));
        assert_eq!(third.raw_content, "<summary>Inline</summary>");
    }

    #[test]
    fn test_span_excludes_line_break() {
        let blocks = locator().find_all(SOURCE);
        let text = blocks[0].source(SOURCE).unwrap();
        assert!(text.starts_with("    /// <summary>"));
        assert!(text.ends_with("/// </summary>"));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_crlf_source() {
        let text = "/// <summary>\r\n/// Hi\r\n/// </summary>\r\nvoid F();";
        let blocks = locator().find_all(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].raw_content, "<summary>\nHi\n</summary>");
        assert_eq!(&text[blocks[0].span.clone()], "/// <summary>\r\n/// Hi\r\n/// </summary>");
    }

    #[test]
    fn test_block_at() {
        let loc = locator();
        let offset = SOURCE.find("Adds two").unwrap();
        let block = loc.block_at(SOURCE, offset).unwrap();
        assert_eq!(block.start_line, 2);

        let offset = SOURCE.find("keep").unwrap();
        let block = loc.block_at(SOURCE, offset).unwrap();
        assert_eq!(block.start_line, 8);

        let offset = SOURCE.find("public int").unwrap();
        assert!(loc.block_at(SOURCE, offset).is_none());
        assert!(loc.block_at(SOURCE, SOURCE.len() + 10).is_none());
    }

    #[test]
    fn test_blocks_in_span_reaches_above_window() {
        let loc = locator();
        let start = SOURCE.find("</summary>").unwrap();
        let end = SOURCE.find("void M").unwrap();
        let blocks = loc.blocks_in_span(SOURCE, start..end);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].start_line, 2);
        assert_eq!(blocks[1].start_line, 8);
    }

    #[test]
    fn test_unterminated_block_is_ignored() {
        let blocks = locator().find_all("/**\n * never closed\nint x;");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_sql_and_hash_styles() {
        let sql = DocCommentLocator::new(CommentStyle::sql()).unwrap();
        let blocks = sql.find_all("-- first\n-- second\nSELECT 1;");
        assert_eq!(blocks[0].raw_content, "first\nsecond");

        let hash = DocCommentLocator::new(CommentStyle::hash()).unwrap();
        let blocks = hash.find_all("<#\n.SYNOPSIS\n  Does it\n#>\nfunction F {}");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_multi_line_form);
        assert_eq!(blocks[0].raw_content, ".SYNOPSIS\n  Does it");
    }

    #[test]
    fn test_span_stops_at_closing_delimiter() {
        let text = "    /** <summary>Id</summary> */ public int Id;\n/**\n * x\n */ int Y;\n";
        let blocks = locator().find_all(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0].source(text),
            Some("    /** <summary>Id</summary> */")
        );
        assert_eq!(blocks[1].source(text), Some("/**\n * x\n */"));
        assert_eq!(blocks[1].line_count(), 3);
    }

    #[test]
    fn test_empty_delimited_comment_is_closed() {
        let text = "/**/\nint Add(int a) { return a; } // <summary>x</summary>\n/* note */\n";
        let blocks = locator().find_all(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].start_line, blocks[0].end_line), (0, 0));
        assert_eq!(blocks[0].raw_content, "");
        assert_eq!(blocks[0].source(text), Some("/**/"));

        let hash = DocCommentLocator::new(CommentStyle::hash()).unwrap();
        let blocks = hash.find_all("<#>\nfunction F {}\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].line_count(), 1);
    }

    #[test]
    fn test_interior_lines_without_markers() {
        let hash = DocCommentLocator::new(CommentStyle::hash()).unwrap();
        let text = "<#\n.SYNOPSIS\n  Does it\n#>\nfunction F {}";

        let offset = text.find("Does").unwrap();
        let block = hash.block_at(text, offset).unwrap();
        assert_eq!((block.start_line, block.end_line), (0, 3));

        let blocks = hash.blocks_in_span(text, offset..text.len());
        assert_eq!(blocks.len(), 1);

        let code = text.find("function").unwrap();
        assert!(hash.block_at(text, code).is_none());

        let bare = "/**\n  plain text\n*/\nvoid F();";
        let block = locator().block_at(bare, bare.find("plain").unwrap()).unwrap();
        assert_eq!(block.raw_content.trim(), "plain text");
    }

    #[test]
    fn test_invalid_style() {
        assert!(DocCommentLocator::new(CommentStyle::new("")).is_err());
    }

    #[test]
    fn test_empty_text() {
        assert!(locator().find_all("").is_empty());
        assert!(locator().block_at("", 0).is_none());
    }
}
