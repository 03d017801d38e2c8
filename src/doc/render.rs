//! Doc-comment rendering
//!
//! Turns block content into a [`RenderedDocument`]: ordered sections, each
//! a list of lines of styled segments. The renderer never fails. Content
//! that does not parse becomes one plain summary line.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::doc::block::DocCommentBlock;
use crate::doc::markdown::parse_markdown;
use crate::doc::markup::{self, Element, Node, ANY_TAG_RE};
use crate::doc::reflow::CODE_INDENT;
use crate::doc::repo::RepositoryInfo;

/// Shown when a member has no usable summary
pub const NO_DOCUMENTATION: &str = "No documentation provided.";

const INHERITED_PREFIX: &str = "Documentation inherited from ";
const INHERITED_FROM_BASE: &str = "Documentation inherited from the base member.";

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid WS_RE regex"));

/// Two-letter kind prefix of a cross-reference, e.g. `M:` or `T:`
static CREF_KIND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]:").expect("Invalid CREF_KIND_RE regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Summary,
    Remarks,
    Returns,
    Value,
    Example,
    Param,
    TypeParam,
    Exception,
    SeeAlso,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Text,
    Bold,
    Italic,
    Strikethrough,
    Code,
    Link,
    ParamRef,
    TypeParamRef,
    Heading,
    IssueRef,
}

/// One styled run of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub kind: SegmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
}

impl Segment {
    pub fn new(text: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            text: text.into(),
            kind,
            link_target: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, SegmentKind::Text)
    }

    pub fn link(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SegmentKind::Link,
            link_target: Some(target.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Line {
    pub segments: Vec<Segment>,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }

    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    /// Display heading; the summary has none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    /// Parameter / type parameter / exception name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lines: Vec<Line>,
    /// Index into `lines` of the first list line, if the section has a list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_start_index: Option<usize>,
}

impl Section {
    fn new(kind: SectionKind, heading: Option<String>, name: Option<String>) -> Self {
        Self {
            kind,
            heading,
            name,
            lines: Vec::new(),
            list_start_index: None,
        }
    }

    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(Line::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_blank(&self) -> bool {
        self.lines.iter().all(Line::is_blank)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct RenderedDocument {
    pub sections: Vec<Section>,
}

impl RenderedDocument {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Flatten into display lines with headings as `Heading` segments and a
    /// blank line between sections
    pub fn display_lines(&self) -> Vec<Line> {
        let mut out = Vec::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push(Line::default());
            }
            if let Some(heading) = &section.heading {
                out.push(Line {
                    segments: vec![Segment::new(heading.clone(), SegmentKind::Heading)],
                });
            }
            out.extend(section.lines.iter().cloned());
        }
        out
    }
}

impl fmt::Display for RenderedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.display_lines() {
            writeln!(f, "{}", line.plain_text())?;
        }
        Ok(())
    }
}

/// Render a located block
pub fn render_block(block: &DocCommentBlock, repo: Option<&RepositoryInfo>) -> RenderedDocument {
    render_content(&block.raw_content, repo)
}

/// Render raw doc-comment content
pub fn render_content(content: &str, repo: Option<&RepositoryInfo>) -> RenderedDocument {
    if content.trim().is_empty() {
        return RenderedDocument::default();
    }

    let root = match markup::parse_fragment(content) {
        Ok(root) => root,
        Err(e) => {
            log::debug!("doc comment does not parse, rendering as text: {}", e);
            let mut summary = Section::new(SectionKind::Summary, None, None);
            summary.lines.push(Line {
                segments: vec![Segment::text(content.trim())],
            });
            return RenderedDocument {
                sections: vec![summary],
            };
        }
    };

    DocumentBuilder::new(repo).build(&root)
}

/// Plain-text summary for collapsed previews
pub fn stripped_summary(content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }

    let root = match markup::parse_fragment(content) {
        Ok(root) => root,
        Err(e) => {
            log::debug!("doc comment does not parse, stripping tags: {}", e);
            let stripped = ANY_TAG_RE.replace_all(content, "");
            return collapse(&markup::decode_entities(&stripped));
        }
    };

    if let Some(inherit) = root.child("inheritdoc") {
        return match inherit.attr("cref") {
            Some(cref) => format!("{INHERITED_PREFIX}{}.", cref_name(cref)),
            None => INHERITED_FROM_BASE.to_string(),
        };
    }

    let mut out = String::new();
    match root.child("summary") {
        Some(summary) => summary_text(&summary.children, &mut out),
        None => summary_text(&root.children, &mut out),
    }
    collapse(&out)
}

fn summary_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => match e.tag().as_str() {
                "paramref" | "typeparamref" => out.push_str(e.attr("name").unwrap_or_default()),
                "see" | "seealso" => {
                    let text = collapse(&e.text());
                    if !text.is_empty() {
                        out.push_str(&text);
                    } else if let Some(target) = link_target(e) {
                        out.push_str(&target.display);
                    }
                }
                _ => summary_text(&e.children, out),
            },
        }
    }
}

fn collapse(text: &str) -> String {
    WS_RE.replace_all(text.trim(), " ").into_owned()
}

/// Trailing member or type name of a cross-reference:
/// `M:Ns.Type.Method(System.Int32)` gives `Method`
pub fn cref_name(cref: &str) -> String {
    let cref = CREF_KIND_RE.replace(cref.trim(), "");
    let without_params = cref.split('(').next().unwrap_or_default();
    without_params
        .rsplit(['.', '#'])
        .next()
        .unwrap_or(without_params)
        .to_string()
}

struct LinkTarget {
    target: String,
    display: String,
}

/// Target precedence: cref, then href, then langword
fn link_target(element: &Element) -> Option<LinkTarget> {
    if let Some(cref) = element.attr("cref") {
        return Some(LinkTarget {
            target: cref.to_string(),
            display: cref_name(cref),
        });
    }
    if let Some(href) = element.attr("href") {
        return Some(LinkTarget {
            target: href.to_string(),
            display: href.to_string(),
        });
    }
    element.attr("langword").map(|word| LinkTarget {
        target: word.to_string(),
        display: word.to_string(),
    })
}

/// Accumulates lines for one section
#[derive(Default)]
struct LineWriter {
    lines: Vec<Line>,
    current: Vec<Segment>,
    list_start: Option<usize>,
}

impl LineWriter {
    fn push(&mut self, segment: Segment) {
        if segment.text.is_empty() && segment.kind != SegmentKind::Code {
            return;
        }
        self.current.push(segment);
    }

    /// Push cleaned text through the markdown pass, gluing to neighbours
    /// without doubled spaces
    fn push_text(&mut self, raw: &str, repo: Option<&RepositoryInfo>) {
        let Some(mut text) = clean_text(raw) else {
            return;
        };
        let at_line_start = self.current.is_empty();
        let after_space = self
            .current
            .last()
            .is_some_and(|s| s.text.ends_with(' '));
        if at_line_start || after_space {
            text = text.trim_start().to_string();
        }
        if text.is_empty() {
            return;
        }
        for segment in parse_markdown(&text, repo) {
            self.push(segment);
        }
    }

    fn break_line(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let mut segments = std::mem::take(&mut self.current);
        if let Some(last) = segments.last_mut() {
            if last.kind == SegmentKind::Text {
                let trimmed = last.text.trim_end().len();
                last.text.truncate(trimmed);
            }
        }
        segments.retain(|s| !s.text.is_empty() || s.kind == SegmentKind::Code);
        if !segments.is_empty() {
            self.lines.push(Line { segments });
        }
    }

    /// End the current line and make sure a blank line follows
    fn blank_line(&mut self) {
        self.break_line();
        if self.lines.last().is_some_and(|l| !l.segments.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn push_line(&mut self, segments: Vec<Segment>) {
        self.break_line();
        self.lines.push(Line { segments });
    }

    fn mark_list_start(&mut self) {
        if self.list_start.is_none() {
            self.list_start = Some(self.lines.len());
        }
    }

    /// Finished lines with surrounding blank lines removed
    fn finish(mut self) -> (Vec<Line>, Option<usize>) {
        self.break_line();
        let mut lines = self.lines;
        let mut list_start = self.list_start;

        while lines.last().is_some_and(|l| l.segments.is_empty()) {
            lines.pop();
        }
        let leading = lines.iter().take_while(|l| l.segments.is_empty()).count();
        if leading > 0 {
            lines.drain(..leading);
            list_start = list_start.map(|i| i.saturating_sub(leading));
        }
        (lines, list_start)
    }
}

/// Collapse whitespace runs, keeping one leading/trailing space if the
/// original had any
fn clean_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let core = collapse(raw);
    let leading = raw.starts_with(char::is_whitespace);
    let trailing = raw.ends_with(char::is_whitespace);
    if core.is_empty() {
        return leading.then(|| " ".to_string());
    }
    let mut out = String::with_capacity(core.len() + 2);
    if leading {
        out.push(' ');
    }
    out.push_str(&core);
    if trailing {
        out.push(' ');
    }
    Some(out)
}

/// A section being built, keyed by kind and name
struct PendingSection {
    section: Section,
    writer: LineWriter,
}

struct DocumentBuilder<'a> {
    repo: Option<&'a RepositoryInfo>,
    sections: Vec<PendingSection>,
    inherit: Option<Option<String>>,
}

impl<'a> DocumentBuilder<'a> {
    fn new(repo: Option<&'a RepositoryInfo>) -> Self {
        Self {
            repo,
            sections: Vec::new(),
            inherit: None,
        }
    }

    fn build(mut self, root: &Element) -> RenderedDocument {
        for node in &root.children {
            match node {
                Node::Text(text) => {
                    if !text.trim().is_empty() {
                        let repo = self.repo;
                        let writer = self.section(SectionKind::Summary, None, None);
                        writer.push_text(text, repo);
                    }
                }
                Node::Element(element) => self.top_level(element),
            }
        }
        self.finish()
    }

    /// Writer for the section with this kind and name, created on first use
    fn section(
        &mut self,
        kind: SectionKind,
        heading: Option<String>,
        name: Option<String>,
    ) -> &mut LineWriter {
        let index = match self
            .sections
            .iter()
            .position(|p| p.section.kind == kind && p.section.name == name)
        {
            Some(index) => index,
            None => {
                self.sections.push(PendingSection {
                    section: Section::new(kind, heading, name),
                    writer: LineWriter::default(),
                });
                self.sections.len() - 1
            }
        };
        &mut self.sections[index].writer
    }

    fn top_level(&mut self, element: &Element) {
        let repo = self.repo;
        let (kind, heading, name) = match element.tag().as_str() {
            "summary" => (SectionKind::Summary, None, None),
            "remarks" => (SectionKind::Remarks, Some("Remarks".to_string()), None),
            "returns" => (SectionKind::Returns, Some("Returns".to_string()), None),
            "value" => (SectionKind::Value, Some("Value".to_string()), None),
            "example" => (SectionKind::Example, Some("Example".to_string()), None),
            "param" => {
                let name = element.attr("name").unwrap_or_default().to_string();
                (
                    SectionKind::Param,
                    Some(format!("Parameter: {name}")),
                    Some(name),
                )
            }
            "typeparam" => {
                let name = element.attr("name").unwrap_or_default().to_string();
                (
                    SectionKind::TypeParam,
                    Some(format!("Type parameter: {name}")),
                    Some(name),
                )
            }
            "exception" => {
                let name = element.attr("cref").map(cref_name).unwrap_or_default();
                (
                    SectionKind::Exception,
                    Some(format!("Exception: {name}")),
                    Some(name),
                )
            }
            "seealso" => {
                let link = inline_link(element);
                let writer = self.section(SectionKind::SeeAlso, Some("See also".to_string()), None);
                writer.mark_list_start();
                let mut segments = vec![Segment::text("• ")];
                segments.extend(link);
                writer.push_line(segments);
                return;
            }
            "inheritdoc" => {
                self.inherit = Some(element.attr("cref").map(cref_name));
                return;
            }
            _ => {
                // Unknown top-level tags read as summary text
                let writer = self.section(SectionKind::Summary, None, None);
                render_inline(element, writer, repo);
                return;
            }
        };

        let writer = self.section(kind, heading, name);
        if writer.lines.is_empty() && writer.current.is_empty() {
            render_children(element, writer, repo);
        } else {
            // Repeated element of the same kind: start a new paragraph
            writer.blank_line();
            render_children(element, writer, repo);
        }
    }

    fn finish(self) -> RenderedDocument {
        let inherit = self.inherit;
        let mut sections: Vec<Section> = self
            .sections
            .into_iter()
            .map(|pending| {
                let (lines, list_start_index) = pending.writer.finish();
                Section {
                    lines,
                    list_start_index,
                    ..pending.section
                }
            })
            .collect();

        let summary_index = sections.iter().position(|s| s.kind == SectionKind::Summary);
        let has_summary = summary_index.is_some_and(|i| !sections[i].is_blank());

        // An inheritance marker takes the summary's place
        if inherit.is_some() || !has_summary {
            let line = match &inherit {
                Some(Some(name)) => Line {
                    segments: vec![
                        Segment::new(INHERITED_PREFIX, SegmentKind::Italic),
                        Segment::new(name.clone(), SegmentKind::Code),
                        Segment::new(".", SegmentKind::Italic),
                    ],
                },
                Some(None) => Line {
                    segments: vec![Segment::new(INHERITED_FROM_BASE, SegmentKind::Italic)],
                },
                None => Line {
                    segments: vec![Segment::new(NO_DOCUMENTATION, SegmentKind::Italic)],
                },
            };
            if let Some(i) = summary_index {
                sections.remove(i);
            }
            let mut summary = Section::new(SectionKind::Summary, None, None);
            summary.lines.push(line);
            sections.insert(0, summary);
        } else if let Some(i) = summary_index {
            let summary = sections.remove(i);
            sections.insert(0, summary);
        }

        RenderedDocument { sections }
    }
}

fn render_children(element: &Element, writer: &mut LineWriter, repo: Option<&RepositoryInfo>) {
    for node in &element.children {
        match node {
            Node::Text(text) => writer.push_text(text, repo),
            Node::Element(child) => render_inline(child, writer, repo),
        }
    }
}

fn inline_link(element: &Element) -> Option<Segment> {
    let text = collapse(&element.text());
    let target = link_target(element);
    match target {
        Some(LinkTarget { target, display }) => {
            let shown = if text.is_empty() { display } else { text };
            Some(Segment::link(shown, target))
        }
        None if !text.is_empty() => Some(Segment::text(text)),
        None => None,
    }
}

fn render_inline(element: &Element, writer: &mut LineWriter, repo: Option<&RepositoryInfo>) {
    match element.tag().as_str() {
        "see" | "seealso" | "a" => {
            if let Some(segment) = inline_link(element) {
                writer.push(segment);
            }
        }
        "paramref" => {
            writer.push(Segment::new(
                element.attr("name").unwrap_or_default(),
                SegmentKind::ParamRef,
            ));
        }
        "typeparamref" => {
            writer.push(Segment::new(
                element.attr("name").unwrap_or_default(),
                SegmentKind::TypeParamRef,
            ));
        }
        "c" => writer.push(Segment::new(collapse(&element.text()), SegmentKind::Code)),
        "b" | "strong" => writer.push(Segment::new(collapse(&element.text()), SegmentKind::Bold)),
        "i" | "em" => writer.push(Segment::new(collapse(&element.text()), SegmentKind::Italic)),
        "code" => {
            writer.blank_line();
            for line in code_lines(&element.text()) {
                let text = if line.is_empty() {
                    String::new()
                } else {
                    format!("{CODE_INDENT}{line}")
                };
                writer.push_line(vec![Segment::new(text, SegmentKind::Code)]);
            }
            writer.blank_line();
        }
        "para" => {
            writer.blank_line();
            render_children(element, writer, repo);
            writer.blank_line();
        }
        "br" => writer.break_line(),
        "list" => render_list(element, writer, repo),
        _ => render_children(element, writer, repo),
    }
}

fn render_list(element: &Element, writer: &mut LineWriter, repo: Option<&RepositoryInfo>) {
    let numbered = element
        .attr("type")
        .is_some_and(|t| t.eq_ignore_ascii_case("number"));

    writer.break_line();
    for (i, item) in element
        .elements()
        .filter(|e| e.name.eq_ignore_ascii_case("item"))
        .enumerate()
    {
        writer.break_line();
        writer.mark_list_start();
        let marker = if numbered {
            format!("{}. ", i + 1)
        } else {
            "• ".to_string()
        };
        writer.push(Segment::text(marker));

        match item.child("term") {
            Some(term) => {
                writer.push(Segment::new(collapse(&term.text()), SegmentKind::Bold));
                if let Some(description) = item.child("description") {
                    writer.push(Segment::text(" – "));
                    writer.push_text(&collapse(&description.text()), repo);
                }
            }
            None => {
                let text = match item.child("description") {
                    Some(description) => description.text(),
                    None => item.text(),
                };
                writer.push_text(&collapse(&text), repo);
            }
        }
    }
    writer.break_line();
}

/// Code body lines: outer blank lines dropped, common indentation removed
fn code_lines(body: &str) -> Vec<String> {
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
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
