//! Inline markdown inside doc-comment text
//!
//! Spans are recognized in a fixed precedence order. Each pass only sees
//! the gaps left by the passes before it, so the content of a code span is
//! never re-read as emphasis and a link label is never re-read as bold.

use fancy_regex::{Captures, Regex};
use once_cell::sync::Lazy;

use crate::doc::render::{Segment, SegmentKind};
use crate::doc::repo::RepositoryInfo;

static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("Invalid CODE_RE regex"));

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\[\]]+)\]\(([^()\s]+)\)").expect("Invalid LINK_RE regex")
});

static AUTOLINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<((?:https?|ftp|mailto):[^<>\s]+)>").expect("Invalid AUTOLINK_RE regex")
});

static BOLD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*(?=\S)(.+?)(?<=\S)\*\*|(?<!\w)__(?=\S)(.+?)(?<=\S)__(?!\w)")
        .expect("Invalid BOLD_RE regex")
});

/// Single `*`/`_` emphasis; `_` must sit on word boundaries so snake_case
/// identifiers are left alone
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?<![\w*])\*(?=\S)([^*]+?)(?<=\S)\*(?![\w*])|(?<!\w)_(?=\S)([^_]+?)(?<=\S)_(?!\w)")
        .expect("Invalid ITALIC_RE regex")
});

static STRIKE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"~~(?=\S)(.+?)(?<=\S)~~").expect("Invalid STRIKE_RE regex")
});

static ISSUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?<![\w&#/])#(\d+)\b").expect("Invalid ISSUE_RE regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Code,
    Link,
    Autolink,
    Bold,
    Italic,
    Strike,
    Issue,
}

const PASSES: [Pass; 7] = [
    Pass::Code,
    Pass::Link,
    Pass::Autolink,
    Pass::Bold,
    Pass::Italic,
    Pass::Strike,
    Pass::Issue,
];

impl Pass {
    fn regex(self) -> &'static Regex {
        match self {
            Pass::Code => &CODE_RE,
            Pass::Link => &LINK_RE,
            Pass::Autolink => &AUTOLINK_RE,
            Pass::Bold => &BOLD_RE,
            Pass::Italic => &ITALIC_RE,
            Pass::Strike => &STRIKE_RE,
            Pass::Issue => &ISSUE_RE,
        }
    }

    /// Build the segment for one match; `None` leaves the match as text
    fn segment(self, caps: &Captures, repo: Option<&RepositoryInfo>) -> Option<Segment> {
        let group = |i: usize| caps.get(i).map(|m| m.as_str());
        let either = || group(1).or_else(|| group(2)).unwrap_or_default().to_string();

        match self {
            Pass::Code => Some(Segment::new(either(), SegmentKind::Code)),
            Pass::Link => Some(Segment::link(group(1)?, group(2)?)),
            Pass::Autolink => {
                let url = group(1)?;
                Some(Segment::link(url, url))
            }
            Pass::Bold => Some(Segment::new(either(), SegmentKind::Bold)),
            Pass::Italic => Some(Segment::new(either(), SegmentKind::Italic)),
            Pass::Strike => Some(Segment::new(either(), SegmentKind::Strikethrough)),
            Pass::Issue => {
                let number: u64 = group(1)?.parse().ok()?;
                let url = repo?.issue_url(number)?;
                Some(Segment {
                    text: format!("#{number}"),
                    kind: SegmentKind::IssueRef,
                    link_target: Some(url),
                })
            }
        }
    }
}

/// Split text into styled segments
///
/// Issue references are only recognized when a repository is supplied.
/// Empty input gives no segments.
pub fn parse_markdown(text: &str, repo: Option<&RepositoryInfo>) -> Vec<Segment> {
    let mut out = Vec::new();
    if text.is_empty() {
        return out;
    }
    apply(text, 0, repo, &mut out);
    merge_text(out)
}

fn apply(text: &str, pass_index: usize, repo: Option<&RepositoryInfo>, out: &mut Vec<Segment>) {
    if text.is_empty() {
        return;
    }
    let Some(&pass) = PASSES.get(pass_index) else {
        out.push(Segment::text(text));
        return;
    };
    if pass == Pass::Issue && repo.is_none() {
        out.push(Segment::text(text));
        return;
    }

    let mut last = 0;
    for caps in pass.regex().captures_iter(text) {
        let caps = match caps {
            Ok(c) => c,
            Err(e) => {
                log::debug!("markdown pass {:?} stopped: {}", pass, e);
                break;
            }
        };
        let Some(whole) = caps.get(0) else { continue };
        let Some(segment) = pass.segment(&caps, repo) else {
            continue;
        };
        apply(&text[last..whole.start()], pass_index + 1, repo, out);
        out.push(segment);
        last = whole.end();
    }
    apply(&text[last..], pass_index + 1, repo, out);
}

fn merge_text(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let Some(prev) = merged.last_mut() {
            if prev.kind == SegmentKind::Text && segment.kind == SegmentKind::Text {
                prev.text.push_str(&segment.text);
                continue;
            }
        }
        merged.push(segment);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::repo::RepositoryKind;

    fn kinds(segments: &[Segment]) -> Vec<(SegmentKind, &str)> {
        segments.iter().map(|s| (s.kind, s.text.as_str())).collect()
    }

    #[test]
    fn test_code_beats_bold() {
        let segments = parse_markdown("Use `**not bold**` for emphasis", None);
        assert_eq!(
            kinds(&segments),
            vec![
                (SegmentKind::Text, "Use "),
                (SegmentKind::Code, "**not bold**"),
                (SegmentKind::Text, " for emphasis"),
            ]
        );
    }

    #[test]
    fn test_links() {
        let segments = parse_markdown("See [docs](https://x.io/d) or <https://y.io>.", None);
        assert_eq!(segments[1].kind, SegmentKind::Link);
        assert_eq!(segments[1].text, "docs");
        assert_eq!(segments[1].link_target.as_deref(), Some("https://x.io/d"));
        assert_eq!(segments[3].text, "https://y.io");
        assert_eq!(segments[3].link_target.as_deref(), Some("https://y.io"));
    }

    #[test]
    fn test_emphasis() {
        let segments = parse_markdown("**a** __b__ *c* _d_ ~~e~~", None);
        let styled: Vec<_> = kinds(&segments)
            .into_iter()
            .filter(|(k, _)| *k != SegmentKind::Text)
            .collect();
        assert_eq!(
            styled,
            vec![
                (SegmentKind::Bold, "a"),
                (SegmentKind::Bold, "b"),
                (SegmentKind::Italic, "c"),
                (SegmentKind::Italic, "d"),
                (SegmentKind::Strikethrough, "e"),
            ]
        );
    }

    #[test]
    fn test_snake_case_is_not_italic() {
        let segments = parse_markdown("call my_long_name here", None);
        assert_eq!(kinds(&segments), vec![(SegmentKind::Text, "call my_long_name here")]);
    }

    #[test]
    fn test_issue_refs_need_repository() {
        assert_eq!(parse_markdown("Fixes #12", None).len(), 1);

        let repo = RepositoryInfo::new(RepositoryKind::GitHub, "o", "r");
        let segments = parse_markdown("Fixes #12, not `#13`", Some(&repo));
        assert_eq!(segments[1].kind, SegmentKind::IssueRef);
        assert_eq!(segments[1].text, "#12");
        assert_eq!(
            segments[1].link_target.as_deref(),
            Some("https://github.com/o/r/issues/12")
        );
        assert_eq!(segments[3].kind, SegmentKind::Code);
    }

    #[test]
    fn test_unknown_repository_kind_keeps_text() {
        let repo = RepositoryInfo::new(RepositoryKind::Unknown, "o", "r");
        let segments = parse_markdown("Fixes #12", Some(&repo));
        assert_eq!(kinds(&segments), vec![(SegmentKind::Text, "Fixes #12")]);
    }

    #[test]
    fn test_empty() {
        assert!(parse_markdown("", None).is_empty());
    }
}
