//! LINK reference parsing
//!
//! Grammar:
//! `LINK[:] <path>[:N[-M]][#anchor]` or `link: <path>...`, or a local
//! `LINK: #anchor` with no path. Uppercase `LINK` is unambiguous on its own;
//! lowercase must carry the colon so ordinary prose never matches.
//!
//! Paths may contain spaces, so a path runs (lazily) until the next LINK
//! keyword, the end of the line, or the end of the text.
//!
//! All offsets are byte offsets into the parsed text.

use fancy_regex::Regex;
use once_cell::sync::Lazy;
use serde::Serialize;

/// Full LINK pattern. The lookahead terminator needs fancy-regex.
pub static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<prefix>\bLINK\b:?[ \t]*|\blink:[ \t]*)",
        r"(?:",
        r"#(?P<local>[A-Za-z0-9_-]+)",
        r"|",
        r"(?P<path>[^#\r\n:\s](?:[^#\r\n:]|:(?!\d))*?)",
        r"(?::(?P<line>\d+)(?:-(?P<end>\d+))?)?",
        r"(?:#(?P<anchor>[A-Za-z0-9_-]+))?",
        r"(?=[ \t]*(?:\bLINK\b|\blink:|\r?\n|$))",
        r")",
    ))
    .expect("Invalid LINK_RE regex")
});

/// A parsed LINK reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    /// Target path; absent only for local anchors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_name: Option<String>,

    /// Span of the whole match, including the LINK prefix
    pub start_index: usize,
    pub length: usize,

    /// Span of the clickable part (everything after the prefix)
    pub target_start_index: usize,
    pub target_length: usize,
}

impl LinkRecord {
    /// `LINK: #name` with no file
    pub fn is_local_anchor(&self) -> bool {
        self.file_path.is_none() && self.anchor_name.is_some()
    }

    pub fn has_line_number(&self) -> bool {
        self.line.is_some()
    }

    pub fn has_line_range(&self) -> bool {
        self.line.is_some() && self.end_line.is_some()
    }

    pub fn has_anchor(&self) -> bool {
        self.anchor_name.is_some()
    }

    /// Does the clickable part contain this offset?
    pub fn target_contains(&self, offset: usize) -> bool {
        offset >= self.target_start_index && offset < self.target_start_index + self.target_length
    }
}

/// Find all LINK references in text, in order of appearance
pub fn parse_links(text: &str) -> Vec<LinkRecord> {
    let mut links = Vec::new();

    if !text.contains("LINK") && !text.contains("link:") {
        return links;
    }

    for caps in LINK_RE.captures_iter(text) {
        let caps = match caps {
            Ok(c) => c,
            Err(e) => {
                log::debug!("LINK scan stopped: {}", e);
                break;
            }
        };

        let (Some(whole), Some(prefix)) = (caps.get(0), caps.name("prefix")) else {
            continue;
        };

        let start_index = whole.start();
        let length = whole.end() - whole.start();
        let prefix_len = prefix.end() - prefix.start();

        let record = if let Some(local) = caps.name("local") {
            LinkRecord {
                file_path: None,
                line: None,
                end_line: None,
                anchor_name: Some(local.as_str().to_string()),
                start_index,
                length,
                target_start_index: start_index + prefix_len,
                target_length: length - prefix_len,
            }
        } else {
            let path = caps.name("path").map(|m| m.as_str().trim()).unwrap_or("");
            if path.is_empty() {
                continue;
            }
            let line = caps.name("line").and_then(|m| m.as_str().parse().ok());
            let end_line = line.and(caps.name("end").and_then(|m| m.as_str().parse().ok()));

            LinkRecord {
                file_path: Some(path.to_string()),
                line,
                end_line,
                anchor_name: caps.name("anchor").map(|m| m.as_str().to_string()),
                start_index,
                length,
                target_start_index: start_index + prefix_len,
                target_length: length - prefix_len,
            }
        };

        links.push(record);
    }

    links
}

/// Find the link whose clickable target covers `offset`
///
/// The `LINK:` keyword itself is not actionable.
pub fn link_at(text: &str, offset: usize) -> Option<LinkRecord> {
    parse_links(text)
        .into_iter()
        .find(|link| link.target_contains(offset))
}
