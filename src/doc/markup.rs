//! Doc-comment fragment parser
//!
//! Parses the XML-ish content of a doc comment into a small element/text
//! tree. The content is wrapped in a synthetic root so loose text and
//! several top-level elements parse uniformly. Anything structurally wrong
//! (stray `<`, mismatched or unclosed tags) is an error; callers fall back
//! to plain text.

use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?s)<!--.*?-->").expect("Invalid COMMENT_RE regex"));

static CDATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?s)<!\[CDATA\[(.*?)\]\]>").expect("Invalid CDATA_RE regex"));

static CLOSE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^</\s*([A-Za-z_][\w:.\-]*)\s*>").expect("Invalid CLOSE_TAG_RE regex")
});

static OPEN_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<([A-Za-z_][\w:.\-]*)((?:\s+[^\s=/>"']+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>"']+))?)*)\s*(/?)>"#,
    )
    .expect("Invalid OPEN_TAG_RE regex")
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+)))?"#)
        .expect("Invalid ATTR_RE regex")
});

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z]+);").expect("Invalid ENTITY_RE regex")
});

/// Any tag-looking run, for tag-stripping fallbacks
pub static ANY_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^<>]*>").expect("Invalid ANY_TAG_RE regex"));

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum MarkupError {
    #[error("malformed tag at byte {0}")]
    MalformedTag(usize),

    #[error("expected </{expected}> but found </{found}> at byte {offset}")]
    Mismatched {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("closing tag </{0}> at byte {1} has no opening tag")]
    StrayClose(String, usize),

    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// A node of the fragment tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(name: &str, attrs: Vec<(String, String)>) -> Self {
        Self {
            name: name.to_string(),
            attrs,
            children: Vec::new(),
        }
    }

    /// Lowercased tag name, for dispatch
    pub fn tag(&self) -> String {
        self.name.to_lowercase()
    }

    /// Attribute value by case-insensitive name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element with this (case-insensitive) name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Concatenated text of all descendants, tags removed
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// Parse a fragment under a synthetic root element
pub(crate) fn parse_fragment(content: &str) -> Result<Element, MarkupError> {
    let mut stack: Vec<Element> = vec![Element::new("#root", Vec::new())];
    let mut pos = 0;

    while pos < content.len() {
        let rest = &content[pos..];
        let Some(lt) = rest.find('<') else {
            push_text(&mut stack, rest);
            break;
        };
        if lt > 0 {
            push_text(&mut stack, &rest[..lt]);
        }
        pos += lt;
        let rest = &content[pos..];

        if let Some(m) = COMMENT_RE.find(rest) {
            pos += m.end();
        } else if let Some(caps) = CDATA_RE.captures(rest) {
            if let Some(body) = caps.get(1) {
                append(&mut stack, Node::Text(body.as_str().to_string()));
            }
            pos += caps.get(0).map_or(rest.len(), |m| m.end());
        } else if let Some(caps) = CLOSE_TAG_RE.captures(rest) {
            let found = caps.get(1).map_or("", |m| m.as_str());
            if stack.len() == 1 {
                return Err(MarkupError::StrayClose(found.to_string(), pos));
            }
            let Some(element) = stack.pop() else {
                return Err(MarkupError::StrayClose(found.to_string(), pos));
            };
            if element.name != found {
                return Err(MarkupError::Mismatched {
                    expected: element.name,
                    found: found.to_string(),
                    offset: pos,
                });
            }
            append(&mut stack, Node::Element(element));
            pos += caps.get(0).map_or(rest.len(), |m| m.end());
        } else if let Some(caps) = OPEN_TAG_RE.captures(rest) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let attrs = caps.get(2).map(|m| parse_attrs(m.as_str())).unwrap_or_default();
            let element = Element::new(name, attrs);
            if caps.get(3).is_some_and(|m| m.as_str() == "/") {
                append(&mut stack, Node::Element(element));
            } else {
                stack.push(element);
            }
            pos += caps.get(0).map_or(rest.len(), |m| m.end());
        } else {
            return Err(MarkupError::MalformedTag(pos));
        }
    }

    if stack.len() > 1 {
        let name = stack.last().map(|e| e.name.clone()).unwrap_or_default();
        return Err(MarkupError::Unclosed(name));
    }

    Ok(stack.pop().unwrap_or_default())
}

fn push_text(stack: &mut [Element], raw: &str) {
    if raw.is_empty() {
        return;
    }
    append(stack, Node::Text(decode_entities(raw)));
}

fn append(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        // Keep adjacent text in one node (CDATA next to text, etc.)
        if let (Node::Text(new), Some(Node::Text(prev))) = (&node, parent.children.last_mut()) {
            prev.push_str(new);
            return;
        }
        parent.children.push(node);
    }
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            Some((key, value))
        })
        .collect()
}

/// Decode the predefined XML entities and numeric character references;
/// unknown entities are left as written
pub(crate) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    ENTITY_RE
        .replace_all(raw, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = match body {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => body.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
