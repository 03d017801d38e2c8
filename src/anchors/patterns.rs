//! Pattern library for anchor tags
//!
//! Holds the fixed keyword set plus caller-supplied custom tags and derives
//! the matchers the scanner uses. The matcher set is an immutable snapshot
//! behind an `Arc`; reconfiguring builds a new snapshot and swaps the pointer,
//! so a reader holding a snapshot never sees a half-built one.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::{Arc, RwLock};

/// Canonical anchor keywords, always recognized
pub const BASE_TAGS: [&str; 8] = [
    "TODO", "HACK", "NOTE", "BUG", "FIXME", "UNDONE", "REVIEW", "ANCHOR",
];

/// Comment prefixes a tag must follow: `//`, `/*` (with any extra `*`),
/// VB-style `'`, or a leading `*` continuation line.
const COMMENT_PREFIX: &str = r"(?://+|/\*+|'+|^[ \t]*\*+)";

/// Process-wide library used by the scanner when no explicit one is passed
pub static GLOBAL: Lazy<PatternLibrary> = Lazy::new(PatternLibrary::new);

/// One immutable generation of matchers
#[derive(Debug)]
pub struct PatternSet {
    /// The custom-tag configuration string this set was built from
    source: String,

    /// All recognized tags: base tags first, then custom tags (as configured)
    tags: Vec<String>,

    /// Lowercased tags for the substring fast path
    tags_lower: Vec<String>,

    /// Custom tags only, as configured
    custom: Vec<String>,

    /// A tag occurring right after a comment prefix
    pub tag_after_prefix: Regex,

    /// Anchored at a tag start: the tag plus an optional `(...)`/`[...]`
    /// metadata group and an optional trailing colon
    pub tag_with_metadata: Regex,

    /// A whole line that begins (after indentation) with a comment prefix and tag
    pub anchor_line: Regex,
}

impl PatternSet {
    fn build(custom_config: &str) -> Self {
        let custom = parse_custom_tags(custom_config);

        let mut tags: Vec<String> = BASE_TAGS.iter().map(|t| t.to_string()).collect();
        tags.extend(custom.iter().cloned());

        let tags_lower = tags.iter().map(|t| t.to_lowercase()).collect();

        // Longest first so a custom "TODOS" wins over "TODO"
        let mut ordered: Vec<&String> = tags.iter().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = ordered
            .iter()
            .map(|tag| tag_pattern(tag))
            .collect::<Vec<_>>()
            .join("|");

        // Tags are escaped, so these patterns always compile.
        let tag_after_prefix = Regex::new(&format!(
            r"(?i){COMMENT_PREFIX}[ \t]*(?P<tag>{alternation})"
        ))
        .expect("tag_after_prefix pattern");

        let tag_with_metadata = Regex::new(&format!(
            r"(?i)^(?P<tag>{alternation})(?:\((?P<paren>[^)\r\n]*)\)|\[(?P<bracket>[^\]\r\n]*)\])?[ \t]*:?"
        ))
        .expect("tag_with_metadata pattern");

        let anchor_line = Regex::new(&format!(
            r"(?i)^[ \t]*(?://+|/\*+|'+|\*+)[ \t]*(?P<tag>{alternation})"
        ))
        .expect("anchor_line pattern");

        Self {
            source: custom_config.to_string(),
            tags,
            tags_lower,
            custom,
            tag_after_prefix,
            tag_with_metadata,
            anchor_line,
        }
    }

    /// All recognized tags, base tags first
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The configured custom tags
    pub fn custom_tags(&self) -> &[String] {
        &self.custom
    }

    /// Case-insensitive raw substring check for any known tag
    pub fn contains_any_tag(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.tags_lower.iter().any(|t| lower.contains(t.as_str()))
    }

    /// Resolve a matched tag to its configured spelling, if it is a custom tag
    pub fn custom_tag(&self, matched: &str) -> Option<&str> {
        self.custom
            .iter()
            .find(|t| t.to_lowercase() == matched.to_lowercase())
            .map(String::as_str)
    }
}

/// Escape a tag for embedding; word boundaries only where the tag edge is a
/// word character, so tags like `PERF!` still match.
fn tag_pattern(tag: &str) -> String {
    let mut pattern = regex::escape(tag);
    if tag.chars().last().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split a comma-separated custom-tag string: trimmed, empties dropped,
/// de-duplicated case-insensitively, base tags excluded.
pub fn parse_custom_tags(config: &str) -> Vec<String> {
    let mut seen: Vec<String> = BASE_TAGS.iter().map(|t| t.to_lowercase()).collect();
    let mut tags = Vec::new();

    for token in config.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let lower = token.to_lowercase();
        if seen.contains(&lower) {
            continue;
        }
        seen.push(lower);
        tags.push(token.to_string());
    }

    tags
}

/// Rebuildable holder of the current [`PatternSet`]
#[derive(Debug)]
pub struct PatternLibrary {
    current: RwLock<Arc<PatternSet>>,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternLibrary {
    /// Library with only the base tags
    pub fn new() -> Self {
        Self::with_custom_tags("")
    }

    pub fn with_custom_tags(custom_config: &str) -> Self {
        Self {
            current: RwLock::new(Arc::new(PatternSet::build(custom_config))),
        }
    }

    /// Take the current snapshot. Callers should take it once per operation.
    pub fn snapshot(&self) -> Arc<PatternSet> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Apply a custom-tag configuration string. Returns true if a new
    /// snapshot was published; an unchanged string is a no-op.
    pub fn configure(&self, custom_config: &str) -> bool {
        if self.snapshot().source == custom_config {
            return false;
        }

        // Build outside the lock; only the pointer swap is guarded.
        let next = Arc::new(PatternSet::build(custom_config));
        log::debug!(
            "rebuilt anchor patterns with {} custom tag(s)",
            next.custom.len()
        );

        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.source == custom_config {
            return false;
        }
        *guard = next;
        true
    }
}
