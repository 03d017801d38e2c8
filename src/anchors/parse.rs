//! Anchor scanning module
//!
//! Finds annotation tags in comments:
//! // TODO: message
//! // FIXME(@owner #123): message
//! /* ANCHOR(section-id) */
//!
//! A tag only counts when it directly follows a comment prefix, so prose
//! such as "a bug in the parser" is never reported.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::anchors::patterns::{PatternSet, GLOBAL};

/// The kind of an anchor tag, in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnchorKind {
    Todo,
    Hack,
    Note,
    Bug,
    Fixme,
    Undone,
    Review,
    Anchor,
    /// A caller-configured tag, spelled as configured
    Custom(String),
}

impl AnchorKind {
    /// Map a matched tag (any case) to its kind
    pub fn from_tag(tag: &str, patterns: &PatternSet) -> Self {
        match tag.to_uppercase().as_str() {
            "TODO" => AnchorKind::Todo,
            "HACK" => AnchorKind::Hack,
            "NOTE" => AnchorKind::Note,
            "BUG" => AnchorKind::Bug,
            "FIXME" => AnchorKind::Fixme,
            "UNDONE" => AnchorKind::Undone,
            "REVIEW" => AnchorKind::Review,
            "ANCHOR" => AnchorKind::Anchor,
            _ => AnchorKind::Custom(
                patterns
                    .custom_tag(tag)
                    .map(str::to_string)
                    .unwrap_or_else(|| tag.to_string()),
            ),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AnchorKind::Todo => "TODO",
            AnchorKind::Hack => "HACK",
            AnchorKind::Note => "NOTE",
            AnchorKind::Bug => "BUG",
            AnchorKind::Fixme => "FIXME",
            AnchorKind::Undone => "UNDONE",
            AnchorKind::Review => "REVIEW",
            AnchorKind::Anchor => "ANCHOR",
            AnchorKind::Custom(tag) => tag,
        }
    }
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AnchorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One annotation found in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorRecord {
    pub kind: AnchorKind,

    /// Text after the tag, metadata and colon, trimmed (may be empty)
    pub message: String,

    /// Owner from `@name` metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Issue reference from `#123` metadata, including the `#`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_ref: Option<String>,

    /// Identifier of an `ANCHOR(...)` tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_id: Option<String>,

    /// 1-based line number
    pub line: u32,

    /// 0-based character offset of the tag within its line
    pub column: u32,

    pub file_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

/// Scan text for anchors using the process-wide pattern library
pub fn scan(text: &str, file_path: &str, project: Option<&str>) -> Vec<AnchorRecord> {
    let patterns = GLOBAL.snapshot();
    scan_with(&patterns, text, file_path, project)
}

/// Scan text for anchors using an explicit pattern snapshot
///
/// Every tag occurrence on a line that follows its own comment prefix is
/// reported. A message runs to the end of the line, or to the comment
/// prefix of the next tag on the same line.
pub fn scan_with(
    patterns: &PatternSet,
    text: &str,
    file_path: &str,
    project: Option<&str>,
) -> Vec<AnchorRecord> {
    let mut anchors = Vec::new();

    if text.is_empty() || !patterns.contains_any_tag(text) {
        return anchors;
    }

    for (line_idx, line) in text.lines().enumerate() {
        let line_num = line_idx as u32 + 1; // 1-indexed

        // (start of comment prefix, start of tag)
        let hits: Vec<(usize, usize)> = patterns
            .tag_after_prefix
            .captures_iter(line)
            .filter_map(|caps| Some((caps.get(0)?.start(), caps.name("tag")?.start())))
            .collect();

        for (i, &(_, tag_start)) in hits.iter().enumerate() {
            let end = hits.get(i + 1).map(|&(prefix, _)| prefix).unwrap_or(line.len());
            let segment = &line[tag_start..end];

            let Some(caps) = patterns.tag_with_metadata.captures(segment) else {
                continue;
            };
            let Some(tag) = caps.name("tag") else {
                continue;
            };

            let kind = AnchorKind::from_tag(tag.as_str(), patterns);
            let metadata = caps.name("paren").or_else(|| caps.name("bracket"));
            let (owner, issue_ref) = metadata
                .map(|m| parse_metadata(m.as_str()))
                .unwrap_or((None, None));
            let anchor_id = match (&kind, metadata) {
                (AnchorKind::Anchor, Some(m)) => anchor_id_from_metadata(m.as_str()),
                _ => None,
            };

            let consumed = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let message = segment[consumed..].trim().to_string();

            anchors.push(AnchorRecord {
                kind,
                message,
                owner,
                issue_ref,
                anchor_id,
                line: line_num,
                column: line[..tag_start].chars().count() as u32,
                file_path: file_path.to_string(),
                project: project.map(str::to_string),
            });
        }
    }

    anchors
}

/// Check whether a line starts (after indentation) with a comment anchor
pub fn is_anchor_line(line: &str) -> bool {
    GLOBAL.snapshot().anchor_line.is_match(line)
}

/// Pull `@owner` and `#123` out of a metadata group
fn parse_metadata(metadata: &str) -> (Option<String>, Option<String>) {
    let mut owner = None;
    let mut issue = None;

    for token in metadata.split_whitespace() {
        let token = token.trim_end_matches([',', ';']);
        if let Some(name) = token.strip_prefix('@') {
            if owner.is_none() && !name.is_empty() {
                owner = Some(name.to_string());
            }
        } else if let Some(digits) = token.strip_prefix('#') {
            if issue.is_none() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
            {
                issue = Some(token.to_string());
            }
        }
    }

    (owner, issue)
}

fn anchor_id_from_metadata(metadata: &str) -> Option<String> {
    let id = metadata.trim().trim_start_matches(['@', '#']).trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::patterns::PatternLibrary;

    fn scan_base(text: &str) -> Vec<AnchorRecord> {
        let lib = PatternLibrary::new();
        scan_with(&lib.snapshot(), text, "test.cs", None)
    }

    #[test]
    fn test_simple_todo() {
        let anchors = scan_base("// TODO: Implement this feature");
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].kind, AnchorKind::Todo);
        assert_eq!(anchors[0].message, "Implement this feature");
        assert_eq!(anchors[0].line, 1);
        assert_eq!(anchors[0].column, 3);
        assert!(anchors[0].owner.is_none());
        assert!(anchors[0].issue_ref.is_none());
        assert!(anchors[0].anchor_id.is_none());
    }

    #[test]
    fn test_owner_and_issue() {
        let anchors = scan_base("// TODO(@mads #456): Fix issue");
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].owner.as_deref(), Some("mads"));
        assert_eq!(anchors[0].issue_ref.as_deref(), Some("#456"));
        assert_eq!(anchors[0].message, "Fix issue");
    }

    #[test]
    fn test_bracket_metadata_and_no_colon() {
        let anchors = scan_base("    // HACK[@jane] works around the driver");
        assert_eq!(anchors[0].kind, AnchorKind::Hack);
        assert_eq!(anchors[0].owner.as_deref(), Some("jane"));
        assert_eq!(anchors[0].message, "works around the driver");
        assert_eq!(anchors[0].column, 7);
    }

    #[test]
    fn test_issue_only() {
        let anchors = scan_base("/* FIXME(#12) */");
        assert_eq!(anchors[0].kind, AnchorKind::Fixme);
        assert_eq!(anchors[0].issue_ref.as_deref(), Some("#12"));
        assert!(anchors[0].owner.is_none());
    }

    #[test]
    fn test_detached_parenthetical_stays_in_message() {
        let anchors = scan_base("// TODO (see docs) fix");
        assert_eq!(anchors[0].message, "(see docs) fix");
        assert!(anchors[0].owner.is_none());
        assert!(anchors[0].issue_ref.is_none());
    }

    #[test]
    fn test_anchor_line() {
        assert!(is_anchor_line("    // TODO: indented"));
        assert!(is_anchor_line(" * NOTE continuation"));
        assert!(!is_anchor_line("let x = 1; // TODO: trailing"));
        assert!(!is_anchor_line("todo: not a comment"));
    }

    #[test]
    fn test_case_insensitive_canonical_kind() {
        let anchors = scan_base("// todo: a\n// ToDo: b\n// TODO: c");
        assert_eq!(anchors.len(), 3);
        assert!(anchors.iter().all(|a| a.kind == AnchorKind::Todo));
        assert_eq!(anchors[2].line, 3);
    }

    #[test]
    fn test_crlf_lines() {
        let anchors = scan_base("int a;\r\n// NOTE: crlf\r\nint b;");
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].line, 2);
        assert_eq!(anchors[0].message, "crlf");
    }

    #[test]
    fn test_prose_is_ignored() {
        assert!(scan_base("There is a bug in the parser").is_empty());
        assert!(scan_base("let note = todo_list.len();").is_empty());
    }

    #[test]
    fn test_anchor_id() {
        let anchors = scan_base("// ANCHOR(database-setup): Connection strings");
        assert_eq!(anchors[0].kind, AnchorKind::Anchor);
        assert_eq!(anchors[0].anchor_id.as_deref(), Some("database-setup"));
        assert_eq!(anchors[0].message, "Connection strings");
    }

    #[test]
    fn test_metadata_does_not_set_anchor_id_for_other_kinds() {
        let anchors = scan_base("// NOTE(setup): x");
        assert!(anchors[0].anchor_id.is_none());
    }

    #[test]
    fn test_continuation_and_vb_prefixes() {
        let anchors = scan_base("/**\n * REVIEW: check bounds\n */\n' UNDONE: vb side");
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].kind, AnchorKind::Review);
        assert_eq!(anchors[0].line, 2);
        assert_eq!(anchors[1].kind, AnchorKind::Undone);
        assert_eq!(anchors[1].message, "vb side");
    }

    #[test]
    fn test_two_tags_on_one_line() {
        let anchors = scan_base("x(); // TODO: first // HACK: second");
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].kind, AnchorKind::Todo);
        assert_eq!(anchors[0].message, "first");
        assert_eq!(anchors[1].kind, AnchorKind::Hack);
        assert_eq!(anchors[1].message, "second");
    }

    #[test]
    fn test_empty_message() {
        let anchors = scan_base("// BUG");
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].message, "");
    }

    #[test]
    fn test_empty_input() {
        assert!(scan_base("").is_empty());
    }

    #[test]
    fn test_custom_tags() {
        let lib = PatternLibrary::with_custom_tags("PERF, Security");
        let anchors = scan_with(
            &lib.snapshot(),
            "// perf: slow loop\n// SECURITY(@ops): rotate keys",
            "a.rs",
            Some("core"),
        );
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].kind, AnchorKind::Custom("PERF".to_string()));
        assert_eq!(anchors[1].kind, AnchorKind::Custom("Security".to_string()));
        assert_eq!(anchors[1].owner.as_deref(), Some("ops"));
        assert_eq!(anchors[1].project.as_deref(), Some("core"));
    }

    #[test]
    fn test_column_counts_chars() {
        let anchors = scan_base("é = 1; // NOTE: unicode");
        assert_eq!(anchors[0].column, 10);
    }

    #[test]
    fn test_kind_serializes_as_tag() {
        let anchors = scan_base("// FIXME: x");
        let json = serde_json::to_value(&anchors[0]).unwrap();
        assert_eq!(json["kind"], "FIXME");
        assert!(json.get("owner").is_none());
    }
}
