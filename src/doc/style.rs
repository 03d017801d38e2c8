//! Comment style table
//!
//! One descriptor per language family. The core never guesses a style; the
//! caller picks one by language id or file extension.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// How documentation comments are written in a language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentStyle {
    /// Prefix of a single-line doc comment, e.g. `///`
    pub single_line_prefix: String,

    /// Start delimiter of a multi-line doc comment, e.g. `/**`
    #[serde(default)]
    pub multi_line_start: Option<String>,

    /// End delimiter of a multi-line doc comment, e.g. `*/`
    #[serde(default)]
    pub multi_line_end: Option<String>,

    /// Continuation marker for lines inside a multi-line comment, e.g. ` * `
    #[serde(default)]
    pub continuation: Option<String>,
}

impl CommentStyle {
    pub fn new(single_line_prefix: &str) -> Self {
        Self {
            single_line_prefix: single_line_prefix.to_string(),
            multi_line_start: None,
            multi_line_end: None,
            continuation: None,
        }
    }

    pub fn with_multi_line(mut self, start: &str, end: &str) -> Self {
        self.multi_line_start = Some(start.to_string());
        self.multi_line_end = Some(end.to_string());
        self
    }

    pub fn with_continuation(mut self, marker: &str) -> Self {
        self.continuation = Some(marker.to_string());
        self
    }

    /// C#, Java, JavaScript, TypeScript, C/C++, Rust outer docs
    pub fn c_like() -> Self {
        Self::new("///")
            .with_multi_line("/**", "*/")
            .with_continuation(" * ")
    }

    /// Visual Basic
    pub fn quote() -> Self {
        Self::new("'''")
    }

    /// SQL
    pub fn sql() -> Self {
        Self::new("--").with_multi_line("/*", "*/")
    }

    /// PowerShell, shell-like languages
    pub fn hash() -> Self {
        Self::new("#").with_multi_line("<#", "#>")
    }

    /// Look up a style by language / content-type id
    pub fn for_language(language: &str) -> Option<Self> {
        match language.to_lowercase().as_str() {
            "csharp" | "c#" | "cs" | "java" | "javascript" | "js" | "typescript" | "ts"
            | "c" | "cpp" | "c++" | "rust" | "fsharp" | "f#" | "go" | "kotlin" | "swift" => {
                Some(Self::c_like())
            }
            "vb" | "vbnet" | "basic" | "visualbasic" => Some(Self::quote()),
            "sql" | "tsql" | "plsql" => Some(Self::sql()),
            "powershell" | "ps1" | "shell" | "bash" | "sh" | "python" | "ruby" | "perl" => {
                Some(Self::hash())
            }
            _ => None,
        }
    }

    /// Look up a style by file extension
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        let language = match ext.as_str() {
            "cs" | "csx" => "csharp",
            "java" => "java",
            "js" | "jsx" | "mjs" | "cjs" => "javascript",
            "ts" | "tsx" | "mts" | "cts" => "typescript",
            "c" | "h" => "c",
            "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" => "cpp",
            "rs" => "rust",
            "fs" | "fsi" | "fsx" => "fsharp",
            "go" => "go",
            "kt" | "kts" => "kotlin",
            "swift" => "swift",
            "vb" => "vb",
            "sql" => "sql",
            "ps1" | "psm1" | "psd1" => "powershell",
            "sh" | "bash" => "shell",
            "py" => "python",
            "rb" => "ruby",
            "pl" | "pm" => "perl",
            _ => return None,
        };
        Self::for_language(language)
    }

    /// Does this style declare a delimited multi-line form?
    pub fn has_multi_line(&self) -> bool {
        self.multi_line_start.is_some() && self.multi_line_end.is_some()
    }

    /// The continuation marker without surrounding spaces (e.g. `*`)
    pub fn continuation_marker(&self) -> Option<&str> {
        self.continuation
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// Reject styles the locator and reflow engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.single_line_prefix.trim().is_empty() {
            return Err(Error::invalid_argument(
                "comment style has an empty single-line prefix",
            ));
        }
        match (&self.multi_line_start, &self.multi_line_end) {
            (Some(start), Some(end)) if start.is_empty() || end.is_empty() => Err(
                Error::invalid_argument("comment style has an empty multi-line delimiter"),
            ),
            (Some(_), None) | (None, Some(_)) => Err(Error::invalid_argument(
                "comment style declares only one multi-line delimiter",
            )),
            _ => Ok(()),
        }
    }
}
