//! Path utilities
//!
//! Normalizes reported paths to '/' separators relative to the root, and
//! resolves LINK targets against the directories a link can be relative to.

use std::path::{Component, Path, PathBuf};

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Interpret a command-line path relative to the root
pub fn resolve_input(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Directories a LINK path may be relative to
///
/// Any of them can be unknown; a link that needs an unknown base does not
/// resolve.
#[derive(Debug, Clone, Default)]
pub struct LinkBases {
    /// Directory of the file containing the link
    pub current_dir: Option<PathBuf>,
    /// Solution / repository root, for `~/` and `/`
    pub solution_root: Option<PathBuf>,
    /// Project root, for `@/`
    pub project_root: Option<PathBuf>,
}

impl LinkBases {
    /// Bases for a link found in `file`, with one root serving both roles
    pub fn for_file(file: &Path, root: Option<&Path>) -> Self {
        Self {
            current_dir: file.parent().map(Path::to_path_buf),
            solution_root: root.map(Path::to_path_buf),
            project_root: root.map(Path::to_path_buf),
        }
    }
}

/// Resolve a LINK path
///
/// `./` and `../` resolve against the current file's directory, `~/` and a
/// leading `/` against the solution root, `@/` against the project root, and
/// anything else against the current file's directory.
pub fn resolve_link_path(link_path: &str, bases: &LinkBases) -> Option<PathBuf> {
    let link_path = link_path.trim();
    if link_path.is_empty() {
        return None;
    }

    let (base, relative) = if let Some(rest) = link_path.strip_prefix("~/") {
        (bases.solution_root.as_ref()?, rest)
    } else if let Some(rest) = link_path.strip_prefix("@/") {
        (bases.project_root.as_ref()?, rest)
    } else if let Some(rest) = link_path.strip_prefix('/') {
        (bases.solution_root.as_ref()?, rest)
    } else {
        (bases.current_dir.as_ref()?, link_path)
    };

    Some(clean_path(&base.join(relative.replace('\\', "/"))))
}

/// Lexically remove `.` and `..` components
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bases() -> LinkBases {
        LinkBases {
            current_dir: Some(PathBuf::from("/repo/src/app")),
            solution_root: Some(PathBuf::from("/repo")),
            project_root: Some(PathBuf::from("/repo/src")),
        }
    }

    #[test]
    fn test_normalize_path() {
        let path = Path::new("src/main.rs");
        assert_eq!(normalize_path(path), "src/main.rs");
    }

    #[test]
    fn test_make_relative() {
        let root = Path::new("/project");
        let path = Path::new("/project/src/main.rs");
        assert_eq!(make_relative(path, root), Some("src/main.rs".to_string()));
    }

    #[test]
    fn test_make_relative_not_under_root() {
        let root = Path::new("/project");
        let path = Path::new("/other/file.rs");
        assert_eq!(make_relative(path, root), None);
    }

    #[test]
    fn test_resolve_relative_forms() {
        let b = bases();
        assert_eq!(
            resolve_link_path("./Services/User.cs", &b),
            Some(PathBuf::from("/repo/src/app/Services/User.cs"))
        );
        assert_eq!(
            resolve_link_path("../Shared/Db.cs", &b),
            Some(PathBuf::from("/repo/src/Shared/Db.cs"))
        );
        assert_eq!(
            resolve_link_path("Docs/Read Me.md", &b),
            Some(PathBuf::from("/repo/src/app/Docs/Read Me.md"))
        );
    }

    #[test]
    fn test_resolve_rooted_forms() {
        let b = bases();
        assert_eq!(
            resolve_link_path("~/docs/setup.md", &b),
            Some(PathBuf::from("/repo/docs/setup.md"))
        );
        assert_eq!(
            resolve_link_path("/docs/setup.md", &b),
            Some(PathBuf::from("/repo/docs/setup.md"))
        );
        assert_eq!(
            resolve_link_path("@/Models/User.cs", &b),
            Some(PathBuf::from("/repo/src/Models/User.cs"))
        );
    }

    #[test]
    fn test_missing_base_is_absent() {
        let b = LinkBases {
            current_dir: Some(PathBuf::from("/repo/src")),
            ..Default::default()
        };
        assert_eq!(resolve_link_path("~/x.md", &b), None);
        assert_eq!(resolve_link_path("@/x.md", &b), None);
        assert_eq!(resolve_link_path("", &b), None);
        assert_eq!(resolve_link_path("./x.md", &LinkBases::default()), None);
    }

    #[test]
    fn test_for_file() {
        let b = LinkBases::for_file(Path::new("/repo/src/a.cs"), Some(Path::new("/repo")));
        assert_eq!(b.current_dir, Some(PathBuf::from("/repo/src")));
        assert_eq!(b.project_root, Some(PathBuf::from("/repo")));
    }

    #[test]
    fn test_resolve_input() {
        let root = Path::new("/repo");
        assert_eq!(resolve_input(root, Path::new("src/a.cs")), PathBuf::from("/repo/src/a.cs"));
        assert_eq!(resolve_input(root, Path::new("/tmp/b.cs")), PathBuf::from("/tmp/b.cs"));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(clean_path(Path::new("../x")), PathBuf::from("../x"));
    }
}
