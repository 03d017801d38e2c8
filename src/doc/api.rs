//! Doc-comment commands: blocks, reflow, render

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::core::export::{render_records, RecordFormat};
use crate::core::file_reader::read_source;
use crate::core::paths::{make_relative, normalize_path, resolve_input};
use crate::doc::block::{DocCommentBlock, DocCommentLocator, SourceLines};
use crate::doc::reflow::{reflow_text, ReflowOptions};
use crate::doc::render::{render_block, stripped_summary, RenderedDocument};
use crate::doc::repo::RepositoryInfo;
use crate::doc::style::CommentStyle;

/// Pick the comment style from `--lang`, else from the file extension
pub fn style_for(path: &Path, lang: Option<&str>) -> Result<CommentStyle> {
    match lang {
        Some(lang) => {
            CommentStyle::for_language(lang).ok_or_else(|| anyhow!("Unknown language: {}", lang))
        }
        None => CommentStyle::for_path(path).ok_or_else(|| {
            anyhow!(
                "Cannot infer a comment style for {}; pass --lang",
                path.display()
            )
        }),
    }
}

fn load(root: &Path, file: &Path, lang: Option<&str>) -> Result<(String, String, CommentStyle)> {
    let path = resolve_input(root, file);
    let style = style_for(&path, lang)?;
    let text = read_source(&path).with_context(|| format!("reading {}", path.display()))?;
    let shown = make_relative(&path, root).unwrap_or_else(|| normalize_path(&path));
    Ok((shown, text, style))
}

/// A located block as reported by the `blocks` command
#[derive(Debug, Serialize)]
struct BlockReport<'a> {
    file: &'a str,
    #[serde(flatten)]
    block: &'a DocCommentBlock,
}

/// Run the blocks command
pub fn run_blocks(
    root: &Path,
    file: &Path,
    lang: Option<&str>,
    format: RecordFormat,
    pretty: bool,
) -> Result<()> {
    let (shown, text, style) = load(root, file, lang)?;
    let locator = DocCommentLocator::new(style)?;

    let blocks = locator.find_all(&text);
    log::debug!("{}: {} doc-comment block(s)", shown, blocks.len());

    let reports: Vec<BlockReport> = blocks
        .iter()
        .map(|block| BlockReport { file: &shown, block })
        .collect();
    let output = render_records(&reports, format, pretty);
    if !output.is_empty() {
        println!("{}", output);
    }

    Ok(())
}

/// Run the reflow command
///
/// Prints the reflowed file, or writes it back in place with `write`.
pub fn run_reflow(
    root: &Path,
    file: &Path,
    lang: Option<&str>,
    options: &ReflowOptions,
    write: bool,
) -> Result<()> {
    let (shown, text, style) = load(root, file, lang)?;
    let reflowed = reflow_text(&text, &style, options)?;

    if write {
        if reflowed == text {
            log::debug!("{}: already formatted", shown);
            return Ok(());
        }
        let path = resolve_input(root, file);
        std::fs::write(&path, &reflowed)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Reflowed {}", shown);
    } else {
        print!("{}", reflowed);
    }

    Ok(())
}

/// Output of the render command
#[derive(Debug, Serialize)]
struct RenderReport<'a> {
    file: &'a str,
    /// 1-based first line of the block
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<RenderedDocument>,
}

/// Where the render command should point `#123` references
pub fn repository_for(
    root: &Path,
    explicit: Option<&str>,
    configured: Option<&RepositoryInfo>,
) -> Result<Option<RepositoryInfo>> {
    if let Some(desc) = explicit {
        let repo = desc
            .parse::<RepositoryInfo>()
            .with_context(|| format!("parsing --repo {}", desc))?;
        return Ok(Some(repo));
    }
    if let Some(repo) = configured {
        return Ok(Some(repo.clone()));
    }
    Ok(RepositoryInfo::discover(root))
}

/// Options for the render command
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    /// 1-based line inside the block
    pub line: usize,
    pub lang: Option<String>,
    pub repository: Option<RepositoryInfo>,
    /// Only print the stripped one-line summary
    pub summary: bool,
    /// Plain-text output instead of JSON
    pub text: bool,
}

/// Run the render command
pub fn run_render(
    root: &Path,
    file: &Path,
    request: &RenderRequest,
    format: RecordFormat,
    pretty: bool,
) -> Result<()> {
    if request.line == 0 {
        return Err(anyhow!("--line is 1-based"));
    }

    let (shown, text, style) = load(root, file, request.lang.as_deref())?;
    let locator = DocCommentLocator::new(style)?;

    let lines = SourceLines::new(&text);
    if request.line > lines.len() {
        return Err(anyhow!(
            "{} has {} line(s); --line {} is out of range",
            shown,
            lines.len(),
            request.line
        ));
    }
    let offset = lines.line_start(request.line - 1);
    let block = locator
        .block_at(&text, offset)
        .ok_or_else(|| anyhow!("No doc comment at {}:{}", shown, request.line))?;

    if request.text {
        if request.summary {
            println!("{}", stripped_summary(&block.raw_content));
        } else {
            print!("{}", render_block(&block, request.repository.as_ref()));
        }
        return Ok(());
    }

    let report = if request.summary {
        RenderReport {
            file: &shown,
            line: block.start_line + 1,
            summary: Some(stripped_summary(&block.raw_content)),
            document: None,
        }
    } else {
        RenderReport {
            file: &shown,
            line: block.start_line + 1,
            summary: None,
            document: Some(render_block(&block, request.repository.as_ref())),
        }
    };
    println!("{}", render_records(&[report], format, pretty));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::repo::RepositoryKind;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_style_for_extension_and_lang() {
        let cs = style_for(Path::new("a.cs"), None).unwrap();
        assert_eq!(cs, CommentStyle::c_like());

        let vb = style_for(Path::new("a.txt"), Some("vb")).unwrap();
        assert_eq!(vb, CommentStyle::quote());

        assert!(style_for(Path::new("a.unknown"), None).is_err());
        assert!(style_for(Path::new("a.cs"), Some("klingon")).is_err());
    }

    #[test]
    fn test_repository_precedence() {
        let dir = tempdir().unwrap();
        let configured = RepositoryInfo::new(RepositoryKind::GitLab, "team", "svc");

        let explicit = repository_for(dir.path(), Some("github:octo/app"), Some(&configured))
            .unwrap()
            .unwrap();
        assert_eq!(explicit.kind, RepositoryKind::GitHub);

        let fallback = repository_for(dir.path(), None, Some(&configured))
            .unwrap()
            .unwrap();
        assert_eq!(fallback.kind, RepositoryKind::GitLab);

        assert!(repository_for(dir.path(), None, None).unwrap().is_none());
    }

    #[test]
    fn test_reflow_write_in_place() {
        let dir = tempdir().unwrap();
        let file = PathBuf::from("A.cs");
        std::fs::write(
            dir.path().join(&file),
            "/// <summary>\n/// Short.\n/// </summary>\nclass A {}\n",
        )
        .unwrap();

        run_reflow(dir.path(), &file, None, &ReflowOptions::default(), true).unwrap();
        let written = std::fs::read_to_string(dir.path().join(&file)).unwrap();
        assert!(written.starts_with("/// <summary>Short.</summary>"));
        assert!(written.ends_with("class A {}\n"));
    }

    #[test]
    fn test_render_rejects_out_of_range_line() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("A.cs"), "/// <summary>x</summary>\n").unwrap();
        let request = RenderRequest {
            line: 9,
            ..Default::default()
        };
        let err = run_render(
            dir.path(),
            Path::new("A.cs"),
            &request,
            RecordFormat::Json,
            false,
        );
        assert!(err.is_err());
    }
}
