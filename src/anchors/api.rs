//! Workspace anchor scan
//!
//! Walks the tree (respecting .gitignore), reads candidate files and scans
//! them with one pattern snapshot. Files are scanned in parallel when the
//! `parallel` feature is on.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::anchors::link::{parse_links, LinkRecord};
use crate::anchors::parse::{scan_with, AnchorRecord};
use crate::anchors::patterns::{PatternSet, GLOBAL};
use crate::core::export::{render_records, ExportConfig, Exporter, RecordFormat};
use crate::core::file_reader::{read_file_with_config, read_source, FileReadConfig};
use crate::core::paths::{
    make_relative, normalize_path, resolve_input, resolve_link_path, LinkBases,
};
use crate::doc::block::SourceLines;
use crate::error::Error;

/// Options for a workspace scan
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Files or directories to scan; empty means the whole root
    pub paths: Vec<PathBuf>,

    /// Only keep these tags (case-insensitive); empty keeps all
    pub tags: Vec<String>,

    /// Project name stamped on every record
    pub project: Option<String>,

    /// Include hidden files
    pub hidden: bool,

    /// Ignore .gitignore rules
    pub no_ignore: bool,

    pub read_config: FileReadConfig,
}

/// Find all anchors under the root
pub fn scan_workspace(
    root: &Path,
    options: &ScanOptions,
) -> crate::error::Result<Vec<AnchorRecord>> {
    let files = collect_files(root, options)?;
    let patterns = GLOBAL.snapshot();
    log::debug!("scanning {} file(s) for anchors", files.len());

    #[cfg(feature = "parallel")]
    let per_file: Vec<Vec<AnchorRecord>> = files
        .par_iter()
        .map(|path| scan_file(root, path, &patterns, options))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let per_file: Vec<Vec<AnchorRecord>> = files
        .iter()
        .map(|path| scan_file(root, path, &patterns, options))
        .collect();

    let mut records: Vec<AnchorRecord> = per_file.into_iter().flatten().collect();

    if !options.tags.is_empty() {
        records.retain(|r| {
            options
                .tags
                .iter()
                .any(|t| t.eq_ignore_ascii_case(r.kind.as_str()))
        });
    }

    records.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then(a.line.cmp(&b.line))
            .then(a.column.cmp(&b.column))
    });
    Ok(records)
}

fn scan_file(
    root: &Path,
    path: &Path,
    patterns: &PatternSet,
    options: &ScanOptions,
) -> Vec<AnchorRecord> {
    let result = read_file_with_config(path, &options.read_config);
    let Some(content) = result.content else {
        if let Some(reason) = result.skip_reason {
            log::debug!("skipping {}: {}", path.display(), reason);
        }
        return Vec::new();
    };

    let relative = make_relative(path, root).unwrap_or_else(|| normalize_path(path));
    scan_with(patterns, &content, &relative, options.project.as_deref())
}

/// Candidate files in scope, sorted
pub fn collect_files(root: &Path, options: &ScanOptions) -> crate::error::Result<Vec<PathBuf>> {
    let scopes: Vec<PathBuf> = if options.paths.is_empty() {
        vec![root.to_path_buf()]
    } else {
        options
            .paths
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { root.join(p) })
            .collect()
    };

    let mut files = Vec::new();
    for scope in &scopes {
        if !scope.exists() {
            return Err(Error::Io {
                path: scope.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "path does not exist"),
            });
        }

        let ignore = !options.no_ignore;
        let mut builder = WalkBuilder::new(scope);
        builder
            .hidden(!options.hidden)
            .git_ignore(ignore)
            .git_global(ignore)
            .git_exclude(ignore)
            .require_git(false);

        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::debug!("walk error: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_some_and(|t| t.is_file()) && is_anchor_candidate(path) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Check if a file might contain anchors
fn is_anchor_candidate(path: &Path) -> bool {
    let text_extensions = [
        "cs", "csx", "vb", "fs", "fsx", "sql", "ps1", "psm1", "rs", "py", "js", "mjs", "cjs",
        "ts", "mts", "jsx", "tsx", "c", "cc", "cpp", "cxx", "h", "hpp", "java", "kt", "kts", "go",
        "rb", "php", "swift", "sh", "bash", "zsh", "css", "scss", "less", "html", "htm", "xml",
        "xaml", "razor", "cshtml", "vue", "svelte", "yaml", "yml", "toml", "md", "txt",
    ];

    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| text_extensions.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Run the scan command
///
/// Writes to `output` when given, otherwise to stdout.
pub fn run_scan(
    root: &Path,
    options: &ScanOptions,
    export: ExportConfig,
    output: Option<&Path>,
) -> Result<()> {
    let records = scan_workspace(root, options)?;
    let exporter = Exporter::with_config(export);

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            exporter
                .render_to(&records, std::io::BufWriter::new(file))
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Exported {} anchor(s) to {}", records.len(), path.display());
        }
        None => print!("{}", exporter.render(&records)),
    }

    Ok(())
}

/// A LINK reference as reported by the `links` command
#[derive(Debug, Serialize)]
pub struct LinkReport {
    #[serde(flatten)]
    pub link: LinkRecord,

    /// 1-based line of the reference
    pub source_line: usize,

    /// Resolved target, when resolution was requested and possible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

/// Parse the LINK references of one file
pub fn collect_links(root: &Path, file: &Path, text: &str, resolve: bool) -> Vec<LinkReport> {
    let lines = SourceLines::new(text);
    let bases = LinkBases::for_file(file, Some(root));

    parse_links(text)
        .into_iter()
        .map(|link| {
            let source_line = lines.line_of(link.start_index).map_or(1, |l| l + 1);
            let target = match (&link.file_path, resolve) {
                (Some(path), true) => resolve_link_path(path, &bases),
                // A local anchor points back into the same file
                (None, true) => Some(file.to_path_buf()),
                (_, false) => None,
            };
            LinkReport {
                exists: target.as_ref().map(|t| t.exists()),
                resolved: target.as_deref().map(normalize_path),
                source_line,
                link,
            }
        })
        .collect()
}

/// Run the links command
pub fn run_links(
    root: &Path,
    file: &Path,
    resolve: bool,
    format: RecordFormat,
    pretty: bool,
) -> Result<()> {
    let path = resolve_input(root, file);
    let text = read_source(&path).with_context(|| format!("reading {}", path.display()))?;

    let reports = collect_links(root, &path, &text, resolve);
    let output = render_records(&reports, format, pretty);
    if !output.is_empty() {
        println!("{}", output);
    }

    Ok(())
}
