//! CLI module - Command-line interface definitions and handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::anchors::api::ScanOptions;
use crate::core::config::Config;
use crate::core::export::{ExportConfig, ExportFormat, RecordFormat};
use crate::doc::api::RenderRequest;

/// commark - scan annotation tags, follow LINK references, reflow and render doc comments.
#[derive(Parser, Debug)]
#[command(name = "commark")]
#[command(
    author,
    version,
    about,
    long_about = r#"commark works on the comments inside source files.

Anchors are tags introduced by a comment prefix:
    // TODO(@alice #42): handle retries
LINK references point at other files, lines or named anchors:
    // LINK: ~/docs/setup.md#install
Doc comments are `///` or `/** */` blocks with XML-style markup.

Output formats:
- scan: text (default), tsv, csv, md, json
- links/blocks/render: jsonl (default), json; render also accepts text

Examples:
    commark scan
    commark scan src --tags todo,bug --format csv --output anchors.csv
    commark links src/Service.cs --resolve
    commark reflow src/Service.cs --width 100 --write
    commark render src/Service.cs --line 12 --format text
"#
)]
pub struct Cli {
    /// Root directory for all operations.
    #[arg(
        long,
        global = true,
        default_value = ".",
        value_name = "ROOT",
        long_help = "Root directory for all operations (defaults to the current directory).\n\n\
Paths in scan results are relative to this root, positional paths are interpreted\n\
relative to it, and `~/` LINK targets resolve against it."
    )]
    pub root: PathBuf,

    /// Configuration file (defaults to ROOT/.commark.toml).
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        long_help = "Load configuration from FILE instead of ROOT/.commark.toml.\n\n\
A missing default file is not an error; every setting has a default."
    )]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(
        long,
        global = true,
        value_name = "FORMAT",
        long_help = "Select the output format.\n\n\
scan: text (default), tsv, csv, md, json\n\
links, blocks: jsonl (default), json\n\
render: jsonl (default), json, text"
    )]
    pub format: Option<String>,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(
        long,
        global = true,
        long_help = "Pretty-print JSON and JSONL output with indentation for human readability.\n\n\
Has no effect on the tabular and text formats."
    )]
    pub pretty: bool,

    /// Verbose mode (more diagnostics).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Enable debug logging on stderr. RUST_LOG is honored as well."
    )]
    pub verbose: bool,

    /// Disable colored output (when applicable).
    #[arg(
        long,
        global = true,
        long_help = "Disable colored output. This is useful when piping to files or when your\n\
terminal does not support ANSI colors."
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan files for anchors (TODO, HACK, NOTE, custom tags).
    #[command(
        long_about = "Walk ROOT (or the given PATHS), honoring .gitignore, and list every\n\
anchor found in a comment. Results are sorted by path, line and column.\n\n\
Examples:\n\
  commark scan\n\
  commark scan src tests --tags todo,fixme\n\
  commark scan --format md --output TODO.md\n"
    )]
    Scan {
        /// Files or directories to scan (relative to ROOT unless absolute).
        #[arg(value_name = "PATH", num_args = 0..)]
        paths: Vec<PathBuf>,

        /// Only report these tags (comma-separated, case-insensitive).
        #[arg(long, value_name = "TAGS", value_delimiter = ',')]
        tags: Vec<String>,

        /// Extra tags to recognize, on top of the configured ones.
        #[arg(
            long,
            value_name = "TAGS",
            long_help = "Comma-separated extra anchor tags, e.g. PERF,SECURITY.\n\n\
Overrides `custom_tags` from the configuration file."
        )]
        custom_tags: Option<String>,

        /// Project name stamped on every record.
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Include hidden files/directories (dotfiles).
        #[arg(long)]
        hidden: bool,

        /// Disable .gitignore and other ignore rules.
        #[arg(long)]
        no_ignore: bool,

        /// Write the export to FILE; the format follows its extension.
        #[arg(
            long,
            short,
            value_name = "FILE",
            long_help = "Write the export to FILE instead of stdout.\n\n\
Without --format, the format is chosen from the extension (.tsv, .csv, .md, .json)."
        )]
        output: Option<PathBuf>,
    },

    /// List the LINK references in a file.
    #[command(
        long_about = "Parse every LINK reference in FILE and emit one record per reference\n\
with its target path, line range, anchor name and spans.\n\n\
Examples:\n\
  commark links src/Service.cs\n\
  commark links src/Service.cs --resolve\n"
    )]
    Links {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Resolve targets against the file's directory and ROOT.
        #[arg(
            long,
            long_help = "Add the resolved target path and whether it exists.\n\n\
`./` and `../` are relative to the file, `~/`, `/` and `@/` to ROOT."
        )]
        resolve: bool,
    },

    /// List the doc-comment blocks in a file.
    #[command(
        long_about = "Locate every documentation comment block in FILE and emit its span,\n\
line range, indentation and inner content.\n\n\
Example:\n\
  commark blocks src/Service.cs\n"
    )]
    Blocks {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Language id (csharp, vb, sql, powershell, ...); inferred when omitted.
        #[arg(long, value_name = "LANG")]
        lang: Option<String>,
    },

    /// Reflow every doc-comment block in a file.
    #[command(
        long_about = "Rewrap the prose of each documentation comment to the configured width,\n\
keeping code samples verbatim. Prints the new file text, or rewrites FILE with --write.\n\n\
Examples:\n\
  commark reflow src/Service.cs\n\
  commark reflow src/Service.cs --width 100 --no-compact --write\n"
    )]
    Reflow {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Language id; inferred from the extension when omitted.
        #[arg(long, value_name = "LANG")]
        lang: Option<String>,

        /// Maximum line width.
        #[arg(long, value_name = "N")]
        width: Option<usize>,

        /// Put short single-paragraph elements on one line.
        #[arg(long, overrides_with = "no_compact")]
        compact: bool,

        /// Always put element tags on their own lines.
        #[arg(long, overrides_with = "compact")]
        no_compact: bool,

        /// Keep blank lines between paragraphs.
        #[arg(long, overrides_with = "no_preserve_blank_lines")]
        preserve_blank_lines: bool,

        /// Merge paragraphs separated by blank lines.
        #[arg(long, overrides_with = "preserve_blank_lines")]
        no_preserve_blank_lines: bool,

        /// Rewrite FILE in place.
        #[arg(long)]
        write: bool,
    },

    /// Render the doc comment at a line.
    #[command(
        long_about = "Render the documentation comment covering LINE of FILE into sections\n\
(summary, parameters, returns, remarks, ...) with inline code, links and\n\
issue references resolved.\n\n\
Issue references (#123) link to --repo, else the configured repository, else the\n\
origin remote in ROOT/.git/config.\n\n\
Examples:\n\
  commark render src/Service.cs --line 12\n\
  commark render src/Service.cs --line 12 --format text\n\
  commark render src/Service.cs --line 12 --summary\n\
  commark render src/Service.cs --line 12 --repo github:octo/app\n"
    )]
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// 1-based line inside the block.
        #[arg(long, value_name = "N")]
        line: usize,

        /// Language id; inferred from the extension when omitted.
        #[arg(long, value_name = "LANG")]
        lang: Option<String>,

        /// Repository for issue links: kind:owner/repo[@baseUrl] or a remote URL.
        #[arg(long, value_name = "DESC")]
        repo: Option<String>,

        /// Only print the stripped one-line summary.
        #[arg(long)]
        summary: bool,
    },
}

fn record_format(format: Option<&str>) -> Result<RecordFormat> {
    match format {
        Some(f) => f.parse().map_err(anyhow::Error::msg),
        None => Ok(RecordFormat::default()),
    }
}

/// `--flag` / `--no-flag` pair over a configured default
fn toggle(on: bool, off: bool, default: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        default
    }
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Get absolute root path
    let root = cli.root.canonicalize().unwrap_or(cli.root);

    let config = Config::load(cli.config.as_deref(), &root)?;
    config.apply();

    let format = cli.format.as_deref();

    match cli.command {
        Commands::Scan {
            paths,
            tags,
            custom_tags,
            project,
            hidden,
            no_ignore,
            output,
        } => {
            if let Some(custom) = custom_tags {
                crate::anchors::patterns::GLOBAL.configure(&custom);
            }

            let export_format = match (format, output.as_deref()) {
                (Some(f), _) => f.parse().map_err(anyhow::Error::msg)?,
                (None, Some(path)) => ExportFormat::from_extension(path).unwrap_or_default(),
                (None, None) => ExportFormat::Text,
            };
            if output.is_some() {
                colored::control::set_override(false);
            }

            let options = ScanOptions {
                paths,
                tags: tags
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
                project: project.or(config.project.clone()),
                hidden,
                no_ignore,
                read_config: config.file_read_config(),
            };
            crate::anchors::api::run_scan(
                &root,
                &options,
                ExportConfig::with_pretty(export_format, cli.pretty),
                output.as_deref(),
            )
        }

        Commands::Links { file, resolve } => crate::anchors::api::run_links(
            &root,
            &file,
            resolve,
            record_format(format)?,
            cli.pretty,
        ),

        Commands::Blocks { file, lang } => crate::doc::api::run_blocks(
            &root,
            &file,
            lang.as_deref(),
            record_format(format)?,
            cli.pretty,
        ),

        Commands::Reflow {
            file,
            lang,
            width,
            compact,
            no_compact,
            preserve_blank_lines,
            no_preserve_blank_lines,
            write,
        } => {
            let mut options = config.reflow.clone();
            if let Some(width) = width {
                options.max_width = width;
            }
            options.use_compact_style = toggle(compact, no_compact, options.use_compact_style);
            options.preserve_blank_lines = toggle(
                preserve_blank_lines,
                no_preserve_blank_lines,
                options.preserve_blank_lines,
            );
            crate::doc::api::run_reflow(&root, &file, lang.as_deref(), &options, write)
        }

        Commands::Render {
            file,
            line,
            lang,
            repo,
            summary,
        } => {
            let text = format.is_some_and(|f| f.eq_ignore_ascii_case("text"));
            let record = if text {
                RecordFormat::default()
            } else {
                record_format(format)?
            };
            let repository = crate::doc::api::repository_for(
                &root,
                repo.as_deref(),
                config.repository.as_ref(),
            )
            .context("resolving the issue-link repository")?;

            let request = RenderRequest {
                line,
                lang,
                repository,
                summary,
                text,
            };
            crate::doc::api::run_render(&root, &file, &request, record, cli.pretty)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_tags() {
        let cli = Cli::parse_from(["commark", "scan", "src", "--tags", "todo,bug"]);
        match cli.command {
            Commands::Scan { paths, tags, .. } => {
                assert_eq!(paths, vec![PathBuf::from("src")]);
                assert_eq!(tags, vec!["todo", "bug"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_help_examples_are_recognized() {
        let help = Cli::command()
            .get_long_about()
            .map(|s| s.to_string())
            .unwrap_or_default();

        let lib = crate::anchors::patterns::PatternLibrary::new();
        let anchors = crate::anchors::parse::scan_with(&lib.snapshot(), &help, "help", None);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].owner.as_deref(), Some("alice"));
        assert_eq!(anchors[0].issue_ref.as_deref(), Some("#42"));
        assert_eq!(anchors[0].message, "handle retries");

        let links = crate::anchors::link::parse_links(&help);
        assert!(links
            .iter()
            .any(|l| l.has_anchor() && l.file_path.as_deref() == Some("~/docs/setup.md")));
    }

    #[test]
    fn test_toggle() {
        assert!(toggle(true, false, false));
        assert!(!toggle(false, true, true));
        assert!(toggle(false, false, true));
    }

    #[test]
    fn test_record_format() {
        assert_eq!(record_format(None).unwrap(), RecordFormat::Jsonl);
        assert_eq!(record_format(Some("json")).unwrap(), RecordFormat::Json);
        assert!(record_format(Some("xml")).is_err());
    }
}
