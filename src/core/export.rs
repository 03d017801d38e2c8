//! Anchor export
//!
//! Renders an ordered anchor list as TSV, CSV, Markdown, JSON or a colored
//! terminal listing. Every tabular format uses the same columns:
//! Type, Message, File, Path, Line, Project, Owner, Issue, AnchorId.

use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::anchors::parse::{AnchorKind, AnchorRecord};

/// Column headers, in output order
pub const COLUMNS: [&str; 9] = [
    "Type", "Message", "File", "Path", "Line", "Project", "Owner", "Issue", "AnchorId",
];

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Tsv,
    Csv,
    Markdown,
    Json,
    Text,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(ExportFormat::Tsv),
            "csv" => Ok(ExportFormat::Csv),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl ExportFormat {
    /// Infer the format from an output file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

/// Export configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub pretty: bool,
}

impl ExportConfig {
    pub fn with_pretty(format: ExportFormat, pretty: bool) -> Self {
        Self { format, pretty }
    }
}

/// One exported row; JSON keys match the column headers
#[derive(Debug, Serialize)]
struct Row<'a> {
    #[serde(rename = "Type")]
    kind: &'a str,
    #[serde(rename = "Message")]
    message: &'a str,
    #[serde(rename = "File")]
    file: &'a str,
    #[serde(rename = "Path")]
    path: &'a str,
    #[serde(rename = "Line")]
    line: u32,
    #[serde(rename = "Project")]
    project: &'a str,
    #[serde(rename = "Owner")]
    owner: &'a str,
    #[serde(rename = "Issue")]
    issue: &'a str,
    #[serde(rename = "AnchorId")]
    anchor_id: &'a str,
}

impl<'a> Row<'a> {
    fn from_record(record: &'a AnchorRecord) -> Self {
        let path = record.file_path.as_str();
        let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
        Self {
            kind: record.kind.as_str(),
            message: &record.message,
            file,
            path,
            line: record.line,
            project: record.project.as_deref().unwrap_or_default(),
            owner: record.owner.as_deref().unwrap_or_default(),
            issue: record.issue_ref.as_deref().unwrap_or_default(),
            anchor_id: record.anchor_id.as_deref().unwrap_or_default(),
        }
    }

    fn fields(&self) -> [String; 9] {
        [
            self.kind.to_string(),
            self.message.to_string(),
            self.file.to_string(),
            self.path.to_string(),
            self.line.to_string(),
            self.project.to_string(),
            self.owner.to_string(),
            self.issue.to_string(),
            self.anchor_id.to_string(),
        ]
    }
}

/// Exporter for anchor lists
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            config: ExportConfig {
                format,
                pretty: false,
            },
        }
    }

    pub fn with_config(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Render records to a string
    pub fn render(&self, records: &[AnchorRecord]) -> String {
        match self.config.format {
            ExportFormat::Tsv => self.render_tsv(records),
            ExportFormat::Csv => self.render_csv(records),
            ExportFormat::Markdown => self.render_markdown(records),
            ExportFormat::Json => self.render_json(records),
            ExportFormat::Text => self.render_text(records),
        }
    }

    /// Render to a writer
    pub fn render_to<W: Write>(
        &self,
        records: &[AnchorRecord],
        mut writer: W,
    ) -> std::io::Result<()> {
        let output = self.render(records);
        writer.write_all(output.as_bytes())?;
        writer.flush()
    }

    fn render_tsv(&self, records: &[AnchorRecord]) -> String {
        let mut output = COLUMNS.join("\t");
        output.push('\n');
        for record in records {
            let fields = Row::from_record(record).fields().map(|f| escape_tsv(&f));
            output.push_str(&fields.join("\t"));
            output.push('\n');
        }
        output
    }

    fn render_csv(&self, records: &[AnchorRecord]) -> String {
        let mut output = COLUMNS.join(",");
        output.push_str("\r\n");
        for record in records {
            let fields = Row::from_record(record).fields().map(|f| escape_csv(&f));
            output.push_str(&fields.join(","));
            output.push_str("\r\n");
        }
        output
    }

    fn render_markdown(&self, records: &[AnchorRecord]) -> String {
        let mut output = String::from("# Code Anchors\n\n");

        if records.is_empty() {
            output.push_str("_No anchors found._\n");
            return output;
        }

        output.push_str(&format!("| {} |\n", COLUMNS.join(" | ")));
        output.push_str(&format!("|{}\n", "---|".repeat(COLUMNS.len())));
        for record in records {
            let fields = Row::from_record(record).fields().map(|f| escape_markdown(&f));
            output.push_str(&format!("| {} |\n", fields.join(" | ")));
        }
        output
    }

    fn render_json(&self, records: &[AnchorRecord]) -> String {
        let rows: Vec<Row> = records.iter().map(Row::from_record).collect();
        let rendered = if self.config.pretty {
            serde_json::to_string_pretty(&rows)
        } else {
            serde_json::to_string(&rows)
        };
        rendered.unwrap_or_else(|_| "[]".to_string())
    }

    /// Human listing: `path:line:col KIND message (owner issue)`
    fn render_text(&self, records: &[AnchorRecord]) -> String {
        let mut output = String::new();
        for record in records {
            let location = format!("{}:{}:{}", record.file_path, record.line, record.column + 1);
            let kind = colorize_kind(&record.kind);
            output.push_str(&format!("{} {} {}", location.dimmed(), kind, record.message));

            let meta: Vec<&str> = [record.owner.as_deref(), record.issue_ref.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if !meta.is_empty() {
                output.push_str(&format!(" {}", format!("({})", meta.join(" ")).cyan()));
            }
            output.push('\n');
        }
        output
    }
}

/// Line-oriented or array JSON for the non-tabular commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    #[default]
    Jsonl,
    Json,
}

impl std::str::FromStr for RecordFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(RecordFormat::Jsonl),
            "json" => Ok(RecordFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render serializable records as JSON Lines or a single JSON array
pub fn render_records<T: Serialize>(records: &[T], format: RecordFormat, pretty: bool) -> String {
    match format {
        RecordFormat::Jsonl => records
            .iter()
            .filter_map(|record| {
                if pretty {
                    serde_json::to_string_pretty(record).ok()
                } else {
                    serde_json::to_string(record).ok()
                }
            })
            .collect::<Vec<_>>()
            .join(if pretty { "\n\n" } else { "\n" }),
        RecordFormat::Json => {
            let rendered = if pretty {
                serde_json::to_string_pretty(records)
            } else {
                serde_json::to_string(records)
            };
            rendered.unwrap_or_else(|_| "[]".to_string())
        }
    }
}

fn colorize_kind(kind: &AnchorKind) -> colored::ColoredString {
    let label = kind.as_str();
    match kind {
        AnchorKind::Bug | AnchorKind::Fixme => label.red().bold(),
        AnchorKind::Hack | AnchorKind::Undone => label.yellow().bold(),
        AnchorKind::Todo | AnchorKind::Review => label.blue().bold(),
        AnchorKind::Note | AnchorKind::Anchor => label.green().bold(),
        AnchorKind::Custom(_) => label.magenta().bold(),
    }
}

fn escape_tsv(field: &str) -> String {
    field.replace(['\t', '\r', '\n'], " ")
}

/// RFC 4180 quoting
fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn escape_markdown(field: &str) -> String {
    field.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::parse::scan;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<AnchorRecord> {
        let mut records = scan(
            "// TODO(@mads #456): Fix, then \"ship\"\n// NOTE: a | b",
            "src/app/Main.cs",
            Some("App"),
        );
        records.extend(scan("// ANCHOR(setup): Setup", "docs/x.ts", None));
        records
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("TSV".parse::<ExportFormat>(), Ok(ExportFormat::Tsv));
        assert_eq!("markdown".parse::<ExportFormat>(), Ok(ExportFormat::Markdown));
        assert!("xml".parse::<ExportFormat>().is_err());
        assert_eq!(
            ExportFormat::from_extension(Path::new("out/anchors.csv")),
            Some(ExportFormat::Csv)
        );
    }

    #[test]
    fn test_render_tsv() {
        let output = Exporter::new(ExportFormat::Tsv).render(&sample());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Type\tMessage\tFile\tPath\tLine\tProject\tOwner\tIssue\tAnchorId");
        assert_eq!(
            lines[1],
            "TODO\tFix, then \"ship\"\tMain.cs\tsrc/app/Main.cs\t1\tApp\tmads\t#456\t"
        );
        assert_eq!(lines[3], "ANCHOR\tSetup\tx.ts\tdocs/x.ts\t1\t\t\t\tsetup");
    }

    #[test]
    fn test_render_csv_quotes() {
        let output = Exporter::new(ExportFormat::Csv).render(&sample());
        let lines: Vec<&str> = output.split("\r\n").collect();
        assert_eq!(
            lines[1],
            "TODO,\"Fix, then \"\"ship\"\"\",Main.cs,src/app/Main.cs,1,App,mads,#456,"
        );
    }

    #[test]
    fn test_render_markdown() {
        let output = Exporter::new(ExportFormat::Markdown).render(&sample());
        assert!(output.contains("| Type | Message | File |"));
        assert!(output.contains("| NOTE | a \\| b |"));

        let empty = Exporter::new(ExportFormat::Markdown).render(&[]);
        assert!(empty.contains("_No anchors found._"));
    }

    #[test]
    fn test_render_json() {
        let output = Exporter::new(ExportFormat::Json).render(&sample());
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["Type"], "TODO");
        assert_eq!(parsed[0]["Owner"], "mads");
        assert_eq!(parsed[2]["AnchorId"], "setup");
        assert_eq!(parsed.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_render_text() {
        colored::control::set_override(false);
        let output = Exporter::new(ExportFormat::Text).render(&sample());
        assert!(output.starts_with("src/app/Main.cs:1:4 TODO Fix, then \"ship\" (mads #456)\n"));
    }

    #[test]
    fn test_render_records() {
        let records = sample();
        let jsonl = render_records(&records, RecordFormat::Jsonl, false);
        assert_eq!(jsonl.lines().count(), 3);
        let first: serde_json::Value = serde_json::from_str(jsonl.lines().next().unwrap()).unwrap();
        assert_eq!(first["kind"], "TODO");
        assert_eq!(first["issue_ref"], "#456");

        let json = render_records(&records, RecordFormat::Json, false);
        assert!(json.starts_with('['));
        assert_eq!(render_records::<AnchorRecord>(&[], RecordFormat::Json, false), "[]");
    }

    #[test]
    fn test_render_to_writer() {
        let mut buf = Vec::new();
        Exporter::with_config(ExportConfig::with_pretty(ExportFormat::Json, true))
            .render_to(&sample(), &mut buf)
            .unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("\n  {"));
    }
}
