//! Report sinks
//!
//! A sink receives the finished report and writes it somewhere. The
//! spreadsheet writer lives outside this workspace and plugs in through
//! [`ReportSink`]; JSON and Markdown renderings ship here.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use semaudit_core::{AuditReport, Severity};

/// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for an audit report
pub trait ReportSink {
    fn write(&self, report: &AuditReport) -> Result<(), SinkError>;
}

/// Writes `audit.json`
#[derive(Debug, Clone)]
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonSink {
    fn write(&self, report: &AuditReport) -> Result<(), SinkError> {
        report.save_to_file(&self.path).map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), "wrote JSON report");
        Ok(())
    }
}

/// Writes a human-readable Markdown summary with one table per sheet
#[derive(Debug, Clone)]
pub struct MarkdownSink {
    path: PathBuf,
}

impl MarkdownSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for MarkdownSink {
    fn write(&self, report: &AuditReport) -> Result<(), SinkError> {
        std::fs::write(&self.path, render_markdown(report)).map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), "wrote Markdown report");
        Ok(())
    }
}

/// Escape characters that would break a Markdown table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn table_header(md: &mut String, headers: &[&str]) {
    let _ = writeln!(md, "| {} |", headers.join(" | "));
    let _ = writeln!(md, "|{}", "---|".repeat(headers.len()));
}

/// Render the report as Markdown
pub fn render_markdown(report: &AuditReport) -> String {
    let mut md = String::new();

    md.push_str("# Semantic Model Audit\n\n");
    let _ = writeln!(md, "**Version:** {}\n", report.version);
    let _ = writeln!(md, "**Timestamp:** {}\n", report.timestamp);

    md.push_str("## Summary\n\n");
    let summary = &report.summary;
    let _ = writeln!(md, "- Tables: {}", summary.tables);
    let _ = writeln!(md, "- Columns: {}", summary.columns);
    let _ = writeln!(md, "- Measures: {}", summary.measures);
    let _ = writeln!(md, "- Relationships: {}", summary.relationships);
    let _ = writeln!(md, "- Hardcoded measures: {}", summary.hardcoded_measures);
    let _ = writeln!(md, "- Unused columns: {}", summary.unused_columns);
    let _ = writeln!(md, "- Warnings: {}", summary.warnings);
    let _ = writeln!(md, "- Errors: {}", summary.errors);
    md.push('\n');

    if !report.relationships.is_empty() {
        md.push_str("## Relationships\n\n");
        table_header(&mut md, &["Source Table", "Source Column", "Dest Column", "Dest Table", "Type", "Active"]);
        for r in &report.relationships {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {} |",
                cell(&r.source_table),
                cell(&r.source_column),
                cell(&r.dest_column),
                cell(&r.dest_table),
                r.relation_type,
                r.active
            );
        }
        md.push('\n');
    }

    if !report.column_lineage.is_empty() {
        md.push_str("## Column Lineage\n\n");
        table_header(&mut md, &["Table", "Column", "Description", "Origin Path", "Origin Type"]);
        for r in &report.column_lineage {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} |",
                cell(&r.owning_table),
                cell(&r.column_name),
                cell(&r.description),
                cell(&r.origin_path),
                cell(&r.origin_type)
            );
        }
        md.push('\n');
    }

    if !report.dependencies.is_empty() {
        md.push_str("## Dependencies\n\n");
        table_header(&mut md, &["Measure", "Home Table", "Target", "Kind"]);
        for r in &report.dependencies {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {:?} |",
                cell(&r.measure),
                cell(&r.home_table),
                cell(&r.target_name),
                r.target_kind
            );
        }
        md.push('\n');
    }

    let unused: Vec<_> = report
        .symbol_usage
        .iter()
        .filter(|u| u.using_measure.is_empty())
        .collect();
    if !unused.is_empty() {
        md.push_str("## Columns Not Used in Measures\n\n");
        for u in unused {
            let _ = writeln!(md, "- {}[{}]", u.table, u.column);
        }
        md.push('\n');
    }

    if !report.visual_usage.is_empty() {
        md.push_str("## Visual Usage\n\n");
        table_header(&mut md, &["Table", "Object", "Kind", "Visuals"]);
        for r in &report.visual_usage {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} |",
                cell(&r.table),
                cell(&r.object_name),
                r.object_kind,
                r.visual_count
            );
        }
        md.push('\n');
    }

    if report.diagnostics.is_empty() {
        md.push_str("✅ **No issues found!**\n");
    } else {
        md.push_str("## Diagnostics\n\n");

        for diag in &report.diagnostics {
            let severity_emoji = match diag.severity {
                Severity::Error => "❌",
                Severity::Warn => "⚠️",
                Severity::Info => "ℹ️",
            };

            let _ = writeln!(md, "### {} {} - {}\n", severity_emoji, diag.severity, diag.code);
            let _ = writeln!(md, "{}\n", diag.message);

            if let Some(loc) = &diag.location {
                let _ = writeln!(md, "**Location:** {}\n", loc);
            }
        }
    }

    md
}
