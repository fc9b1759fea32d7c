use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use semaudit_core::{AuditReport, Config, Model, Severity};
use semaudit_dax::DependencyResolver;
use semaudit_engine::{audit, integrate_visual_usage, AuditOutcome, JsonSink, MarkdownSink, ReportSink};
use semaudit_m::{TraceKind, TransformationResolver};
use semaudit_tmdl::{ModelParser, TmdlError};

/// SemAudit - lineage and dependency audit for TMDL semantic models
#[derive(Parser)]
#[command(name = "semaudit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: semaudit.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model definition folder (overrides `model_root` from the config)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit the whole model and write the report
    Audit {
        /// Output file for the JSON report (default from config: audit.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a Markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,

        /// JSON array of object names used by report visuals, one entry per use
        #[arg(long)]
        visual_usage: Option<PathBuf>,
    },

    /// Show what a measure references
    Deps {
        /// Measure name (case-insensitive)
        measure: String,
    },

    /// Show origin, steps and column lineage of one table
    Lineage {
        /// Table name (case-insensitive)
        table: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("semaudit.toml").exists() {
        Config::from_file(Path::new("semaudit.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    let root = cli
        .root
        .clone()
        .or_else(|| config.resolved_model_root())
        .context("No model root given: pass --root or set model_root in semaudit.toml")?;

    if cli.verbose {
        eprintln!("{} {}", "Model root:".cyan(), root.display());
    }

    match cli.command {
        Commands::Audit { output, markdown, visual_usage } => audit_command(
            &config,
            &root,
            output.unwrap_or_else(|| config.output.clone()),
            markdown.or_else(|| config.markdown.clone()),
            visual_usage.as_deref(),
        ),
        Commands::Deps { measure } => deps_command(&root, &measure),
        Commands::Lineage { table } => lineage_command(&root, &table),
    }
}

/// Audit command - full report
fn audit_command(
    config: &Config,
    root: &Path,
    output: PathBuf,
    markdown: Option<PathBuf>,
    visual_usage: Option<&Path>,
) -> Result<()> {
    let (mut report, model) = match audit(root, config)? {
        AuditOutcome::Completed { report, model } => (report, model),
        AuditOutcome::Skipped(diag) => {
            println!("{} {}", "Nothing to audit:".yellow(), diag.message);
            return Ok(());
        }
    };

    if let Some(path) = visual_usage {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read visual usage from {}", path.display()))?;
        let used: Vec<String> = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a JSON array of names", path.display()))?;

        report.visual_usage = integrate_visual_usage(&model, &used);
    }

    let json = JsonSink::new(output);
    json.write(&report)?;
    println!("{} {}", "Report written to:".green(), json.path().display());

    if let Some(md_path) = markdown {
        let md = MarkdownSink::new(md_path);
        md.write(&report)?;
        println!("{} {}", "Markdown report written to:".green(), md.path().display());
    }

    print_report_summary(&report);
    Ok(())
}

/// Parse the model, treating a missing root as "nothing to show"
fn load_model(root: &Path) -> Result<Option<Model>> {
    match ModelParser::new(root).parse() {
        Ok(model) if model.is_empty() => {
            println!("{} no tables under {}", "Nothing to show:".yellow(), root.display());
            Ok(None)
        }
        Ok(model) => Ok(Some(model)),
        Err(TmdlError::MissingRoot(path)) => {
            println!("{} {} does not exist", "Nothing to show:".yellow(), path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deps command - references of a single measure
fn deps_command(root: &Path, measure_name: &str) -> Result<()> {
    let Some(model) = load_model(root)? else {
        return Ok(());
    };

    let measure = model
        .measure(measure_name)
        .with_context(|| format!("Measure '{}' not found in model", measure_name))?;

    println!("\n{} {}", "Measure:".bold(), measure.name.bright_blue());
    println!("  Home table: {}", measure.home_table);
    println!("  Expression: {}", measure.expression);
    println!();

    let edges = DependencyResolver::new(&model).dependencies(&measure.expression);
    if edges.is_empty() {
        println!("{}", "Hardcoded: references no model object".yellow());
        return Ok(());
    }

    println!("{}", "Depends on:".bold());
    for edge in edges {
        println!("  [{}] {}", edge.kind.to_string().cyan(), edge.target);
    }

    Ok(())
}

/// Lineage command - origin and per-column trace of one table
fn lineage_command(root: &Path, table_name: &str) -> Result<()> {
    let Some(model) = load_model(root)? else {
        return Ok(());
    };

    let table = model
        .table(table_name)
        .with_context(|| format!("Table '{}' not found in model", table_name))?;

    let resolved = TransformationResolver::new(&model.parameters).resolve(&table.source);

    println!("\n{} {}", "Table:".bold(), table.name.bright_blue());
    println!("  Origin: {}", resolved.origin.kind);
    println!("  Path:   {}", resolved.origin.path);

    if !resolved.program.is_empty() {
        println!("\n{}", "Steps:".bold());
        for step in resolved.program.steps() {
            println!("  {}. {}", step.position + 1, step.name);
        }
    }

    println!("\n{}", "Columns:".bold());
    for column in &table.columns {
        let trace = resolved.trace_column(&column.name);
        let marker = match trace.kind {
            TraceKind::Expand => "JOIN".magenta(),
            TraceKind::Transformation => "M".yellow(),
            TraceKind::Origin => "SRC".green(),
            TraceKind::Internal => "DAX".cyan(),
        };

        print!("  [{}] {}: {}", marker, column.name, trace.description);
        if let Some(step) = &trace.step {
            print!(" {}", format!("(step {})", step).dimmed());
        }
        println!();
    }

    Ok(())
}

/// Print audit summary
fn print_report_summary(report: &AuditReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Semantic Model Audit".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Tables:        {}", summary.tables);
    println!("  Columns:       {}", summary.columns);
    println!("  Measures:      {}", summary.measures);
    println!("  Relationships: {}", summary.relationships);

    if summary.hardcoded_measures > 0 {
        println!("  Hardcoded measures: {}", summary.hardcoded_measures.to_string().yellow());
    }
    if summary.unused_columns > 0 {
        println!("  Columns unused by measures: {}", summary.unused_columns.to_string().yellow());
    }
    println!();

    println!("{}", "Sheets:".bold());
    for (name, rows) in report.sheet_sizes() {
        println!("  {:<16} {} rows", name, rows);
    }
    println!();

    let issues: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity != Severity::Info)
        .collect();

    if issues.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in issues {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(loc) = &diag.location {
                println!("    at {}", loc);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}
