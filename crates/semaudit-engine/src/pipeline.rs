//! Audit pipeline
//!
//! parse folder -> resolve sources and formulas -> assemble the report

use std::path::Path;
use semaudit_core::{
    AuditReport, Config, Diagnostic, DiagnosticCode, Location, Model, Severity, TargetKind,
    UsageState,
};
use semaudit_tmdl::{ModelParser, TmdlError};
use crate::sheets::{
    column_lineage_records, dependency_records, inventory_records, relationship_records,
    symbol_usage_records,
};

/// Engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Model(#[from] TmdlError),
}

/// Result of an audit run
#[derive(Debug, Clone)]
pub enum AuditOutcome {
    /// The model was parsed and reported; the model is kept for follow-up
    /// passes such as visual usage integration
    Completed { report: AuditReport, model: Model },

    /// Nothing to report (missing root or no tables); carries the reason
    Skipped(Diagnostic),
}

impl AuditOutcome {
    pub fn report(&self) -> Option<&AuditReport> {
        match self {
            AuditOutcome::Completed { report, .. } => Some(report),
            AuditOutcome::Skipped(_) => None,
        }
    }
}

/// Parse the model under `root` and build the full report.
///
/// A missing root or a model without tables is not an error: the run is a
/// no-op and the outcome says why.
pub fn audit(root: &Path, config: &Config) -> Result<AuditOutcome, EngineError> {
    let model = match ModelParser::new(root).parse() {
        Ok(model) => model,
        Err(TmdlError::MissingRoot(path)) => {
            tracing::warn!(root = %path.display(), "model root not found, nothing to audit");
            return Ok(AuditOutcome::Skipped(
                Diagnostic::new(
                    DiagnosticCode::MissingRoot,
                    Severity::Warn,
                    format!("Model root does not exist: {}", path.display()),
                )
                .with_location(Location::new(path.display().to_string())),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if model.is_empty() {
        tracing::info!(root = %root.display(), "model has no tables, nothing to audit");
        return Ok(AuditOutcome::Skipped(Diagnostic::new(
            DiagnosticCode::Info,
            Severity::Info,
            format!("No table declarations found under {}", root.display()),
        )));
    }

    let report = build_report(&model, config);
    Ok(AuditOutcome::Completed { report, model })
}

/// Build every sheet of the report from a parsed model
pub fn build_report(model: &Model, config: &Config) -> AuditReport {
    let mut report = AuditReport::new();

    report.relationships = relationship_records(model);

    let (lineage, lineage_notes) = column_lineage_records(model, &config.filter);
    report.column_lineage = lineage;

    let (dependencies, dependency_notes) = dependency_records(model, &config.limits);
    report.symbol_usage = symbol_usage_records(model, &dependencies, &config.filter);
    report.dependencies = dependencies;

    report.inventory = inventory_records(model, &config.limits);

    report.summary.tables = model.tables().len();
    report.summary.columns = model.column_count();
    report.summary.measures = model.measures().len();
    report.summary.relationships = model.relationships.len();
    report.summary.hardcoded_measures = report
        .dependencies
        .iter()
        .filter(|d| d.target_kind == TargetKind::Hardcoded)
        .count();
    report.summary.unused_columns = report
        .symbol_usage
        .iter()
        .filter(|u| u.usage_state == UsageState::Unused)
        .count();

    for diagnostic in model
        .diagnostics
        .iter()
        .cloned()
        .chain(lineage_notes)
        .chain(dependency_notes)
    {
        report.add_diagnostic(diagnostic);
    }

    tracing::info!(
        tables = report.summary.tables,
        columns = report.summary.columns,
        measures = report.summary.measures,
        lineage_rows = report.column_lineage.len(),
        dependency_rows = report.dependencies.len(),
        "report built"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use semaudit_core::{Column, Measure, Table};

    #[test]
    fn missing_root_is_skipped_not_failed() {
        let outcome = audit(Path::new("/no/such/model/definition"), &Config::default()).unwrap();
        match outcome {
            AuditOutcome::Skipped(diag) => assert_eq!(diag.code, DiagnosticCode::MissingRoot),
            AuditOutcome::Completed { .. } => panic!("expected a skipped run"),
        }
    }

    #[test]
    fn summary_counts() {
        let mut model = Model::new();
        model.insert_table(
            Table::new("Sales")
                .with_column(Column::new("Amount"))
                .with_column(Column::new("Unused")),
        );
        model.insert_measure(Measure::new("Total", "SUM(Sales[Amount])", "Sales"));
        model.insert_measure(Measure::new("One", "1", "Sales"));

        let report = build_report(&model, &Config::default());

        assert_eq!(report.summary.tables, 1);
        assert_eq!(report.summary.columns, 2);
        assert_eq!(report.summary.measures, 2);
        assert_eq!(report.summary.hardcoded_measures, 1);
        assert_eq!(report.summary.unused_columns, 1);
        // CALCULATED_TABLE and HARDCODED_MEASURE are info only
        assert_eq!(report.summary.warnings, 0);
        assert_eq!(report.diagnostics.len(), 2);
    }
}
