//! Record sheet builders
//!
//! Each builder turns the parsed model into the rows of one output sheet.
//! Row order follows declaration order so the sheets diff cleanly between
//! runs.

use std::collections::{BTreeMap, BTreeSet};
use semaudit_core::{
    truncate_chars, ColumnLineageRecord, DependencyRecord, Diagnostic,
    DiagnosticCode, InventoryRecord, Model, ObjectKind, RelationshipRecord, ReportLimits,
    Severity, SymbolUsageRecord, TableFilter, TargetKind, UsageState,
};
use semaudit_dax::DependencyResolver;
use semaudit_m::{TraceKind, TransformationResolver};

/// Target name of the row emitted for a measure without references
pub const HARDCODED_TARGET: &str = "Hardcoded";

/// Origin type of computed and renamed columns
pub const TRANSFORMATION_ORIGIN: &str = "Transformation (Power Query)";

/// Origin type of expanded columns
pub const EXPAND_ORIGIN: &str = "Join/Expand";

/// Origin path of an expanded column whose join binding is unknown
pub const RELATED_TABLE_PATH: &str = "Related Table";

/// Origin type of columns in tables without source expression
pub const INTERNAL_ORIGIN: &str = "DAX/Internal";

pub fn relationship_records(model: &Model) -> Vec<RelationshipRecord> {
    model
        .relationships
        .iter()
        .map(|rel| RelationshipRecord {
            source_table: rel.from_table.clone(),
            source_column: rel.from_column.clone(),
            dest_column: rel.to_column.clone(),
            dest_table: rel.to_table.clone(),
            relation_type: rel.relation_type.to_string(),
            active: if rel.active { "Yes" } else { "No" }.to_string(),
        })
        .collect()
}

/// Column lineage rows plus a `CALCULATED_TABLE` note per table without source
pub fn column_lineage_records(
    model: &Model,
    filter: &TableFilter,
) -> (Vec<ColumnLineageRecord>, Vec<Diagnostic>) {
    let resolver = TransformationResolver::new(&model.parameters);
    let mut records = Vec::new();
    let mut diagnostics = Vec::new();

    for (idx, table) in model.tables().iter().enumerate() {
        if filter.is_table_skipped(&table.name) {
            tracing::debug!(table = %table.name, "table skipped by filter");
            continue;
        }

        let resolved = resolver.resolve(&table.source);
        let origin_type = resolved.origin.kind.to_string();
        let origin_path = resolved.origin.path.to_string();

        if !table.has_source() {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::CalculatedTable,
                    Severity::Info,
                    format!("Table '{}' has no source expression", table.name),
                )
                .with_subject(table.name.clone()),
            );
        }

        for column in &table.columns {
            let trace = resolved.trace_column(&column.name);

            let (path, kind) = match trace.kind {
                TraceKind::Origin => (origin_path.clone(), origin_type.clone()),
                TraceKind::Transformation => (origin_path.clone(), TRANSFORMATION_ORIGIN.to_string()),
                TraceKind::Expand => (
                    trace
                        .joined_from
                        .clone()
                        .unwrap_or_else(|| RELATED_TABLE_PATH.to_string()),
                    EXPAND_ORIGIN.to_string(),
                ),
                TraceKind::Internal => (origin_path.clone(), INTERNAL_ORIGIN.to_string()),
            };

            records.push(ColumnLineageRecord {
                owning_table: table.name.clone(),
                column_name: column.name.clone(),
                description: trace.description,
                origin_path: path,
                origin_type: kind,
                group_id: idx + 1,
            });
        }
    }

    (records, diagnostics)
}

/// Measure dependency rows, with a `HARDCODED_MEASURE` note per measure that
/// references nothing
pub fn dependency_records(
    model: &Model,
    limits: &ReportLimits,
) -> (Vec<DependencyRecord>, Vec<Diagnostic>) {
    let resolver = DependencyResolver::new(model);
    let mut records = Vec::new();
    let mut diagnostics = Vec::new();

    for measure in model.measures() {
        let edges = resolver.dependencies(&measure.expression);

        if edges.is_empty() {
            records.push(DependencyRecord {
                measure: measure.name.clone(),
                home_table: measure.home_table.clone(),
                target_name: HARDCODED_TARGET.to_string(),
                target_kind: TargetKind::Hardcoded,
                expression: truncate_chars(&measure.expression, limits.hardcoded).to_string(),
            });
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::HardcodedMeasure,
                    Severity::Info,
                    format!("Measure '{}' references no model object", measure.name),
                )
                .with_subject(measure.name.clone()),
            );
            continue;
        }

        let expression = truncate_chars(&measure.expression, limits.expression);
        for edge in edges {
            records.push(DependencyRecord {
                measure: measure.name.clone(),
                home_table: measure.home_table.clone(),
                target_name: edge.target,
                target_kind: edge.kind.into(),
                expression: expression.to_string(),
            });
        }
    }

    (records, diagnostics)
}

/// One row per (column, using measure); unused columns get a single row
pub fn symbol_usage_records(
    model: &Model,
    dependencies: &[DependencyRecord],
    filter: &TableFilter,
) -> Vec<SymbolUsageRecord> {
    let mut users: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for dep in dependencies {
        if dep.target_kind == TargetKind::Column {
            users
                .entry(dep.target_name.as_str())
                .or_default()
                .insert(dep.measure.as_str());
        }
    }

    let mut records = Vec::new();
    for table in model.tables() {
        if filter.is_table_skipped(&table.name) {
            continue;
        }

        for column in &table.columns {
            let full_name = format!("{}[{}]", table.name, column.name);
            match users.get(full_name.as_str()) {
                Some(measures) if !measures.is_empty() => {
                    records.extend(measures.iter().map(|measure| SymbolUsageRecord {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        usage_state: UsageState::Used,
                        using_measure: measure.to_string(),
                    }));
                }
                _ => records.push(SymbolUsageRecord {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    usage_state: UsageState::Unused,
                    using_measure: String::new(),
                }),
            }
        }
    }

    records
}

/// Tables with their columns, then all measures
pub fn inventory_records(model: &Model, limits: &ReportLimits) -> Vec<InventoryRecord> {
    let mut records = Vec::new();

    for table in model.tables() {
        records.push(InventoryRecord {
            owning_table: table.name.clone(),
            object_name: table.name.clone(),
            object_kind: ObjectKind::Table,
            expression: truncate_chars(&table.source, limits.expression).to_string(),
        });

        for column in &table.columns {
            records.push(InventoryRecord {
                owning_table: table.name.clone(),
                object_name: column.name.clone(),
                object_kind: ObjectKind::Column,
                expression: String::new(),
            });
        }
    }

    for measure in model.measures() {
        records.push(InventoryRecord {
            owning_table: measure.home_table.clone(),
            object_name: measure.name.clone(),
            object_kind: ObjectKind::Measure,
            expression: truncate_chars(&measure.expression, limits.expression).to_string(),
        });
    }

    records
}
