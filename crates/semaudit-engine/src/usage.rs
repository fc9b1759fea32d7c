//! Visual usage integration
//!
//! Joins the model inventory with the object names used by report visuals.
//! The names come from an external report extractor, one entry per use, so a
//! field shown in three visuals appears three times.

use std::collections::HashMap;
use semaudit_core::{Model, ObjectKind, VisualUsageRecord};

/// Columns and measures with the number of visuals using each, sorted by
/// table (ascending) then count (descending)
pub fn integrate_visual_usage(model: &Model, used_names: &[String]) -> Vec<VisualUsageRecord> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in used_names {
        *counts.entry(name.as_str()).or_default() += 1;
    }
    let count_of = |name: &str| counts.get(name).copied().unwrap_or(0);

    let mut records = Vec::new();

    for table in model.tables() {
        for column in &table.columns {
            records.push(VisualUsageRecord {
                table: table.name.clone(),
                object_name: column.name.clone(),
                object_kind: ObjectKind::Column,
                location: format!("{}[{}]", table.name, column.name),
                visual_count: count_of(&column.name),
            });
        }
    }

    for measure in model.measures() {
        records.push(VisualUsageRecord {
            table: measure.home_table.clone(),
            object_name: measure.name.clone(),
            object_kind: ObjectKind::Measure,
            location: format!("[{}]", measure.name),
            visual_count: count_of(&measure.name),
        });
    }

    // Stable: ties keep inventory order
    records.sort_by(|a, b| {
        a.table
            .cmp(&b.table)
            .then_with(|| b.visual_count.cmp(&a.visual_count))
    });

    tracing::debug!(
        objects = records.len(),
        used = records.iter().filter(|r| r.visual_count > 0).count(),
        "integrated visual usage"
    );

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use semaudit_core::{Column, Measure, Table};

    #[test]
    fn counts_and_sort_order() {
        let mut model = Model::new();
        model.insert_table(
            Table::new("Sales")
                .with_column(Column::new("Amount"))
                .with_column(Column::new("Region")),
        );
        model.insert_table(Table::new("Calendar").with_column(Column::new("Year")));
        model.insert_measure(Measure::new("Total", "SUM(Sales[Amount])", "Sales"));

        let used: Vec<String> = ["Total", "Region", "Total", "Year", "Unknown"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let records = integrate_visual_usage(&model, &used);
        let rows: Vec<_> = records
            .iter()
            .map(|r| (r.table.as_str(), r.location.as_str(), r.visual_count))
            .collect();

        assert_eq!(
            rows,
            vec![
                ("Calendar", "Calendar[Year]", 1),
                ("Sales", "[Total]", 2),
                ("Sales", "Sales[Region]", 1),
                ("Sales", "Sales[Amount]", 0),
            ]
        );
    }

    #[test]
    fn empty_model_yields_no_rows() {
        assert!(integrate_visual_usage(&Model::new(), &["X".to_string()]).is_empty());
    }
}
