//! Output records (stable v1)
//!
//! One struct per report sheet. Field order is the column order of the
//! sheet and serialized names are the column headers; both are part of the
//! public API consumed by external sinks.

use serde::{Deserialize, Serialize};

/// Truncate a string to at most `max` characters on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Row of the relationships sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelationshipRecord {
    pub source_table: String,
    pub source_column: String,
    pub dest_column: String,
    pub dest_table: String,

    /// One of `N:N`, `1:1`, `1:N`, `N:1`
    pub relation_type: String,

    /// `Yes` or `No`
    pub active: String,
}

/// Row of the column lineage sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnLineageRecord {
    pub owning_table: String,
    pub column_name: String,
    pub description: String,
    pub origin_path: String,
    pub origin_type: String,

    /// 1-based table position in declaration order, used for color-coding
    pub group_id: usize,
}

/// What a dependency row points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Table,
    Column,
    Measure,

    /// The measure references no model object
    Hardcoded,
}

impl From<crate::model::DependencyKind> for TargetKind {
    fn from(kind: crate::model::DependencyKind) -> Self {
        use crate::model::DependencyKind;

        match kind {
            DependencyKind::Table => Self::Table,
            DependencyKind::Column => Self::Column,
            DependencyKind::Measure => Self::Measure,
        }
    }
}

/// Row of the measure dependency sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DependencyRecord {
    pub measure: String,
    pub home_table: String,
    pub target_name: String,
    pub target_kind: TargetKind,
    pub expression: String,
}

/// Whether a column is referenced by at least one measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageState {
    Used,
    Unused,
}

/// Row of the column usage sheet (one row per using measure)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SymbolUsageRecord {
    pub table: String,
    pub column: String,
    pub usage_state: UsageState,

    /// Empty for unused columns
    pub using_measure: String,
}

/// Kind of object listed in the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Table,
    Column,
    Measure,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "Table"),
            Self::Column => write!(f, "Column"),
            Self::Measure => write!(f, "Measure"),
        }
    }
}

/// Row of the inventory sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InventoryRecord {
    pub owning_table: String,
    pub object_name: String,
    pub object_kind: ObjectKind,
    pub expression: String,
}

/// Row of the visual usage sheet: model objects joined with the number of
/// report visuals that use them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VisualUsageRecord {
    pub table: String,
    pub object_name: String,
    pub object_kind: ObjectKind,

    /// `Table[Column]` for columns, `[Measure]` for measures
    pub location: String,
    pub visual_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("añoñaño", 3), "año");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn relationship_record_headers_in_order() {
        let record = RelationshipRecord {
            source_table: "Sales".to_string(),
            source_column: "DateKey".to_string(),
            dest_column: "DateKey".to_string(),
            dest_table: "Calendar".to_string(),
            relation_type: "N:1".to_string(),
            active: "Yes".to_string(),
        };

        let json = serde_json::to_string(&record).unwrap();
        let source = json.find("SourceTable").unwrap();
        let dest_col = json.find("DestColumn").unwrap();
        let dest_table = json.find("DestTable").unwrap();
        assert!(source < dest_col && dest_col < dest_table);
        assert!(json.contains("\"RelationType\":\"N:1\""));
    }

    #[test]
    fn dependency_record_serializes_kind() {
        let record = DependencyRecord {
            measure: "Total".to_string(),
            home_table: "Sales".to_string(),
            target_name: "Hardcoded".to_string(),
            target_kind: TargetKind::Hardcoded,
            expression: "42".to_string(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"TargetKind\":\"Hardcoded\""));
    }
}
