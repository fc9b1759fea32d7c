//! Audit report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{Diagnostic, Severity};
use crate::record::{
    ColumnLineageRecord, DependencyRecord, InventoryRecord, ObjectKind, RelationshipRecord,
    SymbolUsageRecord, VisualUsageRecord,
};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of tables in the model
    pub tables: usize,

    /// Number of columns across all tables
    pub columns: usize,

    /// Number of measures
    pub measures: usize,

    /// Number of relationships
    pub relationships: usize,

    /// Number of measures that reference no model object
    pub hardcoded_measures: usize,

    /// Number of columns not referenced by any measure
    pub unused_columns: usize,

    /// Number of warning diagnostics
    pub warnings: usize,

    /// Number of error diagnostics
    pub errors: usize,
}

/// Model audit report (audit.json v1)
///
/// Each `Vec` is one sheet handed to the reporting sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    pub relationships: Vec<RelationshipRecord>,
    pub column_lineage: Vec<ColumnLineageRecord>,
    pub dependencies: Vec<DependencyRecord>,
    pub symbol_usage: Vec<SymbolUsageRecord>,
    pub inventory: Vec<InventoryRecord>,

    /// Only filled when visual usage was supplied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visual_usage: Vec<VisualUsageRecord>,

    /// Diagnostics collected during the run
    pub diagnostics: Vec<Diagnostic>,
}

impl AuditReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            relationships: Vec::new(),
            column_lineage: Vec::new(),
            dependencies: Vec::new(),
            symbol_usage: Vec::new(),
            inventory: Vec::new(),
            visual_usage: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warn => self.summary.warnings += 1,
            Severity::Info => {}
        }

        self.diagnostics.push(diagnostic);
    }

    /// True when the model had no tables
    pub fn is_empty(&self) -> bool {
        !self
            .inventory
            .iter()
            .any(|record| record.object_kind == ObjectKind::Table)
    }

    /// Sheet names paired with their row counts, in output order
    pub fn sheet_sizes(&self) -> Vec<(&'static str, usize)> {
        let mut sizes = vec![
            ("Relationships", self.relationships.len()),
            ("Column Lineage", self.column_lineage.len()),
            ("Dependencies", self.dependencies.len()),
            ("Column Usage", self.symbol_usage.len()),
            ("Inventory", self.inventory.len()),
        ];

        if !self.visual_usage.is_empty() {
            sizes.push(("Visual Usage", self.visual_usage.len()));
        }

        sizes
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for AuditReport {
    fn default() -> Self {
        Self::new()
    }
}
