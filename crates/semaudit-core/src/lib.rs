//! SemAudit Core
//!
//! Core domain model shared by the TMDL parser, the M resolver and the DAX
//! dependency extractor, plus the stable output records.
//! Never rename diagnostic codes or record fields - they are part of the public API.

pub mod diagnostic;
pub mod model;
pub mod record;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use model::{
    Cardinality, Column, DependencyEdge, DependencyKind, Measure, Model, ModelSymbols,
    Parameter, RelationType, Relationship, Table,
};
pub use record::{
    ColumnLineageRecord, DependencyRecord, InventoryRecord, ObjectKind, RelationshipRecord,
    SymbolUsageRecord, TargetKind, UsageState, VisualUsageRecord, truncate_chars,
};
pub use report::{AuditReport, ReportSummary, ReportVersion};
pub use config::{Config, ConfigError, ReportLimits, TableFilter};
