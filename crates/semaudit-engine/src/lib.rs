//! SemAudit engine
//!
//! Runs the model parser, the M resolver and the DAX resolver over a model
//! folder and assembles the audit report:
//! - Relationship, column lineage, dependency, usage and inventory sheets
//! - Visual usage integration
//! - JSON and Markdown report sinks

pub mod pipeline;
pub mod sheets;
pub mod usage;
pub mod sink;

pub use pipeline::{audit, build_report, AuditOutcome, EngineError};
pub use usage::integrate_visual_usage;
pub use sink::{JsonSink, MarkdownSink, ReportSink, SinkError};
