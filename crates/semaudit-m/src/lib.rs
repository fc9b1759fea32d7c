//! SemAudit M
//!
//! Power Query M analysis for table source expressions. Handles:
//! - Tokenizing M (dotted library names, `#"quoted"` identifiers, text
//!   literals, field access)
//! - Classifying the table origin and extracting its path
//! - Substituting model parameters into the source
//! - Splitting `let ... in` pipelines into named steps
//! - Nested-join bindings and per-column derivation tracing

pub mod lexer;
pub mod calls;
pub mod origin;
pub mod program;
pub mod trace;
pub mod resolver;

pub use origin::{Origin, OriginKind, OriginPath};
pub use program::{Step, TransformationProgram};
pub use resolver::{ResolvedSource, TransformationResolver};
pub use trace::{ColumnTrace, TraceKind};
