//! SemAudit DAX
//!
//! Dependency extraction for measure and calculated-column formulas: which
//! tables, columns and measures an expression references.

pub mod lexer;
pub mod resolver;

pub use resolver::DependencyResolver;
