//! TMDL model definition parsing
//!
//! This crate handles:
//! - Walking a `definition/` folder of `.tmdl` declaration files
//! - Parsing `relationships.tmdl` into typed relationships
//! - Parsing table files (columns, measures, source expression)
//! - Parsing shared expression files into model parameters

pub mod relationships;
pub mod table;
pub mod expressions;
pub mod parser;

pub use parser::{ModelParser, TmdlError};
pub use relationships::{parse_relationships, split_qualified_ref, RelationshipBlocks};
pub use table::{find_table_name, extract_source, parse_table, LineState, ParsedTable};
pub use expressions::parse_parameters;
