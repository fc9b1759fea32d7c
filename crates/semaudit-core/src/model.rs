//! Tabular model types and the case-insensitive symbol index

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use crate::diagnostic::Diagnostic;

/// A column declared inside a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name (unique within its table only)
    pub name: String,

    /// DAX expression for calculated columns (`column Name = ...`)
    pub expression: Option<String>,
}

impl Column {
    /// Create a plain data column
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: None,
        }
    }

    /// Set the calculated-column expression
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Whether this column is computed by a DAX expression
    pub fn is_calculated(&self) -> bool {
        self.expression.is_some()
    }
}

/// A table with its ordered columns and raw M source expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Declared table name (canonical casing)
    pub name: String,

    /// Ordered list of columns
    pub columns: Vec<Column>,

    /// Raw source expression (empty for calculated / DirectQuery tables)
    pub source: String,
}

impl Table {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            source: String::new(),
        }
    }

    /// Set the source expression
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Add a column
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Get column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Whether the table has a Power Query source expression
    pub fn has_source(&self) -> bool {
        !self.source.trim().is_empty()
    }
}

/// A DAX measure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    /// Measure name (model-global)
    pub name: String,

    /// DAX expression text
    pub expression: String,

    /// Table the measure is declared in
    pub home_table: String,
}

impl Measure {
    pub fn new(
        name: impl Into<String>,
        expression: impl Into<String>,
        home_table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            home_table: home_table.into(),
        }
    }
}

/// Multiplicity on one side of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    /// Parse a `fromCardinality` / `toCardinality` token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "one" => Some(Self::One),
            "many" => Some(Self::Many),
            _ => None,
        }
    }
}

/// Relationship classification as reported in the relationships sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "N:N")]
    ManyToMany,

    #[serde(rename = "1:1")]
    OneToOne,

    #[serde(rename = "1:N")]
    OneToMany,

    #[serde(rename = "N:1")]
    ManyToOne,
}

impl RelationType {
    /// Classify a relationship from its two cardinality tokens.
    ///
    /// A missing `from` side defaults to many and a missing `to` side to one,
    /// so an undecorated relationship is N:1. Unknown tokens fall through to
    /// N:1 as well.
    pub fn from_cardinality(from: Option<&str>, to: Option<&str>) -> Self {
        let from = from.unwrap_or("many");
        let to = to.unwrap_or("one");

        match (Cardinality::from_token(from), Cardinality::from_token(to)) {
            (Some(Cardinality::Many), Some(Cardinality::Many)) => Self::ManyToMany,
            (Some(Cardinality::One), Some(Cardinality::One)) => Self::OneToOne,
            (Some(Cardinality::One), Some(Cardinality::Many)) => Self::OneToMany,
            _ => Self::ManyToOne,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManyToMany => "N:N",
            Self::OneToOne => "1:1",
            Self::OneToMany => "1:N",
            Self::ManyToOne => "N:1",
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A relationship between two table columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub relation_type: RelationType,

    /// Inactive relationships are only used through USERELATIONSHIP
    pub active: bool,
}

/// A model parameter (shared expression holding a literal string)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    /// Literal value without surrounding quotes
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Kind of model object a DAX expression depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    Table,
    Column,
    Measure,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "Table"),
            Self::Column => write!(f, "Column"),
            Self::Measure => write!(f, "Measure"),
        }
    }
}

/// A reference from a formula to a model object.
///
/// Column targets are named `Table[Column]` with the table in canonical casing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub target: String,
    pub kind: DependencyKind,
}

impl DependencyEdge {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            target: name.into(),
            kind: DependencyKind::Table,
        }
    }

    pub fn column(table: &str, column: &str) -> Self {
        Self {
            target: format!("{}[{}]", table, column),
            kind: DependencyKind::Column,
        }
    }

    pub fn measure(name: impl Into<String>) -> Self {
        Self {
            target: name.into(),
            kind: DependencyKind::Measure,
        }
    }
}

/// Name sets handed to collaborators that only need read access to the
/// model's symbols (e.g. a report-usage extractor)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSymbols {
    pub tables: BTreeSet<String>,
    pub columns: BTreeSet<String>,
    pub measures: BTreeSet<String>,
}

/// The parsed tabular model.
///
/// Built once by the TMDL parser and read-only afterwards. Table and measure
/// names are unique under case-insensitive comparison; lookups go through
/// lowercase-keyed indexes that map back to the declared position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Model {
    tables: Vec<Table>,
    measures: Vec<Measure>,

    /// Relationships in file order
    pub relationships: Vec<Relationship>,

    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,

    /// Diagnostics collected while parsing
    pub diagnostics: Vec<Diagnostic>,

    #[serde(skip)]
    table_index: HashMap<String, usize>,

    #[serde(skip)]
    measure_index: HashMap<String, usize>,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table, replacing (in place) any table with the same
    /// case-insensitive name. Returns the replaced table.
    pub fn insert_table(&mut self, table: Table) -> Option<Table> {
        let key = table.name.to_lowercase();
        match self.table_index.get(&key) {
            Some(&idx) => Some(std::mem::replace(&mut self.tables[idx], table)),
            None => {
                self.table_index.insert(key, self.tables.len());
                self.tables.push(table);
                None
            }
        }
    }

    /// Insert a measure, replacing any measure with the same
    /// case-insensitive name. Returns the replaced measure.
    pub fn insert_measure(&mut self, measure: Measure) -> Option<Measure> {
        let key = measure.name.to_lowercase();
        match self.measure_index.get(&key) {
            Some(&idx) => Some(std::mem::replace(&mut self.measures[idx], measure)),
            None => {
                self.measure_index.insert(key, self.measures.len());
                self.measures.push(measure);
                None
            }
        }
    }

    /// Tables in declaration order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Measures in declaration order
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    /// Case-insensitive table lookup
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.table_index
            .get(&name.to_lowercase())
            .map(|&idx| &self.tables[idx])
    }

    /// Case-insensitive measure lookup
    pub fn measure(&self, name: &str) -> Option<&Measure> {
        self.measure_index
            .get(&name.to_lowercase())
            .map(|&idx| &self.measures[idx])
    }

    /// Canonical (declared) casing of a table name
    pub fn canonical_table(&self, name: &str) -> Option<&str> {
        self.table(name).map(|t| t.name.as_str())
    }

    /// Canonical (declared) casing of a measure name
    pub fn canonical_measure(&self, name: &str) -> Option<&str> {
        self.measure(name).map(|m| m.name.as_str())
    }

    /// Look up a parameter by exact name
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Whether the model has no tables (nothing to report)
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of columns across all tables
    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    /// Table, column and measure name sets
    pub fn symbols(&self) -> ModelSymbols {
        let mut symbols = ModelSymbols::default();

        for table in &self.tables {
            symbols.tables.insert(table.name.clone());
            for column in &table.columns {
                symbols.columns.insert(column.name.clone());
            }
        }

        for measure in &self.measures {
            symbols.measures.insert(measure.name.clone());
        }

        symbols
    }
}
