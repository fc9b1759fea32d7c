//! Table declaration files
//!
//! A table file starts with `table <name>` (possibly after `///` description
//! lines) and declares columns, measures, hierarchies, partitions and
//! annotations as indented blocks. Columns and measures are collected with an
//! explicit line state machine; the Power Query source is cut out of the raw
//! text separately.

use regex::Regex;
use semaudit_core::{Column, Measure, Table};
use std::sync::LazyLock;
use crate::relationships::clean_identifier;

/// How many non-empty lines are searched for the `table` declaration
pub const TABLE_LOOKAHEAD: usize = 20;

/// Section markers that end a table-level `source =` expression.
/// Order is irrelevant (the earliest occurrence wins) but the set is fixed.
const SECTION_MARKERS: &[&str] = &[
    "\n\tcolumn",
    "\n\tmeasure",
    "\n\tpartition",
    "\n\thierarchy",
    "\n\tannotation",
];

static SOURCE_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\ssource\s*=\s*").expect("valid regex"));

/// Line scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    /// Between declarations, or inside a block whose lines are ignored
    Outside,

    /// Inside a column block; `open` when the column has a DAX expression
    InColumn { open: bool },

    /// Inside a measure block, accumulating its expression
    InMeasure,
}

/// Classification of a single trimmed line, keyed on its leading token
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind<'a> {
    Column(&'a str),
    Measure(&'a str),
    SectionBreak,
    Property,
    Text(&'a str),
}

/// What the state machine does with a line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action<'a> {
    OpenColumn(&'a str),
    OpenMeasure(&'a str),
    Append(&'a str),
    Ignore,
}

/// Keywords that close the open block without starting a column or measure
const SECTION_BREAKS: &[&str] = &["partition", "hierarchy", "annotation"];

fn keyword_rest<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

fn classify(line: &str) -> LineKind<'_> {
    if let Some(rest) = keyword_rest(line, "column") {
        return LineKind::Column(rest);
    }
    if let Some(rest) = keyword_rest(line, "measure") {
        return LineKind::Measure(rest);
    }
    if SECTION_BREAKS.iter().any(|kw| keyword_rest(line, kw).is_some()) {
        return LineKind::SectionBreak;
    }
    // `formatString: 0.00`, `lineageTag: ...`, `/// description`
    if line.starts_with("///") || (line.contains(':') && !line.contains('=')) {
        return LineKind::Property;
    }
    LineKind::Text(line)
}

/// Transition table: (state, line kind) -> (next state, action)
fn transition<'a>(state: LineState, kind: LineKind<'a>) -> (LineState, Action<'a>) {
    match (state, kind) {
        (_, LineKind::Column(rest)) => {
            let open = split_declaration(rest).1.is_some();
            (LineState::InColumn { open }, Action::OpenColumn(rest))
        }
        (_, LineKind::Measure(rest)) => (LineState::InMeasure, Action::OpenMeasure(rest)),
        (_, LineKind::SectionBreak) => (LineState::Outside, Action::Ignore),
        (state, LineKind::Property) => (state, Action::Ignore),
        (LineState::InMeasure, LineKind::Text(text)) => (LineState::InMeasure, Action::Append(text)),
        (LineState::InColumn { open: true }, LineKind::Text(text)) => {
            (LineState::InColumn { open: true }, Action::Append(text))
        }
        (state, LineKind::Text(_)) => (state, Action::Ignore),
    }
}

/// Split `Name = expression` at the first `=` outside quotes.
///
/// Column lines may also carry an inline `dataType:` suffix which is dropped.
fn split_declaration(rest: &str) -> (String, Option<String>) {
    let mut in_quotes = false;
    let mut eq = None;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '\'' | '"' => in_quotes = !in_quotes,
            '=' if !in_quotes => {
                eq = Some(idx);
                break;
            }
            _ => {}
        }
    }

    let (name, expression) = match eq {
        Some(idx) => (&rest[..idx], Some(rest[idx + 1..].trim().to_string())),
        None => (rest, None),
    };

    let name = name.split("dataType:").next().unwrap_or(name);
    (clean_identifier(name), expression)
}

/// Remove code fences and surrounding whitespace from an expression
fn clean_expression(expression: &str) -> String {
    expression.replace("```", "").trim().to_string()
}

/// Find the declared table name within the first [`TABLE_LOOKAHEAD`]
/// non-empty lines
pub fn find_table_name(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(TABLE_LOOKAHEAD)
        .filter_map(|line| keyword_rest(line, "table"))
        // `table = ...` is an M step named table, not a declaration
        .filter(|rest| !rest.trim_start().starts_with('='))
        .map(clean_identifier)
        .find(|name| !name.is_empty())
}

/// Extract the table-level `source = ...` expression.
///
/// The text runs to the earliest section marker; code fences are stripped.
/// Returns an empty string when the table has no source.
pub fn extract_source(content: &str) -> String {
    let Some(assignment) = SOURCE_ASSIGNMENT.find(content) else {
        return String::new();
    };

    let raw = &content[assignment.end()..];
    let end = SECTION_MARKERS
        .iter()
        .filter_map(|marker| raw.find(marker))
        .min()
        .unwrap_or(raw.len());

    raw[..end].trim().replace("```", "").trim().to_string()
}

/// A parsed table file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub table: Table,

    /// Measures declared in the table, in file order
    pub measures: Vec<Measure>,
}

#[derive(Debug)]
enum OpenBlock {
    Column(usize),
    Measure(usize),
}

/// Parse a table file whose declaration is `table_name`
pub fn parse_table(table_name: &str, content: &str) -> ParsedTable {
    let mut table = Table::new(table_name).with_source(extract_source(content));
    let mut measures: Vec<Measure> = Vec::new();

    let mut state = LineState::Outside;
    let mut open: Option<OpenBlock> = None;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (next, action) = transition(state, classify(line));

        match action {
            Action::OpenColumn(rest) => {
                let (name, expression) = split_declaration(rest);
                let mut column = Column::new(name);
                column.expression = expression;
                table.columns.push(column);
                open = Some(OpenBlock::Column(table.columns.len() - 1));
            }
            Action::OpenMeasure(rest) => {
                let (name, expression) = split_declaration(rest);
                measures.push(Measure::new(name, expression.unwrap_or_default(), table_name));
                open = Some(OpenBlock::Measure(measures.len() - 1));
            }
            Action::Append(text) => {
                let target = match open {
                    Some(OpenBlock::Measure(idx)) => Some(&mut measures[idx].expression),
                    Some(OpenBlock::Column(idx)) => table.columns[idx].expression.as_mut(),
                    None => None,
                };
                if let Some(expression) = target {
                    expression.push(' ');
                    expression.push_str(text);
                }
            }
            Action::Ignore => {}
        }

        if next == LineState::Outside {
            open = None;
        }
        state = next;
    }

    for measure in &mut measures {
        measure.expression = clean_expression(&measure.expression);
    }
    for column in &mut table.columns {
        if let Some(expression) = column.expression.as_mut() {
            *expression = clean_expression(expression);
        }
    }

    ParsedTable { table, measures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SALES: &str = "\
/// Fact table
table Sales
\tlineageTag: 2f1d

\tmeasure 'Total Sales' =
\t\t\tSUMX(
\t\t\t\tSales,
\t\t\t\tSales[Amount] * Sales[Qty]
\t\t\t)
\t\tformatString: #,0.00
\t\tlineageTag: 99aa

\tmeasure Orders = COUNTROWS(Sales)

\tcolumn Amount
\t\tdataType: decimal
\t\tsummarizeBy: sum

\tcolumn 'Order Date'
\t\tdataType: dateTime

\tcolumn Margin = Sales[Amount] - Sales[Cost]
\t\tdataType: decimal

\tpartition Sales = m
\t\tmode: import
\t\tsource =
\t\t\t\tlet
\t\t\t\t    Source = Sql.Database(\"srv\", \"db\")
\t\t\t\tin
\t\t\t\t    Source

\tannotation PBI_ResultType = Table
";

    #[test]
    fn finds_table_after_description_lines() {
        assert_eq!(find_table_name(SALES), Some("Sales".to_string()));
        assert_eq!(find_table_name("table 'Sales Data'\n"), Some("Sales Data".to_string()));
        assert_eq!(find_table_name("expression X = \"a\""), None);
        assert_eq!(find_table_name("tablespace x"), None);
    }

    #[test]
    fn step_named_table_is_not_a_declaration() {
        let content = "expression Query =\n\t\tlet\n\t\t\ttable = 1\n\t\tin\n\t\t\ttable\n";
        assert_eq!(find_table_name(content), None);

        let content = "\t\ttable = 1\ntable Sales\n";
        assert_eq!(find_table_name(content), Some("Sales".to_string()));
    }

    #[test]
    fn table_declaration_must_be_within_lookahead() {
        let mut content = String::new();
        for i in 0..TABLE_LOOKAHEAD {
            content.push_str(&format!("/// line {}\n\n", i));
        }
        content.push_str("table Late\n");
        assert_eq!(find_table_name(&content), None);
    }

    #[test]
    fn columns_in_declaration_order() {
        let parsed = parse_table("Sales", SALES);
        assert_eq!(parsed.table.column_names(), vec!["Amount", "Order Date", "Margin"]);
        assert!(!parsed.table.columns[0].is_calculated());
        assert_eq!(
            parsed.table.columns[2].expression.as_deref(),
            Some("Sales[Amount] - Sales[Cost]")
        );
    }

    #[test]
    fn multiline_measure_is_concatenated() {
        let parsed = parse_table("Sales", SALES);
        assert_eq!(parsed.measures.len(), 2);

        let total = &parsed.measures[0];
        assert_eq!(total.name, "Total Sales");
        assert_eq!(total.home_table, "Sales");
        assert_eq!(total.expression, "SUMX( Sales, Sales[Amount] * Sales[Qty] )");

        let orders = &parsed.measures[1];
        assert_eq!(orders.expression, "COUNTROWS(Sales)");
    }

    #[test]
    fn partition_source_is_extracted() {
        let parsed = parse_table("Sales", SALES);
        assert!(parsed.table.source.starts_with("let"));
        assert!(parsed.table.source.contains("Sql.Database(\"srv\", \"db\")"));
        assert!(!parsed.table.source.contains("annotation"));
    }

    #[test]
    fn source_stops_at_earliest_marker_and_drops_fences() {
        let content = "table T\n\tsource = ```\n\t\tlet x = 1 in x\n\t\t```\n\tcolumn A\n\tmeasure M = 1\n";
        assert_eq!(extract_source(content), "let x = 1 in x");
        assert_eq!(extract_source("table T\n\tcolumn A\n"), "");
    }

    #[test]
    fn annotation_closes_open_measure() {
        let content = "\
table T
\tmeasure M = 1 +
\t\t\t2
\t\tannotation PBI_FormatHint = {\"isGeneralNumber\":true}
\t\t\tthis line is not part of the measure
";
        let parsed = parse_table("T", content);
        assert_eq!(parsed.measures[0].expression, "1 + 2");
    }

    #[test]
    fn fenced_measure_expression() {
        let content = "table T\n\tmeasure M = ```\n\t\t\tVAR x = 1\n\t\t\tRETURN x\n\t\t\t```\n";
        let parsed = parse_table("T", content);
        assert_eq!(parsed.measures[0].expression, "VAR x = 1 RETURN x");
    }

    #[test]
    fn transitions_are_keyed_on_leading_token() {
        let (state, _) = transition(LineState::InMeasure, classify("hierarchy Dates"));
        assert_eq!(state, LineState::Outside);

        let (state, _) = transition(LineState::Outside, classify("column A"));
        assert_eq!(state, LineState::InColumn { open: false });

        let (state, action) = transition(LineState::InColumn { open: false }, classify("x + 1"));
        assert_eq!(state, LineState::InColumn { open: false });
        assert_eq!(action, Action::Ignore);

        let (_, action) = transition(LineState::InMeasure, classify("formatString: 0.0"));
        assert_eq!(action, Action::Ignore);
    }
}
