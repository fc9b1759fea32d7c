//! Per-column derivation tracing
//!
//! Precedence is fixed: an expand beats a computed column, which beats a
//! rename. Anything else was loaded as-is from the origin.

use std::collections::BTreeMap;
use semaudit_core::truncate_chars;
use crate::calls::{find_calls, list_pairs, list_strings, span_text, Call};
use crate::lexer::{Token, TokenKind};
use crate::program::TransformationProgram;

/// Longest computed-column expression kept in a trace description
pub const COMPUTED_EXPRESSION_LIMIT: usize = 100;

/// How a column came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceKind {
    /// Produced by `Table.ExpandTableColumn`
    Expand,

    /// Computed by `Table.AddColumn` or renamed by `Table.RenameColumns`
    Transformation,

    /// Loaded unchanged from the table origin
    Origin,

    /// Table has no source expression (calculated column or static table)
    Internal,
}

/// Result of tracing one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTrace {
    pub description: String,
    pub kind: TraceKind,

    /// Table the column was joined from, for expands with a known binding
    pub joined_from: Option<String>,

    /// Step containing the matched construct
    pub step: Option<String>,
}

impl ColumnTrace {
    pub fn loaded_from_source() -> Self {
        Self {
            description: "Loaded from Source".to_string(),
            kind: TraceKind::Origin,
            joined_from: None,
            step: None,
        }
    }

    pub fn internal() -> Self {
        Self {
            description: "Calculated Column or Static".to_string(),
            kind: TraceKind::Internal,
            joined_from: None,
            step: None,
        }
    }
}

/// Trace `column` through already-substituted source text
pub(crate) fn trace_column(
    text: &str,
    tokens: &[Token<'_>],
    program: &TransformationProgram,
    joins: &BTreeMap<String, String>,
    column: &str,
) -> ColumnTrace {
    let step_of = |call: &Call<'_, '_>| program.step_at(call.start).map(|s| s.name.clone());

    for call in find_calls(tokens, |name| name == "Table.ExpandTableColumn") {
        let Some(bridge) = call.string_arg(1) else {
            continue;
        };

        let renamed = call.arg(3).map(list_strings).unwrap_or_default();
        let names = if renamed.is_empty() {
            call.arg(2).map(list_strings).unwrap_or_default()
        } else {
            renamed
        };

        if names.iter().any(|n| n == column) {
            let step = step_of(&call);
            return match joins.get(&bridge) {
                Some(table) => ColumnTrace {
                    description: format!("Expanded from {}", table),
                    kind: TraceKind::Expand,
                    joined_from: Some(table.clone()),
                    step,
                },
                None => ColumnTrace {
                    description: format!("Expanded from column {}", bridge),
                    kind: TraceKind::Expand,
                    joined_from: None,
                    step,
                },
            };
        }
    }

    for call in find_calls(tokens, |name| name == "Table.AddColumn") {
        let matches = call
            .string_arg(1)
            .map_or(false, |name| name.to_lowercase() == column.to_lowercase());
        if !matches {
            continue;
        }

        let expression = call
            .arg(2)
            .map(|arg| computed_expression(text, arg))
            .unwrap_or_default();

        return ColumnTrace {
            description: format!("Calculated (M): {}", expression),
            kind: TraceKind::Transformation,
            joined_from: None,
            step: step_of(&call),
        };
    }

    for call in find_calls(tokens, |name| name == "Table.RenameColumns") {
        let pairs = call.arg(1).map(list_pairs).unwrap_or_default();
        if let Some((old, _)) = pairs.into_iter().find(|(_, new)| new == column) {
            return ColumnTrace {
                description: format!("Renamed from [{}]", old),
                kind: TraceKind::Transformation,
                joined_from: None,
                step: step_of(&call),
            };
        }
    }

    ColumnTrace::loaded_from_source()
}

/// Generator expression without `each`, on one line, capped for display
fn computed_expression(text: &str, arg: &[Token<'_>]) -> String {
    let arg = match arg {
        [first, rest @ ..] if first.kind == TokenKind::Ident && first.text == "each" => rest,
        _ => arg,
    };

    let flat = span_text(text, arg).split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated = truncate_chars(&flat, COMPUTED_EXPRESSION_LIMIT);
    if truncated.len() < flat.len() {
        format!("{}...", truncated)
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn trace(src: &str, joins: &[(&str, &str)], column: &str) -> ColumnTrace {
        let tokens = tokenize(src);
        let program = TransformationProgram::parse(src, &tokens);
        let joins = joins
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        trace_column(src, &tokens, &program, &joins, column)
    }

    #[test]
    fn computed_column_drops_each() {
        let src = "let\n    Source = X,\n    Added = Table.AddColumn(Source, \"Margin\", each [Price]   -\n        [Cost], type number)\nin\n    Added";
        let trace = trace(src, &[], "margin");

        assert_eq!(trace.description, "Calculated (M): [Price] - [Cost]");
        assert_eq!(trace.kind, TraceKind::Transformation);
        assert_eq!(trace.step.as_deref(), Some("Added"));
    }

    #[test]
    fn long_computed_expression_is_truncated() {
        let body = "1 + ".repeat(40);
        let src = format!("Table.AddColumn(Source, \"X\", each {}1)", body);
        let trace = trace(&src, &[], "X");

        let expr = trace.description.strip_prefix("Calculated (M): ").unwrap();
        assert!(expr.ends_with("..."));
        assert_eq!(expr.chars().count(), COMPUTED_EXPRESSION_LIMIT + 3);
    }

    #[test]
    fn rename_reports_old_name() {
        let src = r#"Table.RenameColumns(Source, {{"cust_nm", "Customer"}, {"amt", "Amount"}})"#;
        assert_eq!(trace(src, &[], "Amount").description, "Renamed from [amt]");
        assert_eq!(trace(src, &[], "amt").kind, TraceKind::Origin);
    }

    #[test]
    fn expand_uses_join_binding() {
        let src = r#"Table.ExpandTableColumn(Merged, "Cust", {"Name", "Region"}, {"Customer Name", "Region"})"#;

        let bound = trace(src, &[("Cust", "Customers")], "Customer Name");
        assert_eq!(bound.description, "Expanded from Customers");
        assert_eq!(bound.joined_from.as_deref(), Some("Customers"));

        let unbound = trace(src, &[], "Region");
        assert_eq!(unbound.description, "Expanded from column Cust");
        assert_eq!(unbound.joined_from, None);

        // Only the new names count when they are given
        assert_eq!(trace(src, &[], "Name").kind, TraceKind::Origin);
    }

    #[test]
    fn expand_without_new_names_uses_source_list() {
        let src = r#"Table.ExpandTableColumn(Merged, "Cust", {"Name"})"#;
        assert_eq!(trace(src, &[], "Name").kind, TraceKind::Expand);
    }

    #[test]
    fn precedence_expand_then_computed_then_renamed() {
        let src = r#"let
    A = Table.RenameColumns(Source, {{"old", "X"}}),
    B = Table.AddColumn(A, "X", each 1),
    C = Table.ExpandTableColumn(B, "J", {"X"})
in
    C"#;
        assert_eq!(trace(src, &[], "X").kind, TraceKind::Expand);

        let src = r#"let
    A = Table.RenameColumns(Source, {{"old", "X"}}),
    B = Table.AddColumn(A, "X", each 1)
in
    B"#;
        assert_eq!(trace(src, &[], "X").description, "Calculated (M): 1");
    }

    #[test]
    fn computed_wins_over_rename_in_one_step() {
        let src = r#"let
    A = Table.RenameColumns(Table.AddColumn(Source, "X", each 1), {{"old", "X"}})
in
    A"#;
        let trace = trace(src, &[], "X");
        assert_eq!(trace.description, "Calculated (M): 1");
        assert_eq!(trace.step.as_deref(), Some("A"));
    }

    #[test]
    fn computed_name_matches_without_case() {
        let src = r#"Table.AddColumn(Source, "Año", each 2024)"#;
        assert_eq!(trace(src, &[], "AÑO").description, "Calculated (M): 2024");
    }

    #[test]
    fn untouched_column_is_loaded_from_source() {
        let trace = trace("Sql.Database(\"s\", \"d\")", &[], "Amount");
        assert_eq!(trace, ColumnTrace::loaded_from_source());
    }
}
