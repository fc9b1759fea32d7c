//! Source expression resolution
//!
//! One `resolve` call classifies the origin from the raw text, substitutes
//! parameter references, then rebuilds steps and join bindings from the
//! substituted text. Nothing is cached between calls.

use std::collections::BTreeMap;
use semaudit_core::Parameter;
use crate::calls::{find_calls, span_text};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::origin::{resolve_origin, Origin};
use crate::program::TransformationProgram;
use crate::trace::{self, ColumnTrace};

/// Resolver bound to the model's parameters
#[derive(Debug, Clone, Copy)]
pub struct TransformationResolver<'p> {
    parameters: &'p [Parameter],
}

/// Everything recovered from one table's source expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub origin: Origin,
    pub program: TransformationProgram,

    /// Source text with parameter references replaced by their literals
    pub resolved_text: String,

    /// Nested-join column name -> joined table expression
    pub joins: BTreeMap<String, String>,
}

impl<'p> TransformationResolver<'p> {
    pub fn new(parameters: &'p [Parameter]) -> Self {
        Self { parameters }
    }

    /// Resolve one table's source expression
    pub fn resolve(&self, source: &str) -> ResolvedSource {
        if source.trim().is_empty() {
            return ResolvedSource {
                origin: Origin::calculated(),
                program: TransformationProgram::default(),
                resolved_text: String::new(),
                joins: BTreeMap::new(),
            };
        }

        let raw_tokens = tokenize(source);
        let origin = resolve_origin(&raw_tokens, self.parameters);

        let resolved_text = substitute_parameters(source, &raw_tokens, self.parameters);
        let tokens = tokenize(&resolved_text);
        let program = TransformationProgram::parse(&resolved_text, &tokens);
        let joins = join_bindings(&resolved_text, &tokens);

        tracing::debug!(
            origin = %origin.kind,
            path = %origin.path,
            steps = program.len(),
            joins = joins.len(),
            "resolved source expression"
        );

        ResolvedSource {
            origin,
            program,
            resolved_text,
            joins,
        }
    }
}

impl ResolvedSource {
    /// Trace how `column` was derived
    pub fn trace_column(&self, column: &str) -> ColumnTrace {
        if self.resolved_text.trim().is_empty() {
            return ColumnTrace::internal();
        }

        let tokens = tokenize(&self.resolved_text);
        trace::trace_column(&self.resolved_text, &tokens, &self.program, &self.joins, column)
    }
}

/// Replace parameter references (bare or `#"quoted"`) with quoted literals.
/// Text literals are left untouched.
pub fn substitute_parameters(source: &str, tokens: &[Token<'_>], parameters: &[Parameter]) -> String {
    if parameters.is_empty() {
        return source.to_string();
    }

    let mut out = String::with_capacity(source.len());
    let mut copied = 0;

    for token in tokens {
        if !matches!(token.kind, TokenKind::Ident | TokenKind::QuotedIdent) {
            continue;
        }
        let name = token.value();
        let Some(param) = parameters.iter().find(|p| name == p.name) else {
            continue;
        };

        out.push_str(&source[copied..token.start]);
        out.push('"');
        out.push_str(&param.value.replace('"', "\"\""));
        out.push('"');
        copied = token.end;
    }

    out.push_str(&source[copied..]);
    out
}

/// `Table.NestedJoin(left, {keys}, right, {keys}, "New")` -> `New => right`
fn join_bindings(text: &str, tokens: &[Token<'_>]) -> BTreeMap<String, String> {
    let mut joins = BTreeMap::new();

    for call in find_calls(tokens, |name| name == "Table.NestedJoin") {
        let is_key_list = |idx: usize| {
            call.arg(idx)
                .and_then(|arg| arg.first())
                .map_or(false, |t| t.is_punct("{"))
        };
        if !is_key_list(1) || !is_key_list(3) {
            continue;
        }

        let (Some(right), Some(new_column)) = (call.arg(2), call.string_arg(4)) else {
            continue;
        };

        let table = span_text(text, right).trim().replace("#\"", "").replace('"', "");
        joins.insert(new_column.trim().to_string(), table);
    }

    joins
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::{OriginKind, OriginPath};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_source_is_internal() {
        let resolved = TransformationResolver::new(&[]).resolve("  \n");
        assert_eq!(resolved.origin, Origin::calculated());
        assert!(resolved.program.is_empty());
        assert_eq!(resolved.trace_column("Any"), ColumnTrace::internal());
    }

    #[test]
    fn substitutes_bare_and_quoted_references() {
        let params = vec![Parameter::new("Region", "West"), Parameter::new("Env Name", "p\"rod")];
        let src = r#"Table.SelectRows(Source, each [Region] = Region and [Env] = #"Env Name" and [Tag] = "Region")"#;
        let tokens = tokenize(src);

        assert_eq!(
            substitute_parameters(src, &tokens, &params),
            r#"Table.SelectRows(Source, each [Region] = "West" and [Env] = "p""rod" and [Tag] = "Region")"#
        );
    }

    #[test]
    fn origin_uses_raw_text() {
        let params = vec![Parameter::new("Server", "sql01")];
        let resolved = TransformationResolver::new(&params)
            .resolve("let\n    Source = Sql.Database(Server, \"db\")\nin\n    Source");

        assert_eq!(resolved.origin.kind, OriginKind::SqlDatabase);
        assert_eq!(resolved.origin.path, OriginPath::Parameter("Server".to_string()));
        assert!(resolved.resolved_text.contains("Sql.Database(\"sql01\", \"db\")"));
        assert_eq!(
            resolved.program.get("Source").unwrap().expression,
            "Sql.Database(\"sql01\", \"db\")"
        );
    }

    #[test]
    fn nested_join_bindings() {
        let src = "let\n    Merged = Table.NestedJoin(Sales, {\"CustId\"}, #\"Dim Customer\", {\"Id\"}, \"Cust\", JoinKind.LeftOuter)\nin\n    Merged";
        let resolved = TransformationResolver::new(&[]).resolve(src);

        assert_eq!(resolved.joins.get("Cust").map(String::as_str), Some("Dim Customer"));
    }

    #[test]
    fn join_without_key_lists_is_ignored() {
        let src = "Table.NestedJoin(Sales, Keys, Customers, Keys, \"Cust\")";
        let resolved = TransformationResolver::new(&[]).resolve(src);
        assert!(resolved.joins.is_empty());
    }
}
