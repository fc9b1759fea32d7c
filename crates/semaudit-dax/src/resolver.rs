//! Reference extraction from DAX expressions

use std::collections::BTreeSet;
use semaudit_core::{DependencyEdge, Model};
use crate::lexer::{tokenize_spaced, Token};

/// Resolves formula references against the model's tables and measures
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'m> {
    model: &'m Model,
}

impl<'m> DependencyResolver<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self { model }
    }

    /// Distinct table, column and measure references in `expression`.
    ///
    /// Names come back in the model's canonical casing. Unknown names are
    /// ignored, and a `Table[Name]` whose bracket also names a measure yields
    /// both edges. Only a bare `Sales[Col]` with the bracket attached hides
    /// the table edge; `'Sales'[Col]` and `Sales [Col]` yield it as well.
    pub fn dependencies(&self, expression: &str) -> BTreeSet<DependencyEdge> {
        let tokens = tokenize_spaced(expression);
        let mut edges = BTreeSet::new();

        for (idx, (token, _)) in tokens.iter().enumerate() {
            match token {
                Token::Ident(name) | Token::Quoted(name) => {
                    let Some(table) = self.model.canonical_table(name.trim()) else {
                        continue;
                    };
                    let bare = matches!(token, Token::Ident(_));

                    match tokens.get(idx + 1) {
                        Some((Token::Bracket(column), spaced)) => {
                            edges.insert(DependencyEdge::column(table, column.trim()));
                            if !bare || *spaced {
                                edges.insert(DependencyEdge::table(table));
                            }
                        }
                        // `Sales(` is a function call, not the table
                        Some((Token::LParen, _)) if bare => {}
                        _ => {
                            edges.insert(DependencyEdge::table(table));
                        }
                    }
                }
                Token::Bracket(name) => {
                    if let Some(measure) = self.model.canonical_measure(name.trim()) {
                        edges.insert(DependencyEdge::measure(measure));
                    }
                }
                _ => {}
            }
        }

        tracing::trace!(count = edges.len(), "resolved expression dependencies");
        edges
    }
}
