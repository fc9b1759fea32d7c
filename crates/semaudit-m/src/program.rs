//! Step reconstruction for `let ... in` pipelines

use crate::lexer::{Token, TokenKind};

/// Name of the step holding lines that precede the first assignment
pub const START_STEP: &str = "Start";

/// Name of the single step of a source without `let`
pub const DIRECT_QUERY_STEP: &str = "Direct Query";

/// One named step of a transformation pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,

    /// Zero-based position in the pipeline
    pub position: usize,

    /// Right-hand side of the assignment, continuation lines joined by `\n`
    pub expression: String,

    /// Byte range of the step within the resolved text
    pub span: (usize, usize),
}

/// Ordered steps of one table's source expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformationProgram {
    steps: Vec<Step>,

    /// Expression after the closing `in`
    pub output: String,
}

impl TransformationProgram {
    /// Split `text` (with its tokens) into steps
    pub fn parse(text: &str, tokens: &[Token<'_>]) -> Self {
        let Some(let_idx) = tokens.iter().position(|t| t.is_ident("let")) else {
            return Self {
                steps: vec![Step {
                    name: DIRECT_QUERY_STEP.to_string(),
                    position: 0,
                    expression: text.trim().to_string(),
                    span: (0, text.len()),
                }],
                output: String::new(),
            };
        };

        let body_start = tokens[let_idx].end;
        let (body_end, output) = match matching_in(tokens, let_idx) {
            Some(in_idx) => (tokens[in_idx].start, text[tokens[in_idx].end..].trim().to_string()),
            None => (text.len(), String::new()),
        };

        let body_tokens: Vec<Token<'_>> = tokens
            .iter()
            .filter(|t| t.start >= body_start && t.end <= body_end)
            .copied()
            .collect();

        Self {
            steps: split_steps(text, body_start, body_end, &body_tokens),
            output,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step by name; a redefined name resolves to its latest definition
    pub fn get(&self, name: &str) -> Option<&Step> {
        self.steps.iter().rev().find(|s| s.name == name)
    }

    /// Last step, the pipeline output
    pub fn output_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Step whose span contains the byte offset
    pub fn step_at(&self, offset: usize) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| s.span.0 <= offset && offset < s.span.1)
    }
}

/// Index of the `in` closing the `let` at `let_idx`
fn matching_in(tokens: &[Token<'_>], let_idx: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(let_idx + 1) {
        if token.is_ident("let") {
            depth += 1;
        } else if token.is_ident("in") {
            if depth == 0 {
                return Some(idx);
            }
            depth -= 1;
        }
    }
    None
}

/// Nesting change contributed by one token
fn depth_delta(token: &Token<'_>) -> isize {
    match (token.kind, token.text) {
        (TokenKind::Punct, "(" | "[" | "{") | (TokenKind::Ident, "let") => 1,
        (TokenKind::Punct, ")" | "]" | "}") | (TokenKind::Ident, "in") => -1,
        _ => 0,
    }
}

struct OpenStep {
    name: String,
    lines: Vec<String>,
    start: usize,
    end: usize,
}

fn split_steps(text: &str, body_start: usize, body_end: usize, tokens: &[Token<'_>]) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut current: Option<OpenStep> = None;
    let mut depth: isize = 0;
    let mut cursor = 0;

    let mut line_start = body_start;
    for line in text[body_start..body_end].split_inclusive('\n') {
        let line_end = line_start + line.len();

        let first = cursor;
        while cursor < tokens.len() && tokens[cursor].start < line_end {
            cursor += 1;
        }
        let line_tokens = &tokens[first..cursor];

        let trimmed = line.trim();
        if !trimmed.is_empty() {
            let assignment = if depth == 0 { assignment(line_tokens) } else { None };

            match assignment {
                Some((name, rhs_start)) => {
                    if let Some(open) = current.take() {
                        steps.push(finish(open, steps.len()));
                    }
                    let rhs = text[rhs_start..line_end].trim_end().to_string();
                    current = Some(OpenStep {
                        name,
                        lines: vec![rhs],
                        start: line_start,
                        end: line_end,
                    });
                }
                None => {
                    let open = current.get_or_insert_with(|| OpenStep {
                        name: START_STEP.to_string(),
                        lines: Vec::new(),
                        start: line_start,
                        end: line_end,
                    });
                    open.lines.push(line.trim_end().to_string());
                    open.end = line_end;
                }
            }
        }

        depth = (depth + line_tokens.iter().map(depth_delta).sum::<isize>()).max(0);
        line_start = line_end;
    }

    if let Some(open) = current {
        steps.push(finish(open, steps.len()));
    }

    steps
}

/// `name =` or `#"name" =` at the start of a line
fn assignment(line_tokens: &[Token<'_>]) -> Option<(String, usize)> {
    match line_tokens {
        [name, eq, ..] if eq.is_punct("=") => {
            let value = name.name()?;
            Some((value.into_owned(), eq.end))
        }
        _ => None,
    }
}

fn finish(open: OpenStep, position: usize) -> Step {
    let joined = open.lines.join("\n");
    let expression = joined.trim();
    let expression = expression.strip_suffix(',').unwrap_or(expression).trim_end();

    Step {
        name: open.name,
        position,
        expression: expression.to_string(),
        span: (open.start, open.end),
    }
}
