//! Function-call matching over M tokens
//!
//! Construct matchers are anchored on a library function name followed by
//! `(`. Arguments are split on top-level commas only, so nested lists,
//! records and calls stay inside their argument.

use crate::lexer::{Token, TokenKind};

/// One matched call such as `Table.AddColumn(Source, "X", each [A])`
#[derive(Debug, Clone)]
pub struct Call<'t, 'a> {
    /// Function name as written
    pub name: &'a str,

    /// Byte offset of the function name
    pub start: usize,

    /// Byte offset just past the closing parenthesis (or end of input)
    pub end: usize,

    pub args: Vec<&'t [Token<'a>]>,
}

impl<'t, 'a> Call<'t, 'a> {
    pub fn arg(&self, idx: usize) -> Option<&'t [Token<'a>]> {
        self.args.get(idx).copied()
    }

    /// Value of argument `idx` when it is a single text literal
    pub fn string_arg(&self, idx: usize) -> Option<String> {
        match self.arg(idx)? {
            [token] if token.kind == TokenKind::Str => Some(token.value().into_owned()),
            _ => None,
        }
    }
}

/// Find every call whose function name satisfies `matches`, in source order
pub fn find_calls<'t, 'a>(
    tokens: &'t [Token<'a>],
    matches: impl Fn(&str) -> bool,
) -> Vec<Call<'t, 'a>> {
    let mut calls = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Ident || !matches(token.text) {
            continue;
        }
        if !tokens.get(idx + 1).map_or(false, |t| t.is_punct("(")) {
            continue;
        }

        let (args, end) = split_args(tokens, idx + 2);
        calls.push(Call {
            name: token.text,
            start: token.start,
            end,
            args,
        });
    }

    calls
}

/// Split the argument tokens starting at `open` (just past `(`)
fn split_args<'t, 'a>(tokens: &'t [Token<'a>], open: usize) -> (Vec<&'t [Token<'a>]>, usize) {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut arg_start = open;

    for (idx, token) in tokens.iter().enumerate().skip(open) {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" if depth > 0 => depth -= 1,
            ")" => {
                if idx > arg_start || !args.is_empty() {
                    args.push(&tokens[arg_start..idx]);
                }
                return (args, token.end);
            }
            "," if depth == 0 => {
                args.push(&tokens[arg_start..idx]);
                arg_start = idx + 1;
            }
            _ => {}
        }
    }

    if arg_start < tokens.len() {
        args.push(&tokens[arg_start..]);
    }
    let end = tokens.last().map_or(0, |t| t.end);
    (args, end)
}

/// Source text covered by a token run
pub fn span_text<'a>(src: &'a str, tokens: &[Token<'_>]) -> &'a str {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => &src[first.start..last.end],
        _ => "",
    }
}

/// Text literals of a flat list argument: `{"A", "B"}`
pub fn list_strings(arg: &[Token<'_>]) -> Vec<String> {
    let mut depth = 0usize;
    let mut values = Vec::new();

    for token in arg {
        match token.kind {
            TokenKind::Punct if token.text == "{" => depth += 1,
            TokenKind::Punct if token.text == "}" => depth = depth.saturating_sub(1),
            TokenKind::Str if depth == 1 => values.push(token.value().into_owned()),
            _ => {}
        }
    }

    values
}

/// Two-element text lists anywhere in an argument: `{{"a", "b"}, {"c", "d"}}`
/// or a single `{"a", "b"}`
pub fn list_pairs(arg: &[Token<'_>]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut open = Vec::new();

    for (idx, token) in arg.iter().enumerate() {
        if token.is_punct("{") {
            open.push(idx);
        } else if token.is_punct("}") {
            let Some(start) = open.pop() else {
                continue;
            };
            if let [first, comma, second] = &arg[start + 1..idx] {
                if first.kind == TokenKind::Str && comma.is_punct(",") && second.kind == TokenKind::Str
                {
                    pairs.push((first.value().into_owned(), second.value().into_owned()));
                }
            }
        }
    }

    pairs
}
