//! Minimal Power Query M tokenizer
//!
//! Good enough to anchor the construct matchers: it knows identifiers
//! (including dotted library names like `Table.AddColumn`), `#"quoted"`
//! identifiers, text literals, simple `[field]` accesses, numbers and
//! punctuation. Comments and whitespace are skipped but every token keeps its
//! byte span so callers can splice the source text.

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `Source`, `Table.AddColumn`, `each`, `#date`
    Ident,

    /// `#"Changed Type"`
    QuotedIdent,

    /// `"text"` (`""` escapes a quote)
    Str,

    /// `[Column Name]` field access without nested syntax
    Field,

    Number,

    /// Operators and delimiters: `(`, `{`, `,`, `=`, `=>`, `<>`, ...
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,

    /// Raw source slice, including quotes/brackets
    pub text: &'a str,

    pub start: usize,
    pub end: usize,
}

impl<'a> Token<'a> {
    /// Unescaped content: identifier name, literal text or field name
    pub fn value(&self) -> Cow<'a, str> {
        match self.kind {
            TokenKind::Str => unescape(strip(self.text, 1)),
            TokenKind::QuotedIdent => unescape(strip(&self.text[1..], 1)),
            TokenKind::Field => Cow::Borrowed(strip(self.text, 1).trim()),
            _ => Cow::Borrowed(self.text),
        }
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    /// A step or variable name, bare or `#"quoted"`
    pub fn name(&self) -> Option<Cow<'a, str>> {
        match self.kind {
            TokenKind::Ident | TokenKind::QuotedIdent => Some(self.value()),
            _ => None,
        }
    }
}

/// Drop `n` delimiter bytes from both ends, tolerating unterminated input
fn strip(text: &str, n: usize) -> &str {
    let inner = text.get(n..).unwrap_or("");
    if text.len() >= 2 * n && (text.ends_with('"') || text.ends_with(']')) {
        inner.get(..inner.len().saturating_sub(n)).unwrap_or(inner)
    } else {
        inner
    }
}

fn unescape(text: &str) -> Cow<'_, str> {
    if text.contains("\"\"") {
        Cow::Owned(text.replace("\"\"", "\""))
    } else {
        Cow::Borrowed(text)
    }
}

const MULTI_CHAR_PUNCT: &[&str] = &["...", "..", "=>", "<>", "<=", ">=", "??"];

/// Characters that turn a `[` into record/list syntax rather than a field access
const NON_FIELD_CHARS: &[char] = &['[', '{', '}', '(', ')', '"', '=', ',', '\n'];

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Tokenize M source text
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(ch) = src[pos..].chars().next() {
        let rest = &src[pos..];

        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }

        if rest.starts_with("//") {
            pos += rest.find('\n').unwrap_or(rest.len());
            continue;
        }

        if rest.starts_with("/*") {
            pos += rest[2..].find("*/").map(|i| i + 4).unwrap_or(rest.len());
            continue;
        }

        let (kind, len) = if rest.starts_with("#\"") {
            (TokenKind::QuotedIdent, 1 + quoted_len(&rest[1..]))
        } else if ch == '"' {
            (TokenKind::Str, quoted_len(rest))
        } else if ch == '[' {
            match field_len(rest) {
                Some(len) => (TokenKind::Field, len),
                None => (TokenKind::Punct, 1),
            }
        } else if is_ident_start(ch) || (ch == '#' && rest[1..].starts_with(is_ident_start)) {
            (TokenKind::Ident, ident_len(rest))
        } else if ch.is_ascii_digit() {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.'))
                .unwrap_or(rest.len());
            (TokenKind::Number, len)
        } else {
            let len = MULTI_CHAR_PUNCT
                .iter()
                .find(|p| rest.starts_with(*p))
                .map(|p| p.len())
                .unwrap_or(ch.len_utf8());
            (TokenKind::Punct, len)
        };

        tokens.push(Token {
            kind,
            text: &rest[..len],
            start: pos,
            end: pos + len,
        });
        pos += len;
    }

    tokens
}

/// Length of a `"..."` literal starting at `text[0]`, honoring `""` escapes
fn quoted_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    text.len()
}

fn field_len(text: &str) -> Option<usize> {
    let close = text[1..].find(|c: char| c == ']' || NON_FIELD_CHARS.contains(&c))?;
    let inner = &text[1..1 + close];
    if text[1 + close..].starts_with(']') && !inner.trim().is_empty() {
        Some(close + 2)
    } else {
        None
    }
}

/// Identifiers may contain dots when the next character starts a new part
fn ident_len(text: &str) -> usize {
    let mut chars = text.char_indices().peekable();
    let mut end = 0;

    if let Some((_, first)) = chars.next() {
        end = first.len_utf8();
    }

    while let Some((idx, ch)) = chars.next() {
        if is_ident_continue(ch) {
            end = idx + ch.len_utf8();
        } else if ch == '.' && matches!(chars.peek(), Some((_, next)) if is_ident_start(*next)) {
            end = idx + 1;
        } else {
            break;
        }
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<(TokenKind, &str)> {
        tokenize(src).into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn dotted_identifiers_and_calls() {
        assert_eq!(
            kinds("Table.AddColumn(Source, \"X\", each [A] * 2)"),
            vec![
                (TokenKind::Ident, "Table.AddColumn"),
                (TokenKind::Punct, "("),
                (TokenKind::Ident, "Source"),
                (TokenKind::Punct, ","),
                (TokenKind::Str, "\"X\""),
                (TokenKind::Punct, ","),
                (TokenKind::Ident, "each"),
                (TokenKind::Field, "[A]"),
                (TokenKind::Punct, "*"),
                (TokenKind::Number, "2"),
                (TokenKind::Punct, ")"),
            ]
        );
    }

    #[test]
    fn quoted_identifiers_and_escapes() {
        let tokens = tokenize("#\"Changed Type\" = \"say \"\"hi\"\"\"");
        assert_eq!(tokens[0].kind, TokenKind::QuotedIdent);
        assert_eq!(tokens[0].value(), "Changed Type");
        assert!(tokens[1].is_punct("="));
        assert_eq!(tokens[2].value(), "say \"hi\"");
    }

    #[test]
    fn comments_are_skipped_but_spans_kept() {
        let src = "a // note\n/* block */ b";
        let tokens = tokenize(src);
        assert_eq!(tokens.len(), 2);
        assert_eq!(&src[tokens[1].start..tokens[1].end], "b");
    }

    #[test]
    fn record_literal_is_not_a_field() {
        let tokens = tokenize("[Name = \"x\"]");
        assert!(tokens[0].is_punct("["));

        let tokens = tokenize("Source{[Item=\"Sales\"]}[Data]");
        let last = tokens.last().unwrap();
        assert_eq!(last.kind, TokenKind::Field);
        assert_eq!(last.value(), "Data");
    }

    #[test]
    fn hash_keywords_and_multi_char_punct() {
        assert_eq!(
            kinds("#date(2020, 1, 1) <> x => y"),
            vec![
                (TokenKind::Ident, "#date"),
                (TokenKind::Punct, "("),
                (TokenKind::Number, "2020"),
                (TokenKind::Punct, ","),
                (TokenKind::Number, "1"),
                (TokenKind::Punct, ","),
                (TokenKind::Number, "1"),
                (TokenKind::Punct, ")"),
                (TokenKind::Punct, "<>"),
                (TokenKind::Ident, "x"),
                (TokenKind::Punct, "=>"),
                (TokenKind::Ident, "y"),
            ]
        );
    }

    #[test]
    fn unterminated_string_runs_to_end() {
        let tokens = tokenize("\"open");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value(), "open");
    }
}
