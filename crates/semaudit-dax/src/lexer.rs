//! DAX tokenizer
//!
//! Only the shapes that matter for reference extraction are distinguished:
//! bare identifiers, `'quoted'` table names, `[bracket]` references and text
//! literals. Everything else collapses into `Other`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `Sales`, `SUM`, `STDEV.P`
    Ident(String),

    /// `'Dim Customer'` with `''` unescaped
    Quoted(String),

    /// `[Total Sales]` with `]]` unescaped, content as written
    Bracket(String),

    /// `"text"` with `""` unescaped
    Str(String),

    LParen,

    /// Numbers, operators and other punctuation
    Other(char),
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
                self.advance();
            }

            match (self.peek(), self.peek_next()) {
                (Some('/'), Some('/')) | (Some('-'), Some('-')) => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    while self.peek().is_some() && !(self.peek() == Some('*') && self.peek_next() == Some('/')) {
                        self.advance();
                    }
                    self.pos = (self.pos + 2).min(self.chars.len());
                }
                _ => return,
            }
        }
    }

    /// Read up to `close`, where a doubled `close` is an escaped literal
    fn delimited(&mut self, close: char) -> String {
        let mut out = String::new();
        while let Some(ch) = self.advance() {
            if ch == close {
                if self.peek() == Some(close) {
                    self.advance();
                    out.push(close);
                    continue;
                }
                break;
            }
            out.push(ch);
        }
        out
    }

    fn ident(&mut self, first: char) -> String {
        let mut out = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                out.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        out
    }

    /// Next token and whether whitespace or a comment came before it
    fn next_token(&mut self) -> Option<(Token, bool)> {
        let start = self.pos;
        self.skip_whitespace_and_comments();
        let spaced = self.pos != start;

        let ch = self.advance()?;
        let token = match ch {
            '\'' => Token::Quoted(self.delimited('\'')),
            '[' => Token::Bracket(self.delimited(']')),
            '"' => Token::Str(self.delimited('"')),
            '(' => Token::LParen,
            c if c.is_alphabetic() || c == '_' => Token::Ident(self.ident(c)),
            c if c.is_ascii_digit() => {
                while matches!(self.peek(), Some(d) if d.is_ascii_digit() || d == '.') {
                    self.advance();
                }
                Token::Other(c)
            }
            c => Token::Other(c),
        };
        Some((token, spaced))
    }
}

/// Tokenize a DAX expression, dropping comments and whitespace
pub fn tokenize(input: &str) -> Vec<Token> {
    tokenize_spaced(input).into_iter().map(|(token, _)| token).collect()
}

/// Like [`tokenize`], flagging tokens that were separated from the previous one
pub fn tokenize_spaced(input: &str) -> Vec<(Token, bool)> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(entry) = lexer.next_token() {
        tokens.push(entry);
    }
    tokens
}
