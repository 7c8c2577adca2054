//! Minimal S-expression reader and writer for KiCad text files.
//!
//! Only what the library tables need: bare atoms, double-quoted strings with
//! backslash escapes, and nested lists. Comments are not part of the format.

use std::fmt;

use thiserror::Error;

/// A parsed S-expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExpr {
    /// Unquoted token such as `lib` or `7`.
    Atom(String),
    /// Double-quoted string, stored unescaped.
    Str(String),
    /// Parenthesised list.
    List(Vec<SExpr>),
}

/// Error returned for malformed input.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("S-expression error at offset {offset}: {message}")]
pub struct SExprError {
    /// Byte offset where the problem was detected.
    pub offset: usize,
    /// Description of what's wrong.
    pub message: String,
}

impl SExprError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl SExpr {
    /// Creates a `(key "value")` pair.
    pub fn pair(key: &str, value: impl Into<String>) -> Self {
        Self::List(vec![Self::Atom(key.to_string()), Self::Str(value.into())])
    }

    /// Returns the text of an atom or string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Atom(s) | Self::Str(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Returns the head atom of a list, e.g. `lib` for `(lib ...)`.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        match self {
            Self::List(items) => match items.first() {
                Some(Self::Atom(a)) => Some(a),
                _ => None,
            },
            _ => None,
        }
    }

    /// For a `(key value)` list, returns the text of `value`.
    #[must_use]
    pub fn value_of(&self) -> Option<&str> {
        match self {
            Self::List(items) if items.len() >= 2 => items[1].as_text(),
            _ => None,
        }
    }

    /// Parses exactly one expression, allowing surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error for unbalanced parentheses, unterminated strings,
    /// empty input or trailing content.
    pub fn parse(text: &str) -> Result<Self, SExprError> {
        let mut parser = Parser {
            bytes: text.as_bytes(),
            text,
            pos: 0,
        };
        parser.skip_ws();
        if parser.at_end() {
            return Err(SExprError::new(0, "empty document"));
        }
        let expr = parser.expr()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(SExprError::new(parser.pos, "unexpected trailing content"));
        }
        Ok(expr)
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(a) => f.write_str(a),
            Self::Str(s) => write_quoted(f, s),
            Self::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

struct Parser<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<SExpr, SExprError> {
        match self.bytes.get(self.pos) {
            None => Err(SExprError::new(self.pos, "unexpected end of input")),
            Some(b'(') => self.list(),
            Some(b')') => Err(SExprError::new(self.pos, "unexpected ')'")),
            Some(b'"') => self.string(),
            Some(_) => Ok(self.atom()),
        }
    }

    fn list(&mut self) -> Result<SExpr, SExprError> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.bytes.get(self.pos) {
                None => return Err(SExprError::new(start, "unclosed '('")),
                Some(b')') => {
                    self.pos += 1;
                    return Ok(SExpr::List(items));
                }
                Some(_) => items.push(self.expr()?),
            }
        }
    }

    fn string(&mut self) -> Result<SExpr, SExprError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.text[self.pos..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(SExpr::Str(out));
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(SExprError::new(start, "unterminated string"))
    }

    fn atom(&mut self) -> SExpr {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() || b == b'(' || b == b')' || b == b'"' {
                break;
            }
            self.pos += 1;
        }
        SExpr::Atom(self.text[start..self.pos].to_string())
    }
}
