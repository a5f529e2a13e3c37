//! Reference scanner for symbolic patterns.
//!
//! Splits text like `^%{WORD:user} took %{NUMBER >= 10}ms` into literal
//! regex runs and `%{NAME[:ALIAS] [PREDICATE]}` references. The predicate
//! clause runs to the brace that balances the opening `{`, so regex
//! predicates such as `=~ /a{2}/` survive intact.

use super::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece<'a> {
    /// Regex text copied through unchanged.
    Literal(&'a str),
    Reference(Reference<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    pub name: &'a str,
    pub alias: Option<&'a str>,
    /// Trimmed predicate clause; `None` when absent or blank.
    pub predicate: Option<&'a str>,
    /// Byte offset of the `%` that opened the reference.
    pub offset: usize,
}

impl Reference<'_> {
    /// Capture label: the alias when given, otherwise the pattern name.
    pub fn label(&self) -> &str {
        self.alias.unwrap_or(self.name)
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn peek_at(&self, pos: usize) -> Option<u8> {
        self.bytes().get(pos).copied()
    }

    fn is_name_start(ch: u8) -> bool {
        ch.is_ascii_alphabetic() || ch == b'_'
    }

    fn is_name_char(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'_'
    }

    fn read_name(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek_at(self.pos).is_some_and(Self::is_name_char) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn malformed(&self, offset: usize, reason: &'static str) -> CompileError {
        CompileError::MalformedReference {
            pattern: self.input.to_string(),
            offset,
            reason,
        }
    }

    /// True when a reference opens at `pos`: `%{` followed by a name start.
    /// `%{2,3}` stays a regex quantifier.
    fn reference_starts_at(&self, pos: usize) -> bool {
        self.peek_at(pos) == Some(b'%')
            && self.peek_at(pos + 1) == Some(b'{')
            && self.peek_at(pos + 2).is_some_and(Self::is_name_start)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Piece<'a>>, CompileError> {
        let mut pieces = Vec::new();
        let mut literal_start = self.pos;

        while let Some(ch) = self.peek_at(self.pos) {
            if ch == b'\\' {
                // Escaped character: `\%{NAME}` is literal text.
                self.pos = (self.pos + 2).min(self.input.len());
                continue;
            }
            if !self.reference_starts_at(self.pos) {
                self.pos += 1;
                continue;
            }

            if literal_start < self.pos {
                pieces.push(Piece::Literal(&self.input[literal_start..self.pos]));
            }
            pieces.push(Piece::Reference(self.read_reference()?));
            literal_start = self.pos;
        }

        if literal_start < self.input.len() {
            pieces.push(Piece::Literal(&self.input[literal_start..]));
        }
        Ok(pieces)
    }

    fn read_reference(&mut self) -> Result<Reference<'a>, CompileError> {
        let offset = self.pos;
        self.pos += 2; // %{
        let name = self.read_name();

        let alias = if self.peek_at(self.pos) == Some(b':') {
            self.pos += 1;
            if !self.peek_at(self.pos).is_some_and(Self::is_name_start) {
                return Err(self.malformed(offset, "expected an alias after `:`"));
            }
            Some(self.read_name())
        } else {
            None
        };

        let clause_start = self.pos;
        let mut depth = 1usize;
        loop {
            let Some(ch) = self.peek_at(self.pos) else {
                return Err(self.malformed(offset, "missing closing `}`"));
            };
            match ch {
                b'\\' => self.pos += 1,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }

        let clause = self.input[clause_start..self.pos].trim();
        self.pos += 1; // closing }

        Ok(Reference {
            name,
            alias,
            predicate: (!clause.is_empty()).then_some(clause),
            offset,
        })
    }
}

/// Tokenize a symbolic pattern in one call.
pub fn tokenize(input: &str) -> Result<Vec<Piece<'_>>, CompileError> {
    Lexer::new(input).tokenize()
}
