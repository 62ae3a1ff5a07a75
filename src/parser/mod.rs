// Author: Dustin Pilgrim
// License: MIT

use crate::ast::{Object, Text, Value};
use crate::error::SaveError;
use crate::lexer::{Lexer, Operator, Position, Spanned, Token};

mod document;
mod value;

pub use value::interpret_scalar;

/// Deepest block nesting accepted. Open blocks live on a heap stack, so the
/// limit bounds memory, not recursion.
pub const MAX_DEPTH: usize = 1024;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peek: Spanned<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a [u8]) -> Result<Self, SaveError> {
        let mut lexer = Lexer::new(input);
        let peek = lexer.next_token()?;
        Ok(Self { lexer, peek })
    }

    /// Take the current token and read the next one. Keeps returning `Eof`
    /// once the input is exhausted.
    pub(crate) fn bump(&mut self) -> Result<Spanned<'a>, SaveError> {
        if self.peek.token == Token::Eof {
            return Ok(self.peek.clone());
        }
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.peek, next))
    }

    pub(crate) fn peek(&self) -> &Token<'a> {
        &self.peek.token
    }

    pub(crate) fn error_at(&self, pos: Position, message: impl Into<String>, hint: Option<&str>) -> SaveError {
        self.lexer.error_at(pos, message, hint)
    }

    /// Parse the whole input as a top-level block of `key=value` pairs.
    pub fn parse_document(&mut self) -> Result<Object, SaveError> {
        document::parse_document(self)
    }
}

/// Parse one save sub-file (gamestate or meta) into its root object.
pub fn parse(input: &[u8]) -> Result<Object, SaveError> {
    Parser::new(input)?.parse_document()
}
