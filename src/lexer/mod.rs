// Author: Dustin Pilgrim
// License: MIT

use std::borrow::Cow;

use crate::error::SaveError;
use crate::utils::context_snippet;

mod scanner;
mod tokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Exists,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::EqualEqual => "==",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Exists => "?=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    // --- literals ---
    /// Unquoted run such as `yes`, `42`, `2250.03.15` or `trait_adaptive`.
    Scalar(&'a [u8]),
    /// Quoted string, unescaped. Borrowed unless it held an escape.
    Quoted(Cow<'a, [u8]>),

    // --- structure ---
    Open,
    Close,
    Operator(Operator),

    // --- layout ---
    Eof,
}

/// Location of the first byte of a token. `line` and `column` are 1-based,
/// `column` counts bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub pos: Position,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    offset: usize,
    line: usize,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        let offset = if input.starts_with(b"\xEF\xBB\xBF") { 3 } else { 0 };
        Lexer {
            input,
            offset,
            line: 1,
            line_start: offset,
        }
    }

    fn column(&self) -> usize {
        self.offset - self.line_start + 1
    }

    /// Byte offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column(),
        }
    }

    pub fn next_token(&mut self) -> Result<Spanned<'a>, SaveError> {
        tokenizer::next_token(self)
    }

    /// Builds a parse error pointing at `pos`.
    pub fn error_at(&self, pos: Position, message: impl Into<String>, hint: Option<&str>) -> SaveError {
        SaveError::Parse {
            message: message.into(),
            line: pos.line,
            col: pos.column,
            byte_offset: pos.offset,
            context: context_snippet(self.input, pos.offset, 24),
            hint: hint.map(str::to_string),
        }
    }
}
