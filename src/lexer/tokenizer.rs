use super::*;
use super::scanner::{bump, peek_byte, peek_second, skip_whitespace_and_comments};

pub(super) fn next_token<'a>(lexer: &mut Lexer<'a>) -> Result<Spanned<'a>, SaveError> {
    skip_whitespace_and_comments(lexer);

    let pos = lexer.position();
    let token = match peek_byte(lexer) {
        Some(b'{') => tokenize_symbol(lexer, Token::Open),
        Some(b'}') => tokenize_symbol(lexer, Token::Close),
        Some(b'=') => tokenize_operator(lexer, Operator::Equal, Operator::EqualEqual),
        Some(b'<') => tokenize_operator(lexer, Operator::Less, Operator::LessEqual),
        Some(b'>') => tokenize_operator(lexer, Operator::Greater, Operator::GreaterEqual),
        Some(b'!') if peek_second(lexer) == Some(b'=') => {
            bump(lexer);
            bump(lexer);
            Token::Operator(Operator::NotEqual)
        }
        Some(b'?') if peek_second(lexer) == Some(b'=') => {
            bump(lexer);
            bump(lexer);
            Token::Operator(Operator::Exists)
        }
        Some(b'"') => tokenize_quoted(lexer, pos)?,
        Some(_) => tokenize_scalar(lexer),
        None => Token::Eof,
    };

    Ok(Spanned { token, pos })
}

/// Bytes that end an unquoted scalar.
pub(crate) fn is_delimiter(b: u8, next: Option<u8>) -> bool {
    match b {
        b' ' | b'\t' | b'\r' | b'\n' => true,
        b'{' | b'}' | b'=' | b'"' | b'#' | b'<' | b'>' => true,
        b'!' | b'?' => next == Some(b'='),
        _ => false,
    }
}

fn tokenize_symbol<'a>(lexer: &mut Lexer<'a>, token: Token<'a>) -> Token<'a> {
    bump(lexer);
    token
}

fn tokenize_operator<'a>(lexer: &mut Lexer<'a>, single: Operator, with_eq: Operator) -> Token<'a> {
    bump(lexer);
    if peek_byte(lexer) == Some(b'=') {
        bump(lexer);
        Token::Operator(with_eq)
    } else {
        Token::Operator(single)
    }
}

fn tokenize_scalar<'a>(lexer: &mut Lexer<'a>) -> Token<'a> {
    let start = lexer.offset;
    while let Some(b) = peek_byte(lexer) {
        if is_delimiter(b, peek_second(lexer)) {
            break;
        }
        bump(lexer);
    }
    let input = lexer.input;
    Token::Scalar(&input[start..lexer.offset])
}

fn tokenize_quoted<'a>(lexer: &mut Lexer<'a>, open: Position) -> Result<Token<'a>, SaveError> {
    bump(lexer); // consume opening quote
    let start = lexer.offset;
    let mut escaped = false;

    loop {
        match bump(lexer) {
            Some(b'"') => break,
            Some(b'\\') => {
                escaped = true;
                if bump(lexer).is_none() {
                    return Err(unterminated(lexer, open));
                }
            }
            Some(_) => {}
            None => return Err(unterminated(lexer, open)),
        }
    }

    let input = lexer.input;
    let raw = &input[start..lexer.offset - 1];
    if !escaped {
        return Ok(Token::Quoted(Cow::Borrowed(raw)));
    }
    Ok(Token::Quoted(Cow::Owned(unescape(raw))))
}

/// `\"` and `\\` collapse to one byte; any other backslash pair is kept
/// as written.
fn unescape(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut iter = raw.iter().copied();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match iter.next() {
            Some(next @ (b'"' | b'\\')) => out.push(next),
            Some(other) => {
                out.push(b'\\');
                out.push(other);
            }
            None => out.push(b'\\'),
        }
    }
    out
}

fn unterminated(lexer: &Lexer, open: Position) -> SaveError {
    lexer.error_at(
        open,
        "Unterminated quoted string",
        Some("Every '\"' needs a matching closing quote"),
    )
}
