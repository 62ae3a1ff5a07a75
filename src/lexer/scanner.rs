use super::*;

/// Advance one byte and update line tracking
pub(super) fn bump(lexer: &mut Lexer) -> Option<u8> {
    let curr = lexer.input.get(lexer.offset).copied();
    if let Some(b) = curr {
        lexer.offset += 1;
        if b == b'\n' {
            lexer.line += 1;
            lexer.line_start = lexer.offset;
        }
    }
    curr
}

/// Peek at the current byte without consuming it
pub(super) fn peek_byte(lexer: &Lexer) -> Option<u8> {
    lexer.input.get(lexer.offset).copied()
}

/// Peek one byte past the current one
pub(super) fn peek_second(lexer: &Lexer) -> Option<u8> {
    lexer.input.get(lexer.offset + 1).copied()
}

/// Skip whitespace and comments
pub(super) fn skip_whitespace_and_comments(lexer: &mut Lexer) {
    while let Some(b) = peek_byte(lexer) {
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => {
                bump(lexer);
            }
            b'#' => {
                // Skip comment until end of line
                while let Some(ch) = bump(lexer) {
                    if ch == b'\n' {
                        break;
                    }
                }
            }
            _ => break,
        }
    }
}
