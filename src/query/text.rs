use std::borrow::Cow;

use super::*;
use crate::lexer::{Lexer, Token};
use crate::utils::decode_text;

/// Raw save text of `section.key`, from the key to the end of its value.
///
/// The entry is located with the lexer over the raw buffer, so the result
/// is byte-for-byte what the file holds, including every repeated field.
/// `None` when the section has no such key.
pub fn entry_text(save: &ParsedSave, section: &str, key: &str) -> Result<Option<String>, SaveError> {
    save.require_section(section)?;
    let Some((start, end)) = locate_entry(save.raw_bytes(), section.as_bytes(), key.as_bytes())? else {
        return Ok(None);
    };
    Ok(Some(decode_text(&save.raw_bytes()[start..end]).into_owned()))
}

/// Byte range of the first `key op value` directly inside a top-level
/// `section={...}` block.
fn locate_entry<'a>(raw: &'a [u8], section: &[u8], key: &[u8]) -> Result<Option<(usize, usize)>, SaveError> {
    let mut lexer = Lexer::new(raw);
    let mut depth = 0usize;
    let mut in_section = false;
    // Last bare scalar seen, a key candidate until an operator follows
    let mut pending: Option<(Cow<'a, [u8]>, usize)> = None;
    // Key whose value comes next
    let mut assigned: Option<(Cow<'a, [u8]>, usize)> = None;

    loop {
        let spanned = lexer.next_token()?;
        match spanned.token {
            Token::Eof => return Ok(None),
            Token::Scalar(_) | Token::Quoted(_) => {
                let bytes = match spanned.token {
                    Token::Scalar(b) => Cow::Borrowed(b),
                    Token::Quoted(b) => b,
                    _ => Cow::Borrowed(&[][..]),
                };
                match assigned.take() {
                    Some((k, start)) if depth == 1 && in_section && *k == *key => {
                        return Ok(Some((start, lexer.offset())));
                    }
                    Some(_) => {}
                    None => pending = Some((bytes, spanned.pos.offset)),
                }
            }
            Token::Operator(_) => assigned = pending.take(),
            Token::Open => {
                let owner = assigned.take();
                pending = None;
                let owner_is = |name: &[u8]| owner.as_ref().is_some_and(|(k, _)| **k == *name);

                if depth == 0 && owner_is(section) {
                    in_section = true;
                } else if depth == 1 && in_section && owner_is(key) {
                    let start = owner.map_or(spanned.pos.offset, |(_, s)| s);
                    return skip_block(&mut lexer).map(|end| Some((start, end)));
                }
                depth += 1;
            }
            Token::Close => {
                pending = None;
                assigned = None;
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    in_section = false;
                }
            }
        }
    }
}

/// Consume tokens up to the `}` matching an already-read `{` and return the
/// offset just past it.
fn skip_block(lexer: &mut Lexer) -> Result<usize, SaveError> {
    let mut depth = 1usize;
    loop {
        let spanned = lexer.next_token()?;
        match spanned.token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth == 0 {
                    return Ok(spanned.pos.offset + 1);
                }
            }
            Token::Eof => return Ok(lexer.offset()),
            _ => {}
        }
    }
}
