use super::*;

/// Scalars that prefix a block in value position, as in `color=rgb { 1 2 3 }`.
const BLOCK_HEADERS: [&[u8]; 4] = [b"rgb", b"hsv", b"hsv360", b"hex"];

pub(super) fn is_block_header(bytes: &[u8]) -> bool {
    BLOCK_HEADERS.contains(&bytes)
}

/// Value of a scalar token, bare or assigned.
pub(super) fn scalar_value(token: Token) -> Value {
    match token {
        Token::Scalar(bytes) => interpret_scalar(bytes),
        Token::Quoted(bytes) => Value::String(Text::new(bytes.into_owned())),
        _ => Value::Array(Vec::new()),
    }
}

/// Types an unquoted scalar. Quoted scalars never go through here and
/// always stay strings.
pub fn interpret_scalar(bytes: &[u8]) -> Value {
    match bytes {
        b"yes" => return Value::Bool(true),
        b"no" => return Value::Bool(false),
        _ => {}
    }

    let digits = bytes.strip_prefix(b"-").unwrap_or(bytes);
    if !digits.is_empty() && digits.iter().all(u8::is_ascii_digit) {
        // ASCII digits are valid UTF-8
        if let Some(n) = std::str::from_utf8(bytes).ok().and_then(|s| s.parse::<i64>().ok()) {
            return Value::Integer(n);
        }
        return Value::String(Text::from(bytes));
    }

    if is_decimal(digits) {
        if let Some(f) = std::str::from_utf8(bytes).ok().and_then(|s| s.parse::<f64>().ok()) {
            return Value::Float(f);
        }
    }

    Value::String(Text::from(bytes))
}

/// `[0-9]*\.[0-9]+` with exactly one dot.
fn is_decimal(bytes: &[u8]) -> bool {
    let Some(dot) = bytes.iter().position(|&b| b == b'.') else {
        return false;
    };
    let (int, frac) = (&bytes[..dot], &bytes[dot + 1..]);
    !frac.is_empty()
        && int.iter().all(u8::is_ascii_digit)
        && frac.iter().all(u8::is_ascii_digit)
}
