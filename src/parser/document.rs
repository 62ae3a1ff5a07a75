use super::*;

/// Items collected while a block is open. The final shape is decided when
/// the block closes, so the input is read exactly once.
enum Block {
    Empty,
    Pairs(Vec<(Text, Value)>),
    Values(Vec<Value>),
    Mixed(Vec<Value>),
}

impl Block {
    fn push_pair(&mut self, key: Text, value: Value) {
        match self {
            Block::Empty => *self = Block::Pairs(vec![(key, value)]),
            Block::Pairs(pairs) => pairs.push((key, value)),
            Block::Values(values) => {
                let mut items = std::mem::take(values);
                items.push(single_entry(key, value));
                *self = Block::Mixed(items);
            }
            Block::Mixed(items) => items.push(single_entry(key, value)),
        }
    }

    fn push_value(&mut self, value: Value) {
        match self {
            Block::Empty => *self = Block::Values(vec![value]),
            Block::Values(values) | Block::Mixed(values) => values.push(value),
            Block::Pairs(pairs) => {
                let mut items: Vec<Value> = std::mem::take(pairs)
                    .into_iter()
                    .map(|(k, v)| single_entry(k, v))
                    .collect();
                items.push(value);
                *self = Block::Mixed(items);
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Block::Empty => Value::Object(Object::new()),
            Block::Pairs(pairs) => Value::Object(Object::from_pairs(pairs)),
            Block::Values(values) | Block::Mixed(values) => Value::Array(values),
        }
    }
}

fn single_entry(key: impl Into<Text>, value: Value) -> Value {
    let key: Text = key.into();
    Value::Object(Object::from_pairs(vec![(key, value)]))
}

/// Where a block's value goes once its `}` is read.
enum Slot {
    /// Bare item of the enclosing block.
    Item,
    /// Right-hand side of `key op`, behind a colour header such as `rgb`
    /// when there was one.
    Assigned {
        key: Text,
        op: Operator,
        header: Option<Text>,
    },
}

struct OpenBlock {
    block: Block,
    open: Position,
    slot: Slot,
}

/// Document body plus every block still open, innermost last.
#[derive(Default)]
struct Builder {
    root: Vec<(Text, Value)>,
    open: Vec<OpenBlock>,
}

impl Builder {
    fn enter(&mut self, parser: &Parser, pos: Position, slot: Slot) -> Result<(), SaveError> {
        if self.open.len() >= MAX_DEPTH {
            return Err(parser.error_at(
                pos,
                format!("Blocks nested deeper than {} levels", MAX_DEPTH),
                None,
            ));
        }
        self.open.push(OpenBlock {
            block: Block::Empty,
            open: pos,
            slot,
        });
        Ok(())
    }

    fn place(&mut self, slot: Slot, value: Value) {
        match slot {
            Slot::Item => {
                if let Some(parent) = self.open.last_mut() {
                    parent.block.push_value(value);
                }
            }
            Slot::Assigned { key, op, header } => {
                let value = match header {
                    Some(header) => single_entry(header, value),
                    None => value,
                };
                // Non-`=` operators wrap the value as `{op: value}`
                let value = match op {
                    Operator::Equal => value,
                    other => single_entry(other.as_str(), value),
                };
                match self.open.last_mut() {
                    Some(parent) => parent.block.push_pair(key, value),
                    None => self.root.push((key, value)),
                }
            }
        }
    }
}

/// Single pass over the token stream. Nesting is tracked on
/// `Builder::open`, never on the call stack.
pub(super) fn parse_document(parser: &mut Parser) -> Result<Object, SaveError> {
    let mut builder = Builder::default();

    loop {
        let next = parser.bump()?;
        match next.token {
            Token::Eof => match builder.open.last() {
                Some(block) => return Err(unclosed(parser, block.open)),
                None => break,
            },
            Token::Close => {
                let Some(closed) = builder.open.pop() else {
                    return Err(parser.error_at(
                        next.pos,
                        "Unexpected '}' at top level",
                        Some("Check for an extra closing brace"),
                    ));
                };
                builder.place(closed.slot, closed.block.finish());
            }
            Token::Open => {
                if builder.open.is_empty() {
                    return Err(parser.error_at(
                        next.pos,
                        "Unexpected '{' at top level",
                        Some("Top-level entries must be key=value pairs"),
                    ));
                }
                builder.enter(parser, next.pos, Slot::Item)?;
            }
            Token::Scalar(_) | Token::Quoted(_) if matches!(parser.peek(), Token::Operator(_)) => {
                let key = key_text(next.token);
                parse_assignment(parser, &mut builder, key)?;
            }
            Token::Scalar(_) | Token::Quoted(_) => match builder.open.last_mut() {
                Some(parent) => parent.block.push_value(value::scalar_value(next.token)),
                None => {
                    return Err(parser.error_at(
                        next.pos,
                        format!("Expected '=' after top-level key '{}'", key_text(next.token)),
                        Some("Top-level entries must be key=value pairs"),
                    ));
                }
            },
            Token::Operator(op) => {
                return Err(missing_key(parser, next.pos, op));
            }
        }
    }

    Ok(Object::from_pairs(builder.root))
}

/// Consume `op value` after `key`. A block value is pushed as open and
/// placed when its `}` arrives.
fn parse_assignment(parser: &mut Parser, builder: &mut Builder, key: Text) -> Result<(), SaveError> {
    let op_token = parser.bump()?;
    let Token::Operator(op) = op_token.token else {
        return Err(SaveError::internal("assignment without operator"));
    };

    let next = parser.bump()?;
    match next.token {
        Token::Open => builder.enter(parser, next.pos, Slot::Assigned { key, op, header: None }),
        Token::Scalar(bytes) if value::is_block_header(bytes) && *parser.peek() == Token::Open => {
            let open = parser.bump()?;
            let header = Some(Text::from(bytes));
            builder.enter(parser, open.pos, Slot::Assigned { key, op, header })
        }
        Token::Scalar(_) | Token::Quoted(_) => {
            let value = value::scalar_value(next.token);
            builder.place(Slot::Assigned { key, op, header: None }, value);
            Ok(())
        }
        Token::Close | Token::Eof | Token::Operator(_) => Err(parser.error_at(
            op_token.pos,
            format!("Expected a value after '{}'", op.as_str()),
            Some("Assignments take the form key=value"),
        )),
    }
}

fn key_text(token: Token) -> Text {
    match token {
        Token::Scalar(bytes) => Text::from(bytes),
        Token::Quoted(bytes) => Text::new(bytes.into_owned()),
        _ => Text::default(),
    }
}

fn unclosed(parser: &Parser, open: Position) -> SaveError {
    parser.error_at(
        open,
        format!("Unclosed '{{' opened at line {}, column {}", open.line, open.column),
        Some("Reached end of input before the matching '}'"),
    )
}

fn missing_key(parser: &Parser, pos: Position, op: Operator) -> SaveError {
    parser.error_at(
        pos,
        format!("Expected a key before '{}'", op.as_str()),
        Some("Assignments take the form key=value"),
    )
}
