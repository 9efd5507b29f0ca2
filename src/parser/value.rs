use super::*;
use super::document::{Context, parse_node, prepend_comments};
use crate::ast::{Number, Tag};

/// Parse a value that starts on the current line: a tag, a scalar, a flow
/// collection or a block scalar.
pub(super) fn parse_inline(parser: &mut Parser, indent: usize, ctx: Context) -> Result<Node, CompileError> {
    if let Token::Tag(_) = parser.peek_token() {
        return parse_tagged(parser, indent, ctx);
    }

    let lexeme = parser.bump()?;
    let mut node = match lexeme.token {
        Token::Plain(s) => Node::new(resolve_plain(&s)),
        Token::Quoted(s) | Token::Block(s) => Node::string(s),
        Token::LBrace => parse_flow_mapping(parser)?,
        Token::LBracket => parse_flow_sequence(parser)?,
        ref other => {
            let message = format!("unexpected {} in value position", other.describe());
            return Err(parser.error_at(&lexeme, message));
        }
    };

    node.comments.trailing = parser.take_trailing_comment()?;
    expect_line_end(parser)?;
    Ok(node)
}

fn parse_tagged(parser: &mut Parser, indent: usize, ctx: Context) -> Result<Node, CompileError> {
    let lexeme = parser.bump()?;
    let tag = match &lexeme.token {
        Token::Tag(name) => Tag::from_name(name),
        _ => return Err(parser.error_at(&lexeme, "expected a tag")),
    };

    let mut payload = parse_node(parser, indent, ctx)?;
    check_tag_payload(parser, &lexeme, &tag, &payload)?;

    // the line's end-of-line comment belongs to the tagged node, not its payload
    let trailing = payload.comments.trailing.take();
    let leading = std::mem::take(&mut payload.comments.leading);
    let mut node = Node::tagged(tag, payload);
    node.comments.trailing = trailing;
    node.comments.leading = leading;
    Ok(node)
}

fn check_tag_payload(parser: &Parser, lexeme: &Lexeme, tag: &Tag, payload: &Node) -> Result<(), CompileError> {
    tag.check_payload(&payload.value).map_err(|expected| {
        let message = format!(
            "`{}` expects {}, found {}",
            tag,
            expected,
            payload.value.kind()
        );
        parser.error_at(lexeme, message)
    })
}

/// After a complete value only a newline (or the end of the document) may
/// follow on the same line.
fn expect_line_end(parser: &Parser) -> Result<(), CompileError> {
    match parser.peek_token() {
        Token::Newline | Token::Eof | Token::DocumentEnd => Ok(()),
        _ => Err(parser.unexpected("after value")),
    }
}

/// Resolve a plain scalar with the YAML 1.2 core schema.
pub(crate) fn resolve_plain(text: &str) -> Value {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => Value::Null,
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => match Number::parse(text) {
            Some(n) => Value::Number(n),
            None => Value::String(text.to_string()),
        },
    }
}

fn parse_flow_mapping(parser: &mut Parser) -> Result<Node, CompileError> {
    let mut entries: Vec<(String, Node)> = Vec::new();

    loop {
        take_flow_comments(parser, entries.last_mut().map(|(_, node)| node))?;
        if let Token::RBrace = parser.peek_token() {
            parser.bump()?;
            break;
        }

        let mut leading = parser.take_pending_comments();
        let key_lexeme = parser.bump()?;
        let key = match &key_lexeme.token {
            Token::Plain(s) | Token::Quoted(s) => s.clone(),
            other => {
                let message = format!("expected a mapping key, found {}", other.describe());
                return Err(parser.error_at(&key_lexeme, message));
            }
        };

        match parser.peek_token() {
            Token::Colon => {
                parser.bump()?;
            }
            _ => return Err(parser.unexpected("after flow mapping key (expected ':')")),
        }

        if entries.iter().any(|(k, _)| *k == key) {
            return Err(parser.error_at(&key_lexeme, format!("duplicate mapping key `{}`", key)));
        }

        take_flow_comments(parser, None)?;
        leading.append(&mut parser.take_pending_comments());
        let mut value = match parser.peek_token() {
            Token::Comma | Token::RBrace => Node::null(),
            _ => parse_flow_value(parser)?,
        };
        take_flow_comments(parser, Some(&mut value))?;
        prepend_comments(&mut value, leading);
        entries.push((key, value));

        match parser.peek_token() {
            Token::Comma => {
                parser.bump()?;
            }
            Token::RBrace => {}
            _ => return Err(parser.unexpected("in flow mapping (expected ',' or '}')")),
        }
    }

    let mut leftover = parser.take_pending_comments();
    attach_closing_comment(&mut leftover, entries.last_mut().map(|(_, node)| node));
    let mut node = Node::mapping(entries);
    node.comments.leading = leftover;
    Ok(node)
}

fn parse_flow_sequence(parser: &mut Parser) -> Result<Node, CompileError> {
    let mut items: Vec<Node> = Vec::new();

    loop {
        take_flow_comments(parser, items.last_mut())?;
        if let Token::RBracket = parser.peek_token() {
            parser.bump()?;
            break;
        }

        if parser.at_mapping_key()? {
            let err = parser.unexpected("in flow sequence");
            return Err(err.with_hint("Single-pair mappings inside '[...]' are not supported; use '{key: value}'"));
        }

        let leading = parser.take_pending_comments();
        let mut item = parse_flow_value(parser)?;
        take_flow_comments(parser, Some(&mut item))?;
        prepend_comments(&mut item, leading);
        items.push(item);

        match parser.peek_token() {
            Token::Comma => {
                parser.bump()?;
            }
            Token::RBracket => {}
            _ => return Err(parser.unexpected("in flow sequence (expected ',' or ']')")),
        }
    }

    let mut leftover = parser.take_pending_comments();
    attach_closing_comment(&mut leftover, items.last_mut());
    let mut node = Node::sequence(items);
    node.comments.leading = leftover;
    Ok(node)
}

fn parse_flow_value(parser: &mut Parser) -> Result<Node, CompileError> {
    let lexeme = parser.bump()?;
    match lexeme.token {
        Token::Plain(ref s) => Ok(Node::new(resolve_plain(s))),
        Token::Quoted(s) => Ok(Node::string(s)),
        Token::LBrace => parse_flow_mapping(parser),
        Token::LBracket => parse_flow_sequence(parser),
        Token::Tag(ref name) => {
            let tag = Tag::from_name(name);
            take_flow_comments(parser, None)?;
            let mut leading = parser.take_pending_comments();
            let mut payload = match parser.peek_token() {
                Token::Comma | Token::RBracket | Token::RBrace => Node::null(),
                _ => parse_flow_value(parser)?,
            };
            check_tag_payload(parser, &lexeme, &tag, &payload)?;
            leading.append(&mut payload.comments.leading);
            let mut node = Node::tagged(tag, payload);
            node.comments.leading = leading;
            Ok(node)
        }
        ref other => {
            let message = format!("unexpected {} in flow collection", other.describe());
            Err(parser.error_at(&lexeme, message))
        }
    }
}

/// Collect comments between flow tokens. An end-of-line comment belongs to
/// `previous` when it has none yet; everything else waits for the next node.
fn take_flow_comments(parser: &mut Parser, mut previous: Option<&mut Node>) -> Result<(), CompileError> {
    loop {
        let lexeme = match parser.peek_token() {
            Token::Comment(_) | Token::TrailingComment(_) => parser.bump()?,
            _ => return Ok(()),
        };
        match lexeme.token {
            Token::TrailingComment(text) => match previous.as_deref_mut() {
                Some(node) if node.comments.trailing.is_none() => node.comments.trailing = Some(text),
                _ => parser.push_pending_comment(text),
            },
            Token::Comment(text) => parser.push_pending_comment(text),
            _ => {}
        }
    }
}

/// A single comment before the closing bracket ends the last item's line.
/// Any others move ahead of the collection.
fn attach_closing_comment(leftover: &mut Vec<String>, last: Option<&mut Node>) {
    if leftover.len() != 1 {
        return;
    }
    if let Some(node) = last {
        if node.comments.trailing.is_none() {
            node.comments.trailing = leftover.pop();
        }
    }
}
