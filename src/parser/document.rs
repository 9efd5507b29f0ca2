use super::*;

/// Where a node appears, which decides the compact forms it may take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Context {
    /// After `key:`. A block sequence may sit at the key's own indentation.
    MappingValue,
    /// After `- `. Compact `- key: value` and `- - item` forms are allowed.
    SequenceItem,
}

pub(super) fn parse_document(parser: &mut Parser) -> Result<Document, CompileError> {
    parser.skip_blank_lines()?;

    if let Token::DocumentStart = parser.peek_token() {
        parser.bump()?;
        // `--- # header` leads the first node, like a comment on its own line
        if let Some(text) = parser.take_trailing_comment()? {
            parser.push_pending_comment(text);
        }
        parser.skip_blank_lines()?;
    }

    let root = if is_content(parser.peek_token()) {
        let indent = parser.peek().column;
        parse_block(parser, indent)?
    } else {
        Node::null()
    };

    parser.skip_blank_lines()?;
    if let Token::DocumentEnd = parser.peek_token() {
        parser.bump()?;
        if let Some(text) = parser.take_trailing_comment()? {
            parser.push_pending_comment(text);
        }
        parser.skip_blank_lines()?;
    }

    match parser.peek_token() {
        Token::Eof => {}
        Token::DocumentStart => {
            let err = parser.unexpected("after the first document");
            return Err(err.with_hint("Multi-document streams are not supported"));
        }
        _ => return Err(parser.unexpected("at this indentation")),
    }

    Ok(Document {
        root,
        source: None,
        trailing_comments: parser.take_pending_comments(),
    })
}

pub(super) fn is_content(token: &Token) -> bool {
    !matches!(
        token,
        Token::Newline
            | Token::Eof
            | Token::Comment(_)
            | Token::TrailingComment(_)
            | Token::DocumentStart
            | Token::DocumentEnd
    )
}

/// Parse a node that starts at the beginning of a line, at column `indent`.
pub(super) fn parse_block(parser: &mut Parser, indent: usize) -> Result<Node, CompileError> {
    if let Token::Dash = parser.peek_token() {
        return parse_block_sequence(parser, indent);
    }
    if parser.at_mapping_key()? {
        return parse_block_mapping(parser, indent);
    }

    let leading = parser.take_pending_comments();
    let mut node = value::parse_inline(parser, indent, Context::MappingValue)?;
    prepend_comments(&mut node, leading);
    Ok(node)
}

pub(super) fn parse_block_mapping(parser: &mut Parser, indent: usize) -> Result<Node, CompileError> {
    let mut entries: Vec<(String, Node)> = Vec::new();

    loop {
        parser.skip_blank_lines()?;
        if !is_content(parser.peek_token()) {
            break;
        }

        let column = parser.peek().column;
        if column < indent {
            break;
        }
        if column > indent {
            return Err(parser.unexpected("(bad indentation of a mapping entry)"));
        }

        let key_lexeme = parser.bump()?;
        let key = match &key_lexeme.token {
            Token::Plain(s) | Token::Quoted(s) => s.clone(),
            _ => {
                let message = format!("expected a mapping key, found {}", key_lexeme.token.describe());
                return Err(parser.error_at(&key_lexeme, message));
            }
        };
        match parser.peek_token() {
            Token::Colon => {
                parser.bump()?;
            }
            _ => return Err(parser.unexpected("after mapping key (expected ':')")),
        }

        if entries.iter().any(|(k, _)| *k == key) {
            return Err(parser.error_at(&key_lexeme, format!("duplicate mapping key `{}`", key)));
        }

        let leading = parser.take_pending_comments();
        let mut node = parse_node(parser, indent, Context::MappingValue)?;
        prepend_comments(&mut node, leading);
        entries.push((key, node));
    }

    Ok(Node::mapping(entries))
}

pub(super) fn parse_block_sequence(parser: &mut Parser, indent: usize) -> Result<Node, CompileError> {
    let mut items = Vec::new();

    loop {
        parser.skip_blank_lines()?;
        if !is_content(parser.peek_token()) {
            break;
        }

        let column = parser.peek().column;
        let is_dash = matches!(parser.peek_token(), Token::Dash);
        if column < indent || (column == indent && !is_dash) {
            break;
        }
        if column > indent {
            return Err(parser.unexpected("(bad indentation of a sequence entry)"));
        }

        let leading = parser.take_pending_comments();
        parser.bump()?; // consume '-'
        let mut node = parse_node(parser, indent, Context::SequenceItem)?;
        prepend_comments(&mut node, leading);
        items.push(node);
    }

    Ok(Node::sequence(items))
}

/// Parse the node that follows `key:`, `- `, or a tag. `indent` is the
/// indentation of the construct that introduced it.
pub(super) fn parse_node(parser: &mut Parser, indent: usize, ctx: Context) -> Result<Node, CompileError> {
    if !is_content(parser.peek_token()) {
        let trailing = parser.take_trailing_comment()?;
        parser.skip_blank_lines()?;

        let next = parser.peek();
        let next_column = next.column;
        let nested = is_content(&next.token) && next_column > indent;
        let same_level_sequence = ctx == Context::MappingValue
            && matches!(next.token, Token::Dash)
            && next_column == indent;

        let mut node = if nested {
            parse_block(parser, next_column)?
        } else if same_level_sequence {
            parse_block_sequence(parser, indent)?
        } else {
            Node::null()
        };

        if trailing.is_some() {
            node.comments.trailing = trailing;
        }
        return Ok(node);
    }

    let column = parser.peek().column;
    if ctx == Context::SequenceItem && matches!(parser.peek_token(), Token::Dash) {
        return parse_block_sequence(parser, column);
    }
    if parser.at_mapping_key()? {
        if ctx == Context::SequenceItem {
            return parse_block_mapping(parser, column);
        }
        return Err(parser.unexpected("(mapping values are not allowed here)"));
    }
    value::parse_inline(parser, indent, ctx)
}

pub(super) fn prepend_comments(node: &mut Node, mut leading: Vec<String>) {
    if leading.is_empty() {
        return;
    }
    leading.append(&mut node.comments.leading);
    node.comments.leading = leading;
}
