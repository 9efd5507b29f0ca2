use super::*;
use super::scanner::{
    at_marker, bump, is_separator, peek_second, peek_next_line, skip_whitespace,
    take_rest_of_line,
};

pub(super) fn next_lexeme(lexer: &mut Lexer) -> Result<Lexeme, CompileError> {
    if let Some(lexeme) = lexer.queued.take() {
        return Ok(lexeme);
    }
    skip_whitespace(lexer);

    let line = lexer.line;
    let column = lexer.column;

    let token = match lexer.peek {
        None if lexer.in_flow() => Err(error_here(
            lexer,
            "unexpected end of input inside a flow collection",
            Some("Close every '[' and '{'"),
        )),
        None => Ok(Token::Eof),
        Some('\n') => {
            bump(lexer);
            Ok(Token::Newline)
        }
        Some('#') => Ok(tokenize_comment(lexer)),
        Some(c) => {
            if !lexer.line_has_content {
                lexer.line_indent = column;
                lexer.line_has_content = true;
            }
            tokenize_content(lexer, c)
        }
    }?;

    lexer.prev_quoted = matches!(token, Token::Quoted(_));
    Ok(Lexeme { token, line, column })
}

fn tokenize_content(lexer: &mut Lexer, c: char) -> Result<Token, CompileError> {
    let flow = lexer.in_flow();
    let next = peek_second(lexer);

    match c {
        '-' if lexer.column == 0 && at_marker(lexer, "---") => {
            consume(lexer, 3);
            Ok(Token::DocumentStart)
        }
        '.' if lexer.column == 0 && at_marker(lexer, "...") => {
            consume(lexer, 3);
            Ok(Token::DocumentEnd)
        }
        '-' if !flow && is_separator(next) => tokenize_symbol(lexer, Token::Dash),
        ':' if is_separator(next)
            || (flow && (lexer.prev_quoted || matches!(next, Some(',' | ']' | '}')))) =>
        {
            tokenize_symbol(lexer, Token::Colon)
        }
        '[' => {
            lexer.flow_depth += 1;
            tokenize_symbol(lexer, Token::LBracket)
        }
        '{' => {
            lexer.flow_depth += 1;
            tokenize_symbol(lexer, Token::LBrace)
        }
        ']' | '}' if flow => {
            lexer.flow_depth -= 1;
            let token = if c == ']' { Token::RBracket } else { Token::RBrace };
            tokenize_symbol(lexer, token)
        }
        ',' if flow => tokenize_symbol(lexer, Token::Comma),
        ']' | '}' | ',' => Err(unexpected_char(lexer, c, "Flow indicators are only valid inside '[...]' or '{...}'")),
        '!' => tokenize_tag(lexer),
        '&' | '*' => Err(unexpected_char(lexer, c, "Anchors and aliases are not supported")),
        '%' if lexer.column == 0 => Err(unexpected_char(lexer, c, "Directives are not supported")),
        '@' | '`' => Err(unexpected_char(lexer, c, "Reserved indicator; quote the value")),
        '"' => tokenize_double_quoted(lexer),
        '\'' => tokenize_single_quoted(lexer),
        '|' | '>' if !flow => tokenize_block_scalar(lexer),
        _ => Ok(tokenize_plain(lexer)),
    }
}

fn consume(lexer: &mut Lexer, n: usize) {
    for _ in 0..n {
        bump(lexer);
    }
}

fn tokenize_symbol(lexer: &mut Lexer, token: Token) -> Result<Token, CompileError> {
    bump(lexer);
    Ok(token)
}

fn tokenize_comment(lexer: &mut Lexer) -> Token {
    let own_line = !lexer.line_has_content;
    bump(lexer); // consume '#'
    let text = take_rest_of_line(lexer);
    let text = text.trim_end().to_string();
    if own_line {
        Token::Comment(text)
    } else {
        Token::TrailingComment(text)
    }
}

fn tokenize_tag(lexer: &mut Lexer) -> Result<Token, CompileError> {
    bump(lexer); // consume '!'
    let flow = lexer.in_flow();
    let mut name = String::new();

    while let Some(ch) = lexer.peek {
        if ch == ' ' || ch == '\t' || ch == '\n' || ch == '\r' {
            break;
        }
        if flow && matches!(ch, ',' | '[' | ']' | '{' | '}') {
            break;
        }
        name.push(ch);
        bump(lexer);
    }

    if name.is_empty() {
        return Err(error_here(lexer, "empty tag", Some("Write the function name after '!', e.g. !Ref")));
    }
    Ok(Token::Tag(name))
}

fn tokenize_plain(lexer: &mut Lexer) -> Token {
    let flow = lexer.in_flow();
    let mut content = String::new();

    while let Some(ch) = lexer.peek {
        match ch {
            '\n' => break,
            ':' => {
                let next = peek_second(lexer);
                if is_separator(next) || (flow && matches!(next, Some(',' | ']' | '}'))) {
                    break;
                }
            }
            '#' if content.ends_with(' ') || content.ends_with('\t') => break,
            ',' | '[' | ']' | '{' | '}' if flow => break,
            _ => {}
        }
        content.push(ch);
        bump(lexer);
    }

    Token::Plain(content.trim_end().to_string())
}

fn tokenize_double_quoted(lexer: &mut Lexer) -> Result<Token, CompileError> {
    let (line, column) = (lexer.line, lexer.column);
    bump(lexer); // consume opening quote
    let mut content = String::new();

    loop {
        match lexer.peek {
            None => return Err(unclosed(line, column, '"')),
            Some('"') => {
                bump(lexer);
                break;
            }
            Some('\\') => {
                bump(lexer);
                match bump(lexer) {
                    Some('n') => content.push('\n'),
                    Some('t') => content.push('\t'),
                    Some('r') => content.push('\r'),
                    Some('0') => content.push('\0'),
                    Some('b') => content.push('\u{8}'),
                    Some('e') => content.push('\u{1b}'),
                    Some(' ') => content.push(' '),
                    Some('/') => content.push('/'),
                    Some('\\') => content.push('\\'),
                    Some('"') => content.push('"'),
                    Some('x') => content.push(read_hex_escape(lexer, 2)?),
                    Some('u') => content.push(read_hex_escape(lexer, 4)?),
                    Some('U') => content.push(read_hex_escape(lexer, 8)?),
                    Some('\n') => {
                        // escaped line break joins lines without a space
                        skip_line_indent(lexer);
                    }
                    Some(other) => {
                        return Err(error_here(
                            lexer,
                            &format!("unknown escape sequence '\\{}'", other),
                            None,
                        ));
                    }
                    None => return Err(unclosed(line, column, '"')),
                }
            }
            Some('\n') => fold_line_break(lexer, &mut content),
            Some(ch) => {
                content.push(ch);
                bump(lexer);
            }
        }
    }

    Ok(Token::Quoted(content))
}

fn tokenize_single_quoted(lexer: &mut Lexer) -> Result<Token, CompileError> {
    let (line, column) = (lexer.line, lexer.column);
    bump(lexer); // consume opening quote
    let mut content = String::new();

    loop {
        match lexer.peek {
            None => return Err(unclosed(line, column, '\'')),
            Some('\'') => {
                bump(lexer);
                if lexer.peek == Some('\'') {
                    content.push('\'');
                    bump(lexer);
                } else {
                    break;
                }
            }
            Some('\n') => fold_line_break(lexer, &mut content),
            Some(ch) => {
                content.push(ch);
                bump(lexer);
            }
        }
    }

    Ok(Token::Quoted(content))
}

/// Line folding inside quoted scalars: a single break becomes a space, each
/// additional blank line becomes a newline.
fn fold_line_break(lexer: &mut Lexer, content: &mut String) {
    while content.ends_with(' ') || content.ends_with('\t') {
        content.pop();
    }
    bump(lexer); // consume '\n'
    skip_line_indent(lexer);

    let mut blank_lines = 0;
    while lexer.peek == Some('\n') {
        blank_lines += 1;
        bump(lexer);
        skip_line_indent(lexer);
    }

    if blank_lines == 0 {
        content.push(' ');
    } else {
        for _ in 0..blank_lines {
            content.push('\n');
        }
    }
}

fn skip_line_indent(lexer: &mut Lexer) {
    while matches!(lexer.peek, Some(' ' | '\t' | '\r')) {
        bump(lexer);
    }
}

fn read_hex_escape(lexer: &mut Lexer, digits: usize) -> Result<char, CompileError> {
    let code = read_hex_digits(lexer, digits)?;
    if digits == 4 && (0xD800..0xDC00).contains(&code) {
        return read_low_surrogate(lexer, code);
    }
    char::from_u32(code).ok_or_else(|| error_here(lexer, &format!("invalid code point '{:x}'", code), None))
}

/// A `\u` high surrogate must be followed by a `\u` low surrogate; the two
/// form one code point.
fn read_low_surrogate(lexer: &mut Lexer, high: u32) -> Result<char, CompileError> {
    let unpaired = |lexer: &Lexer| {
        error_here(
            lexer,
            &format!("unpaired surrogate '{:x}'", high),
            Some("Write characters outside the BMP as a \\uD800-\\uDBFF and \\uDC00-\\uDFFF pair"),
        )
    };
    if lexer.peek != Some('\\') {
        return Err(unpaired(lexer));
    }
    bump(lexer);
    if bump(lexer) != Some('u') {
        return Err(unpaired(lexer));
    }
    let low = read_hex_digits(lexer, 4)?;
    if !(0xDC00..0xE000).contains(&low) {
        return Err(unpaired(lexer));
    }
    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(code).ok_or_else(|| error_here(lexer, &format!("invalid code point '{:x}'", code), None))
}

fn read_hex_digits(lexer: &mut Lexer, digits: usize) -> Result<u32, CompileError> {
    let mut hex = String::new();
    for _ in 0..digits {
        match bump(lexer) {
            Some(c) if c.is_ascii_hexdigit() => hex.push(c),
            _ => return Err(error_here(lexer, "invalid hex escape", None)),
        }
    }
    u32::from_str_radix(&hex, 16).map_err(|_| error_here(lexer, "invalid hex escape", None))
}

#[derive(Clone, Copy, PartialEq)]
enum Chomping {
    Clip,
    Strip,
    Keep,
}

fn tokenize_block_scalar(lexer: &mut Lexer) -> Result<Token, CompileError> {
    let folded = bump(lexer) == Some('>');
    let parent_indent = lexer.line_indent;

    let mut chomping = Chomping::Clip;
    let mut explicit_indent = None;
    while let Some(ch) = lexer.peek {
        match ch {
            '-' => chomping = Chomping::Strip,
            '+' => chomping = Chomping::Keep,
            '1'..='9' => explicit_indent = ch.to_digit(10).map(|d| d as usize),
            _ => break,
        }
        bump(lexer);
    }

    skip_line_indent(lexer);
    if lexer.peek == Some('#') {
        let (line, column) = (lexer.line, lexer.column);
        bump(lexer);
        let text = take_rest_of_line(lexer);
        lexer.queued = Some(Lexeme {
            token: Token::TrailingComment(text.trim_end().to_string()),
            line,
            column,
        });
    }
    if !matches!(lexer.peek, None | Some('\n')) {
        return Err(error_here(
            lexer,
            "unexpected text after block scalar indicator",
            Some("Block scalar content starts on the next line"),
        ));
    }

    let block_indent = match explicit_indent {
        Some(n) => parent_indent + n,
        None => detect_block_indent(lexer, parent_indent),
    };

    let mut lines: Vec<String> = Vec::new();
    while lexer.peek == Some('\n') {
        match peek_next_line(lexer) {
            None => break,
            Some((indent, blank)) => {
                if !blank && indent < block_indent {
                    break;
                }
                if blank && at_last_line(lexer) {
                    break;
                }
                bump(lexer); // consume '\n'
                let mut skipped = 0;
                while skipped < block_indent && lexer.peek == Some(' ') {
                    bump(lexer);
                    skipped += 1;
                }
                let text = take_rest_of_line(lexer);
                let text = text.trim_end_matches('\r');
                if blank {
                    lines.push(String::new());
                } else {
                    lines.push(text.to_string());
                }
            }
        }
    }

    let mut trailing_blank = 0;
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
        trailing_blank += 1;
    }

    let mut content = if folded {
        fold_block_lines(&lines)
    } else {
        lines.join("\n")
    };

    if !lines.is_empty() {
        match chomping {
            Chomping::Strip => {}
            Chomping::Clip => content.push('\n'),
            Chomping::Keep => {
                content.push('\n');
                for _ in 0..trailing_blank {
                    content.push('\n');
                }
            }
        }
    }

    Ok(Token::Block(content))
}

/// Blank lines at the very end of the input never belong to a block scalar.
fn at_last_line(lexer: &Lexer) -> bool {
    lexer.input.clone().all(|c| c == ' ' || c == '\n' || c == '\r')
}

fn detect_block_indent(lexer: &Lexer, parent_indent: usize) -> usize {
    let mut chars = lexer.input.clone();
    let mut indent = 0;
    while let Some(c) = chars.next() {
        match c {
            ' ' => indent += 1,
            '\n' | '\r' => indent = 0,
            _ => {
                return if indent > parent_indent { indent } else { parent_indent + 1 };
            }
        }
    }
    parent_indent + 1
}

fn fold_block_lines(lines: &[String]) -> String {
    let mut out = String::new();
    let mut prev: Option<&str> = None;

    for line in lines {
        if let Some(p) = prev {
            if p.is_empty() || line.starts_with(' ') || p.starts_with(' ') {
                out.push('\n');
            } else if !line.is_empty() {
                out.push(' ');
            }
        }
        out.push_str(line);
        prev = Some(line);
    }

    out
}

fn error_here(lexer: &Lexer, message: &str, hint: Option<&str>) -> CompileError {
    let err = CompileError::parse(message, lexer.line, lexer.column);
    match hint {
        Some(h) => err.with_hint(h),
        None => err,
    }
}

fn unexpected_char(lexer: &mut Lexer, ch: char, hint: &str) -> CompileError {
    let err = error_here(lexer, &format!("unexpected character '{}'", ch), Some(hint));
    bump(lexer);
    err
}

fn unclosed(line: usize, column: usize, quote: char) -> CompileError {
    CompileError::parse(format!("unclosed string starting with {}", quote), line, column)
        .with_hint("String literal not closed")
}
