use super::*;

/// Advance the character iterator and update line/column tracking
pub(super) fn bump(lexer: &mut Lexer) -> Option<char> {
    let curr = lexer.peek;
    if let Some(c) = curr {
        if c == '\n' {
            lexer.line += 1;
            lexer.column = 0;
            lexer.line_has_content = false;
        } else {
            lexer.column += 1;
        }
    }
    lexer.peek = lexer.input.next();
    curr
}

/// Character after the current one, without consuming anything.
pub(super) fn peek_second(lexer: &Lexer) -> Option<char> {
    lexer.input.clone().next()
}

/// Whether the upcoming characters are exactly `marker` followed by a
/// separator (space, newline, or end of input).
pub(super) fn at_marker(lexer: &Lexer, marker: &str) -> bool {
    let mut chars = std::iter::once(lexer.peek).chain(lexer.input.clone().map(Some));
    for expected in marker.chars() {
        match chars.next() {
            Some(Some(c)) if c == expected => {}
            _ => return false,
        }
    }
    matches!(chars.next(), None | Some(None) | Some(Some(' ' | '\t' | '\n')))
}

pub(super) fn is_separator(c: Option<char>) -> bool {
    matches!(c, None | Some(' ' | '\t' | '\n'))
}

/// Skip whitespace. Inside flow collections newlines are insignificant and
/// are skipped as well; comments there still come out as tokens.
pub(super) fn skip_whitespace(lexer: &mut Lexer) {
    while let Some(c) = lexer.peek {
        match c {
            ' ' | '\t' | '\r' => {
                bump(lexer);
            }
            '\n' if lexer.in_flow() => {
                bump(lexer);
            }
            _ => break,
        }
    }
}

/// Consume everything up to (not including) the end of the line.
pub(super) fn take_rest_of_line(lexer: &mut Lexer) -> String {
    let mut text = String::new();
    while let Some(c) = lexer.peek {
        if c == '\n' {
            break;
        }
        text.push(c);
        bump(lexer);
    }
    text
}

/// Measure the next line without consuming it. The lexer must be positioned
/// on a newline. Returns `None` at end of input, otherwise the indentation
/// and whether the line is blank.
pub(super) fn peek_next_line(lexer: &Lexer) -> Option<(usize, bool)> {
    let mut chars = lexer.input.clone();
    let mut indent = 0;
    loop {
        match chars.next() {
            None => return if indent == 0 { None } else { Some((indent, true)) },
            Some(' ') => indent += 1,
            Some('\r') => {}
            Some('\n') => return Some((indent, true)),
            Some(_) => return Some((indent, false)),
        }
    }
}
