// Author: Dustin Pilgrim
// License: MIT

use std::str::Chars;
use crate::CompileError;

mod scanner;
mod tokenizer;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // --- scalars ---
    /// Plain (unquoted) scalar, type not yet resolved.
    Plain(String),
    /// Single- or double-quoted scalar, always a string.
    Quoted(String),
    /// Literal (`|`) or folded (`>`) block scalar content.
    Block(String),
    /// Local tag such as `!Sub`, without the `!`.
    Tag(String),

    // --- indicators ---
    Colon,
    Dash,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,

    // --- comments ---
    /// A comment on a line of its own.
    Comment(String),
    /// A comment after content on the same line.
    TrailingComment(String),

    // --- layout ---
    DocumentStart,
    DocumentEnd,
    Newline,
    Eof,
}

impl Token {
    /// Short human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Plain(s) => format!("scalar `{}`", s),
            Token::Quoted(s) => format!("string \"{}\"", s),
            Token::Block(_) => "block scalar".to_string(),
            Token::Tag(t) => format!("tag `!{}`", t),
            Token::Colon => "':'".to_string(),
            Token::Dash => "'-'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Comment(_) | Token::TrailingComment(_) => "comment".to_string(),
            Token::DocumentStart => "'---'".to_string(),
            Token::DocumentEnd => "'...'".to_string(),
            Token::Newline => "end of line".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// A token plus the position where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer<'a> {
    input: Chars<'a>,
    peek: Option<char>,
    line: usize,
    column: usize,
    /// Indentation of the current line (column of its first token).
    line_indent: usize,
    /// Whether a token has already been produced on the current line.
    line_has_content: bool,
    /// Nesting depth of `[` / `{`; newlines are insignificant inside.
    flow_depth: usize,
    /// JSON allows `"key":value`, so a colon right after a quoted scalar is an indicator.
    prev_quoted: bool,
    /// Comment from a block scalar header, returned right after the block.
    queued: Option<Lexeme>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input: input.chars(),
            peek: None,
            line: 1,
            column: 0,
            line_indent: 0,
            line_has_content: false,
            flow_depth: 0,
            prev_quoted: false,
            queued: None,
        };
        lexer.peek = lexer.input.next();
        lexer
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn in_flow(&self) -> bool {
        self.flow_depth > 0
    }

    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        self.next_lexeme().map(|lexeme| lexeme.token)
    }

    /// Produce the next token together with its starting position.
    pub fn next_lexeme(&mut self) -> Result<Lexeme, CompileError> {
        tokenizer::next_lexeme(self)
    }
}
