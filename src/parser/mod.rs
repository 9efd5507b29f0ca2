use std::collections::VecDeque;

use crate::lexer::{Lexeme, Lexer, Token};
use crate::CompileError;
use crate::ast::{Document, Node, Value};

mod document;
mod value;

pub(crate) use value::resolve_plain;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: VecDeque<Lexeme>,
    /// Full-line comments seen but not yet attached to a node.
    pending_comments: Vec<String>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Result<Self, CompileError> {
        let mut lexer = Lexer::new(input);
        let first = lexer.next_lexeme()?;
        let mut lookahead = VecDeque::new();
        lookahead.push_back(first);
        Ok(Self {
            lexer,
            lookahead,
            pending_comments: Vec::new(),
        })
    }

    pub(crate) fn bump(&mut self) -> Result<Lexeme, CompileError> {
        if self.lookahead.len() < 2 {
            let next = self.lexer.next_lexeme()?;
            self.lookahead.push_back(next);
        }
        let curr = self.lookahead.pop_front().ok_or_else(|| {
            CompileError::parse("unexpected end of input", self.lexer.line(), self.lexer.column())
        })?;
        Ok(curr)
    }

    pub(crate) fn peek(&self) -> &Lexeme {
        // bump() always leaves at least one lexeme buffered
        &self.lookahead[0]
    }

    pub(crate) fn peek_token(&self) -> &Token {
        &self.peek().token
    }

    /// The token after the current one.
    pub(crate) fn peek_second(&mut self) -> Result<&Token, CompileError> {
        if self.lookahead.len() < 2 {
            if self.lookahead[0].token == Token::Eof {
                return Ok(&self.lookahead[0].token);
            }
            let next = self.lexer.next_lexeme()?;
            self.lookahead.push_back(next);
        }
        Ok(&self.lookahead[1].token)
    }

    /// Whether the current token is a scalar immediately followed by `:`.
    pub(crate) fn at_mapping_key(&mut self) -> Result<bool, CompileError> {
        if !matches!(self.peek_token(), Token::Plain(_) | Token::Quoted(_)) {
            return Ok(false);
        }
        Ok(matches!(self.peek_second()?, Token::Colon))
    }

    pub(crate) fn error_at(&self, lexeme: &Lexeme, message: impl Into<String>) -> CompileError {
        CompileError::parse(message, lexeme.line, lexeme.column)
    }

    pub(crate) fn unexpected(&self, what: &str) -> CompileError {
        let lexeme = self.peek();
        self.error_at(
            lexeme,
            format!("unexpected {} {}", lexeme.token.describe(), what),
        )
    }

    /// Skip blank lines, collecting full-line comments for the next node.
    pub(crate) fn skip_blank_lines(&mut self) -> Result<(), CompileError> {
        loop {
            match self.peek_token() {
                Token::Newline => {
                    self.bump()?;
                }
                Token::Comment(_) => {
                    if let Token::Comment(text) = self.bump()?.token {
                        self.pending_comments.push(text);
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub(crate) fn push_pending_comment(&mut self, text: String) {
        self.pending_comments.push(text);
    }

    pub(crate) fn take_pending_comments(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_comments)
    }

    /// Consume an end-of-line comment if one follows.
    pub(crate) fn take_trailing_comment(&mut self) -> Result<Option<String>, CompileError> {
        if let Token::TrailingComment(_) = self.peek_token() {
            if let Token::TrailingComment(text) = self.bump()?.token {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    /// Parse the whole input as a single document.
    pub fn parse_document(&mut self) -> Result<Document, CompileError> {
        document::parse_document(self)
    }
}
