//! Lexer for the formula language
//!
//! Wraps the logos-generated raw lexer with identifier classification,
//! one-token-deep peeking and token push-back. Push-back is what the
//! parser's backtracking rides on: a tracked run of tokens is replayed
//! through [`Lexer::put_token`] in consumption order.
//!
//! Comments (`;` to end of line) and line splices (`\` directly before a
//! newline) are skipped as whitespace; a physical newline becomes a
//! [`TokenKind::Terminator`].

use std::collections::VecDeque;

use logos::Logos;

use crate::span::{SourceLocation, SourceMap};
use crate::token::{
    RawToken, Token, TokenKind, TokenValue, BUILTIN_FNS, BUILTIN_VARS, EXTENSION_KEYWORDS,
    KEYWORDS, SECTION_NAMES, TYPE_IDENTS,
};

/// Lexer options
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Recognise section names, string literals, `true`/`false` and
    /// parameter-block keywords. When off they all lex as identifiers
    /// (strings as invalid quotes), which is what legacy formulas expect.
    pub recognize_extensions: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            recognize_extensions: true,
        }
    }
}

/// Formula lexer
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, RawToken>,
    source_map: SourceMap,
    options: Options,
    /// Pushed-back tokens, returned before pulling from the raw lexer.
    pushed: VecDeque<Token<'a>>,
    /// Start offset of the most recently returned token.
    last_position: usize,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("position", &self.last_position)
            .field("pushed", &self.pushed.len())
            .finish()
    }
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, options: Options) -> Self {
        Self {
            source,
            inner: RawToken::lexer(source),
            source_map: SourceMap::new(source),
            options,
            pushed: VecDeque::new(),
            last_position: 0,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Line/column of the most recently returned token.
    pub fn source_location(&self) -> SourceLocation {
        self.source_map.location(self.last_position)
    }

    /// Return and consume the next token. At end of input this keeps
    /// returning an `EndOfInput` token.
    pub fn next_token(&mut self) -> Token<'a> {
        let token = match self.pushed.pop_front() {
            Some(token) => token,
            None => self.fetch(),
        };
        self.last_position = token.position;
        token
    }

    /// Return the next token without consuming it.
    pub fn peek_token(&mut self) -> Token<'a> {
        if let Some(front) = self.pushed.front() {
            return *front;
        }
        let token = self.fetch();
        self.pushed.push_front(token);
        token
    }

    /// Push a token back; queued tokens are returned in the order pushed.
    pub fn put_token(&mut self, token: Token<'a>) {
        self.pushed.push_back(token);
    }

    fn fetch(&mut self) -> Token<'a> {
        let Some(raw) = self.inner.next() else {
            return Token::new(TokenKind::EndOfInput, self.source.len(), 0);
        };
        let span = self.inner.span();
        let slice = self.inner.slice();

        match raw {
            Ok(RawToken::Newline) => Token::new(TokenKind::Terminator, span.start, span.len()),
            Ok(RawToken::Integer) => match slice.parse::<i64>() {
                Ok(value) => Token {
                    kind: TokenKind::Integer,
                    value: TokenValue::Integer(value),
                    position: span.start,
                    length: span.len(),
                },
                // Out-of-range integers degrade to floating point
                Err(_) => self.number_token(slice, span.start, span.len()),
            },
            Ok(RawToken::Number) => self.number_token(slice, span.start, span.len()),
            Ok(RawToken::Ident) => self.classify_identifier(slice, span.start, span.len()),
            Ok(RawToken::Quote) => self.lex_string(span.start),
            Ok(raw) => Token::new(operator_kind(raw), span.start, span.len()),
            Err(()) => Token::new(TokenKind::Invalid, span.start, span.len().max(1)),
        }
    }

    fn number_token(&self, slice: &str, position: usize, length: usize) -> Token<'a> {
        match slice.parse::<f64>() {
            Ok(value) => Token {
                kind: TokenKind::Number,
                value: TokenValue::Number(value),
                position,
                length,
            },
            Err(_) => Token::new(TokenKind::Invalid, position, length),
        }
    }

    /// Classify an identifier against the lookup tables, in order:
    /// keywords, section names, built-in variables, built-in functions.
    fn classify_identifier(&mut self, name: &'a str, position: usize, length: usize) -> Token<'a> {
        if let Some(&(_, kind)) = KEYWORDS.iter().find(|(n, _)| *n == name) {
            return Token::new(kind, position, length);
        }
        if self.options.recognize_extensions {
            if let Some(&(_, kind)) = EXTENSION_KEYWORDS.iter().find(|(n, _)| *n == name) {
                return Token::new(kind, position, length);
            }
            if TYPE_IDENTS.contains(&name) {
                return Token {
                    kind: TokenKind::TypeIdent,
                    value: TokenValue::Str(name),
                    position,
                    length,
                };
            }
            // A section name is only a section header when the colon
            // directly follows; the colon joins the token.
            if let Some(&(_, kind)) = SECTION_NAMES.iter().find(|(n, _)| *n == name) {
                if self.inner.remainder().starts_with(':') {
                    self.inner.bump(1);
                    return Token {
                        kind,
                        value: TokenValue::Str(name),
                        position,
                        length: length + 1,
                    };
                }
            }
        }
        let table_kind = BUILTIN_VARS
            .iter()
            .chain(BUILTIN_FNS.iter())
            .find(|(n, _)| *n == name)
            .map(|&(_, kind)| kind);
        Token {
            kind: table_kind.unwrap_or(TokenKind::Identifier),
            value: TokenValue::Str(name),
            position,
            length,
        }
    }

    /// Lex a string literal (extension mode only): everything to the next
    /// double quote, no escapes. The payload excludes the quotes.
    fn lex_string(&mut self, start: usize) -> Token<'a> {
        if !self.options.recognize_extensions {
            return Token::new(TokenKind::Invalid, start, 1);
        }
        let remainder = self.inner.remainder();
        match memchr::memchr(b'"', remainder.as_bytes()) {
            Some(close) => {
                let contents = &remainder[..close];
                self.inner.bump(close + 1);
                Token {
                    kind: TokenKind::Str,
                    value: TokenValue::Str(contents),
                    position: start,
                    length: close + 2,
                }
            }
            None => {
                let length = remainder.len() + 1;
                self.inner.bump(remainder.len());
                Token::new(TokenKind::Invalid, start, length)
            }
        }
    }
}

fn operator_kind(raw: RawToken) -> TokenKind {
    match raw {
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Multiply => TokenKind::Multiply,
        RawToken::Divide => TokenKind::Divide,
        RawToken::Power => TokenKind::Power,
        RawToken::Assign => TokenKind::Assign,
        RawToken::Less => TokenKind::Less,
        RawToken::LessEqual => TokenKind::LessEqual,
        RawToken::Greater => TokenKind::Greater,
        RawToken::GreaterEqual => TokenKind::GreaterEqual,
        RawToken::Equal => TokenKind::Equal,
        RawToken::NotEqual => TokenKind::NotEqual,
        RawToken::LogicalAnd => TokenKind::LogicalAnd,
        RawToken::LogicalOr => TokenKind::LogicalOr,
        RawToken::Modulus => TokenKind::Modulus,
        RawToken::OpenParen => TokenKind::OpenParen,
        RawToken::CloseParen => TokenKind::CloseParen,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Newline
        | RawToken::Integer
        | RawToken::Number
        | RawToken::Ident
        | RawToken::Quote => TokenKind::Invalid,
    }
}
