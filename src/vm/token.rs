//! Tokens of the stack machine language.

use logos::{Lexer, Logos};

use std::fmt;

use crate::parsing::Span;

/// Enumeration of all tokens of a stack machine program line.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Erroneous token that could not be interpreted as any of the other variants.
    #[error]
    #[regex(r"[ \t\r\f]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    Error,

    /// A command keyword, segment name, label or function name.
    #[regex(r"[A-Za-z_.$:][A-Za-z0-9_.$:\-]*", Lexer::slice)]
    Word(&'a str),

    /// An unsigned decimal number.
    #[regex("[0-9]+", |lex| lex.slice().parse())]
    Number(u32),
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Error => write!(f, "invalid token"),
            Token::Word(word) => write!(f, "'{}'", word),
            Token::Number(number) => write!(f, "number {}", number),
        }
    }
}

/// Tokenizes a single line.
pub fn tokenize_line(line: &str) -> Vec<(Token, Span)> {
    Token::lexer(line).spanned().collect()
}
