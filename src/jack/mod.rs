//! Front end for the source language: tokenizer, parser, syntax tree and XML dumps.

pub mod ast;
pub mod parser;
pub mod token;
pub mod xml;

pub use self::ast::Class;
pub use self::parser::ParseError;
pub use self::token::{tokenize, Token};
