//! The stack machine language shared by the compiler and the translator.
//!
//! Programs are plain text with one command per line. Command keywords and segment names are
//! case-insensitive and `//` starts a comment.
//!
//! ```
//! use vack::vm::{Command, Program, Segment};
//!
//! let program = Program::parse("push constant 7\nPOP local 0 // store").unwrap();
//!
//! assert_eq!(program.commands, vec![
//!     Command::Push(Segment::Constant, 7),
//!     Command::Pop(Segment::Local, 0),
//! ]);
//! ```

pub mod parser;
pub mod program;
pub mod token;

use std::fmt;

use crate::parsing;

pub use self::program::{ArithmeticOp, Command, Program, Segment, SegmentError};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Syntax {
        line: usize,
        error: parsing::Error<String>,
    },
    UnknownCommand {
        line: usize,
        command: String,
        suggestion: Option<&'static str>,
    },
    Segment {
        line: usize,
        error: SegmentError,
    },
}

impl Error {
    pub fn line(&self) -> usize {
        match *self {
            Error::Syntax { line, .. }
                | Error::UnknownCommand { line, .. }
                | Error::Segment { line, .. } => line,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Syntax { line, error } => write!(f, "line {}: {}", line, error),
            Error::UnknownCommand { line, command, suggestion: Some(suggestion) } =>
                write!(f, "line {}: unknown command '{}', did you mean '{}'?", line, command, suggestion),
            Error::UnknownCommand { line, command, suggestion: None } =>
                write!(f, "line {}: unknown command '{}'", line, command),
            Error::Segment { line, error } => write!(f, "line {}: {}", line, error),
        }
    }
}

impl std::error::Error for Error {}

impl Program {
    /// Parses the textual form of a program.
    pub fn parse(input: &str) -> Result<Program, Error> {
        parser::parse_program(input)
    }
}
