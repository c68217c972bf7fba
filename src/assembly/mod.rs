//! Textual target assembly: parsing and symbol resolution.
//!
//! Turning a resolved [Rom] into binary machine words is left to an external assembler; the
//! resolved form is what the [emulator](crate::emulator) executes.
//!
//! ```
//! use vack::assembly::Program;
//!
//! let rom = Program::parse("@counter\nM=0\n(END)\n@END\n0;JMP")
//!     .unwrap()
//!     .resolve()
//!     .unwrap();
//!
//! assert_eq!(rom.symbol("counter"), Some(16));
//! assert_eq!(rom.symbol("END"), Some(2));
//! ```

pub mod parser;
pub mod program;

use std::fmt;

pub use self::parser::ParseError;
pub use self::program::{Line, Program, Rom, Word, PREDEFINED_SYMBOLS};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(ParseError),
    DuplicateLabel(String),
    RomOverflow(usize),
    RamOverflow(String),
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "{}", err),
            Error::DuplicateLabel(label) => write!(f, "label '{}' is declared more than once", label),
            Error::RomOverflow(address) => write!(f, "program does not fit into ROM ({} instructions)", address),
            Error::RamOverflow(symbol) => write!(f, "no free RAM left for variable '{}'", symbol),
        }
    }
}

impl std::error::Error for Error {}

impl Program {
    /// Parses assembly text. Comments are not retained.
    pub fn parse(input: &str) -> Result<Program, Error> {
        Ok(parser::parse_program(input)?)
    }
}
