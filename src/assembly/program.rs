use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

use crate::instruction::{Address, Comp, Dest, Instruction, Jump, MAX_LITERAL};

use super::Error;

/// First RAM address handed out to variables.
pub const VARIABLE_BASE: u16 = 16;

lazy_static! {
    /// Symbols every program can refer to without declaring them.
    pub static ref PREDEFINED_SYMBOLS: HashMap<String, u16> = {
        let mut symbols = HashMap::new();

        for i in 0..16 {
            symbols.insert(format!("R{}", i), i);
        }

        let named = [
            ("SP", 0),
            ("LCL", 1),
            ("ARG", 2),
            ("THIS", 3),
            ("THAT", 4),
            ("TEMP", 5),
            ("SCREEN", 16384),
            ("KBD", 24576),
            ("UART", 24577),
            ("TX", 24577),
            ("RX", 24578),
            ("UARTSTAT", 24579),
        ];

        for (name, address) in named.iter() {
            symbols.insert(name.to_string(), *address);
        }

        symbols
    };
}

/// A line of an assembly listing.
#[derive(Clone, Debug, PartialEq)]
pub enum Line {
    Instruction(Instruction),
    Comment(String),
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Line::Instruction(instruction @ Instruction::Label(_)) => write!(f, "{}", instruction),
            Line::Instruction(instruction) => write!(f, "    {}", instruction),
            Line::Comment(comment) => write!(f, "// {}", comment),
        }
    }
}

/// An assembly listing, as produced by the translator or read from a file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub lines: Vec<Line>,
}

impl Program {
    pub fn new() -> Program {
        Program::default()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.lines.push(Line::Instruction(instruction));
    }

    pub fn comment<S: Into<String>>(&mut self, comment: S) {
        self.lines.push(Line::Comment(comment.into()));
    }

    /// Iterates over the instructions, skipping comments.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.lines.iter().filter_map(|line| match line {
            Line::Instruction(instruction) => Some(instruction),
            Line::Comment(_) => None,
        })
    }

    /// Resolves every symbol into an address.
    ///
    /// The first pass assigns each label the ROM address of the instruction following it. The
    /// second pass replaces symbolic addresses with labels, predefined symbols or, failing both,
    /// new variables allocated upwards from [VARIABLE_BASE].
    pub fn resolve(&self) -> Result<Rom, Error> {
        let mut symbols = PREDEFINED_SYMBOLS.clone();
        let mut labels = HashMap::new();
        let mut address = 0usize;

        for instruction in self.instructions() {
            match instruction {
                Instruction::Label(label) => {
                    if address > MAX_LITERAL as usize {
                        return Err(Error::RomOverflow(address));
                    }

                    if labels.insert(label.clone(), address as u16).is_some() {
                        return Err(Error::DuplicateLabel(label.clone()));
                    }
                },
                _ => address += 1,
            }
        }

        symbols.extend(labels);

        let mut next_variable = VARIABLE_BASE;
        let mut words = Vec::with_capacity(address);

        for instruction in self.instructions() {
            let word = match instruction {
                Instruction::Label(_) => continue,
                Instruction::Address(Address::Literal(value)) => Word::Load(*value),
                Instruction::Address(Address::Symbol(symbol)) => {
                    let value = match symbols.get(symbol) {
                        Some(value) => *value,
                        None => {
                            if next_variable > MAX_LITERAL {
                                return Err(Error::RamOverflow(symbol.clone()));
                            }

                            symbols.insert(symbol.clone(), next_variable);
                            next_variable += 1;
                            next_variable - 1
                        },
                    };

                    Word::Load(value)
                },
                Instruction::Compute { dest, comp, jump } => Word::Compute {
                    dest: *dest,
                    comp: *comp,
                    jump: *jump,
                },
            };

            words.push(word);
        }

        Ok(Rom { words, symbols })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }

        Ok(())
    }
}

/// A resolved instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Word {
    Load(u16),
    Compute {
        dest: Dest,
        comp: Comp,
        jump: Option<Jump>,
    },
}

/// A program with all symbols resolved, ready to be loaded into the emulator.
#[derive(Clone, Debug)]
pub struct Rom {
    pub words: Vec<Word>,

    /// Every symbol known after resolution, including labels and variables.
    pub symbols: HashMap<String, u16>,
}

impl Rom {
    pub fn symbol(&self, name: &str) -> Option<u16> {
        self.symbols.get(name).cloned()
    }
}
