//! Typed representation of stack machine programs.

use std::fmt;
use std::str::FromStr;

/// Largest index accepted by segments without a narrower bound.
pub const MAX_INDEX: u16 = 32767;

/// Named memory regions addressed by `push` and `pop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Argument,
    Local,
    Static,
    Constant,
    This,
    That,
    Pointer,
    Temp,
    /// Memory mapped serial port registers.
    Uart,
}

impl Segment {
    pub const ALL: [Segment; 9] = [
        Segment::Argument,
        Segment::Local,
        Segment::Static,
        Segment::Constant,
        Segment::This,
        Segment::That,
        Segment::Pointer,
        Segment::Temp,
        Segment::Uart,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::Constant => "constant",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
            Segment::Uart => "uart",
        }
    }

    /// Largest valid index for the segment.
    pub fn max_index(self) -> u16 {
        match self {
            Segment::Pointer => 1,
            Segment::Temp => 7,
            Segment::Uart => 2,
            _ => MAX_INDEX,
        }
    }
}

impl FromStr for Segment {
    type Err = ();

    fn from_str(s: &str) -> Result<Segment, ()> {
        Segment::ALL.iter()
            .copied()
            .find(|segment| segment.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 9] = [
        ArithmeticOp::Add,
        ArithmeticOp::Sub,
        ArithmeticOp::Neg,
        ArithmeticOp::Eq,
        ArithmeticOp::Gt,
        ArithmeticOp::Lt,
        ArithmeticOp::And,
        ArithmeticOp::Or,
        ArithmeticOp::Not,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }

    pub fn is_unary(self) -> bool {
        match self {
            ArithmeticOp::Neg | ArithmeticOp::Not => true,
            _ => false,
        }
    }

    pub fn is_comparison(self) -> bool {
        match self {
            ArithmeticOp::Eq | ArithmeticOp::Gt | ArithmeticOp::Lt => true,
            _ => false,
        }
    }
}

impl FromStr for ArithmeticOp {
    type Err = ();

    fn from_str(s: &str) -> Result<ArithmeticOp, ()> {
        ArithmeticOp::ALL.iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invalid `push` or `pop` operand.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentError {
    OutOfRange {
        segment: Segment,
        index: u32,
    },
    PopConstant,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SegmentError::OutOfRange { segment, index } => write!(
                f,
                "index {} out of range for segment {} (at most {})",
                index, segment, segment.max_index(),
            ),
            SegmentError::PopConstant => write!(f, "cannot pop to the constant segment"),
        }
    }
}

impl std::error::Error for SegmentError {}

/// Checks a segment operand. Returns the index narrowed to a word.
pub fn validate(segment: Segment, index: u32, pop: bool) -> Result<u16, SegmentError> {
    if pop && segment == Segment::Constant {
        return Err(SegmentError::PopConstant);
    }

    if index > segment.max_index() as u32 {
        return Err(SegmentError::OutOfRange { segment, index });
    }

    Ok(index as u16)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(ArithmeticOp),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function {
        name: String,
        locals: u16,
    },
    Call {
        name: String,
        args: u16,
    },
    Return,
}

impl Command {
    /// A `push` with a range checked index.
    pub fn push(segment: Segment, index: u32) -> Result<Command, SegmentError> {
        validate(segment, index, false).map(|index| Command::Push(segment, index))
    }

    /// A `pop` with a range checked index.
    pub fn pop(segment: Segment, index: u32) -> Result<Command, SegmentError> {
        validate(segment, index, true).map(|index| Command::Pop(segment, index))
    }

    /// Re-checks the operands of a `push` or `pop` built without the checked constructors.
    pub fn validate(&self) -> Result<(), SegmentError> {
        match *self {
            Command::Push(segment, index) => validate(segment, index as u32, false).map(|_| ()),
            Command::Pop(segment, index) => validate(segment, index as u32, true).map(|_| ()),
            _ => Ok(()),
        }
    }
}

impl From<ArithmeticOp> for Command {
    fn from(op: ArithmeticOp) -> Command {
        Command::Arithmetic(op)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Command::Push(segment, index) => write!(f, "push {} {}", segment, index),
            Command::Pop(segment, index) => write!(f, "pop {} {}", segment, index),
            Command::Arithmetic(op) => write!(f, "{}", op),
            Command::Label(label) => write!(f, "label {}", label),
            Command::Goto(label) => write!(f, "goto {}", label),
            Command::IfGoto(label) => write!(f, "if-goto {}", label),
            Command::Function { name, locals } => write!(f, "function {} {}", name, locals),
            Command::Call { name, args } => write!(f, "call {} {}", name, args),
            Command::Return => write!(f, "return"),
        }
    }
}

/// A stack machine program, usually the translation of one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub commands: Vec<Command>,
}

impl Program {
    pub fn new() -> Program {
        Program::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn iter(&self) -> std::slice::Iter<Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl From<Vec<Command>> for Program {
    fn from(commands: Vec<Command>) -> Program {
        Program { commands }
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// One command per line.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for command in &self.commands {
            writeln!(f, "{}", command)?;
        }

        Ok(())
    }
}
