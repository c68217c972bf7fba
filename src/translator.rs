//! Translation of stack machine programs into target assembly.
//!
//! Each input file is translated on its own, sharing one output listing. Static variables become
//! `<file>.<index>` symbols and flow labels are qualified with the enclosing function, so files
//! translated into the same listing never clash.
//!
//! ```
//! use vack::translator::{Prologue, Translator};
//! use vack::vm::Program;
//!
//! let vm = Program::parse("push constant 7\npush constant 8\nadd").unwrap();
//!
//! let mut translator = Translator::new(Prologue::Test);
//! translator.translate_file("Main", &vm).unwrap();
//! let assembly = translator.finish();
//!
//! assert!(assembly.to_string().contains("// add"));
//! ```

use std::fmt;

use slog::{debug, o, trace, Discard, Logger};

use crate::assembly::Program as Assembly;
use crate::instruction::{is_symbol, Address, Comp, Dest, Instruction, Jump, MAX_LITERAL};
use crate::vm::{ArithmeticOp, Command, Program, Segment, SegmentError};

/// Label of the routine shared by every `return`.
pub const RETURN_ROUTINE: &str = "VM_RETURN";

/// Label of the loop the program ends in.
pub const HALT_LABEL: &str = "VM_HALT";

/// Return label of the bootstrap call to `Sys.init`.
pub const BOOTSTRAP_RETURN: &str = "BOOTSTRAP$ret";

/// Stack base used by both prologues.
pub const STACK_BASE: u16 = 256;

/// Code placed before the translated files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prologue {
    /// Sets up the stack and calls `Sys.init`.
    Runtime,

    /// Sets the stack and the segment base registers to fixed values and runs the translated
    /// code directly, halting after its last command. Used to test code without a `Sys.init`.
    Test,
}

impl Default for Prologue {
    fn default() -> Prologue {
        Prologue::Runtime
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    InvalidFileName,
    InvalidName(String),
    Segment(SegmentError),
    TooManyArguments(u16),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub file: String,
    pub command: Option<Command>,
    pub kind: ErrorKind,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "in {}", self.file)?;

        if let Some(command) = &self.command {
            write!(f, ", '{}'", command)?;
        }

        match &self.kind {
            ErrorKind::InvalidFileName => write!(f, ": file name is not a valid symbol"),
            ErrorKind::InvalidName(name) => write!(f, ": '{}' is not a valid symbol", name),
            ErrorKind::Segment(err) => write!(f, ": {}", err),
            ErrorKind::TooManyArguments(args) => write!(f, ": {} arguments is too many", args),
        }
    }
}

impl std::error::Error for Error {}

fn base(segment: Segment) -> &'static str {
    match segment {
        Segment::Local => "LCL",
        Segment::Argument => "ARG",
        Segment::This | Segment::Pointer => "THIS",
        Segment::That => "THAT",
        Segment::Temp => "R5",
        Segment::Uart => "UART",
        Segment::Static | Segment::Constant => "",
    }
}

fn is_indirect(segment: Segment) -> bool {
    match segment {
        Segment::Local | Segment::Argument | Segment::This | Segment::That => true,
        _ => false,
    }
}

/// Translates stack machine programs into a single assembly listing.
pub struct Translator {
    logger: Logger,
    prologue: Prologue,
    output: Assembly,

    /// Stem of the file being translated.
    file: String,

    /// Function being translated, if any.
    function: Option<String>,

    /// Comparisons translated so far in the current file.
    comparisons: usize,

    /// Calls translated so far in the current function.
    calls: usize,
}

impl Translator {
    pub fn new(prologue: Prologue) -> Translator {
        Translator::with_logger(prologue, None)
    }

    /// Creates a translator and emits the prologue.
    pub fn with_logger<L>(prologue: Prologue, logger: L) -> Translator
    where
        L: Into<Option<Logger>>,
    {
        let logger = logger.into()
            .unwrap_or(Logger::root(Discard, o!()))
            .new(o!("stage" => "translation"));

        let mut translator = Translator {
            logger,
            prologue,
            output: Assembly::new(),
            file: String::new(),
            function: None,
            comparisons: 0,
            calls: 0,
        };

        translator.prologue();

        translator
    }

    fn at<A: Into<Address>>(&mut self, address: A) {
        self.output.push(Instruction::at(address));
    }

    fn set(&mut self, dest: Dest, comp: Comp) {
        self.output.push(Instruction::set(dest, comp));
    }

    fn jump(&mut self, comp: Comp, jump: Jump) {
        self.output.push(Instruction::jump(comp, jump));
    }

    fn label<S: Into<String>>(&mut self, label: S) {
        self.output.push(Instruction::label(label));
    }

    /// `RAM[register] = value`
    fn store(&mut self, register: &str, value: u16) {
        self.at(value);
        self.set(Dest::D, Comp::A);
        self.at(register);
        self.set(Dest::M, Comp::D);
    }

    /// Pushes `D`.
    fn push_d(&mut self) {
        self.at("SP");
        self.set(Dest::A, Comp::M);
        self.set(Dest::M, Comp::D);
        self.at("SP");
        self.set(Dest::M, Comp::MPlusOne);
    }

    /// Pops into `D`.
    fn pop_d(&mut self) {
        self.at("SP");
        self.set(Dest::AM, Comp::MMinusOne);
        self.set(Dest::D, Comp::M);
    }

    fn halt(&mut self) {
        self.label(HALT_LABEL);
        self.at(HALT_LABEL);
        self.jump(Comp::Zero, Jump::Always);
    }

    fn prologue(&mut self) {
        self.output.comment("bootstrap");
        self.store("SP", STACK_BASE);

        match self.prologue {
            Prologue::Runtime => {
                self.call_with_return("Sys.init", 0, BOOTSTRAP_RETURN.to_string());
                self.halt();
            },
            Prologue::Test => {
                self.store("LCL", 3000);
                self.store("ARG", 3010);
                self.store("THIS", 3020);
                self.store("THAT", 3030);
            },
        }
    }

    fn static_symbol(&self, index: u16) -> String {
        format!("{}.{}", self.file, index)
    }

    /// Qualifies a flow label with the enclosing function.
    fn flow_label(&self, label: &str) -> String {
        match &self.function {
            Some(function) => format!("{}${}", function, label),
            None => label.to_string(),
        }
    }

    fn push(&mut self, segment: Segment, index: u16) {
        match segment {
            Segment::Constant => {
                self.at(index);
                self.set(Dest::D, Comp::A);
            },
            Segment::Static => {
                self.at(self.static_symbol(index));
                self.set(Dest::D, Comp::M);
            },
            _ => {
                self.at(index);
                self.set(Dest::D, Comp::A);
                self.at(base(segment));

                if is_indirect(segment) {
                    self.set(Dest::A, Comp::M);
                }

                self.set(Dest::A, Comp::DPlusA);
                self.set(Dest::D, Comp::M);
            },
        }

        self.push_d();
    }

    fn pop(&mut self, segment: Segment, index: u16) {
        match segment {
            Segment::Static => {
                self.at(self.static_symbol(index));
                self.set(Dest::D, Comp::A);
            },
            _ => {
                self.at(index);
                self.set(Dest::D, Comp::A);
                self.at(base(segment));

                if is_indirect(segment) {
                    self.set(Dest::A, Comp::M);
                }

                self.set(Dest::D, Comp::DPlusA);
            },
        }

        self.at("R13");
        self.set(Dest::M, Comp::D);
        self.pop_d();
        self.at("R13");
        self.set(Dest::A, Comp::M);
        self.set(Dest::M, Comp::D);
    }

    fn arithmetic(&mut self, op: ArithmeticOp) {
        let comp = match op {
            ArithmeticOp::Neg | ArithmeticOp::Not => {
                self.at("SP");
                self.set(Dest::A, Comp::MMinusOne);

                let comp = match op {
                    ArithmeticOp::Neg => Comp::NegM,
                    _ => Comp::NotM,
                };

                self.set(Dest::M, comp);
                return;
            },
            ArithmeticOp::Add => Comp::DPlusM,
            ArithmeticOp::Sub => Comp::MMinusD,
            ArithmeticOp::And => Comp::DAndM,
            ArithmeticOp::Or => Comp::DOrM,
            ArithmeticOp::Eq | ArithmeticOp::Gt | ArithmeticOp::Lt => return self.comparison(op),
        };

        self.pop_d();
        self.set(Dest::A, Comp::AMinusOne);
        self.set(Dest::M, comp);
    }

    /// Compares the two topmost values without overflowing.
    ///
    /// Values of opposite signs are ordered by their signs alone. Only values of the same sign
    /// are subtracted, which can not overflow.
    fn comparison(&mut self, op: ArithmeticOp) {
        let n = self.comparisons;
        self.comparisons += 1;

        let prefix = format!("{}${}", self.file, op.as_str().to_ascii_uppercase());
        let label = |part: &str| format!("{}_{}.{}", prefix, part, n);

        let (jump, positive_first, negative_first) = match op {
            ArithmeticOp::Gt => (Jump::Greater, "TRUE", "FALSE"),
            ArithmeticOp::Lt => (Jump::Less, "FALSE", "TRUE"),
            _ => (Jump::Equal, "FALSE", "FALSE"),
        };

        // R13 = y, R14 = x
        self.pop_d();
        self.at("R13");
        self.set(Dest::M, Comp::D);
        self.pop_d();
        self.at("R14");
        self.set(Dest::M, Comp::D);

        self.at(label("XNEG"));
        self.jump(Comp::D, Jump::Less);

        // x >= 0
        self.at("R13");
        self.set(Dest::D, Comp::M);
        self.at(label("SAMESIGN"));
        self.jump(Comp::D, Jump::GreaterOrEqual);
        self.at(label(positive_first));
        self.jump(Comp::Zero, Jump::Always);

        // x < 0
        self.label(label("XNEG"));
        self.at("R13");
        self.set(Dest::D, Comp::M);
        self.at(label("SAMESIGN"));
        self.jump(Comp::D, Jump::Less);
        self.at(label(negative_first));
        self.jump(Comp::Zero, Jump::Always);

        self.label(label("SAMESIGN"));
        self.at("R13");
        self.set(Dest::D, Comp::M);
        self.at("R14");
        self.set(Dest::D, Comp::MMinusD);
        self.at(label("TRUE"));
        self.jump(Comp::D, jump);

        self.label(label("FALSE"));
        self.set(Dest::D, Comp::Zero);
        self.at(label("END"));
        self.jump(Comp::Zero, Jump::Always);

        self.label(label("TRUE"));
        self.set(Dest::D, Comp::MinusOne);

        self.label(label("END"));
        self.push_d();
    }

    fn call_with_return(&mut self, function: &str, args: u16, return_label: String) {
        self.at(return_label.as_str());
        self.set(Dest::D, Comp::A);
        self.push_d();

        for register in &["LCL", "ARG", "THIS", "THAT"] {
            self.at(*register);
            self.set(Dest::D, Comp::M);
            self.push_d();
        }

        // ARG = SP - 5 - args
        self.at("SP");
        self.set(Dest::D, Comp::M);
        self.at(5 + args);
        self.set(Dest::D, Comp::DMinusA);
        self.at("ARG");
        self.set(Dest::M, Comp::D);

        // LCL = SP
        self.at("SP");
        self.set(Dest::D, Comp::M);
        self.at("LCL");
        self.set(Dest::M, Comp::D);

        self.at(function);
        self.jump(Comp::Zero, Jump::Always);
        self.label(return_label);
    }

    fn call(&mut self, function: &str, args: u16) {
        let caller = self.function.as_ref().unwrap_or(&self.file);
        let return_label = format!("{}$ret.{}", caller, self.calls);
        self.calls += 1;

        self.call_with_return(function, args, return_label);
    }

    fn function(&mut self, name: &str, locals: u16) {
        self.function = Some(name.to_string());
        self.calls = 0;

        self.label(name);

        for _ in 0..locals {
            self.at("SP");
            self.set(Dest::A, Comp::M);
            self.set(Dest::M, Comp::Zero);
            self.at("SP");
            self.set(Dest::M, Comp::MPlusOne);
        }
    }

    fn return_routine(&mut self) {
        self.output.comment("shared return routine");
        self.label(RETURN_ROUTINE);

        // R13 = frame
        self.at("LCL");
        self.set(Dest::D, Comp::M);
        self.at("R13");
        self.set(Dest::M, Comp::D);

        // R14 = return address
        self.at(5);
        self.set(Dest::A, Comp::DMinusA);
        self.set(Dest::D, Comp::M);
        self.at("R14");
        self.set(Dest::M, Comp::D);

        // *ARG = pop(), SP = ARG + 1
        self.pop_d();
        self.at("ARG");
        self.set(Dest::A, Comp::M);
        self.set(Dest::M, Comp::D);
        self.at("ARG");
        self.set(Dest::D, Comp::MPlusOne);
        self.at("SP");
        self.set(Dest::M, Comp::D);

        for register in &["THAT", "THIS", "ARG", "LCL"] {
            self.at("R13");
            self.set(Dest::AM, Comp::MMinusOne);
            self.set(Dest::D, Comp::M);
            self.at(*register);
            self.set(Dest::M, Comp::D);
        }

        self.at("R14");
        self.set(Dest::A, Comp::M);
        self.jump(Comp::Zero, Jump::Always);
    }

    fn check_name(name: &str) -> Result<(), ErrorKind> {
        match is_symbol(name) {
            true => Ok(()),
            false => Err(ErrorKind::InvalidName(name.to_string())),
        }
    }

    fn translate_command(&mut self, command: &Command) -> Result<(), ErrorKind> {
        command.validate().map_err(ErrorKind::Segment)?;

        self.output.comment(command.to_string());

        match command {
            Command::Push(segment, index) => self.push(*segment, *index),
            Command::Pop(segment, index) => self.pop(*segment, *index),
            Command::Arithmetic(op) => self.arithmetic(*op),
            Command::Label(label) => {
                Translator::check_name(label)?;
                self.label(self.flow_label(label));
            },
            Command::Goto(label) => {
                Translator::check_name(label)?;
                self.at(self.flow_label(label));
                self.jump(Comp::Zero, Jump::Always);
            },
            Command::IfGoto(label) => {
                Translator::check_name(label)?;
                self.pop_d();
                self.at(self.flow_label(label));
                self.jump(Comp::D, Jump::NotEqual);
            },
            Command::Function { name, locals } => {
                Translator::check_name(name)?;
                self.function(name, *locals);
            },
            Command::Call { name, args } => {
                Translator::check_name(name)?;

                if *args > MAX_LITERAL - 5 {
                    return Err(ErrorKind::TooManyArguments(*args));
                }

                self.call(name, *args);
            },
            Command::Return => {
                self.at(RETURN_ROUTINE);
                self.jump(Comp::Zero, Jump::Always);
            },
        }

        Ok(())
    }

    /// Translates one file. `file` is the file name without directories or extension; it
    /// qualifies the file's static variables.
    pub fn translate_file(&mut self, file: &str, program: &Program) -> Result<(), Error> {
        let logger = self.logger.new(o!("file" => file.to_string()));

        if !is_symbol(file) {
            return Err(Error {
                file: file.to_string(),
                command: None,
                kind: ErrorKind::InvalidFileName,
            });
        }

        self.file = file.to_string();
        self.function = None;
        self.comparisons = 0;
        self.calls = 0;

        debug!(logger, "translating file"; "commands" => program.len());

        for command in program {
            let start = self.output.lines.len();

            self.translate_command(command)
                .map_err(|kind| Error {
                    file: file.to_string(),
                    command: Some(command.clone()),
                    kind,
                })?;

            trace!(logger, "translated command";
                "command" => command.to_string(),
                "lines" => self.output.lines.len() - start);
        }

        Ok(())
    }

    /// Finishes the listing with the halt loop (test prologue only) and the shared return
    /// routine.
    pub fn finish(mut self) -> Assembly {
        if self.prologue == Prologue::Test {
            self.output.comment("end of program");
            self.halt();
        }

        self.return_routine();

        debug!(self.logger, "translation finished"; "instructions" => self.output.instructions().count());

        self.output
    }
}

/// Translates a set of files, given as `(stem, program)` pairs, into one listing.
pub fn translate<'a, I>(files: I, prologue: Prologue) -> Result<Assembly, Error>
where
    I: IntoIterator<Item = (&'a str, &'a Program)>,
{
    let mut translator = Translator::new(prologue);

    for (file, program) in files {
        translator.translate_file(file, program)?;
    }

    Ok(translator.finish())
}
