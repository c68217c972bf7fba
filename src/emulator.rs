//! [Emulator] for executing [resolved assembly programs](crate::assembly::Rom).

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io::{Read, Write};

use slog::{debug, o, trace, Discard, Logger};

use crate::assembly::{Rom, Word};
use crate::instruction::Jump;

/// Number of words in the data memory.
pub const RAM_SIZE: usize = 32768;

/// Address of the serial transmit register.
pub const TX: u16 = 24577;

/// Address of the serial receive register.
pub const RX: u16 = 24578;

/// Address of the serial status register.
pub const UARTSTAT: u16 = 24579;

/// Contains the registers of the processor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Context {
    /// The Program Counter stores the address of the next instruction to be executed.
    pub pc: u16,

    /// The address register, also used as a general purpose register.
    pub a: i16,

    /// The data register.
    pub d: i16,
}

/// Interface to the serial port.
pub trait InputOutput {
    /// Called when the program writes to [TX].
    ///
    /// # Parameters
    /// - `data`: The value written, normally a single byte.
    fn transmit(&mut self, data: u16);

    /// Called when the program reads [RX].
    ///
    /// # Returns
    /// The next received byte, or 0 if there is none.
    fn receive(&mut self) -> u16;

    /// Called when the program reads [UARTSTAT].
    ///
    /// # Returns
    /// A word with bit 0 set if data can be received and bit 1 set if data can be transmitted.
    fn status(&mut self) -> u16;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The program accessed memory past the end of the RAM.
    InvalidAddress {
        pc: u16,
        address: i16,
    },

    /// The program did not halt within the given number of steps.
    StepLimit(u64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidAddress { pc, address } =>
                write!(f, "invalid memory address {} accessed at pc {}", *address as u16, pc),
            Error::StepLimit(steps) => write!(f, "program did not halt within {} steps", steps),
        }
    }
}

impl std::error::Error for Error {}

/// The emulator contains all neccessary context for executing a program and an interface for
/// doing IO.
pub struct Emulator<IO> {
    /// The instructions of the program.
    pub rom: Vec<Word>,

    /// The data memory.
    pub ram: Vec<i16>,

    /// Symbols of the program, used to look up variables.
    pub symbols: HashMap<String, u16>,

    /// The registers of the CPU.
    pub context: Context,

    /// Interface for the serial port.
    pub io: IO,

    /// True if the execution has been halted.
    pub halted: bool,

    /// Number of instructions executed so far.
    pub steps: u64,

    logger: Logger,
}

impl<IO> Emulator<IO> where IO: InputOutput {
    /// Create a new emulator.
    ///
    /// # Parameters
    /// - `rom`: The resolved program.
    /// - `io`: An [IO handler](InputOutput).
    pub fn new(rom: Rom, io: IO) -> Emulator<IO> {
        Emulator::with_logger(rom, io, None)
    }

    pub fn with_logger<L>(rom: Rom, io: IO, logger: L) -> Emulator<IO>
    where
        L: Into<Option<Logger>>,
    {
        let logger = logger.into()
            .unwrap_or(Logger::root(Discard, o!()))
            .new(o!("stage" => "emulation"));

        Emulator {
            rom: rom.words,
            ram: vec![0; RAM_SIZE],
            symbols: rom.symbols,
            context: Context::default(),
            io,
            halted: false,
            steps: 0,
            logger,
        }
    }

    fn check_address(&self, address: i16) -> Result<usize, Error> {
        match address >= 0 {
            true => Ok(address as usize),
            false => Err(Error::InvalidAddress { pc: self.context.pc, address }),
        }
    }

    /// Reads a data word as the program would, going through the IO handler for the serial
    /// registers.
    fn read(&mut self, address: i16) -> Result<i16, Error> {
        let index = self.check_address(address)?;

        let value = match address as u16 {
            RX => self.io.receive() as i16,
            UARTSTAT => self.io.status() as i16,
            _ => self.ram[index],
        };

        Ok(value)
    }

    fn write(&mut self, address: i16, value: i16) -> Result<(), Error> {
        let index = self.check_address(address)?;

        if address as u16 == TX {
            trace!(self.logger, "transmit"; "data" => value);
            self.io.transmit(value as u16);
        }

        self.ram[index] = value;

        Ok(())
    }

    /// Value of a data word. Does not touch the IO handler.
    pub fn ram(&self, address: u16) -> i16 {
        self.ram.get(address as usize).cloned().unwrap_or(0)
    }

    /// Value of the data word a symbol refers to.
    pub fn symbol(&self, name: &str) -> Option<i16> {
        self.symbols.get(name).map(|address| self.ram(*address))
    }

    /// True if the instruction at `pc` is a jump to the instruction just before it, which loads
    /// its own address.
    fn is_halt_loop(&self, pc: u16, target: u16) -> bool {
        pc > 0
            && target == pc - 1
            && self.rom.get(target as usize) == Some(&Word::Load(target))
    }

    /// Fetches the next instruction and executes it.
    ///
    /// The emulator halts when the program counter leaves the ROM or the program enters a loop
    /// of the form `(L) @L 0;JMP`.
    ///
    /// # Errors
    /// Returns an error if the instruction accesses memory outside the RAM.
    pub fn step(&mut self) -> Result<(), Error> {
        if self.halted {
            return Ok(());
        }

        let pc = self.context.pc;

        let word = match self.rom.get(pc as usize) {
            Some(word) => *word,
            None => {
                debug!(self.logger, "program counter left the program"; "pc" => pc, "steps" => self.steps);
                self.halted = true;
                return Ok(());
            },
        };

        self.steps += 1;

        match word {
            Word::Load(value) => {
                self.context.a = value as i16;
                self.context.pc += 1;
            },
            Word::Compute { dest, comp, jump } => {
                let a = self.context.a;

                let m = match comp.reads_memory() {
                    true => self.read(a)?,
                    false => 0,
                };

                let value = comp.evaluate(self.context.d, a, m);

                if dest.m {
                    self.write(a, value)?;
                }

                if dest.a {
                    self.context.a = value;
                }

                if dest.d {
                    self.context.d = value;
                }

                match jump {
                    Some(jump) if jump.test(value) => {
                        let target = a as u16;

                        if jump == Jump::Always && self.is_halt_loop(pc, target) {
                            debug!(self.logger, "halted"; "pc" => pc, "steps" => self.steps);
                            self.halted = true;
                        }

                        self.context.pc = target;
                    },
                    _ => self.context.pc += 1,
                }
            },
        }

        Ok(())
    }

    /// Executes the program until it halts.
    ///
    /// # Errors
    /// Returns an error if an instruction accesses memory outside the RAM.
    pub fn run(&mut self) -> Result<(), Error> {
        while !self.halted {
            self.step()?;
        }

        Ok(())
    }

    /// Executes the program until it halts or `max_steps` instructions have been executed.
    ///
    /// # Errors
    /// Returns [Error::StepLimit] if the program is still running after `max_steps`.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<(), Error> {
        let limit = self.steps + max_steps;

        while !self.halted {
            if self.steps >= limit {
                return Err(Error::StepLimit(max_steps));
            }

            self.step()?;
        }

        Ok(())
    }
}

/// An IO handler for testing purposes.
///
/// Reads received bytes from a pre-determined input buffer and appends transmitted bytes to an
/// output buffer.
#[derive(Debug, Clone, Default)]
pub struct TestIo {
    input_buffer: VecDeque<u16>,
    output_buffer: Vec<u16>,
}

impl TestIo {
    pub fn new() -> TestIo {
        TestIo::default()
    }

    pub fn with_input<I: IntoIterator<Item=u16>>(input: I) -> TestIo {
        TestIo {
            input_buffer: input.into_iter().collect(),
            output_buffer: Vec::new(),
        }
    }

    pub fn input(&mut self, value: u16) {
        self.input_buffer.push_back(value);
    }

    pub fn output(&self) -> &[u16] {
        &self.output_buffer[..]
    }

    /// The output interpreted as Latin-1 text.
    pub fn output_string(&self) -> String {
        self.output_buffer.iter()
            .map(|data| (*data as u8) as char)
            .collect()
    }

    pub fn into_output(self) -> Vec<u16> {
        self.output_buffer
    }
}

impl InputOutput for TestIo {
    fn transmit(&mut self, data: u16) {
        self.output_buffer.push(data);
    }

    fn receive(&mut self) -> u16 {
        self.input_buffer.pop_front().unwrap_or(0)
    }

    fn status(&mut self) -> u16 {
        match self.input_buffer.is_empty() {
            true => 0b10,
            false => 0b11,
        }
    }
}

impl InputOutput for &mut TestIo {
    fn transmit(&mut self, data: u16) {
        (**self).transmit(data)
    }

    fn receive(&mut self) -> u16 {
        (**self).receive()
    }

    fn status(&mut self) -> u16 {
        (**self).status()
    }
}

/// An IO handler connecting the serial port to the terminal.
///
/// Transmitted bytes are written to the standard output and received bytes are read from the
/// standard input. At the end of input, or if reading fails, the receive register reads 0xFFFF.
pub struct StdIo;

impl InputOutput for StdIo {
    fn transmit(&mut self, data: u16) {
        let stdout = std::io::stdout();
        let mut stdout = stdout.lock();

        let _ = stdout.write_all(&[data as u8]);
        let _ = stdout.flush();
    }

    fn receive(&mut self) -> u16 {
        std::io::stdin()
            .bytes()
            .next()
            .transpose()
            .unwrap_or(None)
            .map(|byte| byte as u16)
            .unwrap_or(0xFFFF)
    }

    fn status(&mut self) -> u16 {
        0b11
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::Program;

    macro_rules! assert_ram {
        ($emulator:expr, $address:expr, $value:expr) => {
            assert_eq!($emulator.ram($address), $value, "RAM[{}] != {}", $address, $value);
        };
    }

    fn emulator<IO: InputOutput>(source: &str, io: IO) -> Emulator<IO> {
        let rom = Program::parse(source).unwrap().resolve().unwrap();
        Emulator::new(rom, io)
    }

    #[test]
    fn test_arithmetic() {
        let mut emulator = emulator("
            @2
            D=A
            @3
            D=D+A
            @0
            M=D
            @32767
            D=A
            @x
            M=D+1
        ", TestIo::new());

        emulator.run().unwrap();

        assert_ram!(emulator, 0, 5);
        assert_ram!(emulator, 16, i16::MIN);
        assert_eq!(emulator.symbol("x"), Some(i16::MIN));
        assert_eq!(emulator.steps, 10);
    }

    #[test]
    fn test_halt_loop() {
        let mut emulator = emulator("
            @7
            D=A
        (END)
            @END
            0;JMP
            @99
        ", TestIo::new());

        emulator.run_limited(100).unwrap();

        assert!(emulator.halted);
        assert_eq!(emulator.context.pc, 2);
        assert_eq!(emulator.context.d, 7);
        assert_eq!(emulator.steps, 4);
    }

    #[test]
    fn test_conditional_jumps() {
        let mut emulator = emulator("
            @10
            D=A
        (LOOP)
            @count
            M=M+1
            D=D-1
            @LOOP
            D;JGT
        ", TestIo::new());

        emulator.run().unwrap();

        assert_eq!(emulator.symbol("count"), Some(10));
    }

    #[test]
    fn test_jump_uses_old_a() {
        let mut emulator = emulator("
            @5
            A=A+1;JMP
            @1
            D=A
            @2
            D=A
        ", TestIo::new());

        emulator.run().unwrap();

        assert_eq!(emulator.context.a, 6);
        assert_eq!(emulator.context.d, 6);
    }

    #[test]
    fn test_uart() {
        let mut io = TestIo::with_input(vec![104]);

        let mut emulator = emulator("
            @UARTSTAT
            D=M
            @status
            M=D
            @RX
            D=M
            @TX
            M=D
            @105
            D=A
            @TX
            M=D
        ", &mut io);

        emulator.run().unwrap();

        assert_eq!(emulator.symbol("status"), Some(0b11));
        drop(emulator);

        assert_eq!(io.output(), &[104, 105]);
        assert_eq!(io.output_string(), "hi");
    }

    #[test]
    fn test_step_limit() {
        let mut emulator = emulator("
        (A)
            @B
            0;JMP
        (B)
            @A
            0;JMP
        ", TestIo::new());

        assert_eq!(emulator.run_limited(50), Err(Error::StepLimit(50)));
        assert!(!emulator.halted);
    }

    #[test]
    fn test_invalid_address() {
        let mut emulator = emulator("
            @0
            A=!A
            M=1
        ", TestIo::new());

        assert_eq!(emulator.run(), Err(Error::InvalidAddress { pc: 2, address: -1 }));
    }
}
