//! A crate for compiling a small class-based teaching language down to the assembly of a minimal
//! 16-bit computer.
//!
//! Currently this crate provides the functionality to:
//! - Tokenize and parse `.jack` class sources into an AST, and dump both as XML.
//! - Compile classes into the stack machine language (`.vm` files).
//! - Translate stack machine programs into target assembly (`.asm` files).
//! - Resolve the symbols of target assembly and execute it on an emulator.
//!
//! Binary encoding of the assembly is left to the external assembler.
//!
//! # Example
//! ```
//! use vack::{
//!     jack::Class,
//!     compiler,
//!     translator::{self, Prologue},
//!     assembly,
//!     emulator::{Emulator, TestIo},
//! };
//!
//! // A class whose entry routine stores a result in a static variable.
//! let source = r#"
//!     class Sys {
//!         static int result;
//!
//!         function void init() {
//!             let result = (2 + 3) - 10;
//!             return;
//!         }
//!     }
//! "#;
//!
//! // Parse the source into an AST.
//! let class = Class::parse(source).unwrap();
//!
//! // Generate stack machine code.
//! let vm = compiler::compile(&class).unwrap();
//!
//! // Translate it into assembly, with a prologue calling `Sys.init`.
//! let asm = translator::translate(vec![("Sys", &vm)], Prologue::Runtime).unwrap();
//!
//! // Resolve the symbols and run the program.
//! let rom = assembly::Program::parse(&asm.to_string()).unwrap().resolve().unwrap();
//! let mut emulator = Emulator::new(rom, TestIo::new());
//!
//! emulator.run_limited(10_000).unwrap();
//!
//! assert_eq!(emulator.symbol("Sys.0"), Some(-5));
//! ```
//!
//! # Executables
//!
//! Enabled with the `tools` feature.
//!
//! ## `vackc`
//!
//! Compiles each given `.jack` file, writing a token dump (`<name>T.xml`), a parse tree dump
//! (`<name>.xml`) and the stack machine code (`<name>.vm`) next to it.
//!
//! ## `vacktrans`
//!
//! Translates `.vm` files into a single assembly listing. `--test-prologue` replaces the call to
//! `Sys.init` with fixed segment base addresses.
//!
//! ## `vackrun`
//!
//! Executes `.asm` files, or `.vm` files after translating them, printing the serial output.
pub mod parsing;
pub mod error;
pub mod jack;
pub mod symbol_table;
pub mod compiler;
pub mod vm;
pub mod translator;
pub mod instruction;
pub mod assembly;
pub mod emulator;
