//! Types for representing target assembly instructions and their parts.

use std::fmt;
use std::str::FromStr;

/// Largest value that fits into an address instruction.
pub const MAX_LITERAL: u16 = 32767;

/// True if `c` may appear in a symbol.
pub fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_.$:".contains(c)
}

/// True if `s` is a valid symbol: symbol characters only, not starting with a digit.
pub fn is_symbol(s: &str) -> bool {
    match s.chars().next() {
        Some(first) => !first.is_ascii_digit() && s.chars().all(is_symbol_char),
        None => false,
    }
}

/// Operand of an address instruction (`@value`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    Literal(u16),
    Symbol(String),
}

impl From<u16> for Address {
    fn from(value: u16) -> Address {
        Address::Literal(value)
    }
}

impl From<&str> for Address {
    fn from(symbol: &str) -> Address {
        Address::Symbol(symbol.to_string())
    }
}

impl From<String> for Address {
    fn from(symbol: String) -> Address {
        Address::Symbol(symbol)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Literal(value) => write!(f, "{}", value),
            Address::Symbol(symbol) => f.write_str(symbol),
        }
    }
}

/// Destination registers of a compute instruction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dest {
    pub a: bool,
    pub m: bool,
    pub d: bool,
}

impl Dest {
    pub const NONE: Dest = Dest { a: false, m: false, d: false };
    pub const A: Dest = Dest { a: true, m: false, d: false };
    pub const M: Dest = Dest { a: false, m: true, d: false };
    pub const D: Dest = Dest { a: false, m: false, d: true };
    pub const AM: Dest = Dest { a: true, m: true, d: false };
    pub const AD: Dest = Dest { a: true, m: false, d: true };
    pub const MD: Dest = Dest { a: false, m: true, d: true };
    pub const AMD: Dest = Dest { a: true, m: true, d: true };

    pub fn is_empty(self) -> bool {
        self == Dest::NONE
    }
}

impl FromStr for Dest {
    type Err = ();

    /// Accepts any order of the letters `A`, `M` and `D`, each at most once.
    fn from_str(s: &str) -> Result<Dest, ()> {
        let mut dest = Dest::NONE;

        for c in s.chars() {
            let slot = match c {
                'A' => &mut dest.a,
                'M' => &mut dest.m,
                'D' => &mut dest.d,
                _ => return Err(()),
            };

            if *slot {
                return Err(());
            }

            *slot = true;
        }

        match dest.is_empty() {
            true => Err(()),
            false => Ok(dest),
        }
    }
}

impl fmt::Display for Dest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.a {
            f.write_str("A")?;
        }

        if self.m {
            f.write_str("M")?;
        }

        if self.d {
            f.write_str("D")?;
        }

        Ok(())
    }
}

macro_rules! comps {
    ( $( $variant:ident $text:literal $( | $alias:literal )* ),* $(,)* ) => {
        /// Computations supported by the ALU.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum Comp {
            $( $variant ),*
        }

        impl Comp {
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Comp::$variant => $text, )*
                }
            }
        }

        impl FromStr for Comp {
            type Err = ();

            fn from_str(s: &str) -> Result<Comp, ()> {
                match s {
                    $( $text $( | $alias )* => Ok(Comp::$variant), )*
                    _ => Err(()),
                }
            }
        }
    };
}

comps! {
    Zero "0",
    One "1",
    MinusOne "-1",
    D "D",
    A "A",
    M "M",
    NotD "!D",
    NotA "!A",
    NotM "!M",
    NegD "-D",
    NegA "-A",
    NegM "-M",
    DPlusOne "D+1" | "1+D",
    APlusOne "A+1" | "1+A",
    MPlusOne "M+1" | "1+M",
    DMinusOne "D-1",
    AMinusOne "A-1",
    MMinusOne "M-1",
    DPlusA "D+A" | "A+D",
    DPlusM "D+M" | "M+D",
    DMinusA "D-A",
    DMinusM "D-M",
    AMinusD "A-D",
    MMinusD "M-D",
    DAndA "D&A" | "A&D",
    DAndM "D&M" | "M&D",
    DOrA "D|A" | "A|D",
    DOrM "D|M" | "M|D",
}

impl Comp {
    /// True if the computation reads the memory word addressed by `A`.
    pub fn reads_memory(self) -> bool {
        self.as_str().contains('M')
    }

    /// Evaluates the computation with 16-bit wrapping arithmetic.
    pub fn evaluate(self, d: i16, a: i16, m: i16) -> i16 {
        match self {
            Comp::Zero => 0,
            Comp::One => 1,
            Comp::MinusOne => -1,
            Comp::D => d,
            Comp::A => a,
            Comp::M => m,
            Comp::NotD => !d,
            Comp::NotA => !a,
            Comp::NotM => !m,
            Comp::NegD => d.wrapping_neg(),
            Comp::NegA => a.wrapping_neg(),
            Comp::NegM => m.wrapping_neg(),
            Comp::DPlusOne => d.wrapping_add(1),
            Comp::APlusOne => a.wrapping_add(1),
            Comp::MPlusOne => m.wrapping_add(1),
            Comp::DMinusOne => d.wrapping_sub(1),
            Comp::AMinusOne => a.wrapping_sub(1),
            Comp::MMinusOne => m.wrapping_sub(1),
            Comp::DPlusA => d.wrapping_add(a),
            Comp::DPlusM => d.wrapping_add(m),
            Comp::DMinusA => d.wrapping_sub(a),
            Comp::DMinusM => d.wrapping_sub(m),
            Comp::AMinusD => a.wrapping_sub(d),
            Comp::MMinusD => m.wrapping_sub(d),
            Comp::DAndA => d & a,
            Comp::DAndM => d & m,
            Comp::DOrA => d | a,
            Comp::DOrM => d | m,
        }
    }
}

impl fmt::Display for Comp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Jump conditions, tested against the result of the computation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Jump {
    /// Jump if the result is greater than zero. (`JGT`)
    Greater,
    /// Jump if the result is zero. (`JEQ`)
    Equal,
    /// `JGE`
    GreaterOrEqual,
    /// `JLT`
    Less,
    /// `JNE`
    NotEqual,
    /// `JLE`
    LessOrEqual,
    /// Unconditional jump. (`JMP`)
    Always,
}

impl Jump {
    pub fn as_str(self) -> &'static str {
        match self {
            Jump::Greater => "JGT",
            Jump::Equal => "JEQ",
            Jump::GreaterOrEqual => "JGE",
            Jump::Less => "JLT",
            Jump::NotEqual => "JNE",
            Jump::LessOrEqual => "JLE",
            Jump::Always => "JMP",
        }
    }

    pub fn test(self, value: i16) -> bool {
        match self {
            Jump::Greater => value > 0,
            Jump::Equal => value == 0,
            Jump::GreaterOrEqual => value >= 0,
            Jump::Less => value < 0,
            Jump::NotEqual => value != 0,
            Jump::LessOrEqual => value <= 0,
            Jump::Always => true,
        }
    }
}

impl FromStr for Jump {
    type Err = ();

    fn from_str(s: &str) -> Result<Jump, ()> {
        Ok(match s {
            "JGT" => Jump::Greater,
            "JEQ" => Jump::Equal,
            "JGE" => Jump::GreaterOrEqual,
            "JLT" => Jump::Less,
            "JNE" => Jump::NotEqual,
            "JLE" => Jump::LessOrEqual,
            "JMP" => Jump::Always,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line of target assembly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Loads a value into the `A` register. (`@value`)
    Address(Address),

    /// Computes a value, stores it into the destinations and optionally jumps.
    /// (`dest=comp;jump`)
    Compute {
        dest: Dest,
        comp: Comp,
        jump: Option<Jump>,
    },

    /// Declares a label for the address of the next instruction. (`(label)`)
    Label(String),
}

impl Instruction {
    pub fn at<A: Into<Address>>(address: A) -> Instruction {
        Instruction::Address(address.into())
    }

    pub fn set(dest: Dest, comp: Comp) -> Instruction {
        Instruction::Compute { dest, comp, jump: None }
    }

    pub fn jump(comp: Comp, jump: Jump) -> Instruction {
        Instruction::Compute { dest: Dest::NONE, comp, jump: Some(jump) }
    }

    pub fn label<S: Into<String>>(label: S) -> Instruction {
        Instruction::Label(label.into())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instruction::Address(address) => write!(f, "@{}", address),
            Instruction::Label(label) => write!(f, "({})", label),
            Instruction::Compute { dest, comp, jump } => {
                if !dest.is_empty() {
                    write!(f, "{}=", dest)?;
                }

                write!(f, "{}", comp)?;

                if let Some(jump) = jump {
                    write!(f, ";{}", jump)?;
                }

                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Instruction::at("SP").to_string(), "@SP");
        assert_eq!(Instruction::at(256).to_string(), "@256");
        assert_eq!(Instruction::set(Dest::AM, Comp::MMinusOne).to_string(), "AM=M-1");
        assert_eq!(Instruction::jump(Comp::Zero, Jump::Always).to_string(), "0;JMP");
        assert_eq!(Instruction::label("LOOP").to_string(), "(LOOP)");

        let full = Instruction::Compute { dest: Dest::MD, comp: Comp::DPlusOne, jump: Some(Jump::Less) };
        assert_eq!(full.to_string(), "MD=D+1;JLT");
    }

    #[test]
    fn test_dest_parse() {
        assert_eq!("DM".parse(), Ok(Dest::MD));
        assert_eq!("AMD".parse(), Ok(Dest::AMD));
        assert_eq!("MM".parse::<Dest>(), Err(()));
        assert_eq!("".parse::<Dest>(), Err(()));
        assert_eq!("X".parse::<Dest>(), Err(()));
    }

    #[test]
    fn test_comp_aliases() {
        assert_eq!("A+D".parse(), Ok(Comp::DPlusA));
        assert_eq!("M|D".parse(), Ok(Comp::DOrM));
        assert_eq!("D*A".parse::<Comp>(), Err(()));
    }

    #[test]
    fn test_evaluate_wraps() {
        assert_eq!(Comp::DPlusOne.evaluate(i16::MAX, 0, 0), i16::MIN);
        assert_eq!(Comp::NegM.evaluate(0, 0, i16::MIN), i16::MIN);
        assert_eq!(Comp::MMinusD.evaluate(1, 0, i16::MIN), i16::MAX);
        assert_eq!(Comp::NotD.evaluate(0, 0, 0), -1);
        assert!(Comp::DAndM.reads_memory());
        assert!(!Comp::DAndA.reads_memory());
    }

    #[test]
    fn test_symbols() {
        assert!(is_symbol("Main.main$ret.0"));
        assert!(is_symbol("_x:1"));
        assert!(!is_symbol("1x"));
        assert!(!is_symbol("a-b"));
        assert!(!is_symbol(""));
    }

    #[test]
    fn test_jumps() {
        assert!(Jump::Greater.test(1));
        assert!(!Jump::Greater.test(0));
        assert!(Jump::LessOrEqual.test(0));
        assert!(Jump::NotEqual.test(-5));
        assert!(Jump::Always.test(0));
    }
}
