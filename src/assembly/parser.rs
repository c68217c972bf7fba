use std::fmt;
use std::result::Result as StdResult;

use nom::{
    IResult,
    bytes::complete::{tag, take_while, take_while1},
    branch::alt,
    character::complete::{char, digit1},
    combinator::{map, opt, verify},
    sequence::{delimited, preceded},
    error::context,
};

use crate::instruction::{is_symbol_char, Address, Comp, Dest, Instruction, Jump, MAX_LITERAL};

use super::program::{Line, Program};

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    LiteralOutOfRange(String),
    InvalidDest(String),
    InvalidComp(String),
    InvalidJump(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::LiteralOutOfRange(literal) =>
                write!(f, "address {} is larger than {}", literal, MAX_LITERAL),
            ErrorKind::InvalidDest(dest) => write!(f, "invalid destination '{}'", dest),
            ErrorKind::InvalidComp(comp) => write!(f, "invalid computation '{}'", comp),
            ErrorKind::InvalidJump(jump) => write!(f, "invalid jump '{}'", jump),
        }
    }
}

pub type ParseError = crate::error::ParseError<ErrorKind>;
type Result<'a, T> = IResult<&'a str, T, ParseError>;

const SPACE_CHARACTERS: &'static str = " \t\r";

fn sp(input: &str) -> Result<&str> {
    take_while(|c| SPACE_CHARACTERS.contains(c))(input)
}

fn symbol(input: &str) -> Result<&str> {
    verify(
        take_while1(is_symbol_char),
        |s: &str| !s.starts_with(|c: char| c.is_ascii_digit()),
    )(input)
}

fn fail<'a, T>(input: &'a str, kind: ErrorKind) -> Result<'a, T> {
    Err(nom::Err::Failure(ParseError::from_kind(input, kind)))
}

fn literal(input: &str) -> Result<u16> {
    let (rest, digits) = digit1(input)?;

    match digits.parse::<u32>() {
        Ok(value) if value <= MAX_LITERAL as u32 => Ok((rest, value as u16)),
        _ => fail(input, ErrorKind::LiteralOutOfRange(digits.to_string())),
    }
}

fn address(input: &str) -> Result<Instruction> {
    preceded(
        char('@'),
        context("address", alt((
            map(literal, |value| Instruction::Address(Address::Literal(value))),
            map(symbol, |s| Instruction::Address(Address::Symbol(s.to_string()))),
        ))),
    )(input)
}

fn label(input: &str) -> Result<Instruction> {
    map(
        delimited(char('('), context("label", symbol), char(')')),
        |s| Instruction::Label(s.to_string()),
    )(input)
}

/// Parses `dest=comp;jump` where both `dest=` and `;jump` are optional.
fn compute(input: &str) -> Result<Instruction> {
    let (rest, text) = take_while1(|c: char| !c.is_whitespace() && c != '/')(input)?;

    let (dest, text) = match text.find('=') {
        Some(i) => (Some(&text[..i]), &text[i + 1..]),
        None => (None, text),
    };

    let (comp, jump) = match text.find(';') {
        Some(i) => (&text[..i], Some(&text[i + 1..])),
        None => (text, None),
    };

    let dest = match dest {
        None => Dest::NONE,
        Some(dest) => match dest.parse() {
            Ok(dest) => dest,
            Err(()) => return fail(input, ErrorKind::InvalidDest(dest.to_string())),
        },
    };

    let comp: Comp = match comp.parse() {
        Ok(comp) => comp,
        Err(()) => return fail(input, ErrorKind::InvalidComp(comp.to_string())),
    };

    let jump = match jump {
        None => None,
        Some(jump) => match jump.parse::<Jump>() {
            Ok(jump) => Some(jump),
            Err(()) => return fail(input, ErrorKind::InvalidJump(jump.to_string())),
        },
    };

    Ok((rest, Instruction::Compute { dest, comp, jump }))
}

fn instruction(input: &str) -> Result<Instruction> {
    alt((address, label, compute))(input)
}

fn comment(input: &str) -> Result<&str> {
    preceded(tag("//"), take_while(|c| c != '\n'))(input)
}

/// Parses a single line including its terminator, if any.
fn line(input: &str) -> Result<Option<Instruction>> {
    let (input, _) = sp(input)?;
    let (input, instruction) = opt(instruction)(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = opt(comment)(input)?;

    if input.is_empty() {
        return Ok((input, instruction));
    }

    let (input, _) = context("end of line", char('\n'))(input)?;

    Ok((input, instruction))
}

fn program(mut input: &str) -> Result<Program> {
    let mut program = Program::new();

    while !input.is_empty() {
        let (rest, instruction) = line(input)?;

        if let Some(instruction) = instruction {
            program.lines.push(Line::Instruction(instruction));
        }

        input = rest;
    }

    Ok((input, program))
}

pub(crate) fn parse_program(input: &str) -> StdResult<Program, ParseError> {
    ParseError::finish(program(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<Instruction> {
        parse_program(input).unwrap().instructions().cloned().collect()
    }

    #[test]
    fn test_instructions() {
        let instructions = parse("
            // Adds two numbers.
            @2
            D=A
            @x.1   // symbol
            (LOOP)
              AM=M-1
            0;JMP
            MD=D+1;JNE
        ");

        assert_eq!(instructions, vec![
            Instruction::at(2),
            Instruction::set(Dest::D, Comp::A),
            Instruction::at("x.1"),
            Instruction::label("LOOP"),
            Instruction::set(Dest::AM, Comp::MMinusOne),
            Instruction::jump(Comp::Zero, Jump::Always),
            Instruction::Compute { dest: Dest::MD, comp: Comp::DPlusOne, jump: Some(Jump::NotEqual) },
        ]);
    }

    #[test]
    fn test_no_trailing_newline() {
        assert_eq!(parse("@SP\r\nM=M+1"), vec![
            Instruction::at("SP"),
            Instruction::set(Dest::M, Comp::MPlusOne),
        ]);
    }

    #[test]
    fn test_errors() {
        let err = parse_program("@1\n@40000\n").unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::LiteralOutOfRange("40000".to_string())));

        let err = parse_program("D=D*A").unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::InvalidComp("D*A".to_string())));

        let err = parse_program("X=1").unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::InvalidDest("X".to_string())));

        let source = "@0\n0;JUMP\n";
        let err = parse_program(source).unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::InvalidJump("JUMP".to_string())));
        assert_eq!(err.verbose(source).line, 2);
    }

    #[test]
    fn test_garbage_after_instruction() {
        assert!(parse_program("(LOOP) x\n").is_err());
    }
}
