//! Line oriented parser for stack machine programs.

use crate::parsing::{self, Error as SyntaxError};

use super::program::{ArithmeticOp, Command, Program, Segment};
use super::token::{tokenize_line, Token};
use super::Error;

type Cursor<'a, 't> = parsing::Cursor<'t, Token<'a>>;
type PResult<'a, 't, O> = parsing::PResult<'t, Token<'a>, O, String>;

/// Every command keyword of the language.
pub const COMMANDS: &[&str] = &[
    "push", "pop", "add", "sub", "neg", "eq", "gt", "lt", "and", "or", "not",
    "label", "goto", "if-goto", "function", "call", "return",
];

fn unexpected<'a, 't, O>(cursor: Cursor<'a, 't>, expected: &str) -> PResult<'a, 't, O> {
    match cursor.peek() {
        Some(token) => Err(SyntaxError::new(cursor.span(), format!("expected {}, found {}", expected, token))),
        None => Err(SyntaxError::eos(format!("expected {}", expected))),
    }
}

fn word<'a, 't>(cursor: Cursor<'a, 't>, what: &str) -> PResult<'a, 't, &'a str> {
    match cursor.peek() {
        Some(Token::Word(word)) => Ok((cursor.advance(), *word)),
        _ => unexpected(cursor, what),
    }
}

fn number<'a, 't>(cursor: Cursor<'a, 't>, what: &str) -> PResult<'a, 't, u32> {
    match cursor.peek() {
        Some(Token::Number(number)) => Ok((cursor.advance(), *number)),
        _ => unexpected(cursor, what),
    }
}

fn segment<'a, 't>(cursor: Cursor<'a, 't>) -> PResult<'a, 't, Segment> {
    match cursor.peek() {
        Some(Token::Word(word)) => match word.parse() {
            Ok(segment) => Ok((cursor.advance(), segment)),
            Err(()) => unexpected(cursor, "a segment name"),
        },
        _ => unexpected(cursor, "a segment name"),
    }
}

fn end<'a, 't>(cursor: Cursor<'a, 't>) -> PResult<'a, 't, ()> {
    match cursor.peek() {
        None => Ok((cursor, ())),
        Some(_) => unexpected(cursor, "end of line"),
    }
}

/// Closest command keyword to a misspelled one.
fn suggest(command: &str) -> Option<&'static str> {
    let command = command.to_ascii_lowercase();

    COMMANDS.iter()
        .map(|candidate| (edit_distance::edit_distance(&command, candidate), *candidate))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// Parses one line. Blank and comment-only lines yield `None`.
///
/// # Parameters
/// - `input`: The line without its terminator.
/// - `line`: The 1-based line number used in errors.
pub fn parse_line(input: &str, line: usize) -> Result<Option<Command>, Error> {
    let tokens = tokenize_line(input);
    let cursor = parsing::Cursor::new(&tokens);

    let (cursor, keyword) = match cursor.peek() {
        None => return Ok(None),
        Some(Token::Word(word)) => (cursor.advance(), word.to_ascii_lowercase()),
        Some(token) => return Err(Error::Syntax {
            line,
            error: SyntaxError::new(cursor.span(), format!("expected a command, found {}", token)),
        }),
    };

    let syntax = |error| Error::Syntax { line, error };

    let (cursor, command) = match keyword.as_str() {
        "push" | "pop" => {
            let (cursor, segment) = segment(cursor).map_err(syntax)?;
            let (cursor, index) = number(cursor, "a segment index").map_err(syntax)?;

            let command = match keyword.as_str() {
                "push" => Command::push(segment, index),
                _ => Command::pop(segment, index),
            };

            let command = command.map_err(|error| Error::Segment { line, error })?;

            (cursor, command)
        },
        "label" | "goto" | "if-goto" => {
            let (cursor, label) = word(cursor, "a label").map_err(syntax)?;
            let label = label.to_string();

            let command = match keyword.as_str() {
                "label" => Command::Label(label),
                "goto" => Command::Goto(label),
                _ => Command::IfGoto(label),
            };

            (cursor, command)
        },
        "function" => {
            let (cursor, name) = word(cursor, "a function name").map_err(syntax)?;
            let (cursor, locals) = number(cursor, "a local variable count").map_err(syntax)?;
            let locals = count(locals, &tokens, line)?;

            (cursor, Command::Function { name: name.to_string(), locals })
        },
        "call" => {
            let (cursor, name) = word(cursor, "a function name").map_err(syntax)?;
            let (cursor, args) = number(cursor, "an argument count").map_err(syntax)?;
            let args = count(args, &tokens, line)?;

            (cursor, Command::Call { name: name.to_string(), args })
        },
        "return" => (cursor, Command::Return),
        other => match other.parse::<ArithmeticOp>() {
            Ok(op) => (cursor, Command::Arithmetic(op)),
            Err(()) => return Err(Error::UnknownCommand {
                line,
                command: other.to_string(),
                suggestion: suggest(other),
            }),
        },
    };

    end(cursor).map_err(syntax)?;

    Ok(Some(command))
}

fn count(value: u32, tokens: &[(Token, parsing::Span)], line: usize) -> Result<u16, Error> {
    if value > super::program::MAX_INDEX as u32 {
        let span = tokens.last().map(|(_, span)| span.clone()).unwrap_or(0..0);

        return Err(Error::Syntax {
            line,
            error: SyntaxError::invalid(span, format!("count {} is too large", value)),
        });
    }

    Ok(value as u16)
}

/// Parses a whole program. Fails on the first invalid line.
pub fn parse_program(input: &str) -> Result<Program, Error> {
    let mut program = Program::new();

    for (i, line) in input.lines().enumerate() {
        if let Some(command) = parse_line(line, i + 1)? {
            program.push(command);
        }
    }

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::SegmentError;

    #[test]
    fn test_commands() {
        let program = parse_program("
            // Computes something.
            function Main.main 2
            PUSH Constant 7   // case does not matter
            pop local 1
            label LOOP
            if-goto LOOP
            goto END
            call Math.multiply 2
            Add
            return
        ").unwrap();

        assert_eq!(program.commands, vec![
            Command::Function { name: "Main.main".to_string(), locals: 2 },
            Command::Push(Segment::Constant, 7),
            Command::Pop(Segment::Local, 1),
            Command::Label("LOOP".to_string()),
            Command::IfGoto("LOOP".to_string()),
            Command::Goto("END".to_string()),
            Command::Call { name: "Math.multiply".to_string(), args: 2 },
            Command::Arithmetic(ArithmeticOp::Add),
            Command::Return,
        ]);
    }

    #[test]
    fn test_display_parse_roundtrip() {
        let source = "push uart 2\npop pointer 1\nneg\n";
        let program = parse_program(source).unwrap();

        assert_eq!(program.to_string(), source);
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_program("push constant 1\npsuh constant 2").unwrap_err();

        assert_eq!(err, Error::UnknownCommand {
            line: 2,
            command: "psuh".to_string(),
            suggestion: Some("push"),
        });
        assert_eq!(err.to_string(), "line 2: unknown command 'psuh', did you mean 'push'?");
    }

    #[test]
    fn test_range_errors() {
        assert_eq!(
            parse_line("push temp 8", 3).unwrap_err(),
            Error::Segment {
                line: 3,
                error: SegmentError::OutOfRange { segment: Segment::Temp, index: 8 },
            },
        );

        assert_eq!(
            parse_line("pop constant 0", 1).unwrap_err(),
            Error::Segment { line: 1, error: SegmentError::PopConstant },
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_line("push nowhere 1", 1).is_err());
        assert!(parse_line("push local", 1).is_err());
        assert!(parse_line("add 1", 1).is_err());
        assert!(parse_line("push local -1", 1).is_err());
        assert!(parse_line("7", 1).is_err());
    }
}
