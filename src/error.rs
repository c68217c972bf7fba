//! Error type for the `nom` based text parsers.

use std::fmt::{Display, self};
use nom::error::ErrorKind;

#[derive(Debug, Clone, PartialEq)]
enum InnerError<Kind> {
    Incomplete,
    Context(&'static str),
    Other(Kind),
    Nom(ErrorKind),
}

impl<Kind: Display> fmt::Display for InnerError<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InnerError::Context(ctx) => write!(f, "invalid {}", ctx),
            InnerError::Nom(_err) => write!(f, "unexpected input"),
            InnerError::Other(op) => fmt::Display::fmt(op, f),
            InnerError::Incomplete => write!(f, "expected more input"),
        }
    }
}

/// Error type that contains the reason of the error and the unconsumed input.
///
/// For error location information see [ParseError::verbose].
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError<Kind> {
    stack: Vec<(String, InnerError<Kind>)>,
}

impl<Kind> ParseError<Kind> {
    pub(crate) fn from_kind(input: &str, kind: Kind) -> ParseError<Kind> {
        ParseError {
            stack: vec![(input.to_string(), InnerError::Other(kind))],
        }
    }

    pub(crate) fn incomplete() -> ParseError<Kind> {
        ParseError {
            stack: vec![(String::new(), InnerError::Incomplete)],
        }
    }

    /// The custom error kind, if the innermost error is not a generic `nom` failure.
    pub fn kind(&self) -> Option<&Kind> {
        match self.stack.first() {
            Some((_, InnerError::Other(kind))) => Some(kind),
            _ => None,
        }
    }

    /// Converts a `nom` result into a plain result, keeping only the output.
    pub(crate) fn finish<O>(result: nom::IResult<&str, O, Self>) -> Result<O, Self> {
        match result {
            Ok((_, output)) => Ok(output),
            Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => Err(err),
            Err(nom::Err::Incomplete(_)) => Err(ParseError::incomplete()),
        }
    }
}

/// Error type containing location information in addition to the reason of the error.
///
/// Created from a [ParseError] with [ParseError::verbose].
#[derive(Clone, Debug)]
pub struct VerboseParseError<'a, Kind> {
    /// The line number of the error location.
    pub line: usize,
    /// The column number of the error location.
    pub column: usize,
    kind: InnerError<Kind>,
    rest: &'a str,
}

impl<'a, Kind: Display> fmt::Display for VerboseParseError<'a, Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "at line {} col {}: {}, at '{}'", self.line, self.column, self.kind, self.rest)
    }
}

impl<Kind> ParseError<Kind> {
    /// Calculates the error location information from the [ParseError] and the original input
    /// buffer.
    ///
    /// # Parameters
    /// - `input`: The original input buffer or an exact copy of it.
    pub fn verbose(mut self, input: &str) -> VerboseParseError<Kind> {
        let (rest, kind) = match self.stack.is_empty() {
            true => (String::new(), InnerError::Incomplete),
            false => self.stack.swap_remove(0),
        };

        let start = input.len().saturating_sub(rest.len());

        let mut line = 1;
        let mut column = 1;

        for ch in input[..start].chars() {
            if ch == '\n' {
                line += 1;
                column = 0;
            }

            column += 1;
        }

        let end = input[start..]
            .char_indices()
            .take_while(|(i, ch)| *ch != '\n' && *i <= 20)
            .last()
            .map(|(i, ch)| start + i + ch.len_utf8())
            .unwrap_or(start);

        VerboseParseError {
            line,
            column,
            kind,
            rest: &input[start..end],
        }
    }
}

impl<Kind: Display> fmt::Display for ParseError<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (input, kind) = match self.stack.first() {
            Some(entry) => entry,
            None => return write!(f, "unknown error"),
        };

        let excerpt: String = input
            .chars()
            .take_while(|c| *c != '\n')
            .take(20)
            .collect();

        write!(f, "{} at: {}", kind, excerpt)
    }
}

impl<Kind: Display + fmt::Debug> std::error::Error for ParseError<Kind> {}

impl<Kind> nom::error::ParseError<&str> for ParseError<Kind> {
    fn from_error_kind(input: &str, kind: ErrorKind) -> Self {
        ParseError {
            stack: vec![(input.to_string(), InnerError::Nom(kind))],
        }
    }

    fn append(input: &str, kind: ErrorKind, mut other: Self) -> Self {
        other.stack.push((input.to_string(), InnerError::Nom(kind)));
        other
    }

    fn add_context(input: &str, ctx: &'static str, mut other: Self) -> Self {
        other.stack.push((input.to_string(), InnerError::Context(ctx)));
        other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Oops;

    impl Display for Oops {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "oops")
        }
    }

    #[test]
    fn test_verbose_location() {
        let input = "first line\nsecond line\nthird";
        let err = ParseError::from_kind(&input[15..], Oops);
        let verbose = err.verbose(input);

        assert_eq!(verbose.line, 2);
        assert_eq!(verbose.column, 5);
        assert_eq!(verbose.to_string(), "at line 2 col 5: oops, at 'nd line'");
    }
}
