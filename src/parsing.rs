//! Shared plumbing for the token based parsers.
//!
//! Both the source language parser and the stack machine parser work on slices of
//! `(Token, Span)` pairs. Parser state is a [Cursor], which is `Copy` and threaded through the
//! productions by value: every production takes a cursor and returns the advanced cursor
//! together with whatever it parsed.

use std::fmt;
use std::ops::Range;
use itertools::Itertools;

#[derive(Clone, Debug, PartialEq)]
pub struct Error<Context> {
    pub kind: ErrorKind,
    pub context: Vec<Context>,
}

impl<C> Error<C> {
    pub fn new<T>(span: Span, ctx: T) -> Error<C> where T: Into<C> {
        Error {
            kind: ErrorKind::UnexpectedToken { span },
            context: vec![ctx.into()],
        }
    }

    pub fn eos<T>(ctx: T) -> Error<C> where T: Into<C> {
        Error {
            kind: ErrorKind::EndOfStream,
            context: vec![ctx.into()],
        }
    }

    pub fn invalid<T>(span: Span, ctx: T) -> Error<C> where T: Into<C> {
        Error {
            kind: ErrorKind::InvalidToken { span },
            context: vec![ctx.into()],
        }
    }

    pub fn span(&self) -> Option<&Span> {
        match self.kind {
            ErrorKind::EndOfStream => None,
            ErrorKind::UnexpectedToken { ref span } => Some(span),
            ErrorKind::InvalidToken { ref span } => Some(span),
        }
    }
}

pub trait ErrorExt<R,C> {
    fn context<T>(self, ctx: T) -> Self where T: Into<C>;
}

impl<R,C> ErrorExt<R,C> for Result<R, Error<C>> {
    fn context<T>(mut self, ctx: T) -> Self where T: Into<C> {
        if let Err(ref mut err) = self {
            err.context.push(ctx.into());
        }

        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    EndOfStream,
    UnexpectedToken {
        span: Span,
    },
    /// The token has the right shape but an unacceptable value.
    InvalidToken {
        span: Span,
    },
}

pub type Span = Range<usize>;

/// One-based line and column of a byte offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineLocation {
    pub line: usize,
    pub column: usize,
}

impl LineLocation {
    /// Locates `offset` in `source`. Offsets past the end map to the end of the source.
    pub fn of(source: &str, offset: usize) -> LineLocation {
        let mut location = LineLocation { line: 1, column: 1 };

        for (i, ch) in source.char_indices() {
            if i >= offset {
                break;
            }

            match ch {
                '\n' => {
                    location.line += 1;
                    location.column = 1;
                },
                _ => location.column += 1,
            }
        }

        location
    }
}

impl fmt::Display for LineLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl<C> fmt::Display for Error<C>
where
    C: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ctx = self.context.iter()
            .rev()
            .join(": ");

        match self.kind {
            ErrorKind::EndOfStream =>
                write!(f, "{}: unexpected end of stream", ctx),
            ErrorKind::UnexpectedToken { ref span } =>
                write!(f, "error at position {}-{}: {}: unexpected token", span.start, span.end, ctx),
            ErrorKind::InvalidToken { ref span } =>
                write!(f, "error at position {}-{}: {}", span.start, span.end, ctx),
        }
    }
}

impl<C> std::error::Error for Error<C> where C: fmt::Display + fmt::Debug {}

/// Result of a single production: the cursor after the production and its output.
pub type PResult<'t, T, O, C> = Result<(Cursor<'t, T>, O), Error<C>>;

/// Read position in a token slice.
#[derive(Debug)]
pub struct Cursor<'t, T> {
    tokens: &'t [(T, Span)],
    position: usize,
}

impl<'t, T> Clone for Cursor<'t, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'t, T> Copy for Cursor<'t, T> {}

impl<'t, T> Cursor<'t, T> {
    pub fn new(tokens: &'t [(T, Span)]) -> Cursor<'t, T> {
        Cursor {
            tokens,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// The token under the cursor, if any.
    pub fn peek(&self) -> Option<&'t T> {
        self.peek_nth(0)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'t T> {
        self.tokens.get(self.position + n).map(|(t, _)| t)
    }

    /// Span of the token under the cursor. At the end of the stream this is the empty span
    /// right after the last token.
    pub fn span(&self) -> Span {
        match self.tokens.get(self.position) {
            Some((_, span)) => span.clone(),
            None => {
                let end = self.tokens.last()
                    .map(|(_, span)| span.end)
                    .unwrap_or(0);

                end..end
            },
        }
    }

    pub fn advance(self) -> Cursor<'t, T> {
        Cursor {
            tokens: self.tokens,
            position: std::cmp::min(self.position + 1, self.tokens.len()),
        }
    }

    /// Consumes any token. Fails only at the end of the stream.
    pub fn take<C, X>(self, ctx: X) -> PResult<'t, T, &'t T, C> where X: Into<C> {
        match self.tokens.get(self.position) {
            Some((token, _)) => Ok((self.advance(), token)),
            None => Err(Error::eos(ctx)),
        }
    }

    /// Consumes exactly `expected`.
    pub fn expect<C, X>(self, expected: &T, ctx: X) -> PResult<'t, T, (), C>
    where
        T: PartialEq,
        X: Into<C>,
    {
        match self.tokens.get(self.position) {
            Some((token, _)) if token == expected => Ok((self.advance(), ())),
            Some((_, span)) => Err(Error::new(span.clone(), ctx)),
            None => Err(Error::eos(ctx)),
        }
    }

    /// Consumes `expected` if it is the next token.
    pub fn accept(self, expected: &T) -> Option<Cursor<'t, T>> where T: PartialEq {
        match self.peek() {
            Some(token) if token == expected => Some(self.advance()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Vec<(char, Span)> {
        vec![('a', 0..1), ('b', 2..3), ('c', 4..5)]
    }

    #[test]
    fn test_line_location() {
        let source = "class A {\n  field int x;\n}";

        assert_eq!(LineLocation::of(source, 0), LineLocation { line: 1, column: 1 });
        assert_eq!(LineLocation::of(source, 12), LineLocation { line: 2, column: 3 });
        assert_eq!(LineLocation::of(source, 1000).to_string(), "3:2");
    }

    #[test]
    fn test_cursor_is_persistent() {
        let tokens = tokens();
        let start = Cursor::new(&tokens);

        let (next, token) = start.take::<String, _>("token").unwrap();
        assert_eq!(*token, 'a');
        assert_eq!(next.peek(), Some(&'b'));
        assert_eq!(start.peek(), Some(&'a'));
    }

    #[test]
    fn test_cursor_expect() {
        let tokens = tokens();
        let cursor = Cursor::new(&tokens);

        let (cursor, ()) = cursor.expect::<String, _>(&'a', "an 'a'").unwrap();
        let err = cursor.expect::<String, _>(&'x', "an 'x'").unwrap_err();

        assert_eq!(err.span(), Some(&(2..3)));
        assert_eq!(err.to_string(), "error at position 2-3: an 'x': unexpected token");
    }

    #[test]
    fn test_cursor_end_of_stream() {
        let tokens = tokens();
        let cursor = Cursor::new(&tokens).advance().advance().advance();

        assert!(cursor.is_empty());
        assert_eq!(cursor.span(), 5..5);

        let err = cursor.take::<String, _>("anything").unwrap_err();
        assert_eq!(err.kind, ErrorKind::EndOfStream);
    }

    #[test]
    fn test_error_context_order() {
        let result: Result<(), Error<String>> = Err(Error::eos("a term"));
        let err = result
            .context("an expression")
            .context("a let statement")
            .unwrap_err();

        assert_eq!(err.to_string(), "a let statement: an expression: a term: unexpected end of stream");
    }
}
