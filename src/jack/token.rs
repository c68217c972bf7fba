//! Tokens and a single pass tokenizer for the source language.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::parsing::Span;

/// Characters that always form a token of their own.
pub const SYMBOLS: &str = "{}()[].,;+-*/&|<>=~";

macro_rules! keywords {
    ( $( $variant:ident $text:literal ),* $(,)* ) => {
        /// Reserved words of the language.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $( $variant ),*
        }

        impl Keyword {
            pub fn from_text(text: &str) -> Option<Keyword> {
                match text {
                    $( $text => Some(Keyword::$variant), )*
                    _ => None,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $( Keyword::$variant => $text, )*
                }
            }
        }
    };
}

keywords! {
    Class "class",
    Constructor "constructor",
    Function "function",
    Method "method",
    Field "field",
    Static "static",
    Var "var",
    Int "int",
    Char "char",
    Boolean "boolean",
    Void "void",
    True "true",
    False "false",
    Null "null",
    This "this",
    Let "let",
    Do "do",
    If "if",
    Else "else",
    While "while",
    Return "return",
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token classes, named as in the token dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Symbol,
    IntegerConstant,
    StringConstant,
    Identifier,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Symbol => "symbol",
            TokenKind::IntegerConstant => "integerConstant",
            TokenKind::StringConstant => "stringConstant",
            TokenKind::Identifier => "identifier",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Keyword(Keyword),
    Symbol(char),
    /// Digits as written. The value is range checked by the parser.
    IntegerConstant(String),
    /// Content between the quotes, without the quotes.
    StringConstant(String),
    Identifier(String),
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Keyword(_) => TokenKind::Keyword,
            Token::Symbol(_) => TokenKind::Symbol,
            Token::IntegerConstant(_) => TokenKind::IntegerConstant,
            Token::StringConstant(_) => TokenKind::StringConstant,
            Token::Identifier(_) => TokenKind::Identifier,
        }
    }

    /// The token text as it appears in the token dump.
    pub fn text(&self) -> String {
        match self {
            Token::Keyword(keyword) => keyword.as_str().to_string(),
            Token::Symbol(symbol) => symbol.to_string(),
            Token::IntegerConstant(text)
                | Token::StringConstant(text)
                | Token::Identifier(text) => text.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Keyword(keyword) => write!(f, "keyword '{}'", keyword),
            Token::Symbol(symbol) => write!(f, "symbol '{}'", symbol),
            Token::IntegerConstant(text) => write!(f, "integer '{}'", text),
            Token::StringConstant(text) => write!(f, "string \"{}\"", text),
            Token::Identifier(text) => write!(f, "identifier '{}'", text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    LineComment,
    BlockComment {
        /// The previous character inside the comment was a `*`.
        star: bool,
    },
    Word,
    Integer,
    Str,
}

fn is_symbol(c: char) -> bool {
    SYMBOLS.contains(c)
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !is_symbol(c) && c != '"'
}

/// Character scanner producing `(Token, Span)` pairs.
///
/// Never fails. An unterminated string or block comment swallows the rest of the input.
/// A newline inside a string literal is dropped instead of ending the literal.
pub struct Tokenizer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    state: State,
    start: usize,
    buffer: String,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            input,
            chars: input.char_indices().peekable(),
            state: State::Idle,
            start: 0,
            buffer: String::new(),
        }
    }

    fn finish(&mut self, end: usize) -> (Token, Span) {
        let text = std::mem::take(&mut self.buffer);

        let token = match self.state {
            State::Integer => Token::IntegerConstant(text),
            State::Str => Token::StringConstant(text),
            _ => match Keyword::from_text(&text) {
                Some(keyword) => Token::Keyword(keyword),
                None => Token::Identifier(text),
            },
        };

        self.state = State::Idle;

        (token, self.start..end)
    }

    /// Handles one character. Returns a token when one is completed.
    ///
    /// A character that ends a word or integer is not consumed.
    fn process(&mut self, i: usize, c: char) -> Option<(Token, Span)> {
        match self.state {
            State::LineComment => {
                self.chars.next();

                if c == '\n' {
                    self.state = State::Idle;
                }
            },
            State::BlockComment { star } => {
                self.chars.next();

                self.state = match c {
                    '/' if star => State::Idle,
                    '*' => State::BlockComment { star: true },
                    _ => State::BlockComment { star: false },
                };
            },
            State::Idle => {
                self.chars.next();

                let next = self.chars.peek().map(|(_, c)| *c);

                match (c, next) {
                    ('/', Some('/')) => {
                        self.chars.next();
                        self.state = State::LineComment;
                    },
                    ('/', Some('*')) => {
                        self.chars.next();
                        self.state = State::BlockComment { star: false };
                    },
                    (c, _) if c.is_whitespace() => (),
                    (c, _) if is_symbol(c) => {
                        return Some((Token::Symbol(c), i..i + c.len_utf8()));
                    },
                    ('"', _) => {
                        self.start = i;
                        self.state = State::Str;
                    },
                    (c, _) => {
                        self.start = i;
                        self.buffer.push(c);
                        self.state = match c.is_ascii_digit() {
                            true => State::Integer,
                            false => State::Word,
                        };
                    },
                }
            },
            State::Integer if c.is_ascii_digit() => {
                self.chars.next();
                self.buffer.push(c);
            },
            State::Word if is_word_char(c) => {
                self.chars.next();
                self.buffer.push(c);
            },
            State::Integer | State::Word => return Some(self.finish(i)),
            State::Str => {
                self.chars.next();

                match c {
                    '"' => return Some(self.finish(i + 1)),
                    '\n' | '\r' => (),
                    c => self.buffer.push(c),
                }
            },
        }

        None
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = (Token, Span);

    fn next(&mut self) -> Option<(Token, Span)> {
        while let Some(&(i, c)) = self.chars.peek() {
            if let Some(token) = self.process(i, c) {
                return Some(token);
            }
        }

        match self.state {
            State::Word | State::Integer => Some(self.finish(self.input.len())),
            _ => None,
        }
    }
}

/// Splits `input` into tokens, dropping whitespace and comments.
pub fn tokenize(input: &str) -> Vec<(Token, Span)> {
    Tokenizer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input).into_iter().map(|(t, _)| t).collect()
    }

    fn ident(name: &str) -> Token {
        Token::Identifier(name.to_string())
    }

    #[test]
    fn test_let_statement() {
        assert_eq!(tokens("let x = x + 12;"), vec![
            Token::Keyword(Keyword::Let),
            ident("x"),
            Token::Symbol('='),
            ident("x"),
            Token::Symbol('+'),
            Token::IntegerConstant("12".to_string()),
            Token::Symbol(';'),
        ]);
    }

    #[test]
    fn test_comments_are_skipped() {
        let input = "
            // line comment
            /** doc
             * comment */
            class /* inline */ Main {}
            // trailing";

        assert_eq!(tokens(input), vec![
            Token::Keyword(Keyword::Class),
            ident("Main"),
            Token::Symbol('{'),
            Token::Symbol('}'),
        ]);
    }

    #[test]
    fn test_division_is_not_a_comment() {
        assert_eq!(tokens("a/b"), vec![ident("a"), Token::Symbol('/'), ident("b")]);
    }

    #[test]
    fn test_block_comment_needs_inner_star() {
        assert_eq!(tokens("/*/ x */ y"), vec![ident("y")]);
        assert_eq!(tokens("/**/z"), vec![ident("z")]);
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(
            tokens("do Output.printString(\"Hello, world!\");")[5],
            Token::StringConstant("Hello, world!".to_string()),
        );
    }

    #[test]
    fn test_string_keeps_comment_markers() {
        assert_eq!(tokens("\"a // b /* c\""), vec![Token::StringConstant("a // b /* c".to_string())]);
    }

    #[test]
    fn test_newline_inside_string_is_dropped() {
        assert_eq!(tokens("\"ab\ncd\" x"), vec![
            Token::StringConstant("abcd".to_string()),
            ident("x"),
        ]);
    }

    #[test]
    fn test_unterminated_string_is_dropped() {
        assert_eq!(tokens("let s = \"abc"), vec![
            Token::Keyword(Keyword::Let),
            ident("s"),
            Token::Symbol('='),
        ]);
    }

    #[test]
    fn test_integer_followed_by_word() {
        assert_eq!(tokens("12ab"), vec![Token::IntegerConstant("12".to_string()), ident("ab")]);
    }

    #[test]
    fn test_identifiers_with_digits() {
        assert_eq!(tokens("x1_y2"), vec![ident("x1_y2")]);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(tokens("classy"), vec![ident("classy")]);
    }

    #[test]
    fn test_spans() {
        let spanned = tokenize("let  abc=\"hi\";");

        let spans: Vec<Span> = spanned.into_iter().map(|(_, s)| s).collect();
        assert_eq!(spans, vec![0..3, 5..8, 8..9, 9..13, 13..14]);
    }

    #[test]
    fn test_token_text_roundtrip() {
        let input = "class Main { function void main() { var int i; let i = 3 * (i - 1); return; } }";
        let rebuilt: String = tokenize(input).iter().map(|(t, _)| t.text()).collect();
        let expected: String = input.chars().filter(|c| !c.is_whitespace()).collect();

        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn test_kinds() {
        let kinds: Vec<TokenKind> = tokenize("if x 1 \"s\" ~")
            .iter()
            .map(|(t, _)| t.kind())
            .collect();

        assert_eq!(kinds, vec![
            TokenKind::Keyword,
            TokenKind::Identifier,
            TokenKind::IntegerConstant,
            TokenKind::StringConstant,
            TokenKind::Symbol,
        ]);
    }
}
