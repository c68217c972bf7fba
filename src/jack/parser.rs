//! Recursive descent parser producing a [Class] syntax tree.
//!
//! Each production takes a [Cursor] positioned at its first token and returns the cursor
//! positioned right after the construct. The only lookahead is a single token, used to tell
//! array accesses, calls and plain variables apart.

use crate::parsing::{self, Error, ErrorExt, Span};

use super::ast::*;
use super::token::{tokenize, Keyword, Token};

/// Maximum value of an integer constant.
pub const MAX_INTEGER: u16 = 32767;

pub type ParseError = Error<String>;

type Cursor<'t> = parsing::Cursor<'t, Token>;
type PResult<'t, O> = parsing::PResult<'t, Token, O, String>;

impl Class {
    /// Tokenizes and parses a complete source unit.
    pub fn parse(source: &str) -> Result<Class, ParseError> {
        parse_tokens(&tokenize(source))
    }
}

/// Parses exactly one class. Tokens left after the closing brace are an error.
pub fn parse_tokens(tokens: &[(Token, Span)]) -> Result<Class, ParseError> {
    let (cursor, class) = class(Cursor::new(tokens))?;

    match cursor.peek() {
        None => Ok(class),
        Some(token) => Err(Error::new(
            cursor.span(),
            format!("expected end of input after class '{}', found {}", class.name, token),
        )),
    }
}

/// Parses a standalone expression.
pub fn parse_expression(tokens: &[(Token, Span)]) -> Result<Expression, ParseError> {
    let (cursor, expr) = expression(Cursor::new(tokens))?;

    match cursor.peek() {
        None => Ok(expr),
        Some(token) => Err(Error::new(cursor.span(), format!("expected end of expression, found {}", token))),
    }
}

fn unexpected<'t, O>(cursor: Cursor<'t>, expected: &str) -> PResult<'t, O> {
    match cursor.peek() {
        Some(token) => Err(Error::new(cursor.span(), format!("expected {}, found {}", expected, token))),
        None => Err(Error::eos(format!("expected {}", expected))),
    }
}

fn symbol(cursor: Cursor, symbol: char) -> PResult<()> {
    match cursor.accept(&Token::Symbol(symbol)) {
        Some(cursor) => Ok((cursor, ())),
        None => unexpected(cursor, &format!("'{}'", symbol)),
    }
}

fn keyword(cursor: Cursor, keyword: Keyword) -> PResult<()> {
    match cursor.accept(&Token::Keyword(keyword)) {
        Some(cursor) => Ok((cursor, ())),
        None => unexpected(cursor, &format!("'{}'", keyword)),
    }
}

fn is_symbol(cursor: Cursor, symbol: char) -> bool {
    cursor.peek() == Some(&Token::Symbol(symbol))
}

fn identifier<'t>(cursor: Cursor<'t>, what: &str) -> PResult<'t, String> {
    match cursor.peek() {
        Some(Token::Identifier(name)) => Ok((cursor.advance(), name.clone())),
        _ => unexpected(cursor, what),
    }
}

fn ty(cursor: Cursor) -> PResult<Type> {
    let ty = match cursor.peek() {
        Some(Token::Keyword(Keyword::Int)) => Type::Int,
        Some(Token::Keyword(Keyword::Char)) => Type::Char,
        Some(Token::Keyword(Keyword::Boolean)) => Type::Boolean,
        Some(Token::Identifier(name)) => Type::Class(name.clone()),
        _ => return unexpected(cursor, "a type"),
    };

    Ok((cursor.advance(), ty))
}

/// `name (',' name)*`
fn name_list<'t>(mut cursor: Cursor<'t>, what: &str) -> PResult<'t, Vec<String>> {
    let (next, first) = identifier(cursor, what)?;
    cursor = next;

    let mut names = vec![first];

    while let Some(next) = cursor.accept(&Token::Symbol(',')) {
        let (next, name) = identifier(next, what)?;
        names.push(name);
        cursor = next;
    }

    Ok((cursor, names))
}

fn class(cursor: Cursor) -> PResult<Class> {
    let (cursor, ()) = keyword(cursor, Keyword::Class)?;
    let (cursor, name) = identifier(cursor, "a class name")?;
    let (mut cursor, ()) = symbol(cursor, '{')?;

    let mut vars = Vec::new();

    while let Some(Token::Keyword(Keyword::Static)) | Some(Token::Keyword(Keyword::Field)) = cursor.peek() {
        let (next, var) = class_var_dec(cursor)
            .context(format!("in class '{}'", name))?;
        vars.push(var);
        cursor = next;
    }

    let mut subroutines = Vec::new();

    while let Some(Token::Keyword(Keyword::Constructor))
        | Some(Token::Keyword(Keyword::Function))
        | Some(Token::Keyword(Keyword::Method)) = cursor.peek()
    {
        let (next, subroutine) = subroutine_dec(cursor)
            .context(format!("in class '{}'", name))?;
        subroutines.push(subroutine);
        cursor = next;
    }

    let (cursor, ()) = symbol(cursor, '}')
        .context(format!("in class '{}'", name))?;

    Ok((cursor, Class { name, vars, subroutines }))
}

fn class_var_dec(cursor: Cursor) -> PResult<ClassVarDec> {
    let kind = match cursor.peek() {
        Some(Token::Keyword(Keyword::Static)) => ClassVarKind::Static,
        Some(Token::Keyword(Keyword::Field)) => ClassVarKind::Field,
        _ => return unexpected(cursor, "'static' or 'field'"),
    };

    let (cursor, ty) = ty(cursor.advance())?;
    let (cursor, names) = name_list(cursor, "a variable name")?;
    let (cursor, ()) = symbol(cursor, ';')?;

    Ok((cursor, ClassVarDec { kind, ty, names }))
}

fn subroutine_dec(cursor: Cursor) -> PResult<SubroutineDec> {
    let kind = match cursor.peek() {
        Some(Token::Keyword(Keyword::Constructor)) => SubroutineKind::Constructor,
        Some(Token::Keyword(Keyword::Function)) => SubroutineKind::Function,
        Some(Token::Keyword(Keyword::Method)) => SubroutineKind::Method,
        _ => return unexpected(cursor, "a subroutine declaration"),
    };

    let cursor = cursor.advance();

    let (cursor, return_type) = match cursor.accept(&Token::Keyword(Keyword::Void)) {
        Some(cursor) => (cursor, None),
        None => {
            let (cursor, ty) = ty(cursor)?;
            (cursor, Some(ty))
        },
    };

    let (cursor, name) = identifier(cursor, "a subroutine name")?;

    let result = parameter_list(cursor)
        .and_then(|(cursor, parameters)| {
            let (cursor, body) = subroutine_body(cursor)?;
            Ok((cursor, (parameters, body)))
        })
        .context(format!("in subroutine '{}'", name));

    let (cursor, (parameters, body)) = result?;

    Ok((cursor, SubroutineDec {
        kind,
        return_type,
        name,
        parameters,
        body,
    }))
}

fn parameter_list(cursor: Cursor) -> PResult<Vec<Parameter>> {
    let (mut cursor, ()) = symbol(cursor, '(')?;
    let mut parameters = Vec::new();

    if !is_symbol(cursor, ')') {
        loop {
            let (next, ty) = ty(cursor)?;
            let (next, name) = identifier(next, "a parameter name")?;
            parameters.push(Parameter { ty, name });
            cursor = next;

            match cursor.accept(&Token::Symbol(',')) {
                Some(next) => cursor = next,
                None => break,
            }
        }
    }

    let (cursor, ()) = symbol(cursor, ')')?;

    Ok((cursor, parameters))
}

fn subroutine_body(cursor: Cursor) -> PResult<SubroutineBody> {
    let (mut cursor, ()) = symbol(cursor, '{')?;
    let mut vars = Vec::new();

    while let Some(next) = cursor.accept(&Token::Keyword(Keyword::Var)) {
        let (next, ty) = ty(next)?;
        let (next, names) = name_list(next, "a variable name")?;
        let (next, ()) = symbol(next, ';')?;
        vars.push(VarDec { ty, names });
        cursor = next;
    }

    let (cursor, statements) = statements(cursor)?;
    let (cursor, ()) = symbol(cursor, '}')?;

    Ok((cursor, SubroutineBody { vars, statements }))
}

fn statements(mut cursor: Cursor) -> PResult<Vec<Statement>> {
    let mut statements = Vec::new();

    loop {
        let (next, stmt) = match cursor.peek() {
            Some(Token::Keyword(Keyword::Let)) => let_statement(cursor)?,
            Some(Token::Keyword(Keyword::If)) => if_statement(cursor)?,
            Some(Token::Keyword(Keyword::While)) => while_statement(cursor)?,
            Some(Token::Keyword(Keyword::Do)) => do_statement(cursor)?,
            Some(Token::Keyword(Keyword::Return)) => return_statement(cursor)?,
            _ => return Ok((cursor, statements)),
        };

        statements.push(stmt);
        cursor = next;
    }
}

/// `'{' statements '}'`
fn block(cursor: Cursor) -> PResult<Vec<Statement>> {
    let (cursor, ()) = symbol(cursor, '{')?;
    let (cursor, body) = statements(cursor)?;
    let (cursor, ()) = symbol(cursor, '}')?;

    Ok((cursor, body))
}

/// `'(' expression ')'`
fn condition(cursor: Cursor) -> PResult<Expression> {
    let (cursor, ()) = symbol(cursor, '(')?;
    let (cursor, condition) = expression(cursor)?;
    let (cursor, ()) = symbol(cursor, ')')?;

    Ok((cursor, condition))
}

fn let_statement(cursor: Cursor) -> PResult<Statement> {
    let (cursor, ()) = keyword(cursor, Keyword::Let)?;
    let (cursor, name) = identifier(cursor, "a variable name")?;

    let (cursor, index) = match cursor.accept(&Token::Symbol('[')) {
        Some(cursor) => {
            let (cursor, index) = expression(cursor)?;
            let (cursor, ()) = symbol(cursor, ']')?;
            (cursor, Some(index))
        },
        None => (cursor, None),
    };

    let (cursor, ()) = symbol(cursor, '=')?;
    let (cursor, value) = expression(cursor)?;
    let (cursor, ()) = symbol(cursor, ';')?;

    Ok((cursor, Statement::Let { name, index, value }))
}

fn if_statement(cursor: Cursor) -> PResult<Statement> {
    let (cursor, ()) = keyword(cursor, Keyword::If)?;
    let (cursor, condition) = condition(cursor).context("in if condition")?;
    let (cursor, then_branch) = block(cursor)?;

    let (cursor, else_branch) = match cursor.accept(&Token::Keyword(Keyword::Else)) {
        Some(cursor) => {
            let (cursor, else_branch) = block(cursor)?;
            (cursor, Some(else_branch))
        },
        None => (cursor, None),
    };

    Ok((cursor, Statement::If { condition, then_branch, else_branch }))
}

fn while_statement(cursor: Cursor) -> PResult<Statement> {
    let (cursor, ()) = keyword(cursor, Keyword::While)?;
    let (cursor, condition) = condition(cursor).context("in while condition")?;
    let (cursor, body) = block(cursor)?;

    Ok((cursor, Statement::While { condition, body }))
}

fn do_statement(cursor: Cursor) -> PResult<Statement> {
    let (cursor, ()) = keyword(cursor, Keyword::Do)?;
    let (cursor, call) = subroutine_call(cursor)?;
    let (cursor, ()) = symbol(cursor, ';')?;

    Ok((cursor, Statement::Do(call)))
}

fn return_statement(cursor: Cursor) -> PResult<Statement> {
    let (cursor, ()) = keyword(cursor, Keyword::Return)?;

    let (cursor, value) = match is_symbol(cursor, ';') {
        true => (cursor, None),
        false => {
            let (cursor, value) = expression(cursor)?;
            (cursor, Some(value))
        },
    };

    let (cursor, ()) = symbol(cursor, ';')?;

    Ok((cursor, Statement::Return(value)))
}

fn expression(cursor: Cursor) -> PResult<Expression> {
    let (mut cursor, first) = term(cursor)?;
    let mut rest = Vec::new();

    while let Some(Token::Symbol(s)) = cursor.peek() {
        let op = match BinaryOp::from_symbol(*s) {
            Some(op) => op,
            None => break,
        };

        let (next, term) = term(cursor.advance())?;
        rest.push((op, term));
        cursor = next;
    }

    Ok((cursor, Expression { first, rest }))
}

fn expression_list(mut cursor: Cursor) -> PResult<Vec<Expression>> {
    let mut expressions = Vec::new();

    if is_symbol(cursor, ')') {
        return Ok((cursor, expressions));
    }

    loop {
        let (next, expr) = expression(cursor)?;
        expressions.push(expr);
        cursor = next;

        match cursor.accept(&Token::Symbol(',')) {
            Some(next) => cursor = next,
            None => return Ok((cursor, expressions)),
        }
    }
}

fn integer_constant<'t>(cursor: Cursor<'t>, text: &str) -> PResult<'t, Term> {
    match text.parse::<u16>() {
        Ok(value) if value <= MAX_INTEGER => Ok((cursor.advance(), Term::IntegerConstant(value))),
        _ => Err(Error::invalid(
            cursor.span(),
            format!("integer constant {} exceeds {}", text, MAX_INTEGER),
        )),
    }
}

fn term(cursor: Cursor) -> PResult<Term> {
    match cursor.peek() {
        Some(Token::IntegerConstant(text)) => integer_constant(cursor, text),
        Some(Token::StringConstant(text)) => Ok((cursor.advance(), Term::StringConstant(text.clone()))),
        Some(Token::Keyword(kw)) => {
            let constant = match kw {
                Keyword::True => KeywordConstant::True,
                Keyword::False => KeywordConstant::False,
                Keyword::Null => KeywordConstant::Null,
                Keyword::This => KeywordConstant::This,
                _ => return unexpected(cursor, "a term"),
            };

            Ok((cursor.advance(), Term::KeywordConstant(constant)))
        },
        Some(Token::Symbol('(')) => {
            let (cursor, inner) = expression(cursor.advance())?;
            let (cursor, ()) = symbol(cursor, ')')?;
            Ok((cursor, Term::Parenthesized(Box::new(inner))))
        },
        Some(Token::Symbol(s)) => match UnaryOp::from_symbol(*s) {
            Some(op) => {
                let (cursor, operand) = term(cursor.advance())?;
                Ok((cursor, Term::Unary(op, Box::new(operand))))
            },
            None => unexpected(cursor, "a term"),
        },
        Some(Token::Identifier(name)) => match cursor.peek_nth(1) {
            Some(Token::Symbol('[')) => {
                let (cursor, index) = expression(cursor.advance().advance())?;
                let (cursor, ()) = symbol(cursor, ']')?;

                Ok((cursor, Term::ArrayAccess {
                    name: name.clone(),
                    index: Box::new(index),
                }))
            },
            Some(Token::Symbol('(')) | Some(Token::Symbol('.')) => {
                let (cursor, call) = subroutine_call(cursor)?;
                Ok((cursor, Term::Call(call)))
            },
            _ => Ok((cursor.advance(), Term::Variable(name.clone()))),
        },
        None => unexpected(cursor, "a term"),
    }
}

fn subroutine_call(cursor: Cursor) -> PResult<SubroutineCall> {
    let (cursor, first) = identifier(cursor, "a subroutine name")?;

    let (cursor, receiver, name) = match cursor.accept(&Token::Symbol('.')) {
        Some(cursor) => {
            let (cursor, name) = identifier(cursor, "a subroutine name")?;
            (cursor, Some(first), name)
        },
        None => (cursor, None, first),
    };

    let (cursor, ()) = symbol(cursor, '(')?;
    let (cursor, arguments) = expression_list(cursor)?;
    let (cursor, ()) = symbol(cursor, ')')?;

    Ok((cursor, SubroutineCall { receiver, name, arguments }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ErrorKind;

    fn expr(source: &str) -> Expression {
        parse_expression(&tokenize(source)).unwrap()
    }

    fn var(name: &str) -> Term {
        Term::Variable(name.to_string())
    }

    #[test]
    fn test_expression_has_no_precedence() {
        assert_eq!(expr("2 + 3 * 4"), Expression {
            first: Term::IntegerConstant(2),
            rest: vec![
                (BinaryOp::Add, Term::IntegerConstant(3)),
                (BinaryOp::Mul, Term::IntegerConstant(4)),
            ],
        });
    }

    #[test]
    fn test_term_lookahead() {
        assert_eq!(expr("a").first, var("a"));

        assert_eq!(expr("a[i]").first, Term::ArrayAccess {
            name: "a".to_string(),
            index: Box::new(Expression::term(var("i"))),
        });

        assert_eq!(expr("f(1)").first, Term::Call(SubroutineCall {
            receiver: None,
            name: "f".to_string(),
            arguments: vec![Expression::term(Term::IntegerConstant(1))],
        }));

        assert_eq!(expr("Math.max(a, b)").first, Term::Call(SubroutineCall {
            receiver: Some("Math".to_string()),
            name: "max".to_string(),
            arguments: vec![Expression::term(var("a")), Expression::term(var("b"))],
        }));
    }

    #[test]
    fn test_unary_and_parentheses() {
        assert_eq!(expr("-(x)").first, Term::Unary(
            UnaryOp::Neg,
            Box::new(Term::Parenthesized(Box::new(Expression::term(var("x"))))),
        ));

        assert_eq!(expr("~true").first, Term::Unary(
            UnaryOp::Not,
            Box::new(Term::KeywordConstant(KeywordConstant::True)),
        ));
    }

    #[test]
    fn test_integer_range() {
        assert_eq!(expr("32767").first, Term::IntegerConstant(32767));

        let err = parse_expression(&tokenize("32768")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidToken { span: 0..5 });

        assert!(parse_expression(&tokenize("99999999")).is_err());
    }

    #[test]
    fn test_class() {
        let class = Class::parse("
            class Point {
                field int x, y;
                static Point origin;

                constructor Point new(int ax, int ay) {
                    let x = ax;
                    let y = ay;
                    return this;
                }

                method int getX() { return x; }

                function void reset() {
                    var Array a;
                    let a[0] = null;
                    if (a) { do Point.reset(); } else { }
                    while (false) { }
                    return;
                }
            }
        ").unwrap();

        assert_eq!(class.name, "Point");
        assert_eq!(class.vars, vec![
            ClassVarDec {
                kind: ClassVarKind::Field,
                ty: Type::Int,
                names: vec!["x".to_string(), "y".to_string()],
            },
            ClassVarDec {
                kind: ClassVarKind::Static,
                ty: Type::Class("Point".to_string()),
                names: vec!["origin".to_string()],
            },
        ]);

        let kinds: Vec<SubroutineKind> = class.subroutines.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SubroutineKind::Constructor, SubroutineKind::Method, SubroutineKind::Function]);

        let new = &class.subroutines[0];
        assert_eq!(new.return_type, Some(Type::Class("Point".to_string())));
        assert_eq!(new.parameters.len(), 2);
        assert_eq!(new.body.statements.len(), 3);

        let reset = &class.subroutines[2];
        assert_eq!(reset.return_type, None);
        assert_eq!(reset.body.vars, vec![VarDec {
            ty: Type::Class("Array".to_string()),
            names: vec!["a".to_string()],
        }]);

        match &reset.body.statements[1] {
            Statement::If { else_branch: Some(else_branch), then_branch, .. } => {
                assert_eq!(then_branch.len(), 1);
                assert!(else_branch.is_empty());
            },
            other => panic!("expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_semicolon() {
        let err = Class::parse("class A { function void f() { return } }").unwrap_err();

        assert_eq!(
            err.to_string(),
            "error at position 37-38: in class 'A': in subroutine 'f': expected a term, found symbol '}': unexpected token",
        );
    }

    #[test]
    fn test_trailing_tokens() {
        let err = Class::parse("class A { } class B { }").unwrap_err();
        assert_eq!(err.span(), Some(&(12..17)));
    }

    #[test]
    fn test_end_of_stream() {
        let err = Class::parse("class A { function void f() {").unwrap_err();
        assert_eq!(err.kind, ErrorKind::EndOfStream);
    }

    #[test]
    fn test_print_parse_idempotent() {
        let source = "
            class Game {
                static int count;
                field Array cells;

                method void step(int n, boolean wrap) {
                    var int i, j;
                    let i = -n + (j * 2) - ~wrap;
                    let cells[i] = cells[i - 1] | (i = 0);
                    while (i < n) {
                        if (wrap & (i > 3)) {
                            do draw(i);
                        } else {
                            do Screen.drawPixel(i, j);
                        }
                        let i = i + 1;
                    }
                    do Output.printString(\"done: ok\");
                    return;
                }
            }
        ";

        let class = Class::parse(source).unwrap();
        let printed = class.to_string();
        let reparsed = Class::parse(&printed).unwrap();

        assert_eq!(class, reparsed);
        assert_eq!(printed, reparsed.to_string());
    }
}
