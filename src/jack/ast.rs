//! Syntax tree of a single class.
//!
//! Every node implements [Display](std::fmt::Display), printing canonical source text. Parsing
//! the printed text yields the same tree.

use std::fmt;

use itertools::Itertools;

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: String,
    pub vars: Vec<ClassVarDec>,
    pub subroutines: Vec<SubroutineDec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassVarKind {
    Static,
    Field,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassVarDec {
    pub kind: ClassVarKind,
    pub ty: Type,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Char,
    Boolean,
    Class(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub ty: Type,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubroutineDec {
    pub kind: SubroutineKind,
    /// `None` for `void`.
    pub return_type: Option<Type>,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: SubroutineBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubroutineBody {
    pub vars: Vec<VarDec>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDec {
    pub ty: Type,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let {
        name: String,
        index: Option<Expression>,
        value: Expression,
    },
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    Do(SubroutineCall),
    Return(Option<Expression>),
}

/// A term followed by operator-term pairs, applied left to right without precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub first: Term,
    pub rest: Vec<(BinaryOp, Term)>,
}

impl Expression {
    pub fn term(term: Term) -> Expression {
        Expression {
            first: term,
            rest: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    IntegerConstant(u16),
    StringConstant(String),
    KeywordConstant(KeywordConstant),
    Variable(String),
    ArrayAccess {
        name: String,
        index: Box<Expression>,
    },
    Parenthesized(Box<Expression>),
    Unary(UnaryOp, Box<Term>),
    Call(SubroutineCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubroutineCall {
    /// Variable or class name before the `.`.
    pub receiver: Option<String>,
    pub name: String,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordConstant {
    True,
    False,
    Null,
    This,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Lt,
    Gt,
    Eq,
}

impl BinaryOp {
    pub fn from_symbol(symbol: char) -> Option<BinaryOp> {
        Some(match symbol {
            '+' => BinaryOp::Add,
            '-' => BinaryOp::Sub,
            '*' => BinaryOp::Mul,
            '/' => BinaryOp::Div,
            '&' => BinaryOp::And,
            '|' => BinaryOp::Or,
            '<' => BinaryOp::Lt,
            '>' => BinaryOp::Gt,
            '=' => BinaryOp::Eq,
            _ => return None,
        })
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::And => '&',
            BinaryOp::Or => '|',
            BinaryOp::Lt => '<',
            BinaryOp::Gt => '>',
            BinaryOp::Eq => '=',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn from_symbol(symbol: char) -> Option<UnaryOp> {
        match symbol {
            '-' => Some(UnaryOp::Neg),
            '~' => Some(UnaryOp::Not),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            UnaryOp::Neg => '-',
            UnaryOp::Not => '~',
        }
    }
}

const INDENT: &str = "    ";

fn write_indent(f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }

    Ok(())
}

fn write_block(f: &mut fmt::Formatter, statements: &[Statement], depth: usize) -> fmt::Result {
    writeln!(f, "{{")?;

    for statement in statements {
        statement.write_indented(f, depth + 1)?;
    }

    write_indent(f, depth)?;
    write!(f, "}}")
}

impl Statement {
    fn write_indented(&self, f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
        write_indent(f, depth)?;

        match self {
            Statement::Let { name, index: Some(index), value } =>
                writeln!(f, "let {}[{}] = {};", name, index, value),
            Statement::Let { name, index: None, value } =>
                writeln!(f, "let {} = {};", name, value),
            Statement::Do(call) => writeln!(f, "do {};", call),
            Statement::Return(Some(value)) => writeln!(f, "return {};", value),
            Statement::Return(None) => writeln!(f, "return;"),
            Statement::While { condition, body } => {
                write!(f, "while ({}) ", condition)?;
                write_block(f, body, depth)?;
                writeln!(f)
            },
            Statement::If { condition, then_branch, else_branch } => {
                write!(f, "if ({}) ", condition)?;
                write_block(f, then_branch, depth)?;

                if let Some(else_branch) = else_branch {
                    write!(f, " else ")?;
                    write_block(f, else_branch, depth)?;
                }

                writeln!(f)
            },
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "class {} {{", self.name)?;

        for var in &self.vars {
            writeln!(f, "{}{}", INDENT, var)?;
        }

        for subroutine in &self.subroutines {
            writeln!(f)?;
            write!(f, "{}", subroutine)?;
        }

        writeln!(f, "}}")
    }
}

impl fmt::Display for ClassVarDec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ClassVarKind::Static => "static",
            ClassVarKind::Field => "field",
        };

        write!(f, "{} {} {};", kind, self.ty, self.names.iter().join(", "))
    }
}

impl fmt::Display for SubroutineDec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            SubroutineKind::Constructor => "constructor",
            SubroutineKind::Function => "function",
            SubroutineKind::Method => "method",
        };

        let return_type = match self.return_type {
            Some(ref ty) => ty.to_string(),
            None => "void".to_string(),
        };

        let parameters = self.parameters.iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .join(", ");

        writeln!(f, "{}{} {} {}({}) {{", INDENT, kind, return_type, self.name, parameters)?;

        for var in &self.body.vars {
            write_indent(f, 2)?;
            writeln!(f, "var {} {};", var.ty, var.names.iter().join(", "))?;
        }

        for statement in &self.body.statements {
            statement.write_indented(f, 2)?;
        }

        writeln!(f, "{}}}", INDENT)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Char => f.write_str("char"),
            Type::Boolean => f.write_str("boolean"),
            Type::Class(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.first)?;

        for (op, term) in &self.rest {
            write!(f, " {} {}", op.symbol(), term)?;
        }

        Ok(())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::IntegerConstant(value) => write!(f, "{}", value),
            Term::StringConstant(text) => write!(f, "\"{}\"", text),
            Term::KeywordConstant(constant) => write!(f, "{}", constant),
            Term::Variable(name) => f.write_str(name),
            Term::ArrayAccess { name, index } => write!(f, "{}[{}]", name, index),
            Term::Parenthesized(inner) => write!(f, "({})", inner),
            Term::Unary(op, term) => write!(f, "{}{}", op.symbol(), term),
            Term::Call(call) => write!(f, "{}", call),
        }
    }
}

impl fmt::Display for KeywordConstant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            KeywordConstant::True => "true",
            KeywordConstant::False => "false",
            KeywordConstant::Null => "null",
            KeywordConstant::This => "this",
        })
    }
}

impl fmt::Display for SubroutineCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref receiver) = self.receiver {
            write!(f, "{}.", receiver)?;
        }

        write!(f, "{}({})", self.name, self.arguments.iter().join(", "))
    }
}
