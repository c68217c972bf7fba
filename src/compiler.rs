//! Code generation from a class syntax tree to a stack machine [Program].
//!
//! Every node is translated to a fixed instruction sequence. The only state carried between
//! nodes is the symbol tables and a label counter that runs over the whole class, so compiling
//! the same tree twice gives identical output.

use std::fmt;

use slog::{debug, o, trace, Discard, Logger};

use crate::jack::ast::*;
use crate::symbol_table::{Kind, Redefinition, Scopes};
use crate::vm::{ArithmeticOp, Command, Program, Segment, SegmentError};

/// Reason for a failed compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// A name that is neither a local, an argument, a field nor a static.
    UndefinedVariable {
        name: String,
        suggestion: Option<String>,
    },
    Redefinition(Redefinition),
    /// A constant or index the target cannot address.
    Segment(SegmentError),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::UndefinedVariable { name, suggestion: Some(suggestion) } =>
                write!(f, "undefined variable '{}', did you mean '{}'?", name, suggestion),
            ErrorKind::UndefinedVariable { name, suggestion: None } =>
                write!(f, "undefined variable '{}'", name),
            ErrorKind::Redefinition(err) => fmt::Display::fmt(err, f),
            ErrorKind::Segment(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl From<Redefinition> for ErrorKind {
    fn from(err: Redefinition) -> ErrorKind {
        ErrorKind::Redefinition(err)
    }
}

impl From<SegmentError> for ErrorKind {
    fn from(err: SegmentError) -> ErrorKind {
        ErrorKind::Segment(err)
    }
}

/// A compilation error together with the class and subroutine it occurred in.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub class: String,
    pub subroutine: Option<String>,
    pub kind: ErrorKind,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.subroutine {
            Some(ref subroutine) => write!(f, "in {}.{}: {}", self.class, subroutine, self.kind),
            None => write!(f, "in class {}: {}", self.class, self.kind),
        }
    }
}

impl std::error::Error for Error {}

type Result<T> = std::result::Result<T, ErrorKind>;

struct Compiler<'c> {
    class: &'c Class,
    scopes: Scopes,
    labels: usize,
    program: Program,
}

impl<'c> Compiler<'c> {
    fn emit<C: Into<Command>>(&mut self, command: C) {
        self.program.push(command.into());
    }

    fn push(&mut self, segment: Segment, index: u32) -> Result<()> {
        let command = Command::push(segment, index)?;
        self.emit(command);
        Ok(())
    }

    fn pop(&mut self, segment: Segment, index: u32) -> Result<()> {
        let command = Command::pop(segment, index)?;
        self.emit(command);
        Ok(())
    }

    fn call(&mut self, name: String, args: u16) {
        self.emit(Command::Call { name, args });
    }

    fn next_label(&mut self) -> String {
        self.labels += 1;
        format!("L{}", self.labels)
    }

    fn resolve(&self, name: &str) -> Result<(Segment, u32)> {
        match self.scopes.resolve(name) {
            Some(symbol) => Ok((symbol.kind.segment(), symbol.index as u32)),
            None => Err(ErrorKind::UndefinedVariable {
                name: name.to_string(),
                suggestion: self.scopes.suggest(name).map(String::from),
            }),
        }
    }

    fn push_variable(&mut self, name: &str) -> Result<()> {
        let (segment, index) = self.resolve(name)?;
        self.push(segment, index)
    }

    fn define_class_vars(&mut self) -> Result<()> {
        for dec in &self.class.vars {
            let kind = match dec.kind {
                ClassVarKind::Static => Kind::Static,
                ClassVarKind::Field => Kind::Field,
            };

            for name in &dec.names {
                self.scopes.class.define(name.as_str(), dec.ty.clone(), kind)?;
            }
        }

        Ok(())
    }

    fn compile_subroutine(&mut self, subroutine: &SubroutineDec, logger: &Logger) -> Result<()> {
        self.scopes.subroutine.reset();

        if subroutine.kind == SubroutineKind::Method {
            let this = Type::Class(self.class.name.clone());
            self.scopes.subroutine.define("this", this, Kind::Argument)?;
        }

        for parameter in &subroutine.parameters {
            self.scopes.subroutine.define(parameter.name.as_str(), parameter.ty.clone(), Kind::Argument)?;
        }

        for dec in &subroutine.body.vars {
            for name in &dec.names {
                self.scopes.subroutine.define(name.as_str(), dec.ty.clone(), Kind::Local)?;
            }
        }

        let locals = self.scopes.subroutine.var_count(Kind::Local);

        trace!(logger, "subroutine scope ready";
            "arguments" => self.scopes.subroutine.var_count(Kind::Argument),
            "locals" => locals);

        self.emit(Command::Function {
            name: format!("{}.{}", self.class.name, subroutine.name),
            locals,
        });

        match subroutine.kind {
            SubroutineKind::Constructor => {
                let fields = self.scopes.class.var_count(Kind::Field);
                self.push(Segment::Constant, fields as u32)?;
                self.call("Memory.alloc".to_string(), 1);
                self.pop(Segment::Pointer, 0)?;
            },
            SubroutineKind::Method => {
                self.push(Segment::Argument, 0)?;
                self.pop(Segment::Pointer, 0)?;
            },
            SubroutineKind::Function => (),
        }

        self.compile_statements(&subroutine.body.statements)
    }

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<()> {
        for statement in statements {
            self.compile_statement(statement)?;
        }

        Ok(())
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Let { name, index: None, value } => {
                self.compile_expression(value)?;
                let (segment, index) = self.resolve(name)?;
                self.pop(segment, index)?;
            },
            Statement::Let { name, index: Some(index), value } => {
                self.push_variable(name)?;
                self.compile_expression(index)?;
                self.emit(ArithmeticOp::Add);
                self.compile_expression(value)?;
                self.pop(Segment::Temp, 0)?;
                self.pop(Segment::Pointer, 1)?;
                self.push(Segment::Temp, 0)?;
                self.pop(Segment::That, 0)?;
            },
            Statement::If { condition, then_branch, else_branch } => {
                let else_label = self.next_label();
                let end_label = self.next_label();

                self.compile_expression(condition)?;
                self.emit(ArithmeticOp::Not);
                self.emit(Command::IfGoto(else_label.clone()));
                self.compile_statements(then_branch)?;
                self.emit(Command::Goto(end_label.clone()));
                self.emit(Command::Label(else_label));

                if let Some(else_branch) = else_branch {
                    self.compile_statements(else_branch)?;
                }

                self.emit(Command::Label(end_label));
            },
            Statement::While { condition, body } => {
                let top_label = self.next_label();
                let end_label = self.next_label();

                self.emit(Command::Label(top_label.clone()));
                self.compile_expression(condition)?;
                self.emit(ArithmeticOp::Not);
                self.emit(Command::IfGoto(end_label.clone()));
                self.compile_statements(body)?;
                self.emit(Command::Goto(top_label));
                self.emit(Command::Label(end_label));
            },
            Statement::Do(call) => {
                self.compile_call(call)?;
                self.pop(Segment::Temp, 0)?;
            },
            Statement::Return(value) => {
                match value {
                    Some(value) => self.compile_expression(value)?,
                    None => self.push(Segment::Constant, 0)?,
                }

                self.emit(Command::Return);
            },
        }

        Ok(())
    }

    fn compile_expression(&mut self, expression: &Expression) -> Result<()> {
        self.compile_term(&expression.first)?;

        for (op, term) in &expression.rest {
            self.compile_term(term)?;

            match op {
                BinaryOp::Add => self.emit(ArithmeticOp::Add),
                BinaryOp::Sub => self.emit(ArithmeticOp::Sub),
                BinaryOp::And => self.emit(ArithmeticOp::And),
                BinaryOp::Or => self.emit(ArithmeticOp::Or),
                BinaryOp::Lt => self.emit(ArithmeticOp::Lt),
                BinaryOp::Gt => self.emit(ArithmeticOp::Gt),
                BinaryOp::Eq => self.emit(ArithmeticOp::Eq),
                BinaryOp::Mul => self.call("Math.multiply".to_string(), 2),
                BinaryOp::Div => self.call("Math.divide".to_string(), 2),
            }
        }

        Ok(())
    }

    fn compile_term(&mut self, term: &Term) -> Result<()> {
        match term {
            Term::IntegerConstant(value) => self.push(Segment::Constant, *value as u32)?,
            Term::StringConstant(text) => {
                let length = text.chars().count() as u32;
                self.push(Segment::Constant, length)?;
                self.call("String.new".to_string(), 1);

                for c in text.chars() {
                    self.push(Segment::Constant, c as u32)?;
                    self.call("String.appendChar".to_string(), 2);
                }
            },
            Term::KeywordConstant(KeywordConstant::True) => {
                self.push(Segment::Constant, 1)?;
                self.emit(ArithmeticOp::Neg);
            },
            Term::KeywordConstant(KeywordConstant::False)
                | Term::KeywordConstant(KeywordConstant::Null) => self.push(Segment::Constant, 0)?,
            Term::KeywordConstant(KeywordConstant::This) => self.push(Segment::Pointer, 0)?,
            Term::Variable(name) => self.push_variable(name)?,
            Term::ArrayAccess { name, index } => {
                self.push_variable(name)?;
                self.compile_expression(index)?;
                self.emit(ArithmeticOp::Add);
                self.pop(Segment::Pointer, 1)?;
                self.push(Segment::That, 0)?;
            },
            Term::Parenthesized(inner) => self.compile_expression(inner)?,
            Term::Unary(op, operand) => {
                self.compile_term(operand)?;

                match op {
                    UnaryOp::Neg => self.emit(ArithmeticOp::Neg),
                    UnaryOp::Not => self.emit(ArithmeticOp::Not),
                }
            },
            Term::Call(call) => self.compile_call(call)?,
        }

        Ok(())
    }

    /// Pushes the receiver (if any) and the arguments, then calls.
    fn compile_call(&mut self, call: &SubroutineCall) -> Result<()> {
        let argc = call.arguments.len() as u16;

        let (name, args) = match call.receiver {
            None => {
                self.push(Segment::Pointer, 0)?;
                (format!("{}.{}", self.class.name, call.name), argc + 1)
            },
            Some(ref receiver) => match self.scopes.resolve(receiver) {
                Some(symbol) => {
                    let class = symbol.ty.to_string();
                    let (segment, index) = (symbol.kind.segment(), symbol.index as u32);
                    self.push(segment, index)?;
                    (format!("{}.{}", class, call.name), argc + 1)
                },
                None => (format!("{}.{}", receiver, call.name), argc),
            },
        };

        for argument in &call.arguments {
            self.compile_expression(argument)?;
        }

        self.call(name, args);

        Ok(())
    }
}

/// Compiles a class without logging.
pub fn compile(class: &Class) -> std::result::Result<Program, Error> {
    compile_with_logger(class, None)
}

/// Compiles a class, logging progress to `logger`.
pub fn compile_with_logger<L>(class: &Class, logger: L) -> std::result::Result<Program, Error>
where
    L: Into<Option<Logger>>,
{
    let logger = logger.into()
        .unwrap_or(Logger::root(Discard, o!()))
        .new(o!("stage" => "compilation", "class" => class.name.clone()));

    let mut compiler = Compiler {
        class,
        scopes: Scopes::default(),
        labels: 0,
        program: Program::new(),
    };

    compiler.define_class_vars()
        .map_err(|kind| Error {
            class: class.name.clone(),
            subroutine: None,
            kind,
        })?;

    debug!(logger, "class scope ready";
        "fields" => compiler.scopes.class.var_count(Kind::Field),
        "statics" => compiler.scopes.class.var_count(Kind::Static));

    for subroutine in &class.subroutines {
        let logger = logger.new(o!("subroutine" => subroutine.name.clone()));
        let start = compiler.program.len();

        compiler.compile_subroutine(subroutine, &logger)
            .map_err(|kind| Error {
                class: class.name.clone(),
                subroutine: Some(subroutine.name.clone()),
                kind,
            })?;

        trace!(logger, "compiled subroutine"; "commands" => compiler.program.len() - start);
    }

    debug!(logger, "compilation finished"; "commands" => compiler.program.len(), "labels" => compiler.labels);

    Ok(compiler.program)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_source(source: &str) -> std::result::Result<Program, Error> {
        compile(&Class::parse(source).unwrap())
    }

    fn lines(source: &str) -> Vec<String> {
        compile_source(source)
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    fn function(body: &str) -> String {
        format!("class Main {{ function void main() {{ {} }} }}", body)
    }

    #[test]
    fn test_if_else_shape() {
        let output = lines(&function("
            var int x, y;
            if (x > 0) { let y = x + 1; } else { let y = 0; }
            return;
        "));

        assert_eq!(output, vec![
            "function Main.main 2",
            "push local 0",
            "push constant 0",
            "gt",
            "not",
            "if-goto L1",
            "push local 0",
            "push constant 1",
            "add",
            "pop local 1",
            "goto L2",
            "label L1",
            "push constant 0",
            "pop local 1",
            "label L2",
            "push constant 0",
            "return",
        ]);
    }

    #[test]
    fn test_do_on_class_name() {
        let output = lines(&function("do Output.printInt(5); return;"));

        assert_eq!(&output[1..4], &["push constant 5", "call Output.printInt 1", "pop temp 0"]);
    }

    #[test]
    fn test_call_receivers() {
        let output = lines("
            class Ball {
                field Point p;
                method void move() {
                    do bounce(1);
                    do p.shift(2, 3);
                    do Screen.clear();
                    return;
                }
                method void bounce(int n) { return; }
            }
        ");

        assert_eq!(output[..18].to_vec(), vec![
            "function Ball.move 0",
            "push argument 0",
            "pop pointer 0",
            "push pointer 0",
            "push constant 1",
            "call Ball.bounce 2",
            "pop temp 0",
            "push this 0",
            "push constant 2",
            "push constant 3",
            "call Point.shift 3",
            "pop temp 0",
            "call Screen.clear 0",
            "pop temp 0",
            "push constant 0",
            "return",
            "function Ball.bounce 0",
            "push argument 0",
        ]);
    }

    #[test]
    fn test_method_arguments_start_at_one() {
        let output = lines("
            class A {
                method int get(int a, int b) { return b; }
                function int first(int a, int b) { return a; }
            }
        ");

        assert!(output.contains(&"push argument 2".to_string()));
        assert_eq!(output.last().map(String::as_str), Some("return"));
        assert_eq!(output[output.len() - 2], "push argument 0");
    }

    #[test]
    fn test_constructor_allocates_fields() {
        let output = lines("
            class Point {
                field int x, y;
                static int count;
                constructor Point new(int ax) {
                    let x = ax;
                    let count = count + 1;
                    return this;
                }
            }
        ");

        assert_eq!(output, vec![
            "function Point.new 0",
            "push constant 2",
            "call Memory.alloc 1",
            "pop pointer 0",
            "push argument 0",
            "pop this 0",
            "push static 0",
            "push constant 1",
            "add",
            "pop static 0",
            "push pointer 0",
            "return",
        ]);
    }

    #[test]
    fn test_arrays() {
        let output = lines(&function("
            var Array a;
            let a[1] = a[2];
            return;
        "));

        assert_eq!(output[1..13], [
            "push local 0",
            "push constant 1",
            "add",
            "push local 0",
            "push constant 2",
            "add",
            "pop pointer 1",
            "push that 0",
            "pop temp 0",
            "pop pointer 1",
            "push temp 0",
            "pop that 0",
        ]);
    }

    #[test]
    fn test_constants_and_operators() {
        let output = lines(&function("
            var boolean b;
            let b = ~true | false & (null = 0);
            let b = -3 * 4 / 2;
            return;
        "));

        assert_eq!(output[1..18], [
            "push constant 1",
            "neg",
            "not",
            "push constant 0",
            "or",
            "push constant 0",
            "push constant 0",
            "eq",
            "and",
            "pop local 0",
            "push constant 3",
            "neg",
            "push constant 4",
            "call Math.multiply 2",
            "push constant 2",
            "call Math.divide 2",
            "pop local 0",
        ]);
    }

    #[test]
    fn test_string_constant() {
        let output = lines(&function("do Output.printString(\"Hi\"); return;"));

        assert_eq!(output[1..8], [
            "push constant 2",
            "call String.new 1",
            "push constant 72",
            "call String.appendChar 2",
            "push constant 105",
            "call String.appendChar 2",
            "call Output.printString 1",
        ]);
    }

    #[test]
    fn test_while_labels_continue_across_subroutines() {
        let output = lines("
            class Loop {
                function void a() { while (true) { } return; }
                function void b() { if (false) { } return; }
            }
        ");

        assert_eq!(output[1..9], [
            "label L1",
            "push constant 1",
            "neg",
            "not",
            "if-goto L2",
            "goto L1",
            "label L2",
            "push constant 0",
        ]);

        assert!(output.contains(&"if-goto L3".to_string()));
        assert!(output.contains(&"label L4".to_string()));
    }

    #[test]
    fn test_deterministic_output() {
        let class = Class::parse("
            class Main {
                function int f(int n) {
                    var int i;
                    while (i < n) { if (i = 3) { return i; } let i = i + 1; }
                    return 0;
                }
            }
        ").unwrap();

        assert_eq!(compile(&class), compile(&class));
    }

    #[test]
    fn test_undefined_variable() {
        let err = compile_source(&function("var int count; let cout = 1; return;")).unwrap_err();

        assert_eq!(err, Error {
            class: "Main".to_string(),
            subroutine: Some("main".to_string()),
            kind: ErrorKind::UndefinedVariable {
                name: "cout".to_string(),
                suggestion: Some("count".to_string()),
            },
        });
        assert_eq!(err.to_string(), "in Main.main: undefined variable 'cout', did you mean 'count'?");
    }

    #[test]
    fn test_duplicate_declarations() {
        let err = compile_source("class A { field int x; static int x; }").unwrap_err();
        assert_eq!(err.subroutine, None);

        let err = compile_source("class A { function void f(int a) { var int a; return; } }").unwrap_err();
        assert_eq!(err.subroutine, Some("f".to_string()));

        assert!(compile_source("class A { field int x; function void f(int x) { return; } }").is_ok());
    }

    #[test]
    fn test_character_out_of_range() {
        let err = compile_source(&function("do Output.printString(\"\u{8000}\"); return;")).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Segment(SegmentError::OutOfRange {
            segment: Segment::Constant,
            index: 0x8000,
        }));
    }
}
