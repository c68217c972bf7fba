//! XML dumps of the token stream and of the parse tree.
//!
//! The element names follow the grammar productions, and terminals are written as
//! `<kind> text </kind>` with the text padded by one space.

use crate::parsing::Span;

use super::ast::*;
use super::token::{Keyword, Token, TokenKind};

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }

    escaped
}

struct XmlWriter {
    out: String,
    depth: usize,
    indent: &'static str,
}

impl XmlWriter {
    fn new(indent: &'static str) -> XmlWriter {
        XmlWriter {
            out: String::new(),
            depth: 0,
            indent,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(self.indent);
        }

        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, tag: &str) {
        self.line(&format!("<{}>", tag));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        self.line(&format!("</{}>", tag));
    }

    fn terminal(&mut self, kind: TokenKind, text: &str) {
        self.line(&format!("<{0}> {1} </{0}>", kind, escape(text)));
    }

    fn keyword(&mut self, keyword: Keyword) {
        self.terminal(TokenKind::Keyword, keyword.as_str());
    }

    fn symbol(&mut self, symbol: char) {
        self.terminal(TokenKind::Symbol, &symbol.to_string());
    }

    fn identifier(&mut self, name: &str) {
        self.terminal(TokenKind::Identifier, name);
    }

    fn ty(&mut self, ty: &Type) {
        match ty {
            Type::Int => self.keyword(Keyword::Int),
            Type::Char => self.keyword(Keyword::Char),
            Type::Boolean => self.keyword(Keyword::Boolean),
            Type::Class(name) => self.identifier(name),
        }
    }

    fn names(&mut self, names: &[String]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }

            self.identifier(name);
        }
    }

    fn class(&mut self, class: &Class) {
        self.open("class");
        self.keyword(Keyword::Class);
        self.identifier(&class.name);
        self.symbol('{');

        for var in &class.vars {
            self.open("classVarDec");
            self.keyword(match var.kind {
                ClassVarKind::Static => Keyword::Static,
                ClassVarKind::Field => Keyword::Field,
            });
            self.ty(&var.ty);
            self.names(&var.names);
            self.symbol(';');
            self.close("classVarDec");
        }

        for subroutine in &class.subroutines {
            self.subroutine(subroutine);
        }

        self.symbol('}');
        self.close("class");
    }

    fn subroutine(&mut self, subroutine: &SubroutineDec) {
        self.open("subroutineDec");
        self.keyword(match subroutine.kind {
            SubroutineKind::Constructor => Keyword::Constructor,
            SubroutineKind::Function => Keyword::Function,
            SubroutineKind::Method => Keyword::Method,
        });

        match subroutine.return_type {
            Some(ref ty) => self.ty(ty),
            None => self.keyword(Keyword::Void),
        }

        self.identifier(&subroutine.name);
        self.symbol('(');

        self.open("parameterList");
        for (i, parameter) in subroutine.parameters.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }

            self.ty(&parameter.ty);
            self.identifier(&parameter.name);
        }
        self.close("parameterList");

        self.symbol(')');

        self.open("subroutineBody");
        self.symbol('{');

        for var in &subroutine.body.vars {
            self.open("varDec");
            self.keyword(Keyword::Var);
            self.ty(&var.ty);
            self.names(&var.names);
            self.symbol(';');
            self.close("varDec");
        }

        self.statements(&subroutine.body.statements);
        self.symbol('}');
        self.close("subroutineBody");

        self.close("subroutineDec");
    }

    fn block(&mut self, statements: &[Statement]) {
        self.symbol('{');
        self.statements(statements);
        self.symbol('}');
    }

    fn statements(&mut self, statements: &[Statement]) {
        self.open("statements");

        for statement in statements {
            self.statement(statement);
        }

        self.close("statements");
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Let { name, index, value } => {
                self.open("letStatement");
                self.keyword(Keyword::Let);
                self.identifier(name);

                if let Some(index) = index {
                    self.symbol('[');
                    self.expression(index);
                    self.symbol(']');
                }

                self.symbol('=');
                self.expression(value);
                self.symbol(';');
                self.close("letStatement");
            },
            Statement::If { condition, then_branch, else_branch } => {
                self.open("ifStatement");
                self.keyword(Keyword::If);
                self.symbol('(');
                self.expression(condition);
                self.symbol(')');
                self.block(then_branch);

                if let Some(else_branch) = else_branch {
                    self.keyword(Keyword::Else);
                    self.block(else_branch);
                }

                self.close("ifStatement");
            },
            Statement::While { condition, body } => {
                self.open("whileStatement");
                self.keyword(Keyword::While);
                self.symbol('(');
                self.expression(condition);
                self.symbol(')');
                self.block(body);
                self.close("whileStatement");
            },
            Statement::Do(call) => {
                self.open("doStatement");
                self.keyword(Keyword::Do);
                self.call(call);
                self.symbol(';');
                self.close("doStatement");
            },
            Statement::Return(value) => {
                self.open("returnStatement");
                self.keyword(Keyword::Return);

                if let Some(value) = value {
                    self.expression(value);
                }

                self.symbol(';');
                self.close("returnStatement");
            },
        }
    }

    fn expression(&mut self, expression: &Expression) {
        self.open("expression");
        self.term(&expression.first);

        for (op, term) in &expression.rest {
            self.symbol(op.symbol());
            self.term(term);
        }

        self.close("expression");
    }

    fn term(&mut self, term: &Term) {
        self.open("term");

        match term {
            Term::IntegerConstant(value) =>
                self.terminal(TokenKind::IntegerConstant, &value.to_string()),
            Term::StringConstant(text) =>
                self.terminal(TokenKind::StringConstant, text),
            Term::KeywordConstant(constant) =>
                self.terminal(TokenKind::Keyword, &constant.to_string()),
            Term::Variable(name) => self.identifier(name),
            Term::ArrayAccess { name, index } => {
                self.identifier(name);
                self.symbol('[');
                self.expression(index);
                self.symbol(']');
            },
            Term::Parenthesized(inner) => {
                self.symbol('(');
                self.expression(inner);
                self.symbol(')');
            },
            Term::Unary(op, operand) => {
                self.symbol(op.symbol());
                self.term(operand);
            },
            Term::Call(call) => self.call(call),
        }

        self.close("term");
    }

    fn call(&mut self, call: &SubroutineCall) {
        if let Some(ref receiver) = call.receiver {
            self.identifier(receiver);
            self.symbol('.');
        }

        self.identifier(&call.name);
        self.symbol('(');

        self.open("expressionList");
        for (i, argument) in call.arguments.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }

            self.expression(argument);
        }
        self.close("expressionList");

        self.symbol(')');
    }
}

/// Writes the flat token dump.
pub fn tokens_to_xml(tokens: &[(Token, Span)]) -> String {
    let mut writer = XmlWriter::new("");
    writer.open("tokens");

    for (token, _) in tokens {
        writer.terminal(token.kind(), &token.text());
    }

    writer.close("tokens");
    writer.out
}

/// Writes the parse tree dump.
pub fn class_to_xml(class: &Class) -> String {
    let mut writer = XmlWriter::new("  ");
    writer.class(class);
    writer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jack::token::tokenize;

    #[test]
    fn test_token_dump() {
        let xml = tokens_to_xml(&tokenize("if (x < 10) { let s = \"a&b\"; }"));

        assert_eq!(xml, "\
<tokens>
<keyword> if </keyword>
<symbol> ( </symbol>
<identifier> x </identifier>
<symbol> &lt; </symbol>
<integerConstant> 10 </integerConstant>
<symbol> ) </symbol>
<symbol> { </symbol>
<keyword> let </keyword>
<identifier> s </identifier>
<symbol> = </symbol>
<stringConstant> a&amp;b </stringConstant>
<symbol> ; </symbol>
<symbol> } </symbol>
</tokens>
");
    }

    #[test]
    fn test_tree_dump() {
        let class = Class::parse("class A { function void f() { return; } }").unwrap();

        assert_eq!(class_to_xml(&class), "\
<class>
  <keyword> class </keyword>
  <identifier> A </identifier>
  <symbol> { </symbol>
  <subroutineDec>
    <keyword> function </keyword>
    <keyword> void </keyword>
    <identifier> f </identifier>
    <symbol> ( </symbol>
    <parameterList>
    </parameterList>
    <symbol> ) </symbol>
    <subroutineBody>
      <symbol> { </symbol>
      <statements>
        <returnStatement>
          <keyword> return </keyword>
          <symbol> ; </symbol>
        </returnStatement>
      </statements>
      <symbol> } </symbol>
    </subroutineBody>
  </subroutineDec>
  <symbol> } </symbol>
</class>
");
    }

    #[test]
    fn test_tree_dump_terms() {
        let class = Class::parse("class A { function void f() { do g(-a[1]); return; } }").unwrap();
        let xml = class_to_xml(&class);

        assert!(xml.contains("<doStatement>\n          <keyword> do </keyword>\n          <identifier> g </identifier>"));
        assert!(xml.contains("<symbol> - </symbol>\n                <term>\n                  <identifier> a </identifier>\n                  <symbol> [ </symbol>"));
    }
}
