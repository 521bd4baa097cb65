//! Compact JavaScript printer.
//!
//! Top-level statements are printed one per line; nested blocks are printed
//! inline. The output is meant for assertions and decision logs, not for
//! shipping code, so it only parenthesizes where precedence demands it.

use super::util::is_js_identifier;
use super::{Ast, NodeId, NodeProps, Token};

const PREC_LOWEST: u8 = 0;
const PREC_ASSIGN: u8 = 1;
const PREC_HOOK: u8 = 2;
const PREC_OR: u8 = 3;
const PREC_AND: u8 = 4;
const PREC_EQUALITY: u8 = 9;
const PREC_ADDITIVE: u8 = 13;
const PREC_UNARY: u8 = 15;
const PREC_CALL: u8 = 18;
const PREC_PRIMARY: u8 = 20;

fn precedence(token: Token) -> u8 {
    match token {
        Token::Assign => PREC_ASSIGN,
        Token::Hook => PREC_HOOK,
        Token::Or | Token::Coalesce => PREC_OR,
        Token::And => PREC_AND,
        Token::Sheq => PREC_EQUALITY,
        Token::Add => PREC_ADDITIVE,
        Token::Not | Token::Void | Token::DelProp => PREC_UNARY,
        Token::Call
        | Token::OptChainCall
        | Token::New
        | Token::GetProp
        | Token::GetElem
        | Token::DynamicImport => PREC_CALL,
        Token::Function => PREC_ASSIGN,
        _ => PREC_PRIMARY,
    }
}

/// Print the whole tree.
pub fn print(ast: &Ast) -> String {
    print_node(ast, ast.root())
}

/// Print a single subtree.
pub fn print_node(ast: &Ast, id: NodeId) -> String {
    let mut printer = Printer { ast, out: String::new() };
    printer.node(id);
    printer.out
}

struct Printer<'a> {
    ast: &'a Ast,
    out: String,
}

impl Printer<'_> {
    fn node(&mut self, id: NodeId) {
        match self.ast.token(id) {
            Token::Script => {
                for (i, &stmt) in self.ast.children(id).iter().enumerate() {
                    if i > 0 {
                        self.out.push('\n');
                    }
                    self.statement(stmt);
                }
            }
            t if is_statement(t) => self.statement(id),
            _ => self.expr(id, PREC_LOWEST),
        }
    }

    fn statement(&mut self, id: NodeId) {
        let ast = self.ast;
        match ast.token(id) {
            Token::Block => self.block(id),
            Token::ExprResult => {
                if let Some(expr) = ast.first_child(id) {
                    if starts_with_brace_or_keyword(ast, expr) {
                        self.out.push('(');
                        self.expr(expr, PREC_LOWEST);
                        self.out.push(')');
                    } else {
                        self.expr(expr, PREC_LOWEST);
                    }
                }
                self.out.push(';');
            }
            Token::Var | Token::Let | Token::Const => {
                self.out.push_str(match ast.token(id) {
                    Token::Var => "var ",
                    Token::Let => "let ",
                    _ => "const ",
                });
                for (i, &target) in ast.children(id).iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.declaration_target(target);
                }
                self.out.push(';');
            }
            Token::Return => {
                self.out.push_str("return");
                if let Some(value) = ast.first_child(id) {
                    self.out.push(' ');
                    self.expr(value, PREC_LOWEST);
                }
                self.out.push(';');
            }
            Token::If => {
                let children = ast.children(id);
                self.out.push_str("if (");
                self.expr(children[0], PREC_LOWEST);
                self.out.push_str(") ");
                self.statement(children[1]);
                if let Some(&otherwise) = children.get(2) {
                    self.out.push_str(" else ");
                    self.statement(otherwise);
                }
            }
            Token::Function => self.function(id, "function "),
            Token::Class => self.class(id),
            Token::Empty => self.out.push(';'),
            _ => self.expr(id, PREC_LOWEST),
        }
    }

    fn block(&mut self, id: NodeId) {
        let children = self.ast.children(id);
        if children.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{ ");
        for (i, &stmt) in children.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            self.statement(stmt);
        }
        self.out.push_str(" }");
    }

    fn declaration_target(&mut self, target: NodeId) {
        let ast = self.ast;
        match ast.token(target) {
            Token::Name => {
                self.out.push_str(ast.string(target));
                if let Some(value) = ast.first_child(target) {
                    self.out.push_str(" = ");
                    self.expr(value, PREC_ASSIGN);
                }
            }
            Token::DestructuringLhs => {
                let children = ast.children(target);
                self.expr(children[0], PREC_LOWEST);
                if let Some(&rhs) = children.get(1) {
                    self.out.push_str(" = ");
                    self.expr(rhs, PREC_ASSIGN);
                }
            }
            _ => self.expr(target, PREC_LOWEST),
        }
    }

    fn args(&mut self, args: &[NodeId]) {
        self.out.push('(');
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(arg, PREC_ASSIGN);
        }
        self.out.push(')');
    }

    fn binary(&mut self, id: NodeId, op: &str, prec: u8) {
        let children = self.ast.children(id);
        self.expr(children[0], prec);
        self.out.push(' ');
        self.out.push_str(op);
        self.out.push(' ');
        self.expr(children[1], prec + 1);
    }

    fn expr(&mut self, id: NodeId, min_prec: u8) {
        let ast = self.ast;
        let token = ast.token(id);
        let prec = precedence(token);
        let wrap = prec < min_prec;
        if wrap {
            self.out.push('(');
        }
        match token {
            Token::Name => self.out.push_str(ast.string(id)),
            Token::GetProp => {
                if let Some(receiver) = ast.first_child(id) {
                    self.expr(receiver, PREC_CALL);
                }
                self.out.push('.');
                self.out.push_str(ast.string(id));
            }
            Token::GetElem => {
                let children = ast.children(id);
                self.expr(children[0], PREC_CALL);
                self.out.push('[');
                self.expr(children[1], PREC_LOWEST);
                self.out.push(']');
            }
            Token::Assign => {
                let children = ast.children(id);
                self.expr(children[0], PREC_CALL);
                self.out.push_str(" = ");
                self.expr(children[1], PREC_ASSIGN);
            }
            Token::Or => self.binary(id, "||", PREC_OR),
            Token::Coalesce => self.binary(id, "??", PREC_OR),
            Token::And => self.binary(id, "&&", PREC_AND),
            Token::Sheq => self.binary(id, "===", PREC_EQUALITY),
            Token::Add => self.binary(id, "+", PREC_ADDITIVE),
            Token::Not => {
                self.out.push('!');
                if let Some(operand) = ast.first_child(id) {
                    self.expr(operand, PREC_UNARY);
                }
            }
            Token::Void => {
                self.out.push_str("void ");
                if let Some(operand) = ast.first_child(id) {
                    self.expr(operand, PREC_UNARY);
                }
            }
            Token::DelProp => {
                self.out.push_str("delete ");
                if let Some(operand) = ast.first_child(id) {
                    self.expr(operand, PREC_UNARY);
                }
            }
            Token::Hook => {
                let children = ast.children(id);
                self.expr(children[0], PREC_HOOK + 1);
                self.out.push_str(" ? ");
                self.expr(children[1], PREC_ASSIGN);
                self.out.push_str(" : ");
                self.expr(children[2], PREC_ASSIGN);
            }
            Token::Call | Token::OptChainCall => {
                let children = ast.children(id);
                self.expr(children[0], PREC_CALL);
                if token == Token::OptChainCall {
                    self.out.push_str("?.");
                }
                self.args(&children[1..]);
            }
            Token::New => {
                let children = ast.children(id);
                self.out.push_str("new ");
                self.expr(children[0], PREC_CALL);
                self.args(&children[1..]);
            }
            Token::DynamicImport => {
                self.out.push_str("import");
                self.args(ast.children(id));
            }
            Token::Function => self.function(id, "function "),
            Token::Class => self.class(id),
            Token::ObjectLit | Token::ObjectPattern => {
                let children = ast.children(id);
                if children.is_empty() {
                    self.out.push_str("{}");
                } else {
                    self.out.push('{');
                    for (i, &entry) in children.iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(", ");
                        }
                        self.object_entry(entry);
                    }
                    self.out.push('}');
                }
            }
            Token::DefaultValue => {
                let children = ast.children(id);
                self.expr(children[0], PREC_CALL);
                self.out.push_str(" = ");
                self.expr(children[1], PREC_ASSIGN);
            }
            Token::ArrayLit => {
                self.out.push('[');
                for (i, &element) in ast.children(id).iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(element, PREC_ASSIGN);
                }
                self.out.push(']');
            }
            Token::Number => {
                let value = ast.node(id).number.unwrap_or(0.0);
                if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
                    self.out.push_str(&format!("{}", value as i64));
                } else {
                    self.out.push_str(&format!("{}", value));
                }
            }
            Token::String => self.quoted(ast.string(id)),
            Token::This => self.out.push_str("this"),
            Token::Super => self.out.push_str("super"),
            Token::Null => self.out.push_str("null"),
            Token::True => self.out.push_str("true"),
            Token::False => self.out.push_str("false"),
            Token::Empty => {}
            Token::StringKey
            | Token::MemberFunctionDef
            | Token::GetterDef
            | Token::SetterDef
            | Token::ComputedProp
            | Token::ObjectSpread
            | Token::ObjectRest => self.object_entry(id),
            Token::DestructuringLhs => self.declaration_target(id),
            Token::ParamList => self.params(id),
            t if is_statement(t) => self.statement(id),
            t => self.out.push_str(t.as_str()),
        }
        if wrap {
            self.out.push(')');
        }
    }

    fn object_entry(&mut self, entry: NodeId) {
        let ast = self.ast;
        match ast.token(entry) {
            Token::StringKey => {
                self.key(entry);
                if let Some(value) = ast.first_child(entry) {
                    self.out.push_str(": ");
                    self.expr(value, PREC_ASSIGN);
                }
            }
            Token::MemberFunctionDef => self.method(entry, ""),
            Token::GetterDef => self.method(entry, "get "),
            Token::SetterDef => self.method(entry, "set "),
            Token::ComputedProp => {
                let children = ast.children(entry);
                self.out.push('[');
                self.expr(children[0], PREC_ASSIGN);
                self.out.push_str("]: ");
                self.expr(children[1], PREC_ASSIGN);
            }
            Token::ObjectSpread | Token::ObjectRest => {
                self.out.push_str("...");
                if let Some(value) = ast.first_child(entry) {
                    self.expr(value, PREC_ASSIGN);
                }
            }
            _ => self.expr(entry, PREC_ASSIGN),
        }
    }

    fn key(&mut self, key: NodeId) {
        let name = self.ast.string(key);
        if self.ast.has_prop(key, NodeProps::QUOTED) || !is_js_identifier(name) {
            self.quoted(name);
        } else {
            self.out.push_str(name);
        }
    }

    fn method(&mut self, member: NodeId, prefix: &str) {
        let ast = self.ast;
        if ast.has_prop(member, NodeProps::STATIC_MEMBER) {
            self.out.push_str("static ");
        }
        self.out.push_str(prefix);
        self.out.push_str(ast.string(member));
        if let Some(function) = ast.first_child(member) {
            self.params_and_body(function);
        }
    }

    fn function(&mut self, id: NodeId, keyword: &str) {
        let ast = self.ast;
        if ast.has_prop(id, NodeProps::ARROW) {
            let children = ast.children(id);
            self.params(children[1]);
            self.out.push_str(" => ");
            let body = children[2];
            if ast.is(body, Token::Block) {
                self.block(body);
            } else if ast.is(body, Token::ObjectLit) {
                self.out.push('(');
                self.expr(body, PREC_LOWEST);
                self.out.push(')');
            } else {
                self.expr(body, PREC_ASSIGN);
            }
            return;
        }
        self.out.push_str(keyword);
        if let Some(name) = ast.first_child(id) {
            let name = ast.string(name);
            if !name.is_empty() {
                // `function f()` rather than `function  f()`
                let _ = self.out.pop();
                self.out.push(' ');
                self.out.push_str(name);
            } else {
                let _ = self.out.pop();
            }
        }
        self.params_and_body(id);
    }

    fn params(&mut self, params: NodeId) {
        self.out.push('(');
        for (i, &param) in self.ast.children(params).iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(param, PREC_ASSIGN);
        }
        self.out.push(')');
    }

    fn params_and_body(&mut self, function: NodeId) {
        let children = self.ast.children(function);
        if let Some(&params) = children.get(1) {
            self.params(params);
        } else {
            self.out.push_str("()");
        }
        self.out.push(' ');
        match children.get(2) {
            Some(&body) => self.block(body),
            None => self.out.push_str("{}"),
        }
    }

    fn class(&mut self, id: NodeId) {
        let ast = self.ast;
        let children = ast.children(id);
        self.out.push_str("class");
        if ast.is(children[0], Token::Name) {
            self.out.push(' ');
            self.out.push_str(ast.string(children[0]));
        }
        if !ast.is(children[1], Token::Empty) {
            self.out.push_str(" extends ");
            self.expr(children[1], PREC_CALL);
        }
        let members = ast.children(children[2]);
        if members.is_empty() {
            self.out.push_str(" {}");
            return;
        }
        self.out.push_str(" { ");
        for (i, &member) in members.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            self.object_entry(member);
        }
        self.out.push_str(" }");
    }

    fn quoted(&mut self, s: &str) {
        self.out.push('\'');
        for c in s.chars() {
            match c {
                '\'' => self.out.push_str("\\'"),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                c => self.out.push(c),
            }
        }
        self.out.push('\'');
    }
}

fn is_statement(token: Token) -> bool {
    matches!(
        token,
        Token::Block
            | Token::ExprResult
            | Token::Var
            | Token::Let
            | Token::Const
            | Token::Return
            | Token::If
    )
}

/// Expression statements that would parse as something else unparenthesized.
fn starts_with_brace_or_keyword(ast: &Ast, expr: NodeId) -> bool {
    let mut current = expr;
    loop {
        match ast.token(current) {
            Token::ObjectLit | Token::ObjectPattern | Token::Class => return true,
            Token::Function => return !ast.has_prop(current, NodeProps::ARROW),
            Token::Assign
            | Token::Or
            | Token::And
            | Token::Coalesce
            | Token::Add
            | Token::Sheq
            | Token::Hook
            | Token::Call
            | Token::OptChainCall
            | Token::GetProp
            | Token::GetElem => match ast.first_child(current) {
                Some(first) => current = first,
                None => return false,
            },
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_declarations_and_assignments() {
        let mut ast = Ast::new();
        let one = ast.new_number(1.0);
        let decl = ast.new_var_decl("a$b", Some(one));
        ast.push_statement(decl);

        let lhs = ast.new_qname("a.c");
        let a = ast.new_name("a");
        let empty = ast.new_object_lit(&[]);
        let or = ast.new_or(a, empty);
        let assign = ast.new_assign(lhs, or);
        let stmt = ast.new_expr_result(assign);
        ast.push_statement(stmt);

        assert_eq!(print(&ast), "var a$b = 1;\na.c = a || {};");
    }

    #[test]
    fn test_print_functions_and_classes() {
        let mut ast = Ast::new();
        let this = ast.new_this();
        let prop = ast.new_getprop(this, "x");
        let ret = ast.new_return(Some(prop));
        let method_fn = ast.new_function("", &[], &[ret]);
        let member = ast.new_member_function("m", method_fn, true);
        let class = ast.new_class("Foo", None, &[member]);
        ast.push_statement(class);

        let body_fn = ast.new_function("f", &["a", "b"], &[]);
        ast.push_statement(body_fn);

        let value = ast.new_name("v");
        let arrow = ast.new_arrow(&["ns"], value);
        let stmt = ast.new_expr_result(arrow);
        ast.push_statement(stmt);

        assert_eq!(
            print(&ast),
            "class Foo { static m() { return this.x; } }\nfunction f(a, b) {}\n(ns) => v;"
        );
    }

    #[test]
    fn test_print_object_literals_and_patterns() {
        let mut ast = Ast::new();
        let one = ast.new_number(1.0);
        let two = ast.new_number(2.5);
        let quoted = ast.new_quoted_string_key("not-an-id", one);
        let plain = ast.new_string_key("validKey", two);
        let lit = ast.new_object_lit(&[quoted, plain]);
        let decl = ast.new_var_decl("o", Some(lit));
        ast.push_statement(decl);

        let x = ast.new_name("x");
        let three = ast.new_number(3.0);
        let default = ast.new_default_value(x, three);
        let key = ast.new_string_key("b", default);
        let pattern = ast.new_object_pattern(&[key]);
        let rhs = ast.new_name("a");
        let destructuring = ast.new_destructuring_decl(Token::Const, pattern, rhs);
        ast.push_statement(destructuring);

        assert_eq!(
            print(&ast),
            "var o = {'not-an-id': 1, validKey: 2.5};\nconst {b: x = 3} = a;"
        );
    }

    #[test]
    fn test_print_parenthesizes_by_precedence() {
        let mut ast = Ast::new();
        let a = ast.new_name("a");
        let b = ast.new_name("b");
        let or = ast.new_or(a, b);
        let prop = ast.new_getprop(or, "c");
        let stmt = ast.new_expr_result(prop);
        ast.push_statement(stmt);

        assert_eq!(print(&ast), "(a || b).c;");
    }
}
