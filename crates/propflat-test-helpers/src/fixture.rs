//! Parser for the JavaScript subset used in fixtures.
//!
//! Supports declarations, functions, arrows, classes with methods, object
//! literals and object patterns, calls, member access and the handful of
//! operators the collapse pass cares about. `/** ... */` comments become
//! JSDoc on the next statement, object key or class member.

use propflat_core::ast::{Ast, JsDoc, Node, NodeId, NodeProps, Token};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Num(f64),
    Str(String),
    Punct(&'static str),
    Doc(JsDoc),
    Eof,
}

const PUNCTUATORS: &[&str] = &[
    "===", "...", "=>", "||", "&&", "??", "?.", "{", "}", "(", ")", "[", "]", ";", ",", ".", "=",
    "?", ":", "!", "+",
];

/// Parse `source` into a tree, panicking on syntax errors.
pub fn parse(source: &str) -> Ast {
    try_parse(source).unwrap_or_else(|e| panic!("fixture does not parse: {}\n{}", e, source))
}

pub fn try_parse(source: &str) -> Result<Ast, String> {
    let toks = lex(source)?;
    let mut ast = Ast::new();
    let mut parser = Parser {
        toks,
        pos: 0,
        ast: &mut ast,
    };
    while parser.peek() != &Tok::Eof {
        let stmt = parser.statement()?;
        parser.ast.push_statement(stmt);
    }
    Ok(ast)
}

fn lex(source: &str) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            let end = (i + 2..chars.len().saturating_sub(1))
                .find(|&j| chars[j] == '*' && chars[j + 1] == '/')
                .ok_or("unterminated comment")?;
            let text: String = chars[i..end].iter().collect();
            if text.starts_with("/**") {
                toks.push(Tok::Doc(parse_jsdoc(&text)));
            }
            i = end + 2;
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            toks.push(Tok::Ident(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse().map_err(|_| format!("bad number {}", text))?;
            toks.push(Tok::Num(value));
        } else if c == '\'' || c == '"' {
            let mut value = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err("unterminated string".to_string()),
                    Some(&q) if q == c => break,
                    Some('\\') => {
                        if let Some(&escaped) = chars.get(i + 1) {
                            value.push(escaped);
                        }
                        i += 2;
                    }
                    Some(&other) => {
                        value.push(other);
                        i += 1;
                    }
                }
            }
            i += 1;
            toks.push(Tok::Str(value));
        } else {
            let punct = PUNCTUATORS
                .iter()
                .find(|p| p.chars().enumerate().all(|(k, pc)| chars.get(i + k) == Some(&pc)))
                .ok_or_else(|| format!("unexpected character {:?}", c))?;
            i += punct.len();
            toks.push(Tok::Punct(*punct));
        }
    }
    toks.push(Tok::Eof);
    Ok(toks)
}

fn parse_jsdoc(text: &str) -> JsDoc {
    let mut doc = JsDoc::empty();
    for tag in text.split('@').skip(1) {
        let word: String = tag.chars().take_while(|c| c.is_alphabetic()).collect();
        match word.as_str() {
            "const" => doc |= JsDoc::CONST,
            "this" => doc |= JsDoc::THIS_TYPE,
            "constructor" => doc |= JsDoc::CONSTRUCTOR,
            "interface" => doc |= JsDoc::INTERFACE,
            "nocollapse" => doc |= JsDoc::NO_COLLAPSE,
            _ => {}
        }
    }
    doc
}

type ParseResult<T> = Result<T, String>;

struct Parser<'a> {
    toks: Vec<Tok>,
    pos: usize,
    ast: &'a mut Ast,
}

impl Parser<'_> {
    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        self.toks.get(self.pos + offset).unwrap_or(&Tok::Eof)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.toks.len() {
            self.pos += 1;
        }
        tok
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Tok::Punct(p) if *p == punct)
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(w) if w == word)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        let found = self.is_punct(punct);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_word(&mut self, word: &str) -> bool {
        let found = self.is_word(word);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_punct(&mut self, punct: &str) -> ParseResult<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(format!("expected `{}`, found {:?}", punct, self.peek()))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.advance() {
            Tok::Ident(name) => Ok(name),
            other => Err(format!("expected identifier, found {:?}", other)),
        }
    }

    fn take_doc(&mut self) -> Option<JsDoc> {
        let mut doc = None;
        while let Tok::Doc(d) = self.peek() {
            doc = Some(doc.unwrap_or(JsDoc::empty()) | *d);
            self.pos += 1;
        }
        doc
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> ParseResult<NodeId> {
        let doc = self.take_doc();
        let stmt = match self.peek().clone() {
            Tok::Ident(w) if w == "var" || w == "let" || w == "const" => self.declaration()?,
            Tok::Ident(w) if w == "function" => {
                self.advance();
                self.function_rest()?
            }
            Tok::Ident(w) if w == "class" => {
                self.advance();
                self.class_rest()?
            }
            Tok::Ident(w) if w == "return" => {
                self.advance();
                let value = if self.is_punct(";") || self.is_punct("}") {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.eat_punct(";");
                self.ast.new_return(value)
            }
            Tok::Ident(w) if w == "if" => {
                self.advance();
                self.expect_punct("(")?;
                let cond = self.expression()?;
                self.expect_punct(")")?;
                let then = self.statement()?;
                let otherwise = if self.eat_word("else") {
                    Some(self.statement()?)
                } else {
                    None
                };
                self.ast.new_if(cond, then, otherwise)
            }
            Tok::Punct("{") => {
                let statements = self.block_statements()?;
                self.ast.new_block(&statements)
            }
            Tok::Punct(";") => {
                self.advance();
                self.ast.new_empty()
            }
            _ => {
                let expr = self.expression()?;
                self.eat_punct(";");
                self.ast.new_expr_result(expr)
            }
        };
        if doc.is_some() {
            self.ast.set_jsdoc(stmt, doc);
        }
        Ok(stmt)
    }

    fn block_statements(&mut self) -> ParseResult<Vec<NodeId>> {
        self.expect_punct("{")?;
        let mut statements = Vec::new();
        while !self.eat_punct("}") {
            if self.peek() == &Tok::Eof {
                return Err("unterminated block".to_string());
            }
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn declaration(&mut self) -> ParseResult<NodeId> {
        let token = match self.expect_ident()?.as_str() {
            "var" => Token::Var,
            "let" => Token::Let,
            _ => Token::Const,
        };
        let mut targets = Vec::new();
        loop {
            let target = if self.is_punct("{") {
                let pattern = self.object_literal()?;
                self.to_pattern(pattern);
                self.expect_punct("=")?;
                let rhs = self.assignment()?;
                self.ast.new_destructuring_lhs(pattern, rhs)
            } else {
                let name = self.expect_ident()?;
                let target = self.ast.new_name(&name);
                if self.eat_punct("=") {
                    let value = self.assignment()?;
                    self.ast.add_child_to_back(target, value);
                }
                target
            };
            targets.push(target);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.eat_punct(";");

        let declaration = self.ast.new_declaration_node(token, targets[0]);
        for &target in &targets[1..] {
            self.ast.add_child_to_back(declaration, target);
        }
        Ok(declaration)
    }

    /// After the `function` keyword.
    fn function_rest(&mut self) -> ParseResult<NodeId> {
        let name = match self.peek() {
            Tok::Ident(_) => self.expect_ident()?,
            _ => String::new(),
        };
        let params = self.params()?;
        let body = self.block_statements()?;
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        Ok(self.ast.new_function(&name, &params, &body))
    }

    fn params(&mut self) -> ParseResult<Vec<String>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.eat_punct(")") {
            params.push(self.expect_ident()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(params)
    }

    /// After the `class` keyword.
    fn class_rest(&mut self) -> ParseResult<NodeId> {
        let name = if self.is_word("extends") {
            String::new()
        } else {
            match self.peek() {
                Tok::Ident(_) => self.expect_ident()?,
                _ => String::new(),
            }
        };
        let superclass = if self.eat_word("extends") {
            Some(self.postfix()?)
        } else {
            None
        };

        self.expect_punct("{")?;
        let mut members = Vec::new();
        while !self.eat_punct("}") {
            let doc = self.take_doc();
            let is_static = matches!(self.peek_at(1), Tok::Ident(_)) && self.eat_word("static");
            let member = self.method_like()?;
            self.ast.set_prop(member, NodeProps::STATIC_MEMBER, is_static);
            if doc.is_some() {
                self.ast.set_jsdoc(member, doc);
            }
            members.push(member);
            self.eat_punct(";");
        }
        Ok(self.ast.new_class(&name, superclass, &members))
    }

    /// `name(params) {}`, `get name() {}` or `set name(v) {}`.
    fn method_like(&mut self) -> ParseResult<NodeId> {
        let accessor = match (self.peek(), self.peek_at(1)) {
            (Tok::Ident(w), Tok::Ident(_) | Tok::Str(_)) if w == "get" || w == "set" => {
                Some(w.clone())
            }
            _ => None,
        };
        if accessor.is_some() {
            self.advance();
        }
        let name = self.key_name()?.0;
        let params = self.params()?;
        let body = self.block_statements()?;
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        let function = self.ast.new_function("", &params, &body);
        Ok(match accessor.as_deref() {
            Some("get") => self.ast.new_getter(&name, function),
            Some(_) => self.ast.new_setter(&name, function),
            None => self.ast.new_member_function(&name, function, false),
        })
    }

    /// Key text and whether it was written as a string literal.
    fn key_name(&mut self) -> ParseResult<(String, bool)> {
        match self.advance() {
            Tok::Ident(name) => Ok((name, false)),
            Tok::Str(s) => Ok((s, true)),
            Tok::Num(n) => Ok((format_number(n), false)),
            other => Err(format!("expected property name, found {:?}", other)),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> ParseResult<NodeId> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<NodeId> {
        if self.at_arrow() {
            return self.arrow();
        }
        let lhs = self.conditional()?;
        if self.eat_punct("=") {
            if self.ast.is(lhs, Token::ObjectLit) {
                self.to_pattern(lhs);
            }
            let rhs = self.assignment()?;
            return Ok(self.ast.new_assign(lhs, rhs));
        }
        Ok(lhs)
    }

    fn at_arrow(&self) -> bool {
        match self.peek() {
            Tok::Ident(_) => self.peek_at(1) == &Tok::Punct("=>"),
            Tok::Punct("(") => {
                let mut depth = 0;
                let mut offset = 0;
                loop {
                    match self.peek_at(offset) {
                        Tok::Punct("(") => depth += 1,
                        Tok::Punct(")") => {
                            depth -= 1;
                            if depth == 0 {
                                return self.peek_at(offset + 1) == &Tok::Punct("=>");
                            }
                        }
                        Tok::Eof => return false,
                        _ => {}
                    }
                    offset += 1;
                }
            }
            _ => false,
        }
    }

    fn arrow(&mut self) -> ParseResult<NodeId> {
        let params = if self.is_punct("(") {
            self.params()?
        } else {
            vec![self.expect_ident()?]
        };
        self.expect_punct("=>")?;
        let body = if self.is_punct("{") {
            let statements = self.block_statements()?;
            self.ast.new_block(&statements)
        } else {
            self.assignment()?
        };
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        Ok(self.ast.new_arrow(&params, body))
    }

    fn conditional(&mut self) -> ParseResult<NodeId> {
        let cond = self.or()?;
        if self.eat_punct("?") {
            let then = self.assignment()?;
            self.expect_punct(":")?;
            let otherwise = self.assignment()?;
            return Ok(self.ast.new_hook(cond, then, otherwise));
        }
        Ok(cond)
    }

    fn or(&mut self) -> ParseResult<NodeId> {
        let mut left = self.and()?;
        loop {
            if self.eat_punct("||") {
                let right = self.and()?;
                left = self.ast.new_or(left, right);
            } else if self.eat_punct("??") {
                let right = self.and()?;
                left = self.ast.new_coalesce(left, right);
            } else {
                return Ok(left);
            }
        }
    }

    fn and(&mut self) -> ParseResult<NodeId> {
        let mut left = self.equality()?;
        while self.eat_punct("&&") {
            let right = self.equality()?;
            left = self.ast.new_and(left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> ParseResult<NodeId> {
        let mut left = self.additive()?;
        while self.eat_punct("===") {
            let right = self.additive()?;
            left = self.ast.new_sheq(left, right);
        }
        Ok(left)
    }

    fn additive(&mut self) -> ParseResult<NodeId> {
        let mut left = self.unary()?;
        while self.eat_punct("+") {
            let right = self.unary()?;
            left = self.ast.new_add(left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> ParseResult<NodeId> {
        if self.eat_punct("!") {
            let operand = self.unary()?;
            return Ok(self.ast.new_not(operand));
        }
        if self.eat_word("void") {
            let operand = self.unary()?;
            let void = self.ast.alloc(Node::new(Token::Void));
            self.ast.add_child_to_back(void, operand);
            return Ok(void);
        }
        if self.eat_word("delete") {
            let operand = self.unary()?;
            return Ok(self.ast.new_delprop(operand));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> ParseResult<NodeId> {
        let mut expr = if self.eat_word("new") {
            let callee = self.member()?;
            let args = if self.is_punct("(") {
                self.args()?
            } else {
                Vec::new()
            };
            self.ast.new_new(callee, &args)
        } else {
            self.primary()?
        };
        loop {
            if self.eat_punct(".") {
                let prop = self.expect_ident()?;
                expr = self.ast.new_getprop(expr, &prop);
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = self.ast.new_getelem(expr, index);
            } else if self.is_punct("(") {
                let args = self.args()?;
                expr = self.ast.new_call(expr, &args);
            } else if self.eat_punct("?.") {
                let args = self.args()?;
                expr = self.ast.new_opt_chain_call(expr, &args);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Callee of `new`: a primary followed by property accesses only.
    fn member(&mut self) -> ParseResult<NodeId> {
        let mut expr = self.primary()?;
        while self.eat_punct(".") {
            let prop = self.expect_ident()?;
            expr = self.ast.new_getprop(expr, &prop);
        }
        Ok(expr)
    }

    fn args(&mut self) -> ParseResult<Vec<NodeId>> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.assignment()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> ParseResult<NodeId> {
        match self.peek().clone() {
            Tok::Ident(w) => {
                self.advance();
                Ok(match w.as_str() {
                    "this" => self.ast.new_this(),
                    "super" => self.ast.new_super(),
                    "null" => self.ast.new_null(),
                    "true" => self.ast.new_true(),
                    "false" => self.ast.new_false(),
                    "function" => self.function_rest()?,
                    "class" => self.class_rest()?,
                    "import" => {
                        self.expect_punct("(")?;
                        let specifier = match self.advance() {
                            Tok::Str(s) => s,
                            other => return Err(format!("expected import path, found {:?}", other)),
                        };
                        self.expect_punct(")")?;
                        self.ast.new_dynamic_import(&specifier)
                    }
                    _ => self.ast.new_name(&w),
                })
            }
            Tok::Num(n) => {
                self.advance();
                Ok(self.ast.new_number(n))
            }
            Tok::Str(s) => {
                self.advance();
                Ok(self.ast.new_string_lit(&s))
            }
            Tok::Punct("(") => {
                self.advance();
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Tok::Punct("{") => self.object_literal(),
            Tok::Punct("[") => {
                self.advance();
                let mut elements = Vec::new();
                while !self.eat_punct("]") {
                    elements.push(self.assignment()?);
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(self.ast.new_array_lit(&elements))
            }
            other => Err(format!("unexpected {:?}", other)),
        }
    }

    fn object_literal(&mut self) -> ParseResult<NodeId> {
        self.expect_punct("{")?;
        let mut entries = Vec::new();
        while !self.eat_punct("}") {
            let doc = self.take_doc();
            let entry = self.object_entry()?;
            if doc.is_some() {
                self.ast.set_jsdoc(entry, doc);
            }
            entries.push(entry);
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(self.ast.new_object_lit(&entries))
    }

    fn object_entry(&mut self) -> ParseResult<NodeId> {
        if self.eat_punct("...") {
            let value = self.assignment()?;
            return Ok(self.ast.new_object_spread(value));
        }
        if self.eat_punct("[") {
            let key = self.assignment()?;
            self.expect_punct("]")?;
            self.expect_punct(":")?;
            let value = self.assignment()?;
            return Ok(self.ast.new_computed_prop(key, value));
        }
        let is_accessor = matches!(
            (self.peek(), self.peek_at(1)),
            (Tok::Ident(w), Tok::Ident(_) | Tok::Str(_)) if w == "get" || w == "set"
        );
        if is_accessor || self.peek_at(1) == &Tok::Punct("(") {
            return self.method_like();
        }

        let (key, quoted) = self.key_name()?;
        if self.eat_punct(":") {
            let value = self.assignment()?;
            return Ok(if quoted {
                self.ast.new_quoted_string_key(&key, value)
            } else {
                self.ast.new_string_key(&key, value)
            });
        }
        // Shorthand, possibly with a default when this is really a pattern.
        let mut value = self.ast.new_name(&key);
        if self.eat_punct("=") {
            let default = self.assignment()?;
            value = self.ast.new_assign(value, default);
        }
        Ok(self.ast.new_string_key(&key, value))
    }

    /// Reinterpret an object literal on the left of `=` as a pattern.
    fn to_pattern(&mut self, object_lit: NodeId) {
        self.ast.node_mut(object_lit).token = Token::ObjectPattern;
        for entry in self.ast.children(object_lit).to_vec() {
            match self.ast.token(entry) {
                Token::ObjectSpread => self.ast.node_mut(entry).token = Token::ObjectRest,
                Token::StringKey => {
                    let Some(value) = self.ast.first_child(entry) else {
                        continue;
                    };
                    match self.ast.token(value) {
                        Token::Assign => {
                            let children = self.ast.children(value).to_vec();
                            let (target, default) = (children[0], children[1]);
                            self.ast.detach(target);
                            self.ast.detach(default);
                            let default_value = self.ast.new_default_value(target, default);
                            self.ast.replace_with(value, default_value);
                        }
                        Token::ObjectLit => self.to_pattern(value),
                        _ => {}
                    }
                }
                _ => {}
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
