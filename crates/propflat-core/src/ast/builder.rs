//! Node constructors.
//!
//! Every constructor allocates fresh, detached nodes and attaches the given
//! children, which must themselves be detached.

use super::{Ast, JsDoc, Node, NodeId, NodeProps, Token};

impl Ast {
    fn leaf(&mut self, token: Token) -> NodeId {
        self.alloc(Node::new(token))
    }

    fn with_children(&mut self, token: Token, children: &[NodeId]) -> NodeId {
        let id = self.leaf(token);
        for &child in children {
            self.add_child_to_back(id, child);
        }
        id
    }

    /// Append a statement to the root script.
    pub fn push_statement(&mut self, statement: NodeId) -> NodeId {
        let root = self.root();
        self.add_child_to_back(root, statement);
        statement
    }

    pub fn new_name(&mut self, name: &str) -> NodeId {
        self.alloc(Node::with_string(Token::Name, name))
    }

    /// `NAME` for a flattened alias that remembers the dotted name it replaces.
    pub fn new_alias_name(&mut self, alias: &str, original_name: &str) -> NodeId {
        let id = self.new_name(alias);
        self.node_mut(id).original_name = Some(original_name.to_string());
        id
    }

    pub fn new_getprop(&mut self, receiver: NodeId, prop: &str) -> NodeId {
        let id = self.alloc(Node::with_string(Token::GetProp, prop));
        self.add_child_to_back(id, receiver);
        id
    }

    /// Build a `NAME`/`GETPROP` chain from a dotted path such as `"a.b.c"`.
    pub fn new_qname(&mut self, dotted: &str) -> NodeId {
        let mut parts = dotted.split('.');
        let first = parts.next().unwrap_or_default();
        let mut node = if first == "this" {
            self.new_this()
        } else {
            self.new_name(first)
        };
        for part in parts {
            node = self.new_getprop(node, part);
        }
        node
    }

    pub fn new_getelem(&mut self, receiver: NodeId, index: NodeId) -> NodeId {
        self.with_children(Token::GetElem, &[receiver, index])
    }

    pub fn new_number(&mut self, value: f64) -> NodeId {
        let id = self.leaf(Token::Number);
        self.node_mut(id).number = Some(value);
        id
    }

    pub fn new_string_lit(&mut self, value: &str) -> NodeId {
        self.alloc(Node::with_string(Token::String, value))
    }

    pub fn new_this(&mut self) -> NodeId {
        self.leaf(Token::This)
    }

    pub fn new_super(&mut self) -> NodeId {
        self.leaf(Token::Super)
    }

    pub fn new_null(&mut self) -> NodeId {
        self.leaf(Token::Null)
    }

    pub fn new_true(&mut self) -> NodeId {
        self.leaf(Token::True)
    }

    pub fn new_false(&mut self) -> NodeId {
        self.leaf(Token::False)
    }

    pub fn new_empty(&mut self) -> NodeId {
        self.leaf(Token::Empty)
    }

    /// `void 0`
    pub fn new_undefined(&mut self) -> NodeId {
        let zero = self.new_number(0.0);
        self.with_children(Token::Void, &[zero])
    }

    pub fn new_assign(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.with_children(Token::Assign, &[lhs, rhs])
    }

    pub fn new_or(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.with_children(Token::Or, &[left, right])
    }

    pub fn new_and(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.with_children(Token::And, &[left, right])
    }

    pub fn new_coalesce(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.with_children(Token::Coalesce, &[left, right])
    }

    pub fn new_add(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.with_children(Token::Add, &[left, right])
    }

    pub fn new_sheq(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.with_children(Token::Sheq, &[left, right])
    }

    pub fn new_not(&mut self, operand: NodeId) -> NodeId {
        self.with_children(Token::Not, &[operand])
    }

    pub fn new_hook(&mut self, cond: NodeId, then: NodeId, otherwise: NodeId) -> NodeId {
        self.with_children(Token::Hook, &[cond, then, otherwise])
    }

    pub fn new_delprop(&mut self, target: NodeId) -> NodeId {
        self.with_children(Token::DelProp, &[target])
    }

    pub fn new_call(&mut self, callee: NodeId, args: &[NodeId]) -> NodeId {
        let id = self.with_children(Token::Call, &[callee]);
        for &arg in args {
            self.add_child_to_back(id, arg);
        }
        id
    }

    pub fn new_opt_chain_call(&mut self, callee: NodeId, args: &[NodeId]) -> NodeId {
        let id = self.with_children(Token::OptChainCall, &[callee]);
        for &arg in args {
            self.add_child_to_back(id, arg);
        }
        id
    }

    pub fn new_new(&mut self, callee: NodeId, args: &[NodeId]) -> NodeId {
        let id = self.with_children(Token::New, &[callee]);
        for &arg in args {
            self.add_child_to_back(id, arg);
        }
        id
    }

    pub fn new_dynamic_import(&mut self, specifier: &str) -> NodeId {
        let spec = self.new_string_lit(specifier);
        self.with_children(Token::DynamicImport, &[spec])
    }

    pub fn new_array_lit(&mut self, elements: &[NodeId]) -> NodeId {
        self.with_children(Token::ArrayLit, elements)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub fn new_expr_result(&mut self, expr: NodeId) -> NodeId {
        self.with_children(Token::ExprResult, &[expr])
    }

    pub fn new_block(&mut self, statements: &[NodeId]) -> NodeId {
        self.with_children(Token::Block, statements)
    }

    pub fn new_return(&mut self, value: Option<NodeId>) -> NodeId {
        let id = self.leaf(Token::Return);
        if let Some(value) = value {
            self.add_child_to_back(id, value);
        }
        id
    }

    pub fn new_if(&mut self, cond: NodeId, then: NodeId, otherwise: Option<NodeId>) -> NodeId {
        let id = self.with_children(Token::If, &[cond, then]);
        if let Some(otherwise) = otherwise {
            self.add_child_to_back(id, otherwise);
        }
        id
    }

    /// `VAR` with a single, already built `NAME` (or `DESTRUCTURING_LHS`).
    pub fn new_var(&mut self, target: NodeId) -> NodeId {
        self.with_children(Token::Var, &[target])
    }

    fn new_declaration(&mut self, token: Token, name: &str, value: Option<NodeId>) -> NodeId {
        let target = self.new_name(name);
        if let Some(value) = value {
            self.add_child_to_back(target, value);
        }
        self.with_children(token, &[target])
    }

    /// `var name = value;`
    pub fn new_var_decl(&mut self, name: &str, value: Option<NodeId>) -> NodeId {
        self.new_declaration(Token::Var, name, value)
    }

    pub fn new_let_decl(&mut self, name: &str, value: Option<NodeId>) -> NodeId {
        self.new_declaration(Token::Let, name, value)
    }

    pub fn new_const_decl(&mut self, name: &str, value: Option<NodeId>) -> NodeId {
        self.new_declaration(Token::Const, name, value)
    }

    /// Declaration statement of kind `token` around an already built target.
    pub fn new_declaration_node(&mut self, token: Token, target: NodeId) -> NodeId {
        debug_assert!(token.is_name_declaration());
        self.with_children(token, &[target])
    }

    pub fn new_destructuring_lhs(&mut self, pattern: NodeId, rhs: NodeId) -> NodeId {
        self.with_children(Token::DestructuringLhs, &[pattern, rhs])
    }

    /// `<token> <pattern> = rhs;` for a `VAR`/`LET`/`CONST` token.
    pub fn new_destructuring_decl(&mut self, token: Token, pattern: NodeId, rhs: NodeId) -> NodeId {
        let lhs = self.new_destructuring_lhs(pattern, rhs);
        self.new_declaration_node(token, lhs)
    }

    // ------------------------------------------------------------------
    // Functions and classes
    // ------------------------------------------------------------------

    pub fn new_param_list(&mut self, params: &[&str]) -> NodeId {
        let names: Vec<NodeId> = params.iter().map(|p| self.new_name(p)).collect();
        self.with_children(Token::ParamList, &names)
    }

    /// `function name(params) { body }`; an empty `name` builds an anonymous
    /// function expression.
    pub fn new_function(&mut self, name: &str, params: &[&str], body: &[NodeId]) -> NodeId {
        let name = self.new_name(name);
        let params = self.new_param_list(params);
        let body = self.new_block(body);
        self.with_children(Token::Function, &[name, params, body])
    }

    /// Arrow function with an expression body.
    pub fn new_arrow(&mut self, params: &[&str], body: NodeId) -> NodeId {
        let name = self.new_name("");
        let params = self.new_param_list(params);
        let id = self.with_children(Token::Function, &[name, params, body]);
        self.set_prop(id, NodeProps::ARROW, true);
        id
    }

    pub fn new_class(&mut self, name: &str, superclass: Option<NodeId>, members: &[NodeId]) -> NodeId {
        let name = if name.is_empty() {
            self.new_empty()
        } else {
            self.new_name(name)
        };
        let superclass = match superclass {
            Some(s) => s,
            None => self.new_empty(),
        };
        let members = self.with_children(Token::ClassMembers, members);
        self.with_children(Token::Class, &[name, superclass, members])
    }

    pub fn new_member_function(&mut self, name: &str, function: NodeId, is_static: bool) -> NodeId {
        let id = self.alloc(Node::with_string(Token::MemberFunctionDef, name));
        self.add_child_to_back(id, function);
        self.set_prop(id, NodeProps::STATIC_MEMBER, is_static);
        id
    }

    pub fn new_getter(&mut self, name: &str, function: NodeId) -> NodeId {
        let id = self.alloc(Node::with_string(Token::GetterDef, name));
        self.add_child_to_back(id, function);
        id
    }

    pub fn new_setter(&mut self, name: &str, function: NodeId) -> NodeId {
        let id = self.alloc(Node::with_string(Token::SetterDef, name));
        self.add_child_to_back(id, function);
        id
    }

    // ------------------------------------------------------------------
    // Object literals and patterns
    // ------------------------------------------------------------------

    pub fn new_object_lit(&mut self, entries: &[NodeId]) -> NodeId {
        self.with_children(Token::ObjectLit, entries)
    }

    pub fn new_string_key(&mut self, key: &str, value: NodeId) -> NodeId {
        let id = self.alloc(Node::with_string(Token::StringKey, key));
        self.add_child_to_back(id, value);
        id
    }

    pub fn new_quoted_string_key(&mut self, key: &str, value: NodeId) -> NodeId {
        let id = self.new_string_key(key, value);
        self.set_prop(id, NodeProps::QUOTED, true);
        id
    }

    pub fn new_computed_prop(&mut self, key: NodeId, value: NodeId) -> NodeId {
        self.with_children(Token::ComputedProp, &[key, value])
    }

    pub fn new_object_spread(&mut self, value: NodeId) -> NodeId {
        self.with_children(Token::ObjectSpread, &[value])
    }

    pub fn new_object_pattern(&mut self, entries: &[NodeId]) -> NodeId {
        self.with_children(Token::ObjectPattern, entries)
    }

    pub fn new_object_rest(&mut self, target: NodeId) -> NodeId {
        self.with_children(Token::ObjectRest, &[target])
    }

    pub fn new_default_value(&mut self, target: NodeId, default: NodeId) -> NodeId {
        self.with_children(Token::DefaultValue, &[target, default])
    }

    /// Attach documentation to a node and return it.
    pub fn with_jsdoc(&mut self, id: NodeId, jsdoc: JsDoc) -> NodeId {
        self.set_jsdoc(id, Some(jsdoc));
        id
    }
}
