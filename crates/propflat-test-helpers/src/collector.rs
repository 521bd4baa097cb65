//! Global name collection for fixture trees.
//!
//! Records every global qualified name the tree declares, sets, reads or
//! deletes. Locals (parameters and names declared directly in a function
//! body) shadow globals; `this` and `super` rooted paths are never tracked.

use propflat_core::ast::{util, Ast, JsDoc, NodeId, NodeProps, Token};
use propflat_core::namespace::{NameCollector, NameFlags, NameForest, NameId, NameKind, RefId, RefType};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureCollector;

impl NameCollector for FixtureCollector {
    fn collect(&self, ast: &Ast) -> NameForest {
        let mut walker = Walker {
            ast,
            forest: NameForest::new(),
            scopes: Vec::new(),
        };
        for &statement in ast.children(ast.root()) {
            walker.visit(statement);
        }
        walker.forest
    }
}

struct Walker<'a> {
    ast: &'a Ast,
    forest: NameForest,
    scopes: Vec<FxHashSet<String>>,
}

impl Walker<'_> {
    fn in_global_scope(&self) -> bool {
        self.scopes.is_empty()
    }

    fn is_shadowed(&self, root: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(root))
    }

    /// Global dotted name at `node`, if it is one this collector tracks.
    fn tracked_name(&self, node: NodeId) -> Option<String> {
        if !util::is_qualified_name(self.ast, node) {
            return None;
        }
        let full_name = util::qualified_name(self.ast, node)?;
        let root = full_name.split('.').next().unwrap_or_default();
        if root == "this" || root == "super" || root == "undefined" || self.is_shadowed(root) {
            return None;
        }
        Some(full_name)
    }

    fn add_ref(&mut self, full_name: &str, node: NodeId, ref_type: RefType) -> (NameId, RefId) {
        let name = self.forest.get_or_create(full_name);
        let reference = self.forest.add_ref(name, node, ref_type);
        (name, reference)
    }

    /// Record a set and, when it became the declaration, what it declares.
    fn add_set(&mut self, full_name: &str, target: NodeId, value: Option<NodeId>, doc_node: NodeId) -> RefId {
        let ref_type = if self.in_global_scope() {
            RefType::Declaration
        } else {
            RefType::SetFromLocal
        };
        let (name, reference) = self.add_ref(full_name, target, ref_type);
        if self.forest.name(name).declaration() == Some(reference) {
            if let Some(value) = value {
                self.describe_value(name, value);
            }
            self.apply_jsdoc(name, doc_node);
        }
        reference
    }

    fn apply_jsdoc(&mut self, name: NameId, doc_node: NodeId) {
        let jsdoc = util::best_jsdoc(self.ast, doc_node);
        if jsdoc.is_some_and(|doc| doc.contains(JsDoc::NO_COLLAPSE)) {
            self.forest.insert_flags(name, NameFlags::COLLAPSING_DENIED);
        }
        self.forest.set_jsdoc(name, jsdoc);
    }

    /// Kind of the declared value, and its keys for object literals.
    fn describe_value(&mut self, name: NameId, value: NodeId) {
        let mut value = value;
        while self.ast.is(value, Token::Or) {
            match self.ast.last_child(value) {
                Some(right) => value = right,
                None => return,
            }
        }
        match self.ast.token(value) {
            Token::ObjectLit => {
                self.forest.set_kind(name, NameKind::ObjectLit);
                self.forest.insert_flags(name, NameFlags::NAMESPACE_OBJECT_LIT);
                self.declare_keys(name, value);
            }
            Token::Function => self.forest.set_kind(name, NameKind::Function),
            Token::Class => self.forest.set_kind(name, NameKind::Class),
            _ => {}
        }
    }

    fn declare_keys(&mut self, parent: NameId, object_lit: NodeId) {
        let ast = self.ast;
        let parent_name = self.forest.name(parent).full_name().to_string();
        for &key in ast.children(object_lit) {
            let token = self.ast.token(key);
            let declarable = matches!(
                token,
                Token::StringKey | Token::GetterDef | Token::SetterDef | Token::MemberFunctionDef
            ) && !self.ast.has_prop(key, NodeProps::QUOTED)
                && util::is_js_identifier(self.ast.string(key));
            if !declarable {
                continue;
            }
            let full_name = format!("{}.{}", parent_name, self.ast.string(key));
            let (name, reference) = self.add_ref(&full_name, key, RefType::Declaration);
            if self.forest.name(name).declaration() != Some(reference) {
                continue;
            }
            match token {
                Token::GetterDef | Token::SetterDef => self.forest.set_kind(name, NameKind::GetSet),
                Token::MemberFunctionDef => self.forest.set_kind(name, NameKind::Function),
                _ => {
                    if let Some(value) = self.ast.first_child(key) {
                        self.describe_value(name, value);
                    }
                }
            }
            self.apply_jsdoc(name, key);
        }
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    fn visit_children(&mut self, node: NodeId) {
        let ast = self.ast;
        for &child in ast.children(node) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: NodeId) {
        match self.ast.token(node) {
            Token::Var | Token::Let | Token::Const => {
                let ast = self.ast;
                for &target in ast.children(node) {
                    self.visit_declaration_target(target);
                }
            }
            Token::Function => self.visit_function(node),
            Token::Class => self.visit_class(node),
            Token::Assign => self.visit_assign(node),
            Token::DelProp => match self.ast.first_child(node) {
                Some(target) if self.ast.is(target, Token::GetProp) => {
                    match self.tracked_name(target) {
                        Some(full_name) => {
                            self.add_ref(&full_name, target, RefType::DeleteProp);
                        }
                        None => self.visit_children(target),
                    }
                }
                _ => self.visit_children(node),
            },
            Token::StringKey
            | Token::GetterDef
            | Token::SetterDef
            | Token::MemberFunctionDef
            | Token::ObjectSpread
            | Token::ComputedProp => self.visit_children(node),
            Token::Name | Token::GetProp => match self.tracked_name(node) {
                Some(full_name) => {
                    let ref_type = self.classify_get(node, &full_name);
                    self.add_ref(&full_name, node, ref_type);
                }
                None => self.visit_children(node),
            },
            _ => self.visit_children(node),
        }
    }

    fn visit_declaration_target(&mut self, target: NodeId) {
        match self.ast.token(target) {
            Token::Name => {
                let value = self.ast.first_child(target);
                if self.in_global_scope() {
                    let full_name = self.ast.string(target).to_string();
                    self.add_set(&full_name, target, value, target);
                }
                if let Some(value) = value {
                    self.visit(value);
                }
            }
            Token::DestructuringLhs => {
                let children = self.ast.children(target);
                if let [pattern, rhs] = children {
                    self.visit_destructuring(*pattern, *rhs);
                }
            }
            _ => self.visit_children(target),
        }
    }

    fn visit_assign(&mut self, assign: NodeId) {
        let children = self.ast.children(assign);
        let [lhs, rhs] = children else {
            self.visit_children(assign);
            return;
        };
        let (lhs, rhs) = (*lhs, *rhs);

        if self.ast.is(lhs, Token::ObjectPattern) {
            self.visit_destructuring(lhs, rhs);
            return;
        }
        let Some(full_name) = self.tracked_name(lhs) else {
            self.visit_children(assign);
            return;
        };

        let set = self.add_set(&full_name, lhs, Some(rhs), assign);
        let is_statement = self
            .ast
            .parent(assign)
            .is_some_and(|p| self.ast.is(p, Token::ExprResult));
        if !is_statement {
            // The assignment's value is read too: `x = a.b = 1`.
            let (_, get) = self.add_ref(&full_name, lhs, RefType::OtherGet);
            self.forest.pair_twins(set, get);
        }
        self.visit(rhs);
    }

    fn visit_destructuring(&mut self, pattern: NodeId, rhs: NodeId) {
        let has_rest = self
            .ast
            .children(pattern)
            .iter()
            .any(|&entry| self.ast.is(entry, Token::ObjectRest));
        let source = self.tracked_name(rhs);
        match &source {
            Some(full_name) => {
                let ref_type = if has_rest {
                    RefType::AliasingGet
                } else {
                    RefType::OtherGet
                };
                self.add_ref(full_name, rhs, ref_type);
            }
            None => self.visit(rhs),
        }

        let ast = self.ast;
        for &entry in ast.children(pattern) {
            match ast.token(entry) {
                Token::StringKey => {
                    if let Some(source) = &source {
                        if !self.ast.has_prop(entry, NodeProps::QUOTED) {
                            let full_name = format!("{}.{}", source, self.ast.string(entry));
                            self.add_ref(&full_name, entry, RefType::OtherGet);
                        }
                    }
                    if let Some(value) = self.ast.first_child(entry) {
                        self.visit_pattern_target(value);
                    }
                }
                Token::ComputedProp => {
                    if let [key, value] = self.ast.children(entry) {
                        self.visit(*key);
                        self.visit_pattern_target(*value);
                    }
                }
                _ => {}
            }
        }
    }

    /// Targets bind names; only defaults and nested computed keys are read.
    fn visit_pattern_target(&mut self, target: NodeId) {
        match self.ast.token(target) {
            Token::DefaultValue => {
                if let [inner, default] = self.ast.children(target) {
                    self.visit(*default);
                    self.visit_pattern_target(*inner);
                }
            }
            Token::ObjectPattern => {
                let ast = self.ast;
                for &entry in ast.children(target) {
                    if let Some(&value) = ast.children(entry).last() {
                        self.visit_pattern_target(value);
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_function(&mut self, function: NodeId) {
        let children = self.ast.children(function);
        let [name, params, body] = children else {
            return;
        };
        let (name, params, body) = (*name, *params, *body);

        if util::is_function_declaration(self.ast, function) && self.in_global_scope() {
            let full_name = self.ast.string(name).to_string();
            let (declared, reference) = self.add_ref(&full_name, name, RefType::Declaration);
            if self.forest.name(declared).declaration() == Some(reference) {
                self.forest.set_kind(declared, NameKind::Function);
                self.apply_jsdoc(declared, function);
            }
        }

        let mut locals: FxHashSet<String> = self
            .ast
            .children(params)
            .iter()
            .map(|&p| self.ast.string(p).to_string())
            .collect();
        if self.ast.is(body, Token::Block) {
            locals.extend(self.body_declarations(body));
        }
        self.scopes.push(locals);
        self.visit(body);
        self.scopes.pop();
    }

    fn body_declarations(&self, block: NodeId) -> Vec<String> {
        let ast = self.ast;
        let mut names = Vec::new();
        for &statement in ast.children(block) {
            match ast.token(statement) {
                Token::Var | Token::Let | Token::Const => names.extend(
                    ast.children(statement)
                        .iter()
                        .filter(|&&t| ast.is(t, Token::Name))
                        .map(|&t| ast.string(t).to_string()),
                ),
                Token::Function | Token::Class => {
                    if let Some(name) = ast.first_child(statement) {
                        if ast.is(name, Token::Name) && !ast.string(name).is_empty() {
                            names.push(ast.string(name).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        names
    }

    fn visit_class(&mut self, class: NodeId) {
        let children = self.ast.children(class);
        let [name, superclass, members] = children else {
            return;
        };
        let (name, superclass, members) = (*name, *superclass, *members);

        let is_declaration = self.ast.is(name, Token::Name)
            && self
                .ast
                .parent(class)
                .is_some_and(|p| self.ast.token(p).is_statement_block());
        let class_name = (is_declaration && self.in_global_scope())
            .then(|| self.ast.string(name).to_string());

        if let Some(class_name) = &class_name {
            let (declared, reference) = self.add_ref(class_name, name, RefType::Declaration);
            if self.forest.name(declared).declaration() == Some(reference) {
                self.forest.set_kind(declared, NameKind::Class);
                self.apply_jsdoc(declared, class);
            }
        }
        self.visit(superclass);

        let ast = self.ast;
        for &member in ast.children(members) {
            let token = self.ast.token(member);
            let is_static_method = matches!(
                token,
                Token::MemberFunctionDef | Token::GetterDef | Token::SetterDef
            ) && self.ast.has_prop(member, NodeProps::STATIC_MEMBER);
            if let (Some(class_name), true) = (&class_name, is_static_method) {
                let full_name = format!("{}.{}", class_name, self.ast.string(member));
                let (declared, reference) = self.add_ref(&full_name, member, RefType::Declaration);
                if self.forest.name(declared).declaration() == Some(reference) {
                    let kind = if token == Token::MemberFunctionDef {
                        NameKind::Function
                    } else {
                        NameKind::GetSet
                    };
                    self.forest.set_kind(declared, kind);
                    self.apply_jsdoc(declared, member);
                }
            }
            self.visit_children(member);
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// A read is aliasing when its value can end up stored under another
    /// binding or handed to other code.
    fn classify_get(&self, node: NodeId, full_name: &str) -> RefType {
        let ast = self.ast;
        let mut current = node;
        loop {
            let Some(parent) = ast.parent(current) else {
                return RefType::OtherGet;
            };
            match ast.token(parent) {
                Token::Call | Token::OptChainCall | Token::New => {
                    return if ast.is_first_child_of(current, parent) {
                        RefType::OtherGet
                    } else {
                        RefType::AliasingGet
                    };
                }
                Token::ExprResult
                | Token::Not
                | Token::Sheq
                | Token::Add
                | Token::Void
                | Token::If
                | Token::GetElem => return RefType::OtherGet,
                Token::Hook if ast.is_first_child_of(current, parent) => return RefType::OtherGet,
                Token::Or | Token::And | Token::Coalesce | Token::Hook => current = parent,
                Token::Assign | Token::Name
                    if self.is_self_reinit(parent, current, full_name) =>
                {
                    return RefType::OtherGet;
                }
                _ => return RefType::AliasingGet,
            }
        }
    }

    /// `a = a || {}` and `var a = a || {}`.
    fn is_self_reinit(&self, holder: NodeId, value: NodeId, full_name: &str) -> bool {
        let ast = self.ast;
        if !ast.is(value, Token::Or) || ast.last_child(holder) != Some(value) {
            return false;
        }
        let target_name = match ast.token(holder) {
            Token::Assign => ast
                .first_child(holder)
                .and_then(|lhs| util::qualified_name(ast, lhs)),
            _ => Some(ast.string(holder).to_string()),
        };
        target_name.as_deref() == Some(full_name)
    }
}
