//! Declaration collapsing.
//!
//! Runs once every reference has been flattened. Each collapsible name has
//! its declaration rewritten into a flat variable, object literal values are
//! hoisted into variables of their own, and properties that are only set
//! from local scopes get uninitialized stubs next to their parent's
//! declaration.

use super::escape::EscapeSet;
use super::{append_prop_for_alias, Collapser};
use crate::ast::{printer, util, Ast, Node, NodeId, NodeProps, Token};
use crate::errors::{CollapseError, Result};
use crate::namespace::{NameId, RefId};

/// Position of a declaration, read off the declaration node's parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclarationSite {
    /// `a.b = value`
    Assign,
    /// `var a = value`, also with `let` and `const`
    Variable,
    /// `function a() {}`
    Function,
    /// `class A {}`
    Class,
    /// `static m() {}` in a class body
    StaticMember,
    Other(Token),
}

impl DeclarationSite {
    fn of(ast: &Ast, declaration: NodeId) -> Option<Self> {
        let parent = ast.parent(declaration)?;
        Some(match ast.token(parent) {
            Token::Assign => Self::Assign,
            Token::Var | Token::Let | Token::Const => Self::Variable,
            Token::Function => Self::Function,
            Token::Class => Self::Class,
            Token::ClassMembers => Self::StaticMember,
            other => Self::Other(other),
        })
    }
}

impl Collapser<'_> {
    /// Collapse the declaration of `name`, then those of its descendants.
    pub(super) fn collapse_declaration_of_name_and_descendants(
        &mut self,
        name: NameId,
        alias: &str,
        escaped: &EscapeSet,
    ) -> Result<()> {
        if escaped.contains(&name) {
            self.log_decision(name, || "escapes: will not collapse".to_string());
            return Ok(());
        }

        let child_verdict = self.forest.can_collapse_or_inline_child_names(name);
        let can_collapse_children = child_verdict.can_collapse();
        if !can_collapse_children {
            self.log_decision(name, || {
                format!("child name inlinability: {}: will not collapse child names", child_verdict)
            });
        }

        // Parents first, so nested object literals are unrolled outside in.
        if self.can_collapse(name) {
            self.log_decision(name, || "collapsing".to_string());
            self.update_global_name_declaration(name, alias, can_collapse_children)?;
        }

        let props = self.forest.name(name).props().to_vec();
        if props.is_empty() {
            return Ok(());
        }
        self.log_decision(name, || "collapsing descendants".to_string());
        for prop in props {
            let prop_alias = self.alias_for(alias, prop);
            self.collapse_declaration_of_name_and_descendants(prop, &prop_alias, escaped)?;
        }
        Ok(())
    }

    fn log_declaration(&mut self, name: NameId, node: NodeId, action: &str) {
        let (forest, ast) = (&*self.forest, &*self.ast);
        self.decisions.log(|| {
            format!(
                "{}: {}: {}",
                forest.name(name).full_name(),
                printer::print_node(ast, node),
                action
            )
        });
    }

    fn update_global_name_declaration(
        &mut self,
        name: NameId,
        alias: &str,
        can_collapse_children: bool,
    ) -> Result<()> {
        let declaration = self.forest.name(name).declaration();
        let Some((decl_ref, decl_node)) =
            declaration.and_then(|r| self.forest.reference(r).node.map(|n| (r, n)))
        else {
            self.log_decision(name, || "no global declaration found".to_string());
            return Ok(());
        };

        match DeclarationSite::of(self.ast, decl_node) {
            Some(DeclarationSite::Assign) => {
                self.log_declaration(name, decl_node, "updating assignment");
                self.update_declaration_at_assign(name, decl_ref, decl_node, alias, can_collapse_children)
            }
            Some(DeclarationSite::Variable) => {
                self.log_declaration(name, decl_node, "updating variable declaration");
                self.update_declaration_at_variable(name, decl_ref, decl_node, can_collapse_children)
            }
            Some(DeclarationSite::Function) => {
                self.log_declaration(name, decl_node, "updating function declaration");
                self.update_declaration_at_function_or_class(name, decl_node, can_collapse_children)
            }
            Some(DeclarationSite::Class) => {
                self.log_declaration(name, decl_node, "updating class declaration");
                self.update_declaration_at_function_or_class(name, decl_node, can_collapse_children)
            }
            Some(DeclarationSite::StaticMember) => {
                self.log_declaration(name, decl_node, "updating static member declaration");
                self.update_declaration_at_static_member(
                    name,
                    decl_ref,
                    decl_node,
                    alias,
                    can_collapse_children,
                )
            }
            Some(DeclarationSite::Other(_)) | None => {
                self.log_declaration(
                    name,
                    decl_node,
                    "not updating an unsupported type of declaration node",
                );
                Ok(())
            }
        }
    }

    /// `a.b = value;` becomes `var a$b = value;`, or disappears when the
    /// value is an object literal whose properties all get hoisted.
    fn update_declaration_at_assign(
        &mut self,
        name: NameId,
        decl_ref: RefId,
        decl_node: NodeId,
        alias: &str,
        can_collapse_children: bool,
    ) -> Result<()> {
        if self.forest.reference(decl_ref).twin.is_some() {
            return self.update_twinned_declaration(name, decl_ref, decl_node, alias);
        }

        let Some(assign) = self.ast.parent(decl_node) else {
            return Ok(());
        };
        let Some(rvalue) = self.ast.next(decl_node) else {
            return Ok(());
        };
        let Some(statement) = self.ast.parent(assign).filter(|&s| self.ast.is(s, Token::ExprResult))
        else {
            self.log_declaration(name, decl_node, "assignment is not a statement: not updating");
            return Ok(());
        };

        let is_object_lit = self.ast.is(rvalue, Token::ObjectLit);
        let var_node = self.ast.alloc(Node::new(Token::Var));
        let mut inserted_var_node = false;

        if is_object_lit && self.can_eliminate(name) {
            self.ast.replace_with(statement, var_node);
            self.forest.update_ref_node(decl_ref, None);
            inserted_var_node = true;
            self.report_change(var_node);
        } else if !self.forest.name(name).is_simple_name() {
            if self.ast.is(rvalue, Token::Function) {
                let jsdoc = self
                    .forest
                    .name(name)
                    .jsdoc
                    .or_else(|| util::best_jsdoc(self.ast, assign));
                self.check_for_receiver_affected_by_collapse(rvalue, jsdoc, name);
            }

            let full_name = self.full_name(name);
            self.ast.detach(rvalue);
            let name_node = self.ast.new_alias_name(alias, &full_name);
            let jsdoc = util::best_jsdoc(self.ast, assign);
            if self.ast.has_prop(decl_node, NodeProps::IS_CONSTANT_NAME)
                || jsdoc.is_some_and(|doc| doc.has_const_annotation())
            {
                self.ast.set_prop(name_node, NodeProps::IS_CONSTANT_NAME, true);
            }
            self.ast.set_jsdoc(var_node, jsdoc);
            self.ast.add_child_to_back(name_node, rvalue);
            self.ast.add_child_to_back(var_node, name_node);
            self.ast.replace_with(statement, var_node);
            self.forest.update_ref_node(decl_ref, Some(name_node));
            inserted_var_node = true;
            self.report_change(var_node);
        }

        if can_collapse_children {
            let anchor = if inserted_var_node { var_node } else { statement };
            if is_object_lit {
                let previous = self.ast.previous(anchor);
                self.declare_variables_for_obj_lit_values(name, alias, rvalue, anchor, previous)?;
            }
            self.add_stubs_for_undeclared_properties(name, alias, anchor)?;
        }

        if inserted_var_node && !self.ast.has_children(var_node) {
            self.ast.detach(var_node);
        }
        Ok(())
    }

    /// `x = a.b = 1;` keeps its shape: `var a$b; x = a$b = 1;`.
    fn update_twinned_declaration(
        &mut self,
        name: NameId,
        decl_ref: RefId,
        decl_node: NodeId,
        alias: &str,
    ) -> Result<()> {
        let twin = self
            .forest
            .reference(decl_ref)
            .twin
            .ok_or_else(|| CollapseError::MissingTwin {
                name: self.full_name(name),
            })?;
        // Already flat.
        if !self.ast.is(decl_node, Token::GetProp) {
            return Ok(());
        }

        if let Some(rvalue) = self.ast.next(decl_node) {
            if self.ast.is(rvalue, Token::Function) {
                let jsdoc = self.forest.name(name).jsdoc;
                self.check_for_receiver_affected_by_collapse(rvalue, jsdoc, name);
            }
        }

        let full_name = self.full_name(name);
        let name_node = self.ast.new_alias_name(alias, &full_name);
        self.copy_name_annotations(decl_node, name_node);

        let Some(statement) = self.ast.enclosing_statement(decl_node) else {
            return Ok(());
        };
        let stub_name = self.ast.clone_tree(name_node);
        let stub = self.ast.new_var(stub_name);
        self.ast.insert_before(stub, statement);

        self.ast.replace_with(decl_node, name_node);
        self.forest.update_ref_node(decl_ref, Some(name_node));
        self.forest.update_ref_node(twin, Some(name_node));
        self.report_change(name_node);
        Ok(())
    }

    /// `var a = {...};`: hoist the values, stub the rest, and drop the
    /// declaration once nothing needs the object.
    fn update_declaration_at_variable(
        &mut self,
        name: NameId,
        decl_ref: RefId,
        decl_node: NodeId,
        can_collapse_children: bool,
    ) -> Result<()> {
        if !can_collapse_children {
            self.log_decision(name, || "cannot collapse child names: skipping".to_string());
            return Ok(());
        }

        let Some(variable) = self.ast.parent(decl_node) else {
            return Ok(());
        };
        let var_name = self.ast.string(decl_node).to_string();
        let rvalue = self.ast.first_child(decl_node);
        let object_lit = rvalue.filter(|&v| self.ast.is(v, Token::ObjectLit));

        if let Some(object_lit) = object_lit {
            let previous = self.ast.previous(variable);
            self.declare_variables_for_obj_lit_values(name, &var_name, object_lit, variable, previous)?;
        }
        self.add_stubs_for_undeclared_properties(name, &var_name, variable)?;

        if object_lit.is_some() && self.can_eliminate(name) {
            self.ast.detach(decl_node);
            self.report_change(variable);
            if !self.ast.has_children(variable) {
                self.ast.detach(variable);
            }
            self.forest.update_ref_node(decl_ref, None);
        }
        Ok(())
    }

    /// Functions and classes keep their declarations; only stubs for their
    /// undeclared properties are added after them.
    fn update_declaration_at_function_or_class(
        &mut self,
        name: NameId,
        decl_node: NodeId,
        can_collapse_children: bool,
    ) -> Result<()> {
        if !can_collapse_children {
            return Ok(());
        }
        let Some(declaration) = self.ast.parent(decl_node) else {
            return Ok(());
        };
        let declared_name = self.ast.string(decl_node).to_string();
        self.add_stubs_for_undeclared_properties(name, &declared_name, declaration)
    }

    /// `class A { static m() {} }` becomes
    /// `var A$m = function() {}; class A {}`.
    fn update_declaration_at_static_member(
        &mut self,
        name: NameId,
        decl_ref: RefId,
        member: NodeId,
        alias: &str,
        can_collapse_children: bool,
    ) -> Result<()> {
        let class = self
            .ast
            .grandparent(member)
            .filter(|&c| self.ast.is(c, Token::Class))
            .ok_or_else(|| CollapseError::StaticMemberOutsideClass {
                name: self.full_name(name),
                found: self
                    .ast
                    .grandparent(member)
                    .map_or(Token::Empty, |g| self.ast.token(g)),
            })?;
        let Some(statement) = self.ast.enclosing_statement(class) else {
            return Ok(());
        };

        if can_collapse_children {
            self.add_stubs_for_undeclared_properties(name, alias, statement)?;
        }

        let Some(function) = self.ast.first_child(member) else {
            return Ok(());
        };
        self.ast.detach(member);
        self.ast.detach(function);
        let jsdoc = self.ast.jsdoc(member);
        self.check_for_receiver_affected_by_collapse(function, jsdoc, name);

        let full_name = self.full_name(name);
        let name_node = self.ast.new_alias_name(alias, &full_name);
        self.ast.add_child_to_back(name_node, function);
        let var = self.ast.new_var(name_node);
        self.ast.insert_before(var, statement);
        self.forest.update_ref_node(decl_ref, Some(name_node));
        self.report_change(var);
        Ok(())
    }

    /// Hoist each key of `object_lit`, the value declared for `name`, into
    /// its own variable, inserted after `previous` or else before `anchor`.
    fn declare_variables_for_obj_lit_values(
        &mut self,
        name: NameId,
        alias: &str,
        object_lit: NodeId,
        anchor: NodeId,
        previous: Option<NodeId>,
    ) -> Result<()> {
        let full_name = self.full_name(name);
        let discard_keys = !self.forest.name(name).should_keep_keys();
        let mut arbitrary_name_counter = 0;
        let mut add_after = previous;

        let keys = self.ast.children(object_lit).to_vec();
        for key in keys {
            match self.ast.token(key) {
                // Unknown key sets or side-effecting access.
                Token::GetterDef | Token::SetterDef | Token::ComputedProp | Token::ObjectSpread => {
                    continue
                }
                Token::StringKey | Token::MemberFunctionDef => {}
                found => return Err(CollapseError::UnexpectedObjectLitChild { found }),
            }
            let Some(value) = self.ast.first_child(key) else {
                continue;
            };

            // Keys that aren't identifiers can never be referenced by a
            // collapsed name; they are kept for the value's side effects.
            let key_name = self.ast.string(key).to_string();
            let is_identifier = util::is_js_identifier(&key_name);
            let prop_name = if is_identifier {
                key_name
            } else {
                arbitrary_name_counter += 1;
                arbitrary_name_counter.to_string()
            };

            let prop = self.forest.get(&format!("{}.{}", full_name, prop_name));
            if let Some(prop) = prop {
                if !self.can_collapse(prop) {
                    continue;
                }
            }

            let prop_alias = append_prop_for_alias(&*self.forest, alias, &prop_name);
            let prop_full_name = format!("{}.{}", full_name, prop_name);
            let is_constant = self.ast.has_prop(key, NodeProps::IS_CONSTANT_NAME);
            let mut kept_ref = None;
            if discard_keys {
                self.ast.detach(key);
                self.ast.detach(value);
            } else {
                let ref_node = self.ast.new_alias_name(&prop_alias, &prop_full_name);
                if is_constant {
                    self.ast.set_prop(ref_node, NodeProps::IS_CONSTANT_NAME, true);
                }
                self.ast.replace_with(value, ref_node);
                self.report_change(ref_node);
                kept_ref = Some(ref_node);
            }

            let name_node = self.ast.new_alias_name(&prop_alias, &prop_full_name);
            self.ast.add_child_to_back(name_node, value);
            if is_constant {
                self.ast.set_prop(name_node, NodeProps::IS_CONSTANT_NAME, true);
            }
            let var = self.ast.new_var(name_node);
            match add_after {
                Some(after) => self.ast.insert_after(var, after),
                None => self.ast.insert_before(var, anchor),
            }
            self.report_change(var);
            add_after = Some(var);

            if let Some(prop) = prop.filter(|_| is_identifier) {
                if let Some(ref_node) = kept_ref {
                    self.forest.add_aliasing_get_cloned_from_declaration(prop, ref_node);
                }
                if let Some(prop_decl) = self.forest.name(prop).declaration() {
                    self.forest.update_ref_node(prop_decl, Some(name_node));
                }
                if self.ast.is(value, Token::Function) {
                    let jsdoc = self.ast.jsdoc(key);
                    self.check_for_receiver_affected_by_collapse(value, jsdoc, prop);
                }
            }
        }
        Ok(())
    }

    /// Declare `var alias$p;` after `anchor` for every property `p` of
    /// `name` that is only ever set from a local scope.
    fn add_stubs_for_undeclared_properties(
        &mut self,
        name: NameId,
        alias: &str,
        anchor: NodeId,
    ) -> Result<()> {
        let parent = self.ast.parent(anchor);
        if !parent.is_some_and(|p| util::is_statement_block(self.ast, p)) {
            return Err(CollapseError::StubParentNotStatementBlock {
                name: self.full_name(name),
                found: parent.map_or(Token::Empty, |p| self.ast.token(p)),
            });
        }

        let mut add_after = anchor;
        let props = self.forest.name(name).props().to_vec();
        for prop in props {
            if !self.forest.needs_to_be_stubbed(prop) {
                continue;
            }
            let prop_alias = self.alias_for(alias, prop);
            let full_name = self.full_name(prop);
            let name_node = self.ast.new_alias_name(&prop_alias, &full_name);
            // The first reference decides constness; a stub has no
            // declaration of its own.
            let first = self
                .forest
                .first_ref(prop)
                .and_then(|r| self.forest.reference(r).node);
            if first.is_some_and(|n| self.ast.has_prop(n, NodeProps::IS_CONSTANT_NAME)) {
                self.ast.set_prop(name_node, NodeProps::IS_CONSTANT_NAME, true);
            }
            let var = self.ast.new_var(name_node);
            self.ast.insert_after(var, add_after);
            self.report_change(var);
            add_after = var;
        }
        Ok(())
    }
}
