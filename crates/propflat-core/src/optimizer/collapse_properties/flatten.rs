//! Reference flattening.
//!
//! Rewrites every occurrence of a collapsible name other than its
//! declaration into the flat alias, and every occurrence of it as the prefix
//! of a deeper name, so that `a.b.c.d` becomes `a$b.c.d`, then `a$b$c.d`,
//! and finally `a$b$c$d` as each level is visited.

use super::escape::EscapeSet;
use super::Collapser;
use crate::ast::{util, NodeId, NodeProps, Token};
use crate::errors::{CollapseError, Result};
use crate::namespace::{NameId, RefId};

impl Collapser<'_> {
    /// Flatten references to the collapsible descendants of `name`, whose
    /// flat form is `alias`.
    pub(super) fn flatten_references_to_collapsible_descendant_names(
        &mut self,
        name: NameId,
        alias: &str,
        escaped: &EscapeSet,
    ) -> Result<()> {
        let props = self.forest.name(name).props().to_vec();
        if props.is_empty() {
            return Ok(());
        }
        if self.forest.name(name).is_collapsing_explicitly_denied() {
            self.log_decision(name, || {
                "@nocollapse: will not flatten descendant name references".to_string()
            });
            return Ok(());
        }
        if escaped.contains(&name) {
            self.log_decision(name, || {
                "escapes: will not flatten descendant name references".to_string()
            });
            return Ok(());
        }

        for prop in props {
            if escaped.contains(&prop) {
                self.log_decision(prop, || "escapes: will not flatten references".to_string());
                continue;
            }
            let prop_alias = self.alias_for(alias, prop);
            if self.can_collapse(prop) {
                self.log_decision(prop, || "will flatten references".to_string());
                self.flatten_references_to(prop, &prop_alias)?;
            } else if self.forest.name(prop).is_collapsing_explicitly_denied() {
                self.log_decision(prop, || "@nocollapse: will not flatten references".to_string());
            } else if self.forest.is_simple_stub_declaration(prop, self.ast) {
                self.log_decision(prop, || {
                    "simple stub declaration: will flatten references".to_string()
                });
                self.flatten_simple_stub_declaration(prop, &prop_alias)?;
            } else {
                self.log_decision(prop, || "will not flatten references".to_string());
            }

            self.flatten_references_to_collapsible_descendant_names(prop, &prop_alias, escaped)?;
        }
        Ok(())
    }

    /// `a.b;` becomes `var a$b;`.
    fn flatten_simple_stub_declaration(&mut self, name: NameId, alias: &str) -> Result<()> {
        let full_name = self.full_name(name);
        let node = self
            .forest
            .first_ref(name)
            .and_then(|r| self.forest.reference(r).node)
            .ok_or_else(|| CollapseError::DetachedReference {
                name: full_name.clone(),
            })?;
        let statement = self
            .ast
            .parent(node)
            .filter(|&p| self.ast.is(p, Token::ExprResult))
            .ok_or_else(|| CollapseError::StubDeclarationNotExprResult {
                name: full_name.clone(),
            })?;

        let name_node = self.ast.new_alias_name(alias, &full_name);
        let var = self.ast.new_var(name_node);
        self.ast.replace_with(statement, var);
        self.report_change(var);
        Ok(())
    }

    /// Flatten every reference to `name` except its declaration, then the
    /// occurrences of `name` as a prefix of its descendants.
    fn flatten_references_to(&mut self, name: NameId, alias: &str) -> Result<()> {
        let original_name = self.full_name(name);
        let declaration = self.forest.name(name).declaration();
        let refs = self.forest.name(name).refs().to_vec();

        for reference in refs {
            if Some(reference) == declaration {
                continue;
            }
            let r = self.forest.reference(reference);
            let Some(node) = r.node else {
                continue;
            };
            let (has_twin, is_set) = (r.twin.is_some(), r.is_set());

            // Object literal keys show up as refs when keys are duplicated,
            // and twins share a node: rewrite the set half only.
            if !util::may_be_object_lit_key(self.ast, node) && (!has_twin || is_set) {
                self.flatten_name_ref(alias, node, &original_name)?;
            } else if self.ast.is(node, Token::StringKey)
                && self
                    .ast
                    .parent(node)
                    .is_some_and(|p| self.ast.is(p, Token::ObjectPattern))
            {
                self.flatten_destructured_key(name, reference, node, alias)?;
            }
        }

        let props = self.forest.name(name).props().to_vec();
        for prop in props {
            self.flatten_prefixes(alias, prop, 1)?;
        }
        Ok(())
    }

    /// Flatten the `depth`-levels-up prefix of every occurrence of `name`
    /// and its descendants to `alias`.
    fn flatten_prefixes(&mut self, alias: &str, name: NameId, depth: usize) -> Result<()> {
        let original_name = self.full_name(name);
        let declaration = self.forest.name(name).declaration();

        // Declarations through object literal keys have no prefix to flatten.
        if let Some(decl_node) = self.forest.declaration_node(name) {
            if self.ast.is(decl_node, Token::GetProp) {
                self.flatten_name_ref_at_depth(alias, decl_node, depth, &original_name)?;
            }
        }

        let refs = self.forest.name(name).refs().to_vec();
        for reference in refs {
            if Some(reference) == declaration {
                continue;
            }
            let r = self.forest.reference(reference);
            let Some(node) = r.node else {
                continue;
            };
            if r.twin.is_none() || r.is_set() {
                self.flatten_name_ref_at_depth(alias, node, depth, &original_name)?;
            }
        }

        let props = self.forest.name(name).props().to_vec();
        for prop in props {
            self.flatten_prefixes(alias, prop, depth + 1)?;
        }
        Ok(())
    }

    fn flatten_name_ref_at_depth(
        &mut self,
        alias: &str,
        node: NodeId,
        depth: usize,
        original_name: &str,
    ) -> Result<()> {
        let token = self.ast.token(node);
        let is_qname = matches!(token, Token::Name | Token::GetProp);
        if !is_qname {
            if util::may_be_object_lit_key(self.ast, node) {
                return Ok(());
            }
            return Err(CollapseError::ExpectedQualifiedName {
                name: original_name.to_string(),
                found: token,
            });
        }

        let mut current = node;
        for _ in 1..depth {
            match self.ast.first_child(current) {
                Some(child) => current = child,
                None => break,
            }
        }
        if self.ast.is(current, Token::GetProp) {
            if let Some(receiver) = self.ast.first_child(current) {
                if self.ast.is(receiver, Token::GetProp) {
                    self.flatten_name_ref(alias, receiver, original_name)?;
                }
            }
        }
        Ok(())
    }

    /// Replace the `GETPROP` chain at `node` with a `NAME` holding `alias`.
    fn flatten_name_ref(&mut self, alias: &str, node: NodeId, original_name: &str) -> Result<()> {
        let found = self.ast.token(node);
        if found != Token::GetProp {
            return Err(CollapseError::FlattenTargetNotGetProp {
                name: original_name.to_string(),
                found,
            });
        }

        let replacement = self.ast.new_alias_name(alias, original_name);
        self.copy_name_annotations(node, replacement);
        if let Some(parent) = self.ast.parent(node) {
            // Flattening drops the namespace as the call's receiver.
            if self.ast.token(parent).is_call() && self.ast.is_first_child_of(node, parent) {
                self.ast.set_prop(parent, NodeProps::FREE_CALL, true);
            }
        }

        self.ast.replace_with(node, replacement);
        self.report_change(replacement);
        Ok(())
    }

    pub(super) fn copy_name_annotations(&mut self, from: NodeId, to: NodeId) {
        if self.ast.has_prop(from, NodeProps::IS_CONSTANT_NAME) {
            self.ast.set_prop(to, NodeProps::IS_CONSTANT_NAME, true);
        }
    }

    /// Pull the key for `name` out of an object pattern into its own
    /// declaration or assignment right after the destructuring statement:
    ///
    /// ```text
    /// const {b: x = d, c} = a;   =>   const {c} = a;
    ///                                 const x = a$b === void 0 ? d : a$b;
    /// ```
    fn flatten_destructured_key(
        &mut self,
        name: NameId,
        reference: RefId,
        key: NodeId,
        alias: &str,
    ) -> Result<()> {
        let original_name = self.full_name(name);
        // A rest element stays behind; the hoisted property is no longer
        // on the object, so what it collects is unchanged.
        let Some(pattern) = self.ast.parent(key) else {
            return Ok(());
        };

        let Some(holder) = self.ast.parent(pattern) else {
            return Ok(());
        };
        let (statement, declaration_token, rhs) = match self.ast.token(holder) {
            Token::DestructuringLhs => {
                let Some(declaration) = self.ast.parent(holder) else {
                    return Ok(());
                };
                let token = self.ast.token(declaration);
                if !token.is_name_declaration() {
                    return Ok(());
                }
                (declaration, Some(token), self.ast.last_child(holder))
            }
            Token::Assign if self.ast.is_first_child_of(pattern, holder) => {
                match self.ast.parent(holder) {
                    Some(stmt) if self.ast.is(stmt, Token::ExprResult) => {
                        (stmt, None, self.ast.next(pattern))
                    }
                    _ => {
                        self.log_decision(name, || {
                            "destructuring assignment used as a value: will not flatten key"
                                .to_string()
                        });
                        return Ok(());
                    }
                }
            }
            _ => return Ok(()),
        };
        let Some(value) = self.ast.first_child(key) else {
            return Ok(());
        };

        let flat = self.ast.new_alias_name(alias, &original_name);
        self.copy_name_annotations(key, flat);
        let (target, new_value) = if self.ast.is(value, Token::DefaultValue) {
            let [target, default] = self.ast.children(value)[..] else {
                return Err(CollapseError::MalformedDefaultValue {
                    name: original_name,
                    children: self.ast.child_count(value),
                });
            };
            self.ast.detach(target);
            self.ast.detach(default);
            let probe = self.ast.clone_tree(flat);
            let undefined = self.ast.new_undefined();
            let missing = self.ast.new_sheq(probe, undefined);
            (target, self.ast.new_hook(missing, default, flat))
        } else {
            self.ast.detach(value);
            (value, flat)
        };

        let extracted = match declaration_token {
            Some(token) => {
                let declared = if self.ast.is(target, Token::Name) {
                    self.ast.add_child_to_back(target, new_value);
                    target
                } else {
                    self.ast.new_destructuring_lhs(target, new_value)
                };
                self.ast.new_declaration_node(token, declared)
            }
            None => {
                let assign = self.ast.new_assign(target, new_value);
                self.ast.new_expr_result(assign)
            }
        };
        self.ast.insert_after(extracted, statement);
        self.ast.detach(key);
        self.forest.update_ref_node(reference, Some(flat));
        self.report_change(extracted);

        if !self.ast.has_children(pattern) {
            // Nothing left to destructure; keep the value only if reading it
            // can have effects.
            match rhs {
                Some(rhs) if !util::is_qualified_name(self.ast, rhs) => {
                    self.ast.detach(rhs);
                    let kept = self.ast.new_expr_result(rhs);
                    self.ast.replace_with(statement, kept);
                }
                _ => {
                    self.ast.detach(statement);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{printer, Ast, NodeProps, Token};
    use crate::config::CollapseOptions;
    use crate::diagnostics::CollectingDiagnosticHandler;
    use crate::errors::CollapseError;
    use crate::namespace::{NameForest, RefType};
    use crate::optimizer::collapse_properties::{Collapser, EscapeSet};
    use crate::optimizer::decisions::DecisionLog;
    use rustc_hash::FxHashSet;

    fn with_collapser<R>(
        ast: &mut Ast,
        forest: &mut NameForest,
        f: impl FnOnce(&mut Collapser<'_>) -> R,
    ) -> R {
        let options = CollapseOptions::default();
        let handler = CollectingDiagnosticHandler::new();
        let mut decisions = DecisionLog::disabled();
        let modules = FxHashSet::default();
        let mut collapser = Collapser {
            ast,
            forest,
            options: &options,
            diagnostics: &handler,
            decisions: &mut decisions,
            dynamically_imported_modules: &modules,
            logged_verdicts: FxHashSet::default(),
            changed: false,
        };
        f(&mut collapser)
    }

    #[test]
    fn test_flatten_name_ref_marks_free_calls() {
        let mut ast = Ast::new();
        let mut forest = NameForest::new();
        let callee = ast.new_qname("a.b");
        let call = ast.new_call(callee, &[]);
        let stmt = ast.new_expr_result(call);
        ast.push_statement(stmt);

        with_collapser(&mut ast, &mut forest, |c| c.flatten_name_ref("a$b", callee, "a.b"))
            .unwrap();
        assert_eq!(printer::print(&ast), "a$b();");
        assert!(ast.has_prop(call, NodeProps::FREE_CALL));
        let flat = ast.first_child(call).unwrap();
        assert_eq!(ast.node(flat).original_name.as_deref(), Some("a.b"));
    }

    #[test]
    fn test_flatten_name_ref_rejects_non_getprop() {
        let mut ast = Ast::new();
        let mut forest = NameForest::new();
        let name = ast.new_name("a");
        let err = with_collapser(&mut ast, &mut forest, |c| c.flatten_name_ref("a", name, "a"))
            .unwrap_err();
        assert_eq!(
            err,
            CollapseError::FlattenTargetNotGetProp {
                name: "a".to_string(),
                found: Token::Name
            }
        );
    }

    #[test]
    fn test_prefixes_flatten_at_depth() {
        let mut ast = Ast::new();
        let mut forest = NameForest::new();
        let deep = ast.new_qname("a.b.c.d");
        let stmt = ast.new_expr_result(deep);
        ast.push_statement(stmt);
        let abcd = forest.get_or_create("a.b.c.d");
        forest.add_ref(abcd, deep, RefType::OtherGet);
        let abc = forest.get("a.b.c").unwrap();

        with_collapser(&mut ast, &mut forest, |c| c.flatten_prefixes("a$b", abc, 1)).unwrap();
        assert_eq!(printer::print(&ast), "a$b.c.d;");
    }

    #[test]
    fn test_escaped_names_keep_descendants() {
        let mut ast = Ast::new();
        let mut forest = NameForest::new();
        let use_site = ast.new_qname("a.b");
        let stmt = ast.new_expr_result(use_site);
        ast.push_statement(stmt);
        let ab = forest.get_or_create("a.b");
        forest.add_ref(ab, use_site, RefType::OtherGet);
        let a = forest.get("a").unwrap();

        let mut escaped = EscapeSet::default();
        escaped.insert(a);
        with_collapser(&mut ast, &mut forest, |c| {
            c.flatten_references_to_collapsible_descendant_names(a, "a", &escaped)
        })
        .unwrap();
        assert_eq!(printer::print(&ast), "a.b;");
    }

    #[test]
    fn test_default_value_without_default_is_an_error() {
        let mut ast = Ast::new();
        let mut forest = NameForest::new();
        let target = ast.new_name("x");
        let three = ast.new_number(3.0);
        let default = ast.new_default_value(target, three);
        let key = ast.new_string_key("b", default);
        let pattern = ast.new_object_pattern(&[key]);
        let rhs = ast.new_name("a");
        let decl = ast.new_destructuring_decl(Token::Const, pattern, rhs);
        ast.push_statement(decl);
        ast.detach(three);

        let ab = forest.get_or_create("a.b");
        let reference = forest.add_ref(ab, key, RefType::OtherGet);
        let err = with_collapser(&mut ast, &mut forest, |c| {
            c.flatten_destructured_key(ab, reference, key, "a$b")
        })
        .unwrap_err();
        assert_eq!(
            err,
            CollapseError::MalformedDefaultValue {
                name: "a.b".to_string(),
                children: 1
            }
        );
    }
}
