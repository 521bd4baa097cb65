//! Escape analysis over the name forest.
//!
//! A namespace escapes when its object can be reached under a binding the
//! forest does not track: it was aliased, or it is a module namespace handed
//! out by a dynamic import. Children of escaped names are never collapsed.

use super::Collapser;
use crate::ast::{util, Ast, NodeId, Token};
use crate::diagnostics::DiagnosticCode;
use crate::namespace::{NameId, RefType};
use rustc_hash::FxHashSet;

/// Names whose declarations and children must stay as they are. Built once
/// per invocation and only read afterwards.
pub type EscapeSet = FxHashSet<NameId>;

impl Collapser<'_> {
    /// Check every namespace for aliasing and redefinition.
    pub(super) fn check_namespaces(&mut self) -> EscapeSet {
        let mut escaped = EscapeSet::default();
        let mut escaped_full_names: FxHashSet<String> = self.dynamically_imported_modules.clone();
        let names: Vec<NameId> = self.forest.names().collect();

        if !self.dynamically_imported_modules.is_empty() {
            for &name in &names {
                if !self
                    .dynamically_imported_modules
                    .contains(self.forest.name(name).full_name())
                {
                    continue;
                }
                self.log_decision(name, || "escapes - dynamically imported module namespace".to_string());
                escaped.insert(name);

                // Module rewriting aliases exported classes onto the namespace
                // (`module$foo.Foo = Foo$$module$foo`); those aliases escape too.
                let props = self.forest.name(name).props().to_vec();
                for prop in props {
                    let Some(decl_node) = self.forest.declaration_node(prop) else {
                        continue;
                    };
                    let Some(rvalue) = util::rvalue_of_lvalue(self.ast, decl_node) else {
                        continue;
                    };
                    if self.ast.is(rvalue, Token::Name) {
                        self.log_decision(name, || {
                            "escapes - dynamically imported module namespace property alias"
                                .to_string()
                        });
                        escaped_full_names.insert(self.ast.string(rvalue).to_string());
                    }
                }
            }
        }

        for &name in &names {
            let entry = self.forest.name(name);
            if escaped_full_names.contains(entry.full_name()) {
                escaped.insert(name);
            }
            if !entry.is_namespace_object_lit() {
                continue;
            }
            if entry.aliasing_gets == 0
                && entry.local_sets + entry.global_sets <= 1
                && entry.delete_props == 0
            {
                continue;
            }

            let declaration = entry.declaration();
            let refs = entry.refs().to_vec();
            let mut initialized = declaration.is_some();
            for reference in refs {
                if Some(reference) == declaration {
                    continue;
                }
                let r = self.forest.reference(reference);
                let node = r.node;
                match r.ref_type {
                    RefType::DeleteProp => {
                        if initialized {
                            self.warn(DiagnosticCode::NamespaceRedefined, name, node);
                        }
                    }
                    RefType::SetFromGlobal | RefType::SetFromLocal => {
                        let safe = node.is_some_and(|n| is_safe_namespace_reinit(self.ast, n));
                        if initialized && !safe {
                            self.warn(DiagnosticCode::NamespaceRedefined, name, node);
                        }
                        initialized = true;
                    }
                    RefType::AliasingGet => {
                        self.warn(DiagnosticCode::PartialNamespace, name, node);
                        self.log_decision(name, || "escapes".to_string());
                        escaped.insert(name);
                        break;
                    }
                    RefType::Declaration | RefType::OtherGet => {}
                }
            }
        }
        escaped
    }
}

/// `a = a || {}` or `var a = a || {}`: the set keeps whatever the name
/// already holds. Other defaulting shapes (`??`, `!a && ...`) are not
/// recognized.
pub fn is_safe_namespace_reinit(ast: &Ast, node: NodeId) -> bool {
    let value_parent = match ast.parent(node) {
        Some(parent) if ast.token(parent).is_name_declaration() => node,
        Some(parent) => parent,
        None => return false,
    };
    let Some(value) = ast.last_child(value_parent) else {
        return false;
    };
    ast.is(value, Token::Or)
        && ast
            .first_child(value)
            .is_some_and(|left| util::matches_qualified_name(ast, node, left))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reinit(ast: &mut Ast, target: &str, left: &str, coalesce: bool) -> NodeId {
        let lhs = ast.new_qname(target);
        let left = ast.new_qname(left);
        let empty = ast.new_object_lit(&[]);
        let value = if coalesce {
            ast.new_coalesce(left, empty)
        } else {
            ast.new_or(left, empty)
        };
        let assign = ast.new_assign(lhs, value);
        let stmt = ast.new_expr_result(assign);
        ast.push_statement(stmt);
        lhs
    }

    #[test]
    fn test_or_default_of_same_name_is_safe() {
        let mut ast = Ast::new();
        let lhs = reinit(&mut ast, "a.b", "a.b", false);
        assert!(is_safe_namespace_reinit(&ast, lhs));
    }

    #[test]
    fn test_other_shapes_are_not_safe() {
        let mut ast = Ast::new();
        let other_name = reinit(&mut ast, "a.b", "a.c", false);
        assert!(!is_safe_namespace_reinit(&ast, other_name));
        let coalesce = reinit(&mut ast, "a", "a", true);
        assert!(!is_safe_namespace_reinit(&ast, coalesce));
    }

    #[test]
    fn test_var_forms() {
        let mut ast = Ast::new();
        let a = ast.new_name("a");
        let empty = ast.new_object_lit(&[]);
        let or = ast.new_or(a, empty);
        let decl = ast.new_var_decl("a", Some(or));
        ast.push_statement(decl);
        let declared = ast.first_child(decl).unwrap();
        assert!(is_safe_namespace_reinit(&ast, declared));

        let bare = ast.new_var_decl("a", None);
        ast.push_statement(bare);
        let declared = ast.first_child(bare).unwrap();
        assert!(!is_safe_namespace_reinit(&ast, declared));
    }
}
