//! Structural queries over the tree.

use super::{Ast, JsDoc, NodeId, NodeProps, Token};
use rustc_hash::FxHashSet;

/// `NAME`, `THIS`, or a `GETPROP` chain rooted at one of them.
pub fn is_qualified_name(ast: &Ast, n: NodeId) -> bool {
    match ast.token(n) {
        Token::Name => !ast.string(n).is_empty(),
        Token::This | Token::Super => true,
        Token::GetProp => ast
            .first_child(n)
            .is_some_and(|receiver| is_qualified_name(ast, receiver)),
        _ => false,
    }
}

/// Dotted form of a qualified name, e.g. `"a.b.c"`.
pub fn qualified_name(ast: &Ast, n: NodeId) -> Option<String> {
    match ast.token(n) {
        Token::Name if !ast.string(n).is_empty() => Some(ast.string(n).to_string()),
        Token::This => Some("this".to_string()),
        Token::Super => Some("super".to_string()),
        Token::GetProp => {
            let receiver = qualified_name(ast, ast.first_child(n)?)?;
            Some(format!("{}.{}", receiver, ast.string(n)))
        }
        _ => None,
    }
}

pub fn matches_qualified_name(ast: &Ast, a: NodeId, b: NodeId) -> bool {
    match (ast.token(a), ast.token(b)) {
        (Token::Name, Token::Name) => {
            !ast.string(a).is_empty() && ast.string(a) == ast.string(b)
        }
        (Token::This, Token::This) | (Token::Super, Token::Super) => true,
        (Token::GetProp, Token::GetProp) => {
            ast.string(a) == ast.string(b)
                && match (ast.first_child(a), ast.first_child(b)) {
                    (Some(ra), Some(rb)) => matches_qualified_name(ast, ra, rb),
                    _ => false,
                }
        }
        _ => false,
    }
}

pub fn is_name_declaration(ast: &Ast, n: NodeId) -> bool {
    ast.token(n).is_name_declaration()
}

pub fn is_statement_block(ast: &Ast, n: NodeId) -> bool {
    ast.token(n).is_statement_block()
}

/// Keys of object literals and object patterns. Duplicate keys surface as
/// references to the same name, so callers need to tell them apart from
/// expression occurrences.
pub fn may_be_object_lit_key(ast: &Ast, n: NodeId) -> bool {
    matches!(
        ast.token(n),
        Token::StringKey | Token::GetterDef | Token::SetterDef | Token::MemberFunctionDef
    ) && ast
        .parent(n)
        .is_some_and(|p| matches!(ast.token(p), Token::ObjectLit | Token::ObjectPattern))
}

pub fn is_normal_or_opt_chain_call(ast: &Ast, n: NodeId) -> bool {
    ast.token(n).is_call()
}

/// The value written to an lvalue, if the lvalue is in a position that
/// has one.
pub fn rvalue_of_lvalue(ast: &Ast, n: NodeId) -> Option<NodeId> {
    let parent = ast.parent(n)?;
    match ast.token(parent) {
        Token::Assign if ast.is_first_child_of(n, parent) => ast.next(n),
        Token::Var | Token::Let | Token::Const => ast.first_child(n),
        Token::ObjectLit | Token::ClassMembers => ast.first_child(n),
        _ => None,
    }
}

/// Documentation that applies to `n`: its own, or that of the declaration
/// or expression statement directly around it.
pub fn best_jsdoc(ast: &Ast, n: NodeId) -> Option<JsDoc> {
    if let Some(doc) = ast.jsdoc(n) {
        return Some(doc);
    }
    let parent = ast.parent(n)?;
    match ast.token(n) {
        Token::Assign | Token::Name | Token::Function | Token::Class
            if matches!(
                ast.token(parent),
                Token::ExprResult | Token::Var | Token::Let | Token::Const | Token::Assign
            ) =>
        {
            ast.jsdoc(parent)
        }
        _ => None,
    }
}

/// Whether `function` reads its own receiver: `this` or `super` anywhere in
/// its body, looking through nested arrow functions (which share the
/// receiver) but not through ordinary nested functions.
pub fn references_own_receiver(ast: &Ast, function: NodeId) -> bool {
    let mut stack: Vec<NodeId> = ast.children(function).to_vec();
    while let Some(n) = stack.pop() {
        match ast.token(n) {
            Token::This | Token::Super => return true,
            Token::Function if !ast.has_prop(n, NodeProps::ARROW) => continue,
            _ => stack.extend(ast.children(n).iter().copied()),
        }
    }
    false
}

/// Identifier syntax check (no keyword filtering).
pub fn is_js_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Whether `function` is a function declaration statement.
pub fn is_function_declaration(ast: &Ast, function: NodeId) -> bool {
    ast.is(function, Token::Function)
        && !ast.has_prop(function, NodeProps::ARROW)
        && ast
            .first_child(function)
            .is_some_and(|name| !ast.string(name).is_empty())
        && ast
            .parent(function)
            .is_some_and(|p| ast.token(p).is_statement_block())
}

/// Marks every global `NAME` constant when its identifier is declared
/// constant somewhere, so annotations on freshly inserted declarations reach
/// all of their references.
pub fn propagate_constant_annotations(ast: &mut Ast) -> usize {
    let names: Vec<NodeId> = ast
        .descendants(ast.root())
        .into_iter()
        .filter(|&n| ast.is(n, Token::Name) && !ast.string(n).is_empty())
        .collect();

    let constant: FxHashSet<String> = names
        .iter()
        .filter(|&&n| {
            ast.has_prop(n, NodeProps::IS_CONSTANT_NAME)
                && ast.parent(n).is_some_and(|p| ast.token(p).is_name_declaration())
        })
        .map(|&n| ast.string(n).to_string())
        .collect();

    let mut marked = 0;
    for n in names {
        if !ast.has_prop(n, NodeProps::IS_CONSTANT_NAME) && constant.contains(ast.string(n)) {
            ast.set_prop(n, NodeProps::IS_CONSTANT_NAME, true);
            marked += 1;
        }
    }
    marked
}
