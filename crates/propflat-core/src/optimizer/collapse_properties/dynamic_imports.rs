//! Discovery of module namespaces reachable through dynamic imports.
//!
//! Two call shapes hand a whole module namespace object to code the name
//! forest cannot see:
//!
//! ```text
//! __webpack_require__.bind(null, "./foo.js")        rewritten CommonJS interop
//! import("./foo.js").then(() => module$foo)         chunk splitting
//! ```

use crate::ast::{util, Ast, NodeId, NodeProps, Token};
use crate::config::{CollapseOptions, ResolutionMode};
use rustc_hash::FxHashSet;
use tracing::debug;

const WEBPACK_REQUIRE: &str = "__webpack_require__";

/// Maps an import path to the global name of the rewritten module namespace.
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, path: &str) -> Option<String>;
}

/// `./foo/bar-baz.js` resolves to `module$foo$bar_baz`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModuleResolver;

impl ModuleResolver for DefaultModuleResolver {
    fn resolve(&self, path: &str) -> Option<String> {
        let path = path.strip_prefix("./").unwrap_or(path);
        let path = match path.rfind('.') {
            Some(dot) if !path[dot..].contains('/') => &path[..dot],
            _ => path,
        };
        if path.is_empty() {
            return None;
        }

        let mut name = String::with_capacity(path.len() + 7);
        name.push_str("module$");
        for c in path.chars() {
            match c {
                '/' => name.push('$'),
                c if c.is_alphanumeric() || c == '_' || c == '$' => name.push(c),
                _ => name.push('_'),
            }
        }
        Some(name)
    }
}

/// Full names of the module namespaces that `ast` imports dynamically.
pub fn find_dynamically_imported_modules(
    ast: &Ast,
    options: &CollapseOptions,
    resolver: &dyn ModuleResolver,
) -> FxHashSet<String> {
    let webpack = options.modules_rewritten && options.module_resolution_mode == ResolutionMode::Webpack;
    let mut modules = FxHashSet::default();

    for node in ast.descendants(ast.root()) {
        let found = match ast.token(node) {
            Token::Call if webpack => webpack_require_target(ast, node, resolver),
            Token::Function => chunk_namespace(ast, node),
            _ => None,
        };
        if let Some(module) = found {
            debug!(module = %module, "dynamically imported module namespace");
            modules.insert(module);
        }
    }
    modules
}

/// `CALL[GETPROP bind[NAME __webpack_require__], NULL, STRING | NUMBER]`
fn webpack_require_target(ast: &Ast, call: NodeId, resolver: &dyn ModuleResolver) -> Option<String> {
    let children = ast.children(call);
    let [callee, receiver, module_id] = children else {
        return None;
    };
    let is_bound_require = ast.is(*callee, Token::GetProp)
        && ast.string(*callee) == "bind"
        && ast
            .first_child(*callee)
            .is_some_and(|n| ast.is(n, Token::Name) && ast.string(n) == WEBPACK_REQUIRE);
    if !is_bound_require || !ast.is(*receiver, Token::Null) {
        return None;
    }

    let path = match ast.token(*module_id) {
        Token::String => ast.string(*module_id).to_string(),
        Token::Number => {
            let value = ast.node(*module_id).number?;
            format!("{}", value as i64)
        }
        _ => return None,
    };
    resolver.resolve(&path)
}

/// The qualified name returned by a callback passed to
/// `import(...).then(...)`.
fn chunk_namespace(ast: &Ast, function: NodeId) -> Option<String> {
    let call = ast.parent(function)?;
    if !ast.is(call, Token::Call) || ast.children(call).get(1) != Some(&function) {
        return None;
    }
    let callee = ast.first_child(call)?;
    if !ast.is(callee, Token::GetProp) || ast.string(callee) != "then" {
        return None;
    }
    let import = ast.first_child(callee)?;
    if !ast.is(import, Token::DynamicImport) {
        return None;
    }

    let body = ast.last_child(function)?;
    let returned = if ast.has_prop(function, NodeProps::ARROW) && !ast.is(body, Token::Block) {
        body
    } else {
        match ast.children(body) {
            [statement] if ast.is(*statement, Token::Return) => ast.first_child(*statement)?,
            _ => return None,
        }
    };
    if !util::is_qualified_name(ast, returned) {
        return None;
    }
    util::qualified_name(ast, returned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolver() {
        let resolver = DefaultModuleResolver;
        assert_eq!(resolver.resolve("./foo.js").as_deref(), Some("module$foo"));
        assert_eq!(
            resolver.resolve("./lib/bar-baz.mjs").as_deref(),
            Some("module$lib$bar_baz")
        );
        assert_eq!(resolver.resolve("42").as_deref(), Some("module$42"));
        assert_eq!(resolver.resolve("./"), None);
    }

    fn webpack_fixture(ast: &mut Ast, path: &str) {
        let require = ast.new_name(WEBPACK_REQUIRE);
        let bind = ast.new_getprop(require, "bind");
        let null = ast.new_null();
        let module_id = ast.new_string_lit(path);
        let call = ast.new_call(bind, &[null, module_id]);
        let stmt = ast.new_expr_result(call);
        ast.push_statement(stmt);
    }

    #[test]
    fn test_webpack_shape_needs_rewritten_modules() {
        let mut ast = Ast::new();
        webpack_fixture(&mut ast, "./foo.js");

        let plain = CollapseOptions::default();
        assert!(find_dynamically_imported_modules(&ast, &plain, &DefaultModuleResolver).is_empty());

        let rewritten = CollapseOptions::default().with_modules_rewritten(ResolutionMode::Webpack);
        let found = find_dynamically_imported_modules(&ast, &rewritten, &DefaultModuleResolver);
        assert!(found.contains("module$foo"));

        let browser = CollapseOptions::default().with_modules_rewritten(ResolutionMode::Browser);
        assert!(find_dynamically_imported_modules(&ast, &browser, &DefaultModuleResolver).is_empty());
    }

    #[test]
    fn test_chunk_shape_with_arrow_and_block_bodies() {
        let mut ast = Ast::new();
        for returned in ["module$a", "module$b.default"] {
            let import = ast.new_dynamic_import("./x.js");
            let then = ast.new_getprop(import, "then");
            let value = ast.new_qname(returned);
            let callback = if returned == "module$a" {
                ast.new_arrow(&[], value)
            } else {
                let ret = ast.new_return(Some(value));
                ast.new_function("", &[], &[ret])
            };
            let call = ast.new_call(then, &[callback]);
            let stmt = ast.new_expr_result(call);
            ast.push_statement(stmt);
        }

        let found =
            find_dynamically_imported_modules(&ast, &CollapseOptions::default(), &DefaultModuleResolver);
        let mut found: Vec<_> = found.into_iter().collect();
        found.sort();
        assert_eq!(found, vec!["module$a".to_string(), "module$b.default".to_string()]);
    }

    #[test]
    fn test_then_on_other_receivers_is_ignored() {
        let mut ast = Ast::new();
        let promise = ast.new_name("promise");
        let then = ast.new_getprop(promise, "then");
        let value = ast.new_qname("module$a");
        let callback = ast.new_arrow(&[], value);
        let call = ast.new_call(then, &[callback]);
        let stmt = ast.new_expr_result(call);
        ast.push_statement(stmt);

        let found =
            find_dynamically_imported_modules(&ast, &CollapseOptions::default(), &DefaultModuleResolver);
        assert!(found.is_empty());
    }
}
