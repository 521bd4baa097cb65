use super::CompilerPass;
use crate::ast::{util, Ast};
use crate::errors::Result;
use tracing::debug;

/// Marks every reference to a global declared constant as constant too.
///
/// Collapsing runs this itself; it is exposed for trees that gained
/// constant declarations some other way.
#[derive(Debug, Default)]
pub struct PropagateConstantAnnotations;

impl PropagateConstantAnnotations {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerPass for PropagateConstantAnnotations {
    fn name(&self) -> &'static str {
        "propagate-constant-annotations"
    }

    fn run(&mut self, ast: &mut Ast) -> Result<bool> {
        let marked = util::propagate_constant_annotations(ast);
        debug!(marked, "propagated constant annotations");
        Ok(marked > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeProps;

    #[test]
    fn test_marks_uses_of_constant_globals() {
        let mut ast = Ast::new();
        let one = ast.new_number(1.0);
        let decl = ast.new_var_decl("a$b", Some(one));
        let declared = ast.first_child(decl).unwrap();
        ast.set_prop(declared, NodeProps::IS_CONSTANT_NAME, true);
        ast.push_statement(decl);
        let use_site = ast.new_name("a$b");
        let stmt = ast.new_expr_result(use_site);
        ast.push_statement(stmt);

        let mut pass = PropagateConstantAnnotations::new();
        assert!(pass.run(&mut ast).unwrap());
        assert!(ast.has_prop(use_site, NodeProps::IS_CONSTANT_NAME));
        assert!(!pass.run(&mut ast).unwrap());
    }
}
