//! Tree rewriting passes.

pub mod collapse_properties;
mod constant_annotations;
pub mod decisions;

pub use collapse_properties::CollapseProperties;
pub use constant_annotations::PropagateConstantAnnotations;
pub use decisions::DecisionLog;

use crate::ast::Ast;
use crate::errors::Result;

/// A rewrite over a whole tree.
pub trait CompilerPass {
    fn name(&self) -> &'static str;

    /// Rewrite `ast` in place, returning whether anything changed.
    fn run(&mut self, ast: &mut Ast) -> Result<bool>;
}

/// Run `passes` in order, stopping at the first error.
pub fn run_passes(ast: &mut Ast, passes: &mut [Box<dyn CompilerPass>]) -> Result<bool> {
    let mut changed = false;
    for pass in passes.iter_mut() {
        let pass_changed = pass.run(ast)?;
        tracing::debug!(pass = pass.name(), changed = pass_changed, "ran pass");
        changed |= pass_changed;
    }
    Ok(changed)
}
