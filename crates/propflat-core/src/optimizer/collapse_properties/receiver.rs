use super::Collapser;
use crate::ast::{util, JsDoc, NodeId, Token};
use crate::diagnostics::DiagnosticCode;
use crate::namespace::NameId;

impl Collapser<'_> {
    /// Warn when `function`, about to be hoisted out of its property or
    /// method position, reads its own receiver. Constructors, interfaces and
    /// functions with an explicit `@this` type are expected to.
    pub(super) fn check_for_receiver_affected_by_collapse(
        &mut self,
        function: NodeId,
        jsdoc: Option<JsDoc>,
        name: NameId,
    ) {
        debug_assert!(self.ast.is(function, Token::Function));

        if let Some(doc) = jsdoc {
            if doc.is_constructor_or_interface() || doc.has_this_type() {
                return;
            }
        }

        if util::references_own_receiver(self.ast, function) {
            self.warn(DiagnosticCode::ReceiverAffectedByCollapse, name, Some(function));
            self.log_decision(name, || "receiver reference changes meaning".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Ast, JsDoc, Token};
    use crate::config::CollapseOptions;
    use crate::diagnostics::{CollectingDiagnosticHandler, DiagnosticCode};
    use crate::namespace::NameForest;
    use crate::optimizer::collapse_properties::Collapser;
    use crate::optimizer::decisions::DecisionLog;
    use rustc_hash::FxHashSet;

    fn check(jsdoc: Option<JsDoc>) -> usize {
        let mut ast = Ast::new();
        let this = ast.new_this();
        let ret = ast.new_return(Some(this));
        let function = ast.new_function("", &[], &[ret]);
        assert!(ast.is(function, Token::Function));

        let mut forest = NameForest::new();
        let name = forest.get_or_create("a.f");
        let options = CollapseOptions::default();
        let handler = CollectingDiagnosticHandler::new();
        let mut decisions = DecisionLog::disabled();
        let modules = FxHashSet::default();
        let mut collapser = Collapser {
            ast: &mut ast,
            forest: &mut forest,
            options: &options,
            diagnostics: &handler,
            decisions: &mut decisions,
            dynamically_imported_modules: &modules,
            logged_verdicts: FxHashSet::default(),
            changed: false,
        };
        collapser.check_for_receiver_affected_by_collapse(function, jsdoc, name);
        handler
            .with_code(DiagnosticCode::ReceiverAffectedByCollapse)
            .len()
    }

    #[test]
    fn test_plain_function_warns() {
        assert_eq!(check(None), 1);
        assert_eq!(check(Some(JsDoc::CONST)), 1);
    }

    #[test]
    fn test_annotated_receivers_are_intentional() {
        assert_eq!(check(Some(JsDoc::CONSTRUCTOR)), 0);
        assert_eq!(check(Some(JsDoc::INTERFACE)), 0);
        assert_eq!(check(Some(JsDoc::THIS_TYPE)), 0);
    }
}
