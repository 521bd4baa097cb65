//! Property collapsing.
//!
//! Flattens global namespaces by replacing each `.` in a collapsible dotted
//! name with `$`: `goog.events.handleEvent()` becomes
//! `goog$events$handleEvent()`. Declarations are rewritten to match, object
//! literal namespaces are unrolled into one variable per key, and names that
//! are only set from local scopes get uninitialized stub declarations.
//!
//! A namespace that is aliased (`var c = a`) or redefined after it was
//! initialized keeps its properties, because flattened copies could drift
//! out of sync with the real object. Static properties of constructors are
//! collapsed regardless.
//!
//! The pass never looks through computed access (`a[b]`), and it relies on
//! an alias inlining pass having run first.
//!
//! Order of work:
//! 1. find module namespaces that escape through dynamic imports
//! 2. escape analysis over the forest ([`escape`])
//! 3. flatten references for every root ([`flatten`])
//! 4. collapse declarations for every root ([`declarations`])
//! 5. propagate constant annotations over the new variables
//!
//! Step 4 restructures statements above reference sites, so it only starts
//! once step 3 has finished for the whole forest.

mod alias;
mod declarations;
mod dynamic_imports;
mod escape;
mod flatten;
mod receiver;

pub use alias::append_prop_for_alias;
pub use dynamic_imports::{find_dynamically_imported_modules, DefaultModuleResolver, ModuleResolver};
pub use escape::{is_safe_namespace_reinit, EscapeSet};

use crate::ast::{util, Ast, NodeId};
use crate::config::{CollapseOptions, PropertyCollapseLevel};
use crate::diagnostics::{DiagnosticCode, DiagnosticHandler};
use crate::errors::Result;
use crate::namespace::{Inlinability, NameCollector, NameForest, NameId};
use crate::optimizer::decisions::DecisionLog;
use crate::optimizer::CompilerPass;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::debug;

pub struct CollapseProperties {
    options: CollapseOptions,
    collector: Box<dyn NameCollector>,
    resolver: Box<dyn ModuleResolver>,
    diagnostics: Arc<dyn DiagnosticHandler>,
    decisions: DecisionLog,
}

impl CollapseProperties {
    pub fn new(
        options: CollapseOptions,
        collector: Box<dyn NameCollector>,
        diagnostics: Arc<dyn DiagnosticHandler>,
    ) -> Self {
        Self {
            options,
            collector,
            resolver: Box::new(DefaultModuleResolver),
            diagnostics,
            decisions: DecisionLog::disabled(),
        }
    }

    pub fn with_module_resolver(mut self, resolver: Box<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_decision_log(mut self, decisions: DecisionLog) -> Self {
        self.decisions = decisions;
        self
    }

    pub fn options(&self) -> &CollapseOptions {
        &self.options
    }

    pub fn decision_log(&self) -> &DecisionLog {
        &self.decisions
    }

    pub fn decision_log_mut(&mut self) -> &mut DecisionLog {
        &mut self.decisions
    }

    /// Run over a forest the caller already collected for `ast`.
    pub fn collapse(&mut self, ast: &mut Ast, forest: &mut NameForest) -> Result<bool> {
        if self.options.property_collapse_level == PropertyCollapseLevel::None {
            debug!("property collapsing disabled");
            return Ok(false);
        }

        let dynamically_imported_modules = if self.options.tracks_dynamic_imports() {
            find_dynamically_imported_modules(ast, &self.options, self.resolver.as_ref())
        } else {
            FxHashSet::default()
        };

        let changed = {
            let mut collapser = Collapser {
                ast: &mut *ast,
                forest: &mut *forest,
                options: &self.options,
                diagnostics: self.diagnostics.as_ref(),
                decisions: &mut self.decisions,
                dynamically_imported_modules: &dynamically_imported_modules,
                logged_verdicts: FxHashSet::default(),
                changed: false,
            };
            let escaped = collapser.check_namespaces();
            let roots = collapser.forest.roots().to_vec();

            for &root in &roots {
                let alias = collapser.forest.name(root).base_name().to_string();
                collapser.flatten_references_to_collapsible_descendant_names(root, &alias, &escaped)?;
            }
            for &root in &roots {
                let alias = collapser.forest.name(root).base_name().to_string();
                collapser.collapse_declaration_of_name_and_descendants(root, &alias, &escaped)?;
            }

            debug!(
                names = collapser.forest.len(),
                escaped = escaped.len(),
                dynamic_imports = dynamically_imported_modules.len(),
                "collapsed properties"
            );
            collapser.changed
        };

        let marked = util::propagate_constant_annotations(ast);
        if marked > 0 {
            debug!(marked, "propagated constant annotations");
        }
        Ok(changed)
    }
}

impl CompilerPass for CollapseProperties {
    fn name(&self) -> &'static str {
        "collapse-properties"
    }

    fn run(&mut self, ast: &mut Ast) -> Result<bool> {
        let mut forest = self.collector.collect(ast);
        self.collapse(ast, &mut forest)
    }
}

/// State shared by the steps of one invocation.
pub(crate) struct Collapser<'a> {
    ast: &'a mut Ast,
    forest: &'a mut NameForest,
    options: &'a CollapseOptions,
    diagnostics: &'a dyn DiagnosticHandler,
    decisions: &'a mut DecisionLog,
    dynamically_imported_modules: &'a FxHashSet<String>,
    /// Names whose inlinability verdict is already in the decision log.
    logged_verdicts: FxHashSet<NameId>,
    changed: bool,
}

impl Collapser<'_> {
    fn log_decision(&mut self, name: NameId, message: impl FnOnce() -> String) {
        let forest = &*self.forest;
        self.decisions
            .log(|| format!("{}: {}", forest.name(name).full_name(), message()));
    }

    /// Both phases ask for the same verdicts; each is logged once.
    fn log_inlinability(&mut self, name: NameId, inlinability: Inlinability, message: &str) {
        if !self.logged_verdicts.insert(name) {
            return;
        }
        self.log_decision(name, || format!("inlinability {}: {}", inlinability, message));
    }

    fn report_change(&mut self, node: NodeId) {
        self.ast.report_change_to_enclosing_scope(node);
        self.changed = true;
    }

    fn warn(&self, code: DiagnosticCode, name: NameId, node: Option<NodeId>) {
        self.diagnostics
            .warning(code, self.forest.name(name).full_name(), node);
    }

    fn full_name(&self, name: NameId) -> String {
        self.forest.name(name).full_name().to_string()
    }

    fn alias_for(&self, parent_alias: &str, name: NameId) -> String {
        append_prop_for_alias(&*self.forest, parent_alias, self.forest.name(name).base_name())
    }

    fn can_collapse(&mut self, name: NameId) -> bool {
        let inlinability = self.forest.can_collapse_or_inline(name);
        if !inlinability.can_collapse() {
            self.log_inlinability(name, inlinability, "cannot collapse");
            return false;
        }

        if self.options.property_collapse_level == PropertyCollapseLevel::ModuleExport {
            let entry = self.forest.name(name);
            if !entry.is_module_export() {
                self.log_inlinability(
                    name,
                    inlinability,
                    "module export: cannot collapse",
                );
                return false;
            }
            if self.dynamically_imported_modules.contains(entry.base_name()) {
                self.log_inlinability(
                    name,
                    inlinability,
                    "dynamic module export: cannot collapse",
                );
                return false;
            }
        }

        self.log_inlinability(name, inlinability, "can collapse");
        true
    }

    fn can_eliminate(&self, name: NameId) -> bool {
        if !self.forest.can_eliminate(name) {
            return false;
        }
        self.forest.name(name).props().is_empty()
            || self.options.property_collapse_level != PropertyCollapseLevel::ModuleExport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::printer;
    use crate::diagnostics::CollectingDiagnosticHandler;
    use crate::namespace::{NameFlags, NameKind, RefType};

    struct NoNames;

    impl NameCollector for NoNames {
        fn collect(&self, _ast: &Ast) -> NameForest {
            NameForest::new()
        }
    }

    fn pass(options: CollapseOptions) -> (CollapseProperties, Arc<CollectingDiagnosticHandler>) {
        let handler = Arc::new(CollectingDiagnosticHandler::new());
        let pass = CollapseProperties::new(options, Box::new(NoNames), handler.clone())
            .with_decision_log(DecisionLog::buffered());
        (pass, handler)
    }

    /// `var a = {}; a.b = 1; use(a.b);`
    fn namespace_fixture() -> (Ast, NameForest) {
        let mut ast = Ast::new();
        let mut forest = NameForest::new();

        let empty = ast.new_object_lit(&[]);
        let decl = ast.new_var_decl("a", Some(empty));
        ast.push_statement(decl);
        let a_node = ast.first_child(decl).unwrap();

        let ab_decl = ast.new_qname("a.b");
        let one = ast.new_number(1.0);
        let assign = ast.new_assign(ab_decl, one);
        let stmt = ast.new_expr_result(assign);
        ast.push_statement(stmt);

        let ab_use = ast.new_qname("a.b");
        let callee = ast.new_name("use");
        let call = ast.new_call(callee, &[ab_use]);
        let stmt = ast.new_expr_result(call);
        ast.push_statement(stmt);

        let a = forest.get_or_create("a");
        forest.set_kind(a, NameKind::ObjectLit);
        forest.add_ref(a, a_node, RefType::Declaration);
        let ab = forest.get_or_create("a.b");
        forest.add_ref(ab, ab_decl, RefType::Declaration);
        forest.add_ref(ab, ab_use, RefType::OtherGet);
        (ast, forest)
    }

    #[test]
    fn test_collapses_simple_namespace() {
        let (mut ast, mut forest) = namespace_fixture();
        let (mut pass, handler) = pass(CollapseOptions::default());

        assert!(pass.collapse(&mut ast, &mut forest).unwrap());
        assert_eq!(printer::print(&ast), "var a$b = 1;\nuse(a$b);");
        assert_eq!(handler.warning_count(), 0);
        assert!(ast.has_changes());
    }

    #[test]
    fn test_level_none_is_a_no_op() {
        let (mut ast, mut forest) = namespace_fixture();
        let before = printer::print(&ast);
        let (mut pass, _) = pass(CollapseOptions::default().with_level(PropertyCollapseLevel::None));

        assert!(!pass.collapse(&mut ast, &mut forest).unwrap());
        assert_eq!(printer::print(&ast), before);
        assert!(pass.decision_log().lines().is_empty());
    }

    #[test]
    fn test_module_export_level_requires_exports() {
        let (mut ast, mut forest) = namespace_fixture();
        let ab = forest.get("a.b").unwrap();
        forest.insert_flags(ab, NameFlags::MODULE_EXPORT);
        let (mut pass, _) =
            pass(CollapseOptions::default().with_level(PropertyCollapseLevel::ModuleExport));

        pass.collapse(&mut ast, &mut forest).unwrap();
        assert_eq!(printer::print(&ast), "var a = {};\nvar a$b = 1;\nuse(a$b);");
        assert!(pass
            .decision_log()
            .lines()
            .iter()
            .any(|l| l == "a: inlinability INLINE_COMPLETELY: module export: cannot collapse"));
    }

    #[test]
    fn test_run_uses_collector() {
        let mut ast = Ast::new();
        let (mut pass, _) = pass(CollapseOptions::default());
        assert_eq!(pass.name(), "collapse-properties");
        assert!(!pass.run(&mut ast).unwrap());
    }
}
