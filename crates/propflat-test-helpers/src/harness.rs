//! One-call drivers for the collapse pass.

use crate::collector::FixtureCollector;
use crate::fixture::parse;
use propflat_core::ast::{printer, Ast};
use propflat_core::diagnostics::{
    CollectingDiagnosticHandler, Diagnostic, DiagnosticCode, DiagnosticHandler,
};
use propflat_core::errors::CollapseError;
use propflat_core::namespace::{NameCollector, NameForest};
use propflat_core::optimizer::{CollapseProperties, DecisionLog};
use propflat_core::CollapseOptions;
use std::sync::Arc;

/// Everything one run produced.
pub struct CollapseRun {
    pub ast: Ast,
    /// The rewritten tree, printed.
    pub output: String,
    pub changed: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub decisions: Vec<String>,
}

impl CollapseRun {
    pub fn warnings(&self, code: DiagnosticCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    pub fn logged(&self, line: &str) -> bool {
        self.decisions.iter().any(|l| l == line)
    }
}

/// Send `tracing` output to the test writer, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Collapse `source` with default options.
pub fn run_collapse(source: &str) -> CollapseRun {
    run_collapse_with(source, CollapseOptions::default(), |_, _| {})
}

/// Collapse `source` after `configure` has adjusted the collected forest.
pub fn run_collapse_with(
    source: &str,
    options: CollapseOptions,
    configure: impl FnOnce(&Ast, &mut NameForest),
) -> CollapseRun {
    try_run_collapse_with(source, options, configure)
        .unwrap_or_else(|e| panic!("collapse failed: {}\n{}", e, source))
}

pub fn try_run_collapse_with(
    source: &str,
    options: CollapseOptions,
    configure: impl FnOnce(&Ast, &mut NameForest),
) -> Result<CollapseRun, CollapseError> {
    init_tracing();
    let mut ast = parse(source);
    let mut forest = FixtureCollector.collect(&ast);
    configure(&ast, &mut forest);

    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let mut pass = CollapseProperties::new(options, Box::new(FixtureCollector), handler.clone())
        .with_decision_log(DecisionLog::buffered());
    let changed = pass.collapse(&mut ast, &mut forest)?;

    Ok(CollapseRun {
        output: printer::print(&ast),
        ast,
        changed,
        diagnostics: handler.get_diagnostics(),
        decisions: pass.decision_log_mut().take_lines(),
    })
}
