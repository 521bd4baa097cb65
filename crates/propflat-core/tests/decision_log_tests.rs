use propflat_core::ast::{printer, NodeProps, Token};
use propflat_core::optimizer::{run_passes, PropagateConstantAnnotations};
use propflat_core::{
    CollapseOptions, CollapseProperties, CollectingDiagnosticHandler, CompilerPass, DecisionLog,
    DiagnosticHandler,
};
use propflat_test_helpers::{init_tracing, parse, run_collapse, FixtureCollector};
use std::sync::Arc;

// ============================================================================
// Decision trail
// ============================================================================

#[test]
fn test_decision_trail_for_simple_namespace() {
    let run = run_collapse("var a = {}; a.b = 1; use(a.b);");

    insta::assert_snapshot!(run.decisions.join("\n"), @r"
    a.b: inlinability INLINE_BUT_KEEP_DECLARATION: can collapse
    a.b: will flatten references
    a: inlinability INLINE_COMPLETELY: can collapse
    a: collapsing
    a: a: updating variable declaration
    a: collapsing descendants
    a.b: child name inlinability: DO_NOT_INLINE: will not collapse child names
    a.b: collapsing
    a.b: a.b: updating assignment
    use: child name inlinability: DO_NOT_INLINE: will not collapse child names
    use: inlinability INLINE_COMPLETELY: can collapse
    use: collapsing
    use: no global declaration found
    ");
}

#[test]
fn test_each_verdict_is_logged_once() {
    let run = run_collapse("var a = {}; a.b = {}; a.b.c = 1; a.d = 2; use(a.b.c, a.d);");

    for name in ["a", "a.b", "a.b.c", "a.d"] {
        let prefix = format!("{}: inlinability ", name);
        let count = run.decisions.iter().filter(|l| l.starts_with(&prefix)).count();
        assert_eq!(count, 1, "{}", name);
    }
}

#[test]
fn test_flatten_decisions_precede_collapse_decisions() {
    let run = run_collapse("var a = {}; a.b = {}; a.b.c = 1; use(a.b.c);");

    let last_flatten = run
        .decisions
        .iter()
        .rposition(|l| l.ends_with("will flatten references"))
        .expect("flatten decision");
    let first_collapse = run
        .decisions
        .iter()
        .position(|l| l.ends_with(": collapsing"))
        .expect("collapse decision");
    assert!(last_flatten < first_collapse);
}

#[test]
fn test_decision_log_written_to_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("collapse.log");

    let mut ast = parse("var a = {}; a.b = 1; use(a.b);");
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let mut pass = CollapseProperties::new(
        CollapseOptions::default(),
        Box::new(FixtureCollector),
        handler,
    )
    .with_decision_log(DecisionLog::to_file(&path).unwrap());

    assert!(pass.run(&mut ast).unwrap());
    pass.decision_log_mut().flush().unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("a.b: inlinability INLINE_BUT_KEEP_DECLARATION: can collapse\n"));
    assert!(written.ends_with("use: no global declaration found\n"));
    assert_eq!(written.lines().count(), 13);
    assert!(pass.decision_log().lines().is_empty());
}

#[test]
fn test_disabled_log_records_nothing() {
    let mut ast = parse("var a = {}; a.b = 1;");
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let mut pass = CollapseProperties::new(
        CollapseOptions::default(),
        Box::new(FixtureCollector),
        handler,
    );

    assert!(pass.run(&mut ast).unwrap());
    assert!(!pass.decision_log().is_enabled());
    assert!(pass.decision_log().lines().is_empty());
}

// ============================================================================
// Pass pipeline
// ============================================================================

#[test]
fn test_pipeline_runs_passes_in_order() {
    init_tracing();
    let mut ast = parse("var a = {}; /** @const */ a.b = 1; use(a.b);");
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let mut passes: Vec<Box<dyn CompilerPass>> = vec![
        Box::new(CollapseProperties::new(
            CollapseOptions::default(),
            Box::new(FixtureCollector),
            handler.clone(),
        )),
        Box::new(PropagateConstantAnnotations::new()),
    ];

    assert!(run_passes(&mut ast, &mut passes).unwrap());
    assert_eq!(printer::print(&ast), "var a$b = 1;\nuse(a$b);");
    assert_eq!(handler.warning_count(), 0);
    assert!(ast
        .descendants(ast.root())
        .into_iter()
        .filter(|&n| ast.is(n, Token::Name) && ast.string(n) == "a$b")
        .all(|n| ast.has_prop(n, NodeProps::IS_CONSTANT_NAME)));

    // Nothing left to do on a second run.
    assert!(!run_passes(&mut ast, &mut passes).unwrap());
}

#[test]
fn test_pass_names() {
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let collapse = CollapseProperties::new(CollapseOptions::default(), Box::new(FixtureCollector), handler);

    assert_eq!(collapse.name(), "collapse-properties");
    assert_eq!(PropagateConstantAnnotations::new().name(), "propagate-constant-annotations");
}
