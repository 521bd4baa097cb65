use indoc::indoc;
use propflat_core::diagnostics::DiagnosticCode;
use propflat_test_helpers::run_collapse;

// ============================================================================
// Aliased namespaces
// ============================================================================

#[test]
fn test_aliased_namespace_keeps_its_properties() {
    let source = indoc! {"
        var a = {b: 0};
        var c = a;
        c.b = 5;
        use(a.b);
    "};

    let run = run_collapse(source);

    assert_eq!(
        run.output,
        "var a = {b: 0};\nvar c = a;\nc.b = 5;\nuse(a.b);"
    );
    assert_eq!(run.warnings(DiagnosticCode::PartialNamespace), 1);
    assert!(run.logged("a: escapes"));
    assert!(run.logged("a: escapes: will not collapse"));
    assert!(!run.changed);
}

#[test]
fn test_partial_namespace_message_names_the_namespace() {
    let run = run_collapse("var a = {}; a.b = 1; var c = a;");

    let diagnostic = run
        .diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::PartialNamespace)
        .expect("partial namespace warning");
    assert!(diagnostic.message.contains("namespace a"));
    assert!(run.output.contains("a.b = 1;"));
}

#[test]
fn test_aliased_constructor_still_collapses_statics() {
    let source = indoc! {"
        function F() {}
        F.create = function() { return new F(); };
        use(F);
    "};

    let run = run_collapse(source);

    assert_eq!(
        run.output,
        "function F() {}\nvar F$create = function() { return new F(); };\nuse(F);"
    );
    assert_eq!(run.diagnostics.len(), 0);
}

#[test]
fn test_destructuring_rest_aliases_namespace() {
    let run = run_collapse("var a = {}; a.b = 1; const {b, ...rest} = a;");

    assert_eq!(run.warnings(DiagnosticCode::PartialNamespace), 1);
    assert_eq!(
        run.output,
        "var a = {};\na.b = 1;\nconst {b: b, ...rest} = a;"
    );
}

// ============================================================================
// Redefinition
// ============================================================================

#[test]
fn test_redefined_namespace_warns() {
    let run = run_collapse("var a = {}; a.b = {}; a.b = {};");

    assert_eq!(run.warnings(DiagnosticCode::NamespaceRedefined), 1);
    assert_eq!(run.output, "var a$b = {};\na$b = {};");
}

#[test]
fn test_or_default_reinit_is_safe() {
    let run = run_collapse("var a = {}; a = a || {}; a.b = 1;");

    assert_eq!(run.diagnostics.len(), 0);
    // Two sets of `a`, so its children stay where they are.
    assert_eq!(run.output, "var a = {};\na = a || {};\na.b = 1;");
}

#[test]
fn test_self_defaulting_namespace_collapses() {
    let run = run_collapse("a = a || {}; a.b = 1;");

    assert_eq!(run.diagnostics.len(), 0);
    assert_eq!(run.output, "a = a || {};\nvar a$b = 1;");
}

#[test]
fn test_deleted_namespace_property_warns() {
    let run = run_collapse("var a = {}; a.b = {}; delete a.b;");

    assert_eq!(run.warnings(DiagnosticCode::NamespaceRedefined), 1);
    assert_eq!(run.output, "var a = {};\na.b = {};\ndelete a.b;");
    assert!(!run.changed);
}

#[test]
fn test_deleted_property_is_not_collapsed() {
    let run = run_collapse("var a = {}; a.b = 1; delete a.b; use(a.b);");

    assert_eq!(run.output, "var a = {};\na.b = 1;\ndelete a.b;\nuse(a.b);");
    assert!(run.logged("a.b: inlinability DO_NOT_INLINE: cannot collapse"));
}

#[test]
fn test_redefinition_message() {
    let run = run_collapse("var a = {}; a.b = {}; a.b = {};");

    let diagnostic = &run.diagnostics[0];
    assert_eq!(diagnostic.message, "namespace a.b should not be redefined");
    assert_eq!(diagnostic.to_string(), "warning[JSC_NAMESPACE_REDEFINED]: namespace a.b should not be redefined");
}
