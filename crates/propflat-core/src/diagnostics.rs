//! Warnings reported by the collapse pass.
//!
//! None of these are fatal: the pass downgrades its treatment of the
//! offending name and carries on.

use crate::ast::NodeId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// A namespace value was captured under another binding.
    PartialNamespace,
    /// A namespace was reassigned or had a property deleted after it was
    /// initialized.
    NamespaceRedefined,
    /// A hoisted function reads its own receiver.
    ReceiverAffectedByCollapse,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::PartialNamespace => "JSC_PARTIAL_NAMESPACE",
            DiagnosticCode::NamespaceRedefined => "JSC_NAMESPACE_REDEFINED",
            DiagnosticCode::ReceiverAffectedByCollapse => "JSC_RECEIVER_AFFECTED_BY_COLLAPSE",
        }
    }

    pub fn level(self) -> DiagnosticLevel {
        DiagnosticLevel::Warning
    }

    /// Render the message for the name the diagnostic is about.
    pub fn format(self, name: &str) -> String {
        match self {
            DiagnosticCode::PartialNamespace => format!(
                "Partial alias created for namespace {name}, possibly due to await/yield transpilation.\n\
                 This may prevent optimization of anything nested under this namespace."
            ),
            DiagnosticCode::NamespaceRedefined => {
                format!("namespace {name} should not be redefined")
            }
            DiagnosticCode::ReceiverAffectedByCollapse => format!(
                "Receiver reference in function {name} changes meaning when namespace is collapsed.\n \
                 Consider annotating @nocollapse; however, other properties on the receiver may \
                 still be collapsed."
            ),
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub message: String,
    /// Where in the tree the problem was found.
    pub node: Option<NodeId>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, name: &str, node: Option<NodeId>) -> Self {
        Self {
            level: code.level(),
            code,
            message: code.format(name),
            node,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Info => "info",
        };
        write!(f, "{}[{}]: {}", level, self.code, self.message)
    }
}

/// Sink for diagnostics. Shared behind `Arc` by the passes that report.
pub trait DiagnosticHandler: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    fn warning(&self, code: DiagnosticCode, name: &str, node: Option<NodeId>) {
        self.report(Diagnostic::new(code, name, node));
    }

    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn error_count(&self) -> usize;

    fn warning_count(&self) -> usize;

    fn get_diagnostics(&self) -> Vec<Diagnostic>;
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnosticHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics carrying `code`, in report order.
    pub fn with_code(&self, code: DiagnosticCode) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.code == code)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }
}

impl DiagnosticHandler for CollectingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::debug!(code = %diagnostic.code, "{}", diagnostic.message);
        self.diagnostics.lock().push(diagnostic);
    }

    fn error_count(&self) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .count()
    }

    fn warning_count(&self) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .count()
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnosticHandler;

impl DiagnosticHandler for NullDiagnosticHandler {
    fn report(&self, _diagnostic: Diagnostic) {}

    fn error_count(&self) -> usize {
        0
    }

    fn warning_count(&self) -> usize {
        0
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_collecting_handler() {
        let handler = Arc::new(CollectingDiagnosticHandler::new());
        let shared: Arc<dyn DiagnosticHandler> = handler.clone();

        shared.warning(DiagnosticCode::NamespaceRedefined, "a.b", None);
        shared.warning(DiagnosticCode::PartialNamespace, "a", None);

        assert_eq!(handler.warning_count(), 2);
        assert!(!handler.has_errors());
        let redefined = handler.with_code(DiagnosticCode::NamespaceRedefined);
        assert_eq!(redefined.len(), 1);
        assert_eq!(redefined[0].message, "namespace a.b should not be redefined");

        handler.clear();
        assert!(handler.get_diagnostics().is_empty());
    }

    #[test]
    fn test_codes_and_display() {
        let diagnostic = Diagnostic::new(DiagnosticCode::ReceiverAffectedByCollapse, "a.f", None);
        assert_eq!(diagnostic.level, DiagnosticLevel::Warning);
        assert!(diagnostic
            .message
            .starts_with("Receiver reference in function a.f changes meaning"));
        assert!(diagnostic
            .to_string()
            .starts_with("warning[JSC_RECEIVER_AFFECTED_BY_COLLAPSE]: "));
        assert!(DiagnosticCode::PartialNamespace
            .format("ns")
            .contains("Partial alias created for namespace ns"));
    }

    #[test]
    fn test_null_handler_drops_everything() {
        let handler = NullDiagnosticHandler;
        handler.warning(DiagnosticCode::PartialNamespace, "a", None);
        assert_eq!(handler.warning_count(), 0);
        assert!(handler.get_diagnostics().is_empty());
    }
}
