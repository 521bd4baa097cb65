pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod namespace;
pub mod optimizer;

// Re-export the types most callers need
pub use ast::{Ast, JsDoc, NodeId, NodeProps, Token};
pub use config::{CollapseOptions, PropertyCollapseLevel};
pub use diagnostics::{
    CollectingDiagnosticHandler, Diagnostic, DiagnosticCode, DiagnosticHandler, DiagnosticLevel,
};
pub use errors::CollapseError;
pub use namespace::{NameCollector, NameForest};
pub use optimizer::{CollapseProperties, CompilerPass, DecisionLog};
