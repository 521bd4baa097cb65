use crate::ast::Token;
use thiserror::Error;

/// Broken invariants of the name forest. User code never triggers these;
/// unsafe patterns in the program are reported as diagnostics instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollapseError {
    #[error("expected GETPROP flatten target for {name}, found {found}")]
    FlattenTargetNotGetProp { name: String, found: Token },

    #[error("expected a qualified name or object literal key for {name}, found {found}")]
    ExpectedQualifiedName { name: String, found: Token },

    #[error("unexpected child of OBJECTLIT: {found}")]
    UnexpectedObjectLitChild { found: Token },

    #[error("stubs for {name} must be added to a statement block, found {found}")]
    StubParentNotStatementBlock { name: String, found: Token },

    #[error("twinned declaration of {name} has no twin")]
    MissingTwin { name: String },

    #[error("static member {name} is not inside a class, found {found}")]
    StaticMemberOutsideClass { name: String, found: Token },

    #[error("simple stub declaration {name} is not an expression statement")]
    StubDeclarationNotExprResult { name: String },

    #[error("default value in the pattern extracting {name} has {children} children, expected 2")]
    MalformedDefaultValue { name: String, children: usize },

    #[error("reference to {name} is no longer in the tree")]
    DetachedReference { name: String },
}

pub type Result<T> = std::result::Result<T, CollapseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = CollapseError::FlattenTargetNotGetProp {
            name: "a.b".to_string(),
            found: Token::Name,
        };
        assert_eq!(err.to_string(), "expected GETPROP flatten target for a.b, found NAME");

        let err = CollapseError::UnexpectedObjectLitChild {
            found: Token::Number,
        };
        assert_eq!(err.to_string(), "unexpected child of OBJECTLIT: NUMBER");
    }
}
