use bitflags::bitflags;
use id_arena::Id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle into an [`Ast`](super::Ast) arena.
///
/// Handles survive detachment and replacement: a detached node keeps its id
/// and simply loses its parent link.
pub type NodeId = Id<Node>;

/// Syntactic node kinds.
///
/// The tree is homogeneous: every node carries a token, an optional string
/// payload and an ordered list of children. Shapes follow the classic JS
/// compiler layout:
///
/// ```text
/// GETPROP(prop)          [receiver]
/// NAME(id)               [initializer?]        (initializer only under VAR/LET/CONST)
/// ASSIGN                 [lhs, rhs]
/// FUNCTION               [NAME, PARAM_LIST, BLOCK | expr]
/// CLASS                  [NAME | EMPTY, superclass | EMPTY, CLASS_MEMBERS]
/// MEMBER_FUNCTION_DEF(m) [FUNCTION]
/// STRING_KEY(k)          [value]
/// DESTRUCTURING_LHS      [OBJECT_PATTERN, rhs]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    Script,
    Block,
    ExprResult,
    Var,
    Let,
    Const,
    Name,
    GetProp,
    GetElem,
    Assign,
    Or,
    And,
    Coalesce,
    Add,
    Sheq,
    Not,
    Void,
    Hook,
    Call,
    OptChainCall,
    New,
    Function,
    ParamList,
    Return,
    Class,
    ClassMembers,
    MemberFunctionDef,
    GetterDef,
    SetterDef,
    ComputedProp,
    ObjectLit,
    StringKey,
    ObjectSpread,
    ObjectPattern,
    ObjectRest,
    DestructuringLhs,
    DefaultValue,
    ArrayLit,
    Number,
    String,
    This,
    Super,
    Null,
    True,
    False,
    Empty,
    If,
    DelProp,
    DynamicImport,
}

impl Token {
    pub fn is_name_declaration(self) -> bool {
        matches!(self, Token::Var | Token::Let | Token::Const)
    }

    pub fn is_statement_block(self) -> bool {
        matches!(self, Token::Script | Token::Block)
    }

    pub fn is_call(self) -> bool {
        matches!(self, Token::Call | Token::OptChainCall)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Token::Script => "SCRIPT",
            Token::Block => "BLOCK",
            Token::ExprResult => "EXPR_RESULT",
            Token::Var => "VAR",
            Token::Let => "LET",
            Token::Const => "CONST",
            Token::Name => "NAME",
            Token::GetProp => "GETPROP",
            Token::GetElem => "GETELEM",
            Token::Assign => "ASSIGN",
            Token::Or => "OR",
            Token::And => "AND",
            Token::Coalesce => "COALESCE",
            Token::Add => "ADD",
            Token::Sheq => "SHEQ",
            Token::Not => "NOT",
            Token::Void => "VOID",
            Token::Hook => "HOOK",
            Token::Call => "CALL",
            Token::OptChainCall => "OPTCHAIN_CALL",
            Token::New => "NEW",
            Token::Function => "FUNCTION",
            Token::ParamList => "PARAM_LIST",
            Token::Return => "RETURN",
            Token::Class => "CLASS",
            Token::ClassMembers => "CLASS_MEMBERS",
            Token::MemberFunctionDef => "MEMBER_FUNCTION_DEF",
            Token::GetterDef => "GETTER_DEF",
            Token::SetterDef => "SETTER_DEF",
            Token::ComputedProp => "COMPUTED_PROP",
            Token::ObjectLit => "OBJECTLIT",
            Token::StringKey => "STRING_KEY",
            Token::ObjectSpread => "OBJECT_SPREAD",
            Token::ObjectPattern => "OBJECT_PATTERN",
            Token::ObjectRest => "OBJECT_REST",
            Token::DestructuringLhs => "DESTRUCTURING_LHS",
            Token::DefaultValue => "DEFAULT_VALUE",
            Token::ArrayLit => "ARRAYLIT",
            Token::Number => "NUMBER",
            Token::String => "STRING",
            Token::This => "THIS",
            Token::Super => "SUPER",
            Token::Null => "NULL",
            Token::True => "TRUE",
            Token::False => "FALSE",
            Token::Empty => "EMPTY",
            Token::If => "IF",
            Token::DelProp => "DELPROP",
            Token::DynamicImport => "DYNAMIC_IMPORT",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Per-node annotations carried across rewrites.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NodeProps: u8 {
        /// The name (or property) is known to hold a constant value.
        const IS_CONSTANT_NAME = 1 << 0;
        /// A call whose callee is not invoked with an implicit receiver.
        const FREE_CALL = 1 << 1;
        /// `static` class member.
        const STATIC_MEMBER = 1 << 2;
        /// Object literal key written as a string literal.
        const QUOTED = 1 << 3;
        /// Arrow function.
        const ARROW = 1 << 4;
    }
}

bitflags! {
    /// The subset of documentation annotations the collapse pass consults.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct JsDoc: u8 {
        const CONST = 1 << 0;
        /// An explicit receiver type (`@this`).
        const THIS_TYPE = 1 << 1;
        const CONSTRUCTOR = 1 << 2;
        const INTERFACE = 1 << 3;
        const NO_COLLAPSE = 1 << 4;
    }
}

impl JsDoc {
    pub fn has_const_annotation(self) -> bool {
        self.contains(JsDoc::CONST)
    }

    pub fn has_this_type(self) -> bool {
        self.contains(JsDoc::THIS_TYPE)
    }

    pub fn is_constructor_or_interface(self) -> bool {
        self.intersects(JsDoc::CONSTRUCTOR | JsDoc::INTERFACE)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub token: Token,
    pub string: Option<String>,
    pub number: Option<f64>,
    pub props: NodeProps,
    pub jsdoc: Option<JsDoc>,
    /// Dotted name this node stood for before it was flattened.
    pub original_name: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub fn new(token: Token) -> Self {
        Self {
            token,
            string: None,
            number: None,
            props: NodeProps::empty(),
            jsdoc: None,
            original_name: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_string(token: Token, string: impl Into<String>) -> Self {
        Self {
            string: Some(string.into()),
            ..Self::new(token)
        }
    }

    pub fn has_prop(&self, prop: NodeProps) -> bool {
        self.props.contains(prop)
    }
}
