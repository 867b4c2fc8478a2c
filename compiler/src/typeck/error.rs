//! Type Error Definitions
//!
//! Every error the checker can raise. Errors are fatal on first occurrence:
//! there is no recovery and no multi-error reporting, so each error carries
//! the single source span it was raised at plus pretty-printed type context.

use crate::errors::span::Span;
use std::fmt;

/// What kind of name failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Value,
    Field,
    Constructor,
    Module,
    TypeName,
}

impl NameKind {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            NameKind::Value => "value",
            NameKind::Field => "record field",
            NameKind::Constructor => "constructor",
            NameKind::Module => "module",
            NameKind::TypeName => "type",
        }
    }
}

/// A type error
#[derive(Debug, Clone)]
pub struct TypeError {
    /// Where the error was raised
    pub span: Span,
    pub kind: ErrorKind,
}

/// Type error variants
///
/// Type expressions are rendered at construction time; the checker calls the
/// pretty-printer only here.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Wrapper attached at the outermost unification call site so the error
    /// carries both the expected/actual pair and the innermost mismatch
    CheckFailed {
        expected: String,
        actual: String,
        inner: Box<ErrorKind>,
    },

    /// Structural mismatch
    CannotUnify { expected: String, actual: String },

    /// A variable's instance was re-established while it was being resolved
    /// against another type
    RecursiveVariable { var: String },

    /// Unknown identifier
    Unbound { kind: NameKind, name: String },

    /// Both sides of an or-pattern must bind the same names
    VariableOnOneSide { name: String },

    /// A declaration appeared inside an or-pattern arm
    PatternDeclaration { kind: &'static str, name: String },

    /// Empty record literal or pattern
    EmptyRecord,

    /// Field does not belong to the expected record type
    WrongRecordField { field: String, record: String },

    /// Same field assigned twice in a record literal
    RepeatedField { field: String },

    /// Record literal without extension leaves fields unassigned
    MissingFields { fields: Vec<String> },

    /// No unique implicit instance matches at a toplevel binding
    NoInstance { ty: String },

    /// Constructor with an argument-taking arity used without an argument
    ArgumentExpected { ctor: String },

    /// Type constructor applied to the wrong number of parameters
    CtorArity {
        name: String,
        expected: usize,
        given: usize,
    },

    /// `Applied` long identifiers are not supported
    UnsupportedPath { path: String },

    /// Internal invariant: an unresolved placeholder escaped elaboration
    UnifiableExpr,

    /// Internal invariant: a placeholder was expected and not found
    NoUnifiableExpr,

    /// Internal invariant: a declaration had the wrong shape for the
    /// operation performed on it
    WrongTypeDescription { expected: &'static str, decl: String },
}

impl TypeError {
    /// Create a new error
    pub fn new(span: Span, kind: ErrorKind) -> Self {
        Self { span, kind }
    }

    /// Where the error was raised
    pub fn span(&self) -> Span {
        self.span
    }

    /// Stable error code for tooling
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// The innermost cause, unwrapping `CheckFailed`
    pub fn root_cause(&self) -> &ErrorKind {
        let mut kind = &self.kind;
        while let ErrorKind::CheckFailed { inner, .. } = kind {
            kind = inner;
        }
        kind
    }
}

impl ErrorKind {
    /// Stable error code for tooling
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::CheckFailed { .. } => "E0001",
            ErrorKind::CannotUnify { .. } => "E0002",
            ErrorKind::RecursiveVariable { .. } => "E0003",
            ErrorKind::Unbound { .. } => "E0004",
            ErrorKind::VariableOnOneSide { .. } => "E0005",
            ErrorKind::PatternDeclaration { .. } => "E0006",
            ErrorKind::EmptyRecord => "E0007",
            ErrorKind::WrongRecordField { .. } => "E0008",
            ErrorKind::RepeatedField { .. } => "E0009",
            ErrorKind::MissingFields { .. } => "E0010",
            ErrorKind::NoInstance { .. } => "E0011",
            ErrorKind::ArgumentExpected { .. } => "E0012",
            ErrorKind::CtorArity { .. } => "E0013",
            ErrorKind::UnsupportedPath { .. } => "E0014",
            ErrorKind::UnifiableExpr => "E9001",
            ErrorKind::NoUnifiableExpr => "E9002",
            ErrorKind::WrongTypeDescription { .. } => "E9003",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::CheckFailed { expected, actual, inner } => {
                write!(
                    f,
                    "expected type {}, found {}: {}",
                    expected, actual, inner
                )
            }
            ErrorKind::CannotUnify { expected, actual } => {
                write!(f, "cannot unify {} with {}", expected, actual)
            }
            ErrorKind::RecursiveVariable { var } => {
                write!(f, "recursive type: {} occurs in its own instance", var)
            }
            ErrorKind::Unbound { kind, name } => {
                write!(f, "unbound {} '{}'", kind.description(), name)
            }
            ErrorKind::VariableOnOneSide { name } => {
                write!(
                    f,
                    "variable '{}' must appear on both sides of the or-pattern",
                    name
                )
            }
            ErrorKind::PatternDeclaration { kind, name } => {
                write!(f, "cannot declare {} '{}' inside a pattern", kind, name)
            }
            ErrorKind::EmptyRecord => write!(f, "record must have at least one field"),
            ErrorKind::WrongRecordField { field, record } => {
                write!(f, "field '{}' does not belong to record type {}", field, record)
            }
            ErrorKind::RepeatedField { field } => {
                write!(f, "field '{}' is assigned more than once", field)
            }
            ErrorKind::MissingFields { fields } => {
                write!(f, "record literal leaves fields unassigned: {}", fields.join(", "))
            }
            ErrorKind::NoInstance { ty } => {
                write!(f, "no implicit instance for {}", ty)
            }
            ErrorKind::ArgumentExpected { ctor } => {
                write!(f, "constructor '{}' expects an argument", ctor)
            }
            ErrorKind::CtorArity { name, expected, given } => {
                write!(
                    f,
                    "type '{}' expects {} parameter(s), found {}",
                    name, expected, given
                )
            }
            ErrorKind::UnsupportedPath { path } => {
                write!(f, "path application '{}' is not supported", path)
            }
            ErrorKind::UnifiableExpr => {
                write!(f, "internal: unresolved implicit placeholder in elaborated tree")
            }
            ErrorKind::NoUnifiableExpr => {
                write!(f, "internal: expected an implicit placeholder")
            }
            ErrorKind::WrongTypeDescription { expected, decl } => {
                write!(f, "internal: declaration '{}' is not a {}", decl, expected)
            }
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for TypeError {}
