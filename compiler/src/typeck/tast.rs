//! Elaborated Syntax Tree
//!
//! The checker's output: the parsed tree with every expression and pattern
//! node annotated with its inferred type, constructor and field references
//! resolved to declaration indices, and implicit arguments made explicit
//! (placeholder applications rewritten to instance references, or bound as
//! implicit function parameters).

use crate::ast::{Explicitness, Ident, Path};
use crate::errors::span::Span;

use super::types::{DeclId, ImplicitId, TypeId};

/// An elaborated statement
#[derive(Debug, Clone)]
pub struct TStmt {
    pub kind: TStmtKind,
    pub span: Span,
}

/// Elaborated statement variants
#[derive(Debug, Clone)]
pub enum TStmtKind {
    /// Value binding
    Value(TPat, TExpr),
    /// Instance declaration; the binding also entered the instance table
    Instance(Ident, TExpr),
    /// Registered type declaration
    TypeDecl(DeclId),
    /// Module definition with its elaborated body
    Module(Ident, Vec<TStmt>),
    /// Module alias
    ModuleAlias(Ident, Path),
    /// Opened module
    Open(Path),
}

/// An elaborated expression
#[derive(Debug, Clone)]
pub struct TExpr {
    pub kind: TExprKind,
    /// Inferred type
    pub ty: TypeId,
    pub span: Span,
}

/// Elaborated expression variants
#[derive(Debug, Clone)]
pub enum TExprKind {
    /// Variable reference
    Var(Path),
    /// Integer literal
    Int(i64),
    /// Function literal
    Fun(TPat, Box<TExpr>, Explicitness),
    /// Application; implicit arguments appear as ordinary arguments whose
    /// nodes were synthesized by the checker
    Apply(Box<TExpr>, Vec<TExpr>),
    /// Sequencing
    Seq(Box<TExpr>, Box<TExpr>),
    /// Let binding
    Let(TPat, Box<TExpr>, Box<TExpr>),
    /// Tuple literal
    Tuple(Vec<TExpr>),
    /// Match expression
    Match(Box<TExpr>, Vec<(TPat, TExpr)>),
    /// Field projection, with the field's declaration and index resolved
    Field(Box<TExpr>, Path, DeclId, usize),
    /// Record literal; fields carry their declaration index
    Record {
        fields: Vec<(Ident, usize, TExpr)>,
        extends: Option<Box<TExpr>>,
    },
    /// Constructor application
    Ctor(Path, Option<Box<TExpr>>),
    /// An implicit-argument placeholder. Transient: `check_binding` rewrites
    /// every placeholder before the enclosing binding is returned.
    Implicit(ImplicitId),
}

/// An elaborated pattern
#[derive(Debug, Clone)]
pub struct TPat {
    pub kind: TPatKind,
    /// Type the pattern matches
    pub ty: TypeId,
    pub span: Span,
}

/// Elaborated pattern variants
#[derive(Debug, Clone)]
pub enum TPatKind {
    /// Wildcard
    Any,
    /// Name binding
    Var(Ident),
    /// Tuple pattern
    Tuple(Vec<TPat>),
    /// Or-pattern
    Or(Box<TPat>, Box<TPat>),
    /// Integer literal pattern
    Int(i64),
    /// Record pattern; fields carry their declaration index
    Record(Vec<(Ident, usize, TPat)>),
    /// Constructor pattern
    Ctor(Path, Option<Box<TPat>>),
}

impl TExpr {
    /// Walk the expression tree, calling `f` on every node
    pub fn walk(&self, f: &mut impl FnMut(&TExpr)) {
        f(self);
        match &self.kind {
            TExprKind::Var(_) | TExprKind::Int(_) | TExprKind::Implicit(_) => {}
            TExprKind::Fun(_, body, _) => body.walk(f),
            TExprKind::Apply(func, args) => {
                func.walk(f);
                for a in args {
                    a.walk(f);
                }
            }
            TExprKind::Seq(e1, e2) => {
                e1.walk(f);
                e2.walk(f);
            }
            TExprKind::Let(_, value, body) => {
                value.walk(f);
                body.walk(f);
            }
            TExprKind::Tuple(items) => {
                for e in items {
                    e.walk(f);
                }
            }
            TExprKind::Match(scrutinee, arms) => {
                scrutinee.walk(f);
                for (_, body) in arms {
                    body.walk(f);
                }
            }
            TExprKind::Field(e, ..) => e.walk(f),
            TExprKind::Record { fields, extends } => {
                if let Some(ext) = extends {
                    ext.walk(f);
                }
                for (_, _, e) in fields {
                    e.walk(f);
                }
            }
            TExprKind::Ctor(_, arg) => {
                if let Some(a) = arg {
                    a.walk(f);
                }
            }
        }
    }
}
