//! Abstract Syntax Tree Definitions
//!
//! The parsed AST handed to the type checker by the parsing stage. Brume is
//! an ML-family expression language: programs are sequences of top-level
//! statements (value bindings, instance declarations, type declarations,
//! modules, opens) over a small expression and pattern grammar.
//!
//! The checker never constructs these nodes itself; it consumes them and
//! produces the elaborated tree in `typeck::tast`.

use crate::errors::span::Span;
use std::fmt;

/// A simple identifier with its source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// Name text (non-empty)
    pub name: String,
    /// Source span
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A module-qualified identifier path
///
/// `Applied` can be produced by pathological inputs only; every consumer in
/// the checker rejects it with an informative error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Path {
    /// An unqualified name: `x`
    Bare(Ident),
    /// A qualified name: `M.N.x`
    Dotted(Box<Path>, Ident),
    /// A path applied to a path: `M(N)`
    Applied(Box<Path>, Box<Path>),
}

impl Path {
    /// Shorthand for an unqualified path
    pub fn bare(name: impl Into<String>, span: Span) -> Self {
        Path::Bare(Ident::new(name, span))
    }

    /// Span of the whole path
    pub fn span(&self) -> Span {
        match self {
            Path::Bare(id) => id.span,
            Path::Dotted(prefix, id) => prefix.span().to(id.span),
            Path::Applied(f, x) => f.span().to(x.span()),
        }
    }

    /// The final name component, if the path is not `Applied`
    pub fn last(&self) -> Option<&Ident> {
        match self {
            Path::Bare(id) => Some(id),
            Path::Dotted(_, id) => Some(id),
            Path::Applied(..) => None,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Bare(id) => write!(f, "{}", id),
            Path::Dotted(prefix, id) => write!(f, "{}.{}", prefix, id),
            Path::Applied(func, arg) => write!(f, "{}({})", func, arg),
        }
    }
}

/// Whether a function parameter is passed explicitly or supplied by
/// instance lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Explicitness {
    Explicit,
    Implicit,
}

/// A parsed type annotation
#[derive(Debug, Clone)]
pub struct TypeAnnot {
    pub kind: TypeAnnotKind,
    pub span: Span,
}

/// Type annotation variants
#[derive(Debug, Clone)]
pub enum TypeAnnotKind {
    /// A named type variable: `'a`
    Var(Ident),
    /// Function type: `a -> b` or `{a} -> b` for implicit parameters
    Arrow {
        dom: Box<TypeAnnot>,
        cod: Box<TypeAnnot>,
        explicitness: Explicitness,
    },
    /// Tuple type: `(a, b)`; the empty tuple is the unit type
    Tuple(Vec<TypeAnnot>),
    /// Named type constructor application: `list(int)`
    Ctor { name: Path, params: Vec<TypeAnnot> },
    /// Prenex quantifier: `forall 'a. t`
    Poly { vars: Vec<Ident>, body: Box<TypeAnnot> },
}

/// A pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

/// Pattern variants
#[derive(Debug, Clone)]
pub enum PatternKind {
    /// Wildcard: `_`
    Any,
    /// Name binding
    Var(Ident),
    /// Type-annotated pattern: `(p : t)`
    Constraint {
        pattern: Box<Pattern>,
        annot: TypeAnnot,
    },
    /// Tuple pattern
    Tuple(Vec<Pattern>),
    /// Alternative patterns: `p | q`; both sides must bind the same names
    Or(Box<Pattern>, Box<Pattern>),
    /// Integer literal pattern
    Int(i64),
    /// Record pattern: `{x; y = p}`
    Record(Vec<(Ident, Pattern)>),
    /// Constructor pattern: `Some(p)` or `None`
    Ctor(Path, Option<Box<Pattern>>),
}

/// An expression
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression variants
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Variable reference
    Var(Path),
    /// Integer literal
    Int(i64),
    /// Function literal; implicit functions are introduced by the checker
    /// when abstracting over unresolved instance arguments
    Fun {
        param: Box<Pattern>,
        body: Box<Expr>,
        explicitness: Explicitness,
    },
    /// Application of a function to one or more arguments
    Apply { func: Box<Expr>, args: Vec<Expr> },
    /// Sequencing: `e1; e2` where `e1 : unit`
    Seq(Box<Expr>, Box<Expr>),
    /// Let binding: `let p = e1 in e2`
    Let {
        pattern: Box<Pattern>,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    /// Type-annotated expression: `(e : t)`
    Constraint {
        expr: Box<Expr>,
        annot: TypeAnnot,
    },
    /// Tuple literal
    Tuple(Vec<Expr>),
    /// Match expression
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    /// Record field projection: `e.x` or `e.M.x`
    Field(Box<Expr>, Path),
    /// Record literal, optionally extending another record:
    /// `{x = e}` or `{r with x = e}`
    Record {
        fields: Vec<(Ident, Expr)>,
        extends: Option<Box<Expr>>,
    },
    /// Constructor application: `Some(e)` or `None`
    Ctor(Path, Option<Box<Expr>>),
}

/// One arm of a match expression
#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Expr,
    pub span: Span,
}

/// A type declaration
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: Ident,
    /// Formal type parameters
    pub params: Vec<Ident>,
    pub body: TypeDeclBody,
    pub span: Span,
}

/// Type declaration body variants
#[derive(Debug, Clone)]
pub enum TypeDeclBody {
    /// Record with ordered fields
    Record(Vec<TypeField>),
    /// Variant with ordered constructors
    Variant(Vec<CtorDecl>),
    /// Transparent alias
    Alias(TypeAnnot),
    /// No body
    Abstract,
}

/// A record field declaration
#[derive(Debug, Clone)]
pub struct TypeField {
    pub name: Ident,
    pub annot: TypeAnnot,
    pub span: Span,
}

/// A variant constructor declaration
///
/// `args` lists the argument types as written; a single argument is folded
/// so `C of t` takes a `t` directly rather than a one-element tuple. An
/// optional `ret` overrides the constructor's result type.
#[derive(Debug, Clone)]
pub struct CtorDecl {
    pub name: Ident,
    pub args: Vec<TypeAnnot>,
    pub ret: Option<TypeAnnot>,
    pub span: Span,
}

/// A top-level statement
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Statement variants
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Value binding: `let p = e`
    Value { pattern: Pattern, value: Expr },
    /// Instance declaration: `instance name = e`; binds like a value and
    /// additionally registers the binding for implicit resolution
    Instance { name: Ident, value: Expr },
    /// Type declaration
    TypeDecl(TypeDecl),
    /// Module definition
    Module { name: Ident, body: ModuleExpr },
    /// Open a module's scope into the current one
    Open(Path),
}

/// The body of a module definition
#[derive(Debug, Clone)]
pub enum ModuleExpr {
    /// An inline structure of statements
    Structure(Vec<Stmt>),
    /// An alias to an existing module
    Name(Path),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::dummy()
    }

    #[test]
    fn test_path_display() {
        let p = Path::Dotted(
            Box::new(Path::bare("Outer", sp())),
            Ident::new("x", sp()),
        );
        assert_eq!(p.to_string(), "Outer.x");
    }

    #[test]
    fn test_path_last() {
        let p = Path::Dotted(
            Box::new(Path::bare("M", sp())),
            Ident::new("x", sp()),
        );
        assert_eq!(p.last().unwrap().name, "x");

        let applied = Path::Applied(
            Box::new(Path::bare("F", sp())),
            Box::new(Path::bare("X", sp())),
        );
        assert!(applied.last().is_none());
    }
}
