//! Type Representation
//!
//! Core type expressions for the Brume type system. Every type expression is
//! owned by the environment's arena and referenced by a `TypeId`; the
//! unification substitution is a side table mapping `TypeId` to `TypeId`
//! (see `env`). Two expressions with the same `TypeId` are identical;
//! equality up to substitution is decided by the unifier.

use crate::ast::Explicitness;
use crate::errors::span::Span;

// ============================================================================
// Typed Indices
// ============================================================================

/// Index of a type expression in the environment's arena
///
/// Unique across one checker run; allocation order is observable through the
/// unifier's tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "τ{}", self.0)
    }
}

/// Index of a type declaration in the environment's declaration table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// Identifier of an implicit-argument placeholder awaiting resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImplicitId(pub u32);

// ============================================================================
// Type Expressions
// ============================================================================

/// A type expression node
#[derive(Debug, Clone)]
pub struct TypeExpr {
    /// Unique arena index
    pub id: TypeId,
    /// Source location the node was allocated for
    pub span: Span,
    /// Shape
    pub kind: TypeKind,
}

/// Type expression variants
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// A unification variable with an optional display name and the lexical
    /// scope depth it was introduced at. Depth decides generalization and
    /// the direction of variable-to-variable assignment.
    Var { name: Option<String>, depth: usize },

    /// Prenex quantifier. `vars` are `Var` nodes free in `body`; a `Poly`
    /// never nests inside another type.
    Poly { vars: Vec<TypeId>, body: TypeId },

    /// Function type
    Arrow {
        dom: TypeId,
        cod: TypeId,
        explicitness: Explicitness,
    },

    /// Ordered tuple; empty is the unit type. One-element tuples never
    /// exist: construction folds them to the element.
    Tuple(Vec<TypeId>),

    /// Named type constructor application
    Ctor {
        name: String,
        params: Vec<TypeId>,
        decl: DeclId,
    },
}

impl TypeKind {
    /// True for unification variables
    pub fn is_var(&self) -> bool {
        matches!(self, TypeKind::Var { .. })
    }
}

// ============================================================================
// Type Declarations
// ============================================================================

/// A registered type declaration
#[derive(Debug, Clone)]
pub struct TypeDecl {
    /// Declared name
    pub name: String,
    /// Formal parameters, as `Var` nodes; copied fresh at every use
    pub params: Vec<TypeId>,
    /// Unique declaration identifier; older declarations have smaller ids,
    /// which the unifier uses to order alias unfolding
    pub id: DeclId,
    /// Body
    pub body: DeclBody,
}

/// Declaration body variants
#[derive(Debug, Clone)]
pub enum DeclBody {
    /// Record; the index of a field is its position
    Record(Vec<FieldDecl>),
    /// Variant; the index of a constructor is its position
    Variant(Vec<CtorInfo>),
    /// Transparent alias, unfolded during unification
    Alias(TypeId),
    /// No body
    Abstract,
}

/// A record field of a declaration
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeId,
}

/// A variant constructor of a declaration
#[derive(Debug, Clone)]
pub struct CtorInfo {
    pub name: String,
    /// Argument type; the unit type for constructors without arguments,
    /// and a bare element type for single-argument constructors
    pub arg: TypeId,
    /// Result type; defaults to the declaration applied to its own formal
    /// parameters when absent
    pub ret: Option<TypeId>,
}

impl TypeDecl {
    /// Find a record field by name, returning its index and declaration
    pub fn field(&self, name: &str) -> Option<(usize, &FieldDecl)> {
        match &self.body {
            DeclBody::Record(fields) => fields
                .iter()
                .enumerate()
                .find(|(_, f)| f.name == name),
            _ => None,
        }
    }

    /// True for transparent aliases
    pub fn is_alias(&self) -> bool {
        matches!(self.body, DeclBody::Alias(_))
    }

    /// True for record declarations
    pub fn is_record(&self) -> bool {
        matches!(self.body, DeclBody::Record(_))
    }
}
