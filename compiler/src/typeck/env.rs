//! Type Checking Environment
//!
//! Owns every piece of mutable state in a checker run:
//! - the type expression arena and its substitution (instance) table,
//! - the declaration table,
//! - the stack of lexical scopes with their name registries,
//! - the scope-depth counter driving generalization,
//! - the queue of implicit-argument placeholders awaiting resolution.
//!
//! All state is threaded through `&mut Env`; there is no interior mutability
//! and no concurrency. The instance table keeps an undo trail so speculative
//! unification (instance matching, symmetry checks) can roll back cleanly.

use std::collections::{BTreeSet, HashMap};

use crate::ast::{self, Explicitness};
use crate::errors::span::Span;

use super::error::{ErrorKind, NameKind, TypeError};
use super::types::{
    CtorInfo, DeclBody, DeclId, FieldDecl, ImplicitId, TypeDecl, TypeExpr, TypeId, TypeKind,
};

// ============================================================================
// Scopes
// ============================================================================

/// Kind of scope, driving the close discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The outermost scope; never popped
    Toplevel,
    /// A module body; closed scopes of this kind become module signatures
    Module,
    /// A binder scope (binding, function body, match arm)
    Expr,
    /// One arm of an or-pattern
    Or,
    /// An overlay pushed by `open`
    Open,
}

/// One lexical scope
///
/// Five name-keyed registries (last write wins within a scope), plus named
/// type variables for annotations and closed module signatures.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    kind_tag: Option<ScopeKind>,
    /// Value bindings
    pub values: HashMap<String, TypeId>,
    /// Type declarations
    pub type_decls: HashMap<String, DeclId>,
    /// Record field lookup: field name to (declaration, index)
    pub fields: HashMap<String, (DeclId, usize)>,
    /// Constructor lookup: constructor name to (declaration, index)
    pub ctors: HashMap<String, (DeclId, usize)>,
    /// Implicit instances, in declaration order
    pub instances: Vec<(String, TypeId)>,
    /// Named type variables introduced by annotations
    pub type_vars: HashMap<String, TypeId>,
    /// Module signatures bound in this scope
    pub modules: HashMap<String, Scope>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Scope { kind_tag: Some(kind), ..Scope::default() }
    }

    /// Scope kind
    pub fn kind(&self) -> ScopeKind {
        self.kind_tag.unwrap_or(ScopeKind::Toplevel)
    }

    /// True when the scope declares anything other than values or type
    /// variables; used to reject declarations inside or-patterns
    pub fn has_declarations(&self) -> Option<(&'static str, String)> {
        if let Some(name) = self.type_decls.keys().next() {
            return Some(("type", name.clone()));
        }
        if let Some(name) = self.fields.keys().next() {
            return Some(("record field", name.clone()));
        }
        if let Some(name) = self.ctors.keys().next() {
            return Some(("constructor", name.clone()));
        }
        if let Some(name) = self.modules.keys().next() {
            return Some(("module", name.clone()));
        }
        None
    }
}

/// An implicit-argument placeholder awaiting resolution
#[derive(Debug, Clone)]
pub struct ImplicitVar {
    pub id: ImplicitId,
    /// Type the chosen instance must unify with
    pub ty: TypeId,
    pub span: Span,
}

// ============================================================================
// Environment
// ============================================================================

/// The type checking environment
#[derive(Debug)]
pub struct Env {
    /// Type expression arena, indexed by `TypeId`
    types: Vec<TypeExpr>,
    /// Unification substitution, parallel to `types`
    instances: Vec<Option<TypeId>>,
    /// Undo trail for the substitution
    trail: Vec<(TypeId, Option<TypeId>)>,
    /// Declaration table, indexed by `DeclId`
    decls: Vec<TypeDecl>,
    /// Scope stack, innermost last
    scopes: Vec<Scope>,
    /// Current binder depth
    depth: usize,
    /// Placeholders not yet resolved or abstracted
    pending_implicits: Vec<ImplicitVar>,
    next_implicit: u32,
    /// The builtin `int` declaration
    int_decl: DeclId,
}

/// Names of the builtin abstract type declarations
const BUILTIN_TYPES: [&str; 5] = ["int", "bool", "char", "string", "float"];

impl Env {
    /// Create an environment seeded with the builtin prelude
    pub fn new() -> Self {
        let mut env = Env {
            types: Vec::new(),
            instances: Vec::new(),
            trail: Vec::new(),
            decls: Vec::new(),
            scopes: vec![Scope::new(ScopeKind::Toplevel)],
            depth: 0,
            pending_implicits: Vec::new(),
            next_implicit: 0,
            int_decl: DeclId(0),
        };
        for name in BUILTIN_TYPES {
            let id = DeclId(env.decls.len() as u32);
            env.decls.push(TypeDecl {
                name: name.to_string(),
                params: vec![],
                id,
                body: DeclBody::Abstract,
            });
            env.scopes[0].type_decls.insert(name.to_string(), id);
            if name == "int" {
                env.int_decl = id;
            }
        }
        env
    }

    // ========================================================================
    // Arena
    // ========================================================================

    /// Allocate a type expression
    pub fn mk(&mut self, kind: TypeKind, span: Span) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeExpr { id, span, kind });
        self.instances.push(None);
        id
    }

    /// Allocate a fresh unification variable at the current depth
    pub fn fresh_var(&mut self, name: Option<&str>, span: Span) -> TypeId {
        let depth = self.depth;
        self.mk(
            TypeKind::Var { name: name.map(str::to_string), depth },
            span,
        )
    }

    /// Shape of a type expression
    pub fn kind(&self, id: TypeId) -> TypeKind {
        self.types[id.0 as usize].kind.clone()
    }

    /// Span a type expression was allocated for
    pub fn type_span(&self, id: TypeId) -> Span {
        self.types[id.0 as usize].span
    }

    /// Binding depth of a variable node
    pub fn var_depth(&self, id: TypeId) -> Option<usize> {
        match &self.types[id.0 as usize].kind {
            TypeKind::Var { depth, .. } => Some(*depth),
            _ => None,
        }
    }

    /// Display name of a variable node
    pub fn var_name(&self, id: TypeId) -> Option<String> {
        match &self.types[id.0 as usize].kind {
            TypeKind::Var { name, .. } => name.clone(),
            _ => None,
        }
    }

    /// Build a tuple type; the empty tuple is unit and one-element tuples
    /// fold to their element
    pub fn tuple(&mut self, items: Vec<TypeId>, span: Span) -> TypeId {
        if items.len() == 1 {
            items[0]
        } else {
            self.mk(TypeKind::Tuple(items), span)
        }
    }

    /// The unit type
    pub fn unit(&mut self, span: Span) -> TypeId {
        self.mk(TypeKind::Tuple(vec![]), span)
    }

    /// Build a function type
    pub fn arrow(
        &mut self,
        dom: TypeId,
        cod: TypeId,
        explicitness: Explicitness,
        span: Span,
    ) -> TypeId {
        self.mk(TypeKind::Arrow { dom, cod, explicitness }, span)
    }

    /// The builtin integer type
    pub fn int(&mut self, span: Span) -> TypeId {
        let decl = self.int_decl;
        self.mk(
            TypeKind::Ctor { name: "int".to_string(), params: vec![], decl },
            span,
        )
    }

    /// Apply a declaration to parameters
    pub fn ctor_type(&mut self, decl: DeclId, params: Vec<TypeId>, span: Span) -> TypeId {
        let name = self.decls[decl.0 as usize].name.clone();
        self.mk(TypeKind::Ctor { name, params, decl }, span)
    }

    /// Build a prenex quantifier; merges nested quantifiers and elides the
    /// wrapper when there is nothing to quantify
    pub fn poly(&mut self, mut vars: Vec<TypeId>, body: TypeId, span: Span) -> TypeId {
        if vars.is_empty() {
            return body;
        }
        if let TypeKind::Poly { vars: inner, body: inner_body } = self.kind(body) {
            vars.extend(inner);
            return self.mk(TypeKind::Poly { vars, body: inner_body }, span);
        }
        self.mk(TypeKind::Poly { vars, body }, span)
    }

    // ========================================================================
    // Substitution (Instance Table)
    // ========================================================================

    /// Current instance of a variable, if any
    pub fn instance(&self, id: TypeId) -> Option<TypeId> {
        self.instances[id.0 as usize]
    }

    /// Record an instance, logging the previous value on the trail
    pub fn set_instance(&mut self, var: TypeId, ty: TypeId) {
        debug_assert!(self.types[var.0 as usize].kind.is_var());
        let old = self.instances[var.0 as usize];
        self.trail.push((var, old));
        self.instances[var.0 as usize] = Some(ty);
    }

    /// Remove an instance, logging the previous value on the trail
    pub fn clear_instance(&mut self, var: TypeId) {
        let old = self.instances[var.0 as usize];
        self.trail.push((var, old));
        self.instances[var.0 as usize] = None;
    }

    /// Trail position for a later rollback
    pub fn snapshot(&self) -> usize {
        self.trail.len()
    }

    /// Undo every substitution change after `mark`
    pub fn rollback(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let (var, old) = self.trail.pop().expect("trail underflow");
            self.instances[var.0 as usize] = old;
        }
    }

    /// True when following instances never revisits a variable. Holds by
    /// construction; exposed so tests and debugging can verify the
    /// substitution after arbitrary unification sequences.
    pub fn substitution_acyclic(&self) -> bool {
        for start in 0..self.types.len() {
            if !self.types[start].kind.is_var() {
                continue;
            }
            let mut seen = BTreeSet::new();
            let mut id = TypeId(start as u32);
            while let Some(next) = self.instances[id.0 as usize] {
                if !seen.insert(id) {
                    return false;
                }
                if !self.types[next.0 as usize].kind.is_var() {
                    break;
                }
                id = next;
            }
        }
        true
    }

    /// Chase variable instances to the representative type
    pub fn repr(&self, mut id: TypeId) -> TypeId {
        loop {
            match &self.types[id.0 as usize].kind {
                TypeKind::Var { .. } => match self.instances[id.0 as usize] {
                    Some(next) => id = next,
                    None => return id,
                },
                _ => return id,
            }
        }
    }

    // ========================================================================
    // Copying, Instantiation, Flattening
    // ========================================================================

    /// Deep-copy a type, substituting mapped variables. Unmapped variables
    /// are shared, so their instances keep applying; unchanged subtrees are
    /// reused rather than reallocated.
    pub fn copy_type(&mut self, id: TypeId, map: &HashMap<TypeId, TypeId>) -> TypeId {
        let span = self.type_span(id);
        match self.kind(id) {
            TypeKind::Var { .. } => map.get(&id).copied().unwrap_or(id),
            TypeKind::Poly { vars, body } => {
                let vars2: Vec<TypeId> =
                    vars.iter().map(|v| map.get(v).copied().unwrap_or(*v)).collect();
                let body2 = self.copy_type(body, map);
                if body2 == body && vars2 == vars {
                    id
                } else {
                    self.mk(TypeKind::Poly { vars: vars2, body: body2 }, span)
                }
            }
            TypeKind::Arrow { dom, cod, explicitness } => {
                let dom2 = self.copy_type(dom, map);
                let cod2 = self.copy_type(cod, map);
                if dom2 == dom && cod2 == cod {
                    id
                } else {
                    self.mk(TypeKind::Arrow { dom: dom2, cod: cod2, explicitness }, span)
                }
            }
            TypeKind::Tuple(items) => {
                let items2: Vec<TypeId> =
                    items.iter().map(|t| self.copy_type(*t, map)).collect();
                if items2 == items {
                    id
                } else {
                    self.mk(TypeKind::Tuple(items2), span)
                }
            }
            TypeKind::Ctor { name, params, decl } => {
                let params2: Vec<TypeId> =
                    params.iter().map(|t| self.copy_type(*t, map)).collect();
                if params2 == params {
                    id
                } else {
                    self.mk(TypeKind::Ctor { name, params: params2, decl }, span)
                }
            }
        }
    }

    /// Instantiate a scheme: replace quantified variables with fresh ones at
    /// the current depth. Non-quantified types are returned unchanged.
    pub fn instantiate(&mut self, id: TypeId) -> TypeId {
        let rid = self.repr(id);
        match self.kind(rid) {
            TypeKind::Poly { vars, body } => {
                let mut map = HashMap::new();
                for v in vars {
                    let name = self.var_name(v);
                    let span = self.type_span(v);
                    let fresh = self.fresh_var(name.as_deref(), span);
                    map.insert(v, fresh);
                }
                self.copy_type(body, &map)
            }
            _ => id,
        }
    }

    /// Push a type through the substitution: every instance-bearing variable
    /// is replaced by its (recursively flattened) resolution
    pub fn flatten(&mut self, id: TypeId) -> TypeId {
        let span = self.type_span(id);
        match self.kind(id) {
            TypeKind::Var { .. } => match self.instance(id) {
                Some(inst) => self.flatten(inst),
                None => id,
            },
            TypeKind::Poly { vars, body } => {
                let body2 = self.flatten(body);
                if body2 == body {
                    id
                } else {
                    self.mk(TypeKind::Poly { vars, body: body2 }, span)
                }
            }
            TypeKind::Arrow { dom, cod, explicitness } => {
                let dom2 = self.flatten(dom);
                let cod2 = self.flatten(cod);
                if dom2 == dom && cod2 == cod {
                    id
                } else {
                    self.mk(TypeKind::Arrow { dom: dom2, cod: cod2, explicitness }, span)
                }
            }
            TypeKind::Tuple(items) => {
                let items2: Vec<TypeId> = items.iter().map(|t| self.flatten(*t)).collect();
                if items2 == items {
                    id
                } else {
                    self.mk(TypeKind::Tuple(items2), span)
                }
            }
            TypeKind::Ctor { name, params, decl } => {
                let params2: Vec<TypeId> = params.iter().map(|t| self.flatten(*t)).collect();
                if params2 == params {
                    id
                } else {
                    self.mk(TypeKind::Ctor { name, params: params2, decl }, span)
                }
            }
        }
    }

    /// Collect free variables at or below `min_depth` (i.e. not bound in an
    /// enclosing scope), chasing instances
    pub fn free_vars(&self, id: TypeId, min_depth: usize, out: &mut BTreeSet<TypeId>) {
        match &self.types[id.0 as usize].kind {
            TypeKind::Var { depth, .. } => match self.instances[id.0 as usize] {
                Some(inst) => self.free_vars(inst, min_depth, out),
                None => {
                    if *depth >= min_depth {
                        out.insert(id);
                    }
                }
            },
            TypeKind::Poly { vars, body } => {
                let mut inner = BTreeSet::new();
                self.free_vars(*body, min_depth, &mut inner);
                for v in vars {
                    inner.remove(v);
                }
                out.extend(inner);
            }
            TypeKind::Arrow { dom, cod, .. } => {
                self.free_vars(*dom, min_depth, out);
                self.free_vars(*cod, min_depth, out);
            }
            TypeKind::Tuple(items) => {
                for t in items {
                    self.free_vars(*t, min_depth, out);
                }
            }
            TypeKind::Ctor { params, .. } => {
                for t in params {
                    self.free_vars(*t, min_depth, out);
                }
            }
        }
    }

    // ========================================================================
    // Scope Management
    // ========================================================================

    /// Current binder depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Open a scope without changing the binder depth
    pub fn open_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    /// Close the innermost scope and return it
    pub fn close_scope(&mut self) -> Scope {
        debug_assert!(self.scopes.len() > 1, "cannot close the toplevel scope");
        self.scopes.pop().expect("scope stack underflow")
    }

    /// Open a binder scope: new scope plus one depth level
    pub fn open_expr_scope(&mut self) {
        self.depth += 1;
        self.open_scope(ScopeKind::Expr);
    }

    /// Close a binder scope
    pub fn close_expr_scope(&mut self) -> Scope {
        self.depth -= 1;
        self.close_scope()
    }

    /// Open a module body scope
    pub fn open_module_scope(&mut self) {
        self.open_scope(ScopeKind::Module);
    }

    /// Close a module body: discards `open` overlays pushed inside the body
    /// and returns the module's own scope as its signature
    pub fn close_module_scope(&mut self) -> Scope {
        while self.scopes.last().map(Scope::kind) == Some(ScopeKind::Open) {
            self.scopes.pop();
        }
        debug_assert_eq!(self.scopes.last().map(Scope::kind), Some(ScopeKind::Module));
        self.close_scope()
    }

    /// Push a module's scope onto the search path
    pub fn push_open_scope(&mut self, mut scope: Scope) {
        scope.kind_tag = Some(ScopeKind::Open);
        self.scopes.push(scope);
    }

    /// The innermost scope that accepts new declarations (skips `open`
    /// overlays, which are read-only search-path entries)
    fn current_frame_mut(&mut self) -> &mut Scope {
        let idx = self
            .scopes
            .iter()
            .rposition(|s| s.kind() != ScopeKind::Open)
            .expect("no writable scope");
        &mut self.scopes[idx]
    }

    // ========================================================================
    // Name Registration
    // ========================================================================

    /// Bind a value name in the current scope
    pub fn add_value(&mut self, name: &str, ty: TypeId) {
        self.current_frame_mut().values.insert(name.to_string(), ty);
    }

    /// Register a named type variable in the current scope
    pub fn add_type_var(&mut self, name: &str, ty: TypeId) {
        self.current_frame_mut().type_vars.insert(name.to_string(), ty);
    }

    /// Register an implicit instance in the current scope
    pub fn register_instance(&mut self, name: &str, ty: TypeId) {
        self.current_frame_mut()
            .instances
            .push((name.to_string(), ty));
    }

    /// Bind a module signature in the current scope
    pub fn bind_module(&mut self, name: &str, scope: Scope) {
        self.current_frame_mut()
            .modules
            .insert(name.to_string(), scope);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Look up a named type variable, innermost scope first
    pub fn find_type_var(&self, name: &str) -> Option<TypeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.type_vars.get(name).copied())
    }

    /// Look up an unqualified value name
    pub fn lookup_value(&self, name: &str) -> Option<TypeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.values.get(name).copied())
    }

    fn find_module(&self, path: &ast::Path) -> Result<&Scope, TypeError> {
        match path {
            ast::Path::Bare(id) => self
                .scopes
                .iter()
                .rev()
                .find_map(|s| s.modules.get(&id.name))
                .ok_or_else(|| unbound(NameKind::Module, &id.name, id.span)),
            ast::Path::Dotted(prefix, id) => self
                .find_module(prefix)?
                .modules
                .get(&id.name)
                .ok_or_else(|| unbound(NameKind::Module, &id.name, id.span)),
            ast::Path::Applied(..) => Err(unsupported_path(path)),
        }
    }

    /// Resolve a module path to a copy of its signature
    pub fn module_scope(&self, path: &ast::Path) -> Result<Scope, TypeError> {
        self.find_module(path).cloned()
    }

    /// Resolve a value path to its stored (uninstantiated) type
    pub fn lookup_value_path(&self, path: &ast::Path) -> Result<TypeId, TypeError> {
        match path {
            ast::Path::Bare(id) => self
                .lookup_value(&id.name)
                .ok_or_else(|| unbound(NameKind::Value, &id.name, id.span)),
            ast::Path::Dotted(prefix, id) => self
                .find_module(prefix)?
                .values
                .get(&id.name)
                .copied()
                .ok_or_else(|| unbound(NameKind::Value, &id.name, id.span)),
            ast::Path::Applied(..) => Err(unsupported_path(path)),
        }
    }

    /// Resolve a constructor path
    pub fn lookup_ctor(&self, path: &ast::Path) -> Result<(DeclId, usize), TypeError> {
        match path {
            ast::Path::Bare(id) => self
                .scopes
                .iter()
                .rev()
                .find_map(|s| s.ctors.get(&id.name).copied())
                .ok_or_else(|| unbound(NameKind::Constructor, &id.name, id.span)),
            ast::Path::Dotted(prefix, id) => self
                .find_module(prefix)?
                .ctors
                .get(&id.name)
                .copied()
                .ok_or_else(|| unbound(NameKind::Constructor, &id.name, id.span)),
            ast::Path::Applied(..) => Err(unsupported_path(path)),
        }
    }

    /// Resolve an unqualified record field name
    pub fn lookup_field_name(&self, name: &str, span: Span) -> Result<(DeclId, usize), TypeError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.fields.get(name).copied())
            .ok_or_else(|| unbound(NameKind::Field, name, span))
    }

    /// Resolve a record field path
    pub fn lookup_field_path(&self, path: &ast::Path) -> Result<(DeclId, usize), TypeError> {
        match path {
            ast::Path::Bare(id) => self.lookup_field_name(&id.name, id.span),
            ast::Path::Dotted(prefix, id) => self
                .find_module(prefix)?
                .fields
                .get(&id.name)
                .copied()
                .ok_or_else(|| unbound(NameKind::Field, &id.name, id.span)),
            ast::Path::Applied(..) => Err(unsupported_path(path)),
        }
    }

    /// Resolve a type declaration path
    pub fn lookup_type_decl(&self, path: &ast::Path) -> Result<DeclId, TypeError> {
        match path {
            ast::Path::Bare(id) => self
                .scopes
                .iter()
                .rev()
                .find_map(|s| s.type_decls.get(&id.name).copied())
                .ok_or_else(|| unbound(NameKind::TypeName, &id.name, id.span)),
            ast::Path::Dotted(prefix, id) => self
                .find_module(prefix)?
                .type_decls
                .get(&id.name)
                .copied()
                .ok_or_else(|| unbound(NameKind::TypeName, &id.name, id.span)),
            ast::Path::Applied(..) => Err(unsupported_path(path)),
        }
    }

    /// A declaration by id
    pub fn decl(&self, id: DeclId) -> &TypeDecl {
        &self.decls[id.0 as usize]
    }

    /// Implicit instance candidates visible from the current scope,
    /// innermost first, shadowed names removed
    pub fn instance_candidates(&self) -> Vec<(String, TypeId)> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for scope in self.scopes.iter().rev() {
            for (name, ty) in &scope.instances {
                if seen.insert(name.clone()) {
                    out.push((name.clone(), *ty));
                }
            }
        }
        out
    }

    // ========================================================================
    // Implicit Placeholders
    // ========================================================================

    /// Allocate a placeholder for an implicit argument of type `ty`
    pub fn fresh_implicit(&mut self, ty: TypeId, span: Span) -> ImplicitId {
        let id = ImplicitId(self.next_implicit);
        self.next_implicit += 1;
        self.pending_implicits.push(ImplicitVar { id, ty, span });
        id
    }

    /// Number of pending placeholders; placeholders allocated after this
    /// mark belong to the binding currently being checked
    pub fn implicit_mark(&self) -> usize {
        self.pending_implicits.len()
    }

    /// Remove and return the placeholders allocated after `mark`
    pub fn drain_implicits(&mut self, mark: usize) -> Vec<ImplicitVar> {
        self.pending_implicits.split_off(mark)
    }

    /// Re-queue a placeholder for the enclosing binding to handle
    pub fn defer_implicit(&mut self, var: ImplicitVar) {
        self.pending_implicits.push(var);
    }

    // ========================================================================
    // Importing Parsed Types and Declarations
    // ========================================================================

    /// Import a parsed type annotation, allocating arena nodes. Free named
    /// variables are reused within the current scope and created fresh on
    /// first mention.
    pub fn import_annot(&mut self, annot: &ast::TypeAnnot) -> Result<TypeId, TypeError> {
        match &annot.kind {
            ast::TypeAnnotKind::Var(name) => match self.find_type_var(&name.name) {
                Some(v) => Ok(v),
                None => {
                    let v = self.fresh_var(Some(&name.name), name.span);
                    self.add_type_var(&name.name, v);
                    Ok(v)
                }
            },
            ast::TypeAnnotKind::Arrow { dom, cod, explicitness } => {
                let dom = self.import_annot(dom)?;
                let cod = self.import_annot(cod)?;
                Ok(self.arrow(dom, cod, *explicitness, annot.span))
            }
            ast::TypeAnnotKind::Tuple(items) => {
                let items = items
                    .iter()
                    .map(|t| self.import_annot(t))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.tuple(items, annot.span))
            }
            ast::TypeAnnotKind::Ctor { name, params } => {
                let decl = self.lookup_type_decl(name)?;
                let expected = self.decl(decl).params.len();
                if expected != params.len() {
                    return Err(TypeError::new(
                        annot.span,
                        ErrorKind::CtorArity {
                            name: self.decl(decl).name.clone(),
                            expected,
                            given: params.len(),
                        },
                    ));
                }
                let params = params
                    .iter()
                    .map(|t| self.import_annot(t))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.ctor_type(decl, params, annot.span))
            }
            ast::TypeAnnotKind::Poly { vars, body } => {
                self.open_scope(ScopeKind::Expr);
                let var_ids: Vec<TypeId> = vars
                    .iter()
                    .map(|v| {
                        let t = self.fresh_var(Some(&v.name), v.span);
                        self.add_type_var(&v.name, t);
                        t
                    })
                    .collect();
                let body = self.import_annot(body);
                self.close_scope();
                Ok(self.poly(var_ids, body?, annot.span))
            }
        }
    }

    /// Import a type declaration: allocate a fresh declaration id, freshen
    /// the formal parameters, register the name (before the body is
    /// imported, so recursive declarations resolve), then register field
    /// and constructor indices
    pub fn import_type_decl(&mut self, decl: &ast::TypeDecl) -> Result<DeclId, TypeError> {
        let did = DeclId(self.decls.len() as u32);

        // Pre-register so the body can mention the declaration itself.
        self.decls.push(TypeDecl {
            name: decl.name.name.clone(),
            params: vec![],
            id: did,
            body: DeclBody::Abstract,
        });
        self.current_frame_mut()
            .type_decls
            .insert(decl.name.name.clone(), did);

        // Formal parameters live in a throwaway scope.
        self.open_scope(ScopeKind::Expr);
        let params: Vec<TypeId> = decl
            .params
            .iter()
            .map(|p| {
                let v = self.fresh_var(Some(&p.name), p.span);
                self.add_type_var(&p.name, v);
                v
            })
            .collect();
        self.decls[did.0 as usize].params = params;

        let body = match &decl.body {
            ast::TypeDeclBody::Record(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for f in fields {
                    let ty = match self.import_annot(&f.annot) {
                        Ok(ty) => ty,
                        Err(e) => {
                            self.close_scope();
                            return Err(e);
                        }
                    };
                    out.push(FieldDecl { name: f.name.name.clone(), ty });
                }
                DeclBody::Record(out)
            }
            ast::TypeDeclBody::Variant(ctors) => {
                let mut out = Vec::with_capacity(ctors.len());
                for c in ctors {
                    let result = (|| -> Result<CtorInfo, TypeError> {
                        let args = c
                            .args
                            .iter()
                            .map(|t| self.import_annot(t))
                            .collect::<Result<Vec<_>, _>>()?;
                        let arg = self.tuple(args, c.span);
                        let ret = c
                            .ret
                            .as_ref()
                            .map(|t| self.import_annot(t))
                            .transpose()?;
                        Ok(CtorInfo { name: c.name.name.clone(), arg, ret })
                    })();
                    match result {
                        Ok(info) => out.push(info),
                        Err(e) => {
                            self.close_scope();
                            return Err(e);
                        }
                    }
                }
                DeclBody::Variant(out)
            }
            ast::TypeDeclBody::Alias(annot) => {
                let ty = match self.import_annot(annot) {
                    Ok(ty) => ty,
                    Err(e) => {
                        self.close_scope();
                        return Err(e);
                    }
                };
                DeclBody::Alias(ty)
            }
            ast::TypeDeclBody::Abstract => DeclBody::Abstract,
        };
        self.close_scope();
        self.decls[did.0 as usize].body = body;

        // Field and constructor indices become visible in the current scope.
        match &self.decls[did.0 as usize].body {
            DeclBody::Record(fields) => {
                let entries: Vec<(String, usize)> = fields
                    .iter()
                    .enumerate()
                    .map(|(i, f)| (f.name.clone(), i))
                    .collect();
                for (name, i) in entries {
                    self.current_frame_mut().fields.insert(name, (did, i));
                }
            }
            DeclBody::Variant(ctors) => {
                let entries: Vec<(String, usize)> = ctors
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (c.name.clone(), i))
                    .collect();
                for (name, i) in entries {
                    self.current_frame_mut().ctors.insert(name, (did, i));
                }
            }
            _ => {}
        }

        Ok(did)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

fn unbound(kind: NameKind, name: &str, span: Span) -> TypeError {
    TypeError::new(span, ErrorKind::Unbound { kind, name: name.to_string() })
}

fn unsupported_path(path: &ast::Path) -> TypeError {
    TypeError::new(
        path.span(),
        ErrorKind::UnsupportedPath { path: path.to_string() },
    )
}

// ============================================================================
// Tests
// ============================================================================
