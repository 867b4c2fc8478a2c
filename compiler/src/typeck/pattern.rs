//! Pattern Checking
//!
//! Checks a pattern against an expected type, binding the names it
//! introduces. The binder is pluggable: function parameters bind at the
//! monomorphic type, while let- and match-arm bindings bind through the
//! polymorphic binder, which closes over variables that would otherwise
//! escape their binder.

use std::collections::BTreeSet;

use crate::ast::{self, Ident};
use crate::errors::span::Span;

use super::env::{Env, ScopeKind};
use super::error::{ErrorKind, TypeError};
use super::pretty::type_repr;
use super::tast::{TPat, TPatKind};
use super::types::{DeclBody, DeclId, TypeId, TypeKind};
use super::unify::unify;

/// How pattern names enter the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Bind at the type as-is
    Monomorphic,
    /// Generalize free variables deeper than the current scope before
    /// binding
    Polymorphic,
}

/// Bind one name according to the mode
pub fn bind_name(env: &mut Env, mode: BindMode, name: &Ident, ty: TypeId) {
    match mode {
        BindMode::Monomorphic => env.add_value(&name.name, ty),
        BindMode::Polymorphic => {
            let flat = env.flatten(ty);
            let mut vars = BTreeSet::new();
            env.free_vars(flat, env.depth() + 1, &mut vars);
            let scheme = env.poly(vars.into_iter().collect(), flat, name.span);
            env.add_value(&name.name, scheme);
        }
    }
}

/// Check `pattern` against `expected`, binding names via `mode`
pub fn check_pattern(
    env: &mut Env,
    expected: TypeId,
    pattern: &ast::Pattern,
    mode: BindMode,
) -> Result<TPat, TypeError> {
    let span = pattern.span;
    match &pattern.kind {
        ast::PatternKind::Any => Ok(TPat { kind: TPatKind::Any, ty: expected, span }),

        ast::PatternKind::Var(name) => {
            bind_name(env, mode, name, expected);
            Ok(TPat { kind: TPatKind::Var(name.clone()), ty: expected, span })
        }

        ast::PatternKind::Constraint { pattern: inner, annot } => {
            let annotated = env.import_annot(annot)?;
            unify(env, annotated, expected, span)?;
            check_pattern(env, annotated, inner, mode)
        }

        ast::PatternKind::Tuple(items) => {
            let vars: Vec<TypeId> = items.iter().map(|p| env.fresh_var(None, p.span)).collect();
            let tuple_ty = env.tuple(vars.clone(), span);
            unify(env, expected, tuple_ty, span)?;
            let mut out = Vec::with_capacity(items.len());
            for (p, v) in items.iter().zip(vars) {
                out.push(check_pattern(env, v, p, mode)?);
            }
            Ok(TPat { kind: TPatKind::Tuple(out), ty: expected, span })
        }

        ast::PatternKind::Or(left, right) => check_or_pattern(env, expected, left, right, mode, span),

        ast::PatternKind::Int(n) => {
            let int = env.int(span);
            unify(env, expected, int, span)?;
            Ok(TPat { kind: TPatKind::Int(*n), ty: expected, span })
        }

        ast::PatternKind::Record(fields) => check_record_pattern(env, expected, fields, mode, span),

        ast::PatternKind::Ctor(name, arg) => check_ctor_pattern(env, expected, name, arg.as_deref(), mode, span),
    }
}

/// Check both arms of an or-pattern in separate scopes and cross-check the
/// bindings: every name must appear on both sides at unifiable types, and
/// neither side may declare anything. The right arm's bindings survive.
fn check_or_pattern(
    env: &mut Env,
    expected: TypeId,
    left: &ast::Pattern,
    right: &ast::Pattern,
    mode: BindMode,
    span: Span,
) -> Result<TPat, TypeError> {
    env.open_scope(ScopeKind::Or);
    let tleft = match check_pattern(env, expected, left, mode) {
        Ok(p) => p,
        Err(e) => {
            env.close_scope();
            return Err(e);
        }
    };
    let left_scope = env.close_scope();

    env.open_scope(ScopeKind::Or);
    let tright = match check_pattern(env, expected, right, mode) {
        Ok(p) => p,
        Err(e) => {
            env.close_scope();
            return Err(e);
        }
    };
    let right_scope = env.close_scope();

    for scope in [&left_scope, &right_scope] {
        if let Some((kind, name)) = scope.has_declarations() {
            return Err(TypeError::new(span, ErrorKind::PatternDeclaration { kind, name }));
        }
    }

    for (name, left_ty) in &left_scope.values {
        match right_scope.values.get(name) {
            Some(right_ty) => unify(env, *left_ty, *right_ty, span)?,
            None => {
                return Err(TypeError::new(
                    span,
                    ErrorKind::VariableOnOneSide { name: name.clone() },
                ))
            }
        }
    }
    for name in right_scope.values.keys() {
        if !left_scope.values.contains_key(name) {
            return Err(TypeError::new(
                span,
                ErrorKind::VariableOnOneSide { name: name.clone() },
            ));
        }
    }

    // Keep the right arm's bindings live in the enclosing scope.
    for (name, ty) in right_scope.values {
        env.add_value(&name, ty);
    }

    Ok(TPat {
        kind: TPatKind::Or(Box::new(tleft), Box::new(tright)),
        ty: expected,
        span,
    })
}

/// Discover a record declaration from the expected type or, if the type is
/// still an unconstrained variable, from the first mentioned field
pub fn resolve_record_decl(
    env: &mut Env,
    expected: TypeId,
    first_field: &Ident,
) -> Result<DeclId, TypeError> {
    let unaliased = unalias(env, expected);
    match env.kind(unaliased) {
        TypeKind::Ctor { decl, .. } if env.decl(decl).is_record() => Ok(decl),
        _ => {
            let (decl, _) = env.lookup_field_name(&first_field.name, first_field.span)?;
            Ok(decl)
        }
    }
}

/// Expand a type through variable instances and transparent aliases until a
/// non-alias head is reached
pub fn unalias(env: &mut Env, ty: TypeId) -> TypeId {
    let mut current = env.repr(ty);
    loop {
        let (decl_id, params) = match env.kind(current) {
            TypeKind::Ctor { decl, params, .. } => (decl, params),
            _ => return current,
        };
        let decl = env.decl(decl_id);
        let body = match decl.body {
            DeclBody::Alias(body) => body,
            _ => return current,
        };
        let map = decl
            .params
            .iter()
            .copied()
            .zip(params.iter().copied())
            .collect();
        current = env.copy_type(body, &map);
        current = env.repr(current);
    }
}

/// Instantiate a declaration's formal parameters, returning the mapping and
/// the applied constructor type
pub(crate) fn fresh_decl_instance(
    env: &mut Env,
    decl: DeclId,
    span: Span,
) -> (std::collections::HashMap<TypeId, TypeId>, TypeId) {
    let formals = env.decl(decl).params.clone();
    let mut map = std::collections::HashMap::new();
    let mut actuals = Vec::with_capacity(formals.len());
    for formal in formals {
        let name = env.var_name(formal);
        let fresh = env.fresh_var(name.as_deref(), span);
        map.insert(formal, fresh);
        actuals.push(fresh);
    }
    let applied = env.ctor_type(decl, actuals, span);
    (map, applied)
}

fn check_record_pattern(
    env: &mut Env,
    expected: TypeId,
    fields: &[(Ident, ast::Pattern)],
    mode: BindMode,
    span: Span,
) -> Result<TPat, TypeError> {
    if fields.is_empty() {
        return Err(TypeError::new(span, ErrorKind::EmptyRecord));
    }

    let decl = resolve_record_decl(env, expected, &fields[0].0)?;
    let (map, record_ty) = fresh_decl_instance(env, decl, span);
    unify(env, expected, record_ty, span)?;

    let mut out = Vec::with_capacity(fields.len());
    for (name, sub) in fields {
        let (idx, field_ty) = match env.decl(decl).field(&name.name) {
            Some((idx, field)) => (idx, field.ty),
            None => {
                return Err(TypeError::new(
                    name.span,
                    ErrorKind::WrongRecordField {
                        field: name.name.clone(),
                        record: type_repr(env, record_ty),
                    },
                ))
            }
        };
        let field_ty = env.copy_type(field_ty, &map);
        let tsub = check_pattern(env, field_ty, sub, mode)?;
        out.push((name.clone(), idx, tsub));
    }

    Ok(TPat { kind: TPatKind::Record(out), ty: expected, span })
}

/// Instantiate a constructor's argument and result types for one use
pub fn instantiate_ctor(
    env: &mut Env,
    decl: DeclId,
    index: usize,
    span: Span,
) -> Result<(TypeId, TypeId), TypeError> {
    let (map, applied) = fresh_decl_instance(env, decl, span);
    let info = match &env.decl(decl).body {
        DeclBody::Variant(ctors) => ctors[index].clone(),
        _ => {
            return Err(TypeError::new(
                span,
                ErrorKind::WrongTypeDescription {
                    expected: "variant",
                    decl: env.decl(decl).name.clone(),
                },
            ))
        }
    };
    let arg = env.copy_type(info.arg, &map);
    let ret = match info.ret {
        Some(ret) => env.copy_type(ret, &map),
        None => applied,
    };
    Ok((arg, ret))
}

fn check_ctor_pattern(
    env: &mut Env,
    expected: TypeId,
    name: &ast::Path,
    arg: Option<&ast::Pattern>,
    mode: BindMode,
    span: Span,
) -> Result<TPat, TypeError> {
    let (decl, index) = env.lookup_ctor(name)?;
    let (arg_ty, ret_ty) = instantiate_ctor(env, decl, index, span)?;
    unify(env, expected, ret_ty, span)?;

    let targ = match arg {
        Some(p) => Some(Box::new(check_pattern(env, arg_ty, p, mode)?)),
        None => {
            let unit = env.unit(span);
            if unify(env, arg_ty, unit, span).is_err() {
                let ctor = name.last().map(|i| i.name.clone()).unwrap_or_else(|| name.to_string());
                return Err(TypeError::new(span, ErrorKind::ArgumentExpected { ctor }));
            }
            None
        }
    };

    Ok(TPat {
        kind: TPatKind::Ctor(name.clone(), targ),
        ty: expected,
        span,
    })
}

// ============================================================================
// Tests
// ============================================================================
