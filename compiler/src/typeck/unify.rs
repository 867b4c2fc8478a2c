//! Unification
//!
//! Decides equality-up-to-substitution of two type expressions by
//! side-effecting the environment's instance table. The decision procedure,
//! in priority order:
//!
//! 1. identical nodes succeed;
//! 2. a quantifier on either side is stripped to its body;
//! 3. variable-to-variable assignment points from deeper to shallower
//!    scopes (larger `TypeId` assigned on a depth tie), preserving the
//!    generalization invariant;
//! 4. a variable with an instance is resolved under a remove/restore
//!    discipline: the instance is taken out for the recursive step and
//!    re-established on success. If the variable acquires an instance
//!    during that step the type is recursive and unification fails;
//! 5. tuples, arrows and constructor applications unify structurally;
//!    arrows must agree on explicitness;
//! 6. constructor applications with different declarations attempt alias
//!    unfolding, older (smaller-id) declaration first.
//!
//! The public entry point wraps any failure once in `CheckFailed` so the
//! error carries the outermost expected/actual pair along with the
//! innermost mismatch.

use tracing::trace;

use crate::errors::span::Span;

use super::env::Env;
use super::error::{ErrorKind, TypeError};
use super::pretty::type_repr;
use super::types::{DeclBody, TypeId, TypeKind};

/// Unify `expected` with `actual`, raising at `span` on mismatch
pub fn unify(env: &mut Env, expected: TypeId, actual: TypeId, span: Span) -> Result<(), TypeError> {
    unify_types(env, expected, actual).map_err(|inner| {
        let kind = match inner {
            wrapped @ ErrorKind::CheckFailed { .. } => wrapped,
            inner => ErrorKind::CheckFailed {
                expected: type_repr(env, expected),
                actual: type_repr(env, actual),
                inner: Box::new(inner),
            },
        };
        TypeError::new(span, kind)
    })
}

/// Structural unification; errors are unwrapped kinds for the caller to
/// locate and wrap
pub fn unify_types(env: &mut Env, a: TypeId, b: TypeId) -> Result<(), ErrorKind> {
    if a == b {
        return Ok(());
    }
    trace!(a = %a, b = %b, "unify");

    let ka = env.kind(a);
    let kb = env.kind(b);

    // A quantifier is a compatibility claim; strip to the body.
    if let TypeKind::Poly { body, .. } = ka {
        return unify_types(env, body, b);
    }
    if let TypeKind::Poly { body, .. } = kb {
        return unify_types(env, a, body);
    }

    match (ka, kb) {
        (TypeKind::Var { depth: da, .. }, TypeKind::Var { depth: db, .. }) => {
            if env.instance(a).is_some() {
                return resolve_variable(env, a, b, false);
            }
            if env.instance(b).is_some() {
                return resolve_variable(env, b, a, true);
            }
            // Assign the deeper variable so instances always point outward;
            // on a depth tie the younger (larger id) variable yields.
            let (assignee, other) = if da > db {
                (a, b)
            } else if db > da {
                (b, a)
            } else if a > b {
                (a, b)
            } else {
                (b, a)
            };
            env.set_instance(assignee, other);
            Ok(())
        }

        (TypeKind::Var { .. }, _) => {
            if env.instance(a).is_some() {
                resolve_variable(env, a, b, false)
            } else {
                env.set_instance(a, b);
                Ok(())
            }
        }

        (_, TypeKind::Var { .. }) => {
            if env.instance(b).is_some() {
                resolve_variable(env, b, a, true)
            } else {
                env.set_instance(b, a);
                Ok(())
            }
        }

        (TypeKind::Tuple(ts), TypeKind::Tuple(us)) => {
            if ts.len() != us.len() {
                return Err(cannot_unify(env, a, b));
            }
            for (t, u) in ts.iter().zip(us.iter()) {
                unify_types(env, *t, *u)?;
            }
            Ok(())
        }

        (
            TypeKind::Arrow { dom: d1, cod: c1, explicitness: e1 },
            TypeKind::Arrow { dom: d2, cod: c2, explicitness: e2 },
        ) => {
            if e1 != e2 {
                return Err(cannot_unify(env, a, b));
            }
            unify_types(env, d1, d2)?;
            unify_types(env, c1, c2)
        }

        (
            TypeKind::Ctor { decl: i, params: p, .. },
            TypeKind::Ctor { decl: j, params: q, .. },
        ) => {
            if i == j {
                if p.len() != q.len() {
                    return Err(cannot_unify(env, a, b));
                }
                for (t, u) in p.iter().zip(q.iter()) {
                    unify_types(env, *t, *u)?;
                }
                return Ok(());
            }
            // Distinct declarations: unfold aliases, older first.
            let (first, second) = if i < j { (a, b) } else { (b, a) };
            if let Some(unfolded) = unfold_alias(env, first) {
                let (na, nb) = if first == a { (unfolded, b) } else { (a, unfolded) };
                return unify_types(env, na, nb);
            }
            if let Some(unfolded) = unfold_alias(env, second) {
                let (na, nb) = if second == a { (unfolded, b) } else { (a, unfolded) };
                return unify_types(env, na, nb);
            }
            Err(cannot_unify(env, a, b))
        }

        _ => Err(cannot_unify(env, a, b)),
    }
}

/// Resolve a variable with an instance against another type.
///
/// The instance is removed for the recursive step and restored on success.
/// If the variable acquires a new instance while resolving, the type refers
/// to itself through its own instance chain.
fn resolve_variable(
    env: &mut Env,
    var: TypeId,
    other: TypeId,
    flipped: bool,
) -> Result<(), ErrorKind> {
    let inst = env.instance(var).expect("resolve_variable without instance");
    env.clear_instance(var);

    let result = if flipped {
        unify_types(env, other, inst)
    } else {
        unify_types(env, inst, other)
    };
    result?;

    if env.instance(var).is_some() {
        return Err(ErrorKind::RecursiveVariable {
            var: variable_repr(env, var),
        });
    }
    env.set_instance(var, inst);
    Ok(())
}

/// Unfold a constructor application through a transparent alias, mapping the
/// declaration's formal parameters to the application's actuals
fn unfold_alias(env: &mut Env, id: TypeId) -> Option<TypeId> {
    let (decl_id, actuals) = match env.kind(id) {
        TypeKind::Ctor { decl, params, .. } => (decl, params),
        _ => return None,
    };
    let decl = env.decl(decl_id);
    let body = match decl.body {
        DeclBody::Alias(body) => body,
        _ => return None,
    };
    let map = decl
        .params
        .iter()
        .copied()
        .zip(actuals.iter().copied())
        .collect();
    Some(env.copy_type(body, &map))
}

fn cannot_unify(env: &Env, expected: TypeId, actual: TypeId) -> ErrorKind {
    ErrorKind::CannotUnify {
        expected: type_repr(env, expected),
        actual: type_repr(env, actual),
    }
}

fn variable_repr(env: &Env, var: TypeId) -> String {
    match env.var_name(var) {
        Some(name) => format!("'{name}"),
        None => var.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
