//! Implicit Resolution and Generalization
//!
//! `check_binding` drives the close of every binding site:
//!
//! 1. infer the bound expression one binder level deeper;
//! 2. flatten its type through the substitution and collect the variables
//!    that would escape the binder;
//! 3. settle the implicit placeholders belonging to this binding: resolve
//!    each against the visible instances (exactly one instance must match;
//!    several is ambiguity and reported as no instance), or abstract over
//!    it as an implicit function parameter. Unresolved placeholders at a
//!    toplevel binding are errors. Placeholders mentioning only shallower
//!    variables are left for the enclosing binding;
//! 4. generalize: a single-variable pattern closes over the remaining free
//!    variables as a prenex scheme, any other pattern binds its names
//!    through the polymorphic binder.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::ast;

use super::env::{Env, ImplicitVar};
use super::error::{ErrorKind, TypeError};
use super::expr::check_expr;
use super::pattern::{bind_name, check_pattern, BindMode};
use super::pretty::type_repr;
use super::tast::{TExpr, TExprKind, TPat, TPatKind};
use super::types::{ImplicitId, TypeId};
use super::unify::{unify, unify_types};

/// Check the binding `pat = value`, bind its names, and return the
/// elaborated pair
pub fn check_binding(
    env: &mut Env,
    pattern: &ast::Pattern,
    value: &ast::Expr,
    toplevel: bool,
) -> Result<(TPat, TExpr), TypeError> {
    let mark = env.implicit_mark();

    env.open_expr_scope();
    let value_ty = env.fresh_var(None, value.span);
    let result = check_expr(env, value_ty, value);
    env.close_expr_scope();
    let mut texpr = result?;

    // Settle this binding's implicit placeholders.
    let typ = env.flatten(texpr.ty);
    let mut binding_vars = BTreeSet::new();
    env.free_vars(typ, env.depth() + 1, &mut binding_vars);

    let pending = env.drain_implicits(mark);
    let mut resolutions: HashMap<ImplicitId, TExpr> = HashMap::new();
    let mut abstracted: Vec<ImplicitVar> = Vec::new();
    for var in pending {
        if !belongs_here(env, &var, &binding_vars, toplevel) {
            env.defer_implicit(var);
            continue;
        }
        match resolve_instance(env, &var)? {
            Some(replacement) => {
                debug!(placeholder = var.id.0, "resolved implicit instance");
                resolutions.insert(var.id, replacement);
            }
            None if toplevel => {
                return Err(TypeError::new(
                    var.span,
                    ErrorKind::NoInstance { ty: type_repr(env, var.ty) },
                ));
            }
            None => abstracted.push(var),
        }
    }

    if !resolutions.is_empty() {
        texpr = substitute_implicits(texpr, &resolutions);
    }

    // Abstract over what is left: wrap the body in implicit lambdas.
    for var in abstracted.iter().rev() {
        let name = ast::Ident::new(format!("__implicit{}", var.id.0), var.span);
        let mut replacement = HashMap::new();
        replacement.insert(
            var.id,
            TExpr {
                kind: TExprKind::Var(ast::Path::Bare(name.clone())),
                ty: var.ty,
                span: var.span,
            },
        );
        texpr = substitute_implicits(texpr, &replacement);
        let span = texpr.span;
        let fun_ty = env.arrow(var.ty, texpr.ty, ast::Explicitness::Implicit, span);
        let param = TPat { kind: TPatKind::Var(name), ty: var.ty, span: var.span };
        texpr = TExpr {
            kind: TExprKind::Fun(param, Box::new(texpr), ast::Explicitness::Implicit),
            ty: fun_ty,
            span,
        };
    }

    // Generalize. Resolution may have instantiated variables, so the free
    // set is recomputed on the final type.
    let typ = env.flatten(texpr.ty);
    let mut vars = BTreeSet::new();
    env.free_vars(typ, env.depth() + 1, &mut vars);

    let tpat = match &pattern.kind {
        ast::PatternKind::Var(name) if !vars.is_empty() => {
            let scheme = env.poly(vars.into_iter().collect(), typ, pattern.span);
            debug!(name = %name.name, scheme = %type_repr(env, scheme), "generalized binding");
            bind_name(env, BindMode::Monomorphic, name, scheme);
            TPat { kind: TPatKind::Var(name.clone()), ty: scheme, span: pattern.span }
        }
        _ => check_pattern(env, typ, pattern, BindMode::Polymorphic)?,
    };

    Ok((tpat, texpr))
}

/// A placeholder is settled at this binding when checking a toplevel
/// statement (nothing may escape), when its type is ground, or when its
/// free variables intersect the binding's generalizable set
fn belongs_here(
    env: &Env,
    var: &ImplicitVar,
    binding_vars: &BTreeSet<TypeId>,
    toplevel: bool,
) -> bool {
    if toplevel {
        return true;
    }
    let mut free = BTreeSet::new();
    env.free_vars(var.ty, 0, &mut free);
    free.is_empty() || free.iter().any(|v| binding_vars.contains(v))
}

/// Try to resolve a placeholder against the visible instances.
///
/// Every candidate is tried speculatively and rolled back; the unification
/// is committed only when exactly one candidate matches. More than one
/// match means there is no unique instance.
fn resolve_instance(env: &mut Env, var: &ImplicitVar) -> Result<Option<TExpr>, TypeError> {
    let candidates = env.instance_candidates();
    let mut matched: Vec<(String, TypeId)> = Vec::new();
    for (name, scheme) in candidates {
        let mark = env.snapshot();
        let candidate_ty = env.instantiate(scheme);
        let fits = unify_types(env, var.ty, candidate_ty).is_ok();
        env.rollback(mark);
        if fits {
            matched.push((name, scheme));
        }
    }

    match matched.len() {
        0 => Ok(None),
        1 => {
            let (name, scheme) = matched.remove(0);
            let candidate_ty = env.instantiate(scheme);
            unify(env, var.ty, candidate_ty, var.span)?;
            Ok(Some(TExpr {
                kind: TExprKind::Var(ast::Path::bare(name, var.span)),
                ty: var.ty,
                span: var.span,
            }))
        }
        _ => Err(TypeError::new(
            var.span,
            ErrorKind::NoInstance { ty: type_repr(env, var.ty) },
        )),
    }
}

/// Rewrite placeholder nodes through the elaborated tree
fn substitute_implicits(expr: TExpr, map: &HashMap<ImplicitId, TExpr>) -> TExpr {
    let TExpr { kind, ty, span } = expr;
    let kind = match kind {
        TExprKind::Implicit(id) => match map.get(&id) {
            Some(replacement) => return replacement.clone(),
            None => TExprKind::Implicit(id),
        },
        TExprKind::Fun(param, body, explicitness) => {
            TExprKind::Fun(param, Box::new(substitute_implicits(*body, map)), explicitness)
        }
        TExprKind::Apply(func, args) => TExprKind::Apply(
            Box::new(substitute_implicits(*func, map)),
            args.into_iter().map(|a| substitute_implicits(a, map)).collect(),
        ),
        TExprKind::Seq(e1, e2) => TExprKind::Seq(
            Box::new(substitute_implicits(*e1, map)),
            Box::new(substitute_implicits(*e2, map)),
        ),
        TExprKind::Let(pat, value, body) => TExprKind::Let(
            pat,
            Box::new(substitute_implicits(*value, map)),
            Box::new(substitute_implicits(*body, map)),
        ),
        TExprKind::Tuple(items) => TExprKind::Tuple(
            items.into_iter().map(|e| substitute_implicits(e, map)).collect(),
        ),
        TExprKind::Match(scrutinee, arms) => TExprKind::Match(
            Box::new(substitute_implicits(*scrutinee, map)),
            arms.into_iter()
                .map(|(p, b)| (p, substitute_implicits(b, map)))
                .collect(),
        ),
        TExprKind::Field(inner, path, decl, index) => {
            TExprKind::Field(Box::new(substitute_implicits(*inner, map)), path, decl, index)
        }
        TExprKind::Record { fields, extends } => TExprKind::Record {
            fields: fields
                .into_iter()
                .map(|(n, i, e)| (n, i, substitute_implicits(e, map)))
                .collect(),
            extends: extends.map(|e| Box::new(substitute_implicits(*e, map))),
        },
        TExprKind::Ctor(path, arg) => {
            TExprKind::Ctor(path, arg.map(|a| Box::new(substitute_implicits(*a, map))))
        }
        leaf @ (TExprKind::Var(_) | TExprKind::Int(_)) => leaf,
    };
    TExpr { kind, ty, span }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, Ident, Path, Pattern, PatternKind};
    use crate::errors::span::Span;
    use super::super::types::TypeKind;

    fn sp() -> Span {
        Span::dummy()
    }

    fn expr(kind: ExprKind) -> ast::Expr {
        ast::Expr { kind, span: sp() }
    }

    fn var_pat(name: &str) -> Pattern {
        Pattern { kind: PatternKind::Var(Ident::new(name, sp())), span: sp() }
    }

    fn fun(param: Pattern, body: ast::Expr) -> ast::Expr {
        expr(ExprKind::Fun {
            param: Box::new(param),
            body: Box::new(body),
            explicitness: ast::Explicitness::Explicit,
        })
    }

    fn var(name: &str) -> ast::Expr {
        expr(ExprKind::Var(Path::bare(name, sp())))
    }

    #[test]
    fn test_identity_generalizes() {
        let mut env = Env::new();
        let pattern = var_pat("id");
        let value = fun(var_pat("x"), var("x"));
        check_binding(&mut env, &pattern, &value, true).unwrap();

        let scheme = env.lookup_value("id").unwrap();
        match env.kind(env.repr(scheme)) {
            TypeKind::Poly { vars, body } => {
                assert_eq!(vars.len(), 1);
                match env.kind(body) {
                    TypeKind::Arrow { dom, cod, .. } => {
                        assert_eq!(dom, vars[0]);
                        assert_eq!(cod, vars[0]);
                    }
                    other => panic!("expected arrow body, got {other:?}"),
                }
            }
            other => panic!("expected scheme, got {other:?}"),
        }
    }

    #[test]
    fn test_monomorphic_binding_not_generalized() {
        let mut env = Env::new();
        let pattern = var_pat("n");
        let value = expr(ExprKind::Int(1));
        check_binding(&mut env, &pattern, &value, true).unwrap();

        let ty = env.lookup_value("n").unwrap();
        assert!(!matches!(env.kind(env.repr(ty)), TypeKind::Poly { .. }));
    }

    #[test]
    fn test_tuple_pattern_generalizes_per_name() {
        let mut env = Env::new();
        // let (f, g) = (fun x -> x, fun y -> y)
        let pattern = Pattern {
            kind: PatternKind::Tuple(vec![var_pat("f"), var_pat("g")]),
            span: sp(),
        };
        let value = expr(ExprKind::Tuple(vec![
            fun(var_pat("x"), var("x")),
            fun(var_pat("y"), var("y")),
        ]));
        check_binding(&mut env, &pattern, &value, true).unwrap();

        for name in ["f", "g"] {
            let ty = env.lookup_value(name).unwrap();
            assert!(
                matches!(env.kind(env.repr(ty)), TypeKind::Poly { .. }),
                "{name} should be polymorphic"
            );
        }
    }

    #[test]
    fn test_scheme_vars_free_in_body() {
        let mut env = Env::new();
        // let pair = fun x -> fun y -> (x, y)
        let pattern = var_pat("pair");
        let value = fun(var_pat("x"), fun(var_pat("y"), expr(ExprKind::Tuple(vec![var("x"), var("y")]))));
        check_binding(&mut env, &pattern, &value, true).unwrap();

        let scheme = env.lookup_value("pair").unwrap();
        match env.kind(env.repr(scheme)) {
            TypeKind::Poly { vars, body } => {
                assert_eq!(vars.len(), 2);
                let mut free = BTreeSet::new();
                env.free_vars(body, 0, &mut free);
                for v in vars {
                    assert!(free.contains(&v), "quantified var must appear in body");
                }
            }
            other => panic!("expected scheme, got {other:?}"),
        }
    }
}
