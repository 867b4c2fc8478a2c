//! Expression Checking
//!
//! Bidirectional elaboration of expressions against an expected type.
//! Children are elaborated left to right; the first offending subterm is
//! reported. Implicit arguments are materialized at variable occurrences
//! only: a variable whose type has an implicit arrow head is wrapped in
//! applications to fresh placeholders until the head is explicit, and the
//! placeholders are resolved later at the enclosing binding (see
//! `implicits`).

use crate::ast::{self, Explicitness};
use crate::errors::span::Span;

use super::env::Env;
use super::error::{ErrorKind, TypeError};
use super::implicits::check_binding;
use super::pattern::{
    check_pattern, fresh_decl_instance, instantiate_ctor, resolve_record_decl, unalias, BindMode,
};
use super::pretty::type_repr;
use super::tast::{TExpr, TExprKind, TPat};
use super::types::{DeclId, TypeId, TypeKind};
use super::unify::unify;

/// Elaborate `expr` against `expected`
pub fn check_expr(env: &mut Env, expected: TypeId, expr: &ast::Expr) -> Result<TExpr, TypeError> {
    let span = expr.span;
    match &expr.kind {
        ast::ExprKind::Var(path) => check_var(env, expected, path, span),

        ast::ExprKind::Int(n) => {
            let int = env.int(span);
            unify(env, expected, int, span)?;
            Ok(TExpr { kind: TExprKind::Int(*n), ty: int, span })
        }

        ast::ExprKind::Fun { param, body, explicitness } => {
            env.open_expr_scope();
            let param_ty = env.fresh_var(None, param.span);
            let body_ty = env.fresh_var(None, body.span);
            let fun_ty = env.arrow(param_ty, body_ty, *explicitness, span);
            let result = (|| -> Result<(TPat, TExpr), TypeError> {
                unify(env, expected, fun_ty, span)?;
                let tparam = check_pattern(env, param_ty, param, BindMode::Monomorphic)?;
                let tbody = check_expr(env, body_ty, body)?;
                Ok((tparam, tbody))
            })();
            env.close_expr_scope();
            let (tparam, tbody) = result?;
            Ok(TExpr {
                kind: TExprKind::Fun(tparam, Box::new(tbody), *explicitness),
                ty: fun_ty,
                span,
            })
        }

        ast::ExprKind::Apply { func, args } => {
            let func_var = env.fresh_var(None, func.span);
            let tfunc = check_expr(env, func_var, func)?;
            let mut current = tfunc.ty;
            let mut targs = Vec::with_capacity(args.len());
            for arg in args {
                let arg_ty = env.fresh_var(None, arg.span);
                let result_ty = env.fresh_var(None, span);
                let arrow = env.arrow(arg_ty, result_ty, Explicitness::Explicit, arg.span);
                unify(env, arrow, current, arg.span)?;
                targs.push(check_expr(env, arg_ty, arg)?);
                current = result_ty;
            }
            unify(env, expected, current, span)?;
            Ok(TExpr {
                kind: TExprKind::Apply(Box::new(tfunc), targs),
                ty: current,
                span,
            })
        }

        ast::ExprKind::Seq(first, second) => {
            let unit = env.unit(first.span);
            let tfirst = check_expr(env, unit, first)?;
            let tsecond = check_expr(env, expected, second)?;
            let ty = tsecond.ty;
            Ok(TExpr {
                kind: TExprKind::Seq(Box::new(tfirst), Box::new(tsecond)),
                ty,
                span,
            })
        }

        ast::ExprKind::Let { pattern, value, body } => {
            env.open_expr_scope();
            let result = (|| -> Result<(TPat, TExpr, TExpr), TypeError> {
                let (tpat, tvalue) = check_binding(env, pattern, value, false)?;
                let tbody = check_expr(env, expected, body)?;
                Ok((tpat, tvalue, tbody))
            })();
            env.close_expr_scope();
            let (tpat, tvalue, tbody) = result?;
            let ty = tbody.ty;
            Ok(TExpr {
                kind: TExprKind::Let(tpat, Box::new(tvalue), Box::new(tbody)),
                ty,
                span,
            })
        }

        ast::ExprKind::Constraint { expr: inner, annot } => {
            let annotated = env.import_annot(annot)?;
            unify(env, expected, annotated, span)?;
            let tinner = check_expr(env, annotated, inner)?;
            // Re-unify so the node's type reflects what the body resolved.
            unify(env, annotated, tinner.ty, span)?;
            Ok(tinner)
        }

        ast::ExprKind::Tuple(items) => {
            let vars: Vec<TypeId> = items.iter().map(|e| env.fresh_var(None, e.span)).collect();
            let tuple_ty = env.tuple(vars.clone(), span);
            unify(env, expected, tuple_ty, span)?;
            let mut out = Vec::with_capacity(items.len());
            for (e, v) in items.iter().zip(vars) {
                out.push(check_expr(env, v, e)?);
            }
            Ok(TExpr { kind: TExprKind::Tuple(out), ty: tuple_ty, span })
        }

        ast::ExprKind::Match { scrutinee, arms } => {
            let scrutinee_ty = env.fresh_var(None, scrutinee.span);
            let tscrutinee = check_expr(env, scrutinee_ty, scrutinee)?;
            let mut tarms = Vec::with_capacity(arms.len());
            for arm in arms {
                env.open_expr_scope();
                let result = (|| -> Result<(TPat, TExpr), TypeError> {
                    let tpat = check_pattern(env, scrutinee_ty, &arm.pattern, BindMode::Polymorphic)?;
                    let tbody = check_expr(env, expected, &arm.body)?;
                    Ok((tpat, tbody))
                })();
                env.close_expr_scope();
                let (tpat, tbody) = result?;
                tarms.push((tpat, tbody));
            }
            Ok(TExpr {
                kind: TExprKind::Match(Box::new(tscrutinee), tarms),
                ty: expected,
                span,
            })
        }

        ast::ExprKind::Field(inner, field) => check_field(env, expected, inner, field, span),

        ast::ExprKind::Record { fields, extends } => {
            check_record(env, expected, fields, extends.as_deref(), span)
        }

        ast::ExprKind::Ctor(name, arg) => {
            let (decl, index) = env.lookup_ctor(name)?;
            let (arg_ty, ret_ty) = instantiate_ctor(env, decl, index, span)?;
            unify(env, expected, ret_ty, span)?;
            let targ = match arg {
                Some(a) => Some(Box::new(check_expr(env, arg_ty, a)?)),
                None => {
                    let unit = env.unit(span);
                    if unify(env, arg_ty, unit, span).is_err() {
                        let ctor = name
                            .last()
                            .map(|i| i.name.clone())
                            .unwrap_or_else(|| name.to_string());
                        return Err(TypeError::new(span, ErrorKind::ArgumentExpected { ctor }));
                    }
                    None
                }
            };
            Ok(TExpr { kind: TExprKind::Ctor(name.clone(), targ), ty: ret_ty, span })
        }
    }
}

/// Elaborate a variable occurrence: instantiate its scheme, strip implicit
/// arrows into placeholder applications, then meet the expected type
fn check_var(
    env: &mut Env,
    expected: TypeId,
    path: &ast::Path,
    span: Span,
) -> Result<TExpr, TypeError> {
    let stored = env.lookup_value_path(path)?;
    let mut ty = env.instantiate(stored);

    let mut texpr = TExpr { kind: TExprKind::Var(path.clone()), ty, span };
    loop {
        let head = env.repr(ty);
        match env.kind(head) {
            TypeKind::Arrow { dom, cod, explicitness: Explicitness::Implicit } => {
                let id = env.fresh_implicit(dom, span);
                let placeholder = TExpr { kind: TExprKind::Implicit(id), ty: dom, span };
                texpr = TExpr {
                    kind: TExprKind::Apply(Box::new(texpr), vec![placeholder]),
                    ty: cod,
                    span,
                };
                ty = cod;
            }
            _ => break,
        }
    }

    unify(env, expected, ty, span)?;
    Ok(texpr)
}

/// Elaborate a field projection
fn check_field(
    env: &mut Env,
    expected: TypeId,
    inner: &ast::Expr,
    field: &ast::Path,
    span: Span,
) -> Result<TExpr, TypeError> {
    let inner_var = env.fresh_var(None, inner.span);
    let tinner = check_expr(env, inner_var, inner)?;

    // A module-qualified field names its declaration directly; a bare field
    // resolves through the record type, falling back to the field registry
    // when the type is still an unconstrained variable.
    let (decl, index) = match field {
        ast::Path::Bare(name) => {
            let unaliased = unalias(env, tinner.ty);
            match env.kind(unaliased) {
                TypeKind::Ctor { decl, .. } if env.decl(decl).is_record() => {
                    match env.decl(decl).field(&name.name) {
                        Some((idx, _)) => (decl, idx),
                        None => {
                            return Err(TypeError::new(
                                name.span,
                                ErrorKind::WrongRecordField {
                                    field: name.name.clone(),
                                    record: type_repr(env, unaliased),
                                },
                            ))
                        }
                    }
                }
                _ => env.lookup_field_name(&name.name, name.span)?,
            }
        }
        _ => env.lookup_field_path(field)?,
    };

    let (record_ty, field_ty) = instantiate_field(env, decl, index, span);
    unify(env, record_ty, tinner.ty, inner.span)?;
    unify(env, expected, field_ty, span)?;
    Ok(TExpr {
        kind: TExprKind::Field(Box::new(tinner), field.clone(), decl, index),
        ty: field_ty,
        span,
    })
}

/// Instantiate a record declaration for one use, returning the applied
/// record type and the type of the field at `index`
fn instantiate_field(env: &mut Env, decl: DeclId, index: usize, span: Span) -> (TypeId, TypeId) {
    let (map, record_ty) = fresh_decl_instance(env, decl, span);
    let raw_field = match &env.decl(decl).body {
        super::types::DeclBody::Record(fields) => fields[index].ty,
        _ => unreachable!("field index into non-record declaration"),
    };
    let field_ty = env.copy_type(raw_field, &map);
    (record_ty, field_ty)
}

/// Elaborate a record literal
fn check_record(
    env: &mut Env,
    expected: TypeId,
    fields: &[(ast::Ident, ast::Expr)],
    extends: Option<&ast::Expr>,
    span: Span,
) -> Result<TExpr, TypeError> {
    if fields.is_empty() {
        return Err(TypeError::new(span, ErrorKind::EmptyRecord));
    }

    let textends = match extends {
        Some(ext) => {
            let ext_var = env.fresh_var(None, ext.span);
            Some(check_expr(env, ext_var, ext)?)
        }
        None => None,
    };
    let base_ty = textends.as_ref().map(|t| t.ty).unwrap_or(expected);

    let decl = resolve_record_decl(env, base_ty, &fields[0].0)?;
    let (map, record_ty) = fresh_decl_instance(env, decl, span);

    unify(env, expected, record_ty, span)?;
    if let Some(text) = &textends {
        unify(env, record_ty, text.ty, text.span)?;
    }

    let field_count = match &env.decl(decl).body {
        super::types::DeclBody::Record(fields) => fields.len(),
        _ => unreachable!("record declaration resolved to non-record"),
    };
    let mut filled = vec![false; field_count];
    let mut out = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let (idx, raw_ty) = match env.decl(decl).field(&name.name) {
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
        if filled[idx] {
            return Err(TypeError::new(
                name.span,
                ErrorKind::RepeatedField { field: name.name.clone() },
            ));
        }
        filled[idx] = true;
        let field_ty = env.copy_type(raw_ty, &map);
        let tvalue = check_expr(env, field_ty, value)?;
        out.push((name.clone(), idx, tvalue));
    }

    if textends.is_none() {
        let missing: Vec<String> = match &env.decl(decl).body {
            super::types::DeclBody::Record(decl_fields) => decl_fields
                .iter()
                .enumerate()
                .filter(|(i, _)| !filled[*i])
                .map(|(_, f)| f.name.clone())
                .collect(),
            _ => vec![],
        };
        if !missing.is_empty() {
            return Err(TypeError::new(span, ErrorKind::MissingFields { fields: missing }));
        }
    }

    Ok(TExpr {
        kind: TExprKind::Record {
            fields: out,
            extends: textends.map(Box::new),
        },
        ty: record_ty,
        span,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, Ident, Path, Pattern, PatternKind};

    fn sp() -> Span {
        Span::dummy()
    }

    fn expr(kind: ExprKind) -> ast::Expr {
        ast::Expr { kind, span: sp() }
    }

    fn int_lit(n: i64) -> ast::Expr {
        expr(ExprKind::Int(n))
    }

    fn var(name: &str) -> ast::Expr {
        expr(ExprKind::Var(Path::bare(name, sp())))
    }

    fn var_pat(name: &str) -> Pattern {
        Pattern { kind: PatternKind::Var(Ident::new(name, sp())), span: sp() }
    }

    fn fun(param: Pattern, body: ast::Expr) -> ast::Expr {
        expr(ExprKind::Fun {
            param: Box::new(param),
            body: Box::new(body),
            explicitness: Explicitness::Explicit,
        })
    }

    #[test]
    fn test_int_literal() {
        let mut env = Env::new();
        let v = env.fresh_var(None, sp());
        let te = check_expr(&mut env, v, &int_lit(42)).unwrap();
        let resolved = env.repr(te.ty);
        assert!(matches!(env.kind(resolved), TypeKind::Ctor { ref name, .. } if name == "int"));
    }

    #[test]
    fn test_identity_function() {
        let mut env = Env::new();
        let v = env.fresh_var(None, sp());
        let te = check_expr(&mut env, v, &fun(var_pat("x"), var("x"))).unwrap();
        match env.kind(env.repr(te.ty)) {
            TypeKind::Arrow { dom, cod, .. } => assert_eq!(env.repr(dom), env.repr(cod)),
            other => panic!("expected arrow, got {other:?}"),
        }
    }

    #[test]
    fn test_application_infers_argument() {
        let mut env = Env::new();
        // (fun x -> x) 1 : int
        let v = env.fresh_var(None, sp());
        let apply = expr(ExprKind::Apply {
            func: Box::new(fun(var_pat("x"), var("x"))),
            args: vec![int_lit(1)],
        });
        let te = check_expr(&mut env, v, &apply).unwrap();
        let resolved = env.repr(te.ty);
        assert!(matches!(env.kind(resolved), TypeKind::Ctor { ref name, .. } if name == "int"));
    }

    #[test]
    fn test_applying_non_function_fails() {
        let mut env = Env::new();
        let v = env.fresh_var(None, sp());
        let apply = expr(ExprKind::Apply {
            func: Box::new(int_lit(1)),
            args: vec![int_lit(2)],
        });
        assert!(check_expr(&mut env, v, &apply).is_err());
    }

    #[test]
    fn test_seq_requires_unit_first() {
        let mut env = Env::new();
        let v = env.fresh_var(None, sp());
        let seq = expr(ExprKind::Seq(
            Box::new(expr(ExprKind::Tuple(vec![]))),
            Box::new(int_lit(1)),
        ));
        assert!(check_expr(&mut env, v, &seq).is_ok());

        let w = env.fresh_var(None, sp());
        let bad = expr(ExprKind::Seq(Box::new(int_lit(1)), Box::new(int_lit(2))));
        assert!(check_expr(&mut env, w, &bad).is_err());
    }

    #[test]
    fn test_unbound_variable() {
        let mut env = Env::new();
        let v = env.fresh_var(None, sp());
        let err = check_expr(&mut env, v, &var("nope")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Unbound { .. }));
    }

    #[test]
    fn test_constraint_annotation() {
        let mut env = Env::new();
        let v = env.fresh_var(None, sp());
        let annotated = expr(ExprKind::Constraint {
            expr: Box::new(int_lit(1)),
            annot: ast::TypeAnnot {
                kind: ast::TypeAnnotKind::Ctor { name: Path::bare("int", sp()), params: vec![] },
                span: sp(),
            },
        });
        assert!(check_expr(&mut env, v, &annotated).is_ok());

        let w = env.fresh_var(None, sp());
        let wrong = expr(ExprKind::Constraint {
            expr: Box::new(expr(ExprKind::Tuple(vec![]))),
            annot: ast::TypeAnnot {
                kind: ast::TypeAnnotKind::Ctor { name: Path::bare("int", sp()), params: vec![] },
                span: sp(),
            },
        });
        assert!(check_expr(&mut env, w, &wrong).is_err());
    }

    #[test]
    fn test_match_arms_agree() {
        let mut env = Env::new();
        // match (1, 2) with (a, b) -> a
        let scrutinee = expr(ExprKind::Tuple(vec![int_lit(1), int_lit(2)]));
        let arm_pat = Pattern {
            kind: PatternKind::Tuple(vec![var_pat("a"), var_pat("b")]),
            span: sp(),
        };
        let m = expr(ExprKind::Match {
            scrutinee: Box::new(scrutinee),
            arms: vec![ast::MatchArm { pattern: arm_pat, body: var("a"), span: sp() }],
        });
        let v = env.fresh_var(None, sp());
        let te = check_expr(&mut env, v, &m).unwrap();
        let resolved = env.repr(te.ty);
        assert!(matches!(env.kind(resolved), TypeKind::Ctor { ref name, .. } if name == "int"));
    }
}
