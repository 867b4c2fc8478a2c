//! Integration tests for the Brume type checker
//!
//! Programs are built directly as ASTs (parsing is a separate stage); the
//! helpers below keep the construction readable.

use brume_compiler::ast::{
    self, CtorDecl, Explicitness, Ident, MatchArm, ModuleExpr, Path, TypeAnnot, TypeAnnotKind,
    TypeField,
};
use brume_compiler::errors::span::Span;
use brume_compiler::typeck::error::ErrorKind;
use brume_compiler::typeck::pretty::type_repr;
use brume_compiler::typeck::tast::{TExprKind, TStmtKind};
use brume_compiler::typeck::types::TypeKind;
use brume_compiler::{check, Env};

// ============================================================================
// AST construction helpers
// ============================================================================

fn sp() -> Span {
    Span::dummy()
}

fn id(name: &str) -> Ident {
    Ident::new(name, sp())
}

fn expr(kind: ast::ExprKind) -> ast::Expr {
    ast::Expr { kind, span: sp() }
}

fn pat(kind: ast::PatternKind) -> ast::Pattern {
    ast::Pattern { kind, span: sp() }
}

fn stmt(kind: ast::StmtKind) -> ast::Stmt {
    ast::Stmt { kind, span: sp() }
}

fn annot(kind: TypeAnnotKind) -> TypeAnnot {
    TypeAnnot { kind, span: sp() }
}

fn var(name: &str) -> ast::Expr {
    expr(ast::ExprKind::Var(Path::bare(name, sp())))
}

fn int_lit(n: i64) -> ast::Expr {
    expr(ast::ExprKind::Int(n))
}

fn var_pat(name: &str) -> ast::Pattern {
    pat(ast::PatternKind::Var(id(name)))
}

fn fun(param: ast::Pattern, body: ast::Expr) -> ast::Expr {
    expr(ast::ExprKind::Fun {
        param: Box::new(param),
        body: Box::new(body),
        explicitness: Explicitness::Explicit,
    })
}

fn apply(func: ast::Expr, args: Vec<ast::Expr>) -> ast::Expr {
    expr(ast::ExprKind::Apply { func: Box::new(func), args })
}

fn let_value(name: &str, value: ast::Expr) -> ast::Stmt {
    stmt(ast::StmtKind::Value { pattern: var_pat(name), value })
}

fn named_ty(name: &str, params: Vec<TypeAnnot>) -> TypeAnnot {
    annot(TypeAnnotKind::Ctor { name: Path::bare(name, sp()), params })
}

fn ty_var(name: &str) -> TypeAnnot {
    annot(TypeAnnotKind::Var(id(name)))
}

/// The flattened, rendered type of a top-level binding
fn bound_type(env: &mut Env, name: &str) -> String {
    let ty = env.lookup_value(name).expect("binding not found");
    let flat = env.flatten(ty);
    type_repr(env, flat)
}

// ============================================================================
// Scenario 1 & 2: generalization
// ============================================================================

#[test]
fn identity_function_generalizes() {
    let mut env = Env::new();
    let stmts = vec![let_value("id", fun(var_pat("x"), var("x")))];
    check(&stmts, &mut env).unwrap();

    let scheme = env.lookup_value("id").unwrap();
    match env.kind(env.repr(scheme)) {
        TypeKind::Poly { vars, body } => {
            assert_eq!(vars.len(), 1);
            match env.kind(body) {
                TypeKind::Arrow { dom, cod, explicitness } => {
                    assert_eq!(dom, vars[0]);
                    assert_eq!(cod, vars[0]);
                    assert_eq!(explicitness, Explicitness::Explicit);
                }
                other => panic!("expected arrow, got {other:?}"),
            }
        }
        other => panic!("expected scheme, got {other:?}"),
    }
}

#[test]
fn pair_constructor_generalizes_two_vars() {
    let mut env = Env::new();
    // let pair = fun x -> fun y -> (x, y)
    let body = fun(
        var_pat("x"),
        fun(var_pat("y"), expr(ast::ExprKind::Tuple(vec![var("x"), var("y")]))),
    );
    check(&[let_value("pair", body)], &mut env).unwrap();

    let scheme = env.lookup_value("pair").unwrap();
    match env.kind(env.repr(scheme)) {
        TypeKind::Poly { vars, body } => {
            assert_eq!(vars.len(), 2);
            // a -> b -> (a, b)
            let (a, b) = (vars[0], vars[1]);
            match env.kind(body) {
                TypeKind::Arrow { dom, cod, .. } => {
                    assert!(dom == a || dom == b);
                    match env.kind(cod) {
                        TypeKind::Arrow { cod: result, .. } => match env.kind(result) {
                            TypeKind::Tuple(items) => {
                                assert_eq!(items.len(), 2);
                                assert!(items.contains(&a) && items.contains(&b));
                            }
                            other => panic!("expected tuple result, got {other:?}"),
                        },
                        other => panic!("expected curried arrow, got {other:?}"),
                    }
                }
                other => panic!("expected arrow, got {other:?}"),
            }
        }
        other => panic!("expected scheme, got {other:?}"),
    }
}

// ============================================================================
// Scenario 3: record field projection
// ============================================================================

fn point_decl() -> ast::Stmt {
    stmt(ast::StmtKind::TypeDecl(ast::TypeDecl {
        name: id("t"),
        params: vec![],
        body: ast::TypeDeclBody::Record(vec![
            TypeField { name: id("x"), annot: named_ty("int", vec![]), span: sp() },
            TypeField { name: id("y"), annot: named_ty("int", vec![]), span: sp() },
        ]),
        span: sp(),
    }))
}

#[test]
fn record_field_projection() {
    let mut env = Env::new();
    let stmts = vec![
        point_decl(),
        let_value(
            "f",
            fun(var_pat("r"), expr(ast::ExprKind::Field(Box::new(var("r")), Path::bare("x", sp())))),
        ),
    ];
    check(&stmts, &mut env).unwrap();
    assert_eq!(bound_type(&mut env, "f"), "t -> int");
}

// ============================================================================
// Scenario 4: or-pattern
// ============================================================================

#[test]
fn or_pattern_through_variants() {
    let mut env = Env::new();
    // type either = A(int) | B(int)
    let decl = stmt(ast::StmtKind::TypeDecl(ast::TypeDecl {
        name: id("either"),
        params: vec![],
        body: ast::TypeDeclBody::Variant(vec![
            CtorDecl { name: id("A"), args: vec![named_ty("int", vec![])], ret: None, span: sp() },
            CtorDecl { name: id("B"), args: vec![named_ty("int", vec![])], ret: None, span: sp() },
        ]),
        span: sp(),
    }));

    // let get = fun e -> match e with A n | B n -> n
    let arm = MatchArm {
        pattern: pat(ast::PatternKind::Or(
            Box::new(pat(ast::PatternKind::Ctor(
                Path::bare("A", sp()),
                Some(Box::new(var_pat("n"))),
            ))),
            Box::new(pat(ast::PatternKind::Ctor(
                Path::bare("B", sp()),
                Some(Box::new(var_pat("n"))),
            ))),
        )),
        body: var("n"),
        span: sp(),
    };
    let get = fun(
        var_pat("e"),
        expr(ast::ExprKind::Match { scrutinee: Box::new(var("e")), arms: vec![arm] }),
    );

    check(&[decl, let_value("get", get)], &mut env).unwrap();
    assert_eq!(bound_type(&mut env, "get"), "either -> int");
}

#[test]
fn or_pattern_conflicting_types() {
    let mut env = Env::new();
    // type mixed = A(int) | C(string)
    let decl = stmt(ast::StmtKind::TypeDecl(ast::TypeDecl {
        name: id("mixed"),
        params: vec![],
        body: ast::TypeDeclBody::Variant(vec![
            CtorDecl { name: id("A"), args: vec![named_ty("int", vec![])], ret: None, span: sp() },
            CtorDecl { name: id("C"), args: vec![named_ty("string", vec![])], ret: None, span: sp() },
        ]),
        span: sp(),
    }));

    // match e with A x | C x -> ... binds x at int and string
    let arm = MatchArm {
        pattern: pat(ast::PatternKind::Or(
            Box::new(pat(ast::PatternKind::Ctor(
                Path::bare("A", sp()),
                Some(Box::new(var_pat("x"))),
            ))),
            Box::new(pat(ast::PatternKind::Ctor(
                Path::bare("C", sp()),
                Some(Box::new(var_pat("x"))),
            ))),
        )),
        body: var("x"),
        span: sp(),
    };
    let bad = fun(
        var_pat("e"),
        expr(ast::ExprKind::Match { scrutinee: Box::new(var("e")), arms: vec![arm] }),
    );

    let err = check(&[decl, let_value("bad", bad)], &mut env).unwrap_err();
    assert!(
        matches!(err.root_cause(), ErrorKind::CannotUnify { .. }),
        "expected CannotUnify under CheckFailed, got {:?}",
        err.kind
    );
}

// ============================================================================
// Scenarios 5 & 6: implicit resolution
// ============================================================================

/// Register `type show('a) = Show('a)` and seed
/// `show : forall 'a. {show('a)} -> 'a -> string`
fn seed_show(env: &mut Env) {
    let show_ty = annot(TypeAnnotKind::Poly {
        vars: vec![id("a")],
        body: Box::new(annot(TypeAnnotKind::Arrow {
            dom: Box::new(named_ty("show", vec![ty_var("a")])),
            cod: Box::new(annot(TypeAnnotKind::Arrow {
                dom: Box::new(ty_var("a")),
                cod: Box::new(named_ty("string", vec![])),
                explicitness: Explicitness::Explicit,
            })),
            explicitness: Explicitness::Implicit,
        })),
    });

    let decl = stmt(ast::StmtKind::TypeDecl(ast::TypeDecl {
        name: id("show"),
        params: vec![id("a")],
        body: ast::TypeDeclBody::Variant(vec![CtorDecl {
            name: id("Show"),
            args: vec![ty_var("a")],
            ret: None,
            span: sp(),
        }]),
        span: sp(),
    }));

    // The declaration must exist before the annotation can be imported.
    check(std::slice::from_ref(&decl), env).unwrap();
    let ty = env.import_annot(&show_ty).unwrap();
    env.add_value("show", ty);
}

#[test]
fn implicit_resolves_against_instance() {
    let mut env = Env::new();
    seed_show(&mut env);

    let stmts = vec![
        // instance show_int = Show(1)
        stmt(ast::StmtKind::Instance {
            name: id("show_int"),
            value: expr(ast::ExprKind::Ctor(
                Path::bare("Show", sp()),
                Some(Box::new(int_lit(1))),
            )),
        }),
        // let p = fun x -> show x
        let_value("p", fun(var_pat("x"), apply(var("show"), vec![var("x")]))),
    ];
    let elaborated = check(&stmts, &mut env).unwrap();

    assert_eq!(bound_type(&mut env, "p"), "int -> string");

    // The placeholder was rewritten to a reference to show_int.
    let mut saw_instance = false;
    if let TStmtKind::Value(_, body) = &elaborated[1].kind {
        body.walk(&mut |e| {
            if let TExprKind::Var(path) = &e.kind {
                if path.to_string() == "show_int" {
                    saw_instance = true;
                }
            }
        });
    }
    assert!(saw_instance, "elaborated body should reference show_int");
}

#[test]
fn implicit_without_instance_fails() {
    let mut env = Env::new();
    seed_show(&mut env);

    let stmts = vec![let_value("p", fun(var_pat("x"), apply(var("show"), vec![var("x")])))];
    let err = check(&stmts, &mut env).unwrap_err();
    assert!(
        matches!(err.root_cause(), ErrorKind::NoInstance { .. }),
        "expected NoInstance, got {:?}",
        err.kind
    );
}

#[test]
fn ambiguous_instances_rejected() {
    let mut env = Env::new();
    seed_show(&mut env);

    let stmts = vec![
        stmt(ast::StmtKind::Instance {
            name: id("show_a"),
            value: expr(ast::ExprKind::Ctor(Path::bare("Show", sp()), Some(Box::new(int_lit(1))))),
        }),
        stmt(ast::StmtKind::Instance {
            name: id("show_b"),
            value: expr(ast::ExprKind::Ctor(Path::bare("Show", sp()), Some(Box::new(int_lit(2))))),
        }),
        let_value("p", fun(var_pat("x"), apply(var("show"), vec![var("x")]))),
    ];
    let err = check(&stmts, &mut env).unwrap_err();
    assert!(matches!(err.root_cause(), ErrorKind::NoInstance { .. }));
}

// ============================================================================
// Boundary cases
// ============================================================================

#[test]
fn single_argument_constructor_folds() {
    let mut env = Env::new();
    // type wrap = W(int); W is applied to an int directly
    let decl = stmt(ast::StmtKind::TypeDecl(ast::TypeDecl {
        name: id("wrap"),
        params: vec![],
        body: ast::TypeDeclBody::Variant(vec![CtorDecl {
            name: id("W"),
            args: vec![named_ty("int", vec![])],
            ret: None,
            span: sp(),
        }]),
        span: sp(),
    }));
    let stmts = vec![
        decl,
        let_value("w", expr(ast::ExprKind::Ctor(Path::bare("W", sp()), Some(Box::new(int_lit(1)))))),
    ];
    check(&stmts, &mut env).unwrap();
    assert_eq!(bound_type(&mut env, "w"), "wrap");
}

#[test]
fn nullary_constructor_requires_no_argument() {
    let mut env = Env::new();
    // type flag = On | Off
    let decl = stmt(ast::StmtKind::TypeDecl(ast::TypeDecl {
        name: id("flag"),
        params: vec![],
        body: ast::TypeDeclBody::Variant(vec![
            CtorDecl { name: id("On"), args: vec![], ret: None, span: sp() },
            CtorDecl { name: id("Off"), args: vec![], ret: None, span: sp() },
        ]),
        span: sp(),
    }));
    let stmts = vec![
        decl,
        let_value("f", expr(ast::ExprKind::Ctor(Path::bare("On", sp()), None))),
    ];
    check(&stmts, &mut env).unwrap();
    assert_eq!(bound_type(&mut env, "f"), "flag");
}

#[test]
fn argument_taking_constructor_without_argument() {
    let mut env = Env::new();
    let decl = stmt(ast::StmtKind::TypeDecl(ast::TypeDecl {
        name: id("wrap"),
        params: vec![],
        body: ast::TypeDeclBody::Variant(vec![CtorDecl {
            name: id("W"),
            args: vec![named_ty("int", vec![])],
            ret: None,
            span: sp(),
        }]),
        span: sp(),
    }));
    let stmts = vec![
        decl,
        let_value("w", expr(ast::ExprKind::Ctor(Path::bare("W", sp()), None))),
    ];
    let err = check(&stmts, &mut env).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ArgumentExpected { ref ctor } if ctor == "W"));
}

#[test]
fn record_literal_complete_and_missing() {
    let mut env = Env::new();
    // All fields assigned: fine.
    let stmts = vec![
        point_decl(),
        let_value(
            "ok",
            expr(ast::ExprKind::Record {
                fields: vec![(id("x"), int_lit(1)), (id("y"), int_lit(2))],
                extends: None,
            }),
        ),
    ];
    check(&stmts, &mut env).unwrap();
    assert_eq!(bound_type(&mut env, "ok"), "t");

    // One field missing without extension: error.
    let mut env2 = Env::new();
    let stmts2 = vec![
        point_decl(),
        let_value(
            "bad",
            expr(ast::ExprKind::Record {
                fields: vec![(id("x"), int_lit(1))],
                extends: None,
            }),
        ),
    ];
    let err = check(&stmts2, &mut env2).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingFields { ref fields } if fields.as_slice() == ["y"]));
}

#[test]
fn record_extension_fills_missing_fields() {
    let mut env = Env::new();
    let stmts = vec![
        point_decl(),
        let_value(
            "base",
            expr(ast::ExprKind::Record {
                fields: vec![(id("x"), int_lit(1)), (id("y"), int_lit(2))],
                extends: None,
            }),
        ),
        let_value(
            "moved",
            expr(ast::ExprKind::Record {
                fields: vec![(id("x"), int_lit(3))],
                extends: Some(Box::new(var("base"))),
            }),
        ),
    ];
    check(&stmts, &mut env).unwrap();
    assert_eq!(bound_type(&mut env, "moved"), "t");
}

#[test]
fn repeated_record_field_rejected() {
    let mut env = Env::new();
    let stmts = vec![
        point_decl(),
        let_value(
            "bad",
            expr(ast::ExprKind::Record {
                fields: vec![(id("x"), int_lit(1)), (id("x"), int_lit(2))],
                extends: None,
            }),
        ),
    ];
    let err = check(&stmts, &mut env).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::RepeatedField { ref field } if field == "x"));
}

#[test]
fn alias_declaration_unifies_transparently() {
    let mut env = Env::new();
    // type meters = int; let m = ((1 : meters))
    let decl = stmt(ast::StmtKind::TypeDecl(ast::TypeDecl {
        name: id("meters"),
        params: vec![],
        body: ast::TypeDeclBody::Alias(named_ty("int", vec![])),
        span: sp(),
    }));
    let stmts = vec![
        decl,
        let_value(
            "m",
            expr(ast::ExprKind::Constraint {
                expr: Box::new(int_lit(1)),
                annot: named_ty("meters", vec![]),
            }),
        ),
    ];
    check(&stmts, &mut env).unwrap();
}

#[test]
fn annotation_arity_checked() {
    let mut env = Env::new();
    // int takes no parameters
    let stmts = vec![let_value(
        "x",
        expr(ast::ExprKind::Constraint {
            expr: Box::new(int_lit(1)),
            annot: named_ty("int", vec![named_ty("int", vec![])]),
        }),
    )];
    let err = check(&stmts, &mut env).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CtorArity { given: 1, expected: 0, .. }));
}

// ============================================================================
// Quantified invariants
// ============================================================================

#[test]
fn substitution_idempotent_on_elaborated_nodes() {
    let mut env = Env::new();
    let stmts = vec![
        point_decl(),
        let_value("id", fun(var_pat("x"), var("x"))),
        let_value("applied", apply(fun(var_pat("x"), var("x")), vec![int_lit(1)])),
    ];
    let elaborated = check(&stmts, &mut env).unwrap();

    let mut node_types = Vec::new();
    for s in &elaborated {
        if let TStmtKind::Value(_, e) = &s.kind {
            e.walk(&mut |node| node_types.push(node.ty));
        }
    }
    for ty in node_types {
        let once = env.flatten(ty);
        let twice = env.flatten(once);
        assert_eq!(type_repr(&env, once), type_repr(&env, twice));
    }
}

#[test]
fn substitution_stays_acyclic() {
    let mut env = Env::new();
    let stmts = vec![
        let_value("id", fun(var_pat("x"), var("x"))),
        let_value("a", apply(var("id"), vec![int_lit(1)])),
        let_value("b", apply(var("id"), vec![expr(ast::ExprKind::Tuple(vec![]))])),
    ];
    check(&stmts, &mut env).unwrap();
    assert!(env.substitution_acyclic());
}

#[test]
fn instances_visible_through_modules() {
    let mut env = Env::new();
    seed_show(&mut env);

    // A module defining an instance, then opened before use.
    let stmts = vec![
        stmt(ast::StmtKind::Module {
            name: id("Instances"),
            body: ModuleExpr::Structure(vec![stmt(ast::StmtKind::Instance {
                name: id("show_int"),
                value: expr(ast::ExprKind::Ctor(
                    Path::bare("Show", sp()),
                    Some(Box::new(int_lit(1))),
                )),
            })]),
        }),
        stmt(ast::StmtKind::Open(Path::bare("Instances", sp()))),
        let_value("p", fun(var_pat("x"), apply(var("show"), vec![var("x")]))),
    ];
    check(&stmts, &mut env).unwrap();
    assert_eq!(bound_type(&mut env, "p"), "int -> string");
}
