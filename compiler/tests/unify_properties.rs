//! Property tests for the unification invariants
//!
//! Random small type shapes over a shared variable pool exercise the
//! quantified properties: reflexivity, symmetry of success, and acyclicity
//! of the substitution after arbitrary unification sequences.

use brume_compiler::ast::Explicitness;
use brume_compiler::errors::span::Span;
use brume_compiler::typeck::types::TypeId;
use brume_compiler::typeck::unify::unify;
use brume_compiler::Env;
use proptest::prelude::*;

/// A recipe for building a type in a fresh environment
#[derive(Debug, Clone)]
enum TyDesc {
    Int,
    Unit,
    /// Index into a shared variable pool, so the same variable can appear
    /// on both sides of a unification
    Var(u8),
    Arrow(Box<TyDesc>, Box<TyDesc>),
    Pair(Box<TyDesc>, Box<TyDesc>),
}

fn ty_desc() -> impl Strategy<Value = TyDesc> {
    let leaf = prop_oneof![
        Just(TyDesc::Int),
        Just(TyDesc::Unit),
        (0u8..4).prop_map(TyDesc::Var),
    ];
    leaf.prop_recursive(3, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| TyDesc::Arrow(Box::new(a), Box::new(b))),
            (inner.clone(), inner).prop_map(|(a, b)| TyDesc::Pair(Box::new(a), Box::new(b))),
        ]
    })
}

fn build(env: &mut Env, pool: &mut Vec<TypeId>, desc: &TyDesc) -> TypeId {
    let sp = Span::dummy();
    match desc {
        TyDesc::Int => env.int(sp),
        TyDesc::Unit => env.unit(sp),
        TyDesc::Var(i) => {
            while pool.len() <= *i as usize {
                let v = env.fresh_var(None, sp);
                pool.push(v);
            }
            pool[*i as usize]
        }
        TyDesc::Arrow(a, b) => {
            let a = build(env, pool, a);
            let b = build(env, pool, b);
            env.arrow(a, b, Explicitness::Explicit, sp)
        }
        TyDesc::Pair(a, b) => {
            let a = build(env, pool, a);
            let b = build(env, pool, b);
            env.tuple(vec![a, b], sp)
        }
    }
}

proptest! {
    #[test]
    fn unify_is_reflexive(desc in ty_desc()) {
        let mut env = Env::new();
        let mut pool = Vec::new();
        let t = build(&mut env, &mut pool, &desc);
        prop_assert!(unify(&mut env, t, t, Span::dummy()).is_ok());
    }

    #[test]
    fn unify_success_is_symmetric(a in ty_desc(), b in ty_desc()) {
        let mut env = Env::new();
        let mut pool = Vec::new();
        let ta = build(&mut env, &mut pool, &a);
        let tb = build(&mut env, &mut pool, &b);

        let mark = env.snapshot();
        let forward = unify(&mut env, ta, tb, Span::dummy()).is_ok();
        env.rollback(mark);
        let backward = unify(&mut env, tb, ta, Span::dummy()).is_ok();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn substitution_remains_acyclic(pairs in proptest::collection::vec((ty_desc(), ty_desc()), 1..4)) {
        let mut env = Env::new();
        let mut pool = Vec::new();
        for (a, b) in &pairs {
            let ta = build(&mut env, &mut pool, a);
            let tb = build(&mut env, &mut pool, b);
            // Success does not matter; the substitution must stay sound
            // either way.
            let _ = unify(&mut env, ta, tb, Span::dummy());
            prop_assert!(env.substitution_acyclic());
        }
    }

    #[test]
    fn rollback_restores_substitution(a in ty_desc(), b in ty_desc()) {
        let mut env = Env::new();
        let mut pool = Vec::new();
        let ta = build(&mut env, &mut pool, &a);
        let tb = build(&mut env, &mut pool, &b);

        let mark = env.snapshot();
        let _ = unify(&mut env, ta, tb, Span::dummy());
        env.rollback(mark);
        for v in &pool {
            prop_assert_eq!(env.instance(*v), None);
        }
    }
}
