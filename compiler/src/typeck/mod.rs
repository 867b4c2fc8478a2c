//! Type Checker
//!
//! Verifies type-correctness of a parsed program, infers the most general
//! type for every unannotated binding, resolves implicit arguments against
//! the instance environment, and returns the elaborated tree together with
//! the enriched environment.
//!
//! ## Module Structure
//!
//! - `types` - Type expressions, declarations, typed indices
//! - `env` - Scope stack, registries, arena, substitution with undo trail
//! - `unify` - Equality up to substitution, alias unfolding
//! - `pattern` - Pattern checking with pluggable binders
//! - `expr` - Bidirectional expression elaboration
//! - `implicits` - Instance resolution and generalization at binding sites
//! - `tast` - The elaborated (typed) syntax tree
//! - `error` - Error taxonomy
//! - `pretty` - Type rendering for error messages
//!
//! ## Data Flow
//!
//! ```text
//!  statements ──▶ check ──▶ check_binding ──▶ check_expr ──▶ unify
//!                   │             │               │
//!                   │             ▼               ▼
//!                   │        implicits       check_pattern
//!                   ▼
//!            elaborated tree + Env
//! ```
//!
//! The checker runs on a single thread, strictly sequentially, and raises
//! the first error found.

pub mod env;
pub mod error;
pub mod expr;
pub mod implicits;
pub mod pattern;
pub mod pretty;
pub mod tast;
pub mod types;
pub mod unify;

pub use env::{Env, Scope, ScopeKind};
pub use error::{ErrorKind, NameKind, TypeError};
pub use tast::{TExpr, TPat, TStmt, TStmtKind};
pub use types::{DeclId, TypeId};

use tracing::debug;

use crate::ast;

use self::implicits::check_binding;
use self::tast::TExprKind;

/// Check a sequence of top-level statements, threading the environment.
///
/// On success every expression node of the result is annotated with its
/// final type and `env` holds the top-level bindings, type declarations and
/// implicit instances. The first error aborts the run.
pub fn check(stmts: &[ast::Stmt], env: &mut Env) -> Result<Vec<TStmt>, TypeError> {
    stmts
        .iter()
        .map(|stmt| {
            let elaborated = check_stmt(env, stmt)?;
            assert_no_placeholders(&elaborated)?;
            Ok(elaborated)
        })
        .collect()
}

fn check_stmt(env: &mut Env, stmt: &ast::Stmt) -> Result<TStmt, TypeError> {
    let span = stmt.span;
    match &stmt.kind {
        ast::StmtKind::Value { pattern, value } => {
            debug!("checking value binding");
            let (tpat, texpr) = check_binding(env, pattern, value, true)?;
            Ok(TStmt { kind: TStmtKind::Value(tpat, texpr), span })
        }

        ast::StmtKind::Instance { name, value } => {
            debug!(name = %name.name, "checking instance declaration");
            let pattern = ast::Pattern {
                kind: ast::PatternKind::Var(name.clone()),
                span: name.span,
            };
            let (_, texpr) = check_binding(env, &pattern, value, true)?;
            let ty = env
                .lookup_value(&name.name)
                .expect("instance binding just added");
            env.register_instance(&name.name, ty);
            Ok(TStmt { kind: TStmtKind::Instance(name.clone(), texpr), span })
        }

        ast::StmtKind::TypeDecl(decl) => {
            debug!(name = %decl.name.name, "importing type declaration");
            let id = env.import_type_decl(decl)?;
            Ok(TStmt { kind: TStmtKind::TypeDecl(id), span })
        }

        ast::StmtKind::Module { name, body } => match body {
            ast::ModuleExpr::Structure(stmts) => {
                debug!(name = %name.name, "entering module");
                env.open_module_scope();
                let mut out = Vec::with_capacity(stmts.len());
                for s in stmts {
                    match check_stmt(env, s) {
                        Ok(ts) => out.push(ts),
                        Err(e) => {
                            env.close_module_scope();
                            return Err(e);
                        }
                    }
                }
                let scope = env.close_module_scope();
                env.bind_module(&name.name, scope);
                Ok(TStmt { kind: TStmtKind::Module(name.clone(), out), span })
            }
            ast::ModuleExpr::Name(path) => {
                let scope = env.module_scope(path)?;
                env.bind_module(&name.name, scope);
                Ok(TStmt { kind: TStmtKind::ModuleAlias(name.clone(), path.clone()), span })
            }
        },

        ast::StmtKind::Open(path) => {
            debug!(path = %path, "opening module");
            let scope = env.module_scope(path)?;
            env.push_open_scope(scope);
            Ok(TStmt { kind: TStmtKind::Open(path.clone()), span })
        }
    }
}

/// Walk an elaborated statement's expressions
pub(crate) fn walk_stmt(stmt: &TStmt, f: &mut impl FnMut(&TExpr)) {
    match &stmt.kind {
        TStmtKind::Value(_, e) | TStmtKind::Instance(_, e) => e.walk(f),
        TStmtKind::Module(_, stmts) => {
            for s in stmts {
                walk_stmt(s, f);
            }
        }
        TStmtKind::TypeDecl(_) | TStmtKind::ModuleAlias(..) | TStmtKind::Open(_) => {}
    }
}

/// Internal-invariant check: no placeholder survives elaboration
pub(crate) fn assert_no_placeholders(stmt: &TStmt) -> Result<(), TypeError> {
    let mut leaked = None;
    walk_stmt(stmt, &mut |e| {
        if let TExprKind::Implicit(_) = e.kind {
            leaked.get_or_insert(e.span);
        }
    });
    match leaked {
        Some(span) => Err(TypeError::new(span, ErrorKind::UnifiableExpr)),
        None => Ok(()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, Ident, Path, Pattern, PatternKind, StmtKind};
    use crate::errors::span::Span;

    fn sp() -> Span {
        Span::dummy()
    }

    fn stmt(kind: StmtKind) -> ast::Stmt {
        ast::Stmt { kind, span: sp() }
    }

    fn value_stmt(name: &str, value: ast::Expr) -> ast::Stmt {
        stmt(StmtKind::Value {
            pattern: Pattern { kind: PatternKind::Var(Ident::new(name, sp())), span: sp() },
            value,
        })
    }

    fn int_lit(n: i64) -> ast::Expr {
        ast::Expr { kind: ExprKind::Int(n), span: sp() }
    }

    #[test]
    fn test_value_statement_binds() {
        let mut env = Env::new();
        let stmts = vec![value_stmt("x", int_lit(1))];
        let out = check(&stmts, &mut env).unwrap();
        assert_eq!(out.len(), 1);
        assert!(env.lookup_value("x").is_some());
    }

    #[test]
    fn test_module_statement_namespaces() {
        let mut env = Env::new();
        let stmts = vec![stmt(StmtKind::Module {
            name: Ident::new("M", sp()),
            body: ast::ModuleExpr::Structure(vec![value_stmt("x", int_lit(1))]),
        })];
        check(&stmts, &mut env).unwrap();

        // x is not visible unqualified, only through the module.
        assert_eq!(env.lookup_value("x"), None);
        let path = Path::Dotted(Box::new(Path::bare("M", sp())), Ident::new("x", sp()));
        assert!(env.lookup_value_path(&path).is_ok());
    }

    #[test]
    fn test_open_brings_names_into_scope() {
        let mut env = Env::new();
        let stmts = vec![
            stmt(StmtKind::Module {
                name: Ident::new("M", sp()),
                body: ast::ModuleExpr::Structure(vec![value_stmt("x", int_lit(1))]),
            }),
            stmt(StmtKind::Open(Path::bare("M", sp()))),
            value_stmt("y", ast::Expr { kind: ExprKind::Var(Path::bare("x", sp())), span: sp() }),
        ];
        check(&stmts, &mut env).unwrap();
        assert!(env.lookup_value("y").is_some());
    }

    #[test]
    fn test_module_alias() {
        let mut env = Env::new();
        let stmts = vec![
            stmt(StmtKind::Module {
                name: Ident::new("M", sp()),
                body: ast::ModuleExpr::Structure(vec![value_stmt("x", int_lit(1))]),
            }),
            stmt(StmtKind::Module {
                name: Ident::new("N", sp()),
                body: ast::ModuleExpr::Name(Path::bare("M", sp())),
            }),
        ];
        check(&stmts, &mut env).unwrap();
        let path = Path::Dotted(Box::new(Path::bare("N", sp())), Ident::new("x", sp()));
        assert!(env.lookup_value_path(&path).is_ok());
    }

    #[test]
    fn test_unknown_module_open() {
        let mut env = Env::new();
        let stmts = vec![stmt(StmtKind::Open(Path::bare("Nowhere", sp())))];
        let err = check(&stmts, &mut env).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Unbound { kind: NameKind::Module, .. }));
    }

    #[test]
    fn test_first_error_aborts() {
        let mut env = Env::new();
        let stmts = vec![
            value_stmt("x", ast::Expr { kind: ExprKind::Var(Path::bare("missing", sp())), span: sp() }),
            value_stmt("y", int_lit(1)),
        ];
        assert!(check(&stmts, &mut env).is_err());
        // The second statement never ran.
        assert_eq!(env.lookup_value("y"), None);
    }
}
