//! Type Pretty-Printer
//!
//! Renders type expressions for error messages. Variables print their
//! declared name when they have one and a numbered placeholder otherwise;
//! instances are followed so the rendering reflects the current
//! substitution.

use crate::ast::Explicitness;

use super::env::Env;
use super::types::{TypeId, TypeKind};

/// Render a type expression
pub fn type_repr(env: &Env, id: TypeId) -> String {
    let mut out = String::new();
    write_type(env, id, false, &mut out);
    out
}

/// Render a type, parenthesizing arrows in argument position
fn write_type(env: &Env, id: TypeId, nested: bool, out: &mut String) {
    let id = env.repr(id);
    match env.kind(id) {
        TypeKind::Var { name, .. } => match name {
            Some(name) => {
                out.push('\'');
                out.push_str(&name);
            }
            None => out.push_str(&id.to_string()),
        },
        TypeKind::Poly { vars, body } => {
            out.push('∀');
            for v in &vars {
                out.push(' ');
                match env.var_name(*v) {
                    Some(name) => {
                        out.push('\'');
                        out.push_str(&name);
                    }
                    None => out.push_str(&v.to_string()),
                }
            }
            out.push_str(". ");
            write_type(env, body, false, out);
        }
        TypeKind::Arrow { dom, cod, explicitness } => {
            if nested {
                out.push('(');
            }
            match explicitness {
                Explicitness::Explicit => write_type(env, dom, true, out),
                Explicitness::Implicit => {
                    out.push('{');
                    write_type(env, dom, false, out);
                    out.push('}');
                }
            }
            out.push_str(" -> ");
            write_type(env, cod, false, out);
            if nested {
                out.push(')');
            }
        }
        TypeKind::Tuple(items) => {
            out.push('(');
            for (i, t) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(env, *t, false, out);
            }
            out.push(')');
        }
        TypeKind::Ctor { name, params, .. } => {
            out.push_str(&name);
            if !params.is_empty() {
                out.push('(');
                for (i, t) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_type(env, *t, false, out);
                }
                out.push(')');
            }
        }
    }
}
