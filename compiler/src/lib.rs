//! Brume Compiler Library
//!
//! The type checker of the Brume language: a small strongly-typed
//! functional language with Hindley-Milner inference, prenex polymorphism,
//! nominal type declarations with transparent aliases, and implicit
//! arguments resolved by compile-time instance lookup.
//!
//! The checker is a pure in-process transformation: it consumes the parsed
//! statement sequence produced by an earlier stage and returns the
//! elaborated tree (every expression annotated with its inferred type)
//! together with the enriched environment. Lexing, parsing and backend
//! serialization live elsewhere.

// ============================================================================
// Core Infrastructure
// ============================================================================
pub mod errors;

// ============================================================================
// Frontend Surface
// ============================================================================
pub mod ast;

// ============================================================================
// Type Checker
// ============================================================================
pub mod typeck;

// Re-exports for convenient access
pub use typeck::{check, Env, TypeError};
