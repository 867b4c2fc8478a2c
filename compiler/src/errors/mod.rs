//! Error Infrastructure
//!
//! Source positions and terminal reporting for the Brume type checker. The
//! checker's own error taxonomy lives in `typeck::error`; this module holds
//! everything needed to locate and render those errors: spans, the file
//! table that maps them back to lines and columns, and the diagnostic
//! renderer.

pub mod report;
pub mod span;

pub use report::*;
pub use span::*;
