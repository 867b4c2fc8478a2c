//! Diagnostic Rendering
//!
//! Turns the checker's single fatal error into terminal output. The whole
//! diagnostic is composed into a string first, so callers can route it to
//! stderr, a log, or a test buffer unchanged:
//!
//! ```text
//! error[E0004]: unbound value 'y'
//!  ┌─ demo.brm:1:9
//! 1 │ let x = y
//!   │         ─
//! ```

use std::io::{self, Write};

use crate::typeck::error::TypeError;

use super::span::{LineCol, SourceFile, SourceTable};

/// Rendering options
pub struct ReportConfig {
    /// Use colors in output
    pub color: bool,
    /// Show Unicode characters
    pub unicode: bool,
    /// Show source snippets
    pub show_source: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            color: true,
            unicode: true,
            show_source: true,
        }
    }
}

/// SGR parameter strings for the three things the reporter paints
mod paint {
    pub const HEADER: &str = "1;31";
    pub const FRAME: &str = "34";
    pub const MARKER: &str = "31";
}

/// Renders type errors against a source table
pub struct Reporter<'a> {
    table: &'a SourceTable,
    config: ReportConfig,
}

impl<'a> Reporter<'a> {
    pub fn new(table: &'a SourceTable) -> Self {
        Self {
            table,
            config: ReportConfig::default(),
        }
    }

    pub fn with_config(table: &'a SourceTable, config: ReportConfig) -> Self {
        Self { table, config }
    }

    /// Compose the full diagnostic
    pub fn render(&self, error: &TypeError) -> String {
        let mut out = String::new();

        let header = format!("error[{}]", error.code());
        out.push_str(&self.painted(paint::HEADER, &header));
        out.push_str(": ");
        out.push_str(&error.kind.to_string());
        out.push('\n');

        if let Some(file) = self.table.file(error.span.file) {
            let at = file.line_col(error.span.lo);
            self.push_location(&mut out, file, at);
            if self.config.show_source {
                self.push_snippet(&mut out, file, at, error.span.len());
            }
        }

        out
    }

    /// Render to stderr
    pub fn eprint(&self, error: &TypeError) -> io::Result<()> {
        self.write_to(&mut io::stderr(), error)
    }

    /// Render to an arbitrary writer
    pub fn write_to<W: Write>(&self, out: &mut W, error: &TypeError) -> io::Result<()> {
        writeln!(out, "{}", self.render(error))
    }

    /// The ` ┌─ file:line:col` line
    fn push_location(&self, out: &mut String, file: &SourceFile, at: LineCol) {
        let corner = if self.config.unicode { "┌─" } else { ">" };
        out.push(' ');
        out.push_str(&self.painted(paint::FRAME, corner));
        out.push(' ');
        out.push_str(&format!("{}:{}:{}\n", file.name, at.line, at.col));
    }

    /// The offending line plus a marker line underneath it
    fn push_snippet(&self, out: &mut String, file: &SourceFile, at: LineCol, span_len: u32) {
        let text = file.line_text(at.line);
        let gutter = at.line.to_string();
        let bar = if self.config.unicode { "│" } else { "|" };

        out.push_str(&self.painted(paint::FRAME, &format!("{gutter} {bar}")));
        out.push(' ');
        out.push_str(text);
        out.push('\n');

        // The marker may not run past the end of the line.
        let lead = (at.col - 1) as usize;
        let width = (span_len as usize).clamp(1, text.len().saturating_sub(lead).max(1));
        let tick = if self.config.unicode { "─" } else { "^" };

        out.push_str(&" ".repeat(gutter.len()));
        out.push_str(&self.painted(paint::FRAME, &format!(" {bar}")));
        out.push(' ');
        out.push_str(&" ".repeat(lead));
        out.push_str(&self.painted(paint::MARKER, &tick.repeat(width)));
        out.push('\n');
    }

    fn painted(&self, sgr: &str, text: &str) -> String {
        if self.config.color {
            format!("\x1b[{sgr}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

/// Print an error to stderr
pub fn emit(table: &SourceTable, error: &TypeError) {
    let _ = Reporter::new(table).eprint(error);
}
