//! Source Positions
//!
//! Byte-offset spans attached to every AST and elaborated node. The checker
//! treats spans as opaque payload and only the diagnostic reporter converts
//! them to human-readable line/column form, through the file table kept
//! alongside the parsed input.

/// Identifies a file registered in the [`SourceTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

/// A half-open byte range `lo..hi` within one source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub file: SourceId,
    pub lo: u32,
    pub hi: u32,
}

impl Span {
    pub fn new(file: SourceId, lo: u32, hi: u32) -> Self {
        debug_assert!(lo <= hi);
        Self { file, lo, hi }
    }

    /// Placeholder span for synthesized nodes
    pub fn dummy() -> Self {
        Self { file: SourceId(0), lo: 0, hi: 0 }
    }

    /// Length in bytes
    pub fn len(&self) -> u32 {
        self.hi - self.lo
    }

    pub fn is_empty(&self) -> bool {
        self.lo == self.hi
    }

    /// The smallest span covering `self` and `other`
    pub fn to(self, other: Span) -> Span {
        debug_assert_eq!(self.file, other.file);
        Span {
            file: self.file,
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }
}

/// A 1-based line/column pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// One registered source file, with a precomputed index of line starts
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(name: String, text: String) -> Self {
        // Line n starts right after the (n-1)th newline.
        let mut line_starts = vec![0u32];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i as u32 + 1),
        );
        Self { name, text, line_starts }
    }

    /// Line and column of a byte offset
    pub fn line_col(&self, offset: u32) -> LineCol {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        LineCol {
            line: line as u32 + 1,
            col: offset - self.line_starts[line] + 1,
        }
    }

    /// The text of a 1-based line, without its newline
    pub fn line_text(&self, line: u32) -> &str {
        let idx = (line.saturating_sub(1)) as usize;
        if idx >= self.line_starts.len() {
            return "";
        }
        let lo = self.line_starts[idx] as usize;
        let hi = self
            .line_starts
            .get(idx + 1)
            .map(|&next| (next as usize).saturating_sub(1))
            .unwrap_or(self.text.len());
        &self.text[lo..hi]
    }
}

/// Registry of the files a checker run may report against
#[derive(Debug, Default)]
pub struct SourceTable {
    files: Vec<SourceFile>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) -> SourceId {
        let id = SourceId(self.files.len() as u32);
        self.files.push(SourceFile::new(name.into(), text.into()));
        id
    }

    pub fn file(&self, id: SourceId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }
}
