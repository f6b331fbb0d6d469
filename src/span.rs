use std::fmt;

use serde::{Deserialize, Serialize};

/// A position in NEM source. Lines and columns are 1-indexed; columns count
/// characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub end_line: Option<u32>,
    pub end_column: Option<u32>,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self { file: file.into(), line, column, end_line: None, end_column: None }
    }

    pub fn with_end(mut self, end_line: u32, end_column: u32) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Byte offset <-> line/column lookup for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { source, line_starts }
    }

    /// Line and column (both 1-indexed) of a byte offset. Offsets past the
    /// end clamp to the end of the source.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self.source.get(start..offset).map_or(offset - start, |s| s.chars().count());
        (line as u32 + 1, column as u32 + 1)
    }

    pub fn location(&self, file: &str, offset: usize) -> SourceLocation {
        let (line, column) = self.line_col(offset);
        SourceLocation::new(file, line, column)
    }

    /// Inverse of [`line_col`](Self::line_col). Returns `None` for positions
    /// outside the source.
    pub fn offset_of(&self, line: u32, column: u32) -> Option<usize> {
        if line == 0 || column == 0 {
            return None;
        }
        let start = *self.line_starts.get(line as usize - 1)?;
        let end = self
            .line_starts
            .get(line as usize)
            .copied()
            .unwrap_or(self.source.len());
        let text = &self.source[start..end];
        let wanted = column as usize - 1;
        match text.char_indices().nth(wanted) {
            Some((i, _)) => Some(start + i),
            None if text.chars().count() == wanted => Some(end),
            None => None,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
