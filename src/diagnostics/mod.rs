pub mod render;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::span::SourceLocation;

pub use render::render_all;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One message about a source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, location: impl Into<Option<SourceLocation>>) -> Self {
        Self { severity, message: message.into(), location: location.into(), notes: Vec::new() }
    }

    pub fn error(message: impl Into<String>, location: impl Into<Option<SourceLocation>>) -> Self {
        Self::new(Severity::Error, message, location)
    }

    pub fn warning(message: impl Into<String>, location: impl Into<Option<SourceLocation>>) -> Self {
        Self::new(Severity::Warning, message, location)
    }

    pub fn info(message: impl Into<String>, location: impl Into<Option<SourceLocation>>) -> Self {
        Self::new(Severity::Info, message, location)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{loc}: ")?;
        }
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Append-only log of diagnostics for one parse.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>, location: impl Into<Option<SourceLocation>>) {
        self.push(Diagnostic::error(message, location));
    }

    pub fn warning(&mut self, message: impl Into<String>, location: impl Into<Option<SourceLocation>>) {
        self.push(Diagnostic::warning(message, location));
    }

    pub fn info(&mut self, message: impl Into<String>, location: impl Into<Option<SourceLocation>>) {
        self.push(Diagnostic::info(message, location));
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// True iff at least one Error was recorded. Warnings and infos never count.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    /// Owned snapshot; changing it does not touch the collector.
    pub fn get_all(&self) -> Vec<Diagnostic> {
        self.diagnostics.clone()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// One line per diagnostic, in insertion order.
    pub fn format_all(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a DiagnosticCollector {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

/// Unwinds a failed production back to the statement loop. The diagnostic
/// has already been recorded by the time this is returned.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, location: impl Into<Option<SourceLocation>>) -> Self {
        Self { message: message.into(), location: location.into() }
    }
}
