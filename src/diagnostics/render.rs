use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};

use super::{Diagnostic, Severity};
use crate::span::LineIndex;

/// Render diagnostics with ariadne. Diagnostics without a location fall back
/// to their one-line form.
pub fn render_all(source: &str, filename: &str, diagnostics: &[Diagnostic], color: bool) -> String {
    let index = LineIndex::new(source);
    let mut out = String::new();
    for diagnostic in diagnostics {
        out.push_str(&render_one(source, filename, &index, diagnostic, color));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn render_one(source: &str, filename: &str, index: &LineIndex<'_>, diagnostic: &Diagnostic, color: bool) -> String {
    let Some(bytes) = byte_range(source, index, diagnostic) else {
        return diagnostic.to_string();
    };
    // ariadne counts characters, not bytes.
    let range = char_offset(source, bytes.start)..char_offset(source, bytes.end);

    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
    };

    let mut report = Report::build(kind, filename, range.start)
        .with_config(Config::default().with_color(color))
        .with_message(&diagnostic.message)
        .with_label(Label::new((filename, range)).with_message(&diagnostic.message));
    for note in &diagnostic.notes {
        report = report.with_note(note);
    }

    let mut buf = Vec::new();
    match report.finish().write((filename, Source::from(source)), &mut buf) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => diagnostic.to_string(),
    }
}

/// Byte range of a located diagnostic. A location without an end covers one
/// character.
fn byte_range(source: &str, index: &LineIndex<'_>, diagnostic: &Diagnostic) -> Option<Range<usize>> {
    let loc = diagnostic.location.as_ref()?;
    if source.is_empty() {
        return None;
    }
    let start = index.offset_of(loc.line, loc.column)?;
    let end = match (loc.end_line, loc.end_column) {
        (Some(line), Some(column)) => index.offset_of(line, column).unwrap_or(start),
        _ => start,
    };
    let next_char = |at: usize| source[at..].chars().next().map_or(at, |c| at + c.len_utf8());
    if start >= source.len() {
        // EOF: point at the last character instead of past it.
        let last = source.char_indices().next_back().map_or(0, |(i, _)| i);
        return Some(last..source.len());
    }
    let end = if end > start { end.min(source.len()) } else { next_char(start) };
    Some(start..end)
}

fn char_offset(source: &str, byte: usize) -> usize {
    source.get(..byte).map_or_else(|| source.chars().count(), |prefix| prefix.chars().count())
}
