pub mod token;
pub use token::{is_keyword, Token, TokenKind};

use std::ops::Range;

use logos::Logos;
use tracing::debug;

use crate::diagnostics::DiagnosticCollector;
use crate::span::{LineIndex, SourceLocation};

/// Tokenize NEM source. Never fails: problems are recorded in `diag` and the
/// stream always ends with exactly one `Eof`.
pub fn tokenize(source: &str, filename: &str, diag: &mut DiagnosticCollector) -> Vec<Token> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    // Starts true so leading newlines are dropped.
    let mut last_was_newline = true;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        for fault in std::mem::take(&mut lexer.extras.faults) {
            diag.error(fault.message, index.location(filename, fault.offset));
        }

        match result {
            Ok(TokenKind::Comment) => {}
            Ok(TokenKind::Newline) => {
                if !last_was_newline {
                    tokens.push(Token::new(TokenKind::Newline, "\n", locate(&index, filename, span)));
                    last_was_newline = true;
                }
            }
            Ok(kind) => {
                last_was_newline = false;
                let lexeme = match kind {
                    TokenKind::StringLit => lexer.extras.text.take().unwrap_or_default(),
                    _ => lexer.slice().to_string(),
                };
                tokens.push(Token::new(kind, lexeme, locate(&index, filename, span)));
            }
            Err(()) => {
                // No token is emitted, so newline collapsing is unaffected.
                for (i, c) in lexer.slice().char_indices() {
                    diag.error(
                        format!("Unexpected character: '{c}'"),
                        index.location(filename, span.start + i),
                    );
                }
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, "", index.location(filename, source.len())));
    debug!(file = filename, tokens = tokens.len(), "tokenized");
    tokens
}

fn locate(index: &LineIndex<'_>, filename: &str, span: Range<usize>) -> SourceLocation {
    let (end_line, end_column) = index.line_col(span.end);
    index.location(filename, span.start).with_end(end_line, end_column)
}
