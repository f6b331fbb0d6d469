pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod eval;
pub mod pretty;
pub mod config;

pub use diagnostics::{Diagnostic, DiagnosticCollector, ParseError, Severity};
pub use eval::{evaluate, ConstEnv, ConstTable, EvalError};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::ast::Program;
pub use parser::{parse, parse_expression, Parser};

/// Everything `check` learns about one source file.
#[derive(Debug)]
pub struct CheckOutput {
    pub program: Program,
    pub constants: ConstTable,
    pub diagnostics: DiagnosticCollector,
}

/// Parse a source string and evaluate its constants (lex → parse → const table).
/// `seed` constants are visible to every declaration.
pub fn check_source(source: &str, filename: &str, seed: &ConstEnv) -> CheckOutput {
    let (program, mut diagnostics) = parse(source, filename);
    let constants = ConstTable::build(&program, seed, &mut diagnostics);
    CheckOutput { program, constants, diagnostics }
}

/// Canonical source for `source`.
///
/// Refuses (with the diagnostics) when the file does not parse cleanly or the
/// parser dropped any tokens, so formatting never drops code.
pub fn format_source(source: &str, filename: &str) -> Result<String, DiagnosticCollector> {
    let mut diag = DiagnosticCollector::new();
    let tokens = tokenize(source, filename, &mut diag);
    let mut parser = Parser::new(&tokens, &mut diag);
    let program = parser.parse_program();
    let skipped = parser.skipped().to_vec();
    if diag.has_errors() {
        return Err(diag);
    }
    for tok in skipped {
        diag.error(
            format!("Cannot format: '{}' and the rest of its line are not preserved by the formatter", tok.lexeme),
            tok.location,
        );
    }
    if diag.has_errors() {
        return Err(diag);
    }
    Ok(pretty::pretty_print(&program))
}
