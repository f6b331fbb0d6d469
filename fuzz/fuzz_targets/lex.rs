#![no_main]
use libfuzzer_sys::fuzz_target;
use nemc::lexer::TokenKind;
use nemc::DiagnosticCollector;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary text to the lexer - should never panic
    if let Ok(s) = std::str::from_utf8(data) {
        let mut diag = DiagnosticCollector::new();
        let tokens = nemc::tokenize(s, "fuzz.nem", &mut diag);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }
});
