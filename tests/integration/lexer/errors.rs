// Invalid characters and recovery.

use super::*;

#[test]
fn unexpected_character_reported_and_skipped() {
    let (tokens, diag) = lex("const X = 1 ? 2");
    assert_eq!(diag.get_all()[0].message, "Unexpected character: '?'");
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, [Const, Ident, Equals, IntLit, IntLit, Eof]);
}

#[test]
fn each_bad_character_reported() {
    let messages = lex_messages("a ! b ~ c");
    assert_eq!(messages, ["Unexpected character: '!'", "Unexpected character: '~'"]);
}

#[test]
fn non_ascii_character() {
    let (tokens, diag) = lex("x € y");
    assert_eq!(diag.get_all()[0].message, "Unexpected character: '€'");
    let loc = diag.get_all()[0].location.clone().unwrap();
    assert_eq!((loc.line, loc.column), (1, 3));
    assert_eq!(tokens.len(), 3);
}

#[test]
fn errors_do_not_stop_later_lines() {
    let (tokens, diag) = lex("$\nconst A = 1\n");
    assert_eq!(diag.len(), 1);
    assert!(tokens.iter().any(|t| t.kind == Const));
}

#[test]
fn errors_are_not_warnings() {
    let (_, diag) = lex("?");
    assert!(diag.has_errors());
    assert_eq!(diag.error_count(), 1);
    assert_eq!(diag.warning_count(), 0);
}
