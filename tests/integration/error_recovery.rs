// Error recovery: a broken statement is reported and parsing resumes on the
// next line.

mod common;
use common::*;

use nemc::parser::ast::Stmt;

#[test]
fn missing_colon_in_buffer_recovers() {
    let (program, msgs) = parse_messages("buffer BAD DDR (size=1024)\nbuffer GOOD : L2 (size=512)");
    assert!(!msgs.is_empty());
    assert_eq!(msgs[0], "Expected ':' after buffer name, found 'DDR'");
    let names: Vec<_> = program.statements.iter().map(Stmt::name).collect();
    assert_eq!(names, ["GOOD"]);
}

#[test]
fn bad_memory_level() {
    parse_should_fail_with("buffer X : L3 (size=1)", "Expected memory level (DDR, L2, L1), found identifier 'L3'");
}

#[test]
fn missing_buffer_paren() {
    parse_should_fail_with("buffer X : DDR size=1", "Expected '(' after memory level");
}

#[test]
fn unknown_buffer_property_stops_list() {
    parse_should_fail_with("buffer X : DDR (size=1, bank=2)", "Expected ')' after buffer properties");
}

#[test]
fn region_missing_comma() {
    parse_should_fail_with("let r = region(X 0, 4)", "Expected ',' after buffer name");
}

#[test]
fn region_bad_elem_type() {
    parse_should_fail_with("let r = region(X, 0, 4) elem=int8, shape=[4]", "Expected element type");
}

#[test]
fn region_missing_shape() {
    parse_should_fail_with("let r = region(X, 0, 4) elem=i8", "Expected ',' after elem type");
}

#[test]
fn duplicate_type_attribute() {
    parse_should_fail_with(
        "let r = region(X, 0, 4) elem=i8, shape=[4], layout=NC, layout=CN",
        "Duplicate type attribute 'layout'",
    );
}

#[test]
fn unknown_quant_descriptor() {
    parse_should_fail_with(
        "let r = region(X, 0, 4) elem=i8, shape=[4], quant=per_row(axis=0)",
        "Unknown quant descriptor: 'per_row'",
    );
}

#[test]
fn quant_field_name_checked() {
    parse_should_fail_with(
        "let r = region(X, 0, 4) elem=i8, shape=[4], quant=per_tensor(scales=1.0, zero_point=0)",
        "Expected 'scale'",
    );
}

#[test]
fn decorator_without_name() {
    parse_should_fail_with("buffer X : DDR (size=1) @(2)", "Expected decorator name after '@'");
}

#[test]
fn resource_index_unclosed() {
    parse_should_fail_with("buffer X : DDR (size=1) @resource(DMA[1)", "Expected ']' after resource index");
}

#[test]
fn several_errors_one_per_statement() {
    let src = "const = 1\nconst B = \nbuffer C : L2 (size=B)\nlet = 3\nconst D = 4\n";
    let (program, msgs) = parse_messages(src);
    assert_eq!(msgs.len(), 3, "{msgs:?}");
    let names: Vec<_> = program.statements.iter().map(Stmt::name).collect();
    assert_eq!(names, ["C", "D"]);
}

#[test]
fn error_location_points_at_offending_token() {
    let (_, diag) = nemc::parse("const A = 1\nbuffer X : DDR (size=)\n", "k.nem");
    let all = diag.get_all();
    assert_eq!(all[0].message, "Expected expression, found ')'");
    let loc = all[0].location.as_ref().unwrap();
    assert_eq!((loc.file.as_str(), loc.line, loc.column), ("k.nem", 2, 22));
}

#[test]
fn lexer_and_parser_errors_both_reported() {
    let (program, msgs) = parse_messages("const A = 1 $\nconst B = \"open\n");
    assert!(msgs.iter().any(|m| m == "Unexpected character: '$'"));
    assert!(msgs.iter().any(|m| m == "Unterminated string literal (newline in string)"));
    assert_eq!(program.statements[0].name(), "A");
}

#[test]
fn const_in_loop_is_error_but_loop_body_continues() {
    let src = "loop i in 0..4:\n  const X = 1\n  let r = region(B, i, 1)\nendloop\n";
    let (program, msgs) = parse_messages(src);
    assert_eq!(msgs, ["Const declaration not permitted inside loop body"]);
    assert_eq!(program.regions().count(), 1);
}

#[test]
fn nested_loops_tracked() {
    let src = "loop i in 0..2:\nloop j in 0..2:\nendloop\nconst X = 1\nendloop\nconst Y = 2\n";
    let (program, msgs) = parse_messages(src);
    assert_eq!(msgs, ["Const declaration not permitted inside loop body"]);
    assert_eq!(program.statements.len(), 1);
}

#[test]
fn parse_is_deterministic() {
    let src = "buffer BAD DDR\nconst A = 1 / \nlet r = region(X, 0, 4) elem=i8, shape=[4]\n";
    let (p1, d1) = nemc::parse(src, "t.nem");
    let (p2, d2) = nemc::parse(src, "t.nem");
    assert_eq!(p1, p2);
    assert_eq!(messages(&d1), messages(&d2));
}
