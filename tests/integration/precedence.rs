// Expression grammar: precedence, associativity, unary minus and parens.

mod common;
use common::*;

use nemc::parser::ast::*;
use nemc::parser::MAX_NESTING;

fn expr(source: &str) -> Expr {
    let (parsed, diag) = nemc::parse_expression(source, "<expr>");
    assert!(!diag.has_errors(), "{}", diag.format_all());
    parsed.unwrap().without_locations()
}

fn int(n: i64) -> Expr {
    Expr::int(n)
}

fn id(name: &str) -> Expr {
    Expr::ident(name)
}

#[test]
fn multiplication_binds_tighter() {
    assert_eq!(expr("a + b * c"), Expr::binary(BinOp::Add, id("a"), Expr::binary(BinOp::Mul, id("b"), id("c"))));
    assert_eq!(expr("a * b + c"), Expr::binary(BinOp::Add, Expr::binary(BinOp::Mul, id("a"), id("b")), id("c")));
}

#[test]
fn mod_and_div_share_multiplicative_level() {
    assert_eq!(
        expr("a mod b / c"),
        Expr::binary(BinOp::Div, Expr::binary(BinOp::Mod, id("a"), id("b")), id("c"))
    );
    assert_eq!(
        expr("a - b mod c"),
        Expr::binary(BinOp::Sub, id("a"), Expr::binary(BinOp::Mod, id("b"), id("c")))
    );
}

#[test]
fn left_associativity() {
    assert_eq!(expr("8 / 4 / 2"), Expr::binary(BinOp::Div, Expr::binary(BinOp::Div, int(8), int(4)), int(2)));
    assert_eq!(expr("1 - 2 + 3"), Expr::binary(BinOp::Add, Expr::binary(BinOp::Sub, int(1), int(2)), int(3)));
}

#[test]
fn unary_minus() {
    assert_eq!(expr("-x"), Expr::neg(id("x")));
    assert_eq!(expr("--x"), Expr::neg(Expr::neg(id("x"))));
    assert_eq!(expr("-a * b"), Expr::binary(BinOp::Mul, Expr::neg(id("a")), id("b")));
    assert_eq!(expr("a - -b"), Expr::binary(BinOp::Sub, id("a"), Expr::neg(id("b"))));
}

#[test]
fn parentheses_override_and_are_kept() {
    assert_eq!(
        expr("(a + b) * c"),
        Expr::binary(BinOp::Mul, Expr::paren(Expr::binary(BinOp::Add, id("a"), id("b"))), id("c"))
    );
    assert_eq!(expr("((1))"), Expr::paren(Expr::paren(int(1))));
}

#[test]
fn float_literal_in_expression() {
    assert_eq!(expr("2.5 * x"), Expr::binary(BinOp::Mul, Expr::new(ExprKind::FloatLiteral(2.5), None), id("x")));
}

#[test]
fn binary_node_location_is_operator() {
    let (parsed, _) = nemc::parse_expression("abc * 2", "<expr>");
    let loc = parsed.unwrap().location.unwrap();
    assert_eq!((loc.line, loc.column), (1, 5));
}

#[test]
fn i64_max_literal_accepted() {
    assert_eq!(expr("9223372036854775807"), int(i64::MAX));
}

#[test]
fn literal_out_of_range() {
    let (parsed, diag) = nemc::parse_expression("9223372036854775808", "<expr>");
    assert!(parsed.is_none());
    assert_eq!(messages(&diag), ["Integer literal out of range: 9223372036854775808"]);
}

#[test]
fn missing_operand() {
    let (parsed, diag) = nemc::parse_expression("1 +", "<expr>");
    assert!(parsed.is_none());
    assert_eq!(messages(&diag), ["Expected expression, found end of file"]);
}

#[test]
fn unclosed_paren() {
    let (_, diag) = nemc::parse_expression("(1 + 2", "<expr>");
    assert!(diag.has_errors());
    assert!(messages(&diag)[0].ends_with("found end of file"));
}

#[test]
fn deep_but_legal_nesting() {
    let src = format!("{}1{}", "(".repeat(32), ")".repeat(32));
    let (parsed, diag) = nemc::parse_expression(&src, "<expr>");
    assert!(diag.is_empty());
    assert!(parsed.is_some());
}

#[test]
fn nesting_limit() {
    let src = format!("{}1{}", "(".repeat(300), ")".repeat(300));
    let (parsed, diag) = nemc::parse_expression(&src, "<expr>");
    assert!(parsed.is_none());
    assert!(messages(&diag).iter().any(|m| m == "Expression nested too deeply (limit 256)"));
}

#[test]
fn nesting_limit_is_exact() {
    let at_limit = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
    let (parsed, diag) = nemc::parse_expression(&at_limit, "<expr>");
    assert!(diag.is_empty());
    assert!(parsed.is_some());

    let past_limit = format!("-{at_limit}");
    let (parsed, diag) = nemc::parse_expression(&past_limit, "<expr>");
    assert!(parsed.is_none());
    assert!(diag.has_errors());
}

#[test]
fn very_long_operator_chain_is_rejected_cleanly() {
    let src = format!("{}1", "1 + ".repeat(30_000));
    let (parsed, diag) = nemc::parse_expression(&src, "<expr>");
    assert!(parsed.is_none());
    assert_eq!(messages(&diag), ["Expression nested too deeply (limit 256)"]);
}
