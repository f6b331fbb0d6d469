// Multi-line continuation of region attributes and decorators.

mod common;
use common::*;

use nemc::parser::ast::{Program, Stmt};
use nemc::pretty::pretty_print;

const ONE_LINE: &str = "let act = region(L1BUF, 0, TILE * 4) elem=bf16, shape=[TILE, 4], layout=NC @materialized @resource(VPU[1])\n";

const SPLIT: &str = "let act = region(L1BUF, 0, TILE * 4)
    elem=bf16, shape=[TILE, 4], layout=NC
    @materialized
    @resource(VPU[1])
";

fn region_parts(program: &Program) -> (String, usize) {
    let Stmt::Region(r) = &program.statements[0] else { panic!("expected region") };
    (r.type_attrs.as_ref().unwrap().elem.to_string(), r.decorators.len())
}

#[test]
fn split_region_parses_like_one_line() {
    let a = parse_ok(ONE_LINE);
    let b = parse_ok(SPLIT);
    assert_eq!(a.statements.len(), 1);
    assert_eq!(b.statements.len(), 1);
    assert_eq!(region_parts(&a), region_parts(&b));
    assert_eq!(pretty_print(&a), pretty_print(&b));
}

#[test]
fn blank_lines_between_continuations() {
    let src = "let act = region(L1BUF, 0, TILE * 4)\n\n    elem=bf16, shape=[TILE, 4], layout=NC\n\n    @materialized\n    @resource(VPU[1])\n";
    assert_eq!(pretty_print(&parse_ok(src)), pretty_print(&parse_ok(ONE_LINE)));
}

#[test]
fn continuation_does_not_swallow_next_statement() {
    let src = format!("{SPLIT}const N = 2\n");
    let program = parse_ok(&src);
    assert_eq!(program.statements.len(), 2);
    assert_eq!(program.statements[1].name(), "N");
}

#[test]
fn buffer_decorators_continue() {
    let a = parse_ok("buffer W : L2 (size=64) @readonly @max_in_flight(2)\n");
    let b = parse_ok("buffer W : L2 (size=64)\n  @readonly\n  @max_in_flight(2)\n");
    assert_eq!(pretty_print(&a), pretty_print(&b));
}

#[test]
fn decorators_after_type_attrs_on_same_continuation_line() {
    let a = parse_ok(ONE_LINE);
    let b = parse_ok("let act = region(L1BUF, 0, TILE * 4)\n  elem=bf16, shape=[TILE, 4], layout=NC @materialized @resource(VPU[1])\n");
    assert_eq!(pretty_print(&a), pretty_print(&b));
}
