// End-to-end tests of the `nemc` binary.

mod common;
use common::*;

const KERNEL: &str = "device \"npu.yaml\"
program tile:

const TILE = 64
const BYTES = TILE * 2

buffer IN : DDR (size=BYTES)
buffer W : L1[0] (size=TILE, align=64) @readonly

let x = region(W, 0, TILE) elem=i8, shape=[TILE]
";

#[test]
fn lex_prints_one_token_per_line() {
    let (_dir, file) = workspace(&[("k.nem", "const A = 1\n")]);
    let out = run([path(&file)]).status;
    assert!(!out.success(), "missing subcommand should fail");

    let out = run(["lex", path(&file)]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "1:1 CONST 'const'\n1:7 IDENT 'A'\n1:9 EQUALS '='\n1:11 INT_LIT '1'\n1:12 NEWLINE '\\n'\n2:1 EOF ''\n"
    );
}

#[test]
fn lex_reports_bad_characters() {
    let (_dir, file) = workspace(&[("k.nem", "a $ b\n")]);
    let out = run(["lex", path(&file)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Unexpected character: '$'"));
}

#[test]
fn parse_json() {
    let (_dir, file) = workspace(&[("k.nem", KERNEL)]);
    let out = run(["parse", path(&file), "--json"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["name"], "tile");
    assert_eq!(json["device_ref"], "npu.yaml");
    assert_eq!(json["statements"].as_array().unwrap().len(), 5);
}

#[test]
fn parse_debug_tree() {
    let (_dir, file) = workspace(&[("k.nem", "const A = 1\n")]);
    let out = run(["parse", path(&file)]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("ConstDecl"));
}

#[test]
fn check_prints_constants() {
    let (_dir, file) = workspace(&[("k.nem", KERNEL)]);
    let out = run(["check", path(&file)]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "TILE = 64\nBYTES = 128\n");
    assert!(stderr(&out).contains("0 error(s), 0 warning(s)"));
}

#[test]
fn check_fails_on_errors() {
    let (_dir, file) = workspace(&[("k.nem", "const A = 1 / 0\nbuffer B DDR (size=1)\n")]);
    let out = run(["check", path(&file)]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("division by zero in constant expression"), "{err}");
    assert!(err.contains("Expected ':' after buffer name"), "{err}");
    assert!(err.contains("k.nem"), "{err}");
    assert!(err.contains("2 error(s)"), "{err}");
}

#[test]
fn check_uses_config_constants() {
    let (_dir, file) = workspace(&[("k.nem", "const N = TILE * 2\n"), ("nem.toml", "[constants]\nTILE = 8\n")]);
    let out = run(["check", path(&file)]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "TILE = 8\nN = 16\n");
}

#[test]
fn check_deny_warnings() {
    let src = "endloop\nconst A = 1\n";
    let (dir, file) = workspace(&[("k.nem", src)]);
    let out = run(["check", path(&file)]);
    assert!(out.status.success());
    assert!(stderr(&out).contains("'endloop' without matching 'loop'"));

    let config = dir.path().join("strict.toml");
    std::fs::write(&config, "[diagnostics]\ndeny_warnings = true\n").unwrap();
    let out = run(["--config", path(&config), "check", path(&file)]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn bad_config_is_reported() {
    let (_dir, file) = workspace(&[("k.nem", "const A = 1\n"), ("nem.toml", "[diagnostics]\nfancy = true\n")]);
    let out = run(["check", path(&file)]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.starts_with("error: "), "{err}");
    assert!(err.contains("nem.toml"), "{err}");
}

#[test]
fn missing_file() {
    let out = run(["check", "/definitely/not/here.nem"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).starts_with("error: could not read"));
}

#[test]
fn fmt_prints_canonical_source() {
    let (_dir, file) = workspace(&[("k.nem", "const A=1\nconst B = A*2\nbuffer X:L2(align=4 size=B)@readonly\n")]);
    let out = run(["fmt", path(&file)]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "const A = 1\nconst B = A * 2\n\nbuffer X : L2 (size=B, align=4) @readonly\n");
}

#[test]
fn fmt_check() {
    let (_dir, file) = workspace(&[("k.nem", KERNEL)]);
    let out = run(["fmt", path(&file), "--check"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let (_dir, file) = workspace(&[("k.nem", "const A=1\n")]);
    let out = run(["fmt", path(&file), "--check"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("not formatted"));
}

#[test]
fn fmt_refuses_to_drop_lines() {
    let (_dir, file) = workspace(&[("k.nem", "const A = 1\nloop i in 0..A:\nendloop\n")]);
    let out = run(["fmt", path(&file)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("'loop' and the rest of its line are not preserved by the formatter"));
}

#[test]
fn fmt_refuses_to_drop_trailing_tokens_and_orphan_decorators() {
    let (_dir, file) = workspace(&[("k.nem", "const A = 1 2\n@orphan\n")]);
    let out = run(["fmt", path(&file)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).is_empty());
    let err = stderr(&out);
    assert!(err.contains("'2' and the rest of its line are not preserved"), "{err}");
    assert!(err.contains("'@' and the rest of its line are not preserved"), "{err}");
}

#[test]
fn eval_expressions() {
    let out = run(["eval", "7 / 3"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "2\n");

    let out = run(["eval", "-7 / 3"]);
    assert_eq!(stdout(&out), "-2\n");

    let out = run(["eval", "TILE * N mod 5", "-D", "TILE=4", "-D", "N=3"]);
    assert_eq!(stdout(&out), "2\n");
}

#[test]
fn eval_errors() {
    let out = run(["eval", "1 / 0"]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stderr(&out), "error: division by zero in constant expression\n");

    let out = run(["eval", "X + 1"]);
    assert_eq!(stderr(&out), "error: forward reference to undeclared constant `X`\n");

    let out = run(["eval", "1 +"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Expected expression"));

    let out = run(["eval", "1", "-D", "bad"]);
    assert!(!out.status.success());
}

#[test]
fn verbose_logs_to_stderr() {
    let (_dir, file) = workspace(&[("k.nem", "const A = 1\n")]);
    let out = run(["--verbose", "check", path(&file)]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "A = 1\n");
    let err = stderr(&out);
    assert!(err.contains("tokenized"), "{err}");
    assert!(err.contains("parsed statement"), "{err}");
}
