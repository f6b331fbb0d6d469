#![allow(dead_code)]

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use nemc::parser::ast::Program;
use nemc::DiagnosticCollector;

pub fn nemc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nemc"))
}

/// Parse and assert there are no error diagnostics.
pub fn parse_ok(source: &str) -> Program {
    let (program, diag) = nemc::parse(source, "test.nem");
    assert!(!diag.has_errors(), "unexpected errors:\n{}", diag.format_all());
    program
}

/// Parse and return every diagnostic message.
pub fn parse_messages(source: &str) -> (Program, Vec<String>) {
    let (program, diag) = nemc::parse(source, "test.nem");
    (program, messages(&diag))
}

pub fn messages(diag: &DiagnosticCollector) -> Vec<String> {
    diag.iter().map(|d| d.message.clone()).collect()
}

pub fn parse_should_fail_with(source: &str, expected: &str) {
    let (_, msgs) = parse_messages(source);
    assert!(
        msgs.iter().any(|m| m.contains(expected)),
        "expected an error containing {expected:?}, got {msgs:?}"
    );
}

/// Write `files` into a fresh directory and return it with the path of the first one.
pub fn workspace(files: &[(&str, &str)]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    let first = dir.path().join(files[0].0);
    (dir, first)
}

pub fn run<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    nemc().arg("--no-color").args(args).output().unwrap()
}

pub fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
