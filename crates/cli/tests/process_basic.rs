//! Basic processing: roundtrips, stdin/stdout plumbing, key order.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn yamlweave() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("yamlweave"))
}

#[test]
fn plain_document_roundtrips_to_stdout() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("in.yaml");
    fs::write(&input, "hello: world\ncount: 3\n").unwrap();

    yamlweave()
        .arg("process")
        .arg("-i")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("hello: world"))
        .stdout(predicate::str::contains("count: 3"));
}

#[test]
fn reads_from_stdin_with_dash() {
    yamlweave()
        .arg("process")
        .arg("-i")
        .arg("-")
        .write_stdin("greeting: hi\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("greeting: hi"));
}

#[test]
fn writes_to_the_named_output_file() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("in.yaml");
    let output = tmp.path().join("out.yaml");
    fs::write(&input, "a: 1\n").unwrap();

    yamlweave()
        .arg("process")
        .arg("-i")
        .arg(&input)
        .arg(&output)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "a: 1\n");
}

#[test]
fn mapping_key_order_is_preserved() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("in.yaml");
    fs::write(&input, "zebra: 1\napple: 2\nmango: 3\n").unwrap();

    let output = yamlweave()
        .arg("process")
        .arg("-i")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let zebra = stdout.find("zebra").unwrap();
    let apple = stdout.find("apple").unwrap();
    let mango = stdout.find("mango").unwrap();
    assert!(zebra < apple && apple < mango, "{stdout}");
}

#[test]
fn empty_document_becomes_null() {
    yamlweave()
        .arg("process")
        .arg("-i")
        .arg("-")
        .write_stdin("# only a comment\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}

#[test]
fn missing_input_fails() {
    yamlweave()
        .arg("process")
        .arg("-i")
        .arg("/no/such/input.yaml")
        .assert()
        .failure();
}

#[test]
fn schema_pragma_is_reported_at_info_level() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("in.yaml");
    fs::write(&input, "#!https://example.com/schemas/job.json\nhello: world\n").unwrap();

    yamlweave()
        .arg("process")
        .arg("-i")
        .arg("-v")
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("https://example.com/schemas/job.json"));
}
