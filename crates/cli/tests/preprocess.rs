//! The line-level preprocessor.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn yamlweave() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("yamlweave"))
}

#[test]
fn direct_include_splices_raw_text() {
    let tmp = tempdir().unwrap();
    let anchors = tmp.path().join("anchors.yaml");
    fs::write(&anchors, "_defaults: &defaults\n  retries: 3\n").unwrap();

    yamlweave()
        .arg("preprocess")
        .arg("-i")
        .arg("-")
        .write_stdin(format!(
            "DIRECT_INCLUDE={}\njob:\n  <<: *defaults\n",
            anchors.display()
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains("_defaults: &defaults"))
        .stdout(predicate::str::contains("<<: *defaults"));
}

#[test]
fn defines_expand_in_the_filename() {
    let tmp = tempdir().unwrap();
    let spliced = tmp.path().join("spliced.yaml");
    fs::write(&spliced, "spliced: yes\n").unwrap();

    yamlweave()
        .arg("preprocess")
        .arg("-i")
        .arg("-D")
        .arg(format!("DIR={}", tmp.path().display()))
        .arg("-")
        .write_stdin("DIRECT_INCLUDE=${DIR}/spliced.yaml\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("spliced: yes"));
}

#[test]
fn output_file_receives_the_spliced_text() {
    let tmp = tempdir().unwrap();
    let part = tmp.path().join("part.yaml");
    let input = tmp.path().join("in.yaml");
    let output = tmp.path().join("out.yaml");
    fs::write(&part, "b: 2\n").unwrap();
    fs::write(&input, format!("a: 1\nDIRECT_INCLUDE={}\n", part.display())).unwrap();

    yamlweave()
        .arg("preprocess")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "a: 1\nb: 2\n");
}

#[test]
fn missing_direct_include_fails() {
    yamlweave()
        .arg("preprocess")
        .arg("-i")
        .arg("-")
        .write_stdin("DIRECT_INCLUDE=/no/such/file\n")
        .assert()
        .failure();
}
