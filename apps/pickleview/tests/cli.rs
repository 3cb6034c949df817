use assert_cmd::Command;
use predicates::prelude::*;
use pickleview_testkit::{full_run, minimal, run, write_ndjson};

fn pickleview() -> Command {
    let mut cmd = Command::cargo_bin("pickleview").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn render_markdown_to_stdout() {
    let (_dir, messages) = write_ndjson(&full_run()).unwrap();
    pickleview()
        .args(["render", "--messages"])
        .arg(&messages)
        .args(["--title", "Nightly"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Nightly\n"))
        .stdout(predicate::str::contains("## Feature: Examples Tables"))
        .stdout(predicate::str::contains("<strong title=\"int\">42</strong>"))
        .stdout(predicate::str::contains("| ✅ | LHR-CDG | 45 |"));
}

#[test]
fn render_json_to_file() {
    let (dir, messages) = write_ndjson(&full_run()).unwrap();
    let out = dir.path().join("out").join("report.json");
    pickleview()
        .args(["render", "--format", "json", "--messages"])
        .arg(&messages)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("wrote"));

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["version"], 1);
    assert_eq!(value["features"].as_array().unwrap().len(), 5);
}

#[test]
fn render_reads_stdin() {
    let stream = pickleview_testkit::to_ndjson(&run(&[minimal()])).unwrap();
    pickleview()
        .args(["render", "--messages", "-"])
        .write_stdin(stream)
        .assert()
        .success()
        .stdout(predicate::str::contains("<strong title=\"word\">belly</strong>"));
}

#[test]
fn config_file_sets_title_and_icons() {
    let (dir, messages) = write_ndjson(&run(&[minimal()])).unwrap();
    let config = dir.path().join("pickleview.yaml");
    std::fs::write(&config, "title: From config\nicons: ascii\n").unwrap();
    pickleview()
        .arg("--config")
        .arg(&config)
        .args(["render", "--messages"])
        .arg(&messages)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# From config\n"))
        .stdout(predicate::str::contains("(v)"));
}

#[test]
fn summary_exits_nonzero_on_problems() {
    let (_dir, messages) = write_ndjson(&full_run()).unwrap();
    pickleview()
        .args(["summary", "--messages"])
        .arg(&messages)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed: "))
        .stdout(predicate::str::contains("total: 11"));
}

#[test]
fn summary_of_passing_run_succeeds() {
    let (_dir, messages) = write_ndjson(&run(&[minimal()])).unwrap();
    pickleview()
        .args(["summary", "--messages"])
        .arg(&messages)
        .assert()
        .success()
        .stdout("passed: 1\ntotal: 1\n");
}

#[test]
fn malformed_stream_reports_the_line() {
    let dir = tempfile::tempdir().unwrap();
    let messages = dir.path().join("broken.ndjson");
    std::fs::write(&messages, "{\"meta\":{}}\nnot json\n").unwrap();
    pickleview()
        .args(["render", "--messages"])
        .arg(&messages)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn missing_messages_file_fails() {
    pickleview()
        .args(["render", "--messages", "does/not/exist.ndjson"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does/not/exist.ndjson"));
}

#[test]
fn unknown_format_is_rejected() {
    pickleview()
        .args(["render", "--messages", "-", "--format", "html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown output format"));
}
