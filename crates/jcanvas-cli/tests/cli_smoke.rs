use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join("canvas").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

#[test]
fn cli_converts_to_html_next_to_the_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("two_nodes.canvas");
    fs::copy(fixture("two_nodes.canvas"), &input).expect("copy fixture");

    let exe = assert_cmd::cargo_bin!("jcanvas-cli");
    Command::new(exe)
        .current_dir(tmp.path())
        .args(["convert", input.to_string_lossy().as_ref()])
        .assert()
        .success();

    let html = fs::read_to_string(input.with_extension("html")).expect("read html");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains(r#"data-id="a""#));
    assert!(html.contains("Start<br>second line"));
}

#[test]
fn cli_writes_html_to_stdout_with_out_dash() {
    let exe = assert_cmd::cargo_bin!("jcanvas-cli");
    let output = Command::new(exe)
        .current_dir(repo_root())
        .args(["--out", "-", "--title", "Demo"])
        .arg(fixture("two_nodes.canvas"))
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("<title>Demo</title>"));
    assert!(stdout.contains(r#"id="zoom-in""#));
}

#[test]
fn cli_static_output_has_no_script() {
    let exe = assert_cmd::cargo_bin!("jcanvas-cli");
    let output = Command::new(exe)
        .current_dir(repo_root())
        .args(["--static", "--out", "-"])
        .arg(fixture("two_nodes.canvas"))
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(!stdout.contains("<script"));
    assert!(stdout.contains(r#"data-id="b""#));
}

#[test]
fn cli_manifest_reports_missing_files_but_succeeds() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("mixed.canvas");
    fs::copy(fixture("mixed.canvas"), &input).expect("copy fixture");

    let exe = assert_cmd::cargo_bin!("jcanvas-cli");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args(["manifest", "--margin", "0", "--sequential"])
        .arg(&input)
        .output()
        .expect("run");
    assert!(output.status.success());

    let manifest: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(manifest["layout"]["offset_x"], 40);
    assert_eq!(manifest["nodes"].as_array().map(Vec::len), Some(6));

    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("missing.png"), "{stderr}");
    assert!(stderr.contains("backdrop.png"), "{stderr}");
}

#[test]
fn cli_reads_stdin() {
    let exe = assert_cmd::cargo_bin!("jcanvas-cli");
    assert_cmd::Command::new(exe)
        .args(["validate", "-"])
        .write_stdin(r#"{"nodes": [], "edges": []}"#)
        .assert()
        .success()
        .stdout("valid: 0 node(s), 0 edge(s)\n");
}

#[test]
fn cli_rejects_invalid_documents() {
    let doc = r#"{"nodes": [{"id": "a", "type": "text", "x": 0, "y": 0, "width": 10, "height": 10, "text": "a"}],
                 "edges": [{"id": "e1", "fromNode": "a", "toNode": "zzz"}]}"#;
    let exe = assert_cmd::cargo_bin!("jcanvas-cli");
    let output = assert_cmd::Command::new(exe)
        .args(["validate", "-"])
        .write_stdin(doc)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("edge `e1`"), "{stderr}");
}

#[test]
fn cli_rejects_a_missing_root_dir() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let exe = assert_cmd::cargo_bin!("jcanvas-cli");
    Command::new(exe)
        .current_dir(tmp.path())
        .args(["--root-dir", "no-such-dir", "--out", "-"])
        .arg(fixture("two_nodes.canvas"))
        .assert()
        .code(1);
}

#[test]
fn cli_usage_errors_exit_with_2() {
    let exe = assert_cmd::cargo_bin!("jcanvas-cli");
    Command::new(exe).arg("--bogus").assert().code(2);
}
