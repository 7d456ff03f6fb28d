//! CLI tests for `escape check`, `escape manifest` and `escape init`.
//!
//! Spawns the escape binary offline and verifies exit codes and output for
//! passing, failing and unreadable manifests.

use std::fs;
use std::process::Command;

use escape::core::rubric::{PASSING_MANIFEST, STARTER_MANIFEST};
use escape::exit_codes;

fn escape_cmd(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_escape"));
    cmd.current_dir(dir).env_remove("ESCAPE_SERVER_URL");
    cmd
}

#[test]
fn passing_manifest_exits_ok() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("deploy.yaml"), PASSING_MANIFEST).expect("write manifest");

    let output = escape_cmd(temp.path())
        .args(["check", "deploy.yaml", "--offline"])
        .output()
        .expect("escape check");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[x] replicas >= 2"));
    assert!(stdout.contains("complete!"));
}

#[test]
fn starter_manifest_exits_not_passed() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("deploy.yaml"), STARTER_MANIFEST).expect("write manifest");

    let output = escape_cmd(temp.path())
        .args(["check", "deploy.yaml", "--offline"])
        .output()
        .expect("escape check");

    assert_eq!(output.status.code(), Some(exit_codes::NOT_PASSED));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("spec.replicas must be >= 2"));
}

#[test]
fn missing_manifest_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = escape_cmd(temp.path())
        .args(["check", "nope.yaml", "--offline"])
        .output()
        .expect("escape check");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("read nope.yaml"));
}

#[test]
fn manifest_prints_starter() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = escape_cmd(temp.path())
        .arg("manifest")
        .output()
        .expect("escape manifest");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(String::from_utf8_lossy(&output.stdout), STARTER_MANIFEST);
}

#[test]
fn saved_manifest_needs_the_progress_store() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = escape_cmd(temp.path())
        .args(["manifest", "--saved", "--offline"])
        .output()
        .expect("escape manifest");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("drop --offline"));
}

#[test]
fn init_writes_config_once() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = escape_cmd(temp.path())
        .args(["init", "--server-url", "http://progress.test:9000"])
        .output()
        .expect("escape init");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let written = fs::read_to_string(temp.path().join(".escape/config.toml")).expect("config");
    assert!(written.contains("server_url = \"http://progress.test:9000\""));

    let output = escape_cmd(temp.path())
        .arg("init")
        .output()
        .expect("escape init");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    let output = escape_cmd(temp.path())
        .args(["init", "--force"])
        .output()
        .expect("escape init --force");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let written = fs::read_to_string(temp.path().join(".escape/config.toml")).expect("config");
    assert!(written.contains("http://progress.test:9000"));
}

#[test]
fn offline_play_reads_stdin_until_eof() {
    use std::io::Write;
    use std::process::Stdio;

    let temp = tempfile::tempdir().expect("tempdir");
    let mut child = escape_cmd(temp.path())
        .args(["play", "--offline"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("escape play");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"docker pull nginx\ndocker run --name web -p 8080:80 nginx\ndocker logs web\n")
        .expect("write commands");

    let output = child.wait_with_output().expect("wait");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("flag{docker-stage-1-ok}"));
    assert!(stdout.contains("Level 1 (Docker) complete!"));
}
