//! End-to-end tests for the `mamo-rs` binary.

#![allow(clippy::panic)]

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

const CREDENTIAL_VARS: [&str; 8] = [
    "OPENAI_API_KEY",
    "AZURE_OPENAI_API_KEY",
    "AZURE_OPENAI_ENDPOINT",
    "AZURE_OPENAI_CHAT_MODEL",
    "AZURE_OPENAI_EMBED_MODEL",
    "MAMO_CHAT_MODEL",
    "MAMO_EMBED_MODEL",
    "MAMO_DATA_DIR",
];

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// The binary, run from an empty directory with no credentials in scope.
fn mamo(workdir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mamo-rs").unwrap_or_else(|e| panic!("binary: {e}"));
    cmd.current_dir(workdir.path());
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn workdir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"))
}

#[test]
fn help_lists_commands() {
    let dir = workdir();
    mamo(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("priorities"));
}

#[test]
fn priorities_text_orders_by_critical_ratio() {
    let dir = workdir();
    let output = mamo(&dir)
        .arg("--data-dir")
        .arg(fixtures())
        .args(["priorities", "--as-of", "2030-01-01T00:00:00Z"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);

    let positions: Vec<usize> = ["J002", "J001", "J004", "J003"]
        .iter()
        .map(|job| text.find(job).unwrap_or_else(|| panic!("{job} missing in:\n{text}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "wrong order:\n{text}");
    assert!(text.contains("Available machines"));
}

#[test]
fn priorities_json_is_parseable() {
    let dir = workdir();
    let output = mamo(&dir)
        .env("MAMO_DATA_DIR", fixtures())
        .args(["--format", "json", "priorities", "-n", "1", "--as-of", "2030-01-01T00:00:00Z"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value =
        serde_json::from_slice(&output).unwrap_or_else(|e| panic!("bad json: {e}"));
    assert_eq!(value["cr_table"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["cr_table"][0]["job_id"], "J002");
    assert_eq!(value["available_machines"][0]["machine_id"], "M001");
}

#[test]
fn missing_data_dir_fails() {
    let dir = workdir();
    mamo(&dir)
        .args(["--data-dir", "does-not-exist", "priorities"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("jobs.csv"));
}

#[test]
fn invalid_as_of_fails() {
    let dir = workdir();
    mamo(&dir)
        .arg("--data-dir")
        .arg(fixtures())
        .args(["priorities", "--as-of", "next tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --as-of"));
}

#[test]
fn run_without_credentials_names_missing_setting() {
    let dir = workdir();
    mamo(&dir)
        .arg("--data-dir")
        .arg(fixtures())
        .args(["run", "--no-audit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required setting: api_key"));

    assert!(!dir.path().join("artifacts").exists());
}

#[test]
fn unknown_format_is_rejected() {
    let dir = workdir();
    mamo(&dir)
        .arg("--data-dir")
        .arg(fixtures())
        .args(["--format", "yaml", "priorities"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'yaml'"));
}

#[test]
fn non_numeric_max_steps_env_fails() {
    let dir = workdir();
    mamo(&dir)
        .arg("--data-dir")
        .arg(fixtures())
        .env("OPENAI_API_KEY", "sk-test")
        .env("MAMO_CHAT_MODEL", "gpt-4o-mini")
        .env("MAMO_EMBED_MODEL", "text-embedding-3-small")
        .env("MAMO_MAX_STEPS", "six")
        .env_remove("MAMO_PROVIDER")
        .args(["run", "--no-audit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value for max_steps"));
}
