//! End-to-end tests of the binary's argument handling and error output.
//!
//! Every case here fails or exits before any cloud CLI would be invoked.

use assert_cmd::Command;
use predicates::prelude::*;

use opsyield::test_utils::TestDir;

/// Binary with a scratch config path and logs diverted to a file.
fn opsyield(dir: &TestDir) -> Command {
    let mut cmd = Command::cargo_bin("opsyield").unwrap();
    for var in [
        "OPSYIELD_PROVIDERS",
        "OPSYIELD_FORMAT",
        "OPSYIELD_DAYS",
        "OPSYIELD_NO_COLOR",
        "OPSYIELD_PRETTY",
        "OPSYIELD_LOG",
        "OPSYIELD_LOG_FORMAT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("OPSYIELD_CONFIG", dir.path().join("config.toml"))
        .env("OPSYIELD_LOG_FILE", dir.path().join("opsyield.log"))
        .env("NO_COLOR", "1");
    cmd
}

fn last_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .to_string()
}

#[test]
fn help_lists_commands() {
    let dir = TestDir::new();
    opsyield(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("aggregate"));
}

#[test]
fn no_arguments_prints_quickstart() {
    let dir = TestDir::new();
    opsyield(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("QUICK START"))
        .stdout(predicate::str::contains("opsyield aggregate --providers gcp,aws,azure"));
}

#[test]
fn analyze_requires_provider_flag() {
    let dir = TestDir::new();
    opsyield(&dir)
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--provider"));
}

#[test]
fn unknown_provider_exits_with_config_error() {
    let dir = TestDir::new();
    opsyield(&dir)
        .args(["analyze", "--provider", "oracle"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("OPS-C010"))
        .stderr(predicate::str::contains("oracle"));
}

#[test]
fn json_errors_are_structured() {
    let dir = TestDir::new();
    let output = opsyield(&dir)
        .args(["--json", "analyze", "--provider", "oracle"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    let parsed: serde_json::Value = serde_json::from_str(&last_line(&output.stderr)).unwrap();
    assert_eq!(parsed["error_code"], "OPS-C010");
    assert_eq!(parsed["is_retryable"], false);
}

#[test]
fn zero_days_is_rejected() {
    let dir = TestDir::new();
    opsyield(&dir)
        .args(["aggregate", "--days", "0"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("OPS-C001"));
}

#[test]
fn unknown_provider_in_list_is_rejected() {
    let dir = TestDir::new();
    opsyield(&dir)
        .args(["aggregate", "--providers", "gcp,oracle"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("OPS-C010"));
}

#[test]
fn empty_provider_list_is_rejected() {
    let dir = TestDir::new();
    opsyield(&dir)
        .args(["aggregate", "--providers", " , "])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("OPS-C011"));
}

#[test]
fn bad_days_in_env_names_the_variable() {
    let dir = TestDir::new();
    opsyield(&dir)
        .env("OPSYIELD_DAYS", "lots")
        .arg("aggregate")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("OPSYIELD_DAYS"));
}

#[test]
fn config_file_providers_are_validated() {
    let dir = TestDir::new();
    dir.create_file(
        "config.toml",
        "[providers]\ndefault_providers = [\"gcp\", \"oracle\"]\n",
    );
    opsyield(&dir)
        .arg("aggregate")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("oracle"));
}

#[test]
fn malformed_config_file_is_reported() {
    let dir = TestDir::new();
    dir.create_file("config.toml", "[general\ndays = ");
    opsyield(&dir)
        .args(["--format", "json", "status"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("OPS-C002"));
}

#[test]
fn unknown_format_flag_is_a_usage_error() {
    let dir = TestDir::new();
    opsyield(&dir)
        .args(["--format", "yaml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("yaml"));
}

#[test]
fn json_logs_go_to_the_log_file() {
    let dir = TestDir::new();
    opsyield(&dir)
        .args(["--json-output", "--log-level", "debug", "analyze", "--provider", "oracle"])
        .assert()
        .code(3);

    let log = std::fs::read_to_string(dir.path().join("opsyield.log")).unwrap();
    let events: Vec<serde_json::Value> = log
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(
        events
            .iter()
            .any(|e| e["level"] == "ERROR" && e["fields"]["error_code"] == "OPS-C010"),
        "{log}"
    );
}
