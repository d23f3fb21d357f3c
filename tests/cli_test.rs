//! CLI tests for the nudge-assistant binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_config(temp: &TempDir) -> std::path::PathBuf {
    let config_path = temp.path().join("config.json");
    let config = serde_json::json!({
        "db_path": temp.path().join("reminders.db"),
        "timezone": "UTC",
        "digest_hour": 8,
        "tick_interval_secs": 1
    });
    std::fs::write(&config_path, config.to_string()).unwrap();
    config_path
}

fn cli(config_path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("nudge-assistant").unwrap();
    cmd.arg("--config").arg(config_path);
    cmd
}

#[test]
fn test_handle_creates_reminder() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(&temp);

    cli(&config_path)
        .args(["handle", "--sender", "+16175551234", "Remind me to take meds tomorrow at 9am"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added reminder #1"))
        .stdout(predicate::str::contains("take meds"));
}

#[test]
fn test_handle_then_list() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(&temp);

    cli(&config_path)
        .args(["handle", "--sender", "+16175551234", "Remind me to call GP tomorrow at 11am"])
        .assert()
        .success();

    cli(&config_path)
        .args(["list", "--owner", "+16175551234"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 call GP"));
}

#[test]
fn test_handle_unknown_message() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(&temp);

    cli(&config_path)
        .args(["handle", "--sender", "+16175551234", "how are you"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Remind me to"));
}

#[test]
fn test_handle_rejects_timeless_reminder() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(&temp);

    cli(&config_path)
        .args(["handle", "--sender", "+16175551234", "remind me to water plants"])
        .assert()
        .success()
        .stdout(predicate::str::contains("couldn't work out when"));
}

#[test]
fn test_tick_on_empty_database() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(&temp);

    cli(&config_path)
        .arg("tick")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 nudges"));
}

#[test]
fn test_list_empty() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(&temp);

    cli(&config_path)
        .args(["list", "--owner", "+16175551234"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending reminders"));
}
