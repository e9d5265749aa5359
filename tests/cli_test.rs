//! Integration tests for the certpoller binary

mod common;

use certpoller::config::Config;
use chrono::Duration;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn certpoller_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_certpoller"))
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn run(args: &[&str]) -> Output {
    Command::new(certpoller_bin())
        .args(args)
        .output()
        .expect("Failed to execute")
}

#[test]
fn test_missing_config_file() {
    let output = run(&["--config", "/nonexistent/certpoller.yml"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("Error: Config file not found"), "{}", stdout);
}

#[test]
fn test_config_flag_is_required() {
    let output = run(&[]);
    assert!(!output.status.success());
}

#[test]
fn test_zero_timeout_is_rejected() {
    let config = write_config("urls:\n  - https://127.0.0.1:1\n");
    let output = run(&["-c", config.path().to_str().unwrap(), "--timeout", "0"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(!stdout.contains("Checking"), "{}", stdout);
    assert!(stderr.contains("--timeout"), "{}", stderr);
}

#[test]
fn test_zero_timeout_in_config_is_rejected() {
    let config = write_config("timeout_secs: 0\nurls:\n  - https://127.0.0.1:1\n");
    let output = run(&["-c", config.path().to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stdout.contains("Error: Validation Error: timeout_secs must be at least 1"),
        "{}",
        stdout
    );
    assert!(!stdout.contains("Checking"), "{}", stdout);
}

#[test]
fn test_example_config_is_loadable() {
    let output = run(&["--example-config"]);
    assert!(output.status.success());

    let yaml = String::from_utf8(output.stdout).unwrap();
    let targets = Config::from_yaml(&yaml).unwrap().targets().unwrap();
    assert_eq!(targets.len(), 3);
    assert_eq!(targets[1].name, "Google");
}

#[test]
fn test_healthy_certificate_exits_zero() {
    let port = common::serve_expiring_in(Duration::days(365));
    let config = write_config(&format!(
        "urls:\n  - name: Local\n    url: https://127.0.0.1:{}\n",
        port
    ));

    let output = run(&["-c", config.path().to_str().unwrap(), "--timeout", "5"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", stdout);
    assert!(stdout.contains("Checking Local..."));
    assert!(stdout.contains("Status:     OK"));
    assert!(stdout.contains("Key:        EC (256 bits)"));
}

#[test]
fn test_warning_days_override_from_command_line() {
    let port = common::serve_expiring_in(Duration::days(60));
    let config = write_config(&format!(
        "warning_days: 10\nurls:\n  - https://127.0.0.1:{}\n",
        port
    ));
    let path = config.path().to_str().unwrap();

    assert!(run(&["-c", path, "-t", "5"]).status.success());

    let output = run(&["-c", path, "-t", "5", "--warning-days", "90"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("WARNING (expires in 60 days)"), "{}", stdout);
}

#[test]
fn test_json_output() {
    let healthy = common::serve_expiring_in(Duration::days(200));
    let expired = common::serve_expiring_in(Duration::days(-5));
    let config = write_config(&format!(
        "urls:\n  - https://127.0.0.1:{}\n  - name: Old\n    url: https://127.0.0.1:{}\n  - name: Dead\n    url: https://thisdoesnotexist.invalid\n",
        healthy, expired
    ));

    let output = run(&["-c", config.path().to_str().unwrap(), "-f", "json", "-t", "5"]);
    assert_eq!(output.status.code(), Some(1));

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let results = parsed.as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["expired"], false);
    assert_eq!(results[1]["name"], "Old");
    assert_eq!(results[1]["expired"], true);
    assert_eq!(results[1]["expires_soon"], false);
    assert_eq!(results[2]["name"], "Dead");
    assert!(results[2]["error"].is_string());
}
