//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the hwdiag binary
fn hwdiag_cmd() -> Command {
    let mut cmd = Command::cargo_bin("hwdiag").unwrap();
    // Keep runs independent of whatever is set in the developer's shell
    cmd.env_remove("HWDIAG_CONFIG");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    hwdiag_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hardware diagnostics"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("benchmark"))
        .stdout(predicate::str::contains("stress"))
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("devices"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command() {
    hwdiag_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hwdiag"))
        .stdout(predicate::str::contains("Build Information"))
        .stdout(predicate::str::contains("Features"))
        .stdout(predicate::str::contains("Target"));
}

#[test]
fn test_short_version_flag() {
    hwdiag_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hwdiag"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_default() {
    hwdiag_cmd()
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("[server]"))
        .stdout(predicate::str::contains("[benchmark]"))
        .stdout(predicate::str::contains("[stress]"))
        .stdout(predicate::str::contains("[devices]"))
        .stdout(predicate::str::contains("[logging]"));
}

#[test]
fn test_config_validate_default() {
    hwdiag_cmd()
        .arg("config")
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_nonexistent_file() {
    hwdiag_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg("/nonexistent/path/hwdiag.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found").or(predicate::str::contains("Error")));
}

#[test]
fn test_config_init_writes_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hwdiag.toml");

    hwdiag_cmd()
        .arg("config")
        .arg("init")
        .arg("--path")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));

    assert!(path.exists());
}

// ─────────────────────────────────────────────────────────────────
// Diagnostics Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_stats_table() {
    hwdiag_cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("RAM:"))
        .stdout(predicate::str::contains("Disk:"));
}

#[test]
fn test_stats_json() {
    let output = hwdiag_cmd().arg("stats").arg("--json").output().unwrap();
    assert!(output.status.success());

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(body["ram"]["total_gb"].is_number());
    assert!(body["ram"]["percent"].is_number());
    assert!(body["disk"]["used_gb"].is_number());
}

#[test]
fn test_devices_lists_cpu() {
    hwdiag_cmd()
        .arg("--quiet")
        .arg("devices")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("cpu"));
}

#[test]
fn test_benchmark_help() {
    hwdiag_cmd()
        .arg("benchmark")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--size"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--json"));
}

#[cfg(not(feature = "cuda"))]
#[test]
fn test_benchmark_without_accelerator() {
    hwdiag_cmd()
        .arg("--quiet")
        .arg("benchmark")
        .arg("--size")
        .arg("64")
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmark Results (64x64"))
        .stdout(predicate::str::contains("GPU unavailable"));
}

#[test]
fn test_benchmark_saves_report() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports").join("bench.json");

    hwdiag_cmd()
        .arg("--quiet")
        .arg("benchmark")
        .arg("--size")
        .arg("32")
        .arg("--output")
        .arg(&path)
        .env("HWDIAG_ENABLE_ACCELERATOR", "false")
        .assert()
        .success()
        .stdout(predicate::str::contains("Report saved to"));

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["size"], 32);
    assert!(saved["cpu"].as_f64().unwrap() >= 0.0);
    assert_eq!(saved["summary"], "GPU unavailable");
}

#[test]
fn test_benchmark_non_positive_size_reports_failure() {
    hwdiag_cmd()
        .arg("--quiet")
        .arg("benchmark")
        .arg("--size")
        .arg("-5")
        .arg("--json")
        .env("HWDIAG_ENABLE_ACCELERATOR", "false")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cpu\": -1"));
}

#[test]
fn test_stress_zero_duration() {
    hwdiag_cmd()
        .arg("--quiet")
        .arg("stress")
        .arg("--duration")
        .arg("0")
        .env("HWDIAG_ENABLE_ACCELERATOR", "false")
        .env("HWDIAG_STRESS_PRIMARY_DIM", "64")
        .env("HWDIAG_STRESS_FALLBACK_DIM", "32")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"Completed\""))
        .stdout(predicate::str::contains("\"device\": \"cpu\""))
        .stdout(predicate::str::contains("\"matrix_operations\": 0"))
        .stdout(predicate::str::contains("\"dimension\": 64"));
}

// ─────────────────────────────────────────────────────────────────
// Verbosity Flag Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_flag() {
    hwdiag_cmd()
        .arg("-v")
        .arg("version")
        .assert()
        .success();
}

#[test]
fn test_quiet_flag() {
    hwdiag_cmd()
        .arg("--quiet")
        .arg("version")
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_command() {
    hwdiag_cmd()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_subcommand() {
    hwdiag_cmd().assert().failure();
}

#[test]
fn test_serve_with_invalid_config() {
    hwdiag_cmd()
        .arg("serve")
        .arg("--config")
        .arg("/nonexistent/hwdiag.toml")
        .assert()
        .failure();
}
