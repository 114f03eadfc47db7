//! End-to-end runs of the `conductor` binary against the offline service.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn conductor(temp: &Path, args: &[&str]) -> Output {
    let home = temp.join("home");
    let config_home = temp.join("config");
    let workspace = temp.join("ws");
    for dir in [&home, &config_home, &workspace] {
        fs::create_dir_all(dir).unwrap();
    }

    let bin = env!("CARGO_BIN_EXE_conductor");
    Command::new(bin)
        .env("HOME", home.as_os_str())
        .env("XDG_CONFIG_HOME", config_home.as_os_str())
        .env_remove("GEMINI_API_KEY")
        .env_remove("CONDUCTOR_LOG")
        .arg("--workspace")
        .arg(&workspace)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_offline_route_logs_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs").join("conductor.log");
    let log_arg = log_path.to_string_lossy().to_string();

    let output = conductor(
        temp_dir.path(),
        &["--offline", "--log-output", "file", "--log-file", &log_arg, "route"],
    );
    assert!(
        output.status.success(),
        "conductor route should succeed: stderr={:?}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Category: weather"));

    assert!(log_path.exists(), "log file should exist at {}", log_path.display());
    let content = fs::read_to_string(&log_path).unwrap();
    assert!(
        content.contains("Conductor CLI starting"),
        "log file should contain a startup message; got: {}",
        content.lines().next().unwrap_or("")
    );
}

#[test]
fn test_quiet_offline_plan_prints_results_only() {
    let temp_dir = TempDir::new().unwrap();
    let output = conductor(temp_dir.path(), &["--offline", "--quiet", "plan"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"task_id\": \"t1\""));
    assert!(
        String::from_utf8_lossy(&output.stderr).trim().is_empty(),
        "quiet mode should not log"
    );
}

#[test]
fn test_missing_credentials_exit_with_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = conductor(temp_dir.path(), &["--quiet", "route"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.starts_with("Error: Provider not configured"),
        "unexpected stderr: {}",
        stderr
    );
}
