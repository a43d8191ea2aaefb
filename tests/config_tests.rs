//! Integration tests for configuration validation.
//!
//! These tests exercise the compiled binary's --check-config and
//! --show-config paths, including TLS validation.

use std::io::Write;
use tempfile::NamedTempFile;

/// Helper to get the binary path
fn binary_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_procdoctor"))
}

#[test]
fn test_default_config_is_valid() {
    let output = std::process::Command::new(binary_path())
        .args(["--no-config", "--check-config"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: '{}'", stdout);
    assert!(stdout.contains("Configuration is valid"));
}

#[test]
fn test_tls_enabled_without_paths() {
    let output = std::process::Command::new(binary_path())
        .args(["--no-config", "--enable-tls", "--check-config"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(
        stdout.contains("TLS is enabled but neither tls_cert_path nor tls_key_path are set")
            || stderr.contains("TLS is enabled but neither tls_cert_path nor tls_key_path are set"),
        "Expected error about missing TLS paths, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
}

#[test]
fn test_tls_enabled_with_cert_only() {
    let output = std::process::Command::new(binary_path())
        .args([
            "--no-config",
            "--enable-tls",
            "--tls-cert",
            "/some/path.pem",
            "--check-config",
        ])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(
        stdout.contains("TLS is enabled but tls_key_path is not set")
            || stderr.contains("TLS is enabled but tls_key_path is not set"),
        "Expected error about missing key path, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
}

#[test]
fn test_tls_enabled_with_missing_files() {
    let output = std::process::Command::new(binary_path())
        .args([
            "--no-config",
            "--enable-tls",
            "--tls-cert",
            "/nonexistent/cert.pem",
            "--tls-key",
            "/nonexistent/key.pem",
            "--check-config",
        ])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(
        stdout.contains("TLS certificate file not found")
            || stderr.contains("TLS certificate file not found"),
        "Expected error about missing certificate file, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
}

#[test]
fn test_invalid_threshold_in_config_file() {
    let mut file = NamedTempFile::with_suffix(".yaml").expect("Failed to create temp file");
    writeln!(file, "heap-usage-threshold: 1.5").expect("Failed to write config");

    let output = std::process::Command::new(binary_path())
        .args([
            "-c",
            file.path().to_str().unwrap(),
            "--check-config",
        ])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(
        stdout.contains("must be a ratio") || stderr.contains("must be a ratio"),
        "Expected threshold validation error, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
}

#[test]
fn test_zero_heartbeat_timeout_is_rejected() {
    let output = std::process::Command::new(binary_path())
        .args(["--no-config", "--heartbeat-timeout", "0", "--check-config"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(
        stdout.contains("heartbeat_timeout_secs must be greater than 0")
            || stderr.contains("heartbeat_timeout_secs must be greater than 0"),
        "Expected heartbeat timeout validation error, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
}

#[test]
fn test_config_file_values_survive_into_show_config() {
    let mut file = NamedTempFile::with_suffix(".yaml").expect("Failed to create temp file");
    writeln!(file, "port: 7777").expect("Failed to write config");
    writeln!(file, "retention-days: 14").expect("Failed to write config");

    let output = std::process::Command::new(binary_path())
        .args([
            "-c",
            file.path().to_str().unwrap(),
            "--show-config",
            "--config-format",
            "yaml",
        ])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: '{}'", stdout);
    assert!(stdout.contains("port: 7777"));
    assert!(stdout.contains("retention_days: 14"));
}

#[test]
fn test_cli_overrides_config_file() {
    let mut file = NamedTempFile::with_suffix(".yaml").expect("Failed to create temp file");
    writeln!(file, "port: 7777").expect("Failed to write config");

    let output = std::process::Command::new(binary_path())
        .args([
            "-c",
            file.path().to_str().unwrap(),
            "-p",
            "8888",
            "--show-config",
        ])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: '{}'", stdout);
    assert!(stdout.contains("port: 8888"));
}
