//! CLI integration tests

use std::process::Command;

fn zone_recorder_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_zone-recorder"))
}

#[test]
fn help_output() {
    let output = zone_recorder_bin()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("run"));
    assert!(stdout.contains("simulate"));
    assert!(stdout.contains("control"));
    assert!(stdout.contains("config"));
}

#[test]
fn version_output() {
    let output = zone_recorder_bin()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("zone-recorder"));
}

#[test]
fn config_path_command() {
    let output = zone_recorder_bin()
        .args(["config", "path"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("zone-recorder"));
    assert!(stdout.contains("config.toml"));
}

#[test]
fn config_help() {
    let output = zone_recorder_bin()
        .args(["config", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("init"));
    assert!(stdout.contains("set"));
    assert!(stdout.contains("get"));
    assert!(stdout.contains("list"));
    assert!(stdout.contains("path"));
}

#[test]
fn config_set_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let output = zone_recorder_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "set", "api_key", "value"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unknown") || stderr.contains("Valid"),
        "Expected error about unknown key, got: {}",
        stderr
    );
}

#[test]
fn config_set_and_get_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    let set = zone_recorder_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "set", "site_id", "site-5"])
        .output()
        .expect("Failed to execute command");
    assert!(set.status.success());

    let get = zone_recorder_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "get", "site_id"])
        .output()
        .expect("Failed to execute command");
    assert!(get.status.success());
    let stdout = String::from_utf8_lossy(&get.stdout);
    assert!(stdout.contains("site-5"));
}

#[test]
fn config_set_invalid_mode() {
    let dir = tempfile::tempdir().unwrap();
    let output = zone_recorder_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "set", "mode", "sometimes"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid") || stderr.contains("automatic"),
        "Expected error about invalid mode, got: {}",
        stderr
    );
}

#[test]
fn control_without_daemon_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = zone_recorder_bin()
        // Point the socket path somewhere with no daemon
        .env("XDG_RUNTIME_DIR", dir.path())
        .args(["control", "status"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("No daemon running"),
        "Expected no-daemon error, got: {}",
        stderr
    );
}

#[test]
fn run_without_site_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = zone_recorder_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("run")
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("site"),
        "Expected error about missing site, got: {}",
        stderr
    );
}

#[test]
fn simulate_runs_a_trace_end_to_end() {
    let dir = tempfile::tempdir().unwrap();

    let zones_path = dir.path().join("zones.json");
    std::fs::write(
        &zones_path,
        r#"[{"id":"showroom-1","name":"Showroom","type":"showroom",
            "latitude":0.0,"longitude":0.0,"radius_m":50.0,"active":true}]"#,
    )
    .unwrap();

    // Walk in at ~10 m, then out to ~100 m (0.0009 degrees of latitude)
    let trace_path = dir.path().join("trace.jsonl");
    std::fs::write(
        &trace_path,
        concat!(
            "{\"latitude\":0.00009,\"longitude\":0.0,\"accuracy_m\":5.0,\"at_ms\":1000}\n",
            "{\"latitude\":0.0009,\"longitude\":0.0,\"accuracy_m\":5.0,\"at_ms\":3000}\n",
        ),
    )
    .unwrap();

    let output = zone_recorder_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .args([
            "simulate",
            "--trace",
            trace_path.to_str().unwrap(),
            "--zones",
            zones_path.to_str().unwrap(),
            "--mode",
            "automatic",
            "--sample-interval",
            "1",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "simulate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("locked_in_zone"),
        "Expected a lock transition, got: {}",
        stdout
    );
    assert!(
        stdout.contains("reason=exited_zone"),
        "Expected a closed session, got: {}",
        stdout
    );
}
