//! Basic CLI E2E tests.
//!
//! Each test runs the built binary with HOME pointed at a scratch directory
//! so the real configuration is never touched.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    run_cli_with_input(home, args, None)
}

fn run_cli_with_input(home: &Path, args: &[&str], input: Option<&str>) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_huckle"))
        .args(args)
        .env("HOME", home)
        .env("TZ", "UTC")
        .env_remove("HUCKLE_ENV")
        .env_remove("HUCKLEBERRY_EMAIL")
        .env_remove("HUCKLEBERRY_PASSWORD")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    {
        let mut stdin = child.stdin.take().expect("stdin");
        if let Some(input) = input {
            stdin.write_all(input.as_bytes()).expect("write stdin");
        }
    }
    let output = child.wait_with_output().expect("wait for CLI");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_windows_json() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(
        home.path(),
        &[
            "windows",
            "--fed-at",
            "2026-03-01T12:00:00Z",
            "--now",
            "2026-03-01T14:30:00Z",
            "--json",
        ],
    );
    assert_eq!(code, 0, "windows failed: {stderr}");

    let reading: serde_json::Value = serde_json::from_str(&stdout).expect("JSON output");
    assert_eq!(reading["elapsed"], 9000);
    let windows = reading["windows"].as_array().expect("windows array");
    assert_eq!(windows.len(), 4);
    assert_eq!(windows[0]["window"]["kind"], "elapsed");
    assert!(windows[0]["window"]["upper"].is_null());
    assert_eq!(windows[1]["window"]["kind"], "naptime");
    assert_eq!(windows[1]["status"], "elapsed");
    assert_eq!(windows[3]["window"]["kind"], "long_wake");
    assert_eq!(windows[3]["status"], "open");
}

#[test]
fn test_windows_table() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(
        home.path(),
        &[
            "windows",
            "--fed-at",
            "2026-03-01T12:00:00Z",
            "--now",
            "2026-03-01T13:05:00Z",
        ],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("+01:05"), "{stdout}");
    let naptime = stdout
        .lines()
        .find(|l| l.starts_with("naptime"))
        .expect("naptime row");
    assert!(naptime.contains("13:00-13:15"));
    assert!(naptime.contains("open"));
    assert!(naptime.contains("-00:02±7"));
}

#[test]
fn test_windows_rejects_bad_time() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["windows", "--fed-at", "noonish"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error: invalid time"), "{stderr}");
}

#[test]
fn test_config_path_and_get() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));
    assert!(stdout.trim().starts_with(home.path().to_str().unwrap()));

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "windows.naptime.low_min"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "60");

    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "windows.bedtime"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_show_redacts_password() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join(".config").join("huckle");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[credentials]\nemail = \"parent@example.com\"\npassword = \"hunter2\"\n",
    )
    .unwrap();

    let (stdout, stderr, code) = run_cli(home.path(), &["config", "show"]);
    assert_eq!(code, 0, "{stderr}");
    assert!(stdout.contains("parent@example.com"));
    assert!(stdout.contains("heartbeat_timeout_secs = 90"));
    assert!(!stdout.contains("hunter2"));
}

#[test]
fn test_watch_requires_credentials() {
    let home = tempfile::tempdir().unwrap();
    let feed = home.path().join("feed.jsonl");
    let (_, stderr, code) = run_cli(home.path(), &["watch", "--feed", feed.to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Missing credentials"), "{stderr}");
}

#[test]
fn test_watch_quits_on_command() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join(".config").join("huckle");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[credentials]\nemail = \"parent@example.com\"\npassword = \"secret\"\n",
    )
    .unwrap();
    let feed = home.path().join("feed.jsonl");
    let log = home.path().join("huckle.log");

    let (_, stderr, code) = run_cli_with_input(
        home.path(),
        &[
            "watch",
            "--feed",
            feed.to_str().unwrap(),
            "--log-file",
            log.to_str().unwrap(),
        ],
        Some("quit\n"),
    );
    assert_eq!(code, 0, "{stderr}");
    let logged = std::fs::read_to_string(&log).unwrap();
    assert!(logged.contains("starting monitor"));
    assert!(logged.contains("connection supervisor stopped"));
}
