//! End-to-end tests for the dirwatch binary
#![cfg(any(target_os = "linux", target_os = "android", windows))]

use crossbeam_channel::{unbounded, Receiver};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Output, Stdio};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn dirwatch(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_dirwatch"))
        .arg(dir)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn dirwatch");

    // The process may already have exited on a startup failure
    if let Some(mut pipe) = child.stdin.take() {
        let _ = pipe.write_all(stdin.as_bytes());
    }
    child.wait_with_output().unwrap()
}

/// Running binary with its stdout lines forwarded over a channel
struct Session {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
}

impl Session {
    fn spawn(dir: &Path, args: &[&str]) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_dirwatch"))
            .arg(dir)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn dirwatch");

        let stdin = child.stdin.take().unwrap();
        let stdout = child.stdout.take().unwrap();
        let (tx, lines) = unbounded();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self {
            child,
            stdin,
            lines,
        }
    }

    fn quit(mut self) -> bool {
        let _ = self.stdin.write_all(b"q\n");
        drop(self.stdin);
        self.child.wait().unwrap().success()
    }
}

#[test]
fn test_json_event_lines() {
    let temp_dir = TempDir::new().unwrap();
    let session = Session::spawn(temp_dir.path(), &["--json"]);

    // The watch is armed shortly after spawn; keep creating until one is seen
    let mut line = None;
    for i in 0..25 {
        fs::write(temp_dir.path().join(format!("file-{}.txt", i)), b"x").unwrap();
        if let Ok(received) = session.lines.recv_timeout(Duration::from_millis(200)) {
            line = Some(received);
            break;
        }
    }
    let line = line.expect("no event line printed");

    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["kind"], "added");
    let name = value["name"].as_str().unwrap();
    assert!(name.starts_with("file-"));
    assert_eq!(
        value["path"].as_str().unwrap(),
        temp_dir.path().join(name).to_str().unwrap()
    );

    assert!(session.quit());
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[test]
fn test_json_failure_line_when_directory_is_removed() {
    let temp_dir = TempDir::new().unwrap();
    let watched = temp_dir.path().join("watched");
    fs::create_dir(&watched).unwrap();
    let session = Session::spawn(&watched, &["--json"]);

    // Give the worker time to arm before the directory goes away
    thread::sleep(Duration::from_millis(300));
    fs::remove_dir(&watched).unwrap();

    let failure = std::iter::from_fn(|| session.lines.recv_timeout(Duration::from_secs(5)).ok())
        .find(|line| line.contains("\"error\""))
        .expect("no failure line printed");
    let value: serde_json::Value = serde_json::from_str(&failure).unwrap();
    assert!(value["os_error"].as_i64().unwrap() != 0);

    // The process stays up until asked to exit
    assert!(session.quit());
}

#[test]
fn test_quit_exits_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let output = dirwatch(temp_dir.path(), &[], "a\ns\nq\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stop"));
    assert!(stdout.contains("Resume"));
    assert!(stdout.contains("Exit"));
}

#[test]
fn test_eof_exits_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let output = dirwatch(temp_dir.path(), &["--json", "--paused"], "");

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_missing_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = dirwatch(&temp_dir.path().join("missing"), &[], "q\n");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open"));
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("dirwatch.toml");
    std::fs::write(&config, "buffer_size = 8\n").unwrap();

    let output = dirwatch(
        temp_dir.path(),
        &["--config", config.to_str().unwrap()],
        "q\n",
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load config"));
}
