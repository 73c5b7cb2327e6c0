//! End-to-end tests of the `workpulse` binary.

use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn workpulse(home: &Path, args: &[&str], stdin: Option<&str>) -> Output {
    let db = home.join("cli.db");
    let mut child = Command::new(env!("CARGO_BIN_EXE_workpulse"))
        .arg("--db")
        .arg(&db)
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute binary");

    if let Some(body) = stdin {
        child
            .stdin
            .as_mut()
            .unwrap()
            .write_all(body.as_bytes())
            .unwrap();
    }
    drop(child.stdin.take());
    child.wait_with_output().expect("Failed to wait for binary")
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

const ALICE: [&str; 4] = ["--user", "alice", "--org", "acme"];

#[test]
fn test_session_and_activity_round_trip() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    let started = json(&workpulse(
        home,
        &["session", "start", "--user", "alice", "--org", "acme", "--project", "apollo"],
        None,
    ));
    let session_id = started["id"].as_str().unwrap().to_string();
    assert_eq!(started["status"], "active");

    let logged = json(&workpulse(
        home,
        &[
            &["activity", "log", session_id.as_str()][..],
            &ALICE[..],
            &["--type", "active", "--duration", "30"][..],
        ]
        .concat(),
        None,
    ));
    assert_eq!(logged["session"]["total_active_seconds"], 30);

    let active = json(&workpulse(home, &[&["session", "active"][..], &ALICE[..]].concat(), None));
    assert_eq!(active["id"], session_id.as_str());

    let stopped = json(&workpulse(
        home,
        &[&["session", "stop", session_id.as_str()][..], &ALICE[..]].concat(),
        None,
    ));
    assert_eq!(stopped["status"], "stopped");
}

#[test]
fn test_bulk_upload_from_stdin_is_idempotent() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    let started = json(&workpulse(
        home,
        &[
            &["session", "start"][..],
            &ALICE[..],
            &["--start", "2024-03-01T09:00:00Z"][..],
        ]
        .concat(),
        None,
    ));
    let session_id = started["id"].as_str().unwrap().to_string();

    let body = r#"{"activities":[
        {"client_activity_id":"a","timestamp":"2024-03-01T09:01:00Z","activity_type":"active","duration_seconds":60,"url":"editor"},
        {"client_activity_id":"b","timestamp":"2024-03-01T09:02:00Z","activity_type":"idle","duration_seconds":30}
    ]}"#;
    let args = [&["activity", "bulk", session_id.as_str()][..], &ALICE[..]].concat();

    let first = json(&workpulse(home, &args, Some(body)));
    assert_eq!(first["uploaded"], 2);
    let second = json(&workpulse(home, &args, Some(body)));
    assert_eq!(second["uploaded"], 0);
    assert_eq!(second["duplicates"], 2);

    let job = json(&workpulse(
        home,
        &["job", "run", "daily-summary", "--date", "2024-03-01"],
        None,
    ));
    assert_eq!(job["job"], "daily-summary");
    assert_eq!(job["processed"], 1);

    let report = json(&workpulse(
        home,
        &[&["report", "daily"][..], &ALICE[..], &["--date", "2024-03-01"][..]].concat(),
        None,
    ));
    assert_eq!(report["active_seconds"], 60);
    assert_eq!(report["productivity_score"], 66.67);

    let org = json(&workpulse(
        home,
        &[&["report", "org"][..], &["--user", "carol", "--org", "acme"][..]].concat(),
        None,
    ));
    assert_eq!(org.as_array().map(Vec::len), Some(1));
    assert_eq!(org[0]["user_id"], "alice");

    let other_org = json(&workpulse(
        home,
        &["report", "org", "--user", "zed", "--org", "globex"],
        None,
    ));
    assert_eq!(other_org.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_errors_exit_nonzero() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    let unknown_job = workpulse(home, &["job", "run", "weekly-report"], None);
    assert!(!unknown_job.status.success());

    let bad_type = workpulse(
        home,
        &[
            &["activity", "log", "missing"][..],
            &ALICE[..],
            &["--type", "sleeping", "--duration", "5"][..],
        ]
        .concat(),
        None,
    );
    assert!(!bad_type.status.success());
    assert!(String::from_utf8_lossy(&bad_type.stderr).contains("not an activity type"));

    let missing = workpulse(home, &[&["session", "show", "missing"][..], &ALICE[..]].concat(), None);
    assert!(!missing.status.success());
}

#[test]
fn test_migrate_reports_schema_version() {
    let home = TempDir::new().unwrap();
    let output = workpulse(home.path(), &["migrate"], None);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("schema version 2"));
}
