#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn outbox(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("outbox").unwrap();
    cmd.current_dir(dir.path()).env("OUTBOX_ROOT", dir.path());
    cmd
}

fn write_config(dir: &TempDir, api_base_url: &str) {
    std::fs::create_dir_all(dir.path().join(".outbox")).unwrap();
    std::fs::write(
        dir.path().join(".outbox/config.yaml"),
        format!("api_base_url: {api_base_url}\nsubmit_timeout_secs: 2\n"),
    )
    .unwrap();
}

fn list_json(dir: &TempDir) -> Vec<serde_json::Value> {
    let out = outbox(dir).args(["list", "--json"]).output().unwrap();
    assert!(out.status.success());
    serde_json::from_slice(&out.stdout).unwrap()
}

fn enqueue_offline(dir: &TempDir, message: &str) {
    outbox(dir)
        .args([
            "enqueue",
            "--url",
            "/api/data",
            "--body",
            &format!(r#"{{"message":"{message}"}}"#),
            "--offline",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued POST /api/data (offline)"));
}

// ---------------------------------------------------------------------------
// outbox init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();
    outbox(&dir).arg("init").assert().success();
    assert!(dir.path().join(".outbox/config.yaml").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    outbox(&dir).arg("init").assert().success();
    outbox(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
}

// ---------------------------------------------------------------------------
// outbox enqueue / list / clear
// ---------------------------------------------------------------------------

#[test]
fn list_on_fresh_project_is_empty() {
    let dir = TempDir::new().unwrap();
    outbox(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending actions."));
}

#[test]
fn offline_enqueue_persists_in_order() {
    let dir = TempDir::new().unwrap();
    enqueue_offline(&dir, "a");
    enqueue_offline(&dir, "b");

    let actions = list_json(&dir);
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0]["payload"]["message"], "a");
    assert_eq!(actions[1]["payload"]["message"], "b");
    assert_eq!(actions[0]["target"]["url"], "/api/data");
    assert!(actions[0]["enqueued_at"].as_i64().unwrap() <= actions[1]["enqueued_at"].as_i64().unwrap());

    outbox(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 pending"));
}

#[test]
fn clear_empties_queue() {
    let dir = TempDir::new().unwrap();
    enqueue_offline(&dir, "a");

    outbox(&dir)
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1 pending action(s)."));
    assert!(list_json(&dir).is_empty());
}

#[test]
fn enqueue_rejects_invalid_json_body() {
    let dir = TempDir::new().unwrap();
    outbox(&dir)
        .args(["enqueue", "--url", "/api/data", "--body", "{not json", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--body must be valid JSON"));
}

#[test]
fn enqueue_rejects_invalid_method() {
    let dir = TempDir::new().unwrap();
    outbox(&dir)
        .args([
            "enqueue", "--url", "/api/data", "--method", "BAD VERB", "--offline",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--method must be an HTTP method"));
    assert!(list_json(&dir).is_empty());
}

#[test]
fn enqueue_while_api_unreachable_queues() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "http://127.0.0.1:9");

    outbox(&dir)
        .args(["enqueue", "--url", "/api/data", "--body", r#"{"message":"a"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("(offline)"));
    assert_eq!(list_json(&dir).len(), 1);
}

#[test]
fn enqueue_while_online_delivers_directly() {
    let mut server = mockito::Server::new();
    let _health = server.mock("GET", "/api/test").with_status(200).create();
    let data = server
        .mock("POST", "/api/data")
        .match_body(mockito::Matcher::Json(serde_json::json!({"message": "a"})))
        .with_status(200)
        .expect(1)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server.url());

    outbox(&dir)
        .args(["enqueue", "--url", "/api/data", "--body", r#"{"message":"a"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Delivered."));
    data.assert();
    assert!(list_json(&dir).is_empty());
}

// ---------------------------------------------------------------------------
// outbox drain
// ---------------------------------------------------------------------------

#[test]
fn drain_when_offline_leaves_queue() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "http://127.0.0.1:9");
    enqueue_offline(&dir, "a");

    outbox(&dir)
        .arg("drain")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 action(s) left queued"));
    assert_eq!(list_json(&dir).len(), 1);
}

#[test]
fn drain_when_online_replays_and_clears() {
    let mut server = mockito::Server::new();
    let _health = server.mock("GET", "/api/test").with_status(200).create();
    let data = server
        .mock("POST", "/api/data")
        .with_status(201)
        .expect(2)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server.url());
    enqueue_offline(&dir, "a");
    enqueue_offline(&dir, "b");

    outbox(&dir)
        .arg("drain")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Replayed 2 action(s): 2 delivered, 0 failed.",
        ));
    data.assert();
    assert!(list_json(&dir).is_empty());
}

#[test]
fn drain_json_reports_failures() {
    let mut server = mockito::Server::new();
    let _health = server.mock("GET", "/api/test").with_status(200).create();
    let _data = server.mock("POST", "/api/data").with_status(500).create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server.url());
    enqueue_offline(&dir, "a");

    let out = outbox(&dir).args(["drain", "--json"]).output().unwrap();
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["outcome"], "drained");
    assert_eq!(report["attempted"], 1);
    assert_eq!(report["failures"].as_array().unwrap().len(), 1);
    // Failed replays are dropped along with the rest of the queue.
    assert!(list_json(&dir).is_empty());
}

// ---------------------------------------------------------------------------
// outbox watch
// ---------------------------------------------------------------------------

/// Kills the background `outbox watch` when the test ends, pass or fail.
struct Background(Child);

impl Drop for Background {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn spawn_watch(dir: &TempDir) -> Background {
    let child = std::process::Command::new(assert_cmd::cargo::cargo_bin("outbox"))
        .arg("watch")
        .current_dir(dir.path())
        .env("OUTBOX_ROOT", dir.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    Background(child)
}

fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn watch_shares_queue_and_drains_when_api_returns() {
    let mut server = mockito::Server::new();
    let health_down = server.mock("GET", "/api/test").with_status(503).create();
    let data = server
        .mock("POST", "/api/data")
        .match_body(mockito::Matcher::Json(serde_json::json!({"message": "a"})))
        .with_status(200)
        .expect(1)
        .create();

    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".outbox")).unwrap();
    std::fs::write(
        dir.path().join(".outbox/config.yaml"),
        format!(
            "api_base_url: {}\nprobe_interval_ms: 100\nsubmit_timeout_secs: 2\n",
            server.url()
        ),
    )
    .unwrap();

    let _watch = spawn_watch(&dir);
    std::thread::sleep(Duration::from_millis(300));

    // Other commands keep working while watch runs.
    enqueue_offline(&dir, "a");
    assert_eq!(list_json(&dir).len(), 1);

    health_down.remove();
    let _health_up = server.mock("GET", "/api/test").with_status(200).create();

    wait_for("queue to drain", || list_json(&dir).is_empty());
    data.assert();
}

// ---------------------------------------------------------------------------
// outbox config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_accepts_defaults() {
    let dir = TempDir::new().unwrap();
    outbox(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config OK."));
}

#[test]
fn config_validate_rejects_bad_values() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".outbox")).unwrap();
    std::fs::write(
        dir.path().join(".outbox/config.yaml"),
        "api_base_url: localhost\nprobe_interval_ms: 0\n",
    )
    .unwrap();

    outbox(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config has 2 error(s)"));
}
