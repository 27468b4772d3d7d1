use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_config(temp: &Path, origin: &str, skip_waiting: bool) -> PathBuf {
    let path = temp.join("config.yaml");
    let contents = format!(
        "data_dir: {}\norigin: {origin}\ncache:\n  version: test-v1\n  precache:\n    - /\n  skip_waiting_on_install: {skip_waiting}\n  request_timeout_secs: 5\n",
        temp.join("data").display()
    );
    fs::write(&path, contents).expect("failed to write config");
    path
}

fn offtask(config: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("offtask"));
    cmd.arg("--config")
        .arg(config)
        .env_remove("OFFTASK_CONFIG")
        .env_remove("OFFTASK_FORMAT")
        .env_remove("OFFTASK_DEBUG")
        .env_remove("RUST_LOG");
    cmd
}

fn task_ids(config: &Path) -> Vec<String> {
    let output = offtask(config)
        .args(["--format", "json", "task", "list"])
        .output()
        .expect("failed to run list");
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("invalid JSON");
    doc["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|t| t["id"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn task_add_then_list_newest_first() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config = write_config(temp.path(), "http://localhost:5173", true);

    offtask(&config)
        .args(["task", "add", "First"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added task"));
    offtask(&config)
        .args(["task", "add", "Second", "-d", "with notes"])
        .assert()
        .success();

    let output = offtask(&config)
        .args(["--format", "json", "task", "list"])
        .output()?;
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let tasks = doc["data"].as_array().expect("data array");

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["title"], "Second");
    assert_eq!(tasks[0]["description"], "with notes");
    assert_eq!(tasks[1]["title"], "First");
    assert_eq!(tasks[1]["completed"], false);

    Ok(())
}

#[test]
fn task_done_and_filters() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config = write_config(temp.path(), "http://localhost:5173", true);

    offtask(&config).args(["task", "add", "Keep"]).assert().success();
    offtask(&config).args(["task", "add", "Finish"]).assert().success();
    let ids = task_ids(&config);
    let finish = &ids[0];

    offtask(&config)
        .args(["task", "done", finish])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed task"));

    offtask(&config)
        .args(["task", "list", "--completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Finish"))
        .stdout(predicate::str::contains("Keep").not());

    offtask(&config)
        .args(["task", "list", "--pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Keep"))
        .stdout(predicate::str::contains("Finish").not());

    Ok(())
}

#[test]
fn task_update_unknown_id_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config = write_config(temp.path(), "http://localhost:5173", true);

    offtask(&config)
        .args(["task", "update", "missing", "--title", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found: missing"));

    Ok(())
}

#[test]
fn task_validation_rejects_bad_titles() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config = write_config(temp.path(), "http://localhost:5173", true);

    offtask(&config)
        .args(["task", "add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("title must not be empty"));

    let long = "t".repeat(101);
    offtask(&config)
        .args(["task", "add", &long])
        .assert()
        .failure()
        .stderr(predicate::str::contains("longer than 100"));

    assert!(task_ids(&config).is_empty());

    Ok(())
}

#[test]
fn task_delete_and_clear() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config = write_config(temp.path(), "http://localhost:5173", true);

    for title in ["a", "b", "c"] {
        offtask(&config).args(["task", "add", title]).assert().success();
    }
    let ids = task_ids(&config);

    offtask(&config).args(["task", "delete", &ids[1]]).assert().success();
    // Unknown ids are ignored
    offtask(&config).args(["task", "delete", "nope"]).assert().success();
    assert_eq!(task_ids(&config), vec![ids[0].clone(), ids[2].clone()]);

    offtask(&config)
        .args(["task", "clear", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 tasks"));
    assert!(task_ids(&config).is_empty());

    Ok(())
}

#[test]
fn explicit_missing_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    offtask(&temp.path().join("absent.yaml"))
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("offtask config init"));

    Ok(())
}

#[test]
fn cache_fetch_serves_cached_asset_when_origin_breaks() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _root = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("<html>shell</html>")
        .create();
    let script = server
        .mock("GET", "/app.js")
        .with_status(200)
        .with_header("content-type", "application/javascript")
        .with_body("console.log('v1')")
        .create();

    let temp = tempdir()?;
    let config = write_config(temp.path(), &server.url(), true);

    offtask(&config)
        .args(["cache", "fetch", "/app.js"])
        .assert()
        .success()
        .stdout(predicate::str::contains("console.log('v1')"))
        .stderr(predicate::str::contains("from network"));

    script.remove();

    offtask(&config)
        .args(["cache", "fetch", "/app.js"])
        .assert()
        .success()
        .stdout(predicate::str::contains("console.log('v1')"))
        .stderr(predicate::str::contains("from cache"));

    offtask(&config)
        .args(["cache", "snapshots"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/app.js"));

    Ok(())
}

#[test]
fn cache_fetch_navigation_answers_from_precache() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let root = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("<html>shell</html>")
        .expect_at_least(2)
        .create();

    let temp = tempdir()?;
    let config = write_config(temp.path(), &server.url(), true);

    // Installs (one fetch of "/"), answers from the snapshot, then revalidates
    offtask(&config)
        .args(["cache", "fetch", "--html", "/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<html>shell</html>"))
        .stderr(predicate::str::contains("from cache"));

    root.assert();

    Ok(())
}

#[test]
fn cache_install_waits_until_skip_waiting() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _root = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("<html>shell</html>")
        .create();

    let temp = tempdir()?;
    let config = write_config(temp.path(), &server.url(), false);

    offtask(&config)
        .args(["cache", "install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 stored, 0 failed"))
        .stdout(predicate::str::contains("Waiting"));

    offtask(&config)
        .args(["cache", "message", r#"{"type":"SKIP_WAITING"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activated"));

    offtask(&config)
        .args(["--format", "json", "cache", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"installed\": true"));

    Ok(())
}

#[test]
fn cache_install_tolerates_missing_resources() -> Result<(), Box<dyn std::error::Error>> {
    let server = mockito::Server::new();

    let temp = tempdir()?;
    let config = write_config(temp.path(), &server.url(), true);

    offtask(&config)
        .args(["cache", "install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 stored, 1 failed"));

    Ok(())
}

#[test]
fn completions_generate_for_bash() {
    Command::new(assert_cmd::cargo::cargo_bin!("offtask"))
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("offtask"));
}
