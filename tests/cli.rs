//! CLI test cases.
//!
//! Commands that talk to the service run against a wiremock server. The
//! binary is synchronous from our point of view, so we run it on a blocking
//! thread while the mock server keeps serving on the runtime.

use std::process::{Command, Output};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Create a new `Command` with our binary, isolated from any `.env` file or
/// configuration in the caller's environment.
fn cmd(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("layla").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("LAYLA_OCR_SERVICE_URL")
        .env_remove("LAYLA_OCR_SERVICE_PORT")
        .env_remove("LAYLA_API_KEY");
    cmd
}

/// Create a `Command` configured to talk to `server`.
fn cmd_for(dir: &tempfile::TempDir, server: &MockServer) -> Command {
    let mut cmd = cmd(dir);
    cmd.env("LAYLA_OCR_SERVICE_URL", server.uri())
        .env("LAYLA_API_KEY", "test-key");
    cmd
}

/// Run a command without blocking the runtime that serves our mocks.
async fn run(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

#[test]
fn test_help() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("LAYLA_API_KEY"));
}

#[test]
fn test_version() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir).arg("--version").assert().success();
}

#[test]
fn test_missing_configuration_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .arg("health")
        .assert()
        .failure()
        .stderr(predicate::str::contains("LAYLA_OCR_SERVICE_URL"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "redis": "connected",
            "queue_size": 3,
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cmd_for(&dir, &server);
    cmd.arg("health");
    run(cmd)
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("Queue size:     3"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ocr_writes_output_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ocr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "abc",
            "status": "processing",
            "model": "doc_qwen_3b_multi_v2.0.0_prod",
            "message": "Job submitted",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "abc",
            "status": "completed",
            "result": "# Extracted",
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("scan.pdf"), b"%PDF-1.4").unwrap();

    for background in [false, true] {
        let output_path = dir.path().join(format!("out_{background}.md"));
        let mut cmd = cmd_for(&dir, &server);
        cmd.args(["ocr", "scan.pdf", "--poll-interval", "1", "-o"])
            .arg(&output_path);
        if background {
            cmd.arg("--background");
        }
        run(cmd).await.assert().success();
        assert_eq!(std::fs::read_to_string(&output_path).unwrap(), "# Extracted");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ocr_reports_failed_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ocr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "abc",
            "status": "processing",
            "model": "doc_qwen_3b_multi_v2.0.0_prod",
            "message": "Job submitted",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "abc",
            "status": "failed",
            "error": "bad scan",
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("scan.pdf"), b"%PDF-1.4").unwrap();

    let mut cmd = cmd_for(&dir, &server);
    cmd.args(["ocr", "scan.pdf"]);
    run(cmd)
        .await
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad scan"));
}

#[test]
fn test_ocr_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .env("LAYLA_OCR_SERVICE_URL", "http://127.0.0.1:9")
        .env("LAYLA_API_KEY", "test-key")
        .args(["ocr", "missing.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}
