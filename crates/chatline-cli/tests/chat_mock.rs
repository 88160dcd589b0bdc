//! Integration tests for the chat REPL driven through a pipe.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn chatline(home: &TempDir, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("chatline");
    cmd.env("CHATLINE_HOME", home.path())
        .env("CHATLINE_BASE_URL", server.uri())
        .env_remove("RUST_LOG");
    cmd
}

#[tokio::test]
async fn test_chat_answers_each_line() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string("⚠️ Check your input"))
        .expect(2)
        .mount(&server)
        .await;

    chatline(&home, &server)
        .write_stdin("first\n\nsecond\n:q\nnever sent\n")
        .assert()
        .success()
        .stdout("▌ ⚠️ Warning\n▌ Check your input\n▌ ⚠️ Warning\n▌ Check your input\n");
}

#[tokio::test]
async fn test_chat_reset_clears_backend_history() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reset"))
        .and(body_json(json!({ "model": "mistral", "user_input": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message": "Conversation reset for model mistral"
        })))
        .expect(1)
        .mount(&server)
        .await;

    chatline(&home, &server)
        .write_stdin(":reset\n")
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "✓ Conversation reset for model mistral",
        ));
}

#[tokio::test]
async fn test_chat_reset_failure_is_reported() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reset"))
        .respond_with(ResponseTemplate::new(503).set_body_string(r#"{"detail":"busy"}"#))
        .mount(&server)
        .await;

    chatline(&home, &server)
        .write_stdin(":reset\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("✗ Reset failed: HTTP 503: busy"));
}

#[tokio::test]
async fn test_chat_temperature_command_applies_to_next_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_json(json!({
            "user_input": "warm up",
            "model": "mistral",
            "temperature": 0.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .expect(1)
        .mount(&server)
        .await;

    chatline(&home, &server)
        .write_stdin(":temp 2\n:temp 0.5\nwarm up\n")
        .assert()
        .success()
        .stdout("done\n")
        .stderr(predicate::str::contains(
            "temperature must be between 0 and 1, got 2",
        ))
        .stderr(predicate::str::contains("Temperature set to 0.5"));
}

#[tokio::test]
async fn test_chat_stream_error_keeps_repl_running() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&server)
        .await;

    chatline(&home, &server)
        .write_stdin("one\ntwo\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("✗ HTTP 500").count(2));
}

#[tokio::test]
async fn test_chat_model_switch_is_saved() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_json(json!({
            "user_input": "hi",
            "model": "tinyllama",
            "temperature": 0.3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("hey"))
        .expect(1)
        .mount(&server)
        .await;

    chatline(&home, &server)
        .write_stdin(":model tinyllama\nhi\n:models\n")
        .assert()
        .success()
        .stdout("hey\n")
        .stderr(predicate::str::contains("Model set to tinyllama"))
        .stderr(predicate::str::contains("may answer in English only"))
        .stderr(predicate::str::contains("* tinyllama"));

    let saved = fs::read_to_string(home.path().join("config.toml")).unwrap();
    assert!(saved.contains("\"tinyllama\""));
    assert!(!saved.contains("model = \"mistral\""));
    assert!(saved.contains("# chatline Configuration"));
}

#[tokio::test]
async fn test_chat_unknown_command() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    chatline(&home, &server)
        .write_stdin(":frobnicate\n:help\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Unknown command ':frobnicate'"))
        .stderr(predicate::str::contains(":reset"));
}
