// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs: ping/status, content addressing, and session
//! persistence across a restart.

use p42_wire::RequestKind;
use sha2::{Digest, Sha256};

use super::prelude::*;

#[tokio::test]
async fn ping_and_status_respond() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let pong = daemon.request_ok(RequestKind::Ping, json!(null)).await;
    assert_eq!(pong["message"], "pong");

    let status = daemon.request_ok(RequestKind::Status, json!(null)).await;
    assert_eq!(status["session_count"], 0);
    assert!(status["version"].as_str().is_some());

    daemon.stop().await;
}

#[tokio::test]
async fn stored_content_is_addressed_by_its_hash() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let content = b"Hello, Port 42!";
    let data = daemon
        .request_ok(
            RequestKind::StorePath,
            json!({ "path": "/scratch/hello", "content": b64(content) }),
        )
        .await;

    // The id is the SHA-256 of the exact bytes, recomputed here.
    let expected: String = Sha256::digest(content).iter().map(|b| format!("{b:02x}")).collect();
    assert_eq!(data["id"].as_str().unwrap(), expected);

    let read = daemon
        .request_ok(RequestKind::ReadPath, json!({ "path": "/scratch/hello" }))
        .await;
    assert_eq!(unb64(&read["content"]), content);
    assert_eq!(read["size"], content.len());

    daemon.stop().await;
}

#[tokio::test]
async fn sessions_survive_a_daemon_restart() {
    let root = tempfile::tempdir().unwrap();

    // Three possession turns in one session.
    let session_id = {
        let daemon = TestDaemon::start(root.path()).await;
        let first = daemon
            .request_ok(
                RequestKind::Possess,
                json!({ "agent": "@ai-engineer", "message": "one" }),
            )
            .await;
        let session_id = first["session_id"].as_str().unwrap().to_string();
        for message in ["two", "three"] {
            daemon
                .request_ok(
                    RequestKind::Possess,
                    json!({
                        "agent": "@ai-engineer",
                        "message": message,
                        "session_id": session_id,
                    }),
                )
                .await;
        }
        daemon.stop().await;
        session_id
    };

    // Restart over the same root: the session is restored and listed.
    let daemon = TestDaemon::start(root.path()).await;
    let listing = daemon.request_ok(RequestKind::ListPath, json!({ "path": "/memory" })).await;
    let entries = listing["entries"].as_array().unwrap();
    let entry = entries
        .iter()
        .find(|e| e["name"] == session_id.as_str())
        .expect("restored session listed under /memory");
    assert_eq!(entry["message_count"], 6, "three user turns, three replies");
    assert_eq!(entry["state"], "active");
    assert_eq!(entry["agent"], "@ai-engineer");

    // The full thread is intact, in order.
    let detail = daemon
        .request_ok(RequestKind::Memory, json!({ "session_id": session_id }))
        .await;
    let contents: Vec<&str> = detail["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["role"] == "user")
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["one", "two", "three"]);

    daemon.stop().await;
}

#[tokio::test]
async fn second_daemon_on_the_same_root_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let config = p42_daemon::lifecycle::Config::at_root(root.path());
    let llm: std::sync::Arc<dyn p42_adapters::LlmAdapter> =
        std::sync::Arc::new(p42_adapters::FakeLlm::new());
    let second = p42_daemon::lifecycle::startup(&config, llm);
    assert!(second.is_err(), "lock must refuse a second daemon");

    // The first daemon is still healthy.
    daemon.request_ok(RequestKind::Ping, json!(null)).await;
    daemon.stop().await;
}
