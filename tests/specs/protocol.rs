// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path-operation specs over the wire: store, list, delete, search.

use p42_wire::RequestKind;

use super::prelude::*;

#[tokio::test]
async fn store_path_publishes_all_views_and_an_executable() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let data = daemon
        .request_ok(
            RequestKind::StorePath,
            json!({
                "path": "/commands/greeter",
                "content": b64(b"#!/bin/sh\necho hi\n"),
                "metadata": { "type": "command", "agent": "@ai-engineer" },
            }),
        )
        .await;

    let paths: Vec<&str> =
        data["paths"].as_array().unwrap().iter().map(|p| p.as_str().unwrap()).collect();
    assert!(paths.contains(&"/commands/greeter"));
    assert!(paths.contains(&"/by-type/command/greeter"));
    assert!(paths.contains(&"/by-agent/@ai-engineer/commands/greeter"));
    assert!(paths.iter().any(|p| p.starts_with("/by-date/")));

    // The executable entry exists and carries the executable bit.
    use std::os::unix::fs::PermissionsExt;
    let entry = root.path().join("commands/greeter");
    let target = std::fs::read_link(&entry).expect("executable symlink");
    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);

    daemon.stop().await;
}

#[tokio::test]
async fn unknown_request_type_is_an_error_response() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let response = daemon.request(RequestKind::Ping, json!(null)).await;
    assert!(response.success);

    // Hand-roll an unknown type through a raw connection.
    use p42_wire::{read_response, write_message};
    use tokio::net::UnixStream;
    let stream = UnixStream::connect(&daemon.socket_path).await.unwrap();
    let (mut reader, mut writer) = stream.into_split();
    write_message(&mut writer, br#"{"id":"raw-1","type":"summon_kraken"}"#).await.unwrap();
    let response =
        read_response(&mut reader, std::time::Duration::from_secs(5)).await.unwrap();
    assert!(!response.success);
    assert_eq!(response.id, "raw-1");
    assert!(response.error.unwrap().contains("unknown request type"));

    daemon.stop().await;
}

#[tokio::test]
async fn deleting_a_command_clears_its_views_but_keeps_the_object() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let stored = daemon
        .request_ok(
            RequestKind::StorePath,
            json!({
                "path": "/commands/greeter",
                "content": b64(b"#!/bin/sh\necho hi\n"),
                "metadata": { "type": "command" },
            }),
        )
        .await;
    let object_id = stored["id"].as_str().unwrap().to_string();

    daemon.request_ok(RequestKind::DeletePath, json!({ "path": "/commands/greeter" })).await;

    let read = daemon.request(RequestKind::ReadPath, json!({ "path": "/commands/greeter" })).await;
    assert!(!read.success);
    assert!(read.error.unwrap().contains("not found"));

    let listing =
        daemon.request_ok(RequestKind::ListPath, json!({ "path": "/by-type/command" })).await;
    assert!(listing["entries"].as_array().unwrap().iter().all(|e| e["name"] != "greeter"));

    // No GC: the object file is still on disk under the fan-out.
    let object_path = root
        .path()
        .join("objects")
        .join(&object_id[0..2])
        .join(&object_id[2..4])
        .join(&object_id[4..]);
    assert!(object_path.exists());

    daemon.stop().await;
}

#[tokio::test]
async fn search_ranks_the_greeter() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    daemon
        .request_ok(
            RequestKind::StorePath,
            json!({
                "path": "/commands/greeter",
                "content": b64(b"#!/bin/sh\necho hi\n"),
                "metadata": {
                    "type": "command",
                    "title": "greeter",
                    "description": "greets whoever asks",
                },
            }),
        )
        .await;
    daemon
        .request_ok(
            RequestKind::StorePath,
            json!({ "path": "/scratch/noise", "content": b64(b"unrelated") }),
        )
        .await;

    let data = daemon
        .request_ok(
            RequestKind::Search,
            json!({ "query": "greet", "filters": { "type": "command" } }),
        )
        .await;
    assert_eq!(data["count"], 1);
    let hit = &data["results"][0];
    assert_eq!(hit["title"], "greeter");
    let fields: Vec<&str> =
        hit["match_fields"].as_array().unwrap().iter().map(|f| f.as_str().unwrap()).collect();
    assert!(fields.contains(&"title") || fields.contains(&"description"));
    assert!(!hit["snippet"].as_str().unwrap().is_empty());

    daemon.stop().await;
}

#[tokio::test]
async fn update_path_with_same_content_keeps_the_id() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let stored = daemon
        .request_ok(
            RequestKind::StorePath,
            json!({ "path": "/scratch/note", "content": b64(b"same bytes") }),
        )
        .await;
    let updated = daemon
        .request_ok(
            RequestKind::UpdatePath,
            json!({ "path": "/scratch/note", "content": b64(b"same bytes") }),
        )
        .await;
    assert_eq!(stored["id"], updated["id"], "no-op at the object level");

    daemon.stop().await;
}
