// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reality Compiler specs over the wire: declaration, auto-spawn, and
//! possession-driven crystallization.

use p42_adapters::{CommandSpec, Reply};
use p42_wire::RequestKind;

use super::prelude::*;

#[tokio::test]
async fn declared_analysis_tool_spawns_its_viewer() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let declared = daemon
        .request_ok(
            RequestKind::DeclareRelation,
            json!({
                "relation": {
                    "type": "Tool",
                    "properties": {
                        "name": "log-scan",
                        "transforms": ["analysis", "bash"],
                        "spec": {
                            "name": "log-scan",
                            "description": "scan logs for errors",
                            "language": "bash",
                            "implementation": "grep ERROR \"$1\"",
                        },
                    },
                },
            }),
        )
        .await;
    assert_eq!(declared["materialization"]["status"], "success");

    // Same declaration cycle: the viewer already exists.
    let listing = daemon
        .request_ok(RequestKind::ListRelations, json!({ "type": "Tool" }))
        .await;
    let viewer = listing["relations"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["properties"]["name"] == "view-log-scan")
        .expect("view-log-scan relation")
        .clone();
    assert_eq!(viewer["properties"]["auto_spawned"], true);
    assert_eq!(viewer["properties"]["parent"], "log-scan");

    // The tools view exposes the family.
    let spawned = daemon
        .request_ok(RequestKind::ListPath, json!({ "path": "/tools/log-scan/spawned" }))
        .await;
    assert_eq!(spawned["entries"][0]["name"], "view-log-scan");

    daemon.stop().await;
}

#[tokio::test]
async fn redeclaring_the_same_tool_does_not_duplicate_spawns() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let relation = json!({
        "id": "tool-log-scan-pinned",
        "type": "Tool",
        "properties": {
            "name": "log-scan",
            "transforms": ["analysis"],
            "spec": {
                "name": "log-scan",
                "language": "bash",
                "implementation": "grep ERROR \"$1\"",
            },
        },
    });
    daemon
        .request_ok(RequestKind::DeclareRelation, json!({ "relation": relation.clone() }))
        .await;

    // Without replace: conflict.
    let conflict = daemon
        .request(RequestKind::DeclareRelation, json!({ "relation": relation.clone() }))
        .await;
    assert!(!conflict.success);
    assert!(conflict.error.unwrap().contains("already exists"));

    // With replace: accepted, and the spawn set is unchanged.
    daemon
        .request_ok(
            RequestKind::DeclareRelation,
            json!({ "relation": relation, "replace": true }),
        )
        .await;
    let listing = daemon
        .request_ok(RequestKind::ListRelations, json!({ "type": "Tool" }))
        .await;
    let viewers = listing["relations"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["properties"]["name"] == "view-log-scan")
        .count();
    assert_eq!(viewers, 1);

    daemon.stop().await;
}

#[tokio::test]
async fn delete_relation_removes_records_and_executable() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    let declared = daemon
        .request_ok(
            RequestKind::DeclareRelation,
            json!({
                "relation": {
                    "type": "Tool",
                    "properties": {
                        "name": "doomed",
                        "spec": {
                            "name": "doomed",
                            "language": "bash",
                            "implementation": "true",
                        },
                    },
                },
            }),
        )
        .await;
    let relation_id = declared["relation"]["id"].as_str().unwrap().to_string();
    assert!(root.path().join("commands/doomed").exists());

    daemon
        .request_ok(RequestKind::DeleteRelation, json!({ "relation_id": relation_id }))
        .await;

    let get = daemon
        .request(RequestKind::GetRelation, json!({ "relation_id": relation_id }))
        .await;
    assert!(!get.success);
    assert!(!root.path().join("commands/doomed").exists());
    assert!(
        !root.path().join(format!("relations/materialized-{relation_id}.json")).exists(),
        "materialized record removed",
    );

    daemon.stop().await;
}

#[tokio::test]
async fn possession_crystallizes_over_the_wire() {
    let root = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(root.path()).await;

    daemon.llm.push_reply(Reply::Command {
        message: Some("Crystallized greeter for you.".to_string()),
        spec: CommandSpec {
            name: "greeter".to_string(),
            description: "greets".to_string(),
            language: "bash".to_string(),
            implementation: "echo hello".to_string(),
        },
    });

    let data = daemon
        .request_ok(
            RequestKind::Possess,
            json!({ "agent": "@ai-engineer", "message": "make me a greeter" }),
        )
        .await;
    assert_eq!(data["command_generated"], true);
    assert_eq!(data["command_spec"]["path"], "/commands/greeter");
    let session_id = data["session_id"].as_str().unwrap().to_string();

    // The generated command is readable through the VFS and is linked to
    // the session's memory.
    let read = daemon
        .request_ok(RequestKind::ReadPath, json!({ "path": "/commands/greeter" }))
        .await;
    let code = String::from_utf8(unb64(&read["content"])).unwrap();
    assert!(code.starts_with("#!/bin/bash"));
    assert!(code.contains("echo hello"));

    let generated = daemon
        .request_ok(
            RequestKind::ListPath,
            json!({ "path": format!("/memory/{session_id}/generated") }),
        )
        .await;
    assert_eq!(generated["entries"][0]["name"], "greeter");

    daemon.stop().await;
}
