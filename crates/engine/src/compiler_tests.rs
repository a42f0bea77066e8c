// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use p42_core::relation::prop;
use p42_core::{Clock, MaterializeStatus, Relation};
use serde_json::json;

use crate::test_helpers::harness;

use super::CompileError;

fn analysis_tool() -> Relation {
    Relation::new("Tool")
        .with_property(prop::NAME, "log-scan")
        .with_property(prop::TRANSFORMS, json!(["analysis", "bash"]))
        .with_property(
            "spec",
            json!({
                "name": "log-scan",
                "description": "scan logs for errors",
                "language": "bash",
                "implementation": "grep ERROR \"$1\"",
            }),
        )
}

#[tokio::test]
async fn declare_assigns_id_and_materializes() {
    let h = harness();
    let (relation, entity) = h.compiler.declare(analysis_tool(), false).await.unwrap();

    assert_eq!(relation.id, "tool-log-scan-00000", "slug plus generated suffix");
    assert_eq!(relation.created_at, h.clock.now());
    assert_eq!(entity.status, MaterializeStatus::Success);
    assert_eq!(entity.relation_id, relation.id);
    assert!(entity.physical_path.ends_with("commands/log-scan"));

    // Both records are on disk.
    let stored = h.compiler.get(&relation.id).unwrap();
    assert_eq!(stored.name(), Some("log-scan"));
    assert!(stored.executable_id().is_some(), "write-back persisted");
    assert!(h.compiler.ctx().relations.materialized_exists(&relation.id));
}

#[tokio::test]
async fn duplicate_id_conflicts_unless_replace() {
    let h = harness();
    let mut first = analysis_tool();
    first.id = "tool-log-scan-fixed".to_string();
    h.compiler.declare(first.clone(), false).await.unwrap();

    let err = h.compiler.declare(first.clone(), false).await.unwrap_err();
    assert!(matches!(err, CompileError::Conflict(_)), "got {err:?}");

    h.compiler.declare(first, true).await.unwrap();
}

#[tokio::test]
async fn unknown_type_has_no_materializer() {
    let h = harness();
    let relation = Relation::new("Daydream").with_property(prop::NAME, "x");
    let err = h.compiler.declare(relation, false).await.unwrap_err();
    assert!(matches!(err, CompileError::NoMaterializer(ref t) if t == "Daydream"));
}

#[tokio::test]
async fn generation_failure_keeps_the_relation() {
    let h = harness();
    // No inline spec and the model answers with plain text: generation fails.
    let relation = Relation::new("Tool")
        .with_property(prop::NAME, "dreamer")
        .with_property(prop::TRANSFORMS, json!(["analysis"]));
    let err = h.compiler.declare(relation, false).await.unwrap_err();
    assert!(matches!(err, CompileError::Generation(_)), "got {err:?}");

    // The relation was persisted before materialization, so the caller
    // can retry or delete it.
    let remaining = h.compiler.list_by_type("Tool").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name(), Some("dreamer"));
}

#[tokio::test]
async fn analysis_tool_auto_spawns_viewer_in_same_cycle() {
    let h = harness();
    h.compiler.declare(analysis_tool(), false).await.unwrap();

    let tools = h.compiler.list_by_type("Tool").unwrap();
    let viewer = tools
        .iter()
        .find(|r| r.name() == Some("view-log-scan"))
        .expect("viewer relation spawned");
    assert!(viewer.auto_spawned());
    assert_eq!(viewer.parent(), Some("log-scan"));
    assert_eq!(viewer.id, "tool-view-log-scan");

    // The viewer was materialized too: it has an executable entry.
    assert!(h.dir.path().join("commands/view-log-scan").exists());
}

#[tokio::test]
async fn respawning_the_same_trigger_does_not_duplicate() {
    let h = harness();
    let mut relation = analysis_tool();
    relation.id = "tool-log-scan-fixed".to_string();
    h.compiler.declare(relation.clone(), false).await.unwrap();
    h.compiler.declare(relation, true).await.unwrap();

    let viewers: Vec<_> = h
        .compiler
        .list_by_type("Tool")
        .unwrap()
        .into_iter()
        .filter(|r| r.name() == Some("view-log-scan"))
        .collect();
    assert_eq!(viewers.len(), 1, "idempotence key is the spawned relation id");
}

#[tokio::test]
async fn rule_failures_do_not_fail_the_declaration() {
    // A rule that spawns a spec-less Tool forces the spawn through the
    // LLM, which is scripted to fail. The spawn fails; the declaration
    // must not.
    let spawn_specless = crate::Rule {
        id: "specless",
        name: "specless spawner",
        enabled: true,
        condition: |r| r.relation_type == "Tool" && !r.auto_spawned(),
        action: |_| {
            vec![Relation::new("Tool").with_property(prop::NAME, "doomed-child")]
        },
    };
    let h = crate::test_helpers::harness_with_rules(crate::RuleEngine::with_rules(vec![
        spawn_specless,
    ]));
    h.llm.push_error(p42_adapters::LlmError::Status(400));

    let (declared, _) = h.compiler.declare(analysis_tool(), false).await.unwrap();
    assert_eq!(declared.name(), Some("log-scan"));

    // The failed spawn left its relation behind (persisted before
    // materialization) but no materialized record.
    let child = h
        .compiler
        .list_by_type("Tool")
        .unwrap()
        .into_iter()
        .find(|r| r.name() == Some("doomed-child"))
        .expect("spawned relation persisted");
    assert!(!h.compiler.ctx().relations.materialized_exists(&child.id));
}

#[tokio::test]
async fn delete_dematerializes_and_removes_records() {
    let h = harness();
    let (relation, _) = h.compiler.declare(analysis_tool(), false).await.unwrap();

    let entry = h.dir.path().join("commands/log-scan");
    assert!(entry.exists());

    h.compiler.delete(&relation.id).unwrap();

    assert!(!entry.exists(), "executable entry removed");
    assert!(h.compiler.get(&relation.id).unwrap_err().is_not_found());
    assert!(!h.compiler.ctx().relations.materialized_exists(&relation.id));

    // No cascade: the auto-spawned viewer survives.
    let tools = h.compiler.list_by_type("Tool").unwrap();
    assert!(tools.iter().any(|r| r.name() == Some("view-log-scan")));
}

#[tokio::test]
async fn delete_missing_relation_is_not_found() {
    let h = harness();
    assert!(h.compiler.delete("tool-ghost").unwrap_err().is_not_found());
}

#[tokio::test]
async fn list_spans_all_types() {
    let h = harness();
    h.compiler.declare(analysis_tool(), false).await.unwrap();
    h.compiler
        .declare(
            Relation::new("URLArtifact")
                .with_property(prop::NAME, "docs-site")
                .with_property("url", "https://example.com"),
            false,
        )
        .await
        .unwrap();

    let all = h.compiler.list().unwrap();
    assert!(all.len() >= 3, "tool + spawned viewer + bookmark, got {}", all.len());
    assert_eq!(h.compiler.list_by_type("URLArtifact").unwrap().len(), 1);
}
