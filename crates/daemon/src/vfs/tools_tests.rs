// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use p42_core::relation::prop;
use p42_core::{Clock, FakeClock, Metadata, ObjectType, Relation};
use p42_storage::{RelationStore, Store};
use p42_wire::PathEntryKind;
use serde_json::json;
use tempfile::TempDir;

use super::super::VirtualFs;

struct Fixture {
    _dir: TempDir,
    vfs: VirtualFs,
    store: Arc<Store>,
    relations: Arc<RelationStore>,
}

/// Two tools: `log-scan` with a stored executable, and its spawned child
/// `view-log-scan`.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::at_epoch_ms(1_700_000_000_000);
    let store = Arc::new(Store::new(dir.path()));
    let relations = Arc::new(RelationStore::new(dir.path()));

    let mut m = Metadata::new(ObjectType::Command);
    m.title = "log-scan".to_string();
    let object_id = store
        .store_with_metadata(b"#!/bin/bash\ngrep ERROR \"$1\"\n", &mut m, clock.now())
        .unwrap();

    let mut parent = Relation::new("Tool")
        .with_property(prop::NAME, "log-scan")
        .with_property(prop::TRANSFORMS, json!(["analysis", "bash"]))
        .with_property(prop::EXECUTABLE_ID, object_id);
    parent.id = "tool-log-scan-00000".to_string();
    relations.save(&parent).unwrap();

    let mut child = Relation::new("Tool")
        .with_property(prop::NAME, "view-log-scan")
        .with_property(prop::TRANSFORMS, json!(["view", "display", "format"]))
        .with_property(prop::PARENT, "log-scan")
        .with_property(prop::AUTO_SPAWNED, true);
    child.id = "tool-view-log-scan".to_string();
    relations.save(&child).unwrap();

    let vfs = VirtualFs::new(Arc::clone(&store), Arc::clone(&relations), dir.path().join("commands"));
    Fixture { _dir: dir, vfs, store, relations }
}

#[test]
fn tools_root_lists_views_and_names() {
    let f = fixture();
    let entries = f.vfs.list("/tools", &[]).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["by-name", "by-transform", "spawned-by", "ancestry", "log-scan", "view-log-scan"],
    );
}

#[test]
fn per_tool_directory_has_the_four_entries() {
    let f = fixture();
    let entries = f.vfs.list("/tools/log-scan", &[]).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["definition", "executable", "spawned", "parents"]);

    let executable = entries.iter().find(|e| e.name == "executable").unwrap();
    assert_eq!(executable.kind, PathEntryKind::File);
    assert!(executable.id.is_some());
    assert!(executable.size.is_some());
}

#[test]
fn tool_without_executable_omits_the_entry() {
    let f = fixture();
    let entries = f.vfs.list("/tools/view-log-scan", &[]).unwrap();
    assert!(entries.iter().all(|e| e.name != "executable"));
}

#[test]
fn by_transform_groups_tools() {
    let f = fixture();
    let transforms = f.vfs.list("/tools/by-transform", &[]).unwrap();
    let names: Vec<&str> = transforms.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["analysis", "bash", "display", "format", "view"]);

    let analysis = f.vfs.list("/tools/by-transform/analysis", &[]).unwrap();
    assert_eq!(analysis.len(), 1);
    assert_eq!(analysis[0].name, "log-scan");

    assert!(f.vfs.list("/tools/by-transform/nope", &[]).unwrap_err().is_not_found());
}

#[test]
fn spawned_by_view_tracks_children() {
    let f = fixture();
    let parents = f.vfs.list("/tools/spawned-by", &[]).unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].name, "log-scan");

    let children = f.vfs.list("/tools/spawned-by/log-scan", &[]).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "view-log-scan");

    let spawned = f.vfs.list("/tools/log-scan/spawned", &[]).unwrap();
    assert_eq!(spawned[0].name, "view-log-scan");
}

#[test]
fn ancestry_view_renders_the_chain() {
    let f = fixture();
    let entries = f.vfs.list("/tools/ancestry", &[]).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "view-log-scan");

    let clock = FakeClock::new();
    let out = f.vfs.read("/tools/ancestry/view-log-scan", clock.now()).unwrap();
    assert_eq!(out.bytes, b"view-log-scan <- log-scan\n");

    let parents = f.vfs.list("/tools/view-log-scan/parents", &[]).unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].name, "log-scan");
}

#[test]
fn executable_resolves_to_the_object() {
    let f = fixture();
    let id = f.vfs.resolve("/tools/log-scan/executable").unwrap();
    assert_eq!(f.store.read_object(&id).unwrap(), b"#!/bin/bash\ngrep ERROR \"$1\"\n");

    // by-name alias resolves identically.
    assert_eq!(f.vfs.resolve("/tools/by-name/log-scan/executable").unwrap(), id);

    // A tool that was never materialized has nothing to resolve.
    assert!(f.vfs.resolve("/tools/view-log-scan/executable").unwrap_err().is_not_found());
}

#[test]
fn definition_reads_the_relation_json() {
    let f = fixture();
    let clock = FakeClock::new();
    let out = f.vfs.read("/tools/log-scan/definition", clock.now()).unwrap();
    let relation: Relation = serde_json::from_slice(&out.bytes).unwrap();
    assert_eq!(relation.id, "tool-log-scan-00000");
    assert_eq!(relation.name(), Some("log-scan"));
    let _ = &f.relations;
}

#[test]
fn unknown_tool_is_not_found() {
    let f = fixture();
    assert!(f.vfs.list("/tools/ghost", &[]).unwrap_err().is_not_found());
    assert!(f.vfs.resolve("/tools/ghost/executable").unwrap_err().is_not_found());
}
