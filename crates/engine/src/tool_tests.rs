// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::unix::fs::PermissionsExt;

use p42_adapters::{CommandSpec, Reply};
use p42_core::relation::prop;
use p42_core::Relation;
use serde_json::json;

use crate::test_helpers::harness;

use super::{assemble_code, interpreter_line};

fn spec(language: &str, implementation: &str) -> CommandSpec {
    CommandSpec {
        name: "greeter".to_string(),
        description: "says hello".to_string(),
        language: language.to_string(),
        implementation: implementation.to_string(),
    }
}

#[yare::parameterized(
    bash    = { "bash", "#!/bin/bash" },
    python  = { "python", "#!/usr/bin/env python3" },
    node    = { "node", "#!/usr/bin/env node" },
    sh      = { "sh", "#!/bin/sh" },
    unknown = { "cobol", "#!/bin/bash" },
)]
fn interpreter_selection(language: &str, expected: &str) {
    assert_eq!(interpreter_line(language), expected);
}

#[test]
fn assemble_prepends_interpreter_and_header() {
    let code = assemble_code("greeter", &spec("bash", "echo hello"));
    let lines: Vec<&str> = code.lines().collect();
    assert_eq!(lines[0], "#!/bin/bash");
    assert_eq!(lines[1], "# greeter: says hello");
    assert!(code.ends_with("echo hello\n"));
}

#[test]
fn assemble_strips_existing_shebang() {
    let code = assemble_code("greeter", &spec("python", "#!/usr/bin/python\nprint('hi')"));
    assert!(code.starts_with("#!/usr/bin/env python3\n"));
    assert_eq!(code.matches("#!").count(), 1, "only one interpreter line");
    assert!(code.contains("print('hi')"));
}

#[test]
fn node_uses_slash_slash_comments() {
    let code = assemble_code("greeter", &spec("node", "console.log('hi')"));
    assert!(code.contains("// greeter: says hello"));
}

#[tokio::test]
async fn materialize_with_inline_spec_skips_the_llm() {
    let h = harness();
    let relation = Relation::new("Tool")
        .with_property(prop::NAME, "greeter")
        .with_property(prop::TRANSFORMS, json!(["greeting"]))
        .with_property(
            "spec",
            json!({
                "name": "greeter",
                "description": "says hello",
                "language": "bash",
                "implementation": "echo hello",
            }),
        );
    let (declared, entity) = h.compiler.declare(relation, false).await.unwrap();

    assert_eq!(h.llm.request_count(), 0, "inline spec means no LLM call");

    // Executable entry: symlink into the object store, mode 0755.
    let entry = h.dir.path().join("commands/greeter");
    assert_eq!(entity.physical_path, entry);
    let target = std::fs::read_link(&entry).unwrap();
    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o755, 0o755);

    // Canonical virtual paths on the stored metadata.
    let object_id = declared.executable_id().unwrap();
    let m = h.compiler.ctx().store.metadata().load_raw(object_id).unwrap();
    assert!(m.has_path("/commands/greeter"));
    assert!(m.has_path("/by-type/command/greeter"));
    assert!(m.paths.iter().any(|p| p.starts_with("/by-date/")));
    assert_eq!(m.tags, vec!["greeting"]);
}

#[tokio::test]
async fn memory_session_adds_generated_path() {
    let h = harness();
    let relation = Relation::new("Tool")
        .with_property(prop::NAME, "greeter")
        .with_property(prop::MEMORY_SESSION, "cli-42")
        .with_property(
            "spec",
            json!({ "name": "greeter", "language": "bash", "implementation": "echo hi" }),
        );
    let (declared, _) = h.compiler.declare(relation, false).await.unwrap();

    let m = h
        .compiler
        .ctx()
        .store
        .metadata()
        .load_raw(declared.executable_id().unwrap())
        .unwrap();
    assert!(m.has_path("/memory/cli-42/generated/greeter"));
    assert_eq!(m.session.as_deref(), Some("cli-42"));
}

#[tokio::test]
async fn missing_name_is_invalid() {
    let h = harness();
    let err = h
        .compiler
        .declare(Relation::new("Tool").with_property(prop::TRANSFORMS, json!(["x"])), false)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::CompileError::InvalidRelation(_)));
}

#[tokio::test]
async fn specless_tool_is_generated_through_the_llm() {
    let h = harness();
    h.llm.push_reply(Reply::Command {
        message: Some("Crystallized.".to_string()),
        spec: CommandSpec {
            name: "log-scan".to_string(),
            description: "scan logs".to_string(),
            language: "bash".to_string(),
            implementation: "grep ERROR \"$1\"".to_string(),
        },
    });

    let relation = Relation::new("Tool")
        .with_property(prop::NAME, "log-scan")
        .with_property(prop::TRANSFORMS, json!(["logs"]))
        .with_property(prop::USER_PROMPT, "make it colorful");
    let (declared, _) = h.compiler.declare(relation, false).await.unwrap();

    assert_eq!(h.llm.request_count(), 1);
    let request = &h.llm.requests()[0];
    assert!(request.allow_tools);
    assert!(request.messages[0].content.contains("log-scan"));
    assert!(request.messages[0].content.contains("make it colorful"));

    let code = h
        .compiler
        .ctx()
        .store
        .read_object(declared.executable_id().unwrap())
        .unwrap();
    let code = String::from_utf8(code).unwrap();
    assert!(code.contains("grep ERROR"));
}

#[tokio::test]
async fn regeneration_rebinds_paths_to_the_new_object() {
    let h = harness();
    let make = |implementation: &str| {
        let mut r = Relation::new("Tool")
            .with_property(prop::NAME, "greeter")
            .with_property(
                "spec",
                json!({ "name": "greeter", "language": "bash", "implementation": implementation }),
            );
        r.id = "tool-greeter-fixed".to_string();
        r
    };

    let (v1, _) = h.compiler.declare(make("echo one"), false).await.unwrap();
    let old_id = v1.executable_id().unwrap().to_string();
    let (v2, _) = h.compiler.declare(make("echo two"), true).await.unwrap();
    let new_id = v2.executable_id().unwrap().to_string();
    assert_ne!(old_id, new_id);

    // Old object survives (no GC) but its record lost the paths.
    assert!(h.compiler.ctx().store.objects().exists(&old_id));
    let old_meta = h.compiler.ctx().store.metadata().load_raw(&old_id).unwrap();
    assert!(old_meta.paths.is_empty());

    // The executable entry points at the new snapshot.
    let entry = h.dir.path().join("commands/greeter");
    let target = std::fs::read_link(&entry).unwrap();
    assert_eq!(target, h.compiler.ctx().store.object_path(&new_id).unwrap());
}
