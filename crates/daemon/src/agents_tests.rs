// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tempfile::tempdir;

use super::AgentRegistry;

#[test]
fn builtin_agents_are_known() {
    let registry = AgentRegistry::builtin();
    assert!(registry.known("@ai-engineer"));
    assert!(registry.known("@ai-muse"));
    assert!(!registry.known("@ai-pirate"));
}

#[test]
fn unknown_agent_falls_back_with_name() {
    let registry = AgentRegistry::builtin();
    let prompt = registry.system_prompt("@ai-pirate");
    assert!(prompt.contains("@ai-pirate"));
}

#[test]
fn agents_toml_extends_and_overrides() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("agents.toml"),
        r#"
[agents."@ai-pirate"]
prompt = "Yarr. You live in Port 42."

[agents."@ai-engineer"]
prompt = "Overridden engineer."
"#,
    )
    .unwrap();

    let registry = AgentRegistry::load(dir.path());
    assert!(registry.known("@ai-pirate"));
    assert_eq!(registry.system_prompt("@ai-pirate"), "Yarr. You live in Port 42.");
    assert_eq!(registry.system_prompt("@ai-engineer"), "Overridden engineer.");
}

#[test]
fn malformed_agents_toml_keeps_builtins() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("agents.toml"), "not [ valid toml").unwrap();
    let registry = AgentRegistry::load(dir.path());
    assert!(registry.known("@ai-engineer"));
}
