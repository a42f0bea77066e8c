// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The rule engine: predicate/action pairs that fire when a relation is
//! materialized and declaratively spawn further relations.
//!
//! Recursion safety rests on two invariants the engine enforces on every
//! spawned relation, whatever the action returned:
//!   - `auto_spawned = true`, which every canonical predicate
//!     short-circuits on
//!   - a deterministic id (no random suffix), so re-running a rule on the
//!     same trigger is an idempotent no-op rather than a duplicate

use p42_core::relation::prop;
use p42_core::{relation_slug, Relation};
use serde_json::json;

use crate::props;

/// One rule: an id for enable/disable, a predicate, and an action that
/// returns the relations to spawn.
pub struct Rule {
    pub id: &'static str,
    pub name: &'static str,
    pub enabled: bool,
    pub condition: fn(&Relation) -> bool,
    pub action: fn(&Relation) -> Vec<Relation>,
}

/// Ordered rule list. Actions of one rule complete before the next
/// rule's predicate runs (evaluation is sequential and synchronous; the
/// compiler declares the spawned relations afterwards).
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    /// The canonical rule set, all enabled.
    pub fn standard() -> Self {
        Self::with_rules(vec![
            view_spawner(),
            documentation_spawner(),
            git_tools(),
            test_suite(),
            documentation_emergence(),
        ])
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Enable or disable a rule by id. Returns false if no rule matched.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.rules.iter_mut().find(|r| r.id == id) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Run every enabled rule against `relation`, collecting the spawned
    /// relations with the name of the rule that produced them. The
    /// recursion-safety invariants are stamped here.
    pub fn evaluate(&self, relation: &Relation) -> Vec<(&'static str, Relation)> {
        let mut spawned = Vec::new();
        for rule in self.rules.iter().filter(|r| r.enabled) {
            if !(rule.condition)(relation) {
                continue;
            }
            for mut child in (rule.action)(relation) {
                child.set_property(prop::AUTO_SPAWNED, true);
                if child.spawned_by().is_none() {
                    if let Some(parent_name) = relation.name() {
                        child.set_property(prop::SPAWNED_BY, parent_name);
                    }
                }
                if child.id.is_empty() {
                    let name = child.name().unwrap_or("unnamed").to_string();
                    child.id = relation_slug(&child.relation_type, &name, None);
                }
                spawned.push((rule.name, child));
            }
        }
        spawned
    }
}

/// A manually declared Tool; the trigger shape every canonical rule wants.
fn manual_tool(r: &Relation) -> bool {
    r.relation_type == "Tool" && !r.auto_spawned()
}

// ── Canonical rules ──────────────────────────────────────────────────

/// Any Tool with an `analysis` transform gets a sibling viewer.
fn view_spawner() -> Rule {
    Rule {
        id: "view-spawner",
        name: "view spawner",
        enabled: true,
        condition: |r| manual_tool(r) && r.transforms().iter().any(|t| t == "analysis"),
        action: |r| {
            let Some(name) = r.name() else { return Vec::new() };
            vec![Relation::new("Tool")
                .with_property(prop::NAME, format!("view-{name}"))
                .with_property(prop::TRANSFORMS, json!(["view", "display", "format"]))
                .with_property(prop::PARENT, name)
                .with_property(
                    props::SPEC,
                    json!({
                        "name": format!("view-{name}"),
                        "description": format!("paged view of {name} output"),
                        "language": "bash",
                        "implementation": format!("{name} \"$@\" | ${{PAGER:-less}}"),
                    }),
                )]
        },
    }
}

/// Tools rich enough (three or more transforms) get a documentation
/// artifact.
fn documentation_spawner() -> Rule {
    Rule {
        id: "docs-spawner",
        name: "documentation spawner",
        enabled: true,
        condition: |r| manual_tool(r) && r.transforms().len() >= 3,
        action: |r| {
            let Some(name) = r.name() else { return Vec::new() };
            let transforms = r.transforms();
            let mut content = format!("# {name}\n\n");
            if let Some(description) = r.property_str(props::DESCRIPTION) {
                content.push_str(description);
                content.push_str("\n\n");
            }
            content.push_str("## Transforms\n\n");
            for t in &transforms {
                content.push_str(&format!("- {t}\n"));
            }
            vec![Relation::new("Artifact")
                .with_property(prop::NAME, format!("{name}-docs"))
                .with_property(props::SUBTYPE, "documentation")
                .with_property(props::FORMAT, "markdown")
                .with_property(prop::PARENT, name)
                .with_property(props::CONTENT, content)]
        },
    }
}

/// Git-flavored tools spawn a small helper cluster.
fn git_tools() -> Rule {
    Rule {
        id: "git-tools",
        name: "git tools",
        enabled: true,
        condition: |r| manual_tool(r) && r.mentions("git"),
        action: |r| {
            let Some(name) = r.name() else { return Vec::new() };
            vec![
                Relation::new("Tool")
                    .with_property(prop::NAME, format!("{name}-summary"))
                    .with_property(prop::TRANSFORMS, json!(["git", "summary"]))
                    .with_property(prop::PARENT, name)
                    .with_property(
                        props::SPEC,
                        json!({
                            "name": format!("{name}-summary"),
                            "description": format!("recent history summary for {name}"),
                            "language": "bash",
                            "implementation": "git log --oneline -n \"${1:-20}\"",
                        }),
                    ),
                Relation::new("Artifact")
                    .with_property(prop::NAME, format!("{name}-workflow"))
                    .with_property(props::SUBTYPE, "documentation")
                    .with_property(props::FORMAT, "markdown")
                    .with_property(prop::PARENT, name)
                    .with_property(
                        props::CONTENT,
                        format!("# {name} workflow\n\nHow {name} fits into the git workflow.\n"),
                    ),
            ]
        },
    }
}

/// Test-flavored tools spawn a runner.
fn test_suite() -> Rule {
    Rule {
        id: "test-suite",
        name: "test suite",
        enabled: true,
        condition: |r| manual_tool(r) && r.mentions("test"),
        action: |r| {
            let Some(name) = r.name() else { return Vec::new() };
            vec![Relation::new("Tool")
                .with_property(prop::NAME, format!("{name}-runner"))
                .with_property(prop::TRANSFORMS, json!(["test", "run"]))
                .with_property(prop::PARENT, name)
                .with_property(
                    props::SPEC,
                    json!({
                        "name": format!("{name}-runner"),
                        "description": format!("run the checks behind {name}"),
                        "language": "bash",
                        "implementation": format!("{name} --check \"$@\""),
                    }),
                )]
        },
    }
}

/// Documentation-flavored tools grow a usage guide.
fn documentation_emergence() -> Rule {
    Rule {
        id: "documentation-emergence",
        name: "documentation emergence",
        enabled: true,
        condition: |r| manual_tool(r) && (r.mentions("doc") || r.mentions("documentation")),
        action: |r| {
            let Some(name) = r.name() else { return Vec::new() };
            vec![Relation::new("Artifact")
                .with_property(prop::NAME, format!("{name}-guide"))
                .with_property(props::SUBTYPE, "documentation")
                .with_property(props::FORMAT, "markdown")
                .with_property(prop::PARENT, name)
                .with_property(
                    props::CONTENT,
                    format!("# {name} guide\n\nUsage notes for {name}.\n"),
                )]
        },
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
