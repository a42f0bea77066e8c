// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool materializer: turns a `Tool` relation into an executable command.
//!
//! The command spec either rides in on the relation (`properties.spec`,
//! generated during a possession) or is requested from the LLM here. The
//! assembled code is stored content-addressed, published under the
//! canonical virtual paths, and exposed as an executable entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use p42_adapters::{ChatMessage, ChatRole, CommandSpec, CompletionRequest};
use p42_core::relation::prop;
use p42_core::{MaterializeStatus, MaterializedEntity, Metadata, ObjectType, Relation};
use p42_storage::install_executable;
use serde_json::{Map, Value};
use tracing::debug;

use crate::compiler::CompileError;
use crate::materializer::{claim_paths, date_segment, MaterializeCtx, Materializer};
use crate::props;

pub struct ToolMaterializer;

#[async_trait]
impl Materializer for ToolMaterializer {
    fn name(&self) -> &'static str {
        "tool"
    }

    fn can_materialize(&self, relation: &Relation) -> bool {
        relation.relation_type == "Tool"
    }

    async fn materialize(
        &self,
        relation: &mut Relation,
        ctx: &MaterializeCtx,
        now: DateTime<Utc>,
    ) -> Result<MaterializedEntity, CompileError> {
        let name = relation
            .name()
            .map(str::to_string)
            .ok_or_else(|| CompileError::InvalidRelation("tool has no name".to_string()))?;

        let spec = match inline_spec(relation) {
            Some(spec) => spec,
            None => generate_spec(relation, &name, ctx).await?,
        };

        let code = assemble_code(&name, &spec);

        let mut paths = vec![
            format!("/commands/{name}"),
            format!("/by-date/{}/{name}", date_segment(now)),
            format!("/by-type/command/{name}"),
        ];
        if let Some(session) = relation.memory_session() {
            paths.push(format!("/memory/{session}/generated/{name}"));
        }
        claim_paths(ctx, &paths, now)?;

        let mut metadata = Metadata::new(ObjectType::Command);
        metadata.title = name.clone();
        metadata.description = spec.description.clone();
        metadata.tags = relation.transforms();
        metadata.session = relation.memory_session().map(str::to_string);
        metadata.agent = relation.property_str(props::AGENT).map(str::to_string);
        metadata.relationships.session = metadata.session.clone();
        for path in &paths {
            metadata.add_path(path.clone());
        }

        let object_id = ctx.store.store_with_metadata(code.as_bytes(), &mut metadata, now)?;
        let object_path = ctx.store.object_path(&object_id)?;
        let entry = install_executable(&ctx.commands_dir, &name, &object_path)?;

        relation.set_property(prop::EXECUTABLE_ID, object_id.clone());

        let mut entity_meta = Map::new();
        entity_meta.insert("object_id".to_string(), Value::String(object_id));
        entity_meta.insert("name".to_string(), Value::String(name));
        Ok(MaterializedEntity {
            relation_id: relation.id.clone(),
            physical_path: entry,
            metadata: entity_meta,
            status: MaterializeStatus::Success,
            created_at: now,
        })
    }

    fn dematerialize(
        &self,
        entity: &MaterializedEntity,
        ctx: &MaterializeCtx,
        now: DateTime<Utc>,
    ) -> Result<(), CompileError> {
        if let Some(name) = entity.metadata.get("name").and_then(Value::as_str) {
            p42_storage::remove_executable(&ctx.commands_dir, name)?;
        }
        if let Some(object_id) = entity.metadata.get("object_id").and_then(Value::as_str) {
            match ctx.store.metadata().load_raw(object_id) {
                Ok(m) => ctx.store.release_paths(&m.paths, now)?,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// A spec already attached to the relation, e.g. crystallized during a
/// possession.
fn inline_spec(relation: &Relation) -> Option<CommandSpec> {
    let value = relation.property(props::SPEC)?.clone();
    match serde_json::from_value(value) {
        Ok(spec) => Some(spec),
        Err(e) => {
            debug!(relation = %relation.id, error = %e, "ignoring malformed inline spec");
            None
        }
    }
}

/// Ask the LLM for a command spec. A reply without one is a generation
/// failure; the relation stays persisted so the caller can retry.
async fn generate_spec(
    relation: &Relation,
    name: &str,
    ctx: &MaterializeCtx,
) -> Result<CommandSpec, CompileError> {
    let transforms = relation.transforms();
    let mut system = String::from(
        "You are the Port 42 tool smith. Design a small, self-contained \
         command-line tool and return it with the crystallize_command tool.",
    );
    if let Some(context) = relation.property_str(prop::RESOLVED_CONTEXT) {
        system.push_str("\n\nContext:\n");
        system.push_str(context);
    }

    let mut prompt = format!("Create a command named `{name}`.");
    if !transforms.is_empty() {
        prompt.push_str(&format!(" It should cover: {}.", transforms.join(", ")));
    }
    if let Some(user_prompt) = relation.property_str(prop::USER_PROMPT) {
        prompt.push_str("\n\n");
        prompt.push_str(user_prompt);
    }

    let reply = ctx
        .llm
        .complete(CompletionRequest {
            system,
            messages: vec![ChatMessage { role: ChatRole::User, content: prompt }],
            allow_tools: true,
        })
        .await
        .map_err(|e| CompileError::Generation(e.to_string()))?;

    reply
        .command_spec()
        .cloned()
        .ok_or_else(|| CompileError::Generation("model returned no command spec".to_string()))
}

/// Prepend the interpreter declaration and a header comment, stripping
/// any shebang the implementation already carries.
fn assemble_code(name: &str, spec: &CommandSpec) -> String {
    let interpreter = interpreter_line(&spec.language);
    let comment = comment_prefix(&spec.language);

    let implementation = spec
        .implementation
        .strip_prefix("#!")
        .map(|rest| rest.split_once('\n').map(|(_, tail)| tail).unwrap_or(""))
        .unwrap_or(&spec.implementation);

    let mut code = String::new();
    code.push_str(interpreter);
    code.push('\n');
    code.push_str(&format!("{comment} {name}: {}\n", spec.description.trim()));
    code.push_str(&format!("{comment} generated by port42\n\n"));
    code.push_str(implementation.trim_start_matches('\n'));
    if !code.ends_with('\n') {
        code.push('\n');
    }
    code
}

fn interpreter_line(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "python" | "python3" => "#!/usr/bin/env python3",
        "node" | "javascript" => "#!/usr/bin/env node",
        "ruby" => "#!/usr/bin/env ruby",
        "sh" | "shell" => "#!/bin/sh",
        _ => "#!/bin/bash",
    }
}

fn comment_prefix(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "node" | "javascript" => "//",
        _ => "#",
    }
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
