// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact materializer: documents, designs, and other generated files.
//!
//! Content comes inline (`properties.content`, or a `spec` with content)
//! or from the LLM. The artifact lands under
//! `/artifacts/<subtype>/<filename>` plus the usual secondary paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use p42_adapters::{ArtifactSpec, ChatMessage, ChatRole, CompletionRequest};
use p42_core::{MaterializeStatus, MaterializedEntity, Metadata, ObjectType, Relation};
use serde_json::{Map, Value};

use crate::compiler::CompileError;
use crate::materializer::{claim_paths, date_segment, MaterializeCtx, Materializer};
use crate::props;

pub struct ArtifactMaterializer;

#[async_trait]
impl Materializer for ArtifactMaterializer {
    fn name(&self) -> &'static str {
        "artifact"
    }

    fn can_materialize(&self, relation: &Relation) -> bool {
        relation.relation_type == "Artifact"
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
            .ok_or_else(|| CompileError::InvalidRelation("artifact has no name".to_string()))?;

        let spec = match inline_spec(relation, &name) {
            Some(spec) => spec,
            None => generate_spec(relation, &name, ctx).await?,
        };

        let subtype = relation
            .property_str(props::SUBTYPE)
            .map(str::to_string)
            .or_else(|| {
                if spec.artifact_type.is_empty() { None } else { Some(spec.artifact_type.clone()) }
            })
            .unwrap_or_else(|| "misc".to_string());
        let filename = filename_for(&name, &spec.format);

        let paths = vec![
            format!("/artifacts/{subtype}/{filename}"),
            format!("/by-date/{}/{filename}", date_segment(now)),
            format!("/by-type/artifact/{filename}"),
        ];
        claim_paths(ctx, &paths, now)?;

        let mut metadata = Metadata::new(ObjectType::Artifact);
        metadata.subtype = Some(subtype);
        metadata.title = name.clone();
        metadata.description = spec.description.clone();
        metadata.session = relation.memory_session().map(str::to_string);
        metadata.agent = relation.property_str(props::AGENT).map(str::to_string);
        for path in &paths {
            metadata.add_path(path.clone());
        }

        let object_id = ctx.store.store_with_metadata(spec.content.as_bytes(), &mut metadata, now)?;
        let object_path = ctx.store.object_path(&object_id)?;

        let mut entity_meta = Map::new();
        entity_meta.insert("object_id".to_string(), Value::String(object_id));
        entity_meta.insert("name".to_string(), Value::String(name));
        Ok(MaterializedEntity {
            relation_id: relation.id.clone(),
            physical_path: object_path,
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

fn inline_spec(relation: &Relation, name: &str) -> Option<ArtifactSpec> {
    if let Some(value) = relation.property(props::SPEC) {
        if let Ok(spec) = serde_json::from_value::<ArtifactSpec>(value.clone()) {
            return Some(spec);
        }
    }
    let content = relation.property_str(props::CONTENT)?;
    Some(ArtifactSpec {
        name: name.to_string(),
        description: relation.property_str(props::DESCRIPTION).unwrap_or_default().to_string(),
        artifact_type: relation.property_str(props::SUBTYPE).unwrap_or_default().to_string(),
        format: relation.property_str(props::FORMAT).unwrap_or("text").to_string(),
        content: content.to_string(),
    })
}

async fn generate_spec(
    relation: &Relation,
    name: &str,
    ctx: &MaterializeCtx,
) -> Result<ArtifactSpec, CompileError> {
    let mut prompt = format!("Create an artifact named `{name}`.");
    if let Some(description) = relation.property_str(props::DESCRIPTION) {
        prompt.push_str(&format!(" {description}"));
    }

    let reply = ctx
        .llm
        .complete(CompletionRequest {
            system: "You are the Port 42 artifact weaver. Produce the requested artifact \
                     and return it with the crystallize_artifact tool."
                .to_string(),
            messages: vec![ChatMessage { role: ChatRole::User, content: prompt }],
            allow_tools: true,
        })
        .await
        .map_err(|e| CompileError::Generation(e.to_string()))?;

    reply
        .artifact_spec()
        .cloned()
        .ok_or_else(|| CompileError::Generation("model returned no artifact spec".to_string()))
}

/// Append the extension for a format unless the name already has one.
pub fn filename_for(name: &str, format: &str) -> String {
    if name.contains('.') {
        return name.to_string();
    }
    let ext = match format.to_lowercase().as_str() {
        "markdown" | "md" => ".md",
        "html" => ".html",
        "json" => ".json",
        "text" | "txt" => ".txt",
        _ => "",
    };
    format!("{name}{ext}")
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
