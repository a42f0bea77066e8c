// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! URL artifact materializer: bookmarks as tiny redirect pages under
//! `/artifacts/bookmarks/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use p42_core::{MaterializeStatus, MaterializedEntity, Metadata, ObjectType, Relation};
use serde_json::{Map, Value};

use crate::compiler::CompileError;
use crate::materializer::{claim_paths, date_segment, MaterializeCtx, Materializer};
use crate::props;

pub struct UrlArtifactMaterializer;

#[async_trait]
impl Materializer for UrlArtifactMaterializer {
    fn name(&self) -> &'static str {
        "url-artifact"
    }

    fn can_materialize(&self, relation: &Relation) -> bool {
        relation.relation_type == "URLArtifact"
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
            .ok_or_else(|| CompileError::InvalidRelation("bookmark has no name".to_string()))?;
        let url = relation
            .property_str(props::URL)
            .map(str::to_string)
            .ok_or_else(|| CompileError::InvalidRelation("bookmark has no url".to_string()))?;

        let filename = format!("{name}.html");
        let paths = vec![
            format!("/artifacts/bookmarks/{filename}"),
            format!("/by-date/{}/{filename}", date_segment(now)),
            format!("/by-type/artifact/{filename}"),
        ];
        claim_paths(ctx, &paths, now)?;

        let content = redirect_page(&name, &url);

        let mut metadata = Metadata::new(ObjectType::Artifact);
        metadata.subtype = Some("bookmarks".to_string());
        metadata.title = name.clone();
        metadata.description = url.clone();
        for path in &paths {
            metadata.add_path(path.clone());
        }

        let object_id = ctx.store.store_with_metadata(content.as_bytes(), &mut metadata, now)?;
        let object_path = ctx.store.object_path(&object_id)?;

        let mut entity_meta = Map::new();
        entity_meta.insert("object_id".to_string(), Value::String(object_id));
        entity_meta.insert("name".to_string(), Value::String(name));
        entity_meta.insert("url".to_string(), Value::String(url));
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

fn redirect_page(name: &str, url: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"0; url={url}\">\n\
         <title>{name}</title>\n</head>\n\
         <body><a href=\"{url}\">{name}</a></body>\n</html>\n"
    )
}
