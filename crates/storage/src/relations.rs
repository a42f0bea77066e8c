// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relation and materialization records, one JSON file each under
//! `<root>/relations/`.
//!
//! Lookups by type or property are linear scans over the directory, which
//! is fine at current scales and keeps the files the single source of
//! truth.

use std::fs;
use std::path::{Path, PathBuf};

use p42_core::{MaterializedEntity, Relation};
use serde_json::Value;
use tracing::warn;

use crate::fsutil::{not_found_as, write_atomic};
use crate::StoreError;

pub struct RelationStore {
    root: PathBuf,
}

impl RelationStore {
    /// Store rooted at `<root>/relations`.
    pub fn new(root: &Path) -> Self {
        Self { root: root.join("relations") }
    }

    pub fn save(&self, r: &Relation) -> Result<(), StoreError> {
        if r.id.is_empty() {
            return Err(StoreError::InvalidId("relation has no id".to_string()));
        }
        let bytes = serde_json::to_vec_pretty(r)?;
        write_atomic(&self.relation_path(&r.id), &bytes)
    }

    pub fn load(&self, id: &str) -> Result<Relation, StoreError> {
        let bytes = fs::read(self.relation_path(id)).map_err(|e| not_found_as(e, id))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.relation_path(id).exists()
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        fs::remove_file(self.relation_path(id)).map_err(|e| not_found_as(e, id))
    }

    /// Every relation on disk, unreadable files skipped.
    pub fn list(&self) -> Result<Vec<Relation>, StoreError> {
        let mut relations = Vec::new();
        let rd = match fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(relations),
            Err(e) => return Err(e.into()),
        };
        for entry in rd {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with("relation-") || !name.ends_with(".json") {
                continue;
            }
            match fs::read(entry.path()).map_err(StoreError::Io).and_then(|b| {
                serde_json::from_slice::<Relation>(&b).map_err(StoreError::Json)
            }) {
                Ok(r) => relations.push(r),
                Err(e) => warn!(file = %name, error = %e, "skipping unreadable relation"),
            }
        }
        Ok(relations)
    }

    pub fn load_by_type(&self, relation_type: &str) -> Result<Vec<Relation>, StoreError> {
        Ok(self.list()?.into_iter().filter(|r| r.relation_type == relation_type).collect())
    }

    pub fn load_by_property(&self, key: &str, value: &Value) -> Result<Vec<Relation>, StoreError> {
        Ok(self.list()?.into_iter().filter(|r| r.property(key) == Some(value)).collect())
    }

    // ── Materialization links ────────────────────────────────────────

    pub fn save_materialized(&self, e: &MaterializedEntity) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(e)?;
        write_atomic(&self.materialized_path(&e.relation_id), &bytes)
    }

    pub fn load_materialized(&self, relation_id: &str) -> Result<MaterializedEntity, StoreError> {
        let bytes = fs::read(self.materialized_path(relation_id))
            .map_err(|e| not_found_as(e, relation_id))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn delete_materialized(&self, relation_id: &str) -> Result<(), StoreError> {
        fs::remove_file(self.materialized_path(relation_id))
            .map_err(|e| not_found_as(e, relation_id))
    }

    pub fn materialized_exists(&self, relation_id: &str) -> bool {
        self.materialized_path(relation_id).exists()
    }

    fn relation_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("relation-{id}.json"))
    }

    fn materialized_path(&self, relation_id: &str) -> PathBuf {
        self.root.join(format!("materialized-{relation_id}.json"))
    }
}

#[cfg(test)]
#[path = "relations_tests.rs"]
mod tests;
