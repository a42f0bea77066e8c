// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-object metadata sidecars, one JSON file per object id.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use p42_core::Metadata;
use tracing::{debug, warn};

use crate::fsutil::{not_found_as, write_atomic};
use crate::StoreError;

pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    /// Store rooted at `<root>/metadata`.
    pub fn new(root: &Path) -> Self {
        Self { root: root.join("metadata") }
    }

    /// Persist a record. Refuses an empty id; fills `created` on first
    /// save; always refreshes `modified` and `accessed`.
    pub fn save(&self, m: &mut Metadata, now: DateTime<Utc>) -> Result<(), StoreError> {
        if m.id.is_empty() {
            return Err(StoreError::InvalidId("metadata has no object id".to_string()));
        }
        if !m.has_created() {
            m.created = now;
        }
        m.modified = now;
        m.accessed = now;

        let bytes = serde_json::to_vec_pretty(&m)?;
        write_atomic(&self.record_path(&m.id), &bytes)
    }

    /// Load a record and bump its access time. The bump is persisted
    /// best-effort: a failed write never fails the read.
    pub fn load(&self, id: &str, now: DateTime<Utc>) -> Result<Metadata, StoreError> {
        let mut m = self.load_raw(id)?;
        m.accessed = now;
        match serde_json::to_vec_pretty(&m) {
            Ok(bytes) => {
                if let Err(e) = write_atomic(&self.record_path(id), &bytes) {
                    debug!(id, error = %e, "failed to persist access-time bump");
                }
            }
            Err(e) => debug!(id, error = %e, "failed to serialize access-time bump"),
        }
        Ok(m)
    }

    /// Load without touching `accessed`. Used by scans so that listing a
    /// directory does not rewrite every sidecar.
    pub fn load_raw(&self, id: &str) -> Result<Metadata, StoreError> {
        let bytes = fs::read(self.record_path(id)).map_err(|e| not_found_as(e, id))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        fs::remove_file(self.record_path(id)).map_err(|e| not_found_as(e, id))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.record_path(id).exists()
    }

    /// All record ids on disk.
    pub fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let rd = match fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        for entry in rd {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(id) = name.to_string_lossy().strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Load every record, skipping files that fail to parse.
    pub fn scan(&self) -> Result<Vec<Metadata>, StoreError> {
        let mut records = Vec::new();
        for id in self.list_ids()? {
            match self.load_raw(&id) {
                Ok(m) => records.push(m),
                Err(e) => warn!(id, error = %e, "skipping unreadable metadata record"),
            }
        }
        Ok(records)
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
