// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quick session lookup: an in-memory map flushed to `session-index.json`.
//!
//! The index records, per session id, the latest persisted object id plus
//! enough summary data to list `/memory` and decide what to restore at
//! startup without reading every session object.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use p42_core::SessionState;

use crate::fsutil::write_atomic;
use crate::StoreError;

/// One index entry per session ever persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIndexEntry {
    pub id: String,
    /// Object id of the latest persisted snapshot of this session.
    pub object_id: String,
    pub agent: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub state: SessionState,
    pub message_count: usize,
}

/// Single-writer index: mutations flush the whole file, readers share the
/// in-memory map.
pub struct SessionIndex {
    path: PathBuf,
    entries: RwLock<HashMap<String, SessionIndexEntry>>,
}

impl SessionIndex {
    /// Load the index at `<root>/session-index.json`, or start empty.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let path = root.join("session-index.json");
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        let index = Self { path, entries: RwLock::new(entries) };
        info!(sessions = index.len(), "session index loaded");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<SessionIndexEntry> {
        self.entries.read().get(id).cloned()
    }

    pub fn all(&self) -> Vec<SessionIndexEntry> {
        self.entries.read().values().cloned().collect()
    }

    /// Insert or replace an entry and flush.
    pub fn upsert(&self, entry: SessionIndexEntry) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.write();
            entries.insert(entry.id.clone(), entry);
        }
        self.flush()
    }

    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let removed = self.entries.write().remove(id).is_some();
        if removed {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let bytes = {
            let entries = self.entries.read();
            serde_json::to_vec_pretty(&*entries)?
        };
        write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
#[path = "session_index_tests.rs"]
mod tests;
