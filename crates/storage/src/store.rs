// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Combined object + metadata store facade.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use p42_core::Metadata;

use crate::{MetadataStore, ObjectStore, StoreError};

/// The facade the daemon, VFS, and materializers talk to. Owns both
/// halves of the consciousness store and keeps their invariant: every
/// metadata record with a non-empty id has a stored object behind it.
pub struct Store {
    objects: ObjectStore,
    metadata: MetadataStore,
}

impl Store {
    pub fn new(root: &Path) -> Self {
        Self { objects: ObjectStore::new(root), metadata: MetadataStore::new(root) }
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Store bytes and their sidecar in one call. The object id and size
    /// are written back into `m`. If the metadata save fails the object
    /// remains on disk (harmless garbage, no GC).
    pub fn store_with_metadata(
        &self,
        bytes: &[u8],
        m: &mut Metadata,
        now: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let id = self.objects.store(bytes)?;
        m.id = id.clone();
        m.size = bytes.len() as u64;
        self.metadata.save(m, now)?;
        Ok(id)
    }

    pub fn read_object(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.objects.read(id)
    }

    pub fn object_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        self.objects.object_path(id)
    }

    /// Load metadata, bumping the access time.
    pub fn load_metadata(&self, id: &str, now: DateTime<Utc>) -> Result<Metadata, StoreError> {
        self.metadata.load(id, now)
    }

    /// All metadata records, access times untouched.
    pub fn scan_metadata(&self) -> Result<Vec<Metadata>, StoreError> {
        self.metadata.scan()
    }

    /// Take `paths` away from whichever records currently hold them.
    ///
    /// A virtual path belongs to exactly one object at a time; rebinding a
    /// path to a new object (command regeneration, session re-persist)
    /// releases it from the old record first. Records left with no paths
    /// are marked deprecated by `remove_path`.
    pub fn release_paths(&self, paths: &[String], now: DateTime<Utc>) -> Result<(), StoreError> {
        if paths.is_empty() {
            return Ok(());
        }
        for mut m in self.metadata.scan()? {
            let before = m.paths.len();
            for p in paths {
                m.remove_path(p);
            }
            if m.paths.len() != before {
                self.metadata.save(&mut m, now)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
