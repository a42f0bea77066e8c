// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed object store.
//!
//! Objects are immutable byte sequences keyed by the lowercase hex SHA-256
//! of their content, fanned out two directory levels deep:
//! `objects/<id[0:2]>/<id[2:4]>/<id[4:]>`. Storing the same bytes twice is
//! a no-op, which also makes the store naturally safe under concurrent
//! writers.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::fsutil::{not_found_as, write_atomic};
use crate::StoreError;

/// Length of an object id: SHA-256 as lowercase hex.
pub const OBJECT_ID_LEN: usize = 64;

pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Store rooted at `<root>/objects`.
    pub fn new(root: &Path) -> Self {
        Self { root: root.join("objects") }
    }

    /// Compute the id of `bytes` without storing them.
    pub fn hash(bytes: &[u8]) -> String {
        Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Store `bytes`, returning the content id. Idempotent: if the object
    /// already exists the file is left untouched.
    pub fn store(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let id = Self::hash(bytes);
        let path = self.fanout_path(&id);
        if !path.exists() {
            write_atomic(&path, bytes)?;
        }
        Ok(id)
    }

    /// Drain a reader to memory, then store.
    pub fn copy_from(&self, reader: &mut dyn Read) -> Result<String, StoreError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.store(&bytes)
    }

    pub fn read(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(id)?;
        fs::read(&path).map_err(|e| not_found_as(e, id))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.object_path(id).map(|p| p.exists()).unwrap_or(false)
    }

    /// Filesystem path for an object id (the object need not exist yet).
    pub fn object_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if id.len() != OBJECT_ID_LEN || !id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.fanout_path(id))
    }

    /// Walk the fan-out and reconstruct every stored id.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let top = match fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        for first in top {
            let first = first?;
            if !first.file_type()?.is_dir() {
                continue;
            }
            for second in fs::read_dir(first.path())? {
                let second = second?;
                if !second.file_type()?.is_dir() {
                    continue;
                }
                for entry in fs::read_dir(second.path())? {
                    let entry = entry?;
                    let id = format!(
                        "{}{}{}",
                        first.file_name().to_string_lossy(),
                        second.file_name().to_string_lossy(),
                        entry.file_name().to_string_lossy(),
                    );
                    if id.len() == OBJECT_ID_LEN {
                        ids.push(id);
                    }
                }
            }
        }
        Ok(ids)
    }

    fn fanout_path(&self, id: &str) -> PathBuf {
        self.root.join(&id[0..2]).join(&id[2..4]).join(&id[4..])
    }
}

#[cfg(test)]
#[path = "objects_tests.rs"]
mod tests;
