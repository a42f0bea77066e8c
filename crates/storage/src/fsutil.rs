// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small filesystem helpers shared by the stores.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::StoreError;

/// Write `bytes` to `path` atomically: write a temp file in the same
/// directory, fsync, then rename over the target. Readers never observe a
/// half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| {
        StoreError::Io(std::io::Error::other(format!("no parent directory for {}", path.display())))
    })?;
    fs::create_dir_all(parent)?;

    let tmp = parent.join(format!(".tmp-{}", nanoid::nanoid!(8)));
    let result = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result.map_err(StoreError::Io)
}

/// Map a missing-file IO error to `NotFound`, leaving other errors alone.
pub(crate) fn not_found_as(err: std::io::Error, what: &str) -> StoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound(what.to_string())
    } else {
        StoreError::Io(err)
    }
}
