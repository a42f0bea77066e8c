// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executable command entries: `<root>/commands/<name>` symlinks into the
//! object store.
//!
//! The object file itself gets the executable bit; regenerating a command
//! repoints the symlink at the new object and leaves the old snapshot on
//! disk (no GC).

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::StoreError;

/// Create or replace the executable entry for `name`, pointing at
/// `object_path`. Sets mode 0755 on the object file.
pub fn install_executable(
    commands_dir: &Path,
    name: &str,
    object_path: &Path,
) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(commands_dir)?;

    let mut perms = fs::metadata(object_path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(object_path, perms)?;

    let entry = commands_dir.join(name);
    match fs::symlink_metadata(&entry) {
        Ok(_) => fs::remove_file(&entry)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::os::unix::fs::symlink(object_path, &entry)?;
    Ok(entry)
}

/// Remove the executable entry for `name`, if present.
pub fn remove_executable(commands_dir: &Path, name: &str) -> Result<(), StoreError> {
    let entry = commands_dir.join(name);
    match fs::remove_file(&entry) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
