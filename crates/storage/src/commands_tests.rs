// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::unix::fs::PermissionsExt;

use tempfile::tempdir;

use crate::ObjectStore;

use super::{install_executable, remove_executable};

#[test]
fn install_creates_executable_symlink() {
    let dir = tempdir().unwrap();
    let objects = ObjectStore::new(dir.path());
    let commands_dir = dir.path().join("commands");

    let id = objects.store(b"#!/bin/sh\necho hi\n").unwrap();
    let object_path = objects.object_path(&id).unwrap();

    let entry = install_executable(&commands_dir, "greeter", &object_path).unwrap();
    assert_eq!(entry, commands_dir.join("greeter"));
    assert_eq!(std::fs::read_link(&entry).unwrap(), object_path);

    let mode = std::fs::metadata(&object_path).unwrap().permissions().mode();
    assert_eq!(mode & 0o755, 0o755);
}

#[test]
fn reinstall_repoints_at_new_object() {
    let dir = tempdir().unwrap();
    let objects = ObjectStore::new(dir.path());
    let commands_dir = dir.path().join("commands");

    let v1 = objects.store(b"#!/bin/sh\necho one\n").unwrap();
    let v2 = objects.store(b"#!/bin/sh\necho two\n").unwrap();
    let v1_path = objects.object_path(&v1).unwrap();
    let v2_path = objects.object_path(&v2).unwrap();

    install_executable(&commands_dir, "greeter", &v1_path).unwrap();
    install_executable(&commands_dir, "greeter", &v2_path).unwrap();

    let entry = commands_dir.join("greeter");
    assert_eq!(std::fs::read_link(&entry).unwrap(), v2_path);
    // The old snapshot stays on disk.
    assert!(v1_path.exists());
}

#[test]
fn remove_is_idempotent() {
    let dir = tempdir().unwrap();
    let commands_dir = dir.path().join("commands");
    remove_executable(&commands_dir, "ghost").unwrap();

    let objects = ObjectStore::new(dir.path());
    let id = objects.store(b"bytes").unwrap();
    install_executable(&commands_dir, "real", &objects.object_path(&id).unwrap()).unwrap();
    remove_executable(&commands_dir, "real").unwrap();
    remove_executable(&commands_dir, "real").unwrap();
    assert!(!commands_dir.join("real").exists());
}
