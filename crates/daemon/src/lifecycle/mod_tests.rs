// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use p42_adapters::FakeLlm;

use super::{startup, Config, LifecycleError};

#[tokio::test]
async fn startup_creates_layout_and_binds_socket() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::at_root(dir.path());

    let result = startup(&config, Arc::new(FakeLlm::new())).unwrap();
    assert!(config.socket_path.exists());
    assert!(config.lock_path.exists());

    let pid: u32 = std::fs::read_to_string(&config.lock_path).unwrap().trim().parse().unwrap();
    assert_eq!(pid, std::process::id());
    drop(result);
}

#[tokio::test]
async fn second_daemon_fails_to_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::at_root(dir.path());

    let first = startup(&config, Arc::new(FakeLlm::new())).unwrap();
    let second = startup(&config, Arc::new(FakeLlm::new()));
    assert!(matches!(second.unwrap_err(), LifecycleError::LockFailed(_)));

    // The running daemon's files were not clobbered.
    assert!(config.socket_path.exists());
    drop(first);
}

#[tokio::test]
async fn stale_socket_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::at_root(dir.path());
    std::fs::create_dir_all(&config.root).unwrap();
    std::fs::write(&config.socket_path, b"stale").unwrap();

    let result = startup(&config, Arc::new(FakeLlm::new())).unwrap();
    assert!(config.socket_path.exists());
    drop(result);
}

#[tokio::test]
async fn shutdown_removes_socket_and_pid() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::at_root(dir.path());

    let mut result = startup(&config, Arc::new(FakeLlm::new())).unwrap();
    result.daemon.shutdown().await;

    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
}
