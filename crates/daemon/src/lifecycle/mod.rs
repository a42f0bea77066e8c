// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use p42_adapters::LlmAdapter;
use p42_core::{NanoIdGen, SystemClock};
use p42_engine::{
    ArtifactMaterializer, MaterializeCtx, RealityCompiler, RuleEngine, ToolMaterializer,
    UrlArtifactMaterializer,
};
use p42_storage::{RelationStore, SessionIndex, Store, StoreError};

use crate::agents::AgentRegistry;
use crate::env;
use crate::listener::DaemonCtx;
use crate::sessions::SessionManager;
use crate::vfs::VirtualFs;

/// Daemon configuration: every on-disk location under one root.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/port42)
    pub root: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Directory for executable command entries
    pub commands_dir: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::at_root(env::state_dir()?))
    }

    /// Configuration rooted at an explicit directory.
    pub fn at_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            socket_path: root.join("daemon.sock"),
            lock_path: root.join("daemon.pid"),
            log_path: root.join("daemon.log"),
            commands_dir: root.join("commands"),
            root,
        }
    }
}

/// Daemon state during operation.
///
/// The listener is returned separately from startup to be spawned as a
/// Listener task.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub ctx: Arc<DaemonCtx>,
}

/// Result of daemon startup.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
}

impl std::fmt::Debug for StartupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupResult").finish_non_exhaustive()
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon: lock, open stores, restore sessions, bind last.
pub fn startup(config: &Config, llm: Arc<dyn LlmAdapter>) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config, llm) {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock —
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

fn startup_inner(
    config: &Config,
    llm: Arc<dyn LlmAdapter>,
) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.root)?;

    // Acquire the lock first. OpenOptions avoids truncating the running
    // daemon's PID before we hold the lock.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // Stores.
    let store = Arc::new(Store::new(&config.root));
    let relations = Arc::new(RelationStore::new(&config.root));
    let index = Arc::new(SessionIndex::open(&config.root)?);
    let clock = SystemClock;

    // Reality Compiler with the full materializer registry and the
    // standard rules.
    let compiler = RealityCompiler::new(
        MaterializeCtx {
            store: Arc::clone(&store),
            relations: Arc::clone(&relations),
            commands_dir: config.commands_dir.clone(),
            llm: Arc::clone(&llm),
        },
        vec![
            Box::new(ToolMaterializer),
            Box::new(ArtifactMaterializer),
            Box::new(UrlArtifactMaterializer),
        ],
        RuleEngine::standard(),
        Box::new(NanoIdGen),
        clock.clone(),
    );

    // Sessions: rehydrate recent threads before accepting connections.
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&store),
        Arc::clone(&index),
        clock.clone(),
        env::idle_timeout_ms(),
    ));
    sessions.restore(env::restore_window());

    let vfs = VirtualFs::new(Arc::clone(&store), Arc::clone(&relations), config.commands_dir.clone());
    let agents = AgentRegistry::load(&config.root);

    // Remove a stale socket and bind last, after everything validated.
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    let ctx = Arc::new(DaemonCtx {
        store,
        relations,
        compiler,
        vfs,
        sessions,
        agents,
        llm,
        clock,
        start_time: Instant::now(),
    });

    info!(root = %config.root.display(), "daemon started");
    Ok(StartupResult { daemon: DaemonState { config: config.clone(), lock_file, ctx }, listener })
}

impl DaemonState {
    /// Shutdown the daemon gracefully: persist every live session (behind
    /// any still-queued turn snapshots), then remove the socket and PID
    /// files. The lock releases on drop.
    pub async fn shutdown(&mut self) {
        info!("shutting down daemon...");

        self.ctx.sessions.persist_all().await;

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("failed to remove socket file: {}", e);
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("failed to remove PID file: {}", e);
            }
        }

        info!("daemon shutdown complete");
    }
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
