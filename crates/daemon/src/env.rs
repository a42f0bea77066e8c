// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Daemon version (from Cargo.toml)
pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve state directory: PORT42_DIR > XDG_STATE_HOME/port42 > ~/.local/state/port42
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("PORT42_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("port42"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/port42"))
}

fn duration_var(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    duration_var("P42_IPC_TIMEOUT_MS", Duration::from_secs(5))
}

/// Session sweeper cadence (default 5 min)
pub fn sweep_interval() -> Duration {
    duration_var("P42_SWEEP_INTERVAL_MS", Duration::from_secs(5 * 60))
}

/// Session idle timeout (default 30 min)
pub fn idle_timeout_ms() -> u64 {
    std::env::var("P42_IDLE_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(p42_core::DEFAULT_IDLE_TIMEOUT_MS)
}

/// How far back sessions are rehydrated at startup (default 24 h)
pub fn restore_window() -> chrono::Duration {
    let hours = std::env::var("P42_RESTORE_WINDOW_HOURS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(24);
    chrono::Duration::hours(hours)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
