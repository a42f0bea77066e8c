// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! p42d: the Port 42 daemon binary.

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use p42_adapters::{AnthropicLlm, LlmAdapter, LlmError, UnconfiguredLlm};
use p42_daemon::lifecycle::{startup, Config};
use p42_daemon::listener::Listener;
use p42_daemon::sessions::spawn_sweeper;
use p42_daemon::env;

#[tokio::main]
async fn main() -> ExitCode {
    let _log_guard = init_tracing();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("p42d: {e}");
            return ExitCode::FAILURE;
        }
    };

    let llm: Arc<dyn LlmAdapter> = match AnthropicLlm::from_env() {
        Ok(llm) => Arc::new(llm),
        Err(LlmError::MissingApiKey) => {
            warn!("no API key configured; possession and generation are disabled");
            Arc::new(UnconfiguredLlm)
        }
        Err(e) => {
            eprintln!("p42d: failed to build LLM client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match startup(&config, llm) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("p42d: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut daemon = result.daemon;

    let shutdown = CancellationToken::new();
    let listener_task = tokio::spawn(
        Listener::new(result.listener, Arc::clone(&daemon.ctx)).run(shutdown.clone()),
    );
    let sweeper_task = spawn_sweeper(
        Arc::clone(&daemon.ctx.sessions),
        env::sweep_interval(),
        shutdown.clone(),
    );

    println!("PORT42 READY");
    wait_for_signal().await;

    // Graceful shutdown: stop accepting, drain in-flight handlers, stop
    // the sweeper, persist sessions, clean up files.
    shutdown.cancel();
    if let Err(e) = listener_task.await {
        warn!("listener task ended abnormally: {e}");
    }
    if let Err(e) = sweeper_task.await {
        warn!("sweeper task ended abnormally: {e}");
    }
    daemon.shutdown().await;
    ExitCode::SUCCESS
}

/// Log to stderr, or to the daemon log file when `P42_LOG_FILE=1`.
/// Returns the appender guard so buffered lines flush on exit.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_env("P42_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let to_file = std::env::var("P42_LOG_FILE").is_ok_and(|v| v == "1");
    if to_file {
        if let Ok(dir) = env::state_dir() {
            let appender = tracing_appender::rolling::never(&dir, "daemon.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            return Some(guard);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    None
}

/// Block until SIGINT or SIGTERM.
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGTERM handler: {e}");
            // Fall back to ctrl-c only.
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}
