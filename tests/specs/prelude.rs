// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec-test harness: an in-process daemon on a temp root, with a
//! scripted LLM and a socket client.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use p42_adapters::FakeLlm;
use p42_daemon::lifecycle::{startup, Config, DaemonState};
use p42_daemon::listener::Listener;
use p42_wire::{read_response, write_request, Request, RequestKind, Response};
use serde_json::Value;
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

pub use serde_json::json;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestDaemon {
    pub socket_path: PathBuf,
    pub llm: Arc<FakeLlm>,
    daemon: DaemonState,
    shutdown: CancellationToken,
    listener_task: tokio::task::JoinHandle<()>,
    request_seq: std::sync::atomic::AtomicU64,
}

impl TestDaemon {
    /// Start a daemon on `root` with a fresh scripted LLM.
    pub async fn start(root: &Path) -> Self {
        Self::start_with_llm(root, Arc::new(FakeLlm::new())).await
    }

    pub async fn start_with_llm(root: &Path, llm: Arc<FakeLlm>) -> Self {
        let config = Config::at_root(root);
        let adapter: Arc<dyn p42_adapters::LlmAdapter> = llm.clone();
        let result = startup(&config, adapter).expect("daemon startup");
        let shutdown = CancellationToken::new();
        let listener_task = tokio::spawn(
            Listener::new(result.listener, Arc::clone(&result.daemon.ctx)).run(shutdown.clone()),
        );
        Self {
            socket_path: config.socket_path,
            llm,
            daemon: result.daemon,
            shutdown,
            listener_task,
            request_seq: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// One request/response pair over a fresh connection.
    pub async fn request(&self, kind: RequestKind, payload: Value) -> Response {
        let seq = self.request_seq.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let request = Request::new(format!("spec-{seq}"), kind, payload);

        let stream = UnixStream::connect(&self.socket_path).await.expect("connect");
        let (mut reader, mut writer) = stream.into_split();
        write_request(&mut writer, &request, CLIENT_TIMEOUT).await.expect("write request");
        let response = read_response(&mut reader, CLIENT_TIMEOUT).await.expect("read response");
        assert_eq!(response.id, request.id, "response echoes the request id");
        response
    }

    /// Request that must succeed; returns its data.
    pub async fn request_ok(&self, kind: RequestKind, payload: Value) -> Value {
        let response = self.request(kind, payload).await;
        assert!(response.success, "{:?} failed: {:?}", kind, response.error);
        response.data.unwrap_or(Value::Null)
    }

    /// Graceful stop: drain the listener, persist sessions, release the
    /// lock. The root stays behind for a restart.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        let _ = self.listener_task.await;
        self.daemon.shutdown().await;
    }
}

pub fn b64(bytes: &[u8]) -> String {
    p42_wire::encode_content(bytes)
}

pub fn unb64(value: &Value) -> Vec<u8> {
    p42_wire::decode_content(value.as_str().expect("content string")).expect("valid base64")
}
