// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! One request/response pair per connection; concurrency comes from
//! accepting many connections, each handled on its own task.

mod paths;
mod relations;
mod search;
mod sessions;

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use p42_adapters::LlmAdapter;
use p42_core::{Clock, SystemClock};
use p42_engine::RealityCompiler;
use p42_storage::{RelationStore, Store};
use p42_wire::{self as wire, ProtocolError, Request, RequestKind, Response};

use crate::agents::AgentRegistry;
use crate::env::ipc_timeout;
use crate::sessions::SessionManager;
use crate::vfs::VirtualFs;

/// Shared daemon context for all request handlers.
pub struct ListenCtx<C: Clock> {
    pub store: Arc<Store>,
    pub relations: Arc<RelationStore>,
    pub compiler: RealityCompiler<C>,
    pub vfs: VirtualFs,
    pub sessions: Arc<SessionManager<C>>,
    pub agents: AgentRegistry,
    pub llm: Arc<dyn LlmAdapter>,
    pub clock: C,
    pub start_time: Instant,
}

/// The production context.
pub type DaemonCtx = ListenCtx<SystemClock>;

/// Listener task for accepting socket connections.
pub struct Listener {
    unix: UnixListener,
    ctx: Arc<DaemonCtx>,
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<DaemonCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Run the accept loop until `shutdown` fires, then drain in-flight
    /// connections before returning.
    pub async fn run(self, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();
        loop {
            tokio::select! {
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tracker.spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("accept error: {}", e),
                },
                _ = shutdown.cancelled() => break,
            }
        }
        tracker.close();
        tracker.wait().await;
        info!("listener drained");
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        ProtocolError::Timeout => warn!("connection timeout"),
        _ => error!("connection error: {}", e),
    }
}

/// Handle a single client connection.
///
/// Races the request handler against client-disconnect detection: if the
/// client goes away before the handler finishes, the handler future is
/// dropped and no response is written.
async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &DaemonCtx,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + AsyncReadExt + Unpin + Send + 'static,
    W: AsyncWrite + AsyncWriteExt + Unpin + Send + 'static,
{
    let request = wire::read_request(&mut reader, ipc_timeout()).await?;

    if is_query(&request) {
        debug!(id = %request.id, kind = %request.kind, "received query");
    } else {
        info!(id = %request.id, kind = %request.kind, "received request");
    }

    let response = tokio::select! {
        response = handle_request(request, ctx) => response,
        _ = detect_client_disconnect(&mut reader) => {
            debug!("client disconnected, dropping handler");
            return Ok(());
        }
    };

    wire::write_response(&mut writer, &response, ipc_timeout()).await
}

/// Queries poll frequently and log at debug; everything else is info.
fn is_query(request: &Request) -> bool {
    matches!(
        request.parse_kind(),
        Some(
            RequestKind::Ping
                | RequestKind::Status
                | RequestKind::List
                | RequestKind::ListPath
                | RequestKind::ReadPath
                | RequestKind::GetMetadata
                | RequestKind::Search
                | RequestKind::Memory
                | RequestKind::GetRelation
                | RequestKind::ListRelations
        )
    )
}

/// Detect client disconnect by reading from the socket after the request.
///
/// The client sends one request then waits; a read returning 0 bytes
/// means it hung up.
async fn detect_client_disconnect<R: AsyncReadExt + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

/// Decode a typed payload, or produce the invalid-input response. An
/// absent payload is treated as an empty object so that all-optional
/// payloads (`list`, `memory`) accept a bare request.
fn parse_payload<T: DeserializeOwned>(request: &Request) -> Result<T, Box<Response>> {
    let payload = if request.payload.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        request.payload.clone()
    };
    serde_json::from_value(payload)
        .map_err(|e| Box::new(Response::err(&request.id, format!("invalid payload: {e}"))))
}

/// Dispatch one request to its handler. Never panics, never crashes the
/// daemon: every failure becomes a `success=false` response.
pub async fn handle_request<C: Clock>(request: Request, ctx: &ListenCtx<C>) -> Response {
    if request.id.is_empty() {
        return Response::err("", "request id must not be empty");
    }
    let Some(kind) = request.parse_kind() else {
        return Response::err(&request.id, format!("unknown request type '{}'", request.kind));
    };

    match kind {
        RequestKind::Ping => {
            Response::ok(&request.id, serde_json::json!({ "message": "pong" }))
        }
        RequestKind::Status => sessions::handle_status(&request, ctx),
        RequestKind::Possess => match parse_payload(&request) {
            Ok(payload) => sessions::handle_possess(&request.id, payload, ctx).await,
            Err(response) => *response,
        },
        RequestKind::Memory => match parse_payload(&request) {
            Ok(payload) => sessions::handle_memory(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::End => match parse_payload(&request) {
            Ok(payload) => sessions::handle_end(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::CreateMemory => match parse_payload(&request) {
            Ok(payload) => sessions::handle_create_memory(&request.id, payload, ctx).await,
            Err(response) => *response,
        },
        RequestKind::StorePath => match parse_payload(&request) {
            Ok(payload) => paths::handle_store_path(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::UpdatePath => match parse_payload(&request) {
            Ok(payload) => paths::handle_update_path(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::DeletePath => match parse_payload(&request) {
            Ok(payload) => paths::handle_delete_path(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::List | RequestKind::ListPath => match parse_payload(&request) {
            Ok(payload) => paths::handle_list_path(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::ReadPath => match parse_payload(&request) {
            Ok(payload) => paths::handle_read_path(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::GetMetadata => match parse_payload(&request) {
            Ok(payload) => paths::handle_get_metadata(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::Search => match parse_payload(&request) {
            Ok(payload) => search::handle_search(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::DeclareRelation => match parse_payload(&request) {
            Ok(payload) => relations::handle_declare(&request.id, payload, ctx).await,
            Err(response) => *response,
        },
        RequestKind::GetRelation => match parse_payload(&request) {
            Ok(payload) => relations::handle_get(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::ListRelations => match parse_payload(&request) {
            Ok(payload) => relations::handle_list(&request.id, payload, ctx),
            Err(response) => *response,
        },
        RequestKind::DeleteRelation => match parse_payload(&request) {
            Ok(payload) => relations::handle_delete(&request.id, payload, ctx),
            Err(response) => *response,
        },
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures;

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
