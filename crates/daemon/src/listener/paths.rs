// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for the path-level operations: store, read, update, delete,
//! list, and metadata.

use p42_core::Clock;
use p42_wire::{
    decode_content, encode_content, DeletePathPayload, GetMetadataPayload, ListPathPayload,
    ReadPathPayload, ReadPathReply, Response, StorePathPayload, StorePathReply, UpdatePathPayload,
};
use serde_json::json;
use tracing::warn;

use super::ListenCtx;

pub(crate) fn handle_store_path<C: Clock>(
    id: &str,
    payload: StorePathPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    let bytes = match decode_content(&payload.content) {
        Ok(bytes) => bytes,
        Err(e) => return Response::err(id, format!("invalid base64 content: {e}")),
    };
    match ctx.vfs.store_path(&payload.path, &bytes, payload.metadata.as_ref(), ctx.clock.now()) {
        Ok((object_id, paths, size)) => match serde_json::to_value(StorePathReply {
            id: object_id,
            paths,
            size,
        }) {
            Ok(data) => Response::ok(id, data),
            Err(e) => Response::err(id, format!("failed to encode reply: {e}")),
        },
        Err(e) => Response::err(id, e.to_string()),
    }
}

pub(crate) fn handle_update_path<C: Clock>(
    id: &str,
    payload: UpdatePathPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    let bytes = match payload.content.as_deref().map(decode_content).transpose() {
        Ok(bytes) => bytes,
        Err(e) => return Response::err(id, format!("invalid base64 content: {e}")),
    };
    match ctx.vfs.update_path(
        &payload.path,
        bytes.as_deref(),
        payload.metadata_updates.as_ref(),
        ctx.clock.now(),
    ) {
        Ok((object_id, paths, size)) => {
            Response::ok(id, json!({ "id": object_id, "paths": paths, "size": size }))
        }
        Err(e) => Response::err(id, e.to_string()),
    }
}

pub(crate) fn handle_delete_path<C: Clock>(
    id: &str,
    payload: DeletePathPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    match ctx.vfs.delete_path(&payload.path, ctx.clock.now()) {
        Ok(()) => Response::ok(id, json!({ "deleted": payload.path })),
        Err(e) => Response::err(id, e.to_string()),
    }
}

pub(crate) fn handle_list_path<C: Clock>(
    id: &str,
    payload: ListPathPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    let live = ctx.sessions.live_summaries();
    match ctx.vfs.list(&payload.path, &live) {
        Ok(entries) => Response::ok(id, json!({ "path": payload.path, "entries": entries })),
        Err(e) => Response::err(id, e.to_string()),
    }
}

pub(crate) fn handle_read_path<C: Clock>(
    id: &str,
    payload: ReadPathPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    match ctx.vfs.read(&payload.path, ctx.clock.now()) {
        Ok(out) => {
            let metadata = out.metadata.as_ref().and_then(|m| match serde_json::to_value(m) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(path = %payload.path, error = %e, "failed to encode metadata");
                    None
                }
            });
            let reply = ReadPathReply {
                size: out.bytes.len() as u64,
                content: encode_content(&out.bytes),
                path: payload.path,
                metadata,
            };
            match serde_json::to_value(reply) {
                Ok(data) => Response::ok(id, data),
                Err(e) => Response::err(id, format!("failed to encode reply: {e}")),
            }
        }
        Err(e) => Response::err(id, e.to_string()),
    }
}

pub(crate) fn handle_get_metadata<C: Clock>(
    id: &str,
    payload: GetMetadataPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    let now = ctx.clock.now();
    match ctx.vfs.metadata(&payload.path, now) {
        Ok(m) => match serde_json::to_value(&m) {
            Ok(mut data) => {
                if let Some(object) = data.as_object_mut() {
                    let age = now.signed_duration_since(m.created).num_seconds().max(0);
                    object.insert("age_seconds".to_string(), json!(age));
                }
                Response::ok(id, data)
            }
            Err(e) => Response::err(id, format!("failed to encode metadata: {e}")),
        },
        Err(e) => Response::err(id, e.to_string()),
    }
}
