// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for the declarative layer: declare, get, list, and delete
//! relations.

use p42_core::Clock;
use p42_wire::{
    DeclareRelationPayload, DeleteRelationPayload, GetRelationPayload, ListRelationsPayload,
    Response,
};
use serde_json::json;

use super::ListenCtx;

pub(crate) async fn handle_declare<C: Clock>(
    id: &str,
    payload: DeclareRelationPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    match ctx.compiler.declare(payload.relation, payload.replace).await {
        Ok((relation, entity)) => Response::ok(
            id,
            json!({
                "relation": relation,
                "materialization": entity,
            }),
        ),
        Err(e) => Response::err(id, e.to_string()),
    }
}

pub(crate) fn handle_get<C: Clock>(
    id: &str,
    payload: GetRelationPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    match ctx.compiler.get(&payload.relation_id) {
        Ok(relation) => Response::ok(id, json!({ "relation": relation })),
        Err(e) => Response::err(id, e.to_string()),
    }
}

pub(crate) fn handle_list<C: Clock>(
    id: &str,
    payload: ListRelationsPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    let result = match payload.relation_type.as_deref() {
        Some(relation_type) => ctx.compiler.list_by_type(relation_type),
        None => ctx.compiler.list(),
    };
    match result {
        Ok(mut relations) => {
            relations.sort_by(|a, b| a.id.cmp(&b.id));
            let count = relations.len();
            Response::ok(id, json!({ "relations": relations, "count": count }))
        }
        Err(e) => Response::err(id, e.to_string()),
    }
}

pub(crate) fn handle_delete<C: Clock>(
    id: &str,
    payload: DeleteRelationPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    match ctx.compiler.delete(&payload.relation_id) {
        Ok(()) => Response::ok(id, json!({ "deleted": payload.relation_id })),
        Err(e) => Response::err(id, e.to_string()),
    }
}
