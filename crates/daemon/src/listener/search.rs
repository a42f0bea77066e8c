// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Search handler: wire filters → store query → ranked results.

use p42_core::{Clock, ObjectType};
use p42_storage::{search, SearchFilters, DEFAULT_SEARCH_LIMIT};
use p42_wire::{Response, SearchPayload, SearchReply, SearchResultEntry};

use super::ListenCtx;

pub(crate) fn handle_search<C: Clock>(
    id: &str,
    payload: SearchPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    let object_type = match payload.filters.object_type.as_deref() {
        Some(s) => match ObjectType::try_parse(s) {
            Some(t) => Some(t),
            None => return Response::err(id, format!("unknown object type '{s}'")),
        },
        None => None,
    };
    let filters = SearchFilters {
        path_prefix: payload.filters.path_prefix.clone(),
        object_type,
        created_after: payload.filters.created_after,
        created_before: payload.filters.created_before,
        agent: payload.filters.agent.clone(),
        tags: payload.filters.tags.clone(),
    };
    let limit = payload.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    match search(&ctx.store, &payload.query, &filters, limit, ctx.clock.now()) {
        Ok(hits) => {
            let results: Vec<SearchResultEntry> = hits
                .into_iter()
                .map(|hit| SearchResultEntry {
                    id: hit.id,
                    path: hit.path,
                    title: hit.title,
                    object_type: hit.object_type.to_string(),
                    score: hit.score,
                    match_fields: hit.match_fields,
                    snippet: hit.snippet,
                    created: hit.created,
                })
                .collect();
            let count = results.len();
            let reply =
                SearchReply { query: payload.query, filters: payload.filters, results, count };
            match serde_json::to_value(reply) {
                Ok(data) => Response::ok(id, data),
                Err(e) => Response::err(id, format!("failed to encode reply: {e}")),
            }
        }
        Err(e) => Response::err(id, e.to_string()),
    }
}
