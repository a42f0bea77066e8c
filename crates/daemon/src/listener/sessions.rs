// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session handlers: possess, memory, end, create_memory, status.
//!
//! Possession is the conversational loop. When the model crystallizes a
//! command or artifact, the already-generated spec is embedded into a
//! relation (`properties.spec`) and declared through the Reality
//! Compiler, so both flows share one materialization path and the rule
//! engine fires either way.

use p42_adapters::{ChatMessage, ChatRole, CompletionRequest};
use p42_core::{Clock, Relation, Role, Session};
use p42_wire::{
    CreateMemoryPayload, CreateMemoryReply, EndPayload, MemoryPayload, MemoryReply,
    PossessPayload, PossessReply, Request, Response, SessionSummaryEntry, SpecSummary, StatusReply,
};
use serde_json::json;
use tracing::warn;

use crate::env::DAEMON_VERSION;
use crate::sessions::session_paths;

use super::ListenCtx;

/// How many trailing messages of a referenced session are folded into
/// the system prompt as memory context.
const MEMORY_CONTEXT_MESSAGES: usize = 6;

pub(crate) fn handle_status<C: Clock>(request: &Request, ctx: &ListenCtx<C>) -> Response {
    let sessions: Vec<SessionSummaryEntry> =
        ctx.sessions.live_summaries().into_iter().map(to_summary_entry).collect();
    let reply = StatusReply {
        version: DAEMON_VERSION.to_string(),
        uptime_secs: ctx.start_time.elapsed().as_secs(),
        session_count: sessions.len(),
        sessions,
    };
    match serde_json::to_value(reply) {
        Ok(data) => Response::ok(&request.id, data),
        Err(e) => Response::err(&request.id, format!("failed to encode status: {e}")),
    }
}

fn to_summary_entry(entry: p42_storage::SessionIndexEntry) -> SessionSummaryEntry {
    SessionSummaryEntry {
        id: entry.id,
        agent: entry.agent,
        state: entry.state.to_string(),
        message_count: entry.message_count,
        created_at: entry.created_at,
        last_activity: entry.last_activity,
    }
}

pub(crate) async fn handle_possess<C: Clock>(
    id: &str,
    payload: PossessPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    if payload.agent.is_empty() {
        return Response::err(id, "possess requires an agent");
    }
    let (session_id, _created) =
        ctx.sessions.get_or_create(payload.session_id.as_deref(), &payload.agent);
    ctx.sessions.append_message(&session_id, Role::User, &payload.message);

    let Some(session) = ctx.sessions.snapshot(&session_id) else {
        return Response::err(id, format!("not found: session {session_id}"));
    };
    let request = CompletionRequest {
        system: build_system_prompt(ctx, &payload),
        messages: chat_history(&session),
        allow_tools: true,
    };

    let reply = match ctx.llm.complete(request).await {
        Ok(reply) => reply,
        Err(e) => return Response::err(id, format!("possession failed: {e}")),
    };

    let text = reply.text().to_string();
    ctx.sessions.append_message(&session_id, Role::Assistant, &text);

    let mut out = PossessReply {
        message: text,
        agent: payload.agent.clone(),
        session_id: session_id.clone(),
        command_spec: None,
        artifact_spec: None,
        command_generated: false,
        artifact_generated: false,
    };

    if let Some(spec) = reply.command_spec() {
        out.command_spec = Some(SpecSummary {
            name: spec.name.clone(),
            description: spec.description.clone(),
            kind: Some("command".to_string()),
            format: Some(spec.language.clone()),
            path: Some(format!("/commands/{}", spec.name)),
        });
        let relation = match serde_json::to_value(spec) {
            Ok(spec_value) => Relation::new("Tool")
                .with_property("name", spec.name.clone())
                .with_property("spec", spec_value)
                .with_property("memory_session", session_id.clone())
                .with_property("agent", payload.agent.clone()),
            Err(e) => return Response::err(id, format!("failed to encode spec: {e}")),
        };
        match ctx.compiler.declare(relation, false).await {
            Ok(_) => {
                out.command_generated = true;
                let name = spec.name.clone();
                ctx.sessions.mutate(&session_id, move |s| s.command_generated = Some(name));
            }
            Err(e) => warn!(session = %session_id, error = %e, "command crystallization failed"),
        }
    }

    if let Some(spec) = reply.artifact_spec() {
        let filename = p42_engine::artifact_filename(&spec.name, &spec.format);
        let subtype = if spec.artifact_type.is_empty() { "misc" } else { &spec.artifact_type };
        out.artifact_spec = Some(SpecSummary {
            name: spec.name.clone(),
            description: spec.description.clone(),
            kind: Some(spec.artifact_type.clone()),
            format: Some(spec.format.clone()),
            path: Some(format!("/artifacts/{subtype}/{filename}")),
        });
        let relation = match serde_json::to_value(spec) {
            Ok(spec_value) => Relation::new("Artifact")
                .with_property("name", spec.name.clone())
                .with_property("spec", spec_value)
                .with_property("memory_session", session_id.clone())
                .with_property("agent", payload.agent.clone()),
            Err(e) => return Response::err(id, format!("failed to encode spec: {e}")),
        };
        match ctx.compiler.declare(relation, false).await {
            Ok(_) => out.artifact_generated = true,
            Err(e) => warn!(session = %session_id, error = %e, "artifact crystallization failed"),
        }
    }

    match serde_json::to_value(out) {
        Ok(data) => Response::ok(id, data),
        Err(e) => Response::err(id, format!("failed to encode reply: {e}")),
    }
}

fn build_system_prompt<C: Clock>(ctx: &ListenCtx<C>, payload: &PossessPayload) -> String {
    let mut system = ctx.agents.system_prompt(&payload.agent);
    for context_id in &payload.memory_context {
        let Some(session) = ctx.sessions.snapshot(context_id) else {
            warn!(session = %context_id, "memory context session not found");
            continue;
        };
        system.push_str(&format!("\n\nEarlier conversation ({context_id}):\n"));
        let tail = session.messages.len().saturating_sub(MEMORY_CONTEXT_MESSAGES);
        for message in &session.messages[tail..] {
            system.push_str(&format!("{}: {}\n", message.role, message.content));
        }
    }
    system
}

fn chat_history(session: &Session) -> Vec<ChatMessage> {
    session
        .messages
        .iter()
        .map(|m| ChatMessage {
            role: match m.role {
                Role::User => ChatRole::User,
                Role::Assistant => ChatRole::Assistant,
            },
            content: m.content.clone(),
        })
        .collect()
}

pub(crate) fn handle_memory<C: Clock>(
    id: &str,
    payload: MemoryPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    match payload.session_id {
        Some(session_id) => match ctx.sessions.snapshot(&session_id) {
            Some(session) => match serde_json::to_value(&session) {
                Ok(data) => Response::ok(id, data),
                Err(e) => Response::err(id, format!("failed to encode session: {e}")),
            },
            None => Response::err(id, format!("not found: session {session_id}")),
        },
        None => {
            let reply = MemoryReply {
                sessions: ctx.sessions.all_summaries().into_iter().map(to_summary_entry).collect(),
            };
            match serde_json::to_value(reply) {
                Ok(data) => Response::ok(id, data),
                Err(e) => Response::err(id, format!("failed to encode sessions: {e}")),
            }
        }
    }
}

pub(crate) fn handle_end<C: Clock>(
    id: &str,
    payload: EndPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    match ctx.sessions.complete(&payload.session_id) {
        Some(session) => Response::ok(
            id,
            json!({ "session_id": session.id, "state": session.state.to_string() }),
        ),
        None => Response::err(id, format!("not found: session {}", payload.session_id)),
    }
}

pub(crate) async fn handle_create_memory<C: Clock>(
    id: &str,
    payload: CreateMemoryPayload,
    ctx: &ListenCtx<C>,
) -> Response {
    if payload.agent.is_empty() {
        return Response::err(id, "create_memory requires an agent");
    }
    let (session_id, _) = ctx.sessions.get_or_create(None, &payload.agent);
    if let Some(message) = payload.initial_message.as_deref() {
        ctx.sessions.append_message(&session_id, Role::User, message);
    }

    // Persist eagerly so the three virtual paths exist before the reply.
    let Some(snapshot) = ctx.sessions.snapshot(&session_id) else {
        return Response::err(id, format!("not found: session {session_id}"));
    };
    if let Err(e) = ctx.sessions.persist(&snapshot) {
        return Response::err(id, format!("failed to persist session: {e}"));
    }
    ctx.sessions.flush().await;

    let reply = CreateMemoryReply { session_id, paths: session_paths(&snapshot) };
    match serde_json::to_value(reply) {
        Ok(data) => Response::ok(id, data),
        Err(e) => Response::err(id, format!("failed to encode reply: {e}")),
    }
}
