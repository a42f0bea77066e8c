// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for listener tests: a full handler context on a temp
//! directory with a scripted LLM and deterministic clock/ids.

use std::sync::Arc;
use std::time::Instant;

use p42_adapters::FakeLlm;
use p42_core::{FakeClock, SeqIdGen};
use p42_engine::{
    ArtifactMaterializer, MaterializeCtx, RealityCompiler, RuleEngine, ToolMaterializer,
    UrlArtifactMaterializer,
};
use p42_storage::{RelationStore, SessionIndex, Store};
use p42_wire::{Request, RequestKind};
use serde_json::Value;
use tempfile::TempDir;

use crate::agents::AgentRegistry;
use crate::sessions::SessionManager;
use crate::vfs::VirtualFs;

use super::ListenCtx;

pub(crate) struct TestCtx {
    pub dir: TempDir,
    pub clock: FakeClock,
    pub llm: Arc<FakeLlm>,
    pub ctx: ListenCtx<FakeClock>,
}

pub(crate) fn test_ctx() -> TestCtx {
    let dir = tempfile::tempdir().expect("tempdir");
    let clock = FakeClock::at_epoch_ms(1_700_000_000_000);
    let llm: Arc<FakeLlm> = Arc::new(FakeLlm::new());

    let store = Arc::new(Store::new(dir.path()));
    let relations = Arc::new(RelationStore::new(dir.path()));
    let index = Arc::new(SessionIndex::open(dir.path()).expect("index"));
    let commands_dir = dir.path().join("commands");

    let compiler = RealityCompiler::new(
        MaterializeCtx {
            store: Arc::clone(&store),
            relations: Arc::clone(&relations),
            commands_dir: commands_dir.clone(),
            llm: llm.clone(),
        },
        vec![
            Box::new(ToolMaterializer),
            Box::new(ArtifactMaterializer),
            Box::new(UrlArtifactMaterializer),
        ],
        RuleEngine::standard(),
        Box::new(SeqIdGen::new()),
        clock.clone(),
    );
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&store),
        Arc::clone(&index),
        clock.clone(),
        p42_core::DEFAULT_IDLE_TIMEOUT_MS,
    ));
    let vfs = VirtualFs::new(Arc::clone(&store), Arc::clone(&relations), commands_dir);

    let ctx = ListenCtx {
        store,
        relations,
        compiler,
        vfs,
        sessions,
        agents: AgentRegistry::builtin(),
        llm: llm.clone(),
        clock: clock.clone(),
        start_time: Instant::now(),
    };
    TestCtx { dir, clock, llm, ctx }
}

/// Shorthand for building a request envelope.
pub(crate) fn request(kind: RequestKind, payload: Value) -> Request {
    Request::new(format!("req-{}", kind.as_str()), kind, payload)
}
