// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use std::sync::Arc;

use p42_adapters::FakeLlm;
use p42_core::{FakeClock, SeqIdGen};
use p42_storage::{RelationStore, Store};
use tempfile::TempDir;

use crate::{
    ArtifactMaterializer, MaterializeCtx, RealityCompiler, RuleEngine, ToolMaterializer,
    UrlArtifactMaterializer,
};

pub struct Harness {
    pub dir: TempDir,
    pub clock: FakeClock,
    pub llm: Arc<FakeLlm>,
    pub compiler: RealityCompiler<FakeClock>,
}

/// Full stack on a temp dir: all materializers, the standard rules, a
/// deterministic id generator, and a scripted LLM.
pub fn harness() -> Harness {
    harness_with_rules(RuleEngine::standard())
}

pub fn harness_with_rules(rules: RuleEngine) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let clock = FakeClock::at_epoch_ms(1_700_000_000_000);
    let llm: Arc<FakeLlm> = Arc::new(FakeLlm::new());

    let ctx = MaterializeCtx {
        store: Arc::new(Store::new(dir.path())),
        relations: Arc::new(RelationStore::new(dir.path())),
        commands_dir: dir.path().join("commands"),
        llm: llm.clone(),
    };
    let compiler = RealityCompiler::new(
        ctx,
        vec![
            Box::new(ToolMaterializer),
            Box::new(ArtifactMaterializer),
            Box::new(UrlArtifactMaterializer),
        ],
        rules,
        Box::new(SeqIdGen::new()),
        clock.clone(),
    );

    Harness { dir, clock, llm, compiler }
}
