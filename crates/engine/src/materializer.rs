// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The materializer contract.
//!
//! Materializers are capability sets, not a hierarchy: the compiler walks
//! an ordered registry and dispatches to the first one whose
//! `can_materialize` accepts the relation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use p42_adapters::LlmAdapter;
use p42_core::{MaterializedEntity, Relation};
use p42_storage::{RelationStore, Store};

use crate::compiler::CompileError;

/// Shared handles every materializer works through. The daemon owns the
/// stores; materializers only borrow this context per call.
pub struct MaterializeCtx {
    pub store: Arc<Store>,
    pub relations: Arc<RelationStore>,
    /// Directory for executable command entries.
    pub commands_dir: PathBuf,
    pub llm: Arc<dyn LlmAdapter>,
}

#[async_trait]
pub trait Materializer: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_materialize(&self, relation: &Relation) -> bool;

    /// Turn the relation into concrete content. May write properties back
    /// into `relation` (e.g. `executable_id`); the compiler persists the
    /// updated relation after this returns.
    async fn materialize(
        &self,
        relation: &mut Relation,
        ctx: &MaterializeCtx,
        now: DateTime<Utc>,
    ) -> Result<MaterializedEntity, CompileError>;

    /// Undo the concrete side of a materialization. Objects are never
    /// deleted; only executable entries and virtual paths go away.
    fn dematerialize(
        &self,
        entity: &MaterializedEntity,
        ctx: &MaterializeCtx,
        now: DateTime<Utc>,
    ) -> Result<(), CompileError>;
}

/// Format a date segment for `/by-date/...` paths.
pub(crate) fn date_segment(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Release the given virtual paths from older records, then return them
/// for the new record. Keeps the one-object-per-path invariant across
/// regeneration.
pub(crate) fn claim_paths(
    ctx: &MaterializeCtx,
    paths: &[String],
    now: DateTime<Utc>,
) -> Result<(), CompileError> {
    ctx.store.release_paths(paths, now)?;
    Ok(())
}
