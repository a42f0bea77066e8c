// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Reality Compiler: declare → persist → materialize → record → rules.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use p42_core::{relation_slug, Clock, IdGen, MaterializedEntity, Relation};
use p42_storage::StoreError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::materializer::{MaterializeCtx, Materializer};
use crate::rules::RuleEngine;

/// Errors from declaration and materialization.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no materializer for relation type '{0}'")]
    NoMaterializer(String),

    #[error("relation '{0}' already exists")]
    Conflict(String),

    #[error("invalid relation: {0}")]
    InvalidRelation(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CompileError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

pub struct RealityCompiler<C: Clock> {
    ctx: MaterializeCtx,
    registry: Vec<Box<dyn Materializer>>,
    rules: RuleEngine,
    idgen: Box<dyn IdGen>,
    clock: C,
}

impl<C: Clock> RealityCompiler<C> {
    pub fn new(
        ctx: MaterializeCtx,
        registry: Vec<Box<dyn Materializer>>,
        rules: RuleEngine,
        idgen: Box<dyn IdGen>,
        clock: C,
    ) -> Self {
        Self { ctx, registry, rules, idgen, clock }
    }

    pub fn ctx(&self) -> &MaterializeCtx {
        &self.ctx
    }

    /// Declare a relation and materialize it. Rule-engine failures are
    /// logged, never surfaced: the declaration already succeeded.
    pub async fn declare(
        &self,
        relation: Relation,
        replace: bool,
    ) -> Result<(Relation, MaterializedEntity), CompileError> {
        let mut relation = relation;
        let entity = self.declare_one(&mut relation, replace).await?;

        if let Err(failures) = self.run_rules(&relation).await {
            warn!(relation = %relation.id, "rule failures: {failures}");
        }
        Ok((relation, entity))
    }

    pub fn get(&self, id: &str) -> Result<Relation, CompileError> {
        Ok(self.ctx.relations.load(id)?)
    }

    pub fn list(&self) -> Result<Vec<Relation>, CompileError> {
        Ok(self.ctx.relations.list()?)
    }

    pub fn list_by_type(&self, relation_type: &str) -> Result<Vec<Relation>, CompileError> {
        Ok(self.ctx.relations.load_by_type(relation_type)?)
    }

    /// Delete a relation, dematerializing it first. Does not cascade to
    /// auto-spawned children; their parent edges dangle harmlessly.
    pub fn delete(&self, id: &str) -> Result<(), CompileError> {
        let relation = self.ctx.relations.load(id)?;
        match self.ctx.relations.load_materialized(id) {
            Ok(entity) => {
                if let Some(m) = self.registry.iter().find(|m| m.can_materialize(&relation)) {
                    m.dematerialize(&entity, &self.ctx, self.clock.now())?;
                }
                self.ctx.relations.delete_materialized(id)?;
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.ctx.relations.delete(id)?;
        info!(relation = id, "relation deleted");
        Ok(())
    }

    /// Steps 1–4 of a declaration: id assignment, conflict check,
    /// persistence, materialization, entity recording, write-back.
    async fn declare_one(
        &self,
        relation: &mut Relation,
        replace: bool,
    ) -> Result<MaterializedEntity, CompileError> {
        if relation.relation_type.is_empty() {
            return Err(CompileError::InvalidRelation("missing relation type".to_string()));
        }
        if relation.id.is_empty() {
            let name = relation.name().unwrap_or("unnamed");
            relation.id = relation_slug(&relation.relation_type, name, Some(self.idgen.as_ref()));
        }
        if !replace && self.ctx.relations.exists(&relation.id) {
            return Err(CompileError::Conflict(relation.id.clone()));
        }

        let now = self.clock.now();
        if relation.created_at == DateTime::<Utc>::UNIX_EPOCH {
            relation.created_at = now;
        }
        relation.updated_at = now;
        self.ctx.relations.save(relation)?;

        let materializer = self
            .registry
            .iter()
            .find(|m| m.can_materialize(relation))
            .ok_or_else(|| CompileError::NoMaterializer(relation.relation_type.clone()))?;

        debug!(relation = %relation.id, materializer = materializer.name(), "materializing");
        let entity = materializer.materialize(relation, &self.ctx, now).await?;
        self.ctx.relations.save_materialized(&entity)?;

        // The materializer may have written back properties such as
        // executable_id; persist them after materialization.
        relation.updated_at = self.clock.now();
        self.ctx.relations.save(relation)?;

        info!(relation = %relation.id, "relation materialized");
        Ok(entity)
    }

    /// Step 5: offer the relation (and everything it spawns) to the rule
    /// engine. Spawned ids are deterministic, so re-running on the same
    /// trigger is idempotent: an existing id is skipped, not re-declared.
    async fn run_rules(&self, root: &Relation) -> Result<(), RuleFailures> {
        let mut queue: VecDeque<(&'static str, Relation)> =
            self.rules.evaluate(root).into_iter().collect();
        let mut failures = Vec::new();

        while let Some((rule_name, mut spawned)) = queue.pop_front() {
            if self.ctx.relations.exists(&spawned.id) {
                debug!(rule = rule_name, spawned = %spawned.id, "already spawned, skipping");
                continue;
            }
            match self.declare_one(&mut spawned, false).await {
                Ok(_) => {
                    info!(rule = rule_name, spawned = %spawned.id, "rule spawned relation");
                    for next in self.rules.evaluate(&spawned) {
                        queue.push_back(next);
                    }
                }
                Err(CompileError::Conflict(id)) => {
                    debug!(rule = rule_name, spawned = %id, "spawn raced an existing relation");
                }
                Err(e) => failures.push((rule_name, e.to_string())),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RuleFailures(failures))
        }
    }
}

/// Composite of individual rule-action failures. Logged by the compiler,
/// never returned to the declaring client.
pub struct RuleFailures(Vec<(&'static str, String)>);

impl std::fmt::Display for RuleFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (rule, error)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{rule}: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
