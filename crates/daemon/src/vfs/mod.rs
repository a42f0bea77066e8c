// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The virtual filesystem: an overlay computed from metadata.
//!
//! The canonical map is "for every metadata record, its `paths` list";
//! resolution and listing reconstruct it by scanning. `/tools` is the
//! exception: it is a synthesized view over the relation store.

mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use p42_core::{vpath, Lifecycle, Metadata, ObjectType};
use p42_storage::{install_executable, remove_executable, RelationStore, Store, StoreError};
use p42_wire::{MetadataPatch, PathEntry, PathEntryKind};

/// Fixed top-level directories.
pub const ROOT_DIRS: [&str; 6] = ["tools", "memory", "artifacts", "by-date", "by-agent", "by-type"];

/// Secondary-path prefixes generated on store and never treated as the
/// canonical location of an object.
const DERIVED_PREFIXES: [&str; 3] = ["/by-date/", "/by-type/", "/by-agent/"];

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl VfsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::Store(e) if e.is_not_found())
    }
}

/// Output of a read: the bytes plus the record behind them, when the
/// path is metadata-backed rather than synthesized.
pub struct ReadOut {
    pub bytes: Vec<u8>,
    pub metadata: Option<Metadata>,
}

pub struct VirtualFs {
    store: Arc<Store>,
    relations: Arc<RelationStore>,
    commands_dir: PathBuf,
}

impl VirtualFs {
    pub fn new(store: Arc<Store>, relations: Arc<RelationStore>, commands_dir: PathBuf) -> Self {
        Self { store, relations, commands_dir }
    }

    /// Resolve a virtual path to the object behind it.
    pub fn resolve(&self, path: &str) -> Result<String, VfsError> {
        if !vpath::is_valid(path) {
            return Err(VfsError::InvalidPath(path.to_string()));
        }
        if path == "/tools" || path.starts_with("/tools/") {
            return tools::resolve(&self.relations, path);
        }
        for m in self.store.scan_metadata()? {
            if m.has_path(path) {
                return Ok(m.id);
            }
        }
        Err(VfsError::NotFound(path.to_string()))
    }

    /// List a virtual directory. `live_sessions` are merged into
    /// `/memory` entries.
    pub fn list(
        &self,
        path: &str,
        live_sessions: &[p42_storage::SessionIndexEntry],
    ) -> Result<Vec<PathEntry>, VfsError> {
        if !vpath::is_valid(path) {
            return Err(VfsError::InvalidPath(path.to_string()));
        }
        if path == "/" {
            return Ok(ROOT_DIRS
                .iter()
                .map(|name| PathEntry {
                    name: name.to_string(),
                    kind: PathEntryKind::Directory,
                    id: None,
                    size: None,
                    created: None,
                    modified: None,
                    content_type: None,
                    state: None,
                    agent: None,
                    message_count: None,
                })
                .collect());
        }
        if path == "/tools" || path.starts_with("/tools/") {
            return tools::list(&self.relations, &self.store, path);
        }

        // name → entry; a deeper path under the same name wins as a
        // directory, but file decorations stick.
        let mut entries: std::collections::BTreeMap<String, PathEntry> =
            std::collections::BTreeMap::new();
        for m in self.store.scan_metadata()? {
            for p in &m.paths {
                let Some((segment, has_more)) = vpath::child_of(p, path) else {
                    continue;
                };
                let entry = entries.entry(segment.to_string()).or_insert_with(|| PathEntry {
                    name: segment.to_string(),
                    kind: if has_more { PathEntryKind::Directory } else { PathEntryKind::File },
                    id: None,
                    size: None,
                    created: None,
                    modified: None,
                    content_type: None,
                    state: None,
                    agent: None,
                    message_count: None,
                });
                if has_more {
                    entry.kind = PathEntryKind::Directory;
                } else {
                    entry.id = Some(m.id.clone());
                    entry.size = Some(m.size);
                    entry.created = Some(m.created);
                    entry.modified = Some(m.modified);
                    entry.content_type = content_type(&m);
                }
            }
        }

        if path == "/memory" {
            for session in live_sessions {
                let entry = entries.entry(session.id.clone()).or_insert_with(|| PathEntry {
                    name: session.id.clone(),
                    kind: PathEntryKind::Session,
                    id: None,
                    size: None,
                    created: Some(session.created_at),
                    modified: Some(session.last_activity),
                    content_type: Some("application/json".to_string()),
                    state: None,
                    agent: None,
                    message_count: None,
                });
                entry.state = Some(session.state.to_string());
                entry.agent = Some(session.agent.clone());
                entry.message_count = Some(session.message_count);
            }
        }

        Ok(entries.into_values().collect())
    }

    /// Read the bytes behind a path. Bumps the record's access time.
    pub fn read(&self, path: &str, now: DateTime<Utc>) -> Result<ReadOut, VfsError> {
        if path == "/tools" || path.starts_with("/tools/") {
            return tools::read(&self.relations, &self.store, path);
        }
        let id = self.resolve(path)?;
        let metadata = self.store.load_metadata(&id, now)?;
        let bytes = self.store.read_object(&id)?;
        Ok(ReadOut { bytes, metadata: Some(metadata) })
    }

    /// Metadata behind a path, access time bumped.
    pub fn metadata(&self, path: &str, now: DateTime<Utc>) -> Result<Metadata, VfsError> {
        let id = self.resolve(path)?;
        Ok(self.store.load_metadata(&id, now)?)
    }

    /// Store bytes under a new virtual path. Infers the object type from
    /// the path shape, generates the secondary paths, and creates an
    /// executable entry for commands. Returns (id, paths, size).
    pub fn store_path(
        &self,
        path: &str,
        bytes: &[u8],
        patch: Option<&MetadataPatch>,
        now: DateTime<Utc>,
    ) -> Result<(String, Vec<String>, u64), VfsError> {
        if !vpath::is_valid(path) || path == "/" {
            return Err(VfsError::InvalidPath(path.to_string()));
        }
        if path == "/tools" || path.starts_with("/tools/") {
            return Err(VfsError::InvalidPath(format!("{path} is a synthesized view")));
        }

        let (object_type, inferred_subtype) = infer_type(path, patch);
        let base = vpath::base_name(path).unwrap_or("unnamed").to_string();

        let mut paths = vec![path.to_string()];
        if !is_derived(path) {
            paths.push(format!("/by-date/{}/{base}", now.format("%Y-%m-%d")));
            paths.push(format!("/by-type/{object_type}/{base}"));
            if let Some(agent) = patch.and_then(|p| p.agent.as_deref()) {
                paths.push(format!("/by-agent/{agent}/{}/{base}", agent_section(object_type)));
            }
            if object_type == ObjectType::Command {
                if let Some(session) = patch.and_then(|p| p.session.as_deref()) {
                    paths.push(format!("/memory/{session}/crystallized/{base}"));
                }
            }
        }
        self.store.release_paths(&paths, now)?;

        let mut m = Metadata::new(object_type);
        m.subtype = inferred_subtype;
        m.title = base.clone();
        apply_patch(&mut m, patch);
        if m.title.is_empty() {
            m.title = base.clone();
        }
        for p in &paths {
            m.add_path(p.clone());
        }

        let id = self.store.store_with_metadata(bytes, &mut m, now)?;
        if object_type == ObjectType::Command {
            let object_path = self.store.object_path(&id)?;
            install_executable(&self.commands_dir, &base, &object_path)?;
        }
        debug!(path, id = %id, "stored path");
        Ok((id, paths, bytes.len() as u64))
    }

    /// Replace content and/or mutate metadata fields. Content replacement
    /// rebinds the record to the new object id and rewrites command
    /// entries; identical content is a no-op at the object level.
    pub fn update_path(
        &self,
        path: &str,
        content: Option<&[u8]>,
        patch: Option<&MetadataPatch>,
        now: DateTime<Utc>,
    ) -> Result<(String, Vec<String>, u64), VfsError> {
        let old_id = self.resolve(path)?;
        let mut m = self.store.metadata().load_raw(&old_id)?;

        if let Some(bytes) = content {
            let new_id = self.store.objects().store(bytes)?;
            if new_id != old_id {
                // Rebind the record: same paths, new object.
                self.store.metadata().delete(&old_id)?;
                m.id = new_id.clone();
                m.size = bytes.len() as u64;
                let object_path = self.store.object_path(&new_id)?;
                for p in &m.paths {
                    if let Some(name) = p.strip_prefix("/commands/") {
                        install_executable(&self.commands_dir, name, &object_path)?;
                    }
                }
            }
        }

        apply_patch(&mut m, patch);
        self.store.metadata().save(&mut m, now)?;
        Ok((m.id.clone(), m.paths.clone(), m.size))
    }

    /// Remove one path from its record. Removing a canonical path also
    /// drops the derived views generated for it; the object itself stays
    /// on disk. A record left with no paths is marked deprecated.
    pub fn delete_path(&self, path: &str, now: DateTime<Utc>) -> Result<(), VfsError> {
        let id = self.resolve(path)?;
        let mut m = self.store.metadata().load_raw(&id)?;
        if !m.remove_path(path) {
            return Err(VfsError::NotFound(path.to_string()));
        }

        if !is_derived(path) {
            let base = vpath::base_name(path).unwrap_or_default().to_string();
            m.paths.retain(|p| {
                !(is_derived(p) && vpath::base_name(p) == Some(base.as_str()))
                    && !(p.starts_with("/memory/") && p.contains("/crystallized/")
                        && vpath::base_name(p) == Some(base.as_str()))
            });
            if m.paths.is_empty() {
                m.lifecycle = Lifecycle::Deprecated;
            }
        }
        self.store.metadata().save(&mut m, now)?;

        if let Some(name) = path.strip_prefix("/commands/") {
            remove_executable(&self.commands_dir, name)?;
        }
        debug!(path, id = %id, "deleted path");
        Ok(())
    }
}

/// Path-shape type inference, overridden by an explicit patch type.
fn infer_type(path: &str, patch: Option<&MetadataPatch>) -> (ObjectType, Option<String>) {
    if let Some(explicit) = patch.and_then(|p| p.object_type.as_deref()) {
        let t = ObjectType::parse(explicit);
        let subtype = patch.and_then(|p| p.subtype.clone()).or_else(|| artifact_subtype(path));
        return (t, subtype);
    }
    if path.starts_with("/commands/") {
        (ObjectType::Command, None)
    } else if path.starts_with("/artifacts/") {
        (ObjectType::Artifact, artifact_subtype(path))
    } else if path.starts_with("/memory/") {
        (ObjectType::Memory, None)
    } else {
        (ObjectType::File, None)
    }
}

fn artifact_subtype(path: &str) -> Option<String> {
    let segments = vpath::segments(path);
    if segments.first() == Some(&"artifacts") && segments.len() > 2 {
        Some(segments[1].to_string())
    } else {
        None
    }
}

fn is_derived(path: &str) -> bool {
    DERIVED_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Section under `/by-agent/<agent>/` for an object type.
fn agent_section(object_type: ObjectType) -> &'static str {
    match object_type {
        ObjectType::Command => "commands",
        ObjectType::Artifact | ObjectType::Document | ObjectType::Design | ObjectType::Media => {
            "artifacts"
        }
        ObjectType::Session | ObjectType::Memory => "memory",
        _ => "files",
    }
}

fn apply_patch(m: &mut Metadata, patch: Option<&MetadataPatch>) {
    let Some(patch) = patch else { return };
    if let Some(title) = &patch.title {
        m.title = title.clone();
    }
    if let Some(description) = &patch.description {
        m.description = description.clone();
    }
    if let Some(agent) = &patch.agent {
        m.agent = Some(agent.clone());
    }
    if let Some(session) = &patch.session {
        m.session = Some(session.clone());
        m.relationships.session = Some(session.clone());
    }
    if !patch.tags.is_empty() {
        m.tags = patch.tags.clone();
    }
    if let Some(lifecycle) = patch.lifecycle.as_deref().and_then(Lifecycle::parse) {
        m.lifecycle = lifecycle;
    }
    if let Some(importance) = patch.importance {
        m.importance = importance;
    }
    if let Some(summary) = &patch.summary {
        m.summary = summary.clone();
    }
}

/// Best-effort content type from the record shape.
fn content_type(m: &Metadata) -> Option<String> {
    let by_ext = m.paths.first().and_then(|p| {
        let name = vpath::base_name(p)?;
        let ext = name.rsplit_once('.')?.1;
        match ext {
            "md" => Some("text/markdown"),
            "html" => Some("text/html"),
            "json" => Some("application/json"),
            "txt" => Some("text/plain"),
            _ => None,
        }
    });
    match m.object_type {
        ObjectType::Command => Some("text/x-shellscript".to_string()),
        ObjectType::Session | ObjectType::Memory => Some("application/json".to_string()),
        _ => by_ext.map(str::to_string),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
