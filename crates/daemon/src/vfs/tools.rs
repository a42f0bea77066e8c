// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `/tools` view: synthesized from the relation store, not from
//! metadata paths.
//!
//! ```text
//! /tools/<name>/{definition,executable,spawned,parents}
//! /tools/by-name/<name>/...
//! /tools/by-transform/<transform>/<name>
//! /tools/spawned-by/<tool>/<child>
//! /tools/ancestry/<name>          (read: the parent chain as text)
//! ```

use std::collections::BTreeSet;

use p42_core::{vpath, Relation};
use p42_storage::{RelationStore, Store};
use p42_wire::{PathEntry, PathEntryKind};

use super::{ReadOut, VfsError};

const VIEW_DIRS: [&str; 4] = ["by-name", "by-transform", "spawned-by", "ancestry"];

fn dir_entry(name: impl Into<String>) -> PathEntry {
    PathEntry {
        name: name.into(),
        kind: PathEntryKind::Directory,
        id: None,
        size: None,
        created: None,
        modified: None,
        content_type: None,
        state: None,
        agent: None,
        message_count: None,
    }
}

fn file_entry(name: impl Into<String>) -> PathEntry {
    PathEntry { kind: PathEntryKind::File, ..dir_entry(name) }
}

fn tools(relations: &RelationStore) -> Result<Vec<Relation>, VfsError> {
    Ok(relations.load_by_type("Tool")?)
}

fn find_tool(relations: &RelationStore, name: &str) -> Result<Relation, VfsError> {
    tools(relations)?
        .into_iter()
        .find(|r| r.name() == Some(name))
        .ok_or_else(|| VfsError::NotFound(format!("/tools/{name}")))
}

fn children_of<'a>(all: &'a [Relation], name: &str) -> Vec<&'a str> {
    let mut children: Vec<&str> = all
        .iter()
        .filter(|r| r.parent() == Some(name) || r.spawned_by() == Some(name))
        .filter_map(Relation::name)
        .collect();
    children.sort_unstable();
    children.dedup();
    children
}

/// Parent chain starting at `name`, cycle-guarded.
fn ancestry_chain(all: &[Relation], name: &str) -> Vec<String> {
    let mut chain = vec![name.to_string()];
    let mut current = name.to_string();
    while let Some(parent) = all
        .iter()
        .find(|r| r.name() == Some(current.as_str()))
        .and_then(|r| r.parent().or_else(|| r.spawned_by()))
    {
        if chain.iter().any(|seen| seen == parent) {
            break;
        }
        chain.push(parent.to_string());
        current = parent.to_string();
    }
    chain
}

/// Only `.../executable` resolves to an object id; every other view path
/// is synthesized.
pub(super) fn resolve(relations: &RelationStore, path: &str) -> Result<String, VfsError> {
    let segments = vpath::segments(path);
    let tool_name = match segments.as_slice() {
        ["tools", name, "executable"] => *name,
        ["tools", "by-name", name, "executable"] => *name,
        _ => return Err(VfsError::NotFound(format!("{path} is a synthesized view"))),
    };
    let relation = find_tool(relations, tool_name)?;
    relation
        .executable_id()
        .map(str::to_string)
        .ok_or_else(|| VfsError::NotFound(format!("{tool_name} has no executable yet")))
}

pub(super) fn list(
    relations: &RelationStore,
    store: &Store,
    path: &str,
) -> Result<Vec<PathEntry>, VfsError> {
    let all = tools(relations)?;
    let segments = vpath::segments(path);

    match segments.as_slice() {
        ["tools"] => {
            let mut entries: Vec<PathEntry> = VIEW_DIRS.iter().map(|d| dir_entry(*d)).collect();
            let mut names: Vec<&str> = all.iter().filter_map(Relation::name).collect();
            names.sort_unstable();
            names.dedup();
            entries.extend(names.into_iter().map(dir_entry));
            Ok(entries)
        }

        ["tools", "by-name"] => {
            let mut names: Vec<&str> = all.iter().filter_map(Relation::name).collect();
            names.sort_unstable();
            names.dedup();
            Ok(names.into_iter().map(dir_entry).collect())
        }

        ["tools", "by-transform"] => {
            let transforms: BTreeSet<String> =
                all.iter().flat_map(|r| r.transforms()).collect();
            Ok(transforms.into_iter().map(dir_entry).collect())
        }

        ["tools", "by-transform", transform] => {
            let mut names: Vec<&str> = all
                .iter()
                .filter(|r| r.transforms().iter().any(|t| t == transform))
                .filter_map(Relation::name)
                .collect();
            if names.is_empty() {
                return Err(VfsError::NotFound(path.to_string()));
            }
            names.sort_unstable();
            Ok(names.into_iter().map(dir_entry).collect())
        }

        ["tools", "spawned-by"] => {
            let parents: BTreeSet<&str> = all
                .iter()
                .filter_map(|r| r.spawned_by().or_else(|| r.parent()))
                .collect();
            Ok(parents.into_iter().map(dir_entry).collect())
        }

        ["tools", "spawned-by", tool] => {
            Ok(children_of(&all, tool).into_iter().map(dir_entry).collect())
        }

        ["tools", "ancestry"] => {
            let mut names: Vec<&str> = all
                .iter()
                .filter(|r| r.parent().is_some() || r.spawned_by().is_some())
                .filter_map(Relation::name)
                .collect();
            names.sort_unstable();
            Ok(names.into_iter().map(file_entry).collect())
        }

        ["tools", name] | ["tools", "by-name", name] => {
            let relation = find_tool(relations, name)?;
            let mut entries = vec![file_entry("definition")];
            if let Some(object_id) = relation.executable_id() {
                let mut executable = file_entry("executable");
                executable.id = Some(object_id.to_string());
                if let Ok(m) = store.metadata().load_raw(object_id) {
                    executable.size = Some(m.size);
                    executable.created = Some(m.created);
                    executable.modified = Some(m.modified);
                    executable.content_type = Some("text/x-shellscript".to_string());
                }
                entries.push(executable);
            }
            entries.push(dir_entry("spawned"));
            entries.push(dir_entry("parents"));
            Ok(entries)
        }

        ["tools", name, "spawned"] | ["tools", "by-name", name, "spawned"] => {
            find_tool(relations, name)?;
            Ok(children_of(&all, name).into_iter().map(dir_entry).collect())
        }

        ["tools", name, "parents"] | ["tools", "by-name", name, "parents"] => {
            find_tool(relations, name)?;
            let chain = ancestry_chain(&all, name);
            Ok(chain.into_iter().skip(1).map(dir_entry).collect())
        }

        _ => Err(VfsError::NotFound(path.to_string())),
    }
}

pub(super) fn read(
    relations: &RelationStore,
    store: &Store,
    path: &str,
) -> Result<ReadOut, VfsError> {
    let segments = vpath::segments(path);
    match segments.as_slice() {
        ["tools", name, "definition"] | ["tools", "by-name", name, "definition"] => {
            let relation = find_tool(relations, name)?;
            let bytes = serde_json::to_vec_pretty(&relation)
                .map_err(p42_storage::StoreError::from)?;
            Ok(ReadOut { bytes, metadata: None })
        }

        ["tools", name, "executable"] | ["tools", "by-name", name, "executable"] => {
            let relation = find_tool(relations, name)?;
            let object_id = relation
                .executable_id()
                .ok_or_else(|| VfsError::NotFound(format!("{name} has no executable yet")))?;
            let bytes = store.read_object(object_id)?;
            let metadata = store.metadata().load_raw(object_id).ok();
            Ok(ReadOut { bytes, metadata })
        }

        ["tools", "ancestry", name] => {
            let all = tools(relations)?;
            if !all.iter().any(|r| r.name() == Some(*name)) {
                return Err(VfsError::NotFound(path.to_string()));
            }
            let chain = ancestry_chain(&all, name).join(" <- ");
            Ok(ReadOut { bytes: format!("{chain}\n").into_bytes(), metadata: None })
        }

        _ => Err(VfsError::NotFound(format!("{path} is not readable"))),
    }
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
