// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object metadata: the JSON sidecar stored next to every object.
//!
//! The `paths` list inside each record is the authoritative source of the
//! virtual filesystem. There is no separate forward index to drift out of
//! sync; the VFS reconstructs the path → object map by scanning records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of thing an object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Command,
    Artifact,
    Document,
    Code,
    Design,
    Media,
    Session,
    Memory,
    #[default]
    File,
}

crate::simple_display! {
    ObjectType {
        Command => "command",
        Artifact => "artifact",
        Document => "document",
        Code => "code",
        Design => "design",
        Media => "media",
        Session => "session",
        Memory => "memory",
        File => "file",
    }
}

impl ObjectType {
    /// Parse the lowercase wire form.
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "command" => Some(Self::Command),
            "artifact" => Some(Self::Artifact),
            "document" => Some(Self::Document),
            "code" => Some(Self::Code),
            "design" => Some(Self::Design),
            "media" => Some(Self::Media),
            "session" => Some(Self::Session),
            "memory" => Some(Self::Memory),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    /// Parse, with unknown strings falling back to `File`.
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or(Self::File)
    }
}

/// Lifecycle stage of an object's metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Draft,
    Active,
    Stable,
    Archived,
    Deprecated,
}

crate::simple_display! {
    Lifecycle {
        Draft => "draft",
        Active => "active",
        Stable => "stable",
        Archived => "archived",
        Deprecated => "deprecated",
    }
}

impl Lifecycle {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "stable" => Some(Self::Stable),
            "archived" => Some(Self::Archived),
            "deprecated" => Some(Self::Deprecated),
            _ => None,
        }
    }
}

/// Graph edges from one object to its neighbors. All edges are ids;
/// objects are never embedded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn default_importance() -> f64 {
    0.5
}

/// One JSON sidecar per object id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub object_type: ObjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default)]
    pub size: u64,

    #[serde(default = "epoch")]
    pub created: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub modified: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub accessed: DateTime<Utc>,

    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default = "default_importance")]
    pub importance: f64,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub summary: String,

    /// Virtual paths this object is visible under. Every entry is absolute
    /// (`/`-prefixed) and belongs to exactly one object at a time.
    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub relationships: Relationships,
}

impl Metadata {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            id: String::new(),
            object_type,
            subtype: None,
            size: 0,
            created: epoch(),
            modified: epoch(),
            accessed: epoch(),
            title: String::new(),
            description: String::new(),
            tags: Vec::new(),
            session: None,
            agent: None,
            lifecycle: Lifecycle::default(),
            importance: default_importance(),
            usage_count: 0,
            summary: String::new(),
            paths: Vec::new(),
            relationships: Relationships::default(),
        }
    }

    /// Whether `created` has been filled in yet.
    pub fn has_created(&self) -> bool {
        self.created != epoch()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Add a virtual path, keeping the list duplicate-free.
    pub fn add_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.has_path(&path) {
            self.paths.push(path);
        }
    }

    /// Remove a path. Returns true if it was present. When the last path
    /// goes, the record is promoted to deprecated (the object itself stays).
    pub fn remove_path(&mut self, path: &str) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        let removed = self.paths.len() != before;
        if removed && self.paths.is_empty() {
            self.lifecycle = Lifecycle::Deprecated;
        }
        removed
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
