// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative relations and their materialization records.
//!
//! A `Relation` says what should exist; a `MaterializedEntity` records what
//! the Reality Compiler actually made of it. They are kept separate so the
//! declarative state stays stable under rematerialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known property keys.
pub mod prop {
    pub const NAME: &str = "name";
    pub const TRANSFORMS: &str = "transforms";
    pub const PARENT: &str = "parent";
    pub const SPAWNED_BY: &str = "spawned_by";
    pub const AUTO_SPAWNED: &str = "auto_spawned";
    pub const MEMORY_SESSION: &str = "memory_session";
    pub const EXECUTABLE_ID: &str = "executable_id";
    pub const RESOLVED_CONTEXT: &str = "resolved_context";
    pub const USER_PROMPT: &str = "user_prompt";
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// A declarative entity: type plus free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

impl Relation {
    pub fn new(relation_type: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            relation_type: relation_type.into(),
            properties: Map::new(),
            created_at: epoch(),
            updated_at: epoch(),
        }
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.property_str(prop::NAME)
    }

    /// The `transforms` list, tolerating a single string as well as an array.
    pub fn transforms(&self) -> Vec<String> {
        match self.properties.get(prop::TRANSFORMS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<&str> {
        self.property_str(prop::PARENT)
    }

    pub fn spawned_by(&self) -> Option<&str> {
        self.property_str(prop::SPAWNED_BY)
    }

    /// Relations produced by rules carry this flag; rule predicates
    /// short-circuit on it, which is the recursion cutoff.
    pub fn auto_spawned(&self) -> bool {
        matches!(self.properties.get(prop::AUTO_SPAWNED), Some(Value::Bool(true)))
    }

    pub fn memory_session(&self) -> Option<&str> {
        self.property_str(prop::MEMORY_SESSION)
    }

    pub fn executable_id(&self) -> Option<&str> {
        self.property_str(prop::EXECUTABLE_ID)
    }

    /// Case-insensitive keyword check over name, transforms, and description.
    pub fn mentions(&self, keyword: &str) -> bool {
        let kw = keyword.to_lowercase();
        if self.name().is_some_and(|n| n.to_lowercase().contains(&kw)) {
            return true;
        }
        if self.transforms().iter().any(|t| t.to_lowercase().contains(&kw)) {
            return true;
        }
        self.property_str("description")
            .is_some_and(|d| d.to_lowercase().contains(&kw))
    }
}

/// Outcome of a materialization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaterializeStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

crate::simple_display! {
    MaterializeStatus {
        Pending => "pending",
        Success => "success",
        Failed => "failed",
    }
}

/// Links a relation to its concrete manifestation on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedEntity {
    pub relation_id: String,
    pub physical_path: std::path::PathBuf,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub status: MaterializeStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "relation_tests.rs"]
mod tests;
