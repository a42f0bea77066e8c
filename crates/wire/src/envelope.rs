// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The request/response envelope.
//!
//! `type` is carried as a plain string so an unknown request type can be
//! answered with an error that still echoes the caller's `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request from a client to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Request {
    pub fn new(id: impl Into<String>, kind: RequestKind, payload: Value) -> Self {
        Self { id: id.into(), kind: kind.as_str().to_string(), payload }
    }

    /// The typed request kind, if recognized.
    pub fn parse_kind(&self) -> Option<RequestKind> {
        RequestKind::parse(&self.kind)
    }
}

/// The closed set of request types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Status,
    Possess,
    List,
    Memory,
    End,
    Ping,
    StorePath,
    UpdatePath,
    DeletePath,
    CreateMemory,
    ListPath,
    ReadPath,
    GetMetadata,
    Search,
    DeclareRelation,
    GetRelation,
    ListRelations,
    DeleteRelation,
}

impl RequestKind {
    pub const ALL: [RequestKind; 18] = [
        Self::Status,
        Self::Possess,
        Self::List,
        Self::Memory,
        Self::End,
        Self::Ping,
        Self::StorePath,
        Self::UpdatePath,
        Self::DeletePath,
        Self::CreateMemory,
        Self::ListPath,
        Self::ReadPath,
        Self::GetMetadata,
        Self::Search,
        Self::DeclareRelation,
        Self::GetRelation,
        Self::ListRelations,
        Self::DeleteRelation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Possess => "possess",
            Self::List => "list",
            Self::Memory => "memory",
            Self::End => "end",
            Self::Ping => "ping",
            Self::StorePath => "store_path",
            Self::UpdatePath => "update_path",
            Self::DeletePath => "delete_path",
            Self::CreateMemory => "create_memory",
            Self::ListPath => "list_path",
            Self::ReadPath => "read_path",
            Self::GetMetadata => "get_metadata",
            Self::Search => "search",
            Self::DeclareRelation => "declare_relation",
            Self::GetRelation => "get_relation",
            Self::ListRelations => "list_relations",
            Self::DeleteRelation => "delete_relation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response from the daemon. `error` is a single human-readable sentence,
/// absent on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(id: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), success: true, data: Some(data), error: None }
    }

    pub fn ok_empty(id: impl Into<String>) -> Self {
        Self { id: id.into(), success: true, data: None, error: None }
    }

    pub fn err(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { id: id.into(), success: false, data: None, error: Some(message.into()) }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
