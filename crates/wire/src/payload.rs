// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed payload bodies for each request kind, and the reply shapes the
//! daemon answers with.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use p42_core::Relation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Encode binary content for transport.
pub fn encode_content(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode transported content. Invalid base64 is an invalid-input error
/// at the protocol boundary.
pub fn decode_content(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(s)
}

fn root_path() -> String {
    "/".to_string()
}

// ── Sessions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PossessPayload {
    pub agent: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Session ids whose recent history is folded into the system prompt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memory_context: Vec<String>,
}

/// Spec objects in replies carry only the summary fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PossessReply {
    pub message: String,
    pub agent: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_spec: Option<SpecSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_spec: Option<SpecSummary>,
    #[serde(default)]
    pub command_generated: bool,
    #[serde(default)]
    pub artifact_generated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemoryPayload {
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemoryReply {
    pub session_id: String,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndPayload {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummaryEntry {
    pub id: String,
    pub agent: String,
    pub state: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryReply {
    pub sessions: Vec<SessionSummaryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReply {
    pub version: String,
    pub uptime_secs: u64,
    pub session_count: usize,
    pub sessions: Vec<SessionSummaryEntry>,
}

// ── Paths ────────────────────────────────────────────────────────────

/// Caller-supplied metadata fields for store/update operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorePathPayload {
    pub path: String,
    /// Base64-encoded bytes.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataPatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorePathReply {
    pub id: String,
    pub paths: Vec<String>,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePathPayload {
    pub path: String,
    /// Base64-encoded replacement bytes, when the content changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_updates: Option<MetadataPatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePathPayload {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPathPayload {
    #[serde(default = "root_path")]
    pub path: String,
}

impl Default for ListPathPayload {
    fn default() -> Self {
        Self { path: root_path() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathEntryKind {
    Directory,
    File,
    Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PathEntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    // Session decorations for /memory listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadPathPayload {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadPathReply {
    /// Base64-encoded bytes.
    pub content: String,
    pub size: u64,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMetadataPayload {
    pub path: String,
}

// ── Search ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFiltersPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPayload {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: SearchFiltersPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultEntry {
    pub id: String,
    pub path: String,
    pub title: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub score: f64,
    pub match_fields: Vec<String>,
    pub snippet: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReply {
    pub query: String,
    pub filters: SearchFiltersPayload,
    pub results: Vec<SearchResultEntry>,
    pub count: usize,
}

// ── Relations ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclareRelationPayload {
    pub relation: Relation,
    /// Opt into replacing an existing relation with the same id.
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRelationPayload {
    pub relation_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRelationsPayload {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRelationPayload {
    pub relation_id: String,
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
