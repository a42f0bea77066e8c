// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Search over the metadata store, with a content fallback for small
//! objects.
//!
//! Scoring is a weighted sum of lowercased substring hits: description
//! 3.0, title 2.5, any tag 2.0, session/agent 1.5, any path 0.5, with a
//! recency multiplier (×1.2 under a day, ×1.1 under a week). Objects with
//! no metadata hit get one chance at a content match, ranked below
//! metadata hits.

use chrono::{DateTime, Duration, Utc};
use p42_core::{Metadata, ObjectType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Store, StoreError};

/// Objects larger than this are never content-scanned.
const CONTENT_SCAN_MAX_BYTES: u64 = 100 * 1024;

/// Content matches rank below metadata matches.
const CONTENT_SCORE_FACTOR: f64 = 0.8;

/// Default result cap.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Optional narrowing, all conjunctive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<ObjectType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    /// Case-insensitive; a leading `@` is optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl SearchFilters {
    fn accepts(&self, m: &Metadata) -> bool {
        if let Some(prefix) = &self.path_prefix {
            if !m.paths.iter().any(|p| p.starts_with(prefix.as_str())) {
                return false;
            }
        }
        if let Some(t) = self.object_type {
            if m.object_type != t {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if m.created <= after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if m.created >= before {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            let want = agent.trim_start_matches('@').to_lowercase();
            let got = m.agent.as_deref().map(|a| a.trim_start_matches('@').to_lowercase());
            if got.as_deref() != Some(want.as_str()) {
                return false;
            }
        }
        self.tags.iter().all(|t| m.tags.iter().any(|have| have.eq_ignore_ascii_case(t)))
    }
}

/// One ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Primary virtual path (first in the record), if any.
    pub path: String,
    pub title: String,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub score: f64,
    pub match_fields: Vec<String>,
    pub snippet: String,
    pub created: DateTime<Utc>,
}

/// Search the store. An empty query matches everything at base score 1.0,
/// subject to filters.
pub fn search(
    store: &Store,
    query: &str,
    filters: &SearchFilters,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<SearchHit>, StoreError> {
    let needle = query.trim().to_lowercase();
    let mut hits = Vec::new();

    for m in store.scan_metadata()? {
        if !filters.accepts(&m) {
            continue;
        }

        let hit = if needle.is_empty() {
            Some((1.0, Vec::new(), String::new()))
        } else {
            score_metadata(&m, &needle)
                .or_else(|| score_content(store, &m, &needle))
        };

        let Some((base, match_fields, snippet)) = hit else {
            continue;
        };

        let score = base * recency_multiplier(m.created, now);
        hits.push(SearchHit {
            id: m.id.clone(),
            path: m.paths.first().cloned().unwrap_or_default(),
            title: m.title.clone(),
            object_type: m.object_type,
            score,
            match_fields,
            snippet,
            created: m.created,
        });
    }

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.created.cmp(&a.created))
    });
    hits.truncate(if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit });
    Ok(hits)
}

/// Weighted metadata hit, or None when nothing matched.
fn score_metadata(m: &Metadata, needle: &str) -> Option<(f64, Vec<String>, String)> {
    let mut score = 0.0;
    let mut fields = Vec::new();
    let mut snippet_source: Option<&str> = None;

    if m.description.to_lowercase().contains(needle) {
        score += 3.0;
        fields.push("description".to_string());
        snippet_source = Some(&m.description);
    }
    if m.title.to_lowercase().contains(needle) {
        score += 2.5;
        fields.push("title".to_string());
        snippet_source.get_or_insert(&m.title);
    }
    if m.tags.iter().any(|t| t.to_lowercase().contains(needle)) {
        score += 2.0;
        fields.push("tags".to_string());
    }
    let session_hit = m.session.as_deref().is_some_and(|s| s.to_lowercase().contains(needle));
    let agent_hit = m.agent.as_deref().is_some_and(|a| a.to_lowercase().contains(needle));
    if session_hit || agent_hit {
        score += 1.5;
        fields.push(if session_hit { "session" } else { "agent" }.to_string());
    }
    if m.paths.iter().any(|p| p.to_lowercase().contains(needle)) {
        score += 0.5;
        fields.push("path".to_string());
    }

    if score == 0.0 {
        return None;
    }
    let snippet = snippet_source.map(|text| extract_snippet(text, needle)).unwrap_or_default();
    Some((score, fields, snippet))
}

/// Content fallback for small objects: base 1.0 plus 0.2 per occurrence
/// (capped at 5), discounted below metadata matches.
fn score_content(store: &Store, m: &Metadata, needle: &str) -> Option<(f64, Vec<String>, String)> {
    if m.size >= CONTENT_SCAN_MAX_BYTES || m.id.is_empty() {
        return None;
    }
    let bytes = match store.read_object(&m.id) {
        Ok(b) => b,
        Err(e) => {
            debug!(id = %m.id, error = %e, "skipping content scan");
            return None;
        }
    };
    let text = String::from_utf8_lossy(&bytes);
    let lowered = text.to_lowercase();
    let occurrences = lowered.matches(needle).take(5).count();
    if occurrences == 0 {
        return None;
    }
    let score = (1.0 + 0.2 * occurrences as f64) * CONTENT_SCORE_FACTOR;
    Some((score, vec!["content".to_string()], extract_snippet(&text, needle)))
}

fn recency_multiplier(created: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age = now.signed_duration_since(created);
    if age < Duration::hours(24) {
        1.2
    } else if age < Duration::days(7) {
        1.1
    } else {
        1.0
    }
}

/// A window of roughly 80 characters centered on the first match.
fn extract_snippet(text: &str, needle: &str) -> String {
    const WINDOW: usize = 80;
    let lowered = text.to_lowercase();
    let Some(pos) = lowered.find(needle) else {
        return text.chars().take(WINDOW).collect();
    };

    let chars: Vec<char> = text.chars().collect();
    // Byte offset → char offset for the centering math.
    let char_pos = text[..pos].chars().count();
    let half = WINDOW / 2;
    let start = char_pos.saturating_sub(half);
    let end = (start + WINDOW).min(chars.len());

    let mut snippet: String = chars[start..end].iter().collect();
    if start > 0 {
        snippet = format!("…{snippet}");
    }
    if end < chars.len() {
        snippet.push('…');
    }
    snippet
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
