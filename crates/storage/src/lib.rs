// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! p42-storage: the consciousness store.
//!
//! Content-addressed objects, per-object metadata sidecars, relation
//! records, the session index, executable command entries, and search.
//! Everything lives under one configured root:
//!
//! ```text
//! objects/<aa>/<bb>/<rest>          content-addressed blobs
//! metadata/<id>.json                sidecar per object
//! relations/relation-<id>.json      declarative entities
//! relations/materialized-<rid>.json materialization links
//! commands/<name>                   executable entries for tools
//! session-index.json                quick session lookup
//! ```

mod commands;
mod fsutil;
mod metadata;
mod objects;
mod relations;
mod search;
mod session_index;
mod store;

pub use commands::{install_executable, remove_executable};
pub use fsutil::write_atomic;
pub use metadata::MetadataStore;
pub use objects::ObjectStore;
pub use relations::RelationStore;
pub use search::{search, SearchFilters, SearchHit, DEFAULT_SEARCH_LIMIT};
pub use session_index::{SessionIndex, SessionIndexEntry};
pub use store::Store;

use thiserror::Error;

/// Errors from any of the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
