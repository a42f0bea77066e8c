// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for daemon communication.
//!
//! Wire format: one newline-terminated JSON envelope per request, and one
//! per response. Binary content travels base64-encoded inside payloads.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod envelope;
mod payload;
mod wire;

pub use envelope::{Request, RequestKind, Response};
pub use payload::{
    decode_content, encode_content, CreateMemoryPayload, CreateMemoryReply, DeclareRelationPayload,
    DeletePathPayload, DeleteRelationPayload, EndPayload, GetMetadataPayload, GetRelationPayload,
    ListPathPayload, ListRelationsPayload, MemoryPayload, MemoryReply, PathEntry, PathEntryKind,
    PossessPayload, PossessReply, ReadPathPayload, ReadPathReply, SearchFiltersPayload,
    SearchPayload, SearchReply, SearchResultEntry, SessionSummaryEntry, SpecSummary, StatusReply,
    StorePathPayload, StorePathReply, UpdatePathPayload, MetadataPatch,
};
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError, RESPONSE_WARN_BYTES,
};
