// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use crate::llm::{LlmError, Reply};

use super::{parse_reply, retryable};

#[test]
fn parses_plain_text_reply() {
    let json = json!({
        "content": [
            { "type": "text", "text": "The dolphins approve." }
        ]
    });
    let reply = parse_reply(&json).unwrap();
    assert!(matches!(reply, Reply::Message(ref m) if m == "The dolphins approve."));
}

#[test]
fn parses_command_tool_use_with_surrounding_text() {
    let json = json!({
        "content": [
            { "type": "text", "text": "Crystallizing that for you." },
            {
                "type": "tool_use",
                "name": "crystallize_command",
                "input": {
                    "name": "log-scan",
                    "description": "scan logs",
                    "language": "bash",
                    "implementation": "grep ERROR \"$1\""
                }
            }
        ]
    });
    let reply = parse_reply(&json).unwrap();
    let spec = reply.command_spec().unwrap();
    assert_eq!(spec.name, "log-scan");
    assert_eq!(spec.language, "bash");
    assert_eq!(reply.text(), "Crystallizing that for you.");
}

#[test]
fn parses_artifact_tool_use() {
    let json = json!({
        "content": [
            {
                "type": "tool_use",
                "name": "crystallize_artifact",
                "input": {
                    "name": "design-notes",
                    "type": "document",
                    "format": "markdown",
                    "content": "# Notes\n"
                }
            }
        ]
    });
    let reply = parse_reply(&json).unwrap();
    let spec = reply.artifact_spec().unwrap();
    assert_eq!(spec.name, "design-notes");
    assert_eq!(spec.format, "markdown");
}

#[test]
fn missing_content_is_malformed() {
    let err = parse_reply(&json!({ "id": "msg_1" })).unwrap_err();
    assert!(matches!(err, LlmError::Malformed(_)));
}

#[test]
fn tool_input_missing_required_field_is_malformed() {
    let json = json!({
        "content": [
            {
                "type": "tool_use",
                "name": "crystallize_command",
                "input": { "name": "half-baked" }
            }
        ]
    });
    assert!(matches!(parse_reply(&json).unwrap_err(), LlmError::Malformed(_)));
}

#[yare::parameterized(
    network     = { LlmError::Http("connection reset".into()), true },
    rate_limit  = { LlmError::Status(429), true },
    server      = { LlmError::Status(503), true },
    client      = { LlmError::Status(400), false },
    malformed   = { LlmError::Malformed("bad json".into()), false },
)]
fn retry_policy(error: LlmError, expected: bool) {
    assert_eq!(retryable(&error), expected);
}
