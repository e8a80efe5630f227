// SPDX-License-Identifier: Apache-2.0

//! Newline-delimited JSON framing.
//!
//! One JSON value per line. A line is a protocol frame iff its trimmed text
//! starts with `{` and carries a recognized `schemaVersion`/`type` tag; any
//! other line is not ours — the framing parser ignores it and the engine
//! treats it as interactive input. Malformed JSON that *looks* like a frame
//! is likewise ignored rather than rejected: this surface shares stdin with
//! a human.

use serde::Serialize;
use serde_json::Value;

use crate::handoff::{ExecutionHandoff, HANDOFF_SCHEMA_VERSION};
use crate::memory::{WorldMemoryRequest, MEMORY_REQUEST_TYPE};

/// A recognized inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// An execution handoff.
    Handoff(Box<ExecutionHandoff>),
    /// A world-memory retrieval request.
    MemoryRequest(WorldMemoryRequest),
}

/// Parse one input line into a frame, or `None` when the line is not a
/// recognized protocol frame.
#[must_use]
pub fn parse_line(line: &str) -> Option<InboundFrame> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    if value.get("schemaVersion").and_then(Value::as_str) == Some(HANDOFF_SCHEMA_VERSION) {
        return serde_json::from_value(value)
            .ok()
            .map(|h| InboundFrame::Handoff(Box::new(h)));
    }
    if value.get("type").and_then(Value::as_str) == Some(MEMORY_REQUEST_TYPE) {
        return serde_json::from_value(value).ok().map(InboundFrame::MemoryRequest);
    }
    None
}

/// Encode an outbound message as a single JSON line (no trailing newline).
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{parse_line, InboundFrame};
    use serde_json::json;

    #[test]
    fn non_json_lines_are_ignored() {
        assert_eq!(parse_line("mark add alpha 0 64 0"), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   exit"), None);
    }

    #[test]
    fn unknown_schema_is_ignored() {
        let line = json!({"schemaVersion": "something-else.v9"}).to_string();
        assert_eq!(parse_line(&line), None);
    }

    #[test]
    fn malformed_braced_line_is_ignored() {
        assert_eq!(parse_line("{ not json"), None);
    }

    #[test]
    fn handoff_frame_parses() {
        let line = json!({
            "schemaVersion": "execution-handoff.v1",
            "handoffId": "h1",
            "proposalId": "p1",
            "idempotencyKey": "k1",
            "snapshotHash": "00",
            "decisionEpoch": 1,
            "proposal": {"type": "GOD_COMMAND"},
            "command": "mark add alpha 0 64 0",
            "executionRequirements": {
                "expectedSnapshotHash": "00",
                "expectedDecisionEpoch": 1,
                "preconditions": []
            }
        })
        .to_string();
        match parse_line(&line) {
            Some(InboundFrame::Handoff(h)) => {
                assert_eq!(h.handoff_id, "h1");
                assert_eq!(h.execution_requirements.expected_decision_epoch, 1);
            }
            other => panic!("expected handoff, got {other:?}"),
        }
    }

    #[test]
    fn memory_request_frame_parses() {
        let line = json!({
            "type": "world-memory-request.v1",
            "scope": {"townId": "alpha", "chronicleLimit": 10}
        })
        .to_string();
        match parse_line(&line) {
            Some(InboundFrame::MemoryRequest(req)) => {
                assert_eq!(req.scope.town_id.as_deref(), Some("alpha"));
                assert_eq!(req.scope.chronicle_limit, Some(10));
            }
            other => panic!("expected memory request, got {other:?}"),
        }
    }
}
