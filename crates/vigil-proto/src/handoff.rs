// SPDX-License-Identifier: Apache-2.0

//! Execution handoffs: pre-baked mutation proposals submitted by callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema tag every valid handoff carries.
pub const HANDOFF_SCHEMA_VERSION: &str = "execution-handoff.v1";

/// An externally submitted proposal: an advisory command plus the freshness
/// and idempotency metadata the adapter needs to execute it at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHandoff {
    /// Must equal [`HANDOFF_SCHEMA_VERSION`].
    pub schema_version: String,
    /// Unique id of this handoff.
    pub handoff_id: String,
    /// Id of the proposal the handoff was baked from.
    pub proposal_id: String,
    /// Idempotency key; `(handoff_id, idempotency_key)` addresses receipts.
    pub idempotency_key: String,
    /// Snapshot fingerprint the proposer observed.
    pub snapshot_hash: String,
    /// Decision epoch the proposer observed.
    pub decision_epoch: i64,
    /// The proposal body.
    pub proposal: Proposal,
    /// The advisory command text.
    pub command: String,
    /// Freshness and precondition requirements.
    pub execution_requirements: ExecutionRequirements,
}

/// The proposal body carried inside a handoff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Proposal {
    /// Proposal type label (e.g. `PROJECT_ADVANCE`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Acting actor id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Town concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town_id: Option<String>,
    /// Target record id, if the proposal names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Advisory flag. Advisory handoffs are rejected at the adapter
    /// boundary until dry-run semantics are specified.
    pub advisory: bool,
    /// Caller-specific fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Freshness and precondition requirements of a handoff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionRequirements {
    /// Snapshot hash the world must still have.
    pub expected_snapshot_hash: String,
    /// Decision epoch the world must still be in.
    pub expected_decision_epoch: i64,
    /// Preconditions evaluated against the projected world.
    pub preconditions: Vec<PreconditionSpec>,
}

/// One declared precondition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreconditionSpec {
    /// Predicate kind (e.g. `project_exists`).
    pub kind: String,
    /// Target record id, when the predicate takes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Expected value, when the predicate compares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}
