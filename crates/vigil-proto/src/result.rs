// SPDX-License-Identifier: Apache-2.0

//! Canonical execution results.
//!
//! Every handoff — executed, rejected, stale, duplicate, or failed — yields
//! exactly one `execution-result.v1`. Classifiable states are never thrown;
//! they are encoded in `status`/`reason_code` so the caller can retry
//! deterministically with an unchanged idempotency key.

use serde::{Deserialize, Serialize};

use crate::handoff::PreconditionSpec;

/// Type tag every result carries.
pub const RESULT_TYPE: &str = "execution-result.v1";

/// Schema version of the result payload.
pub const RESULT_SCHEMA_VERSION: i64 = 1;

/// Reason code: all checks passed and every authority command applied.
pub const REASON_EXECUTED: &str = "EXECUTED";
/// Reason code: a prior receipt matched `(handoff_id, idempotency_key)`.
pub const REASON_DUPLICATE_HANDOFF: &str = "DUPLICATE_HANDOFF";
/// Reason code: the projected decision epoch moved past the expected one.
pub const REASON_STALE_DECISION_EPOCH: &str = "STALE_DECISION_EPOCH";
/// Reason code: the projected snapshot hash no longer matches.
pub const REASON_STALE_SNAPSHOT: &str = "STALE_SNAPSHOT";
/// Reason code: a declared precondition failed.
pub const REASON_PRECONDITION_FAILED: &str = "PRECONDITION_FAILED";
/// Reason code: an authority command failed after zero or more commits.
pub const REASON_EXECUTION_FAILED: &str = "EXECUTION_FAILED";
/// Reason code: a pending marker was classified after a restart.
pub const REASON_INTERRUPTED_EXECUTION_RECOVERY: &str = "INTERRUPTED_EXECUTION_RECOVERY";
/// Reason code: advisory handoffs are rejected until dry-run semantics
/// are specified.
pub const REASON_ADVISORY_UNSUPPORTED: &str = "ADVISORY_UNSUPPORTED";

/// Terminal classification of a handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// All checks passed; every authority command applied.
    Executed,
    /// A precondition failed (or the handoff was advisory).
    Rejected,
    /// Snapshot or epoch freshness check failed.
    Stale,
    /// A prior receipt matched.
    Duplicate,
    /// Authority commands partially applied or recovery classified it.
    Failed,
}

/// The canonical result of executing a handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Always [`RESULT_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Always [`RESULT_SCHEMA_VERSION`].
    pub schema_version: i64,
    /// Execution id, equal to `result_id`, shaped `result_<64 hex>`.
    pub execution_id: String,
    /// Result id, equal to `execution_id`.
    pub result_id: String,
    /// Handoff id this result answers.
    pub handoff_id: String,
    /// Proposal id from the handoff.
    pub proposal_id: String,
    /// Idempotency key from the handoff.
    pub idempotency_key: String,
    /// Snapshot hash the proposer observed.
    pub snapshot_hash: String,
    /// Decision epoch the proposer observed.
    pub decision_epoch: i64,
    /// Acting actor id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Town concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town_id: Option<String>,
    /// Proposal type label.
    pub proposal_type: String,
    /// The advisory command as submitted.
    pub command: String,
    /// Authority commands the adapter derived, in execution order.
    pub authority_commands: Vec<String>,
    /// Terminal status.
    pub status: ExecutionStatus,
    /// Whether the handoff passed all checks.
    pub accepted: bool,
    /// Whether every authority command applied.
    pub executed: bool,
    /// Stable reason code for the terminal state.
    pub reason_code: String,
    /// Evaluation detail for each pipeline check.
    pub evaluation: Evaluation,
    /// Post-execution world fingerprints.
    pub world_state: WorldStateStamp,
}

/// Evaluation detail recorded on every result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Evaluation {
    /// Outcome per declared precondition.
    pub preconditions: Vec<PreconditionOutcome>,
    /// Freshness check detail.
    pub stale_check: StaleCheck,
    /// Duplicate check detail.
    pub duplicate_check: DuplicateCheck,
}

/// Outcome of one precondition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreconditionOutcome {
    /// The declared precondition.
    #[serde(flatten)]
    pub spec: PreconditionSpec,
    /// Whether the predicate held.
    pub passed: bool,
    /// Failure detail, when it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Freshness check detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaleCheck {
    /// Snapshot hash the handoff expected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_snapshot_hash: Option<String>,
    /// Snapshot hash actually projected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_snapshot_hash: Option<String>,
    /// Decision epoch the handoff expected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_decision_epoch: Option<i64>,
    /// Decision epoch actually projected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_decision_epoch: Option<i64>,
    /// Whether the handoff was stale.
    pub stale: bool,
}

/// Duplicate check detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuplicateCheck {
    /// Whether a prior receipt matched.
    pub duplicate: bool,
    /// Execution id of the matching receipt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
}

/// Post-execution world fingerprints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldStateStamp {
    /// Snapshot hash projected after the terminal state was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_execution_snapshot_hash: Option<String>,
    /// Decision epoch projected after the terminal state was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_execution_decision_epoch: Option<i64>,
}
