// SPDX-License-Identifier: Apache-2.0

//! World-memory context: the bounded read-only retrieval surface.

use serde::{Deserialize, Serialize};
use vigil_world::doc::ChronicleRecord;

use crate::result::ExecutionResult;

/// Type tag of a retrieval request.
pub const MEMORY_REQUEST_TYPE: &str = "world-memory-request.v1";

/// Type tag of a retrieval response.
pub const MEMORY_CONTEXT_TYPE: &str = "world-memory-context.v1";

/// Schema version of the context payload.
pub const MEMORY_CONTEXT_SCHEMA_VERSION: i64 = 1;

/// Hard cap on chronicle records served per context.
pub const MAX_CONTEXT_CHRONICLE_RECORDS: usize = 25;

/// Hard cap on history records served per context.
pub const MAX_CONTEXT_HISTORY_RECORDS: usize = 25;

/// A retrieval request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldMemoryRequest {
    /// Always [`MEMORY_REQUEST_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Requested scope.
    pub scope: MemoryScope,
}

/// Scope of a retrieval request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryScope {
    /// Town to focus on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town_id: Option<String>,
    /// Faction to focus on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction_id: Option<String>,
    /// Substring filter over chronicle messages, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Requested chronicle record count; clamped to
    /// [`MAX_CONTEXT_CHRONICLE_RECORDS`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chronicle_limit: Option<usize>,
    /// Requested history record count; clamped to
    /// [`MAX_CONTEXT_HISTORY_RECORDS`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

/// The retrieval response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldMemoryContext {
    /// Always [`MEMORY_CONTEXT_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Always [`MEMORY_CONTEXT_SCHEMA_VERSION`].
    pub schema_version: i64,
    /// The scope that was served.
    pub scope: MemoryScope,
    /// Most recent matching chronicle records, `(at, recordId)` descending.
    pub recent_chronicle: Vec<ChronicleRecord>,
    /// Most recent matching execution results, newest first.
    pub recent_history: Vec<ExecutionResult>,
    /// Summary for the scoped town, when one was named.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town_summary: Option<TownSummary>,
    /// Summary for the scoped faction, when one was named.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction_summary: Option<FactionSummary>,
}

/// Execution result counts by terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionCounts {
    /// Executed results.
    pub executed: i64,
    /// Rejected results.
    pub rejected: i64,
    /// Stale results.
    pub stale: i64,
    /// Duplicate results.
    pub duplicate: i64,
    /// Failed results.
    pub failed: i64,
}

/// Summary of one town's recorded history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TownSummary {
    /// Town id.
    pub town_id: String,
    /// History records concerning the town.
    pub history_count: i64,
    /// Chronicle records concerning the town.
    pub chronicle_count: i64,
    /// Execution results by status.
    pub execution_counts: ExecutionCounts,
    /// Active projects in the town.
    pub active_project_count: i64,
    /// Current hope.
    pub hope: i64,
    /// Current dread.
    pub dread: i64,
    /// Factions holding sway over the town.
    pub factions: Vec<String>,
}

/// Summary of one faction's recorded history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactionSummary {
    /// Faction id.
    pub faction_id: String,
    /// History records concerning the faction.
    pub history_count: i64,
    /// Chronicle records concerning the faction.
    pub chronicle_count: i64,
    /// Execution results by status.
    pub execution_counts: ExecutionCounts,
    /// Towns under the faction's sway.
    pub towns: Vec<String>,
}
