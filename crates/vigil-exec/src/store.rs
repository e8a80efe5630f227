// SPDX-License-Identifier: Apache-2.0

//! The execution store port.
//!
//! Receipts, pending markers, an append-only event ledger, and the
//! projected chronicle query surface — behind one trait with two
//! interchangeable backends:
//!
//! - the document backend keeps everything inside the world document under
//!   `world.execution`, sharing the world store's transaction discipline;
//! - the relational backend keeps it in a single-file SQLite database.
//!
//! Both backends must agree on `find_receipt` equality and on chronicle
//! ordering `(at DESC, recordId DESC)` for identical sanitized world state.

use thiserror::Error;
use vigil_proto::{ExecutionResult, ExecutionStatus};
use vigil_store::StoreError;
use vigil_world::doc::{ChronicleRecord, PendingExecution};

/// Errors surfaced by execution stores and the adapter.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The world store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The command service failed at the host level.
    #[error(transparent)]
    Command(#[from] vigil_commands::CommandError),

    /// The relational backend failed.
    #[error("[EXECUTION_STORE_FAILED] {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored payload no longer decodes.
    #[error("[EXECUTION_STORE_FAILED] payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// An injected test fault fired.
    #[error("[SIMULATED_CRASH] {0}")]
    InjectedFault(String),
}

/// Chronicle query parameters.
#[derive(Debug, Clone, Default)]
pub struct ChronicleQuery {
    /// Restrict to one town.
    pub town_id: Option<String>,
    /// Restrict to one faction.
    pub faction_id: Option<String>,
    /// Substring filter over messages.
    pub search: Option<String>,
    /// Maximum records returned.
    pub limit: usize,
}

/// History query parameters. Faction scoping is resolved by the caller into
/// a town set so both backends stay symmetric.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Restrict to results concerning any of these towns. `None` means all.
    pub town_ids: Option<Vec<String>>,
    /// Maximum records returned. `None` means all retained records.
    pub limit: Option<usize>,
}

/// Durable store for execution receipts and pending markers.
pub trait ExecutionStore: Send + Sync {
    /// Stage a pending marker before the first authority command runs.
    fn stage_pending(&self, marker: &PendingExecution) -> Result<(), ExecError>;

    /// Bump a staged marker's completed-command count.
    fn update_pending_progress(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
        completed: i64,
    ) -> Result<(), ExecError>;

    /// Record a terminal result and remove any matching pending marker.
    fn record_result(&self, result: &ExecutionResult, at: i64) -> Result<(), ExecError>;

    /// Prior receipt for `(handoff_id, idempotency_key)`, if one exists.
    ///
    /// Only `executed` and `failed` results are receipts: stale and
    /// rejected evaluations stay in history but do not block a corrected
    /// resubmission with the same idempotency key.
    fn find_receipt(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<ExecutionResult>, ExecError>;

    /// Staged pending marker for `(handoff_id, idempotency_key)`, if any.
    fn find_pending(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<PendingExecution>, ExecError>;

    /// All staged pending markers, oldest first.
    fn list_pending(&self) -> Result<Vec<PendingExecution>, ExecError>;

    /// Terminal results of every status matching `query`, newest first.
    ///
    /// This is the full outcome record — executed, rejected, stale,
    /// duplicate, and failed — not just the receipts the duplicate check
    /// consults. Summaries count all five.
    fn list_history(&self, query: &HistoryQuery) -> Result<Vec<ExecutionResult>, ExecError>;

    /// Chronicle records matching `query`, `(at, recordId)` descending.
    fn list_chronicle_records(
        &self,
        query: &ChronicleQuery,
    ) -> Result<Vec<ChronicleRecord>, ExecError>;

    /// Append to the execution event ledger.
    fn append_event(&self, kind: &str, payload: &serde_json::Value, at: i64)
        -> Result<(), ExecError>;

    /// Refresh projected world data (chronicle table). Idempotent; a no-op
    /// for the document backend.
    fn sync_world_memory(&self) -> Result<(), ExecError>;
}

/// Whether a result blocks duplicates (is a receipt).
#[must_use]
pub fn is_receipt_status(status: ExecutionStatus) -> bool {
    matches!(status, ExecutionStatus::Executed | ExecutionStatus::Failed)
}

/// Filter predicate shared by both backends' chronicle queries.
#[must_use]
pub fn chronicle_matches(record: &ChronicleRecord, query: &ChronicleQuery) -> bool {
    if let Some(town) = &query.town_id {
        if record.town_id.as_deref() != Some(town.as_str()) {
            return false;
        }
    }
    if let Some(faction) = &query.faction_id {
        if record.faction_id.as_deref() != Some(faction.as_str()) {
            return false;
        }
    }
    if let Some(search) = &query.search {
        if !record.msg.contains(search.as_str()) {
            return false;
        }
    }
    true
}

/// Shared history filter.
#[must_use]
pub fn history_matches(result: &ExecutionResult, query: &HistoryQuery) -> bool {
    match &query.town_ids {
        None => true,
        Some(towns) => result
            .town_id
            .as_deref()
            .is_some_and(|town| towns.iter().any(|t| t == town)),
    }
}
