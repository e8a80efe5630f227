// SPDX-License-Identifier: Apache-2.0

//! Document-backed execution store.
//!
//! Receipts, pending markers, and the event ledger live inside the world
//! document under `world.execution`, so every mutation here rides the world
//! store's transaction protocol: lock, reload, mutate clone, atomic
//! persist. Record-level dedup uses derived event ids, which makes
//! `record_result` retries harmless across restarts.

use std::sync::Arc;

use serde_json::Value;
use vigil_proto::ExecutionResult;
use vigil_store::{TransactOptions, TxControl, WorldStore};
use vigil_world::bounds;
use vigil_world::doc::{ChronicleRecord, PendingExecution};

use crate::store::{
    chronicle_matches, history_matches, is_receipt_status, ChronicleQuery, ExecError,
    ExecutionStore, HistoryQuery,
};

/// Execution store held inside the world document.
pub struct DocExecutionStore {
    store: Arc<WorldStore>,
}

impl DocExecutionStore {
    /// Backend over the given world store.
    #[must_use]
    pub fn new(store: Arc<WorldStore>) -> Self {
        Self { store }
    }

    fn decode_history(history: &[Value]) -> Vec<ExecutionResult> {
        // Tolerate foreign entries: a record that no longer decodes is
        // narrative debris, not a reason to fail a query.
        history
            .iter()
            .filter_map(|value| serde_json::from_value(value.clone()).ok())
            .collect()
    }
}

impl ExecutionStore for DocExecutionStore {
    fn stage_pending(&self, marker: &PendingExecution) -> Result<(), ExecError> {
        let marker = marker.clone();
        let event_id = format!(
            "execution:stage:{}:{}",
            marker.handoff_id, marker.idempotency_key
        );
        self.store
            .transact(TransactOptions::with_event_id(event_id), move |doc| {
                doc.world
                    .execution
                    .pending
                    .retain(|p| {
                        p.handoff_id != marker.handoff_id
                            || p.idempotency_key != marker.idempotency_key
                    });
                doc.world.execution.pending.push(marker);
                bounds::cap_newest(
                    &mut doc.world.execution.pending,
                    bounds::MAX_EXECUTION_PENDING,
                );
                TxControl::Commit(())
            })?;
        Ok(())
    }

    fn update_pending_progress(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
        completed: i64,
    ) -> Result<(), ExecError> {
        let handoff_id = handoff_id.to_owned();
        let idempotency_key = idempotency_key.to_owned();
        self.store.transact(TransactOptions::default(), move |doc| {
            if let Some(marker) = doc.world.execution.pending.iter_mut().find(|p| {
                p.handoff_id == handoff_id && p.idempotency_key == idempotency_key
            }) {
                marker.completed_command_count = completed;
            }
            TxControl::Commit(())
        })?;
        Ok(())
    }

    fn record_result(&self, result: &ExecutionResult, _at: i64) -> Result<(), ExecError> {
        let payload = serde_json::to_value(result)?;
        let handoff_id = result.handoff_id.clone();
        let idempotency_key = result.idempotency_key.clone();
        let event_id = format!("execution:record:{}", result.execution_id);
        self.store
            .transact(TransactOptions::with_event_id(event_id), move |doc| {
                doc.world.execution.history.push(payload);
                bounds::cap_newest(
                    &mut doc.world.execution.history,
                    bounds::MAX_EXECUTION_HISTORY,
                );
                doc.world.execution.pending.retain(|p| {
                    p.handoff_id != handoff_id || p.idempotency_key != idempotency_key
                });
                TxControl::Commit(())
            })?;
        Ok(())
    }

    fn find_receipt(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<ExecutionResult>, ExecError> {
        let doc = self.store.snapshot();
        Ok(Self::decode_history(&doc.world.execution.history)
            .into_iter()
            .find(|r| {
                r.handoff_id == handoff_id
                    && r.idempotency_key == idempotency_key
                    && is_receipt_status(r.status)
            }))
    }

    fn find_pending(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<PendingExecution>, ExecError> {
        let doc = self.store.snapshot();
        Ok(doc
            .world
            .execution
            .pending
            .iter()
            .find(|p| p.handoff_id == handoff_id && p.idempotency_key == idempotency_key)
            .cloned())
    }

    fn list_pending(&self) -> Result<Vec<PendingExecution>, ExecError> {
        Ok(self.store.snapshot().world.execution.pending)
    }

    fn list_history(&self, query: &HistoryQuery) -> Result<Vec<ExecutionResult>, ExecError> {
        let doc = self.store.snapshot();
        // Every terminal result is history: receipts and the stale/
        // rejected/duplicate evaluation records alike.
        let mut results: Vec<ExecutionResult> =
            Self::decode_history(&doc.world.execution.history)
                .into_iter()
                .filter(|r| history_matches(r, query))
                .collect();
        results.reverse(); // append order -> newest first
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn list_chronicle_records(
        &self,
        query: &ChronicleQuery,
    ) -> Result<Vec<ChronicleRecord>, ExecError> {
        let doc = self.store.snapshot();
        let mut records: Vec<ChronicleRecord> = doc
            .world
            .chronicle
            .iter()
            .filter(|r| chronicle_matches(r, query))
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.at, b.record_id).cmp(&(a.at, a.record_id)));
        records.truncate(query.limit);
        Ok(records)
    }

    fn append_event(&self, kind: &str, payload: &Value, at: i64) -> Result<(), ExecError> {
        let entry = serde_json::json!({ "at": at, "kind": kind, "payload": payload });
        self.store.transact(TransactOptions::default(), move |doc| {
            doc.world.execution.event_ledger.push(entry);
            bounds::cap_newest(
                &mut doc.world.execution.event_ledger,
                bounds::MAX_EXECUTION_EVENTS,
            );
            TxControl::Commit(())
        })?;
        Ok(())
    }

    fn sync_world_memory(&self) -> Result<(), ExecError> {
        Ok(()) // the document *is* the projection
    }
}
