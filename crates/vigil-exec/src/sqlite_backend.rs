// SPDX-License-Identifier: Apache-2.0

//! Relational execution store over a single SQLite file.
//!
//! Schema is bootstrapped on open (idempotent `CREATE TABLE IF NOT
//! EXISTS`). Every mutation runs in an `IMMEDIATE` transaction; reads use
//! deferred transactions through a single connection. Chronicle queries
//! order `(at DESC, record_id DESC)` to match the document backend.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use vigil_proto::ExecutionResult;
use vigil_store::WorldStore;
use vigil_world::doc::{ChronicleRecord, PendingExecution};

use crate::store::{
    history_matches, is_receipt_status, ChronicleQuery, ExecError, ExecutionStore, HistoryQuery,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS execution_receipts (
    execution_id TEXT PRIMARY KEY,
    handoff_id TEXT NOT NULL,
    idempotency_key TEXT NOT NULL UNIQUE,
    proposal_type TEXT NOT NULL,
    actor_id TEXT,
    town_id TEXT,
    status TEXT NOT NULL,
    reason_code TEXT NOT NULL,
    authority_commands TEXT NOT NULL,
    post_execution_snapshot_hash TEXT,
    post_execution_decision_epoch INTEGER,
    payload TEXT NOT NULL,
    at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS execution_pending (
    handoff_id TEXT PRIMARY KEY,
    idempotency_key TEXT NOT NULL,
    authority_commands TEXT NOT NULL,
    completed_command_count INTEGER NOT NULL,
    staged_at INTEGER NOT NULL,
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS execution_event_ledger (
    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
    at INTEGER NOT NULL,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS world_chronicle_records (
    record_id INTEGER PRIMARY KEY,
    source_id TEXT,
    town_id TEXT,
    faction_id TEXT,
    at INTEGER NOT NULL,
    type TEXT NOT NULL,
    msg TEXT NOT NULL,
    meta TEXT
);
";

/// SQLite-backed execution store.
pub struct SqliteExecutionStore {
    conn: Mutex<Connection>,
    /// World store the chronicle projection is synced from.
    world: Arc<WorldStore>,
}

impl SqliteExecutionStore {
    /// Open (and bootstrap) the store at `path`.
    pub fn open(path: &Path, world: Arc<WorldStore>) -> Result<Self, ExecError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            world,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode_result(payload: &str) -> Result<ExecutionResult, ExecError> {
    Ok(serde_json::from_str(payload)?)
}

fn decode_pending(payload: &str) -> Result<PendingExecution, ExecError> {
    Ok(serde_json::from_str(payload)?)
}

impl ExecutionStore for SqliteExecutionStore {
    fn stage_pending(&self, marker: &PendingExecution) -> Result<(), ExecError> {
        let payload = serde_json::to_string(marker)?;
        let commands = serde_json::to_string(&marker.authority_commands)?;
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT OR REPLACE INTO execution_pending
             (handoff_id, idempotency_key, authority_commands,
              completed_command_count, staged_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                marker.handoff_id,
                marker.idempotency_key,
                commands,
                marker.completed_command_count,
                marker.staged_at,
                payload,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_pending_progress(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
        completed: i64,
    ) -> Result<(), ExecError> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE execution_pending
             SET completed_command_count = ?3,
                 payload = json_set(payload, '$.completedCommandCount', ?3)
             WHERE handoff_id = ?1 AND idempotency_key = ?2",
            params![handoff_id, idempotency_key, completed],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn record_result(&self, result: &ExecutionResult, at: i64) -> Result<(), ExecError> {
        let payload = serde_json::to_string(result)?;
        let commands = serde_json::to_string(&result.authority_commands)?;
        let status = serde_json::to_value(result.status)?
            .as_str()
            .unwrap_or("failed")
            .to_owned();
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        if is_receipt_status(result.status) {
            tx.execute(
                "INSERT OR REPLACE INTO execution_receipts
                 (execution_id, handoff_id, idempotency_key, proposal_type, actor_id,
                  town_id, status, reason_code, authority_commands,
                  post_execution_snapshot_hash, post_execution_decision_epoch, payload, at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    result.execution_id,
                    result.handoff_id,
                    result.idempotency_key,
                    result.proposal_type,
                    result.actor_id,
                    result.town_id,
                    status,
                    result.reason_code,
                    commands,
                    result.world_state.post_execution_snapshot_hash,
                    result.world_state.post_execution_decision_epoch,
                    payload,
                    at,
                ],
            )?;
        } else {
            // Stale/rejected/duplicate evaluations never block a corrected
            // resubmission; they live on the event ledger, not in receipts.
            tx.execute(
                "INSERT INTO execution_event_ledger (at, kind, payload)
                 VALUES (?1, ?2, ?3)",
                params![at, "evaluation", payload],
            )?;
        }
        tx.execute(
            "DELETE FROM execution_pending WHERE handoff_id = ?1 AND idempotency_key = ?2",
            params![result.handoff_id, result.idempotency_key],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn find_receipt(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<ExecutionResult>, ExecError> {
        let conn = self.lock();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM execution_receipts
                 WHERE handoff_id = ?1 AND idempotency_key = ?2
                   AND status IN ('executed', 'failed')
                 ORDER BY at DESC LIMIT 1",
                params![handoff_id, idempotency_key],
                |row| row.get(0),
            )
            .optional()?;
        payload.as_deref().map(decode_result).transpose()
    }

    fn find_pending(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<PendingExecution>, ExecError> {
        let conn = self.lock();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM execution_pending
                 WHERE handoff_id = ?1 AND idempotency_key = ?2",
                params![handoff_id, idempotency_key],
                |row| row.get(0),
            )
            .optional()?;
        payload.as_deref().map(decode_pending).transpose()
    }

    fn list_pending(&self) -> Result<Vec<PendingExecution>, ExecError> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT payload FROM execution_pending ORDER BY staged_at ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for payload in rows {
            out.push(decode_pending(&payload?)?);
        }
        Ok(out)
    }

    fn list_history(&self, query: &HistoryQuery) -> Result<Vec<ExecutionResult>, ExecError> {
        // Receipts and the stale/rejected/duplicate evaluation rows
        // together form the terminal-outcome record; merge both, newest
        // first.
        let conn = self.lock();
        let mut merged: Vec<(i64, ExecutionResult)> = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT at, payload FROM execution_receipts ORDER BY at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (at, payload) = row?;
                let result = decode_result(&payload)?;
                if history_matches(&result, query) {
                    merged.push((at, result));
                }
            }
        }
        {
            let mut stmt = conn.prepare(
                "SELECT at, payload FROM execution_event_ledger
                 WHERE kind = 'evaluation' ORDER BY at DESC, event_id DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (at, payload) = row?;
                let result = decode_result(&payload)?;
                if history_matches(&result, query) {
                    merged.push((at, result));
                }
            }
        }
        // Stable sort: ties keep receipts ahead of evaluations.
        merged.sort_by(|a, b| b.0.cmp(&a.0));
        let mut out: Vec<ExecutionResult> = merged.into_iter().map(|(_, result)| result).collect();
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn list_chronicle_records(
        &self,
        query: &ChronicleQuery,
    ) -> Result<Vec<ChronicleRecord>, ExecError> {
        let conn = self.lock();
        let mut sql = String::from(
            "SELECT record_id, source_id, town_id, faction_id, at, type, msg, meta
             FROM world_chronicle_records WHERE 1=1",
        );
        let mut binds: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(town) = &query.town_id {
            sql.push_str(" AND town_id = ?");
            binds.push(Box::new(town.clone()));
        }
        if let Some(faction) = &query.faction_id {
            sql.push_str(" AND faction_id = ?");
            binds.push(Box::new(faction.clone()));
        }
        if let Some(search) = &query.search {
            sql.push_str(" AND msg LIKE ?");
            binds.push(Box::new(format!("%{search}%")));
        }
        sql.push_str(" ORDER BY at DESC, record_id DESC LIMIT ?");
        binds.push(Box::new(i64::try_from(query.limit).unwrap_or(i64::MAX)));

        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            binds.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_refs.as_slice(), |row| {
            let meta: Option<String> = row.get(7)?;
            Ok(ChronicleRecord {
                record_id: row.get(0)?,
                source_id: row.get(1)?,
                town_id: row.get(2)?,
                faction_id: row.get(3)?,
                at: row.get(4)?,
                kind: row.get(5)?,
                msg: row.get(6)?,
                meta: meta.and_then(|m| serde_json::from_str(&m).ok()),
            })
        })?;
        let mut out = Vec::new();
        for record in rows {
            out.push(record?);
        }
        Ok(out)
    }

    fn append_event(&self, kind: &str, payload: &Value, at: i64) -> Result<(), ExecError> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO execution_event_ledger (at, kind, payload) VALUES (?1, ?2, ?3)",
            params![at, kind, payload.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn sync_world_memory(&self) -> Result<(), ExecError> {
        let chronicle = self.world.snapshot().world.chronicle;
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        // Full idempotent refresh: the document's bounded chronicle is the
        // source of truth; the table is a projection of it.
        tx.execute("DELETE FROM world_chronicle_records", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO world_chronicle_records
                 (record_id, source_id, town_id, faction_id, at, type, msg, meta)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for record in &chronicle {
                let meta = record.meta.as_ref().map(ToString::to_string);
                stmt.execute(params![
                    record.record_id,
                    record.source_id,
                    record.town_id,
                    record.faction_id,
                    record.at,
                    record.kind,
                    record.msg,
                    meta,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
