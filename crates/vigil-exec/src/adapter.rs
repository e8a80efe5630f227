// SPDX-License-Identifier: Apache-2.0

//! The execution adapter: handoff in, canonical result out.
//!
//! Pipeline (classifications, not exceptions):
//!
//! ```text
//! received → duplicate-check → precondition-check → stale-check
//!          → staged → applying → finalizing
//!          → terminal { executed | rejected | stale | duplicate | failed }
//! ```
//!
//! Crash safety: the pending marker is staged with zero completed commands
//! before the first authority command, bumped after each committed command,
//! and deleted when the terminal receipt lands. A crash between a command
//! commit and the receipt write leaves a marker whose count is positive —
//! the unambiguous signal [`ExecutionAdapter::recover_interrupted_executions`]
//! keys on. The adapter throws only for host-level failures; every
//! classifiable state is a result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use vigil_commands::{CommandError, CommandRequest, GodCommandService};
use vigil_proto::result::{
    REASON_ADVISORY_UNSUPPORTED, REASON_DUPLICATE_HANDOFF, REASON_EXECUTED,
    REASON_EXECUTION_FAILED, REASON_INTERRUPTED_EXECUTION_RECOVERY, REASON_PRECONDITION_FAILED,
    REASON_STALE_DECISION_EPOCH, REASON_STALE_SNAPSHOT,
};
use vigil_proto::{
    DuplicateCheck, Evaluation, ExecutionHandoff, ExecutionResult, ExecutionStatus,
    PreconditionOutcome, StaleCheck, WorldStateStamp, RESULT_SCHEMA_VERSION, RESULT_TYPE,
};
use vigil_store::WorldStore;
use vigil_world::doc::PendingExecution;
use vigil_world::projection::{project, Projection};
use vigil_world::{Clock, SystemClock};

use crate::preconditions;
use crate::store::{ExecError, ExecutionStore};

type TerminalHook = Box<dyn FnOnce() -> Result<(), String> + Send>;

/// The execution adapter.
pub struct ExecutionAdapter {
    commands: Arc<GodCommandService>,
    world: Arc<WorldStore>,
    exec: Arc<dyn ExecutionStore>,
    clock: Arc<dyn Clock>,
    /// Per-attempt nonce folded into result ids so two attempts at the same
    /// handoff within one millisecond still get distinct ids.
    attempt_seq: AtomicU64,
    before_terminal_receipt_persist: Mutex<Option<TerminalHook>>,
}

impl ExecutionAdapter {
    /// Adapter over a command service and an execution store.
    #[must_use]
    pub fn new(
        commands: Arc<GodCommandService>,
        world: Arc<WorldStore>,
        exec: Arc<dyn ExecutionStore>,
    ) -> Self {
        Self {
            commands,
            world,
            exec,
            clock: Arc::new(SystemClock),
            attempt_seq: AtomicU64::new(0),
            before_terminal_receipt_persist: Mutex::new(None),
        }
    }

    /// Replace the clock (tests pin it).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Arm the one-shot crash hook fired just before the terminal receipt
    /// of a staged execution persists. Test instrumentation.
    pub fn set_before_terminal_receipt_persist<F>(&self, hook: F)
    where
        F: FnOnce() -> Result<(), String> + Send + 'static,
    {
        *self
            .before_terminal_receipt_persist
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
    }

    /// Execute one handoff to a terminal classification.
    pub fn execute_handoff(&self, handoff: &ExecutionHandoff) -> Result<ExecutionResult, ExecError> {
        let now = self.clock.now_millis();

        // Advisory handoffs are rejected at the boundary until dry-run
        // semantics are specified by callers.
        if handoff.proposal.advisory {
            let projection = project(&self.world.snapshot());
            let result = self.build_result(
                handoff,
                now,
                Vec::new(),
                ExecutionStatus::Rejected,
                REASON_ADVISORY_UNSUPPORTED,
                false,
                false,
                Evaluation::default(),
                &projection,
            );
            self.exec.record_result(&result, now)?;
            return Ok(result);
        }

        // Duplicate check: a prior receipt answers for us.
        if let Some(prior) = self
            .exec
            .find_receipt(&handoff.handoff_id, &handoff.idempotency_key)?
        {
            return self.duplicate_of(handoff, now, &prior);
        }
        // An orphaned pending marker means a prior attempt died mid-flight;
        // classify it first, then answer as its duplicate.
        if let Some(marker) = self
            .exec
            .find_pending(&handoff.handoff_id, &handoff.idempotency_key)?
        {
            let recovered = self.recover_marker(&marker)?;
            return self.duplicate_of(handoff, now, &recovered);
        }

        let doc = self.world.snapshot();
        let projection = project(&doc);

        // Precondition check.
        let precondition_outcomes: Vec<PreconditionOutcome> = handoff
            .execution_requirements
            .preconditions
            .iter()
            .map(|spec| preconditions::evaluate(&doc, &handoff.proposal, spec))
            .collect();
        if precondition_outcomes.iter().any(|o| !o.passed) {
            let evaluation = Evaluation {
                preconditions: precondition_outcomes,
                stale_check: stale_check(handoff, &projection, false),
                duplicate_check: DuplicateCheck::default(),
            };
            let result = self.build_result(
                handoff,
                now,
                Vec::new(),
                ExecutionStatus::Rejected,
                REASON_PRECONDITION_FAILED,
                false,
                false,
                evaluation,
                &projection,
            );
            self.exec.record_result(&result, now)?;
            return Ok(result);
        }

        // Stale check: epoch first, then snapshot hash.
        let expected_epoch = handoff.execution_requirements.expected_decision_epoch;
        let expected_hash = &handoff.execution_requirements.expected_snapshot_hash;
        let stale_reason = if projection.decision_epoch != Some(expected_epoch) {
            Some(REASON_STALE_DECISION_EPOCH)
        } else if projection.hash != *expected_hash {
            Some(REASON_STALE_SNAPSHOT)
        } else {
            None
        };
        if let Some(reason) = stale_reason {
            let evaluation = Evaluation {
                preconditions: precondition_outcomes,
                stale_check: stale_check(handoff, &projection, true),
                duplicate_check: DuplicateCheck::default(),
            };
            let result = self.build_result(
                handoff,
                now,
                Vec::new(),
                ExecutionStatus::Stale,
                reason,
                false,
                false,
                evaluation,
                &projection,
            );
            self.exec.record_result(&result, now)?;
            return Ok(result);
        }

        // Stage the pending marker, then apply authority commands in order.
        let authority_commands = translate_authority_commands(handoff);
        let marker = PendingExecution {
            handoff_id: handoff.handoff_id.clone(),
            idempotency_key: handoff.idempotency_key.clone(),
            proposal_type: handoff.proposal.kind.clone(),
            actor_id: handoff.proposal.actor_id.clone(),
            town_id: handoff.proposal.town_id.clone(),
            authority_commands: authority_commands.clone(),
            completed_command_count: 0,
            staged_at: now,
            before_snapshot_hash: projection.hash.clone(),
        };
        self.exec.stage_pending(&marker)?;
        self.exec.append_event(
            "staged",
            &json!({
                "handoffId": handoff.handoff_id,
                "idempotencyKey": handoff.idempotency_key,
                "authorityCommands": authority_commands,
            }),
            now,
        )?;

        let mut failure: Option<String> = None;
        for (i, command) in authority_commands.iter().enumerate() {
            let request = CommandRequest {
                agents: Vec::new(),
                command: command.clone(),
                operation_id: format!("{}:cmd:{i}", handoff.handoff_id),
            };
            match self.commands.apply(&request) {
                Ok(outcome) if outcome.applied => {
                    self.exec.update_pending_progress(
                        &handoff.handoff_id,
                        &handoff.idempotency_key,
                        (i + 1) as i64,
                    )?;
                }
                Ok(outcome) => {
                    failure = Some(outcome.output_lines.join("; "));
                    break;
                }
                // Invalid input in a translated command is a classifiable
                // failure, not a host fault.
                Err(CommandError::InvalidInput(detail)) => {
                    failure = Some(detail);
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }

        // Terminal receipt. The crash hook sits exactly between the last
        // authority commit and the receipt write.
        if let Some(hook) = self
            .before_terminal_receipt_persist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            hook().map_err(ExecError::InjectedFault)?;
        }

        let post = project(&self.world.snapshot());
        let evaluation = Evaluation {
            preconditions: precondition_outcomes,
            stale_check: stale_check(handoff, &projection, false),
            duplicate_check: DuplicateCheck::default(),
        };
        let (status, reason, executed) = match &failure {
            None => (ExecutionStatus::Executed, REASON_EXECUTED, true),
            Some(detail) => {
                debug!(handoff_id = %handoff.handoff_id, detail, "authority command failed");
                (ExecutionStatus::Failed, REASON_EXECUTION_FAILED, false)
            }
        };
        let result = self.build_result(
            handoff,
            now,
            authority_commands,
            status,
            reason,
            true,
            executed,
            evaluation,
            &post,
        );
        self.exec.record_result(&result, now)?;
        self.exec.append_event(
            "result",
            &json!({ "executionId": result.execution_id, "status": reason }),
            now,
        )?;
        info!(
            handoff_id = %handoff.handoff_id,
            execution_id = %result.execution_id,
            reason,
            "handoff settled"
        );
        Ok(result)
    }

    /// Classify every staged pending marker as an interrupted execution,
    /// synthesize its receipt, and clear the marker.
    pub fn recover_interrupted_executions(&self) -> Result<Vec<ExecutionResult>, ExecError> {
        let pending = self.exec.list_pending()?;
        let mut recovered = Vec::with_capacity(pending.len());
        for marker in pending {
            recovered.push(self.recover_marker(&marker)?);
        }
        Ok(recovered)
    }

    fn next_execution_id(&self, handoff_id: &str, idempotency_key: &str, now: i64) -> String {
        let seq = self.attempt_seq.fetch_add(1, Ordering::Relaxed);
        execution_id(handoff_id, idempotency_key, now, seq)
    }

    fn recover_marker(&self, marker: &PendingExecution) -> Result<ExecutionResult, ExecError> {
        let now = self.clock.now_millis();
        let post = project(&self.world.snapshot());
        let execution_id = self.next_execution_id(&marker.handoff_id, &marker.idempotency_key, now);
        let result = ExecutionResult {
            kind: RESULT_TYPE.to_owned(),
            schema_version: RESULT_SCHEMA_VERSION,
            execution_id: execution_id.clone(),
            result_id: execution_id,
            handoff_id: marker.handoff_id.clone(),
            proposal_id: String::new(),
            idempotency_key: marker.idempotency_key.clone(),
            snapshot_hash: marker.before_snapshot_hash.clone(),
            decision_epoch: 0,
            actor_id: marker.actor_id.clone(),
            town_id: marker.town_id.clone(),
            proposal_type: marker.proposal_type.clone(),
            command: String::new(),
            authority_commands: marker.authority_commands.clone(),
            status: ExecutionStatus::Failed,
            accepted: true,
            executed: false,
            reason_code: REASON_INTERRUPTED_EXECUTION_RECOVERY.to_owned(),
            evaluation: Evaluation::default(),
            world_state: WorldStateStamp {
                post_execution_snapshot_hash: Some(post.hash),
                post_execution_decision_epoch: post.decision_epoch,
            },
        };
        self.exec.record_result(&result, now)?;
        info!(
            handoff_id = %marker.handoff_id,
            completed = marker.completed_command_count,
            "interrupted execution recovered"
        );
        Ok(result)
    }

    fn duplicate_of(
        &self,
        handoff: &ExecutionHandoff,
        now: i64,
        prior: &ExecutionResult,
    ) -> Result<ExecutionResult, ExecError> {
        let projection = project(&self.world.snapshot());
        let evaluation = Evaluation {
            preconditions: Vec::new(),
            stale_check: StaleCheck::default(),
            duplicate_check: DuplicateCheck {
                duplicate: true,
                duplicate_of: Some(prior.execution_id.clone()),
            },
        };
        let result = self.build_result(
            handoff,
            now,
            prior.authority_commands.clone(),
            ExecutionStatus::Duplicate,
            REASON_DUPLICATE_HANDOFF,
            false,
            false,
            evaluation,
            &projection,
        );
        self.exec.record_result(&result, now)?;
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_result(
        &self,
        handoff: &ExecutionHandoff,
        now: i64,
        authority_commands: Vec<String>,
        status: ExecutionStatus,
        reason_code: &str,
        accepted: bool,
        executed: bool,
        evaluation: Evaluation,
        post: &Projection,
    ) -> ExecutionResult {
        let execution_id = self.next_execution_id(&handoff.handoff_id, &handoff.idempotency_key, now);
        ExecutionResult {
            kind: RESULT_TYPE.to_owned(),
            schema_version: RESULT_SCHEMA_VERSION,
            execution_id: execution_id.clone(),
            result_id: execution_id,
            handoff_id: handoff.handoff_id.clone(),
            proposal_id: handoff.proposal_id.clone(),
            idempotency_key: handoff.idempotency_key.clone(),
            snapshot_hash: handoff.snapshot_hash.clone(),
            decision_epoch: handoff.decision_epoch,
            actor_id: handoff.proposal.actor_id.clone(),
            town_id: handoff.proposal.town_id.clone(),
            proposal_type: handoff.proposal.kind.clone(),
            command: handoff.command.clone(),
            authority_commands,
            status,
            accepted,
            executed,
            reason_code: reason_code.to_owned(),
            evaluation,
            world_state: WorldStateStamp {
                post_execution_snapshot_hash: Some(post.hash.clone()),
                post_execution_decision_epoch: post.decision_epoch,
            },
        }
    }
}

/// Derived authority command list for a handoff. Computed once, stored in
/// the pending marker, executed in order with distinct derived event ids.
#[must_use]
pub fn translate_authority_commands(handoff: &ExecutionHandoff) -> Vec<String> {
    match (handoff.proposal.kind.as_str(), &handoff.proposal.town_id) {
        ("MAYOR_ACCEPT_MISSION", Some(town)) => {
            vec![format!("mayor talk {town}"), format!("mayor accept {town}")]
        }
        _ => vec![handoff.command.clone()],
    }
}

fn execution_id(handoff_id: &str, idempotency_key: &str, now: i64, seq: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(handoff_id.as_bytes());
    hasher.update(b"|");
    hasher.update(idempotency_key.as_bytes());
    hasher.update(b"|");
    hasher.update(now.to_le_bytes());
    hasher.update(b"|");
    hasher.update(seq.to_le_bytes());
    format!("result_{}", hex::encode(hasher.finalize()))
}

fn stale_check(handoff: &ExecutionHandoff, projection: &Projection, stale: bool) -> StaleCheck {
    StaleCheck {
        expected_snapshot_hash: Some(
            handoff.execution_requirements.expected_snapshot_hash.clone(),
        ),
        actual_snapshot_hash: Some(projection.hash.clone()),
        expected_decision_epoch: Some(handoff.execution_requirements.expected_decision_epoch),
        actual_decision_epoch: projection.decision_epoch,
        stale,
    }
}
