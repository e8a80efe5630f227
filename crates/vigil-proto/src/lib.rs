// SPDX-License-Identifier: Apache-2.0

//! vigil-proto: versioned wire types for the engine's line protocol.
//!
//! Three message families cross the stdio boundary: execution handoffs in
//! ([`handoff`]), canonical execution results out ([`result`]), and
//! world-memory retrieval requests/contexts ([`memory`]). Framing is
//! newline-delimited JSON ([`framing`]).

pub mod framing;
pub mod handoff;
pub mod memory;
pub mod result;

pub use framing::{encode_line, parse_line, InboundFrame};
pub use handoff::{
    ExecutionHandoff, ExecutionRequirements, PreconditionSpec, Proposal, HANDOFF_SCHEMA_VERSION,
};
pub use memory::{
    ExecutionCounts, FactionSummary, MemoryScope, TownSummary, WorldMemoryContext,
    WorldMemoryRequest, MAX_CONTEXT_CHRONICLE_RECORDS, MAX_CONTEXT_HISTORY_RECORDS,
    MEMORY_CONTEXT_SCHEMA_VERSION, MEMORY_CONTEXT_TYPE, MEMORY_REQUEST_TYPE,
};
pub use result::{
    DuplicateCheck, Evaluation, ExecutionResult, ExecutionStatus, PreconditionOutcome,
    StaleCheck, WorldStateStamp, RESULT_SCHEMA_VERSION, RESULT_TYPE,
};
