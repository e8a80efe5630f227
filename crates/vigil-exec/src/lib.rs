// SPDX-License-Identifier: Apache-2.0

//! vigil-exec: the idempotent execution pipeline.
//!
//! [`adapter::ExecutionAdapter`] turns externally submitted handoffs into
//! canonical results: duplicate detection across restarts, optimistic
//! freshness against the snapshot projection, declared preconditions,
//! crash-safe staging of authority commands, and interrupted-execution
//! recovery. Receipts and pending markers persist through an
//! [`store::ExecutionStore`] — inside the world document or in SQLite —
//! and [`context::WorldMemoryService`] serves the bounded read surface.

pub mod adapter;
pub mod context;
pub mod doc_backend;
pub mod preconditions;
pub mod sqlite_backend;
pub mod store;

pub use adapter::{translate_authority_commands, ExecutionAdapter};
pub use context::WorldMemoryService;
pub use doc_backend::DocExecutionStore;
pub use sqlite_backend::SqliteExecutionStore;
pub use store::{ChronicleQuery, ExecError, ExecutionStore, HistoryQuery};
