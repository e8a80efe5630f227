// SPDX-License-Identifier: Apache-2.0

//! vigil-store: durable, transactional ownership of the world document.
//!
//! One writer at a time, everywhere: an in-process FIFO ticket queue
//! serializes local transactions, and a cross-process lock sidecar
//! serializes commits between processes. Persistence is atomic
//! (temp-file + rename), and an event-id ring gives at-most-once semantics
//! for logically identical operations across retries and restarts.

mod error;
mod lock;
mod store;
mod ticket;

pub use error::StoreError;
pub use lock::FileLock;
pub use store::{load_or_fresh, FaultPoint, TransactOptions, TxControl, TxOutcome, WorldStore};
