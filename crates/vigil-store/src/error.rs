// SPDX-License-Identifier: Apache-2.0

//! Store error taxonomy.
//!
//! Display strings carry a bracketed stable code so operators and tests can
//! match the kind without matching prose. Every error leaves the committed
//! snapshot untouched; `WriteFailed` and `SimulatedCrash` additionally
//! guarantee temp-file and lock-file cleanup before they surface.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the world store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Caller supplied an unusable value. Recoverable; retry with valid
    /// input. No mutation happened.
    #[error("[INVALID_MEMORY_INPUT] {0}")]
    InvalidInput(String),

    /// The lock sidecar stayed held through every retry.
    #[error("[MEMORY_LOCK_TIMEOUT] {path} still locked after {attempts} attempts")]
    LockTimeout {
        /// Path of the lock sidecar.
        path: PathBuf,
        /// Acquisition attempts made.
        attempts: u32,
    },

    /// Lock acquisition or release failed for a reason other than contention.
    #[error("[MEMORY_LOCK_FAILED] {0}")]
    LockFailed(#[source] io::Error),

    /// Writing or renaming the snapshot failed. The previously committed
    /// snapshot is preserved.
    #[error("[MEMORY_WRITE_FAILED] {context}: {source}")]
    WriteFailed {
        /// Which step failed (`write`, `rename`).
        context: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Snapshot serialization failed.
    #[error("[MEMORY_WRITE_FAILED] serialize: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Test-only injected fault. Identical cleanup contract to
    /// [`StoreError::WriteFailed`].
    #[error("[SIMULATED_CRASH] injected fault before rename")]
    SimulatedCrash,
}
