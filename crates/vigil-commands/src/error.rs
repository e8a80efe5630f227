// SPDX-License-Identifier: Apache-2.0

//! Command-level errors.
//!
//! Only two things are worth throwing for: impossible input (non-finite
//! coordinates and kin, which must abort before any transaction opens) and
//! store failures bubbling up. Everything else — unknown targets, bad
//! verbs, insufficient funds — is a *diagnostic*: the command returns
//! `applied = false` with an explanatory output line and the snapshot stays
//! bit-identical.

use thiserror::Error;
use vigil_store::StoreError;

/// Errors surfaced by [`crate::GodCommandService::apply`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// Impossible input that must not open a transaction.
    #[error("[INVALID_INPUT] {0}")]
    InvalidInput(String),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
