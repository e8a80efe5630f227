// SPDX-License-Identifier: Apache-2.0

//! vigil-world: the canonical world document and its pure transforms.
//!
//! This crate owns the shape of the authoritative world: the typed document
//! ([`doc::WorldDoc`]), the load-time schema sanitizer ([`sanitize`]), the
//! canonical snapshot projection and SHA-256 fingerprint ([`projection`]),
//! deterministic actor synthesis ([`actors`]), and the container bounds
//! every writer enforces ([`bounds`]).
//!
//! Nothing here performs I/O. Durability, locking, and transactions live in
//! `vigil-store`; mutation vocabulary lives in `vigil-commands`.

pub mod actors;
pub mod bounds;
pub mod clock;
pub mod doc;
pub mod integrity;
pub mod projection;
pub mod rng;
pub mod sanitize;

pub use clock::{Clock, FixedClock, SystemClock};
pub use doc::WorldDoc;
pub use projection::{project, Projection};
pub use sanitize::sanitize;
