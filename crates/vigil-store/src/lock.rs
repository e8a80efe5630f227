// SPDX-License-Identifier: Apache-2.0

//! Cross-process lock sidecar.
//!
//! The lock is a file created with exclusive-create semantics next to the
//! world file (`<path>.lock`). Presence indicates an in-flight writer in
//! some process. Acquisition retries on contention with a linear backoff
//! (`15ms * (attempt + 1)`, five retries); any other I/O error fails fast.
//!
//! The guard removes the sidecar on every exit path, including unwinds, so
//! a mutator panic cannot wedge other writers. A crashed *process* can —
//! that is the documented operator contract for a `.lock` left behind.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::StoreError;

/// Retries after the initial attempt.
const LOCK_RETRIES: u32 = 5;

/// Backoff unit; attempt `n` sleeps `UNIT * (n + 1)`.
const LOCK_BACKOFF_UNIT: Duration = Duration::from_millis(15);

/// Held lock on a world file. Released (and unlinked) on drop.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    released: bool,
}

impl FileLock {
    /// Sidecar path for a world file.
    #[must_use]
    pub fn sidecar(world_path: &Path) -> PathBuf {
        let mut os = world_path.as_os_str().to_owned();
        os.push(".lock");
        PathBuf::from(os)
    }

    /// Acquire the lock for `world_path`, retrying on contention.
    pub fn acquire(world_path: &Path) -> Result<Self, StoreError> {
        let path = Self::sidecar(world_path);
        let mut attempt: u32 = 0;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    return Ok(Self {
                        path,
                        released: false,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if attempt >= LOCK_RETRIES {
                        return Err(StoreError::LockTimeout {
                            path,
                            attempts: attempt + 1,
                        });
                    }
                    thread::sleep(LOCK_BACKOFF_UNIT * (attempt + 1));
                    attempt += 1;
                }
                Err(err) => return Err(StoreError::LockFailed(err)),
            }
        }
    }

    /// Release the lock explicitly, surfacing unlink failures.
    pub fn release(mut self) -> Result<(), StoreError> {
        self.released = true;
        fs::remove_file(&self.path).map_err(StoreError::LockFailed)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = fs::remove_file(&self.path) {
            // Nothing sane to do mid-unwind; leave a trace for the operator.
            warn!(path = %self.path.display(), %err, "failed to remove lock sidecar");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::FileLock;
    use crate::error::StoreError;

    #[test]
    fn lock_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let world = dir.path().join("memory.json");
        let lock = FileLock::acquire(&world).unwrap();
        assert!(FileLock::sidecar(&world).exists());
        lock.release().unwrap();
        assert!(!FileLock::sidecar(&world).exists());
    }

    #[test]
    fn contention_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let world = dir.path().join("memory.json");
        let _held = FileLock::acquire(&world).unwrap();
        match FileLock::acquire(&world) {
            Err(StoreError::LockTimeout { attempts, .. }) => assert_eq!(attempts, 6),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn drop_removes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let world = dir.path().join("memory.json");
        {
            let _lock = FileLock::acquire(&world).unwrap();
        }
        assert!(!FileLock::sidecar(&world).exists());
    }
}
