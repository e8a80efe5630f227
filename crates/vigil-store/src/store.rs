// SPDX-License-Identifier: Apache-2.0

//! The durable world store.
//!
//! Transaction protocol (holds for every call to [`WorldStore::transact`]):
//!
//! 1. Enter the in-process FIFO; a successor starts only after its
//!    predecessor resolves, error or not.
//! 2. Acquire the cross-process lock sidecar (`<path>.lock`).
//! 3. Reload the document from disk while holding the lock — the in-memory
//!    cache of any writer may be stale. Missing file ⇒ fresh shape.
//!    Malformed content ⇒ log once, fresh shape (the operator backs up
//!    corrupt data out of band).
//! 4. If the supplied event id was already processed, return
//!    `{skipped: true}` without mutating.
//! 5. Run the mutator against a deep clone of the working document.
//! 6. On commit: append the event id (ring of 1000), persist atomically
//!    (write `<path>.<pid>.<millis>.tmp`, rename over `<path>`), publish
//!    the clone as the in-memory committed snapshot.
//! 7. Release the lock on every exit path — success, reject, skip, mutator
//!    unwind, persist failure.
//!
//! Readers outside a transaction get deep clones of the committed snapshot;
//! they never observe a partially applied mutation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use vigil_world::bounds;
use vigil_world::doc::{
    AgentMemory, ArchiveEntry, ChronicleRecord, FactionMemory, IdCounters, NoteEntry, WorldDoc,
};
use vigil_world::integrity::{self, IntegrityReport};
use vigil_world::{sanitize, Clock, SystemClock};

use crate::error::StoreError;
use crate::lock::FileLock;
use crate::ticket::TicketQueue;

/// Injectable fault points for persistence tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Fail after writing the temp file, before the rename.
    BeforeRename,
}

/// Options for a single transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactOptions {
    /// Dedup key. A transaction whose id was already processed is skipped.
    pub event_id: Option<String>,
    /// Persist to disk on commit. On by default; turning it off yields an
    /// in-memory-only commit used by derived-view refreshes.
    pub persist_disabled: bool,
}

impl TransactOptions {
    /// Options carrying an event id.
    #[must_use]
    pub fn with_event_id(event_id: impl Into<String>) -> Self {
        Self {
            event_id: Some(event_id.into()),
            persist_disabled: false,
        }
    }
}

/// Mutator verdict: commit the mutated clone, or discard it.
///
/// `Reject` is how validation failures uphold the bit-identical-precondition
/// contract: nothing persists, and the event id is *not* consumed, so a
/// corrected retry with the same id still runs.
#[derive(Debug)]
pub enum TxControl<R> {
    /// Persist the mutated clone and return the value.
    Commit(R),
    /// Discard the clone and return the value.
    Reject(R),
}

/// Result of a transaction.
#[derive(Debug)]
pub struct TxOutcome<R> {
    /// True when the event id was already processed and nothing ran.
    pub skipped: bool,
    /// The mutator's return value; `None` when skipped.
    pub result: Option<R>,
}

/// The durable world store.
pub struct WorldStore {
    path: PathBuf,
    queue: TicketQueue,
    committed: Mutex<WorldDoc>,
    clock: Arc<dyn Clock>,
    fault: Mutex<Option<FaultPoint>>,
}

impl std::fmt::Debug for WorldStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl WorldStore {
    /// Open a store over `path` with the system clock.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Open a store over `path` with an injected clock.
    pub fn open_with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let committed = load_or_fresh(&path);
        Self {
            path,
            queue: TicketQueue::default(),
            committed: Mutex::new(committed),
            clock,
            fault: Mutex::new(None),
        }
    }

    /// World file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Arm a one-shot persistence fault. Test instrumentation; also wired to
    /// the engine's `--simulate-crash` flag.
    pub fn arm_fault(&self, point: FaultPoint) {
        *lock_ignore_poison(&self.fault) = Some(point);
    }

    /// Deep clone of the committed document.
    #[must_use]
    pub fn snapshot(&self) -> WorldDoc {
        lock_ignore_poison(&self.committed).clone()
    }

    /// The committed world state.
    #[must_use]
    pub fn recall_world(&self) -> vigil_world::doc::WorldState {
        lock_ignore_poison(&self.committed).world.clone()
    }

    /// The committed memory for one agent, if present.
    #[must_use]
    pub fn recall_agent(&self, name: &str) -> Option<AgentMemory> {
        lock_ignore_poison(&self.committed).agents.get(name).cloned()
    }

    /// The committed memory for one faction, if present.
    #[must_use]
    pub fn recall_faction(&self, name: &str) -> Option<FactionMemory> {
        lock_ignore_poison(&self.committed)
            .factions
            .get(name)
            .cloned()
    }

    /// Whether `event_id` is in the committed dedup ring.
    #[must_use]
    pub fn has_processed_event(&self, event_id: &str) -> bool {
        lock_ignore_poison(&self.committed)
            .world
            .processed_event_ids
            .iter()
            .any(|id| id == event_id)
    }

    /// Sweep the committed snapshot for invariant violations.
    #[must_use]
    pub fn validate_memory_integrity(&self) -> IntegrityReport {
        integrity::check(&lock_ignore_poison(&self.committed))
    }

    /// Run `mutator` under the transaction protocol documented on this
    /// module.
    pub fn transact<R>(
        &self,
        opts: TransactOptions,
        mutator: impl FnOnce(&mut WorldDoc) -> TxControl<R>,
    ) -> Result<TxOutcome<R>, StoreError> {
        let _turn = self.queue.enter();
        let _lock = FileLock::acquire(&self.path)?;

        // Single source of truth: the file, not our cache. Publish the
        // reload so readers see other writers' commits even when this
        // transaction ends up skipped or rejected.
        let working = load_or_fresh(&self.path);
        *lock_ignore_poison(&self.committed) = working.clone();

        if let Some(event_id) = &opts.event_id {
            if working
                .world
                .processed_event_ids
                .iter()
                .any(|id| id == event_id)
            {
                debug!(event_id, "transaction skipped: event already processed");
                return Ok(TxOutcome {
                    skipped: true,
                    result: None,
                });
            }
        }

        let mut clone = working.clone();
        match mutator(&mut clone) {
            TxControl::Reject(result) => Ok(TxOutcome {
                skipped: false,
                result: Some(result),
            }),
            TxControl::Commit(result) => {
                if let Some(event_id) = opts.event_id {
                    clone.world.processed_event_ids.push(event_id);
                    bounds::cap_newest(
                        &mut clone.world.processed_event_ids,
                        bounds::MAX_PROCESSED_EVENT_IDS,
                    );
                }
                if !opts.persist_disabled {
                    self.persist(&clone)?;
                }
                *lock_ignore_poison(&self.committed) = clone;
                Ok(TxOutcome {
                    skipped: false,
                    result: Some(result),
                })
            }
        }
    }

    /// Append a note to an agent's memory. Creates the agent when absent.
    pub fn remember_agent(
        &self,
        name: &str,
        entry: &str,
        important: bool,
        event_id: Option<String>,
    ) -> Result<TxOutcome<()>, StoreError> {
        let name = valid_name(name)?;
        let entry = valid_entry(entry)?;
        let at = self.clock.now_rfc3339();
        self.transact(
            TransactOptions {
                event_id,
                persist_disabled: false,
            },
            move |doc| {
                let agent = doc.agents.entry(name).or_default();
                let note = NoteEntry {
                    at,
                    text: entry,
                    important,
                };
                if important {
                    push_note(&mut agent.long_notes, &mut agent.archive, note, bounds::MAX_LONG_NOTES);
                } else {
                    push_note(
                        &mut agent.short_notes,
                        &mut agent.archive,
                        note,
                        bounds::MAX_SHORT_NOTES,
                    );
                }
                TxControl::Commit(())
            },
        )
    }

    /// Append a note to a faction's memory. Creates the faction when absent.
    pub fn remember_faction(
        &self,
        name: &str,
        entry: &str,
        event_id: Option<String>,
    ) -> Result<TxOutcome<()>, StoreError> {
        let name = valid_name(name)?;
        let entry = valid_entry(entry)?;
        let at = self.clock.now_rfc3339();
        self.transact(
            TransactOptions {
                event_id,
                persist_disabled: false,
            },
            move |doc| {
                let faction = doc.factions.entry(name).or_default();
                let note = NoteEntry {
                    at,
                    text: entry,
                    important: false,
                };
                push_note(
                    &mut faction.long_notes,
                    &mut faction.archive,
                    note,
                    bounds::MAX_LONG_NOTES,
                );
                TxControl::Commit(())
            },
        )
    }

    /// Append a world-level note to the chronicle.
    pub fn remember_world(
        &self,
        entry: &str,
        important: bool,
        event_id: Option<String>,
    ) -> Result<TxOutcome<()>, StoreError> {
        let entry = valid_entry(entry)?;
        let at = self.clock.now_millis();
        self.transact(
            TransactOptions {
                event_id,
                persist_disabled: false,
            },
            move |doc| {
                let record_id = IdCounters::take(&mut doc.world.ids.chronicle);
                doc.world.chronicle.push(ChronicleRecord {
                    record_id,
                    source_id: None,
                    town_id: None,
                    faction_id: None,
                    at,
                    kind: if important { "milestone" } else { "note" }.to_owned(),
                    msg: entry,
                    meta: None,
                });
                bounds::cap_newest(&mut doc.world.chronicle, bounds::MAX_CHRONICLE);
                TxControl::Commit(())
            },
        )
    }

    fn persist(&self, doc: &WorldDoc) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(StoreError::Serialize)?;
        let tmp = self.temp_path();
        fs::write(&tmp, &bytes).map_err(|source| StoreError::WriteFailed {
            context: "write",
            source,
        })?;

        if lock_ignore_poison(&self.fault).take() == Some(FaultPoint::BeforeRename) {
            remove_quiet(&tmp);
            return Err(StoreError::SimulatedCrash);
        }

        if let Err(source) = fs::rename(&tmp, &self.path) {
            remove_quiet(&tmp);
            return Err(StoreError::WriteFailed {
                context: "rename",
                source,
            });
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut os = self.path.as_os_str().to_owned();
        os.push(format!(
            ".{}.{}.tmp",
            std::process::id(),
            self.clock.now_millis()
        ));
        PathBuf::from(os)
    }
}

fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn remove_quiet(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), %err, "failed to remove temp file");
    }
}

fn valid_name(name: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput("name must be non-empty".to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn valid_entry(entry: &str) -> Result<String, StoreError> {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput(
            "entry must be non-empty".to_owned(),
        ));
    }
    Ok(trimmed.to_owned())
}

fn push_note(
    notes: &mut Vec<NoteEntry>,
    archive: &mut Vec<ArchiveEntry>,
    note: NoteEntry,
    cap: usize,
) {
    notes.push(note);
    while notes.len() > cap {
        let rotated = notes.remove(0);
        archive.push(ArchiveEntry {
            at: rotated.at,
            text: rotated.text,
        });
    }
    bounds::cap_newest(archive, bounds::MAX_ARCHIVE);
}

/// Load the world document from `path`, falling back to the fresh shape on
/// a missing or malformed file. Never fails.
#[must_use]
pub fn load_or_fresh(path: &Path) -> WorldDoc {
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => sanitize(&value),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    %err,
                    "world file unparseable; starting from fresh shape"
                );
                WorldDoc::fresh()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => WorldDoc::fresh(),
        Err(err) => {
            warn!(
                path = %path.display(),
                %err,
                "world file unreadable; starting from fresh shape"
            );
            WorldDoc::fresh()
        }
    }
}
