// ── Bounded change log ──
//
// Ring of the most recent power transitions, oldest evicted first.
// Optionally mirrored to a JSON file that is loaded on open and
// rewritten after every mutation. The snapshot is taken under the entry
// lock and written after releasing it; a write older than the one on disk
// is dropped. A failed write is logged and the in-memory log stays
// authoritative.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::ChangeLogEntry;

/// Maximum number of retained entries.
pub const CHANGE_LOG_CAPACITY: usize = 100;

/// Receiver of transitions produced by the change detector.
pub trait ChangeLogSink: Send + Sync {
    /// Record one entry, enforcing the capacity.
    fn append(&self, entry: ChangeLogEntry);
}

/// In-memory change log with optional file persistence.
pub struct ChangeLog {
    entries: Mutex<VecDeque<ChangeLogEntry>>,
    path: Option<PathBuf>,
    capacity: usize,
    /// Bumped under the entry lock for every snapshot taken.
    generation: AtomicU64,
    /// Generation of the snapshot currently on disk.
    written: Mutex<u64>,
}

impl Default for ChangeLog {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ChangeLog {
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(CHANGE_LOG_CAPACITY)),
            path: None,
            capacity: CHANGE_LOG_CAPACITY,
            generation: AtomicU64::new(0),
            written: Mutex::new(0),
        }
    }

    /// Open a file-backed log. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let mut entries: VecDeque<ChangeLogEntry> = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => VecDeque::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| CoreError::Persistence {
                message: format!("{}: {e}", path.display()),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
            Err(e) => {
                return Err(CoreError::Persistence {
                    message: format!("{}: {e}", path.display()),
                });
            }
        };
        while entries.len() > CHANGE_LOG_CAPACITY {
            entries.pop_front();
        }
        debug!(path = %path.display(), count = entries.len(), "loaded change log");

        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
            capacity: CHANGE_LOG_CAPACITY,
            generation: AtomicU64::new(0),
            written: Mutex::new(0),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<ChangeLogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.lock().iter().filter(|e| !e.read).count()
    }

    /// Mark one entry read. Returns `false` for an unknown id.
    pub fn mark_read(&self, id: Uuid) -> bool {
        self.mutate(|entries| {
            entries
                .iter_mut()
                .find(|e| e.id == id)
                .map(|e| e.read = true)
                .is_some()
        })
    }

    pub fn mark_all_read(&self) {
        self.mutate(|entries| entries.iter_mut().for_each(|e| e.read = true));
    }

    pub fn clear(&self) {
        self.mutate(VecDeque::clear);
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ChangeLogEntry>> {
        // A panic while holding the lock cannot leave the deque invalid.
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut VecDeque<ChangeLogEntry>) -> R) -> R {
        let (result, snapshot) = {
            let mut entries = self.lock();
            let result = f(&mut entries);
            (result, self.snapshot(&entries))
        };
        if let Some((generation, json)) = snapshot {
            self.persist(generation, &json);
        }
        result
    }

    /// Serialize the current entries for the file, tagged with a generation.
    fn snapshot(&self, entries: &VecDeque<ChangeLogEntry>) -> Option<(u64, String)> {
        let path = self.path.as_ref()?;
        match serde_json::to_string_pretty(entries) {
            Ok(json) => Some((self.generation.fetch_add(1, Ordering::Relaxed) + 1, json)),
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to serialize change log");
                None
            }
        }
    }

    fn persist(&self, generation: u64, json: &str) {
        let Some(path) = &self.path else {
            return;
        };
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if *written >= generation {
            trace!(generation, on_disk = *written, "skipping stale change log write");
            return;
        }
        match std::fs::write(path, json) {
            Ok(()) => *written = generation,
            Err(error) => warn!(path = %path.display(), %error, "failed to persist change log"),
        }
    }
}

impl ChangeLogSink for ChangeLog {
    fn append(&self, entry: ChangeLogEntry) {
        let capacity = self.capacity;
        self.mutate(|entries| {
            entries.push_back(entry);
            while entries.len() > capacity {
                entries.pop_front();
            }
        });
    }
}
