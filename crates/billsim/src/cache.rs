//! Two-tier snapshot cache: an in-memory map with an approximate byte
//! budget over a directory of one-file-per-key snapshot blobs.
//!
//! Reads touch memory first, fall back to disk, and hydrate memory on a
//! disk hit. Disk writes are atomic (tmp + rename). Corrupt or
//! version-mismatched entries are treated as misses, logged, and removed.

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use billsim_core::snapshot::{BalanceSnapshot, CACHE_VERSION};
use jiff::civil::Date;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::storage::atomic_write;

const DEFAULT_MEMORY_BUDGET_MB: usize = 64;

struct CacheSlot {
    snapshot: Arc<BalanceSnapshot>,
    size: usize,
    last_used: AtomicU64,
}

struct MemoryTier {
    slots: FxHashMap<String, CacheSlot>,
    used_bytes: usize,
    tick: u64,
}

pub struct SnapshotCache {
    dir: PathBuf,
    budget_bytes: usize,
    memory: RwLock<MemoryTier>,
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        Self::with_budget(dir, DEFAULT_MEMORY_BUDGET_MB)
    }

    pub fn with_budget(dir: impl Into<PathBuf>, budget_mb: usize) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(SnapshotCache {
            dir,
            budget_bytes: budget_mb.saturating_mul(1024 * 1024),
            memory: RwLock::new(MemoryTier {
                slots: FxHashMap::default(),
                used_bytes: 0,
                tick: 0,
            }),
        })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Look up a snapshot. Disk hits hydrate the memory tier.
    pub fn get(&self, key: &str) -> Option<Arc<BalanceSnapshot>> {
        {
            let memory = match self.memory.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(slot) = memory.slots.get(key) {
                slot.last_used.store(memory.tick + 1, Ordering::Relaxed);
                return Some(Arc::clone(&slot.snapshot));
            }
        }

        let path = self.file_path(key);
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice::<BalanceSnapshot>(&bytes) {
            Ok(snapshot) if snapshot.cache_version == CACHE_VERSION => {
                let snapshot = Arc::new(snapshot);
                self.insert_memory(key, Arc::clone(&snapshot), bytes.len());
                Some(snapshot)
            }
            Ok(stale) => {
                tracing::warn!(
                    "snapshot {key} has cache version {} (want {CACHE_VERSION}); dropping",
                    stale.cache_version
                );
                let _ = fs::remove_file(&path);
                None
            }
            Err(err) => {
                tracing::warn!("snapshot {key} is corrupt ({err}); treating as miss");
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    /// Store a snapshot in both tiers.
    pub fn put(&self, key: &str, snapshot: BalanceSnapshot) -> Result<()> {
        let bytes = serde_json::to_vec(&snapshot)?;
        atomic_write(&self.file_path(key), &bytes)?;
        self.insert_memory(key, Arc::new(snapshot), bytes.len());
        Ok(())
    }

    fn insert_memory(&self, key: &str, snapshot: Arc<BalanceSnapshot>, size: usize) {
        let mut memory = match self.memory.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        memory.tick += 1;
        let tick = memory.tick;
        if let Some(old) = memory.slots.insert(
            key.to_string(),
            CacheSlot {
                snapshot,
                size,
                last_used: AtomicU64::new(tick),
            },
        ) {
            memory.used_bytes = memory.used_bytes.saturating_sub(old.size);
        }
        memory.used_bytes += size;

        // Evict least-recently-used slots until the budget holds.
        while memory.used_bytes > self.budget_bytes {
            let Some(oldest) = memory
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used.load(Ordering::Relaxed))
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            if let Some(evicted) = memory.slots.remove(&oldest) {
                memory.used_bytes = memory.used_bytes.saturating_sub(evicted.size);
            }
        }
    }

    /// Drop every cached snapshot dated at or after `date` (both tiers).
    /// CRUD mutations call this with the first affected date.
    pub fn invalidate_from(&self, date: Date) {
        {
            let mut memory = match self.memory.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let doomed: Vec<String> = memory
                .slots
                .iter()
                .filter(|(_, slot)| slot.snapshot.date >= date)
                .map(|(k, _)| k.clone())
                .collect();
            for key in doomed {
                if let Some(evicted) = memory.slots.remove(&key) {
                    memory.used_bytes = memory.used_bytes.saturating_sub(evicted.size);
                }
            }
        }

        // Disk tier: parse each blob just far enough to learn its date;
        // anything unreadable goes too.
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let drop = match fs::read(&path)
                .ok()
                .and_then(|bytes| serde_json::from_slice::<BalanceSnapshot>(&bytes).ok())
            {
                Some(snapshot) => snapshot.date >= date,
                None => true,
            };
            if drop {
                let _ = fs::remove_file(&path);
            }
        }
    }

    /// Blanket clear of both tiers (the manual reset endpoint).
    pub fn clear(&self) {
        {
            let mut memory = match self.memory.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            memory.slots.clear();
            memory.used_bytes = 0;
        }
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.is_file() {
                    let _ = fs::remove_file(&path);
                }
            }
        }
    }

    /// Number of snapshots resident in memory.
    pub fn memory_len(&self) -> usize {
        match self.memory.read() {
            Ok(guard) => guard.slots.len(),
            Err(poisoned) => poisoned.into_inner().slots.len(),
        }
    }
}
