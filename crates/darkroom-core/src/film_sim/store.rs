//! Bounded, least-recently-used cache of loaded CLUTs.
//!
//! Each path owns a slot holding a `OnceLock` with the load result:
//!
//! ```text
//! Unloaded ──get_or_load──▶ Loading ──▶ Ready(Arc<Clut>)
//!                                   └─▶ Failed(Arc<ClutError>)
//! ```
//!
//! Failures are cached like successes, so a broken file is not re-read
//! until its slot is evicted or the store is cleared. The map is guarded by
//! a mutex held only for bookkeeping; files are read outside it, and
//! concurrent requests for the same path block on the slot's `OnceLock`
//! instead of loading twice.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::ClutError;
use crate::film_sim::clut::{Clut, ClutParamDescriptor};

/// Outcome of a load, shared by every requester.
pub type ClutResult = Result<Arc<Clut>, Arc<ClutError>>;

/// Lifecycle of one cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClutState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

/// Hit and miss counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Parameters a CLUT exposes. `ok` is false when the CLUT failed to load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParamDescriptors {
    pub ok: bool,
    pub params: Vec<ClutParamDescriptor>,
}

struct Slot {
    cell: Arc<OnceLock<ClutResult>>,
    last_used: u64,
}

impl Slot {
    fn state(&self) -> ClutState {
        match self.cell.get() {
            None => ClutState::Loading,
            Some(Ok(_)) => ClutState::Ready,
            Some(Err(_)) => ClutState::Failed,
        }
    }
}

#[derive(Default)]
struct Slots {
    map: HashMap<PathBuf, Slot>,
    tick: u64,
}

impl Slots {
    fn least_recent(&self) -> Option<PathBuf> {
        self.map
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(path, _)| path.clone())
    }
}

/// CLUT cache owned by the pipeline.
pub struct ClutStore {
    capacity: usize,
    slots: Mutex<Slots>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ClutStore {
    /// Store holding at most `capacity` CLUTs (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            slots: Mutex::new(Slots::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached CLUT for `path`, loading it on a miss.
    pub fn get_or_load(&self, path: &Path) -> ClutResult {
        let cell = {
            let mut slots = self.slots.lock();
            slots.tick += 1;
            let tick = slots.tick;

            if let Some(slot) = slots.map.get_mut(path) {
                slot.last_used = tick;
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(path = %path.display(), "CLUT cache hit");
                Arc::clone(&slot.cell)
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let cell = Arc::new(OnceLock::new());
                slots.map.insert(
                    path.to_path_buf(),
                    Slot {
                        cell: Arc::clone(&cell),
                        last_used: tick,
                    },
                );
                while slots.map.len() > self.capacity {
                    let Some(victim) = slots.least_recent() else {
                        break;
                    };
                    slots.map.remove(&victim);
                    tracing::debug!(path = %victim.display(), "CLUT evicted");
                }
                cell
            }
        };

        cell.get_or_init(|| load(path)).clone()
    }

    /// Lifecycle state of `path`.
    pub fn state(&self, path: &Path) -> ClutState {
        self.slots
            .lock()
            .map
            .get(path)
            .map_or(ClutState::Unloaded, Slot::state)
    }

    /// Drop the least recently used slot, returning its path.
    pub fn evict_lru(&self) -> Option<PathBuf> {
        let mut slots = self.slots.lock();
        let victim = slots.least_recent()?;
        slots.map.remove(&victim);
        Some(victim)
    }

    /// Drop every slot. CLUTs still referenced elsewhere stay alive.
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        if !slots.map.is_empty() {
            tracing::debug!(count = slots.map.len(), "CLUT cache cleared");
        }
        slots.map.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Parameters declared by the CLUT at `path`. Never fails.
    pub fn param_descriptors(&self, path: &Path) -> ParamDescriptors {
        match self.get_or_load(path) {
            Ok(clut) => ParamDescriptors {
                ok: true,
                params: clut.params().to_vec(),
            },
            Err(_) => ParamDescriptors::default(),
        }
    }
}

impl Default for ClutStore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl std::fmt::Debug for ClutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClutStore")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

fn load(path: &Path) -> ClutResult {
    match Clut::load(path) {
        Ok(clut) => {
            tracing::info!(
                path = %path.display(),
                name = clut.name(),
                size = clut.lut().size(),
                params = clut.params().len(),
                "CLUT loaded"
            );
            Ok(Arc::new(clut))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "CLUT load failed");
            Err(Arc::new(e))
        }
    }
}
