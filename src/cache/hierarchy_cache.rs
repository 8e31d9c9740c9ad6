//! Build-once cache of point hierarchies keyed by identifier.
//!
//! Many shading threads ask for the same few point clouds. The first caller
//! for an identifier builds the tree; concurrent callers for the same
//! identifier block on that build, callers for other identifiers proceed in
//! parallel. The map lock is only held to look up or insert a slot, never
//! while loading or building.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::core::config::OctreeConfig;
use crate::core::error::LoadFailure;
use crate::hierarchy::{OctreeBuilder, PointOctree};
use crate::ingest::SurfelSource;

/// Outcome of the one build attempt for an identifier
pub type CacheResult = Result<Arc<PointOctree>, LoadFailure>;

type Slot = OnceLock<CacheResult>;

/// Counters for cache activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from an existing entry
    pub hits: usize,
    /// Build attempts, successful or not
    pub builds: usize,
    /// Build attempts that produced a [`LoadFailure`]
    pub failures: usize,
}

/// Process-wide store of built hierarchies.
///
/// Successful trees are shared as `Arc<PointOctree>`; a failed load is
/// recorded and handed to every later caller until the entry is evicted.
pub struct HierarchyCache<S> {
    source: S,
    config: OctreeConfig,
    entries: RwLock<HashMap<String, Arc<Slot>>>,
    hits: AtomicUsize,
    builds: AtomicUsize,
    failures: AtomicUsize,
}

impl<S: SurfelSource> HierarchyCache<S> {
    pub fn new(source: S, config: OctreeConfig) -> Self {
        Self {
            source,
            config,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            builds: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Get the hierarchy for `identifier`, building it on first use.
    ///
    /// Exactly one build runs per identifier; every caller receives the same
    /// `Arc` or a clone of the same recorded failure.
    pub fn find(&self, identifier: &str) -> CacheResult {
        let slot = self.slot(identifier);

        let mut built = false;
        let result = slot.get_or_init(|| {
            built = true;
            self.build(identifier)
        });

        if !built {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Hierarchy cache hit: {}", identifier);
        }
        result.clone()
    }

    /// Drop the entry for `identifier`, successful or failed.
    ///
    /// Callers holding the tree keep it alive; the next `find` rebuilds.
    /// Returns true if an entry was present.
    pub fn evict(&self, identifier: &str) -> bool {
        let removed = self.write_entries().remove(identifier).is_some();
        if removed {
            log::debug!("Evicted hierarchy: {}", identifier);
        }
        removed
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.write_entries().clear();
    }

    /// Number of entries (including ones still building or failed)
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.read_entries().contains_key(identifier)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Existing slot for `identifier`, or a fresh one inserted under the write lock.
    fn slot(&self, identifier: &str) -> Arc<Slot> {
        if let Some(slot) = self.read_entries().get(identifier) {
            return Arc::clone(slot);
        }
        let mut entries = self.write_entries();
        Arc::clone(entries.entry(identifier.to_string()).or_default())
    }

    fn build(&self, identifier: &str) -> CacheResult {
        self.builds.fetch_add(1, Ordering::Relaxed);
        log::debug!("Hierarchy cache miss, building: {}", identifier);

        let builder = OctreeBuilder::new(self.config);
        let result = self.source
            .load(identifier)
            .and_then(|surfels| builder.build(&surfels));

        match result {
            Ok(tree) => Ok(Arc::new(tree)),
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let failure = LoadFailure::new(identifier, e);
                log::warn!("{}", failure);
                Err(failure)
            }
        }
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Slot>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Slot>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
