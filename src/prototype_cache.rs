//! Single-flight, permanent cache of [`ServicePrototype`]s keyed by
//! [`ClassId`].
//!
//! A class's structural prototype is computed at most once and shared by
//! every subsequent resolution, even under concurrent first access.
//! `dashmap` gives the kernel "many readers, exclusive writer per shard"
//! behavior; `once_cell`'s `OnceCell` (one per class, itself stored in the
//! map) gives single-flight construction — the second concurrent caller for
//! an as-yet-uncached class blocks on the first caller's in-progress
//! analysis rather than redoing it.

use crate::id::ClassId;
use crate::prototype::{ClassDescriptor, PrototypeAnalyzer, ServicePrototype};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Caches [`ServicePrototype`]s by [`ClassId`]. Cheap to clone (an `Arc`
/// around the shared map); intended to be held once per `Engine`.
#[derive(Clone, Default)]
pub struct PrototypeCache {
    entries: Arc<DashMap<ClassId, Arc<OnceCell<ServicePrototype>>, ahash::RandomState>>,
    analyzer: PrototypeAnalyzer,
}

impl PrototypeCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::with_hasher(ahash::RandomState::new())),
            analyzer: PrototypeAnalyzer::new(),
        }
    }

    /// Fetch the cached prototype for `descriptor.class_id`, building it on
    /// first access. Concurrent calls for the same class id share a single
    /// analysis: the slot's `OnceCell` is obtained from the map eagerly and
    /// then initialized outside the map's per-shard lock, so the expensive
    /// part (the analyzer call) never holds the map lock.
    pub fn get_or_create(&self, descriptor: &ClassDescriptor) -> ServicePrototype {
        let slot = self
            .entries
            .entry(descriptor.class_id)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        slot.get_or_init(|| self.analyzer.analyze(descriptor)).clone()
    }

    /// `true` if a prototype for `class_id` has already been computed.
    pub fn contains(&self, class_id: ClassId) -> bool {
        self.entries
            .get(&class_id)
            .map(|slot| slot.get().is_some())
            .unwrap_or(false)
    }

    /// Number of distinct classes with a cached prototype (including slots
    /// currently being initialized by another thread).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
