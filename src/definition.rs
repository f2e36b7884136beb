//! The definition store: what the container knows about a service before
//! anything is ever resolved.
//!
//! `DefinitionStore` holds one `ServiceDefinition` per abstract id, a tag
//! index, and alias resolution, conventionally frozen after the
//! configuration phase. That convention becomes an opt-in runtime-enforced
//! `lock()`/`is_locked()` pair, turning a documented invariant into a
//! checkable one.

use crate::error::{ContainerError, Result};
use crate::id::{ClassId, ServiceId};
use crate::value::ArgumentValue;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How long an instance produced for this definition lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// One instance for the lifetime of the container.
    Singleton,
    /// One instance per active scope frame.
    Scoped,
    /// A fresh instance on every resolution.
    Transient,
}

/// What a definition actually produces.
#[derive(Clone)]
pub enum Concrete {
    /// Build via a registered `ClassId`'s descriptor.
    Class(ClassId),
    /// Build via a user-supplied factory closure.
    Factory(Arc<dyn Fn(&mut crate::context::ResolutionContext) -> Result<Arc<dyn std::any::Any + Send + Sync>> + Send + Sync>),
    /// No construction logic of its own — an alias must resolve to another
    /// id, never to `Concrete::None` directly.
    None,
}

/// A fully registered binding: what to build, how long it lives, explicit
/// constructor argument overrides, and the tags it was registered under.
#[derive(Clone)]
pub struct ServiceDefinition {
    pub id: ServiceId,
    pub concrete: Concrete,
    pub lifetime: Lifetime,
    pub arguments: Vec<ArgumentValue>,
    pub tags: Vec<String>,
}

impl ServiceDefinition {
    pub fn new(id: impl Into<ServiceId>, concrete: Concrete, lifetime: Lifetime) -> Self {
        Self {
            id: id.into(),
            concrete,
            lifetime,
            arguments: Vec::new(),
            tags: Vec::new(),
        }
    }
}

/// Holds every registered [`ServiceDefinition`], the tag → ids index, and
/// alias → canonical-id mappings.
///
/// Lock-free reads via `dashmap`, so definition lookups never block each
/// other. `lock()` freezes the store
/// against further `add`/`alias`/`add_tags` calls; reads remain unaffected.
#[derive(Clone)]
pub struct DefinitionStore {
    definitions: Arc<DashMap<ServiceId, ServiceDefinition, ahash::RandomState>>,
    aliases: Arc<DashMap<ServiceId, ServiceId, ahash::RandomState>>,
    tags: Arc<DashMap<String, Vec<ServiceId>, ahash::RandomState>>,
    locked: Arc<AtomicBool>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self {
            definitions: Arc::new(DashMap::with_hasher(ahash::RandomState::new())),
            aliases: Arc::new(DashMap::with_hasher(ahash::RandomState::new())),
            tags: Arc::new(DashMap::with_hasher(ahash::RandomState::new())),
            locked: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Freeze the store: further `add`/`alias`/`add_tags` calls fail with
    /// [`ContainerError::StoreLocked`]. Idempotent.
    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.is_locked() {
            Err(ContainerError::StoreLocked)
        } else {
            Ok(())
        }
    }

    /// Register or replace a definition. Replacing an existing id is legal
    /// (later registrations win) — there is no "definition already exists"
    /// error in this kernel.
    pub fn add(&self, definition: ServiceDefinition) -> Result<()> {
        self.check_unlocked()?;
        if !definition.tags.is_empty() {
            self.index_tags(&definition.id, &definition.tags);
        }
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Register many definitions under a single conceptual batch. `dashmap`
    /// shards already make per-key inserts cheap, so this exists purely for
    /// ergonomics — registering a related group of bindings in one call —
    /// and to give callers a single point to check `is_locked()` against
    /// before doing any work.
    pub fn batch(&self, register: impl FnOnce(&DefinitionStore) -> Result<()>) -> Result<()> {
        self.check_unlocked()?;
        register(self)
    }

    pub fn get(&self, id: &ServiceId) -> Option<ServiceDefinition> {
        let canonical = self.resolve_alias(id);
        self.definitions.get(&canonical).map(|entry| entry.clone())
    }

    pub fn has(&self, id: &ServiceId) -> bool {
        let canonical = self.resolve_alias(id);
        self.definitions.contains_key(&canonical)
    }

    /// Register `alias` as another name for `target`. Aliases chain through
    /// `resolve_alias` but do not themselves require `target` to already
    /// exist, tolerating registration in either order.
    pub fn alias(&self, alias: impl Into<ServiceId>, target: impl Into<ServiceId>) -> Result<()> {
        self.check_unlocked()?;
        self.aliases.insert(alias.into(), target.into());
        Ok(())
    }

    /// Follow alias chains to the canonical id. Bounded to 32 hops to avoid
    /// spinning forever on an accidental alias cycle; beyond that the
    /// original id is returned as-is and the subsequent `get`/`has` will
    /// simply report not-found.
    fn resolve_alias(&self, id: &ServiceId) -> ServiceId {
        let mut current = id.clone();
        for _ in 0..32 {
            match self.aliases.get(&current) {
                Some(target) => current = target.clone(),
                None => return current,
            }
        }
        current
    }

    fn index_tags(&self, id: &ServiceId, new_tags: &[String]) {
        for tag in new_tags {
            let mut entry = self.tags.entry(tag.clone()).or_default();
            if !entry.contains(id) {
                entry.push(id.clone());
            }
        }
    }

    /// Attach additional tags to an already-registered definition.
    pub fn add_tags(&self, id: &ServiceId, new_tags: &[String]) -> Result<()> {
        self.check_unlocked()?;
        let canonical = self.resolve_alias(id);
        if let Some(mut def) = self.definitions.get_mut(&canonical) {
            for tag in new_tags {
                if !def.tags.contains(tag) {
                    def.tags.push(tag.clone());
                }
            }
        }
        self.index_tags(&canonical, new_tags);
        Ok(())
    }

    /// All service ids registered under `tag`, in registration order.
    pub fn find_by_tag(&self, tag: &str) -> Vec<ServiceId> {
        self.tags
            .get(tag)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_get_roundtrips() {
        let store = DefinitionStore::new();
        store
            .add(ServiceDefinition::new(
                "Logger",
                Concrete::Class(ClassId("Logger")),
                Lifetime::Singleton,
            ))
            .unwrap();
        assert!(store.has(&ServiceId::from("Logger")));
        assert_eq!(store.get(&ServiceId::from("Logger")).unwrap().id, ServiceId::from("Logger"));
    }

    #[test]
    fn alias_resolves_to_canonical() {
        let store = DefinitionStore::new();
        store
            .add(ServiceDefinition::new(
                "Logger",
                Concrete::Class(ClassId("Logger")),
                Lifetime::Singleton,
            ))
            .unwrap();
        store.alias("Log", "Logger").unwrap();
        assert!(store.has(&ServiceId::from("Log")));
        assert_eq!(store.get(&ServiceId::from("Log")).unwrap().id, ServiceId::from("Logger"));
    }

    #[test]
    fn locked_store_rejects_new_bindings() {
        let store = DefinitionStore::new();
        store.lock();
        let err = store
            .add(ServiceDefinition::new(
                "Logger",
                Concrete::Class(ClassId("Logger")),
                Lifetime::Singleton,
            ))
            .unwrap_err();
        assert!(matches!(err, ContainerError::StoreLocked));
    }

    #[test]
    fn find_by_tag_collects_registration_order() {
        let store = DefinitionStore::new();
        let mut a = ServiceDefinition::new("A", Concrete::Class(ClassId("A")), Lifetime::Transient);
        a.tags.push("handler".to_string());
        let mut b = ServiceDefinition::new("B", Concrete::Class(ClassId("B")), Lifetime::Transient);
        b.tags.push("handler".to_string());
        store.add(a).unwrap();
        store.add(b).unwrap();
        assert_eq!(
            store.find_by_tag("handler"),
            vec![ServiceId::from("A"), ServiceId::from("B")]
        );
    }
}
