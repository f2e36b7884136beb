//! Lifecycle strategies: how a [`crate::definition::Lifetime`] decides
//! whether to reuse a cached instance or build a fresh one.
//!
//! Three strategies, each responsible only for caching policy — construction
//! itself is always delegated to the same closure, so a strategy never knows
//! *how* to build a service, only *when* a previously built one may be
//! reused.

use crate::error::Result;
use crate::id::ServiceId;
use crate::scope::ScopeRegistry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::sync::Arc;

type Instance = Arc<dyn Any + Send + Sync>;
/// Builds a fresh instance. Invoked at most once per singleton, at most
/// once per scope for a scoped service, and exactly once per call for a
/// transient one.
type Builder<'a> = dyn FnOnce() -> Result<Instance> + 'a;

/// Single-flight, container-lifetime cache of singleton instances, keyed by
/// abstract id. Mirrors [`crate::prototype_cache::PrototypeCache`]'s
/// `OnceCell`-in-`DashMap` pattern: cheap to hold many slots, single-flight
/// per key under concurrent first access.
#[derive(Clone, Default)]
pub struct SingletonCache {
    entries: Arc<DashMap<ServiceId, Arc<OnceCell<Instance>>, ahash::RandomState>>,
}

impl SingletonCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::with_hasher(ahash::RandomState::new())),
        }
    }

    /// Returns the cached/built instance plus whether `build` actually ran,
    /// so a caller can tell a cache hit from a fresh construction without a
    /// second map lookup.
    fn get_or_try_init(&self, id: &ServiceId, build: impl FnOnce() -> Result<Instance>) -> Result<(Instance, bool)> {
        let slot = self
            .entries
            .entry(id.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let built = std::cell::Cell::new(false);
        let instance = slot.get_or_try_init(|| {
            built.set(true);
            build()
        })?;
        Ok((instance.clone(), built.get()))
    }
}

/// The outcome of a [`LifecycleStrategy::resolve`] call: whether the
/// instance came from cache (`Hit`) or was just constructed (`Built`). The
/// engine needs this to know whether it may skip re-running injection and
/// jump straight to diagnostics, or must drive the pipeline through the
/// construction/injection stages it just ran.
pub enum Resolved {
    Hit(Instance),
    Built(Instance),
}

impl Resolved {
    pub fn into_instance(self) -> Instance {
        match self {
            Resolved::Hit(instance) | Resolved::Built(instance) => instance,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Resolved::Hit(_))
    }
}

/// Decides whether a resolution reuses a cached instance or invokes
/// `build`.
pub trait LifecycleStrategy: Send + Sync {
    fn resolve(
        &self,
        id: &ServiceId,
        scopes: &ScopeRegistry,
        build: Box<Builder<'_>>,
    ) -> Result<Resolved>;
}

/// One instance for the whole container's lifetime.
pub struct SingletonStrategy {
    cache: SingletonCache,
}

impl SingletonStrategy {
    pub fn new(cache: SingletonCache) -> Self {
        Self { cache }
    }
}

impl LifecycleStrategy for SingletonStrategy {
    fn resolve(&self, id: &ServiceId, _scopes: &ScopeRegistry, build: Box<Builder<'_>>) -> Result<Resolved> {
        let (instance, built) = self.cache.get_or_try_init(id, build)?;
        Ok(if built { Resolved::Built(instance) } else { Resolved::Hit(instance) })
    }
}

/// One instance per active scope frame; a fresh one each time a new scope is
/// entered.
pub struct ScopedStrategy;

impl LifecycleStrategy for ScopedStrategy {
    fn resolve(&self, id: &ServiceId, scopes: &ScopeRegistry, build: Box<Builder<'_>>) -> Result<Resolved> {
        if let Some(existing) = scopes.get(id) {
            return Ok(Resolved::Hit(existing));
        }
        let instance = build()?;
        scopes.put(id.clone(), instance.clone())?;
        Ok(Resolved::Built(instance))
    }
}

/// A fresh instance every time, never cached.
pub struct TransientStrategy;

impl LifecycleStrategy for TransientStrategy {
    fn resolve(&self, _id: &ServiceId, _scopes: &ScopeRegistry, build: Box<Builder<'_>>) -> Result<Resolved> {
        Ok(Resolved::Built(build()?))
    }
}
