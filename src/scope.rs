//! Scope management: the LIFO stack of scope frames that back
//! [`crate::definition::Lifetime::Scoped`] instances.
//!
//! `ScopeRegistry` holds per-scope instance caches and exposes
//! `begin_scope`/`end_scope`/`terminate`. A scope stack is inherently a
//! single-writer, ordered
//! structure — pushing and popping must be strictly nested — which is why
//! this uses `parking_lot::Mutex` around a `Vec` rather than `dashmap`
//! (`DashMap`'s independence-of-shards model has no notion of "top of
//! stack").

use crate::error::{ContainerError, Result};
use crate::id::ServiceId;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

type CachedInstance = Arc<dyn Any + Send + Sync>;

/// A single nested scope's instance cache.
#[derive(Default)]
struct ScopeFrame {
    instances: HashMap<ServiceId, CachedInstance>,
}

/// Owns the LIFO stack of active scope frames.
///
/// Cloning shares the same stack (it's an `Arc<Mutex<..>>` underneath),
/// matching how the `Engine`/`Container` facade hand copies of the registry
/// to resolution contexts without needing a shared reference threaded
/// through every call.
#[derive(Clone)]
pub struct ScopeRegistry {
    frames: Arc<Mutex<Vec<ScopeFrame>>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self {
            frames: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Push a new, empty scope frame.
    pub fn begin_scope(&self) {
        self.frames.lock().push(ScopeFrame::default());
    }

    /// Pop the innermost scope frame, discarding every instance cached in
    /// it. Fails with [`ContainerError::NoActiveScope`] if no scope is
    /// active.
    pub fn end_scope(&self) -> Result<()> {
        let mut frames = self.frames.lock();
        if frames.pop().is_none() {
            return Err(ContainerError::NoActiveScope);
        }
        Ok(())
    }

    /// Pop every active scope frame, discarding all scoped instances. Used
    /// when tearing down the whole container or recovering from an unwound
    /// error that skipped `end_scope`.
    pub fn terminate(&self) {
        self.frames.lock().clear();
    }

    pub fn depth(&self) -> usize {
        self.frames.lock().len()
    }

    /// Fetch a previously cached scoped instance, if one exists in the
    /// innermost active frame.
    pub fn get(&self, id: &ServiceId) -> Option<CachedInstance> {
        let frames = self.frames.lock();
        frames.last()?.instances.get(id).cloned()
    }

    /// Cache `instance` under `id` in the innermost active frame. Fails if
    /// no scope is active — a scoped definition resolved outside any scope
    /// is a caller error, not something the registry should silently paper
    /// over by falling back to a synthetic scope.
    pub fn put(&self, id: ServiceId, instance: CachedInstance) -> Result<()> {
        let mut frames = self.frames.lock();
        let frame = frames.last_mut().ok_or(ContainerError::NoActiveScope)?;
        frame.instances.insert(id, instance);
        Ok(())
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_without_active_scope_fails() {
        let registry = ScopeRegistry::new();
        let err = registry
            .put(ServiceId::from("RequestContext"), Arc::new(1i32))
            .unwrap_err();
        assert!(matches!(err, ContainerError::NoActiveScope));
    }

    #[test]
    fn scoped_instance_survives_within_scope_and_vanishes_after() {
        let registry = ScopeRegistry::new();
        registry.begin_scope();
        registry
            .put(ServiceId::from("RequestContext"), Arc::new(42i32))
            .unwrap();
        assert!(registry.get(&ServiceId::from("RequestContext")).is_some());
        registry.end_scope().unwrap();
        assert!(registry.get(&ServiceId::from("RequestContext")).is_none());
    }

    #[test]
    fn nested_scopes_isolate_instances() {
        let registry = ScopeRegistry::new();
        registry.begin_scope();
        registry
            .put(ServiceId::from("X"), Arc::new(1i32))
            .unwrap();
        registry.begin_scope();
        assert!(registry.get(&ServiceId::from("X")).is_none());
        registry.end_scope().unwrap();
        assert!(registry.get(&ServiceId::from("X")).is_some());
        registry.end_scope().unwrap();
    }

    #[test]
    fn end_scope_without_active_scope_errors() {
        let registry = ScopeRegistry::new();
        assert!(matches!(
            registry.end_scope().unwrap_err(),
            ContainerError::NoActiveScope
        ));
    }

    #[test]
    fn terminate_clears_all_frames() {
        let registry = ScopeRegistry::new();
        registry.begin_scope();
        registry.begin_scope();
        assert_eq!(registry.depth(), 2);
        registry.terminate();
        assert_eq!(registry.depth(), 0);
    }
}
