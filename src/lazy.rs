//! Identity-stable lazy value markers.
//!
//! Lazy markers evaluate at most once and are thereafter stable — repeated
//! forcing must return the same instance, not re-run the thunk. Injected as
//! a constructor/property argument in place of the eagerly-resolved value;
//! the describable type's `construct`/`inject_properties` decides when (or
//! whether) to force it.

use crate::value::ResolvedValue;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased, single-flight lazy value.
///
/// Cloning a `Lazy` shares the same underlying cell — forcing a clone forces
/// the original too, and vice versa.
#[derive(Clone)]
pub struct Lazy {
    cell: Arc<OnceCell<ResolvedValue>>,
    init: Arc<Mutex<Option<Box<dyn FnOnce() -> ResolvedValue + Send>>>>,
}

impl Lazy {
    pub fn new(f: impl FnOnce() -> ResolvedValue + Send + 'static) -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            init: Arc::new(Mutex::new(Some(Box::new(f)))),
        }
    }

    /// Evaluate the thunk on first call; every subsequent call (including
    /// from clones) returns the same `Arc` without re-running it.
    pub fn force(&self) -> ResolvedValue {
        self.cell
            .get_or_init(|| {
                let thunk = self
                    .init
                    .lock()
                    .take()
                    .expect("Lazy forced concurrently with a racing initializer");
                thunk()
            })
            .clone()
    }

    /// Force and downcast to a concrete type in one step.
    pub fn force_as<T: Any + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.force().downcast::<T>().ok()
    }

    pub fn is_forced(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("forced", &self.is_forced())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn forces_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let lazy = Lazy::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            Arc::new(5i32) as ResolvedValue
        });
        assert!(!lazy.is_forced());
        let a = lazy.force();
        let b = lazy.force();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn force_as_downcasts() {
        let lazy = Lazy::new(|| Arc::new("hello".to_string()) as ResolvedValue);
        let value = lazy.force_as::<String>().unwrap();
        assert_eq!(*value, "hello");
    }

    #[test]
    fn clones_share_identity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let lazy = Lazy::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            Arc::new(1i32) as ResolvedValue
        });
        let clone = lazy.clone();
        lazy.force();
        clone.force();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
