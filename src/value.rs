//! The dynamic, tagged-variant value type used for default arguments,
//! overrides, and resolved constructor/property values.
//!
//! Overrides need a tagged variant rather than dynamic typing: `any` becomes
//! `ArgumentValue`, a `{literal, lazy thunk, service reference}` enum.
//! `ResolvedValue` is what a value becomes once the kernel has actually
//! produced an instance for it (always boxed, type-erased, ready for a
//! `Describable::construct` cursor to downcast).

use crate::id::ServiceId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A value supplied at registration time (`ServiceDefinition::arguments`,
/// `ParameterPrototype::default`) or at call time (`make`'s overrides map).
#[derive(Clone)]
pub enum ArgumentValue {
    /// A concrete, already-constructed value, type-erased and cloneable via
    /// `Arc`.
    Literal(Arc<dyn Any + Send + Sync>),
    /// A reference to another service — resolved recursively through the
    /// container under a child `ResolutionContext`.
    Reference(ServiceId),
    /// A thunk evaluated (once, via the `Lazy` marker's identity-stable
    /// cache) the first time the value is actually needed.
    Lazy(Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>),
}

impl ArgumentValue {
    /// Wrap a concrete value as a `Literal`.
    pub fn literal<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Literal(Arc::new(value))
    }

    /// Build a `Reference` to another abstract id.
    pub fn reference(id: impl Into<ServiceId>) -> Self {
        Self::Reference(id.into())
    }

    /// Build a `Lazy` thunk.
    pub fn lazy<T, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(move || Arc::new(f()) as Arc<dyn Any + Send + Sync>))
    }
}

impl fmt::Debug for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(_) => write!(f, "ArgumentValue::Literal(..)"),
            Self::Reference(id) => write!(f, "ArgumentValue::Reference({id})"),
            Self::Lazy(_) => write!(f, "ArgumentValue::Lazy(..)"),
        }
    }
}

/// A fully-resolved, type-erased value ready to be downcast by generated
/// `Describable::construct`/`inject_properties`/`inject_methods` code.
pub type ResolvedValue = Arc<dyn Any + Send + Sync>;

/// An ordered cursor over resolved constructor arguments.
///
/// `Describable::construct` implementations (hand-written or derive-macro
/// generated) pull arguments off the front in prototype order and downcast
/// each to the expected field type.
pub struct ConstructorArgs {
    values: std::collections::VecDeque<ResolvedValue>,
}

impl ConstructorArgs {
    pub fn new(values: Vec<ResolvedValue>) -> Self {
        Self {
            values: values.into(),
        }
    }

    /// Take the next argument and downcast it to `T`.
    ///
    /// Returns `None` if the cursor is exhausted or the stored value is not
    /// actually a `T` — both indicate a bug in the prototype/resolver
    /// pairing rather than a user error, since the resolver is responsible
    /// for producing values whose dynamic type matches the prototype.
    pub fn take<T: Send + Sync + 'static>(&mut self) -> Option<T>
    where
        T: Clone,
    {
        let value = self.values.pop_front()?;
        value.downcast_ref::<T>().cloned()
    }

    /// Take the next argument as a shared `Arc<T>` without cloning `T`
    /// itself — the common case for service references.
    pub fn take_arc<T: Send + Sync + 'static>(&mut self) -> Option<Arc<T>> {
        let value = self.values.pop_front()?;
        value.downcast::<T>().ok()
    }

    /// Remaining, unconsumed arguments — used by variadic parameters, which
    /// collect everything left in the cursor.
    pub fn take_rest(&mut self) -> Vec<ResolvedValue> {
        self.values.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolved values for injectable properties, keyed by property name.
#[derive(Default)]
pub struct PropertyArgs {
    values: std::collections::HashMap<String, ResolvedValue>,
}

impl PropertyArgs {
    pub fn new(values: std::collections::HashMap<String, ResolvedValue>) -> Self {
        Self { values }
    }

    pub fn take_arc<T: Send + Sync + 'static>(&mut self, name: &str) -> Option<Arc<T>> {
        self.values.remove(name)?.downcast::<T>().ok()
    }
}
