//! Identifiers used throughout the kernel.
//!
//! The kernel addresses services by an opaque string (`ServiceId`), never by
//! Rust's `TypeId` — that is the whole point of treating the reflection
//! mechanism abstractly (see `prototype.rs`). `ClassId` is the identity of a
//! concrete Rust type that knows how to describe and construct itself.

use std::fmt;
use std::sync::Arc;

/// An opaque identifier for a service binding.
///
/// Typically a class/interface name, but may equally be an alias registered
/// with [`crate::DefinitionStore::alias`]. Two `ServiceId`s are equal iff
/// their string representations are equal.
#[derive(Clone, Eq, PartialOrd, Ord)]
pub struct ServiceId(Arc<str>);

impl ServiceId {
    /// Build a `ServiceId` from any string-like value.
    #[inline]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ServiceId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&ServiceId> for ServiceId {
    fn from(s: &ServiceId) -> Self {
        s.clone()
    }
}

impl PartialEq for ServiceId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl std::hash::Hash for ServiceId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (*self.0).hash(state);
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceId({:?})", self.0)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a concrete, describable Rust type.
///
/// Always the fully-qualified type name (`std::any::type_name`). Used to
/// look up cached [`crate::prototype::ServicePrototype`]s and to attribute
/// instantiation/injection errors to a concrete class rather than an
/// abstract id.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub &'static str);

impl ClassId {
    /// The `ClassId` of a describable Rust type.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>())
    }

    /// The last path segment of the type name (`"crate::module::Foo"` ->
    /// `"Foo"`). Used by the engine's autowiring fallback to match a bare
    /// service id against a registered class by its conventional short
    /// name, without requiring an explicit [`crate::definition::ServiceDefinition`].
    #[inline]
    pub fn short_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
