//! The public-facing façade: `Container` wraps an [`Engine`] and exposes
//! registration (`bind`, `singleton`/`scoped`/`transient`, `instance`,
//! `alias`), resolution (`get`, `has`, `make`, `call`), scoping
//! (`begin_scope`/`end_scope`/`terminate`), and diagnostics (`find_by_tag`,
//! `inspect_injection`).
//!
//! An `Arc`-shared, `Clone`-able handle with an `AtomicBool`-backed lock and
//! a batch-registration escape hatch. Bindings key off the abstract
//! [`ServiceId`] string rather than a `TypeId`, so there is no thread-local
//! hot cache here — a `TypeId` is a fixed-size, `Copy` key a direct-mapped
//! cache can slot cheaply, but a `ServiceId` is a hashed string, and
//! `Engine`'s `dashmap`-backed caches already give it the same amortized
//! cost without a second cache layer.

use crate::definition::{Concrete, Lifetime, ServiceDefinition};
use crate::engine::{Engine, Inspection};
use crate::error::Result;
use crate::id::ClassId;
use crate::id::ServiceId;
use crate::prototype::{Describable, MethodPrototype};
use crate::value::{ArgumentValue, ConstructorArgs, ResolvedValue};
use std::any::Any;
use std::sync::Arc;

/// A dependency-injection container: the top-level entry point for binding
/// abstract service ids to concrete implementations and resolving them.
///
/// Cheap to clone — every clone shares the same underlying [`Engine`], so
/// handing a `Container` to a collaborator does not copy any registered
/// state.
///
/// # Examples
///
/// ```rust
/// use container_kernel::{Container, Describable};
/// use container_kernel::prototype::ServicePrototype;
/// use container_kernel::value::ConstructorArgs;
/// use container_kernel::error::Result;
///
/// struct Clock;
///
/// impl Describable for Clock {
///     fn service_prototype() -> ServicePrototype {
///         ServicePrototype::trivial(container_kernel::id::ClassId::of::<Clock>())
///     }
///
///     fn construct(_args: ConstructorArgs) -> Result<Self> {
///         Ok(Clock)
///     }
/// }
///
/// let container = Container::new();
/// container.singleton::<Clock>("Clock").unwrap();
/// let clock = container.get("Clock").unwrap();
/// assert!(clock.downcast_ref::<Clock>().is_some());
/// ```
#[derive(Clone)]
pub struct Container {
    engine: Engine,
}

impl Container {
    /// Create a new, empty container with the default recursion bound
    /// (`crate::context::DEFAULT_MAX_DEPTH`).
    #[inline]
    pub fn new() -> Self {
        Self {
            engine: Engine::new(),
        }
    }

    /// Override the recursion bound a runaway autowire chain is allowed to
    /// reach before it is reported as [`crate::error::ContainerError::CircularDependency`]
    /// even without a literal cycle.
    #[inline]
    pub fn with_max_depth(self, max_depth: usize) -> Self {
        Self {
            engine: self.engine.with_max_depth(max_depth),
        }
    }

    /// Register a describable Rust type's structural shape so `bind`/
    /// `singleton`/`scoped`/`transient` can name it as a concrete class.
    /// Must be called once per type before any definition referencing it is
    /// resolved — typically from `bind(..).to::<T>()`, which calls this for
    /// you.
    #[inline]
    pub fn register_class<T: Describable>(&self) {
        self.engine.register_class::<T>();
    }

    /// Begin building a binding for `id`. Every builder method upserts the
    /// definition immediately, so the builder can be dropped after any
    /// prefix of the chain and the binding still takes effect.
    #[inline]
    pub fn bind(&self, id: impl Into<ServiceId>) -> BindingBuilder<'_> {
        BindingBuilder {
            container: self,
            definition: ServiceDefinition::new(id, Concrete::None, Lifetime::Transient),
        }
    }

    /// Register `T` as a singleton under `id`: one instance for the whole
    /// container's lifetime.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// container.singleton::<Database>("Database").unwrap();
    /// ```
    #[inline]
    pub fn singleton<T: Describable>(&self, id: impl Into<ServiceId>) -> Result<()> {
        self.bind(id).to::<T>().singleton().commit()
    }

    /// Register `T` as scoped under `id`: one instance per active scope
    /// frame.
    #[inline]
    pub fn scoped<T: Describable>(&self, id: impl Into<ServiceId>) -> Result<()> {
        self.bind(id).to::<T>().scoped().commit()
    }

    /// Register `T` as transient under `id`: a fresh instance on every
    /// resolution.
    #[inline]
    pub fn transient<T: Describable>(&self, id: impl Into<ServiceId>) -> Result<()> {
        self.bind(id).to::<T>().transient().commit()
    }

    /// Register a pre-built value as a singleton under `id`.
    ///
    /// Implemented as a singleton-lifetime factory that hands back the same
    /// `Arc` every time — the container's `SingletonCache` already gives
    /// single-flight, build-once semantics, so there is nothing extra to do
    /// to make this behave like every other singleton.
    pub fn instance<T: Send + Sync + 'static>(&self, id: impl Into<ServiceId>, value: T) -> Result<()> {
        let value = Arc::new(value) as Arc<dyn Any + Send + Sync>;
        self.bind(id)
            .to_factory(move |_ctx| Ok(value.clone()))
            .singleton()
            .commit()
    }

    /// Register `alias` as another name for `target`.
    #[inline]
    pub fn alias(&self, alias: impl Into<ServiceId>, target: impl Into<ServiceId>) -> Result<()> {
        self.engine.definitions().alias(alias, target)
    }

    /// Resolve `id`, constructing and injecting it if necessary.
    #[inline]
    pub fn get(&self, id: impl Into<ServiceId>) -> Result<ResolvedValue> {
        self.engine.resolve(&id.into())
    }

    /// `true` if a definition (or alias resolving to one) exists for `id`.
    /// Does not attempt resolution.
    #[inline]
    pub fn has(&self, id: impl Into<ServiceId>) -> bool {
        self.engine.definitions().has(&id.into())
    }

    /// Like [`Container::get`] but with per-call constructor argument
    /// overrides. The override is not cached: a subsequent plain `get` sees
    /// the registered arguments again.
    #[inline]
    pub fn make(&self, id: impl Into<ServiceId>, overrides: Vec<ArgumentValue>) -> Result<ResolvedValue> {
        self.engine.make(&id.into(), &overrides)
    }

    /// Invoke `invoke` with its parameters resolved the same way a
    /// constructor's are. `prototype` describes `invoke`'s expected
    /// parameter list in order; there is no id or registered definition
    /// involved, so nothing here is cached.
    #[inline]
    pub fn call<R>(
        &self,
        prototype: &MethodPrototype,
        overrides: Vec<ArgumentValue>,
        invoke: impl FnOnce(ConstructorArgs) -> Result<R>,
    ) -> Result<R> {
        self.engine.call(prototype, &overrides, invoke)
    }

    /// Push a new, empty scope frame. Scoped definitions resolved after this
    /// call and before the matching [`Container::end_scope`] share one
    /// instance per abstract id.
    #[inline]
    pub fn begin_scope(&self) {
        self.engine.scopes().begin_scope();
    }

    /// Pop the innermost scope frame, discarding every scoped instance
    /// cached in it.
    #[inline]
    pub fn end_scope(&self) -> Result<()> {
        self.engine.scopes().end_scope()
    }

    /// Discard every active scope frame at once — used to recover from a
    /// resolution failure that unwound past a `begin_scope`/`end_scope`
    /// bracket, or to reset the container between test cases.
    #[inline]
    pub fn terminate(&self) {
        self.engine.scopes().terminate();
    }

    /// All service ids registered under `tag`, in registration order. Returns
    /// the ids themselves rather than resolved instances, so the caller can
    /// choose `get` or `make` per entry.
    #[inline]
    pub fn find_by_tag(&self, tag: &str) -> Vec<ServiceId> {
        self.engine.definitions().find_by_tag(tag)
    }

    /// Resolve `id` and return the full trace alongside the outcome,
    /// whether or not resolution succeeded. Takes an abstract id rather than
    /// an already-constructed object since this kernel has no reflective
    /// access to an arbitrary instance's dependency graph after the fact.
    #[inline]
    pub fn inspect_injection(&self, id: impl Into<ServiceId>) -> Inspection {
        self.engine.inspect(&id.into())
    }

    /// Freeze the definition store: further `bind`/`alias` calls fail with
    /// [`crate::error::ContainerError::StoreLocked`]. Idempotent.
    #[inline]
    pub fn lock(&self) {
        self.engine.definitions().lock();
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.engine.definitions().is_locked()
    }

    /// Register several bindings under a single closure. Plain ergonomics —
    /// see [`BatchBinder`].
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// container.batch(|b| {
    ///     b.singleton::<Database>("Database")?;
    ///     b.singleton::<Cache>("Cache")?;
    ///     Ok(())
    /// }).unwrap();
    /// ```
    pub fn batch(&self, register: impl FnOnce(&BatchBinder) -> Result<()>) -> Result<()> {
        self.engine.definitions().batch(|_| register(&BatchBinder { container: self }))
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("locked", &self.is_locked())
            .field("scope_depth", &self.engine.scopes().depth())
            .finish()
    }
}

/// Handed to the closure passed to [`Container::batch`]; a thin wrapper
/// around `&Container` so callers inside the batch use the same
/// `singleton`/`scoped`/`transient`/`bind` vocabulary as everywhere else,
/// without being able to call [`Container::lock`]/[`Container::terminate`]
/// mid-batch.
pub struct BatchBinder<'c> {
    container: &'c Container,
}

impl<'c> BatchBinder<'c> {
    #[inline]
    pub fn bind(&self, id: impl Into<ServiceId>) -> BindingBuilder<'c> {
        self.container.bind(id)
    }

    #[inline]
    pub fn singleton<T: Describable>(&self, id: impl Into<ServiceId>) -> Result<()> {
        self.container.singleton::<T>(id)
    }

    #[inline]
    pub fn scoped<T: Describable>(&self, id: impl Into<ServiceId>) -> Result<()> {
        self.container.scoped::<T>(id)
    }

    #[inline]
    pub fn transient<T: Describable>(&self, id: impl Into<ServiceId>) -> Result<()> {
        self.container.transient::<T>(id)
    }

    #[inline]
    pub fn instance<T: Send + Sync + 'static>(&self, id: impl Into<ServiceId>, value: T) -> Result<()> {
        self.container.instance(id, value)
    }
}

/// Fluent builder over one [`ServiceDefinition`], returned by
/// [`Container::bind`]: `to(concrete)` · `tag(name|names)` ·
/// `with_argument(value)` · `with_arguments(values)`.
///
/// This kernel's constructor arguments are positional (matched to
/// `ServicePrototype::constructor`'s parameter order by the
/// `DependencyResolver`, not by name), so `withArgument`/`withArguments`
/// here append/replace the positional argument list rather than keying by
/// parameter name — the same simplification `instantiate.rs` already makes.
///
/// Every method commits the definition to the `DefinitionStore`
/// immediately, so a builder chain can be interrupted (or just not awaited
/// to the end) and whatever was configured so far still takes effect.
pub struct BindingBuilder<'c> {
    container: &'c Container,
    definition: ServiceDefinition,
}

impl<'c> BindingBuilder<'c> {
    /// Bind to a registered describable class. Registers `T`'s descriptor
    /// with the engine if it has not been seen before.
    pub fn to<T: Describable>(mut self) -> Self {
        self.container.register_class::<T>();
        self.definition.concrete = Concrete::Class(ClassId::of::<T>());
        self.commit_and_continue()
    }

    /// Bind to a user-supplied factory closure instead of a registered
    /// class. The closure receives the active [`crate::context::ResolutionContext`]
    /// so it can recurse into the container for its own dependencies.
    pub fn to_factory(
        mut self,
        factory: impl Fn(&mut crate::context::ResolutionContext) -> Result<ResolvedValue> + Send + Sync + 'static,
    ) -> Self {
        self.definition.concrete = Concrete::Factory(Arc::new(factory));
        self.commit_and_continue()
    }

    #[inline]
    pub fn singleton(mut self) -> Self {
        self.definition.lifetime = Lifetime::Singleton;
        self.commit_and_continue()
    }

    #[inline]
    pub fn scoped(mut self) -> Self {
        self.definition.lifetime = Lifetime::Scoped;
        self.commit_and_continue()
    }

    #[inline]
    pub fn transient(mut self) -> Self {
        self.definition.lifetime = Lifetime::Transient;
        self.commit_and_continue()
    }

    /// Attach one tag, for later [`Container::find_by_tag`] lookups.
    pub fn tag(mut self, name: impl Into<String>) -> Self {
        self.definition.tags.push(name.into());
        self.commit_and_continue()
    }

    /// Attach several tags at once.
    pub fn tags(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.definition.tags.extend(names.into_iter().map(Into::into));
        self.commit_and_continue()
    }

    /// Append one positional constructor argument override.
    pub fn with_argument(mut self, value: ArgumentValue) -> Self {
        self.definition.arguments.push(value);
        self.commit_and_continue()
    }

    /// Replace the whole positional constructor argument list.
    pub fn with_arguments(mut self, values: Vec<ArgumentValue>) -> Self {
        self.definition.arguments = values;
        self.commit_and_continue()
    }

    /// Explicitly commit and consume the builder, surfacing any
    /// [`crate::error::ContainerError::StoreLocked`] the implicit per-method
    /// commits would otherwise have swallowed.
    pub fn commit(self) -> Result<()> {
        self.container.engine.definitions().add(self.definition)
    }

    fn commit_and_continue(self) -> Self {
        let _ = self.container.engine.definitions().add(self.definition.clone());
        self
    }
}
