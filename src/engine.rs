//! The engine: dispatches one resolution request through the full
//! pipeline, owning every other module's shared state.
//!
//! The `Engine` is the single entry point tying `DefinitionStore`,
//! `PrototypeCache`, `ScopeRegistry`, the lifecycle strategies,
//! `DependencyResolver`, `Instantiator`, and `PropertyInjector`/
//! `MethodInjector` together through the resolution pipeline. `Container`
//! (in `container.rs`) is the public-facing facade; this module is where
//! the actual dispatch happens.

use crate::context::{ResolutionContext, DEFAULT_MAX_DEPTH};
use crate::definition::{Concrete, DefinitionStore, Lifetime, ServiceDefinition};
use crate::error::{ContainerError, Result};
use crate::id::{ClassId, ServiceId};
use crate::inject::{MethodInjector, PropertyInjector};
use crate::instantiate::Instantiator;
use crate::pipeline::Pipeline;
use crate::prototype::{ClassDescriptor, Describable, MethodPrototype};
use crate::prototype_cache::PrototypeCache;
use crate::resolver::DependencyResolver;
use crate::scope::ScopeRegistry;
use crate::strategy::{LifecycleStrategy, Resolved, ScopedStrategy, SingletonCache, SingletonStrategy, TransientStrategy};
use crate::telemetry::{Stage, TelemetryCollector, Trace};
use crate::value::{ArgumentValue, ConstructorArgs, ResolvedValue};
use dashmap::DashMap;
use std::sync::Arc;

/// The outcome of `Engine::inspect`: a resolution attempt plus the full
/// trace collected along the way, regardless of whether it succeeded.
pub struct Inspection {
    pub outcome: Result<ResolvedValue>,
    pub trace: Trace,
}

/// Owns every shared kernel component and dispatches resolution requests
/// through the canonical pipeline.
#[derive(Clone)]
pub struct Engine {
    definitions: DefinitionStore,
    classes: Arc<DashMap<ClassId, Arc<ClassDescriptor>, ahash::RandomState>>,
    prototypes: PrototypeCache,
    singletons: SingletonCache,
    scopes: ScopeRegistry,
    instantiator: Arc<Instantiator>,
    property_injector: Arc<PropertyInjector>,
    method_injector: Arc<MethodInjector>,
    max_depth: usize,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            definitions: DefinitionStore::new(),
            classes: Arc::new(DashMap::with_hasher(ahash::RandomState::new())),
            prototypes: PrototypeCache::new(),
            singletons: SingletonCache::new(),
            scopes: ScopeRegistry::new(),
            instantiator: Arc::new(Instantiator::new()),
            property_injector: Arc::new(PropertyInjector::new()),
            method_injector: Arc::new(MethodInjector::new()),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn definitions(&self) -> &DefinitionStore {
        &self.definitions
    }

    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    /// Register a describable Rust type so the engine can build it once a
    /// [`crate::definition::ServiceDefinition`] names its [`ClassId`].
    /// Idempotent — registering the same type twice replaces its descriptor
    /// with an equivalent one.
    pub fn register_class<T: Describable>(&self) {
        #[cfg(feature = "logging")]
        tracing::debug!(class = %ClassId::of::<T>(), "registering describable class");
        self.classes
            .insert(ClassId::of::<T>(), Arc::new(ClassDescriptor::of::<T>()));
    }

    fn descriptor_for(&self, class_id: ClassId) -> Option<Arc<ClassDescriptor>> {
        self.classes.get(&class_id).map(|entry| entry.clone())
    }

    /// Autowiring fallback: when no explicit `ServiceDefinition` was ever
    /// registered for `id`, but exactly one known class's short type name
    /// equals `id`, treat it as an implicit transient binding to that class.
    /// Any `Describable` type registered via `register_class` is
    /// automatically injectable this way, without a matching `bind`/
    /// `singleton`/`scoped`/`transient` call.
    fn autowire_definition(&self, id: &ServiceId) -> Option<ServiceDefinition> {
        self.classes
            .iter()
            .find(|entry| entry.key().short_name() == id.as_str())
            .map(|entry| ServiceDefinition::new(id.clone(), Concrete::Class(*entry.key()), Lifetime::Transient))
    }

    /// Top-level resolution entry point. Builds a fresh ancestor chain and
    /// telemetry collector, runs the canonical seven-stage pipeline, and
    /// returns the resolved, type-erased instance.
    pub fn resolve(&self, id: &ServiceId) -> Result<ResolvedValue> {
        let mut ctx = ResolutionContext::new(self.max_depth);
        let mut telemetry = TelemetryCollector::new();
        self.resolve_internal(id, &[], &mut ctx, &mut telemetry)
    }

    /// Like [`Engine::resolve`] but with call-time constructor argument
    /// overrides for the top-level id.
    pub fn make(&self, id: &ServiceId, overrides: &[ArgumentValue]) -> Result<ResolvedValue> {
        let mut ctx = ResolutionContext::new(self.max_depth);
        let mut telemetry = TelemetryCollector::new();
        self.resolve_internal(id, overrides, &mut ctx, &mut telemetry)
    }

    /// Resolve `id` and return the full trace alongside the outcome,
    /// whether or not resolution succeeded.
    pub fn inspect(&self, id: &ServiceId) -> Inspection {
        let mut ctx = ResolutionContext::new(self.max_depth);
        let mut telemetry = TelemetryCollector::new();
        let outcome = self.resolve_internal(id, &[], &mut ctx, &mut telemetry);
        Inspection {
            outcome,
            trace: telemetry.into_trace(),
        }
    }

    /// Invoke an arbitrary callable described by a [`MethodPrototype`],
    /// resolving its parameters the same way a constructor's are resolved.
    /// `invoke` receives the resolved arguments as a [`ConstructorArgs`]
    /// cursor in prototype order; there is no registered class or
    /// definition involved, so nothing here is cached.
    pub fn call<R>(
        &self,
        prototype: &MethodPrototype,
        overrides: &[ArgumentValue],
        invoke: impl FnOnce(ConstructorArgs) -> Result<R>,
    ) -> Result<R> {
        let mut ctx = ResolutionContext::new(self.max_depth);
        let mut telemetry = TelemetryCollector::new();
        let resolver = DependencyResolver::new();
        let owner = ClassId("<call target>");

        let mut resolved = Vec::with_capacity(prototype.parameters.len());
        for (index, param) in prototype.parameters.iter().enumerate() {
            if param.is_variadic {
                let rest: Vec<ResolvedValue> = overrides
                    .get(index..)
                    .unwrap_or(&[])
                    .iter()
                    .map(|value| match value {
                        ArgumentValue::Literal(v) => Ok(v.clone()),
                        ArgumentValue::Reference(id) => {
                            self.resolve_internal(id, &[], &mut ctx, &mut telemetry)
                        }
                        ArgumentValue::Lazy(thunk) => {
                            let thunk = thunk.clone();
                            Ok(Arc::new(crate::lazy::Lazy::new(move || thunk())) as ResolvedValue)
                        }
                    })
                    .collect::<Result<_>>()?;
                resolved.push(Arc::new(rest) as ResolvedValue);
                continue;
            }

            let explicit = overrides.get(index);
            match resolver.resolve_parameter(param, owner, explicit, |type_name| {
                self.resolve_internal(&ServiceId::from(type_name), &[], &mut ctx, &mut telemetry)
            })? {
                Some(value) => resolved.push(value),
                None => resolved.push(Arc::new(()) as ResolvedValue),
            }
        }

        invoke(ConstructorArgs::new(resolved))
    }

    /// Runs the canonical seven-stage pipeline for one id, recursing into
    /// itself for every dependency it needs along the way. `ctx` and
    /// `telemetry` are shared across the whole top-level request, including
    /// every nested call this one makes.
    fn resolve_internal(
        &self,
        id: &ServiceId,
        call_overrides: &[ArgumentValue],
        ctx: &mut ResolutionContext,
        telemetry: &mut TelemetryCollector,
    ) -> Result<ResolvedValue> {
        let mut pipeline = Pipeline::new();

        let definition = pipeline.run_stage(Stage::DefinitionLookup, id, telemetry, || {
            self.definitions
                .get(id)
                .or_else(|| self.autowire_definition(id))
                .ok_or_else(|| ContainerError::ServiceNotFound {
                    service_id: id.clone(),
                })
        })?;

        pipeline.run_stage(Stage::CircularDependencyCheck, id, telemetry, || {
            if ctx.chain().contains(id) {
                let mut chain = ctx.chain().to_vec();
                chain.push(id.clone());
                return Err(ContainerError::CircularDependency { chain });
            }
            Ok(())
        })?;

        // `push`/`pop` rather than an RAII guard: the rest of this function
        // needs `ctx` back as a plain `&mut ResolutionContext` to recurse
        // into dependencies while this id is still logically "on the
        // stack" — a guard borrowing `ctx` for its own lifetime would make
        // that impossible. See `ResolutionContext::push`'s doc comment.
        ctx.push(id.clone())?;
        let outcome = self.resolve_body(id, &definition, call_overrides, &mut pipeline, ctx, telemetry);
        ctx.pop();
        outcome
    }

    /// Stages three through seven, run with `id` already pushed onto the
    /// ancestor chain. Split out of `resolve_internal` purely so the
    /// `ctx.pop()` that must run on every exit path reads as a single
    /// unconditional statement rather than being duplicated at each early
    /// return.
    fn resolve_body(
        &self,
        id: &ServiceId,
        definition: &crate::definition::ServiceDefinition,
        call_overrides: &[ArgumentValue],
        pipeline: &mut Pipeline,
        ctx: &mut ResolutionContext,
        telemetry: &mut TelemetryCollector,
    ) -> Result<ResolvedValue> {
        match &definition.concrete {
            Concrete::Factory(factory) => {
                pipeline.run_stage(Stage::AnalyzePrototype, id, telemetry, || Ok(()))?;
                pipeline.run_stage(Stage::Autowire, id, telemetry, || Ok(()))?;

                pipeline.begin_stage(Stage::ResolveInstance, id, telemetry)?;
                let resolved = self.build_via_lifetime(&definition.lifetime, id, || factory(ctx));
                match &resolved {
                    Ok(_) => pipeline.end_stage_ok(Stage::ResolveInstance, id, telemetry),
                    Err(err) => pipeline.end_stage_err(Stage::ResolveInstance, id, telemetry, err),
                }
                let built = resolved?.into_instance();

                // A user-supplied factory owns its own construction; there
                // is nothing left for the kernel to inject.
                pipeline.run_stage(Stage::InjectDependencies, id, telemetry, || Ok(()))?;
                pipeline.run_stage(Stage::CollectDiagnostics, id, telemetry, || Ok(()))?;
                pipeline.finish()?;
                Ok(built)
            }
            Concrete::Class(class_id) => {
                let class_id = *class_id;
                let descriptor = pipeline.run_stage(Stage::AnalyzePrototype, id, telemetry, || {
                    self.descriptor_for(class_id).ok_or(ContainerError::ClassNotInstantiable {
                        class_id,
                        service_id: id.clone(),
                    })
                })?;
                let prototype = self.prototypes.get_or_create(&descriptor);

                pipeline.run_stage(Stage::Autowire, id, telemetry, || {
                    if prototype.is_instantiable {
                        Ok(())
                    } else {
                        Err(ContainerError::ClassNotInstantiable {
                            class_id,
                            service_id: id.clone(),
                        })
                    }
                })?;

                pipeline.begin_stage(Stage::ResolveInstance, id, telemetry)?;
                // Construction and injection share one lifecycle-strategy
                // closure so a singleton's single-flight slot covers both —
                // a concurrent second resolve must never observe a built-
                // but-not-yet-injected instance. Each fallible step records
                // its own StepFailed before propagating, so the stage
                // attributed in telemetry always matches where it actually
                // failed rather than being pinned to ResolveInstance. On a
                // cache hit the closure below never runs at all, so neither
                // end_stage_ok(ResolveInstance) nor InjectDependencies fires
                // from inside it — the match on `resolved` below accounts
                // for that by driving the controller itself.
                let resolved = self.build_via_lifetime(&definition.lifetime, id, || {
                    let mut boxed = self
                        .instantiator
                        .instantiate(
                            &descriptor,
                            &prototype,
                            id,
                            &definition.arguments,
                            call_overrides,
                            |referenced| {
                                self.resolve_internal(&ServiceId::from(referenced), &[], ctx, telemetry)
                            },
                        )
                        .map_err(|err| {
                            pipeline.end_stage_err(Stage::ResolveInstance, id, telemetry, &err);
                            err
                        })?;
                    pipeline.end_stage_ok(Stage::ResolveInstance, id, telemetry);

                    pipeline.begin_stage(Stage::InjectDependencies, id, telemetry)?;
                    let inject_result = (|| -> Result<()> {
                        self.property_injector.inject(&descriptor, &prototype, &mut *boxed, |referenced| {
                            self.resolve_internal(&ServiceId::from(referenced), &[], ctx, telemetry)
                        })?;
                        self.method_injector.inject(&descriptor, &prototype, &mut *boxed, |referenced| {
                            self.resolve_internal(&ServiceId::from(referenced), &[], ctx, telemetry)
                        })?;
                        Ok(())
                    })();
                    match inject_result {
                        Ok(()) => {
                            pipeline.end_stage_ok(Stage::InjectDependencies, id, telemetry);
                            Ok(Arc::from(boxed) as ResolvedValue)
                        }
                        Err(err) => {
                            pipeline.end_stage_err(Stage::InjectDependencies, id, telemetry, &err);
                            Err(err)
                        }
                    }
                })?;

                // A cache hit never ran the closure above, so ResolveInstance
                // was never marked complete and InjectDependencies never ran.
                // Record the former here; the latter is legitimately skipped —
                // CollectDiagnostics may follow ResolveInstance directly.
                if resolved.is_hit() {
                    pipeline.end_stage_ok(Stage::ResolveInstance, id, telemetry);
                }
                let built = resolved.into_instance();

                pipeline.run_stage(Stage::CollectDiagnostics, id, telemetry, || Ok(()))?;
                pipeline.finish()?;
                Ok(built)
            }
            Concrete::None => Err(ContainerError::ServiceNotFound {
                service_id: id.clone(),
            }),
        }
    }

    fn build_via_lifetime(
        &self,
        lifetime: &Lifetime,
        id: &ServiceId,
        build: impl FnOnce() -> Result<ResolvedValue>,
    ) -> Result<Resolved> {
        let body: Box<dyn FnOnce() -> Result<ResolvedValue>> = Box::new(build);
        match lifetime {
            Lifetime::Singleton => {
                SingletonStrategy::new(self.singletons.clone()).resolve(id, &self.scopes, body)
            }
            Lifetime::Scoped => ScopedStrategy.resolve(id, &self.scopes, body),
            Lifetime::Transient => TransientStrategy.resolve(id, &self.scopes, body),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ServiceDefinition;
    use crate::prototype::{ParameterPrototype, ServicePrototype};
    use crate::value::ConstructorArgs;

    struct Leaf;

    impl Describable for Leaf {
        fn service_prototype() -> ServicePrototype {
            ServicePrototype::trivial(ClassId::of::<Leaf>())
        }

        fn construct(_args: ConstructorArgs) -> Result<Self> {
            Ok(Leaf)
        }
    }

    struct Branch {
        #[allow(dead_code)]
        leaf: Arc<Leaf>,
    }

    impl Describable for Branch {
        fn service_prototype() -> ServicePrototype {
            let mut prototype = ServicePrototype::trivial(ClassId::of::<Branch>());
            prototype.constructor = Some(crate::prototype::MethodPrototype::new(
                "new",
                vec![ParameterPrototype::required_named("leaf", "Leaf")],
            ));
            prototype
        }

        fn construct(mut args: ConstructorArgs) -> Result<Self> {
            let leaf = args.take_arc::<Leaf>().expect("leaf argument");
            Ok(Branch { leaf })
        }
    }

    fn engine_with_leaf_and_branch() -> Engine {
        let engine = Engine::new();
        engine.register_class::<Leaf>();
        engine.register_class::<Branch>();
        engine
            .definitions()
            .add(ServiceDefinition::new(
                "Leaf",
                Concrete::Class(ClassId::of::<Leaf>()),
                Lifetime::Singleton,
            ))
            .unwrap();
        engine
            .definitions()
            .add(ServiceDefinition::new(
                "Branch",
                Concrete::Class(ClassId::of::<Branch>()),
                Lifetime::Transient,
            ))
            .unwrap();
        engine
    }

    #[test]
    fn resolves_autowired_dependency_chain() {
        let engine = engine_with_leaf_and_branch();
        let resolved = engine.resolve(&ServiceId::from("Branch")).unwrap();
        assert!(resolved.downcast_ref::<Branch>().is_some());
    }

    #[test]
    fn singleton_shares_identity_across_resolves() {
        let engine = engine_with_leaf_and_branch();
        let a = engine.resolve(&ServiceId::from("Leaf")).unwrap();
        let b = engine.resolve(&ServiceId::from("Leaf")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn transient_produces_fresh_instances() {
        let engine = engine_with_leaf_and_branch();
        let a = engine.resolve(&ServiceId::from("Branch")).unwrap();
        let b = engine.resolve(&ServiceId::from("Branch")).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_service_id_fails() {
        let engine = Engine::new();
        let err = engine.resolve(&ServiceId::from("Missing")).unwrap_err();
        assert!(matches!(err, ContainerError::ServiceNotFound { .. }));
    }

    #[test]
    fn autowires_registered_class_with_no_explicit_definition() {
        let engine = Engine::new();
        engine.register_class::<Leaf>();
        engine.register_class::<Branch>();
        // Neither "Leaf" nor "Branch" has a `ServiceDefinition` — only their
        // classes were ever registered.
        let resolved = engine.resolve(&ServiceId::from("Branch")).unwrap();
        assert!(resolved.downcast_ref::<Branch>().is_some());
    }

    #[test]
    fn autowired_class_is_transient() {
        let engine = Engine::new();
        engine.register_class::<Leaf>();
        let a = engine.resolve(&ServiceId::from("Leaf")).unwrap();
        let b = engine.resolve(&ServiceId::from("Leaf")).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn inspect_returns_trace_for_successful_resolution() {
        let engine = engine_with_leaf_and_branch();
        let inspection = engine.inspect(&ServiceId::from("Leaf"));
        assert!(inspection.outcome.is_ok());
        assert!(!inspection.trace.is_empty());
    }

    #[test]
    fn unregistered_class_is_not_instantiable() {
        let engine = Engine::new();
        engine
            .definitions()
            .add(ServiceDefinition::new(
                "Ghost",
                Concrete::Class(ClassId("Ghost")),
                Lifetime::Transient,
            ))
            .unwrap();
        let err = engine.resolve(&ServiceId::from("Ghost")).unwrap_err();
        assert!(matches!(err, ContainerError::ClassNotInstantiable { .. }));
    }

    #[test]
    fn call_resolves_parameters_by_type_and_override() {
        let engine = engine_with_leaf_and_branch();
        let prototype = MethodPrototype::new(
            "greet",
            vec![
                ParameterPrototype::required_named("leaf", "Leaf"),
                ParameterPrototype::required_named("greeting", "String")
                    .with_default(crate::value::ArgumentValue::literal("hi".to_string())),
            ],
        );
        let overrides = vec![crate::value::ArgumentValue::Reference(ServiceId::from("Leaf"))];
        let greeting = engine
            .call(&prototype, &overrides, |mut args| {
                let leaf = args.take_arc::<Leaf>().expect("leaf");
                let greeting = args.take::<String>().unwrap_or_default();
                Ok((leaf, greeting))
            })
            .unwrap();
        assert_eq!(greeting.1, "hi");
    }
}
