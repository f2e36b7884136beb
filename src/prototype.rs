//! Structural prototypes: the kernel's Rust-native stand-in for reflective
//! constructor/property/method introspection.
//!
//! A `PrototypeAnalyzer` would normally reflect on a class to build a
//! `ServicePrototype`. Rust has no runtime reflection, so every describable
//! type instead supplies its own prototype through the `Describable` trait —
//! hand-authored, or generated by `#[derive(Injectable)]` in
//! `container-kernel-derive`. The analyzer's remaining job (this module's
//! `PrototypeAnalyzer`) is to call that supplied constructor exactly once per
//! class and hand the result to the cache; it does no introspection of its
//! own.

use crate::error::Result;
use crate::id::{ClassId, ServiceId};
use crate::value::{ArgumentValue, ConstructorArgs, PropertyArgs};
use std::any::Any;

/// A single constructor or method parameter.
#[derive(Debug, Clone)]
pub struct ParameterPrototype {
    pub name: String,
    /// Resolved type identity (the type name), or `None` if the type could
    /// not be named — e.g. an intersection type in the reflective source
    /// language, or a trait object parameter with no single implementation.
    pub type_name: Option<String>,
    pub has_default: bool,
    pub default: Option<ArgumentValue>,
    pub is_variadic: bool,
    pub allows_null: bool,
}

impl ParameterPrototype {
    /// A parameter is required iff it has neither a default nor nullability
    /// to fall back on.
    pub fn required(&self) -> bool {
        !self.has_default && !self.allows_null
    }

    pub fn required_named(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            has_default: false,
            default: None,
            is_variadic: false,
            allows_null: false,
        }
    }

    pub fn with_default(mut self, default: ArgumentValue) -> Self {
        self.has_default = true;
        self.default = Some(default);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.allows_null = true;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }

    pub fn untyped(mut self) -> Self {
        self.type_name = None;
        self
    }
}

/// An ordered parameter list belonging to a constructor or an injectable
/// method.
#[derive(Debug, Clone)]
pub struct MethodPrototype {
    pub name: String,
    pub parameters: Vec<ParameterPrototype>,
}

impl MethodPrototype {
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterPrototype>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// A single injectable property (a constructor-bypassing member set after
/// construction).
#[derive(Debug, Clone)]
pub struct PropertyPrototype {
    pub name: String,
    pub type_name: Option<String>,
    pub is_required: bool,
    pub has_default: bool,
    pub default: Option<ArgumentValue>,
    /// An explicit abstract id named on the `Inject(abstract?)` marker,
    /// taking priority over resolution-by-type.
    pub explicit_abstract: Option<ServiceId>,
}

/// The full structural description of a describable class, built once and
/// cached permanently by [`crate::prototype_cache::PrototypeCache`].
#[derive(Debug, Clone)]
pub struct ServicePrototype {
    pub class: ClassId,
    pub constructor: Option<MethodPrototype>,
    pub injected_properties: Vec<PropertyPrototype>,
    pub injected_methods: Vec<MethodPrototype>,
    pub is_instantiable: bool,
}

impl ServicePrototype {
    /// A prototype for a type with no constructor parameters and no
    /// injectable members — the common case for plain value types.
    pub fn trivial(class: ClassId) -> Self {
        Self {
            class,
            constructor: Some(MethodPrototype::new("new", Vec::new())),
            injected_properties: Vec::new(),
            injected_methods: Vec::new(),
            is_instantiable: true,
        }
    }

    /// A prototype marking a class as non-instantiable (e.g. a pure
    /// interface with no bound implementation). `VerifyPrototype` and the
    /// `Instantiator` must both refuse to build from it.
    pub fn uninstantiable(class: ClassId) -> Self {
        Self {
            class,
            constructor: None,
            injected_properties: Vec::new(),
            injected_methods: Vec::new(),
            is_instantiable: false,
        }
    }
}

/// Types the kernel knows how to describe and construct.
///
/// This is the Rust-native replacement for reflective introspection: rather
/// than the kernel walking a class's metadata at runtime, the class itself
/// states its shape. Implement by hand, or derive with
/// `#[derive(Injectable)]` (requires the `derive` feature).
pub trait Describable: Any + Send + Sync + 'static {
    /// Stable identity for this type, used for prototype caching and error
    /// attribution.
    fn class_id() -> ClassId
    where
        Self: Sized,
    {
        ClassId::of::<Self>()
    }

    /// Build this type's structural prototype. Called at most once per
    /// class by the `PrototypeCache`'s single-flight `getOrCreate`.
    fn service_prototype() -> ServicePrototype
    where
        Self: Sized;

    /// Construct `Self` from resolved constructor arguments, in the order
    /// given by `service_prototype().constructor`.
    fn construct(args: ConstructorArgs) -> Result<Self>
    where
        Self: Sized;

    /// Set injectable properties after construction. Default: no-op (no
    /// injectable properties).
    fn inject_properties(&mut self, _args: PropertyArgs) -> Result<()> {
        Ok(())
    }

    /// Invoke injectable methods after construction/property injection.
    /// Default: no-op (no injectable methods).
    fn inject_methods(&mut self, _invocations: Vec<(String, ConstructorArgs)>) -> Result<()> {
        Ok(())
    }
}

/// Type-erased entry point into a describable class, used by the engine
/// once it only knows a [`ClassId`], not a concrete `T`.
///
/// Produced by `register_class::<T>()` and stored in the engine's class
/// registry; this is the "reflection *mechanism*" the kernel consumes
/// abstractly, expressed as a handful of closures captured over `T`.
pub struct ClassDescriptor {
    pub class_id: ClassId,
    prototype_fn: Box<dyn Fn() -> ServicePrototype + Send + Sync>,
    construct_fn: Box<dyn Fn(ConstructorArgs) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>,
    inject_properties_fn:
        Box<dyn Fn(&mut (dyn Any + Send + Sync), PropertyArgs) -> Result<()> + Send + Sync>,
    inject_methods_fn: Box<
        dyn Fn(&mut (dyn Any + Send + Sync), Vec<(String, ConstructorArgs)>) -> Result<()>
            + Send
            + Sync,
    >,
}

impl ClassDescriptor {
    /// Build a descriptor for a `Describable` type `T`.
    pub fn of<T: Describable>() -> Self {
        Self {
            class_id: T::class_id(),
            prototype_fn: Box::new(T::service_prototype),
            construct_fn: Box::new(|args| {
                T::construct(args).map(|v| Box::new(v) as Box<dyn Any + Send + Sync>)
            }),
            inject_properties_fn: Box::new(|instance, args| {
                let typed = instance
                    .downcast_mut::<T>()
                    .expect("ClassDescriptor::inject_properties type mismatch");
                typed.inject_properties(args)
            }),
            inject_methods_fn: Box::new(|instance, invocations| {
                let typed = instance
                    .downcast_mut::<T>()
                    .expect("ClassDescriptor::inject_methods type mismatch");
                typed.inject_methods(invocations)
            }),
        }
    }

    pub fn prototype(&self) -> ServicePrototype {
        (self.prototype_fn)()
    }

    pub fn construct(&self, args: ConstructorArgs) -> Result<Box<dyn Any + Send + Sync>> {
        (self.construct_fn)(args)
    }

    pub fn inject_properties(
        &self,
        instance: &mut (dyn Any + Send + Sync),
        args: PropertyArgs,
    ) -> Result<()> {
        (self.inject_properties_fn)(instance, args)
    }

    pub fn inject_methods(
        &self,
        instance: &mut (dyn Any + Send + Sync),
        invocations: Vec<(String, ConstructorArgs)>,
    ) -> Result<()> {
        (self.inject_methods_fn)(instance, invocations)
    }
}

/// Analyzes a class identity into a [`ServicePrototype`].
///
/// Deterministic and side-effect-free beyond consulting the cache: given the
/// same [`ClassDescriptor`], `analyze` always returns a structurally equal
/// prototype.
#[derive(Default)]
pub struct PrototypeAnalyzer;

impl PrototypeAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Build (or fetch, via `descriptor.prototype()`) the prototype for a
    /// class. The analyzer itself holds no state; caching is the
    /// `PrototypeCache`'s job.
    pub fn analyze(&self, descriptor: &ClassDescriptor) -> ServicePrototype {
        descriptor.prototype()
    }
}

/// The type-resolution policy: union and nullable types extract the first
/// non-null named type; intersection types are unresolvable. The derive
/// macro calls this (conceptually) when
/// lowering a Rust field type into a `(type_name, allows_null)` pair; it is
/// exposed here so hand-written `Describable` impls can reuse the same
/// policy instead of inventing their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A single named, injectable type.
    Named(String),
    /// `Option<Named>` — nullable, unwraps to the inner named type.
    Nullable(String),
    /// A builtin scalar (never injectable).
    Builtin,
    /// An intersection/ambiguous type with no single resolvable identity.
    Unresolvable,
}

impl FieldType {
    /// Apply the union/nullable/intersection policy, producing
    /// `(type_name, allows_null)` for a `ParameterPrototype`/
    /// `PropertyPrototype`.
    pub fn resolve(&self) -> (Option<String>, bool) {
        match self {
            FieldType::Named(name) => (Some(name.clone()), false),
            FieldType::Nullable(name) => (Some(name.clone()), true),
            FieldType::Builtin => (None, false),
            FieldType::Unresolvable => (None, false),
        }
    }

    /// `true` for builtin scalars — these are never injectable, and a
    /// required injectable property of builtin type is a validation error
    /// (see `verify.rs`).
    pub fn is_builtin(&self) -> bool {
        matches!(self, FieldType::Builtin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf;

    impl Describable for Leaf {
        fn service_prototype() -> ServicePrototype {
            ServicePrototype::trivial(ClassId::of::<Leaf>())
        }

        fn construct(_args: ConstructorArgs) -> Result<Self> {
            Ok(Leaf)
        }
    }

    #[test]
    fn analyzer_is_deterministic() {
        let descriptor = ClassDescriptor::of::<Leaf>();
        let analyzer = PrototypeAnalyzer::new();
        let a = analyzer.analyze(&descriptor);
        let b = analyzer.analyze(&descriptor);
        assert_eq!(a.class, b.class);
        assert_eq!(a.is_instantiable, b.is_instantiable);
    }

    #[test]
    fn class_descriptor_roundtrips_construction() {
        let descriptor = ClassDescriptor::of::<Leaf>();
        let boxed = descriptor.construct(ConstructorArgs::new(Vec::new())).unwrap();
        assert!(boxed.downcast_ref::<Leaf>().is_some());
    }

    #[test]
    fn field_type_policy_union_nullable_intersection() {
        assert_eq!(
            FieldType::Named("Logger".into()).resolve(),
            (Some("Logger".into()), false)
        );
        assert_eq!(
            FieldType::Nullable("Logger".into()).resolve(),
            (Some("Logger".into()), true)
        );
        assert_eq!(FieldType::Unresolvable.resolve(), (None, false));
        assert!(FieldType::Builtin.is_builtin());
    }

    #[test]
    fn parameter_prototype_required_logic() {
        let required = ParameterPrototype::required_named("db", "Database");
        assert!(required.required());

        let defaulted = required
            .clone()
            .with_default(ArgumentValue::literal(1i32));
        assert!(!defaulted.required());

        let nullable = ParameterPrototype::required_named("db", "Database").nullable();
        assert!(!nullable.required());
    }
}
