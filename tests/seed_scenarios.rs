//! End-to-end seed scenarios exercised against the public `Container`
//! facade rather than the internal `Engine`.

use container_kernel::prototype::{MethodPrototype, ParameterPrototype, ServicePrototype};
use container_kernel::value::{ArgumentValue, ConstructorArgs};
use container_kernel::{ClassId, Container, ContainerError, Describable, Result};
use std::sync::Arc;

struct ClassX;

impl Describable for ClassX {
    fn service_prototype() -> ServicePrototype {
        ServicePrototype::trivial(ClassId::of::<ClassX>())
    }

    fn construct(_args: ConstructorArgs) -> Result<Self> {
        Ok(ClassX)
    }
}

struct ClassY;

impl Describable for ClassY {
    fn service_prototype() -> ServicePrototype {
        ServicePrototype::trivial(ClassId::of::<ClassY>())
    }

    fn construct(_args: ConstructorArgs) -> Result<Self> {
        Ok(ClassY)
    }
}

struct ClassZ;

impl Describable for ClassZ {
    fn service_prototype() -> ServicePrototype {
        ServicePrototype::trivial(ClassId::of::<ClassZ>())
    }

    fn construct(_args: ConstructorArgs) -> Result<Self> {
        Ok(ClassZ)
    }
}

#[test]
fn singleton_share() {
    let container = Container::new();
    container.singleton::<ClassX>("X").unwrap();

    let id1 = container.get("X").unwrap();
    let id2 = container.get("X").unwrap();
    assert!(Arc::ptr_eq(&id1, &id2));

    let inspection = container.inspect_injection("X");
    assert!(inspection.outcome.is_ok());
    assert!(!inspection.trace.is_empty());
}

#[test]
fn scoped_isolation() {
    let container = Container::new();
    container.scoped::<ClassY>("Y").unwrap();

    container.begin_scope();
    let a = container.get("Y").unwrap();
    let b = container.get("Y").unwrap();
    container.end_scope().unwrap();

    container.begin_scope();
    let c = container.get("Y").unwrap();
    container.end_scope().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn transient_freshness() {
    let container = Container::new();
    container.transient::<ClassZ>("Z").unwrap();

    let a = container.get("Z").unwrap();
    let b = container.get("Z").unwrap();
    let c = container.get("Z").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&b, &c));
}

struct Q;

impl Describable for Q {
    fn service_prototype() -> ServicePrototype {
        ServicePrototype::trivial(ClassId::of::<Q>())
    }

    fn construct(_args: ConstructorArgs) -> Result<Self> {
        Ok(Q)
    }
}

struct W {
    #[allow(dead_code)]
    q: Arc<Q>,
}

impl Describable for W {
    fn service_prototype() -> ServicePrototype {
        let mut prototype = ServicePrototype::trivial(ClassId::of::<W>());
        prototype.constructor = Some(MethodPrototype::new(
            "new",
            vec![ParameterPrototype::required_named("q", "Q")],
        ));
        prototype
    }

    fn construct(mut args: ConstructorArgs) -> Result<Self> {
        Ok(W {
            q: args.take_arc::<Q>().expect("q argument"),
        })
    }
}

#[test]
fn autowire_miss_then_succeed() {
    let container = Container::new();
    // Neither `W` nor `Q` has a binding — only their shapes are known.
    container.register_class::<W>();
    container.register_class::<Q>();

    let resolved = container.get("W").unwrap();
    assert!(resolved.downcast_ref::<W>().is_some());
}

struct A {
    #[allow(dead_code)]
    b: Arc<B>,
}

impl Describable for A {
    fn service_prototype() -> ServicePrototype {
        let mut prototype = ServicePrototype::trivial(ClassId::of::<A>());
        prototype.constructor = Some(MethodPrototype::new(
            "new",
            vec![ParameterPrototype::required_named("b", "B")],
        ));
        prototype
    }

    fn construct(mut args: ConstructorArgs) -> Result<Self> {
        Ok(A {
            b: args.take_arc::<B>().expect("b argument"),
        })
    }
}

struct B {
    #[allow(dead_code)]
    a: Arc<A>,
}

impl Describable for B {
    fn service_prototype() -> ServicePrototype {
        let mut prototype = ServicePrototype::trivial(ClassId::of::<B>());
        prototype.constructor = Some(MethodPrototype::new(
            "new",
            vec![ParameterPrototype::required_named("a", "A")],
        ));
        prototype
    }

    fn construct(mut args: ConstructorArgs) -> Result<Self> {
        Ok(B {
            a: args.take_arc::<A>().expect("a argument"),
        })
    }
}

#[test]
fn cycle_detection() {
    let container = Container::new();
    container.register_class::<A>();
    container.register_class::<B>();

    let err = container.get("A").unwrap_err();
    match err {
        ContainerError::CircularDependency { chain } => {
            assert_eq!(
                chain,
                vec![
                    container_kernel::ServiceId::from("A"),
                    container_kernel::ServiceId::from("B"),
                    container_kernel::ServiceId::from("A"),
                ]
            );
        }
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

struct Logger {
    #[allow(dead_code)]
    tag: String,
}

impl Describable for Logger {
    fn service_prototype() -> ServicePrototype {
        ServicePrototype::trivial(ClassId::of::<Logger>())
    }

    fn construct(_args: ConstructorArgs) -> Result<Self> {
        Ok(Logger { tag: "default".into() })
    }
}

struct ClassS {
    name: String,
    #[allow(dead_code)]
    logger: Arc<Logger>,
}

impl Describable for ClassS {
    fn service_prototype() -> ServicePrototype {
        let mut prototype = ServicePrototype::trivial(ClassId::of::<ClassS>());
        prototype.constructor = Some(MethodPrototype::new(
            "new",
            vec![
                ParameterPrototype::required_named("name", "String")
                    .with_default(ArgumentValue::literal("bob".to_string())),
                ParameterPrototype::required_named("logger", "Logger"),
            ],
        ));
        prototype
    }

    fn construct(mut args: ConstructorArgs) -> Result<Self> {
        Ok(ClassS {
            name: args.take::<String>().unwrap_or_default(),
            logger: args.take_arc::<Logger>().expect("logger argument"),
        })
    }
}

#[test]
fn override_via_make_is_not_cached() {
    let container = Container::new();
    container.singleton::<Logger>("Logger").unwrap();
    container.bind("S").to::<ClassS>().transient().commit().unwrap();

    let overridden = container
        .make("S", vec![ArgumentValue::literal("alice".to_string())])
        .unwrap();
    let overridden = overridden.downcast_ref::<ClassS>().unwrap();
    assert_eq!(overridden.name, "alice");

    // A plain `get` afterwards sees the registered default again, not the
    // one-off override.
    let plain = container.get("S").unwrap();
    let plain = plain.downcast_ref::<ClassS>().unwrap();
    assert_eq!(plain.name, "bob");
}

#[test]
fn empty_pipeline_is_rejected() {
    use container_kernel::pipeline::require_non_empty;
    let err = require_non_empty(&[]).unwrap_err();
    assert!(matches!(err, ContainerError::EmptyPipeline));
}

#[test]
fn end_scope_with_no_active_scope_fails() {
    let container = Container::new();
    let err = container.end_scope().unwrap_err();
    assert!(matches!(err, ContainerError::NoActiveScope));
}

#[test]
fn get_unknown_id_without_autowire_candidate_fails() {
    let container = Container::new();
    let err = container.get("TotallyUnknown").unwrap_err();
    assert!(matches!(err, ContainerError::ServiceNotFound { .. }));
}

#[test]
fn make_override_accepts_a_service_reference() {
    let container = Container::new();
    container.singleton::<Logger>("Logger").unwrap();
    container.bind("S").to::<ClassS>().transient().commit().unwrap();

    let resolved = container
        .make("S", vec![ArgumentValue::reference("Logger")])
        .unwrap();
    assert!(resolved.downcast_ref::<ClassS>().is_some());
}
