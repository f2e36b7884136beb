//! # container-kernel
//!
//! A staged-pipeline dependency injection container: definitions, prototypes,
//! scopes, resolution, and telemetry.
//!
//! ## Features
//!
//! - **Type-erased, not type-unsafe** — every resolved value is an
//!   `Arc<dyn Any + Send + Sync>`, downcast at the point a [`Describable`]
//!   constructor actually needs it.
//! - **Lock-free caches** — `DashMap`-backed singleton and prototype caches,
//!   single-flight via `once_cell::sync::OnceCell` so concurrent first
//!   resolutions of the same id only build once.
//! - **Fixed-order resolution pipeline** — every resolution runs the same
//!   seven stages (definition lookup, cycle check, prototype analysis,
//!   autowiring, instantiation, injection, diagnostics), and the order is
//!   enforced by a state machine, not convention.
//! - **Full diagnostics** — [`Container::inspect_injection`] returns a trace
//!   of every stage of a resolution, success or failure, without needing a
//!   separate debug build.
//! - **Scoped containers** — push/pop scope frames; scoped services get one
//!   instance per frame, discarded on `end_scope`.
//!
//! ## Quick Start
//!
//! ```rust
//! use container_kernel::{Container, Describable};
//! use container_kernel::prototype::ServicePrototype;
//! use container_kernel::value::ConstructorArgs;
//! use container_kernel::error::Result;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! impl Describable for Database {
//!     fn service_prototype() -> ServicePrototype {
//!         ServicePrototype::trivial(container_kernel::id::ClassId::of::<Database>())
//!     }
//!
//!     fn construct(_args: ConstructorArgs) -> Result<Self> {
//!         Ok(Database { url: "postgres://localhost".into() })
//!     }
//! }
//!
//! let container = Container::new();
//! container.singleton::<Database>("Database").unwrap();
//!
//! let db = container.get("Database").unwrap();
//! assert_eq!(db.downcast_ref::<Database>().unwrap().url, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! ```rust
//! use container_kernel::{Container, Describable};
//! use container_kernel::prototype::ServicePrototype;
//! use container_kernel::value::ConstructorArgs;
//! use container_kernel::error::Result;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! struct RequestId(u64);
//!
//! impl Describable for RequestId {
//!     fn service_prototype() -> ServicePrototype {
//!         ServicePrototype::trivial(container_kernel::id::ClassId::of::<RequestId>())
//!     }
//!
//!     fn construct(_args: ConstructorArgs) -> Result<Self> {
//!         Ok(RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)))
//!     }
//! }
//!
//! let container = Container::new();
//!
//! // Transient — a fresh instance every resolve.
//! container.transient::<RequestId>("RequestId").unwrap();
//!
//! let a = container.get("RequestId").unwrap();
//! let b = container.get("RequestId").unwrap();
//! assert_ne!(a.downcast_ref::<RequestId>().unwrap().0, b.downcast_ref::<RequestId>().unwrap().0);
//! ```
//!
//! ## Scoped Containers
//!
//! ```rust
//! use container_kernel::{Container, Describable};
//! use container_kernel::prototype::ServicePrototype;
//! use container_kernel::value::ConstructorArgs;
//! use container_kernel::error::Result;
//!
//! struct RequestContext;
//!
//! impl Describable for RequestContext {
//!     fn service_prototype() -> ServicePrototype {
//!         ServicePrototype::trivial(container_kernel::id::ClassId::of::<RequestContext>())
//!     }
//!
//!     fn construct(_args: ConstructorArgs) -> Result<Self> {
//!         Ok(RequestContext)
//!     }
//! }
//!
//! let container = Container::new();
//! container.scoped::<RequestContext>("RequestContext").unwrap();
//!
//! container.begin_scope();
//! let a = container.get("RequestContext").unwrap();
//! let b = container.get("RequestContext").unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! container.end_scope().unwrap();
//!
//! // A new scope frame gets a fresh instance.
//! container.begin_scope();
//! let c = container.get("RequestContext").unwrap();
//! assert!(!std::sync::Arc::ptr_eq(&a, &c));
//! container.end_scope().unwrap();
//! ```

pub mod container;
pub mod context;
pub mod controller;
pub mod definition;
pub mod engine;
pub mod error;
pub mod id;
pub mod inject;
pub mod instantiate;
pub mod lazy;
#[cfg(feature = "logging")]
pub mod logging;
pub mod pipeline;
pub mod prototype;
pub mod prototype_cache;
pub mod resolver;
pub mod scope;
pub mod strategy;
pub mod telemetry;
pub mod value;
pub mod verify;

pub use container::{BatchBinder, BindingBuilder, Container};
pub use definition::{Concrete, DefinitionStore, Lifetime, ServiceDefinition};
pub use engine::{Engine, Inspection};
pub use error::{ContainerError, Result};
pub use id::{ClassId, ServiceId};
pub use prototype::{ClassDescriptor, Describable, MethodPrototype, ParameterPrototype, PropertyPrototype, ServicePrototype};
pub use value::{ArgumentValue, ConstructorArgs, PropertyArgs, ResolvedValue};

// Re-export tracing macros for convenience when the `logging` feature is enabled.
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience — most of the public API hands back an `Arc`.
pub use std::sync::Arc;

/// Convenience re-exports for the common case: binding and resolving
/// services through a [`Container`].
pub mod prelude {
    pub use crate::{
        ArgumentValue, ClassId, Container, ContainerError, Describable, Lifetime, Result,
        ServiceId,
    };
    pub use std::sync::Arc;
}
