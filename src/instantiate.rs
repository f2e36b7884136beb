//! Builds a single instance from a resolved constructor argument list.
//!
//! Given a prototype and a fully-resolved argument set, hand them to the
//! language-native construction facility and wrap any failure in the right
//! error variant. In this crate that facility is
//! [`crate::prototype::ClassDescriptor::construct`].

use crate::error::{ContainerError, Result};
use crate::id::ServiceId;
use crate::prototype::{ClassDescriptor, ServicePrototype};
use crate::resolver::DependencyResolver;
use crate::value::{ArgumentValue, ConstructorArgs, ResolvedValue};
use std::any::Any;
use std::sync::Arc;

/// Resolves every constructor parameter and invokes the descriptor's native
/// constructor.
pub struct Instantiator {
    resolver: DependencyResolver,
}

impl Instantiator {
    pub fn new() -> Self {
        Self {
            resolver: DependencyResolver::new(),
        }
    }

    /// `definition_args`/`call_overrides` are positional, aligned to
    /// `prototype.constructor`'s parameter order; a call-time override at a
    /// given position takes priority over a registration-time one, which in
    /// turn takes priority over type-based resolution — that ranking applies
    /// per-parameter, not just per-service.
    pub fn instantiate(
        &self,
        descriptor: &ClassDescriptor,
        prototype: &ServicePrototype,
        service_id: &ServiceId,
        definition_args: &[ArgumentValue],
        call_overrides: &[ArgumentValue],
        mut resolve_ref: impl FnMut(&str) -> Result<ResolvedValue>,
    ) -> Result<Box<dyn Any + Send + Sync>> {
        if !prototype.is_instantiable {
            return Err(ContainerError::ClassNotInstantiable {
                class_id: prototype.class,
                service_id: service_id.clone(),
            });
        }

        let Some(constructor) = &prototype.constructor else {
            return Err(ContainerError::ClassNotInstantiable {
                class_id: prototype.class,
                service_id: service_id.clone(),
            });
        };

        let mut resolved = Vec::with_capacity(constructor.parameters.len());
        for (index, param) in constructor.parameters.iter().enumerate() {
            if param.is_variadic {
                let rest: Vec<ResolvedValue> = call_overrides
                    .get(index..)
                    .or_else(|| definition_args.get(index..))
                    .unwrap_or(&[])
                    .iter()
                    .map(|value| match value {
                        ArgumentValue::Literal(v) => Ok(v.clone()),
                        ArgumentValue::Reference(id) => resolve_ref(id.as_str()),
                        ArgumentValue::Lazy(thunk) => {
                            let thunk = thunk.clone();
                            Ok(Arc::new(crate::lazy::Lazy::new(move || thunk())) as ResolvedValue)
                        }
                    })
                    .collect::<Result<_>>()?;
                resolved.push(Arc::new(rest) as ResolvedValue);
                continue;
            }

            let explicit = call_overrides
                .get(index)
                .or_else(|| definition_args.get(index));

            match self
                .resolver
                .resolve_parameter(param, prototype.class, explicit, &mut resolve_ref)?
            {
                Some(value) => resolved.push(value),
                None => resolved.push(Arc::new(()) as ResolvedValue),
            }
        }

        descriptor.construct(ConstructorArgs::new(resolved))
    }
}

impl Default for Instantiator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ClassId;
    use crate::prototype::{Describable, ParameterPrototype, ServicePrototype};
    use crate::value::ConstructorArgs as Cursor;

    struct Greeting {
        name: String,
    }

    impl Describable for Greeting {
        fn service_prototype() -> ServicePrototype {
            let mut prototype = ServicePrototype::trivial(ClassId::of::<Greeting>());
            prototype.constructor = Some(crate::prototype::MethodPrototype::new(
                "new",
                vec![ParameterPrototype::required_named("name", "String")],
            ));
            prototype
        }

        fn construct(mut args: Cursor) -> Result<Self> {
            let name = args.take::<String>().unwrap_or_default();
            Ok(Greeting { name })
        }
    }

    #[test]
    fn instantiate_resolves_and_constructs() {
        let descriptor = ClassDescriptor::of::<Greeting>();
        let prototype = descriptor.prototype();
        let instantiator = Instantiator::new();
        let boxed = instantiator
            .instantiate(
                &descriptor,
                &prototype,
                &ServiceId::from("Greeting"),
                &[],
                &[ArgumentValue::literal("Ada".to_string())],
                |_| unreachable!("no references in this prototype"),
            )
            .unwrap();
        let greeting = boxed.downcast_ref::<Greeting>().unwrap();
        assert_eq!(greeting.name, "Ada");
    }

    #[test]
    fn refuses_non_instantiable_prototype() {
        let descriptor = ClassDescriptor::of::<Greeting>();
        let prototype = ServicePrototype::uninstantiable(ClassId::of::<Greeting>());
        let instantiator = Instantiator::new();
        let err = instantiator
            .instantiate(
                &descriptor,
                &prototype,
                &ServiceId::from("Greeting"),
                &[],
                &[],
                |_| unreachable!(),
            )
            .unwrap_err();
        assert!(matches!(err, ContainerError::ClassNotInstantiable { .. }));
    }
}
