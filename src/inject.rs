//! Post-construction injection: properties and methods filled in after
//! `construct` returns.
//!
//! Property injection resolves each `PropertyPrototype` using the same
//! override/type/default/null priority as constructor parameters, then
//! hands the resulting name-keyed map to
//! [`crate::prototype::ClassDescriptor::inject_properties`]. Method
//! injection follows the same pattern but per invocation, each with its own
//! positional argument list, calling
//! [`crate::prototype::ClassDescriptor::inject_methods`] once with the full
//! batch so a describable type can order its own side effects.

use crate::error::{ContainerError, Result};
use crate::prototype::{MethodPrototype, PropertyPrototype, ServicePrototype};
use crate::resolver::DependencyResolver;
use crate::value::{ConstructorArgs, PropertyArgs, ResolvedValue};
use std::any::Any;
use std::collections::HashMap;

/// Resolves and applies injectable properties.
pub struct PropertyInjector {
    resolver: DependencyResolver,
}

impl PropertyInjector {
    pub fn new() -> Self {
        Self {
            resolver: DependencyResolver::new(),
        }
    }

    pub fn inject(
        &self,
        descriptor: &crate::prototype::ClassDescriptor,
        prototype: &ServicePrototype,
        instance: &mut (dyn Any + Send + Sync),
        mut resolve_ref: impl FnMut(&str) -> Result<ResolvedValue>,
    ) -> Result<()> {
        if prototype.injected_properties.is_empty() {
            return Ok(());
        }
        let mut values = HashMap::new();
        for property in &prototype.injected_properties {
            if let Some(value) = self.resolve_one(property, prototype, &mut resolve_ref)? {
                values.insert(property.name.clone(), value);
            }
        }
        descriptor.inject_properties(instance, PropertyArgs::new(values))
    }

    fn resolve_one(
        &self,
        property: &PropertyPrototype,
        prototype: &ServicePrototype,
        resolve_ref: &mut impl FnMut(&str) -> Result<ResolvedValue>,
    ) -> Result<Option<ResolvedValue>> {
        // An explicit abstract id on the property marker takes priority over
        // resolution by declared type — mirrors the constructor-parameter
        // override rule, just sourced from the property marker itself
        // instead of a positional arguments list.
        if let Some(explicit) = &property.explicit_abstract {
            return Ok(Some(resolve_ref(explicit.as_str())?));
        }

        let as_param = crate::prototype::ParameterPrototype {
            name: property.name.clone(),
            type_name: property.type_name.clone(),
            has_default: property.has_default,
            default: property.default.clone(),
            is_variadic: false,
            allows_null: !property.is_required,
        };

        self.resolver
            .resolve_parameter(&as_param, prototype.class, None, resolve_ref)
            .map_err(|err| match err {
                ContainerError::UnresolvableParameter { reason, .. } => {
                    ContainerError::InvalidInjection {
                        member: property.name.clone(),
                        owner: prototype.class,
                        reason,
                    }
                }
                other => other,
            })
    }
}

impl Default for PropertyInjector {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves arguments for and invokes every injectable method.
pub struct MethodInjector {
    resolver: DependencyResolver,
}

impl MethodInjector {
    pub fn new() -> Self {
        Self {
            resolver: DependencyResolver::new(),
        }
    }

    pub fn inject(
        &self,
        descriptor: &crate::prototype::ClassDescriptor,
        prototype: &ServicePrototype,
        instance: &mut (dyn Any + Send + Sync),
        mut resolve_ref: impl FnMut(&str) -> Result<ResolvedValue>,
    ) -> Result<()> {
        if prototype.injected_methods.is_empty() {
            return Ok(());
        }
        let mut invocations = Vec::with_capacity(prototype.injected_methods.len());
        for method in &prototype.injected_methods {
            let args = self.resolve_method_args(method, prototype, &mut resolve_ref)?;
            invocations.push((method.name.clone(), args));
        }
        descriptor.inject_methods(instance, invocations)
    }

    fn resolve_method_args(
        &self,
        method: &MethodPrototype,
        prototype: &ServicePrototype,
        resolve_ref: &mut impl FnMut(&str) -> Result<ResolvedValue>,
    ) -> Result<ConstructorArgs> {
        let mut resolved = Vec::with_capacity(method.parameters.len());
        for param in &method.parameters {
            match self
                .resolver
                .resolve_parameter(param, prototype.class, None, &mut *resolve_ref)?
            {
                Some(value) => resolved.push(value),
                None => resolved.push(std::sync::Arc::new(()) as ResolvedValue),
            }
        }
        Ok(ConstructorArgs::new(resolved))
    }
}

impl Default for MethodInjector {
    fn default() -> Self {
        Self::new()
    }
}
