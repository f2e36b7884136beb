//! The dependency resolver: decides what value satisfies a single
//! constructor/property parameter.
//!
//! A strict priority order: an explicit override beats a resolvable
//! registered type, which beats a declared default, which beats nullability,
//! which finally gives way to failure. This module implements
//! exactly that order and nothing else — recursive resolution of a
//! `Reference` value is performed by the caller-supplied `resolve_ref`
//! closure, keeping this type free of any dependency on the engine/pipeline.

use crate::error::{ContainerError, Result};
use crate::id::ClassId;
use crate::prototype::ParameterPrototype;
use crate::value::{ArgumentValue, ResolvedValue};
use std::sync::Arc;

/// Resolves a single parameter to a [`ResolvedValue`] following the
/// override → reference-by-type → default → nullable → fail priority.
#[derive(Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// `owner` is used only to attribute an `UnresolvableParameter` error;
    /// `resolve_ref` turns a named type into a resolved instance by
    /// recursing back into the engine (it is expected to itself push/pop the
    /// ancestor chain and run the full pipeline for that nested id).
    pub fn resolve_parameter(
        &self,
        param: &ParameterPrototype,
        owner: ClassId,
        explicit_override: Option<&ArgumentValue>,
        mut resolve_ref: impl FnMut(&str) -> Result<ResolvedValue>,
    ) -> Result<Option<ResolvedValue>> {
        // 1. Explicit override, whether supplied at registration time
        //    (`ServiceDefinition::arguments`) or at call time (`make`'s
        //    overrides map).
        if let Some(value) = explicit_override {
            return Ok(Some(self.evaluate(value, &mut resolve_ref)?));
        }

        // 2. A resolvable registered type.
        if let Some(type_name) = &param.type_name {
            match resolve_ref(type_name) {
                Ok(value) => return Ok(Some(value)),
                Err(err) if param.has_default || param.allows_null => {
                    // Fall through to default/null — an unregistered type is
                    // not itself fatal if either escape hatch exists.
                    let _ = err;
                }
                Err(err) => return Err(err),
            }
        }

        // 3. A declared default.
        if let Some(default) = &param.default {
            return Ok(Some(self.evaluate(default, &mut resolve_ref)?));
        }

        // 4. Nullable — satisfied by the absence of a value.
        if param.allows_null {
            return Ok(None);
        }

        // 5. Nothing left — fail.
        Err(ContainerError::UnresolvableParameter {
            param: param.name.clone(),
            owner,
            reason: "no override, no resolvable type, no default, and null is not allowed"
                .to_string(),
        })
    }

    fn evaluate(
        &self,
        value: &ArgumentValue,
        resolve_ref: &mut impl FnMut(&str) -> Result<ResolvedValue>,
    ) -> Result<ResolvedValue> {
        match value {
            ArgumentValue::Literal(value) => Ok(value.clone()),
            ArgumentValue::Reference(id) => resolve_ref(id.as_str()),
            ArgumentValue::Lazy(thunk) => {
                let thunk = thunk.clone();
                Ok(Arc::new(crate::lazy::Lazy::new(move || thunk())) as ResolvedValue)
            }
        }
    }
}
