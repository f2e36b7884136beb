//! Per-request resolution state threaded through the pipeline.
//!
//! A context object carries the ancestor chain (for cycle detection) and
//! per-call argument overrides. One
//! `ResolutionContext` is created per top-level `Engine::resolve` call and
//! passed by mutable reference down through every nested dependency
//! resolution triggered by the same request. Telemetry is threaded
//! alongside it rather than embedded in it: both the chain and the
//! telemetry collector need independent mutable access from the same
//! pipeline stage, and Rust's field-borrow splitting doesn't reach through
//! a method call — keeping them as sibling fields in `Engine::resolve`'s
//! locals instead of one struct's fields sidesteps that entirely.

use crate::error::{ContainerError, Result};
use crate::id::ServiceId;
use crate::value::ArgumentValue;
use std::collections::HashMap;

/// Default recursion bound: a chain deeper than this raises
/// [`ContainerError::CircularDependency`] even with no literal repeated id,
/// since anything this deep is almost certainly a runaway autowire rather
/// than legitimate layering.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Mutable, per-request resolution state.
pub struct ResolutionContext {
    chain: Vec<ServiceId>,
    max_depth: usize,
    overrides: HashMap<ServiceId, Vec<ArgumentValue>>,
}

impl ResolutionContext {
    pub fn new(max_depth: usize) -> Self {
        Self {
            chain: Vec::new(),
            max_depth,
            overrides: HashMap::new(),
        }
    }

    /// Register call-time constructor argument overrides for `id`, as
    /// supplied to `Engine::make`/`Container::make`.
    pub fn with_override(mut self, id: impl Into<ServiceId>, arguments: Vec<ArgumentValue>) -> Self {
        self.overrides.insert(id.into(), arguments);
        self
    }

    pub fn overrides_for(&self, id: &ServiceId) -> Option<&[ArgumentValue]> {
        self.overrides.get(id).map(Vec::as_slice)
    }

    pub fn chain(&self) -> &[ServiceId] {
        &self.chain
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Push `id` onto the ancestor chain, failing if it already appears
    /// there (a literal cycle) or if doing so would exceed `max_depth`.
    ///
    /// Paired with [`ResolutionContext::pop`], which the caller must invoke
    /// exactly once per successful `push`, on every exit path (success or
    /// error) — deliberately not an RAII guard, since the engine needs
    /// `ctx` back as a plain `&mut ResolutionContext` for recursive calls
    /// while the "entry" for the current id is still logically active, and
    /// a guard borrowing `ctx` for its own lifetime would make that
    /// impossible to express.
    pub fn push(&mut self, id: ServiceId) -> Result<()> {
        if self.chain.contains(&id) {
            let mut chain = self.chain.clone();
            chain.push(id);
            return Err(ContainerError::CircularDependency { chain });
        }
        if self.chain.len() >= self.max_depth {
            let mut chain = self.chain.clone();
            chain.push(id);
            return Err(ContainerError::CircularDependency { chain });
        }
        self.chain.push(id);
        Ok(())
    }

    /// Pop the innermost ancestor chain entry pushed by `push`. A no-op if
    /// the chain is already empty, so a caller that failed before ever
    /// pushing can still call `pop` unconditionally in a cleanup path.
    pub fn pop(&mut self) {
        self.chain.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_detects_literal_cycle() {
        let mut ctx = ResolutionContext::new(DEFAULT_MAX_DEPTH);
        ctx.push(ServiceId::from("A")).unwrap();
        let err = ctx.push(ServiceId::from("A")).unwrap_err();
        assert!(matches!(err, ContainerError::CircularDependency { .. }));
    }

    #[test]
    fn pop_restores_previous_depth() {
        let mut ctx = ResolutionContext::new(DEFAULT_MAX_DEPTH);
        ctx.push(ServiceId::from("A")).unwrap();
        assert_eq!(ctx.depth(), 1);
        ctx.pop();
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn push_respects_max_depth() {
        let mut ctx = ResolutionContext::new(2);
        ctx.push(ServiceId::from("A")).unwrap();
        ctx.push(ServiceId::from("B")).unwrap();
        let err = ctx.push(ServiceId::from("C")).unwrap_err();
        assert!(matches!(err, ContainerError::CircularDependency { .. }));
    }
}
