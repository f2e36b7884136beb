//! The resolution pipeline: runs the canonical seven stages in order, tying
//! together the [`PipelineController`]'s legality checks and the
//! [`TelemetryCollector`]'s event stream so neither can be bypassed.
//!
//! The seven stages — definition lookup, circular-dependency check, analyze
//! prototype, autowire, resolve instance, inject dependencies, collect
//! diagnostics — are distinct responsibilities; [`Step`] names them as data
//! so the pipeline can be introspected (`Pipeline::steps()`) without needing
//! trait objects that would have to smuggle the engine's internals through a
//! generic `dyn`-erased interface. The actual per-stage work is supplied by
//! the caller as a closure — see [`Engine::resolve`](crate::engine::Engine).

use crate::controller::{PipelineController, ResolutionState};
use crate::error::{ContainerError, Result};
use crate::id::ServiceId;
use crate::telemetry::{Event, Stage, TelemetryCollector};

/// The canonical, fixed order of pipeline stages.
pub const STEPS: [Stage; 7] = [
    Stage::DefinitionLookup,
    Stage::CircularDependencyCheck,
    Stage::AnalyzePrototype,
    Stage::Autowire,
    Stage::ResolveInstance,
    Stage::InjectDependencies,
    Stage::CollectDiagnostics,
];

/// A named stage in the canonical order, exposed for introspection
/// (`inspectInjection`-style tooling can list `Pipeline::steps()` without
/// having run one).
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub stage: Stage,
    pub index: usize,
}

/// Drives one resolution's stages through the controller and telemetry in
/// lockstep. Built fresh per top-level `Engine::resolve` call; never shared
/// across requests.
pub struct Pipeline {
    controller: PipelineController,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            controller: PipelineController::new(),
        }
    }

    /// The fixed, ordered step list this pipeline will run.
    pub fn steps(&self) -> impl Iterator<Item = Step> {
        STEPS
            .iter()
            .enumerate()
            .map(|(index, &stage)| Step { stage, index })
    }

    pub fn state(&self) -> ResolutionState {
        self.controller.state()
    }

    /// Validate the transition into `stage` and record its `StepStarted`
    /// event. Paired with [`Pipeline::end_stage_ok`]/[`Pipeline::end_stage_err`].
    ///
    /// Split out from [`Pipeline::run_stage`] for stages whose body itself
    /// needs mutable access to the same `telemetry`/ancestor-chain state the
    /// pipeline call would otherwise have to borrow simultaneously (nested
    /// dependency resolution during `Autowire`/`InjectDependencies`) — the
    /// engine calls `begin_stage`, runs the recursive work as a plain
    /// sequential step, then calls `end_stage_ok`/`end_stage_err` itself.
    pub fn begin_stage(
        &mut self,
        stage: Stage,
        service_id: &ServiceId,
        telemetry: &mut TelemetryCollector,
    ) -> Result<()> {
        self.controller.transition(ResolutionState::Stage(stage))?;
        telemetry.record(Event::StepStarted {
            service_id: service_id.clone(),
            stage,
        });
        Ok(())
    }

    pub fn end_stage_ok(&mut self, stage: Stage, service_id: &ServiceId, telemetry: &mut TelemetryCollector) {
        telemetry.record(Event::StepSucceeded {
            service_id: service_id.clone(),
            stage,
            message: None,
        });
    }

    pub fn end_stage_err(
        &mut self,
        stage: Stage,
        service_id: &ServiceId,
        telemetry: &mut TelemetryCollector,
        err: &ContainerError,
    ) {
        telemetry.record(Event::StepFailed {
            service_id: service_id.clone(),
            stage,
            reason: err.to_string(),
        });
        let _ = self.controller.transition(ResolutionState::Failure);
    }

    /// Run one stage's body in one call: [`Pipeline::begin_stage`], `body`,
    /// then `end_stage_ok`/`end_stage_err`. Use this whenever `body` does
    /// not itself need `telemetry` — i.e. it performs no nested resolution.
    ///
    /// A `PipelineStateViolation` from an out-of-order call is a
    /// programming error in the engine, not a resolution failure — it is
    /// still returned as a normal `Err` so the caller can decide how to
    /// surface it, but it never arises from user-supplied configuration.
    pub fn run_stage<T>(
        &mut self,
        stage: Stage,
        service_id: &ServiceId,
        telemetry: &mut TelemetryCollector,
        body: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        self.begin_stage(stage, service_id, telemetry)?;
        match body() {
            Ok(value) => {
                self.end_stage_ok(stage, service_id, telemetry);
                Ok(value)
            }
            Err(err) => {
                self.end_stage_err(stage, service_id, telemetry, &err);
                Err(err)
            }
        }
    }

    /// Mark the pipeline as having completed successfully. Must be called
    /// only after the last stage (`CollectDiagnostics`) has succeeded.
    pub fn finish(&mut self) -> Result<()> {
        self.controller.transition(ResolutionState::Success)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// A pipeline built with zero stages is meaningless; this kernel never
/// constructs one, but exposes the check as a constructor guard for anyone
/// assembling a custom `STEPS`-like list at the integration layer.
pub fn require_non_empty(steps: &[Stage]) -> Result<()> {
    if steps.is_empty() {
        Err(ContainerError::EmptyPipeline)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_in_canonical_order() {
        let pipeline = Pipeline::new();
        let stages: Vec<_> = pipeline.steps().map(|s| s.stage).collect();
        assert_eq!(stages, STEPS.to_vec());
    }

    #[test]
    fn run_stage_out_of_order_is_rejected() {
        let mut pipeline = Pipeline::new();
        let mut telemetry = TelemetryCollector::new();
        let id = ServiceId::from("X");
        let err = pipeline
            .run_stage(Stage::Autowire, &id, &mut telemetry, || Ok(()))
            .unwrap_err();
        assert!(matches!(err, ContainerError::PipelineStateViolation { .. }));
    }

    #[test]
    fn full_pipeline_run_reaches_success() {
        let mut pipeline = Pipeline::new();
        let mut telemetry = TelemetryCollector::new();
        let id = ServiceId::from("X");
        for stage in STEPS {
            pipeline
                .run_stage(stage, &id, &mut telemetry, || Ok(()))
                .unwrap();
        }
        pipeline.finish().unwrap();
        assert_eq!(pipeline.state(), ResolutionState::Success);
        assert_eq!(telemetry.trace().entries().len(), STEPS.len() * 2);
    }

    #[test]
    fn failing_stage_marks_pipeline_failed_and_stops() {
        let mut pipeline = Pipeline::new();
        let mut telemetry = TelemetryCollector::new();
        let id = ServiceId::from("X");
        pipeline
            .run_stage(Stage::DefinitionLookup, &id, &mut telemetry, || Ok(()))
            .unwrap();
        let err = pipeline
            .run_stage(Stage::CircularDependencyCheck, &id, &mut telemetry, || {
                Err(ContainerError::NoActiveScope)
            })
            .unwrap_err();
        assert!(matches!(err, ContainerError::NoActiveScope));
        assert_eq!(pipeline.state(), ResolutionState::Failure);
    }

    #[test]
    fn empty_pipeline_guard() {
        assert!(matches!(
            require_non_empty(&[]).unwrap_err(),
            ContainerError::EmptyPipeline
        ));
        require_non_empty(&STEPS).unwrap();
    }
}
