use super::application::StageState;
use super::config::EvaluatorConfig;
use super::error::{ModifierError, PipelineError};
use super::events::{PipelineEvent, Stage};
use super::flow_state::PipelineFlowState;
use super::modifier::{Evaluation, EvaluationRequest, SharedModifier, read_modifier};
use super::pipeline::{ModAppId, Pipeline};
use super::request::RequestTicket;
use crate::core::status::PipelineStatus;
use crate::core::time::TimePoint;
use std::sync::Arc;
use tracing::{debug, trace};

const DISABLED_STATUS: &str = "Modifier is currently disabled.";

/// Walks a pipeline chain for a requested time.
///
/// Stages run strictly in chain order. Each stage first consults its own
/// cache, keyed on the upstream output revision and its modifier's parameter
/// snapshot; a cache hit upstream does not skip the checks of later stages.
/// Modifier failures become error statuses on the stage output and never
/// abort the walk (unless `break_on_error` is set). The returned flow state
/// carries the most severe status seen along the chain.
#[derive(Debug, Clone, Default)]
pub struct PipelineEvaluator {
    config: EvaluatorConfig,
}

impl PipelineEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluates the full chain at `time`, superseding any evaluation of the
    /// same pipeline still in flight.
    pub fn evaluate(
        &self,
        pipeline: &mut Pipeline,
        time: TimePoint,
    ) -> Result<PipelineFlowState, PipelineError> {
        let ticket = pipeline.request_tracker().begin();
        self.evaluate_with_ticket(pipeline, time, &ticket)
    }

    /// Evaluates the full chain on behalf of an already issued request.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Superseded`] once `ticket` stops being
    /// current. Nothing computed after that point is stored in any cache.
    pub fn evaluate_with_ticket(
        &self,
        pipeline: &mut Pipeline,
        time: TimePoint,
        ticket: &RequestTicket,
    ) -> Result<PipelineFlowState, PipelineError> {
        let request = EvaluationRequest::at(time);
        let (mut state, mut revision) = self.evaluate_source(pipeline, time, ticket)?;
        let mut aggregate = state.status().clone();

        let order = pipeline.order.clone();
        for id in order {
            let (output, output_revision) =
                self.evaluate_stage(pipeline, id, &request, state, revision, ticket)?;
            aggregate.escalate(output.status());
            let failed = output.status().is_error();
            state = output;
            revision = output_revision;
            if failed && self.config.break_on_error {
                debug!(time, "Stopping evaluation at the first failing stage.");
                break;
            }
        }

        if !ticket.is_current() {
            return Err(superseded(pipeline, time));
        }
        state.set_status(aggregate);
        Ok(state)
    }

    /// Computes a quick result without running deferred computations or
    /// touching any cache.
    ///
    /// Stages whose cache is valid for the current inputs contribute their
    /// cached output; all others run their modifier's preliminary evaluation.
    pub fn evaluate_preliminary(&self, pipeline: &Pipeline, time: TimePoint) -> PipelineFlowState {
        self.preliminary_until(pipeline, time, pipeline.len())
    }

    /// Preliminary output of the first `end` stages of the chain.
    pub(crate) fn preliminary_until(
        &self,
        pipeline: &Pipeline,
        time: TimePoint,
        end: usize,
    ) -> PipelineFlowState {
        let request = EvaluationRequest::at(time);
        let source_revision = pipeline.source.revision();
        let (mut state, mut revision) = match pipeline.source_cache.peek(&source_revision, time) {
            Some(cached) => (cached.clone(), Some(pipeline.source_cache.revision())),
            None => (pipeline.source.evaluate(time), None),
        };
        let mut aggregate = state.status().clone();

        for id in pipeline.order.iter().take(end) {
            let Some(app) = pipeline.stages.get(*id) else {
                continue;
            };

            let (output, output_revision) = if !app.is_enabled() {
                let mut output = state;
                output.set_status(PipelineStatus::success_with(DISABLED_STATUS));
                (output, revision)
            } else if !state.has_data() {
                (fail(state, &ModifierError::EmptyInput), revision)
            } else {
                let cached = revision
                    .and_then(|r| app.inputs(r).ok())
                    .and_then(|inputs| app.cache.peek(&inputs, time).cloned());
                match cached {
                    Some(cached) => (cached, Some(app.cache.revision())),
                    None => {
                        let output = match run_preliminary(app.modifier(), &request, &state) {
                            Ok(output) => output,
                            Err(err) => fail(state, &err),
                        };
                        (output, None)
                    }
                }
            };

            aggregate.escalate(output.status());
            let failed = output.status().is_error();
            state = output;
            revision = output_revision;
            if failed && self.config.break_on_error {
                break;
            }
        }

        state.set_status(aggregate);
        state
    }

    fn evaluate_source(
        &self,
        pipeline: &mut Pipeline,
        time: TimePoint,
        ticket: &RequestTicket,
    ) -> Result<(PipelineFlowState, u64), PipelineError> {
        let key = pipeline.source.revision();
        if !ticket.is_current() {
            return Err(superseded(pipeline, time));
        }
        if let Some(cached) = pipeline.source_cache.lookup(key, time).cloned() {
            trace!(time, "Source cache hit.");
            pipeline.notify(&PipelineEvent::CacheHit {
                stage: Stage::Source,
                time,
            });
            return Ok((cached, pipeline.source_cache.revision()));
        }

        let output = pipeline.source.evaluate(time);
        if !ticket.is_current() {
            return Err(superseded(pipeline, time));
        }
        let revision = pipeline.allocate_revision();
        pipeline.source_cache.store(output.clone(), revision);
        debug!(time, revision, validity = %output.validity(), "Evaluated pipeline source.");
        pipeline.notify(&PipelineEvent::StageEvaluated {
            stage: Stage::Source,
            time,
            status: output.status().kind(),
        });
        Ok((output, revision))
    }

    fn evaluate_stage(
        &self,
        pipeline: &mut Pipeline,
        id: ModAppId,
        request: &EvaluationRequest,
        input: PipelineFlowState,
        upstream_revision: u64,
        ticket: &RequestTicket,
    ) -> Result<(PipelineFlowState, u64), PipelineError> {
        let time = request.time;
        let app = pipeline.stages.get_mut(id).ok_or(PipelineError::UnknownStage)?;

        if !app.is_enabled() {
            let mut output = input;
            output.set_status(PipelineStatus::success_with(DISABLED_STATUS));
            app.status = output.status().clone();
            app.state = StageState::Clean;
            return Ok((output, upstream_revision));
        }

        if !input.has_data() {
            let output = fail(input, &ModifierError::EmptyInput);
            app.status = output.status().clone();
            app.state = StageState::Error;
            return Ok((output, upstream_revision));
        }

        let inputs = match app.inputs(upstream_revision) {
            Ok(inputs) => inputs,
            Err(err) => {
                let output = fail(input, &err);
                app.status = output.status().clone();
                app.state = StageState::Error;
                app.cache.invalidate();
                let revision = pipeline.allocate_revision();
                return Ok((output, revision));
            }
        };

        if !ticket.is_current() {
            return Err(superseded(pipeline, time));
        }
        let app = pipeline.stages.get_mut(id).ok_or(PipelineError::UnknownStage)?;
        if let Some(cached) = app.cache.lookup(inputs, time).cloned() {
            app.cache_hits += 1;
            app.state = StageState::Clean;
            let revision = app.cache.revision();
            trace!(stage = app.type_name(), time, revision, "Stage cache hit.");
            pipeline.notify(&PipelineEvent::CacheHit {
                stage: Stage::Modifier(id),
                time,
            });
            return Ok((cached, revision));
        }

        app.state = StageState::Evaluating;
        let modifier = Arc::clone(app.modifier());
        if !ticket.is_current() {
            app.state = StageState::Dirty;
            return Err(superseded(pipeline, time));
        }

        let result = run_full(&modifier, request, &input, ticket);
        let app = pipeline.stages.get_mut(id).ok_or(PipelineError::UnknownStage)?;
        if !ticket.is_current() {
            app.state = StageState::Dirty;
            return Err(superseded(pipeline, time));
        }

        let output = match result {
            Ok(output) => output,
            Err(err) => fail(input, &err),
        };
        app.evaluation_count += 1;
        app.status = output.status().clone();
        app.state = if output.status().is_error() {
            StageState::Error
        } else {
            StageState::Clean
        };
        debug!(
            stage = app.type_name(),
            time,
            status = %output.status(),
            validity = %output.validity(),
            "Evaluated modifier."
        );

        let revision = pipeline.allocate_revision();
        if let Some(app) = pipeline.stages.get_mut(id) {
            app.cache.store(output.clone(), revision);
        }
        pipeline.notify(&PipelineEvent::StageEvaluated {
            stage: Stage::Modifier(id),
            time,
            status: output.status().kind(),
        });
        Ok((output, revision))
    }
}

/// Runs a modifier's full evaluation on a shared copy of `input`, driving its
/// compute engine to completion if it defers work.
fn run_full(
    modifier: &SharedModifier,
    request: &EvaluationRequest,
    input: &PipelineFlowState,
    ticket: &RequestTicket,
) -> Result<PipelineFlowState, ModifierError> {
    let mut output = fresh_output(input);
    let evaluation = {
        let modifier = read_modifier(modifier);
        output.intersect_validity(&modifier.validity(request.time));
        modifier.evaluate(request, &mut output)?
    };
    if let Evaluation::Deferred(mut engine) = evaluation {
        engine.perform(ticket)?;
        output.intersect_validity(&engine.validity());
        engine.emit_results(&mut output)?;
    }
    Ok(output)
}

fn run_preliminary(
    modifier: &SharedModifier,
    request: &EvaluationRequest,
    input: &PipelineFlowState,
) -> Result<PipelineFlowState, ModifierError> {
    let mut output = fresh_output(input);
    let modifier = read_modifier(modifier);
    output.intersect_validity(&modifier.validity(request.time));
    modifier.evaluate_preliminary(request, &mut output)?;
    Ok(output)
}

fn fresh_output(input: &PipelineFlowState) -> PipelineFlowState {
    let mut output = input.clone();
    output.set_status(PipelineStatus::success());
    output
}

/// The stage output after a failure: the unchanged input plus an error status.
fn fail(input: PipelineFlowState, err: &ModifierError) -> PipelineFlowState {
    let mut output = input;
    output.set_status(PipelineStatus::error(err.to_string()));
    output
}

fn superseded(pipeline: &Pipeline, time: TimePoint) -> PipelineError {
    debug!(time, "Discarding superseded evaluation.");
    pipeline.notify(&PipelineEvent::EvaluationSuperseded { time });
    PipelineError::Superseded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::standard;
    use crate::core::data::{DataCollection, ElementKind, Property, PropertyContainer};
    use crate::core::status::StatusKind;
    use crate::core::time::TimeInterval;
    use crate::engine::config::EvaluatorConfigBuilder;
    use crate::engine::modifier::{ComputeEngine, Modifier, ParameterSnapshot, share, write_modifier};
    use crate::engine::request::RequestTracker;
    use crate::engine::source::{FrameSequenceSource, StaticSource};
    use crate::modifiers::{ClearSelectionModifier, InvertSelectionModifier};
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct CountingParams {
        value: i64,
        fail: bool,
    }

    /// Writes its `value` parameter as an attribute and counts invocations.
    #[derive(Debug, Default)]
    struct CountingModifier {
        params: CountingParams,
        calls: Arc<AtomicUsize>,
    }

    impl CountingModifier {
        fn failing() -> Self {
            Self {
                params: CountingParams {
                    value: 0,
                    fail: true,
                },
                ..Self::default()
            }
        }
    }

    impl Modifier for CountingModifier {
        fn type_name(&self) -> &'static str {
            "counting"
        }

        fn parameters(&self) -> Result<ParameterSnapshot, ModifierError> {
            ParameterSnapshot::capture(&self.params)
        }

        fn set_parameters(&mut self, params: &ParameterSnapshot) -> Result<(), ModifierError> {
            self.params = params.restore()?;
            Ok(())
        }

        fn is_applicable_to(&self, _input: &DataCollection) -> bool {
            true
        }

        fn evaluate_preliminary(
            &self,
            _request: &EvaluationRequest,
            state: &mut PipelineFlowState,
        ) -> Result<(), ModifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.params.fail {
                return Err(ModifierError::Computation("requested failure".to_string()));
            }
            state.mutable_data().set_attribute("Counting.value", self.params.value);
            Ok(())
        }
    }

    struct SupersedingEngine {
        tracker: RequestTracker,
    }

    impl ComputeEngine for SupersedingEngine {
        fn perform(&mut self, ticket: &RequestTicket) -> Result<(), ModifierError> {
            self.tracker.supersede();
            if !ticket.is_current() {
                return Err(ModifierError::Canceled);
            }
            Ok(())
        }

        fn emit_results(self: Box<Self>, state: &mut PipelineFlowState) -> Result<(), ModifierError> {
            state.mutable_data().set_attribute("Async.done", 1_i64);
            Ok(())
        }
    }

    /// Defers work to an engine. The first engine it hands out supersedes
    /// its own request, mimicking an edit made while the work is running.
    #[derive(Debug, Default)]
    struct AsyncModifier {
        tracker: Mutex<Option<RequestTracker>>,
    }

    impl Modifier for AsyncModifier {
        fn type_name(&self) -> &'static str {
            "async"
        }

        fn parameters(&self) -> Result<ParameterSnapshot, ModifierError> {
            Ok(ParameterSnapshot::default())
        }

        fn set_parameters(&mut self, _params: &ParameterSnapshot) -> Result<(), ModifierError> {
            Ok(())
        }

        fn is_applicable_to(&self, _input: &DataCollection) -> bool {
            true
        }

        fn evaluate_preliminary(
            &self,
            _request: &EvaluationRequest,
            _state: &mut PipelineFlowState,
        ) -> Result<(), ModifierError> {
            Ok(())
        }

        fn evaluate(
            &self,
            _request: &EvaluationRequest,
            _state: &mut PipelineFlowState,
        ) -> Result<Evaluation, ModifierError> {
            let tracker = self.tracker.lock().unwrap().take().unwrap_or_default();
            Ok(Evaluation::Deferred(Box::new(SupersedingEngine { tracker })))
        }
    }

    fn selection_source(flags: &[bool]) -> StaticSource {
        let mut particles = PropertyContainer::new(ElementKind::Particles, flags.len());
        particles
            .insert_property(Property::from_flags(standard::SELECTION, flags).unwrap())
            .unwrap();
        let mut data = DataCollection::new();
        data.add(particles.into()).unwrap();
        StaticSource::new(data)
    }

    fn counting(pipeline: &mut Pipeline) -> (ModAppId, Arc<AtomicUsize>, SharedModifier) {
        let modifier = CountingModifier::default();
        let calls = Arc::clone(&modifier.calls);
        let shared = share(modifier);
        let id = pipeline.append(shared.clone());
        // Insertion runs a preliminary evaluation for the applicability check.
        calls.store(0, Ordering::SeqCst);
        (id, calls, shared)
    }

    fn set_value(modifier: &SharedModifier, value: i64) {
        let mut modifier = write_modifier(modifier);
        let params = modifier.parameters().unwrap();
        let mut patch = toml::Table::new();
        patch.insert("value".to_string(), toml::Value::Integer(value));
        modifier.set_parameters(&params.merged(&patch)).unwrap();
    }

    #[test]
    fn repeated_evaluation_is_served_from_cache() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let (id, calls, _) = counting(&mut pipeline);
        let evaluator = PipelineEvaluator::default();

        let first = evaluator.evaluate(&mut pipeline, 0).unwrap();
        for _ in 0..5 {
            let again = evaluator.evaluate(&mut pipeline, 0).unwrap();
            assert_eq!(again, first);
            assert!(again.shares_data_with(&first));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stage = pipeline.stage(id).unwrap();
        assert_eq!(stage.evaluation_count(), 1);
        assert_eq!(stage.cache_hits(), 5);
        assert_eq!(stage.state(), StageState::Clean);
    }

    #[test]
    fn parameter_change_through_shared_handle_causes_one_reevaluation() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let (_, calls, modifier) = counting(&mut pipeline);
        let evaluator = PipelineEvaluator::default();

        evaluator.evaluate(&mut pipeline, 0).unwrap();
        set_value(&modifier, 42);
        let state = evaluator.evaluate(&mut pipeline, 0).unwrap();
        evaluator.evaluate(&mut pipeline, 0).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            state.data().unwrap().attribute("Counting.value").and_then(|v| v.as_int()),
            Some(42)
        );
    }

    #[test]
    fn time_outside_validity_reevaluates_downstream_stages() {
        let frames = (0..3)
            .map(|_| selection_source(&[true]).data().clone())
            .collect();
        let mut pipeline = Pipeline::new(FrameSequenceSource::with_ticks_per_frame(frames, 10));
        let (_, calls, _) = counting(&mut pipeline);
        let evaluator = PipelineEvaluator::default();

        evaluator.evaluate(&mut pipeline, 0).unwrap();
        evaluator.evaluate(&mut pipeline, 5).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let state = evaluator.evaluate(&mut pipeline, 10).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.validity(), TimeInterval::new(10, 19));
    }

    #[test]
    fn upstream_hit_does_not_hide_downstream_change() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let (first_id, first_calls, _) = counting(&mut pipeline);
        let (_, second_calls, second) = counting(&mut pipeline);
        // The second insertion re-runs the first stage's preliminary evaluation.
        first_calls.store(0, Ordering::SeqCst);
        let evaluator = PipelineEvaluator::default();

        evaluator.evaluate(&mut pipeline, 0).unwrap();
        set_value(&second, 7);
        evaluator.evaluate(&mut pipeline, 0).unwrap();

        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.stage(first_id).unwrap().cache_hits(), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidate_forces_stage_and_downstream_to_rerun() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let (first_id, first_calls, _) = counting(&mut pipeline);
        let (_, second_calls, _) = counting(&mut pipeline);
        first_calls.store(0, Ordering::SeqCst);
        let evaluator = PipelineEvaluator::default();

        evaluator.evaluate(&mut pipeline, 0).unwrap();
        pipeline.invalidate(first_id).unwrap();
        assert_eq!(pipeline.stage(first_id).unwrap().state(), StageState::Dirty);
        evaluator.evaluate(&mut pipeline, 0).unwrap();

        assert_eq!(first_calls.load(Ordering::SeqCst), 2);
        assert_eq!(second_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn error_stage_escalates_status_but_later_stages_still_run() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let (_, _, _) = counting(&mut pipeline);
        let failing = pipeline.append(share(CountingModifier::failing()));
        let (_, last_calls, last) = counting(&mut pipeline);
        set_value(&last, 3);

        let state = PipelineEvaluator::default().evaluate(&mut pipeline, 0).unwrap();

        assert_eq!(state.status().kind(), StatusKind::Error);
        assert!(state.status().text().contains("requested failure"));
        assert_eq!(last_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            state.data().unwrap().attribute("Counting.value").and_then(|v| v.as_int()),
            Some(3)
        );
        assert_eq!(pipeline.stage(failing).unwrap().state(), StageState::Error);
    }

    #[test]
    fn failing_stage_is_retried_on_next_evaluation() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let modifier = CountingModifier::failing();
        let calls = Arc::clone(&modifier.calls);
        pipeline.append(share(modifier));
        calls.store(0, Ordering::SeqCst);
        let evaluator = PipelineEvaluator::default();

        evaluator.evaluate(&mut pipeline, 0).unwrap();
        evaluator.evaluate(&mut pipeline, 0).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn break_on_error_stops_at_failing_stage() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        pipeline.append(share(CountingModifier::failing()));
        let (_, last_calls, _) = counting(&mut pipeline);
        let evaluator =
            PipelineEvaluator::new(EvaluatorConfigBuilder::new().break_on_error(true).build().unwrap());

        let state = evaluator.evaluate(&mut pipeline, 0).unwrap();
        assert!(state.status().is_error());
        assert_eq!(last_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn disabled_stage_passes_input_through() {
        let mut pipeline = Pipeline::new(selection_source(&[true, false]));
        let (id, calls, _) = counting(&mut pipeline);
        pipeline.set_enabled(id, false).unwrap();
        let evaluator = PipelineEvaluator::default();

        let state = evaluator.evaluate(&mut pipeline, 0).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.status().kind(), StatusKind::Success);
        assert_eq!(state.status().text(), DISABLED_STATUS);
        assert!(state.data().unwrap().attribute("Counting.value").is_none());
    }

    #[test]
    fn empty_input_is_reported_as_error() {
        let mut pipeline = Pipeline::new(FrameSequenceSource::new(Vec::new()));
        counting(&mut pipeline);
        let state = PipelineEvaluator::default().evaluate(&mut pipeline, 0).unwrap();
        assert!(state.status().is_error());
        assert!(state.status().text().contains("Modifier input is empty."));
    }

    #[test]
    fn superseded_evaluation_returns_no_result_and_caches_nothing() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let async_modifier = AsyncModifier {
            tracker: Mutex::new(Some(pipeline.request_tracker())),
        };
        let id = pipeline.append(share(async_modifier));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        pipeline.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        let evaluator = PipelineEvaluator::default();

        let result = evaluator.evaluate(&mut pipeline, 0);
        assert!(matches!(result, Err(PipelineError::Superseded)));
        assert!(pipeline.stage(id).unwrap().cache().output().is_none());
        assert_eq!(pipeline.stage(id).unwrap().state(), StageState::Dirty);
        assert!(
            events
                .lock()
                .unwrap()
                .contains(&PipelineEvent::EvaluationSuperseded { time: 0 })
        );

        let state = evaluator.evaluate(&mut pipeline, 0).unwrap();
        assert_eq!(
            state.data().unwrap().attribute("Async.done").and_then(|v| v.as_int()),
            Some(1)
        );
        assert_eq!(pipeline.stage(id).unwrap().evaluation_count(), 1);
    }

    #[test]
    fn stale_ticket_on_warm_cache_is_rejected_without_dropping_outputs() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let (id, calls, _) = counting(&mut pipeline);
        let evaluator = PipelineEvaluator::default();
        let warm = evaluator.evaluate(&mut pipeline, 0).unwrap();

        let tracker = pipeline.request_tracker();
        let stale = tracker.begin();
        tracker.begin();
        let result = evaluator.evaluate_with_ticket(&mut pipeline, 0, &stale);
        assert!(matches!(result, Err(PipelineError::Superseded)));
        assert!(pipeline.stage(id).unwrap().cache().output().is_some());

        let again = evaluator.evaluate(&mut pipeline, 0).unwrap();
        assert!(again.shares_data_with(&warm));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.stage(id).unwrap().cache_hits(), 1);
    }

    #[test]
    fn preliminary_evaluation_leaves_caches_untouched() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let (id, calls, modifier) = counting(&mut pipeline);
        let evaluator = PipelineEvaluator::default();

        evaluator.evaluate(&mut pipeline, 0).unwrap();
        let cached = evaluator.evaluate_preliminary(&pipeline, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cached.data().unwrap().attribute("Counting.value").is_some());

        set_value(&modifier, 9);
        let fresh = evaluator.evaluate_preliminary(&pipeline, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            fresh.data().unwrap().attribute("Counting.value").and_then(|v| v.as_int()),
            Some(9)
        );
        assert_eq!(pipeline.stage(id).unwrap().evaluation_count(), 1);
    }

    #[test]
    fn shared_modifier_keeps_independent_caches_per_position() {
        let mut pipeline = Pipeline::new(selection_source(&[true]));
        let modifier = CountingModifier::default();
        let calls = Arc::clone(&modifier.calls);
        let shared = share(modifier);
        let first = pipeline.append(shared.clone());
        let second = pipeline.append(shared);
        calls.store(0, Ordering::SeqCst);
        let evaluator = PipelineEvaluator::default();

        evaluator.evaluate(&mut pipeline, 0).unwrap();
        evaluator.evaluate(&mut pipeline, 0).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pipeline.stage(first).unwrap().cache_hits(), 1);
        assert_eq!(pipeline.stage(second).unwrap().cache_hits(), 1);
    }

    #[test]
    fn invert_then_clear_selection_scenario() {
        let mut pipeline = Pipeline::new(selection_source(&[true, false, true]));
        let invert = pipeline.append(share(InvertSelectionModifier::default()));
        let evaluator = PipelineEvaluator::default();

        let inverted = evaluator.evaluate(&mut pipeline, 0).unwrap();
        let flags = inverted
            .data()
            .unwrap()
            .container(ElementKind::Particles)
            .unwrap()
            .property(standard::SELECTION)
            .unwrap()
            .flags();
        assert_eq!(flags, Some(vec![false, true, false]));

        pipeline.append(share(ClearSelectionModifier::default()));
        let cleared = evaluator.evaluate(&mut pipeline, 0).unwrap();
        assert!(
            !cleared
                .data()
                .unwrap()
                .container(ElementKind::Particles)
                .unwrap()
                .contains_property(standard::SELECTION)
        );
        assert_eq!(pipeline.stage(invert).unwrap().evaluation_count(), 1);
        assert_eq!(cleared.status().kind(), StatusKind::Success);
    }

    #[test]
    fn stage_outputs_never_alias_mutated_source_data() {
        let source = selection_source(&[true, true]);
        let original = source.data().clone();
        let mut pipeline = Pipeline::new(source);
        pipeline.append(share(InvertSelectionModifier::default()));

        PipelineEvaluator::default().evaluate(&mut pipeline, 0).unwrap();
        let source_output = pipeline.source().evaluate(0);
        assert_eq!(source_output.data().unwrap(), &original);
    }
}
