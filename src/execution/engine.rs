//! Sequencing loops shared by the blocking and suspendable modes

use crate::{
    core::{
        callback::{color_mapping, PipelineEvent, RunScope, RunStatus},
        context::Accumulator,
        error::{RunError, StepError},
        step::{Memory, SharedStep, Values},
        validation::ResolvedKeys,
    },
    execution::executor::{collect_outputs, Invocation},
};
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, error, info};

/// Thread an accumulating set of values through `steps`, in order
///
/// Step `i + 1` only starts once step `i`'s outputs are merged. The first
/// failing step aborts the run and its error is returned as is.
pub async fn run_keyed<I: Invocation>(
    invocation: &I,
    pipeline: &str,
    steps: &[SharedStep],
    memory: Option<&dyn Memory>,
    keys: &ResolvedKeys,
    inputs: &Values,
    scope: &RunScope,
) -> Result<Values, RunError> {
    let missing: BTreeSet<String> = keys
        .input_keys
        .iter()
        .filter(|key| !inputs.contains_key(*key))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(RunError::MissingInputs { missing });
    }

    info!(
        "Running pipeline {} ({} steps, {} mode)",
        pipeline,
        steps.len(),
        invocation.mode()
    );
    started(scope, pipeline, steps.len());

    let mut acc = Accumulator::seed(inputs);
    if let Some(memory) = memory {
        let loaded = memory
            .load_memory_variables(inputs)
            .map(|values| keep_memory_keys(keys, values));
        match loaded {
            Ok(values) => acc.merge(values),
            Err(e) => {
                finished(scope, pipeline, RunStatus::Failed);
                return Err(e.into());
            }
        }
    }

    for (index, step) in steps.iter().enumerate() {
        let child = scope.child(None);
        step_started(scope, step.name(), index);

        let result = invocation
            .call(step.as_ref(), acc.values(), &child)
            .await
            .and_then(|outputs| collect_outputs(step.as_ref(), outputs));

        match result {
            Ok(outputs) => {
                debug!("Step {} returned {:?}", step.name(), outputs.keys());
                step_completed(scope, step.name(), index, outputs.keys().cloned().collect());
                acc.merge(outputs);
            }
            Err(e) => {
                step_failed(scope, pipeline, step.name(), index, &e);
                return Err(e.into());
            }
        }
    }

    finished(scope, pipeline, RunStatus::Completed);
    Ok(acc.project(&keys.output_keys))
}

/// Pass a single value through `steps`, in order
///
/// With `strip_outputs` set, each intermediate value is trimmed before it is
/// reported and handed to the next step.
pub async fn run_scalar<I: Invocation>(
    invocation: &I,
    pipeline: &str,
    steps: &[SharedStep],
    strip_outputs: bool,
    input: &str,
    scope: &RunScope,
) -> Result<String, RunError> {
    info!(
        "Running pipeline {} ({} steps, {} mode)",
        pipeline,
        steps.len(),
        invocation.mode()
    );
    started(scope, pipeline, steps.len());

    let colors = color_mapping(steps.len());
    let mut current = input.to_string();

    for (index, step) in steps.iter().enumerate() {
        let tag = format!("step_{}", index + 1);
        let child = scope.child(Some(&tag));
        step_started(scope, step.name(), index);

        current = match invocation.run(step.as_ref(), &current, &child).await {
            Ok(output) => output,
            Err(e) => {
                step_failed(scope, pipeline, step.name(), index, &e);
                return Err(e.into());
            }
        };
        if strip_outputs {
            current = current.trim().to_string();
        }

        scope.on_text(&current, Some(colors[index]), "\n");
        step_completed(scope, step.name(), index, step.output_keys());
    }

    finished(scope, pipeline, RunStatus::Completed);
    Ok(current)
}

/// Memory may return more than it declares; only declared keys are merged
fn keep_memory_keys(keys: &ResolvedKeys, mut values: Values) -> Values {
    keys.memory_keys
        .iter()
        .filter_map(|key| values.shift_remove_entry(key))
        .collect()
}

fn started(scope: &RunScope, pipeline: &str, steps: usize) {
    scope.emit(PipelineEvent::PipelineStarted {
        run_id: scope.run_id,
        pipeline: pipeline.to_string(),
        steps,
        at: Utc::now(),
    });
}

fn finished(scope: &RunScope, pipeline: &str, status: RunStatus) {
    scope.emit(PipelineEvent::PipelineCompleted {
        run_id: scope.run_id,
        pipeline: pipeline.to_string(),
        status,
        at: Utc::now(),
    });
}

fn step_started(scope: &RunScope, step: &str, index: usize) {
    debug!("Starting step {} ({})", step, index + 1);
    scope.emit(PipelineEvent::StepStarted {
        run_id: scope.run_id,
        step: step.to_string(),
        index,
        at: Utc::now(),
    });
}

fn step_completed(scope: &RunScope, step: &str, index: usize, output_keys: Vec<String>) {
    scope.emit(PipelineEvent::StepCompleted {
        run_id: scope.run_id,
        step: step.to_string(),
        index,
        output_keys,
        at: Utc::now(),
    });
}

fn step_failed(scope: &RunScope, pipeline: &str, step: &str, index: usize, e: &StepError) {
    error!("Step {} of pipeline {} failed: {}", step, pipeline, e);
    scope.emit(PipelineEvent::StepFailed {
        run_id: scope.run_id,
        step: step.to_string(),
        index,
        error: e.to_string(),
        at: Utc::now(),
    });
    finished(scope, pipeline, RunStatus::Failed);
}
