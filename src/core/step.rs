//! Step and memory capabilities

use crate::core::{callback::RunScope, error::StepError};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Named values passed into and returned from steps
pub type Values = IndexMap<String, Value>;

/// A step shared between a pipeline and whatever assembled it
pub type SharedStep = Arc<dyn Step>;

/// External source of named values a pipeline's caller does not supply
pub trait Memory: Send + Sync {
    /// Keys this memory can resolve
    fn memory_variables(&self) -> Vec<String>;

    /// Values for [`Memory::memory_variables`], given the caller's inputs
    fn load_memory_variables(&self, inputs: &Values) -> Result<Values, StepError>;
}

/// One unit of work with declared named inputs and outputs
///
/// Implementors provide [`Step::call`]. The suspendable form defaults to the
/// blocking one; steps that actually wait on I/O override [`Step::acall`].
///
/// A step receives the full set of values available at its position in the
/// pipeline and must read only the keys it declared.
#[async_trait]
pub trait Step: Send + Sync {
    /// Identifier used in diagnostics and progress events
    fn name(&self) -> &str;

    /// Keys this step requires
    fn input_keys(&self) -> Vec<String>;

    /// Keys this step produces
    fn output_keys(&self) -> Vec<String>;

    /// Memory the step resolves some of its own inputs from
    fn memory(&self) -> Option<&dyn Memory> {
        None
    }

    /// Run the step, blocking until it finishes
    fn call(&self, inputs: &Values, scope: &RunScope) -> Result<Values, StepError>;

    /// Run the step, yielding while it is pending
    async fn acall(&self, inputs: &Values, scope: &RunScope) -> Result<Values, StepError> {
        self.call(inputs, scope)
    }

    /// Single-value form of [`Step::call`] for one-input, one-output steps
    fn run(&self, input: &str, scope: &RunScope) -> Result<String, StepError> {
        let inputs = wrap_input(self, input)?;
        let outputs = self.call(&inputs, scope)?;
        unwrap_output(self, outputs)
    }

    /// Single-value form of [`Step::acall`]
    async fn arun(&self, input: &str, scope: &RunScope) -> Result<String, StepError> {
        let inputs = wrap_input(self, input)?;
        let outputs = self.acall(&inputs, scope).await?;
        unwrap_output(self, outputs)
    }
}

/// Place `input` under a step's sole input key
fn wrap_input<S: Step + ?Sized>(step: &S, input: &str) -> Result<Values, StepError> {
    let keys = step.input_keys();
    let [key] = keys.as_slice() else {
        return Err(StepError::failed(
            step.name(),
            format!("single-value call needs exactly one input key, got {}", keys.len()),
        ));
    };
    let mut values = Values::new();
    values.insert(key.clone(), Value::String(input.to_string()));
    Ok(values)
}

/// Take a step's sole output key out of `outputs` as text
fn unwrap_output<S: Step + ?Sized>(step: &S, mut outputs: Values) -> Result<String, StepError> {
    let keys = step.output_keys();
    let [key] = keys.as_slice() else {
        return Err(StepError::failed(
            step.name(),
            format!("single-value call needs exactly one output key, got {}", keys.len()),
        ));
    };
    match outputs.shift_remove(key) {
        Some(value) => Ok(value_to_text(value)),
        None => Err(StepError::MissingOutput {
            step: step.name().to_string(),
            key: key.clone(),
        }),
    }
}

/// Render a value as text: strings verbatim, everything else as JSON
pub fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Read a required key as text, failing with a step error if absent
pub fn require_text(step: &str, inputs: &Values, key: &str) -> Result<String, StepError> {
    inputs
        .get(key)
        .cloned()
        .map(value_to_text)
        .ok_or_else(|| StepError::failed(step, format!("input '{}' not provided", key)))
}
